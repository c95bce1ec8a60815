use std::time::Duration;

use bson::{DateTime, Document};
use typed_builder::TypedBuilder;

use crate::address::ServerAddress;

/// A request to run a command on a remote node. One request maps to exactly one
/// execution attempt; the runner never retries.
#[derive(Clone, Debug, TypedBuilder)]
#[non_exhaustive]
pub struct CommandRequest {
    /// The node to run the command on.
    pub target: ServerAddress,

    /// The database to run the command against.
    #[builder(setter(into))]
    pub db: String,

    /// The command document. The name of its first field is the command's name.
    pub command: Document,

    /// Auxiliary metadata forwarded alongside the command (routing and session
    /// information). Opaque to the runner.
    #[builder(default)]
    pub metadata: Document,

    /// The instant at which the request expires. `None` never expires.
    #[builder(default, setter(strip_option))]
    pub expire_at: Option<DateTime>,
}

impl CommandRequest {
    /// The name of the command: the name of its document's first field, or the empty
    /// string for an empty command document.
    pub fn command_name(&self) -> &str {
        self.command
            .keys()
            .next()
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// The reply a connection's native command channel produced: the command reply document
/// and the reply metadata document, each independently owned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandReply {
    /// The command reply document.
    pub body: Document,

    /// The reply metadata document.
    pub metadata: Document,
}

/// The outcome of one successful command execution.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CommandResponse {
    /// The command reply document.
    pub reply: Document,

    /// The reply metadata document. Empty for downconverted replies.
    pub metadata: Document,

    /// The wall-clock duration of the attempt.
    pub elapsed: Duration,
}

#[cfg(test)]
mod test {
    use bson::doc;

    use super::CommandRequest;
    use crate::address::ServerAddress;

    #[test]
    fn command_name_is_the_first_field() {
        let request = CommandRequest::builder()
            .target(ServerAddress::new("localhost", None))
            .db("test")
            .command(doc! { "find": "coll", "limit": 1 })
            .build();
        assert_eq!(request.command_name(), "find");
    }

    #[test]
    fn empty_command_document_has_an_empty_name() {
        let request = CommandRequest::builder()
            .target(ServerAddress::new("localhost", None))
            .db("test")
            .command(doc! {})
            .build();
        assert_eq!(request.command_name(), "");
    }

    #[test]
    fn builder_defaults() {
        let request = CommandRequest::builder()
            .target(ServerAddress::new("localhost", None))
            .db("test")
            .command(doc! { "ping": 1 })
            .build();
        assert!(request.metadata.is_empty());
        assert!(request.expire_at.is_none());
    }
}
