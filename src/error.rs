//! Contains the `Error` and `Result` types that `remote_command` uses.

use std::sync::Arc;

use serde::Deserialize;

use crate::{address::ServerAddress, command::CommandRequest};

/// The result type for all methods that can return an error in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The code carried by error reply documents when the real cause has no code of its own.
pub(crate) const UNKNOWN_ERROR_CODE: i32 = 8;

/// An error that can occur while running a remote command. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is wrapped in an `Arc` to allow the errors to be
/// cloned.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Arc<ErrorKind>,
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_namespace(message: impl Into<String>) -> Self {
        ErrorKind::InvalidNamespace {
            message: message.into(),
        }
        .into()
    }

    /// Creates the error reported when the connection layer fails to produce a cursor
    /// for a legacy operation.
    pub(crate) fn host_unreachable(address: &ServerAddress) -> Self {
        ErrorKind::HostUnreachable {
            message: format!(
                "cursor initialization failed due to connection problems with {}",
                address
            ),
        }
        .into()
    }

    /// The numeric code used when this error is rendered into a command reply document.
    pub(crate) fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Whether this error was reported by the remote server rather than produced on the
    /// client side.
    pub fn is_command_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Command(_))
    }

    /// Gets the code/message pair from this error, if it is a server-side error.
    pub fn code_and_message(&self) -> Option<(i32, &str)> {
        match self.kind.as_ref() {
            ErrorKind::Command(err) => Some((err.code, err.message.as_str())),
            _ => None,
        }
    }

    /// Converts faults that escaped the connection layer without structure into an
    /// `Unknown` error naming the command, database, and target for diagnosis.
    /// Structured errors pass through unchanged.
    pub(crate) fn with_command_context(self, request: &CommandRequest) -> Self {
        match self.kind.as_ref() {
            ErrorKind::Io(source) => ErrorKind::Unknown {
                message: format!(
                    "sending command {} on database {} over network to {} received error: {}",
                    request.command, request.db, request.target, source
                ),
            }
            .into(),
            _ => self,
        }
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self {
            kind: Arc::new(err.into()),
        }
    }
}

impl std::ops::Deref for Error {
    type Target = Arc<ErrorKind>;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrapper around `bson::de::Error`.
    #[error("{0}")]
    BsonDeserialization(#[from] bson::de::Error),

    /// Wrapper around `bson::ser::Error`.
    #[error("{0}")]
    BsonSerialization(#[from] bson::ser::Error),

    /// The server returned an error to an attempted operation, either in a command
    /// reply or embedded in a cursor batch.
    #[error("command failed: {0}")]
    Command(CommandError),

    /// The deadline of the operation passed before it could be dispatched.
    #[error("operation exceeded its time limit: {message}")]
    #[non_exhaustive]
    ExceededTimeLimit { message: String },

    /// The connection layer could not reach the remote host.
    #[error("{message}")]
    #[non_exhaustive]
    HostUnreachable { message: String },

    /// An invalid argument was provided to a database operation.
    #[error("an invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// A namespace derived from a command was malformed.
    #[error("{message}")]
    #[non_exhaustive]
    InvalidNamespace { message: String },

    /// Wrapper around [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A fault without further structure, caught at the command runner boundary.
    #[error("{message}")]
    #[non_exhaustive]
    Unknown { message: String },
}

impl ErrorKind {
    /// Maps this error onto the numeric code carried by command reply documents.
    pub(crate) fn code(&self) -> i32 {
        match self {
            ErrorKind::Command(err) => err.code,
            ErrorKind::InvalidArgument { .. } => 2,
            ErrorKind::HostUnreachable { .. } => 6,
            ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => 9,
            ErrorKind::ExceededTimeLimit { .. } => 50,
            ErrorKind::InvalidNamespace { .. } => 73,
            ErrorKind::Io(_) | ErrorKind::Unknown { .. } => UNKNOWN_ERROR_CODE,
        }
    }
}

/// An error reported by the remote server.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("error code {code}: {message}")]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    pub code: i32,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

impl CommandError {
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use bson::doc;

    use super::{Error, ErrorKind};
    use crate::{address::ServerAddress, command::CommandRequest};

    fn ping_request() -> CommandRequest {
        CommandRequest::builder()
            .target(ServerAddress::new("example.com", 27017))
            .db("admin")
            .command(doc! { "ping": 1 })
            .build()
    }

    #[test]
    fn codes_match_reply_document_conventions() {
        assert_eq!(Error::invalid_argument("nope").code(), 2);
        assert_eq!(
            Error::host_unreachable(&ServerAddress::new("example.com", 27017)).code(),
            6
        );
        assert_eq!(Error::invalid_namespace("bad").code(), 73);
        let timeout: Error = ErrorKind::ExceededTimeLimit {
            message: "late".to_string(),
        }
        .into();
        assert_eq!(timeout.code(), 50);
    }

    #[test]
    fn io_faults_are_wrapped_with_command_context() {
        let fault: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        let wrapped = fault.with_command_context(&ping_request());
        match wrapped.kind.as_ref() {
            ErrorKind::Unknown { message } => {
                assert!(message.contains("ping"));
                assert!(message.contains("admin"));
                assert!(message.contains("example.com:27017"));
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn structured_errors_pass_through_unchanged() {
        let error = Error::invalid_namespace("invalid collection name");
        let passed = error.with_command_context(&ping_request());
        assert!(matches!(
            passed.kind.as_ref(),
            ErrorKind::InvalidNamespace { .. }
        ));
    }
}
