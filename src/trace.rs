//! Support for emitting `tracing` events about command execution.

use bson::{Bson, Document};

use crate::redact::{redact_document_for_logging, simple_redact_value};

/// The target of command-related tracing events.
pub(crate) const COMMAND_TRACING_EVENT_TARGET: &str = "remote_command::command";

/// Names of commands whose bodies and replies are never logged verbatim, compared
/// case-insensitively.
const SENSITIVE_COMMANDS: &[&str] = &[
    "authenticate",
    "saslstart",
    "saslcontinue",
    "getnonce",
    "createuser",
    "updateuser",
    "copydbgetnonce",
    "copydbsaslstart",
    "copydb",
];

/// Whether the body and reply of a command must be redacted before logging. Handshakes
/// are only sensitive when they carry speculative authentication data.
pub(crate) fn should_redact_command(command_name: &str, body: &Document) -> bool {
    let lower = command_name.to_lowercase();
    SENSITIVE_COMMANDS.contains(&lower.as_str())
        || ((lower == "ismaster" || lower == "hello")
            && body.contains_key("speculativeAuthenticate"))
}

/// Serializes a command or reply document for inclusion in a tracing event, redacting
/// every value first when the command is sensitive.
pub(crate) fn serialize_command_for_logging(document: &Document, command_name: &str) -> String {
    let mut document = document.clone();
    if should_redact_command(command_name, &document) {
        redact_document_for_logging(&mut document, simple_redact_value, &[]);
    }
    Bson::Document(document).into_relaxed_extjson().to_string()
}

/// Types that have a custom representation in tracing events.
pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for crate::error::Error {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod test {
    use bson::doc;

    use super::{serialize_command_for_logging, should_redact_command};

    #[test]
    fn sensitive_commands_are_detected_case_insensitively() {
        assert!(should_redact_command("saslStart", &doc! { "saslStart": 1 }));
        assert!(should_redact_command("authenticate", &doc! {}));
        assert!(!should_redact_command("find", &doc! { "find": "coll" }));
    }

    #[test]
    fn handshakes_are_sensitive_only_with_speculative_authentication() {
        assert!(!should_redact_command("isMaster", &doc! { "isMaster": 1 }));
        assert!(should_redact_command(
            "isMaster",
            &doc! { "isMaster": 1, "speculativeAuthenticate": { "saslStart": 1 } }
        ));
        assert!(should_redact_command(
            "hello",
            &doc! { "hello": 1, "speculativeAuthenticate": { "saslStart": 1 } }
        ));
    }

    #[test]
    fn sensitive_bodies_are_redacted_before_serialization() {
        let serialized =
            serialize_command_for_logging(&doc! { "saslStart": 1, "payload": "hunter2" }, "saslStart");
        assert!(!serialized.contains("hunter2"));
        assert!(serialized.contains("***"));
        assert!(serialized.contains("payload"));
    }

    #[test]
    fn ordinary_bodies_pass_through() {
        let serialized = serialize_command_for_logging(&doc! { "find": "coll" }, "find");
        assert!(serialized.contains("coll"));
    }
}
