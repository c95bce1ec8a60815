//! Field-level redaction of documents destined for logs.
//!
//! The traversal walks the document depth first, carrying the dotted path matched so
//! far. `redact_fields` names full dotted paths: a complete match redacts the whole
//! subtree beneath it, a prefix match descends, everything else is left alone. Array
//! members do not consume a path segment, since their names are just indices. Fields
//! named `$comment` are never redacted. The replacement value comes from a pluggable
//! transform so the traversal and the redaction policy stay independently testable.

use bson::{Bson, Document};
use sha1::{Digest, Sha1};

/// Replaces any value with `"***"`.
pub fn simple_redact_value(_value: &Bson) -> String {
    "***".to_string()
}

/// Replaces a value with the lowercase hex SHA-1 of its canonical extended JSON bytes,
/// so equal values stay correlatable across log lines without being readable.
pub fn hash_redact_value(value: &Bson) -> String {
    let serialized = value.clone().into_canonical_extjson().to_string();
    hex::encode(Sha1::digest(serialized.as_bytes()))
}

/// Redacts the values of `doc` in place. `redact_fields` lists the full dotted paths to
/// redact; an empty list redacts every field.
pub fn redact_document_for_logging<F>(doc: &mut Document, get_redacted_value: F, redact_fields: &[&str])
where
    F: Fn(&Bson) -> String,
{
    let keys: Vec<String> = doc.keys().cloned().collect();
    for key in keys {
        if let Some(child) = doc.get_mut(&key) {
            redact_child(child, Some(key.as_str()), &get_redacted_value, redact_fields, "", false);
        }
    }
}

fn redact_value(value: &mut Bson, field_name: Option<&str>, get_redacted_value: &dyn Fn(&Bson) -> String) {
    if field_name != Some("$comment") {
        *value = Bson::String(get_redacted_value(value));
    }
}

/// Walks `node` with the matching path `path` already established for it: leaves are
/// replaced, containers recurse into their children.
fn redact_node(
    node: &mut Bson,
    field_name: Option<&str>,
    get_redacted_value: &dyn Fn(&Bson) -> String,
    redact_fields: &[&str],
    path: &str,
) {
    match node {
        Bson::Document(doc) => {
            let keys: Vec<String> = doc.keys().cloned().collect();
            for key in keys {
                if let Some(child) = doc.get_mut(&key) {
                    redact_child(
                        child,
                        Some(key.as_str()),
                        get_redacted_value,
                        redact_fields,
                        path,
                        false,
                    );
                }
            }
        }
        Bson::Array(items) => {
            for child in items.iter_mut() {
                redact_child(child, None, get_redacted_value, redact_fields, path, true);
            }
        }
        other => redact_value(other, field_name, get_redacted_value),
    }
}

fn redact_child(
    child: &mut Bson,
    field_name: Option<&str>,
    get_redacted_value: &dyn Fn(&Bson) -> String,
    redact_fields: &[&str],
    path: &str,
    parent_is_array: bool,
) {
    let child_is_container = matches!(child, Bson::Document(_) | Bson::Array(_));

    // Container members of arrays tunnel through with the parent's path.
    if parent_is_array && child_is_container {
        return redact_node(child, field_name, get_redacted_value, redact_fields, path);
    }

    // A complete match redacts everything below.
    if matches_fully(redact_fields, path) {
        return redact_node(child, field_name, get_redacted_value, redact_fields, path);
    }

    if let Some(name) = field_name {
        if let Some(next_path) = extend_path(redact_fields, path, name) {
            redact_node(
                child,
                Some(name),
                get_redacted_value,
                redact_fields,
                &next_path,
            );
        }
    }
}

fn matches_fully(redact_fields: &[&str], path: &str) -> bool {
    redact_fields.is_empty() || redact_fields.iter().any(|field| *field == path)
}

/// Extends `path` by `name` if the result is itself a listed field or a prefix of one.
fn extend_path(redact_fields: &[&str], path: &str, name: &str) -> Option<String> {
    let candidate = if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    };
    let matched = redact_fields.iter().any(|field| {
        *field == candidate
            || field
                .strip_prefix(candidate.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    });
    matched.then_some(candidate)
}
