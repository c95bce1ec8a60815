//! Translation of `find` and `getMore` commands onto the legacy cursor protocol, for
//! peers that predate the command protocol.
//!
//! Both adapters share a uniform contract: they always produce a command-style reply
//! document alongside a status, so "command failed" and "command succeeded with an
//! empty reply" stay distinguishable by the status, never by document shape alone.

pub(crate) mod find;
pub(crate) mod get_more;

use bson::{doc, Bson, Document};

use crate::{
    conn::CursorHandle,
    error::{CommandError, Error, UNKNOWN_ERROR_CODE},
};

/// What the first batch of a legacy cursor reply contained: documents, or an error the
/// peer embedded in the payload instead of failing the transport.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CursorOutcome {
    /// The documents buffered in the current batch, in arrival order.
    Batch(Vec<Document>),
    /// An error rode inside the first batch as a `{$err, code}` document.
    EmbeddedError(CommandError),
}

/// Checks the cursor for an embedded error before draining whatever the current batch
/// has buffered. Never issues another round trip.
pub(crate) fn read_first_batch(cursor: &mut dyn CursorHandle) -> CursorOutcome {
    if let Some(error) = cursor.peek_embedded_error() {
        let code = match error.get("code") {
            Some(Bson::Int32(code)) => *code,
            Some(Bson::Int64(code)) => *code as i32,
            Some(Bson::Double(code)) => *code as i32,
            _ => UNKNOWN_ERROR_CODE,
        };
        let message = error.get_str("$err").unwrap_or_default().to_string();
        return CursorOutcome::EmbeddedError(CommandError::new(code, message));
    }

    let mut batch = Vec::new();
    while cursor.has_more_in_batch() {
        match cursor.next() {
            Some(doc) => batch.push(doc),
            None => break,
        }
    }
    CursorOutcome::Batch(batch)
}

/// Renders an error as a command reply document, the way the remote server itself
/// reports a failed command.
pub(crate) fn command_result_from_error(error: &Error) -> Document {
    doc! { "ok": 0.0, "errmsg": error.to_string(), "code": error.code() }
}

/// Wraps a drained batch into a command-style cursor response. `batch_field` is
/// `firstBatch` for replies to `find` and `nextBatch` for replies to `getMore`.
pub(crate) fn cursor_reply(
    cursor_id: i64,
    ns: &str,
    batch: Vec<Document>,
    batch_field: &str,
) -> Document {
    let mut cursor = doc! { "id": cursor_id, "ns": ns };
    cursor.insert(
        batch_field,
        batch.into_iter().map(Bson::Document).collect::<Vec<_>>(),
    );
    doc! { "cursor": cursor, "ok": 1.0 }
}

#[cfg(test)]
mod test {
    use bson::doc;
    use pretty_assertions::assert_eq;

    use super::{read_first_batch, CursorOutcome};
    use crate::{error::CommandError, test::MockCursor};

    #[test]
    fn embedded_error_with_numeric_code() {
        let mut cursor = MockCursor::error(doc! { "$err": "boom", "code": 17 });
        assert_eq!(
            read_first_batch(&mut cursor),
            CursorOutcome::EmbeddedError(CommandError::new(17, "boom"))
        );
    }

    #[test]
    fn embedded_error_without_a_numeric_code_defaults_to_unknown() {
        let mut cursor = MockCursor::error(doc! { "$err": "boom", "code": "nope" });
        assert_eq!(
            read_first_batch(&mut cursor),
            CursorOutcome::EmbeddedError(CommandError::new(8, "boom"))
        );

        let mut cursor = MockCursor::error(doc! { "$err": "boom" });
        assert_eq!(
            read_first_batch(&mut cursor),
            CursorOutcome::EmbeddedError(CommandError::new(8, "boom"))
        );
    }

    #[test]
    fn batches_drain_in_order() {
        let mut cursor = MockCursor::batch(0, vec![doc! { "x": 1 }, doc! { "x": 2 }]);
        assert_eq!(
            read_first_batch(&mut cursor),
            CursorOutcome::Batch(vec![doc! { "x": 1 }, doc! { "x": 2 }])
        );
    }

    #[test]
    fn cursor_reply_shape() {
        let reply = super::cursor_reply(99, "db.coll", vec![doc! { "x": 1 }], "firstBatch");
        assert_eq!(
            reply,
            doc! {
                "cursor": { "id": 99_i64, "ns": "db.coll", "firstBatch": [{ "x": 1 }] },
                "ok": 1.0,
            }
        );
    }
}
