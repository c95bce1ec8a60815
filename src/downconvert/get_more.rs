use bson::Document;
use serde::Deserialize;

use super::{command_result_from_error, cursor_reply, read_first_batch, CursorOutcome};
use crate::{
    conn::Connection,
    error::{Error, ErrorKind, Result},
    ns::Namespace,
};

pub(crate) const GET_MORE_COMMAND_NAME: &str = "getMore";

/// A parsed getMore command document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetMoreCommandBody {
    get_more: i64,
    collection: String,
    batch_size: Option<i64>,
}

impl GetMoreCommandBody {
    fn validate(&self) -> Result<()> {
        if self.batch_size.is_some_and(|batch_size| batch_size <= 0) {
            return Err(Error::invalid_argument(
                "batch size for getMore must be positive",
            ));
        }
        Ok(())
    }
}

/// Downconverts a getMore command to a legacy get-more operation against the existing
/// cursor and runs it on `conn`.
///
/// Returns exactly the batch the peer has buffered; it never loops to satisfy a larger
/// requested batch size. Reply document and status follow the same uniform contract as
/// the find adapter.
pub(crate) fn run_downconverted_get_more_command(
    conn: &mut dyn Connection,
    db: &str,
    command: &Document,
) -> (Document, Result<()>) {
    match try_get_more(conn, db, command) {
        Ok(reply) => (reply, Ok(())),
        Err(error) => (command_result_from_error(&error), Err(error)),
    }
}

fn try_get_more(conn: &mut dyn Connection, db: &str, command: &Document) -> Result<Document> {
    let body: GetMoreCommandBody = bson::from_document(command.clone())?;
    body.validate()?;

    let ns = Namespace::new(db, &body.collection);
    if !ns.is_valid() {
        return Err(Error::invalid_namespace(format!(
            "invalid collection name: {}",
            ns
        )));
    }

    let batch_size = body
        .batch_size
        .unwrap_or(0)
        .clamp(0, i32::MAX as i64) as i32;
    let cursor = conn.get_more(&ns.to_string(), body.get_more, batch_size)?;
    let mut cursor = match cursor {
        Some(cursor) => cursor,
        None => return Err(Error::host_unreachable(conn.server_address())),
    };
    cursor.detach();

    match read_first_batch(cursor.as_mut()) {
        CursorOutcome::EmbeddedError(error) => Err(ErrorKind::Command(error).into()),
        CursorOutcome::Batch(batch) => Ok(cursor_reply(
            cursor.cursor_id(),
            &ns.to_string(),
            batch,
            "nextBatch",
        )),
    }
}
