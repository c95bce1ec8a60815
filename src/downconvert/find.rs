use bson::{doc, Bson, Document};
use serde::Deserialize;

use super::{command_result_from_error, cursor_reply, read_first_batch, CursorOutcome};
use crate::{
    conn::{Connection, LegacyQuery, QueryFlags},
    error::{Error, ErrorKind, Result},
    ns::Namespace,
};

pub(crate) const FIND_COMMAND_NAME: &str = "find";

/// The find-specific fields of a find command document. The collection name itself is
/// read separately so the namespace can be validated before the rest is parsed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindCommandBody {
    filter: Option<Document>,
    sort: Option<Document>,
    projection: Option<Document>,
    hint: Option<Bson>,
    min: Option<Document>,
    max: Option<Document>,
    skip: Option<i64>,
    limit: Option<i64>,
    batch_size: Option<i64>,
    snapshot: Option<bool>,
    explain: Option<bool>,
    tailable: Option<bool>,
    await_data: Option<bool>,
    oplog_replay: Option<bool>,
    no_cursor_timeout: Option<bool>,
    allow_partial_results: Option<bool>,
}

impl FindCommandBody {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("limit", self.limit),
            ("skip", self.skip),
            ("batchSize", self.batch_size),
        ] {
            if value.is_some_and(|value| value < 0) {
                return Err(Error::invalid_argument(format!(
                    "{} value for find must be non-negative",
                    name
                )));
            }
        }
        Ok(())
    }

    fn has_modifiers(&self) -> bool {
        self.sort.is_some()
            || self.hint.is_some()
            || self.min.is_some()
            || self.max.is_some()
            || self.explain == Some(true)
            || self.snapshot == Some(true)
    }

    /// Translates the parsed command into the legacy query shape. The filter is wrapped
    /// in `$query` alongside the `$`-modifiers whenever any modifier is present, and the
    /// limit is negated per the legacy single-batch convention.
    fn into_legacy_query(self, ns: &Namespace) -> LegacyQuery {
        let filter = self.filter.clone().unwrap_or_default();
        let query = if self.has_modifiers() {
            let mut query = doc! { "$query": filter };
            if let Some(ref sort) = self.sort {
                query.insert("$orderby", sort.clone());
            }
            if let Some(ref hint) = self.hint {
                query.insert("$hint", hint.clone());
            }
            if let Some(ref min) = self.min {
                query.insert("$min", min.clone());
            }
            if let Some(ref max) = self.max {
                query.insert("$max", max.clone());
            }
            if self.explain == Some(true) {
                query.insert("$explain", true);
            }
            if self.snapshot == Some(true) {
                query.insert("$snapshot", true);
            }
            query
        } else {
            filter
        };

        let mut flags = QueryFlags::empty();
        if self.tailable == Some(true) {
            flags |= QueryFlags::TAILABLE_CURSOR;
        }
        if self.await_data == Some(true) {
            flags |= QueryFlags::AWAIT_DATA;
        }
        if self.oplog_replay == Some(true) {
            flags |= QueryFlags::OPLOG_REPLAY;
        }
        if self.no_cursor_timeout == Some(true) {
            flags |= QueryFlags::NO_CURSOR_TIMEOUT;
        }
        if self.allow_partial_results == Some(true) {
            flags |= QueryFlags::PARTIAL;
        }

        LegacyQuery {
            ns: ns.to_string(),
            query,
            n_to_return: -clamp_to_i32(self.limit.unwrap_or(0)),
            n_to_skip: clamp_to_i32(self.skip.unwrap_or(0)),
            fields: self.projection,
            flags,
            batch_size: clamp_to_i32(self.batch_size.unwrap_or(0)),
        }
    }
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}

/// Downconverts a find command to a legacy query operation and runs it on `conn`.
///
/// Always produces a reply document: the cursor-style response on success, a
/// command-style error document otherwise, with the status reporting the same error.
pub(crate) fn run_downconverted_find_command(
    conn: &mut dyn Connection,
    db: &str,
    command: &Document,
) -> (Document, Result<()>) {
    match try_find(conn, db, command) {
        Ok(reply) => (reply, Ok(())),
        Err(error) => (command_result_from_error(&error), Err(error)),
    }
}

fn try_find(conn: &mut dyn Connection, db: &str, command: &Document) -> Result<Document> {
    let coll = command
        .get_str(FIND_COMMAND_NAME)
        .map_err(|_| Error::invalid_argument("the find command's collection argument must be a string"))?;
    let ns = Namespace::new(db, coll);
    if !ns.is_valid() {
        return Err(Error::invalid_namespace(format!(
            "invalid collection name: {}",
            ns
        )));
    }

    let body: FindCommandBody = bson::from_document(command.clone())?;
    body.validate()?;

    let cursor = conn.query(body.into_legacy_query(&ns))?;
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
            "firstBatch",
        )),
    }
}
