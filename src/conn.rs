//! The narrow connection-layer interface the command runner drives. Socket management,
//! handshakes, and the wire encoding behind these methods belong to implementations.

use bitflags::bitflags;
use bson::Document;

use crate::{address::ServerAddress, command::CommandReply, error::Result};

bitflags! {
    /// Options for a legacy query operation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct QueryFlags: i32 {
        /// Keep the cursor open after the last data is returned.
        const TAILABLE_CURSOR   = 0b0000_0010;
        /// Allow the query to run against a secondary.
        const SLAVE_OK          = 0b0000_0100;
        /// Internal flag for oplog tailing.
        const OPLOG_REPLAY      = 0b0000_1000;
        /// Keep an idle cursor alive rather than timing it out.
        const NO_CURSOR_TIMEOUT = 0b0001_0000;
        /// Block for a while for more data instead of returning an empty batch.
        const AWAIT_DATA        = 0b0010_0000;
        /// Stream multiple batches without waiting for get-more requests.
        const EXHAUST           = 0b0100_0000;
        /// Return partial results if some shards are down.
        const PARTIAL           = 0b1000_0000;
    }
}

/// A find command translated into the shape of a legacy query operation.
#[derive(Clone, Debug, PartialEq)]
pub struct LegacyQuery {
    /// The full namespace the query targets.
    pub ns: String,

    /// The query document: the filter, wrapped together with any `$`-modifiers.
    pub query: Document,

    /// Number of documents to return. Negative requests a single batch with no cursor
    /// retained, per the legacy convention.
    pub n_to_return: i32,

    /// Number of documents to skip.
    pub n_to_skip: i32,

    /// The field selector limiting what each returned document contains.
    pub fields: Option<Document>,

    /// Legacy query options.
    pub flags: QueryFlags,

    /// The batch size for the resulting cursor, `0` for the server default.
    pub batch_size: i32,
}

/// A single leased connection to a remote node.
///
/// Implementations report the wire version range negotiated with their peer so the
/// runner can decide, per connection, whether the peer speaks the command protocol.
pub trait Connection: Send {
    /// The address of the server this connection is talking to.
    fn server_address(&self) -> &ServerAddress;

    /// The minimum wire version the peer advertised for this connection.
    fn min_wire_version(&self) -> i32;

    /// The maximum wire version the peer advertised for this connection.
    fn max_wire_version(&self) -> i32;

    /// Sends `command` over the native command channel and returns the reply and reply
    /// metadata documents.
    fn run_command_with_metadata(
        &mut self,
        db: &str,
        command_name: &str,
        metadata: &Document,
        command: &Document,
    ) -> Result<CommandReply>;

    /// Issues a legacy query, yielding a cursor handle positioned on the first batch,
    /// or `None` if the connection could not produce one.
    fn query(&mut self, query: LegacyQuery) -> Result<Option<Box<dyn CursorHandle>>>;

    /// Issues a legacy get-more against an existing cursor, yielding a cursor handle
    /// positioned on the returned batch, or `None` if the connection could not produce
    /// one.
    fn get_more(
        &mut self,
        ns: &str,
        cursor_id: i64,
        batch_size: i32,
    ) -> Result<Option<Box<dyn CursorHandle>>>;
}

/// A handle on a legacy cursor opened against a remote node.
pub trait CursorHandle {
    /// Detaches the handle from the connection's ownership: dropping it afterwards must
    /// not kill the remote cursor.
    fn detach(&mut self);

    /// Whether the current batch still holds buffered documents.
    fn has_more_in_batch(&self) -> bool;

    /// The next buffered document of the current batch. Must not perform a network
    /// round trip; `None` once the batch is exhausted.
    fn next(&mut self) -> Option<Document>;

    /// The error document the peer embedded in the first batch, if it signaled one
    /// instead of failing the transport.
    fn peek_embedded_error(&self) -> Option<Document>;

    /// The id of the remote cursor; `0` when the server retained none.
    fn cursor_id(&self) -> i64;
}
