//! A client-side remote command execution layer for MongoDB wire-protocol
//! deployments. It uses the [`bson`] crate for document support.
//!
//! A [`CommandRunner`] sends one command per call to a remote node over a connection
//! leased from a [`ConnectionPool`], bounded by the request's deadline. When the peer
//! on the leased connection predates the unified command protocol, `find` and `getMore`
//! requests are transparently downgraded to the legacy cursor protocol and their
//! replies re-encoded as command-style cursor responses; every other command, and every
//! command sent to an up-to-date peer, takes the native command channel.
//!
//! The pool, connections, cursors, and clock are consumed through narrow traits, so the
//! runner is independent of socket management and of the legacy protocol's wire bytes.
//!
//! # Example
//! ```no_run
//! # fn demo(pool: impl remote_command::ConnectionPool) -> remote_command::error::Result<()> {
//! use remote_command::{bson::doc, CommandRequest, CommandRunner, ServerAddress};
//!
//! let runner = CommandRunner::new(pool);
//! runner.startup();
//!
//! let request = CommandRequest::builder()
//!     .target(ServerAddress::new("db1.example.com", 27017))
//!     .db("inventory")
//!     .command(doc! { "find": "parts", "filter": { "qty": { "$gt": 0 } } })
//!     .build();
//! let response = runner.run_command(&request)?;
//! println!("reply in {:?}: {}", response.elapsed, response.reply);
//!
//! runner.shutdown();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use ::bson;

mod address;
mod clock;
mod command;
mod conn;
mod current_op;
mod downconvert;
pub mod error;
mod ns;
mod pool;
mod protocol;
pub mod redact;
mod runner;
mod trace;

pub use crate::{
    address::{ServerAddress, DEFAULT_PORT},
    clock::{Clock, SystemClock},
    command::{CommandReply, CommandRequest, CommandResponse},
    conn::{Connection, CursorHandle, LegacyQuery, QueryFlags},
    current_op::{CurrentOperation, ExecutionContext, OperationSummary},
    ns::Namespace,
    pool::ConnectionPool,
    runner::CommandRunner,
};
