//! The pooled-connection interface the command runner leases connections from, and the
//! guard that returns them.

use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use bson::DateTime;

use crate::{address::ServerAddress, conn::Connection, error::Result};

/// A pool of connections to remote nodes, shared by every concurrent caller of the
/// runner. Implementations must support concurrent lease and return.
pub trait ConnectionPool: Send + Sync {
    /// Leases a connection to `target`, waiting at most `timeout`. `None` waits without
    /// bound.
    fn lease(
        &self,
        target: &ServerAddress,
        leased_at: DateTime,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>>;

    /// Returns a leased connection. `completed_at` is the instant the operation on it
    /// finished, used by the pool for connection aging and health policies, or `None`
    /// if the connection is being returned on a failure path.
    fn release(&self, connection: Box<dyn Connection>, completed_at: Option<DateTime>);

    /// Force-closes every connection currently leased out of the pool.
    fn close_all_in_use_connections(&self);
}

/// Owns a leased connection for the duration of one command.
///
/// Returned to the pool with a completion instant via [`Lease::done`], or without one
/// when dropped on a failure path.
pub(crate) struct Lease<'a> {
    pool: &'a dyn ConnectionPool,
    conn: Option<Box<dyn Connection>>,
}

impl<'a> Lease<'a> {
    pub(crate) fn acquire(
        pool: &'a dyn ConnectionPool,
        target: &ServerAddress,
        leased_at: DateTime,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let conn = pool.lease(target, leased_at, timeout)?;
        Ok(Self {
            pool,
            conn: Some(conn),
        })
    }

    pub(crate) fn done(mut self, completed_at: DateTime) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, Some(completed_at));
        }
    }
}

impl Deref for Lease<'_> {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection lease already released")
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection lease already released")
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, None);
        }
    }
}
