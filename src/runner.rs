//! Runs commands against remote nodes over pooled connections, enforcing request
//! deadlines and downgrading `find`/`getMore` to the legacy cursor protocol when the
//! peer on the leased connection predates the command protocol.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use bson::{DateTime, Document};

use crate::{
    clock::{Clock, SystemClock},
    command::{CommandRequest, CommandResponse},
    current_op::{duration_between, CurrentOperation, ExecutionContext},
    downconvert::{
        find::{run_downconverted_find_command, FIND_COMMAND_NAME},
        get_more::{run_downconverted_get_more_command, GET_MORE_COMMAND_NAME},
    },
    error::{ErrorKind, Result},
    pool::{ConnectionPool, Lease},
    protocol::supports_command_protocol,
    trace::{
        serialize_command_for_logging, TracingRepresentation, COMMAND_TRACING_EVENT_TARGET,
    },
};

/// Calculates the timeout for a network operation expiring at `expire_at`, given that
/// it is now `now`.
///
/// Returns `None` to indicate no expiration date, the time remaining until `expire_at`,
/// or `ExceededTimeLimit` if `expire_at` is not later than `now`.
pub(crate) fn remaining_timeout(
    expire_at: Option<DateTime>,
    now: DateTime,
) -> Result<Option<Duration>> {
    let expire_at = match expire_at {
        Some(date) => date,
        None => return Ok(None),
    };
    if expire_at <= now {
        let expiration = expire_at
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| expire_at.to_string());
        return Err(ErrorKind::ExceededTimeLimit {
            message: format!(
                "went to run command, but it was too late: expiration was set to {}",
                expiration
            ),
        }
        .into());
    }
    Ok(Some(duration_between(now, expire_at)))
}

/// Executes one command per call against a remote node: leases a connection bounded by
/// the request's deadline, picks the protocol path, and packages the reply with timing
/// metadata. Failures are translated at this boundary; retrying is the caller's
/// business.
///
/// The runner has a two-phase lifecycle: [`CommandRunner::startup`] marks it active and
/// [`CommandRunner::shutdown`] (idempotent) force-closes in-use connections and marks it
/// inactive. Callers must not run commands after shutdown, and an active runner must be
/// shut down before it is dropped.
pub struct CommandRunner<P: ConnectionPool> {
    pool: P,
    clock: Arc<dyn Clock>,
    active: AtomicBool,
}

impl<P: ConnectionPool> CommandRunner<P> {
    /// Creates an inactive runner drawing connections from `pool`.
    pub fn new(pool: P) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Creates an inactive runner with an explicit time source.
    pub fn with_clock(pool: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            active: AtomicBool::new(false),
        }
    }

    /// Marks the runner active.
    pub fn startup(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Force-closes every in-use connection in the pool and marks the runner inactive.
    /// Calling it again has no effect.
    pub fn shutdown(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.pool.close_all_in_use_connections();
        }
    }

    /// Runs `request`'s command on its target node and returns the reply documents
    /// together with the wall-clock duration of the attempt. One attempt per call.
    pub fn run_command(&self, request: &CommandRequest) -> Result<CommandResponse> {
        self.execute(request)
            .map_err(|error| error.with_command_context(request))
    }

    /// Like [`CommandRunner::run_command`], but tracks the attempt as an operation on
    /// the caller-owned `context` while it is in flight.
    pub fn run_command_with_context(
        &self,
        context: &ExecutionContext,
        request: &CommandRequest,
    ) -> Result<CommandResponse> {
        let now = self.clock.now();
        let mut op = CurrentOperation::new(
            request.command_name(),
            request.db.as_str(),
            request.target.clone(),
        );
        if let Ok(Some(timeout)) = remaining_timeout(request.expire_at, now) {
            op.set_max_time(timeout);
        }
        op.ensure_started(now);
        context.push(op);

        let result = self.run_command(request);

        if let Some(mut op) = context.pop() {
            let end = self.clock.now();
            op.done(end);
            tracing::debug!(
                target: COMMAND_TRACING_EVENT_TARGET,
                commandName = op.command_name(),
                durationMS = op.elapsed(end).as_millis() as u64,
                "Operation complete"
            );
        }
        result
    }

    fn execute(&self, request: &CommandRequest) -> Result<CommandResponse> {
        let start = self.clock.now();
        // Computed before acquisition so time spent queued for a connection cannot
        // silently eat into the command's own budget; the lease itself is bounded by
        // the same timeout.
        let timeout = remaining_timeout(request.expire_at, start)?;

        let command_name = request.command_name();
        tracing::debug!(
            target: COMMAND_TRACING_EVENT_TARGET,
            command = serialize_command_for_logging(&request.command, command_name),
            databaseName = request.db.as_str(),
            commandName = command_name,
            serverHost = request.target.hostname.as_str(),
            serverPort = request.target.port,
            "Command started"
        );

        let mut conn = Lease::acquire(&self.pool, &request.target, start, timeout)?;

        // An empty command document yields an empty command name and takes the native
        // path, like any other non-find, non-getMore command.
        let is_find = command_name == FIND_COMMAND_NAME;
        let is_get_more = command_name == GET_MORE_COMMAND_NAME;

        // Queried on the leased connection each time: the pool may hold connections to
        // peers at different wire versions mid-upgrade.
        let supports_commands =
            supports_command_protocol(conn.min_wire_version(), conn.max_wire_version());

        let outcome = if (!is_find && !is_get_more) || supports_commands {
            conn.run_command_with_metadata(
                &request.db,
                command_name,
                &request.metadata,
                &request.command,
            )
            .map(|reply| (reply.body, reply.metadata))
        } else if is_find {
            let (reply, status) =
                run_downconverted_find_command(&mut **conn, &request.db, &request.command);
            status.map(|()| (reply, Document::new()))
        } else {
            let (reply, status) =
                run_downconverted_get_more_command(&mut **conn, &request.db, &request.command);
            status.map(|()| (reply, Document::new()))
        };

        let end = self.clock.now();
        match outcome {
            Ok((reply, metadata)) => {
                conn.done(end);
                tracing::debug!(
                    target: COMMAND_TRACING_EVENT_TARGET,
                    reply = serialize_command_for_logging(&reply, command_name),
                    commandName = command_name,
                    durationMS = duration_between(start, end).as_millis() as u64,
                    "Command succeeded"
                );
                Ok(CommandResponse {
                    reply,
                    metadata,
                    elapsed: duration_between(start, end),
                })
            }
            Err(error) => {
                tracing::debug!(
                    target: COMMAND_TRACING_EVENT_TARGET,
                    failure = error.tracing_representation(),
                    commandName = command_name,
                    durationMS = duration_between(start, end).as_millis() as u64,
                    "Command failed"
                );
                // The lease drops here, returning the connection without a completion
                // instant.
                Err(error)
            }
        }
    }
}

impl<P: ConnectionPool> Drop for CommandRunner<P> {
    fn drop(&mut self) {
        assert!(
            !self.active.load(Ordering::SeqCst),
            "command runner dropped while still active"
        );
    }
}
