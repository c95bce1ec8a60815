//! Per-operation bookkeeping: which operations an execution context currently has in
//! flight, how long each has been running, and whether a soft time limit has passed.

use std::{sync::Mutex, time::Duration};

use bson::DateTime;

use crate::address::ServerAddress;

/// A client-side execution context. It owns the stack of operations currently running
/// on its behalf; nested operations push onto and pop off of the stack under the
/// context's own lock.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    ops: Mutex<Vec<CurrentOperation>>,
}

impl ExecutionContext {
    /// Creates a context with no operations in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an operation onto the stack, returning its depth.
    pub fn push(&self, op: CurrentOperation) -> usize {
        let mut ops = self.ops.lock().unwrap();
        ops.push(op);
        ops.len() - 1
    }

    /// Pops the innermost operation off the stack.
    pub fn pop(&self) -> Option<CurrentOperation> {
        self.ops.lock().unwrap().pop()
    }

    /// The number of operations currently in flight.
    pub fn depth(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    /// Runs `f` against the innermost operation, if any.
    pub fn with_top<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut CurrentOperation) -> R,
    {
        self.ops.lock().unwrap().last_mut().map(f)
    }

    /// Summaries of every operation in flight, outermost first.
    pub fn active_operations(&self, now: DateTime) -> Vec<OperationSummary> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .map(|op| OperationSummary {
                command_name: op.command_name.clone(),
                db: op.db.clone(),
                target: op.target.clone(),
                running_for: op.elapsed(now),
            })
            .collect()
    }
}

/// A point-in-time view of one in-flight operation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct OperationSummary {
    /// The name of the command being run.
    pub command_name: String,
    /// The database it runs against.
    pub db: String,
    /// The node it was sent to.
    pub target: ServerAddress,
    /// How long it has been running.
    pub running_for: Duration,
}

/// Bookkeeping for a single operation: identity, start/end instants, and an optional
/// soft time limit.
#[derive(Clone, Debug)]
pub struct CurrentOperation {
    command_name: String,
    db: String,
    target: ServerAddress,
    start: Option<DateTime>,
    end: Option<DateTime>,
    max_time: Option<Duration>,
    deadline: Option<DateTime>,
}

impl CurrentOperation {
    /// Creates a record for an operation that has not started running yet.
    pub fn new(
        command_name: impl Into<String>,
        db: impl Into<String>,
        target: ServerAddress,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            db: db.into(),
            target,
            start: None,
            end: None,
            max_time: None,
            deadline: None,
        }
    }

    /// The name of the command being run.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// The database the operation runs against.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// The node the operation was sent to.
    pub fn target(&self) -> &ServerAddress {
        &self.target
    }

    /// Marks the operation as started at `now`. Idempotent: later calls keep the first
    /// start instant. If a time limit was set before the start, the deadline is armed
    /// here.
    pub fn ensure_started(&mut self, now: DateTime) {
        if self.start.is_none() {
            self.start = Some(now);
            if let Some(max_time) = self.max_time {
                self.deadline = Some(add_duration(now, max_time));
            }
        }
    }

    /// Whether the operation has started running.
    pub fn started(&self) -> bool {
        self.start.is_some()
    }

    /// Fixes the end instant of the operation.
    pub fn done(&mut self, now: DateTime) {
        self.end = Some(now);
    }

    /// Whether the operation has finished.
    pub fn is_done(&self) -> bool {
        self.end.is_some()
    }

    /// How long the operation ran: end minus start once done, `now` minus start while
    /// running, zero before it starts.
    pub fn elapsed(&self, now: DateTime) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => duration_between(start, end),
            (Some(start), None) => duration_between(start, now),
            (None, _) => Duration::ZERO,
        }
    }

    /// Sets the soft time limit for the operation. A zero duration clears the limit.
    /// If the operation has already started, the deadline is armed immediately;
    /// otherwise [`CurrentOperation::ensure_started`] arms it.
    pub fn set_max_time(&mut self, max_time: Duration) {
        if max_time.is_zero() {
            self.max_time = None;
            self.deadline = None;
            return;
        }
        self.max_time = Some(max_time);
        if let Some(start) = self.start {
            self.deadline = Some(add_duration(start, max_time));
        }
    }

    /// Whether a time limit is set.
    pub fn has_max_time(&self) -> bool {
        self.max_time.is_some()
    }

    /// Whether the armed time limit has passed.
    pub fn max_time_expired(&self, now: DateTime) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }

    /// Time remaining before the limit passes. `None` means the operation may run
    /// indefinitely; zero means the limit has already passed.
    pub fn time_remaining(&self, now: DateTime) -> Option<Duration> {
        self.deadline.map(|deadline| {
            if deadline <= now {
                Duration::ZERO
            } else {
                duration_between(now, deadline)
            }
        })
    }
}

fn add_duration(instant: DateTime, duration: Duration) -> DateTime {
    DateTime::from_millis(
        instant
            .timestamp_millis()
            .saturating_add(duration.as_millis().min(i64::MAX as u128) as i64),
    )
}

pub(crate) fn duration_between(start: DateTime, end: DateTime) -> Duration {
    Duration::from_millis(
        end.timestamp_millis()
            .saturating_sub(start.timestamp_millis())
            .max(0) as u64,
    )
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use bson::DateTime;

    use super::{CurrentOperation, ExecutionContext};
    use crate::address::ServerAddress;

    fn millis(m: i64) -> DateTime {
        DateTime::from_millis(m)
    }

    fn op(name: &str) -> CurrentOperation {
        CurrentOperation::new(name, "db", ServerAddress::new("localhost", None))
    }

    #[test]
    fn the_stack_is_last_in_first_out() {
        let context = ExecutionContext::new();
        assert_eq!(context.push(op("outer")), 0);
        assert_eq!(context.push(op("inner")), 1);
        assert_eq!(context.depth(), 2);

        assert_eq!(
            context.with_top(|op| op.command_name().to_string()),
            Some("inner".to_string())
        );

        assert_eq!(context.pop().unwrap().command_name(), "inner");
        assert_eq!(context.pop().unwrap().command_name(), "outer");
        assert!(context.pop().is_none());
    }

    #[test]
    fn elapsed_tracks_start_and_end() {
        let mut op = op("find");
        assert_eq!(op.elapsed(millis(500)), Duration::ZERO);

        op.ensure_started(millis(1_000));
        assert!(op.started());
        assert_eq!(op.elapsed(millis(1_250)), Duration::from_millis(250));

        // A second start does not move the first one.
        op.ensure_started(millis(2_000));
        assert_eq!(op.elapsed(millis(1_250)), Duration::from_millis(250));

        op.done(millis(1_400));
        assert!(op.is_done());
        assert_eq!(op.elapsed(millis(9_999)), Duration::from_millis(400));
    }

    #[test]
    fn a_limit_set_before_start_is_armed_at_start() {
        let mut op = op("find");
        op.set_max_time(Duration::from_millis(100));
        assert!(!op.max_time_expired(millis(10_000)));

        op.ensure_started(millis(1_000));
        assert!(!op.max_time_expired(millis(1_099)));
        assert!(op.max_time_expired(millis(1_100)));
        assert!(op.max_time_expired(millis(1_500)));
    }

    #[test]
    fn a_limit_set_after_start_is_armed_immediately() {
        let mut op = op("find");
        op.ensure_started(millis(1_000));
        op.set_max_time(Duration::from_millis(50));
        assert!(!op.max_time_expired(millis(1_049)));
        assert!(op.max_time_expired(millis(1_050)));
    }

    #[test]
    fn a_zero_limit_clears_the_tracker() {
        let mut op = op("find");
        op.ensure_started(millis(1_000));
        op.set_max_time(Duration::from_millis(50));
        op.set_max_time(Duration::ZERO);
        assert!(!op.has_max_time());
        assert!(!op.max_time_expired(millis(999_999)));
        assert_eq!(op.time_remaining(millis(999_999)), None);
    }

    #[test]
    fn time_remaining_saturates_at_zero() {
        let mut op = op("find");
        op.ensure_started(millis(1_000));
        assert_eq!(op.time_remaining(millis(1_000)), None);

        op.set_max_time(Duration::from_millis(100));
        assert_eq!(
            op.time_remaining(millis(1_040)),
            Some(Duration::from_millis(60))
        );
        assert_eq!(op.time_remaining(millis(5_000)), Some(Duration::ZERO));
    }

    #[test]
    fn active_operations_summarize_the_stack() {
        let context = ExecutionContext::new();
        let mut outer = op("find");
        outer.ensure_started(millis(1_000));
        context.push(outer);

        let summaries = context.active_operations(millis(1_300));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].command_name, "find");
        assert_eq!(summaries[0].db, "db");
        assert_eq!(summaries[0].running_for, Duration::from_millis(300));
    }
}
