//! # Deadlines
//!
//! Absolute points in time that bound a receive, plus the two sentinels
//! "don't wait" and "wait forever".
//!
//! A deadline is absolute so that retries after an interruption never extend
//! the caller's total budget: each attempt waits only for what is left.

use std::time::{Duration, Instant};

/// When a receive must give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline
{
    /// Make one attempt that does not block
    NonBlocking,
    /// Block until a message arrives
    WaitIndefinitely,
    /// Block until this instant at the latest
    At(Instant),
}

impl Deadline
{
    /// Deadline `timeout` from now
    ///
    /// A zero timeout means [`Deadline::NonBlocking`]. A timeout too large to
    /// represent as an [`Instant`] means [`Deadline::WaitIndefinitely`].
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use cinder_protocol::Deadline;
    ///
    /// assert_eq!(Deadline::from_timeout(Duration::ZERO), Deadline::NonBlocking);
    /// assert_eq!(Deadline::from_timeout(Duration::MAX), Deadline::WaitIndefinitely);
    /// assert!(matches!(Deadline::from_timeout(Duration::from_secs(1)), Deadline::At(_)));
    /// ```
    pub fn from_timeout(timeout: Duration) -> Self
    {
        if timeout.is_zero() {
            return Deadline::NonBlocking;
        }
        Instant::now()
            .checked_add(timeout)
            .map_or(Deadline::WaitIndefinitely, Deadline::At)
    }

    /// Time left before `now` passes the deadline
    ///
    /// `None` for the two sentinels, which have no remaining time.
    pub fn remaining_at(self, now: Instant) -> Option<Duration>
    {
        match self {
            Deadline::At(when) => Some(when.saturating_duration_since(now)),
            Deadline::NonBlocking | Deadline::WaitIndefinitely => None,
        }
    }

    /// Whether an absolute deadline has passed
    pub fn is_expired(self) -> bool
    {
        self.remaining_at(Instant::now()).is_some_and(|left| left.is_zero())
    }
}

/// What to do when an absolute deadline has already passed on entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiredPolicy
{
    /// Still make one non-blocking attempt, picking up anything already queued
    RunOnce,
    /// Fail with a timeout without touching the transport
    #[default]
    TimeOut,
}

impl ExpiredPolicy
{
    /// `RunOnce` when `run_even_if_expired` is set
    pub fn from_flag(run_even_if_expired: bool) -> Self
    {
        if run_even_if_expired {
            ExpiredPolicy::RunOnce
        } else {
            ExpiredPolicy::TimeOut
        }
    }
}
