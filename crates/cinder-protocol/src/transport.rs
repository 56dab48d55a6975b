//! # Transports
//!
//! A transport delivers whole messages. It knows how to wait for one message
//! for a relative amount of time; [`message_with_deadline`] turns that into
//! an absolute deadline with retry on interruption.

use std::time::Instant;

use tracing::{debug, trace};

use crate::deadline::{Deadline, ExpiredPolicy};
use crate::error::{ProtocolError, ProtocolResult, TransportError};

/// A received message
pub type Message = Vec<u8>;

/// How long a single receive attempt may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait
{
    /// Return immediately if nothing is queued
    NonBlocking,
    /// Block until a message arrives
    Forever,
    /// Block at most this long (never zero)
    For(std::time::Duration),
}

/// One side of a message channel
pub trait MessageTransport
{
    /// Receive one message, blocking as `wait` allows
    ///
    /// ## Errors
    ///
    /// - `Interrupted`: the wait was cut short; the caller may retry
    /// - `TimedOut`: nothing arrived in time (or nothing is queued, for
    ///   `NonBlocking`)
    /// - `Disconnected` / `Io`: the transport is unusable
    fn exchange(&mut self, wait: Wait) -> Result<Message, TransportError>;
}

/// Receive one message before `deadline`
///
/// Interruptions are retried transparently. Each retry waits only for the
/// time still left before the deadline, so the total wait never exceeds the
/// caller's budget.
///
/// When an absolute deadline has already passed, `policy` decides whether a
/// single non-blocking attempt is still made. Any interruption after the
/// deadline has passed ends the exchange with [`ProtocolError::TimedOut`].
///
/// ## Errors
///
/// - [`ProtocolError::TimedOut`]: no message before the deadline
/// - [`ProtocolError::Transport`]: the transport failed
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use cinder_protocol::{message_with_deadline, ChannelTransport, Deadline, ExpiredPolicy};
///
/// let (sender, mut transport) = ChannelTransport::pair();
/// sender.send(b"ping".to_vec()).unwrap();
///
/// let deadline = Deadline::from_timeout(Duration::from_secs(1));
/// let message = message_with_deadline(&mut transport, deadline, ExpiredPolicy::TimeOut)?;
/// assert_eq!(message, b"ping");
/// # Ok::<(), cinder_protocol::ProtocolError>(())
/// ```
pub fn message_with_deadline<T>(transport: &mut T, deadline: Deadline, policy: ExpiredPolicy) -> ProtocolResult<Message>
where
    T: MessageTransport + ?Sized,
{
    let mut attempts = 0u32;
    loop {
        let wait = match deadline {
            Deadline::NonBlocking => Wait::NonBlocking,
            Deadline::WaitIndefinitely => Wait::Forever,
            Deadline::At(_) => match deadline.remaining_at(Instant::now()) {
                Some(left) if !left.is_zero() => Wait::For(left),
                _ if attempts == 0 && policy == ExpiredPolicy::RunOnce => Wait::NonBlocking,
                _ => {
                    debug!(attempts, "deadline expired before a message arrived");
                    return Err(ProtocolError::TimedOut);
                }
            },
        };

        attempts += 1;
        match transport.exchange(wait) {
            Ok(message) => {
                trace!(attempts, bytes = message.len(), "message received");
                return Ok(message);
            }
            Err(TransportError::Interrupted) => {
                trace!(attempts, ?wait, "receive interrupted, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;

    /// Replays a fixed script of outcomes and records every wait it was asked for
    struct Scripted
    {
        outcomes: VecDeque<Result<Message, TransportError>>,
        waits: Vec<Wait>,
        delay: Duration,
    }

    impl Scripted
    {
        fn new(outcomes: Vec<Result<Message, TransportError>>) -> Self
        {
            Self {
                outcomes: outcomes.into(),
                waits: Vec::new(),
                delay: Duration::ZERO,
            }
        }
    }

    impl MessageTransport for Scripted
    {
        fn exchange(&mut self, wait: Wait) -> Result<Message, TransportError>
        {
            self.waits.push(wait);
            std::thread::sleep(self.delay);
            self.outcomes.pop_front().unwrap_or(Err(TransportError::TimedOut))
        }
    }

    #[test]
    fn test_interruptions_are_retried()
    {
        let mut transport = Scripted::new(vec![
            Err(TransportError::Interrupted),
            Err(TransportError::Interrupted),
            Ok(b"done".to_vec()),
        ]);
        let message = message_with_deadline(&mut transport, Deadline::WaitIndefinitely, ExpiredPolicy::TimeOut).unwrap();
        assert_eq!(message, b"done");
        assert_eq!(transport.waits, [Wait::Forever, Wait::Forever, Wait::Forever]);
    }

    #[test]
    fn test_retries_wait_only_for_the_remaining_time()
    {
        let mut transport = Scripted::new(vec![Err(TransportError::Interrupted), Ok(Vec::new())]);
        transport.delay = Duration::from_millis(30);
        let budget = Duration::from_secs(5);
        message_with_deadline(&mut transport, Deadline::from_timeout(budget), ExpiredPolicy::TimeOut).unwrap();

        let [Wait::For(first), Wait::For(second)] = transport.waits[..]
        else {
            panic!("unexpected waits {:?}", transport.waits);
        };
        assert!(first <= budget);
        assert!(second <= first - Duration::from_millis(30));
    }

    #[test]
    fn test_expired_deadline_times_out_without_attempt()
    {
        let mut transport = Scripted::new(vec![Ok(b"queued".to_vec())]);
        let err = message_with_deadline(&mut transport, Deadline::At(Instant::now()), ExpiredPolicy::TimeOut).unwrap_err();
        assert!(matches!(err, ProtocolError::TimedOut));
        assert!(transport.waits.is_empty());
    }

    #[test]
    fn test_expired_deadline_runs_once_when_asked()
    {
        let mut transport = Scripted::new(vec![Ok(b"queued".to_vec())]);
        let message = message_with_deadline(&mut transport, Deadline::At(Instant::now()), ExpiredPolicy::RunOnce).unwrap();
        assert_eq!(message, b"queued");
        assert_eq!(transport.waits, [Wait::NonBlocking]);
    }

    #[test]
    fn test_interruption_after_expiry_times_out()
    {
        let mut transport = Scripted::new(vec![Err(TransportError::Interrupted), Ok(b"late".to_vec())]);
        let err = message_with_deadline(&mut transport, Deadline::At(Instant::now()), ExpiredPolicy::RunOnce).unwrap_err();
        assert!(matches!(err, ProtocolError::TimedOut));
        assert_eq!(transport.waits.len(), 1);
    }

    #[test]
    fn test_transport_timeout_maps_to_timed_out()
    {
        let mut transport = Scripted::new(vec![Err(TransportError::TimedOut)]);
        let err = message_with_deadline(&mut transport, Deadline::NonBlocking, ExpiredPolicy::TimeOut).unwrap_err();
        assert!(matches!(err, ProtocolError::TimedOut));
    }

    #[test]
    fn test_disconnect_is_reported()
    {
        let mut transport = Scripted::new(vec![Err(TransportError::Disconnected)]);
        let err = message_with_deadline(&mut transport, Deadline::WaitIndefinitely, ExpiredPolicy::TimeOut).unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(TransportError::Disconnected)));
    }
}
