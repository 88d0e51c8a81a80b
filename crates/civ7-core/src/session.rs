//! Command/response state machine.
//!
//! The debug port has no correlation identifier: the next result frame on the
//! socket answers the oldest command that has not been answered yet. This
//! module enforces one outstanding command per connection and decides what
//! each inbound frame belongs to.
//!
//! Uses the action pattern: methods take time as input and return actions for
//! the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//!            on_connected              send
//! ┌─────────┐          ┌──────┐ ───────────────> ┌──────────┐
//! │ Offline │─────────>│ Idle │                  │ Awaiting │
//! └─────────┘          └──────┘ <─────────────── └──────────┘
//!      ^                  │      frame / timeout /     │
//!      │                  │      cancel                │
//!      └──────────────────┴────────────────────────────┘
//!                    on_disconnected
//! ```
//!
//! # Late frames
//!
//! A command that times out or is cancelled still runs remotely, and its
//! result will still arrive. Each such command adds one to a stale count; the
//! next frame is charged against that count and discarded instead of being
//! handed to whatever command was sent in the meantime. The count is cleared
//! on reconnect because a fresh socket carries no old results.
//!
//! The count has no upper bound and no expiry. If an abandoned command never
//! answers, every later result is charged against it: each command sees its
//! predecessor's result discarded, times out, and leaves a new debt behind.
//! The session stays shifted this way until the next reconnect.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use bytes::Bytes;
use civ7_proto::{Frame, encode_command};

use crate::{
    error::{ConnectionError, SessionError},
    status::SessionState,
};

/// A submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<I = Instant> {
    /// Script text as typed, without the wire prefix
    pub text: String,
    /// When the command was put on the wire
    pub submitted_at: I,
}

/// Actions returned by the session state machine.
///
/// - `SendFrame`: write these bytes to the socket
/// - `Resolved`: hand the result to whoever issued the command and record it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction<I = Instant> {
    /// Encoded frame to write to the connection
    SendFrame(Bytes),

    /// A command finished, one way or another
    Resolved {
        /// The command being resolved
        command: Command<I>,
        /// Result text, or why there is none
        result: Result<String, SessionError>,
    },
}

/// Session state machine.
///
/// Pure: no I/O, no clock. Generic over `Instant` so tests can drive time
/// explicitly.
///
/// # Invariants
///
/// - At most one command is outstanding.
/// - `state() == Awaiting` exactly when a command is outstanding.
/// - Every command accepted by [`SessionCore::send`] is resolved exactly once
///   through a `Resolved` action.
#[derive(Debug, Clone)]
pub struct SessionCore<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: SessionState,
    command_timeout: Duration,
    outstanding: Option<Command<I>>,
    /// Results still owed for commands that timed out or were cancelled
    stale: u32,
}

impl<I> SessionCore<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a session core in [`SessionState::Offline`].
    pub fn new(command_timeout: Duration) -> Self {
        Self { state: SessionState::Offline, command_timeout, outstanding: None, stale: 0 }
    }

    /// Current command state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The command awaiting its result, if any.
    pub fn outstanding(&self) -> Option<&Command<I>> {
        self.outstanding.as_ref()
    }

    /// Late results still expected from abandoned commands.
    pub fn stale_frames(&self) -> u32 {
        self.stale
    }

    /// Configured per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Transport is up.
    pub fn on_connected(&mut self) {
        debug_assert!(self.outstanding.is_none());

        self.state = SessionState::Idle;
        self.stale = 0;
    }

    /// Transport is gone. Resolves the outstanding command as
    /// `ConnectionLost`.
    pub fn on_disconnected(&mut self, error: &ConnectionError) -> Vec<SessionAction<I>> {
        self.state = SessionState::Offline;
        self.stale = 0;

        self.resolve(Err(SessionError::ConnectionLost(error.clone()))).into_iter().collect()
    }

    /// Submit a command.
    ///
    /// Returns the `SendFrame` action on success; the result arrives later as
    /// a `Resolved` action from [`SessionCore::handle_frame`],
    /// [`SessionCore::tick`], [`SessionCore::cancel`] or
    /// [`SessionCore::on_disconnected`].
    ///
    /// # Errors
    ///
    /// - `SessionError::EmptyCommand` if `text` is blank
    /// - `SessionError::Offline` if not connected
    /// - `SessionError::Busy` if a command is already outstanding
    /// - `SessionError::Protocol` if the text does not fit in a frame
    ///
    /// A rejected command leaves the state untouched.
    pub fn send(&mut self, text: &str, now: I) -> Result<Vec<SessionAction<I>>, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyCommand);
        }

        match self.state {
            SessionState::Offline => return Err(SessionError::Offline),
            SessionState::Awaiting => return Err(SessionError::Busy),
            SessionState::Idle => {},
        }

        let wire = encode_command(text)?;

        self.outstanding = Some(Command { text: text.to_string(), submitted_at: now });
        self.state = SessionState::Awaiting;

        Ok(vec![SessionAction::SendFrame(wire)])
    }

    /// Process an inbound frame.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<SessionAction<I>> {
        if !frame.is_command_traffic() {
            tracing::debug!(message_type = frame.message_type, "ignoring non-command frame");
            return Vec::new();
        }

        if self.stale > 0 {
            self.stale -= 1;
            tracing::warn!(
                len = frame.payload.len(),
                remaining = self.stale,
                "discarding late result of abandoned command"
            );
            return Vec::new();
        }

        if self.outstanding.is_none() {
            tracing::warn!(len = frame.payload.len(), "discarding unsolicited frame");
            return Vec::new();
        }

        self.resolve(Ok(frame.payload.clone())).into_iter().collect()
    }

    /// Time left before the outstanding command times out. `None` when idle.
    pub fn time_remaining(&self, now: I) -> Option<Duration> {
        self.outstanding
            .as_ref()
            .map(|command| self.command_timeout.saturating_sub(elapsed(command.submitted_at, now)))
    }

    /// Check the outstanding command against the timeout.
    ///
    /// On expiry the command resolves as `Timeout` and its eventual result is
    /// marked for discard. The connection stays up.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction<I>> {
        let Some(command) = &self.outstanding else {
            return Vec::new();
        };

        let elapsed = elapsed(command.submitted_at, now);
        if elapsed < self.command_timeout {
            return Vec::new();
        }

        self.stale = self.stale.saturating_add(1);
        self.resolve(Err(SessionError::Timeout { elapsed })).into_iter().collect()
    }

    /// Abandon the outstanding command.
    ///
    /// The remote script keeps running; its result will be discarded.
    pub fn cancel(&mut self) -> Vec<SessionAction<I>> {
        if self.outstanding.is_none() {
            return Vec::new();
        }

        self.stale = self.stale.saturating_add(1);
        self.resolve(Err(SessionError::Cancelled)).into_iter().collect()
    }

    /// Session is being torn down. Resolves the outstanding command as
    /// `Closed`.
    pub fn close(&mut self) -> Vec<SessionAction<I>> {
        self.state = SessionState::Offline;
        self.stale = 0;

        self.resolve(Err(SessionError::Closed)).into_iter().collect()
    }

    fn resolve(&mut self, result: Result<String, SessionError>) -> Option<SessionAction<I>> {
        let command = self.outstanding.take()?;

        if self.state == SessionState::Awaiting {
            self.state = SessionState::Idle;
        }

        Some(SessionAction::Resolved { command, result })
    }
}

/// `now - then`, or zero if the clock appears to have gone backwards.
fn elapsed<I>(then: I, now: I) -> Duration
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    if now > then { now - then } else { Duration::ZERO }
}
