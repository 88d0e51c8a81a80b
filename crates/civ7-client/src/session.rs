//! Session actor.
//!
//! A [`Session`] is a cloneable handle to a task that owns one debug port
//! conversation: the current [`Connection`], the [`SessionCore`] state
//! machine, the [`ReconnectPolicy`] and the command history. Requests arrive
//! over an `mpsc` queue and are handled one at a time, so the outstanding
//! command slot only ever has one writer. Status changes are published on a
//! `watch` channel.
//!
//! The task connects on spawn, reconnects with backoff whenever the transport
//! drops, and exits on [`Session::close`] or when every handle is dropped.

use std::{fmt, time::Duration};

use chrono::{DateTime, Local};
use civ7_core::{
    ConnectionError, ConnectionState, ReconnectPolicy, SessionAction, SessionConfig, SessionCore,
    SessionError, SessionState, SessionStatus,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::Instant,
};

use crate::connection::{self, Connection, ConnectionEvent};

/// Requests queued before the actor stops reading new ones.
const REQUEST_CHANNEL_CAPACITY: usize = 32;

/// Identifier assigned by the [`crate::SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Debug port address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Script text as submitted
    pub command: String,
    /// Result text, or why there is none
    pub result: Result<String, SessionError>,
    /// When the command resolved
    pub timestamp: DateTime<Local>,
}

enum Request {
    Send { text: String, reply: oneshot::Sender<Result<String, SessionError>> },
    Cancel,
    History { reply: oneshot::Sender<Vec<HistoryEntry>> },
    Close { reply: oneshot::Sender<()> },
}

/// Handle to a running session.
///
/// Cheap to clone; all clones talk to the same task.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    endpoint: Endpoint,
    requests: mpsc::Sender<Request>,
    status: watch::Receiver<SessionStatus>,
}

impl Session {
    /// Spawn the session task and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(id: SessionId, endpoint: Endpoint, config: SessionConfig) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(SessionStatus::initial());

        let actor = Actor {
            id,
            endpoint: endpoint.clone(),
            core: SessionCore::new(config.command_timeout),
            policy: ReconnectPolicy::new(config.reconnect),
            config,
            history: Vec::new(),
            pending: None,
            connection_state: ConnectionState::Disconnected,
            last_error: None,
            requests: requests_rx,
            status: status_tx,
        };
        tokio::spawn(actor.run());

        Self { id, endpoint, requests: requests_tx, status: status_rx }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Address this session talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send a script and wait for its result.
    ///
    /// Fails immediately with `Busy` if another command is outstanding and
    /// with `Offline` while reconnecting; nothing is queued.
    pub async fn send(&self, text: &str) -> Result<String, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Send { text: text.to_string(), reply })
            .await
            .map_err(|_| SessionError::Closed)?;

        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Abandon the outstanding command, if any. Its caller gets `Cancelled`.
    pub async fn cancel(&self) {
        let _ = self.requests.send(Request::Cancel).await;
    }

    /// Command state right now.
    pub fn status(&self) -> SessionState {
        self.status.borrow().session_state
    }

    /// Full status snapshot.
    pub fn snapshot(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receiver that wakes on every status change.
    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Finished commands, oldest first. Empty once the session is closed.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::History { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Close the session and its connection. Idempotent.
    ///
    /// An outstanding command resolves as `Closed`.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::Close { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
            || self.status.borrow().connection_state == ConnectionState::Closed
    }
}

/// How a connected stretch ended.
enum Served {
    /// Transport dropped; reconnect
    Lost,
    /// Session closed; exit
    Closed,
}

struct Actor {
    id: SessionId,
    endpoint: Endpoint,
    config: SessionConfig,
    core: SessionCore<Instant>,
    policy: ReconnectPolicy,
    history: Vec<HistoryEntry>,
    /// Reply channel of the outstanding command
    pending: Option<oneshot::Sender<Result<String, SessionError>>>,
    connection_state: ConnectionState,
    last_error: Option<ConnectionError>,
    requests: mpsc::Receiver<Request>,
    status: watch::Sender<SessionStatus>,
}

impl Actor {
    async fn run(mut self) {
        tracing::info!(session = %self.id, endpoint = %self.endpoint, "session started");

        let mut first = true;
        loop {
            if !first && !self.backoff().await {
                break;
            }
            first = false;

            let Some(outcome) = self.try_connect().await else {
                break;
            };

            match outcome {
                Ok((conn, events)) => match self.serve(conn, events).await {
                    Served::Lost => {},
                    Served::Closed => break,
                },
                Err(error) => {
                    tracing::debug!(session = %self.id, %error, "connect failed");
                    self.last_error = Some(error);
                },
            }
        }

        self.shutdown();
        tracing::info!(session = %self.id, "session closed");
    }

    /// One connect attempt. `None` if the session was closed meanwhile.
    async fn try_connect(
        &mut self,
    ) -> Option<Result<(Connection, mpsc::Receiver<ConnectionEvent>), ConnectionError>> {
        self.publish(ConnectionState::Connecting, None);

        let host = self.endpoint.host.clone();
        let attempt = connection::connect(&host, self.endpoint.port, self.config.connect_timeout);
        tokio::pin!(attempt);

        let result = loop {
            tokio::select! {
                result = &mut attempt => break result,
                request = self.requests.recv() => {
                    if !self.handle_offline(request) {
                        return None;
                    }
                },
            }
        };

        if result.is_ok() {
            self.policy.reset();
            self.core.on_connected();
            self.last_error = None;
            self.publish(ConnectionState::Connected, None);
        }

        Some(result)
    }

    /// Wait out the next backoff delay. `false` if the session was closed.
    async fn backoff(&mut self) -> bool {
        let delay = self.policy.next_delay();
        self.publish(ConnectionState::Reconnecting, Some(delay));

        match &self.last_error {
            Some(error) if !error.is_transient() => {
                tracing::warn!(
                    session = %self.id,
                    %error,
                    ?delay,
                    "debug port unavailable, retrying"
                );
            },
            error => {
                tracing::info!(session = %self.id, ?error, ?delay, "reconnecting");
            },
        }

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                request = self.requests.recv() => {
                    if !self.handle_offline(request) {
                        return false;
                    }
                },
            }
        }
    }

    /// Handle a request while not connected. `false` means stop.
    fn handle_offline(&mut self, request: Option<Request>) -> bool {
        match request {
            Some(Request::Send { text, reply }) => {
                // Core is offline here, so this only picks between
                // `EmptyCommand` and `Offline`.
                let error =
                    self.core.send(&text, Instant::now()).err().unwrap_or(SessionError::Offline);
                let _ = reply.send(Err(error));
                true
            },
            Some(Request::Cancel) => true,
            Some(Request::History { reply }) => {
                let _ = reply.send(self.history.clone());
                true
            },
            Some(Request::Close { reply }) => {
                self.shutdown();
                let _ = reply.send(());
                false
            },
            None => false,
        }
    }

    /// Connected loop: requests, frames and the command timeout.
    async fn serve(
        &mut self,
        mut conn: Connection,
        mut events: mpsc::Receiver<ConnectionEvent>,
    ) -> Served {
        loop {
            let remaining = self.core.time_remaining(Instant::now());

            let outcome = tokio::select! {
                request = self.requests.recv() => self.on_request(&mut conn, request).await,
                event = events.recv() => self.on_event(&mut conn, event),
                () = tokio::time::sleep(remaining.unwrap_or_default()), if remaining.is_some() => {
                    let actions = self.core.tick(Instant::now());
                    self.apply(actions);
                    None
                },
            };

            if let Some(served) = outcome {
                return served;
            }
        }
    }

    /// Handle a request while connected. `Some` ends the connected stretch.
    async fn on_request(
        &mut self,
        conn: &mut Connection,
        request: Option<Request>,
    ) -> Option<Served> {
        let Some(request) = request else {
            conn.close();
            return Some(Served::Closed);
        };

        match request {
            Request::Send { text, reply } => match self.core.send(&text, Instant::now()) {
                Ok(actions) => {
                    self.pending = Some(reply);
                    self.publish_current();
                    tracing::debug!(session = %self.id, len = text.len(), "sending command");

                    if let Err(error) = self.execute(conn, actions).await {
                        self.lost(conn, error);
                        return Some(Served::Lost);
                    }
                },
                Err(e) => {
                    let _ = reply.send(Err(e));
                },
            },
            Request::Cancel => {
                let actions = self.core.cancel();
                self.apply(actions);
            },
            Request::History { reply } => {
                let _ = reply.send(self.history.clone());
            },
            Request::Close { reply } => {
                conn.close();
                self.shutdown();
                let _ = reply.send(());
                return Some(Served::Closed);
            },
        }

        None
    }

    /// Handle a read loop event. `Some` ends the connected stretch.
    fn on_event(&mut self, conn: &mut Connection, event: Option<ConnectionEvent>) -> Option<Served> {
        match event {
            Some(ConnectionEvent::Frame(frame)) => {
                let actions = self.core.handle_frame(&frame);
                self.apply(actions);
                None
            },
            Some(ConnectionEvent::Closed { error }) => {
                self.lost(conn, error);
                Some(Served::Lost)
            },
            None => {
                self.lost(conn, ConnectionError::ClosedByPeer);
                Some(Served::Lost)
            },
        }
    }

    /// Execute actions that may touch the socket.
    async fn execute(
        &mut self,
        conn: &mut Connection,
        actions: Vec<SessionAction<Instant>>,
    ) -> Result<(), ConnectionError> {
        for action in actions {
            match action {
                SessionAction::SendFrame(bytes) => conn.write(&bytes).await?,
                SessionAction::Resolved { command, result } => {
                    self.resolve(command.text, result);
                },
            }
        }
        Ok(())
    }

    /// Execute actions that never write.
    fn apply(&mut self, actions: Vec<SessionAction<Instant>>) {
        for action in actions {
            match action {
                SessionAction::Resolved { command, result } => self.resolve(command.text, result),
                SessionAction::SendFrame(_) => {
                    tracing::warn!(session = %self.id, "unexpected write outside send path");
                },
            }
        }
    }

    fn resolve(&mut self, command: String, result: Result<String, SessionError>) {
        match &result {
            Ok(text) => tracing::debug!(session = %self.id, len = text.len(), "command resolved"),
            Err(error) => tracing::info!(session = %self.id, %error, "command failed"),
        }

        if let Some(reply) = self.pending.take() {
            let _ = reply.send(result.clone());
        }

        self.history.push(HistoryEntry { command, result, timestamp: Local::now() });
        self.publish_current();
    }

    fn lost(&mut self, conn: &mut Connection, error: ConnectionError) {
        conn.close();

        // Observers woken by the resolution below must already see the drop.
        self.connection_state = ConnectionState::Reconnecting;
        self.last_error = Some(error.clone());

        let actions = self.core.on_disconnected(&error);
        self.apply(actions);
        self.publish_current();
    }

    fn shutdown(&mut self) {
        if self.connection_state == ConnectionState::Closed {
            return;
        }

        let actions = self.core.close();
        self.apply(actions);
        self.publish(ConnectionState::Closed, None);
    }

    fn publish_current(&mut self) {
        let state = self.connection_state;
        self.publish(state, None);
    }

    fn publish(&mut self, connection_state: ConnectionState, retry_in: Option<Duration>) {
        self.connection_state = connection_state;
        self.status.send_replace(SessionStatus {
            session_state: self.core.state(),
            connection_state,
            last_error: self.last_error.clone(),
            attempt: self.policy.attempt(),
            retry_in,
        });
    }
}
