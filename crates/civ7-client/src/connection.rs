//! TCP transport for the debug port.
//!
//! [`connect`] returns a [`Connection`] for writing and a channel of
//! [`ConnectionEvent`]s fed by a spawned read loop. The read loop turns the
//! byte stream into frames and reports the end of the stream exactly once.
//! Protocol logic lives in [`civ7_core::SessionCore`]; this layer only moves
//! bytes.

use std::{net::SocketAddr, time::Duration};

use civ7_core::ConnectionError;
use civ7_proto::{Frame, FrameDecoder};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    task::AbortHandle,
};

/// Frames buffered between the read loop and the session.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events produced by the read loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A complete frame arrived
    Frame(Frame),

    /// Stream ended. Always the last event.
    Closed {
        /// Why the stream ended
        error: ConnectionError,
    },
}

/// Write side of an established connection.
///
/// Dropping or closing the connection stops the read loop. A connection
/// closed locally does not emit [`ConnectionEvent::Closed`].
#[derive(Debug)]
pub struct Connection {
    peer: SocketAddr,
    writer: Option<OwnedWriteHalf>,
    reader: AbortHandle,
}

/// Open a connection to `host:port`.
///
/// # Errors
///
/// - `ConnectionError::TimedOut` if the connect does not finish in `timeout`
/// - `ConnectionError::Refused`, `Unreachable` or `Io` as classified from
///   the OS error
pub async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(Connection, mpsc::Receiver<ConnectionEvent>), ConnectionError> {
    let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ConnectionError::from_io(&e)),
        Err(_) => return Err(ConnectionError::TimedOut),
    };

    // Commands are small and latency-bound.
    stream.set_nodelay(true)?;
    let peer = stream.peer_addr()?;

    let (reader, writer) = stream.into_split();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(read_loop(reader, events_tx));

    tracing::info!(%peer, "connected to debug port");

    Ok((Connection { peer, writer: Some(writer), reader: handle.abort_handle() }, events_rx))
}

impl Connection {
    /// Remote address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Write already-encoded bytes.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Io` with `NotConnected` after `close()`
    /// - Any classified write error (`Reset` for a broken pipe)
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ConnectionError::Io {
                kind: std::io::ErrorKind::NotConnected,
                message: "connection closed".to_string(),
            });
        };

        writer.write_all(bytes).await?;
        writer.flush().await?;

        tracing::debug!(peer = %self.peer, len = bytes.len(), "frame written");
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        if self.writer.take().is_some() {
            self.reader.abort();
            tracing::debug!(peer = %self.peer, "connection closed locally");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read until EOF or error, forwarding frames in order.
async fn read_loop(mut reader: OwnedReadHalf, events: mpsc::Sender<ConnectionEvent>) {
    let mut decoder = FrameDecoder::new();

    let error = 'read: loop {
        match reader.read_buf(decoder.buffer_mut()).await {
            Ok(0) => break ConnectionError::ClosedByPeer,
            Ok(n) => tracing::trace!(n, buffered = decoder.buffered(), "read"),
            Err(e) => break ConnectionError::from_io(&e),
        }

        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => {
                    tracing::debug!(
                        message_type = frame.message_type,
                        len = frame.payload.len(),
                        "frame received"
                    );
                    if events.send(ConnectionEvent::Frame(frame)).await.is_err() {
                        // Nobody is listening any more.
                        return;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "frame decode failed, dropping connection");
                    break 'read ConnectionError::Protocol(e);
                },
            }
        }
    };

    tracing::info!(%error, "debug port connection ended");
    let _ = events.send(ConnectionEvent::Closed { error }).await;
}
