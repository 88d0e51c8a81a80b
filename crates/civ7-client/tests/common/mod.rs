//! In-process stand-in for the game's debug port.
//!
//! Speaks the real framing over a real `TcpListener`. Scripts are answered
//! by a tiny evaluator:
//!
//! - `1+1` answers `2`
//! - `sleep:<ms>` answers `slept <ms>` after the delay
//! - `silent` never answers
//! - `hangup` closes the socket
//! - `raw:<text>` writes `<text>` as raw bytes instead of a frame
//! - anything else answers `echo:<script>`

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use civ7_client::{Session, SessionStatus};
use civ7_proto::{Frame, FrameDecoder};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::{JoinHandle, JoinSet},
};

/// Upper bound for any wait in these tests.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

/// Running fake server. Aborting it drops every accepted socket.
pub struct FakeDebugPort {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl FakeDebugPort {
    /// Bind an ephemeral port.
    pub async fn start() -> Self {
        Self::start_on(0).await
    }

    /// Bind a specific port (0 for ephemeral).
    pub async fn start_on(port: u16) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(accept_loop(listener));
        Self { addr, task }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Kill the listener and every open connection.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// A port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn accept_loop(listener: TcpListener) {
    let mut connections = JoinSet::new();
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        connections.spawn(serve(stream));
    }
}

async fn serve(mut stream: TcpStream) {
    let mut decoder = FrameDecoder::new();

    loop {
        match stream.read_buf(decoder.buffer_mut()).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {},
        }

        while let Ok(Some(frame)) = decoder.next_frame() {
            let script = frame.script().unwrap_or_default().to_string();

            if script == "hangup" {
                return;
            }
            if script == "silent" {
                continue;
            }
            if let Some(raw) = script.strip_prefix("raw:") {
                let _ = stream.write_all(raw.as_bytes()).await;
                continue;
            }

            let answer = if script == "1+1" {
                "2".to_string()
            } else if let Some(ms) = script.strip_prefix("sleep:") {
                let ms: u64 = ms.parse().unwrap();
                tokio::time::sleep(Duration::from_millis(ms)).await;
                format!("slept {ms}")
            } else {
                format!("echo:{script}")
            };

            let wire = Frame::result(answer).to_bytes().unwrap();
            if stream.write_all(&wire).await.is_err() {
                return;
            }
        }
    }
}

/// Wait until the session status satisfies `predicate`.
pub async fn wait_for_status(
    session: &Session,
    predicate: impl FnMut(&SessionStatus) -> bool,
) -> SessionStatus {
    let mut rx = session.watch();
    let status = tokio::time::timeout(TEST_DEADLINE, rx.wait_for(predicate))
        .await
        .expect("status wait timed out")
        .expect("session dropped its status channel");
    status.clone()
}

/// Wait until the session is connected.
pub async fn wait_connected(session: &Session) {
    wait_for_status(session, SessionStatus::is_connected).await;
}
