//! Minimal stand-in for the game's debug port.
//!
//! `1+1` answers `2`, `sleep:<ms>` answers after the delay, `throw` answers
//! with an error string the way the game reports exceptions, anything else
//! is echoed back.

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

/// Running fake server.
pub struct FakeDebugPort {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl FakeDebugPort {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            while let Ok((stream, _)) = listener.accept().await {
                connections.spawn(serve(stream));
            }
        });
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

async fn serve(mut stream: TcpStream) {
    let mut decoder = FrameDecoder::new();

    loop {
        match stream.read_buf(decoder.buffer_mut()).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {},
        }

        while let Ok(Some(frame)) = decoder.next_frame() {
            let script = frame.script().unwrap_or_default().to_string();

            let answer = if script == "1+1" {
                "2".to_string()
            } else if script == "throw" {
                "Error: ReferenceError: nope is not defined".to_string()
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
    mut predicate: impl FnMut(&SessionStatus) -> bool,
) -> SessionStatus {
    let mut watch = session.watch();
    tokio::time::timeout(TEST_DEADLINE, async {
        loop {
            let status = watch.borrow_and_update().clone();
            if predicate(&status) {
                return status;
            }
            watch.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}
