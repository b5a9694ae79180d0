//! # Line Worker
//!
//! A [`LinkSession`] is single-owner, so each line gets one worker thread
//! that owns the session outright. Async code talks to it through a
//! [`LineHandle`]:
//!
//! ```text
//!  async tasks              worker thread
//! ┌────────────┐  Command  ┌──────────────────────────────┐
//! │ LineHandle │──────────►│ try_recv ─► session.send()   │
//! │            │◄──────────│   oneshot reply              │
//! │            │  payloads │ session.receive() ─► inbound │
//! │  recv()  ◄─┼───────────│ idle: sleep(poll_interval)   │
//! └────────────┘           └──────────────────────────────┘
//! ```
//!
//! Sessions run with an anti-deadlock queue of [`ANTI_LOCK_DEPTH`] payloads,
//! so both ends of a line may send acknowledged frames at the same time.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use sdl_shared::{
    LinkError, LinkSession, LinkStats, TickSource, Transport, ANTI_LOCK_DEPTH, MAX_PAYLOAD_LEN,
};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::oneshot;

use crate::{HostError, LineConfig};

/// Pending commands per line before `send` callers wait
const COMMAND_CAPACITY: usize = 16;

/// Snapshot of a line for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineStats {
    pub name: String,
    pub link: LinkStats,
    /// Bytes waiting in the receive buffer
    pub backlog: usize,
    /// Payloads waiting in the anti-deadlock queue
    pub queued: usize,
}

impl LineStats {
    pub fn to_json(&self) -> Result<String, HostError> {
        Ok(serde_json::to_string(self)?)
    }
}

enum Command {
    Send {
        payload: Vec<u8>,
        ack_wanted: bool,
        reply: oneshot::Sender<Result<(), LinkError>>,
    },
    Stats {
        reply: oneshot::Sender<LineStats>,
    },
    Shutdown {
        reply: oneshot::Sender<LineStats>,
    },
}

/// Thread side of a line
pub struct LineWorker<T, C> {
    name: String,
    session: LinkSession<T, C, ANTI_LOCK_DEPTH>,
    commands: mpsc::Receiver<Command>,
    inbound: mpsc::UnboundedSender<Vec<u8>>,
    poll_interval: Duration,
}

impl<T, C> LineWorker<T, C>
where
    T: Transport + Send + 'static,
    C: TickSource + Send + 'static,
{
    /// Start a worker thread owning a new session on `transport`
    pub fn spawn(config: &LineConfig, transport: T, clock: C) -> Result<LineHandle, HostError> {
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (inbound, inbound_rx) = mpsc::unbounded_channel();

        let worker = Self {
            name: config.name.clone(),
            session: LinkSession::new(transport, clock, config.link_config()),
            commands,
            inbound,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        };

        let thread = thread::Builder::new()
            .name(format!("line-{}", config.name))
            .spawn(move || worker.run())?;

        info!(
            "[{}] line worker started (timeout {} ms, {} retries)",
            config.name, config.timeout_ms, config.retries
        );

        Ok(LineHandle {
            name: config.name.clone(),
            commands: command_tx,
            inbound: inbound_rx,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        let mut payload = [0u8; MAX_PAYLOAD_LEN];

        loop {
            let mut busy = false;

            match self.commands.try_recv() {
                Ok(Command::Send {
                    payload: outgoing,
                    ack_wanted,
                    reply,
                }) => {
                    busy = true;
                    let result = self.session.send(&outgoing, ack_wanted);
                    if let Err(e) = &result {
                        warn!("[{}] send failed: {}", self.name, e);
                    }
                    let _ = reply.send(result);
                }
                Ok(Command::Stats { reply }) => {
                    let _ = reply.send(self.stats());
                }
                Ok(Command::Shutdown { reply }) => {
                    let _ = reply.send(self.stats());
                    break;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    debug!("[{}] handle dropped", self.name);
                    break;
                }
            }

            let len = self.session.receive(&mut payload);
            if len > 0 {
                busy = true;
                if self.inbound.send(payload[..len].to_vec()).is_err() {
                    debug!("[{}] nobody listening, {} byte payload dropped", self.name, len);
                }
            }

            if !busy {
                thread::sleep(self.poll_interval);
            }
        }

        info!("[{}] line worker stopped", self.name);
    }

    fn stats(&self) -> LineStats {
        LineStats {
            name: self.name.clone(),
            link: *self.session.stats(),
            backlog: self.session.backlog(),
            queued: self.session.queued(),
        }
    }
}

/// Async handle to a line worker
///
/// Dropping the handle stops the worker at its next poll.
pub struct LineHandle {
    name: String,
    commands: mpsc::Sender<Command>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    thread: Option<JoinHandle<()>>,
}

impl LineHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one payload, waiting for the ACK when `ack_wanted` is set
    pub async fn send(&self, payload: &[u8], ack_wanted: bool) -> Result<(), HostError> {
        let (reply, result) = oneshot::channel();
        self.request(Command::Send {
            payload: payload.to_vec(),
            ack_wanted,
            reply,
        })
        .await?;
        result.await.map_err(|_| HostError::WorkerGone)??;
        Ok(())
    }

    /// Next received payload, `None` once the worker has stopped
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.try_recv().ok()
    }

    pub async fn stats(&self) -> Result<LineStats, HostError> {
        let (reply, stats) = oneshot::channel();
        self.request(Command::Stats { reply }).await?;
        stats.await.map_err(|_| HostError::WorkerGone)
    }

    /// Stop the worker and wait for its thread, returning the final stats
    pub async fn shutdown(mut self) -> Result<LineStats, HostError> {
        let (reply, stats) = oneshot::channel();
        self.request(Command::Shutdown { reply }).await?;
        let stats = stats.await.map_err(|_| HostError::WorkerGone)?;

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|_| HostError::WorkerGone)?
                .map_err(|_| HostError::WorkerGone)?;
        }
        Ok(stats)
    }

    async fn request(&self, command: Command) -> Result<(), HostError> {
        self.commands.send(command).await.map_err(|_| HostError::WorkerGone)
    }
}
