//! # CDH Host Core
//!
//! Host side of the inter-board serial link, for the on-board computer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    on-board computer                        │
//! │                                                             │
//! │  ┌──────────────┐   LineHandle    ┌──────────────────────┐  │
//! │  │ async tasks  │────────────────►│ LineWorker (thread)  │  │
//! │  │   (tokio)    │◄────────────────│  LinkSession<_,_,5>  │  │
//! │  └──────────────┘    payloads     └──────────┬───────────┘  │
//! │                                              │ Transport    │
//! │                          ┌───────────────────┼────────────┐ │
//! │                          │ StreamTransport   │ Loopback   │ │
//! │                          │ (serial device)   │ (tests)    │ │
//! │                          └───────────────────┴────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate only emits `log` records; the embedding binary installs the
//! logger.

pub mod clock;
pub mod config;
pub mod loopback;
pub mod stream;
pub mod worker;

pub use clock::SystemClock;
pub use config::LineConfig;
pub use loopback::{loopback_pair, LoopbackPort, LoopbackWire};
pub use stream::StreamTransport;
pub use worker::{LineHandle, LineStats, LineWorker};

use sdl_shared::LinkError;
use thiserror::Error;

/// Errors surfaced to host code
#[derive(Error, Debug)]
pub enum HostError {
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("line worker is gone")]
    WorkerGone,
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
