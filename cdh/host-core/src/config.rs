//! Line configuration
//!
//! Loaded from JSON; every field is optional and falls back to the
//! on-board computer defaults.
//!
//! ```json
//! { "name": "adcs", "timeout_ms": 10, "retries": 2 }
//! ```

use std::path::Path;

use sdl_shared::LinkConfig;
use serde::{Deserialize, Serialize};

use crate::loopback::{loopback_pair, LoopbackPort};
use crate::HostError;

/// Settings of one serial line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Line name, used for the worker thread and in logs
    pub name: String,
    /// ACK timeout per attempt
    pub timeout_ms: u32,
    /// Additional attempts after the first one
    pub retries: u32,
    /// Worker sleep when the line is idle
    pub poll_interval_ms: u64,
    /// Capacity of each direction of a loopback line
    pub loopback_capacity: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        let link = LinkConfig::default();
        Self {
            name: "adcs".into(),
            timeout_ms: link.timeout_ticks,
            retries: link.max_retries,
            poll_interval_ms: 1,
            loopback_capacity: 1024,
        }
    }
}

impl LineConfig {
    pub fn from_json(json: &str) -> Result<Self, HostError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Session timing, one tick per millisecond
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            timeout_ticks: self.timeout_ms,
            max_retries: self.retries,
        }
    }

    /// Two cross-wired in-process ports sized by `loopback_capacity`
    pub fn loopback_pair(&self) -> (LoopbackPort, LoopbackPort) {
        loopback_pair(self.loopback_capacity)
    }

    /// A port wired back to itself, sized by `loopback_capacity`
    pub fn closed_loopback(&self) -> LoopbackPort {
        LoopbackPort::closed(self.loopback_capacity)
    }
}
