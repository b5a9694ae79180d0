//! Wall-clock tick source for host lines

use std::time::Instant;

use sdl_shared::TickSource;

/// Milliseconds since construction, wrapping at `u32::MAX`
///
/// ACK timeouts configured in milliseconds map one to one onto ticks.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemClock {
    fn now_ticks(&mut self) -> u32 {
        // truncation is the wrap
        self.origin.elapsed().as_millis() as u32
    }
}
