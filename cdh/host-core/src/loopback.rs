//! # In-Process Serial Lines
//!
//! A [`LoopbackWire`] is one direction of a serial line: a bounded byte FIFO
//! shared between threads. Two wires cross-wired make a full duplex line.
//!
//! ```text
//!   port A                         port B
//!  ┌────────┐   wire A → B        ┌────────┐
//!  │ tx ────┼────────────────────►│ rx     │
//!  │ rx ◄───┼─────────────────────┼── tx   │
//!  └────────┘   wire B → A        └────────┘
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;
use sdl_shared::Transport;

/// One direction of a line, bounded like a UART FIFO
#[derive(Debug, Clone)]
pub struct LoopbackWire {
    bytes: Arc<Mutex<VecDeque<u8>>>,
    capacity: usize,
}

impl LoopbackWire {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        // a panicking peer leaves plain bytes behind, still usable
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one byte, `false` when the wire is full
    pub fn push(&self, byte: u8) -> bool {
        let mut bytes = self.lock();
        if bytes.len() >= self.capacity {
            return false;
        }
        bytes.push_back(byte);
        true
    }

    pub fn pop(&self) -> Option<u8> {
        self.lock().pop_front()
    }

    /// Bytes in flight
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`Transport`] end of a loopback line
#[derive(Debug, Clone)]
pub struct LoopbackPort {
    tx: LoopbackWire,
    rx: LoopbackWire,
}

impl LoopbackPort {
    pub fn new(tx: LoopbackWire, rx: LoopbackWire) -> Self {
        Self { tx, rx }
    }

    /// A line whose output is wired back to its own input
    pub fn closed(capacity: usize) -> Self {
        let wire = LoopbackWire::new(capacity);
        Self::new(wire.clone(), wire)
    }

    pub fn tx_wire(&self) -> &LoopbackWire {
        &self.tx
    }

    pub fn rx_wire(&self) -> &LoopbackWire {
        &self.rx
    }
}

impl Transport for LoopbackPort {
    fn transmit(&mut self, byte: u8) -> bool {
        let accepted = self.tx.push(byte);
        if !accepted {
            trace!("loopback wire full, byte {byte:#04x} rejected");
        }
        accepted
    }

    fn receive(&mut self) -> Option<u8> {
        self.rx.pop()
    }
}

/// Two ports connected to each other
pub fn loopback_pair(capacity: usize) -> (LoopbackPort, LoopbackPort) {
    let a_to_b = LoopbackWire::new(capacity);
    let b_to_a = LoopbackWire::new(capacity);
    (
        LoopbackPort::new(a_to_b.clone(), b_to_a.clone()),
        LoopbackPort::new(b_to_a, a_to_b),
    )
}
