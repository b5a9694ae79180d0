//! Deterministic single-thread line simulation.
//!
//! Two ports share a pair of bounded byte queues. A port can run an idle
//! hook when its receive queue is empty, which lets a test drive the peer
//! session from inside a blocked acknowledged send.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use sdl_shared::buffer::{ByteRing, End, RingBuffer};
use sdl_shared::codec::{self, FrameHeader};
use sdl_shared::{Transport, FRAME_FLAG, HEADER_LEN, LINE_BUFFER_LEN};

/// One direction of a serial line
#[derive(Clone)]
pub struct Wire {
    bytes: Rc<RefCell<VecDeque<u8>>>,
    capacity: usize,
}

impl Wire {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Rc::new(RefCell::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn push(&self, byte: u8) -> bool {
        let mut bytes = self.bytes.borrow_mut();
        if bytes.len() >= self.capacity {
            return false;
        }
        bytes.push_back(byte);
        true
    }

    fn pop(&self) -> Option<u8> {
        self.bytes.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.bytes.borrow().len()
    }
}

pub struct SimPort {
    tx: Wire,
    rx: Wire,
    sent: Rc<RefCell<Vec<u8>>>,
    lose_tx: Rc<Cell<bool>>,
    idle: Option<Box<dyn FnMut()>>,
}

impl SimPort {
    /// Every byte this port transmitted, lost ones included
    pub fn sent(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.sent)
    }

    /// While set, transmitted bytes are accepted and then lost
    pub fn lose_switch(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.lose_tx)
    }

    /// Run `hook` whenever receive finds the line empty
    pub fn on_idle(&mut self, hook: impl FnMut() + 'static) {
        self.idle = Some(Box::new(hook));
    }
}

impl Transport for SimPort {
    fn transmit(&mut self, byte: u8) -> bool {
        if self.lose_tx.get() {
            self.sent.borrow_mut().push(byte);
            return true;
        }
        let accepted = self.tx.push(byte);
        if accepted {
            self.sent.borrow_mut().push(byte);
        }
        accepted
    }

    fn receive(&mut self) -> Option<u8> {
        if let Some(byte) = self.rx.pop() {
            return Some(byte);
        }
        if let Some(hook) = self.idle.as_mut() {
            hook();
        }
        self.rx.pop()
    }
}

/// Two cross-wired ports, each direction buffering `capacity` bytes
pub fn sim_pair(capacity: usize) -> (SimPort, SimPort) {
    let a_to_b = Wire::new(capacity);
    let b_to_a = Wire::new(capacity);
    let port = |tx: &Wire, rx: &Wire| SimPort {
        tx: tx.clone(),
        rx: rx.clone(),
        sent: Rc::new(RefCell::new(Vec::new())),
        lose_tx: Rc::new(Cell::new(false)),
        idle: None,
    };
    (port(&a_to_b, &b_to_a), port(&b_to_a, &a_to_b))
}

/// Advances one tick per reading
pub fn counting_clock() -> impl FnMut() -> u32 {
    let mut now = 0u32;
    move || {
        now = now.wrapping_add(1);
        now
    }
}

/// Decode every frame found in a captured byte log
pub fn decode_frames(wire: &[u8]) -> Vec<(FrameHeader, Vec<u8>)> {
    wire.split(|&b| b == FRAME_FLAG)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| {
            let mut buffer = RingBuffer::new([0u8; LINE_BUFFER_LEN]);
            buffer.push_bounded(&[FRAME_FLAG], End::Tail);
            buffer.push_bounded(chunk, End::Tail);
            buffer.push_bounded(&[FRAME_FLAG], End::Tail);
            codec::deframe(&mut buffer).ok()?;
            let bytes: Vec<u8> = buffer.as_slices().iter().collect();
            let header = FrameHeader::decode(&bytes).ok()?;
            Some((header, bytes[HEADER_LEN..].to_vec()))
        })
        .collect()
}
