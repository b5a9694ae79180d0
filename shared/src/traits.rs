//! # Transport & Tick Abstractions
//!
//! A link session never touches hardware directly. Each session is handed two
//! capabilities when it is created:
//!
//! - **Transport**: non-blocking single-byte transmit and receive
//! - **TickSource**: a monotonic tick counter in the unit of the ACK timeout
//!
//! ## Design Rationale
//!
//! 1. **Testability**: scenarios run against simulated wires and counting clocks
//! 2. **Flexibility**: a UART driver, a byte queue or a serial device file all
//!    fit behind the same two methods
//! 3. **No Globals**: every session owns its capabilities, several lines can
//!    coexist in one program

use embedded_io::{Read, ReadReady, Write};

/// Non-blocking byte transport of one serial line
///
/// # Example
///
/// ```rust
/// use std::collections::VecDeque;
/// use sdl_shared::Transport;
///
/// struct Loop(VecDeque<u8>);
///
/// impl Transport for Loop {
///     fn transmit(&mut self, byte: u8) -> bool {
///         self.0.push_back(byte);
///         true
///     }
///
///     fn receive(&mut self) -> Option<u8> {
///         self.0.pop_front()
///     }
/// }
/// ```
pub trait Transport {
    /// Queue one byte for transmission
    ///
    /// Returns `false` when the byte was rejected (transmit queue full, line
    /// down). A rejection aborts the frame being sent.
    fn transmit(&mut self, byte: u8) -> bool;

    /// Take one received byte, `None` when nothing is pending
    fn receive(&mut self) -> Option<u8>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, byte: u8) -> bool {
        (**self).transmit(byte)
    }

    fn receive(&mut self) -> Option<u8> {
        (**self).receive()
    }
}

/// Monotonic tick counter, wrapping at `u32::MAX`
pub trait TickSource {
    fn now_ticks(&mut self) -> u32;
}

impl<F: FnMut() -> u32> TickSource for F {
    fn now_ticks(&mut self) -> u32 {
        self()
    }
}

/// [`Transport`] over an `embedded-io` device such as a HAL UART
///
/// Receive first asks the device whether a byte is ready so it never blocks.
/// Any device error reads as "nothing received" or "byte rejected".
#[derive(Debug)]
pub struct IoTransport<T> {
    io: T,
}

impl<T> IoTransport<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn inner(&self) -> &T {
        &self.io
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + ReadReady + Write> Transport for IoTransport<T> {
    fn transmit(&mut self, byte: u8) -> bool {
        matches!(self.io.write(&[byte]), Ok(1))
    }

    fn receive(&mut self) -> Option<u8> {
        if !matches!(self.io.read_ready(), Ok(true)) {
            return None;
        }
        let mut byte = [0u8; 1];
        match self.io.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
