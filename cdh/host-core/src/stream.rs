//! Byte transport over a `std::io` stream
//!
//! Meant for serial device files opened non-blocking. A read that would
//! block, was interrupted or hit end of file means "no byte yet".

use std::io::{ErrorKind, Read, Write};

use log::debug;
use sdl_shared::Transport;

/// [`Transport`] over any non-blocking `Read + Write` stream
#[derive(Debug)]
pub struct StreamTransport<T> {
    stream: T,
}

impl<T> StreamTransport<T> {
    pub fn new(stream: T) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T: Read + Write> Transport for StreamTransport<T> {
    fn transmit(&mut self, byte: u8) -> bool {
        match self.stream.write(&[byte]) {
            Ok(1) => true,
            Ok(_) => false,
            Err(e) => {
                if e.kind() != ErrorKind::WouldBlock {
                    debug!("stream write failed: {e}");
                }
                false
            }
        }
    }

    fn receive(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(e) => {
                if !matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) {
                    debug!("stream read failed: {e}");
                }
                None
            }
        }
    }
}
