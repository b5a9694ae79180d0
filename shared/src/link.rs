//! # Data Link Session
//!
//! One [`LinkSession`] drives one serial line: it frames outgoing payloads,
//! waits for acknowledgments, scans the receive backlog for frames and
//! suppresses duplicates.
//!
//! ## Acknowledged Send
//!
//! ```text
//! Idle ──► Sent ──► AckWait ──► Acked            (Ok)
//!           ▲          │
//!           └─ Retry ◄─┤ timeout, attempts left
//!                      └──► Exhausted          (Err(NoAck))
//! ```
//!
//! Every retry resends the identical frame, same hash included, so the peer
//! can tell a retransmission from a new frame.
//!
//! ## Anti-Deadlock Queue
//!
//! With `DEPTH > 0`, DATA frames that arrive while the session waits for an
//! ACK are acknowledged and parked in a side queue. Two peers sending to each
//! other at the same time both complete instead of timing out. The next
//! [`LinkSession::receive`] call hands out parked payloads first.
//!
//! ## Concurrency
//!
//! A session is single-owner: `send` and `receive` take `&mut self`. Hosts
//! that need several tasks to share a line pin the session to one worker.

use heapless::Vec;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::buffer::{ByteRing, End, RingBuffer};
use crate::codec::{self, FrameCode, FrameError, FrameHeader};
use crate::search::{search_and_advance, Advance, SearchRule};
use crate::traits::{TickSource, Transport};
use crate::{FRAME_FLAG, HEADER_LEN, LINE_BUFFER_LEN, MAX_PAYLOAD_LEN, MAX_STUFFED_LEN};

const DELIMITER: [u8; 1] = [FRAME_FLAG];

/// Flag-delimited frames with room for a fully escaped maximum frame
const FRAME_RULE: SearchRule<'static> = SearchRule::delimited(&DELIMITER, 1, MAX_STUFFED_LEN);

/// Timing of acknowledged sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Ticks to wait for an ACK after each attempt
    pub timeout_ticks: u32,
    /// Additional attempts after the first one
    pub max_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            timeout_ticks: 10,
            max_retries: 2,
        }
    }
}

/// Errors reported by [`LinkSession::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    #[error("empty payload")]
    EmptyPayload,
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
    /// The transport rejected a byte; bytes already sent cannot be recalled
    #[error("transport rejected a byte")]
    Transmit,
    /// Either the peer never got the frame or every ACK was lost
    #[error("no acknowledgment after {attempts} attempts")]
    NoAck { attempts: u32 },
    #[error("framing failed: {0}")]
    Frame(#[from] FrameError),
}

/// Link statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// DATA frames put on the wire, retransmissions included
    pub frames_sent: u32,
    /// DATA frames resent after an ACK timeout
    pub retransmissions: u32,
    /// ACKs that completed a send
    pub acks_received: u32,
    /// Payloads handed to the caller
    pub frames_delivered: u32,
    /// Retransmitted frames recognized and not delivered again
    pub duplicates: u32,
    /// Candidates or payloads thrown away (bad framing, no room)
    pub discarded: u32,
    /// Payloads parked in the anti-deadlock queue
    pub queued: u32,
}

/// Where a received DATA payload goes
enum Destination<'a> {
    Caller(&'a mut [u8]),
    SideQueue,
}

/// A serial line session
///
/// `DEPTH` is the capacity of the anti-deadlock queue, `0` disables it.
///
/// # Example
///
/// ```ignore
/// let mut link: LinkSession<_, _, 5> = LinkSession::new(uart, clock, LinkConfig::default());
///
/// link.send(b"status?", true)?;
///
/// let mut reply = [0u8; MAX_PAYLOAD_LEN];
/// let len = link.receive(&mut reply);
/// ```
pub struct LinkSession<T, C, const DEPTH: usize = 0> {
    transport: T,
    clock: C,
    config: LinkConfig,
    /// Receive backlog, topped up from the transport on every scan
    rx: RingBuffer<[u8; LINE_BUFFER_LEN]>,
    /// Frame assembly and decoding area
    scratch: RingBuffer<[u8; LINE_BUFFER_LEN]>,
    hash_counter: u16,
    last_rx_hash: Option<u16>,
    side_queue: Vec<Vec<u8, MAX_PAYLOAD_LEN>, DEPTH>,
    stats: LinkStats,
}

impl<T: Transport, C: TickSource, const DEPTH: usize> LinkSession<T, C, DEPTH> {
    pub fn new(transport: T, clock: C, config: LinkConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            rx: RingBuffer::new([0u8; LINE_BUFFER_LEN]),
            scratch: RingBuffer::new([0u8; LINE_BUFFER_LEN]),
            hash_counter: 0,
            last_rx_hash: None,
            side_queue: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Payloads waiting in the anti-deadlock queue
    pub fn queued(&self) -> usize {
        self.side_queue.len()
    }

    /// Bytes waiting in the receive backlog
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Send one payload, optionally waiting for its acknowledgment
    ///
    /// Blocks for at most `timeout_ticks * (1 + max_retries)` ticks. A
    /// transport rejection aborts at once without retrying.
    pub fn send(&mut self, payload: &[u8], ack_wanted: bool) -> Result<(), LinkError> {
        if payload.is_empty() {
            return Err(LinkError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let hash = self.next_hash();
        let attempts = self.config.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.stats.retransmissions += 1;
                debug!("retransmitting hash {} (attempt {}/{})", hash, attempt, attempts);
            }

            self.transmit_frame(FrameCode::Data, ack_wanted, hash, payload)?;
            self.stats.frames_sent += 1;

            if !ack_wanted || self.await_ack(hash) {
                return Ok(());
            }
        }

        warn!("no ACK for hash {} after {} attempts", hash, attempts);
        Err(LinkError::NoAck { attempts })
    }

    /// Receive at most one payload into `out`, never blocks
    ///
    /// Returns the payload length, `0` when nothing was delivered. Parked
    /// payloads come first; a parked payload larger than `out` is dropped.
    /// Stale ACKs met while scanning are purged from the backlog.
    pub fn receive(&mut self, out: &mut [u8]) -> usize {
        if !self.side_queue.is_empty() {
            let parked = self.side_queue.remove(0);
            if parked.len() > out.len() {
                warn!(
                    "dropping queued payload of {} bytes, receive buffer holds {}",
                    parked.len(),
                    out.len()
                );
                self.stats.discarded += 1;
                return 0;
            }
            out[..parked.len()].copy_from_slice(&parked);
            self.stats.frames_delivered += 1;
            return parked.len();
        }

        self.receive_data(Destination::Caller(out), &[FrameCode::Ack])
    }

    fn next_hash(&mut self) -> u16 {
        self.hash_counter = self.hash_counter.wrapping_add(1);
        self.hash_counter
    }

    fn transmit_frame(
        &mut self,
        code: FrameCode,
        ack_wanted: bool,
        hash: u16,
        payload: &[u8],
    ) -> Result<(), LinkError> {
        let header = FrameHeader {
            code,
            ack_wanted,
            hash,
        };

        self.scratch.flush();
        self.scratch.push_bounded(&header.encode(), End::Tail);
        self.scratch.push_bounded(payload, End::Tail);
        codec::frame(&mut self.scratch)?;

        for byte in self.scratch.as_slices().iter() {
            if !self.transport.transmit(byte) {
                return Err(LinkError::Transmit);
            }
        }
        Ok(())
    }

    fn send_ack(&mut self, hash: u16) {
        // a failed ACK is indistinguishable from one lost on the line
        if let Err(err) = self.transmit_frame(FrameCode::Ack, false, hash, &[]) {
            debug!("ACK for hash {} not sent: {}", hash, err);
        }
    }

    fn await_ack(&mut self, hash: u16) -> bool {
        let start = self.clock.now_ticks();
        loop {
            if self.receive_ack(hash) {
                return true;
            }
            if DEPTH > 0 {
                self.receive_into_queue();
            }
            if self.clock.now_ticks().wrapping_sub(start) > self.config.timeout_ticks {
                return false;
            }
        }
    }

    fn receive_ack(&mut self, hash: u16) -> bool {
        match self.receive_frame(FrameCode::Ack, &[]) {
            Some(header) if header.hash == hash => {
                self.stats.acks_received += 1;
                true
            }
            Some(header) => {
                debug!("ignoring ACK for hash {} while waiting for {}", header.hash, hash);
                false
            }
            None => false,
        }
    }

    fn receive_into_queue(&mut self) {
        if self.side_queue.is_full() {
            return;
        }
        let len = self.receive_data(Destination::SideQueue, &[]);
        if len > 0 {
            debug!("queued {} byte payload while waiting for ACK", len);
        }
    }

    /// Take the next DATA frame and hand its payload to `destination`
    fn receive_data(&mut self, destination: Destination<'_>, removable: &[FrameCode]) -> usize {
        let Some(header) = self.receive_frame(FrameCode::Data, removable) else {
            return 0;
        };
        self.scratch.discard(HEADER_LEN, End::Head);
        let len = self.scratch.len();

        if self.last_rx_hash == Some(header.hash) {
            self.stats.duplicates += 1;
            debug!("duplicate frame with hash {}", header.hash);
            if header.ack_wanted {
                self.send_ack(header.hash);
            }
            return 0;
        }

        let parking = matches!(destination, Destination::SideQueue);
        let stored = match destination {
            Destination::Caller(out) => {
                out.len() >= len && self.scratch.read_at(&mut out[..len], End::Head, 0) == len
            }
            Destination::SideQueue => {
                let slices = self.scratch.as_slices();
                let mut parked = Vec::new();
                parked.extend_from_slice(slices.first).is_ok()
                    && parked.extend_from_slice(slices.second).is_ok()
                    && self.side_queue.push(parked).is_ok()
            }
        };

        if !stored {
            // left unacknowledged so the peer sends it again
            warn!("no room for {} byte payload with hash {}", len, header.hash);
            self.stats.discarded += 1;
            return 0;
        }

        if header.ack_wanted {
            self.send_ack(header.hash);
        }
        self.last_rx_hash = Some(header.hash);
        if parking {
            self.stats.queued += 1;
        } else {
            self.stats.frames_delivered += 1;
        }
        len
    }

    /// Scan the backlog for the first valid frame carrying `code`
    ///
    /// On success the frame is cut from the backlog and `scratch` holds its
    /// header and payload. Valid frames with a code in `removable` are cut
    /// and skipped, other valid frames stay in place for a later scan.
    fn receive_frame(&mut self, code: FrameCode, removable: &[FrameCode]) -> Option<FrameHeader> {
        self.top_up();

        let mut offset = 0;
        let mut first_retained = None;

        loop {
            let mut cursor = self.rx.view_range(offset, usize::MAX);
            let before = cursor.len();
            let advance = Advance::PAST_FRAME_START | Advance::FAST_FORWARD;
            let (start, frame_len) = match search_and_advance(&mut cursor, &FRAME_RULE, advance) {
                Some(found) => {
                    self.scratch.flush();
                    self.scratch
                        .push_from(&found.frame, found.frame.len(), End::Tail, End::Head);
                    (found.start, found.frame.len())
                }
                None => break,
            };
            let position = offset + start;
            offset += before - cursor.len();

            let header = match self.decode_scratch() {
                Ok(header) => header,
                Err(err) => {
                    self.stats.discarded += 1;
                    trace!("discarding candidate at {}: {}", position, err);
                    continue;
                }
            };

            if header.code == code {
                self.rx.remove_range(frame_len, End::Head, position);
                return Some(header);
            }

            if removable.contains(&header.code) {
                trace!("purging {:?} frame with hash {}", header.code, header.hash);
                self.rx.remove_range(frame_len, End::Head, position);
                offset = position;
            } else if first_retained.is_none() {
                first_retained = Some(position);
            }
        }

        self.prune_backlog(first_retained);
        None
    }

    fn decode_scratch(&mut self) -> Result<FrameHeader, FrameError> {
        codec::deframe(&mut self.scratch)?;

        let mut raw = [0u8; HEADER_LEN];
        if self.scratch.read_at(&mut raw, End::Head, 0) < HEADER_LEN {
            return Err(FrameError::Truncated);
        }
        let header = FrameHeader::decode(&raw)?;

        if self.scratch.len() - HEADER_LEN > MAX_PAYLOAD_LEN {
            return Err(FrameError::BufferTooSmall);
        }
        Ok(header)
    }

    fn top_up(&mut self) {
        while !self.rx.is_full() {
            match self.transport.receive() {
                Some(byte) => self.rx.push_overwrite(&[byte], End::Tail),
                None => break,
            }
        }
    }

    /// Drop backlog bytes that can no longer start a frame
    ///
    /// Retained frames are never touched. A full backlog without any retained
    /// frame loses one head byte so the next top-up makes progress.
    fn prune_backlog(&mut self, first_retained: Option<usize>) {
        let len = self.rx.len();
        let junk = match first_retained {
            Some(position) => position,
            // keep a partial frame starting at the last flag
            None => (0..len)
                .rev()
                .find(|&i| self.rx.byte_at(i, End::Head) == Some(FRAME_FLAG))
                .unwrap_or(len),
        };
        if junk > 0 {
            trace!("dropping {} backlog bytes", junk);
            self.rx.discard(junk, End::Head);
        }

        if first_retained.is_none() && self.rx.is_full() {
            self.rx.discard(1, End::Head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockPort {
        incoming: VecDeque<u8>,
        outgoing: std::vec::Vec<u8>,
        reject_after: Option<usize>,
    }

    impl MockPort {
        fn inject(&mut self, bytes: &[u8]) {
            self.incoming.extend(bytes.iter().copied());
        }
    }

    impl Transport for MockPort {
        fn transmit(&mut self, byte: u8) -> bool {
            if let Some(limit) = self.reject_after {
                if self.outgoing.len() >= limit {
                    return false;
                }
            }
            self.outgoing.push(byte);
            true
        }

        fn receive(&mut self) -> Option<u8> {
            self.incoming.pop_front()
        }
    }

    /// Advances one tick per reading
    fn ticker() -> impl FnMut() -> u32 {
        let mut now = 0u32;
        move || {
            now = now.wrapping_add(1);
            now
        }
    }

    fn no_wait() -> LinkConfig {
        LinkConfig {
            timeout_ticks: 0,
            max_retries: 2,
        }
    }

    fn encode(code: FrameCode, ack_wanted: bool, hash: u16, payload: &[u8]) -> std::vec::Vec<u8> {
        let mut buffer = RingBuffer::new([0u8; LINE_BUFFER_LEN]);
        let header = FrameHeader {
            code,
            ack_wanted,
            hash,
        };
        buffer.push_bounded(&header.encode(), End::Tail);
        buffer.push_bounded(payload, End::Tail);
        codec::frame(&mut buffer).unwrap();
        buffer.as_slices().iter().collect()
    }

    /// Split a captured wire into decoded (header, payload) pairs
    fn decode_wire(wire: &[u8]) -> std::vec::Vec<(FrameHeader, std::vec::Vec<u8>)> {
        let mut frames = std::vec::Vec::new();
        for chunk in wire.split(|&b| b == FRAME_FLAG).filter(|c| !c.is_empty()) {
            let mut buffer = RingBuffer::new([0u8; LINE_BUFFER_LEN]);
            buffer.push_bounded(&[FRAME_FLAG], End::Tail);
            buffer.push_bounded(chunk, End::Tail);
            buffer.push_bounded(&[FRAME_FLAG], End::Tail);
            codec::deframe(&mut buffer).unwrap();
            let bytes: std::vec::Vec<u8> = buffer.as_slices().iter().collect();
            let header = FrameHeader::decode(&bytes).unwrap();
            frames.push((header, bytes[HEADER_LEN..].to_vec()));
        }
        frames
    }

    #[test]
    fn test_config_default() {
        let config = LinkConfig::default();
        assert_eq!(config.timeout_ticks, 10);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_send_rejects_bad_payloads() {
        let mut link: LinkSession<_, _> = LinkSession::new(MockPort::default(), ticker(), no_wait());

        assert_eq!(link.send(&[], false), Err(LinkError::EmptyPayload));
        assert_eq!(
            link.send(&[0u8; MAX_PAYLOAD_LEN + 1], false),
            Err(LinkError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1,
                max: MAX_PAYLOAD_LEN
            })
        );
        assert!(link.transport().outgoing.is_empty());
    }

    #[test]
    fn test_unacknowledged_send_writes_one_frame() {
        let mut link: LinkSession<_, _> = LinkSession::new(MockPort::default(), ticker(), no_wait());
        link.send(b"ping", false).unwrap();

        let frames = decode_wire(&link.transport().outgoing);
        assert_eq!(frames.len(), 1);
        let (header, payload) = &frames[0];
        assert_eq!(header.code, FrameCode::Data);
        assert!(!header.ack_wanted);
        assert_eq!(header.hash, 1);
        assert_eq!(payload, b"ping");
        assert_eq!(link.stats().frames_sent, 1);
    }

    #[test]
    fn test_every_send_uses_a_fresh_hash() {
        let mut link: LinkSession<_, _> = LinkSession::new(MockPort::default(), ticker(), no_wait());
        link.send(b"a", false).unwrap();
        link.send(b"b", false).unwrap();

        let hashes: std::vec::Vec<u16> = decode_wire(&link.transport().outgoing)
            .iter()
            .map(|(header, _)| header.hash)
            .collect();
        assert_eq!(hashes, [1, 2]);
    }

    #[test]
    fn test_transmit_failure_aborts_without_retry() {
        let port = MockPort {
            reject_after: Some(3),
            ..MockPort::default()
        };
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        assert_eq!(link.send(b"hello", true), Err(LinkError::Transmit));
        assert_eq!(link.transport().outgoing.len(), 3);
        assert_eq!(link.stats().frames_sent, 0);
    }

    #[test]
    fn test_retries_resend_identical_frame() {
        let mut link: LinkSession<_, _> = LinkSession::new(MockPort::default(), ticker(), no_wait());

        assert_eq!(link.send(b"data", true), Err(LinkError::NoAck { attempts: 3 }));

        let wire = link.transport().outgoing.clone();
        let single = encode(FrameCode::Data, true, 1, b"data");
        assert_eq!(wire.len(), single.len() * 3);
        assert!(wire.chunks(single.len()).all(|chunk| chunk == single.as_slice()));
        assert_eq!(link.stats().frames_sent, 3);
        assert_eq!(link.stats().retransmissions, 2);
    }

    #[test]
    fn test_matching_ack_completes_send() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Ack, false, 7, &[]));
        port.inject(&encode(FrameCode::Ack, false, 1, &[]));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), LinkConfig::default());

        link.send(b"data", true).unwrap();
        assert_eq!(link.stats().acks_received, 1);
        assert_eq!(link.stats().frames_sent, 1);
    }

    #[test]
    fn test_receive_skips_noise_and_bad_frames() {
        let mut port = MockPort::default();
        port.inject(b"line noise");
        let mut corrupted = encode(FrameCode::Data, false, 1, b"broken");
        corrupted[6] ^= 0x01;
        port.inject(&corrupted);
        port.inject(&encode(FrameCode::Data, false, 2, b"intact"));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; MAX_PAYLOAD_LEN];
        let len = link.receive(&mut out);
        assert_eq!(&out[..len], b"intact");
        assert!(link.stats().discarded >= 1);
        assert_eq!(link.receive(&mut out), 0);
    }

    #[test]
    fn test_receive_acks_when_asked() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Data, true, 42, b"cmd"));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 3);

        let frames = decode_wire(&link.transport().outgoing);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.code, FrameCode::Ack);
        assert_eq!(frames[0].0.hash, 42);
        assert!(frames[0].1.is_empty());
    }

    #[test]
    fn test_duplicate_is_acked_but_not_delivered() {
        let mut port = MockPort::default();
        let frame = encode(FrameCode::Data, true, 9, b"once");
        port.inject(&frame);
        port.inject(&frame);
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 4);
        assert_eq!(link.receive(&mut out), 0);

        let acks = decode_wire(&link.transport().outgoing);
        assert_eq!(acks.len(), 2);
        assert!(acks.iter().all(|(header, _)| header.hash == 9));
        assert_eq!(link.stats().duplicates, 1);
        assert_eq!(link.stats().frames_delivered, 1);
    }

    #[test]
    fn test_payload_without_room_is_not_acked() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Data, true, 5, b"too long"));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut small = [0u8; 4];
        assert_eq!(link.receive(&mut small), 0);
        assert!(link.transport().outgoing.is_empty());

        // the retransmission is accepted as new
        link.transport_mut().inject(&encode(FrameCode::Data, true, 5, b"too long"));
        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 8);
        assert_eq!(decode_wire(&link.transport().outgoing).len(), 1);
    }

    #[test]
    fn test_receive_purges_stale_acks() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Ack, false, 3, &[]));
        port.inject(&encode(FrameCode::Data, false, 1, b"after ack"));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 9);
        assert_eq!(link.backlog(), 0);
    }

    #[test]
    fn test_data_waits_in_backlog_during_ack_wait() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Data, false, 1, b"unsolicited"));
        let config = LinkConfig {
            timeout_ticks: 0,
            max_retries: 0,
        };
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), config);

        assert_eq!(link.send(b"req", true), Err(LinkError::NoAck { attempts: 1 }));
        assert!(link.backlog() > 0);

        let mut out = [0u8; 16];
        let len = link.receive(&mut out);
        assert_eq!(&out[..len], b"unsolicited");
    }

    #[test]
    fn test_full_backlog_keeps_retained_frames() {
        let mut port = MockPort::default();
        for (hash, fill) in [(10, 0x11), (11, 0x22), (12, 0x33)] {
            port.inject(&encode(FrameCode::Data, false, hash, &[fill; 100]));
        }
        port.inject(&encode(FrameCode::Ack, false, 1, &[]));
        let config = LinkConfig {
            timeout_ticks: 0,
            max_retries: 0,
        };
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), config);

        // the DATA frames fill the backlog ahead of the ACK
        assert_eq!(link.send(b"x", true), Err(LinkError::NoAck { attempts: 1 }));
        assert_eq!(link.backlog(), LINE_BUFFER_LEN);

        let mut out = [0u8; MAX_PAYLOAD_LEN];
        for fill in [0x11, 0x22, 0x33] {
            let len = link.receive(&mut out);
            assert_eq!(len, 100);
            assert!(out[..len].iter().all(|&b| b == fill));
        }
        assert_eq!(link.receive(&mut out), 0);
        assert_eq!(link.backlog(), 0);
        assert_eq!(link.stats().frames_delivered, 3);
        assert_eq!(link.stats().discarded, 0);
    }

    #[test]
    fn test_side_queue_captures_data_during_ack_wait() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Data, true, 11, b"parked"));
        let config = LinkConfig {
            timeout_ticks: 0,
            max_retries: 0,
        };
        let mut link: LinkSession<_, _, 2> = LinkSession::new(port, ticker(), config);

        assert!(link.send(b"req", true).is_err());
        assert_eq!(link.queued(), 1);
        assert_eq!(link.stats().queued, 1);

        // the parked frame was acknowledged right away
        let frames = decode_wire(&link.transport().outgoing);
        assert!(frames
            .iter()
            .any(|(header, _)| header.code == FrameCode::Ack && header.hash == 11));

        let mut out = [0u8; 16];
        let len = link.receive(&mut out);
        assert_eq!(&out[..len], b"parked");
        assert_eq!(link.queued(), 0);
    }

    #[test]
    fn test_oversized_parked_payload_is_dropped() {
        let mut port = MockPort::default();
        port.inject(&encode(FrameCode::Data, false, 1, b"0123456789"));
        let config = LinkConfig {
            timeout_ticks: 0,
            max_retries: 0,
        };
        let mut link: LinkSession<_, _, 1> = LinkSession::new(port, ticker(), config);

        assert!(link.send(b"req", true).is_err());
        assert_eq!(link.queued(), 1);

        let mut small = [0u8; 4];
        assert_eq!(link.receive(&mut small), 0);
        assert_eq!(link.queued(), 0);
    }

    #[test]
    fn test_flagless_noise_does_not_stall_backlog() {
        let mut port = MockPort::default();
        port.inject(&[0x55; LINE_BUFFER_LEN + 30]);
        port.inject(&encode(FrameCode::Data, false, 1, b"finally"));
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 0);
        assert_eq!(link.backlog(), 0);
        let len = link.receive(&mut out);
        assert_eq!(&out[..len], b"finally");
    }

    #[test]
    fn test_partial_frame_is_kept_for_next_call() {
        let frame = encode(FrameCode::Data, false, 1, b"split");
        let (first, second) = frame.split_at(5);
        let mut port = MockPort::default();
        port.inject(b"xx");
        port.inject(first);
        let mut link: LinkSession<_, _> = LinkSession::new(port, ticker(), no_wait());

        let mut out = [0u8; 16];
        assert_eq!(link.receive(&mut out), 0);
        assert_eq!(link.backlog(), 5);

        link.transport_mut().inject(second);
        let len = link.receive(&mut out);
        assert_eq!(&out[..len], b"split");
    }
}
