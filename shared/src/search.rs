//! # Frame Search
//!
//! Finds the next delimited frame inside a [`ByteRing`] without copying it.
//!
//! A frame is `head pattern | interior | tail pattern` (the tail may be
//! omitted). The scan is a single forward pass with two states:
//!
//! ```text
//!            head complete
//!  Waiting ─────────────────► Inside ──── can end ────► found
//!     ▲                          │
//!     └── forbidden byte ────────┘  (rescan from head start + 1)
//! ```
//!
//! ## Policies
//!
//! Interior bytes that also belong to the head or tail pattern are judged by
//! the rule's [`Policy`]:
//!
//! | Policy   | complete occurrence | partial occurrence |
//! |----------|---------------------|--------------------|
//! | `Hard`   | rejects candidate   | rejects candidate  |
//! | `Medium` | rejects candidate   | tolerated          |
//! | `Soft`   | tolerated           | tolerated          |
//!
//! With `Soft` the caller disambiguates through length bounds or a checksum.

use core::ops::{BitOr, BitOrAssign};

use crate::buffer::{ByteRing, End, RingView};

/// Strictness applied to head/tail bytes found inside a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Policy {
    /// Complete or partial head/tail occurrences invalidate the candidate
    Hard,
    /// Only complete occurrences invalidate the candidate
    Medium,
    /// Nothing in the interior invalidates the candidate
    #[default]
    Soft,
}

impl Policy {
    fn forbids(self, hit: PatternHit) -> bool {
        match self {
            Policy::Hard => hit != PatternHit::Absent,
            Policy::Medium => matches!(hit, PatternHit::Complete(_)),
            Policy::Soft => false,
        }
    }
}

impl From<u8> for Policy {
    /// Unknown raw values fall back to [`Policy::Soft`]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Hard,
            1 => Self::Medium,
            _ => Self::Soft,
        }
    }
}

/// What a frame looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRule<'p> {
    /// Pattern that opens a frame, must not be empty
    pub head: &'p [u8],
    /// Pattern that closes a frame, empty for tail-less search
    pub tail: &'p [u8],
    /// Minimum interior length
    pub min_len: usize,
    /// Maximum interior length, 0 for unbounded
    pub max_len: usize,
    /// Treatment of head and tail bytes inside a candidate
    pub policy: Policy,
}

impl<'p> SearchRule<'p> {
    /// Frames opened and closed by the same delimiter, hard policy
    pub const fn delimited(delimiter: &'p [u8], min_len: usize, max_len: usize) -> Self {
        Self {
            head: delimiter,
            tail: delimiter,
            min_len,
            max_len,
            policy: Policy::Hard,
        }
    }

    /// Plain pattern search: tail-less, zero length
    pub const fn pattern(pattern: &'p [u8]) -> Self {
        Self {
            head: pattern,
            tail: &[],
            min_len: 0,
            max_len: 0,
            policy: Policy::Hard,
        }
    }
}

/// Membership of one stream byte in a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternHit {
    /// The byte does not occur in the pattern
    Absent,
    /// The byte occurs in the pattern at this index but no complete
    /// occurrence covers it
    Partial(usize),
    /// A complete occurrence covers the byte at this pattern index
    Complete(usize),
}

/// Which alignment is reported when several qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TieBreak {
    /// Lowest matching pattern index
    Lowest,
    /// Highest matching pattern index
    Highest,
}

#[inline]
fn byte<R: ByteRing + ?Sized>(stream: &R, index: usize) -> u8 {
    stream.storage()[stream.physical_index(index)]
}

/// Classify the byte at virtual index `position` against `pattern`
///
/// Every alignment of the pattern that fits inside the stream and covers
/// `position` is tried. An empty pattern or an out-of-range position is
/// always [`PatternHit::Absent`].
pub fn pattern_hit<R: ByteRing + ?Sized>(
    stream: &R,
    position: usize,
    pattern: &[u8],
    tie: TieBreak,
) -> PatternHit {
    let len = stream.len();
    let pattern_len = pattern.len();
    if len == 0 || pattern_len == 0 || position >= len {
        return PatternHit::Absent;
    }

    if len >= pattern_len {
        // first and last (exclusive) alignment that keep the pattern inside the stream
        let start_shift = position.saturating_sub(len - pattern_len);
        let end_shift = (position + 1).min(pattern_len);

        let matches = |shift: usize| {
            pattern
                .iter()
                .enumerate()
                .all(|(p, &expected)| byte(stream, position - shift + p) == expected)
        };
        let complete = match tie {
            TieBreak::Lowest => (start_shift..end_shift).find(|&shift| matches(shift)),
            TieBreak::Highest => (start_shift..end_shift).rev().find(|&shift| matches(shift)),
        };
        if let Some(shift) = complete {
            return PatternHit::Complete(shift);
        }
    }

    let current = byte(stream, position);
    let partial = match tie {
        TieBreak::Lowest => pattern.iter().position(|&b| b == current),
        TieBreak::Highest => pattern.iter().rposition(|&b| b == current),
    };
    partial.map_or(PatternHit::Absent, PatternHit::Partial)
}

/// A frame found in a stream
#[derive(Debug, Clone, Copy)]
pub struct FrameMatch<'a> {
    /// Virtual index of the first head byte in the searched stream
    pub start: usize,
    /// The frame bytes, head and tail included, aliasing the stream storage
    pub frame: RingView<'a>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Waiting,
    Inside,
}

/// Find the first frame in `stream` matching `rule`
///
/// A candidate rejected by the policy or by `max_len` is abandoned and the
/// scan resumes one byte after that candidate's head, so overlapping frames
/// are still discovered.
pub fn search<'a, R: ByteRing + ?Sized>(stream: &'a R, rule: &SearchRule<'_>) -> Option<FrameMatch<'a>> {
    let len = stream.len();
    let head_len = rule.head.len();
    let tail_len = rule.tail.len();
    if len == 0 || head_len == 0 || len < head_len + rule.min_len + tail_len {
        return None;
    }

    let mut state = State::Waiting;
    let mut head_end = 0;
    let mut b = 0;

    while b < len - tail_len {
        let head_hit = pattern_hit(stream, b, rule.head, TieBreak::Highest);
        let tail_hit = pattern_hit(stream, b, rule.tail, TieBreak::Lowest);

        let current_len = match state {
            State::Inside => b - head_end,
            State::Waiting => 0,
        };
        let forbidden = rule.policy.forbids(head_hit)
            || rule.policy.forbids(tail_hit)
            || (rule.max_len != 0 && current_len > rule.max_len);

        let can_be_first = head_hit == PatternHit::Complete(head_len - 1);
        let can_be_last = current_len >= rule.min_len
            && (tail_len == 0
                || pattern_hit(stream, b + 1, rule.tail, TieBreak::Lowest) == PatternHit::Complete(0));

        match state {
            State::Waiting => {
                if can_be_first {
                    state = State::Inside;
                    head_end = b;
                    if can_be_last {
                        return Some(found(stream, rule, head_end, 0));
                    }
                }
            }
            State::Inside => {
                if forbidden {
                    state = State::Waiting;
                    b = head_end;
                } else if can_be_last {
                    return Some(found(stream, rule, head_end, current_len));
                }
            }
        }
        b += 1;
    }

    None
}

fn found<'a, R: ByteRing + ?Sized>(
    stream: &'a R,
    rule: &SearchRule<'_>,
    head_end: usize,
    interior: usize,
) -> FrameMatch<'a> {
    let start = head_end + 1 - rule.head.len();
    let frame_len = rule.head.len() + interior + rule.tail.len();
    FrameMatch {
        start,
        frame: stream.view_range(start, frame_len),
    }
}

/// Stream consumption requested from [`search_and_advance`]
///
/// Flags combine with `|`. Among the three "found" flags the widest wins:
/// `WHOLE_FRAME` over `PAST_FRAME_START` over `TO_FRAME_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Advance(u8);

impl Advance {
    /// Leave the stream untouched
    pub const NONE: Self = Self(0);
    /// Nothing found and the stream is full: drop one head byte
    pub const ON_FULL: Self = Self(0x01);
    /// Drop everything before the found frame
    pub const TO_FRAME_START: Self = Self(0x02);
    /// Drop everything up to and including the first byte of the found frame
    pub const PAST_FRAME_START: Self = Self(0x04);
    /// Drop everything up to and including the found frame
    ///
    /// Unsafe under `Soft`/`Medium` policies: the dropped span may hold the
    /// head or tail of a neighbouring valid frame.
    pub const WHOLE_FRAME: Self = Self(0x08);
    /// Afterwards skip to the next occurrence of the first head byte
    pub const FAST_FORWARD: Self = Self(0x10);

    /// Raw flag bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check that every flag of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Advance {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Advance {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// [`search`] then consume the stream according to `advance`
///
/// The returned `start` is relative to the stream head before advancing.
/// Advancing only moves the stream bounds, so the returned frame view still
/// holds the found bytes.
pub fn search_and_advance<'s, R: ByteRing + ?Sized>(
    stream: &'s mut R,
    rule: &SearchRule<'_>,
    advance: Advance,
) -> Option<FrameMatch<'s>> {
    let hit = search(&*stream, rule).map(|m| (m.start, m.frame.start_index(), m.frame.len()));

    match hit {
        Some((start, _, frame_len)) => {
            if advance.contains(Advance::WHOLE_FRAME) {
                stream.discard(start + frame_len, End::Head);
            } else if advance.contains(Advance::PAST_FRAME_START) {
                stream.discard(start + 1, End::Head);
            } else if advance.contains(Advance::TO_FRAME_START) {
                stream.discard(start, End::Head);
            }
        }
        None => {
            if advance.contains(Advance::ON_FULL) && stream.is_full() {
                stream.discard(1, End::Head);
            }
        }
    }

    if advance.contains(Advance::FAST_FORWARD) && !rule.head.is_empty() {
        let next_head = SearchRule::pattern(&rule.head[..1]);
        let skip = search(&*stream, &next_head).map_or(stream.len(), |m| m.start);
        stream.discard(skip, End::Head);
    }

    let stream: &'s R = stream;
    hit.map(|(start, physical_start, frame_len)| FrameMatch {
        start,
        frame: RingView::new(stream.storage(), physical_start, frame_len),
    })
}
