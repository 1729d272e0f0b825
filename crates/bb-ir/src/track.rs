//! Per-channel decode state.

use alloc::vec::Vec;

use crate::event::{Event, EventPayload, Ticks};

/// Fixed number of output channels.
pub const NUM_TRACKS: usize = 16;

/// Pitch-wheel units per coarse tuning step (8192 units span 24 semitones).
pub const PITCH_STEP_COARSE: f64 = 8192.0 / 24.0;

/// Pitch-wheel units per fine tuning step (1/100 of a coarse step).
pub const PITCH_STEP_FINE: f64 = PITCH_STEP_COARSE / 100.0;

/// Pending redirect of a track's read cursor.
///
/// A detour jumps to another offset and snaps back to `return_to` once
/// `remaining` reads have happened there. There is no stack: arming a new
/// detour replaces the current one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Detour {
    #[default]
    Inactive,
    Armed { return_to: usize, remaining: u8 },
}

impl Detour {
    /// Count one read. Returns the return address when the countdown
    /// reaches zero, leaving the detour inactive.
    pub fn tick(&mut self) -> Option<usize> {
        let Detour::Armed { return_to, remaining } = self else {
            return None;
        };
        let return_to = *return_to;
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            *self = Detour::Inactive;
            Some(return_to)
        } else {
            None
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, Detour::Armed { .. })
    }
}

/// One output channel and the state that persists across sub-segment rows.
#[derive(Clone, Debug, Default)]
pub struct Track {
    /// Decoded events, sorted by time after each row
    pub events: Vec<Event>,
    /// Current cursor time in ticks
    pub time_at: Ticks,
    /// Coarse tuning offset in pitch-wheel units
    pub coarse_tune: f64,
    /// Fine tuning offset in pitch-wheel units
    pub fine_tune: f64,
    /// Segment track tuning offset in pitch-wheel units
    pub track_tune: f64,
    /// Bank used by plain patch selects
    pub patch_bank: u8,
    /// Last program emitted on this channel, if known
    pub active_patch: Option<u8>,
    /// Whether notes are currently remapped through the drum map
    pub drum_mode: bool,
    /// Pending cursor redirect
    pub detour: Detour,
}

impl Track {
    /// Create an empty track at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing was decoded for this channel.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event at the current cursor time.
    pub fn push(&mut self, source_offset: usize, payload: EventPayload) {
        self.push_at(self.time_at, source_offset, payload);
    }

    /// Append an event at an explicit time.
    pub fn push_at(&mut self, time: Ticks, source_offset: usize, payload: EventPayload) {
        self.events.push(Event::new(time, source_offset, payload));
    }

    /// Advance the cursor. Time never moves backwards.
    pub fn advance(&mut self, ticks: Ticks) {
        self.time_at = self.time_at.saturating_add(ticks);
    }

    /// Stable sort by time; events at equal times keep decode order.
    pub fn sort_events(&mut self) {
        self.events.sort_by_key(|e| e.time);
    }

    pub fn set_coarse_tune(&mut self, steps: i8) {
        self.coarse_tune = PITCH_STEP_COARSE * steps as f64;
    }

    pub fn set_fine_tune(&mut self, steps: i8) {
        self.fine_tune = PITCH_STEP_FINE * steps as f64;
    }

    /// Track tuning is given in cents.
    pub fn set_track_tune(&mut self, cents: i16) {
        self.track_tune = cents as f64 / 100.0 * PITCH_STEP_COARSE;
    }

    /// Sum of all three tuning offsets, truncated towards zero.
    pub fn pitch_offset(&self) -> i32 {
        (self.coarse_tune + self.fine_tune + self.track_tune) as i32
    }

    /// Total length in ticks: the latest event time.
    pub fn end_time(&self) -> Ticks {
        self.events.iter().map(|e| e.time).max().unwrap_or(0)
    }
}
