//! A decoded segment: sixteen tracks plus header metadata.

use alloc::vec::Vec;
use arrayvec::{ArrayString, ArrayVec};

use crate::event::Ticks;
use crate::track::{Track, NUM_TRACKS};

/// The decoded form of one BGM segment.
#[derive(Clone, Debug)]
pub struct Sequence {
    /// Four-character song name from the file header
    pub name: ArrayString<16>,
    /// Segment id this sequence was decoded from (0-3)
    pub segment: u8,
    /// One track per output channel
    pub tracks: ArrayVec<Track, NUM_TRACKS>,
}

impl Sequence {
    /// Create a sequence with all sixteen tracks empty.
    pub fn new(name: &str, segment: u8) -> Self {
        let mut seq_name = ArrayString::new();
        let _ = seq_name.try_push_str(name);
        let mut tracks = ArrayVec::new();
        for _ in 0..NUM_TRACKS {
            tracks.push(Track::new());
        }
        Self {
            name: seq_name,
            segment,
            tracks,
        }
    }

    /// Align every track clock to track 0.
    ///
    /// Called at the start of each sub-segment row; this is the only point
    /// where track clocks interact.
    pub fn resync_clocks(&mut self) {
        let bar = self.tracks[0].time_at;
        for track in self.tracks.iter_mut() {
            track.time_at = bar;
        }
    }

    /// Length of the sequence in ticks.
    pub fn total_time(&self) -> Ticks {
        self.tracks.iter().map(Track::end_time).max().unwrap_or(0)
    }

    /// Event counts for every non-empty track.
    pub fn summary(&self) -> Vec<TrackSummary> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_empty())
            .map(|(i, t)| TrackSummary {
                channel: i as u8,
                events: t.events.len(),
                end_time: t.end_time(),
                drum_mode: t.drum_mode,
            })
            .collect()
    }
}

/// Per-track statistics for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackSummary {
    pub channel: u8,
    pub events: usize,
    pub end_time: Ticks,
    pub drum_mode: bool,
}
