//! Core IR types for bgmblaster.
//!
//! This crate defines the timed event representation shared by the
//! BGM decoder and the MIDI encoder. The decoder appends events to
//! per-channel tracks, the tempo-fade post-pass rewrites them, and the
//! encoder consumes them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod sequence;
mod track;

pub use event::{Event, EventPayload, Ticks};
pub use sequence::{Sequence, TrackSummary};
pub use track::{Detour, Track, NUM_TRACKS, PITCH_STEP_COARSE, PITCH_STEP_FINE};
