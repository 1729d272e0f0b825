//! Format codecs for bgmblaster.
//!
//! Decodes BGM sequence bytecode into the IR and encodes IR tracks as
//! delta-timed MIDI messages.

mod bgm_format;
mod container;
mod drum_map;
mod interpreter;
mod midi_format;
mod opcode;
mod patch_map;
mod reader;
mod tempo_fade;

pub use bgm_format::{load_bgm, DecodeContext, DecodeOptions, DEFAULT_TEMPO};
pub use container::{
    locate_segment, resolve_tracks, BgmHeader, DrumRecord, InstrumentRecord, Row, SegmentRows,
    TrackSlot, DRUM_ROW_FLAG,
};
pub use drum_map::{DrumMap, DRUM_SLOT_BASE, DRUM_SLOT_CEILING};
pub use interpreter::parse_track;
pub use midi_format::{
    bpm_to_micros, encode_sequence, encode_track, roland_checksum, EncodedTrack, OutputMessage,
    TimedMessage, PITCH_BEND_MAX, PITCH_BEND_MIN, PITCH_BEND_RANGE, TICKS_PER_BEAT,
};
pub use opcode::{param_len, param_reads, Opcode};
pub use patch_map::PatchMap;
pub use reader::BgmReader;
pub use tempo_fade::expand_tempo_fades;

use thiserror::Error;

/// Fatal input errors. Any of these aborts the whole conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Header slot for the requested segment is zero
    #[error("segment {id} is not present in this file")]
    SegmentNotFound { id: u8 },
    /// Only segments 0-3 exist
    #[error("segment id {id} is out of range (valid ids are 0-3)")]
    InvalidSegmentId { id: u8 },
    /// Buffer too short to hold the file header
    #[error("file is too short to contain a BGM header")]
    InvalidHeader,
    /// A read ran past the end of the buffer
    #[error("stream truncated at offset {offset:#06X}")]
    TruncatedStream { offset: usize },
    /// Drum-mode note with no entry in either drum table
    #[error("no drum mapping for note {note} (opcode at {offset:#06X})")]
    DrumMappingMissing { note: u8, offset: usize },
    /// Too many embedded drum records
    #[error("extended drum slot {slot} exceeds the drum table limit")]
    DrumLimitExceeded { slot: usize },
    /// Tempo fade with a zero duration
    #[error("tempo fade with zero duration (opcode at {offset:#06X})")]
    FadeTimeZero { offset: usize },
}

/// Recoverable problems. Processing continues with a clamped or default value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("pitch wheel value {value} out of range, clamped (opcode at {offset:#06X})")]
    PitchOutOfRange { value: i32, offset: usize },
    #[error("extended drum sample {sample_id:#04X} has no mapping, defaulting slot {slot}")]
    UnmappedExtendedDrumSample { sample_id: u8, slot: usize },
    #[error("file signature is not \"BGM \"")]
    UnexpectedSignature,
}

/// Log a warning and keep it for the caller.
pub(crate) fn report(warnings: &mut Vec<Warning>, warning: Warning) {
    tracing::warn!("{}", warning);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            FormatError::TruncatedStream { offset: 0x1A2 }.to_string(),
            "stream truncated at offset 0x01A2"
        );
        assert_eq!(
            FormatError::SegmentNotFound { id: 2 }.to_string(),
            "segment 2 is not present in this file"
        );
    }

    #[test]
    fn report_keeps_warning() {
        let mut warnings = Vec::new();
        report(&mut warnings, Warning::UnexpectedSignature);
        assert_eq!(warnings, vec![Warning::UnexpectedSignature]);
    }
}
