//! Headless controller for bgmblaster.
//!
//! Owns the decode options, the decoded sequence and the warnings raised
//! while decoding and encoding, so the CLI and tests share one API.

mod smf;

use std::io::Write;

use thiserror::Error;
use tracing::debug;

// Re-export common types so callers don't need bb-ir/bb-formats directly.
pub use bb_formats::{
    DecodeOptions, EncodedTrack, FormatError, Warning, DEFAULT_TEMPO, TICKS_PER_BEAT,
};
pub use bb_ir::{Event, EventPayload, Sequence, Ticks, TrackSummary};

pub use smf::{tracks_to_bytes, tracks_to_smf, write_smf};

/// Errors from a full conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("failed to write MIDI file: {0}")]
    Io(#[from] std::io::Error),
    #[error("no sequence loaded")]
    NothingLoaded,
}

/// Conversion settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    pub decode: DecodeOptions,
    /// Resolution written to the file header
    pub ticks_per_beat: u16,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            ticks_per_beat: TICKS_PER_BEAT,
        }
    }
}

/// What was decoded, for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub name: String,
    pub segment: u8,
    /// Sequence length in ticks
    pub length: Ticks,
    pub tracks: Vec<TrackSummary>,
}

/// Headless converter: owns one decoded sequence at a time.
pub struct Controller {
    options: ConvertOptions,
    sequence: Option<Sequence>,
    warnings: Vec<Warning>,
    /// How many of `warnings` came from decoding; the rest are from the last encode.
    decode_warnings: usize,
}

impl Controller {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            sequence: None,
            warnings: Vec::new(),
            decode_warnings: 0,
        }
    }

    // --- Decoding ---

    /// Decode the configured segment, replacing any previous sequence.
    pub fn load_bgm(&mut self, data: &[u8]) -> Result<(), FormatError> {
        self.sequence = None;
        self.warnings.clear();
        self.decode_warnings = 0;
        let (sequence, warnings) = bb_formats::load_bgm(data, &self.options.decode)?;
        debug!(
            "loaded \"{}\" segment {}: {} ticks",
            sequence.name,
            sequence.segment,
            sequence.total_time()
        );
        self.sequence = Some(sequence);
        self.decode_warnings = warnings.len();
        self.warnings = warnings;
        Ok(())
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// Warnings from the last load plus those from the last encode.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn summary(&self) -> Option<Summary> {
        let seq = self.sequence.as_ref()?;
        Some(Summary {
            name: seq.name.to_string(),
            segment: seq.segment,
            length: seq.total_time(),
            tracks: seq.summary(),
        })
    }

    // --- Encoding ---

    /// Encode every non-empty track into delta-timed messages.
    pub fn encode(&mut self) -> Result<Vec<EncodedTrack>, ConvertError> {
        let seq = self.sequence.as_ref().ok_or(ConvertError::NothingLoaded)?;
        self.warnings.truncate(self.decode_warnings);
        Ok(bb_formats::encode_sequence(seq, &mut self.warnings))
    }

    /// Encode and write a complete standard MIDI file.
    pub fn write_smf(&mut self, w: &mut impl Write) -> Result<(), ConvertError> {
        let tracks = self.encode()?;
        smf::write_smf(w, &tracks, self.options.ticks_per_beat)?;
        Ok(())
    }

    /// Encode into an in-memory standard MIDI file.
    pub fn render_smf(&mut self) -> Result<Vec<u8>, ConvertError> {
        let tracks = self.encode()?;
        debug!("encoded {} tracks", tracks.len());
        Ok(smf::tracks_to_bytes(&tracks, self.options.ticks_per_beat))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}
