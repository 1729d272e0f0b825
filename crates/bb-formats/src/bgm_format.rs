//! BGM segment loader.
//!
//! Walks one segment row by row, interprets every active track fragment
//! and expands tempo fades once all rows are done.

use bb_ir::Sequence;
use tracing::debug;

use crate::container::{locate_segment, resolve_tracks, BgmHeader, SegmentRows};
use crate::drum_map::DrumMap;
use crate::interpreter::parse_track;
use crate::patch_map::PatchMap;
use crate::tempo_fade::expand_tempo_fades;
use crate::{report, FormatError, Warning};

/// Running tempo assumed before the first explicit tempo change.
pub const DEFAULT_TEMPO: i32 = 156;

/// What to decode and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Segment id, 0-3
    pub segment: u8,
    /// Remap notes in drum rows through the drum map
    pub drum_translation: bool,
    /// Starting tempo for fade expansion
    pub default_tempo: i32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            segment: 0,
            drum_translation: true,
            default_tempo: DEFAULT_TEMPO,
        }
    }
}

/// Lookup tables shared by every track of one decode, plus the warnings
/// collected so far.
#[derive(Clone, Debug, Default)]
pub struct DecodeContext {
    pub drums: DrumMap,
    pub patches: PatchMap,
    pub warnings: Vec<Warning>,
}

impl DecodeContext {
    /// Built-in drum set and no embedded instruments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded drum and instrument tables.
    ///
    /// Embedded drums are only registered when drum translation is on.
    pub fn from_header(
        header: &BgmHeader,
        data: &[u8],
        drum_translation: bool,
    ) -> Result<Self, FormatError> {
        let mut ctx = Self::new();
        if drum_translation {
            for record in header.drum_records(data)? {
                ctx.drums.add_drum(record.sample_id(), &mut ctx.warnings)?;
            }
        }
        ctx.patches = PatchMap::from_records(&header.instrument_records(data)?);
        debug!(
            "{} embedded drums, {} embedded instruments",
            ctx.drums.next_slot() - crate::DRUM_SLOT_BASE,
            ctx.patches.len()
        );
        Ok(ctx)
    }
}

/// Decode one segment of a BGM file.
///
/// Returns the sequence with fades expanded and every track sorted, and
/// the warnings raised along the way.
pub fn load_bgm(
    data: &[u8],
    options: &DecodeOptions,
) -> Result<(Sequence, Vec<Warning>), FormatError> {
    let header = BgmHeader::parse(data)?;
    let mut warnings = Vec::new();
    if !header.has_signature() {
        report(&mut warnings, Warning::UnexpectedSignature);
    }

    let mut ctx = DecodeContext::from_header(&header, data, options.drum_translation)?;
    warnings.append(&mut ctx.warnings);

    let segment = locate_segment(data, options.segment)?;
    let mut seq = Sequence::new(&header.name(), options.segment);

    for (index, row) in SegmentRows::new(data, segment).enumerate() {
        let row = row?;
        seq.resync_clocks();
        let Some(sub_segment) = row.sub_segment else {
            debug!("row {}: rest", index);
            continue;
        };
        debug!("row {}: sub-segment at {:#06X}", index, sub_segment);

        let slots = resolve_tracks(data, sub_segment, options.drum_translation)?;
        for (channel, (track, slot)) in seq.tracks.iter_mut().zip(slots.iter()).enumerate() {
            let Some(slot) = slot else {
                continue;
            };
            parse_track(data, slot, track, channel as u8, &mut ctx)?;
            track.sort_events();
        }
    }

    for track in seq.tracks.iter_mut() {
        expand_tempo_fades(track, options.default_tempo)?;
    }
    for summary in seq.summary() {
        debug!(
            "channel {}: {} events, ends at {}",
            summary.channel, summary.events, summary.end_time
        );
    }

    warnings.append(&mut ctx.warnings);
    Ok((seq, warnings))
}
