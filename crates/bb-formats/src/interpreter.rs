//! Per-track opcode interpreter.
//!
//! Runs one track fragment of a sub-segment row, appending events to the
//! track and updating its persistent state.

use bb_ir::{EventPayload, Ticks, Track};
use tracing::trace;

use crate::bgm_format::DecodeContext;
use crate::container::TrackSlot;
use crate::opcode::{param_len, param_reads, Opcode};
use crate::reader::BgmReader;
use crate::FormatError;

/// Controller numbers for the channel-level sends.
const CC_VOLUME: u8 = 7;
const CC_PAN: u8 = 10;
const CC_EXPRESSION: u8 = 11;
const CC_REVERB: u8 = 91;

/// Roland GS "use for rhythm part" parameter.
const PART_MODE_PARAM: u8 = 0x15;

/// Note lengths at or above this value take a second byte.
const LONG_LENGTH: u8 = 0xC0;

/// Body of the part-mode SysEx that switches a channel into or out of drum mode.
pub(crate) fn part_mode_payload(channel: u8, drums: bool) -> Vec<u8> {
    vec![0x40, 0x10 | (channel + 1), PART_MODE_PARAM, drums as u8]
}

/// Ticks for a long delta command (0x78-0x7F) followed by `b2`.
pub(crate) fn long_delta(cmd: u8, b2: u8) -> Ticks {
    (((cmd & 7) as Ticks) << 8) + b2 as Ticks + 0x78
}

/// Ticks for a long note length (first byte >= 0xC0) followed by `b2`.
pub(crate) fn long_length(length: u8, b2: u8) -> Ticks {
    (((length & !LONG_LENGTH) as Ticks) << 8) + b2 as Ticks + LONG_LENGTH as Ticks
}

/// Interpret the fragment at `slot` for `channel`.
///
/// Stops at a zero byte or at the end of the buffer. A detour still
/// pending when the fragment ends stays on the track for the next row.
pub fn parse_track(
    data: &[u8],
    slot: &TrackSlot,
    track: &mut Track,
    channel: u8,
    ctx: &mut DecodeContext,
) -> Result<(), FormatError> {
    if slot.is_drum_row != track.drum_mode {
        trace!("channel {} drum mode -> {}", channel, slot.is_drum_row);
        track.push(
            slot.start,
            EventPayload::SysEx {
                payload: part_mode_payload(channel, slot.is_drum_row),
            },
        );
        track.drum_mode = slot.is_drum_row;
        track.active_patch = None;
    }

    let mut r = BgmReader::with_detour(data, slot.start, track.detour);
    let result = run(&mut r, track, ctx);
    track.detour = r.detour();
    result
}

fn run(r: &mut BgmReader, track: &mut Track, ctx: &mut DecodeContext) -> Result<(), FormatError> {
    loop {
        if r.position() >= r.len() {
            return Ok(());
        }
        let at = r.position();
        let cmd = r.read_u8()?;

        match Opcode::decode(cmd) {
            Opcode::End => return Ok(()),
            Opcode::ShortDelta(ticks) => track.advance(ticks as Ticks),
            Opcode::LongDelta(cmd) => {
                let b2 = r.read_u8()?;
                track.advance(long_delta(cmd, b2));
            }
            Opcode::Note(note) => read_note(r, track, ctx, note, at)?,

            Opcode::MasterTempo => {
                let bpm = r.read_u16()?;
                track.push(at, EventPayload::TempoSet { bpm: bpm as i32 });
            }
            Opcode::MasterTempoFade => {
                let fade_ticks = r.read_u16()?;
                let target_bpm = r.read_u16()?;
                track.push(
                    at,
                    EventPayload::TempoFade {
                        target_bpm: target_bpm as i32,
                        fade_ticks: fade_ticks as Ticks,
                    },
                );
            }

            Opcode::TrackOverridePatch => {
                let bank = r.read_u8()?;
                let program = r.read_u8()?;
                track.patch_bank = bank;
                if !track.drum_mode {
                    track.push(at, EventPayload::program(bank, program));
                    track.active_patch = Some(program);
                }
            }
            Opcode::TrackVoice => {
                let voice = r.read_u8()?;
                if !track.drum_mode {
                    let (bank, program) = ctx
                        .patches
                        .lookup(voice)
                        .unwrap_or((track.patch_bank, voice));
                    track.push(at, EventPayload::program(bank, program));
                    track.active_patch = Some(program);
                }
            }

            Opcode::SubTrackVolume => control(r, track, at, CC_VOLUME)?,
            Opcode::SubTrackPan => control(r, track, at, CC_PAN)?,
            Opcode::SubTrackReverb => control(r, track, at, CC_REVERB)?,
            Opcode::SegTrackVolume => control(r, track, at, CC_EXPRESSION)?,

            Opcode::SubTrackCoarseTune => {
                let steps = r.read_i8()?;
                track.set_coarse_tune(steps);
                push_pitch(track, at);
            }
            Opcode::SubTrackFineTune => {
                let steps = r.read_i8()?;
                track.set_fine_tune(steps);
                push_pitch(track, at);
            }
            Opcode::SegTrackTune => {
                let cents = r.read_i16()?;
                track.set_track_tune(cents);
                push_pitch(track, at);
            }

            Opcode::Detour => {
                let target = r.read_u16()?;
                let count = r.read_u8()?;
                trace!("detour at {:#06X} -> {:#06X} for {} reads", at, target, count);
                r.start_detour(target as usize, count);
            }

            Opcode::Invalid(cmd) => {
                trace!("skipping invalid opcode {:#04X} at {:#06X}", cmd, at);
            }
            op => {
                debug_assert!(op.is_unmodeled());
                trace!("ignoring opcode {:#04X} at {:#06X} ({} bytes)", cmd, at, param_len(cmd));
                for &width in param_reads(cmd) {
                    r.discard(width as usize)?;
                }
            }
        }
    }
}

fn read_note(
    r: &mut BgmReader,
    track: &mut Track,
    ctx: &DecodeContext,
    note: u8,
    at: usize,
) -> Result<(), FormatError> {
    let velocity = r.read_u8()?;
    let first = r.read_u8()?;
    let length = if first >= LONG_LENGTH {
        let b2 = r.read_u8()?;
        long_length(first, b2)
    } else {
        first as Ticks
    };

    let key = if track.drum_mode {
        let (key, program) = ctx.drums.lookup(note, at)?;
        if track.active_patch != Some(program) {
            track.push(at, EventPayload::program(0, program));
            track.active_patch = Some(program);
        }
        key
    } else {
        note
    };

    track.push(at, EventPayload::note_on(key, velocity));
    track.push_at(
        track.time_at.saturating_add(length),
        at,
        EventPayload::note_off(key, velocity),
    );
    Ok(())
}

fn control(r: &mut BgmReader, track: &mut Track, at: usize, controller: u8) -> Result<(), FormatError> {
    let value = r.read_u8()?;
    track.push(at, EventPayload::control(controller, value));
    Ok(())
}

fn push_pitch(track: &mut Track, at: usize) {
    let value = track.pitch_offset();
    track.push(at, EventPayload::PitchWheel { value });
}
