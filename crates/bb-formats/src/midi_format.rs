//! MIDI protocol encoder.
//!
//! Turns each decoded track into delta-timed channel messages. Writing the
//! messages into a file container is left to the caller.

use bb_ir::{EventPayload, Sequence, Ticks, Track};
use tracing::debug;

use crate::{report, Warning};

/// Output resolution. Native ticks map 1:1 onto MIDI ticks at this rate.
pub const TICKS_PER_BEAT: u16 = 48;

/// Pitch-bend range registered at the start of every track, in semitones.
pub const PITCH_BEND_RANGE: u8 = 24;

pub const PITCH_BEND_MIN: i32 = -8192;
pub const PITCH_BEND_MAX: i32 = 8191;

/// Roland manufacturer id, device id, GS model id, DT1 command.
const ROLAND_DT1_HEADER: [u8; 4] = [0x41, 0x10, 0x42, 0x12];

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

const CC_BANK_SELECT: u8 = 0;
const CC_DATA_ENTRY: u8 = 6;
const CC_RPN_LSB: u8 = 100;
const CC_RPN_MSB: u8 = 101;

/// Largest value a 24-bit tempo meta event can hold.
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

/// One encoded message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputMessage {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Signed bend, -8192..=8191
    PitchBend { channel: u8, value: i16 },
    /// Microseconds per beat
    Tempo(u32),
    /// Complete message, `F0` through `F7`
    SysEx(Vec<u8>),
}

/// A message and the ticks since the previous one on the same track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimedMessage {
    pub delta: u32,
    pub message: OutputMessage,
}

impl TimedMessage {
    fn new(delta: u32, message: OutputMessage) -> Self {
        Self { delta, message }
    }
}

/// Messages for one channel, in output order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTrack {
    pub channel: u8,
    pub messages: Vec<TimedMessage>,
}

/// Roland checksum: the value that brings the byte sum to a multiple of 128.
pub fn roland_checksum(payload: &[u8]) -> u8 {
    let sum: u32 = payload.iter().map(|&b| b as u32).sum();
    ((128 - sum % 128) & 0x7F) as u8
}

/// Convert beats per minute to microseconds per beat.
pub fn bpm_to_micros(bpm: i32) -> u32 {
    let bpm = bpm.max(1) as u64;
    let micros = (60_000_000 + bpm / 2) / bpm;
    if micros > MAX_TEMPO_MICROS as u64 {
        debug!("tempo {} bpm is too slow, clamping", bpm);
        MAX_TEMPO_MICROS
    } else {
        micros as u32
    }
}

/// Wrap a SysEx body in the Roland DT1 frame.
fn roland_sysex(payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 7);
    bytes.push(SYSEX_START);
    bytes.extend_from_slice(&ROLAND_DT1_HEADER);
    bytes.extend_from_slice(payload);
    bytes.push(roland_checksum(payload));
    bytes.push(SYSEX_END);
    bytes
}

/// Pitch-bend range registration: RPN 0/0, data entry = range.
fn preamble(channel: u8) -> [TimedMessage; 3] {
    let cc = |controller, value| {
        TimedMessage::new(
            0,
            OutputMessage::Controller {
                channel,
                controller,
                value,
            },
        )
    };
    [
        cc(CC_RPN_MSB, 0),
        cc(CC_RPN_LSB, 0),
        cc(CC_DATA_ENTRY, PITCH_BEND_RANGE),
    ]
}

/// Encode one track. Returns `None` for a track with no events.
///
/// Events must be time-sorted with tempo fades already expanded; any
/// remaining fade marker is dropped.
pub fn encode_track(track: &Track, channel: u8, warnings: &mut Vec<Warning>) -> Option<EncodedTrack> {
    if track.is_empty() {
        return None;
    }

    let mut messages = Vec::with_capacity(track.events.len() + 3);
    messages.extend(preamble(channel));

    let mut last: Ticks = 0;
    for event in &track.events {
        let delta = event.time.saturating_sub(last);
        let message = match &event.payload {
            EventPayload::NoteOn { note, velocity } => OutputMessage::NoteOn {
                channel,
                key: *note,
                velocity: *velocity,
            },
            EventPayload::NoteOff { note, velocity } => OutputMessage::NoteOff {
                channel,
                key: *note,
                velocity: *velocity,
            },
            EventPayload::ControlChange { controller, value } => OutputMessage::Controller {
                channel,
                controller: *controller,
                value: *value,
            },
            EventPayload::ProgramChange { bank, program } => {
                messages.push(TimedMessage::new(
                    delta,
                    OutputMessage::Controller {
                        channel,
                        controller: CC_BANK_SELECT,
                        value: *bank,
                    },
                ));
                last = event.time;
                messages.push(TimedMessage::new(
                    0,
                    OutputMessage::ProgramChange {
                        channel,
                        program: *program,
                    },
                ));
                continue;
            }
            EventPayload::PitchWheel { value } => {
                if !(PITCH_BEND_MIN..=PITCH_BEND_MAX).contains(value) {
                    report(
                        warnings,
                        Warning::PitchOutOfRange {
                            value: *value,
                            offset: event.source_offset,
                        },
                    );
                }
                OutputMessage::PitchBend {
                    channel,
                    value: (*value).clamp(PITCH_BEND_MIN, PITCH_BEND_MAX) as i16,
                }
            }
            EventPayload::TempoSet { bpm } => OutputMessage::Tempo(bpm_to_micros(*bpm)),
            EventPayload::TempoFade { .. } => continue,
            EventPayload::SysEx { payload } => OutputMessage::SysEx(roland_sysex(payload)),
        };
        messages.push(TimedMessage::new(delta, message));
        last = event.time;
    }

    Some(EncodedTrack { channel, messages })
}

/// Encode every non-empty track, in channel order.
pub fn encode_sequence(seq: &Sequence, warnings: &mut Vec<Warning>) -> Vec<EncodedTrack> {
    seq.tracks
        .iter()
        .enumerate()
        .filter_map(|(channel, track)| encode_track(track, channel as u8, warnings))
        .collect()
}
