//! Timed event types produced by the decoder.

use alloc::vec::Vec;

/// Sequence time in native ticks (48 per beat on output).
pub type Ticks = u32;

/// A decoded event on one track.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Absolute time in ticks
    pub time: Ticks,
    /// Byte offset of the opcode that produced the event (diagnostics only)
    pub source_offset: usize,
    /// What the event does
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event.
    pub fn new(time: Ticks, source_offset: usize, payload: EventPayload) -> Self {
        Self {
            time,
            source_offset,
            payload,
        }
    }

    /// True for the transient fade marker that never reaches the encoder.
    pub fn is_tempo_fade(&self) -> bool {
        matches!(self.payload, EventPayload::TempoFade { .. })
    }

    /// Tempo in BPM if this is an explicit tempo change.
    pub fn tempo(&self) -> Option<i32> {
        match self.payload {
            EventPayload::TempoSet { bpm } => Some(bpm),
            _ => None,
        }
    }
}

/// What an event does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventPayload {
    // === Note events ===
    /// Start a note
    NoteOn { note: u8, velocity: u8 },
    /// Release a note
    NoteOff { note: u8, velocity: u8 },

    // === Channel state ===
    /// Controller change (volume 7, pan 10, expression 11, reverb 91, ...)
    ControlChange { controller: u8, value: u8 },
    /// Bank select + program change pair
    ProgramChange { bank: u8, program: u8 },
    /// Pitch wheel, nominally -8192..=8191 for +/-24 semitones.
    /// Left unclamped here; the encoder clamps and reports.
    PitchWheel { value: i32 },

    // === Transport ===
    /// Set tempo in beats per minute
    TempoSet { bpm: i32 },
    /// Ramp towards `target_bpm` over `fade_ticks` ticks.
    /// Expanded into `TempoSet` events before encoding.
    TempoFade { target_bpm: i32, fade_ticks: Ticks },

    // === Vendor ===
    /// System exclusive body; header and checksum are added on encode
    SysEx { payload: Vec<u8> },
}

impl EventPayload {
    /// Note on with the velocity clamped to the 7-bit range.
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self::NoteOn {
            note: note.min(127),
            velocity: velocity.min(127),
        }
    }

    /// Note off with the velocity clamped to the 7-bit range.
    pub fn note_off(note: u8, velocity: u8) -> Self {
        Self::NoteOff {
            note: note.min(127),
            velocity: velocity.min(127),
        }
    }

    /// Controller change with both fields clamped to the 7-bit range.
    pub fn control(controller: u8, value: u8) -> Self {
        Self::ControlChange {
            controller: controller.min(127),
            value: value.min(127),
        }
    }

    /// Program change with bank and program clamped to the 7-bit range.
    pub fn program(bank: u8, program: u8) -> Self {
        Self::ProgramChange {
            bank: bank.min(127),
            program: program.min(127),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_clamp_to_seven_bits() {
        assert_eq!(
            EventPayload::note_on(60, 200),
            EventPayload::NoteOn { note: 60, velocity: 127 }
        );
        assert_eq!(
            EventPayload::program(0x30, 0x90),
            EventPayload::ProgramChange { bank: 0x30, program: 127 }
        );
        assert_eq!(
            EventPayload::control(7, 255),
            EventPayload::ControlChange { controller: 7, value: 127 }
        );
    }

    #[test]
    fn tempo_accessor() {
        let set = Event::new(0, 0, EventPayload::TempoSet { bpm: 120 });
        let fade = Event::new(0, 0, EventPayload::TempoFade { target_bpm: 90, fade_ticks: 4 });
        assert_eq!(set.tempo(), Some(120));
        assert_eq!(fade.tempo(), None);
        assert!(fade.is_tempo_fade());
    }
}
