//! Drum note translation.
//!
//! In drum rows a note number selects a drum sound rather than a pitch.
//! Ids below [`DRUM_SLOT_BASE`] refer to the built-in drum set; ids from
//! the base upwards refer to drums embedded in the file, registered in
//! file order with [`DrumMap::add_drum`].

use tracing::debug;

use crate::{report, FormatError, Warning};

/// First slot used by embedded drums.
pub const DRUM_SLOT_BASE: usize = 72;

/// First slot past the end of the drum table.
pub const DRUM_SLOT_CEILING: usize = 100;

/// GS drum-set programs.
const STANDARD: u8 = 0;
const ROOM: u8 = 8;
const POWER: u8 = 16;
const ELECTRONIC: u8 = 24;
const TR808: u8 = 25;
const ORCHESTRA: u8 = 48;

/// Built-in drum set: note id → (output note, drum-set program).
const BASE_DRUMS: [(u8, u8); 48] = [
    (36, STANDARD),   // 0 kick
    (38, STANDARD),   // 1 snare
    (40, STANDARD),   // 2 electric snare
    (37, STANDARD),   // 3 side stick
    (39, STANDARD),   // 4 hand clap
    (42, STANDARD),   // 5 closed hi-hat
    (44, STANDARD),   // 6 pedal hi-hat
    (46, STANDARD),   // 7 open hi-hat
    (41, STANDARD),   // 8 low floor tom
    (43, STANDARD),   // 9 high floor tom
    (45, STANDARD),   // 10 low tom
    (47, STANDARD),   // 11 low-mid tom
    (48, STANDARD),   // 12 hi-mid tom
    (50, STANDARD),   // 13 high tom
    (49, STANDARD),   // 14 crash
    (57, STANDARD),   // 15 crash 2
    (51, STANDARD),   // 16 ride
    (59, STANDARD),   // 17 ride 2
    (53, STANDARD),   // 18 ride bell
    (55, STANDARD),   // 19 splash
    (52, STANDARD),   // 20 china
    (54, STANDARD),   // 21 tambourine
    (56, STANDARD),   // 22 cowbell
    (58, STANDARD),   // 23 vibraslap
    (60, STANDARD),   // 24 hi bongo
    (61, STANDARD),   // 25 low bongo
    (62, STANDARD),   // 26 mute hi conga
    (63, STANDARD),   // 27 open hi conga
    (64, STANDARD),   // 28 low conga
    (65, STANDARD),   // 29 high timbale
    (66, STANDARD),   // 30 low timbale
    (69, STANDARD),   // 31 cabasa
    (70, STANDARD),   // 32 maracas
    (75, STANDARD),   // 33 claves
    (76, STANDARD),   // 34 hi wood block
    (77, STANDARD),   // 35 low wood block
    (81, STANDARD),   // 36 open triangle
    (80, STANDARD),   // 37 mute triangle
    (35, ROOM),       // 38 room kick
    (38, ROOM),       // 39 room snare
    (36, POWER),      // 40 power kick
    (38, POWER),      // 41 power snare
    (36, ELECTRONIC), // 42 electronic kick
    (40, ELECTRONIC), // 43 electronic snare
    (36, TR808),      // 44 808 kick
    (39, TR808),      // 45 808 clap
    (41, ORCHESTRA),  // 46 timpani
    (52, ORCHESTRA),  // 47 concert cymbal
];

/// Embedded drum samples by one-byte sample id.
fn extended_sample(sample_id: u8) -> Option<(u8, u8)> {
    Some(match sample_id {
        0x00 => (36, STANDARD),
        0x01 => (38, STANDARD),
        0x02 => (42, STANDARD),
        0x03 => (46, STANDARD),
        0x04 => (49, STANDARD),
        0x05 => (51, STANDARD),
        0x06 => (45, STANDARD),
        0x07 => (48, STANDARD),
        0x08 => (39, STANDARD),
        0x09 => (54, STANDARD),
        0x0A => (56, STANDARD),
        0x0B => (75, STANDARD),
        0x0C => (70, STANDARD),
        0x0D => (81, STANDARD),
        0x10 => (60, STANDARD),
        0x11 => (61, STANDARD),
        0x12 => (63, STANDARD),
        0x13 => (64, STANDARD),
        0x18 => (36, TR808),
        0x19 => (38, TR808),
        0x1A => (39, TR808),
        0x1D => (41, ORCHESTRA),
        0x1E => (52, ORCHESTRA),
        _ => return None,
    })
}

/// Note id → (output note, output program) mapping.
#[derive(Clone, Debug)]
pub struct DrumMap {
    /// Mappings for slots `DRUM_SLOT_BASE..`
    extended: Vec<(u8, u8)>,
}

impl Default for DrumMap {
    fn default() -> Self {
        Self::new()
    }
}

impl DrumMap {
    /// Built-in drum set only.
    pub fn new() -> Self {
        Self {
            extended: Vec::new(),
        }
    }

    /// Next slot `add_drum` will fill.
    pub fn next_slot(&self) -> usize {
        DRUM_SLOT_BASE + self.extended.len()
    }

    /// Register one embedded drum in the next free slot and return the slot.
    ///
    /// Unknown sample ids map to `(slot - DRUM_SLOT_BASE, 0)` with a warning.
    pub fn add_drum(
        &mut self,
        sample_id: u8,
        warnings: &mut Vec<Warning>,
    ) -> Result<usize, FormatError> {
        let slot = self.next_slot();
        if slot >= DRUM_SLOT_CEILING {
            return Err(FormatError::DrumLimitExceeded { slot });
        }
        let mapping = match extended_sample(sample_id) {
            Some(m) => m,
            None => {
                report(
                    warnings,
                    Warning::UnmappedExtendedDrumSample { sample_id, slot },
                );
                ((slot - DRUM_SLOT_BASE) as u8, STANDARD)
            }
        };
        debug!(
            "drum slot {} <- sample {:#04X} -> note {} program {}",
            slot, sample_id, mapping.0, mapping.1
        );
        self.extended.push(mapping);
        Ok(slot)
    }

    /// Translate a drum note id. `offset` is only used for the error.
    pub fn lookup(&self, note: u8, offset: usize) -> Result<(u8, u8), FormatError> {
        let id = note as usize;
        let found = if id < DRUM_SLOT_BASE {
            BASE_DRUMS.get(id).copied()
        } else {
            self.extended.get(id - DRUM_SLOT_BASE).copied()
        };
        found.ok_or(FormatError::DrumMappingMissing { note, offset })
    }
}
