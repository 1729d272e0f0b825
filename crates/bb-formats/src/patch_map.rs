//! Instrument lookup for track voice selects.

use crate::container::InstrumentRecord;

/// Voice numbers at or above this index refer to the embedded instrument table.
const EXTENDED_VOICE_BASE: u8 = 0x80;

/// Embedded instruments, indexed by `voice - 0x80`.
#[derive(Clone, Debug, Default)]
pub struct PatchMap {
    instruments: Vec<(u8, u8)>,
}

impl PatchMap {
    pub fn from_records(records: &[InstrumentRecord]) -> Self {
        Self {
            instruments: records.iter().map(|r| (r.bank(), r.patch())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// `(bank, program)` for a voice select, if it names an embedded instrument.
    pub fn lookup(&self, voice: u8) -> Option<(u8, u8)> {
        let index = voice.checked_sub(EXTENDED_VOICE_BASE)?;
        self.instruments.get(index as usize).copied()
    }
}
