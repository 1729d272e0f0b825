//! BGM track opcodes.
//!
//! Bytes below 0x80 are delta times, 0x80-0xD3 are notes and 0xE0-0xFF
//! are control commands with a fixed number of parameter bytes.

/// Parameter byte counts for commands 0xE0-0xFF.
const CMD_LENGTHS: [u8; 32] = [
    2, 1, 1, 1, 4, 3, 2, 0, //
    2, 1, 1, 1, 1, 1, 1, 2, //
    3, 1, 1, 0, 2, 1, 3, 1, //
    0, 0, 0, 0, 3, 3, 3, 3, //
];

/// Width of each separate parameter read for commands 0xE0-0xFF.
/// Every entry is one read against an active detour.
const PARAM_READS: [&[u8]; 32] = [
    &[2], &[1], &[1], &[1], &[2, 2], &[2, 1], &[1, 1], &[], //
    &[1, 1], &[1], &[1], &[1], &[1], &[1], &[1], &[2], //
    &[1, 1, 1], &[1], &[1], &[], &[1, 1], &[1], &[2, 1], &[1], //
    &[], &[], &[], &[], &[2, 1], &[3], &[2, 1], &[1, 1, 1], //
];

/// Number of parameter bytes that follow a control command.
pub fn param_len(cmd: u8) -> usize {
    if cmd >= 0xE0 {
        CMD_LENGTHS[(cmd - 0xE0) as usize] as usize
    } else {
        0
    }
}

/// How a control command's parameters are read, one width per read.
pub fn param_reads(cmd: u8) -> &'static [u8] {
    if cmd >= 0xE0 {
        PARAM_READS[(cmd - 0xE0) as usize]
    } else {
        &[]
    }
}

/// A decoded command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// 0x00: end of the track fragment
    End,
    /// 0x01-0x77: advance by the byte value
    ShortDelta(u8),
    /// 0x78-0x7F: 11-bit delta, one more byte follows
    LongDelta(u8),
    /// 0x80-0xD3: note number in the low seven bits
    Note(u8),
    /// 0xE0
    MasterTempo,
    /// 0xE1
    MasterVolume,
    /// 0xE2
    MasterTranspose,
    /// 0xE4
    MasterTempoFade,
    /// 0xE5
    MasterVolumeFade,
    /// 0xE6
    MasterEffect,
    /// 0xE8
    TrackOverridePatch,
    /// 0xE9
    SubTrackVolume,
    /// 0xEA
    SubTrackPan,
    /// 0xEB
    SubTrackReverb,
    /// 0xEC
    SegTrackVolume,
    /// 0xED
    SubTrackCoarseTune,
    /// 0xEE
    SubTrackFineTune,
    /// 0xEF
    SegTrackTune,
    /// 0xF0
    TrackTremolo,
    /// 0xF1
    TrackTremoloSpeed,
    /// 0xF2
    TrackTremoloTime,
    /// 0xF5
    TrackVoice,
    /// 0xF6
    TrackVolumeFade,
    /// 0xF7
    SubTrackReverbType,
    /// 0xFC
    Jump,
    /// 0xFD
    EventTrigger,
    /// 0xFE
    Detour,
    /// Remaining 0xE0-0xFF commands with no known meaning
    Unknown(u8),
    /// 0xD4-0xDF: no dispatch arm
    Invalid(u8),
}

impl Opcode {
    pub fn decode(cmd: u8) -> Self {
        match cmd {
            0x00 => Opcode::End,
            0x01..=0x77 => Opcode::ShortDelta(cmd),
            0x78..=0x7F => Opcode::LongDelta(cmd),
            0x80..=0xD3 => Opcode::Note(cmd & 0x7F),
            0xD4..=0xDF => Opcode::Invalid(cmd),
            0xE0 => Opcode::MasterTempo,
            0xE1 => Opcode::MasterVolume,
            0xE2 => Opcode::MasterTranspose,
            0xE4 => Opcode::MasterTempoFade,
            0xE5 => Opcode::MasterVolumeFade,
            0xE6 => Opcode::MasterEffect,
            0xE8 => Opcode::TrackOverridePatch,
            0xE9 => Opcode::SubTrackVolume,
            0xEA => Opcode::SubTrackPan,
            0xEB => Opcode::SubTrackReverb,
            0xEC => Opcode::SegTrackVolume,
            0xED => Opcode::SubTrackCoarseTune,
            0xEE => Opcode::SubTrackFineTune,
            0xEF => Opcode::SegTrackTune,
            0xF0 => Opcode::TrackTremolo,
            0xF1 => Opcode::TrackTremoloSpeed,
            0xF2 => Opcode::TrackTremoloTime,
            0xF5 => Opcode::TrackVoice,
            0xF6 => Opcode::TrackVolumeFade,
            0xF7 => Opcode::SubTrackReverbType,
            0xFC => Opcode::Jump,
            0xFD => Opcode::EventTrigger,
            0xFE => Opcode::Detour,
            _ => Opcode::Unknown(cmd),
        }
    }

    /// Opcodes that are read to stay aligned but produce no event.
    pub fn is_unmodeled(self) -> bool {
        matches!(
            self,
            Opcode::MasterVolume
                | Opcode::MasterTranspose
                | Opcode::MasterVolumeFade
                | Opcode::MasterEffect
                | Opcode::TrackTremolo
                | Opcode::TrackTremoloSpeed
                | Opcode::TrackTremoloTime
                | Opcode::TrackVolumeFade
                | Opcode::SubTrackReverbType
                | Opcode::Jump
                | Opcode::EventTrigger
                | Opcode::Unknown(_)
        )
    }
}
