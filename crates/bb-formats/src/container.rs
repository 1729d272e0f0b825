//! BGM container navigation.
//!
//! Header → segment table → sub-segment rows → per-channel track slots.
//! Every stored offset is in 4-byte units.

use std::io::Cursor;

use bb_ir::NUM_TRACKS;
use binrw::BinRead;
use tracing::debug;

use crate::reader::BgmReader;
use crate::FormatError;

/// Offset of the segment table in the header.
const SEGMENT_TABLE: usize = 0x14;

/// Size of the fixed header.
const HEADER_SIZE: usize = 0x24;

/// Number of requestable segments.
const NUM_SEGMENTS: u8 = 4;

/// Bytes per drum record.
const DRUM_RECORD_SIZE: usize = 12;

/// Bytes per instrument record.
const INSTRUMENT_RECORD_SIZE: usize = 8;

/// Sub-segment slot flag marking a drum row.
pub const DRUM_ROW_FLAG: u16 = 0x0080;

// ---------------------------------------------------------------------------
// Header and embedded tables
// ---------------------------------------------------------------------------

/// Fixed file header.
#[derive(Clone, Debug, BinRead)]
#[br(big)]
pub struct BgmHeader {
    pub signature: [u8; 4],
    pub size: u32,
    #[br(pad_after = 4)]
    pub name: [u8; 4],
    #[br(pad_after = 3)]
    pub segment_count: u8,
    pub segment_offsets: [u16; 4],
    pub drums_offset: u16,
    pub drum_count: u16,
    pub instruments_offset: u16,
    pub instrument_count: u16,
}

impl BgmHeader {
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::InvalidHeader);
        }
        Self::read(&mut Cursor::new(data)).map_err(|_| FormatError::InvalidHeader)
    }

    pub fn has_signature(&self) -> bool {
        &self.signature == b"BGM "
    }

    /// Song name with trailing NULs and spaces removed.
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).trim().to_string()
    }

    /// Embedded drum records, in file order. Empty when the table is absent.
    pub fn drum_records(&self, data: &[u8]) -> Result<Vec<DrumRecord>, FormatError> {
        read_table(
            data,
            self.drums_offset,
            self.drum_count,
            DRUM_RECORD_SIZE,
            |c| DrumRecord::read(c),
        )
    }

    /// Embedded instrument records, in file order. Empty when the table is absent.
    pub fn instrument_records(&self, data: &[u8]) -> Result<Vec<InstrumentRecord>, FormatError> {
        read_table(
            data,
            self.instruments_offset,
            self.instrument_count,
            INSTRUMENT_RECORD_SIZE,
            |c| InstrumentRecord::read(c),
        )
    }
}

fn read_table<T>(
    data: &[u8],
    offset: u16,
    count: u16,
    record_size: usize,
    parse: impl Fn(&mut Cursor<&[u8]>) -> binrw::BinResult<T>,
) -> Result<Vec<T>, FormatError> {
    if offset == 0 || count == 0 {
        return Ok(Vec::new());
    }
    let base = (offset as usize) << 2;
    let mut records = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let at = base + i * record_size;
        let bytes = data
            .get(at..at + record_size)
            .ok_or(FormatError::TruncatedStream { offset: at })?;
        let record = parse(&mut Cursor::new(bytes))
            .map_err(|_| FormatError::TruncatedStream { offset: at })?;
        records.push(record);
    }
    Ok(records)
}

/// Drum instrument record from the embedded drum table.
#[derive(Clone, Copy, Debug, BinRead)]
#[br(big)]
pub struct DrumRecord {
    pub bank_patch: u16,
    pub key_base: u16,
    pub volume: u8,
    pub pan: i8,
    pub reverb: u8,
    pub random_tune: u8,
    pub random_volume: u8,
    pub random_pan: u8,
    #[br(pad_after = 1)]
    pub random_reverb: u8,
}

impl DrumRecord {
    /// One-byte sample id: the patch half of `bank_patch`.
    pub fn sample_id(&self) -> u8 {
        (self.bank_patch & 0xFF) as u8
    }
}

/// Instrument record from the embedded instrument table.
#[derive(Clone, Copy, Debug, BinRead)]
#[br(big)]
pub struct InstrumentRecord {
    pub bank_patch: u16,
    pub volume: u8,
    pub pan: i8,
    pub reverb: u8,
    pub coarse_tune: u8,
    #[br(pad_after = 1)]
    pub fine_tune: u8,
}

impl InstrumentRecord {
    pub fn bank(&self) -> u8 {
        (self.bank_patch >> 8) as u8
    }

    pub fn patch(&self) -> u8 {
        (self.bank_patch & 0xFF) as u8
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Absolute offset of segment `id`.
pub fn locate_segment(data: &[u8], id: u8) -> Result<usize, FormatError> {
    if id >= NUM_SEGMENTS {
        return Err(FormatError::InvalidSegmentId { id });
    }
    let mut r = BgmReader::new(data);
    r.seek(SEGMENT_TABLE + id as usize * 2);
    let offset = (r.read_u16()? as usize) << 2;
    if offset == 0 {
        return Err(FormatError::SegmentNotFound { id });
    }
    debug!("segment {} at {:#06X}", id, offset);
    Ok(offset)
}

/// One row of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    /// Non-zero control word
    pub control: u16,
    /// Absolute sub-segment offset, `None` for a rest row
    pub sub_segment: Option<usize>,
}

/// Rows of a segment, ending at the first zero control word.
pub struct SegmentRows<'a> {
    reader: BgmReader<'a>,
    start: usize,
    finished: bool,
}

impl<'a> SegmentRows<'a> {
    pub fn new(data: &'a [u8], segment_offset: usize) -> Self {
        let mut reader = BgmReader::new(data);
        reader.seek(segment_offset);
        Self {
            reader,
            start: segment_offset,
            finished: false,
        }
    }

    fn read_row(&mut self) -> Result<Option<Row>, FormatError> {
        let control = self.reader.read_u16()?;
        if control == 0 {
            return Ok(None);
        }
        let relative = (self.reader.read_u16()? as usize) << 2;
        let sub_segment = (relative != 0).then(|| self.start + relative);
        Ok(Some(Row {
            control,
            sub_segment,
        }))
    }
}

impl Iterator for SegmentRows<'_> {
    type Item = Result<Row, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-segments
// ---------------------------------------------------------------------------

/// Where a channel's fragment starts in this row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackSlot {
    /// Absolute offset of the opcode stream
    pub start: usize,
    /// Notes in this row go through the drum map
    pub is_drum_row: bool,
}

/// Read the sixteen `(offset, flags)` slots of a sub-segment.
pub fn resolve_tracks(
    data: &[u8],
    sub_segment: usize,
    drum_translation: bool,
) -> Result<[Option<TrackSlot>; NUM_TRACKS], FormatError> {
    let mut r = BgmReader::new(data);
    r.seek(sub_segment);
    let mut slots = [None; NUM_TRACKS];
    for slot in slots.iter_mut() {
        let relative = r.read_u16()? as usize;
        let flags = r.read_u16()?;
        if relative == 0 {
            continue;
        }
        *slot = Some(TrackSlot {
            start: sub_segment + relative,
            is_drum_row: drum_translation && flags & DRUM_ROW_FLAG != 0,
        });
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(segments: [u16; 4]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"BGM ");
        buf.extend_from_slice(&0x100u32.to_be_bytes());
        buf.extend_from_slice(b"113\0");
        buf.extend_from_slice(&[0; 4]);
        buf.push(4);
        buf.extend_from_slice(&[0; 3]);
        for s in segments {
            buf.extend_from_slice(&s.to_be_bytes());
        }
        buf.extend_from_slice(&[0; 8]);
        buf
    }

    #[test]
    fn header_parses() {
        let data = header_bytes([0x0A, 0, 0x20, 0]);
        let header = BgmHeader::parse(&data).unwrap();
        assert!(header.has_signature());
        assert_eq!(header.name(), "113");
        assert_eq!(header.segment_count, 4);
        assert_eq!(header.segment_offsets, [0x0A, 0, 0x20, 0]);
        assert_eq!(header.drum_count, 0);
    }

    #[test]
    fn short_header_rejected() {
        assert_eq!(
            BgmHeader::parse(b"BGM ").unwrap_err(),
            FormatError::InvalidHeader
        );
    }

    #[test]
    fn locate_scales_by_four() {
        let data = header_bytes([0x0A, 0, 0x20, 0]);
        assert_eq!(locate_segment(&data, 0), Ok(0x28));
        assert_eq!(locate_segment(&data, 2), Ok(0x80));
    }

    #[test]
    fn missing_segment() {
        let data = header_bytes([0x0A, 0, 0x20, 0]);
        assert_eq!(
            locate_segment(&data, 1),
            Err(FormatError::SegmentNotFound { id: 1 })
        );
        assert_eq!(
            locate_segment(&data, 4),
            Err(FormatError::InvalidSegmentId { id: 4 })
        );
    }

    #[test]
    fn rows_stop_at_zero_control() {
        let mut data = vec![0u8; 0x10];
        // segment at 0: (cmd, sub) pairs
        data[0..4].copy_from_slice(&[0x30, 0x00, 0x00, 0x01]);
        data[4..8].copy_from_slice(&[0x30, 0x00, 0x00, 0x00]);
        data[8..12].copy_from_slice(&[0x00, 0x00, 0x00, 0x02]);

        let rows: Vec<Row> = SegmentRows::new(&data, 0)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                Row { control: 0x3000, sub_segment: Some(4) },
                Row { control: 0x3000, sub_segment: None },
            ]
        );
    }

    #[test]
    fn rows_truncated() {
        let data = [0x30, 0x00, 0x00];
        let mut rows = SegmentRows::new(&data, 0);
        assert_eq!(
            rows.next(),
            Some(Err(FormatError::TruncatedStream { offset: 2 }))
        );
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn slots_resolve_relative_to_sub_segment() {
        let mut data = vec![0u8; 0x100];
        let sub = 0x20;
        // channel 0 → +0x40, channel 3 → +0x50 drum
        data[sub..sub + 4].copy_from_slice(&[0x00, 0x40, 0x00, 0x00]);
        data[sub + 12..sub + 16].copy_from_slice(&[0x00, 0x50, 0x00, 0x80]);

        let slots = resolve_tracks(&data, sub, true).unwrap();
        assert_eq!(slots[0], Some(TrackSlot { start: 0x60, is_drum_row: false }));
        assert_eq!(slots[1], None);
        assert_eq!(slots[3], Some(TrackSlot { start: 0x70, is_drum_row: true }));

        let slots = resolve_tracks(&data, sub, false).unwrap();
        assert_eq!(slots[3], Some(TrackSlot { start: 0x70, is_drum_row: false }));
    }

    #[test]
    fn drum_and_instrument_tables() {
        let mut data = header_bytes([0x0A, 0, 0, 0]);
        // drums at 0x40 (offset 0x10), instruments at 0x50 (offset 0x14)
        data[0x1C..0x24].copy_from_slice(&[0x00, 0x10, 0x00, 0x01, 0x00, 0x14, 0x00, 0x01]);
        data.resize(0x60, 0);
        data[0x40..0x4C].copy_from_slice(&[0x30, 0x1D, 0x00, 0x3C, 100, 0xF0, 10, 0, 0, 0, 0, 0]);
        data[0x50..0x58].copy_from_slice(&[0x31, 0x05, 90, 0, 0, 0, 0, 0]);

        let header = BgmHeader::parse(&data).unwrap();
        let drums = header.drum_records(&data).unwrap();
        assert_eq!(drums.len(), 1);
        assert_eq!(drums[0].sample_id(), 0x1D);
        assert_eq!(drums[0].key_base, 0x3C);
        assert_eq!(drums[0].pan, -16);

        let instruments = header.instrument_records(&data).unwrap();
        assert_eq!(instruments[0].bank(), 0x31);
        assert_eq!(instruments[0].patch(), 0x05);
        assert_eq!(instruments[0].volume, 90);
    }

    #[test]
    fn truncated_drum_table() {
        let mut data = header_bytes([0x0A, 0, 0, 0]);
        data[0x1C..0x20].copy_from_slice(&[0x00, 0x10, 0x00, 0x02]);
        data.resize(0x4C, 0);
        let header = BgmHeader::parse(&data).unwrap();
        assert_eq!(
            header.drum_records(&data).unwrap_err(),
            FormatError::TruncatedStream { offset: 0x4C }
        );
    }
}
