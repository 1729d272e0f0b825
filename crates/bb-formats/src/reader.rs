//! Big-endian cursor over a BGM buffer with an attached detour countdown.

use bb_ir::Detour;

use crate::FormatError;

/// Reads allowed per input byte. Detours can revisit bytes, but a cursor
/// that keeps going past this is stuck in a detour loop.
const READS_PER_BYTE: usize = 256;

/// Cursor over the input bytes.
///
/// Every read counts against the attached [`Detour`]: once its countdown
/// runs out the cursor snaps back to the stored return address. A
/// multi-byte read counts once.
pub struct BgmReader<'a> {
    data: &'a [u8],
    pos: usize,
    detour: Detour,
    reads_left: usize,
}

impl<'a> BgmReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_detour(data, 0, Detour::Inactive)
    }

    /// Cursor starting at `pos` that resumes a track's pending detour.
    pub fn with_detour(data: &'a [u8], pos: usize, detour: Detour) -> Self {
        Self {
            data,
            pos,
            detour,
            reads_left: data.len().saturating_mul(READS_PER_BYTE),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Current detour state, to be stored back on the track.
    pub fn detour(&self) -> Detour {
        self.detour
    }

    /// Redirect to `target` for `count` reads, then return here.
    ///
    /// A count of zero redirects nothing. Arming while a detour is active
    /// replaces it.
    pub fn start_detour(&mut self, target: usize, count: u8) {
        if count == 0 {
            return;
        }
        self.detour = Detour::Armed {
            return_to: self.pos,
            remaining: count,
        };
        self.pos = target;
    }

    fn after_read(&mut self) {
        if let Some(return_to) = self.detour.tick() {
            self.pos = return_to;
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        self.reads_left = self
            .reads_left
            .checked_sub(1)
            .ok_or(FormatError::TruncatedStream { offset: self.pos })?;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(FormatError::TruncatedStream { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a big-endian unsigned integer of 1-4 bytes.
    pub fn read_uint(&mut self, width: usize) -> Result<u32, FormatError> {
        debug_assert!((1..=4).contains(&width));
        let bytes = self.take(width)?;
        let value = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
        self.after_read();
        Ok(value)
    }

    /// Read a big-endian two's-complement integer of 1-4 bytes.
    pub fn read_int(&mut self, width: usize) -> Result<i32, FormatError> {
        let raw = self.read_uint(width)?;
        let shift = 32 - 8 * width as u32;
        Ok(((raw << shift) as i32) >> shift)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_uint(1)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(self.read_uint(2)? as u16)
    }

    pub fn read_i8(&mut self) -> Result<i8, FormatError> {
        Ok(self.read_int(1)? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, FormatError> {
        Ok(self.read_int(2)? as i16)
    }

    /// Read and drop one `width`-byte parameter. `width == 0` reads nothing.
    pub fn discard(&mut self, width: usize) -> Result<(), FormatError> {
        if width > 0 {
            self.read_uint(width)?;
        }
        Ok(())
    }
}
