//! Bounds-checked reads over the raw file bytes.
//!
//! Every read checks the remaining length *before* touching the buffer, so a file that lies about
//! its chunk or event lengths can never make the decoder read past the end of the buffer.
//! Reads advance both the absolute file position and the position within the current track.

use crate::prelude::*;

/// A read cursor over the bytes of a whole Standard Midi File.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    raw: &'a [u8],
    file_position: usize,
    track_position: usize,
    track_length: usize,
}
impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of the given bytes.
    pub fn new(raw: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor {
            raw,
            file_position: 0,
            track_position: 0,
            track_length: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    #[inline]
    pub fn position(&self) -> usize {
        self.file_position
    }

    /// Amount of bytes left until the end of the file.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.raw.len() - self.file_position
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Offset of the next byte within the current track chunk.
    #[inline]
    pub fn track_position(&self) -> usize {
        self.track_position
    }

    /// Length declared by the current track chunk header.
    #[inline]
    pub fn track_length(&self) -> usize {
        self.track_length
    }

    /// Whether more bytes than the declared track length have been consumed since the current
    /// track chunk started.
    #[inline]
    pub fn is_track_overrun(&self) -> bool {
        self.track_position > self.track_length
    }

    /// Bytes of the current track chunk that have not been consumed yet.
    #[inline]
    pub fn track_remaining(&self) -> usize {
        self.track_length.saturating_sub(self.track_position)
    }

    /// Start counting track bytes from zero, with the given declared track length.
    pub(crate) fn begin_track(&mut self, declared_len: u32) {
        self.track_position = 0;
        self.track_length = declared_len as usize;
    }

    /// Get the next `len` bytes without advancing.
    fn peek_slice(&self, len: usize) -> StdResult<&'a [u8], &'static ErrorKind> {
        let end = self
            .file_position
            .checked_add(len)
            .ok_or(err_bad!("truncated read"))?;
        self.raw
            .get(self.file_position..end)
            .ok_or(err_bad!("truncated read"))
    }

    fn advance(&mut self, len: usize) {
        self.file_position += len;
        self.track_position += len;
    }

    /// Skip over `len` bytes.
    pub fn skip(&mut self, len: usize) -> StdResult<(), &'static ErrorKind> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a big-endian unsigned integer made of `len` bytes, where `len` is in `1..=4`.
    /// The cursor is not advanced.
    pub fn peek_int(&self, len: usize) -> StdResult<u32, &'static ErrorKind> {
        debug_assert!((1..=4).contains(&len), "integer reads are 1 to 4 bytes wide");
        let bytes = self.peek_slice(len)?;
        Ok(bytes
            .iter()
            .fold(0, |acc, byte| (acc << 8) | u32::from(*byte)))
    }

    /// Read a big-endian unsigned integer made of `len` bytes, where `len` is in `1..=4`.
    pub fn read_int(&mut self, len: usize) -> StdResult<u32, &'static ErrorKind> {
        let int = self.peek_int(len)?;
        self.advance(len);
        Ok(int)
    }

    #[inline]
    pub fn peek_u8(&self) -> StdResult<u8, &'static ErrorKind> {
        self.peek_int(1).map(|int| int as u8)
    }

    #[inline]
    pub fn read_u8(&mut self) -> StdResult<u8, &'static ErrorKind> {
        self.read_int(1).map(|int| int as u8)
    }

    #[inline]
    pub fn read_u16(&mut self) -> StdResult<u16, &'static ErrorKind> {
        self.read_int(2).map(|int| int as u16)
    }

    #[inline]
    pub fn read_u24(&mut self) -> StdResult<u24, &'static ErrorKind> {
        //3 bytes always fit in 24 bits
        self.read_int(3).map(u24::from)
    }

    #[inline]
    pub fn read_u32(&mut self) -> StdResult<u32, &'static ErrorKind> {
        self.read_int(4)
    }

    /// Read a variable-length quantity.
    ///
    /// Each byte contributes its bottom 7 bits, and the top bit signals that another byte
    /// follows. At most 4 bytes are accepted, so the result always fits in 28 bits.
    pub fn read_varlen(&mut self) -> StdResult<u28, &'static ErrorKind> {
        let mut int: u32 = 0;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            int <<= 7;
            int |= u32::from(bit_range(byte, 0..7));
            if bit_range(byte, 7..8) == 0 {
                //At most 4 reads of 7 bits each, so at most 28 bits
                return Ok(u28::from(int));
            }
        }
        Err(err_bad!("malformed variable length quantity"))
    }

    /// Read a range of `len` raw bytes.
    ///
    /// The length is validated against the remaining bytes before anything is handed out.
    pub fn read_bytes(&mut self, len: usize) -> StdResult<&'a [u8], &'static ErrorKind> {
        let bytes = self.peek_slice(len)?;
        self.advance(len);
        Ok(bytes)
    }

    /// Read `len` bytes and decode them as text.
    ///
    /// See [`decode_text`](fn.decode_text.html) for the encoding rules.
    pub fn read_text(&mut self, len: usize) -> StdResult<String, &'static ErrorKind> {
        self.read_bytes(len).map(decode_text)
    }
}

/// Decode the bytes of a text meta event.
///
/// The file format does not mandate any encoding. Plain 7-bit bytes are read as ASCII; as soon as a
/// single byte falls in the extended range the whole run is read as UTF-16 (little endian).
/// Invalid sequences, including a dangling odd byte, decode to `U+FFFD` instead of failing.
pub fn decode_text(bytes: &[u8]) -> String {
    if bytes.iter().all(|&b| bit_range(b, 4..8) < 0x8) {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        let units = bytes.chunks(2).map(|pair| match *pair {
            [lo, hi] => u16::from_le_bytes([lo, hi]),
            _ => 0xFFFD,
        });
        core::char::decode_utf16(units)
            .map(|c| c.unwrap_or(core::char::REPLACEMENT_CHARACTER))
            .collect()
    }
}
