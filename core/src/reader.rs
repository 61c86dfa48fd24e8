//! A cursor over an immutable byte slice, plus the fixed-width and LEB128
//! primitives the decoder is built from.
//!
//! Grounded in the byte-buffer contract of the original reference decoder
//! (`buffer_t` / `read_*` in the C source this crate's design was distilled
//! from): a cursor never mutates past the byte that made it fail, and
//! `read_bytes(n)` hands back a sub-cursor scoped to exactly `n` bytes so a
//! section parser can't accidentally read past its own boundary.

use crate::error::DecodeError;

/// A cursor over `(base, size, pos)`.
#[derive(Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Splits off a sub-reader over exactly `n` bytes, advancing past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<Reader<'a>, DecodeError> {
        if self.bytes.len() - self.pos < n {
            return Err(DecodeError::Truncated { at: self.pos });
        }
        let sub = Reader {
            bytes: &self.bytes[self.pos..self.pos + n],
            pos: 0,
        };
        self.pos += n;
        Ok(sub)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::Truncated { at: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads a 4-byte little-endian unsigned integer (used only for the
    /// module preamble's version field).
    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        let b = bytes.bytes;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Unsigned LEB128, truncated to 32 bits. Rejects encodings longer than
    /// `ceil(32/7) = 5` groups, and rejects a 5th group whose bits beyond
    /// bit 31 are nonzero (those bits would otherwise be silently dropped by
    /// the shift below instead of being reported as overflow).
    pub fn read_u32_leb128(&mut self) -> Result<u32, DecodeError> {
        let mut result: u32 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7f) as u32;
            if shift < 32 {
                let avail = 32 - shift;
                if avail < 7 && (bits >> avail) != 0 {
                    return Err(DecodeError::Leb128Overflow { at: self.pos });
                }
                result |= bits << shift;
            } else if bits != 0 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            if shift > 35 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
        }
    }

    /// Unsigned LEB128, truncated to 64 bits. Same boundary-group overflow
    /// check as [`Reader::read_u32_leb128`], scaled to 64 bits.
    pub fn read_u64_leb128(&mut self) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7f) as u64;
            if shift < 64 {
                let avail = 64 - shift;
                if avail < 7 && (bits >> avail) != 0 {
                    return Err(DecodeError::Leb128Overflow { at: self.pos });
                }
                result |= bits << shift;
            } else if bits != 0 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            if shift > 70 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
        }
    }

    /// Signed LEB128, 32-bit target. Sign-extends the high bit of the final
    /// group into the result.
    pub fn read_i32_leb128(&mut self) -> Result<i32, DecodeError> {
        let mut result: i64 = 0;
        let mut shift = 0u32;
        let mut byte;
        loop {
            byte = self.read_u8()?;
            result |= ((byte & 0x7f) as i64) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
            if shift > 35 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
        }
        if shift < 64 && (byte & 0x40) != 0 {
            result |= -1i64 << shift;
        }
        if result > i32::MAX as i64 || result < i32::MIN as i64 {
            return Err(DecodeError::Leb128Overflow { at: self.pos });
        }
        Ok(result as i32)
    }

    /// Signed LEB128, 64-bit target.
    pub fn read_i64_leb128(&mut self) -> Result<i64, DecodeError> {
        let mut result: i64 = 0;
        let mut shift = 0u32;
        let mut byte;
        loop {
            byte = self.read_u8()?;
            if shift < 64 {
                result |= ((byte & 0x7f) as i64) << shift;
            }
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
            if shift > 70 {
                return Err(DecodeError::Leb128Overflow { at: self.pos });
            }
        }
        if shift < 64 && (byte & 0x40) != 0 {
            result |= -1i64 << shift;
        }
        Ok(result)
    }

    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32_leb128()? as usize;
        let sub = self.read_bytes(len)?;
        String::from_utf8(sub.bytes.to_vec()).map_err(|_| DecodeError::MalformedUtf8 { at: self.pos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unsigned_leb128() {
        for &k in &[0u32, 1, 127, 128, 300, u32::MAX] {
            let encoded = encode_u32_leb128(k);
            let mut r = Reader::new(&encoded);
            assert_eq!(r.read_u32_leb128().unwrap(), k);
            assert!(r.eof());
        }
    }

    #[test]
    fn round_trips_signed_leb128() {
        for &k in &[0i32, 1, -1, 63, -64, 64, -65, i32::MAX, i32::MIN] {
            let encoded = encode_i32_leb128(k);
            let mut r = Reader::new(&encoded);
            assert_eq!(r.read_i32_leb128().unwrap(), k);
            assert!(r.eof());
        }
    }

    #[test]
    fn truncated_leb128_is_malformed() {
        let encoded = [0x80u8]; // continuation bit set, nothing follows
        let mut r = Reader::new(&encoded);
        assert!(r.read_u32_leb128().is_err());
    }

    #[test]
    fn oversized_leb128_is_rejected() {
        // Five continuation bytes all set, encoding far more than 32 bits.
        let encoded = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut r = Reader::new(&encoded);
        assert!(r.read_u32_leb128().is_err());
    }

    #[test]
    fn u32_leb128_rejects_nonzero_bits_above_32_in_final_group() {
        // A legal 5-group-long (no 6th byte) u32 LEB128 whose final group's
        // top three bits, which land at bit positions 32..35, are set. Those
        // bits don't fit in a u32 at all and must be rejected as overflow,
        // not silently discarded by the shift.
        let encoded = [0x80u8, 0x80, 0x80, 0x80, 0x7f];
        let mut r = Reader::new(&encoded);
        assert!(r.read_u32_leb128().is_err());
    }

    #[test]
    fn u64_leb128_rejects_nonzero_bits_above_64_in_final_group() {
        let encoded = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7f];
        let mut r = Reader::new(&encoded);
        assert!(r.read_u64_leb128().is_err());
    }

    fn encode_u32_leb128(mut value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            } else {
                out.push(byte | 0x80);
            }
        }
        out
    }

    fn encode_i32_leb128(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        let mut value = value as i64;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            let done = (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0);
            if done {
                out.push(byte);
                break;
            } else {
                out.push(byte | 0x80);
            }
        }
        out
    }
}
