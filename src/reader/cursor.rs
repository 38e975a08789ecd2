//! Forward-only reader over an immutable byte slice.
//!
//! Every read advances the position and fails with
//! [`DecodeError::UnexpectedEof`] when too few bytes remain. Borrowed reads
//! return slices of the underlying buffer, so strings and bytes are never
//! copied until a column builder appends them.

use crate::error::DecodeError;
use crate::reader::varint::decode_zigzag;

/// Items that encode to zero bytes (`null`, empty records) one cursor may
/// yield in total, across every collection and row it decodes.
pub const MAX_ZERO_WIDTH_ITEMS: usize = 1 << 20;

/// Binary cursor implementing Avro's primitive encodings.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    zero_width_budget: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            zero_width_budget: MAX_ZERO_WIDTH_ITEMS,
        }
    }

    /// Offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Zigzag varint as a signed 64-bit value.
    #[inline]
    pub fn read_long(&mut self) -> Result<i64, DecodeError> {
        let mut rest = &self.data[self.pos..];
        let before = rest.len();
        let value = decode_zigzag(&mut rest)?;
        self.pos += before - rest.len();
        Ok(value)
    }

    /// Zigzag varint that must fit in 32 bits.
    #[inline]
    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| DecodeError::IntOverflow(value))
    }

    /// Single byte, nonzero is true.
    #[inline]
    pub fn read_boolean(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_exact(1)?[0] != 0)
    }

    /// 4 little-endian bytes as IEEE-754 single precision.
    #[inline]
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// 8 little-endian bytes as IEEE-754 double precision.
    #[inline]
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(DecodeError::NegativeLength(len));
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof)?;
        self.read_exact(len)
    }

    /// Length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Exactly `n` raw bytes.
    #[inline]
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Zigzag varint index checked against `len` symbols.
    pub fn read_enum_index(&mut self, len: usize) -> Result<u32, DecodeError> {
        let index = self.read_long()?;
        checked_index(index, len).ok_or(DecodeError::IndexOutOfRange { index, len })
    }

    /// Zigzag varint branch checked against `len` union members.
    pub fn read_union_branch(&mut self, len: usize) -> Result<u32, DecodeError> {
        let index = self.read_long()?;
        checked_index(index, len).ok_or(DecodeError::InvalidUnionBranch { index, len })
    }

    /// Item count of the next array or map chunk.
    ///
    /// A negative count is followed by the chunk's byte size, which is read
    /// and discarded; the items are decoded regardless.
    pub fn read_chunk_len(&mut self) -> Result<usize, DecodeError> {
        let count = self.read_long()?;
        let count = if count < 0 {
            let _byte_size = self.read_long()?;
            count.unsigned_abs()
        } else {
            count as u64
        };
        usize::try_from(count).map_err(|_| DecodeError::UnexpectedEof)
    }

    /// Check a claimed item count before decoding the items.
    ///
    /// Items at least `min_width` bytes wide must fit in the remaining
    /// bytes. Zero-width items draw on the cursor's budget of
    /// [`MAX_ZERO_WIDTH_ITEMS`] instead.
    pub fn claim_items(&mut self, count: usize, min_width: usize) -> Result<(), DecodeError> {
        if min_width > 0 {
            return if count > self.remaining() / min_width {
                Err(DecodeError::UnexpectedEof)
            } else {
                Ok(())
            };
        }
        match self.zero_width_budget.checked_sub(count) {
            Some(left) => {
                self.zero_width_budget = left;
                Ok(())
            }
            None => Err(DecodeError::TooManyItems {
                count,
                limit: MAX_ZERO_WIDTH_ITEMS,
            }),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }
}

fn checked_index(index: i64, len: usize) -> Option<u32> {
    if index < 0 || index as u64 >= len as u64 {
        return None;
    }
    u32::try_from(index).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::varint::encode_zigzag;

    #[test]
    fn test_read_long_and_position() {
        let mut buf = encode_zigzag(-3);
        buf.extend(encode_zigzag(1_000_000));
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_long().unwrap(), -3);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_long().unwrap(), 1_000_000);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_int_overflow() {
        let buf = encode_zigzag(i32::MAX as i64 + 1);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(
            cursor.read_int(),
            Err(DecodeError::IntOverflow(i32::MAX as i64 + 1))
        );
    }

    #[test]
    fn test_read_boolean_nonzero_is_true() {
        let mut cursor = Cursor::new(&[0x00, 0x01, 0x7F]);
        assert!(!cursor.read_boolean().unwrap());
        assert!(cursor.read_boolean().unwrap());
        assert!(cursor.read_boolean().unwrap());
        assert_eq!(cursor.read_boolean(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_read_floats_little_endian() {
        let mut buf = 1.5f32.to_le_bytes().to_vec();
        buf.extend_from_slice(&(-2.25f64).to_le_bytes());
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_float().unwrap(), 1.5);
        assert_eq!(cursor.read_double().unwrap(), -2.25);
    }

    #[test]
    fn test_read_float_truncated() {
        let mut cursor = Cursor::new(&[0, 0, 0]);
        assert_eq!(cursor.read_float(), Err(DecodeError::UnexpectedEof));
        // A failed read does not advance.
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_read_string() {
        let mut buf = encode_zigzag(5);
        buf.extend_from_slice(b"hello");
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_string().unwrap(), "hello");
    }

    #[test]
    fn test_read_bytes_negative_length() {
        let buf = encode_zigzag(-1);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_bytes(), Err(DecodeError::NegativeLength(-1)));
    }

    #[test]
    fn test_read_bytes_past_end() {
        let mut buf = encode_zigzag(10);
        buf.extend_from_slice(b"short");
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_bytes(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_read_string_invalid_utf8() {
        let mut buf = encode_zigzag(2);
        buf.extend_from_slice(&[0xC3, 0x28]);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_string(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_enum_and_union_ranges() {
        let mut buf = encode_zigzag(2);
        buf.extend(encode_zigzag(3));
        buf.extend(encode_zigzag(-1));
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_enum_index(3).unwrap(), 2);
        assert_eq!(
            cursor.read_enum_index(3),
            Err(DecodeError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            cursor.read_union_branch(2),
            Err(DecodeError::InvalidUnionBranch { index: -1, len: 2 })
        );
    }

    #[test]
    fn test_claim_items() {
        let mut cursor = Cursor::new(&[0u8; 16]);
        assert!(cursor.claim_items(2, 8).is_ok());
        assert_eq!(cursor.claim_items(3, 8), Err(DecodeError::UnexpectedEof));
        assert_eq!(cursor.claim_items(usize::MAX, 1), Err(DecodeError::UnexpectedEof));

        assert!(cursor.claim_items(MAX_ZERO_WIDTH_ITEMS - 1, 0).is_ok());
        assert!(cursor.claim_items(1, 0).is_ok());
        assert_eq!(
            cursor.claim_items(1, 0),
            Err(DecodeError::TooManyItems {
                count: 1,
                limit: MAX_ZERO_WIDTH_ITEMS
            })
        );
        // Width checks never touch the budget.
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_chunk_len_negative_reads_byte_size() {
        let mut buf = encode_zigzag(-2);
        buf.extend(encode_zigzag(16));
        buf.push(0xAA);
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_chunk_len().unwrap(), 2);
        assert_eq!(cursor.remaining(), 1);
    }
}
