//! Variable-length integer encoding.
//!
//! Avro writes integers as protobuf-style base-128 varints: 7 data bits per
//! byte, least significant group first, high bit set on every byte except the
//! last. Signed values are zigzag mapped first:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding: (n << 1) ^ (n >> 63)
//! - Decoding: (n >> 1) ^ -(n & 1)

use crate::error::DecodeError;

/// Longest valid encoding of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

// ============================================================================
// Decoding
// ============================================================================

/// Decode an unsigned varint, advancing `data` past it.
///
/// # Errors
/// - `DecodeError::UnexpectedEof` if the input is truncated
/// - `DecodeError::MalformedVarint` if the continuation chain runs past 10 bytes
#[inline]
pub fn decode_varint(data: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some((&byte, rest)) = data.split_first() else {
            return Err(DecodeError::UnexpectedEof);
        };
        *data = rest;

        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
        if shift >= 64 {
            return Err(DecodeError::MalformedVarint);
        }
    }
}

/// Decode a zigzag-encoded signed varint, advancing `data` past it.
#[inline]
pub fn decode_zigzag(data: &mut &[u8]) -> Result<i64, DecodeError> {
    decode_varint(data).map(zigzag_to_signed)
}

#[inline]
fn zigzag_to_signed(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode an unsigned integer as a varint.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut result = Vec::with_capacity(MAX_VARINT_LEN);
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            result.push(byte);
            return result;
        }
        result.push(byte | 0x80);
    }
}

/// Encode a signed integer as a zigzag varint.
pub fn encode_zigzag(value: i64) -> Vec<u8> {
    encode_varint(((value << 1) ^ (value >> 63)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_byte() {
        let mut data: &[u8] = &[0x00, 0x7F];
        assert_eq!(decode_varint(&mut data).unwrap(), 0);
        assert_eq!(decode_varint(&mut data).unwrap(), 127);
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_multi_byte() {
        let mut data: &[u8] = &[0xAC, 0x02];
        assert_eq!(decode_varint(&mut data).unwrap(), 300);
    }

    #[test]
    fn test_zigzag_small_values() {
        for (bytes, expected) in [
            (&[0x00][..], 0i64),
            (&[0x01][..], -1),
            (&[0x02][..], 1),
            (&[0x03][..], -2),
            (&[0x04][..], 2),
            (&[0x7F][..], -64),
            (&[0x80, 0x01][..], 64),
        ] {
            let mut data = bytes;
            assert_eq!(decode_zigzag(&mut data).unwrap(), expected, "bytes {:?}", bytes);
        }
    }

    #[test]
    fn test_zigzag_extremes() {
        for value in [i64::MIN, i64::MAX, i32::MIN as i64, i32::MAX as i64] {
            let encoded = encode_zigzag(value);
            assert!(encoded.len() <= MAX_VARINT_LEN);
            let mut data = encoded.as_slice();
            assert_eq!(decode_zigzag(&mut data).unwrap(), value);
        }
        assert_eq!(encode_zigzag(i64::MIN).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_truncated_varint() {
        let mut data: &[u8] = &[0x80, 0x80];
        assert_eq!(decode_varint(&mut data), Err(DecodeError::UnexpectedEof));
        let mut empty: &[u8] = &[];
        assert_eq!(decode_varint(&mut empty), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_overlong_varint() {
        let mut data: &[u8] = &[0xFF; 11];
        assert_eq!(decode_varint(&mut data), Err(DecodeError::MalformedVarint));

        // Ten bytes terminating on the last one is still valid.
        let mut ten: Vec<u8> = vec![0x80; 9];
        ten.push(0x01);
        let mut data = ten.as_slice();
        assert_eq!(decode_varint(&mut data).unwrap(), 1u64 << 63);
    }
}
