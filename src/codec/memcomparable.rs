//! Memcomparable encodings
//!
//! Byte-order-preserving encodings used by region keys:
//!
//! - **bytes**: groups of 8 data bytes, each followed by a marker byte
//!   `0xFF - padding`. The final group is zero padded (a full 8-byte pad
//!   when the input length is a multiple of 8).
//! - **int**: big-endian with the sign bit flipped
//! - **uint desc**: big-endian, bitwise inverted
//! - **float**: sign-adjusted IEEE bits, big-endian
//!
//! ```text
//! "t" + int(1)  = 74 80 00 00 00 00 00 00 01
//! encode_bytes  = 74 80 00 00 00 00 00 00 ff | 01 00 00 00 00 00 00 00 f8
//! ```

use super::{CodecError, CodecResult};

const GROUP_SIZE: usize = 8;
const MARKER: u8 = 0xFF;
const PAD: u8 = 0x00;
const SIGN_MASK: u64 = 1 << 63;

/// Encode bytes so that the output sorts like the input
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let groups = data.len() / GROUP_SIZE + 1;
    let mut out = Vec::with_capacity(groups * (GROUP_SIZE + 1));

    for chunk_start in (0..=data.len()).step_by(GROUP_SIZE) {
        let remain = data.len() - chunk_start;
        let pad = if remain >= GROUP_SIZE {
            out.extend_from_slice(&data[chunk_start..chunk_start + GROUP_SIZE]);
            0
        } else {
            out.extend_from_slice(&data[chunk_start..]);
            let pad = GROUP_SIZE - remain;
            out.extend(std::iter::repeat(PAD).take(pad));
            pad
        };
        out.push(MARKER - pad as u8);
    }

    out
}

/// Decode memcomparable bytes
///
/// Returns the decoded bytes and the unconsumed remainder.
pub fn decode_bytes(mut input: &[u8]) -> CodecResult<(Vec<u8>, &[u8])> {
    let mut out = Vec::with_capacity(input.len() / (GROUP_SIZE + 1) * GROUP_SIZE);

    loop {
        if input.len() < GROUP_SIZE + 1 {
            return Err(CodecError::UnexpectedEof {
                needed: GROUP_SIZE + 1,
                remaining: input.len(),
            });
        }

        let (group, rest) = input.split_at(GROUP_SIZE + 1);
        input = rest;

        let marker = group[GROUP_SIZE];
        let pad = (MARKER - marker) as usize;
        if pad > GROUP_SIZE {
            return Err(CodecError::InvalidMarker(marker));
        }

        let real = GROUP_SIZE - pad;
        out.extend_from_slice(&group[..real]);

        if pad != 0 {
            if group[real..GROUP_SIZE].iter().any(|&b| b != PAD) {
                return Err(CodecError::InvalidPadding);
            }
            return Ok((out, input));
        }
    }
}

/// Encode a signed integer so that byte order matches numeric order
pub fn encode_int(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_MASK).to_be_bytes()
}

/// Decode an integer written by [`encode_int`]
pub fn decode_int(input: &[u8]) -> CodecResult<(i64, &[u8])> {
    let (raw, rest) = take_u64(input)?;
    Ok(((raw ^ SIGN_MASK) as i64, rest))
}

/// Decode an unsigned big-endian integer
pub fn decode_uint(input: &[u8]) -> CodecResult<(u64, &[u8])> {
    take_u64(input)
}

/// Decode an unsigned integer stored in descending order
pub fn decode_uint_desc(input: &[u8]) -> CodecResult<(u64, &[u8])> {
    let (raw, rest) = take_u64(input)?;
    Ok((!raw, rest))
}

/// Decode a memcomparable float
pub fn decode_float(input: &[u8]) -> CodecResult<(f64, &[u8])> {
    let (mut raw, rest) = take_u64(input)?;
    if raw & SIGN_MASK > 0 {
        raw &= !SIGN_MASK;
    } else {
        raw = !raw;
    }
    Ok((f64::from_bits(raw), rest))
}

/// Decode an unsigned LEB128 varint
pub fn decode_uvarint(input: &[u8]) -> CodecResult<(u64, &[u8])> {
    let mut value = 0u64;
    for (i, &byte) in input.iter().enumerate() {
        if i >= 10 || (i == 9 && byte > 1) {
            return Err(CodecError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, &input[i + 1..]));
        }
    }
    Err(CodecError::UnexpectedEof {
        needed: input.len() + 1,
        remaining: input.len(),
    })
}

/// Decode a zigzag-encoded signed varint
pub fn decode_varint(input: &[u8]) -> CodecResult<(i64, &[u8])> {
    let (raw, rest) = decode_uvarint(input)?;
    let value = ((raw >> 1) as i64) ^ -((raw & 1) as i64);
    Ok((value, rest))
}

fn take_u64(input: &[u8]) -> CodecResult<(u64, &[u8])> {
    if input.len() < 8 {
        return Err(CodecError::UnexpectedEof {
            needed: 8,
            remaining: input.len(),
        });
    }
    let (head, rest) = input.split_at(8);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(head);
    Ok((u64::from_be_bytes(buf), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_table_prefix() {
        let mut raw = vec![b't'];
        raw.extend_from_slice(&encode_int(1));

        assert_eq!(
            hex::encode(encode_bytes(&raw)),
            "7480000000000000ff0100000000000000f8"
        );
    }

    #[test]
    fn test_encode_exact_group_adds_full_pad() {
        let encoded = encode_bytes(b"12345678");
        assert_eq!(encoded.len(), 18);
        assert_eq!(encoded[8], 0xff);
        assert_eq!(&encoded[9..], &[0, 0, 0, 0, 0, 0, 0, 0, 0xf7]);

        assert_eq!(encode_bytes(b""), vec![0, 0, 0, 0, 0, 0, 0, 0, 0xf7]);
    }

    #[test]
    fn test_decode_bytes_returns_remainder() {
        let mut encoded = encode_bytes(b"hello world");
        encoded.extend_from_slice(&[1, 2, 3]);

        let (decoded, rest) = decode_bytes(&encoded).unwrap();
        assert_eq!(decoded, b"hello world");
        assert_eq!(rest, &[1, 2, 3]);
    }

    #[test]
    fn test_encoding_preserves_order() {
        let inputs: [&[u8]; 6] = [b"", b"a", b"a\0", b"ab", b"abcdefgh", b"abcdefgh\0"];
        for pair in inputs.windows(2) {
            assert!(encode_bytes(pair[0]) < encode_bytes(pair[1]));
        }
        assert!(encode_int(-5) < encode_int(3));
        assert!(encode_int(i64::MIN) < encode_int(i64::MAX));
    }

    #[test]
    fn test_decode_bytes_errors() {
        assert!(matches!(
            decode_bytes(&[0x74, 0x80]),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode_bytes(&[0, 0, 0, 0, 0, 0, 0, 0, 0x10]),
            Err(CodecError::InvalidMarker(0x10))
        ));
        assert!(matches!(
            decode_bytes(&[1, 2, 3, 0, 0, 0, 0, 9, 0xfc]),
            Err(CodecError::InvalidPadding)
        ));
    }

    #[test]
    fn test_numbers() {
        let encoded = encode_int(-42);
        let (value, rest) = decode_int(&encoded).unwrap();
        assert_eq!(value, -42);
        assert!(rest.is_empty());

        let desc = (!424242u64).to_be_bytes();
        assert_eq!(decode_uint_desc(&desc).unwrap().0, 424242);

        // 1.5 encoded: sign bit set on non-negative floats
        let bits = 1.5f64.to_bits() | SIGN_MASK;
        assert_eq!(decode_float(&bits.to_be_bytes()).unwrap().0, 1.5);
        let bits = !(-2.0f64).to_bits();
        assert_eq!(decode_float(&bits.to_be_bytes()).unwrap().0, -2.0);

        assert_eq!(decode_uvarint(&[0xac, 0x02]).unwrap().0, 300);
        assert_eq!(decode_varint(&[0x03]).unwrap().0, -2);
        assert_eq!(decode_varint(&[0x04]).unwrap().0, 2);
        assert!(decode_uvarint(&[0x80]).is_err());
    }
}
