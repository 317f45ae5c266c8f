//! Table key layout
//!
//! ```text
//! table prefix:  't' int(table_id)
//! record key:    't' int(table_id) "_r" int(handle)
//! index key:     't' int(table_id) "_i" int(index_id) datum*
//! ```
//!
//! Region boundaries are the memcomparable encoding of these raw keys, so the
//! scope helpers return encoded [`PartitionRange`]s ready for the locator.

use super::memcomparable::{
    decode_bytes, decode_float, decode_int, decode_uint, decode_uvarint, decode_varint,
    encode_bytes, encode_int,
};
use super::{CodecError, CodecResult};
use crate::keyspace::{Key, PartitionRange, RangeEnd};

const TABLE_PREFIX: u8 = b't';
const RECORD_SEP: &[u8] = b"_r";
const INDEX_SEP: &[u8] = b"_i";

const NIL_FLAG: u8 = 0;
const BYTES_FLAG: u8 = 1;
const COMPACT_BYTES_FLAG: u8 = 2;
const INT_FLAG: u8 = 3;
const UINT_FLAG: u8 = 4;
const FLOAT_FLAG: u8 = 5;
const VARINT_FLAG: u8 = 8;
const UVARINT_FLAG: u8 = 9;
const MAX_FLAG: u8 = 250;

/// What follows the table id in a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Bare table prefix, or a suffix that is neither a record nor an index
    Table,
    /// Row data
    Record,
    /// Index entries of one index
    Index(i64),
}

/// The decoded head of a table key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHead {
    pub table_id: i64,
    pub kind: KeyKind,
}

/// Raw `t{table_id}`
pub fn table_prefix(table_id: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(TABLE_PREFIX);
    key.extend_from_slice(&encode_int(table_id));
    key
}

/// Raw `t{table_id}_r`
pub fn record_prefix(table_id: i64) -> Vec<u8> {
    let mut key = table_prefix(table_id);
    key.extend_from_slice(RECORD_SEP);
    key
}

/// Raw `t{table_id}_r{handle}`
pub fn record_key(table_id: i64, handle: i64) -> Vec<u8> {
    let mut key = record_prefix(table_id);
    key.extend_from_slice(&encode_int(handle));
    key
}

/// Raw `t{table_id}_i{index_id}`
pub fn index_prefix(table_id: i64, index_id: i64) -> Vec<u8> {
    let mut key = table_prefix(table_id);
    key.extend_from_slice(INDEX_SEP);
    key.extend_from_slice(&encode_int(index_id));
    key
}

/// Memcomparable-encode a raw key into region key space
pub fn region_key(raw: &[u8]) -> Key {
    Key::new(encode_bytes(raw))
}

/// Region keys covering a table's rows: `[t{id}_r, t{id+1})`
pub fn table_record_range(table_id: i64) -> PartitionRange {
    let end = match table_id.checked_add(1) {
        Some(next) => RangeEnd::Bounded(region_key(&table_prefix(next))),
        None => RangeEnd::Unbounded,
    };
    PartitionRange::new(region_key(&record_prefix(table_id)), end)
}

/// Region keys covering one index: `[t{id}_i{idx}, t{id}_i{idx+1})`
pub fn table_index_range(table_id: i64, index_id: i64) -> PartitionRange {
    let end = match index_id.checked_add(1) {
        Some(next) => RangeEnd::Bounded(region_key(&index_prefix(table_id, next))),
        None => table_record_range(table_id).start.into(),
    };
    PartitionRange::new(region_key(&index_prefix(table_id, index_id)), end)
}

/// Decode the table id and key kind from a raw key
///
/// Fails only when the key is not a table key at all. A truncated suffix
/// after the table id still yields the table id with [`KeyKind::Table`].
pub fn decode_key_head(key: &[u8]) -> CodecResult<(KeyHead, &[u8])> {
    let rest = key
        .strip_prefix(&[TABLE_PREFIX])
        .ok_or(CodecError::MissingPrefix("t"))?;
    let (table_id, rest) = decode_int(rest)?;

    if let Some(handle) = rest.strip_prefix(RECORD_SEP) {
        let head = KeyHead {
            table_id,
            kind: KeyKind::Record,
        };
        return Ok((head, handle));
    }

    if let Some(index) = rest.strip_prefix(INDEX_SEP) {
        if let Ok((index_id, values)) = decode_int(index) {
            let head = KeyHead {
                table_id,
                kind: KeyKind::Index(index_id),
            };
            return Ok((head, values));
        }
    }

    let head = KeyHead {
        table_id,
        kind: KeyKind::Table,
    };
    Ok((head, rest))
}

/// Decode a row handle following `_r`
pub fn decode_handle(rest: &[u8]) -> CodecResult<i64> {
    decode_int(rest).map(|(handle, _)| handle)
}

/// Decode index column values following `_i{index_id}`
///
/// Stops at the first datum that cannot be decoded and returns what was
/// decoded so far.
pub fn decode_index_values(mut rest: &[u8]) -> Vec<String> {
    let mut values = Vec::new();
    while !rest.is_empty() {
        match decode_datum(rest) {
            Ok((value, next)) => {
                values.push(value);
                rest = next;
            }
            Err(err) => {
                tracing::debug!(error = %err, decoded = values.len(), "Stopped decoding index values");
                break;
            }
        }
    }
    values
}

/// Decode one flagged datum into its display string
pub fn decode_datum(input: &[u8]) -> CodecResult<(String, &[u8])> {
    let (&flag, rest) = input.split_first().ok_or(CodecError::UnexpectedEof {
        needed: 1,
        remaining: 0,
    })?;

    match flag {
        NIL_FLAG => Ok(("NULL".to_string(), rest)),
        BYTES_FLAG => {
            let (bytes, rest) = decode_bytes(rest)?;
            Ok((String::from_utf8_lossy(&bytes).into_owned(), rest))
        }
        COMPACT_BYTES_FLAG => {
            let (len, rest) = decode_varint(rest)?;
            let len = usize::try_from(len).map_err(|_| CodecError::VarintOverflow)?;
            if rest.len() < len {
                return Err(CodecError::UnexpectedEof {
                    needed: len,
                    remaining: rest.len(),
                });
            }
            let (bytes, rest) = rest.split_at(len);
            Ok((String::from_utf8_lossy(bytes).into_owned(), rest))
        }
        INT_FLAG => decode_int(rest).map(|(v, rest)| (v.to_string(), rest)),
        UINT_FLAG => decode_uint(rest).map(|(v, rest)| (v.to_string(), rest)),
        FLOAT_FLAG => decode_float(rest).map(|(v, rest)| (v.to_string(), rest)),
        VARINT_FLAG => decode_varint(rest).map(|(v, rest)| (v.to_string(), rest)),
        UVARINT_FLAG => decode_uvarint(rest).map(|(v, rest)| (v.to_string(), rest)),
        MAX_FLAG => Ok(("MAX".to_string(), rest)),
        other => Err(CodecError::UnsupportedFlag(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_key_encoding() {
        let key = region_key(&index_prefix(3, 1));
        assert_eq!(key.to_hex(), "7480000000000000ff035f698000000000ff0000010000000000fa");
    }

    #[test]
    fn test_record_range_orders_before_next_table() {
        let range = table_record_range(5);

        assert!(range.is_valid());
        assert!(range.contains(&region_key(&record_key(5, 0))));
        assert!(range.contains(&region_key(&record_key(5, i64::MAX))));
        assert!(!range.contains(&region_key(&index_prefix(5, 1))));
        assert!(!range.contains(&region_key(&table_prefix(6))));
    }

    #[test]
    fn test_index_range_covers_only_its_index() {
        let range = table_index_range(5, 2);

        let mut entry = index_prefix(5, 2);
        entry.push(INT_FLAG);
        entry.extend_from_slice(&encode_int(42));

        assert!(range.contains(&region_key(&entry)));
        assert!(!range.contains(&region_key(&index_prefix(5, 1))));
        assert!(!range.contains(&region_key(&index_prefix(5, 3))));
    }

    #[test]
    fn test_decode_key_head() {
        let record = record_key(7, 99);
        let (head, rest) = decode_key_head(&record).unwrap();
        assert_eq!(
            head,
            KeyHead {
                table_id: 7,
                kind: KeyKind::Record
            }
        );
        assert_eq!(decode_handle(rest).unwrap(), 99);

        let (head, _) = decode_key_head(&index_prefix(3, 1)).unwrap();
        assert_eq!(head.kind, KeyKind::Index(1));

        let prefix = table_prefix(1);
        let (head, rest) = decode_key_head(&prefix).unwrap();
        assert_eq!(head.table_id, 1);
        assert_eq!(head.kind, KeyKind::Table);
        assert!(rest.is_empty());

        assert_eq!(
            decode_key_head(b"m_meta").unwrap_err(),
            CodecError::MissingPrefix("t")
        );
    }

    #[test]
    fn test_decode_index_values() {
        let mut values = Vec::new();
        values.push(BYTES_FLAG);
        values.extend_from_slice(&encode_bytes(b"alice"));
        values.push(INT_FLAG);
        values.extend_from_slice(&encode_int(-3));
        values.push(NIL_FLAG);
        values.push(COMPACT_BYTES_FLAG);
        values.push(0x04); // zigzag(2)
        values.extend_from_slice(b"ok");

        assert_eq!(decode_index_values(&values), vec!["alice", "-3", "NULL", "ok"]);
    }

    #[test]
    fn test_decode_index_values_stops_at_unknown_flag() {
        let mut values = vec![UINT_FLAG];
        values.extend_from_slice(&7u64.to_be_bytes());
        values.push(6); // decimal
        values.extend_from_slice(&[1, 2, 3]);

        assert_eq!(decode_index_values(&values), vec!["7"]);
    }
}
