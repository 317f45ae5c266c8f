//! Key decoders
//!
//! A [`KeyDecoder`] turns a region boundary into a [`KeyDescriptor`] for
//! display. Decoding never fails: keys that do not parse are described by
//! their hex form alone.

use serde::{Deserialize, Serialize};

use super::memcomparable::{decode_bytes, decode_uint_desc};
use super::table::{decode_handle, decode_index_values, decode_key_head, KeyKind};
use super::CodecResult;
use crate::keyspace::{Key, RangeEnd};

/// Display form of a region boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    /// Hex of the raw key; empty for the keyspace bounds
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_values: Vec<String>,
}

impl KeyDescriptor {
    /// Describe a key by its hex form only
    pub fn raw(key: &Key) -> Self {
        Self {
            desc: key.to_hex(),
            ..Default::default()
        }
    }
}

/// Describes region boundaries for display
pub trait KeyDecoder: Send + Sync {
    fn decode(&self, key: &Key) -> KeyDescriptor;

    /// Describe a range end; the open end is described like the empty key
    fn decode_end(&self, end: &RangeEnd) -> KeyDescriptor {
        match end {
            RangeEnd::Bounded(key) => self.decode(key),
            RangeEnd::Unbounded => KeyDescriptor::raw(&Key::empty()),
        }
    }
}

/// Hex-only descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct RawKeyDecoder;

impl KeyDecoder for RawKeyDecoder {
    fn decode(&self, key: &Key) -> KeyDescriptor {
        KeyDescriptor::raw(key)
    }
}

/// Decodes memcomparable table keys into table, row and index fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TableKeyDecoder;

impl TableKeyDecoder {
    fn try_decode(&self, key: &Key) -> CodecResult<KeyDescriptor> {
        let mut descriptor = KeyDescriptor::raw(key);

        let (raw, rest) = decode_bytes(key.as_bytes())?;
        if rest.len() == 8 {
            descriptor.ts = Some(decode_uint_desc(rest)?.0);
        }

        // Data keys may carry the storage layer's 'z' prefix
        let raw = raw.strip_prefix(b"z").unwrap_or(&raw);

        // Non-table keys (meta, system) keep the hex description
        let Ok((head, rest)) = decode_key_head(raw) else {
            return Ok(descriptor);
        };

        descriptor.table_id = Some(head.table_id);
        match head.kind {
            KeyKind::Table => {}
            KeyKind::Record => descriptor.row_id = decode_handle(rest).ok(),
            KeyKind::Index(index_id) => {
                descriptor.index_id = Some(index_id);
                descriptor.index_values = decode_index_values(rest);
            }
        }

        Ok(descriptor)
    }
}

impl KeyDecoder for TableKeyDecoder {
    fn decode(&self, key: &Key) -> KeyDescriptor {
        if key.is_empty() {
            return KeyDescriptor::raw(key);
        }

        match self.try_decode(key) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "Falling back to raw key descriptor");
                KeyDescriptor::raw(key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::memcomparable::{encode_bytes, encode_int};
    use crate::codec::table::{index_prefix, record_key, region_key};

    fn hex_key(s: &str) -> Key {
        Key::from_hex(s).unwrap()
    }

    #[test]
    fn test_decode_table_prefix() {
        let key = hex_key("7480000000000000ff0100000000000000f8");
        let descriptor = TableKeyDecoder.decode(&key);

        assert_eq!(descriptor.desc, "7480000000000000ff0100000000000000f8");
        assert_eq!(descriptor.table_id, Some(1));
        assert_eq!(descriptor.index_id, None);
        assert_eq!(descriptor.row_id, None);
    }

    #[test]
    fn test_decode_index_prefix() {
        let key = hex_key("7480000000000000ff035f698000000000ff0000010000000000fa");
        let descriptor = TableKeyDecoder.decode(&key);

        assert_eq!(descriptor.table_id, Some(3));
        assert_eq!(descriptor.index_id, Some(1));
        assert!(descriptor.index_values.is_empty());
    }

    #[test]
    fn test_decode_record_with_timestamp() {
        let mut raw = b"z".to_vec();
        raw.extend_from_slice(&record_key(12, 4096));
        let mut bytes = encode_bytes(&raw);
        bytes.extend_from_slice(&(!4242u64).to_be_bytes());

        let descriptor = TableKeyDecoder.decode(&Key::new(bytes));

        assert_eq!(descriptor.table_id, Some(12));
        assert_eq!(descriptor.row_id, Some(4096));
        assert_eq!(descriptor.ts, Some(4242));
    }

    #[test]
    fn test_decode_index_entry() {
        let mut raw = index_prefix(8, 2);
        raw.push(3);
        raw.extend_from_slice(&encode_int(17));

        let descriptor = TableKeyDecoder.decode(&region_key(&raw));
        assert_eq!(descriptor.index_id, Some(2));
        assert_eq!(descriptor.index_values, vec!["17"]);
    }

    #[test]
    fn test_undecodable_keys_fall_back_to_hex() {
        let key = Key::from("not memcomparable");
        assert_eq!(TableKeyDecoder.decode(&key), KeyDescriptor::raw(&key));

        let meta = region_key(b"mDDLJobList");
        let descriptor = TableKeyDecoder.decode(&meta);
        assert_eq!(descriptor.table_id, None);
        assert_eq!(descriptor.desc, meta.to_hex());
    }

    #[test]
    fn test_bounds_and_raw_decoder() {
        let decoder = TableKeyDecoder;
        assert_eq!(decoder.decode(&Key::empty()).desc, "");
        assert_eq!(decoder.decode_end(&RangeEnd::Unbounded).desc, "");

        let key = region_key(&record_key(1, 1));
        assert_eq!(RawKeyDecoder.decode(&key), KeyDescriptor::raw(&key));
    }

    #[test]
    fn test_descriptor_omits_empty_fields() {
        let descriptor = KeyDescriptor {
            desc: "74".to_string(),
            table_id: Some(1),
            ..Default::default()
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"desc":"74","table_id":1}"#);
    }
}
