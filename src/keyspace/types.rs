//! Core data types for the keyspace sampler
//!
//! - `Key`: an opaque byte string ordered lexicographically
//! - `RangeEnd`: the end of a half-open range, bounded or open-ended
//! - `PartitionRange`, `RegionInfo`: one partition and its activity counters
//! - `Snapshot`, `TimestampedSnapshot`: the full partition set at one instant
//! - `Metric`: which counter a heatmap is built from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::error::{KeyspaceError, KeyspaceResult};

/// A position in the global keyspace
///
/// Compared byte-wise. The empty key is the minimum of the keyspace.
/// Serialized as a lowercase hex string, which preserves the ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// The minimum key
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a key from its hex representation
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex_str).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// End of a half-open key range
///
/// `Unbounded` sorts after every bounded end. On the wire an open end is the
/// empty hex string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RangeEnd {
    Bounded(Key),
    Unbounded,
}

impl RangeEnd {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, RangeEnd::Unbounded)
    }

    /// Whether this end lies strictly after `key`
    pub fn exceeds(&self, key: &Key) -> bool {
        match self {
            RangeEnd::Bounded(end) => end > key,
            RangeEnd::Unbounded => true,
        }
    }

    /// Whether this end is exactly the start key `key`
    pub fn is_at(&self, key: &Key) -> bool {
        matches!(self, RangeEnd::Bounded(end) if end == key)
    }
}

impl From<Key> for RangeEnd {
    fn from(key: Key) -> Self {
        RangeEnd::Bounded(key)
    }
}

impl fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEnd::Bounded(key) => write!(f, "{}", key),
            RangeEnd::Unbounded => write!(f, "+inf"),
        }
    }
}

impl Serialize for RangeEnd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RangeEnd::Bounded(key) => key.serialize(serializer),
            RangeEnd::Unbounded => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for RangeEnd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            Ok(RangeEnd::Unbounded)
        } else {
            Key::from_hex(&s)
                .map(RangeEnd::Bounded)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Half-open key interval `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionRange {
    #[serde(rename = "start_key")]
    pub start: Key,
    #[serde(rename = "end_key")]
    pub end: RangeEnd,
}

impl PartitionRange {
    pub fn new(start: impl Into<Key>, end: RangeEnd) -> Self {
        Self {
            start: start.into(),
            end,
        }
    }

    /// The whole keyspace
    pub fn full() -> Self {
        Self::new(Key::empty(), RangeEnd::Unbounded)
    }

    /// Check if a key falls within this range
    pub fn contains(&self, key: &Key) -> bool {
        key >= &self.start && self.end.exceeds(key)
    }

    /// Check that `start < end`
    pub fn is_valid(&self) -> bool {
        self.end.exceeds(&self.start)
    }
}

impl fmt::Display for PartitionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One partition (region) at sample time
///
/// Counters are cumulative for the partition's current shape, not deltas
/// since the previous sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: u64,
    #[serde(flatten)]
    pub range: PartitionRange,
    #[serde(default)]
    pub written_bytes: u64,
    #[serde(default)]
    pub read_bytes: u64,
    #[serde(default)]
    pub written_keys: u64,
    #[serde(default)]
    pub read_keys: u64,
}

impl RegionInfo {
    /// Create a region with all counters at zero
    pub fn new(id: u64, range: PartitionRange) -> Self {
        Self {
            id,
            range,
            written_bytes: 0,
            read_bytes: 0,
            written_keys: 0,
            read_keys: 0,
        }
    }

    /// Builder: set written bytes
    pub fn written_bytes(mut self, value: u64) -> Self {
        self.written_bytes = value;
        self
    }

    /// Builder: set read bytes
    pub fn read_bytes(mut self, value: u64) -> Self {
        self.read_bytes = value;
        self
    }

    /// Builder: set written keys
    pub fn written_keys(mut self, value: u64) -> Self {
        self.written_keys = value;
        self
    }

    /// Builder: set read keys
    pub fn read_keys(mut self, value: u64) -> Self {
        self.read_keys = value;
        self
    }

    pub fn start(&self) -> &Key {
        &self.range.start
    }

    pub fn end(&self) -> &RangeEnd {
        &self.range.end
    }
}

/// The complete, ordered partition set at one sampling instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    regions: Vec<RegionInfo>,
}

impl Snapshot {
    pub fn new(regions: Vec<RegionInfo>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[RegionInfo] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Check the partition-completeness invariant
    ///
    /// The first partition starts at the empty key, the last one is
    /// unbounded, every partition is non-empty and each end is exactly the
    /// next start.
    pub fn validate(&self) -> KeyspaceResult<()> {
        let first = self.regions.first().ok_or(KeyspaceError::EmptySnapshot)?;
        if !first.start().is_empty() {
            return Err(KeyspaceError::MissingLowerBound {
                start: first.start().clone(),
            });
        }

        for (index, region) in self.regions.iter().enumerate() {
            if !region.range.is_valid() {
                return Err(KeyspaceError::EmptyPartition {
                    index,
                    start: region.start().clone(),
                    end: region.end().clone(),
                });
            }
        }

        for (index, pair) in self.regions.windows(2).enumerate() {
            if !pair[0].end().is_at(pair[1].start()) {
                return Err(KeyspaceError::NonContiguous {
                    index,
                    next: index + 1,
                    end: pair[0].end().clone(),
                    next_start: pair[1].start().clone(),
                });
            }
        }

        let last = self.regions.last().unwrap_or(first);
        if !last.end().is_unbounded() {
            return Err(KeyspaceError::MissingUpperBound {
                end: last.end().clone(),
            });
        }

        Ok(())
    }
}

impl From<Vec<RegionInfo>> for Snapshot {
    fn from(regions: Vec<RegionInfo>) -> Self {
        Self::new(regions)
    }
}

/// A snapshot and the instant it was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampedSnapshot {
    pub time: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl TimestampedSnapshot {
    pub fn new(time: DateTime<Utc>, snapshot: Snapshot) -> Self {
        Self { time, snapshot }
    }

    /// Stamp a snapshot with the current time
    pub fn now(snapshot: Snapshot) -> Self {
        Self::new(Utc::now(), snapshot)
    }
}

/// Activity counter a heatmap is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    WrittenBytes,
    ReadBytes,
    WrittenKeys,
    ReadKeys,
}

impl Metric {
    /// Get all metrics for iteration
    pub fn all() -> &'static [Metric] {
        &[
            Metric::WrittenBytes,
            Metric::ReadBytes,
            Metric::WrittenKeys,
            Metric::ReadKeys,
        ]
    }

    /// Extract this metric's counter from a region
    pub fn value(&self, region: &RegionInfo) -> u64 {
        match self {
            Metric::WrittenBytes => region.written_bytes,
            Metric::ReadBytes => region.read_bytes,
            Metric::WrittenKeys => region.written_keys,
            Metric::ReadKeys => region.read_keys,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::WrittenBytes => "written_bytes",
            Metric::ReadBytes => "read_bytes",
            Metric::WrittenKeys => "written_keys",
            Metric::ReadKeys => "read_keys",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Metric::all()
            .iter()
            .find(|m| m.as_str() == lower)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown metric: {}. Use written_bytes, read_bytes, written_keys or read_keys",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(start: &str, end: &str) -> RegionInfo {
        let end = if end.is_empty() {
            RangeEnd::Unbounded
        } else {
            RangeEnd::Bounded(Key::from(end))
        };
        RegionInfo::new(0, PartitionRange::new(start, end))
    }

    #[test]
    fn test_unbounded_sorts_last() {
        let high = RangeEnd::Bounded(Key::new(vec![0xff; 16]));
        assert!(RangeEnd::Unbounded > high);
        assert!(RangeEnd::Bounded(Key::from("a")) < RangeEnd::Bounded(Key::from("b")));
        assert!(RangeEnd::Unbounded.exceeds(&Key::new(vec![0xff; 32])));
    }

    #[test]
    fn test_partition_contains() {
        let range = PartitionRange::new("b", RangeEnd::Bounded(Key::from("d")));
        assert!(range.contains(&Key::from("b")));
        assert!(range.contains(&Key::from("c")));
        assert!(!range.contains(&Key::from("d")));
        assert!(!range.contains(&Key::from("a")));
        assert!(PartitionRange::full().contains(&Key::empty()));
    }

    #[test]
    fn test_validate_complete_snapshot() {
        let snapshot = Snapshot::new(vec![region("", "a"), region("a", "c"), region("c", "")]);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_gap() {
        let snapshot = Snapshot::new(vec![region("", "a"), region("b", "")]);
        assert!(matches!(
            snapshot.validate(),
            Err(KeyspaceError::NonContiguous { index: 0, next: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_bounds() {
        let snapshot = Snapshot::new(vec![region("a", "")]);
        assert!(matches!(
            snapshot.validate(),
            Err(KeyspaceError::MissingLowerBound { .. })
        ));

        let snapshot = Snapshot::new(vec![region("", "a")]);
        assert!(matches!(
            snapshot.validate(),
            Err(KeyspaceError::MissingUpperBound { .. })
        ));

        assert_eq!(
            Snapshot::default().validate(),
            Err(KeyspaceError::EmptySnapshot)
        );
    }

    #[test]
    fn test_validate_rejects_inverted_partition() {
        let snapshot = Snapshot::new(vec![region("", "c"), region("c", "b"), region("b", "")]);
        assert!(matches!(
            snapshot.validate(),
            Err(KeyspaceError::EmptyPartition { index: 1, .. })
        ));
    }

    #[test]
    fn test_region_wire_format() {
        let json = r#"{"id": 7, "start_key": "", "end_key": "7480", "written_bytes": 42}"#;
        let region: RegionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(region.id, 7);
        assert!(region.start().is_empty());
        assert_eq!(region.end(), &RangeEnd::Bounded(Key::new(vec![0x74, 0x80])));
        assert_eq!(region.written_bytes, 42);
        assert_eq!(region.read_bytes, 0);

        let json = r#"{"id": 8, "start_key": "7480", "end_key": ""}"#;
        let region: RegionInfo = serde_json::from_str(json).unwrap();
        assert!(region.end().is_unbounded());

        let back = serde_json::to_value(&region).unwrap();
        assert_eq!(back["start_key"], "7480");
        assert_eq!(back["end_key"], "");
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("written_bytes".parse::<Metric>(), Ok(Metric::WrittenBytes));
        assert_eq!("READ_BYTES".parse::<Metric>(), Ok(Metric::ReadBytes));
        assert!("bytes".parse::<Metric>().is_err());
        assert_eq!(Metric::default(), Metric::WrittenBytes);

        let region = region("", "").read_keys(3).written_keys(5);
        assert_eq!(Metric::ReadKeys.value(&region), 3);
        assert_eq!(Metric::WrittenKeys.value(&region), 5);
    }
}
