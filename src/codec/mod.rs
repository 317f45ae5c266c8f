//! Key codec
//!
//! Region keys are memcomparable-encoded table keys. This module encodes the
//! table and index prefixes used to scope heatmaps, and decodes region
//! boundaries back into a readable [`KeyDescriptor`].
//!
//! ## Components
//!
//! - [`memcomparable`]: order-preserving bytes and number encodings
//! - [`table`]: `t{table}_r{handle}` / `t{table}_i{index}{values}` layout
//! - [`decoder`]: the [`KeyDecoder`] trait and its implementations

pub mod decoder;
pub mod memcomparable;
pub mod table;

use thiserror::Error;

pub use decoder::{KeyDecoder, KeyDescriptor, RawKeyDecoder, TableKeyDecoder};
pub use memcomparable::{decode_bytes, decode_int, decode_uint_desc, encode_bytes, encode_int};
pub use table::{table_index_range, table_record_range, KeyHead, KeyKind};

/// Errors raised while decoding keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete value
    #[error("Unexpected end of key: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A bytes group marker outside `0xF7..=0xFF`
    #[error("Invalid group marker: {0:#04x}")]
    InvalidMarker(u8),

    /// Non-zero bytes in a group's padding
    #[error("Invalid group padding")]
    InvalidPadding,

    /// The key lacks an expected prefix
    #[error("Missing key prefix: {0}")]
    MissingPrefix(&'static str),

    /// A datum flag this codec does not decode
    #[error("Unsupported datum flag: {0}")]
    UnsupportedFlag(u8),

    /// A varint longer than 64 bits
    #[error("Varint overflows 64 bits")]
    VarintOverflow,
}

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
