//! Error types returned by the codec, validation data and accessor layers.

use thiserror::Error;

/// Errors raised while reading or writing fixed-width fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The bit range does not fit inside a 256-bit word.
    #[error("bit range of width {width} at offset {offset} does not fit in a 256-bit word")]
    Range {
        /// First bit of the range, counted from the least significant bit.
        offset: usize,
        /// Number of bits in the range.
        width: usize,
    },
    /// The value needs more bits than the field provides.
    #[error("value does not fit in {width} bits")]
    Overflow {
        /// Width of the target field in bits.
        width: usize,
    },
    /// A variable-length field is shorter than the fixed prefix it must carry.
    #[error("{field} is {actual} bytes long, expected at least {expected}")]
    MalformedField {
        /// Name of the field as it appears on the wire.
        field: &'static str,
        /// Minimum length for a non-empty field.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
}

/// Errors raised while building validation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationDataError {
    /// A timestamp does not fit in 48 bits.
    #[error("{field} {value:#x} exceeds the 48-bit timestamp range")]
    OutOfRange {
        /// `validAfter` or `validUntil`.
        field: &'static str,
        /// The rejected value.
        value: u64,
    },
}
