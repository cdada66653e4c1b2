//! Fixed-width field helpers for 256-bit words and byte prefixes.
//!
//! Bit offsets count from the least significant bit of the word, which is how
//! Solidity lays out values packed with shifts. Byte helpers read big-endian
//! prefixes out of variable-length `bytes` fields.

use alloy_primitives::{B256, U256};
use tracing::debug;

use crate::error::CodecError;

/// Number of bits in an EVM word.
pub const WORD_BITS: usize = 256;

/// A contiguous range of bits inside a 256-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    offset: usize,
    width: usize,
}

impl BitField {
    /// Describes `width` bits starting at `offset`.
    ///
    /// Fails with [`CodecError::Range`] for an empty range or one that runs
    /// past bit 255.
    pub const fn new(offset: usize, width: usize) -> Result<Self, CodecError> {
        if width == 0 || width > WORD_BITS || offset > WORD_BITS - width {
            return Err(CodecError::Range { offset, width });
        }
        Ok(Self { offset, width })
    }

    /// Const constructor for protocol layouts; an invalid layout fails to compile.
    pub(crate) const fn layout(offset: usize, width: usize) -> Self {
        match Self::new(offset, width) {
            Ok(field) => field,
            Err(_) => panic!("bit field does not fit in a word"),
        }
    }

    /// First bit of the field.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bits in the field.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Largest value the field can hold.
    pub fn max_value(&self) -> U256 {
        if self.width == WORD_BITS {
            U256::MAX
        } else {
            (U256::from(1) << self.width) - U256::from(1)
        }
    }

    /// Extracts the field from `word`, right-aligned.
    pub fn read(&self, word: U256) -> U256 {
        (word >> self.offset) & self.max_value()
    }

    /// Returns `word` with the field replaced by `value`.
    pub fn write(&self, word: U256, value: U256) -> Result<U256, CodecError> {
        if value > self.max_value() {
            return Err(CodecError::Overflow { width: self.width });
        }
        let cleared = word & !(self.max_value() << self.offset);
        Ok(cleared | self.place(value))
    }

    /// Shifts `value` into position. Callers guarantee it fits.
    pub(crate) fn place(&self, value: U256) -> U256 {
        (value & self.max_value()) << self.offset
    }
}

/// Reads `width` bits of `word` starting at bit `offset`.
pub fn read_bits(word: U256, offset: usize, width: usize) -> Result<U256, CodecError> {
    Ok(BitField::new(offset, width)?.read(word))
}

/// Writes `value` into `width` bits of `word` starting at bit `offset`.
pub fn write_bits(word: U256, offset: usize, width: usize, value: U256) -> Result<U256, CodecError> {
    BitField::new(offset, width)?.write(word, value)
}

/// Joins two 128-bit values into one word, `high` first.
pub fn concat_128(high: u128, low: u128) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes());
    word[16..].copy_from_slice(&low.to_be_bytes());
    B256::from(word)
}

/// Splits a word into its high and low 128-bit halves.
pub fn split_128(word: &B256) -> (u128, u128) {
    let mut high = [0u8; 16];
    let mut low = [0u8; 16];
    high.copy_from_slice(&word[..16]);
    low.copy_from_slice(&word[16..]);
    (u128::from_be_bytes(high), u128::from_be_bytes(low))
}

/// Splits a variable-length field into a `len`-byte prefix and the rest.
///
/// An empty field means the value is absent and yields `None`. A non-empty
/// field shorter than `len` is rejected rather than truncated.
pub fn split_prefix<'a>(
    bytes: &'a [u8],
    len: usize,
    field: &'static str,
) -> Result<Option<(&'a [u8], &'a [u8])>, CodecError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() < len {
        debug!(field, expected = len, actual = bytes.len(), "rejecting truncated field");
        return Err(CodecError::MalformedField { field, expected: len, actual: bytes.len() });
    }
    Ok(Some(bytes.split_at(len)))
}

/// Copies exactly `N` bytes into an array.
pub fn fixed<const N: usize>(bytes: &[u8], field: &'static str) -> Result<[u8; N], CodecError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CodecError::MalformedField {
        field,
        expected: N,
        actual: bytes.len(),
    })
}
