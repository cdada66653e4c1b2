//! ERC-4337 `validationData` packing, parsing and aggregation.
//!
//! Accounts and paymasters return a single word from validation:
//!
//! ```text
//!  255          208 207          160 159                     0
//! +----------------+----------------+------------------------+
//! |   validAfter   |   validUntil   |   authorizer / flag    |
//! +----------------+----------------+------------------------+
//! ```
//!
//! A `validUntil` of zero means "no expiry" and decodes as [`MAX_UINT48`].

use std::hash::{Hash, Hasher};

use alloy_primitives::{Address, B256, U256, address};
use serde::{Deserialize, Serialize};

use crate::{bits::BitField, error::ValidationDataError};

/// Largest value a 48-bit timestamp can hold.
pub const MAX_UINT48: u64 = (1 << 48) - 1;

/// Validation data of a successful signature check with no time bounds.
pub const SIG_VALIDATION_SUCCESS: U256 = U256::ZERO;

/// Validation data of a failed signature check with no time bounds.
pub const SIG_VALIDATION_FAILED: U256 = U256::from_limbs([1, 0, 0, 0]);

const AUTHORIZER: BitField = BitField::layout(0, 160);
const VALID_UNTIL: BitField = BitField::layout(160, 48);
const VALID_AFTER: BitField = BitField::layout(208, 48);

/// The 160-bit authorizer slot of a validation word.
///
/// Address 0 signals success, address 1 signals failure, anything else names
/// a signature aggregator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authorizer(Address);

impl Authorizer {
    /// Signature valid, no aggregator.
    pub const SUCCESS: Self = Self(Address::ZERO);
    /// Signature invalid.
    pub const FAILURE: Self = Self(address!("0000000000000000000000000000000000000001"));

    /// Wraps a raw address.
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// The raw slot contents.
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Whether the slot holds the success flag.
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    /// The aggregator address, if the slot holds one rather than a flag.
    pub fn aggregator(&self) -> Option<Address> {
        if *self == Self::SUCCESS || *self == Self::FAILURE { None } else { Some(self.0) }
    }

    fn from_word(word: U256) -> Self {
        Self(Address::from_word(B256::from(AUTHORIZER.read(word))))
    }

    fn to_word(self) -> U256 {
        U256::from_be_slice(self.0.as_slice())
    }
}

impl From<Address> for Authorizer {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<bool> for Authorizer {
    /// `true` means the signature checked out.
    fn from(sig_success: bool) -> Self {
        if sig_success { Self::SUCCESS } else { Self::FAILURE }
    }
}

/// Decoded validation data.
///
/// `validUntil` is held as it appears on the wire, so a zero survives a
/// parse/pack cycle. Equality and hashing compare the normalized window.
#[derive(Debug, Clone, Copy)]
pub struct ValidationData {
    authorizer: Authorizer,
    valid_after: u64,
    valid_until: u64,
}

impl ValidationData {
    /// Builds validation data from caller-supplied fields.
    ///
    /// A `valid_until` of zero is kept as zero so that packing reproduces the
    /// canonical sentinels; [`Self::valid_until`] still reports it as
    /// [`MAX_UINT48`].
    pub fn new(
        authorizer: impl Into<Authorizer>,
        valid_after: u64,
        valid_until: u64,
    ) -> Result<Self, ValidationDataError> {
        if valid_after > MAX_UINT48 {
            return Err(ValidationDataError::OutOfRange { field: "validAfter", value: valid_after });
        }
        if valid_until > MAX_UINT48 {
            return Err(ValidationDataError::OutOfRange { field: "validUntil", value: valid_until });
        }
        Ok(Self { authorizer: authorizer.into(), valid_after, valid_until })
    }

    /// Decodes a validation word. Every word decodes, and packing the result
    /// gives back the same word.
    pub fn parse(word: U256) -> Self {
        Self {
            authorizer: Authorizer::from_word(word),
            valid_after: VALID_AFTER.read(word).to::<u64>(),
            valid_until: VALID_UNTIL.read(word).to::<u64>(),
        }
    }

    /// Encodes into a validation word.
    pub fn pack(&self) -> U256 {
        self.authorizer.to_word()
            | VALID_UNTIL.place(U256::from(self.valid_until))
            | VALID_AFTER.place(U256::from(self.valid_after))
    }

    /// The authorizer slot.
    pub const fn authorizer(&self) -> Authorizer {
        self.authorizer
    }

    /// Start of the validity window.
    pub const fn valid_after(&self) -> u64 {
        self.valid_after
    }

    /// End of the validity window, with zero read as [`MAX_UINT48`].
    pub const fn valid_until(&self) -> u64 {
        if self.valid_until == 0 { MAX_UINT48 } else { self.valid_until }
    }

    /// Whether the authorizer slot holds the success flag.
    pub fn is_success(&self) -> bool {
        self.authorizer.is_success()
    }

    /// The validity window.
    pub const fn time_range(&self) -> ValidTimeRange {
        ValidTimeRange::new(self.valid_after, self.valid_until())
    }

    /// Whether `now` falls outside the validity window.
    pub const fn is_out_of_time_range(&self, now: u64) -> bool {
        !self.time_range().contains(now)
    }

    /// Aggregates two validation results.
    ///
    /// Succeeds only when both authorizers are the success flag; any other
    /// authorizer, including an aggregator address, yields failure. The
    /// windows are intersected.
    pub fn combine(&self, other: &Self) -> Self {
        let authorizer = Authorizer::from(self.is_success() && other.is_success());
        let range = self.time_range().intersect(&other.time_range());
        Self { authorizer, valid_after: range.valid_after, valid_until: range.valid_until }
    }
}

impl PartialEq for ValidationData {
    fn eq(&self, other: &Self) -> bool {
        self.authorizer == other.authorizer
            && self.valid_after == other.valid_after
            && self.valid_until() == other.valid_until()
    }
}

impl Eq for ValidationData {}

impl Hash for ValidationData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.authorizer.hash(state);
        self.valid_after.hash(state);
        self.valid_until().hash(state);
    }
}

/// A `[valid_after, valid_until]` window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidTimeRange {
    /// First valid timestamp.
    pub valid_after: u64,
    /// Last valid timestamp.
    pub valid_until: u64,
}

impl Default for ValidTimeRange {
    fn default() -> Self {
        Self { valid_after: 0, valid_until: MAX_UINT48 }
    }
}

impl ValidTimeRange {
    /// Creates a window.
    pub const fn new(valid_after: u64, valid_until: u64) -> Self {
        Self { valid_after, valid_until }
    }

    /// Whether `now` is inside the window.
    pub const fn contains(&self, now: u64) -> bool {
        self.valid_after <= now && now <= self.valid_until
    }

    /// The overlap of two windows: the later start and the earlier end.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            valid_after: self.valid_after.max(other.valid_after),
            valid_until: self.valid_until.min(other.valid_until),
        }
    }
}

/// Packs an authorizer and a validity window into a validation word.
///
/// `authorizer` is an [`Address`], an [`Authorizer`] or a `bool` where `true`
/// means the signature is valid.
pub fn pack_validation_data(
    authorizer: impl Into<Authorizer>,
    valid_after: u64,
    valid_until: u64,
) -> Result<U256, ValidationDataError> {
    Ok(ValidationData::new(authorizer, valid_after, valid_until)?.pack())
}

/// Decodes a validation word.
pub fn parse_validation_data(word: U256) -> ValidationData {
    ValidationData::parse(word)
}

/// Combines two validation words, see [`ValidationData::combine`].
pub fn combine_validation_data(a: U256, b: U256) -> U256 {
    ValidationData::parse(a).combine(&ValidationData::parse(b)).pack()
}

/// Returns the authorizer slot and whether `now` falls outside the window.
///
/// Expiry is reported, not raised.
pub fn get_validation_data(word: U256, now: u64) -> (Address, bool) {
    if word.is_zero() {
        return (Address::ZERO, false);
    }
    let data = ValidationData::parse(word);
    (data.authorizer().address(), data.is_out_of_time_range(now))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::uint;

    use super::*;

    const AUTHORIZER_ADDRESS: Address = address!("bf023313b891fd6000544b79e353323aa94a4f29");

    #[test]
    fn test_parse_validation_data() {
        let data = uint!(0x00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff_U256);
        let parsed = parse_validation_data(data);
        assert_eq!(
            parsed.authorizer().address(),
            address!("ccddeeff00112233445566778899aabbccddeeff")
        );
        assert_eq!(parsed.valid_until(), 0x66778899aabb);
        assert_eq!(parsed.valid_after(), 0x001122334455);
    }

    #[test]
    fn test_parse_validation_data_zero_valid_until() {
        let data = uint!(0x001122334455000000000000ccddeeff00112233445566778899aabbccddeeff_U256);
        let parsed = parse_validation_data(data);
        assert_eq!(parsed.valid_until(), MAX_UINT48);
        assert_eq!(parsed.valid_after(), 0x001122334455);
    }

    #[test]
    fn test_pack_then_parse() {
        let word = pack_validation_data(AUTHORIZER_ADDRESS, 0x9abcdef0, 0x12345678).unwrap();
        let parsed = parse_validation_data(word);
        assert_eq!(parsed.authorizer(), Authorizer::new(AUTHORIZER_ADDRESS));
        assert_eq!(parsed.valid_after(), 0x9abcdef0);
        assert_eq!(parsed.valid_until(), 0x12345678);
        assert_eq!(parsed.pack(), word);
    }

    #[test]
    fn test_pack_layout_matches_solidity_packed_encoding() {
        // abi.encodePacked(uint48 validAfter, uint48 validUntil, address authorizer)
        let word = pack_validation_data(AUTHORIZER_ADDRESS, 0x9abcdef0, 0x12345678).unwrap();
        let expected =
            uint!(0x00009abcdef0000012345678bf023313b891fd6000544b79e353323aa94a4f29_U256);
        assert_eq!(word, expected);
    }

    #[test]
    fn test_canonical_values() {
        assert_eq!(
            parse_validation_data(SIG_VALIDATION_SUCCESS),
            ValidationData::new(Address::ZERO, 0, MAX_UINT48).unwrap()
        );
        assert_eq!(
            parse_validation_data(SIG_VALIDATION_FAILED),
            ValidationData::new(Authorizer::FAILURE, 0, MAX_UINT48).unwrap()
        );

        assert_eq!(pack_validation_data(Address::ZERO, 0, 0).unwrap(), SIG_VALIDATION_SUCCESS);
        assert_eq!(pack_validation_data(true, 0, 0).unwrap(), SIG_VALIDATION_SUCCESS);
        assert_eq!(
            pack_validation_data(Authorizer::FAILURE.address(), 0, 0).unwrap(),
            SIG_VALIDATION_FAILED
        );
        assert_eq!(pack_validation_data(false, 0, 0).unwrap(), SIG_VALIDATION_FAILED);
    }

    #[test]
    fn test_pack_rejects_wide_timestamps() {
        assert_eq!(
            pack_validation_data(true, MAX_UINT48 + 1, 0),
            Err(ValidationDataError::OutOfRange { field: "validAfter", value: MAX_UINT48 + 1 })
        );
        assert_eq!(
            pack_validation_data(true, 0, u64::MAX),
            Err(ValidationDataError::OutOfRange { field: "validUntil", value: u64::MAX })
        );
        assert!(pack_validation_data(true, MAX_UINT48, MAX_UINT48).is_ok());
    }

    #[test]
    fn test_direct_construction_reports_no_expiry_as_max() {
        let data = ValidationData::new(true, 5, 0).unwrap();
        assert_eq!(data.valid_until(), MAX_UINT48);
        assert_eq!(data.pack(), pack_validation_data(true, 5, 0).unwrap());
    }

    #[test]
    fn test_parse_keeps_wire_bits() {
        for word in [
            SIG_VALIDATION_SUCCESS,
            SIG_VALIDATION_FAILED,
            pack_validation_data(AUTHORIZER_ADDRESS, 0x9abcdef0, 0).unwrap(),
            U256::MAX,
        ] {
            assert_eq!(parse_validation_data(word).pack(), word);
        }
    }

    #[test]
    fn test_equality_uses_normalized_valid_until() {
        let direct = ValidationData::new(true, 5, 0).unwrap();
        let decoded = parse_validation_data(pack_validation_data(true, 5, 0).unwrap());
        assert_eq!(direct, decoded);
        assert_eq!(direct, ValidationData::new(true, 5, MAX_UINT48).unwrap());
        assert_ne!(direct, ValidationData::new(true, 5, 6).unwrap());

        let hashes: std::collections::HashSet<_> =
            [direct, decoded, ValidationData::new(true, 5, MAX_UINT48).unwrap()].into();
        assert_eq!(hashes.len(), 1);
    }

    #[test]
    fn test_self_combine_is_identity() {
        let data = ValidationData::new(true, 0, 0).unwrap();
        assert_eq!(data.combine(&data), data);

        let data = ValidationData::new(AUTHORIZER_ADDRESS, 7, 90).unwrap();
        assert_eq!(data.combine(&data), ValidationData::new(false, 7, 90).unwrap());
    }

    #[test]
    fn test_authorizer_aggregator() {
        assert_eq!(Authorizer::SUCCESS.aggregator(), None);
        assert_eq!(Authorizer::FAILURE.aggregator(), None);
        assert_eq!(Authorizer::new(AUTHORIZER_ADDRESS).aggregator(), Some(AUTHORIZER_ADDRESS));
        assert!(!Authorizer::new(AUTHORIZER_ADDRESS).is_success());
    }

    #[test]
    fn test_combine_intersects_windows() {
        let a = pack_validation_data(Address::ZERO, 0x9abcdef0, 0x12345678).unwrap();
        let b = pack_validation_data(Address::ZERO, 0xabcdef90, 0x87654321).unwrap();
        let expected = pack_validation_data(true, 0xabcdef90, 0x12345678).unwrap();

        assert_eq!(combine_validation_data(a, b), expected);
        assert_eq!(combine_validation_data(b, a), expected);
    }

    #[test]
    fn test_combine_fails_if_either_authorizer_is_set() {
        for (first, second) in [(Address::ZERO, AUTHORIZER_ADDRESS), (AUTHORIZER_ADDRESS, Address::ZERO)] {
            let a = pack_validation_data(first, 0x9abcdef0, 0x12345678).unwrap();
            let b = pack_validation_data(second, 0xabcdef90, 0x87654321).unwrap();
            let expected = pack_validation_data(false, 0xabcdef90, 0x12345678).unwrap();

            assert_eq!(combine_validation_data(a, b), expected);
            assert_eq!(combine_validation_data(b, a), expected);
        }
    }

    #[test]
    fn test_combine_normalizes_no_expiry_before_min() {
        let unbounded = pack_validation_data(true, 10, 0).unwrap();
        let bounded = pack_validation_data(true, 20, 500).unwrap();
        let combined = parse_validation_data(combine_validation_data(unbounded, bounded));
        assert_eq!(combined.valid_after(), 20);
        assert_eq!(combined.valid_until(), 500);

        let both = combine_validation_data(SIG_VALIDATION_SUCCESS, SIG_VALIDATION_SUCCESS);
        assert_eq!(parse_validation_data(both).valid_until(), MAX_UINT48);
        assert!(parse_validation_data(both).is_success());
    }

    #[test]
    fn test_combine_failed_with_failed() {
        let combined = combine_validation_data(SIG_VALIDATION_FAILED, SIG_VALIDATION_FAILED);
        assert_eq!(parse_validation_data(combined).authorizer(), Authorizer::FAILURE);
    }

    #[test]
    fn test_get_validation_data() {
        let now = 1_700_000_000;

        let word = pack_validation_data(AUTHORIZER_ADDRESS, 0, MAX_UINT48).unwrap();
        assert_eq!(get_validation_data(word, now), (AUTHORIZER_ADDRESS, false));

        let word = pack_validation_data(AUTHORIZER_ADDRESS, 0, 1).unwrap();
        assert_eq!(get_validation_data(word, now), (AUTHORIZER_ADDRESS, true));

        let word = pack_validation_data(AUTHORIZER_ADDRESS, MAX_UINT48, MAX_UINT48).unwrap();
        assert_eq!(get_validation_data(word, now), (AUTHORIZER_ADDRESS, true));

        assert_eq!(get_validation_data(U256::ZERO, now), (Address::ZERO, false));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let range = ValidTimeRange::new(10, 20);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));
        assert!(ValidTimeRange::default().contains(0));
    }
}
