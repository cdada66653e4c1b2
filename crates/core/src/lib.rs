//! Codec for ERC-4337 user operations.
//!
//! Reads and writes the packed fields of a v0.7 `PackedUserOperation`,
//! packs, parses and combines `validationData` words, and computes the
//! operation hash an EntryPoint signs over.

pub mod bits;
pub mod error;
pub mod hash;
pub mod logger;
pub mod user_operation;
pub mod validation;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{CodecError, ValidationDataError};
pub use hash::{ENTRY_POINT_V07_ADDRESS, ENTRY_POINT_V08_ADDRESS, EntryPointVersion, hash, hash_for};
pub use user_operation::{
    PackedUserOperation, UserOperation, UserOperationBuilder, UserOperationRequiredFields,
};
pub use validation::{
    Authorizer, MAX_UINT48, SIG_VALIDATION_FAILED, SIG_VALIDATION_SUCCESS, ValidTimeRange,
    ValidationData, combine_validation_data, get_validation_data, pack_validation_data,
    parse_validation_data,
};
