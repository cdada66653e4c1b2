//! Fixtures shared by unit and integration tests.
use alloy_primitives::{Address, Bytes, U256, address, bytes};

use crate::user_operation::{
    PackedUserOperation, UserOperation, UserOperationBuilder, UserOperationRequiredFields,
};

/// Account used by every fixture.
pub const TEST_SENDER: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
/// Factory of the sponsored fixture.
pub const TEST_FACTORY: Address = address!("2222222222222222222222222222222222222222");
/// Paymaster of the sponsored fixture.
pub const TEST_PAYMASTER: Address = address!("3333333333333333333333333333333333333333");
/// Aggregator address for validation data tests.
pub const TEST_AUTHORIZER: Address = address!("bf023313b891fd6000544b79e353323aa94a4f29");

/// Required fields with realistic gas values.
pub fn create_required_fields(sender: Address, nonce: u64) -> UserOperationRequiredFields {
    UserOperationRequiredFields {
        sender,
        nonce: U256::from(nonce),
        call_data: bytes!("b61d27f600000000000000000000000000000000000000000000000000000000000000c8"),
        call_gas_limit: 0x2dc6c0,
        verification_gas_limit: 0x1e8480,
        pre_verification_gas: U256::from(0x186a0),
        max_priority_fee_per_gas: 0x3b9aca00,
        max_fee_per_gas: 0x77359400,
        signature: bytes!("01"),
    }
}

/// Operation without factory or paymaster.
pub fn create_test_user_operation() -> UserOperation {
    UserOperationBuilder::new(create_required_fields(TEST_SENDER, 1)).build()
}

/// Operation with both a factory and a paymaster section.
pub fn create_sponsored_user_operation() -> UserOperation {
    UserOperationBuilder::new(create_required_fields(TEST_SENDER, 1))
        .factory(TEST_FACTORY, bytes!("123456"))
        .paymaster(TEST_PAYMASTER, 0x12345678, 0x87654321, bytes!("beefcafe"))
        .build()
}

/// Plain fixture with raw `initCode` and `paymasterAndData`.
pub fn create_packed_user_operation(
    init_code: Bytes,
    paymaster_and_data: Bytes,
) -> PackedUserOperation {
    PackedUserOperation { init_code, paymaster_and_data, ..create_test_user_operation().pack() }
}
