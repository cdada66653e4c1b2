//! EIP-4337 v0.7 packed user operation and its field accessors.
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::bits::{self, concat_128, split_128};
use crate::error::CodecError;

/// Length of the factory address at the start of `initCode`.
pub const FACTORY_PREFIX_LEN: usize = 20;

/// Offset of `paymasterVerificationGasLimit` in `paymasterAndData`.
pub const PAYMASTER_VALIDATION_GAS_OFFSET: usize = 20;

/// Offset of `paymasterPostOpGasLimit` in `paymasterAndData`.
pub const PAYMASTER_POSTOP_GAS_OFFSET: usize = 36;

/// Offset of the free-form paymaster data in `paymasterAndData`.
pub const PAYMASTER_DATA_OFFSET: usize = 52;

/// User Operation as submitted to the v0.7 EntryPoint, with gas fields packed
/// into words and factory/paymaster fields concatenated into byte strings.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    /// Account the operation runs as.
    pub sender: Address,
    /// Anti-replay key (high 192 bits) and sequence (low 64 bits).
    pub nonce: U256,
    /// factory address (20 bytes) followed by factory call data, or empty
    pub init_code: Bytes,
    /// Data the account executes.
    pub call_data: Bytes,
    /// verificationGasLimit (16 bytes) | callGasLimit (16 bytes)
    pub account_gas_limits: B256,
    /// Gas paid to the bundler for overhead outside validation and execution.
    pub pre_verification_gas: U256,
    /// maxPriorityFeePerGas (16 bytes) | maxFeePerGas (16 bytes)
    pub gas_fees: B256,
    /// paymaster (20) | verification gas (16) | post-op gas (16) | data, or empty
    pub paymaster_and_data: Bytes,
    /// Signature checked by the account.
    pub signature: Bytes,
}

/// The fixed-layout head of a non-empty `paymasterAndData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PaymasterFields<'a> {
    paymaster: Address,
    verification_gas_limit: u128,
    post_op_gas_limit: u128,
    data: &'a [u8],
}

impl PackedUserOperation {
    fn init_code_parts(&self) -> Result<Option<(Address, &[u8])>, CodecError> {
        let Some((factory, data)) =
            bits::split_prefix(&self.init_code, FACTORY_PREFIX_LEN, "initCode")?
        else {
            return Ok(None);
        };
        Ok(Some((Address::from(bits::fixed::<20>(factory, "factory")?), data)))
    }

    fn paymaster_fields(&self) -> Result<Option<PaymasterFields<'_>>, CodecError> {
        let Some((head, data)) =
            bits::split_prefix(&self.paymaster_and_data, PAYMASTER_DATA_OFFSET, "paymasterAndData")?
        else {
            return Ok(None);
        };
        let paymaster = &head[..PAYMASTER_VALIDATION_GAS_OFFSET];
        let verification = &head[PAYMASTER_VALIDATION_GAS_OFFSET..PAYMASTER_POSTOP_GAS_OFFSET];
        let post_op = &head[PAYMASTER_POSTOP_GAS_OFFSET..];
        Ok(Some(PaymasterFields {
            paymaster: Address::from(bits::fixed::<20>(paymaster, "paymaster")?),
            verification_gas_limit: u128::from_be_bytes(bits::fixed(
                verification,
                "paymasterVerificationGasLimit",
            )?),
            post_op_gas_limit: u128::from_be_bytes(bits::fixed(post_op, "paymasterPostOpGasLimit")?),
            data,
        }))
    }

    /// Factory that deploys the sender, or the zero address when `initCode` is empty.
    pub fn factory(&self) -> Result<Address, CodecError> {
        Ok(self.init_code_parts()?.map_or(Address::ZERO, |(factory, _)| factory))
    }

    /// Call data passed to the factory, empty when `initCode` is empty.
    pub fn factory_data(&self) -> Result<Bytes, CodecError> {
        Ok(self
            .init_code_parts()?
            .map_or_else(Bytes::new, |(_, data)| Bytes::copy_from_slice(data)))
    }

    /// Gas for the account's validation step, high half of `accountGasLimits`.
    pub fn verification_gas_limit(&self) -> u128 {
        split_128(&self.account_gas_limits).0
    }

    /// Gas for the execution call, low half of `accountGasLimits`.
    pub fn call_gas_limit(&self) -> u128 {
        split_128(&self.account_gas_limits).1
    }

    /// High half of `gasFees`.
    pub fn max_priority_fee_per_gas(&self) -> u128 {
        split_128(&self.gas_fees).0
    }

    /// Low half of `gasFees`.
    pub fn max_fee_per_gas(&self) -> u128 {
        split_128(&self.gas_fees).1
    }

    /// Gas price assuming the base fee never exceeds the priority fee, which
    /// reduces to `maxPriorityFeePerGas`. See [`Self::effective_gas_price`]
    /// for the EIP-1559 price.
    pub fn gas_price(&self) -> u128 {
        self.max_priority_fee_per_gas()
    }

    /// EIP-1559 price paid per gas at the given base fee.
    pub fn effective_gas_price(&self, base_fee: u128) -> u128 {
        let max_fee = self.max_fee_per_gas();
        let max_priority_fee = self.max_priority_fee_per_gas();
        if max_fee == max_priority_fee {
            max_fee
        } else {
            max_fee.min(max_priority_fee.saturating_add(base_fee))
        }
    }

    /// Paymaster sponsoring the operation, or the zero address.
    pub fn paymaster(&self) -> Result<Address, CodecError> {
        Ok(self.paymaster_fields()?.map_or(Address::ZERO, |p| p.paymaster))
    }

    /// Gas for the paymaster's validation step, 0 without a paymaster.
    pub fn paymaster_verification_gas_limit(&self) -> Result<u128, CodecError> {
        Ok(self.paymaster_fields()?.map_or(0, |p| p.verification_gas_limit))
    }

    /// Gas for the paymaster's post-operation call, 0 without a paymaster.
    pub fn paymaster_post_op_gas_limit(&self) -> Result<u128, CodecError> {
        Ok(self.paymaster_fields()?.map_or(0, |p| p.post_op_gas_limit))
    }

    /// Data passed to the paymaster, empty when there is no paymaster.
    pub fn paymaster_data(&self) -> Result<Bytes, CodecError> {
        Ok(self
            .paymaster_fields()?
            .map_or_else(Bytes::new, |p| Bytes::copy_from_slice(p.data)))
    }

    /// Expands the packed fields back into a [`UserOperation`].
    pub fn unpack(&self) -> Result<UserOperation, CodecError> {
        let (factory, factory_data) = match self.init_code_parts()? {
            Some((factory, data)) => (Some(factory), Bytes::copy_from_slice(data)),
            None => (None, Bytes::new()),
        };
        let paymaster = self.paymaster_fields()?;

        Ok(UserOperation {
            sender: self.sender,
            nonce: self.nonce,
            factory,
            factory_data,
            call_data: self.call_data.clone(),
            call_gas_limit: self.call_gas_limit(),
            verification_gas_limit: self.verification_gas_limit(),
            pre_verification_gas: self.pre_verification_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas(),
            max_fee_per_gas: self.max_fee_per_gas(),
            paymaster: paymaster.map(|p| p.paymaster),
            paymaster_verification_gas_limit: paymaster.map_or(0, |p| p.verification_gas_limit),
            paymaster_post_op_gas_limit: paymaster.map_or(0, |p| p.post_op_gas_limit),
            paymaster_data: paymaster
                .map_or_else(Bytes::new, |p| Bytes::copy_from_slice(p.data)),
            signature: self.signature.clone(),
        })
    }
}

/// User Operation with every field spelled out.
///
/// Offchain version, must be packed before sending onchain.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Account the operation runs as.
    pub sender: Address,
    /// Anti-replay key and sequence.
    pub nonce: U256,
    /// Factory deploying the account, if it does not exist yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    /// Call data for the factory.
    #[serde(default)]
    pub factory_data: Bytes,
    /// Data the account executes.
    pub call_data: Bytes,
    /// Gas for the execution call.
    #[serde(with = "alloy_serde::quantity")]
    pub call_gas_limit: u128,
    /// Gas for the account's validation step.
    #[serde(with = "alloy_serde::quantity")]
    pub verification_gas_limit: u128,
    /// Bundler overhead gas.
    pub pre_verification_gas: U256,
    /// EIP-1559 priority fee cap.
    #[serde(with = "alloy_serde::quantity")]
    pub max_priority_fee_per_gas: u128,
    /// EIP-1559 total fee cap.
    #[serde(with = "alloy_serde::quantity")]
    pub max_fee_per_gas: u128,
    /// Paymaster sponsoring the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Gas for the paymaster's validation step.
    #[serde(default, with = "alloy_serde::quantity")]
    pub paymaster_verification_gas_limit: u128,
    /// Gas for the paymaster's post-operation call.
    #[serde(default, with = "alloy_serde::quantity")]
    pub paymaster_post_op_gas_limit: u128,
    /// Data passed to the paymaster.
    #[serde(default)]
    pub paymaster_data: Bytes,
    /// Signature checked by the account.
    pub signature: Bytes,
}

impl UserOperation {
    /// Concatenates factory and paymaster fields and packs the gas words.
    ///
    /// Factory data without a factory, and paymaster fields without a
    /// paymaster, are dropped.
    pub fn pack(&self) -> PackedUserOperation {
        let init_code = self.factory.map_or_else(Bytes::new, |factory| {
            let mut init_code = Vec::with_capacity(FACTORY_PREFIX_LEN + self.factory_data.len());
            init_code.extend_from_slice(factory.as_slice());
            init_code.extend_from_slice(&self.factory_data);
            Bytes::from(init_code)
        });

        let paymaster_and_data = self.paymaster.map_or_else(Bytes::new, |paymaster| {
            let mut paymaster_and_data =
                Vec::with_capacity(PAYMASTER_DATA_OFFSET + self.paymaster_data.len());
            paymaster_and_data.extend_from_slice(paymaster.as_slice());
            paymaster_and_data
                .extend_from_slice(&self.paymaster_verification_gas_limit.to_be_bytes());
            paymaster_and_data.extend_from_slice(&self.paymaster_post_op_gas_limit.to_be_bytes());
            paymaster_and_data.extend_from_slice(&self.paymaster_data);
            Bytes::from(paymaster_and_data)
        });

        PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            init_code,
            call_data: self.call_data.clone(),
            account_gas_limits: concat_128(self.verification_gas_limit, self.call_gas_limit),
            pre_verification_gas: self.pre_verification_gas,
            gas_fees: concat_128(self.max_priority_fee_per_gas, self.max_fee_per_gas),
            paymaster_and_data,
            signature: self.signature.clone(),
        }
    }

    /// Upper bound on what the operation can be charged, in wei.
    ///
    /// Saturates at `U256::MAX` rather than wrapping.
    pub fn max_gas_cost(&self) -> U256 {
        let gas = [
            self.call_gas_limit,
            self.verification_gas_limit,
            self.paymaster_verification_gas_limit,
            self.paymaster_post_op_gas_limit,
        ]
        .into_iter()
        .fold(self.pre_verification_gas, |total, limit| total.saturating_add(U256::from(limit)));
        U256::from(self.max_fee_per_gas).saturating_mul(gas)
    }

    /// Verification gas of the account plus that of the paymaster.
    pub fn total_verification_gas_limit(&self) -> U256 {
        U256::from(self.verification_gas_limit) + U256::from(self.paymaster_verification_gas_limit)
    }
}

/// Fields every user operation carries.
#[derive(Debug, Clone, Default)]
pub struct UserOperationRequiredFields {
    /// See [`UserOperation::sender`].
    pub sender: Address,
    /// See [`UserOperation::nonce`].
    pub nonce: U256,
    /// See [`UserOperation::call_data`].
    pub call_data: Bytes,
    /// See [`UserOperation::call_gas_limit`].
    pub call_gas_limit: u128,
    /// See [`UserOperation::verification_gas_limit`].
    pub verification_gas_limit: u128,
    /// See [`UserOperation::pre_verification_gas`].
    pub pre_verification_gas: U256,
    /// See [`UserOperation::max_priority_fee_per_gas`].
    pub max_priority_fee_per_gas: u128,
    /// See [`UserOperation::max_fee_per_gas`].
    pub max_fee_per_gas: u128,
    /// See [`UserOperation::signature`].
    pub signature: Bytes,
}

/// Builds a [`UserOperation`] from its required fields plus optional
/// factory and paymaster sections.
#[derive(Debug, Clone)]
pub struct UserOperationBuilder {
    required: UserOperationRequiredFields,
    factory: Option<(Address, Bytes)>,
    paymaster: Option<(Address, u128, u128, Bytes)>,
}

impl UserOperationBuilder {
    /// Starts from the required fields, with no factory or paymaster.
    pub const fn new(required: UserOperationRequiredFields) -> Self {
        Self { required, factory: None, paymaster: None }
    }

    /// Deploys the account through `factory`.
    pub fn factory(mut self, factory: Address, factory_data: Bytes) -> Self {
        self.factory = Some((factory, factory_data));
        self
    }

    /// Sponsors the operation through `paymaster`.
    pub fn paymaster(
        mut self,
        paymaster: Address,
        paymaster_verification_gas_limit: u128,
        paymaster_post_op_gas_limit: u128,
        paymaster_data: Bytes,
    ) -> Self {
        self.paymaster = Some((
            paymaster,
            paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
            paymaster_data,
        ));
        self
    }

    /// Assembles the operation.
    pub fn build(self) -> UserOperation {
        let (factory, factory_data) = match self.factory {
            Some((factory, data)) => (Some(factory), data),
            None => (None, Bytes::new()),
        };
        let (paymaster, paymaster_verification_gas_limit, paymaster_post_op_gas_limit, paymaster_data) =
            match self.paymaster {
                Some((paymaster, verification, post_op, data)) => {
                    (Some(paymaster), verification, post_op, data)
                }
                None => (None, 0, 0, Bytes::new()),
            };
        let required = self.required;

        UserOperation {
            sender: required.sender,
            nonce: required.nonce,
            factory,
            factory_data,
            call_data: required.call_data,
            call_gas_limit: required.call_gas_limit,
            verification_gas_limit: required.verification_gas_limit,
            pre_verification_gas: required.pre_verification_gas,
            max_priority_fee_per_gas: required.max_priority_fee_per_gas,
            max_fee_per_gas: required.max_fee_per_gas,
            paymaster,
            paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
            paymaster_data,
            signature: required.signature,
        }
    }
}
