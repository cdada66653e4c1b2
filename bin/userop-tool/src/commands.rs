//! Subcommand handlers. Each returns a JSON-serializable report.

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, B256, Bytes, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use userop_core::{
    Authorizer, EntryPointVersion, PackedUserOperation, UserOperation, ValidationData,
    combine_validation_data, get_validation_data, hash_for, pack_validation_data,
};

use crate::config::{Command, Config};

/// A user operation file holds either the packed EntryPoint form or the
/// unpacked RPC form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OperationInput {
    Packed(PackedUserOperation),
    Unpacked(UserOperation),
}

impl OperationInput {
    pub(crate) fn into_packed(self) -> PackedUserOperation {
        match self {
            Self::Packed(op) => op,
            Self::Unpacked(op) => op.pack(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidationDataReport {
    pub(crate) word: U256,
    pub(crate) authorizer: Address,
    pub(crate) sig_success: bool,
    pub(crate) aggregator: Option<Address>,
    pub(crate) valid_after: u64,
    pub(crate) valid_until: u64,
}

impl From<U256> for ValidationDataReport {
    fn from(word: U256) -> Self {
        let data = ValidationData::parse(word);
        Self {
            word,
            authorizer: data.authorizer().address(),
            sig_success: data.is_success(),
            aggregator: data.authorizer().aggregator(),
            valid_after: data.valid_after(),
            valid_until: data.valid_until(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RangeReport {
    pub(crate) authorizer: Address,
    pub(crate) now: u64,
    pub(crate) out_of_time_range: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectReport {
    pub(crate) sender: Address,
    pub(crate) nonce: U256,
    pub(crate) factory: Address,
    pub(crate) factory_data: Bytes,
    pub(crate) verification_gas_limit: u128,
    pub(crate) call_gas_limit: u128,
    pub(crate) pre_verification_gas: U256,
    pub(crate) max_priority_fee_per_gas: u128,
    pub(crate) max_fee_per_gas: u128,
    pub(crate) gas_price: u128,
    pub(crate) paymaster: Address,
    pub(crate) paymaster_verification_gas_limit: u128,
    pub(crate) paymaster_post_op_gas_limit: u128,
    pub(crate) paymaster_data: Bytes,
}

impl InspectReport {
    pub(crate) fn from_packed(op: &PackedUserOperation) -> Result<Self> {
        Ok(Self {
            sender: op.sender,
            nonce: op.nonce,
            factory: op.factory()?,
            factory_data: op.factory_data()?,
            verification_gas_limit: op.verification_gas_limit(),
            call_gas_limit: op.call_gas_limit(),
            pre_verification_gas: op.pre_verification_gas,
            max_priority_fee_per_gas: op.max_priority_fee_per_gas(),
            max_fee_per_gas: op.max_fee_per_gas(),
            gas_price: op.gas_price(),
            paymaster: op.paymaster()?,
            paymaster_verification_gas_limit: op.paymaster_verification_gas_limit()?,
            paymaster_post_op_gas_limit: op.paymaster_post_op_gas_limit()?,
            paymaster_data: op.paymaster_data()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HashReport {
    pub(crate) user_op_hash: B256,
    pub(crate) entry_point: Address,
    pub(crate) chain_id: u64,
    pub(crate) version: EntryPointVersion,
}

pub(crate) fn pack(authorizer: Authorizer, valid_after: u64, valid_until: u64) -> Result<ValidationDataReport> {
    let word = pack_validation_data(authorizer, valid_after, valid_until)?;
    Ok(ValidationDataReport::from(word))
}

pub(crate) fn combine(a: U256, b: U256) -> ValidationDataReport {
    ValidationDataReport::from(combine_validation_data(a, b))
}

pub(crate) fn range(word: U256, now: u64) -> RangeReport {
    let (authorizer, out_of_time_range) = get_validation_data(word, now);
    RangeReport { authorizer, now, out_of_time_range }
}

pub(crate) fn read_operation(path: &Path) -> Result<PackedUserOperation> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read user operation file {}", path.display()))?;
    let input: OperationInput = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse user operation in {}", path.display()))?;
    debug!(path = %path.display(), "loaded user operation");
    Ok(input.into_packed())
}

pub(crate) fn hash(
    op: &PackedUserOperation,
    version: EntryPointVersion,
    entry_point: Address,
    chain_id: u64,
) -> HashReport {
    HashReport { user_op_hash: hash_for(version, op, entry_point, chain_id), entry_point, chain_id, version }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH).context("System clock is before the Unix epoch")?.as_secs())
}

/// Runs the configured subcommand.
pub(crate) fn run(config: &Config) -> Result<serde_json::Value> {
    let report = match &config.command {
        Command::PackValidationData { authorizer, valid_after, valid_until } => {
            serde_json::to_value(pack(*authorizer, *valid_after, *valid_until)?)?
        }
        Command::ParseValidationData { word } => {
            serde_json::to_value(ValidationDataReport::from(*word))?
        }
        Command::CombineValidationData { a, b } => serde_json::to_value(combine(*a, *b))?,
        Command::ValidationRange { word, now } => {
            let now = match now {
                Some(now) => *now,
                None => unix_now()?,
            };
            serde_json::to_value(range(*word, now))?
        }
        Command::Inspect { path } => {
            let op = read_operation(path)?;
            serde_json::to_value(InspectReport::from_packed(&op)?)?
        }
        Command::Hash { path, version } => {
            let op = read_operation(path)?;
            let report = hash(&op, *version, config.entry_point, config.chain_id);
            info!(
                message = "Computed user operation hash",
                user_op_hash = %report.user_op_hash,
                entry_point = %config.entry_point,
                chain_id = config.chain_id,
            );
            serde_json::to_value(report)?
        }
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::bytes;
    use userop_core::{
        ENTRY_POINT_V07_ADDRESS, MAX_UINT48, SIG_VALIDATION_FAILED, hash as userop_hash,
        test_utils::{TEST_FACTORY, TEST_PAYMASTER, create_sponsored_user_operation},
    };

    use super::*;

    #[test]
    fn test_pack_report() {
        let report = pack(Authorizer::from(false), 0, 0).unwrap();
        assert_eq!(report.word, SIG_VALIDATION_FAILED);
        assert!(!report.sig_success);
        assert_eq!(report.aggregator, None);
        assert_eq!(report.valid_until, MAX_UINT48);
    }

    #[test]
    fn test_pack_report_rejects_wide_timestamp() {
        assert!(pack(Authorizer::SUCCESS, MAX_UINT48 + 1, 0).is_err());
    }

    #[test]
    fn test_combine_and_range_reports() {
        let a = pack(Authorizer::SUCCESS, 10, 100).unwrap().word;
        let b = pack(Authorizer::SUCCESS, 20, 0).unwrap().word;
        let combined = combine(a, b);
        assert!(combined.sig_success);
        assert_eq!((combined.valid_after, combined.valid_until), (20, 100));

        assert!(!range(combined.word, 50).out_of_time_range);
        assert!(range(combined.word, 101).out_of_time_range);
    }

    #[test]
    fn test_operation_input_accepts_both_forms() {
        let uo = create_sponsored_user_operation();
        let packed = uo.pack();

        let from_unpacked: OperationInput =
            serde_json::from_value(serde_json::to_value(&uo).unwrap()).unwrap();
        let from_packed: OperationInput =
            serde_json::from_value(serde_json::to_value(&packed).unwrap()).unwrap();

        assert_eq!(from_unpacked.into_packed(), packed);
        assert_eq!(from_packed.into_packed(), packed);
    }

    #[test]
    fn test_inspect_report() {
        let report = InspectReport::from_packed(&create_sponsored_user_operation().pack()).unwrap();
        assert_eq!(report.factory, TEST_FACTORY);
        assert_eq!(report.factory_data, bytes!("123456"));
        assert_eq!(report.paymaster, TEST_PAYMASTER);
        assert_eq!(report.paymaster_data, bytes!("beefcafe"));
        assert_eq!(report.gas_price, report.max_priority_fee_per_gas);
    }

    #[test]
    fn test_inspect_report_rejects_malformed_paymaster() {
        let op = PackedUserOperation {
            paymaster_and_data: Bytes::copy_from_slice(TEST_PAYMASTER.as_slice()),
            ..create_sponsored_user_operation().pack()
        };
        assert!(InspectReport::from_packed(&op).is_err());
    }

    #[test]
    fn test_hash_report() {
        let op = create_sponsored_user_operation().pack();
        let report = hash(&op, EntryPointVersion::V0_7, ENTRY_POINT_V07_ADDRESS, 8453);
        assert_eq!(report.user_op_hash, userop_hash(&op, ENTRY_POINT_V07_ADDRESS, 8453));
    }
}
