//! User operation hashing for the v0.7 and v0.8 EntryPoints.
use alloy_primitives::{Address, B256, U256, address, keccak256};
use alloy_sol_types::{SolValue, sol};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::user_operation::PackedUserOperation;

/// Canonical EntryPoint v0.7 deployment.
pub const ENTRY_POINT_V07_ADDRESS: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Canonical EntryPoint v0.8 deployment.
pub const ENTRY_POINT_V08_ADDRESS: Address = address!("4337084D9E255Ff0702461CF8895CE9E3b5Ff108");

/// EIP-712 type string of a v0.8 packed user operation.
pub const USEROP_TYPEHASH: &str = "PackedUserOperation(address sender,uint256 nonce,bytes initCode,bytes callData,bytes32 accountGasLimits,uint256 preVerificationGas,bytes32 gasFees,bytes paymasterAndData)";
/// EIP-712 type string of the EntryPoint domain.
pub const EIP712_DOMAIN_TYPEHASH: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

// From EntryPoint.sol
const DOMAIN_NAME: &str = "ERC4337";
const DOMAIN_VERSION: &str = "1";

sol! {
    struct UserOperationFields {
        address sender;
        uint256 nonce;
        bytes32 initCodeHash;
        bytes32 callDataHash;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes32 paymasterAndDataHash;
    }

    struct TypedUserOperationFields {
        bytes32 userOpTypeHash;
        address sender;
        uint256 nonce;
        bytes32 initCodeHash;
        bytes32 callDataHash;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes32 paymasterAndDataHash;
    }

    struct DeploymentBinding {
        bytes32 userOpHash;
        address entryPoint;
        uint256 chainId;
    }

    struct DomainSeparatorData {
        bytes32 typeHash;
        bytes32 nameHash;
        bytes32 versionHash;
        uint256 chainId;
        address verifyingContract;
    }
}

/// EntryPoint release that defines the hashing scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryPointVersion {
    /// `keccak256(abi.encode(structHash, entryPoint, chainId))`
    #[default]
    #[serde(rename = "v0.7")]
    V0_7,
    /// EIP-712 typed data hash under the `ERC4337` domain
    #[serde(rename = "v0.8")]
    V0_8,
}

fn encode_fields(op: &PackedUserOperation) -> Vec<u8> {
    UserOperationFields {
        sender: op.sender,
        nonce: op.nonce,
        initCodeHash: keccak256(&op.init_code),
        callDataHash: keccak256(&op.call_data),
        accountGasLimits: op.account_gas_limits,
        preVerificationGas: op.pre_verification_gas,
        gasFees: op.gas_fees,
        paymasterAndDataHash: keccak256(&op.paymaster_and_data),
    }
    .abi_encode()
}

/// Hash of a packed user operation as computed by the v0.7 EntryPoint's
/// `getUserOpHash`.
///
/// The inner hash covers the operation with its signature excluded; the
/// outer hash binds it to one EntryPoint on one chain so the same
/// operation cannot be replayed on another deployment.
pub fn hash(op: &PackedUserOperation, entry_point: Address, chain_id: u64) -> B256 {
    let inner = keccak256(encode_fields(op));
    let hash = keccak256(
        DeploymentBinding { userOpHash: inner, entryPoint: entry_point, chainId: U256::from(chain_id) }
            .abi_encode(),
    );
    trace!(sender = %op.sender, nonce = %op.nonce, %entry_point, chain_id, %hash, "hashed user operation");
    hash
}

/// Hash of a packed user operation under the given EntryPoint version.
pub fn hash_for(
    version: EntryPointVersion,
    op: &PackedUserOperation,
    entry_point: Address,
    chain_id: u64,
) -> B256 {
    match version {
        EntryPointVersion::V0_7 => hash(op, entry_point, chain_id),
        EntryPointVersion::V0_8 => {
            let struct_hash = keccak256(encode_typed_fields(op));
            let hash = to_typed_data_hash(compute_domain_separator(chain_id, entry_point), struct_hash);
            trace!(sender = %op.sender, nonce = %op.nonce, %entry_point, chain_id, %hash, "hashed user operation (eip-712)");
            hash
        }
    }
}

fn encode_typed_fields(op: &PackedUserOperation) -> Vec<u8> {
    TypedUserOperationFields {
        userOpTypeHash: keccak256(USEROP_TYPEHASH.as_bytes()),
        sender: op.sender,
        nonce: op.nonce,
        initCodeHash: keccak256(&op.init_code),
        callDataHash: keccak256(&op.call_data),
        accountGasLimits: op.account_gas_limits,
        preVerificationGas: op.pre_verification_gas,
        gasFees: op.gas_fees,
        paymasterAndDataHash: keccak256(&op.paymaster_and_data),
    }
    .abi_encode()
}

/// EIP-712 domain separator of an EntryPoint:
/// `keccak256(abi.encode(EIP712_DOMAIN_TYPEHASH, keccak256("ERC4337"), keccak256("1"), chainId, entryPoint))`
pub fn compute_domain_separator(chain_id: u64, entry_point: Address) -> B256 {
    let data = DomainSeparatorData {
        typeHash: keccak256(EIP712_DOMAIN_TYPEHASH.as_bytes()),
        nameHash: keccak256(DOMAIN_NAME.as_bytes()),
        versionHash: keccak256(DOMAIN_VERSION.as_bytes()),
        chainId: U256::from(chain_id),
        verifyingContract: entry_point,
    };

    keccak256(data.abi_encode())
}

/// `keccak256(0x19 || 0x01 || domainSeparator || structHash)`
pub fn to_typed_data_hash(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut enc = [0u8; 66];
    enc[0] = 0x19;
    enc[1] = 0x01;
    enc[2..34].copy_from_slice(domain_separator.as_slice());
    enc[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(enc)
}
