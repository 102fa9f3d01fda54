use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// One call to run through a smart account's execute path.
///
/// This is the only shape the library hands to a transport when submitting
/// a user operation; gas fields, nonces, paymaster data and signatures are
/// filled in on the other side of the [`crate::provider::Erc4337Rpc`] seam.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperationCallData {
    /// the target of the call
    pub target: Address,
    /// the data passed to the target
    pub data: Bytes,
    /// native token to send to the target (default: 0)
    #[serde(default)]
    pub value: Option<U256>,
}

pub type BatchUserOperationCallData = Vec<UserOperationCallData>;

/// Handle returned by a bundler for a submitted user operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendUserOperationResult {
    /// hash the bundler assigned to the operation; resolves to a
    /// transaction hash once the operation is mined
    pub hash: B256,
}

/// Chains the canonical account factories are deployed on.
pub const SUPPORTED_CHAINS: &[u64] = &[
    1,        // mainnet
    5,        // goerli
    10,       // optimism
    137,      // polygon
    420,      // optimism goerli
    8453,     // base
    80001,    // polygon mumbai
    84531,    // base goerli
    421613,   // arbitrum goerli
    42161,    // arbitrum
    11155111, // sepolia
];
