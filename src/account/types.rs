use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::{AccountCore, Extensions, SmartContractAccount};
use crate::signer::SmartAccountSigner;
use crate::types::UserOperationCallData;

/// Shared handle to one account's identity. Capability implementations
/// hold a clone and read the address, chain and owner through it, which is
/// what lets a capability and the account it serves reference each other.
pub type AccountHandle = Arc<AccountCore>;

/// Signing surface bound to an account.
#[async_trait]
pub trait OperationSigner: Send + Sync {
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Bytes>;

    /// Sign the hash a bundler derives for a user operation.
    async fn sign_user_operation_hash(&self, uo_hash: B256) -> Result<Bytes>;

    /// A well-formed signature the entry point will reject, used for gas
    /// estimation before the genuine signature exists.
    fn dummy_signature(&self) -> Bytes;

    fn owner(&self) -> Option<Arc<dyn SmartAccountSigner>>;
}

/// Call-data encoding surface bound to an account.
pub trait ExecuteEncoder: Send + Sync {
    fn encode_execute(&self, target: Address, value: U256, data: Bytes) -> Bytes;

    fn encode_batch_execute(&self, calls: &[UserOperationCallData]) -> Bytes;
}

/// Deployment surface bound to an account.
pub trait DeploymentFactory: Send + Sync {
    fn factory_address(&self) -> Address;

    /// Factory call that deploys this account at its counterfactual
    /// address. Must be a pure function of the account's owner and salt.
    fn deployment_call_data(&self) -> Result<Bytes>;
}

/// Strategy constructors handed to the builder. Each receives the handle
/// of the account it will serve and returns the bound capability.
pub type AccountSigner = Box<dyn FnOnce(&AccountHandle) -> Arc<dyn OperationSigner> + Send>;
pub type Executor = Box<dyn FnOnce(&AccountHandle) -> Arc<dyn ExecuteEncoder> + Send>;
pub type Factory = Box<dyn FnOnce(&AccountHandle) -> Arc<dyn DeploymentFactory> + Send>;

/// Produces auxiliary capabilities from the assembled account. Runs once
/// at build time; its output merges under the reserved-name rule.
pub type Decorators = Box<dyn FnOnce(&SmartContractAccount) -> Extensions + Send>;

/// The capability slots a complete account requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilitySlot {
    Signer,
    Executor,
    Factory,
}

impl fmt::Display for CapabilitySlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CapabilitySlot::Signer => write!(f, "signer"),
            CapabilitySlot::Executor => write!(f, "executor"),
            CapabilitySlot::Factory => write!(f, "factory"),
        }
    }
}

/// Construction parameters common to every account type.
pub struct AccountParams {
    pub chain_id: u64,
    /// deployed or counterfactual address of the account
    pub account_address: Address,
    pub owner: Option<Arc<dyn SmartAccountSigner>>,
}

impl AccountParams {
    pub(crate) fn validate(&self) -> Result<(), BuildError> {
        if self.chain_id == 0 {
            return Err(BuildError::InvalidParams("chain_id must be nonzero".into()));
        }
        if self.account_address == Address::ZERO {
            return Err(BuildError::InvalidParams(
                "account_address must not be the zero address".into(),
            ));
        }
        Ok(())
    }
}

/// Failures detected while assembling an account. All of these are raised
/// before any I/O happens.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Required capability slots were never supplied.
    #[error("account builder is missing required capabilities: {0:?}")]
    IncompleteBuilder(Vec<CapabilitySlot>),
    /// A required slot was supplied more than once.
    #[error("{0} capability supplied more than once")]
    DuplicateCapability(CapabilitySlot),
    /// A constructor parameter failed validation.
    #[error("invalid account parameters: {0}")]
    InvalidParams(String),
    /// No canonical factory deployment is known for the chain.
    #[error("chain {0} has no default factory deployment")]
    UnsupportedChain(u64),
}
