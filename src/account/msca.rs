//! The modular multi-owner account, richer target of the light account
//! migration: batch calls carry values, and the factory derives one
//! address for a whole owner set.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_macro::sol;
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use std::str::FromStr;
use std::sync::Arc;

use super::builder::SmartAccountBuilder;
use super::types::{
    AccountHandle, AccountParams, BuildError, DeploymentFactory, ExecuteEncoder, Executor, Factory,
};
use super::{OwnerOperationSigner, SmartContractAccount};
use crate::signer::SmartAccountSigner;
use crate::types::{UserOperationCallData, SUPPORTED_CHAINS};

sol! {
    contract ModularAccount {
        struct Call {
            address target;
            uint256 value;
            bytes data;
        }

        function execute(address target, uint256 value, bytes calldata data) external payable returns (bytes memory);
        function executeBatch(Call[] calldata calls) external payable returns (bytes[] memory);
    }

    contract MultiOwnerModularAccountFactory {
        function createAccount(uint256 salt, address[] calldata owners) external returns (address account);
    }
}

/// Canonical multi-owner factory, same address on every supported chain.
pub const MULTI_OWNER_FACTORY: &str = "0x000000e92D78D90000007F0082006FDA09BD5f11";

lazy_static! {
    pub static ref MULTI_OWNER_FACTORY_ADDRESS: Address =
        Address::from_str(MULTI_OWNER_FACTORY).unwrap();
}

/// Canonical multi-owner factory for `chain_id`, if one is deployed there.
pub fn default_factory_address(chain_id: u64) -> Result<Address, BuildError> {
    if !SUPPORTED_CHAINS.contains(&chain_id) {
        return Err(BuildError::UnsupportedChain(chain_id));
    }
    Ok(*MULTI_OWNER_FACTORY_ADDRESS)
}

struct ModularExecutor;

impl ExecuteEncoder for ModularExecutor {
    fn encode_execute(&self, target: Address, value: U256, data: Bytes) -> Bytes {
        Bytes::from(
            ModularAccount::executeCall {
                target,
                value,
                data,
            }
            .abi_encode(),
        )
    }

    fn encode_batch_execute(&self, calls: &[UserOperationCallData]) -> Bytes {
        let calls = calls
            .iter()
            .map(|call| ModularAccount::Call {
                target: call.target,
                value: call.value.unwrap_or(U256::ZERO),
                data: call.data.clone(),
            })
            .collect();
        Bytes::from(ModularAccount::executeBatchCall { calls }.abi_encode())
    }
}

/// Executor capability provider for the modular execute forms.
pub fn modular_account_executor() -> Executor {
    Box::new(|_: &AccountHandle| Arc::new(ModularExecutor))
}

struct MultiOwnerFactory {
    account: AccountHandle,
    factory: Address,
    additional_owners: Vec<Address>,
    index: U256,
}

impl DeploymentFactory for MultiOwnerFactory {
    fn factory_address(&self) -> Address {
        self.factory
    }

    fn deployment_call_data(&self) -> Result<Bytes> {
        let signing_owner = self
            .account
            .owner()
            .ok_or_else(|| anyhow!("account {} has no owner to deploy for", self.account.address()))?;

        // the factory derives the address from the owner set, so the set
        // is normalized: sorted, deduped, signing owner included
        let mut owners = self.additional_owners.clone();
        owners.push(signing_owner.address());
        owners.sort();
        owners.dedup();

        Ok(Bytes::from(
            MultiOwnerModularAccountFactory::createAccountCall {
                salt: self.index,
                owners,
            }
            .abi_encode(),
        ))
    }
}

/// Factory capability provider for the multi-owner factory.
pub fn multi_owner_factory(factory: Address, additional_owners: Vec<Address>, index: U256) -> Factory {
    Box::new(move |account: &AccountHandle| {
        Arc::new(MultiOwnerFactory {
            account: account.clone(),
            factory,
            additional_owners,
            index,
        })
    })
}

pub struct ModularAccountParams {
    pub chain_id: u64,
    /// deployed or counterfactual address of the account
    pub account_address: Address,
    /// canonical factory for the chain when `None`
    pub factory_address: Option<Address>,
    /// the owner that signs for this account
    pub owner: Arc<dyn SmartAccountSigner>,
    /// additional owner addresses beyond the signing owner
    pub owners: Vec<Address>,
    /// factory salt; distinct values derive sibling accounts for the same
    /// owner set
    pub index: U256,
}

/// Assemble a modular multi-owner account facade.
pub fn create_multi_owner_account(
    params: ModularAccountParams,
) -> Result<SmartContractAccount, BuildError> {
    if params.owners.contains(&Address::ZERO) {
        return Err(BuildError::InvalidParams(
            "owners must not contain the zero address".into(),
        ));
    }

    let factory = match params.factory_address {
        Some(address) => address,
        None => default_factory_address(params.chain_id)?,
    };

    SmartAccountBuilder::new()
        .with_signer(Box::new(|account: &AccountHandle| {
            Arc::new(OwnerOperationSigner {
                account: account.clone(),
            })
        }))
        .with_executor(modular_account_executor())
        .with_factory(multi_owner_factory(factory, params.owners, params.index))
        .build(AccountParams {
            chain_id: params.chain_id,
            account_address: params.account_address,
            owner: Some(params.owner),
        })
}
