//! The minimal single-owner account: capability providers, the canonical
//! deployment constants, and the ABI surface the coordinators encode
//! against.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_macro::sol;
use alloy_sol_types::SolCall;
use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use std::str::FromStr;
use std::sync::Arc;

use super::builder::SmartAccountBuilder;
use super::types::{
    AccountHandle, AccountParams, AccountSigner, BuildError, DeploymentFactory, ExecuteEncoder,
    Executor, Factory,
};
use super::{OwnerOperationSigner, SmartContractAccount};
use crate::signer::SmartAccountSigner;
use crate::types::{UserOperationCallData, SUPPORTED_CHAINS};

sol! {
    contract LightAccount {
        function owner() external view returns (address);
        function upgradeToAndCall(address newImplementation, bytes calldata data) external payable;
        function transferOwnership(address newOwner) external;
        function execute(address dest, uint256 value, bytes calldata func) external;
        function executeBatch(address[] calldata dest, bytes[] calldata func) external;
    }

    contract LightAccountFactory {
        function createAccount(address owner, uint256 salt) external returns (address account);
    }
}

/// Deployed light account logic contract, shared across supported chains.
pub const LIGHT_ACCOUNT_IMPLEMENTATION: &str = "0x5467b1947f47d0646704eb801e075e72aeae8113";

/// ERC-1967 logic slot: `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// Canonical light account factory, same address on every supported chain.
pub const LIGHT_ACCOUNT_FACTORY: &str = "0x00000055C0b4fA41dde26A74435ff03692292FBD";

lazy_static! {
    pub static ref LIGHT_ACCOUNT_IMPLEMENTATION_ADDRESS: Address =
        Address::from_str(LIGHT_ACCOUNT_IMPLEMENTATION).unwrap();
    pub static ref IMPLEMENTATION_SLOT_KEY: B256 = B256::from_str(IMPLEMENTATION_SLOT).unwrap();
    pub static ref LIGHT_ACCOUNT_FACTORY_ADDRESS: Address =
        Address::from_str(LIGHT_ACCOUNT_FACTORY).unwrap();
}

/// Canonical factory for `chain_id`, if one is deployed there.
pub fn default_factory_address(chain_id: u64) -> Result<Address, BuildError> {
    if !SUPPORTED_CHAINS.contains(&chain_id) {
        return Err(BuildError::UnsupportedChain(chain_id));
    }
    Ok(*LIGHT_ACCOUNT_FACTORY_ADDRESS)
}

/// Signer capability provider: all signatures come from the account's
/// current owner.
pub fn light_account_signer() -> AccountSigner {
    Box::new(|account: &AccountHandle| {
        Arc::new(OwnerOperationSigner {
            account: account.clone(),
        })
    })
}

struct LightExecutor;

impl ExecuteEncoder for LightExecutor {
    fn encode_execute(&self, target: Address, value: U256, data: Bytes) -> Bytes {
        Bytes::from(
            LightAccount::executeCall {
                dest: target,
                value,
                func: data,
            }
            .abi_encode(),
        )
    }

    fn encode_batch_execute(&self, calls: &[UserOperationCallData]) -> Bytes {
        // per-call values are not expressible in this ABI and are ignored
        let (dest, func) = calls
            .iter()
            .map(|call| (call.target, call.data.clone()))
            .unzip();
        Bytes::from(LightAccount::executeBatchCall { dest, func }.abi_encode())
    }
}

/// Executor capability provider for the light execute forms.
pub fn light_account_executor() -> Executor {
    Box::new(|_: &AccountHandle| Arc::new(LightExecutor))
}

struct LightFactory {
    account: AccountHandle,
    factory: Address,
}

impl DeploymentFactory for LightFactory {
    fn factory_address(&self) -> Address {
        self.factory
    }

    fn deployment_call_data(&self) -> Result<Bytes> {
        let owner = self
            .account
            .owner()
            .ok_or_else(|| anyhow!("account {} has no owner to deploy for", self.account.address()))?;
        // light accounts do not support sub-accounts; the salt is fixed
        Ok(Bytes::from(
            LightAccountFactory::createAccountCall {
                owner: owner.address(),
                salt: U256::ZERO,
            }
            .abi_encode(),
        ))
    }
}

/// Factory capability provider deploying through `factory`.
pub fn light_account_factory(factory: Address) -> Factory {
    Box::new(move |account: &AccountHandle| {
        Arc::new(LightFactory {
            account: account.clone(),
            factory,
        })
    })
}

pub struct LightAccountParams {
    pub chain_id: u64,
    /// deployed or counterfactual address of the account
    pub account_address: Address,
    /// canonical factory for the chain when `None`
    pub factory_address: Option<Address>,
    pub owner: Arc<dyn SmartAccountSigner>,
}

/// Assemble a light account facade bound to `params.owner`.
pub fn create_light_account(params: LightAccountParams) -> Result<SmartContractAccount, BuildError> {
    let factory = match params.factory_address {
        Some(address) => address,
        None => default_factory_address(params.chain_id)?,
    };

    SmartAccountBuilder::new()
        .with_signer(light_account_signer())
        .with_executor(light_account_executor())
        .with_factory(light_account_factory(factory))
        .build(AccountParams {
            chain_id: params.chain_id,
            account_address: params.account_address,
            owner: Some(params.owner),
        })
}

/// Call data for `transferOwnership(newOwner)`.
pub fn encode_transfer_ownership(new_owner: Address) -> Bytes {
    Bytes::from(
        LightAccount::transferOwnershipCall {
            newOwner: new_owner,
        }
        .abi_encode(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_dyn_abi::TypedData;
    use async_trait::async_trait;

    const OWNER: &str = "0x1111111111111111111111111111111111111111";
    const ACCOUNT: &str = "0x2222222222222222222222222222222222222222";

    struct StubOwner;

    #[async_trait]
    impl SmartAccountSigner for StubOwner {
        fn address(&self) -> Address {
            Address::from_str(OWNER).unwrap()
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Bytes> {
            Ok(Bytes::from_static(&[0xaa; 65]))
        }

        async fn sign_typed_data(&self, _payload: &TypedData) -> Result<Bytes> {
            Ok(Bytes::from_static(&[0xbb; 65]))
        }
    }

    fn light_account() -> SmartContractAccount {
        create_light_account(LightAccountParams {
            chain_id: 11155111,
            account_address: Address::from_str(ACCOUNT).unwrap(),
            factory_address: None,
            owner: Arc::new(StubOwner),
        })
        .unwrap()
    }

    #[test]
    fn encodes_execute() {
        let account = light_account();
        let encoded = account.encode_execute(
            Address::from_str("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef").unwrap(),
            U256::ZERO,
            Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        );
        assert_eq!(
            hex::encode(&encoded),
            "b61d27f6\
             000000000000000000000000deadbeefdeadbeefdeadbeefdeadbeefdeadbeef\
             0000000000000000000000000000000000000000000000000000000000000000\
             0000000000000000000000000000000000000000000000000000000000000060\
             0000000000000000000000000000000000000000000000000000000000000004\
             deadbeef00000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn encodes_batch_execute() {
        let account = light_account();
        let encoded = account.encode_batch_execute(&[
            UserOperationCallData {
                target: Address::from_str("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef").unwrap(),
                data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
                value: None,
            },
            UserOperationCallData {
                target: Address::from_str("0x8ba1f109551bd432803012645ac136ddd64dba72").unwrap(),
                data: Bytes::from_static(&[0xca, 0xfe, 0xba, 0xbe]),
                value: None,
            },
        ]);
        assert_eq!(
            hex::encode(&encoded),
            "18dfb3c7\
             0000000000000000000000000000000000000000000000000000000000000040\
             00000000000000000000000000000000000000000000000000000000000000a0\
             0000000000000000000000000000000000000000000000000000000000000002\
             000000000000000000000000deadbeefdeadbeefdeadbeefdeadbeefdeadbeef\
             0000000000000000000000008ba1f109551bd432803012645ac136ddd64dba72\
             0000000000000000000000000000000000000000000000000000000000000002\
             0000000000000000000000000000000000000000000000000000000000000040\
             0000000000000000000000000000000000000000000000000000000000000080\
             0000000000000000000000000000000000000000000000000000000000000004\
             deadbeef00000000000000000000000000000000000000000000000000000000\
             0000000000000000000000000000000000000000000000000000000000000004\
             cafebabe00000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn init_code_is_factory_address_then_create_account_call() {
        let account = light_account();
        let init_code = account.get_account_init_code().unwrap();

        let expected = format!(
            "{}{}",
            &LIGHT_ACCOUNT_FACTORY[2..].to_lowercase(),
            "5fbfb9cf\
             0000000000000000000000001111111111111111111111111111111111111111\
             0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(hex::encode(&init_code), expected);
    }

    #[test]
    fn init_code_is_deterministic() {
        let account = light_account();
        let first = account.get_account_init_code().unwrap();
        let second = account.get_account_init_code().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encodes_transfer_ownership() {
        let encoded = encode_transfer_ownership(
            Address::from_str("0x3333333333333333333333333333333333333333").unwrap(),
        );
        assert_eq!(
            hex::encode(&encoded),
            "f2fde38b0000000000000000000000003333333333333333333333333333333333333333"
        );
    }

    #[test]
    fn unknown_chain_has_no_default_factory() {
        let err = create_light_account(LightAccountParams {
            chain_id: 31337,
            account_address: Address::from_str(ACCOUNT).unwrap(),
            factory_address: None,
            owner: Arc::new(StubOwner),
        })
        .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedChain(31337)));
    }

    #[test]
    fn explicit_factory_overrides_the_default() {
        let factory = Address::from_str("0x4444444444444444444444444444444444444444").unwrap();
        let account = create_light_account(LightAccountParams {
            chain_id: 31337,
            account_address: Address::from_str(ACCOUNT).unwrap(),
            factory_address: Some(factory),
            owner: Arc::new(StubOwner),
        })
        .unwrap();
        let init_code = account.get_account_init_code().unwrap();
        assert_eq!(&init_code[..20], factory.as_slice());
    }
}
