//! Guarded migration of a light account to the modular implementation.
//!
//! The coordinator reads the account's ERC-1967 implementation slot,
//! refuses to touch anything that is not an undeployed proxy or a known
//! light account, submits a self-addressed `upgradeToAndCall` operation,
//! and rebinds the local representation to a modular account at the same
//! address with the same owner.
//!
//! Two caveats are part of the contract rather than bugs to fix here:
//!
//! - the slot check and the submission are separate chain interactions,
//!   so the implementation can change in the window between them. There
//!   is no on-chain compare-and-swap to close it; callers own the risk
//!   and must not run two account-mutating operations concurrently.
//! - every failure after submission is reported as
//!   [`UpgradeError::PostSubmission`] carrying the submitted hash, since
//!   the chain may already reflect the upgrade and retrying blindly could
//!   resubmit it.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use thiserror::Error;

use crate::account::light::{LightAccount, IMPLEMENTATION_SLOT_KEY, LIGHT_ACCOUNT_IMPLEMENTATION_ADDRESS};
use crate::account::msca::{self, ModularAccountParams};
use crate::account::types::BuildError;
use crate::provider::{Erc4337Rpc, SmartAccountClient};

#[derive(Error, Debug)]
pub enum UpgradeError {
    /// The implementation slot could not be read. Nothing was submitted.
    #[error("could not read implementation slot of {account}: {source}")]
    StorageUnavailable {
        account: Address,
        #[source]
        source: anyhow::Error,
    },
    /// The slot holds neither zero nor the light account implementation.
    /// Nothing was submitted.
    #[error("account {account} implementation slot holds {found}, not the light account")]
    ImplementationMismatch { account: Address, found: B256 },
    /// Submitting the upgrade operation failed.
    #[error("upgrade submission failed: {0}")]
    Submit(#[source] anyhow::Error),
    /// The upgrade operation was already submitted as `hash`; the chain
    /// may reflect it even though completing the migration locally failed.
    #[error("upgrade {hash} submitted, but completing it failed: {source}")]
    PostSubmission {
        hash: B256,
        #[source]
        source: PostSubmissionError,
    },
}

#[derive(Error, Debug)]
pub enum PostSubmissionError {
    #[error("waiting for inclusion failed: {0}")]
    WaitForTransaction(#[source] anyhow::Error),
    #[error("previous account exposes no owner")]
    OwnerMissing,
    #[error("rebinding the upgraded account failed: {0}")]
    Rebind(#[from] BuildError),
}

/// Outcome of a completed migration: the same transport rebound to the
/// modular account, plus the operation hash (or the transaction hash when
/// inclusion was awaited).
pub struct UpgradeResult<R> {
    pub client: SmartAccountClient<R>,
    pub hash: B256,
}

/// Migrate `client`'s light account to `new_implementation`, initialized
/// with `initialization_data`. With `wait_for_txn` the call blocks until
/// the operation is mined and returns the transaction hash instead of the
/// operation hash.
pub async fn upgrade_light_account<R: Erc4337Rpc>(
    client: SmartAccountClient<R>,
    new_implementation: Address,
    initialization_data: Bytes,
    wait_for_txn: bool,
) -> Result<UpgradeResult<R>, UpgradeError> {
    let account_address = client.get_address();

    let storage = client
        .rpc()
        .get_storage_at(account_address, *IMPLEMENTATION_SLOT_KEY)
        .await
        .map_err(|source| UpgradeError::StorageUnavailable {
            account: account_address,
            source,
        })?;

    // a zero slot means the proxy is not deployed yet, so any
    // implementation may be installed. Otherwise the low 20 bytes must be
    // the light account logic contract.
    if !storage.is_zero() && !is_light_implementation(&storage) {
        return Err(UpgradeError::ImplementationMismatch {
            account: account_address,
            found: storage,
        });
    }
    log::debug!("account {account_address} validated for upgrade to {new_implementation}");

    let data = Bytes::from(
        LightAccount::upgradeToAndCallCall {
            newImplementation: new_implementation,
            data: initialization_data,
        }
        .abi_encode(),
    );

    let result = client
        .send_user_operation(account_address, data)
        .await
        .map_err(UpgradeError::Submit)?;
    let mut hash = result.hash;
    log::debug!("upgrade of {account_address} submitted as {hash}");

    if wait_for_txn {
        hash = client
            .wait_for_user_operation_transaction(result.hash)
            .await
            .map_err(|source| UpgradeError::PostSubmission {
                hash: result.hash,
                source: PostSubmissionError::WaitForTransaction(source),
            })?;
    }

    let Some(owner) = client.account().get_owner() else {
        return Err(UpgradeError::PostSubmission {
            hash,
            source: PostSubmissionError::OwnerMissing,
        });
    };

    let upgraded = msca::create_multi_owner_account(ModularAccountParams {
        chain_id: client.account().chain_id(),
        account_address,
        factory_address: None,
        owner,
        owners: Vec::new(),
        index: U256::ZERO,
    })
    .map_err(|source| UpgradeError::PostSubmission {
        hash,
        source: source.into(),
    })?;

    Ok(UpgradeResult {
        client: client.connect(move |_| upgraded),
        hash,
    })
}

fn is_light_implementation(slot_value: &B256) -> bool {
    slot_value[..12] == [0u8; 12]
        && Address::from_slice(&slot_value[12..]) == *LIGHT_ACCOUNT_IMPLEMENTATION_ADDRESS
}
