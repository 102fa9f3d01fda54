//! Owner rotation for light accounts.
//!
//! The on-chain transfer and the local rebind are not atomic: the local
//! owner reference flips as soon as the operation is accepted, while the
//! chain only catches up once it mines. Callers that need read-your-write
//! consistency must request inclusion, and can assert the postcondition
//! independently with [`get_owner_address`].

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use thiserror::Error;

use crate::account::light::{self, LightAccount};
use crate::provider::{Erc4337Rpc, SmartAccountClient};
use crate::signer::SmartAccountSigner;

#[derive(Error, Debug)]
pub enum TransferError {
    /// Submitting the transfer operation failed.
    #[error("ownership transfer submission failed: {0}")]
    Submit(#[source] anyhow::Error),
    /// The transfer was already submitted as `hash`; the chain may
    /// reflect it even though waiting for inclusion failed.
    #[error("ownership transfer {hash} submitted, but waiting for inclusion failed: {source}")]
    WaitForTransaction {
        hash: B256,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Error, Debug)]
pub enum OwnerError {
    #[error("could not read on-chain owner: {0}")]
    Rpc(#[source] anyhow::Error),
    #[error("could not decode owner() return: {0}")]
    Decode(String),
    /// The account has no locally bound owner to compare against.
    #[error("account has no locally bound owner")]
    OwnerMissing,
    /// The locally bound owner and the chain disagree.
    #[error("locally bound owner {local} does not match on-chain owner {on_chain}")]
    OwnerMismatch { local: Address, on_chain: Address },
}

/// Rotate the account's owner to `new_owner`.
///
/// Encodes `transferOwnership(new_owner)`, submits it self-addressed,
/// flips the local owner reference, and optionally waits for inclusion,
/// in which case the transaction hash is returned instead of the
/// operation hash.
pub async fn transfer_ownership<R: Erc4337Rpc>(
    client: &SmartAccountClient<R>,
    new_owner: Arc<dyn SmartAccountSigner>,
    wait_for_txn: bool,
) -> Result<B256, TransferError> {
    let data = light::encode_transfer_ownership(new_owner.address());
    let result = client
        .send_user_operation(client.get_address(), data)
        .await
        .map_err(TransferError::Submit)?;
    log::debug!(
        "ownership transfer of {} submitted as {}",
        client.get_address(),
        result.hash
    );

    // local view flips as soon as the operation is accepted
    client.account().set_owner(new_owner);

    if wait_for_txn {
        return client
            .wait_for_user_operation_transaction(result.hash)
            .await
            .map_err(|source| TransferError::WaitForTransaction {
                hash: result.hash,
                source,
            });
    }

    Ok(result.hash)
}

/// Read the owner recorded on-chain and check it against the locally
/// bound owner. A postcondition check for [`transfer_ownership`], not
/// part of the transfer itself.
pub async fn get_owner_address<R: Erc4337Rpc>(
    client: &SmartAccountClient<R>,
) -> Result<Address, OwnerError> {
    let data = LightAccount::ownerCall {}.abi_encode();
    let returned = client
        .rpc()
        .call(client.get_address(), data.into())
        .await
        .map_err(OwnerError::Rpc)?;

    let decoded = LightAccount::ownerCall::abi_decode_returns(&returned, true)
        .map_err(|e| OwnerError::Decode(e.to_string()))?;
    let on_chain = decoded._0;

    let local = client
        .account()
        .owner()
        .ok_or(OwnerError::OwnerMissing)?
        .address();
    if local != on_chain {
        return Err(OwnerError::OwnerMismatch { local, on_chain });
    }

    Ok(on_chain)
}
