use alloy_primitives::{Address, Bytes, B256};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::account::SmartContractAccount;
use crate::types::SendUserOperationResult;

/// The surface this crate needs from an ERC-4337 transport.
///
/// Implementations own everything below the seam: RPC connections, gas
/// estimation, nonce management, paymaster negotiation, and the wire form
/// of the user operation itself. This crate only supplies a target and
/// call data, and reads back hashes. Failures cross the seam unchanged;
/// no retry or backoff happens on this side.
#[async_trait]
pub trait Erc4337Rpc: Send + Sync {
    /// Raw storage read of `slot` at `address`.
    async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256>;

    /// `eth_call` against `to`.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Assemble, sign and submit a user operation from `account` that
    /// executes `data` against `target`.
    async fn send_user_operation(
        &self,
        account: &SmartContractAccount,
        target: Address,
        data: Bytes,
    ) -> Result<SendUserOperationResult>;

    /// Block until the operation lands in a transaction and return the
    /// transaction hash. Bounded only by the caller's own timeout.
    async fn wait_for_user_operation_transaction(&self, uo_hash: B256) -> Result<B256>;
}

/// A smart account bound to a live transport.
pub struct SmartAccountClient<R> {
    rpc: Arc<R>,
    account: SmartContractAccount,
}

impl<R: Erc4337Rpc> SmartAccountClient<R> {
    pub fn new(rpc: Arc<R>, account: SmartContractAccount) -> Self {
        Self { rpc, account }
    }

    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    pub fn account(&self) -> &SmartContractAccount {
        &self.account
    }

    pub fn get_address(&self) -> Address {
        self.account.address()
    }

    pub async fn send_user_operation(
        &self,
        target: Address,
        data: Bytes,
    ) -> Result<SendUserOperationResult> {
        self.rpc
            .send_user_operation(&self.account, target, data)
            .await
    }

    pub async fn wait_for_user_operation_transaction(&self, uo_hash: B256) -> Result<B256> {
        self.rpc.wait_for_user_operation_transaction(uo_hash).await
    }

    /// Rebind this connection to a different account facade, keeping the
    /// transport. Used when an upgrade replaces the account wholesale.
    pub fn connect<F>(self, rebind: F) -> SmartAccountClient<R>
    where
        F: FnOnce(Arc<R>) -> SmartContractAccount,
    {
        let account = rebind(self.rpc.clone());
        SmartAccountClient {
            rpc: self.rpc,
            account,
        }
    }
}
