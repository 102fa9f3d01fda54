use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub mod builder;
pub mod light;
pub mod msca;
pub mod types;

use crate::signer::SmartAccountSigner;
use crate::types::UserOperationCallData;
use types::{AccountHandle, AccountParams, DeploymentFactory, ExecuteEncoder, OperationSigner};

/// Operation names every account exposes. Extensions and decorators may
/// never install a capability under one of these names.
pub const RESERVED_OPERATIONS: &[&str] = &[
    "encode_execute",
    "encode_batch_execute",
    "sign_message",
    "sign_typed_data",
    "sign_user_operation_hash",
    "get_dummy_signature",
    "get_owner",
    "get_account_init_code",
];

lazy_static! {
    /// Signature that parses as a plausible (r, s, v) tuple but can never
    /// pass owner validation. Handed to bundlers for gas estimation only.
    pub(crate) static ref DUMMY_SIGNATURE: Bytes = {
        let mut sig = [0u8; 65];
        sig[..16].fill(0xff); // r: high half saturated, worst-case cost
        sig[32] = 0x7a;       // s: small low-half scalar
        sig[64] = 0x1c;       // v
        Bytes::from(sig.to_vec())
    };
}

/// Identity of one smart account: chain, address, controlling owner.
///
/// Allocated before any capability is bound so that capability
/// implementations can hold a reference to the account they serve. The
/// owner slot is the only mutable attribute of an assembled account.
pub struct AccountCore {
    chain_id: u64,
    address: Address,
    owner: RwLock<Option<Arc<dyn SmartAccountSigner>>>,
}

impl AccountCore {
    pub(crate) fn new(params: &AccountParams) -> Self {
        Self {
            chain_id: params.chain_id,
            address: params.account_address,
            owner: RwLock::new(params.owner.clone()),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Deployed or counterfactual address of the account.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Option<Arc<dyn SmartAccountSigner>> {
        self.owner.read().expect("owner lock poisoned").clone()
    }

    pub(crate) fn set_owner(&self, new_owner: Arc<dyn SmartAccountSigner>) {
        *self.owner.write().expect("owner lock poisoned") = Some(new_owner);
    }
}

/// Named auxiliary capabilities attached to an account.
#[derive(Clone, Default)]
pub struct Extensions {
    entries: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.entries
            .get(name)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` in, dropping any entry whose name collides with a
    /// reserved operation. Later entries win over earlier ones.
    pub(crate) fn merge_unreserved(&mut self, other: Extensions) {
        for (name, value) in other.entries {
            if RESERVED_OPERATIONS.contains(&name.as_str()) {
                log::debug!("extension {name:?} shadows a reserved operation, dropped");
                continue;
            }
            self.entries.insert(name, value);
        }
    }
}

/// An assembled smart account: an immutable identity plus the capability
/// set captured at build time. Every operation delegates to exactly one
/// bound capability; delegate failures propagate unchanged.
#[derive(Clone)]
pub struct SmartContractAccount {
    core: AccountHandle,
    signer: Arc<dyn OperationSigner>,
    executor: Arc<dyn ExecuteEncoder>,
    factory: Arc<dyn DeploymentFactory>,
    extensions: Extensions,
}

impl SmartContractAccount {
    pub(crate) fn assemble(
        core: AccountHandle,
        signer: Arc<dyn OperationSigner>,
        executor: Arc<dyn ExecuteEncoder>,
        factory: Arc<dyn DeploymentFactory>,
    ) -> Self {
        Self {
            core,
            signer,
            executor,
            factory,
            extensions: Extensions::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.core.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.core.chain_id()
    }

    pub fn owner(&self) -> Option<Arc<dyn SmartAccountSigner>> {
        self.core.owner()
    }

    pub(crate) fn set_owner(&self, new_owner: Arc<dyn SmartAccountSigner>) {
        self.core.set_owner(new_owner);
    }

    pub fn encode_execute(&self, target: Address, value: U256, data: Bytes) -> Bytes {
        self.executor.encode_execute(target, value, data)
    }

    pub fn encode_batch_execute(&self, calls: &[UserOperationCallData]) -> Bytes {
        self.executor.encode_batch_execute(calls)
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        self.signer.sign_message(message).await
    }

    pub async fn sign_typed_data(&self, payload: &TypedData) -> Result<Bytes> {
        self.signer.sign_typed_data(payload).await
    }

    pub async fn sign_user_operation_hash(&self, uo_hash: B256) -> Result<Bytes> {
        self.signer.sign_user_operation_hash(uo_hash).await
    }

    pub fn get_dummy_signature(&self) -> Bytes {
        self.signer.dummy_signature()
    }

    /// Owner as seen by the signer capability.
    pub fn get_owner(&self) -> Option<Arc<dyn SmartAccountSigner>> {
        self.signer.owner()
    }

    /// Factory address concatenated with the deployment call data. Only
    /// meaningful before the account's first deployment; recomputing for
    /// the same owner and salt yields byte-identical output.
    pub fn get_account_init_code(&self) -> Result<Bytes> {
        let mut init_code = self.factory.factory_address().to_vec();
        init_code.extend_from_slice(&self.factory.deployment_call_data()?);
        Ok(Bytes::from(init_code))
    }

    pub fn extension<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.extensions.get(name)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub(crate) fn merge_extensions(&mut self, extra: Extensions) {
        self.extensions.merge_unreserved(extra);
    }

    /// Attach additional capabilities computed from the account itself.
    /// Entries named after a reserved operation are dropped; extensions
    /// can never shadow the base operation set.
    pub fn extend<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Self) -> Extensions,
    {
        let extra = f(&self);
        self.extensions.merge_unreserved(extra);
        self
    }
}

/// Signer capability that defers every signature to the account's current
/// owner. The user operation hash is signed as an EIP-191 message, which
/// is the scheme both the light and the modular account validate.
pub(crate) struct OwnerOperationSigner {
    pub(crate) account: AccountHandle,
}

impl OwnerOperationSigner {
    fn require_owner(&self) -> Result<Arc<dyn SmartAccountSigner>> {
        self.account
            .owner()
            .ok_or_else(|| anyhow!("account {} has no owner bound", self.account.address()))
    }
}

#[async_trait]
impl OperationSigner for OwnerOperationSigner {
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        self.require_owner()?.sign_message(message).await
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Bytes> {
        self.require_owner()?.sign_typed_data(payload).await
    }

    async fn sign_user_operation_hash(&self, uo_hash: B256) -> Result<Bytes> {
        self.require_owner()?.sign_message(uo_hash.as_slice()).await
    }

    fn dummy_signature(&self) -> Bytes {
        DUMMY_SIGNATURE.clone()
    }

    fn owner(&self) -> Option<Arc<dyn SmartAccountSigner>> {
        self.account.owner()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dummy_signature_is_well_formed() {
        assert_eq!(DUMMY_SIGNATURE.len(), 65);
        assert_eq!(DUMMY_SIGNATURE[64], 0x1c);
    }

    #[test]
    fn extensions_roundtrip_typed_values() {
        let mut extensions = Extensions::new();
        extensions.insert("memo", "hello".to_string());
        extensions.insert("limit", 7u64);

        assert_eq!(*extensions.get::<String>("memo").unwrap(), "hello");
        assert_eq!(*extensions.get::<u64>("limit").unwrap(), 7);
        // wrong type downcasts to nothing
        assert!(extensions.get::<u32>("limit").is_none());
        assert!(!extensions.contains("missing"));
    }

    #[test]
    fn merge_drops_reserved_names() {
        let mut base = Extensions::new();
        base.insert("memo", 1u8);

        let mut extra = Extensions::new();
        extra.insert("sign_message", 2u8);
        extra.insert("get_account_init_code", 3u8);
        extra.insert("gas_policy", 4u8);

        base.merge_unreserved(extra);
        assert!(base.contains("memo"));
        assert!(base.contains("gas_policy"));
        assert!(!base.contains("sign_message"));
        assert!(!base.contains("get_account_init_code"));
    }
}
