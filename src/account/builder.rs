use super::types::{
    AccountParams, AccountSigner, BuildError, CapabilitySlot, Decorators, Executor, Factory,
};
use super::{AccountCore, SmartContractAccount};
use std::sync::Arc;

/// Accumulates capability providers and assembles an account.
///
/// A builder starts empty, records exactly one signer, one executor and
/// one factory through the `with_*` calls, and is consumed once by
/// [`build`](Self::build), the single transition from an incomplete
/// accumulator to a sealed account.
#[derive(Default)]
pub struct SmartAccountBuilder {
    signer: Option<AccountSigner>,
    executor: Option<Executor>,
    factory: Option<Factory>,
    decorators: Option<Decorators>,
    duplicates: Vec<CapabilitySlot>,
}

impl SmartAccountBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signer(mut self, signer: AccountSigner) -> Self {
        if self.signer.is_some() {
            self.duplicates.push(CapabilitySlot::Signer);
        } else {
            self.signer = Some(signer);
        }
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        if self.executor.is_some() {
            self.duplicates.push(CapabilitySlot::Executor);
        } else {
            self.executor = Some(executor);
        }
        self
    }

    pub fn with_factory(mut self, factory: Factory) -> Self {
        if self.factory.is_some() {
            self.duplicates.push(CapabilitySlot::Factory);
        } else {
            self.factory = Some(factory);
        }
        self
    }

    /// Replace the decorator slot. Unlike the required slots this one may
    /// be overwritten freely; when absent the account carries no
    /// auxiliary capabilities.
    pub fn with_decorators(mut self, decorators: Decorators) -> Self {
        self.decorators = Some(decorators);
        self
    }

    /// Validate completeness and assemble the account. Fails before any
    /// capability closure runs if a required slot is missing or was
    /// supplied twice, or if `params` are malformed. No I/O happens here.
    pub fn build(self, params: AccountParams) -> Result<SmartContractAccount, BuildError> {
        let (signer, executor, factory) = match (self.signer, self.executor, self.factory) {
            (Some(signer), Some(executor), Some(factory)) => (signer, executor, factory),
            (signer, executor, factory) => {
                let mut missing = Vec::new();
                if signer.is_none() {
                    missing.push(CapabilitySlot::Signer);
                }
                if executor.is_none() {
                    missing.push(CapabilitySlot::Executor);
                }
                if factory.is_none() {
                    missing.push(CapabilitySlot::Factory);
                }
                return Err(BuildError::IncompleteBuilder(missing));
            }
        };

        if let Some(slot) = self.duplicates.first() {
            return Err(BuildError::DuplicateCapability(*slot));
        }

        params.validate()?;

        // two-phase construction: allocate the identity first, bind each
        // capability against it, then seal the facade. The unsealed core
        // never leaves this function.
        let core = Arc::new(AccountCore::new(&params));
        let mut account = SmartContractAccount::assemble(
            core.clone(),
            signer(&core),
            executor(&core),
            factory(&core),
        );

        if let Some(decorators) = self.decorators {
            let extra = decorators(&account);
            account.merge_extensions(extra);
        }

        Ok(account)
    }
}
