//! Composable ERC-4337 smart accounts.
//!
//! Accounts are assembled from pluggable signer, executor and factory
//! capabilities through [`SmartAccountBuilder`], bound to a transport
//! through [`SmartAccountClient`], and migrated between implementations
//! through the coordinators in [`upgrade`] and [`ownership`].

pub mod account;
pub mod ownership;
pub mod provider;
pub mod signer;
pub mod types;
pub mod upgrade;

pub use account::builder::SmartAccountBuilder;
pub use account::types::{
    AccountHandle, AccountParams, AccountSigner, BuildError, CapabilitySlot, DeploymentFactory,
    Decorators, ExecuteEncoder, Executor, Factory, OperationSigner,
};
pub use account::{light, msca, AccountCore, Extensions, SmartContractAccount};
pub use ownership::{get_owner_address, transfer_ownership, OwnerError, TransferError};
pub use provider::{Erc4337Rpc, SmartAccountClient};
pub use signer::{LocalAccountSigner, SmartAccountSigner};
pub use types::*;
pub use upgrade::{upgrade_light_account, PostSubmissionError, UpgradeError, UpgradeResult};
