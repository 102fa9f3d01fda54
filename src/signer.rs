use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes};
use alloy_signer::{wallet::LocalWallet, Signer};
use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;

/// The externally-owned signer controlling a smart account.
///
/// Implementations may hold a key in process or proxy to a remote signing
/// service; the account machinery only needs an address and the two
/// signature schemes accounts validate against.
#[async_trait]
pub trait SmartAccountSigner: Send + Sync {
    fn address(&self) -> Address;

    /// EIP-191 personal-sign over `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    /// EIP-712 signature over `payload`.
    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Bytes>;
}

/// In-process signer backed by a plain secp256k1 private key.
pub struct LocalAccountSigner {
    wallet: LocalWallet,
}

impl LocalAccountSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }

    /// Parse a hex private key, with or without the `0x` prefix.
    pub fn from_private_key(key: &str) -> Result<Self> {
        Ok(Self {
            wallet: LocalWallet::from_str(key)?,
        })
    }
}

#[async_trait]
impl SmartAccountSigner for LocalAccountSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let signature = self.wallet.sign_message(message).await?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Bytes> {
        let signature = self.wallet.sign_dynamic_typed_data(payload).await?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    // well-known anvil dev key, never holds real funds
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_address_from_private_key() {
        let signer = LocalAccountSigner::from_private_key(DEV_KEY).unwrap();
        assert_eq!(
            signer.address(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
    }

    #[tokio::test]
    async fn produces_65_byte_signatures() {
        let signer = LocalAccountSigner::from_private_key(DEV_KEY).unwrap();
        let signature = signer.sign_message(b"hello").await.unwrap();
        assert_eq!(signature.len(), 65);
    }
}
