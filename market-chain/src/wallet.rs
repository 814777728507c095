//! Admin wallet - loads the key that pays for oracle triggers

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use tracing::info;

/// Wallet errors
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid private key format: {0}")]
    InvalidKey(String),

    #[error("Failed to create signer: {0}")]
    Signer(String),
}

/// Wallet used for admin-only transactions
#[derive(Clone)]
pub struct AdminWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl AdminWallet {
    /// Create a wallet from a private key hex string (with or without 0x)
    pub fn from_private_key(private_key: &str) -> Result<Self, WalletError> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let key_bytes = B256::from_str(key).map_err(|e| WalletError::InvalidKey(e.to_string()))?;

        let signer = PrivateKeySigner::from_bytes(&key_bytes)
            .map_err(|e| WalletError::Signer(e.to_string()))?;

        let address = signer.address();

        info!("Loaded admin wallet: {}", address);

        Ok(Self { signer, address })
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the wallet address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Get the underlying signer for transaction signing
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for AdminWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminWallet")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first development key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = AdminWallet::from_private_key(TEST_KEY).unwrap();

        assert_eq!(
            wallet.address_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_accepts_unprefixed_key() {
        let wallet = AdminWallet::from_private_key(&TEST_KEY[2..]).unwrap();
        assert_eq!(wallet.address(), AdminWallet::from_private_key(TEST_KEY).unwrap().address());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            AdminWallet::from_private_key("0x1234"),
            Err(WalletError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = AdminWallet::from_private_key(TEST_KEY).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(!debug.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
    }
}
