//! Wallet Registry
//!
//! Signature admission needs to map wallet addresses back to public
//! keys and to know the local node's signing identity. Both concerns
//! sit behind [`WalletResolver`] so the block layer never touches
//! process-wide state; nodes inject their registry, tests inject small
//! fixtures.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::crypto::{NodeKeys, PrivateKey, PublicKey};

/// A known wallet: an address plus, once the owner has transacted, its
/// registered public key
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    pub address: Vec<u8>,
    /// Absent until the first outgoing transaction registers the key
    pub public_key: Option<PublicKey>,
}

/// Address-to-wallet resolution plus the local signing identity
pub trait WalletResolver: Send + Sync {
    /// Look up a wallet by address.
    fn get_wallet(&self, address: &[u8]) -> Option<Wallet>;

    /// The local node's wallet address.
    fn primary_address(&self) -> Vec<u8>;

    /// The local node's public key.
    fn primary_public_key(&self) -> PublicKey;

    /// The local node's private key.
    fn primary_private_key(&self) -> PrivateKey;
}

/// In-memory wallet registry backed by the local node keys
#[derive(Debug)]
pub struct WalletRegistry {
    keys: NodeKeys,
    wallets: RwLock<HashMap<Vec<u8>, Wallet>>,
}

impl WalletRegistry {
    pub fn new(keys: NodeKeys) -> Self {
        Self {
            keys,
            wallets: RwLock::new(HashMap::new()),
        }
    }

    /// Record a wallet, replacing any previous record for the address.
    pub fn register(&self, address: Vec<u8>, public_key: Option<PublicKey>) {
        let mut wallets = self.wallets.write().unwrap();
        wallets.insert(
            address.clone(),
            Wallet {
                address,
                public_key,
            },
        );
    }

    /// Record the local node's own wallet with its public key, as
    /// happens once the node's key reaches the chain.
    pub fn register_primary(&self) {
        self.register(
            self.keys.address().to_vec(),
            Some(self.keys.public_key().to_vec()),
        );
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.read().unwrap().len()
    }
}

impl WalletResolver for WalletRegistry {
    fn get_wallet(&self, address: &[u8]) -> Option<Wallet> {
        self.wallets.read().unwrap().get(address).cloned()
    }

    fn primary_address(&self) -> Vec<u8> {
        self.keys.address().to_vec()
    }

    fn primary_public_key(&self) -> PublicKey {
        self.keys.public_key().to_vec()
    }

    fn primary_private_key(&self) -> PrivateKey {
        self.keys.export_private_key()
    }
}
