//! Node Signing Keys
//!
//! Block signatures use ML-DSA-44 detached signatures. The signed
//! message is always a block checksum; key material travels through the
//! crate as raw byte vectors so the wallet registry and the wire codec
//! stay agnostic of the scheme.
//!
//! [`NodeKeys`] holds the local node identity. Private key material is
//! zeroized when the value is dropped.

use pqcrypto_mldsa::mldsa44;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use zeroize::Zeroize;

use crate::crypto::address::derive_address;
use crate::crypto::{CryptoError, CryptoResult, PrivateKey, PublicKey, Signature};

/// Local node keypair and derived wallet address
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct NodeKeys {
    public_key: PublicKey,
    private_key: PrivateKey,
    address: Vec<u8>,
}

impl NodeKeys {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let (pk, sk) = mldsa44::keypair();
        let public_key = pk.as_bytes().to_vec();
        let address = derive_address(&public_key);
        Self {
            public_key,
            private_key: sk.as_bytes().to_vec(),
            address,
        }
    }

    /// Import an existing keypair.
    pub fn from_keypair(public_key: PublicKey, private_key: PrivateKey) -> CryptoResult<Self> {
        mldsa44::PublicKey::from_bytes(&public_key)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        mldsa44::SecretKey::from_bytes(&private_key)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        let address = derive_address(&public_key);
        Ok(Self {
            public_key,
            private_key,
            address,
        })
    }

    /// Sign a message with the node's private key.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        sign(message, &self.private_key)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn address(&self) -> &[u8] {
        &self.address
    }

    /// Export the private key (use with caution!)
    pub fn export_private_key(&self) -> PrivateKey {
        self.private_key.clone()
    }
}

impl std::fmt::Debug for NodeKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeys")
            .field("address", &hex::encode(&self.address))
            .finish_non_exhaustive()
    }
}

/// Produce a detached signature over `message`.
pub fn sign(message: &[u8], private_key: &[u8]) -> CryptoResult<Signature> {
    let sk = mldsa44::SecretKey::from_bytes(private_key)
        .map_err(|e| CryptoError::SigningError(e.to_string()))?;
    Ok(mldsa44::detached_sign(message, &sk).as_bytes().to_vec())
}

/// Check a detached signature over `message`. Malformed keys or
/// signatures simply fail verification.
pub fn verify(message: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
    let Ok(pk) = mldsa44::PublicKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = mldsa44::DetachedSignature::from_bytes(signature) else {
        return false;
    };
    mldsa44::verify_detached_signature(&sig, message, &pk).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address::{MAX_ADDRESS_LEN, MAX_PUBLIC_KEY_LEN};

    #[test]
    fn test_sign_verify_round_trip() {
        let keys = NodeKeys::generate();
        let message = b"block checksum bytes";

        let signature = keys.sign(message).unwrap();
        assert!(verify(message, keys.public_key(), &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let keys = NodeKeys::generate();
        let signature = keys.sign(b"one checksum").unwrap();
        assert!(!verify(b"another checksum", keys.public_key(), &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let keys = NodeKeys::generate();
        let other = NodeKeys::generate();
        let signature = keys.sign(b"checksum").unwrap();
        assert!(!verify(b"checksum", other.public_key(), &signature));
    }

    #[test]
    fn test_verify_tolerates_garbage_input() {
        assert!(!verify(b"checksum", &[1, 2, 3], &[4, 5, 6]));
    }

    #[test]
    fn test_public_key_sits_in_signer_band() {
        // The wire format classifies identifiers longer than an address
        // as public keys, so the scheme's keys must land in that band.
        let keys = NodeKeys::generate();
        assert!(keys.public_key().len() > MAX_ADDRESS_LEN);
        assert!(keys.public_key().len() < MAX_PUBLIC_KEY_LEN);
    }

    #[test]
    fn test_keypair_import() {
        let keys = NodeKeys::generate();
        let imported = NodeKeys::from_keypair(
            keys.public_key().to_vec(),
            keys.export_private_key(),
        )
        .unwrap();

        assert_eq!(imported.address(), keys.address());
        let signature = imported.sign(b"checksum").unwrap();
        assert!(verify(b"checksum", keys.public_key(), &signature));
    }
}
