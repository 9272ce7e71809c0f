//! Cryptographic Primitives
//!
//! The rest of the crate consumes cryptography through this small
//! surface:
//!
//! - **Hashing**: two truncated SHA-512 variants used by the checksum
//!   layer, selected by block version ([`hash`]).
//! - **Signing**: ML-DSA keypairs for block signatures ([`keys`]).
//! - **Addresses**: deterministic wallet-address derivation from a
//!   public key ([`address`]).

pub mod address;
pub mod hash;
pub mod keys;

use thiserror::Error;

pub use address::{derive_address, signer_address, ADDRESS_LEN};
pub use hash::{sha512_double, sha512_quad, CHECKSUM_LEN};
pub use keys::{sign, verify, NodeKeys};

/// Raw public key bytes
pub type PublicKey = Vec<u8>;
/// Raw private key bytes
pub type PrivateKey = Vec<u8>;
/// Raw detached signature bytes
pub type Signature = Vec<u8>;

/// Errors raised by key handling and signing
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("signing failed: {0}")]
    SigningError(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
