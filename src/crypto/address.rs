//! Wallet Address Derivation
//!
//! A signer identifier is an opaque byte string that is either a wallet
//! address or a raw public key, distinguished purely by length:
//!
//! - 36 to 128 bytes: already an address; the derived address is the
//!   identifier itself.
//! - 129 to 2499 bytes: a public key; the canonical address is derived
//!   from it deterministically.
//! - anything else: invalid; callers skip or reject the identifier.
//!
//! Two identifiers denote the same signer exactly when their derived
//! addresses are byte-equal.
//!
//! ## Address Layout
//!
//! ```text
//! address = version (1 byte) || sha512_double(public_key) (32 bytes) || check (3 bytes)
//! check   = sha512_quad(version || digest)[..3]
//! ```

use crate::crypto::hash::{sha512_double, sha512_quad};

/// Current address layout version
pub const ADDRESS_VERSION: u8 = 0x01;

/// Length of a derived address in bytes
pub const ADDRESS_LEN: usize = 36;

/// Shortest identifier accepted as an address
pub const MIN_ADDRESS_LEN: usize = 36;

/// Longest identifier accepted as an address
pub const MAX_ADDRESS_LEN: usize = 128;

/// Longest identifier accepted as a public key (exclusive)
pub const MAX_PUBLIC_KEY_LEN: usize = 2500;

/// Derive the canonical wallet address for a public key.
pub fn derive_address(public_key: &[u8]) -> Vec<u8> {
    let digest = sha512_double(public_key);
    let mut address = Vec::with_capacity(ADDRESS_LEN);
    address.push(ADDRESS_VERSION);
    address.extend_from_slice(&digest);
    let check = sha512_quad(&address);
    address.extend_from_slice(&check[..3]);
    address
}

/// Resolve the address form of a signer identifier, or `None` when the
/// identifier length is neither an address nor a public key.
pub fn signer_address(identifier: &[u8]) -> Option<Vec<u8>> {
    match identifier.len() {
        MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN => Some(identifier.to_vec()),
        len if len > MAX_ADDRESS_LEN && len < MAX_PUBLIC_KEY_LEN => {
            Some(derive_address(identifier))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_address_shape() {
        let pubkey = vec![0x42u8; 1312];
        let address = derive_address(&pubkey);

        assert_eq!(address.len(), ADDRESS_LEN);
        assert_eq!(address[0], ADDRESS_VERSION);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let pubkey = vec![0x42u8; 1312];
        assert_eq!(derive_address(&pubkey), derive_address(&pubkey));

        let other = vec![0x43u8; 1312];
        assert_ne!(derive_address(&pubkey), derive_address(&other));
    }

    #[test]
    fn test_signer_address_passes_addresses_through() {
        let address = vec![0x01u8; 36];
        assert_eq!(signer_address(&address), Some(address.clone()));

        let long_address = vec![0x01u8; 128];
        assert_eq!(signer_address(&long_address), Some(long_address.clone()));
    }

    #[test]
    fn test_signer_address_derives_from_public_keys() {
        let pubkey = vec![0x42u8; 1312];
        assert_eq!(signer_address(&pubkey), Some(derive_address(&pubkey)));
    }

    #[test]
    fn test_signer_address_rejects_invalid_lengths() {
        assert_eq!(signer_address(&[0u8; 35]), None);
        assert_eq!(signer_address(&[0u8; 0]), None);
        assert_eq!(signer_address(&vec![0u8; 2500]), None);
    }
}
