//! Truncated SHA-512 Variants
//!
//! Block, header and segment checksums are digests of SHA-512 chained
//! over itself and truncated to [`CHECKSUM_LEN`] bytes. Two variants
//! exist for wire compatibility with early protocol versions:
//!
//! - [`sha512_quad`]: four chained rounds, used by blocks of version 2
//!   and below.
//! - [`sha512_double`]: two chained rounds, used from version 3 onward.
//!
//! The checksum layer picks the variant from the block version; callers
//! never hardcode one except where the format mandates it (superblock
//! segment digests are always [`sha512_double`]).

use sha2::{Digest, Sha512};

/// Truncated digest length in bytes
pub const CHECKSUM_LEN: usize = 32;

fn sha512(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Two chained SHA-512 rounds, truncated to [`CHECKSUM_LEN`] bytes.
pub fn sha512_double(data: &[u8]) -> Vec<u8> {
    let mut digest = sha512(data);
    digest = sha512(&digest);
    digest.truncate(CHECKSUM_LEN);
    digest
}

/// Four chained SHA-512 rounds, truncated to [`CHECKSUM_LEN`] bytes.
pub fn sha512_quad(data: &[u8]) -> Vec<u8> {
    let mut digest = sha512(data);
    for _ in 0..3 {
        digest = sha512(&digest);
    }
    digest.truncate(CHECKSUM_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_length() {
        assert_eq!(sha512_double(b"aurum").len(), CHECKSUM_LEN);
        assert_eq!(sha512_quad(b"aurum").len(), CHECKSUM_LEN);
    }

    #[test]
    fn test_variants_disagree() {
        assert_ne!(sha512_double(b"aurum"), sha512_quad(b"aurum"));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sha512_double(b"block"), sha512_double(b"block"));
        assert_eq!(sha512_quad(b"block"), sha512_quad(b"block"));
    }

    #[test]
    fn test_input_sensitivity() {
        assert_ne!(sha512_double(b"block-1"), sha512_double(b"block-2"));
    }
}
