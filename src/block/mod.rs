//! Block Data Model
//!
//! The core entities of the Aurum ledger and their canonical byte
//! representations:
//!
//! - [`Block`]: the full block body with its signature set.
//! - [`BlockHeader`]: the timestamp-less header form used for headers-only
//!   sync and storage.
//! - [`SuperBlockSegment`]: the per-height digest a superblock commits
//!   for each block since the previous superblock.
//! - [`SignatureSet`] / [`SignerSet`]: internally synchronized signer
//!   collections deduplicated by derived wallet address.
//!
//! Wire layout, checksum composition and the signature operations are
//! documented on the individual types.

pub mod block;
pub mod error;
pub mod header;
pub mod signature;
pub mod superblock;

pub use block::Block;
pub use error::BlockError;
pub use header::BlockHeader;
pub use signature::{BlockSignature, SignatureSet, SignerId, SignerSet};
pub use superblock::SuperBlockSegment;

/// Protocol constants for the block layer
pub mod constants {
    /// Domain-separation prefix mixed into every block, header and
    /// segment checksum to prevent cross-protocol collisions.
    pub const CHECKSUM_DOMAIN: &[u8] = b"aurum-chain-checksum-v1";

    /// Hard ceiling on the serialized size of a block or superblock
    /// segment (3 MB). Larger buffers are rejected before decoding.
    pub const MAX_SERIALIZED_LEN: usize = 3_145_728;

    /// Highest block version this node understands.
    pub const MAX_BLOCK_VERSION: i32 = 10;

    /// First version whose checksums use the two-round hash variant;
    /// earlier versions use the four-round variant.
    pub const HASH_SWITCH_VERSION: i32 = 3;

    /// First version whose signature checksum folds signer identifiers
    /// instead of signature bytes.
    pub const SIGNER_CHECKSUM_VERSION: i32 = 4;

    /// First version carrying superblock fields in the header form.
    pub const SUPERBLOCK_VERSION: i32 = 5;

    /// Longest stored signer identifier treated as an address when a
    /// signature entry is matched against a concrete identity.
    pub const ADDRESS_FORM_MAX_LEN: usize = 70;
}
