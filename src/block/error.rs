//! Block-layer errors

use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;

/// Errors raised by block construction, decoding and checksum
/// calculation
#[derive(Debug, Error)]
pub enum BlockError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The block checksum must be calculated before signatures can be
    /// produced or checked.
    #[error("block checksum has not been calculated")]
    MissingBlockChecksum,

    /// Superblock segments folded into a block checksum must carry a
    /// signature freeze checksum.
    #[error("superblock segment {0} has no signature freeze checksum")]
    MissingSegmentFreezeChecksum(u64),
}
