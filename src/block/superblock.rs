//! Superblock Segments
//!
//! A superblock commits one segment per block covered since the previous
//! superblock. The full segment form carries the covered block's
//! transaction ids, its signature-freeze checksum and the signer sets
//! frozen with it; inside a block *header* a segment is reduced to the
//! covered block's checksum.
//!
//! ## Wire Format
//!
//! ```text
//! version (i32) | block_num (u64)
//! | tx_count (i32) | tx_count x txid (varint string)
//! | signer_count (i32) | signer_count x { len (i32) | signer bytes }
//! | len (i32) | freeze checksum
//! | legacy_count (i32) | legacy_count x { len | signature | len | signer bytes }
//! ```
//!
//! Segment bodies travel out-of-band; a block body never embeds them.

use crate::block::constants::{MAX_BLOCK_VERSION, MAX_SERIALIZED_LEN};
use crate::block::error::BlockError;
use crate::block::signature::{BlockSignature, SignatureSet, SignerId, SignerSet};
use crate::codec::{ByteReader, ByteWriter, CodecError};
use crate::crypto::address::signer_address;

/// Digest of one covered block inside a superblock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuperBlockSegment {
    pub version: i32,
    pub block_num: u64,
    /// Transaction ids of the covered block, in block order
    pub transactions: Vec<String>,
    /// Checksum of the covered block's frozen signature list
    pub signature_freeze_checksum: Option<Vec<u8>>,
    /// Checksum of the covered block; the only field present in the
    /// header form
    pub block_checksum: Option<Vec<u8>>,
    /// Signers whose signatures were frozen for the covered block
    pub signature_freeze_signers: SignerSet,
    /// Frozen (signature, signer) pairs from peers predating bare
    /// signer-id freezes
    pub legacy_signature_freeze_signers: SignatureSet,
}

impl SuperBlockSegment {
    pub fn new(version: i32, block_num: u64) -> Self {
        Self {
            version,
            block_num,
            ..Default::default()
        }
    }

    /// The reduced form held by a block header: block number plus the
    /// covered block's checksum, nothing else.
    pub fn with_checksum(block_num: u64, block_checksum: Vec<u8>) -> Self {
        Self {
            block_num,
            block_checksum: Some(block_checksum),
            ..Default::default()
        }
    }

    /// Whether the signer behind the given raw identifier (address or
    /// public key) is present in either frozen signer set. Identifiers
    /// with an invalid length match nothing.
    pub fn contains_signature(&self, identifier: &[u8]) -> bool {
        let Some(address) = signer_address(identifier) else {
            return false;
        };
        if self.signature_freeze_signers.contains_address(&address) {
            return true;
        }
        self.legacy_signature_freeze_signers.contains_address(&address)
    }

    /// Serialize the full segment body.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        let signers = self.signature_freeze_signers.snapshot();
        w.write_i32(signers.len() as i32);
        for signer in &signers {
            w.write_bytes(signer.raw());
        }

        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());

        let legacy = self.legacy_signature_freeze_signers.snapshot();
        w.write_i32(legacy.len() as i32);
        for entry in &legacy {
            w.write_bytes(&entry.signature);
            w.write_bytes(entry.signer.raw());
        }

        w.into_bytes()
    }

    /// Decode a segment body. Oversize buffers are rejected before any
    /// field is read; a failed parse discards the partial segment.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        Self::decode(bytes).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode superblock segment");
            BlockError::from(e)
        })
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() > MAX_SERIALIZED_LEN {
            return Err(CodecError::Oversize {
                size: bytes.len(),
                max: MAX_SERIALIZED_LEN,
            });
        }

        let mut r = ByteReader::new(bytes);
        let version = r.read_i32()?;
        if version > MAX_BLOCK_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let block_num = r.read_u64()?;

        let tx_count = r.read_count()?;
        let mut transactions = Vec::with_capacity(tx_count.min(1024));
        for _ in 0..tx_count {
            transactions.push(r.read_string()?);
        }

        let signer_count = r.read_count()?;
        let mut signers = Vec::with_capacity(signer_count.min(1024));
        for _ in 0..signer_count {
            signers.push(SignerId::from_bytes(r.read_bytes()?)?);
        }

        let signature_freeze_checksum = r.read_opt_bytes()?;

        let legacy_count = r.read_count()?;
        let mut legacy = Vec::with_capacity(legacy_count.min(1024));
        for _ in 0..legacy_count {
            let signature = r.read_bytes()?;
            let signer = SignerId::from_bytes(r.read_bytes()?)?;
            legacy.push(BlockSignature::new(signature, signer));
        }

        Ok(Self {
            version,
            block_num,
            transactions,
            signature_freeze_checksum,
            block_checksum: None,
            signature_freeze_signers: SignerSet::from_entries(signers),
            legacy_signature_freeze_signers: SignatureSet::from_entries(legacy),
        })
    }
}
