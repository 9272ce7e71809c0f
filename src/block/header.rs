//! Block Headers
//!
//! The header is the timestamp-less projection of a block used for
//! headers-only sync and cold storage. It owns deep copies of every byte
//! slice it holds; building one from a block never shares buffers with
//! it. Superblock segments are reduced to their covered-block checksums.
//!
//! ## Wire Format
//!
//! ```text
//! version (i32) | block_num (u64)
//! | tx_count (i32) | tx_count x txid (varint string)
//! | block checksum (len-prefixed, required)
//! | last block checksum | wallet state checksum | freeze checksum   (len-prefixed, 0 = absent)
//! | difficulty (u64)
//! ```
//!
//! From version 5 the header additionally carries:
//!
//! ```text
//! | last superblock num (u64) | last superblock checksum (len-prefixed)
//! | segment_count (i32) | segment_count x { block_num (u64) | checksum (len-prefixed) }
//! ```

use std::collections::BTreeMap;

use crate::block::block::Block;
use crate::block::constants::{
    CHECKSUM_DOMAIN, HASH_SWITCH_VERSION, MAX_BLOCK_VERSION, MAX_SERIALIZED_LEN,
    SUPERBLOCK_VERSION,
};
use crate::block::error::BlockError;
use crate::block::superblock::SuperBlockSegment;
use crate::codec::{ByteReader, ByteWriter, CodecError};
use crate::crypto::hash::{sha512_double, sha512_quad};

/// Block header entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockHeader {
    /// Protocol version; gates field presence and the checksum hash
    pub version: i32,
    /// Block height
    pub block_num: u64,
    /// Transaction ids in block order
    pub transactions: Vec<String>,
    /// Content checksum of the block; required on the wire
    pub block_checksum: Vec<u8>,
    /// Checksum of the previous block; absent only for genesis
    pub last_block_checksum: Option<Vec<u8>>,
    pub wallet_state_checksum: Option<Vec<u8>>,
    pub signature_freeze_checksum: Option<Vec<u8>>,
    pub difficulty: u64,
    /// Height of the previous superblock (version 5 and later)
    pub last_superblock_num: u64,
    pub last_superblock_checksum: Option<Vec<u8>>,
    /// Covered-block checksums keyed by height; keys are unique and the
    /// canonical order is ascending
    pub superblock_segments: BTreeMap<u64, SuperBlockSegment>,
}

impl BlockHeader {
    /// Build the header form of a block. Every byte slice is deeply
    /// copied and superblock segments keep only their checksums.
    pub fn from_block(block: &Block) -> Self {
        let mut segments = BTreeMap::new();
        for (num, segment) in &block.superblock_segments {
            segments.insert(
                *num,
                SuperBlockSegment {
                    block_num: *num,
                    block_checksum: segment.block_checksum.clone(),
                    ..Default::default()
                },
            );
        }

        Self {
            version: block.version,
            block_num: block.block_num,
            transactions: block.transactions.clone(),
            block_checksum: block.block_checksum.clone().unwrap_or_default(),
            last_block_checksum: block.last_block_checksum.clone(),
            wallet_state_checksum: block.wallet_state_checksum.clone(),
            signature_freeze_checksum: block.signature_freeze_checksum.clone(),
            difficulty: block.difficulty,
            last_superblock_num: block.last_superblock_num,
            last_superblock_checksum: block.last_superblock_checksum.clone(),
            superblock_segments: segments,
        }
    }

    /// Serialize the header.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        w.write_bytes(&self.block_checksum);
        w.write_opt_bytes(self.last_block_checksum.as_deref());
        w.write_opt_bytes(self.wallet_state_checksum.as_deref());
        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());
        w.write_u64(self.difficulty);

        if self.version >= SUPERBLOCK_VERSION {
            w.write_u64(self.last_superblock_num);
            w.write_opt_bytes(self.last_superblock_checksum.as_deref());
            w.write_i32(self.superblock_segments.len() as i32);
            for (num, segment) in &self.superblock_segments {
                w.write_u64(*num);
                w.write_opt_bytes(segment.block_checksum.as_deref());
            }
        }

        w.into_bytes()
    }

    /// Decode a header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        Self::decode(bytes).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode block header");
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

        let block_checksum = r.read_bytes()?;
        if block_checksum.is_empty() {
            return Err(CodecError::InvalidLength(0));
        }
        let last_block_checksum = r.read_opt_bytes()?;
        let wallet_state_checksum = r.read_opt_bytes()?;
        let signature_freeze_checksum = r.read_opt_bytes()?;
        let difficulty = r.read_u64()?;

        let mut last_superblock_num = 0;
        let mut last_superblock_checksum = None;
        let mut superblock_segments = BTreeMap::new();
        if version >= SUPERBLOCK_VERSION {
            last_superblock_num = r.read_u64()?;
            last_superblock_checksum = r.read_opt_bytes()?;
            let segment_count = r.read_count()?;
            for _ in 0..segment_count {
                let num = r.read_u64()?;
                let checksum = r.read_opt_bytes()?;
                superblock_segments.insert(
                    num,
                    SuperBlockSegment {
                        block_num: num,
                        block_checksum: checksum,
                        ..Default::default()
                    },
                );
            }
        }

        Ok(Self {
            version,
            block_num,
            transactions,
            block_checksum,
            last_block_checksum,
            wallet_state_checksum,
            signature_freeze_checksum,
            difficulty,
            last_superblock_num,
            last_superblock_checksum,
            superblock_segments,
        })
    }

    /// Content checksum of the header.
    ///
    /// The digest covers, in order: the checksum domain, version, block
    /// number, the concatenated UTF-8 transaction ids, each *present*
    /// optional checksum (previous block, wallet state, signature
    /// freeze), the difficulty, every superblock segment as
    /// `height || checksum` in ascending height order, and finally the
    /// previous superblock reference when one exists. Versions up to 2
    /// hash with the four-round variant, later versions with the
    /// two-round variant.
    pub fn calculate_checksum(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(CHECKSUM_DOMAIN);
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&self.block_num.to_le_bytes());

        for txid in &self.transactions {
            data.extend_from_slice(txid.as_bytes());
        }

        if let Some(checksum) = &self.last_block_checksum {
            data.extend_from_slice(checksum);
        }
        if let Some(checksum) = &self.wallet_state_checksum {
            data.extend_from_slice(checksum);
        }
        if let Some(checksum) = &self.signature_freeze_checksum {
            data.extend_from_slice(checksum);
        }
        data.extend_from_slice(&self.difficulty.to_le_bytes());

        for (num, segment) in &self.superblock_segments {
            data.extend_from_slice(&num.to_le_bytes());
            if let Some(checksum) = &segment.block_checksum {
                data.extend_from_slice(checksum);
            }
        }

        if let Some(checksum) = &self.last_superblock_checksum {
            data.extend_from_slice(&self.last_superblock_num.to_le_bytes());
            data.extend_from_slice(checksum);
        }

        if self.version < HASH_SWITCH_VERSION {
            sha512_quad(&data)
        } else {
            sha512_double(&data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(version: i32) -> BlockHeader {
        let mut header = BlockHeader {
            version,
            block_num: 1044,
            transactions: vec!["tx-a".to_string(), "tx-b".to_string()],
            block_checksum: vec![0xaa; 32],
            last_block_checksum: Some(vec![0xbb; 32]),
            wallet_state_checksum: Some(vec![0xcc; 32]),
            signature_freeze_checksum: Some(vec![0xdd; 32]),
            difficulty: 0xffff_0000_1234,
            last_superblock_num: 1000,
            last_superblock_checksum: Some(vec![0xee; 32]),
            superblock_segments: BTreeMap::new(),
        };
        header
            .superblock_segments
            .insert(1042, SuperBlockSegment::with_checksum(1042, vec![0x42; 32]));
        header
            .superblock_segments
            .insert(1043, SuperBlockSegment::with_checksum(1043, vec![0x43; 32]));
        header
    }

    #[test]
    fn test_round_trip_with_superblock_fields() {
        let header = sample_header(5);
        let decoded = BlockHeader::from_bytes(&header.get_bytes()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_version_4_omits_superblock_fields() {
        let header = sample_header(4);
        let decoded = BlockHeader::from_bytes(&header.get_bytes()).unwrap();

        assert_eq!(decoded.last_superblock_num, 0);
        assert_eq!(decoded.last_superblock_checksum, None);
        assert!(decoded.superblock_segments.is_empty());

        // The same content at version 5 writes all three.
        let upgraded = sample_header(5);
        let decoded = BlockHeader::from_bytes(&upgraded.get_bytes()).unwrap();
        assert_eq!(decoded.last_superblock_num, 1000);
        assert_eq!(decoded.last_superblock_checksum, Some(vec![0xee; 32]));
        assert_eq!(decoded.superblock_segments.len(), 2);
    }

    #[test]
    fn test_missing_block_checksum_rejected() {
        let mut header = sample_header(5);
        header.block_checksum = Vec::new();
        assert!(BlockHeader::from_bytes(&header.get_bytes()).is_err());
    }

    #[test]
    fn test_checksum_is_deterministic_across_insert_order() {
        let header = sample_header(5);

        let mut reordered = sample_header(5);
        reordered.superblock_segments.clear();
        reordered
            .superblock_segments
            .insert(1043, SuperBlockSegment::with_checksum(1043, vec![0x43; 32]));
        reordered
            .superblock_segments
            .insert(1042, SuperBlockSegment::with_checksum(1042, vec![0x42; 32]));

        assert_eq!(header.calculate_checksum(), reordered.calculate_checksum());
    }

    #[test]
    fn test_checksum_version_gate() {
        // Reconstruct the preimage by hand for a minimal header and
        // check which hash variant produced the digest on each side of
        // the version switch.
        for version in [2i32, 3] {
            let header = BlockHeader {
                version,
                block_num: 7,
                block_checksum: vec![0x01],
                difficulty: 99,
                ..Default::default()
            };

            let mut preimage = Vec::new();
            preimage.extend_from_slice(CHECKSUM_DOMAIN);
            preimage.extend_from_slice(&version.to_le_bytes());
            preimage.extend_from_slice(&7u64.to_le_bytes());
            preimage.extend_from_slice(&99u64.to_le_bytes());

            let expected = if version <= 2 {
                sha512_quad(&preimage)
            } else {
                sha512_double(&preimage)
            };
            assert_eq!(header.calculate_checksum(), expected);

            let wrong_variant = if version <= 2 {
                sha512_double(&preimage)
            } else {
                sha512_quad(&preimage)
            };
            assert_ne!(header.calculate_checksum(), wrong_variant);
        }
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let header = sample_header(5);
        let mut other = sample_header(5);
        other.transactions.push("tx-c".to_string());
        assert_ne!(header.calculate_checksum(), other.calculate_checksum());
    }

    #[test]
    fn test_absent_optionals_skipped_in_checksum() {
        let mut with = sample_header(5);
        with.wallet_state_checksum = None;
        let mut without = sample_header(5);
        without.wallet_state_checksum = None;
        assert_eq!(with.calculate_checksum(), without.calculate_checksum());
    }
}
