//! Blocks
//!
//! The full block entity: transaction ids, the signature set, checksums
//! linking it to the previous block and to frozen state, and for
//! superblocks the full segment map. Blocks are created empty, populated
//! with transactions, sealed with a content checksum, signed by the local
//! node and then extended monotonically with peer signatures.
//!
//! ## Wire Format
//!
//! ```text
//! version (i32) | block_num (u64)
//! | tx_count (i32) | tx_count x txid (varint string)
//! | sig_count (i32) | sig_count x { len | signature | len | signer id }
//! | block checksum | last block checksum | wallet state checksum | freeze checksum   (len-prefixed, 0 = absent)
//! | difficulty (u64) | timestamp (i64)
//! | last superblock num (u64) | last superblock checksum (len-prefixed)
//! ```
//!
//! Superblock segment bodies are never part of the block body; they
//! travel out-of-band and appear in the header form as checksums only.
//! The locally computed PoW field and the local-storage flag are
//! runtime-only and never serialized.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::block::constants::{
    ADDRESS_FORM_MAX_LEN, CHECKSUM_DOMAIN, HASH_SWITCH_VERSION, MAX_BLOCK_VERSION,
    MAX_SERIALIZED_LEN, SIGNER_CHECKSUM_VERSION,
};
use crate::block::error::BlockError;
use crate::block::signature::{BlockSignature, SignatureSet, SignerId};
use crate::block::superblock::SuperBlockSegment;
use crate::codec::{ByteReader, ByteWriter, CodecError};
use crate::crypto::address::derive_address;
use crate::crypto::hash::{sha512_double, sha512_quad};
use crate::crypto::{self, PublicKey};
use crate::wallet::WalletResolver;

/// A block of the Aurum ledger
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Protocol version; gates field presence and the checksum hash
    pub version: i32,
    /// Block height
    pub block_num: u64,
    /// Transaction ids in block order
    pub transactions: Vec<String>,
    /// Admitted signatures over the block checksum
    pub signatures: SignatureSet,
    /// Content checksum; absent while the block is under construction
    pub block_checksum: Option<Vec<u8>>,
    /// Checksum of the previous block; absent only for genesis
    pub last_block_checksum: Option<Vec<u8>>,
    pub wallet_state_checksum: Option<Vec<u8>>,
    pub signature_freeze_checksum: Option<Vec<u8>>,
    pub difficulty: u64,
    /// Creation time, Unix seconds
    pub timestamp: i64,
    /// Height of the previous superblock
    pub last_superblock_num: u64,
    pub last_superblock_checksum: Option<Vec<u8>>,
    /// Full-content segments; populated only on superblocks
    pub superblock_segments: BTreeMap<u64, SuperBlockSegment>,
    /// Locally computed PoW solution; never serialized
    pub pow_field: Option<Vec<u8>>,
    /// Whether this block was read back from local storage
    pub from_local_storage: bool,
}

impl Block {
    /// Create an empty block at the given version, stamped with the
    /// current time.
    pub fn new(version: i32) -> Self {
        Self {
            version,
            timestamp: Utc::now().timestamp(),
            ..Default::default()
        }
    }

    /// A block is genesis exactly when it sits at height zero with no
    /// previous-block checksum.
    pub fn is_genesis(&self) -> bool {
        self.block_num == 0 && self.last_block_checksum.is_none()
    }

    /// Append a transaction id unless it is already present. Duplicates
    /// are logged and ignored.
    pub fn add_transaction(&mut self, txid: &str) -> bool {
        if self.transactions.iter().any(|existing| existing == txid) {
            tracing::warn!(block = self.block_num, txid, "transaction already in block");
            return false;
        }
        self.transactions.push(txid.to_string());
        true
    }

    /// Serialize the block body.
    pub fn get_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i32(self.version);
        w.write_u64(self.block_num);

        w.write_i32(self.transactions.len() as i32);
        for txid in &self.transactions {
            w.write_string(txid);
        }

        let signatures = self.signatures.snapshot();
        w.write_i32(signatures.len() as i32);
        for entry in &signatures {
            w.write_bytes(&entry.signature);
            w.write_bytes(entry.signer.raw());
        }

        w.write_opt_bytes(self.block_checksum.as_deref());
        w.write_opt_bytes(self.last_block_checksum.as_deref());
        w.write_opt_bytes(self.wallet_state_checksum.as_deref());
        w.write_opt_bytes(self.signature_freeze_checksum.as_deref());
        w.write_u64(self.difficulty);
        w.write_i64(self.timestamp);
        w.write_u64(self.last_superblock_num);
        w.write_opt_bytes(self.last_superblock_checksum.as_deref());

        w.into_bytes()
    }

    /// Decode a block body. Oversize buffers are rejected before any
    /// field is read; a failed parse discards the partial block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlockError> {
        Self::decode(bytes).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode block");
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

        let sig_count = r.read_count()?;
        let mut signatures = Vec::with_capacity(sig_count.min(1024));
        for _ in 0..sig_count {
            let signature = r.read_bytes()?;
            let signer = SignerId::from_bytes(r.read_bytes()?)?;
            signatures.push(BlockSignature::new(signature, signer));
        }

        let block_checksum = r.read_opt_bytes()?;
        let last_block_checksum = r.read_opt_bytes()?;
        let wallet_state_checksum = r.read_opt_bytes()?;
        let signature_freeze_checksum = r.read_opt_bytes()?;
        let difficulty = r.read_u64()?;
        let timestamp = r.read_i64()?;
        let last_superblock_num = r.read_u64()?;
        let last_superblock_checksum = r.read_opt_bytes()?;

        Ok(Self {
            version,
            block_num,
            transactions,
            signatures: SignatureSet::from_entries(signatures),
            block_checksum,
            last_block_checksum,
            wallet_state_checksum,
            signature_freeze_checksum,
            difficulty,
            timestamp,
            last_superblock_num,
            last_superblock_checksum,
            superblock_segments: BTreeMap::new(),
            pow_field: None,
            from_local_storage: false,
        })
    }

    /// Content checksum of the block.
    ///
    /// Same composition as the header checksum, except each superblock
    /// segment contributes its full content: height, segment version,
    /// its signature-freeze checksum (which must be present), a digest
    /// of its concatenated transaction ids and a digest of its frozen
    /// signer lists. Segment digests always use the two-round hash; the
    /// outer digest follows the block version gate. Signer lists are
    /// sorted by raw identifier before hashing so the result does not
    /// depend on insertion order.
    pub fn calculate_checksum(&self) -> Result<Vec<u8>, BlockError> {
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
            data.extend_from_slice(&segment.version.to_le_bytes());

            let freeze_checksum = segment
                .signature_freeze_checksum
                .as_ref()
                .ok_or(BlockError::MissingSegmentFreezeChecksum(*num))?;
            data.extend_from_slice(freeze_checksum);

            let mut tx_data = Vec::new();
            for txid in &segment.transactions {
                tx_data.extend_from_slice(txid.as_bytes());
            }
            data.extend_from_slice(&sha512_double(&tx_data));

            let mut signer_data = Vec::new();
            let mut signers = segment.signature_freeze_signers.snapshot();
            signers.sort_by(|a, b| a.raw().cmp(b.raw()));
            for signer in &signers {
                signer_data.extend_from_slice(signer.raw());
            }
            let mut legacy = segment.legacy_signature_freeze_signers.snapshot();
            legacy.sort_by(|a, b| a.signer.raw().cmp(b.signer.raw()));
            for entry in &legacy {
                signer_data.extend_from_slice(&entry.signature);
                signer_data.extend_from_slice(entry.signer.raw());
            }
            data.extend_from_slice(&sha512_double(&signer_data));
        }

        if let Some(checksum) = &self.last_superblock_checksum {
            data.extend_from_slice(&self.last_superblock_num.to_le_bytes());
            data.extend_from_slice(checksum);
        }

        Ok(if self.version < HASH_SWITCH_VERSION {
            sha512_quad(&data)
        } else {
            sha512_double(&data)
        })
    }

    /// Compute and store the content checksum. A checksum set earlier
    /// is left untouched.
    pub fn apply_checksum(&mut self) -> Result<(), BlockError> {
        if self.block_checksum.is_none() {
            self.block_checksum = Some(self.calculate_checksum()?);
        }
        Ok(())
    }

    /// Checksum of the current signature list, used for block equality.
    ///
    /// Signatures are snapshotted, sorted ascending by raw signer
    /// identifier, and folded as `block_num || field...` where the field
    /// is the signer identifier from version 4 onward and the signature
    /// bytes before that.
    pub fn calculate_signature_checksum(&self) -> Vec<u8> {
        let mut entries = self.signatures.snapshot();
        entries.sort_by(|a, b| a.signer.raw().cmp(b.signer.raw()));

        let mut data = Vec::new();
        data.extend_from_slice(&self.block_num.to_le_bytes());
        for entry in &entries {
            if self.version >= SIGNER_CHECKSUM_VERSION {
                data.extend_from_slice(entry.signer.raw());
            } else {
                data.extend_from_slice(&entry.signature);
            }
        }

        if self.version < HASH_SWITCH_VERSION {
            sha512_quad(&data)
        } else {
            sha512_double(&data)
        }
    }

    /// Sign the block checksum with the local node identity and append
    /// the result to the signature set. Returns `None` when the node
    /// has already signed this block.
    ///
    /// While the node's public key is not yet registered on chain the
    /// signature is recorded under the full public key so peers can
    /// verify it; afterwards the address form suffices.
    pub fn apply_signature(
        &self,
        wallet: &dyn WalletResolver,
    ) -> Result<Option<BlockSignature>, BlockError> {
        let address = wallet.primary_address();
        if self.signatures.contains_address(&address) {
            return Ok(None);
        }

        let checksum = self
            .block_checksum
            .as_ref()
            .ok_or(BlockError::MissingBlockChecksum)?;
        let signature = crypto::sign(checksum, &wallet.primary_private_key())?;

        let registered = wallet
            .get_wallet(&address)
            .and_then(|w| w.public_key)
            .is_some();
        let signer = if registered {
            SignerId::Address(address)
        } else {
            SignerId::PublicKey(wallet.primary_public_key())
        };

        let entry = BlockSignature::new(signature, signer);
        self.signatures.insert(entry.clone());
        Ok(Some(entry))
    }

    /// Admit a peer signature after recovering the signer's public key
    /// and verifying the signature against the block checksum. Returns
    /// whether the entry was added.
    pub fn add_signature(
        &self,
        signature: Vec<u8>,
        signer: SignerId,
        wallet: &dyn WalletResolver,
    ) -> bool {
        if self.signatures.contains_address(&signer.to_address()) {
            return false;
        }

        let Some(checksum) = &self.block_checksum else {
            tracing::warn!(block = self.block_num, "cannot admit signature without a block checksum");
            return false;
        };

        let Some(public_key) = resolve_public_key(&signer, wallet) else {
            tracing::warn!(
                block = self.block_num,
                "skipping signature whose public key is not resolvable"
            );
            return false;
        };

        if !crypto::verify(checksum, &public_key, &signature) {
            tracing::warn!(block = self.block_num, "rejecting signature that fails verification");
            return false;
        }

        self.signatures.insert(BlockSignature::new(signature, signer))
    }

    /// Merge every signature of `other` whose signer is not yet
    /// present. The caller is responsible for having verified `other`.
    /// Returns whether anything was added.
    pub fn add_signatures_from(&self, other: &Block) -> bool {
        let mut added = false;
        for entry in other.signatures.snapshot() {
            if self.signatures.insert(entry) {
                added = true;
            }
        }
        added
    }

    /// Sweep the signature set: entries with an unresolvable public
    /// key, a public key already seen, or a failing signature are
    /// removed. Returns whether at least one signature survived.
    pub fn verify_signatures(&self, wallet: &dyn WalletResolver) -> bool {
        let Some(checksum) = self.block_checksum.clone() else {
            tracing::warn!(block = self.block_num, "cannot verify signatures without a block checksum");
            return false;
        };

        let mut seen_keys: Vec<PublicKey> = Vec::new();
        let remaining = self.signatures.retain(|entry| {
            let Some(public_key) = resolve_public_key(&entry.signer, wallet) else {
                tracing::debug!(block = self.block_num, "purging signature with unknown public key");
                return false;
            };
            if seen_keys.contains(&public_key) {
                tracing::debug!(block = self.block_num, "purging signature with duplicate public key");
                return false;
            }
            if !crypto::verify(&checksum, &public_key, &entry.signature) {
                tracing::warn!(block = self.block_num, "purging signature that fails verification");
                return false;
            }
            seen_keys.push(public_key);
            true
        });

        remaining > 0
    }

    /// Whether the local node (or the supplied identity) has a valid
    /// signature on this block. A matching entry that fails
    /// verification is reported and the call returns false; the entry
    /// is left in place.
    pub fn has_node_signature(
        &self,
        wallet: &dyn WalletResolver,
        public_key: Option<&[u8]>,
    ) -> bool {
        let public_key = public_key
            .map(|pk| pk.to_vec())
            .unwrap_or_else(|| wallet.primary_public_key());
        let address = derive_address(&public_key);

        let Some(checksum) = &self.block_checksum else {
            return false;
        };

        for entry in self.signatures.snapshot() {
            let raw = entry.signer.raw();
            let matched = if raw.len() <= ADDRESS_FORM_MAX_LEN {
                raw == address.as_slice()
            } else {
                raw == public_key.as_slice()
            };
            if !matched {
                continue;
            }

            if crypto::verify(checksum, &public_key, &entry.signature) {
                return true;
            }
            tracing::warn!(
                block = self.block_num,
                "local signature fails verification; possible block tampering"
            );
            return false;
        }

        false
    }

    /// Wallet addresses of every admitted signer, sorted ascending.
    ///
    /// Address-form entries without a registered public key cannot be
    /// attributed and are skipped. Public-key-form entries are returned
    /// as raw keys when `convert_public_keys` is false.
    pub fn get_signatures_wallet_addresses(
        &self,
        wallet: &dyn WalletResolver,
        convert_public_keys: bool,
    ) -> Vec<Vec<u8>> {
        let mut addresses = Vec::new();

        for entry in self.signatures.snapshot() {
            let raw = entry.signer.raw();
            if raw.len() <= ADDRESS_FORM_MAX_LEN {
                let registered = wallet
                    .get_wallet(raw)
                    .and_then(|w| w.public_key)
                    .is_some();
                if !registered {
                    continue;
                }
                addresses.push(raw.to_vec());
            } else if convert_public_keys {
                addresses.push(derive_address(raw));
            } else {
                addresses.push(raw.to_vec());
            }
        }

        addresses.sort();
        addresses
    }

    /// Number of distinct raw signer identifiers in the signature set.
    pub fn get_unique_signature_count(&self) -> usize {
        self.signatures.unique_signer_count()
    }

    fn last_block_checksum_label(&self) -> String {
        match &self.last_block_checksum {
            Some(checksum) => hex::encode(checksum),
            None => "G E N E S I S  B L O C K".to_string(),
        }
    }

    /// Log the block's identity at info level.
    pub fn log_details(&self) {
        tracing::info!(
            block = self.block_num,
            version = self.version,
            timestamp = self.timestamp,
            difficulty = self.difficulty,
            "Block details"
        );
        tracing::info!(
            "Block checksum:\t\t{}",
            self.block_checksum.as_deref().map(hex::encode).unwrap_or_default()
        );
        tracing::info!("Last block checksum:\t{}", self.last_block_checksum_label());
        tracing::info!(
            "Signature freeze checksum:\t{}",
            self.signature_freeze_checksum
                .as_deref()
                .map(hex::encode)
                .unwrap_or_default()
        );
        tracing::info!(
            transactions = self.transactions.len(),
            signatures = self.signatures.len(),
            "Block contents"
        );
    }
}

/// Recover the public key behind a signer identifier: public-key forms
/// carry it, address forms are resolved through the wallet registry.
fn resolve_public_key(signer: &SignerId, wallet: &dyn WalletResolver) -> Option<PublicKey> {
    match signer {
        SignerId::PublicKey(public_key) => Some(public_key.clone()),
        SignerId::Address(address) => wallet.get_wallet(address).and_then(|w| w.public_key),
    }
}

/// Block identity: checksums only
///
/// Two blocks are the same block when their content checksums match,
/// their signature-freeze checksums are both absent or byte-equal, and
/// their signature checksums match. Everything else is derived state.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.block_checksum == other.block_checksum
            && self.signature_freeze_checksum == other.signature_freeze_checksum
            && self.calculate_signature_checksum() == other.calculate_signature_checksum()
    }
}
