//! Signer Identifiers and Signature Collections
//!
//! A block signature is a pair of detached signature bytes and a signer
//! identifier. The identifier is either a wallet address or a raw public
//! key; two identifiers denote the same signer when their derived
//! addresses are byte-equal, and every collection here deduplicates on
//! that address form.
//!
//! The collections are internally synchronized: merges arrive from
//! network threads while checksum and membership reads run elsewhere.
//! Reads that derive a value (counts, checksums, membership) operate on
//! a snapshot taken under the lock; removals are reapplied against the
//! live set.

use std::sync::Mutex;

use crate::codec::CodecError;
use crate::crypto::address::{
    derive_address, MAX_ADDRESS_LEN, MAX_PUBLIC_KEY_LEN, MIN_ADDRESS_LEN,
};

/// A signer identifier in its raw wire form
///
/// Classification happens purely by length: identifiers of 36 to 128
/// bytes are addresses, longer ones (up to the public-key ceiling) are
/// public keys. The raw bytes are preserved exactly; serialization and
/// raw-identifier comparisons never normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerId {
    /// A wallet address, used verbatim as the derived address
    Address(Vec<u8>),
    /// A raw public key; the address form is derived from it
    PublicKey(Vec<u8>),
}

impl SignerId {
    /// Classify raw identifier bytes. Lengths outside both bands are
    /// rejected.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        match bytes.len() {
            MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN => Ok(SignerId::Address(bytes)),
            len if len > MAX_ADDRESS_LEN && len < MAX_PUBLIC_KEY_LEN => {
                Ok(SignerId::PublicKey(bytes))
            }
            len => Err(CodecError::InvalidSigner(len)),
        }
    }

    /// The raw bytes as they appear on the wire.
    pub fn raw(&self) -> &[u8] {
        match self {
            SignerId::Address(bytes) | SignerId::PublicKey(bytes) => bytes,
        }
    }

    /// Project the identifier onto its canonical address form.
    pub fn to_address(&self) -> Vec<u8> {
        match self {
            SignerId::Address(bytes) => bytes.clone(),
            SignerId::PublicKey(bytes) => derive_address(bytes),
        }
    }
}

/// A single admitted block signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignature {
    /// Detached signature over the block checksum
    pub signature: Vec<u8>,
    /// Identifier of the signer, as received
    pub signer: SignerId,
}

impl BlockSignature {
    pub fn new(signature: Vec<u8>, signer: SignerId) -> Self {
        Self { signature, signer }
    }
}

/// Insertion-ordered set of block signatures, deduplicated by derived
/// signer address
#[derive(Debug, Default)]
pub struct SignatureSet {
    entries: Mutex<Vec<BlockSignature>>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<BlockSignature>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Append a signature unless an equivalent signer is already
    /// present. Returns whether the entry was added.
    pub fn insert(&self, entry: BlockSignature) -> bool {
        let address = entry.signer.to_address();
        let mut entries = self.entries.lock().unwrap();
        if entries
            .iter()
            .any(|existing| existing.signer.to_address() == address)
        {
            return false;
        }
        entries.push(entry);
        true
    }

    /// Whether a signer with the given derived address is present.
    pub fn contains_address(&self, address: &[u8]) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .any(|entry| entry.signer.to_address() == address)
    }

    /// Copy of the current entries in insertion order.
    pub fn snapshot(&self) -> Vec<BlockSignature> {
        self.entries.lock().unwrap().clone()
    }

    /// Keep only the entries for which `keep` returns true, holding the
    /// lock for the whole sweep so no entry is admitted or dropped
    /// concurrently. Returns the number of surviving entries.
    pub fn retain(&self, mut keep: impl FnMut(&BlockSignature) -> bool) -> usize {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|entry| keep(entry));
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Number of distinct raw identifiers in the set.
    ///
    /// This intentionally compares raw bytes, not derived addresses: a
    /// signer recorded once under its public key and once under its
    /// address counts twice.
    pub fn unique_signer_count(&self) -> usize {
        let entries = self.entries.lock().unwrap();
        let mut seen: Vec<&[u8]> = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            let raw = entry.signer.raw();
            if !seen.iter().any(|s| *s == raw) {
                seen.push(raw);
            }
        }
        seen.len()
    }
}

impl Clone for SignatureSet {
    fn clone(&self) -> Self {
        Self::from_entries(self.snapshot())
    }
}

impl PartialEq for SignatureSet {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

/// Insertion-ordered set of bare signer identifiers, deduplicated by
/// derived address
#[derive(Debug, Default)]
pub struct SignerSet {
    entries: Mutex<Vec<SignerId>>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SignerId>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Append an identifier unless an equivalent signer is already
    /// present. Returns whether the entry was added.
    pub fn insert(&self, id: SignerId) -> bool {
        let address = id.to_address();
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|existing| existing.to_address() == address) {
            return false;
        }
        entries.push(id);
        true
    }

    /// Whether a signer with the given derived address is present.
    pub fn contains_address(&self, address: &[u8]) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.iter().any(|id| id.to_address() == address)
    }

    /// Copy of the current entries in insertion order.
    pub fn snapshot(&self) -> Vec<SignerId> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Clone for SignerSet {
    fn clone(&self) -> Self {
        Self::from_entries(self.snapshot())
    }
}

impl PartialEq for SignerSet {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}
