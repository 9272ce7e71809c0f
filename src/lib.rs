//! # Aurum Chain Core
//!
//! Block data model, canonical wire codec and signature layer of an
//! Aurum ledger node.
//!
//! ## Overview
//!
//! Aurum blocks are content-addressed: every block, header and
//! superblock segment has a deterministic checksum derived from its
//! fields, and node signatures are produced over that checksum. This
//! crate owns the entities, the bit-exact byte codec used on the wire
//! and on disk, the checksum composition rules, and the admission logic
//! for per-node signatures.
//!
//! ## Key Components
//!
//! - **Codec**: little-endian primitives, length-prefixed byte slices
//!   and varint-framed strings ([`codec`])
//! - **Crypto**: truncated SHA-512 checksum variants, ML-DSA signing,
//!   wallet-address derivation ([`crypto`])
//! - **Block**: [`Block`], [`BlockHeader`] and [`SuperBlockSegment`]
//!   entities with their codecs, checksums and signature sets ([`block`])
//! - **Wallet**: address-to-public-key resolution and the local signing
//!   identity ([`wallet`])
//! - **Api**: HTTP gateway with optional basic auth in front of a
//!   polymorphic handler ([`api`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aurum_chain_core::{Block, NodeKeys, WalletRegistry};
//!
//! let registry = WalletRegistry::new(NodeKeys::generate());
//!
//! let mut block = Block::new(7);
//! block.add_transaction("tx-0001");
//! block.apply_checksum()?;
//! block.apply_signature(&registry)?;
//! ```

pub mod api;
pub mod block;
pub mod codec;
pub mod crypto;
pub mod wallet;

// Re-export commonly used types
pub use api::{ApiConfig, ApiGateway, ApiHandler, ApiMetrics, ApiRequest, JsonResponse};
pub use block::{
    Block, BlockError, BlockHeader, BlockSignature, SignatureSet, SignerId, SignerSet,
    SuperBlockSegment,
};
pub use codec::{ByteReader, ByteWriter, CodecError};
pub use crypto::{CryptoError, CryptoResult, NodeKeys};
pub use wallet::{Wallet, WalletRegistry, WalletResolver};
