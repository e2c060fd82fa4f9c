//! # Persistence Format
//!
//! Binary encoding of one template document as stored by the redb backend,
//! and of a whole [`MemoryStore`] as written by the single-file backend.
//!
//! Format: Header (5 bytes) + postcard-serialized payload.
//! - 4 bytes: Magic ("WEFT")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_PERSISTENCE_PAYLOAD_SIZE};
use crate::storage::MemoryStore;
use crate::triples::TripleGraph;
use crate::types::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;

const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes every stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if &self.magic != MAGIC_BYTES {
            return Err(StorageError::Codec("Invalid magic bytes".to_string()));
        }
        if self.version != FORMAT_VERSION {
            return Err(StorageError::Codec(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() < HEADER_LEN {
            return Err(StorageError::Codec("Header too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StorageError> {
    let payload = postcard::to_stdvec(value).map_err(|e| StorageError::Codec(e.to_string()))?;
    if payload.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(StorageError::Codec(format!(
            "{what} of {} bytes exceeds maximum {} bytes",
            payload.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&PersistenceHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, StorageError> {
    if bytes.len() > HEADER_LEN + MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(StorageError::Codec(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }
    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| StorageError::Codec(format!("Failed to decode {what}: {e}")))
}

/// Encode a document (header + payload). No I/O.
pub fn graph_to_bytes(graph: &TripleGraph) -> Result<Vec<u8>, StorageError> {
    encode(graph, "Document")
}

/// Decode a document. No I/O.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<TripleGraph, StorageError> {
    decode(bytes, "document")
}

/// Encode a whole in-memory store, for the single-file backend.
pub fn store_to_bytes(store: &MemoryStore) -> Result<Vec<u8>, StorageError> {
    encode(store, "Store")
}

pub fn store_from_bytes(bytes: &[u8]) -> Result<MemoryStore, StorageError> {
    decode(bytes, "store")
}

// =============================================================================
// TESTS
// =============================================================================
