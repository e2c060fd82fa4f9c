//! # Canonical Export
//!
//! redb files are not bit-identical across runs, and a `TripleGraph` keeps
//! properties in assertion order. The canonical export sorts every triple and
//! import so that two documents with the same content export to the same
//! bytes. This is the form used to compare, hash and exchange templates.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalGraph (postcard)]
//! ```

use crate::primitives::MAX_IMPORT_TRIPLES;
use crate::triples::{Triple, TripleGraph, Value};
use crate::types::WeftError;
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical export format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"WEFX";

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub triple_count: u64,
    pub import_count: u64,
    /// Checksum of the data section (XOR/rotate, not cryptographic).
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(triple_count: u64, import_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            triple_count,
            import_count,
            checksum,
        }
    }

    /// Error messages stay generic on purpose.
    pub fn validate(&self) -> Result<(), WeftError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(WeftError::Serialization("Invalid file format".to_string()));
        }
        if self.version != CANONICAL_VERSION {
            return Err(WeftError::Serialization(
                "Unsupported file version".to_string(),
            ));
        }
        Ok(())
    }
}

/// A document in canonical, sorted form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalGraph {
    /// Sorted by (subject, predicate, object).
    pub triples: Vec<Triple>,
    /// `(document, import)` pairs, sorted.
    pub imports: Vec<(String, String)>,
}

impl CanonicalGraph {
    #[must_use]
    pub fn from_graph(graph: &TripleGraph) -> Self {
        let mut triples: Vec<Triple> = graph.triples().collect();
        triples.sort();
        let mut imports: Vec<(String, String)> = graph
            .imports()
            .map(|(url, import)| (url.to_string(), import.to_string()))
            .collect();
        imports.sort();
        Self { triples, imports }
    }

    /// Rebuild a graph. Per-subject property order becomes sorted order.
    #[must_use]
    pub fn to_graph(&self) -> TripleGraph {
        let mut graph = TripleGraph::from_triples(self.triples.iter().cloned());
        for (url, import) in &self.imports {
            graph.create_import(url, import);
        }
        graph
    }

    /// Deterministic, non-cryptographic checksum.
    ///
    /// Detects accidental corruption only. Hash the
    /// exported bytes (`compute_blake3_hash`, feature `crypto-hash`) where tampering matters.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash: u64 = 0;
        for (i, triple) in self.triples.iter().enumerate() {
            let mut h = text_hash(&triple.subject).rotate_left(13);
            h ^= text_hash(&triple.predicate).rotate_left(7);
            h ^= value_hash(&triple.object).rotate_left(3);
            hash ^= h.rotate_left((i % 64) as u32);
        }
        for (url, import) in &self.imports {
            hash ^= text_hash(url).rotate_left(19) ^ text_hash(import).rotate_left(23);
        }
        hash ^ (self.triples.len() as u64).rotate_left(29)
    }
}

fn text_hash(text: &str) -> u64 {
    text.bytes()
        .fold(0u64, |h, b| h.rotate_left(5) ^ u64::from(b))
}

fn value_hash(value: &Value) -> u64 {
    match value {
        Value::Resource(id) => text_hash(id),
        Value::Literal(lit) => {
            text_hash(&lit.value) ^ lit.datatype.as_deref().map_or(1, text_hash).rotate_left(11)
        }
        Value::List(items) => items
            .iter()
            .fold(0x2f, |h, v| h.rotate_left(17) ^ value_hash(v)),
    }
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export a document in canonical form.
pub fn export_canonical(graph: &TripleGraph) -> Result<Vec<u8>, WeftError> {
    let canonical = CanonicalGraph::from_graph(graph);
    let header = CanonicalHeader::new(
        canonical.triples.len() as u64,
        canonical.imports.len() as u64,
        canonical.checksum(),
    );

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| WeftError::Serialization(format!("Header: {e}")))?;
    let data_bytes = postcard::to_allocvec(&canonical)
        .map_err(|e| WeftError::Serialization(format!("Data: {e}")))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Import a canonical export, checking header, limits, counts and checksum.
pub fn import_canonical(data: &[u8]) -> Result<TripleGraph, WeftError> {
    if data.len() < 4 {
        return Err(WeftError::Serialization("Data too short".to_string()));
    }
    let header_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let data_start = 4usize.saturating_add(header_len);
    if data.len() < data_start {
        return Err(WeftError::Serialization(
            "Data too short for header".to_string(),
        ));
    }

    let header: CanonicalHeader = postcard::from_bytes(&data[4..data_start])
        .map_err(|e| WeftError::Serialization(format!("Header: {e}")))?;
    header.validate()?;

    if header.triple_count > MAX_IMPORT_TRIPLES as u64 {
        return Err(WeftError::Serialization(format!(
            "Triple count {} exceeds maximum allowed {}",
            header.triple_count, MAX_IMPORT_TRIPLES
        )));
    }

    let canonical: CanonicalGraph = postcard::from_bytes(&data[data_start..])
        .map_err(|e| WeftError::Serialization(format!("Data: {e}")))?;

    let computed = canonical.checksum();
    if computed != header.checksum {
        return Err(WeftError::Serialization(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if canonical.triples.len() as u64 != header.triple_count {
        return Err(WeftError::Serialization(
            "Triple count mismatch".to_string(),
        ));
    }
    if canonical.imports.len() as u64 != header.import_count {
        return Err(WeftError::Serialization(
            "Import count mismatch".to_string(),
        ));
    }

    Ok(canonical.to_graph())
}

/// Whether `graph` has the same content as a canonical export.
pub fn verify_canonical(graph: &TripleGraph, canonical_data: &[u8]) -> Result<bool, WeftError> {
    let imported = import_canonical(canonical_data)?;
    if graph.len() != imported.len() {
        return Ok(false);
    }
    Ok(CanonicalGraph::from_graph(graph) == CanonicalGraph::from_graph(&imported))
}

/// Canonical checksum of a document; equal content gives equal checksums.
#[must_use]
pub fn canonical_checksum(graph: &TripleGraph) -> u64 {
    CanonicalGraph::from_graph(graph).checksum()
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hash (hex) of a document's canonical export.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(graph: &TripleGraph) -> Result<String, WeftError> {
    Ok(compute_blake3_hash(&export_canonical(graph)?))
}

/// BLAKE3 hash (hex) of raw bytes.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
