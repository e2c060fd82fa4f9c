//! # Formats
//!
//! Byte-level encodings of stored triple graphs.

pub mod persistence;

pub use persistence::{
    PersistenceHeader, graph_from_bytes, graph_to_bytes, store_from_bytes, store_to_bytes,
};
