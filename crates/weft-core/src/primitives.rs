//! # Primitives
//!
//! Fixed constants of the template model and its store encoding.
//!
//! ## Schema versions
//!
//! 1. **Version 0** (legacy): links name component parameters, ports are
//!    synthesized on read, node rules are defaulted.
//! 2. **Version 1+**: ports and set-creation rules are explicit in the store.
//! 3. **Version 3**: current; written on every save.

/// Schema version stamped on every written template.
pub const LATEST_VERSION: u32 = 3;

/// First schema version with explicit ports and node rules.
pub const EXPLICIT_PORTS_VERSION: u32 = 1;

/// Magic bytes for the binary triple-graph format header.
///
/// - File Header = Magic Bytes ("WEFT") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"WEFT";

/// Current binary format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum nesting of sub-templates followed while reading.
pub const MAX_TEMPLATE_DEPTH: usize = 64;

// =============================================================================
// IDENTIFIER SUFFIXES
// =============================================================================

/// Appended to a component name to form a node id (`<ns><comp>Node`).
pub const NODE_SUFFIX: &str = "Node";

/// Synthesized role id for an input boundary variable (`<var>_irole`).
pub const INPUT_ROLE_SUFFIX: &str = "_irole";

/// Synthesized role id for an output boundary variable (`<var>_orole`).
pub const OUTPUT_ROLE_SUFFIX: &str = "_orole";

/// Role id for ports read from a foreign role namespace (`<port>_role`).
pub const PORT_ROLE_SUFFIX: &str = "_role";

pub const COMPONENT_RULE_SUFFIX: &str = "_crule";
pub const PORT_RULE_SUFFIX: &str = "_prule";
pub const METADATA_SUFFIX: &str = "_meta";

/// Legacy input-port prefix (`<linkns>ip<N>`).
pub const LEGACY_INPUT_PORT_PREFIX: &str = "ip";

/// Legacy output-port prefix (`<linkns>op<N>`).
pub const LEGACY_OUTPUT_PORT_PREFIX: &str = "op";

/// Prefix of blank-node identifiers, which are never exposed as ids.
pub const ANONYMOUS_PREFIX: &str = "_:";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum encoded size of a stored triple graph (64 MiB).
///
/// Checked before decoding to prevent memory exhaustion from corrupt input.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of triples accepted from a single import.
pub const MAX_IMPORT_TRIPLES: usize = 1_000_000;
