//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{Backend, WeftConfig};
use weft_core::{
    Session, StorageError, Template, TripleGraph, WeftError, canonical_checksum,
    canonical_crypto_hash, export_canonical, import_canonical, store_from_bytes, store_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of an imported document (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

fn io_err(message: String) -> WeftError {
    WeftError::Storage(StorageError::Io(message))
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WeftError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| io_err(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(WeftError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path; it must name an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, WeftError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| io_err(format!("Invalid file path '{}': {e}", path.display())))?;

    if !canonical.is_file() {
        return Err(io_err(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path; its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, WeftError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        io_err(format!(
            "Invalid output directory '{}': {e}",
            parent.display()
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(io_err(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| io_err("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new store.
pub fn cmd_init(config: &WeftConfig, force: bool) -> Result<(), WeftError> {
    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(WeftError::Serialization(
                "Store already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| io_err(format!("Remove existing store: {e}")))?;
    }

    match config.backend {
        Backend::Redb => {
            let _session = Session::with_redb(db_path)?;
            println!("Initialized new redb store at {:?}", db_path);
        }
        Backend::File => {
            save_session(&Session::new(), config)?;
            println!("Initialized new file store at {:?}", db_path);
        }
    }

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a template document.
pub fn cmd_import(
    config: &WeftConfig,
    json_mode: bool,
    input: &Path,
    uri: Option<&str>,
    format: &str,
) -> Result<(), WeftError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| io_err(format!("Read file: {e}")))?;

    let graph: TripleGraph = match format {
        "json" => serde_json::from_slice(&data)
            .map_err(|e| WeftError::Serialization(format!("Invalid JSON document: {e}")))?,
        "canonical" => import_canonical(&data)?,
        _ => {
            return Err(WeftError::Serialization(format!(
                "Unknown format: {format}. Use: json, canonical"
            )));
        }
    };

    tracing::info!(path = %validated_path.display(), format, triples = graph.len(), "importing document");

    let mut session = load_or_create_session(config)?;
    let template = session.import_graph(&graph, uri.unwrap_or_default())?;
    save_session(&session, config)?;

    if json_mode {
        print_json(&serde_json::json!({
            "template": template.id(),
            "version": template.version(),
            "triples": graph.len(),
        }));
    } else {
        println!(
            "Imported {} (version {}, {} triples)",
            template.id(),
            template.version(),
            graph.len()
        );
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the stored document holding a template.
pub fn cmd_export(
    config: &WeftConfig,
    uri: &str,
    output: &Path,
    format: &str,
) -> Result<(), WeftError> {
    let validated_output = validate_output_path(output)?;

    let session = load_or_create_session(config)?;
    let graph = session.export_graph(uri)?;

    let data = match format {
        "canonical" => {
            let data = export_canonical(&graph)?;
            println!("Checksum: {}", canonical_checksum(&graph));
            data
        }
        "json" => serde_json::to_vec_pretty(&graph)
            .map_err(|e| WeftError::Serialization(e.to_string()))?,
        _ => {
            return Err(WeftError::Serialization(format!(
                "Unknown format: {format}. Use: canonical, json"
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| io_err(format!("Write file: {e}")))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Summarize a stored template.
pub fn cmd_show(config: &WeftConfig, json_mode: bool, uri: &str) -> Result<(), WeftError> {
    let session = load_or_create_session(config)?;
    let template = session.try_load(uri)?;

    if json_mode {
        print_json(&template_summary(&template));
        return Ok(());
    }

    println!("Template {}", template.id());
    println!("==================");
    println!("Version:   {}", template.version());
    println!("Structure: {template}");
    println!();
    println!("Nodes ({}):", template.nodes().len());
    for node in template.nodes() {
        println!(
            "  {} [{}] in={} out={}",
            node.id.name(),
            node.component,
            node.input_ports().len(),
            node.output_ports().len()
        );
    }
    println!("Links ({}):", template.links().len());
    for link in template.links() {
        let end = |node: Option<&weft_core::NodeId>| node.map_or("-", |n| n.name()).to_string();
        println!(
            "  {} -> {} ({})",
            end(link.from_node.as_ref()),
            end(link.to_node.as_ref()),
            link.variable.as_ref().map_or("-", |v| v.name())
        );
    }
    println!("Inputs:  {}", role_names(template.input_roles().values()));
    println!("Outputs: {}", role_names(template.output_roles().values()));

    Ok(())
}

fn role_names<'a>(roles: impl Iterator<Item = &'a weft_core::Role>) -> String {
    let names: Vec<&str> = roles
        .map(|r| r.role_id.as_deref().unwrap_or(&r.id))
        .collect();
    names.join(", ")
}

fn template_summary(template: &Template) -> serde_json::Value {
    let nodes: Vec<serde_json::Value> = template
        .nodes()
        .iter()
        .map(|n| {
            serde_json::json!({
                "id": n.id.as_str(),
                "component": n.component.id,
                "sub_template": n.component.is_template(),
                "input_ports": n.input_ports().iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
                "output_ports": n.output_ports().iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    let links: Vec<serde_json::Value> = template
        .links()
        .iter()
        .map(|l| {
            serde_json::json!({
                "id": l.id.as_str(),
                "from": l.from_node.as_ref().map(|n| n.as_str()),
                "to": l.to_node.as_ref().map(|n| n.as_str()),
                "variable": l.variable.as_ref().map(|v| v.as_str()),
            })
        })
        .collect();
    let variables: Vec<serde_json::Value> = template
        .variables()
        .iter()
        .map(|v| {
            serde_json::json!({
                "id": v.id.as_str(),
                "kind": if v.is_data_variable() { "data" } else { "parameter" },
                "bound": v.has_binding(),
            })
        })
        .collect();

    serde_json::json!({
        "id": template.id(),
        "version": template.version(),
        "nodes": nodes,
        "links": links,
        "variables": variables,
        "input_roles": template.input_roles().values().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        "output_roles": template.output_roles().values().map(|r| r.id.as_str()).collect::<Vec<_>>(),
    })
}

// =============================================================================
// NORMALIZE / COPY / DELETE COMMANDS
// =============================================================================

/// Read a template and write it back at the latest schema version.
pub fn cmd_normalize(config: &WeftConfig, json_mode: bool, uri: &str) -> Result<(), WeftError> {
    let mut session = load_or_create_session(config)?;
    let mut template = session.try_load(uri)?;
    let from = template.version();

    session.try_save(&mut template)?;
    save_session(&session, config)?;

    if json_mode {
        print_json(&serde_json::json!({
            "template": template.id(),
            "from_version": from,
            "to_version": template.version(),
        }));
    } else {
        println!(
            "Normalized {}: version {} -> {}",
            template.id(),
            from,
            template.version()
        );
    }
    Ok(())
}

/// Store a template under a new id.
pub fn cmd_copy(config: &WeftConfig, json_mode: bool, uri: &str, to: &str) -> Result<(), WeftError> {
    let mut session = load_or_create_session(config)?;
    let template = session.try_load(uri)?;
    let stored = session.try_save_as(&template, to)?;
    save_session(&session, config)?;

    if json_mode {
        print_json(&serde_json::json!({
            "from": template.id(),
            "to": stored.id(),
            "nodes": stored.nodes().len(),
        }));
    } else {
        println!("Copied {} -> {}", template.id(), stored.id());
    }
    Ok(())
}

/// Delete the document holding a template.
pub fn cmd_delete(config: &WeftConfig, json_mode: bool, uri: &str) -> Result<(), WeftError> {
    let mut session = load_or_create_session(config)?;
    let deleted = session.try_delete(uri)?;
    if !deleted {
        return Err(WeftError::TemplateNotFound(uri.to_string()));
    }
    save_session(&session, config)?;

    if json_mode {
        print_json(&serde_json::json!({ "deleted": uri }));
    } else {
        println!("Deleted {uri}");
    }
    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List stored templates.
pub fn cmd_list(config: &WeftConfig, json_mode: bool) -> Result<(), WeftError> {
    let session = load_or_create_session(config)?;
    let ids = session.try_list()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.to_string(),
            "templates": ids,
        }));
        return Ok(());
    }

    println!("weft Store");
    println!("==========");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend);
    println!();
    if ids.is_empty() {
        println!("No templates stored");
    }
    for id in &ids {
        println!("  {id}");
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Compute the BLAKE3 hash of a stored document's canonical export.
pub fn cmd_hash(config: &WeftConfig, json_mode: bool, uri: &str) -> Result<(), WeftError> {
    let session = load_or_create_session(config)?;
    let graph = session.export_graph(uri)?;

    let hash = canonical_crypto_hash(&graph)?;
    let checksum = canonical_checksum(&graph);

    if json_mode {
        print_json(&serde_json::json!({
            "template": uri,
            "hash": hash,
            "algorithm": "BLAKE3",
            "checksum": checksum,
            "triples": graph.len(),
        }));
    } else {
        println!("BLAKE3 Hash: {hash}");
        println!("Checksum:    {checksum}");
        println!("Triples:     {}", graph.len());
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store.
pub fn load_or_create_session(config: &WeftConfig) -> Result<Session, WeftError> {
    let db_path = &config.database;
    let session = match config.backend {
        Backend::Redb => Session::with_redb(db_path)?,
        Backend::File => {
            if db_path.exists() {
                let data = std::fs::read(db_path)
                    .map_err(|e| io_err(format!("Read store: {e}")))?;
                Session::with_store(store_from_bytes(&data)?)
            } else {
                Session::new()
            }
        }
    };
    Ok(session.with_vocabulary(config.vocabulary()))
}

/// Write a file-backed session back to disk. Persistent sessions are
/// already durable.
pub fn save_session(session: &Session, config: &WeftConfig) -> Result<(), WeftError> {
    let Some(store) = session.memory_store() else {
        return Ok(());
    };
    let data = store_to_bytes(store)?;
    std::fs::write(&config.database, &data)
        .map_err(|e| io_err(format!("Write store: {e}")))?;
    Ok(())
}
