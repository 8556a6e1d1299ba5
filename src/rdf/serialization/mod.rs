//! RDF serialization formats
//!
//! Supports:
//! - Turtle (TTL), load only
//! - N-Triples (NT), load and export

mod ntriples;
mod turtle;

pub use ntriples::to_ntriples;
pub use turtle::load_str;

use super::store::{StoreError, TripleStore};
use super::types::{NodeId, TermError};
use std::path::Path;
use thiserror::Error;

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// N-Triples format (.nt)
    NTriples,
}

impl RdfFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }
}

/// Load errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error reported by the parser
    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed syntax, invalid term
    #[error("Invalid term: {0}")]
    Term(#[from] TermError),

    /// RDF-star and other constructs the store cannot hold
    #[error("Unsupported construct: {0}")]
    Unsupported(&'static str),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rio_turtle::TurtleError> for LoadError {
    fn from(e: rio_turtle::TurtleError) -> Self {
        LoadError::Parse(e.to_string())
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// Load a file, picking the format from its extension
pub fn load_path(store: &mut TripleStore, path: impl AsRef<Path>, graph: Option<NodeId>) -> LoadResult<usize> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = RdfFormat::from_extension(extension)
        .ok_or_else(|| LoadError::UnsupportedExtension(extension.to_string()))?;
    let text = std::fs::read_to_string(path)?;
    load_str(store, &text, format, graph)
}
