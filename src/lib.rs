//! Samyama RDFS
//!
//! An in-memory RDF/RDFS knowledge base. Triples are added and removed
//! through a [`TripleStore`] that keeps every node typed according to RDF
//! Schema (class, property, metaclass, individual, named graph and so on)
//! as the data changes, refusing triples that would contradict an
//! established type and rolling the attempt back exactly.
//!
//! # Features
//!
//! - Node mapping with per-store handles and reference-counted activation
//! - Named graphs with interned graph sets
//! - Fixed-point type propagation with rollback on contradiction
//! - Pattern queries and deletes through a pluggable [`rdf::Indexer`]
//! - Node and triple listeners held by weak reference
//! - RDFS closure and reduction, optionally backed by hierarchy labels
//! - Reification replay
//! - Turtle / N-Triples loading and N-Triples export
//! - JSON / YAML store configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_rdfs::{RdfType, StoreConfig, TripleStore};
//!
//! let config = StoreConfig::from_yaml_str("default_graph: http://example.org/graph\n").unwrap();
//! let mut store = TripleStore::with_config(config).unwrap();
//!
//! let knows = store.new_property(None, "http://example.org/knows").unwrap();
//! let alice = store.uri("http://example.org/alice").unwrap();
//! let bob = store.uri("http://example.org/bob").unwrap();
//! let triple = store.add(None, alice, knows, bob).unwrap();
//!
//! assert_eq!(store.node_type(knows), Some(RdfType::Property));
//! assert_eq!(store.graphs_of(triple), vec![store.default_graph()]);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod rdf;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, StoreConfig, DEFAULT_GRAPH_IRI};

pub use rdf::{
    Entailment, EntailmentReport, EntailmentRule, InternalType, NodeId, Pattern, RdfFormat,
    RdfTerm, RdfType, StoreError, StoreResult, Triple, TripleId, TripleStore,
    TypeContradiction,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "1.0.0");
    }
}
