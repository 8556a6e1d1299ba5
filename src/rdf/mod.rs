//! RDF/RDFS knowledge base
//!
//! This module implements an in-memory triple store that keeps every node
//! typed according to RDF Schema as triples come and go:
//! - Node mapping: one handle per distinct URI, blank node or literal
//! - Named graphs, with graph sets shared across triples
//! - Transactional type propagation with exact rollback on contradiction
//! - RDFS closure and reduction over the class and property hierarchies
//! - Reification replay
//! - Turtle / N-Triples loading and N-Triples export
//!
//! # Example
//!
//! ```rust
//! use samyama_rdfs::rdf::{Entailment, RdfType, TripleStore};
//!
//! let mut store = TripleStore::new();
//! let person = store.new_class(None, "http://example.org/Person").unwrap();
//! let student = store
//!     .new_subclass(None, "http://example.org/Student", person)
//!     .unwrap();
//! let alice = store
//!     .new_individual(None, "http://example.org/alice", student)
//!     .unwrap();
//!
//! assert_eq!(store.node_type(alice), Some(RdfType::Individual));
//!
//! let rdf_type = store.curie("rdf:type").unwrap();
//! assert!(store.is_inferable(alice, rdf_type, person).unwrap());
//!
//! let report = Entailment::new().closure(&mut store, None).unwrap();
//! assert_eq!(report.added.len(), 1);
//! assert!(store.contains(alice, rdf_type, person));
//! ```

mod entailment;
mod graphset;
mod index;
mod labels;
mod listener;
pub mod namespace;
mod node;
mod query;
mod reification;
mod serialization;
mod store;
mod types;
mod typing;
mod view;

pub use types::{
    BlankNode, Literal, NamedNode, NodeId, NodeKind, RdfTerm, RdfType, StoreId,
    TermError, TermResult, TripleId, TripleKey,
};

pub use typing::{
    InternalType, TypeChange, TypeContradiction, TypeEngine, TypeGraph, TypeTransition,
};

pub use node::{Activation, NodeStore};

pub use graphset::{GraphSetId, GraphSetInterner};

pub use store::{ContainerKind, StoreError, StoreResult, Triple, TripleStore};

pub use query::{Pattern, PatternBuilder, QueryError, QueryResult, Slot, TripleAdder};

pub use view::{ClassView, IndividualView, PropertyView, RdfNode};

pub use listener::{
    Channel, NodeEvent, NodeListener, Subscription, TripleEvent, TripleListener,
};

pub use index::{Indexer, MemoryIndexer, NodeChange, NodeDescriptor, Removal};

pub use labels::{Hierarchy, HierarchyGraph, IntervalLabels, LabelManager};

pub use namespace::{Namespace, NamespaceManager, PrefixError, PrefixResult};

pub use entailment::{
    Entailment, EntailmentError, EntailmentReport, EntailmentResult, EntailmentRule,
};

pub use reification::{replay_reifications, ReificationError, ReificationResult, ReplayReport};

pub use serialization::{
    load_path, load_str, to_ntriples, LoadError, LoadResult, RdfFormat, SerializeError,
    SerializeResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdf_module_exports() {
        let store = TripleStore::new();
        let _ns_mgr = NamespaceManager::new();
        let _entailment = Entailment::new();
        assert_eq!(store.triple_count(), 0);
    }
}
