//! RDF triple store
//!
//! Nodes and triples live in per-store arenas and are addressed by
//! [`NodeId`] / [`TripleId`] handles that remember which store minted them.
//! Every present triple belongs to a non-empty, interned set of named graphs.
//! Adding a triple runs the RDFS type engine over it last; a contradiction
//! undoes the type changes of that run but leaves the triple in place.
//!
//! Triple records are never evicted: a deleted `(s, p, o)` keeps its
//! [`TripleId`] and gets it back when re-added.

use super::graphset::{GraphSetId, GraphSetInterner};
use super::index::{Indexer, MemoryIndexer, NodeChange, NodeDescriptor, Removal};
use super::labels::{Hierarchy, HierarchyGraph, IntervalLabels, LabelManager};
use super::listener::{
    Channel, NodeEvent, NodeListener, Registry, Subscription, TripleEvent, TripleListener,
};
use super::namespace::{rdf, rdfs, NamespaceManager, PrefixError};
use super::node::{Activation, NodeStore};
use super::query::{Pattern, PatternBuilder, QueryError, TripleAdder};
use super::typing::{InternalType, TypeContradiction, TypeEngine, TypeGraph, TypeTransition};
use super::types::{
    BlankNode, Literal, NamedNode, NodeId, NodeKind, RdfTerm, RdfType, StoreId, TermError,
    TripleId, TripleKey,
};
use super::view::RdfNode;
use crate::config::{ConfigError, StoreConfig};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, info, warn};

static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// Triple store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Node minted by another store
    #[error("{node} does not belong to {store}")]
    ForeignNode { node: NodeId, store: StoreId },

    /// Triple minted by another store
    #[error("{triple} does not belong to {store}")]
    ForeignTriple { triple: TripleId, store: StoreId },

    #[error("Literal {0} cannot be a subject")]
    LiteralSubject(NodeId),

    #[error("{0} cannot be a predicate, only URI resources can")]
    InvalidPredicate(NodeId),

    #[error("{0} cannot name a graph, only URI resources can")]
    InvalidGraph(NodeId),

    #[error("{node} is {actual}, not {expected}")]
    WrongType {
        node: NodeId,
        expected: RdfType,
        actual: RdfType,
    },

    #[error("Label manager is bound to {bound}, not {store}")]
    ForeignLabels { bound: StoreId, store: StoreId },

    /// Typing failed; the triple (if any) stays, the type changes do not
    #[error(transparent)]
    Contradiction(Box<TypeContradiction>),

    #[error(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    Prefix(#[from] PrefixError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<TypeContradiction> for StoreError {
    fn from(contradiction: TypeContradiction) -> Self {
        StoreError::Contradiction(Box::new(contradiction))
    }
}

impl StoreError {
    pub fn contradiction(&self) -> Option<&TypeContradiction> {
        match self {
            StoreError::Contradiction(c) => Some(c),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot of a present triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub id: TripleId,
    pub subject: NodeId,
    pub predicate: NodeId,
    pub object: NodeId,
    /// Owning named graphs, shared with every triple of the same membership
    pub graphs: Arc<[NodeId]>,
}

impl Triple {
    pub fn key(&self) -> TripleKey {
        TripleKey::new(self.subject, self.predicate, self.object)
    }
}

/// rdf:Alt, rdf:Bag or rdf:Seq
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Alt,
    Bag,
    Seq,
}

impl ContainerKind {
    fn class_iri(self) -> &'static str {
        match self {
            ContainerKind::Alt => rdf::ALT,
            ContainerKind::Bag => rdf::BAG,
            ContainerKind::Seq => rdf::SEQ,
        }
    }
}

/// Well-known vocabulary nodes, mapped when the store is built
#[derive(Debug, Clone, Copy)]
pub(crate) struct Vocabulary {
    pub rdf_type: NodeId,
    pub sub_class_of: NodeId,
    pub sub_property_of: NodeId,
    pub rdfs_class: NodeId,
    pub rdf_property: NodeId,
    pub rdf_statement: NodeId,
    pub rdf_subject: NodeId,
    pub rdf_predicate: NodeId,
    pub rdf_object: NodeId,
}

impl Vocabulary {
    fn map(nodes: &mut NodeStore) -> Self {
        let mut uri = |iri: &str| nodes.map(NamedNode::new_unchecked(iri).into());
        Self {
            rdf_type: uri(rdf::TYPE),
            sub_class_of: uri(rdfs::SUB_CLASS_OF),
            sub_property_of: uri(rdfs::SUB_PROPERTY_OF),
            rdfs_class: uri(rdfs::CLASS),
            rdf_property: uri(rdf::PROPERTY),
            rdf_statement: uri(rdf::STATEMENT),
            rdf_subject: uri(rdf::SUBJECT),
            rdf_predicate: uri(rdf::PREDICATE),
            rdf_object: uri(rdf::OBJECT),
        }
    }

    pub fn hierarchy(&self, predicate: NodeId) -> Option<Hierarchy> {
        if predicate == self.sub_class_of {
            Some(Hierarchy::Class)
        } else if predicate == self.sub_property_of {
            Some(Hierarchy::Property)
        } else {
            None
        }
    }

    pub fn hierarchy_predicate(&self, hierarchy: Hierarchy) -> NodeId {
        match hierarchy {
            Hierarchy::Class => self.sub_class_of,
            Hierarchy::Property => self.sub_property_of,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TripleRecord {
    key: TripleKey,
    /// `None` while the triple is not part of the store
    graphs: Option<GraphSetId>,
}

/// In-memory RDFS triple store
///
/// ```rust
/// use samyama_rdfs::rdf::{RdfType, TripleStore};
///
/// let mut store = TripleStore::new();
/// let person = store.new_class(None, "http://example.org/Person").unwrap();
/// let alice = store.new_individual(None, "http://example.org/alice", person).unwrap();
///
/// assert_eq!(store.node_type(person), Some(RdfType::Class));
/// assert_eq!(store.node_type(alice), Some(RdfType::Individual));
/// ```
pub struct TripleStore {
    id: StoreId,
    config: StoreConfig,
    nodes: NodeStore,
    triples: Vec<TripleRecord>,
    by_key: FxHashMap<TripleKey, TripleId>,
    graph_sets: GraphSetInterner,
    /// Named graph -> number of triple memberships
    graph_memberships: FxHashMap<NodeId, usize>,
    indexer: Box<dyn Indexer>,
    engine: TypeEngine,
    labels: Option<Box<dyn LabelManager>>,
    vocab: Vocabulary,
    default_graph: NodeId,
    prefixes: NamespaceManager,
    node_listeners: Registry<dyn NodeListener>,
    triple_listeners: Registry<dyn TripleListener>,
}

impl TripleStore {
    /// Empty store with the default configuration and a [`MemoryIndexer`]
    pub fn new() -> Self {
        let config = StoreConfig::default();
        let default_graph = NamedNode::new_unchecked(&config.default_graph);
        Self::assemble(config, default_graph, Box::new(MemoryIndexer::new()))
    }

    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        Self::with_indexer(config, Box::new(MemoryIndexer::new()))
    }

    /// Store answering pattern queries through `indexer`. The indexer must be
    /// empty; it is owned by this store from now on.
    pub fn with_indexer(config: StoreConfig, indexer: Box<dyn Indexer>) -> StoreResult<Self> {
        config.validate()?;
        let default_graph = config.default_graph_node()?;
        Ok(Self::assemble(config, default_graph, indexer))
    }

    fn assemble(config: StoreConfig, default_graph: NamedNode, indexer: Box<dyn Indexer>) -> Self {
        let id = StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed));
        let mut nodes = NodeStore::new(id);
        let vocab = Vocabulary::map(&mut nodes);
        let default_graph = nodes.map(default_graph.into());

        let mut prefixes = NamespaceManager::new();
        for (prefix, iri) in &config.prefixes {
            prefixes.add_prefix(prefix.clone(), iri.clone());
        }

        let labels: Option<Box<dyn LabelManager>> = if config.interval_labels {
            Some(Box::new(IntervalLabels::new()))
        } else {
            None
        };

        info!(store = %id, default_graph = %config.default_graph, "triple store created");

        let mut store = Self {
            id,
            engine: TypeEngine::new(config.trace_propagation),
            config,
            nodes,
            triples: Vec::new(),
            by_key: FxHashMap::default(),
            graph_sets: GraphSetInterner::new(),
            graph_memberships: FxHashMap::default(),
            indexer,
            labels,
            vocab,
            default_graph,
            prefixes,
            node_listeners: Registry::new(Channel::Node),
            triple_listeners: Registry::new(Channel::Triple),
        };
        store.refresh_labels();
        store
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn default_graph(&self) -> NodeId {
        self.default_graph
    }

    pub fn prefixes(&self) -> &NamespaceManager {
        &self.prefixes
    }

    pub fn prefixes_mut(&mut self) -> &mut NamespaceManager {
        &mut self.prefixes
    }

    pub(crate) fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    // ---- node mapping -------------------------------------------------

    /// Node for `term`; the same value always yields the same handle
    pub fn map(&mut self, term: impl Into<RdfTerm>) -> NodeId {
        self.nodes.map(term.into())
    }

    pub fn uri(&mut self, iri: &str) -> StoreResult<NodeId> {
        Ok(self.map(NamedNode::new(iri)?))
    }

    /// Node for a compact IRI such as `rdfs:Class`
    pub fn curie(&mut self, compact: &str) -> StoreResult<NodeId> {
        let iri = self.prefixes.expand(compact)?;
        self.uri(&iri)
    }

    pub fn literal(&mut self, value: &str) -> NodeId {
        self.map(Literal::new_simple_literal(value))
    }

    pub fn lang_literal(&mut self, value: &str, language: &str) -> StoreResult<NodeId> {
        Ok(self.map(Literal::new_language_tagged_literal(value, language)?))
    }

    pub fn typed_literal(&mut self, value: &str, datatype: &str) -> StoreResult<NodeId> {
        let datatype = NamedNode::new(datatype)?;
        Ok(self.map(Literal::new_typed_literal(value, datatype)))
    }

    /// Fresh blank node
    pub fn blank(&mut self) -> NodeId {
        self.map(BlankNode::new())
    }

    pub fn blank_with_id(&mut self, id: &str) -> StoreResult<NodeId> {
        Ok(self.map(BlankNode::from_id(id)?))
    }

    /// Node for `term` if it was ever mapped
    pub fn lookup(&self, term: &RdfTerm) -> Option<NodeId> {
        self.nodes.lookup(term)
    }

    pub fn owns(&self, node: NodeId) -> bool {
        self.nodes.owns(node)
    }

    pub fn term(&self, node: NodeId) -> Option<&RdfTerm> {
        self.owns(node).then(|| self.nodes.term(node))
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.owns(node).then(|| self.nodes.kind(node))
    }

    pub fn node_type(&self, node: NodeId) -> Option<RdfType> {
        self.internal_type(node).map(InternalType::public_type)
    }

    pub fn internal_type(&self, node: NodeId) -> Option<InternalType> {
        self.owns(node).then(|| self.nodes.internal_type(node))
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.owns(node) && self.nodes.is_active(node)
    }

    /// Typed view of a node
    pub fn node(&self, node: NodeId) -> StoreResult<RdfNode<'_>> {
        self.check_node(node)?;
        Ok(RdfNode::new(self, node))
    }

    /// Nodes referenced by at least one present triple
    pub fn active_nodes(&self) -> Vec<NodeId> {
        self.nodes.active().collect()
    }

    pub fn active_node_count(&self) -> usize {
        self.nodes.active_count()
    }

    // ---- adding -------------------------------------------------------

    /// Add `(s, p, o)` to `graph`, or to the default graph.
    ///
    /// Adding to a graph the triple already belongs to changes nothing. A
    /// [`StoreError::Contradiction`] means the triple was added but its
    /// typing was refused and rolled back.
    pub fn add(
        &mut self,
        graph: Option<NodeId>,
        subject: NodeId,
        predicate: NodeId,
        object: NodeId,
    ) -> StoreResult<TripleId> {
        if let Some(graph) = graph {
            self.check_node(graph)?;
        }
        self.check_node(subject)?;
        self.check_node(predicate)?;
        self.check_node(object)?;

        if self.nodes.kind(subject) == NodeKind::Literal {
            return Err(StoreError::LiteralSubject(subject));
        }
        if self.nodes.kind(predicate) != NodeKind::Resource {
            return Err(StoreError::InvalidPredicate(predicate));
        }
        let graph = self.ensure_graph(graph)?;

        let key = TripleKey::new(subject, predicate, object);
        let id = self.record_for(key);
        let current = self.triples[id.index as usize].graphs;
        if let Some(set) = current {
            if self.graph_sets.contains(set, graph) {
                return Ok(id);
            }
        }

        let newly_present = current.is_none();
        self.acquire(graph);
        if newly_present {
            self.acquire(subject);
            self.acquire(predicate);
            self.acquire(object);
        }

        let next = match current {
            Some(set) => self.graph_sets.with(set, graph),
            None => self.graph_sets.singleton(graph),
        };
        self.triples[id.index as usize].graphs = Some(next);
        *self.graph_memberships.entry(graph).or_insert(0) += 1;

        if newly_present {
            self.indexer.add(id, key, graph);
            if let Some(hierarchy) = self.vocab.hierarchy(predicate) {
                if let Some(labels) = self.labels.as_mut() {
                    labels.triple_added(hierarchy, &key);
                }
            }
        } else {
            self.indexer.add_in_named_graph(id, graph);
        }
        debug!(triple = %id, graph = %graph, new = newly_present, "triple added");

        let event = TripleEvent::Added {
            triple: id,
            key,
            graph,
        };
        self.triple_listeners.notify(|l| l.on_triple_event(&event));

        self.propagate(id)?;
        Ok(id)
    }

    /// Resolve `graph` (or the default graph) and type it as a named graph.
    ///
    /// Fails without touching any triple when the node is not a URI or its
    /// type cannot become NamedGraph.
    pub fn ensure_graph(&mut self, graph: Option<NodeId>) -> StoreResult<NodeId> {
        let graph = graph.unwrap_or(self.default_graph);
        self.check_node(graph)?;
        if self.nodes.kind(graph) != NodeKind::Resource {
            return Err(StoreError::InvalidGraph(graph));
        }
        self.force_type(graph, InternalType::NamedGraph)?;
        Ok(graph)
    }

    /// Fluent insertion
    pub fn adder(&mut self) -> TripleAdder<'_> {
        TripleAdder::new(self)
    }

    fn record_for(&mut self, key: TripleKey) -> TripleId {
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        let id = TripleId::new(self.id, self.triples.len() as u32);
        self.triples.push(TripleRecord { key, graphs: None });
        self.by_key.insert(key, id);
        id
    }

    // ---- typed constructors -------------------------------------------

    /// `iri rdf:type rdfs:Class`
    pub fn new_class(&mut self, graph: Option<NodeId>, iri: &str) -> StoreResult<NodeId> {
        let object = self.vocab.rdfs_class;
        self.typed_insert(graph, iri, self.vocab.rdf_type, object)
    }

    /// `iri rdf:type rdf:Property`
    pub fn new_property(&mut self, graph: Option<NodeId>, iri: &str) -> StoreResult<NodeId> {
        let object = self.vocab.rdf_property;
        self.typed_insert(graph, iri, self.vocab.rdf_type, object)
    }

    /// `iri rdfs:subClassOf rdfs:Class`
    pub fn new_metaclass(&mut self, graph: Option<NodeId>, iri: &str) -> StoreResult<NodeId> {
        let object = self.vocab.rdfs_class;
        self.typed_insert(graph, iri, self.vocab.sub_class_of, object)
    }

    /// `iri rdfs:subClassOf rdf:Property`
    pub fn new_metaproperty(&mut self, graph: Option<NodeId>, iri: &str) -> StoreResult<NodeId> {
        let object = self.vocab.rdf_property;
        self.typed_insert(graph, iri, self.vocab.sub_class_of, object)
    }

    /// `iri rdf:type class`
    pub fn new_individual(
        &mut self,
        graph: Option<NodeId>,
        iri: &str,
        class: NodeId,
    ) -> StoreResult<NodeId> {
        self.typed_insert(graph, iri, self.vocab.rdf_type, class)
    }

    /// `iri rdfs:subClassOf superclass`
    pub fn new_subclass(
        &mut self,
        graph: Option<NodeId>,
        iri: &str,
        superclass: NodeId,
    ) -> StoreResult<NodeId> {
        self.typed_insert(graph, iri, self.vocab.sub_class_of, superclass)
    }

    /// `iri rdfs:subPropertyOf superproperty`
    pub fn new_subproperty(
        &mut self,
        graph: Option<NodeId>,
        iri: &str,
        superproperty: NodeId,
    ) -> StoreResult<NodeId> {
        self.typed_insert(graph, iri, self.vocab.sub_property_of, superproperty)
    }

    /// `iri rdf:type rdf:Alt|Bag|Seq`
    pub fn new_container(
        &mut self,
        graph: Option<NodeId>,
        iri: &str,
        kind: ContainerKind,
    ) -> StoreResult<NodeId> {
        let class = self.map(NamedNode::new_unchecked(kind.class_iri()));
        self.typed_insert(graph, iri, self.vocab.rdf_type, class)
    }

    fn typed_insert(
        &mut self,
        graph: Option<NodeId>,
        iri: &str,
        predicate: NodeId,
        object: NodeId,
    ) -> StoreResult<NodeId> {
        let subject = self.uri(iri)?;
        self.add(graph, subject, predicate, object)?;
        Ok(subject)
    }

    // ---- deleting -----------------------------------------------------

    /// Remove a triple from every graph. Returns false if it was not present.
    /// Typing is left as it is; see [`TripleStore::retype_nodes`].
    pub fn delete(&mut self, triple: TripleId) -> StoreResult<bool> {
        self.check_triple(triple)?;
        let record = self.triples[triple.index as usize];
        let Some(set) = record.graphs else {
            return Ok(false);
        };
        let graphs = self.graph_sets.members(set).to_vec();

        self.release_triple_nodes(record.key);
        for graph in graphs {
            self.indexer.delete_from_named_graph(triple, graph);
            self.unlink(triple, graph);
        }
        if self.indexer.contains_triple(triple) {
            self.indexer.delete(triple);
        }
        self.hierarchy_deleted(record.key);
        debug!(triple = %triple, "triple deleted");
        Ok(true)
    }

    /// Remove a triple from one graph only
    pub fn delete_from_graph(&mut self, triple: TripleId, graph: NodeId) -> StoreResult<bool> {
        self.check_triple(triple)?;
        self.check_node(graph)?;
        let record = self.triples[triple.index as usize];
        let Some(set) = record.graphs else {
            return Ok(false);
        };
        if !self.graph_sets.contains(set, graph) {
            return Ok(false);
        }

        self.indexer.delete_from_named_graph(triple, graph);
        self.unlink(triple, graph);
        if self.triples[triple.index as usize].graphs.is_none() {
            if self.indexer.contains_triple(triple) {
                self.indexer.delete(triple);
            }
            self.release_triple_nodes(record.key);
            self.hierarchy_deleted(record.key);
        }
        Ok(true)
    }

    /// Delete several triples; ownership of all of them is checked first
    pub fn delete_all<I>(&mut self, triples: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = TripleId>,
    {
        let triples: Vec<TripleId> = triples.into_iter().collect();
        for &triple in &triples {
            self.check_triple(triple)?;
        }
        let mut deleted = 0;
        for triple in triples {
            if self.delete(triple)? {
                deleted += 1;
            }
        }
        info!(deleted, "bulk delete");
        Ok(deleted)
    }

    /// Delete every membership matching `pattern`; with the graph slot
    /// pinned only that graph loses the triple. Returns the number of
    /// memberships removed.
    pub fn delete_matching(&mut self, pattern: &Pattern) -> StoreResult<usize> {
        self.check_pattern(pattern)?;

        let mut removals: Vec<(TripleId, Removal)> = Vec::new();
        self.indexer
            .delete_triples(pattern, &mut |triple: TripleId, removal: Removal| {
                removals.push((triple, removal))
            });

        let mut memberships = 0;
        for (triple, removal) in removals {
            match removal {
                Removal::FromGraph(graph) => {
                    self.unlink(triple, graph);
                    memberships += 1;
                }
                Removal::Fully => {
                    let key = self.triples[triple.index as usize].key;
                    self.release_triple_nodes(key);
                    self.hierarchy_deleted(key);
                }
            }
        }
        info!(memberships, "pattern delete");
        Ok(memberships)
    }

    /// Drop one graph membership from the store's own bookkeeping
    fn unlink(&mut self, triple: TripleId, graph: NodeId) {
        let record = &mut self.triples[triple.index as usize];
        let Some(set) = record.graphs else {
            return;
        };
        record.graphs = self.graph_sets.without(set, graph);
        let key = record.key;

        if let Some(count) = self.graph_memberships.get_mut(&graph) {
            *count -= 1;
            if *count == 0 {
                self.graph_memberships.remove(&graph);
            }
        }
        self.release(graph);

        let event = TripleEvent::Deleted { triple, key, graph };
        self.triple_listeners.notify(|l| l.on_triple_event(&event));
    }

    fn release_triple_nodes(&mut self, key: TripleKey) {
        self.release(key.subject);
        self.release(key.predicate);
        self.release(key.object);
    }

    fn hierarchy_deleted(&mut self, key: TripleKey) {
        if let Some(hierarchy) = self.vocab.hierarchy(key.predicate) {
            if let Some(labels) = self.labels.as_mut() {
                labels.triple_deleted(hierarchy, &key);
            }
        }
    }

    // ---- querying -----------------------------------------------------

    /// Triples matching `pattern`, each reported once
    pub fn find(&self, pattern: &Pattern) -> Vec<TripleId> {
        if self.check_pattern(pattern).is_err() {
            return Vec::new();
        }
        self.indexer.find_triples(pattern)
    }

    /// Fluent pattern construction
    pub fn pattern(&self) -> PatternBuilder<'_> {
        PatternBuilder::new(self)
    }

    /// Present triple with exactly these nodes
    pub fn find_triple(&self, subject: NodeId, predicate: NodeId, object: NodeId) -> Option<TripleId> {
        let id = *self.by_key.get(&TripleKey::new(subject, predicate, object))?;
        self.triples[id.index as usize].graphs.map(|_| id)
    }

    pub fn contains(&self, subject: NodeId, predicate: NodeId, object: NodeId) -> bool {
        self.find_triple(subject, predicate, object).is_some()
    }

    /// Snapshot of a present triple
    pub fn triple(&self, id: TripleId) -> Option<Triple> {
        if id.store != self.id {
            return None;
        }
        let record = self.triples.get(id.index as usize)?;
        let graphs = self.graph_sets.shared(record.graphs?)?;
        Some(Triple {
            id,
            subject: record.key.subject,
            predicate: record.key.predicate,
            object: record.key.object,
            graphs,
        })
    }

    /// Key of any triple this store ever minted, present or not
    pub fn key(&self, id: TripleId) -> Option<TripleKey> {
        if id.store != self.id {
            return None;
        }
        self.triples.get(id.index as usize).map(|r| r.key)
    }

    pub fn graphs_of(&self, id: TripleId) -> Vec<NodeId> {
        if id.store != self.id {
            return Vec::new();
        }
        self.triples
            .get(id.index as usize)
            .and_then(|r| r.graphs)
            .map(|set| self.graph_sets.members(set).to_vec())
            .unwrap_or_default()
    }

    pub fn is_present(&self, id: TripleId) -> bool {
        self.triple(id).is_some()
    }

    pub fn triple_count(&self) -> usize {
        self.indexer.triple_count()
    }

    /// Graphs holding at least one triple
    pub fn named_graphs(&self) -> Vec<NodeId> {
        let mut graphs: Vec<NodeId> = self.graph_memberships.keys().copied().collect();
        graphs.sort_unstable();
        graphs
    }

    /// Distinct graph combinations currently in use
    pub fn graph_set_count(&self) -> usize {
        self.graph_sets.len()
    }

    /// Active nodes of a public type
    pub fn nodes_of_type(&self, ty: RdfType) -> Vec<NodeId> {
        self.indexer.find(ty)
    }

    pub fn nodes_of_type_in_namespace(&self, ty: RdfType, namespace: &str) -> Vec<NodeId> {
        self.indexer.find_in_namespace(ty, namespace)
    }

    /// Namespace parts of all active schema-typed resources, sorted
    pub fn namespaces(&self) -> Vec<String> {
        self.indexer.namespaces()
    }

    /// `(child, parent)` pairs of every present hierarchy triple
    pub fn hierarchy_edges(&self, hierarchy: Hierarchy) -> Vec<(NodeId, NodeId)> {
        let pattern = Pattern {
            predicate: Some(self.vocab.hierarchy_predicate(hierarchy)),
            ..Pattern::any()
        };
        self.indexer
            .find_triples(&pattern)
            .into_iter()
            .map(|id| {
                let key = self.triples[id.index as usize].key;
                (key.subject, key.object)
            })
            .collect()
    }

    /// Objects of `subject predicate ?o`
    pub(crate) fn objects(&self, subject: NodeId, predicate: NodeId) -> Vec<NodeId> {
        self.project(
            Pattern {
                subject: Some(subject),
                predicate: Some(predicate),
                ..Pattern::any()
            },
            |key| key.object,
        )
    }

    /// Subjects of `?s predicate object`
    pub(crate) fn subjects(&self, predicate: NodeId, object: NodeId) -> Vec<NodeId> {
        self.project(
            Pattern {
                predicate: Some(predicate),
                object: Some(object),
                ..Pattern::any()
            },
            |key| key.subject,
        )
    }

    pub(crate) fn project(&self, pattern: Pattern, pick: impl Fn(&TripleKey) -> NodeId) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .indexer
            .find_triples(&pattern)
            .into_iter()
            .map(|id| pick(&self.triples[id.index as usize].key))
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    // ---- inference ----------------------------------------------------

    /// Whether `(s, p, o)` is asserted or follows from the subClassOf,
    /// subPropertyOf and rdf:type hierarchies
    pub fn is_inferable(&self, subject: NodeId, predicate: NodeId, object: NodeId) -> StoreResult<bool> {
        self.check_node(subject)?;
        self.check_node(predicate)?;
        self.check_node(object)?;

        if self.contains(subject, predicate, object) {
            return Ok(true);
        }

        let reach = HierarchyReach::new(self);

        if let Some(hierarchy) = self.vocab.hierarchy(predicate) {
            let descends = if subject == object {
                reach.graph(hierarchy).reaches_strictly(subject, object)
            } else {
                reach.reaches(hierarchy, subject, object)
            };
            if descends {
                return Ok(true);
            }
        }

        if predicate == self.vocab.rdf_type {
            let typed = self
                .objects(subject, self.vocab.rdf_type)
                .into_iter()
                .any(|class| reach.reaches(Hierarchy::Class, class, object));
            if typed {
                return Ok(true);
            }
        }

        let between = self.project(
            Pattern {
                subject: Some(subject),
                object: Some(object),
                ..Pattern::any()
            },
            |key| key.predicate,
        );
        Ok(between
            .into_iter()
            .any(|q| q != predicate && reach.reaches(Hierarchy::Property, q, predicate)))
    }

    // ---- retyping -----------------------------------------------------

    /// Reset every active node to its default type and replay typing over
    /// every present triple. Deletion keeps typing valid but not minimal;
    /// this restores the minimal typing. Contradictions met on the way are
    /// returned, not raised.
    pub fn retype_nodes(&mut self) -> Vec<TypeContradiction> {
        let active: Vec<NodeId> = self.nodes.active().collect();
        let before: Vec<(NodeId, InternalType)> = active
            .iter()
            .map(|&node| (node, self.nodes.internal_type(node)))
            .collect();
        for &node in &active {
            self.nodes.reset_type(node);
        }

        let engine = self.engine.clone();
        let mut contradictions = Vec::new();
        for graph in self.named_graphs() {
            let mut view = self.type_graph();
            if let Err(c) = engine.force(&mut view, graph, InternalType::NamedGraph) {
                contradictions.push(c);
            }
        }
        let present: Vec<TripleId> = self.indexer.find_triples(&Pattern::any());
        for triple in &present {
            let mut view = self.type_graph();
            if let Err(c) = engine.propagate(&mut view, *triple) {
                contradictions.push(c);
            }
        }

        let transitions: Vec<TypeTransition> = before
            .into_iter()
            .filter_map(|(node, from)| {
                let to = self.nodes.internal_type(node);
                (from != to).then_some(TypeTransition { node, from, to })
            })
            .collect();
        info!(
            triples = present.len(),
            changed = transitions.len(),
            contradictions = contradictions.len(),
            "nodes retyped"
        );
        self.publish(&transitions);
        contradictions
    }

    // ---- labels -------------------------------------------------------

    /// Attach an ancestor oracle and compute its labels
    pub fn attach_labels(&mut self, mut labels: Box<dyn LabelManager>) -> StoreResult<()> {
        if let Some(bound) = labels.target_store() {
            if bound != self.id {
                return Err(StoreError::ForeignLabels {
                    bound,
                    store: self.id,
                });
            }
        }
        labels.update_labels(self);
        self.labels = Some(labels);
        Ok(())
    }

    pub fn detach_labels(&mut self) -> Option<Box<dyn LabelManager>> {
        self.labels.take()
    }

    /// Attached labels, whether or not they are current
    pub fn labels(&self) -> Option<&dyn LabelManager> {
        self.labels.as_deref()
    }

    /// Recompute attached labels that went stale
    pub fn refresh_labels(&mut self) {
        let Some(mut labels) = self.labels.take() else {
            return;
        };
        if !labels.labels_available() {
            labels.update_labels(self);
        }
        self.labels = Some(labels);
    }

    // ---- listeners ----------------------------------------------------

    /// Register for type changes, activations and retirements. Only a weak
    /// reference is kept.
    pub fn subscribe_nodes<L: NodeListener + 'static>(&mut self, listener: &Arc<L>) -> Subscription {
        let weak: Weak<dyn NodeListener> = Arc::downgrade(listener) as Weak<L>;
        self.node_listeners.subscribe(weak)
    }

    /// Register for per-graph additions and deletions. Only a weak
    /// reference is kept.
    pub fn subscribe_triples<L: TripleListener + 'static>(&mut self, listener: &Arc<L>) -> Subscription {
        let weak: Weak<dyn TripleListener> = Arc::downgrade(listener) as Weak<L>;
        self.triple_listeners.subscribe(weak)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        match subscription.channel() {
            Channel::Node => self.node_listeners.unsubscribe(subscription),
            Channel::Triple => self.triple_listeners.unsubscribe(subscription),
        }
    }

    // ---- internals ----------------------------------------------------

    fn check_node(&self, node: NodeId) -> StoreResult<()> {
        if self.nodes.owns(node) {
            Ok(())
        } else {
            Err(StoreError::ForeignNode {
                node,
                store: self.id,
            })
        }
    }

    fn check_triple(&self, triple: TripleId) -> StoreResult<()> {
        if triple.store == self.id && (triple.index as usize) < self.triples.len() {
            Ok(())
        } else {
            Err(StoreError::ForeignTriple {
                triple,
                store: self.id,
            })
        }
    }

    fn check_pattern(&self, pattern: &Pattern) -> StoreResult<()> {
        [pattern.graph, pattern.subject, pattern.predicate, pattern.object]
            .into_iter()
            .flatten()
            .try_for_each(|node| self.check_node(node))
    }

    fn acquire(&mut self, node: NodeId) {
        if self.nodes.acquire(node) == Activation::Activated {
            self.indexer.index_node(
                NodeDescriptor {
                    id: node,
                    term: self.nodes.term(node),
                    ty: self.nodes.internal_type(node).public_type(),
                },
                NodeChange::Activated,
            );
            let event = NodeEvent::Activated { node };
            self.node_listeners.notify(|l| l.on_node_event(&event));
        }
    }

    fn release(&mut self, node: NodeId) {
        if self.nodes.release(node) == Activation::Retired {
            self.indexer.index_node(
                NodeDescriptor {
                    id: node,
                    term: self.nodes.term(node),
                    ty: self.nodes.internal_type(node).public_type(),
                },
                NodeChange::Retired,
            );
            let event = NodeEvent::Retired { node };
            self.node_listeners.notify(|l| l.on_node_event(&event));
        }
    }

    fn type_graph(&mut self) -> StoreTypeGraph<'_> {
        StoreTypeGraph {
            nodes: &mut self.nodes,
            triples: &self.triples,
            indexer: self.indexer.as_ref(),
        }
    }

    fn propagate(&mut self, triple: TripleId) -> StoreResult<()> {
        let engine = self.engine.clone();
        let mut view = self.type_graph();
        match engine.propagate(&mut view, triple) {
            Ok(transitions) => {
                self.publish(&transitions);
                Ok(())
            }
            Err(contradiction) => {
                warn!(triple = %triple, %contradiction, "typing refused, changes rolled back");
                Err(contradiction.into())
            }
        }
    }

    fn force_type(&mut self, node: NodeId, target: InternalType) -> StoreResult<()> {
        let engine = self.engine.clone();
        let mut view = self.type_graph();
        match engine.force(&mut view, node, target) {
            Ok(transitions) => {
                self.publish(&transitions);
                Ok(())
            }
            Err(contradiction) => {
                warn!(node = %node, %contradiction, "forced type refused");
                Err(contradiction.into())
            }
        }
    }

    /// Tell the indexer and node listeners about net type changes
    fn publish(&mut self, transitions: &[TypeTransition]) {
        for transition in transitions {
            let (from, to) = (transition.from.public_type(), transition.to.public_type());
            if from != to && self.nodes.is_active(transition.node) {
                self.indexer.index_node(
                    NodeDescriptor {
                        id: transition.node,
                        term: self.nodes.term(transition.node),
                        ty: to,
                    },
                    NodeChange::Retyped { from },
                );
            }
            let event = NodeEvent::TypeChanged {
                node: transition.node,
                from: transition.from,
                to: transition.to,
            };
            self.node_listeners.notify(|l| l.on_node_event(&event));
        }
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripleStore")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("active_nodes", &self.nodes.active_count())
            .field("triples", &self.indexer.triple_count())
            .field("graph_sets", &self.graph_sets.len())
            .field("node_listeners", &self.node_listeners)
            .field("triple_listeners", &self.triple_listeners)
            .finish()
    }
}

/// Split borrow of the store handed to the type engine
struct StoreTypeGraph<'s> {
    nodes: &'s mut NodeStore,
    triples: &'s [TripleRecord],
    indexer: &'s dyn Indexer,
}

impl TypeGraph for StoreTypeGraph<'_> {
    fn node_type(&self, node: NodeId) -> InternalType {
        self.nodes.internal_type(node)
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.nodes.kind(node)
    }

    fn set_node_type(&mut self, node: NodeId, ty: InternalType) {
        self.nodes.set_internal_type(node, ty);
    }

    fn triple_key(&self, triple: TripleId) -> TripleKey {
        self.triples[triple.index as usize].key
    }

    fn triples_touching(&self, node: NodeId) -> Vec<TripleId> {
        let as_subject = Pattern {
            subject: Some(node),
            ..Pattern::any()
        };
        let as_object = Pattern {
            object: Some(node),
            ..Pattern::any()
        };
        let mut touching = self.indexer.find_triples(&as_subject);
        touching.extend(self.indexer.find_triples(&as_object));
        let mut seen = FxHashSet::default();
        touching.retain(|id| seen.insert(*id));
        touching
    }
}

/// Hierarchy reachability for one query: the attached labels when they are
/// current, otherwise a closure built on the spot
pub(crate) struct HierarchyReach<'s> {
    store: &'s TripleStore,
    classes: std::cell::OnceCell<HierarchyGraph>,
    properties: std::cell::OnceCell<HierarchyGraph>,
}

impl<'s> HierarchyReach<'s> {
    pub(crate) fn new(store: &'s TripleStore) -> Self {
        Self {
            store,
            classes: std::cell::OnceCell::new(),
            properties: std::cell::OnceCell::new(),
        }
    }

    /// `from` equals `to` or descends from it
    pub(crate) fn reaches(&self, hierarchy: Hierarchy, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        if let Some(labels) = self.store.labels().filter(|l| l.labels_available()) {
            return labels.is_ancestor(hierarchy, to, from);
        }
        self.graph(hierarchy).reaches(from, to)
    }

    pub(crate) fn graph(&self, hierarchy: Hierarchy) -> &HierarchyGraph {
        let cell = match hierarchy {
            Hierarchy::Class => &self.classes,
            Hierarchy::Property => &self.properties,
        };
        cell.get_or_init(|| HierarchyGraph::from_edges(self.store.hierarchy_edges(hierarchy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(iris: &[&str]) -> (TripleStore, Vec<NodeId>) {
        let mut store = TripleStore::new();
        let nodes = iris
            .iter()
            .map(|iri| store.uri(&format!("http://example.org/{iri}")).unwrap())
            .collect();
        (store, nodes)
    }

    #[test]
    fn test_add_is_idempotent_per_graph() {
        let (mut store, n) = store_with(&["s", "p", "o", "g1", "g2"]);
        let t1 = store.add(Some(n[3]), n[0], n[1], n[2]).unwrap();
        let again = store.add(Some(n[3]), n[0], n[1], n[2]).unwrap();
        assert_eq!(t1, again);
        assert_eq!(store.nodes.refs(n[0]), 1);

        let t2 = store.add(Some(n[4]), n[0], n[1], n[2]).unwrap();
        assert_eq!(t1, t2);
        assert_eq!(store.graphs_of(t1), vec![n[3], n[4]]);
        assert_eq!(store.find(&Pattern::any()), vec![t1]);
        // subject counted once per triple, graphs once per membership
        assert_eq!(store.nodes.refs(n[0]), 1);
        assert_eq!(store.nodes.refs(n[3]), 1);
    }

    #[test]
    fn test_structural_misuse_rejected() {
        let (mut store, n) = store_with(&["s", "p"]);
        let lit = store.literal("x");
        let blank = store.blank();

        assert!(matches!(store.add(None, lit, n[1], n[0]), Err(StoreError::LiteralSubject(_))));
        assert!(matches!(store.add(None, n[0], blank, n[0]), Err(StoreError::InvalidPredicate(_))));
        assert!(matches!(store.add(Some(lit), n[0], n[1], n[0]), Err(StoreError::InvalidGraph(_))));
        assert_eq!(store.triple_count(), 0);
    }

    #[test]
    fn test_foreign_nodes_rejected_before_mutation() {
        let (mut store, n) = store_with(&["s", "p", "o"]);
        let mut other = TripleStore::new();
        let foreign = other.uri("http://example.org/s").unwrap();

        let err = store.add(None, foreign, n[1], n[2]).unwrap_err();
        assert!(matches!(err, StoreError::ForeignNode { node, .. } if node == foreign));
        assert_eq!(store.triple_count(), 0);
        assert_eq!(store.active_node_count(), 0);
    }

    #[test]
    fn test_graph_is_forced_to_named_graph() {
        let (mut store, n) = store_with(&["s", "p", "o", "g"]);
        store.add(Some(n[3]), n[0], n[1], n[2]).unwrap();
        assert_eq!(store.node_type(n[3]), Some(RdfType::NamedGraph));
        assert_eq!(store.node_type(store.default_graph()), Some(RdfType::Unknown));

        // a class cannot name a graph
        let class = store.new_class(None, "http://example.org/C").unwrap();
        let err = store.add(Some(class), n[0], n[1], n[2]).unwrap_err();
        assert!(err.contradiction().is_some());
        assert_eq!(store.graphs_of(store.find_triple(n[0], n[1], n[2]).unwrap()), vec![n[3]]);
    }

    #[test]
    fn test_delete_from_one_graph() {
        let (mut store, n) = store_with(&["s", "p", "o", "g1", "g2"]);
        let t = store.add(Some(n[3]), n[0], n[1], n[2]).unwrap();
        store.add(Some(n[4]), n[0], n[1], n[2]).unwrap();

        assert!(store.delete_from_graph(t, n[3]).unwrap());
        assert!(!store.delete_from_graph(t, n[3]).unwrap());
        assert_eq!(store.graphs_of(t), vec![n[4]]);
        assert!(store.is_active(n[0]));
        assert!(!store.is_active(n[3]));

        assert!(store.delete_from_graph(t, n[4]).unwrap());
        assert!(!store.is_present(t));
        assert!(!store.is_active(n[0]));
        assert_eq!(store.triple_count(), 0);
        assert_eq!(store.graph_set_count(), 0);
    }

    #[test]
    fn test_delete_matching_with_pinned_graph() {
        let (mut store, n) = store_with(&["a", "b", "p", "g1", "g2"]);
        let t1 = store.add(Some(n[3]), n[0], n[2], n[1]).unwrap();
        store.add(Some(n[4]), n[0], n[2], n[1]).unwrap();
        let t2 = store.add(Some(n[3]), n[1], n[2], n[0]).unwrap();

        let pattern = store.pattern().graph(n[3]).unwrap().build();
        assert_eq!(store.delete_matching(&pattern).unwrap(), 2);

        assert_eq!(store.graphs_of(t1), vec![n[4]]);
        assert!(!store.is_present(t2));
        assert_eq!(store.named_graphs(), vec![n[4]]);
        assert_eq!(store.triple_count(), 1);
    }

    #[test]
    fn test_triple_id_reused_after_delete() {
        let (mut store, n) = store_with(&["s", "p", "o"]);
        let t = store.add(None, n[0], n[1], n[2]).unwrap();
        assert!(store.delete(t).unwrap());
        assert!(!store.delete(t).unwrap());
        assert_eq!(store.add(None, n[0], n[1], n[2]).unwrap(), t);
    }

    #[test]
    fn test_labels_must_target_this_store() {
        let mut first = TripleStore::new();
        let mut second = TripleStore::new();
        let mut labels = IntervalLabels::new();
        labels.update_labels(&first);

        let err = second.attach_labels(Box::new(labels.clone())).unwrap_err();
        assert!(matches!(err, StoreError::ForeignLabels { .. }));
        assert!(first.attach_labels(Box::new(labels)).is_ok());
        assert!(first.labels().is_some_and(|l| l.labels_available()));
    }
}
