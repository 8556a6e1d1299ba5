//! RDFS node typing
//!
//! Every node carries an [`InternalType`]. Adding a triple may force the types
//! of its subject, predicate and object further up a small lattice; each change
//! in turn makes every triple touching the changed node eligible for another
//! look. [`TypeEngine`] runs that propagation to a fixed point and undoes all
//! of it when a contradiction is hit.
//!
//! The lattice:
//!
//! ```text
//! UNKNOWN     -> anything
//! CLASS       -> PROPERTY | METACLASS | METAPROPERTY
//! PROPERTY    -> METAPROPERTY
//! METACLASS   -> METAPROPERTY
//! INDIVIDUAL  -> anything but LITERAL / XML_TYPE
//! everything else is terminal
//! ```

use super::namespace::{rdf, rdfg, rdfs, RDFS_NS, RDF_NS, XSD_NS};
use super::types::{NodeId, NodeKind, RdfTerm, RdfType, TripleId, TripleKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Implementation-level node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternalType {
    Unknown,
    Class,
    Property,
    Metaclass,
    Metaproperty,
    Individual,
    Alt,
    Bag,
    Seq,
    NamedGraph,
    XmlType,
    Literal,

    /// rdfs:Resource
    ResourceClass,
    /// rdfs:Class
    ClassClass,
    /// rdf:Property
    PropertyClass,
    /// rdf:Statement
    StatementClass,
    /// rdf:Alt
    AltClass,
    /// rdf:Bag
    BagClass,
    /// rdf:Seq
    SeqClass,
    /// rdfg:Graph
    GraphClass,

    /// rdf:type
    TypePredicate,
    /// rdfs:subClassOf
    SubClassOfPredicate,
    /// rdfs:subPropertyOf
    SubPropertyOfPredicate,
    /// rdfs:domain
    DomainPredicate,
    /// rdfs:range
    RangePredicate,
}

impl InternalType {
    pub fn public_type(self) -> RdfType {
        use InternalType::*;
        match self {
            Unknown => RdfType::Unknown,
            Class | ResourceClass | StatementClass | AltClass | BagClass | SeqClass | GraphClass => {
                RdfType::Class
            }
            Property | TypePredicate | SubClassOfPredicate | SubPropertyOfPredicate
            | DomainPredicate | RangePredicate => RdfType::Property,
            Metaclass | ClassClass => RdfType::Metaclass,
            Metaproperty | PropertyClass => RdfType::Metaproperty,
            Individual => RdfType::Individual,
            Alt => RdfType::Alt,
            Bag => RdfType::Bag,
            Seq => RdfType::Seq,
            NamedGraph => RdfType::NamedGraph,
            XmlType => RdfType::XmlType,
            Literal => RdfType::Literal,
        }
    }

    /// Vocabulary constants and predicate markers never change
    pub fn is_constant(self) -> bool {
        use InternalType::*;
        matches!(
            self,
            ResourceClass
                | ClassClass
                | PropertyClass
                | StatementClass
                | AltClass
                | BagClass
                | SeqClass
                | GraphClass
                | TypePredicate
                | SubClassOfPredicate
                | SubPropertyOfPredicate
                | DomainPredicate
                | RangePredicate
        )
    }

    /// Single legal direct transition. Identity is not a transition.
    pub fn can_become(self, target: InternalType) -> bool {
        use InternalType::*;
        if target == self || target == Unknown || target.is_constant() {
            return false;
        }
        match self {
            Unknown => true,
            Class => matches!(target, Property | Metaclass | Metaproperty),
            Property | Metaclass => target == Metaproperty,
            Individual => !matches!(target, Literal | XmlType),
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        use InternalType::*;
        ![Unknown, Class, Property, Metaclass, Individual].contains(&self)
    }

    /// Type a node starts with before any triple has touched it
    pub fn default_for(term: &RdfTerm) -> Self {
        match term {
            RdfTerm::NamedNode(node) => Self::default_for_uri(node.as_str()),
            RdfTerm::BlankNode(_) => InternalType::Unknown,
            RdfTerm::Literal(_) => InternalType::Literal,
        }
    }

    fn default_for_uri(uri: &str) -> Self {
        use InternalType::*;
        match uri {
            rdfs::CLASS => return ClassClass,
            rdfs::RESOURCE => return ResourceClass,
            rdfs::SUB_CLASS_OF => return SubClassOfPredicate,
            rdfs::SUB_PROPERTY_OF => return SubPropertyOfPredicate,
            rdfs::DOMAIN => return DomainPredicate,
            rdfs::RANGE => return RangePredicate,
            rdf::TYPE => return TypePredicate,
            rdf::STATEMENT => return StatementClass,
            rdf::PROPERTY => return PropertyClass,
            rdf::ALT => return AltClass,
            rdf::BAG => return BagClass,
            rdf::SEQ => return SeqClass,
            rdfg::GRAPH => return GraphClass,
            _ => {}
        }

        let local = uri
            .strip_prefix(RDF_NS)
            .or_else(|| uri.strip_prefix(RDFS_NS));
        if let Some(local) = local {
            return if local.starts_with(|c: char| c.is_uppercase()) {
                Metaclass
            } else {
                Property
            };
        }
        if uri.starts_with(XSD_NS) {
            return XmlType;
        }
        Unknown
    }
}

impl fmt::Display for InternalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            write!(f, "{} ({:?})", self.public_type(), self)
        } else {
            write!(f, "{}", self.public_type())
        }
    }
}

/// One step of a propagation run, linked to the change that caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeChange {
    pub node: NodeId,
    pub from: InternalType,
    pub to: InternalType,
    /// Triple whose rule produced the change; `None` for a direct promotion
    pub triple: Option<TripleId>,
    pub cause: Option<Box<TypeChange>>,
}

impl TypeChange {
    /// This change followed by its causes, innermost first
    pub fn chain(&self) -> impl Iterator<Item = &TypeChange> {
        std::iter::successors(Some(self), |change| change.cause.as_deref())
    }
}

impl fmt::Display for TypeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.node, self.from, self.to)?;
        if let Some(triple) = self.triple {
            write!(f, " via {}", triple)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ", caused by {}", cause)?;
        }
        Ok(())
    }
}

/// A run hit a transition the lattice forbids. `attempt` is the rejected
/// change; its cause chain leads back to the triple that started the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("type contradiction: {attempt}")]
pub struct TypeContradiction {
    pub attempt: TypeChange,
}

impl TypeContradiction {
    pub fn node(&self) -> NodeId {
        self.attempt.node
    }

    pub fn chain(&self) -> impl Iterator<Item = &TypeChange> {
        self.attempt.chain()
    }

    /// Triple that started the run, when there was one
    pub fn root_triple(&self) -> Option<TripleId> {
        self.chain().last().and_then(|change| change.triple)
    }
}

/// Net effect of a successful run on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeTransition {
    pub node: NodeId,
    pub from: InternalType,
    pub to: InternalType,
}

/// What the engine needs to see of a store
pub trait TypeGraph {
    fn node_type(&self, node: NodeId) -> InternalType;
    fn node_kind(&self, node: NodeId) -> NodeKind;
    fn set_node_type(&mut self, node: NodeId, ty: InternalType);
    fn triple_key(&self, triple: TripleId) -> TripleKey;
    /// Triples with `node` as subject or object
    fn triples_touching(&self, node: NodeId) -> Vec<TripleId>;
}

/// Fixed-point type propagation with rollback
#[derive(Debug, Clone, Default)]
pub struct TypeEngine {
    trace: bool,
}

impl TypeEngine {
    pub fn new(trace: bool) -> Self {
        Self { trace }
    }

    /// Apply the typing rules of `triple` and everything they set off
    pub fn propagate<G: TypeGraph + ?Sized>(
        &self,
        graph: &mut G,
        triple: TripleId,
    ) -> Result<Vec<TypeTransition>, TypeContradiction> {
        let mut run = Run::new(graph, self.trace);
        run.revisits.push_back(Revisit { triple, cause: None });
        run.finish()
    }

    /// Force `node` to `target` with no triggering triple
    pub fn force<G: TypeGraph + ?Sized>(
        &self,
        graph: &mut G,
        node: NodeId,
        target: InternalType,
    ) -> Result<Vec<TypeTransition>, TypeContradiction> {
        let mut run = Run::new(graph, self.trace);
        run.changes.push_back(PendingChange {
            node,
            target,
            forcing: true,
            triple: None,
            parent: None,
        });
        run.finish()
    }
}

struct PendingChange {
    node: NodeId,
    target: InternalType,
    /// Non-forcing changes are dropped instead of failing when illegal
    forcing: bool,
    triple: Option<TripleId>,
    parent: Option<usize>,
}

struct Revisit {
    triple: TripleId,
    /// Index into `Run::committed` of the change that queued this triple
    cause: Option<usize>,
}

struct Committed {
    node: NodeId,
    from: InternalType,
    to: InternalType,
    triple: Option<TripleId>,
    parent: Option<usize>,
}

#[derive(Clone, Copy)]
struct Cause {
    triple: TripleId,
    parent: Option<usize>,
}

struct Run<'g, G: TypeGraph + ?Sized> {
    graph: &'g mut G,
    trace: bool,
    changes: VecDeque<PendingChange>,
    revisits: VecDeque<Revisit>,
    /// First type each touched node had in this run, in commit order
    snapshots: IndexMap<NodeId, InternalType>,
    committed: Vec<Committed>,
}

impl<'g, G: TypeGraph + ?Sized> Run<'g, G> {
    fn new(graph: &'g mut G, trace: bool) -> Self {
        Self {
            graph,
            trace,
            changes: VecDeque::new(),
            revisits: VecDeque::new(),
            snapshots: IndexMap::new(),
            committed: Vec::new(),
        }
    }

    fn finish(mut self) -> Result<Vec<TypeTransition>, TypeContradiction> {
        match self.drive() {
            Ok(()) => Ok(self.transitions()),
            Err(contradiction) => {
                self.rollback();
                Err(contradiction)
            }
        }
    }

    fn drive(&mut self) -> Result<(), TypeContradiction> {
        loop {
            while let Some(change) = self.changes.pop_front() {
                self.apply(change)?;
            }
            let Some(revisit) = self.revisits.pop_front() else {
                return Ok(());
            };
            self.dispatch(revisit)?;
        }
    }

    fn apply(&mut self, change: PendingChange) -> Result<(), TypeContradiction> {
        let current = self.graph.node_type(change.node);
        if current.public_type() == change.target.public_type() {
            return Ok(());
        }

        let legal = current.can_become(change.target)
            && change
                .target
                .public_type()
                .is_possible_for(self.graph.node_kind(change.node));
        if !legal {
            if !change.forcing {
                return Ok(());
            }
            return Err(self.contradiction(
                change.node,
                current,
                change.target,
                change.triple,
                change.parent,
            ));
        }

        self.snapshots.entry(change.node).or_insert(current);
        self.graph.set_node_type(change.node, change.target);
        if self.trace {
            trace!(node = %change.node, from = %current, to = %change.target, "type change");
        }

        let index = self.committed.len();
        self.committed.push(Committed {
            node: change.node,
            from: current,
            to: change.target,
            triple: change.triple,
            parent: change.parent,
        });
        for triple in self.graph.triples_touching(change.node) {
            self.revisits.push_back(Revisit {
                triple,
                cause: Some(index),
            });
        }
        Ok(())
    }

    fn dispatch(&mut self, revisit: Revisit) -> Result<(), TypeContradiction> {
        use InternalType::*;

        let key = self.graph.triple_key(revisit.triple);
        let cause = Cause {
            triple: revisit.triple,
            parent: revisit.cause,
        };
        let predicate_type = self.graph.node_type(key.predicate);

        if matches!(
            predicate_type.public_type(),
            RdfType::Alt
                | RdfType::Bag
                | RdfType::Seq
                | RdfType::NamedGraph
                | RdfType::XmlType
                | RdfType::Literal
                | RdfType::Metaclass
                | RdfType::Metaproperty
        ) {
            return Err(self.contradiction(
                key.predicate,
                predicate_type,
                Property,
                Some(cause.triple),
                cause.parent,
            ));
        }
        self.force(key.predicate, Property, cause);

        match predicate_type {
            SubClassOfPredicate => {
                let s = self.graph.node_type(key.subject).public_type();
                let o = self.graph.node_type(key.object).public_type();
                let target = if s == RdfType::Metaproperty || o == RdfType::Metaproperty {
                    Metaproperty
                } else if s == RdfType::Metaclass || o == RdfType::Metaclass {
                    Metaclass
                } else {
                    Class
                };
                self.force(key.subject, target, cause);
                self.force(key.object, target, cause);
            }
            SubPropertyOfPredicate => {
                self.force(key.subject, Property, cause);
                self.force(key.object, Property, cause);
            }
            DomainPredicate | RangePredicate => {
                self.force(key.subject, Property, cause);
                let o = self.graph.node_type(key.object).public_type();
                if !matches!(
                    o,
                    RdfType::Class | RdfType::Metaclass | RdfType::Metaproperty | RdfType::XmlType
                ) {
                    self.force(key.object, Class, cause);
                }
            }
            TypePredicate => self.type_rule(key, cause)?,
            _ => {
                self.promote(key.subject, Individual, cause);
                self.promote(key.object, Individual, cause);
            }
        }
        Ok(())
    }

    /// rdf:type: object constants first, then the subject's level, then the
    /// object's public type.
    fn type_rule(&mut self, key: TripleKey, cause: Cause) -> Result<(), TypeContradiction> {
        use InternalType::*;

        let subject_type = self.graph.node_type(key.subject);
        let object_type = self.graph.node_type(key.object);

        let container = match object_type {
            AltClass => Some(Alt),
            BagClass => Some(Bag),
            SeqClass => Some(Seq),
            GraphClass => Some(NamedGraph),
            ResourceClass => return Ok(()),
            _ => None,
        };
        if let Some(kind) = container {
            self.force(key.subject, kind, cause);
            return Ok(());
        }

        match object_type.public_type() {
            RdfType::Metaclass => {
                if !subject_type.public_type().is_schema() {
                    self.force(key.subject, Class, cause);
                }
                return Ok(());
            }
            RdfType::Metaproperty => {
                self.force(key.subject, Property, cause);
                return Ok(());
            }
            _ => {}
        }

        match subject_type.public_type() {
            RdfType::Class | RdfType::Metaclass => {
                self.force(key.object, Metaclass, cause);
                return Ok(());
            }
            RdfType::Property => {
                self.force(key.object, Metaproperty, cause);
                return Ok(());
            }
            _ => {}
        }

        match object_type.public_type() {
            RdfType::Unknown | RdfType::Individual => {
                self.force(key.object, Class, cause);
                self.force(key.subject, Individual, cause);
            }
            RdfType::Class => self.force(key.subject, Individual, cause),
            RdfType::Metaclass => self.force(key.subject, Class, cause),
            _ => {
                return Err(self.contradiction(
                    key.object,
                    object_type,
                    Class,
                    Some(cause.triple),
                    cause.parent,
                ))
            }
        }
        Ok(())
    }

    fn force(&mut self, node: NodeId, target: InternalType, cause: Cause) {
        self.enqueue(node, target, true, cause);
    }

    fn promote(&mut self, node: NodeId, target: InternalType, cause: Cause) {
        self.enqueue(node, target, false, cause);
    }

    fn enqueue(&mut self, node: NodeId, target: InternalType, forcing: bool, cause: Cause) {
        self.changes.push_back(PendingChange {
            node,
            target,
            forcing,
            triple: Some(cause.triple),
            parent: cause.parent,
        });
    }

    fn contradiction(
        &self,
        node: NodeId,
        from: InternalType,
        to: InternalType,
        triple: Option<TripleId>,
        parent: Option<usize>,
    ) -> TypeContradiction {
        let mut lineage = Vec::new();
        let mut next = parent;
        while let Some(index) = next {
            lineage.push(index);
            next = self.committed[index].parent;
        }

        let cause = lineage.iter().rev().fold(None, |cause, &index| {
            let record = &self.committed[index];
            Some(Box::new(TypeChange {
                node: record.node,
                from: record.from,
                to: record.to,
                triple: record.triple,
                cause,
            }))
        });

        TypeContradiction {
            attempt: TypeChange {
                node,
                from,
                to,
                triple,
                cause,
            },
        }
    }

    fn rollback(&mut self) {
        for (&node, &prior) in &self.snapshots {
            self.graph.set_node_type(node, prior);
        }
    }

    fn transitions(&self) -> Vec<TypeTransition> {
        self.snapshots
            .iter()
            .filter_map(|(&node, &from)| {
                let to = self.graph.node_type(node);
                (to != from).then_some(TypeTransition { node, from, to })
            })
            .collect()
    }
}
