//! RDF type definitions
//!
//! Term wrappers around the oxrdf primitives, the store-scoped handles that
//! address nodes and triples, and the public node classification.

use oxrdf::{BlankNode as OxBlankNode, Literal as OxLiteral, NamedNode as OxNamedNode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Term construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TermError {
    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Invalid blank node
    #[error("Invalid blank node: {0}")]
    InvalidBlankNode(String),

    /// Invalid literal
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

pub type TermResult<T> = Result<T, TermError>;

/// Named node (IRI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

impl NamedNode {
    /// Create a new named node from an IRI string
    pub fn new(iri: &str) -> TermResult<Self> {
        OxNamedNode::new(iri)
            .map(Self)
            .map_err(|e| TermError::InvalidIri(format!("{iri}: {e}")))
    }

    /// Vocabulary constants only; skips validation
    pub(crate) fn new_unchecked(iri: &str) -> Self {
        Self(OxNamedNode::new_unchecked(iri))
    }

    /// Get the IRI string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Namespace part of the IRI: everything up to and including the last
    /// `#`, `/` or `:`.
    pub fn namespace(&self) -> &str {
        let iri = self.as_str();
        match iri.rfind(|c: char| c == '#' || c == '/' || c == ':') {
            Some(pos) => &iri[..=pos],
            None => iri,
        }
    }

    /// Local name: what follows [`NamedNode::namespace`]
    pub fn local_name(&self) -> &str {
        &self.as_str()[self.namespace().len()..]
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

impl From<OxNamedNode> for NamedNode {
    fn from(node: OxNamedNode) -> Self {
        Self(node)
    }
}

/// Blank node (anonymous node)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

impl BlankNode {
    /// Create a new blank node with a unique identifier
    pub fn new() -> Self {
        Self(OxBlankNode::default())
    }

    /// Create a blank node from a string identifier
    pub fn from_id(id: &str) -> TermResult<Self> {
        OxBlankNode::new(id)
            .map(Self)
            .map_err(|e| TermError::InvalidBlankNode(format!("{id}: {e}")))
    }

    /// Get the blank node identifier
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.as_str())
    }
}

/// RDF literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

impl Literal {
    /// Create a simple literal (plain string)
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// Create a literal with language tag
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> TermResult<Self> {
        OxLiteral::new_language_tagged_literal(value, language)
            .map(Self)
            .map_err(|e| TermError::InvalidLiteral(e.to_string()))
    }

    /// Create a typed literal
    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Get the datatype
    pub fn datatype(&self) -> NamedNode {
        NamedNode(self.0.datatype().into_owned())
    }

    /// Datatype IRI, borrowed
    pub fn datatype_iri(&self) -> &str {
        self.0.datatype().as_str()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any value a node can be minted for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfTerm {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
    /// Literal value
    Literal(Literal),
}

impl RdfTerm {
    /// Syntactic kind of the term
    pub fn kind(&self) -> NodeKind {
        match self {
            RdfTerm::NamedNode(_) => NodeKind::Resource,
            RdfTerm::BlankNode(_) => NodeKind::BlankNode,
            RdfTerm::Literal(_) => NodeKind::Literal,
        }
    }

    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            RdfTerm::NamedNode(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            RdfTerm::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfTerm::NamedNode(n) => write!(f, "{}", n),
            RdfTerm::BlankNode(b) => write!(f, "{}", b),
            RdfTerm::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<NamedNode> for RdfTerm {
    fn from(node: NamedNode) -> Self {
        RdfTerm::NamedNode(node)
    }
}

impl From<BlankNode> for RdfTerm {
    fn from(node: BlankNode) -> Self {
        RdfTerm::BlankNode(node)
    }
}

impl From<Literal> for RdfTerm {
    fn from(lit: Literal) -> Self {
        RdfTerm::Literal(lit)
    }
}

/// Syntactic kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Resource,
    BlankNode,
    Literal,
}

/// Public classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RdfType {
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
    Unknown,
}

impl RdfType {
    /// Classes, properties and their meta levels
    pub fn is_schema(self) -> bool {
        matches!(
            self,
            RdfType::Class | RdfType::Property | RdfType::Metaclass | RdfType::Metaproperty
        )
    }

    /// Whether a node of `kind` may ever carry this type
    pub fn is_possible_for(self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Resource => true,
            NodeKind::BlankNode => !self.is_schema(),
            NodeKind::Literal => self == RdfType::Literal,
        }
    }
}

impl fmt::Display for RdfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RdfType::Class => "CLASS",
            RdfType::Property => "PROPERTY",
            RdfType::Metaclass => "METACLASS",
            RdfType::Metaproperty => "METAPROPERTY",
            RdfType::Individual => "INDIVIDUAL",
            RdfType::Alt => "ALT",
            RdfType::Bag => "BAG",
            RdfType::Seq => "SEQ",
            RdfType::NamedGraph => "NAMED_GRAPH",
            RdfType::XmlType => "XML_TYPE",
            RdfType::Literal => "LITERAL",
            RdfType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Identity of a store; every handle remembers the store that minted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreId(pub u32);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreId({})", self.0)
    }
}

/// Handle of a node inside one store's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub store: StoreId,
    pub index: u32,
}

impl NodeId {
    pub fn new(store: StoreId, index: u32) -> Self {
        Self { store, index }
    }

    pub fn as_u64(&self) -> u64 {
        ((self.store.0 as u64) << 32) | self.index as u64
    }

    pub fn from_u64(packed: u64) -> Self {
        Self::new(StoreId((packed >> 32) as u32), packed as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.store.0, self.index)
    }
}

/// Handle of a triple inside one store's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleId {
    pub store: StoreId,
    pub index: u32,
}

impl TripleId {
    pub fn new(store: StoreId, index: u32) -> Self {
        Self { store, index }
    }
}

impl fmt::Display for TripleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripleId({}:{})", self.store.0, self.index)
    }
}

/// The (subject, predicate, object) node triple that identifies a triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripleKey {
    pub subject: NodeId,
    pub predicate: NodeId,
    pub object: NodeId,
}

impl TripleKey {
    pub fn new(subject: NodeId, predicate: NodeId, object: NodeId) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}
