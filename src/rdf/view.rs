//! Typed node views
//!
//! [`RdfNode`] is a borrowed handle on one node of a store. The variant
//! accessors check the node's current public type and hand out a view with
//! the queries that make sense for it.

use super::query::Pattern;
use super::store::{StoreError, StoreResult, TripleStore};
use super::typing::InternalType;
use super::types::{Literal, NamedNode, NodeId, NodeKind, RdfTerm, RdfType, TripleId};

#[derive(Clone, Copy)]
pub struct RdfNode<'s> {
    store: &'s TripleStore,
    id: NodeId,
}

impl<'s> RdfNode<'s> {
    pub(crate) fn new(store: &'s TripleStore, id: NodeId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn term(&self) -> Option<&'s RdfTerm> {
        self.store.term(self.id)
    }

    pub fn kind(&self) -> NodeKind {
        self.store.node_kind(self.id).unwrap_or(NodeKind::Resource)
    }

    pub fn rdf_type(&self) -> RdfType {
        self.internal_type().public_type()
    }

    pub fn internal_type(&self) -> InternalType {
        self.store.internal_type(self.id).unwrap_or(InternalType::Unknown)
    }

    pub fn is_active(&self) -> bool {
        self.store.is_active(self.id)
    }

    pub fn as_named_node(&self) -> Option<&'s NamedNode> {
        self.term().and_then(RdfTerm::as_named_node)
    }

    pub fn as_literal(&self) -> Option<&'s Literal> {
        self.term().and_then(RdfTerm::as_literal)
    }

    /// Classes and metaclasses
    pub fn as_class(&self) -> StoreResult<ClassView<'s>> {
        self.expect(RdfType::Class, &[RdfType::Class, RdfType::Metaclass])?;
        Ok(ClassView { node: *self })
    }

    /// Properties and metaproperties
    pub fn as_property(&self) -> StoreResult<PropertyView<'s>> {
        self.expect(RdfType::Property, &[RdfType::Property, RdfType::Metaproperty])?;
        Ok(PropertyView { node: *self })
    }

    pub fn as_individual(&self) -> StoreResult<IndividualView<'s>> {
        self.expect(RdfType::Individual, &[RdfType::Individual])?;
        Ok(IndividualView { node: *self })
    }

    fn expect(&self, expected: RdfType, accepted: &[RdfType]) -> StoreResult<()> {
        let actual = self.rdf_type();
        if accepted.contains(&actual) {
            Ok(())
        } else {
            Err(StoreError::WrongType {
                node: self.id,
                expected,
                actual,
            })
        }
    }

    /// Triples with this node as subject
    pub fn outgoing(&self) -> Vec<TripleId> {
        self.store.find(&Pattern {
            subject: Some(self.id),
            ..Pattern::any()
        })
    }

    /// Triples with this node as object
    pub fn incoming(&self) -> Vec<TripleId> {
        self.store.find(&Pattern {
            object: Some(self.id),
            ..Pattern::any()
        })
    }
}

impl std::fmt::Debug for RdfNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdfNode")
            .field("id", &self.id)
            .field("term", &self.term())
            .field("type", &self.rdf_type())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassView<'s> {
    node: RdfNode<'s>,
}

impl<'s> ClassView<'s> {
    pub fn node(&self) -> RdfNode<'s> {
        self.node
    }

    /// Asserted direct superclasses
    pub fn super_classes(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.objects(self.node.id, store.vocab().sub_class_of)
    }

    /// Asserted direct subclasses
    pub fn sub_classes(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.subjects(store.vocab().sub_class_of, self.node.id)
    }

    /// Asserted direct instances
    pub fn instances(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.subjects(store.vocab().rdf_type, self.node.id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyView<'s> {
    node: RdfNode<'s>,
}

impl<'s> PropertyView<'s> {
    pub fn node(&self) -> RdfNode<'s> {
        self.node
    }

    pub fn super_properties(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.objects(self.node.id, store.vocab().sub_property_of)
    }

    pub fn sub_properties(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.subjects(store.vocab().sub_property_of, self.node.id)
    }

    pub fn domains(&self) -> Vec<NodeId> {
        let store = self.node.store;
        match store.lookup(&NamedNode::new_unchecked(super::namespace::rdfs::DOMAIN).into()) {
            Some(domain) => store.objects(self.node.id, domain),
            None => Vec::new(),
        }
    }

    pub fn ranges(&self) -> Vec<NodeId> {
        let store = self.node.store;
        match store.lookup(&NamedNode::new_unchecked(super::namespace::rdfs::RANGE).into()) {
            Some(range) => store.objects(self.node.id, range),
            None => Vec::new(),
        }
    }

    /// Triples using this property as predicate
    pub fn uses(&self) -> Vec<TripleId> {
        self.node.store.find(&Pattern {
            predicate: Some(self.node.id),
            ..Pattern::any()
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndividualView<'s> {
    node: RdfNode<'s>,
}

impl<'s> IndividualView<'s> {
    pub fn node(&self) -> RdfNode<'s> {
        self.node
    }

    /// Asserted rdf:type objects
    pub fn types(&self) -> Vec<NodeId> {
        let store = self.node.store;
        store.objects(self.node.id, store.vocab().rdf_type)
    }

    /// `(predicate, object)` pairs of the individual's outgoing triples
    pub fn properties(&self) -> Vec<(NodeId, NodeId)> {
        let store = self.node.store;
        self.node
            .outgoing()
            .into_iter()
            .filter_map(|id| store.key(id))
            .map(|key| (key.predicate, key.object))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_accessors() {
        let mut store = TripleStore::new();
        let person = store.new_class(None, "http://example.org/Person").unwrap();
        let alice = store.new_individual(None, "http://example.org/alice", person).unwrap();

        let class = store.node(person).unwrap().as_class().unwrap();
        assert_eq!(class.instances(), vec![alice]);
        assert!(store.node(person).unwrap().as_property().is_err());

        let individual = store.node(alice).unwrap().as_individual().unwrap();
        assert_eq!(individual.types(), vec![person]);

        let err = store.node(alice).unwrap().as_class().unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongType {
                expected: RdfType::Class,
                actual: RdfType::Individual,
                ..
            }
        ));
    }

    #[test]
    fn test_property_view() {
        let mut store = TripleStore::new();
        let person = store.new_class(None, "http://example.org/Person").unwrap();
        let knows = store.new_property(None, "http://example.org/knows").unwrap();
        let acquainted = store
            .new_subproperty(None, "http://example.org/friendOf", knows)
            .unwrap();
        let domain = store.curie("rdfs:domain").unwrap();
        store.add(None, knows, domain, person).unwrap();

        let view = store.node(knows).unwrap().as_property().unwrap();
        assert_eq!(view.sub_properties(), vec![acquainted]);
        assert_eq!(view.domains(), vec![person]);
        assert!(view.ranges().is_empty());

        let restriction = store.find_triple(knows, domain, person).unwrap();
        assert_eq!(store.node(person).unwrap().incoming(), vec![restriction]);
    }
}
