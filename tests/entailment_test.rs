use samyama_rdfs::rdf::{
    Entailment, EntailmentError, EntailmentRule, Hierarchy, Indexer, IntervalLabels,
    LabelManager, MemoryIndexer, NodeChange, NodeDescriptor, Pattern, RdfType, Removal,
    StoreError, TripleId, TripleKey, TripleStore,
};
use samyama_rdfs::{NodeId, StoreConfig};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

struct Vocab {
    ty: NodeId,
    sub_class: NodeId,
    sub_prop: NodeId,
}

fn vocab(store: &mut TripleStore) -> Vocab {
    Vocab {
        ty: store.curie("rdf:type").unwrap(),
        sub_class: store.curie("rdfs:subClassOf").unwrap(),
        sub_prop: store.curie("rdfs:subPropertyOf").unwrap(),
    }
}

fn ex(store: &mut TripleStore, name: &str) -> NodeId {
    store.uri(&format!("http://example.org/{name}")).unwrap()
}

#[test]
fn test_chain_closure_then_reduction() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    let ab = store.add(None, a, v.sub_class, b).unwrap();
    let bc = store.add(None, b, v.sub_class, c).unwrap();

    let closure = Entailment::new().closure(&mut store, None).unwrap();
    let ac = store.find_triple(a, v.sub_class, c).unwrap();
    assert_eq!(closure.added, vec![ac]);

    // a second closure finds nothing new
    assert!(Entailment::new().closure(&mut store, None).unwrap().is_empty());

    let reduction = Entailment::new().reduce(&mut store, None).unwrap();
    assert_eq!(reduction.removed, vec![ac]);
    assert!(store.is_present(ab));
    assert!(store.is_present(bc));
    assert!(!store.is_present(ac));
}

#[test]
fn test_type_reduction_only_follows_subclass_paths() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);

    // A ⊑ B, B type C: an asserted A type C is independent
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.ty, c).unwrap();
    let kept = store.add(None, a, v.ty, c).unwrap();

    // x type D, D ⊑ E: an asserted x type E is entailed
    let (x, d, e) = (ex(&mut store, "x"), ex(&mut store, "D"), ex(&mut store, "E"));
    store.add(None, x, v.ty, d).unwrap();
    store.add(None, d, v.sub_class, e).unwrap();
    let redundant = store.add(None, x, v.ty, e).unwrap();

    let report = Entailment::new().reduce(&mut store, None).unwrap();
    assert_eq!(report.removed, vec![redundant]);
    assert!(store.is_present(kept));
}

#[test]
fn test_type_hops_never_remove_subclass_edges() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));

    // A type B, B ⊑ C, A ⊑ C
    store.add(None, a, v.ty, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    let schema = store.add(None, a, v.sub_class, c).unwrap();

    let report = Entailment::new().reduce(&mut store, None).unwrap();
    assert!(report.removed.is_empty());
    assert!(store.is_present(schema));
}

#[test]
fn test_cycle_members_keep_their_edges() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c, d) = (
        ex(&mut store, "A"),
        ex(&mut store, "B"),
        ex(&mut store, "C"),
        ex(&mut store, "D"),
    );
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    store.add(None, c, v.sub_class, a).unwrap();
    store.add(None, c, v.sub_class, d).unwrap();
    let shortcut = store.add(None, a, v.sub_class, d).unwrap();

    let report = Entailment::new().reduce(&mut store, None).unwrap();
    assert!(report.removed.is_empty());
    assert!(store.is_present(shortcut));
    assert!(store.is_inferable(b, v.sub_class, d).unwrap());
}

#[test]
fn test_property_closure_and_reduction() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (knows, friend, best) = (
        ex(&mut store, "knows"),
        ex(&mut store, "friendOf"),
        ex(&mut store, "bestFriendOf"),
    );
    let (x, y) = (ex(&mut store, "x"), ex(&mut store, "y"));
    store.add(None, best, v.sub_prop, friend).unwrap();
    store.add(None, friend, v.sub_prop, knows).unwrap();
    let asserted = store.add(None, x, best, y).unwrap();

    let closure = Entailment::new().closure(&mut store, None).unwrap();
    assert!(store.contains(best, v.sub_prop, knows));
    assert!(store.contains(x, friend, y));
    assert!(store.contains(x, knows, y));
    assert_eq!(closure.added.len(), 3);

    let reduction = Entailment::new().reduce(&mut store, None).unwrap();
    assert_eq!(reduction.removed.len(), 3);
    assert!(store.is_present(asserted));
    assert!(!store.contains(x, knows, y));
    assert!(!store.contains(best, v.sub_prop, knows));
}

#[test]
fn test_rules_restrict_the_work() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    let shortcut = store.add(None, a, v.sub_class, c).unwrap();

    let types_only = Entailment::with_rules([EntailmentRule::TypeInheritance]);
    assert!(types_only.reduce(&mut store, None).unwrap().removed.is_empty());
    assert!(store.is_present(shortcut));
}

#[test]
fn test_reduction_with_labels_matches_rebuild() {
    let config = StoreConfig {
        interval_labels: true,
        ..StoreConfig::default()
    };
    let mut store = TripleStore::with_config(config).unwrap();
    // labelled from the start
    let labels = store.labels().unwrap();
    assert!(labels.labels_available());
    assert_eq!(labels.target_store(), Some(store.id()));

    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    let shortcut = store.add(None, a, v.sub_class, c).unwrap();
    assert!(!store.labels().unwrap().labels_available());

    store.refresh_labels();
    let labels = store.labels().unwrap();
    assert!(labels.labels_available());
    assert!(labels.is_ancestor(Hierarchy::Class, c, a));

    let report = Entailment::new().reduce(&mut store, None).unwrap();
    assert_eq!(report.removed, vec![shortcut]);
    // the deletion made the labels stale
    assert!(!store.labels().unwrap().labels_available());
}

#[test]
fn test_labels_bound_to_another_store_are_refused() {
    let mut first = TripleStore::new();
    let mut labels = IntervalLabels::new();
    labels.update_labels(&first);

    let mut second = TripleStore::new();
    assert!(second.attach_labels(Box::new(labels.clone())).is_err());
    assert!(first.attach_labels(Box::new(labels)).is_ok());
}

#[test]
fn test_is_inferable() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    let (x, y) = (ex(&mut store, "x"), ex(&mut store, "y"));
    let (knows, friend) = (ex(&mut store, "knows"), ex(&mut store, "friendOf"));
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    store.add(None, x, v.ty, a).unwrap();
    store.add(None, friend, v.sub_prop, knows).unwrap();
    store.add(None, x, friend, y).unwrap();

    assert!(store.is_inferable(a, v.sub_class, b).unwrap());
    assert!(store.is_inferable(a, v.sub_class, c).unwrap());
    assert!(!store.is_inferable(c, v.sub_class, a).unwrap());
    assert!(!store.is_inferable(a, v.sub_class, a).unwrap());

    assert!(store.is_inferable(x, v.ty, c).unwrap());
    assert!(!store.is_inferable(y, v.ty, c).unwrap());

    assert!(store.is_inferable(x, knows, y).unwrap());
    assert!(!store.is_inferable(y, knows, x).unwrap());
}

#[test]
fn test_graph_scoped_closure() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    let (g1, g2) = (ex(&mut store, "g1"), ex(&mut store, "g2"));
    store.add(Some(g1), a, v.sub_class, b).unwrap();
    store.add(Some(g2), b, v.sub_class, c).unwrap();

    // neither graph alone entails A ⊑ C
    assert!(Entailment::new().closure(&mut store, Some(g1)).unwrap().added.is_empty());

    let report = Entailment::new().closure(&mut store, None).unwrap();
    assert_eq!(report.added.len(), 1);
    let ac = report.added[0];
    assert_eq!(store.graphs_of(ac), vec![store.default_graph()]);
}

#[test]
fn test_closure_refuses_a_default_graph_that_cannot_hold_triples() {
    let mut store = TripleStore::new();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    let (g1, x) = (ex(&mut store, "g1"), ex(&mut store, "x"));
    let default = store.default_graph();

    // the default graph IRI is used as a class elsewhere
    store.add(Some(g1), x, v.ty, default).unwrap();
    assert_eq!(store.node_type(default), Some(RdfType::Class));
    store.add(Some(g1), a, v.sub_class, b).unwrap();
    store.add(Some(g1), b, v.sub_class, c).unwrap();

    let err = Entailment::new().closure(&mut store, None).unwrap_err();
    match err {
        EntailmentError::Store(StoreError::Contradiction(contradiction)) => {
            assert_eq!(contradiction.node(), default);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!store.contains(a, v.sub_class, c));
    assert_eq!(store.node_type(default), Some(RdfType::Class));

    // the graph the data lives in still works
    let report = Entailment::new().closure(&mut store, Some(g1)).unwrap();
    assert_eq!(report.added.len(), 1);
    assert_eq!(store.graphs_of(report.added[0]), vec![g1]);
}

/// Indexer that never reports the listed triples
struct HidingIndexer {
    inner: MemoryIndexer,
    hidden: Arc<Mutex<HashSet<TripleKey>>>,
    dropped: HashSet<TripleId>,
}

impl Indexer for HidingIndexer {
    fn index_node(&mut self, node: NodeDescriptor<'_>, change: NodeChange) {
        self.inner.index_node(node, change);
    }

    fn contains_triple(&self, triple: TripleId) -> bool {
        self.inner.contains_triple(triple)
    }

    fn add(&mut self, triple: TripleId, key: TripleKey, graph: NodeId) {
        if self.hidden.lock().unwrap().contains(&key) {
            self.dropped.insert(triple);
        } else {
            self.inner.add(triple, key, graph);
        }
    }

    fn add_in_named_graph(&mut self, triple: TripleId, graph: NodeId) {
        if !self.dropped.contains(&triple) {
            self.inner.add_in_named_graph(triple, graph);
        }
    }

    fn delete_from_named_graph(&mut self, triple: TripleId, graph: NodeId) {
        if !self.dropped.contains(&triple) {
            self.inner.delete_from_named_graph(triple, graph);
        }
    }

    fn delete(&mut self, triple: TripleId) {
        if !self.dropped.remove(&triple) {
            self.inner.delete(triple);
        }
    }

    fn find_triples(&self, pattern: &Pattern) -> Vec<TripleId> {
        self.inner.find_triples(pattern)
    }

    fn find(&self, ty: RdfType) -> Vec<NodeId> {
        self.inner.find(ty)
    }

    fn find_in_namespace(&self, ty: RdfType, namespace: &str) -> Vec<NodeId> {
        self.inner.find_in_namespace(ty, namespace)
    }

    fn namespaces(&self) -> Vec<String> {
        self.inner.namespaces()
    }

    fn triple_count(&self) -> usize {
        self.inner.triple_count()
    }

    fn delete_triples(&mut self, pattern: &Pattern, on_removed: &mut dyn FnMut(TripleId, Removal)) {
        self.inner.delete_triples(pattern, on_removed);
    }
}

#[test]
fn test_closure_stops_when_additions_never_show_up() {
    let hidden: Arc<Mutex<HashSet<TripleKey>>> = Arc::default();
    let indexer = HidingIndexer {
        inner: MemoryIndexer::new(),
        hidden: hidden.clone(),
        dropped: HashSet::new(),
    };
    let mut store = TripleStore::with_indexer(StoreConfig::default(), Box::new(indexer)).unwrap();
    let v = vocab(&mut store);
    let (a, b, c) = (ex(&mut store, "A"), ex(&mut store, "B"), ex(&mut store, "C"));
    store.add(None, a, v.sub_class, b).unwrap();
    store.add(None, b, v.sub_class, c).unwrap();
    hidden
        .lock()
        .unwrap()
        .insert(TripleKey::new(a, v.sub_class, c));

    let err = Entailment::new().closure(&mut store, None).unwrap_err();
    assert!(matches!(err, EntailmentError::Stalled { pending: 1 }));
}
