//! RDFS entailment: closure and reduction
//!
//! Two derived graphs are reasoned over:
//!
//! - the class graph: `rdfs:subClassOf` edges (schema edges) plus `rdf:type`
//!   edges (membership edges);
//! - the property graph: `rdfs:subPropertyOf` edges (schema edges) plus, for
//!   every property-instance triple `(x, q, y)`, a membership edge from the
//!   pair `(x, y)` to `q`.
//!
//! Reduction only ever justifies removing an edge by a path of schema edges.
//! A membership edge `a -> c` goes when `a` has another membership edge
//! `a -> b` and `b` reaches `c`; a schema edge `a -> c` goes when `a` has
//! another schema edge `a -> b` and `b` reaches `c`. So `type(a, b)` and
//! `subClassOf(b, c)` make an asserted `type(a, c)` redundant, while
//! `subClassOf(a, b)` and `type(b, c)` never touch `type(a, c)`. Within
//! cycles nothing is removed: the intermediate `b` must lie outside the
//! strongly connected components of both `a` and `c`.

use super::labels::{Hierarchy, HierarchyGraph, LabelManager};
use super::query::Pattern;
use super::store::{StoreError, TripleStore};
use super::types::{NodeId, TripleId, TripleKey};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum EntailmentError {
    #[error("No entailment rules selected")]
    NoRules,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A pass produced only triples that earlier passes already tried to add
    #[error("Closure stalled: {pending} entailed triples never became visible")]
    Stalled { pending: usize },

    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

pub type EntailmentResult<T> = Result<T, EntailmentError>;

/// RDFS rule families the operations can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntailmentRule {
    /// subClassOf transitivity
    SubClassOfTransitive,
    /// subPropertyOf transitivity
    SubPropertyOfTransitive,
    /// rdf:type inherited along subClassOf
    TypeInheritance,
    /// property instances inherited along subPropertyOf
    SubPropertyInheritance,
}

impl EntailmentRule {
    pub const ALL: [EntailmentRule; 4] = [
        EntailmentRule::SubClassOfTransitive,
        EntailmentRule::SubPropertyOfTransitive,
        EntailmentRule::TypeInheritance,
        EntailmentRule::SubPropertyInheritance,
    ];
}

/// What an entailment run changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntailmentReport {
    /// Triples materialized by a closure
    pub added: Vec<TripleId>,
    /// Triples (or, with a target graph, memberships) removed by a reduction
    pub removed: Vec<TripleId>,
    /// Added triples whose typing was refused; they stay, untyped
    pub refused: Vec<TripleId>,
    /// Closure passes until nothing new appeared
    pub passes: usize,
}

impl EntailmentReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn to_json(&self) -> EntailmentResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Closure and reduction over a store, optionally scoped to one graph.
///
/// Without a target graph every graph is read, additions go to the default
/// graph and removals drop the triple from all graphs. With a target graph
/// only its triples are read, written and removed.
#[derive(Debug, Clone)]
pub struct Entailment {
    rules: Vec<EntailmentRule>,
}

impl Default for Entailment {
    fn default() -> Self {
        Self::new()
    }
}

impl Entailment {
    /// All rules enabled
    pub fn new() -> Self {
        Self {
            rules: EntailmentRule::ALL.to_vec(),
        }
    }

    pub fn with_rules(rules: impl IntoIterator<Item = EntailmentRule>) -> Self {
        let mut selected: Vec<EntailmentRule> = Vec::new();
        for rule in rules {
            if !selected.contains(&rule) {
                selected.push(rule);
            }
        }
        Self { rules: selected }
    }

    pub fn rules(&self) -> &[EntailmentRule] {
        &self.rules
    }

    fn enabled(&self, rule: EntailmentRule) -> bool {
        self.rules.contains(&rule)
    }

    /// Materialize every triple the enabled rules entail
    pub fn closure(
        &self,
        store: &mut TripleStore,
        graph: Option<NodeId>,
    ) -> EntailmentResult<EntailmentReport> {
        if self.rules.is_empty() {
            return Err(EntailmentError::NoRules);
        }
        // additions land here, so it must be able to hold them
        store.ensure_graph(graph)?;

        let mut report = EntailmentReport::default();
        let mut attempted: FxHashSet<TripleKey> = FxHashSet::default();
        loop {
            report.passes += 1;
            let edges = Edges::collect(store, graph);
            let hierarchies = Hierarchies::build(&edges);
            let wanted = self.entailed(store, &edges, &hierarchies);
            if wanted.is_empty() {
                break;
            }
            let pending = wanted.len();
            let fresh: Vec<TripleKey> = wanted.into_iter().filter(|key| attempted.insert(*key)).collect();
            if fresh.is_empty() {
                warn!(pending, passes = report.passes, "closure stalled");
                return Err(EntailmentError::Stalled { pending });
            }
            for key in fresh {
                match store.add(graph, key.subject, key.predicate, key.object) {
                    Ok(id) => report.added.push(id),
                    Err(StoreError::Contradiction(_)) => {
                        if let Some(id) = store.find_triple(key.subject, key.predicate, key.object) {
                            report.added.push(id);
                            report.refused.push(id);
                        }
                    }
                    Err(other) => return Err(other.into()),
                }
            }
        }

        info!(
            added = report.added.len(),
            refused = report.refused.len(),
            passes = report.passes,
            "closure materialized"
        );
        Ok(report)
    }

    /// Entailed triples missing from the scope, in a stable order
    fn entailed(&self, store: &TripleStore, edges: &Edges, hierarchies: &Hierarchies) -> Vec<TripleKey> {
        let vocab = store.vocab();
        let mut wanted: Vec<TripleKey> = Vec::new();
        let mut seen: FxHashSet<TripleKey> = FxHashSet::default();
        let mut want = |key: TripleKey| {
            if !edges.present.contains(&key) && seen.insert(key) {
                wanted.push(key);
            }
        };

        for (rule, hierarchy) in [
            (EntailmentRule::SubClassOfTransitive, Hierarchy::Class),
            (EntailmentRule::SubPropertyOfTransitive, Hierarchy::Property),
        ] {
            if !self.enabled(rule) {
                continue;
            }
            let predicate = vocab.hierarchy_predicate(hierarchy);
            let graph = hierarchies.get(hierarchy);
            for child in edges.schema_sources(hierarchy) {
                for parent in graph.ancestors(child) {
                    if parent != child {
                        want(TripleKey::new(child, predicate, parent));
                    }
                }
            }
        }

        if self.enabled(EntailmentRule::TypeInheritance) {
            for edge in &edges.types {
                for class in hierarchies.classes.ancestors(edge.to) {
                    if class != edge.to {
                        want(TripleKey::new(edge.from, vocab.rdf_type, class));
                    }
                }
            }
        }

        if self.enabled(EntailmentRule::SubPropertyInheritance) {
            for (_, key) in &edges.instances {
                for property in hierarchies.properties.ancestors(key.predicate) {
                    if property != key.predicate {
                        want(TripleKey::new(key.subject, property, key.object));
                    }
                }
            }
        }

        wanted
    }

    /// Remove every triple the enabled rules make redundant
    pub fn reduce(
        &self,
        store: &mut TripleStore,
        graph: Option<NodeId>,
    ) -> EntailmentResult<EntailmentReport> {
        if self.rules.is_empty() {
            return Err(EntailmentError::NoRules);
        }
        if let Some(graph) = graph {
            store.node(graph)?;
        } else {
            store.refresh_labels();
        }

        let redundant = {
            let edges = Edges::collect(store, graph);
            let labels = match graph {
                None => store.labels().filter(|l| l.labels_available()),
                Some(_) => None,
            };
            let reach = match labels {
                Some(labels) => Reach::Labels(labels),
                None => Reach::Local(Hierarchies::build(&edges)),
            };
            self.redundant(&edges, &reach)
        };

        let mut report = EntailmentReport {
            passes: 1,
            ..EntailmentReport::default()
        };
        for triple in redundant {
            let removed = match graph {
                Some(graph) => store.delete_from_graph(triple, graph)?,
                None => store.delete(triple)?,
            };
            if removed {
                report.removed.push(triple);
            }
        }

        info!(removed = report.removed.len(), "reduction applied");
        Ok(report)
    }

    fn redundant(&self, edges: &Edges, reach: &Reach<'_>) -> Vec<TripleId> {
        let mut redundant: Vec<TripleId> = Vec::new();

        if self.enabled(EntailmentRule::SubClassOfTransitive) {
            redundant.extend(schema_redundant(&edges.class_schema, Hierarchy::Class, reach));
        }
        if self.enabled(EntailmentRule::SubPropertyOfTransitive) {
            redundant.extend(schema_redundant(&edges.property_schema, Hierarchy::Property, reach));
        }
        if self.enabled(EntailmentRule::TypeInheritance) {
            redundant.extend(membership_redundant(&edges.types, Hierarchy::Class, reach));
        }
        if self.enabled(EntailmentRule::SubPropertyInheritance) {
            // pair (x, y) -> q for every instance (x, q, y)
            let pairs: Vec<Edge> = edges
                .instances
                .iter()
                .map(|(id, key)| Edge {
                    id: *id,
                    from: key.subject,
                    to: key.predicate,
                    pair: Some(key.object),
                })
                .collect();
            redundant.extend(membership_redundant(&pairs, Hierarchy::Property, reach));
        }

        redundant.sort_unstable();
        redundant.dedup();
        debug!(count = redundant.len(), "redundant triples found");
        redundant
    }
}

/// One edge of a derived graph, backed by a triple
#[derive(Debug, Clone, Copy)]
struct Edge {
    id: TripleId,
    from: NodeId,
    to: NodeId,
    /// Object half of a pair source in the property graph
    pair: Option<NodeId>,
}

impl Edge {
    fn source(&self) -> (NodeId, Option<NodeId>) {
        (self.from, self.pair)
    }
}

/// The triples of a scope, split by the role they play
struct Edges {
    class_schema: Vec<Edge>,
    property_schema: Vec<Edge>,
    types: Vec<Edge>,
    instances: Vec<(TripleId, TripleKey)>,
    present: FxHashSet<TripleKey>,
}

impl Edges {
    fn collect(store: &TripleStore, graph: Option<NodeId>) -> Self {
        let vocab = *store.vocab();
        let pattern = Pattern {
            graph,
            ..Pattern::any()
        };

        let mut edges = Edges {
            class_schema: Vec::new(),
            property_schema: Vec::new(),
            types: Vec::new(),
            instances: Vec::new(),
            present: FxHashSet::default(),
        };
        for id in store.find(&pattern) {
            let Some(key) = store.key(id) else {
                continue;
            };
            edges.present.insert(key);
            let edge = Edge {
                id,
                from: key.subject,
                to: key.object,
                pair: None,
            };
            if key.predicate == vocab.sub_class_of {
                edges.class_schema.push(edge);
            } else if key.predicate == vocab.sub_property_of {
                edges.property_schema.push(edge);
            } else if key.predicate == vocab.rdf_type {
                edges.types.push(edge);
            } else {
                edges.instances.push((id, key));
            }
        }
        edges
    }

    fn schema(&self, hierarchy: Hierarchy) -> &[Edge] {
        match hierarchy {
            Hierarchy::Class => &self.class_schema,
            Hierarchy::Property => &self.property_schema,
        }
    }

    /// Distinct sources of schema edges, sorted
    fn schema_sources(&self, hierarchy: Hierarchy) -> Vec<NodeId> {
        let mut sources: Vec<NodeId> = self.schema(hierarchy).iter().map(|e| e.from).collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }
}

struct Hierarchies {
    classes: HierarchyGraph,
    properties: HierarchyGraph,
}

impl Hierarchies {
    fn build(edges: &Edges) -> Self {
        let pairs = |list: &[Edge]| list.iter().map(|e| (e.from, e.to)).collect::<Vec<_>>();
        Self {
            classes: HierarchyGraph::from_edges(pairs(&edges.class_schema)),
            properties: HierarchyGraph::from_edges(pairs(&edges.property_schema)),
        }
    }

    fn get(&self, hierarchy: Hierarchy) -> &HierarchyGraph {
        match hierarchy {
            Hierarchy::Class => &self.classes,
            Hierarchy::Property => &self.properties,
        }
    }
}

/// Schema-path reachability: the attached labels or a scoped closure
enum Reach<'a> {
    Labels(&'a dyn LabelManager),
    Local(Hierarchies),
}

impl Reach<'_> {
    /// Reflexive
    fn reaches(&self, hierarchy: Hierarchy, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        match self {
            Reach::Labels(labels) => labels.is_ancestor(hierarchy, to, from),
            Reach::Local(graphs) => graphs.get(hierarchy).reaches(from, to),
        }
    }

    fn same_component(&self, hierarchy: Hierarchy, a: NodeId, b: NodeId) -> bool {
        self.reaches(hierarchy, a, b) && self.reaches(hierarchy, b, a)
    }

    /// `via` justifies dropping `from -> to`
    fn bypasses(&self, hierarchy: Hierarchy, from: Option<NodeId>, via: NodeId, to: NodeId) -> bool {
        via != to
            && self.reaches(hierarchy, via, to)
            && !self.same_component(hierarchy, via, to)
            && from.map_or(true, |from| !self.same_component(hierarchy, via, from))
    }
}

fn schema_redundant(edges: &[Edge], hierarchy: Hierarchy, reach: &Reach<'_>) -> Vec<TripleId> {
    let mut out: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for edge in edges {
        out.entry(edge.from).or_default().push(edge.to);
    }
    edges
        .iter()
        .filter(|edge| {
            out[&edge.from]
                .iter()
                .any(|&via| via != edge.from && reach.bypasses(hierarchy, Some(edge.from), via, edge.to))
        })
        .map(|edge| edge.id)
        .collect()
}

fn membership_redundant(edges: &[Edge], hierarchy: Hierarchy, reach: &Reach<'_>) -> Vec<TripleId> {
    let mut out: FxHashMap<(NodeId, Option<NodeId>), Vec<NodeId>> = FxHashMap::default();
    for edge in edges {
        out.entry(edge.source()).or_default().push(edge.to);
    }
    edges
        .iter()
        .filter(|edge| {
            // a pair source never sits in the property hierarchy
            let from = edge.pair.is_none().then_some(edge.from);
            out[&edge.source()]
                .iter()
                .any(|&via| reach.bypasses(hierarchy, from, via, edge.to))
        })
        .map(|edge| edge.id)
        .collect()
}
