//! Reification replay
//!
//! Turns every `rdf:Statement` description back into the triple it
//! describes. Statements are replayed one at a time; a malformed one is
//! reported and skipped without undoing the ones before it.

use super::query::Pattern;
use super::store::{StoreError, TripleStore};
use super::types::{NodeId, NodeKind, TripleId};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ReificationError {
    #[error("Statement {statement} has literal subject {subject}")]
    LiteralSubject { statement: NodeId, subject: NodeId },

    #[error("Statement {statement} has predicate {predicate}, which is not a URI resource")]
    InvalidPredicate { statement: NodeId, predicate: NodeId },

    #[error("Statement {statement} has more than one rdf:{part} value")]
    Ambiguous { statement: NodeId, part: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ReificationResult<T> = Result<T, ReificationError>;

/// Outcome of a replay
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub added: Vec<TripleId>,
    pub rejected: Vec<(NodeId, ReificationError)>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Replay the statements described in `graph` (every graph when `None`).
///
/// Reified triples are added to `graph`, or to the default graph. Statements
/// missing any of subject, predicate or object are not replayed.
pub fn replay_reifications(store: &mut TripleStore, graph: Option<NodeId>) -> ReificationResult<ReplayReport> {
    if let Some(graph) = graph {
        store.node(graph)?;
    }
    let vocab = *store.vocab();

    let mut statements: Vec<NodeId> = store
        .find(&Pattern {
            graph,
            subject: None,
            predicate: Some(vocab.rdf_type),
            object: Some(vocab.rdf_statement),
        })
        .into_iter()
        .filter_map(|id| store.key(id))
        .map(|key| key.subject)
        .collect();
    statements.sort_unstable();
    statements.dedup();

    let mut report = ReplayReport::default();
    for statement in statements {
        let (subject, predicate, object) = match parts(store, graph, statement) {
            Ok(Some(described)) => described,
            Ok(None) => {
                debug!(statement = %statement, "incomplete statement skipped");
                continue;
            }
            Err(e) => {
                warn!(statement = %statement, error = %e, "statement rejected");
                report.rejected.push((statement, e));
                continue;
            }
        };

        if store.node_kind(subject) == Some(NodeKind::Literal) {
            report
                .rejected
                .push((statement, ReificationError::LiteralSubject { statement, subject }));
            continue;
        }
        if store.node_kind(predicate) != Some(NodeKind::Resource) {
            report
                .rejected
                .push((statement, ReificationError::InvalidPredicate { statement, predicate }));
            continue;
        }

        match store.add(graph, subject, predicate, object) {
            Ok(id) => report.added.push(id),
            Err(e @ StoreError::Contradiction(_)) => {
                // the triple stays; only its typing was refused
                if let Some(id) = store.find_triple(subject, predicate, object) {
                    report.added.push(id);
                }
                report.rejected.push((statement, e.into()));
            }
            Err(e) => report.rejected.push((statement, e.into())),
        }
    }

    info!(
        added = report.added.len(),
        rejected = report.rejected.len(),
        "reifications replayed"
    );
    Ok(report)
}

fn parts(
    store: &TripleStore,
    graph: Option<NodeId>,
    statement: NodeId,
) -> ReificationResult<Option<(NodeId, NodeId, NodeId)>> {
    let vocab = store.vocab();
    let subject = part(store, graph, statement, vocab.rdf_subject, "subject")?;
    let predicate = part(store, graph, statement, vocab.rdf_predicate, "predicate")?;
    let object = part(store, graph, statement, vocab.rdf_object, "object")?;
    Ok(match (subject, predicate, object) {
        (Some(s), Some(p), Some(o)) => Some((s, p, o)),
        _ => None,
    })
}

fn part(
    store: &TripleStore,
    graph: Option<NodeId>,
    statement: NodeId,
    predicate: NodeId,
    name: &'static str,
) -> ReificationResult<Option<NodeId>> {
    let mut values = store.project(
        Pattern {
            graph,
            subject: Some(statement),
            predicate: Some(predicate),
            object: None,
        },
        |key| key.object,
    );
    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop()),
        _ => Err(ReificationError::Ambiguous { statement, part: name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(store: &mut TripleStore, name: &str, s: NodeId, p: NodeId, o: NodeId) -> NodeId {
        let stmt = store.uri(&format!("http://example.org/{name}")).unwrap();
        let ty = store.curie("rdf:type").unwrap();
        let statement = store.curie("rdf:Statement").unwrap();
        let subject = store.curie("rdf:subject").unwrap();
        let predicate = store.curie("rdf:predicate").unwrap();
        let object = store.curie("rdf:object").unwrap();
        store.add(None, stmt, ty, statement).unwrap();
        store.add(None, stmt, subject, s).unwrap();
        store.add(None, stmt, predicate, p).unwrap();
        store.add(None, stmt, object, o).unwrap();
        stmt
    }

    #[test]
    fn test_replay_adds_described_triple() {
        let mut store = TripleStore::new();
        let alice = store.uri("http://example.org/alice").unwrap();
        let knows = store.uri("http://example.org/knows").unwrap();
        let bob = store.uri("http://example.org/bob").unwrap();
        describe(&mut store, "s1", alice, knows, bob);
        assert!(!store.contains(alice, knows, bob));

        let report = replay_reifications(&mut store, None).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.added.len(), 1);
        assert!(store.contains(alice, knows, bob));
    }

    #[test]
    fn test_bad_statement_is_rejected_alone() {
        let mut store = TripleStore::new();
        let alice = store.uri("http://example.org/alice").unwrap();
        let knows = store.uri("http://example.org/knows").unwrap();
        let bob = store.uri("http://example.org/bob").unwrap();
        let name = store.literal("Alice");
        describe(&mut store, "good", alice, knows, bob);
        let bad = describe(&mut store, "bad", name, knows, bob);

        let report = replay_reifications(&mut store, None).unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, bad);
        assert!(matches!(
            report.rejected[0].1,
            ReificationError::LiteralSubject { subject, .. } if subject == name
        ));
        assert!(store.contains(alice, knows, bob));
    }
}
