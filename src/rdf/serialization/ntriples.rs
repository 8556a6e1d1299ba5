//! N-Triples export

use super::SerializeResult;
use crate::rdf::namespace::XSD_NS;
use crate::rdf::query::Pattern;
use crate::rdf::store::TripleStore;
use crate::rdf::types::{NodeId, RdfTerm};
use rio_api::formatter::TriplesFormatter;
use rio_api::model;
use rio_turtle::NTriplesFormatter;
use tracing::debug;

/// Export the triples matching `pattern`, one line each, in handle order
pub fn to_ntriples(store: &TripleStore, pattern: &Pattern) -> SerializeResult<String> {
    let mut formatter = NTriplesFormatter::new(Vec::new());
    let mut written = 0usize;

    for id in store.find(pattern) {
        let Some(key) = store.key(id) else {
            continue;
        };
        let (Some(subject), Some(predicate), Some(object)) = (
            term(store, key.subject).and_then(as_subject),
            term(store, key.predicate).and_then(as_named_node),
            term(store, key.object).map(as_term),
        ) else {
            continue;
        };

        formatter.format(&model::Triple {
            subject,
            predicate,
            object,
        })?;
        written += 1;
    }

    let output = formatter.finish()?;
    debug!(triples = written, "N-Triples written");
    Ok(String::from_utf8(output)?)
}

fn term(store: &TripleStore, node: NodeId) -> Option<&RdfTerm> {
    store.term(node)
}

fn as_named_node(term: &RdfTerm) -> Option<model::NamedNode<'_>> {
    match term {
        RdfTerm::NamedNode(n) => Some(model::NamedNode { iri: n.as_str() }),
        _ => None,
    }
}

fn as_subject(term: &RdfTerm) -> Option<model::Subject<'_>> {
    match term {
        RdfTerm::NamedNode(n) => Some(model::NamedNode { iri: n.as_str() }.into()),
        RdfTerm::BlankNode(b) => Some(model::BlankNode { id: b.as_str() }.into()),
        RdfTerm::Literal(_) => None,
    }
}

fn as_term(term: &RdfTerm) -> model::Term<'_> {
    match term {
        RdfTerm::NamedNode(n) => model::NamedNode { iri: n.as_str() }.into(),
        RdfTerm::BlankNode(b) => model::BlankNode { id: b.as_str() }.into(),
        RdfTerm::Literal(l) => {
            let literal = if let Some(language) = l.language() {
                model::Literal::LanguageTaggedString {
                    value: l.value(),
                    language,
                }
            } else if l.datatype_iri().strip_prefix(XSD_NS) == Some("string") {
                model::Literal::Simple { value: l.value() }
            } else {
                model::Literal::Typed {
                    value: l.value(),
                    datatype: model::NamedNode { iri: l.datatype_iri() },
                }
            };
            literal.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::serialization::{load_str, RdfFormat};

    #[test]
    fn test_export_matches_pattern() {
        let mut store = TripleStore::new();
        let alice = store.uri("http://example.org/alice").unwrap();
        let name = store.uri("http://example.org/name").unwrap();
        let knows = store.uri("http://example.org/knows").unwrap();
        let bob = store.uri("http://example.org/bob").unwrap();
        let label = store.lang_literal("Alice", "en").unwrap();
        let age = store
            .typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer")
            .unwrap();
        store.add(None, alice, name, label).unwrap();
        store.add(None, alice, knows, bob).unwrap();
        store.add(None, bob, name, age).unwrap();

        let all = to_ntriples(&store, &Pattern::any()).unwrap();
        assert_eq!(all.lines().count(), 3);
        assert!(all.contains("<http://example.org/alice> <http://example.org/name> \"Alice\"@en ."));
        assert!(all.contains("\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"));

        let names = store.pattern().predicate(name).unwrap().build();
        assert_eq!(to_ntriples(&store, &names).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_export_reloads() {
        let mut store = TripleStore::new();
        let a = store.uri("http://example.org/a").unwrap();
        let p = store.uri("http://example.org/p").unwrap();
        let text = store.literal("plain");
        store.add(None, a, p, text).unwrap();
        let exported = to_ntriples(&store, &Pattern::any()).unwrap();
        assert!(exported.contains("\"plain\" ."));

        let mut copy = TripleStore::new();
        assert_eq!(load_str(&mut copy, &exported, RdfFormat::NTriples, None).unwrap(), 1);
    }
}
