//! Turtle and N-Triples loading

use super::{LoadError, LoadResult, RdfFormat};
use crate::rdf::store::{StoreError, TripleStore};
use crate::rdf::types::{Literal, NamedNode, NodeId, RdfTerm};
use rio_api::model;
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleParser};
use rustc_hash::FxHashMap;
use std::io::Cursor;
use tracing::{info, warn};

/// Parse `input` and add every triple to `graph`, or to the default graph.
///
/// Terms are validated before any node is minted. Blank node labels are
/// scoped to the document: each label gets a fresh blank node. Triples whose
/// typing is refused stay loaded and are only logged. Returns the number of
/// triples read.
pub fn load_str(store: &mut TripleStore, input: &str, format: RdfFormat, graph: Option<NodeId>) -> LoadResult<usize> {
    let mut loader = Loader {
        store,
        graph,
        blanks: FxHashMap::default(),
        count: 0,
        refused: 0,
    };

    let reader = Cursor::new(input.as_bytes());
    match format {
        RdfFormat::Turtle => {
            TurtleParser::new(reader, None).parse_all(&mut |t| loader.insert(t))?;
        }
        RdfFormat::NTriples => {
            NTriplesParser::new(reader).parse_all(&mut |t| loader.insert(t))?;
        }
    }

    info!(
        triples = loader.count,
        refused = loader.refused,
        format = ?format,
        "RDF loaded"
    );
    Ok(loader.count)
}

struct Loader<'s> {
    store: &'s mut TripleStore,
    graph: Option<NodeId>,
    blanks: FxHashMap<String, NodeId>,
    count: usize,
    refused: usize,
}

impl Loader<'_> {
    fn insert(&mut self, triple: model::Triple<'_>) -> LoadResult<()> {
        let subject = match triple.subject {
            model::Subject::NamedNode(n) => Term::Value(convert_named_node(n)?.into()),
            model::Subject::BlankNode(b) => Term::Blank(b.id),
            _ => return Err(LoadError::Unsupported("quoted triple subject")),
        };
        let predicate: RdfTerm = convert_named_node(triple.predicate)?.into();
        let object = match triple.object {
            model::Term::NamedNode(n) => Term::Value(convert_named_node(n)?.into()),
            model::Term::BlankNode(b) => Term::Blank(b.id),
            model::Term::Literal(l) => Term::Value(convert_literal(l)?.into()),
            _ => return Err(LoadError::Unsupported("quoted triple object")),
        };

        let s = self.node(subject);
        let p = self.store.map(predicate);
        let o = self.node(object);
        match self.store.add(self.graph, s, p, o) {
            Ok(_) => {}
            Err(StoreError::Contradiction(contradiction)) => {
                warn!(node = %contradiction.node(), "loaded triple left untyped");
                self.refused += 1;
            }
            Err(e) => return Err(e.into()),
        }
        self.count += 1;
        Ok(())
    }

    fn node(&mut self, term: Term<'_>) -> NodeId {
        match term {
            Term::Value(value) => self.store.map(value),
            Term::Blank(label) => {
                if let Some(&node) = self.blanks.get(label) {
                    return node;
                }
                let node = self.store.blank();
                self.blanks.insert(label.to_string(), node);
                node
            }
        }
    }
}

/// A validated term, or a document-scoped blank node label
enum Term<'a> {
    Value(RdfTerm),
    Blank(&'a str),
}

fn convert_named_node(n: model::NamedNode<'_>) -> LoadResult<NamedNode> {
    Ok(NamedNode::new(n.iri)?)
}

fn convert_literal(l: model::Literal<'_>) -> LoadResult<Literal> {
    match l {
        model::Literal::Simple { value } => Ok(Literal::new_simple_literal(value)),
        model::Literal::LanguageTaggedString { value, language } => {
            Ok(Literal::new_language_tagged_literal(value, language)?)
        }
        model::Literal::Typed { value, datatype } => {
            Ok(Literal::new_typed_literal(value, convert_named_node(datatype)?))
        }
    }
}
