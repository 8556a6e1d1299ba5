//! Generic graph utilities shared by the RDFS entailment layer.
//!
//! Hierarchies are handed over as a dense [`GraphView`]; [`Reachability`]
//! answers transitive-closure queries on them.

pub mod common;
pub mod community;
pub mod reachability;

pub use common::{GraphView, NodeId};
pub use community::{strongly_connected_components, SccResult};
pub use reachability::Reachability;
