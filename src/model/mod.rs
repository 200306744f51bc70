//! The authoritative concept graph and the data shapes exchanged with the
//! persistence collaborator.

mod descendants;
mod graph;
mod types;

pub use descendants::DescendantIndex;
pub use graph::GraphModel;
pub use types::{BroaderEdge, Concept, ConceptId, ConceptRecord, RelatedEdge};
