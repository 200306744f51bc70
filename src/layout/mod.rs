//! Force-directed layout of the concept graph for the graph view.

mod engine;
mod types;

pub use engine::{ForceLayoutEngine, NodeClass, NodeInfo};
pub use types::{GraphData, GraphLink, GraphNode, LinkKind};
