use std::collections::{HashMap, HashSet};

use log::warn;

use super::graph::GraphModel;
use super::types::ConceptId;

/// Transitive `narrower` closure for every concept of one graph snapshot.
///
/// Built once per [`GraphModel`] and discarded with it, so drop-validity
/// checks during a drag are lookups instead of subtree walks. Descendants are
/// collected through every parent edge, not along a single path.
#[derive(Clone, Debug, Default)]
pub struct DescendantIndex {
	descendants: HashMap<ConceptId, HashSet<ConceptId>>,
}

impl DescendantIndex {
	/// Index every concept of `graph`. Cyclic data is tolerated: each set
	/// is the full reachable set, never a partial one cut at the cycle.
	pub fn build(graph: &GraphModel) -> Self {
		let mut index = Self::default();
		for concept in graph.concepts() {
			let found = index.reach(graph, &concept.id);
			index.descendants.insert(concept.id.clone(), found);
		}
		index
	}

	/// Everything below `from`. Sets already in the index are complete, so
	/// they are merged instead of walked again.
	fn reach(&self, graph: &GraphModel, from: &ConceptId) -> HashSet<ConceptId> {
		let mut found = HashSet::new();
		let mut stack = vec![from];
		while let Some(current) = stack.pop() {
			for child in graph.children_of(current) {
				if !found.insert(child.clone()) {
					continue;
				}
				match self.descendants.get(child) {
					Some(done) => found.extend(done.iter().cloned()),
					None => stack.push(child),
				}
			}
		}
		if found.remove(from) {
			warn!("cycle through concept {} while indexing descendants", from);
		}
		found
	}

	/// True if `candidate` lies anywhere below `ancestor`.
	pub fn is_descendant(&self, ancestor: &ConceptId, candidate: &ConceptId) -> bool {
		self.descendants
			.get(ancestor)
			.is_some_and(|set| set.contains(candidate))
	}

	/// The full descendant set of `ancestor`, `None` for unknown concepts.
	pub fn descendants_of(&self, ancestor: &ConceptId) -> Option<&HashSet<ConceptId>> {
		self.descendants.get(ancestor)
	}
}
