use std::collections::{HashMap, VecDeque};

use crate::model::{ConceptId, GraphModel};

/// One concept as a layout node.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Concept key.
	pub id: ConceptId,
	/// Preferred label.
	pub label: String,
	/// Distance from the nearest root, used for coloring.
	pub group: Option<u32>,
}

/// What a layout link stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
	/// Child to parent.
	Broader,
	/// Non-hierarchical association.
	Related,
}

/// One edge as a layout link.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GraphLink {
	/// Narrower end, or the first end of a related pair.
	pub source: ConceptId,
	/// Broader end, or the second end of a related pair.
	pub target: ConceptId,
	/// Broader or related.
	pub kind: LinkKind,
}

/// Snapshot of the graph as the layout sees it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	/// Every concept.
	pub nodes: Vec<GraphNode>,
	/// Broader edges followed by related links.
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Snapshot a graph for the layout.
	pub fn from_model(graph: &GraphModel) -> Self {
		let depths = root_distances(graph);
		let nodes = graph
			.concepts()
			.iter()
			.map(|c| GraphNode {
				id: c.id.clone(),
				label: c.pref_label.clone(),
				group: depths.get(&c.id).copied(),
			})
			.collect();
		let broader = graph.broader_edges().iter().map(|e| GraphLink {
			source: e.child.clone(),
			target: e.parent.clone(),
			kind: LinkKind::Broader,
		});
		let related = graph.related_edges().iter().map(|e| GraphLink {
			source: e.a.clone(),
			target: e.b.clone(),
			kind: LinkKind::Related,
		});
		Self {
			nodes,
			links: broader.chain(related).collect(),
		}
	}

	/// Same node ids and links in the same order; labels may differ.
	pub fn same_structure(&self, other: &Self) -> bool {
		self.links == other.links
			&& self.nodes.len() == other.nodes.len()
			&& self.nodes.iter().zip(&other.nodes).all(|(a, b)| a.id == b.id)
	}
}

fn root_distances(graph: &GraphModel) -> HashMap<ConceptId, u32> {
	let mut depths = HashMap::new();
	let mut queue: VecDeque<(ConceptId, u32)> =
		graph.roots().map(|c| (c.id.clone(), 0)).collect();
	while let Some((id, depth)) = queue.pop_front() {
		if depths.contains_key(&id) {
			continue;
		}
		for child in graph.children_of(&id) {
			queue.push_back((child.clone(), depth + 1));
		}
		depths.insert(id, depth);
	}
	depths
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ConceptRecord;

	fn model() -> GraphModel {
		GraphModel::from_records(&[
			ConceptRecord::new("a", "A"),
			ConceptRecord::new("b", "B").with_broader("a"),
			ConceptRecord::new("c", "C").with_broader("b").with_related("a"),
		])
	}

	#[test]
	fn links_cover_broader_and_related() {
		let data = GraphData::from_model(&model());
		assert_eq!(data.nodes.len(), 3);
		assert_eq!(data.links.iter().filter(|l| l.kind == LinkKind::Broader).count(), 2);
		assert_eq!(data.links.iter().filter(|l| l.kind == LinkKind::Related).count(), 1);
		assert_eq!(data.nodes[2].group, Some(2));
	}

	#[test]
	fn relabel_keeps_structure() {
		let data = GraphData::from_model(&model());
		let mut relabelled = data.clone();
		relabelled.nodes[0].label = "Renamed".into();
		assert!(data.same_structure(&relabelled));
		relabelled.links.pop();
		assert!(!data.same_structure(&relabelled));
	}
}
