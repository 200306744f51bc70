//! Search annotation over a projected forest.
//!
//! Both the status assignment and the set of paths to expand are pure
//! functions of `(forest, query)`, so re-running a search is idempotent.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{ConceptId, GraphModel};

use super::projector::{Forest, MatchStatus, RenderNode, project};

/// A normalised, case-folded search query. Blank input is inactive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(Option<String>);

impl Query {
	/// Query from raw input; any non-blank text is active.
	pub fn new(raw: &str) -> Self {
		Self::with_min_chars(raw, 1)
	}

	/// Queries shorter than `min_chars` (after trimming) are inactive.
	pub fn with_min_chars(raw: &str, min_chars: usize) -> Self {
		let trimmed = raw.trim();
		if trimmed.is_empty() || trimmed.chars().count() < min_chars {
			Self(None)
		} else {
			Self(Some(trimmed.to_lowercase()))
		}
	}

	/// False for blank or too-short input.
	pub fn is_active(&self) -> bool {
		self.0.is_some()
	}

	/// Case-insensitive substring test against the preferred label or any
	/// alternative label. An inactive query matches nothing.
	pub fn matches(&self, label: &str, alt_labels: &[String]) -> bool {
		let Some(needle) = &self.0 else {
			return false;
		};
		label.to_lowercase().contains(needle.as_str())
			|| alt_labels
				.iter()
				.any(|alt| alt.to_lowercase().contains(needle.as_str()))
	}
}

/// Return a copy of `forest` with every occurrence's [`MatchStatus`] set.
///
/// An inactive query leaves every node at [`MatchStatus::None`].
pub fn annotate(forest: &Forest, query: &Query) -> Forest {
	Forest {
		roots: forest
			.roots
			.iter()
			.map(|root| annotate_node(root, query))
			.collect(),
		omitted: forest.omitted.clone(),
	}
}

fn annotate_node(node: &RenderNode, query: &Query) -> RenderNode {
	let children: Vec<RenderNode> = node
		.children
		.iter()
		.map(|child| annotate_node(child, query))
		.collect();
	let match_status = if query.matches(&node.label, &node.alt_labels) {
		MatchStatus::Match
	} else if children
		.iter()
		.any(|c| c.match_status != MatchStatus::None)
	{
		MatchStatus::Ancestor
	} else {
		MatchStatus::None
	};
	RenderNode {
		id: node.id.clone(),
		path: node.path.clone(),
		depth: node.depth,
		label: node.label.clone(),
		alt_labels: node.alt_labels.clone(),
		children,
		has_multiple_parents: node.has_multiple_parents,
		other_parent_labels: node.other_parent_labels.clone(),
		match_status,
	}
}

/// Paths that must be expanded to reveal every match in an annotated forest:
/// each proper prefix of every `Match` or `Ancestor` occurrence.
pub fn expansion_paths(forest: &Forest) -> BTreeSet<String> {
	let mut paths = BTreeSet::new();
	forest.walk(|node| {
		if node.match_status != MatchStatus::None {
			paths.extend(node.ancestor_paths());
		}
	});
	paths
}

/// Project, annotate and collect the expansion set in one go.
pub fn expansion_paths_for(graph: &GraphModel, query: &Query) -> BTreeSet<String> {
	expansion_paths(&annotate(&project(graph), query))
}

/// Status per occurrence path.
pub fn status_map(forest: &Forest) -> BTreeMap<String, MatchStatus> {
	let mut statuses = BTreeMap::new();
	forest.walk(|node| {
		statuses.insert(node.path.clone(), node.match_status);
	});
	statuses
}

/// Concept ids with at least one `Match` occurrence.
pub fn matching_ids(forest: &Forest) -> HashSet<ConceptId> {
	let mut ids = HashSet::new();
	forest.walk(|node| {
		if node.match_status == MatchStatus::Match {
			ids.insert(node.id.clone());
		}
	});
	ids
}
