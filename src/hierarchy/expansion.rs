//! Which occurrences of the tree are open, and the shared selection.

use std::collections::BTreeSet;

use log::debug;

use crate::model::ConceptId;

use super::projector::Forest;

/// Which tree paths are open and which concept is selected.
///
/// Session scoped and shared by the tree and graph views. Search
/// auto-expansion only ever adds paths, so manual expansions survive it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpansionStore {
	expanded: BTreeSet<String>,
	selected: Option<ConceptId>,
}

impl ExpansionStore {
	/// Nothing expanded, nothing selected.
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether `path` is open.
	pub fn is_expanded(&self, path: &str) -> bool {
		self.expanded.contains(path)
	}

	/// Every open path.
	pub fn expanded_paths(&self) -> &BTreeSet<String> {
		&self.expanded
	}

	/// Flip a path and return whether it is now expanded.
	pub fn toggle(&mut self, path: &str) -> bool {
		if self.expanded.remove(path) {
			false
		} else {
			self.expanded.insert(path.to_owned());
			true
		}
	}

	/// Open `path`.
	pub fn expand(&mut self, path: impl Into<String>) {
		self.expanded.insert(path.into());
	}

	/// Close `path`; its descendants keep their own state.
	pub fn collapse(&mut self, path: &str) {
		self.expanded.remove(path);
	}

	/// Union `paths` into the expanded set.
	pub fn extend(&mut self, paths: impl IntoIterator<Item = String>) {
		let before = self.expanded.len();
		self.expanded.extend(paths);
		debug!("expanded {} additional path(s)", self.expanded.len() - before);
	}

	/// Open every occurrence that has children.
	pub fn expand_all(&mut self, forest: &Forest) {
		let mut paths = Vec::new();
		forest.walk(|node| {
			if !node.is_leaf() {
				paths.push(node.path.clone());
			}
		});
		self.extend(paths);
	}

	/// Close every path.
	pub fn collapse_all(&mut self) {
		self.expanded.clear();
	}

	/// Select a concept, or clear the selection with `None`.
	pub fn select(&mut self, id: Option<ConceptId>) {
		self.selected = id;
	}

	/// The selected concept.
	pub fn selected(&self) -> Option<&ConceptId> {
		self.selected.as_ref()
	}

	/// Expand the ancestors of the concept's first occurrence so the tree
	/// shows it. Returns the occurrence's path, if any.
	pub fn reveal(&mut self, forest: &Forest, id: &ConceptId) -> Option<String> {
		let node = forest.occurrences(id).into_iter().next()?;
		self.extend(node.ancestor_paths());
		Some(node.path.clone())
	}

	/// Forget everything, as when switching to another scheme.
	pub fn reset(&mut self) {
		self.expanded.clear();
		self.selected = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hierarchy::project;
	use crate::model::{ConceptRecord, GraphModel};

	fn forest() -> Forest {
		project(&GraphModel::from_records(&[
			ConceptRecord::new("a", "A"),
			ConceptRecord::new("b", "B").with_broader("a"),
			ConceptRecord::new("c", "C").with_broader("b"),
			ConceptRecord::new("x", "X"),
		]))
	}

	#[test]
	fn toggle_flips_state() {
		let mut store = ExpansionStore::new();
		assert!(store.toggle("a"));
		assert!(store.is_expanded("a"));
		assert!(!store.toggle("a"));
		assert!(!store.is_expanded("a"));
	}

	#[test]
	fn extend_keeps_manual_expansions() {
		let mut store = ExpansionStore::new();
		store.expand("x");
		store.extend(["a".to_string(), "a/b".to_string()]);
		assert!(store.is_expanded("x") && store.is_expanded("a/b"));
	}

	#[test]
	fn expand_all_skips_leaves() {
		let mut store = ExpansionStore::new();
		store.expand_all(&forest());
		let paths: Vec<_> = store.expanded_paths().iter().cloned().collect();
		assert_eq!(paths, vec!["a".to_string(), "a/b".to_string()]);
		store.collapse_all();
		assert!(store.expanded_paths().is_empty());
	}

	#[test]
	fn reveal_opens_ancestors_of_first_occurrence() {
		let mut store = ExpansionStore::new();
		let path = store.reveal(&forest(), &"c".into());
		assert_eq!(path.as_deref(), Some("a/b/c"));
		assert!(store.is_expanded("a") && store.is_expanded("a/b"));
		assert!(!store.is_expanded("a/b/c"));
		assert_eq!(store.reveal(&forest(), &"missing".into()), None);
	}

	#[test]
	fn reset_clears_selection_and_paths() {
		let mut store = ExpansionStore::new();
		store.expand("a");
		store.select(Some("a".into()));
		store.reset();
		assert_eq!(store, ExpansionStore::new());
	}
}
