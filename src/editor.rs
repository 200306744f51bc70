//! Session state of the hierarchy editor and its inbound control surface.
//!
//! [`HierarchyEditor`] holds the last confirmed [`GraphModel`] and everything
//! derived from it. It never awaits: callers run the repository round trips
//! (see [`crate::repository`]) and hand the results back through
//! [`HierarchyEditor::finish_load`] and [`HierarchyEditor::finish_reparent`].

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::{EditorError, RepositoryError};
use crate::hierarchy::search::{self, Query};
use crate::hierarchy::{
	DragReparentController, DragState, DropOutcome, DropTarget, DropValidity, ExpansionStore,
	Forest, ReparentCommand, project,
};
use crate::model::{ConceptId, DescendantIndex, GraphModel};

/// Shared handle to a projected forest. Equality is identity, so a new
/// projection always compares unequal to the previous one.
#[derive(Clone, Debug, Default)]
pub struct ForestHandle(Arc<Forest>);

impl PartialEq for ForestHandle {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Deref for ForestHandle {
	type Target = Forest;

	fn deref(&self) -> &Forest {
		&self.0
	}
}

/// One editing session over one scheme at a time.
#[derive(Debug, Default)]
pub struct HierarchyEditor {
	config: EditorConfig,
	scheme: Option<String>,
	graph: Arc<GraphModel>,
	descendants: DescendantIndex,
	projection: Arc<Forest>,
	forest: ForestHandle,
	raw_query: String,
	query: Query,
	expansion: ExpansionStore,
	drag: DragReparentController,
	in_flight: HashSet<ConceptId>,
	last_error: Option<String>,
	stale: bool,
}

impl HierarchyEditor {
	/// An editor with no scheme loaded.
	pub fn new(config: EditorConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	/// Settings the session was created with.
	pub fn config(&self) -> &EditorConfig {
		&self.config
	}

	/// The active scheme, set by [`begin_scheme`](Self::begin_scheme).
	pub fn scheme(&self) -> Option<&str> {
		self.scheme.as_deref()
	}

	/// Last confirmed graph of the active scheme.
	pub fn graph(&self) -> &GraphModel {
		&self.graph
	}

	/// Reachability index of [`graph`](Self::graph).
	pub fn descendants(&self) -> &DescendantIndex {
		&self.descendants
	}

	/// The current forest, annotated with the active search.
	pub fn forest(&self) -> &ForestHandle {
		&self.forest
	}

	/// Expanded paths and selection.
	pub fn expansion(&self) -> &ExpansionStore {
		&self.expansion
	}

	/// Whether the occurrence at `path` shows its children.
	pub fn is_expanded(&self, path: &str) -> bool {
		self.expansion.is_expanded(path)
	}

	/// The selected concept, shared by tree and graph.
	pub fn selected(&self) -> Option<&ConceptId> {
		self.expansion.selected()
	}

	/// Search text as typed.
	pub fn query(&self) -> &str {
		&self.raw_query
	}

	/// The drag in progress, if any.
	pub fn drag_state(&self) -> Option<&DragState> {
		self.drag.state()
	}

	/// True while a reparent of `id` awaits its response.
	pub fn is_reparent_pending(&self, id: &ConceptId) -> bool {
		self.in_flight.contains(id)
	}

	/// Message of the last failed load or reparent.
	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	/// Dismiss [`last_error`](Self::last_error).
	pub fn clear_error(&mut self) {
		self.last_error = None;
	}

	/// True when the query is long enough to filter.
	pub fn is_searching(&self) -> bool {
		self.query.is_active()
	}

	/// Concepts matching the active search, `None` when no search is active.
	pub fn matching_ids(&self) -> Option<HashSet<ConceptId>> {
		self.query
			.is_active()
			.then(|| search::matching_ids(&self.forest))
	}

	/// Switch to another scheme. Expansion, selection, search and any drag
	/// are reset, and the graph is empty until the new one arrives.
	pub fn begin_scheme(&mut self, scheme: impl Into<String>) {
		let scheme = scheme.into();
		debug!("switching to scheme {}", scheme);
		self.scheme = Some(scheme);
		self.expansion.reset();
		self.drag.cancel();
		self.raw_query.clear();
		self.query = Query::default();
		self.last_error = None;
		self.stale = false;
		self.replace_graph(GraphModel::new());
	}

	/// Install the result of a graph fetch for `scheme`. Results for a
	/// scheme that is no longer active are dropped.
	pub fn finish_load(
		&mut self,
		scheme: &str,
		result: Result<GraphModel, RepositoryError>,
	) -> Result<(), EditorError> {
		if self.scheme.as_deref() != Some(scheme) {
			debug!("discarding stale load of scheme {}", scheme);
			return Ok(());
		}
		match result {
			Ok(graph) => {
				self.stale = false;
				self.replace_graph(graph);
				if self.config.tree.expand_roots_on_load {
					let roots: Vec<String> = self.forest.roots.iter().map(|r| r.path.clone()).collect();
					self.expansion.extend(roots);
				}
				Ok(())
			}
			Err(err) => {
				warn!("loading scheme {} failed: {}", scheme, err);
				self.last_error = Some(err.to_string());
				Err(err.into())
			}
		}
	}

	/// Replace the graph of record and everything derived from it.
	pub fn replace_graph(&mut self, graph: GraphModel) {
		self.descendants = DescendantIndex::build(&graph);
		self.projection = Arc::new(project(&graph));
		self.graph = Arc::new(graph);
		let dragged_missing = self
			.drag
			.state()
			.is_some_and(|state| !self.graph.contains(&state.dragged_concept_id));
		if dragged_missing {
			self.drag.cancel();
		}
		self.reannotate();
	}

	fn reannotate(&mut self) {
		let annotated = search::annotate(&self.projection, &self.query);
		if self.query.is_active() {
			self.expansion.extend(search::expansion_paths(&annotated));
		}
		self.forest = ForestHandle(Arc::new(annotated));
	}

	/// Flip one path; returns whether it is now expanded.
	pub fn on_toggle_expand(&mut self, path: &str) -> bool {
		self.expansion.toggle(path)
	}

	/// Open every occurrence that has children.
	pub fn expand_all(&mut self) {
		self.expansion.expand_all(&self.forest);
	}

	/// Close every path.
	pub fn collapse_all(&mut self) {
		self.expansion.collapse_all();
	}

	/// Select a concept, or clear the selection.
	pub fn on_select(&mut self, id: Option<ConceptId>) {
		self.expansion.select(id);
	}

	/// Open the tree down to the selected concept's first occurrence.
	pub fn reveal_selection(&mut self) -> Option<String> {
		let id = self.expansion.selected()?.clone();
		self.expansion.reveal(&self.forest, &id)
	}

	/// Re-run the search. Paths needed to show the matches are added to the
	/// expanded set; nothing is collapsed.
	pub fn on_search_query_change(&mut self, raw: &str) {
		self.raw_query = raw.to_owned();
		self.query = Query::with_min_chars(raw, self.config.tree.search_min_chars);
		self.reannotate();
	}

	/// Start dragging the occurrence at `path`. Ignored while a reparent of
	/// the same concept is in flight.
	pub fn on_drag_start(&mut self, id: ConceptId, path: &str) -> bool {
		if self.in_flight.contains(&id) {
			debug!("drag of {} ignored, reparent pending", id);
			return false;
		}
		self.drag.start(id, path);
		true
	}

	/// Hover a target; see [`DragReparentController::over`].
	pub fn on_drag_over(&mut self, target: DropTarget, additive_modifier_held: bool) -> DropValidity {
		self.drag
			.over(&self.graph, &self.descendants, target, additive_modifier_held)
	}

	/// Drop validity for `target` without recording it as hovered.
	pub fn check_drop(&self, target: &DropTarget) -> DropValidity {
		self.drag.check(&self.graph, &self.descendants, target)
	}

	/// Release the drag. An issued command is marked in flight until
	/// [`finish_reparent`](Self::finish_reparent) is called for it.
	pub fn on_drag_end(
		&mut self,
		target: Option<DropTarget>,
		additive_modifier_held: bool,
	) -> Result<DropOutcome, EditorError> {
		let outcome = self.drag.end(
			&self.graph,
			&self.descendants,
			target,
			additive_modifier_held,
		);
		if let DropOutcome::Issued(command) = &outcome {
			if !self.in_flight.insert(command.concept_id.clone()) {
				return Err(EditorError::ReparentInFlight(command.concept_id.clone()));
			}
		}
		Ok(outcome)
	}

	/// Abandon the drag, as on Escape or a release outside the tree.
	pub fn on_drag_cancel(&mut self) {
		self.drag.cancel();
	}

	/// Settle a reparent issued for `scheme`. On success the refreshed graph
	/// replaces the current one; on failure the graph is left untouched and
	/// the error is kept for display. A change that was saved but could not
	/// be re-fetched marks the graph [stale](Self::is_stale).
	pub fn finish_reparent(
		&mut self,
		scheme: &str,
		command: &ReparentCommand,
		result: Result<GraphModel, RepositoryError>,
	) -> Result<(), EditorError> {
		self.in_flight.remove(&command.concept_id);
		match result {
			Ok(graph) if self.scheme.as_deref() == Some(scheme) => {
				info!("graph refreshed after reparenting {}", command.concept_id);
				self.replace_graph(graph);
				Ok(())
			}
			Ok(_) => {
				debug!("discarding refresh for inactive scheme {}", scheme);
				Ok(())
			}
			Err(err) => {
				if err.change_saved() && self.scheme.as_deref() == Some(scheme) {
					self.stale = true;
				}
				self.last_error = Some(err.to_string());
				Err(err.into())
			}
		}
	}

	/// True when the server holds changes the current graph does not show.
	/// Cleared by the next successful load.
	pub fn is_stale(&self) -> bool {
		self.stale
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hierarchy::MatchStatus;
	use crate::model::ConceptRecord;

	fn graph() -> GraphModel {
		GraphModel::from_records(&[
			ConceptRecord::new("A", "Animals"),
			ConceptRecord::new("B", "Birds").with_broader("A"),
			ConceptRecord::new("C", "Crows").with_broader("B"),
		])
	}

	fn loaded() -> HierarchyEditor {
		let mut editor = HierarchyEditor::new(EditorConfig::default());
		editor.begin_scheme("s");
		editor.finish_load("s", Ok(graph())).unwrap();
		editor
	}

	#[test]
	fn load_expands_roots() {
		let editor = loaded();
		assert!(editor.is_expanded("A"));
		assert!(!editor.is_expanded("A/B"));
	}

	#[test]
	fn search_expands_without_collapsing() {
		let mut editor = loaded();
		editor.on_toggle_expand("A");
		assert!(!editor.is_expanded("A"));
		editor.on_search_query_change("crow");
		assert!(editor.is_expanded("A") && editor.is_expanded("A/B"));
		assert_eq!(editor.forest().find("A/B/C").map(|n| n.match_status), Some(MatchStatus::Match));
		assert_eq!(editor.matching_ids(), Some(HashSet::from([ConceptId::from("C")])));

		editor.on_search_query_change("");
		assert_eq!(editor.matching_ids(), None);
		assert!(editor.is_expanded("A/B"));
	}

	#[test]
	fn forest_handle_changes_on_every_projection() {
		let mut editor = loaded();
		let before = editor.forest().clone();
		editor.on_toggle_expand("A");
		assert_eq!(&before, editor.forest());
		editor.replace_graph(graph());
		assert_ne!(&before, editor.forest());
	}

	#[test]
	fn in_flight_concept_cannot_be_dragged_again() {
		let mut editor = loaded();
		assert!(editor.on_drag_start("C".into(), "A/B/C"));
		let outcome = editor
			.on_drag_end(Some(DropTarget::Concept("A".into())), false)
			.unwrap();
		let command = match outcome {
			DropOutcome::Issued(command) => command,
			other => panic!("expected a command, got {other:?}"),
		};
		assert!(editor.is_reparent_pending(&"C".into()));
		assert!(!editor.on_drag_start("C".into(), "A/B/C"));

		let err = editor
			.finish_reparent("s", &command, Err(RepositoryError::Rejected("nope".into())))
			.unwrap_err();
		assert_eq!(err, EditorError::Repository(RepositoryError::Rejected("nope".into())));
		assert_eq!(editor.last_error(), Some("nope"));
		assert!(!editor.is_reparent_pending(&"C".into()));
		assert_eq!(editor.forest().occurrences(&"C".into())[0].path, "A/B/C");
	}

	#[test]
	fn saved_but_unrefreshed_reparent_marks_graph_stale() {
		let mut editor = loaded();
		editor.on_drag_start("C".into(), "A/B/C");
		let command = match editor.on_drag_end(Some(DropTarget::Concept("A".into())), false) {
			Ok(DropOutcome::Issued(command)) => command,
			other => panic!("expected a command, got {other:?}"),
		};
		let failure = RepositoryError::RefreshFailed(Box::new(RepositoryError::Unavailable(
			"timeout".into(),
		)));
		assert!(editor.finish_reparent("s", &command, Err(failure)).is_err());
		assert!(editor.is_stale());
		assert!(editor.last_error().is_some_and(|m| m.starts_with("change saved")));
		assert_eq!(editor.forest().occurrences(&"C".into())[0].path, "A/B/C");

		editor.finish_load("s", Ok(graph())).unwrap();
		assert!(!editor.is_stale());
	}

	#[test]
	fn scheme_switch_resets_session_state() {
		let mut editor = loaded();
		editor.on_select(Some("B".into()));
		editor.on_search_query_change("bird");
		editor.on_drag_start("C".into(), "A/B/C");
		editor.begin_scheme("other");
		assert!(editor.selected().is_none());
		assert!(editor.expansion().expanded_paths().is_empty());
		assert!(editor.drag_state().is_none());
		assert_eq!(editor.query(), "");
		assert!(editor.graph().is_empty());

		// a late response for the old scheme is ignored
		editor.finish_load("s", Ok(graph())).unwrap();
		assert!(editor.graph().is_empty());
	}

	#[test]
	fn reveal_selection_opens_path() {
		let mut editor = loaded();
		editor.collapse_all();
		editor.on_select(Some("C".into()));
		assert_eq!(editor.reveal_selection().as_deref(), Some("A/B/C"));
		assert!(editor.is_expanded("A") && editor.is_expanded("A/B"));
	}

	#[test]
	fn drag_of_removed_concept_is_cancelled_on_refresh() {
		let mut editor = loaded();
		editor.on_drag_start("C".into(), "A/B/C");
		let mut smaller = graph();
		smaller.remove_concept(&"C".into());
		editor.replace_graph(smaller);
		assert!(editor.drag_state().is_none());
	}
}
