//! Drag-and-drop reparenting.
//!
//! A drag runs `idle -> dragging -> (drop | cancel) -> idle`. Drop validity is
//! decided synchronously against the last known graph snapshot; nothing is
//! mutated locally, a valid drop only yields a [`ReparentCommand`] for the
//! persistence collaborator.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::{ConceptId, DescendantIndex, GraphModel};

use super::projector::parent_id_of;

/// Where the dragged concept is released.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DropTarget {
	/// An occurrence of this concept.
	Concept(ConceptId),
	/// The synthetic top-level target, meaning "no parent".
	Root,
}

/// Replace the parent on the dragged path, or add another parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropMode {
	/// Swap the parent on the dragged path for the target.
	#[default]
	Move,
	/// Keep every parent and add the target.
	Add,
}

impl DropMode {
	/// Mode selected by the additive modifier (Alt) at drop time.
	pub fn from_modifier(additive_modifier_held: bool) -> Self {
		if additive_modifier_held { Self::Add } else { Self::Move }
	}
}

/// Result of checking a drop target against the current drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropValidity {
	/// The target accepts the drop.
	Valid,
	/// No drag is in progress.
	NotDragging,
	/// The target is not in the current graph.
	UnknownTarget,
	/// The dragged concept vanished from the graph since the drag began.
	DraggedMissing,
	/// The target is the dragged concept itself.
	SelfTarget,
	/// The target is the parent on the very path being dragged.
	CurrentParent,
	/// The target sits below the dragged concept; dropping would close a cycle.
	Descendant,
	/// Dragging a root occurrence onto the root target.
	AlreadyRoot,
}

impl DropValidity {
	/// Only [`DropValidity::Valid`] accepts a drop.
	pub fn is_valid(self) -> bool {
		self == Self::Valid
	}
}

/// Request sent to the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReparentCommand {
	/// The concept being moved or given another parent.
	pub concept_id: ConceptId,
	/// `None` means the concept becomes a root.
	pub new_parent_id: Option<ConceptId>,
	/// Parent edge to delete; `None` keeps every existing parent.
	pub previous_parent_id_to_remove: Option<ConceptId>,
}

/// State of a drag in progress. Cleared completely when the drag ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragState {
	/// Concept under the pointer.
	pub dragged_concept_id: ConceptId,
	/// The occurrence being dragged; a multi-parent concept can be dragged
	/// from any of its occurrences.
	pub dragged_path: String,
	/// Parent on the dragged path, read from the path once at drag start.
	pub parent_on_path: Option<ConceptId>,
	/// Last hovered target, only set while it accepts the drop.
	pub drop_target: Option<DropTarget>,
	/// Modifier state seen on the last hover, for display only.
	pub additive_modifier_held: bool,
}

/// What releasing a drag amounted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
	/// A reparent request must be sent.
	Issued(ReparentCommand),
	/// Valid drop that changes nothing: the target already is a parent of
	/// the concept, or an additive drop on the root target.
	Unchanged,
	/// The target did not accept the drop.
	Refused(DropValidity),
	/// Released outside any target, or no drag was running.
	Cancelled,
}

/// Owns the single drag that may be in progress.
#[derive(Clone, Debug, Default)]
pub struct DragReparentController {
	state: Option<DragState>,
}

impl DragReparentController {
	/// An idle controller.
	pub fn new() -> Self {
		Self::default()
	}

	/// The drag in progress, if any.
	pub fn state(&self) -> Option<&DragState> {
		self.state.as_ref()
	}

	/// True between [`start`](Self::start) and the end or cancel.
	pub fn is_dragging(&self) -> bool {
		self.state.is_some()
	}

	/// Begin dragging one occurrence. A drag already in progress is
	/// cancelled first.
	pub fn start(&mut self, concept_id: ConceptId, path: impl Into<String>) {
		if let Some(previous) = self.state.take() {
			debug!(
				"drag of {} superseded by a new drag start",
				previous.dragged_concept_id
			);
		}
		let path = path.into();
		debug!("drag start {} at {}", concept_id, path);
		self.state = Some(DragState {
			dragged_concept_id: concept_id,
			parent_on_path: parent_id_of(&path),
			dragged_path: path,
			drop_target: None,
			additive_modifier_held: false,
		});
	}

	/// Hover over `target`. Records the target only if it accepts the drop.
	pub fn over(
		&mut self,
		graph: &GraphModel,
		descendants: &DescendantIndex,
		target: DropTarget,
		additive_modifier_held: bool,
	) -> DropValidity {
		let validity = self.check(graph, descendants, &target);
		if let Some(state) = self.state.as_mut() {
			state.additive_modifier_held = additive_modifier_held;
			state.drop_target = validity.is_valid().then_some(target);
		}
		validity
	}

	/// Whether the current drag may be dropped on `target`.
	pub fn check(
		&self,
		graph: &GraphModel,
		descendants: &DescendantIndex,
		target: &DropTarget,
	) -> DropValidity {
		let Some(state) = &self.state else {
			return DropValidity::NotDragging;
		};
		validate(graph, descendants, state, target)
	}

	/// Release the drag. The modifier is read here, once. The drag state is
	/// cleared whatever the outcome.
	pub fn end(
		&mut self,
		graph: &GraphModel,
		descendants: &DescendantIndex,
		target: Option<DropTarget>,
		additive_modifier_held: bool,
	) -> DropOutcome {
		let Some(state) = self.state.take() else {
			return DropOutcome::Cancelled;
		};
		let Some(target) = target else {
			debug!("drag of {} released outside any target", state.dragged_concept_id);
			return DropOutcome::Cancelled;
		};
		let validity = validate(graph, descendants, &state, &target);
		if !validity.is_valid() {
			debug!(
				"drop of {} on {:?} refused: {:?}",
				state.dragged_concept_id, target, validity
			);
			return DropOutcome::Refused(validity);
		}

		let mode = DropMode::from_modifier(additive_modifier_held);
		let new_parent_id = match target {
			DropTarget::Concept(id) => Some(id),
			DropTarget::Root => None,
		};
		let already_parent = match &new_parent_id {
			Some(id) => graph.parents_of(&state.dragged_concept_id).contains(id),
			None => mode == DropMode::Add,
		};
		if already_parent {
			debug!(
				"{:?} drop of {} changes nothing",
				mode, state.dragged_concept_id
			);
			return DropOutcome::Unchanged;
		}
		let previous_parent_id_to_remove = match mode {
			DropMode::Move => state.parent_on_path,
			DropMode::Add => None,
		};

		let command = ReparentCommand {
			concept_id: state.dragged_concept_id,
			new_parent_id,
			previous_parent_id_to_remove,
		};
		debug!("drop issues {:?} ({:?})", command, mode);
		DropOutcome::Issued(command)
	}

	/// Abandon the drag without issuing anything.
	pub fn cancel(&mut self) {
		if let Some(state) = self.state.take() {
			debug!("drag of {} cancelled", state.dragged_concept_id);
		}
	}
}

fn validate(
	graph: &GraphModel,
	descendants: &DescendantIndex,
	state: &DragState,
	target: &DropTarget,
) -> DropValidity {
	let dragged = &state.dragged_concept_id;
	if !graph.contains(dragged) {
		return DropValidity::DraggedMissing;
	}
	let parent_on_path = state.parent_on_path.as_ref();
	match target {
		DropTarget::Root if parent_on_path.is_none() => DropValidity::AlreadyRoot,
		DropTarget::Root => DropValidity::Valid,
		DropTarget::Concept(id) if !graph.contains(id) => DropValidity::UnknownTarget,
		DropTarget::Concept(id) if id == dragged => DropValidity::SelfTarget,
		DropTarget::Concept(id) if parent_on_path == Some(id) => {
			DropValidity::CurrentParent
		}
		DropTarget::Concept(id) if descendants.is_descendant(dragged, id) => {
			DropValidity::Descendant
		}
		DropTarget::Concept(_) => DropValidity::Valid,
	}
}
