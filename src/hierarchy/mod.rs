//! Tree-side view state derived from the concept graph: projection into
//! path-addressed trees, search annotation, expansion and the drag protocol.

pub mod drag;
pub mod expansion;
pub mod projector;
pub mod search;

pub use drag::{
	DragReparentController, DragState, DropMode, DropOutcome, DropTarget, DropValidity,
	ReparentCommand,
};
pub use expansion::ExpansionStore;
pub use projector::{Forest, MatchStatus, PATH_SEPARATOR, RenderNode, project};
