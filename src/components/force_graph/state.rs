use crate::config::LayoutConfig;
use crate::layout::{ForceLayoutEngine, GraphData};
use crate::model::ConceptId;

/// Pointer movement beyond which a press on a node counts as a drag.
const CLICK_SLOP: f64 = 3.0;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct NodeDrag {
	pub node: Option<ConceptId>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

/// Everything the canvas needs between frames: the layout plus the
/// viewport transform and pointer state.
pub struct CanvasState {
	pub engine: ForceLayoutEngine,
	pub transform: ViewTransform,
	pub drag: NodeDrag,
	pub pan: PanState,
	pub hovered: Option<ConceptId>,
}

impl CanvasState {
	pub fn new(data: &GraphData, width: f64, height: f64, config: LayoutConfig) -> Self {
		Self {
			engine: ForceLayoutEngine::build(data, width, height, config),
			transform: ViewTransform::default(),
			drag: NodeDrag::default(),
			pan: PanState::default(),
			hovered: None,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<ConceptId> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.engine.node_at(gx, gy)
	}

	/// Press at a screen point: grab the node under it, or start panning.
	pub fn press(&mut self, sx: f64, sy: f64) {
		match self.node_at_position(sx, sy) {
			Some(id) => {
				let (nx, ny) = self.engine.position(&id).unwrap_or_default();
				self.engine.pin(&id, nx, ny);
				self.drag = NodeDrag {
					node: Some(id),
					start_x: sx,
					start_y: sy,
					node_start_x: nx,
					node_start_y: ny,
					moved: false,
				};
			}
			None => {
				self.pan = PanState {
					active: true,
					start_x: sx,
					start_y: sy,
					transform_start_x: self.transform.x,
					transform_start_y: self.transform.y,
					moved: false,
				};
			}
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Some(id) = self.drag.node.clone() {
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if dx.hypot(dy) > CLICK_SLOP {
				self.drag.moved = true;
			}
			let (k, nx, ny) = (self.transform.k, self.drag.node_start_x, self.drag.node_start_y);
			self.engine.pin(&id, nx + dx / k, ny + dy / k);
		} else if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if dx.hypot(dy) > CLICK_SLOP {
				self.pan.moved = true;
			}
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
		} else {
			self.hovered = self.node_at_position(sx, sy);
		}
	}

	/// Release the pointer. Returns the click result: `Some(Some(id))` for a
	/// click on a node, `Some(None)` for a click on the background, `None`
	/// if the press turned into a drag or pan.
	pub fn release(&mut self) -> Option<Option<ConceptId>> {
		let drag = std::mem::take(&mut self.drag);
		let pan = std::mem::take(&mut self.pan);
		if let Some(id) = drag.node {
			self.engine.unpin(&id);
			return (!drag.moved).then_some(Some(id));
		}
		(pan.active && !pan.moved).then_some(None)
	}

	pub fn leave(&mut self) {
		if let Some(id) = std::mem::take(&mut self.drag).node {
			self.engine.unpin(&id);
		}
		self.pan = PanState::default();
		self.hovered = None;
	}

	pub fn zoom(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.engine.resize(width, height);
	}
}
