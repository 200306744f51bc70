use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use super::types::{GraphData, LinkKind};
use crate::config::LayoutConfig;
use crate::model::ConceptId;

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Cosmetic state of a node. Changing it never touches the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeClass {
	/// No selection or search applies.
	#[default]
	Normal,
	/// The selected concept.
	Selected,
	/// Directly linked to the selected concept.
	Neighbor,
	/// Matches the active search.
	Match,
	/// Outside both the selection neighborhood and the matches.
	Dimmed,
}

/// What a simulation node carries besides its position.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Concept drawn by this node.
	pub id: ConceptId,
	/// Preferred label.
	pub label: String,
	/// Fill color, by depth group.
	pub color: String,
	/// Current emphasis.
	pub class: NodeClass,
}

#[derive(Clone, Copy, Debug)]
struct Body {
	idx: DefaultNodeIdx,
	x: f64,
	y: f64,
	anchored: bool,
}

/// A `force_graph` simulation plus link-distance, centering and collision
/// passes, with d3-style energy (`alpha`) that decays until the layout goes
/// idle.
///
/// The simulation is seeded only when the node or link set changes. Labels,
/// selection and search classes are updated in place, and resizing only
/// moves the center and reheats.
pub struct ForceLayoutEngine {
	graph: ForceGraph<NodeInfo, ()>,
	config: LayoutConfig,
	data: GraphData,
	id_to_idx: HashMap<ConceptId, DefaultNodeIdx>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx, LinkKind)>,
	positions: HashMap<DefaultNodeIdx, (f64, f64)>,
	pinned: HashSet<DefaultNodeIdx>,
	width: f64,
	height: f64,
	alpha: f64,
	rebuilds: usize,
}

impl ForceLayoutEngine {
	/// Seed a fresh simulation sized to the viewport.
	pub fn build(data: &GraphData, width: f64, height: f64, config: LayoutConfig) -> Self {
		Self::seed(data, width, height, config, &HashMap::new())
	}

	fn seed(
		data: &GraphData,
		width: f64,
		height: f64,
		config: LayoutConfig,
		previous: &HashMap<ConceptId, (f64, f64)>,
	) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: config.charge,
			force_spring: config.spring,
			force_max: config.force_max,
			node_speed: config.node_speed,
			damping_factor: config.damping,
		});
		let mut id_to_idx = HashMap::new();
		let mut edges = Vec::new();
		let ring = (config.link_distance * data.nodes.len() as f64 / (2.0 * PI)).max(100.0);

		for (i, node) in data.nodes.iter().enumerate() {
			let color = node
				.group
				.map(|g| COLORS[g as usize % COLORS.len()])
				.unwrap_or(COLORS[0])
				.to_string();
			let (x, y) = previous.get(&node.id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / data.nodes.len() as f64;
				(
					width / 2.0 + ring * angle.cos(),
					height / 2.0 + ring * angle.sin(),
				)
			});
			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: node.id.clone(),
					label: node.label.clone(),
					color,
					class: NodeClass::Normal,
				},
			});
			id_to_idx.insert(node.id.clone(), idx);
		}

		for link in &data.links {
			if let (Some(&src), Some(&tgt)) =
				(id_to_idx.get(&link.source), id_to_idx.get(&link.target))
			{
				graph.add_edge(src, tgt, EdgeData::default());
				edges.push((src, tgt, link.kind));
			}
		}

		let mut engine = Self {
			graph,
			config,
			data: data.clone(),
			id_to_idx,
			edges,
			positions: HashMap::new(),
			pinned: HashSet::new(),
			width,
			height,
			alpha: if data.nodes.is_empty() { 0.0 } else { 1.0 },
			rebuilds: 0,
		};
		engine.refresh_positions();
		debug!(
			"layout seeded with {} nodes, {} links",
			data.nodes.len(),
			engine.edges.len()
		);
		engine
	}

	/// Bring the engine up to date with `data`. Returns `true` if the node or
	/// link set changed and the simulation was rebuilt; nodes that survive a
	/// rebuild keep their positions.
	pub fn sync(&mut self, data: &GraphData) -> bool {
		if self.data.same_structure(data) {
			let labels: HashMap<&ConceptId, &str> =
				data.nodes.iter().map(|n| (&n.id, n.label.as_str())).collect();
			self.graph.visit_nodes_mut(|node| {
				if let Some(label) = labels.get(&node.data.user_data.id) {
					node.data.user_data.label = (*label).to_string();
				}
			});
			self.data = data.clone();
			return false;
		}
		let previous: HashMap<ConceptId, (f64, f64)> = self
			.id_to_idx
			.iter()
			.filter_map(|(id, idx)| self.positions.get(idx).map(|&p| (id.clone(), p)))
			.collect();
		let rebuilds = self.rebuilds + 1;
		*self = Self::seed(data, self.width, self.height, self.config.clone(), &previous);
		self.rebuilds = rebuilds;
		debug!("layout rebuilt ({} so far)", rebuilds);
		true
	}

	/// Restyle nodes for the current selection and search. Positions and
	/// energy are left alone.
	pub fn classify(
		&mut self,
		selected: Option<&ConceptId>,
		matches: Option<&HashSet<ConceptId>>,
	) {
		let selected_idx = selected.and_then(|id| self.id_to_idx.get(id).copied());
		let neighbors: HashSet<DefaultNodeIdx> = match selected_idx {
			Some(sel) => self
				.edges
				.iter()
				.filter_map(|&(s, t, _)| {
					if s == sel {
						Some(t)
					} else if t == sel {
						Some(s)
					} else {
						None
					}
				})
				.collect(),
			None => HashSet::new(),
		};
		let focused = selected_idx.is_some() || matches.is_some();
		self.graph.visit_nodes_mut(|node| {
			let idx = node.index();
			node.data.user_data.class = if Some(idx) == selected_idx {
				NodeClass::Selected
			} else if neighbors.contains(&idx) {
				NodeClass::Neighbor
			} else if matches.is_some_and(|m| m.contains(&node.data.user_data.id)) {
				NodeClass::Match
			} else if focused {
				NodeClass::Dimmed
			} else {
				NodeClass::Normal
			};
		});
	}

	/// Advance one step. Returns `false` once the layout is idle.
	pub fn tick(&mut self, dt: f32) -> bool {
		if !self.is_running() {
			return false;
		}
		self.graph.update(dt);

		let mut bodies = self.bodies();
		self.apply_links(&mut bodies);
		self.apply_centering(&mut bodies);
		self.apply_collisions(&mut bodies);
		self.write_back(&bodies);

		let before = std::mem::take(&mut self.positions);
		self.refresh_positions();
		let max_move = self
			.positions
			.iter()
			.filter_map(|(idx, &(x, y))| {
				before
					.get(idx)
					.map(|&(bx, by)| ((x - bx).powi(2) + (y - by).powi(2)).sqrt())
			})
			.fold(0.0, f64::max);

		let target = if self.pinned.is_empty() {
			0.0
		} else {
			self.config.reheat_alpha
		};
		self.alpha += (target - self.alpha) * self.config.alpha_decay;
		if self.pinned.is_empty()
			&& (self.alpha < self.config.alpha_min || max_move < self.config.motion_epsilon)
		{
			self.alpha = 0.0;
			debug!("layout settled");
		}
		true
	}

	/// Fix a node at `(x, y)` in graph space until [`unpin`](Self::unpin).
	pub fn pin(&mut self, id: &ConceptId, x: f64, y: f64) -> bool {
		let Some(&idx) = self.id_to_idx.get(id) else {
			return false;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = x as f32;
				node.data.y = y as f32;
				node.data.is_anchor = true;
			}
		});
		self.positions.insert(idx, (x, y));
		self.pinned.insert(idx);
		self.reheat(self.config.reheat_alpha);
		true
	}

	/// Release a pinned node and let its neighbours resettle.
	pub fn unpin(&mut self, id: &ConceptId) {
		let Some(&idx) = self.id_to_idx.get(id) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = false;
			}
		});
		if self.pinned.remove(&idx) {
			self.reheat(self.config.reheat_alpha);
		}
	}

	/// Whether a concept is held in place by a drag.
	pub fn is_pinned(&self, id: &ConceptId) -> bool {
		self.id_to_idx
			.get(id)
			.is_some_and(|idx| self.pinned.contains(idx))
	}

	/// Move the centering target to the new viewport center. Positions are
	/// kept; the simulation is only lightly reheated.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.reheat(self.config.resize_alpha);
	}

	/// Raise the energy to at least `alpha`. No effect on an empty layout.
	pub fn reheat(&mut self, alpha: f64) {
		if !self.data.nodes.is_empty() {
			self.alpha = self.alpha.max(alpha);
		}
	}

	/// Drop the energy to zero; the next tick does nothing.
	pub fn stop(&mut self) {
		self.alpha = 0.0;
	}

	/// True until the layout settles or is stopped.
	pub fn is_running(&self) -> bool {
		self.alpha > 0.0
	}

	/// Current energy.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// How many times [`sync`](Self::sync) had to reseed.
	pub fn rebuild_count(&self) -> usize {
		self.rebuilds
	}

	/// Tuning in use.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Viewport width.
	pub fn width(&self) -> f64 {
		self.width
	}

	/// Viewport height.
	pub fn height(&self) -> f64 {
		self.height
	}

	/// Centering target, the middle of the viewport.
	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	/// Number of simulated nodes.
	pub fn node_count(&self) -> usize {
		self.id_to_idx.len()
	}

	/// Graph-space position of a concept.
	pub fn position(&self, id: &ConceptId) -> Option<(f64, f64)> {
		self.id_to_idx
			.get(id)
			.and_then(|idx| self.positions.get(idx).copied())
	}

	/// Topmost node within the hit radius of a graph-space point.
	pub fn node_at(&self, x: f64, y: f64) -> Option<ConceptId> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - x, node.y() as f64 - y);
			if (dx * dx + dy * dy).sqrt() < self.config.hit_radius {
				found = Some(node.data.user_data.id.clone());
			}
		});
		found
	}

	/// Emphasis of a concept, `None` when it is not laid out.
	pub fn class_of(&self, id: &ConceptId) -> Option<NodeClass> {
		let idx = *self.id_to_idx.get(id)?;
		let mut class = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				class = Some(node.data.user_data.class);
			}
		});
		class
	}

	/// Every node with its current position.
	pub fn visit_nodes(&self, mut visit: impl FnMut(&NodeInfo, f64, f64)) {
		self.graph.visit_nodes(|node| {
			visit(&node.data.user_data, node.x() as f64, node.y() as f64);
		});
	}

	/// Every link with its end positions.
	pub fn links(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64), LinkKind)> + '_ {
		self.edges.iter().filter_map(|&(s, t, kind)| {
			Some((*self.positions.get(&s)?, *self.positions.get(&t)?, kind))
		})
	}

	fn refresh_positions(&mut self) {
		let positions = &mut self.positions;
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
	}

	fn bodies(&self) -> Vec<Body> {
		let mut bodies = Vec::with_capacity(self.id_to_idx.len());
		self.graph.visit_nodes(|node| {
			bodies.push(Body {
				idx: node.index(),
				x: node.x() as f64,
				y: node.y() as f64,
				anchored: node.data.is_anchor,
			});
		});
		bodies
	}

	fn write_back(&mut self, bodies: &[Body]) {
		let moved: HashMap<DefaultNodeIdx, (f64, f64)> = bodies
			.iter()
			.filter(|b| !b.anchored)
			.map(|b| (b.idx, (b.x, b.y)))
			.collect();
		self.graph.visit_nodes_mut(|node| {
			if let Some(&(x, y)) = moved.get(&node.index()) {
				node.data.x = x as f32;
				node.data.y = y as f32;
			}
		});
	}

	/// Pull or push each linked pair toward the rest length.
	fn apply_links(&self, bodies: &mut [Body]) {
		let slot: HashMap<DefaultNodeIdx, usize> =
			bodies.iter().enumerate().map(|(i, b)| (b.idx, i)).collect();
		for &(s, t, _) in &self.edges {
			let (Some(&i), Some(&j)) = (slot.get(&s), slot.get(&t)) else {
				continue;
			};
			let (dx, dy) = (bodies[j].x - bodies[i].x, bodies[j].y - bodies[i].y);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-6 {
				continue;
			}
			let k = (dist - self.config.link_distance) / dist * self.alpha * 0.5;
			let (wi, wj) = shares(bodies[i].anchored, bodies[j].anchored);
			bodies[i].x += dx * k * wi;
			bodies[i].y += dy * k * wi;
			bodies[j].x -= dx * k * wj;
			bodies[j].y -= dy * k * wj;
		}
	}

	/// Shift the centroid toward the viewport center, then nudge each node
	/// toward it on both axes.
	fn apply_centering(&self, bodies: &mut [Body]) {
		if bodies.is_empty() {
			return;
		}
		let (cx, cy) = self.center();
		let n = bodies.len() as f64;
		let (mx, my) = bodies
			.iter()
			.fold((0.0, 0.0), |(sx, sy), b| (sx + b.x / n, sy + b.y / n));
		let (shift_x, shift_y) = (
			(cx - mx) * self.config.center_strength,
			(cy - my) * self.config.center_strength,
		);
		let axis = self.config.axis_strength * self.alpha;
		for body in bodies.iter_mut().filter(|b| !b.anchored) {
			body.x += shift_x + (cx - body.x) * axis;
			body.y += shift_y + (cy - body.y) * axis;
		}
	}

	/// Separate overlapping pairs.
	fn apply_collisions(&self, bodies: &mut [Body]) {
		let min = 2.0 * self.config.collision_radius;
		for i in 0..bodies.len() {
			for j in (i + 1)..bodies.len() {
				let (mut dx, mut dy) = (bodies[j].x - bodies[i].x, bodies[j].y - bodies[i].y);
				let mut dist = (dx * dx + dy * dy).sqrt();
				if dist >= min {
					continue;
				}
				if dist < 1e-6 {
					let angle = (i * 7 + j) as f64;
					(dx, dy, dist) = (angle.cos() * 1e-3, angle.sin() * 1e-3, 1e-3);
				}
				let push = (min - dist) / dist;
				let (wi, wj) = shares(bodies[i].anchored, bodies[j].anchored);
				bodies[i].x -= dx * push * wi;
				bodies[i].y -= dy * push * wi;
				bodies[j].x += dx * push * wj;
				bodies[j].y += dy * push * wj;
			}
		}
	}
}

/// How a correction is split between two ends; anchored ends take none.
fn shares(a_anchored: bool, b_anchored: bool) -> (f64, f64) {
	match (a_anchored, b_anchored) {
		(false, false) => (0.5, 0.5),
		(false, true) => (1.0, 0.0),
		(true, false) => (0.0, 1.0),
		(true, true) => (0.0, 0.0),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::{GraphLink, GraphNode};

	fn data(n: usize) -> GraphData {
		let nodes = (0..n)
			.map(|i| GraphNode {
				id: ConceptId::new(format!("n{i}")),
				label: format!("Node {i}"),
				group: Some((i % 3) as u32),
			})
			.collect();
		let links = (1..n)
			.map(|i| GraphLink {
				source: ConceptId::new(format!("n{i}")),
				target: ConceptId::new(format!("n{}", (i - 1) / 2)),
				kind: LinkKind::Broader,
			})
			.collect();
		GraphData { nodes, links }
	}

	fn settle(engine: &mut ForceLayoutEngine) -> usize {
		let mut ticks = 0;
		while engine.tick(0.016) {
			ticks += 1;
			assert!(ticks < 5000, "layout never settled");
		}
		ticks
	}

	fn snapshot(engine: &ForceLayoutEngine) -> Vec<(ConceptId, (f64, f64))> {
		let mut all = Vec::new();
		engine.visit_nodes(|info, x, y| all.push((info.id.clone(), (x, y))));
		all
	}

	fn centroid(engine: &ForceLayoutEngine) -> (f64, f64) {
		let all = snapshot(engine);
		let n = all.len() as f64;
		all.iter()
			.fold((0.0, 0.0), |(sx, sy), (_, (x, y))| (sx + x / n, sy + y / n))
	}

	#[test]
	fn empty_layout_is_idle() {
		let mut engine = ForceLayoutEngine::build(&GraphData::default(), 800.0, 600.0, LayoutConfig::default());
		assert!(!engine.is_running());
		assert!(!engine.tick(0.016));
		engine.resize(100.0, 100.0);
		assert!(!engine.is_running());
		assert_eq!(engine.node_at(400.0, 300.0), None);
	}

	#[test]
	fn simulation_settles_and_stays_finite() {
		let mut engine = ForceLayoutEngine::build(&data(12), 800.0, 600.0, LayoutConfig::default());
		settle(&mut engine);
		assert!(!engine.is_running());
		assert!(snapshot(&engine).iter().all(|(_, (x, y))| x.is_finite() && y.is_finite()));
		assert!(!engine.tick(0.016));
	}

	#[test]
	fn resize_keeps_positions_and_recenters() {
		let mut engine = ForceLayoutEngine::build(&data(8), 800.0, 600.0, LayoutConfig::default());
		settle(&mut engine);
		let before = snapshot(&engine);

		engine.resize(1600.0, 1200.0);
		assert!(engine.is_running());
		assert!(engine.alpha() <= LayoutConfig::default().resize_alpha);
		assert_eq!(snapshot(&engine), before);

		let distance = |(x, y): (f64, f64)| ((x - 800.0).powi(2) + (y - 600.0).powi(2)).sqrt();
		let start = distance(centroid(&engine));
		for _ in 0..30 {
			engine.tick(0.016);
		}
		assert!(distance(centroid(&engine)) < start * 0.5);
		assert_eq!(engine.rebuild_count(), 0);
	}

	#[test]
	fn classify_is_cosmetic() {
		let mut engine = ForceLayoutEngine::build(&data(5), 800.0, 600.0, LayoutConfig::default());
		settle(&mut engine);
		let before = snapshot(&engine);

		let matches = HashSet::from([ConceptId::from("n4")]);
		engine.classify(Some(&"n1".into()), Some(&matches));
		assert_eq!(engine.class_of(&"n1".into()), Some(NodeClass::Selected));
		assert_eq!(engine.class_of(&"n0".into()), Some(NodeClass::Neighbor));
		assert_eq!(engine.class_of(&"n3".into()), Some(NodeClass::Neighbor));
		assert_eq!(engine.class_of(&"n2".into()), Some(NodeClass::Dimmed));
		// n4 hangs off n1 too, so the neighbour class wins
		assert_eq!(engine.class_of(&"n4".into()), Some(NodeClass::Neighbor));

		engine.classify(None, None);
		assert_eq!(engine.class_of(&"n2".into()), Some(NodeClass::Normal));
		assert_eq!(snapshot(&engine), before);
		assert!(!engine.is_running());
		assert_eq!(engine.rebuild_count(), 0);
	}

	#[test]
	fn sync_rebuilds_only_on_structural_change() {
		let original = data(4);
		let mut engine = ForceLayoutEngine::build(&original, 800.0, 600.0, LayoutConfig::default());
		settle(&mut engine);
		let kept = engine.position(&"n1".into());

		let mut relabelled = original.clone();
		relabelled.nodes[1].label = "Renamed".into();
		assert!(!engine.sync(&relabelled));
		assert!(!engine.is_running());
		assert_eq!(engine.position(&"n1".into()), kept);
		let mut label = None;
		engine.visit_nodes(|info, _, _| {
			if info.id.as_str() == "n1" {
				label = Some(info.label.clone());
			}
		});
		assert_eq!(label.as_deref(), Some("Renamed"));

		assert!(engine.sync(&data(5)));
		assert_eq!(engine.rebuild_count(), 1);
		assert_eq!(engine.node_count(), 5);
		assert_eq!(engine.position(&"n1".into()), kept);
		assert!(engine.is_running());
	}

	#[test]
	fn pinned_node_holds_until_released() {
		let mut engine = ForceLayoutEngine::build(&data(6), 800.0, 600.0, LayoutConfig::default());
		settle(&mut engine);
		assert!(engine.pin(&"n2".into(), 10.0, 20.0));
		assert!(engine.is_pinned(&"n2".into()));
		for _ in 0..50 {
			assert!(engine.tick(0.016));
		}
		assert_eq!(engine.position(&"n2".into()), Some((10.0, 20.0)));

		engine.unpin(&"n2".into());
		assert!(!engine.is_pinned(&"n2".into()));
		assert!(engine.is_running());
		settle(&mut engine);
		assert!(!engine.pin(&"missing".into(), 0.0, 0.0));
	}

	#[test]
	fn hit_testing_finds_node_under_point() {
		let engine = ForceLayoutEngine::build(&data(3), 800.0, 600.0, LayoutConfig::default());
		let (x, y) = engine.position(&"n0".into()).unwrap();
		assert_eq!(engine.node_at(x + 1.0, y - 1.0), Some(ConceptId::from("n0")));
	}
}
