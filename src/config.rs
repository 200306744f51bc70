//! Editor configuration. Every field has a default, so hosts only supply
//! the values they want to change.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Everything the editor session and its views can be tuned with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
	/// Graph view physics and hit testing.
	pub layout: LayoutConfig,
	/// Tree view behaviour.
	pub tree: TreeConfig,
}

impl EditorConfig {
	/// Parse and validate a JSON document. Missing fields keep their defaults.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// Reject out-of-range values.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.layout.validate()
	}
}

/// Force simulation tuning. The first five feed `force_graph` directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Pairwise repulsion.
	pub charge: f32,
	/// Link spring stiffness.
	pub spring: f32,
	/// Cap on the force applied to one node per tick.
	pub force_max: f32,
	/// Velocity scale of the integrator.
	pub node_speed: f32,
	/// Velocity kept per tick.
	pub damping: f32,
	/// Rest length of every link.
	pub link_distance: f64,
	/// Fraction of the centroid offset removed per tick.
	pub center_strength: f64,
	/// Per-node pull toward the center on each axis, scaled by energy.
	pub axis_strength: f64,
	/// Minimum distance kept between node centers.
	pub collision_radius: f64,
	/// Fraction of the remaining energy lost per tick.
	pub alpha_decay: f64,
	/// Below this energy the simulation goes idle.
	pub alpha_min: f64,
	/// Energy restored when a pinned node is released.
	pub reheat_alpha: f64,
	/// Energy restored on viewport resize.
	pub resize_alpha: f64,
	/// Largest per-tick displacement still considered at rest.
	pub motion_epsilon: f64,
	/// Drawn node radius.
	pub node_radius: f64,
	/// Pointer distance that still hits a node.
	pub hit_radius: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			charge: 150.0,
			spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
			link_distance: 60.0,
			center_strength: 0.1,
			axis_strength: 0.02,
			collision_radius: 12.0,
			alpha_decay: 0.0228,
			alpha_min: 0.001,
			reheat_alpha: 0.3,
			resize_alpha: 0.1,
			motion_epsilon: 0.01,
			node_radius: 5.0,
			hit_radius: 12.0,
		}
	}
}

impl LayoutConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		let positive = [
			("link_distance", self.link_distance),
			("collision_radius", self.collision_radius),
			("node_radius", self.node_radius),
			("hit_radius", self.hit_radius),
		];
		if let Some((name, _)) = positive.iter().find(|(_, v)| !(*v > 0.0)) {
			return Err(ConfigError::Invalid(format!("{name} must be positive")));
		}
		let unit = [
			("alpha_decay", self.alpha_decay),
			("alpha_min", self.alpha_min),
			("reheat_alpha", self.reheat_alpha),
			("resize_alpha", self.resize_alpha),
		];
		if let Some((name, _)) = unit.iter().find(|(_, v)| !(*v > 0.0 && *v <= 1.0)) {
			return Err(ConfigError::Invalid(format!("{name} must be in (0, 1]")));
		}
		Ok(())
	}
}

/// Tree view settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
	/// Open every root after a graph load.
	pub expand_roots_on_load: bool,
	/// Shorter queries are treated as empty.
	pub search_min_chars: usize,
}

impl Default for TreeConfig {
	fn default() -> Self {
		Self {
			expand_roots_on_load: true,
			search_min_chars: 1,
		}
	}
}
