//! Projection of the concept DAG into one tree occurrence per parent path.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::model::{ConceptId, GraphModel};

/// Joins path segments into a [`RenderNode::path`].
pub const PATH_SEPARATOR: char = '/';

/// Escape introducing an encoded separator or escape inside a segment.
const ESCAPE: char = '%';

/// Search state of one occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MatchStatus {
	/// The concept's labels contain the query.
	Match,
	/// Not a match itself, but something below it is.
	Ancestor,
	/// Neither, or no search is active.
	#[default]
	None,
}

/// One appearance of a concept at one position of the forest.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode {
	/// The concept shown here; shared by all its occurrences.
	pub id: ConceptId,
	/// Encoded ancestor ids from the root down to this node, unique per
	/// occurrence. Built with [`child_path`], read back with [`path_ids`].
	pub path: String,
	/// Zero for roots.
	pub depth: usize,
	/// Preferred label.
	pub label: String,
	/// Alternative labels, searched alongside the preferred one.
	pub alt_labels: Vec<String>,
	/// Occurrences of the narrower concepts under this path.
	pub children: Vec<RenderNode>,
	/// The concept has more than one broader concept in the graph.
	pub has_multiple_parents: bool,
	/// Labels of the concept's parents other than the one on this path.
	pub other_parent_labels: Vec<String>,
	/// Set by search annotation, [`MatchStatus::None`] straight after projection.
	pub match_status: MatchStatus,
}

impl RenderNode {
	/// Concept ids along the path, root first, this node last.
	pub fn path_ids(&self) -> Vec<ConceptId> {
		path_ids(&self.path)
	}

	/// Id of the parent on this occurrence's path, `None` for a root.
	pub fn parent_id(&self) -> Option<ConceptId> {
		parent_id_of(&self.path)
	}

	/// Path of the parent occurrence, `None` for a root.
	pub fn parent_path(&self) -> Option<&str> {
		parent_path_of(&self.path)
	}

	/// Every proper prefix of this path, shortest first.
	pub fn ancestor_paths(&self) -> Vec<String> {
		ancestor_paths_of(&self.path)
	}

	/// True when nothing is projected below this occurrence.
	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}
}

/// Path segment for one id. Ids are opaque, so the separator and the escape
/// character are percent-encoded; every other character is kept as is.
pub fn encode_segment(id: &ConceptId) -> Cow<'_, str> {
	let raw = id.as_str();
	if !raw.contains([PATH_SEPARATOR, ESCAPE]) {
		return Cow::Borrowed(raw);
	}
	let mut encoded = String::with_capacity(raw.len() + 4);
	for ch in raw.chars() {
		match ch {
			PATH_SEPARATOR => encoded.push_str("%2F"),
			ESCAPE => encoded.push_str("%25"),
			other => encoded.push(other),
		}
	}
	Cow::Owned(encoded)
}

/// Inverse of [`encode_segment`].
pub fn decode_segment(segment: &str) -> ConceptId {
	if !segment.contains(ESCAPE) {
		return ConceptId::from(segment);
	}
	let mut decoded = String::with_capacity(segment.len());
	let mut rest = segment;
	while let Some(at) = rest.find(ESCAPE) {
		decoded.push_str(&rest[..at]);
		let tail = &rest[at..];
		if let Some(after) = tail.strip_prefix("%2F").or_else(|| tail.strip_prefix("%2f")) {
			decoded.push(PATH_SEPARATOR);
			rest = after;
		} else if let Some(after) = tail.strip_prefix("%25") {
			decoded.push(ESCAPE);
			rest = after;
		} else {
			decoded.push(ESCAPE);
			rest = &tail[ESCAPE.len_utf8()..];
		}
	}
	decoded.push_str(rest);
	ConceptId::new(decoded)
}

/// Path of a root occurrence.
pub fn root_path(id: &ConceptId) -> String {
	encode_segment(id).into_owned()
}

/// Path of `id` directly under the occurrence at `parent_path`.
pub fn child_path(parent_path: &str, id: &ConceptId) -> String {
	format!("{parent_path}{PATH_SEPARATOR}{}", encode_segment(id))
}

/// Concept ids along `path`, root first.
pub fn path_ids(path: &str) -> Vec<ConceptId> {
	path.split(PATH_SEPARATOR).map(decode_segment).collect()
}

/// Path with its last segment removed, `None` for a root path.
pub fn parent_path_of(path: &str) -> Option<&str> {
	path.rsplit_once(PATH_SEPARATOR).map(|(parent, _)| parent)
}

/// Id of the second-to-last segment, `None` for a root path.
pub fn parent_id_of(path: &str) -> Option<ConceptId> {
	let (parent_path, _) = path.rsplit_once(PATH_SEPARATOR)?;
	let segment = parent_path
		.rsplit_once(PATH_SEPARATOR)
		.map_or(parent_path, |(_, last)| last);
	Some(decode_segment(segment))
}

/// Every proper prefix of `path`, shortest first.
pub fn ancestor_paths_of(path: &str) -> Vec<String> {
	path.match_indices(PATH_SEPARATOR)
		.map(|(i, _)| path[..i].to_owned())
		.collect()
}

/// The projected forest. Replaced wholesale on every graph change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Forest {
	/// One tree per concept without parents, in graph order.
	pub roots: Vec<RenderNode>,
	/// Concepts not reachable from any root, only possible with cyclic data.
	pub omitted: Vec<ConceptId>,
}

impl Forest {
	/// True when the graph had no roots.
	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}

	/// Depth-first, pre-order walk over every occurrence.
	pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a RenderNode)) {
		fn go<'a>(node: &'a RenderNode, visit: &mut impl FnMut(&'a RenderNode)) {
			visit(node);
			for child in &node.children {
				go(child, visit);
			}
		}
		for root in &self.roots {
			go(root, &mut visit);
		}
	}

	/// The occurrence at `path`, if the current forest has one.
	pub fn find(&self, path: &str) -> Option<&RenderNode> {
		let mut ids = path_ids(path).into_iter();
		let first = ids.next()?;
		let mut node = self.roots.iter().find(|n| n.id == first)?;
		for id in ids {
			node = node.children.iter().find(|n| n.id == id)?;
		}
		Some(node)
	}

	/// All occurrences of one concept, in walk order.
	pub fn occurrences(&self, id: &ConceptId) -> Vec<&RenderNode> {
		let mut found = Vec::new();
		self.walk(|node| {
			if &node.id == id {
				found.push(node);
			}
		});
		found
	}

	/// Number of occurrences across all trees.
	pub fn occurrence_count(&self) -> usize {
		let mut count = 0;
		self.walk(|_| count += 1);
		count
	}
}

/// Parent ids and labels per concept, in edge order.
struct ParentIndex<'g> {
	parents: HashMap<&'g ConceptId, Vec<(&'g ConceptId, &'g str)>>,
}

impl<'g> ParentIndex<'g> {
	fn build(graph: &'g GraphModel) -> Self {
		let mut parents: HashMap<_, Vec<_>> = HashMap::new();
		for edge in graph.broader_edges() {
			if let Some(label) = graph.label_of(&edge.parent) {
				parents
					.entry(&edge.child)
					.or_default()
					.push((&edge.parent, label));
			}
		}
		Self { parents }
	}

	fn count(&self, id: &ConceptId) -> usize {
		self.parents.get(id).map_or(0, Vec::len)
	}

	/// Labels of every parent except `on_path`. Excludes by parent id, so two
	/// parents sharing a label are still told apart.
	fn other_labels(&self, id: &ConceptId, on_path: Option<&ConceptId>) -> Vec<String> {
		self.parents
			.get(id)
			.into_iter()
			.flatten()
			.filter(|(parent, _)| Some(*parent) != on_path)
			.map(|(_, label)| (*label).to_owned())
			.collect()
	}
}

/// Project the graph into a forest with one occurrence per parent path.
pub fn project(graph: &GraphModel) -> Forest {
	let parents = ParentIndex::build(graph);
	let mut visited = HashSet::new();
	let mut on_path = Vec::new();

	let roots: Vec<RenderNode> = graph
		.roots()
		.filter_map(|root| {
			build_node(
				graph,
				&parents,
				&root.id,
				None,
				0,
				&mut on_path,
				&mut visited,
			)
		})
		.collect();

	let omitted: Vec<ConceptId> = graph
		.concepts()
		.iter()
		.filter(|c| !visited.contains(&c.id))
		.map(|c| c.id.clone())
		.collect();
	if !omitted.is_empty() {
		warn!(
			"{} concept(s) unreachable from any root, likely a broader cycle: {:?}",
			omitted.len(),
			omitted
		);
	}
	debug!("projected {} concepts into {} root(s)", graph.len(), roots.len());

	Forest { roots, omitted }
}

fn build_node<'g>(
	graph: &'g GraphModel,
	parents: &ParentIndex<'g>,
	id: &'g ConceptId,
	parent_path: Option<&str>,
	depth: usize,
	on_path: &mut Vec<&'g ConceptId>,
	visited: &mut HashSet<&'g ConceptId>,
) -> Option<RenderNode> {
	let concept = graph.concept(id)?;
	if on_path.contains(&id) {
		warn!("broader cycle through {} reached from a root, cutting branch", id);
		return None;
	}
	visited.insert(id);

	let path = match parent_path {
		Some(parent_path) => child_path(parent_path, id),
		None => root_path(id),
	};
	let parent_on_path = on_path.last().copied();

	on_path.push(id);
	let children = graph
		.children_of(id)
		.iter()
		.filter_map(|child| {
			build_node(
				graph,
				parents,
				child,
				Some(&path),
				depth + 1,
				on_path,
				visited,
			)
		})
		.collect();
	on_path.pop();

	Some(RenderNode {
		id: id.clone(),
		depth,
		label: concept.pref_label.clone(),
		alt_labels: concept.alt_labels.clone(),
		children,
		has_multiple_parents: parents.count(id) > 1,
		other_parent_labels: parents.other_labels(id, parent_on_path),
		match_status: MatchStatus::None,
		path,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ConceptRecord;

	fn chain() -> GraphModel {
		GraphModel::from_records(&[
			ConceptRecord::new("A", "Animals"),
			ConceptRecord::new("B", "Birds").with_broader("A"),
			ConceptRecord::new("C", "Crows").with_broader("B"),
		])
	}

	#[test]
	fn chain_projects_to_single_branch() {
		let forest = project(&chain());
		assert_eq!(forest.roots.len(), 1);
		let c = forest.find("A/B/C").unwrap();
		assert_eq!(c.depth, 2);
		assert!(!c.has_multiple_parents);
		assert!(c.other_parent_labels.is_empty());
		assert_eq!(c.parent_id(), Some(ConceptId::from("B")));
		assert_eq!(c.ancestor_paths(), vec!["A".to_string(), "A/B".to_string()]);
		assert_eq!(forest.occurrence_count(), 3);
	}

	#[test]
	fn polyhierarchy_yields_one_occurrence_per_parent() {
		let graph = GraphModel::from_records(&[
			ConceptRecord::new("A", "Animals"),
			ConceptRecord::new("P", "Pets"),
			ConceptRecord::new("D", "Dogs").with_broader("A").with_broader("P"),
			ConceptRecord::new("L", "Labradors").with_broader("D"),
		]);
		let forest = project(&graph);
		let dogs = forest.occurrences(&"D".into());
		assert_eq!(dogs.len(), 2);
		assert!(dogs.iter().all(|n| n.has_multiple_parents));
		assert_eq!(forest.find("A/D").unwrap().other_parent_labels, vec!["Pets".to_string()]);
		assert_eq!(forest.find("P/D").unwrap().other_parent_labels, vec!["Animals".to_string()]);
		// the whole subtree is repeated under each parent
		assert!(forest.find("A/D/L").is_some());
		assert!(forest.find("P/D/L").is_some());
		assert!(!forest.find("P/D/L").unwrap().has_multiple_parents);
	}

	#[test]
	fn same_labelled_parents_are_excluded_by_id() {
		let graph = GraphModel::from_records(&[
			ConceptRecord::new("x", "Mercury"),
			ConceptRecord::new("y", "Mercury"),
			ConceptRecord::new("z", "Thermometers").with_broader("x").with_broader("y"),
		]);
		let forest = project(&graph);
		assert_eq!(forest.find("x/z").unwrap().other_parent_labels, vec!["Mercury".to_string()]);
		assert_eq!(forest.find("y/z").unwrap().other_parent_labels, vec!["Mercury".to_string()]);
	}

	#[test]
	fn cycle_only_concepts_are_omitted() {
		let graph = GraphModel::from_records(&[
			ConceptRecord::new("r", "Root"),
			ConceptRecord::new("x", "X").with_broader("y"),
			ConceptRecord::new("y", "Y").with_broader("x"),
		]);
		let forest = project(&graph);
		assert_eq!(forest.roots.len(), 1);
		assert_eq!(forest.omitted, vec![ConceptId::from("x"), ConceptId::from("y")]);
	}

	#[test]
	fn cycle_reachable_from_root_is_cut() {
		let graph = GraphModel::from_records(&[
			ConceptRecord::new("r", "Root"),
			ConceptRecord::new("x", "X").with_broader("r").with_broader("y"),
			ConceptRecord::new("y", "Y").with_broader("x"),
		]);
		let forest = project(&graph);
		assert!(forest.find("r/x/y").is_some());
		assert!(forest.find("r/x/y/x").is_none());
	}

	#[test]
	fn empty_graph_projects_to_empty_forest() {
		let forest = project(&GraphModel::new());
		assert!(forest.is_empty());
		assert!(forest.omitted.is_empty());
	}

	#[test]
	fn path_helpers() {
		assert_eq!(parent_path_of("a/b/c"), Some("a/b"));
		assert_eq!(parent_id_of("a/b/c"), Some(ConceptId::from("b")));
		assert_eq!(parent_id_of("a/b"), Some(ConceptId::from("a")));
		assert_eq!(parent_id_of("a"), None);
		assert!(ancestor_paths_of("a").is_empty());
	}

	#[test]
	fn segments_escape_separator_and_escape_char() {
		let id = ConceptId::from("http://ex.org/c/50%");
		let segment = encode_segment(&id);
		assert!(!segment.contains(PATH_SEPARATOR));
		assert_eq!(decode_segment(&segment), id);
		assert_eq!(encode_segment(&"plain".into()), "plain");
		// a stray escape that encodes nothing is kept literally
		assert_eq!(decode_segment("a%zz"), ConceptId::from("a%zz"));
	}

	#[test]
	fn uri_ids_keep_parent_and_lookup_intact() {
		let (a, b, c) = ("http://ex.org/c/A", "http://ex.org/c/B", "http://ex.org/c/C");
		let graph = GraphModel::from_records(&[
			ConceptRecord::new(a, "Animals"),
			ConceptRecord::new(b, "Birds").with_broader(a),
			ConceptRecord::new(c, "Crows").with_broader(b),
		]);
		let forest = project(&graph);
		let crows = forest.occurrences(&c.into());
		assert_eq!(crows.len(), 1);
		let node = crows[0];
		assert_eq!(node.parent_id(), Some(ConceptId::from(b)));
		assert_eq!(node.path_ids(), vec![ConceptId::from(a), ConceptId::from(b), ConceptId::from(c)]);
		assert_eq!(node.ancestor_paths().len(), 2);
		assert_eq!(forest.find(&node.path).map(|n| &n.id), Some(&ConceptId::from(c)));
		let birds = node.parent_path().and_then(|p| forest.find(p));
		assert_eq!(birds.map(|n| n.label.as_str()), Some("Birds"));
	}
}
