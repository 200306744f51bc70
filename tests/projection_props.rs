use std::collections::{BTreeSet, HashMap, HashSet};

use concept_hierarchy_canvas::hierarchy::search::{self, Query};
use concept_hierarchy_canvas::hierarchy::{
	DragReparentController, DropTarget, DropValidity, ExpansionStore, project,
};
use concept_hierarchy_canvas::model::{ConceptId, ConceptRecord, DescendantIndex, GraphModel};
use proptest::prelude::*;

fn id(i: usize) -> ConceptId {
	ConceptId::new(format!("c{i}"))
}

/// SKOS-style ids carrying the path separator and the escape character.
fn uri_id(i: usize) -> ConceptId {
	ConceptId::new(format!("http://vocab.example/c/{i}%2F{i}"))
}

/// Random DAG: concept `i` may only have parents with a lower index.
fn dag() -> impl Strategy<Value = Vec<ConceptRecord>> {
	dag_with(id)
}

fn dag_with(id: fn(usize) -> ConceptId) -> impl Strategy<Value = Vec<ConceptRecord>> {
	(1usize..10)
		.prop_flat_map(|n| proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n))
		.prop_map(move |matrix| {
			matrix
				.iter()
				.enumerate()
				.map(|(i, row)| {
					let mut record = ConceptRecord::new(id(i), format!("Label {i}"));
					record.broader_ids = (0..i).filter(|&j| row[j]).map(id).collect();
					record
				})
				.collect()
		})
}

fn descendants_naive(graph: &GraphModel, from: &ConceptId) -> HashSet<ConceptId> {
	let mut seen = HashSet::new();
	let mut stack = vec![from.clone()];
	while let Some(current) = stack.pop() {
		for child in graph.children_of(&current) {
			if seen.insert(child.clone()) {
				stack.push(child.clone());
			}
		}
	}
	seen
}

proptest! {
	#[test]
	fn uri_paths_resolve_to_their_occurrence(records in dag_with(uri_id)) {
		let graph = GraphModel::from_records(&records);
		let forest = project(&graph);
		let mut failures = Vec::new();
		forest.walk(|node| {
			if forest.find(&node.path).map(|found| &found.id) != Some(&node.id) {
				failures.push(format!("{} does not resolve", node.path));
			}
			if node.path_ids().last() != Some(&node.id) || node.path_ids().len() != node.depth + 1 {
				failures.push(format!("{} decodes wrongly", node.path));
			}
			if let Some(parent) = node.parent_id() {
				if !graph.parents_of(&node.id).contains(&parent) {
					failures.push(format!("{} names {} as parent", node.path, parent));
				}
			}
		});
		prop_assert!(failures.is_empty(), "{:?}", failures);
	}

	#[test]
	fn occurrences_follow_parent_occurrences(records in dag()) {
		let graph = GraphModel::from_records(&records);
		let forest = project(&graph);
		prop_assert!(forest.omitted.is_empty());

		let mut counts: HashMap<ConceptId, usize> = HashMap::new();
		forest.walk(|node| *counts.entry(node.id.clone()).or_default() += 1);

		for concept in graph.concepts() {
			let parents = graph.parents_of(&concept.id);
			let seen = counts.get(&concept.id).copied().unwrap_or(0);
			if parents.is_empty() {
				prop_assert_eq!(seen, 1);
			} else {
				let expected: usize = parents.iter().map(|p| counts[p]).sum();
				prop_assert_eq!(seen, expected);
				// one occurrence per parent edge when every parent occurs once
				if parents.iter().all(|p| counts[p] == 1) {
					prop_assert_eq!(seen, parents.len());
				}
			}
		}
	}

	#[test]
	fn multi_parent_flags_and_other_labels(records in dag()) {
		let graph = GraphModel::from_records(&records);
		let forest = project(&graph);
		let mut failures = Vec::new();
		forest.walk(|node| {
			let k = graph.parents_of(&node.id).len();
			if node.has_multiple_parents != (k > 1) {
				failures.push(format!("{} flagged wrongly", node.path));
			}
			if let Some(parent) = node.parent_id() {
				let own = graph.label_of(&parent).unwrap_or_default().to_string();
				if node.other_parent_labels.contains(&own) {
					failures.push(format!("{} lists its own parent", node.path));
				}
				if node.other_parent_labels.len() + 1 != k {
					failures.push(format!("{} has wrong other-parent count", node.path));
				}
			} else if !node.other_parent_labels.is_empty() {
				failures.push(format!("root {} has other parents", node.path));
			}
		});
		prop_assert!(failures.is_empty(), "{:?}", failures);
	}

	#[test]
	fn annotation_is_idempotent(records in dag(), raw in "[a-z0-9 ]{0,4}") {
		let forest = project(&GraphModel::from_records(&records));
		let query = Query::new(&raw);
		let once = search::annotate(&forest, &query);
		let twice = search::annotate(&forest, &query);
		prop_assert_eq!(search::status_map(&once), search::status_map(&twice));
		prop_assert_eq!(search::expansion_paths(&once), search::expansion_paths(&twice));
	}

	#[test]
	fn search_expansion_never_removes_paths(records in dag(), raw in "[a-z0-9 ]{0,4}", keep in any::<u8>()) {
		let graph = GraphModel::from_records(&records);
		let forest = project(&graph);
		let mut store = ExpansionStore::new();
		let mut index = 0u8;
		forest.walk(|node| {
			index = index.wrapping_add(1);
			if index & keep != 0 {
				store.expand(node.path.clone());
			}
		});
		let before: BTreeSet<String> = store.expanded_paths().clone();
		store.extend(search::expansion_paths_for(&graph, &Query::new(&raw)));
		prop_assert!(before.is_subset(store.expanded_paths()));
	}

	#[test]
	fn descendants_are_never_valid_targets(records in dag()) {
		let graph = GraphModel::from_records(&records);
		let index = DescendantIndex::build(&graph);
		let forest = project(&graph);
		let mut drag = DragReparentController::new();
		for concept in graph.concepts() {
			let below = descendants_naive(&graph, &concept.id);
			for occurrence in forest.occurrences(&concept.id) {
				drag.start(concept.id.clone(), occurrence.path.clone());
				for target in &below {
					let validity = drag.over(&graph, &index, DropTarget::Concept(target.clone()), false);
					prop_assert_eq!(validity, DropValidity::Descendant);
					prop_assert!(drag.state().is_some_and(|s| s.drop_target.is_none()));
				}
				drag.cancel();
			}
		}
	}
}
