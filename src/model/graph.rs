use std::collections::{HashMap, HashSet};

use log::warn;

use super::types::{BroaderEdge, Concept, ConceptId, ConceptRecord, RelatedEdge};

/// The concept graph of record: concepts plus `broader` and `related` edges.
///
/// Storage order is the order concepts and edges were supplied in, and every
/// derived view traverses in that order. Edges that reference unknown
/// concepts are dropped at ingest, so a concept whose only parent was
/// dangling ends up as a root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphModel {
	concepts: Vec<Concept>,
	index: HashMap<ConceptId, usize>,
	broader: Vec<BroaderEdge>,
	related: Vec<RelatedEdge>,
	parents: HashMap<ConceptId, Vec<ConceptId>>,
	children: HashMap<ConceptId, Vec<ConceptId>>,
}

impl GraphModel {
	/// An empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a graph from a fetch response.
	pub fn from_records(records: &[ConceptRecord]) -> Self {
		let mut graph = Self::new();
		for record in records {
			if graph.index.contains_key(&record.id) {
				warn!("duplicate concept {} in graph response, keeping first", record.id);
				continue;
			}
			graph.index.insert(record.id.clone(), graph.concepts.len());
			graph.concepts.push(Concept::from(record));
		}
		for record in records {
			graph.ingest_edges(record);
		}
		graph.rebuild_adjacency();
		graph
	}

	fn ingest_edges(&mut self, record: &ConceptRecord) {
		for parent in &record.broader_ids {
			if !self.index.contains_key(parent) {
				warn!("concept {} has dangling parent {}, skipping edge", record.id, parent);
				continue;
			}
			if parent == &record.id {
				warn!("concept {} lists itself as broader, skipping edge", record.id);
				continue;
			}
			let edge = BroaderEdge {
				child: record.id.clone(),
				parent: parent.clone(),
			};
			if !self.broader.contains(&edge) {
				self.broader.push(edge);
			}
		}
		for other in &record.related_ids {
			if other == &record.id || !self.index.contains_key(other) {
				continue;
			}
			let exists = self
				.related
				.iter()
				.any(|e| e.touches(&record.id) && e.other(&record.id) == Some(other));
			if !exists {
				self.related.push(RelatedEdge {
					a: record.id.clone(),
					b: other.clone(),
				});
			}
		}
	}

	fn rebuild_adjacency(&mut self) {
		self.parents.clear();
		self.children.clear();
		for edge in &self.broader {
			self.parents
				.entry(edge.child.clone())
				.or_default()
				.push(edge.parent.clone());
			self.children
				.entry(edge.parent.clone())
				.or_default()
				.push(edge.child.clone());
		}
	}

	fn reindex(&mut self) {
		self.index = self
			.concepts
			.iter()
			.enumerate()
			.map(|(i, c)| (c.id.clone(), i))
			.collect();
	}

	/// Number of concepts.
	pub fn len(&self) -> usize {
		self.concepts.len()
	}

	/// True without concepts.
	pub fn is_empty(&self) -> bool {
		self.concepts.is_empty()
	}

	/// Whether `id` is a known concept.
	pub fn contains(&self, id: &ConceptId) -> bool {
		self.index.contains_key(id)
	}

	/// Look up one concept.
	pub fn concept(&self, id: &ConceptId) -> Option<&Concept> {
		self.index.get(id).map(|&i| &self.concepts[i])
	}

	/// Every concept in storage order.
	pub fn concepts(&self) -> &[Concept] {
		&self.concepts
	}

	/// Every parent edge in storage order.
	pub fn broader_edges(&self) -> &[BroaderEdge] {
		&self.broader
	}

	/// Every related link, once per pair.
	pub fn related_edges(&self) -> &[RelatedEdge] {
		&self.related
	}

	/// Direct parents in edge order.
	pub fn parents_of(&self, id: &ConceptId) -> &[ConceptId] {
		self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Direct children in edge order.
	pub fn children_of(&self, id: &ConceptId) -> &[ConceptId] {
		self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Concepts related to `id`.
	pub fn related_of(&self, id: &ConceptId) -> impl Iterator<Item = &ConceptId> {
		self.related.iter().filter_map(move |e| e.other(id))
	}

	/// Concepts without any parent, in storage order.
	pub fn roots(&self) -> impl Iterator<Item = &Concept> {
		self.concepts
			.iter()
			.filter(|c| self.parents_of(&c.id).is_empty())
	}

	/// Preferred label of `id`.
	pub fn label_of(&self, id: &ConceptId) -> Option<&str> {
		self.concept(id).map(|c| c.pref_label.as_str())
	}

	/// Broader, narrower and related neighbours, deduplicated.
	pub fn neighbors_of(&self, id: &ConceptId) -> HashSet<ConceptId> {
		self.parents_of(id)
			.iter()
			.chain(self.children_of(id))
			.chain(self.related_of(id))
			.cloned()
			.collect()
	}

	/// Apply a confirmed create or update. The record's edge lists replace
	/// the concept's existing outgoing `broader` and `related` edges.
	pub fn upsert_concept(&mut self, record: &ConceptRecord) {
		match self.index.get(&record.id) {
			Some(&i) => self.concepts[i] = Concept::from(record),
			None => {
				self.index.insert(record.id.clone(), self.concepts.len());
				self.concepts.push(Concept::from(record));
			}
		}
		self.broader.retain(|e| e.child != record.id);
		self.related.retain(|e| !e.touches(&record.id));
		self.ingest_edges(record);
		self.rebuild_adjacency();
	}

	/// Apply a confirmed delete. Edges touching the concept go with it.
	pub fn remove_concept(&mut self, id: &ConceptId) -> Option<Concept> {
		let i = self.index.get(id).copied()?;
		let removed = self.concepts.remove(i);
		self.broader.retain(|e| &e.child != id && &e.parent != id);
		self.related.retain(|e| !e.touches(id));
		self.reindex();
		self.rebuild_adjacency();
		Some(removed)
	}
}
