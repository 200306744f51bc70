use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque concept key, stable for the lifetime of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
	/// Wrap an id as issued by the repository.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The raw id.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ConceptId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ConceptId {
	fn from(id: &str) -> Self {
		Self(id.to_owned())
	}
}

impl From<String> for ConceptId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

/// A vocabulary entry as held by [`GraphModel`](super::GraphModel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Concept {
	/// Unique key.
	pub id: ConceptId,
	/// Preferred label, shown in both views.
	pub pref_label: String,
	/// Synonyms, searched alongside the preferred label.
	pub alt_labels: Vec<String>,
	/// Scope note, when the vocabulary has one.
	pub definition: Option<String>,
}

/// `child` sits directly below `parent`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BroaderEdge {
	/// The narrower concept.
	pub child: ConceptId,
	/// The broader concept.
	pub parent: ConceptId,
}

/// Non-hierarchical association. Stored once per unordered pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelatedEdge {
	/// One end, the concept that declared the link first.
	pub a: ConceptId,
	/// The other end.
	pub b: ConceptId,
}

impl RelatedEdge {
	/// Whether `id` is either end.
	pub fn touches(&self, id: &ConceptId) -> bool {
		&self.a == id || &self.b == id
	}

	/// The end opposite `id`, `None` if `id` is not on this edge.
	pub fn other(&self, id: &ConceptId) -> Option<&ConceptId> {
		if &self.a == id {
			Some(&self.b)
		} else if &self.b == id {
			Some(&self.a)
		} else {
			None
		}
	}
}

/// One concept as returned by a graph fetch, edges inlined as id lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
	/// Unique key.
	pub id: ConceptId,
	/// Preferred label.
	pub pref_label: String,
	/// Synonyms.
	#[serde(default)]
	pub alt_labels: Vec<String>,
	/// Scope note.
	#[serde(default)]
	pub definition: Option<String>,
	/// Parents, in the order the server lists them.
	#[serde(default)]
	pub broader_ids: Vec<ConceptId>,
	/// Related concepts.
	#[serde(default)]
	pub related_ids: Vec<ConceptId>,
}

impl ConceptRecord {
	/// A record without labels, parents or links beyond the preferred label.
	pub fn new(id: impl Into<ConceptId>, pref_label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			pref_label: pref_label.into(),
			alt_labels: Vec::new(),
			definition: None,
			broader_ids: Vec::new(),
			related_ids: Vec::new(),
		}
	}

	/// Add a parent.
	pub fn with_broader(mut self, parent: impl Into<ConceptId>) -> Self {
		self.broader_ids.push(parent.into());
		self
	}

	/// Add a related concept.
	pub fn with_related(mut self, other: impl Into<ConceptId>) -> Self {
		self.related_ids.push(other.into());
		self
	}

	/// Add a synonym.
	pub fn with_alt_label(mut self, label: impl Into<String>) -> Self {
		self.alt_labels.push(label.into());
		self
	}

	/// Set the scope note.
	pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
		self.definition = Some(definition.into());
		self
	}
}

impl From<&ConceptRecord> for Concept {
	fn from(record: &ConceptRecord) -> Self {
		Self {
			id: record.id.clone(),
			pref_label: record.pref_label.clone(),
			alt_labels: record.alt_labels.clone(),
			definition: record.definition.clone(),
		}
	}
}
