//! Error types. None of these are fatal; every one surfaces at the
//! interaction that caused it and is left to the caller to retry.

use thiserror::Error;

use crate::model::ConceptId;

/// Failures reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
	/// A concept named by the request is not in the scheme.
	#[error("concept {0} does not exist")]
	NotFound(ConceptId),
	/// The new parent already sits below the concept on the server.
	#[error("making {parent} a parent of {concept} would create a cycle")]
	WouldCreateCycle {
		/// Concept being reparented.
		concept: ConceptId,
		/// Requested parent.
		parent: ConceptId,
	},
	/// Server-side rejection, message passed through verbatim.
	#[error("{0}")]
	Rejected(String),
	/// Transport or storage failure.
	#[error("repository unavailable: {0}")]
	Unavailable(String),
	/// The reparent was applied, but fetching the updated scheme failed.
	#[error("change saved, but reloading the scheme failed: {0}")]
	RefreshFailed(Box<RepositoryError>),
}

impl RepositoryError {
	/// True when the server holds the change despite the error.
	pub fn change_saved(&self) -> bool {
		matches!(self, Self::RefreshFailed(_))
	}
}

/// Failures of editor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
	/// A second reparent of a concept whose first one is unresolved.
	#[error("a reparent of {0} is still in flight")]
	ReparentInFlight(ConceptId),
	/// Passed up from the repository.
	#[error(transparent)]
	Repository(#[from] RepositoryError),
}

/// Failures while reading an [`EditorConfig`](crate::config::EditorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Not valid JSON, or fields of the wrong type.
	#[error("invalid editor config: {0}")]
	Parse(#[from] serde_json::Error),
	/// Well-formed but out of range.
	#[error("invalid editor config: {0}")]
	Invalid(String),
}
