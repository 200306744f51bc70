//! The boundary to the persistence collaborator: fetch a scheme's concept
//! graph, apply a reparent. Transport and encoding live behind the trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::RepositoryError;
use crate::hierarchy::ReparentCommand;
use crate::model::{ConceptRecord, DescendantIndex, GraphModel};

/// Persistence collaborator holding the concept schemes.
#[async_trait(?Send)]
pub trait ConceptRepository: Send + Sync {
	/// Every concept of a scheme, parents and related ids inlined.
	async fn fetch_graph(&self, scheme: &str) -> Result<Vec<ConceptRecord>, RepositoryError>;

	/// Apply one reparent. Success means the change is durable.
	async fn reparent(&self, command: &ReparentCommand) -> Result<(), RepositoryError>;
}

/// Fetch a scheme and build its [`GraphModel`].
pub async fn fetch_model(
	repository: &dyn ConceptRepository,
	scheme: &str,
) -> Result<GraphModel, RepositoryError> {
	let records = repository.fetch_graph(scheme).await?;
	let graph = GraphModel::from_records(&records);
	info!("loaded scheme {} with {} concepts", scheme, graph.len());
	Ok(graph)
}

/// Send a reparent and, once it is confirmed, re-fetch the scheme. A failed
/// re-fetch is reported as [`RepositoryError::RefreshFailed`], since the
/// change itself was saved.
pub async fn reparent_and_refresh(
	repository: &dyn ConceptRepository,
	scheme: &str,
	command: &ReparentCommand,
) -> Result<GraphModel, RepositoryError> {
	if let Err(err) = repository.reparent(command).await {
		warn!("reparent of {} rejected: {}", command.concept_id, err);
		return Err(err);
	}
	info!(
		"reparented {} under {:?}",
		command.concept_id, command.new_parent_id
	);
	fetch_model(repository, scheme).await.map_err(|err| {
		warn!("refresh of {} after reparent failed: {}", scheme, err);
		RepositoryError::RefreshFailed(Box::new(err))
	})
}

/// In-process repository holding schemes as record lists.
///
/// Validates reparents the way a server would, so the rejection paths are
/// exercised without a backend.
#[derive(Debug, Default)]
pub struct MemoryRepository {
	schemes: Mutex<HashMap<String, Vec<ConceptRecord>>>,
	fail_next: Mutex<Option<RepositoryError>>,
	fail_next_fetch: Mutex<Option<RepositoryError>>,
}

impl MemoryRepository {
	/// A repository without schemes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace a scheme.
	pub fn with_scheme(self, scheme: impl Into<String>, records: Vec<ConceptRecord>) -> Self {
		if let Ok(mut schemes) = self.schemes.lock() {
			schemes.insert(scheme.into(), records);
		}
		self
	}

	/// Make the next reparent fail with `error` without touching any data.
	pub fn fail_next_reparent(&self, error: RepositoryError) {
		if let Ok(mut slot) = self.fail_next.lock() {
			*slot = Some(error);
		}
	}

	/// Make the next graph fetch fail with `error`.
	pub fn fail_next_fetch(&self, error: RepositoryError) {
		if let Ok(mut slot) = self.fail_next_fetch.lock() {
			*slot = Some(error);
		}
	}

	/// Apply an edit made by someone else behind the editor's back.
	pub fn update_record(&self, scheme: &str, record: ConceptRecord) -> Result<(), RepositoryError> {
		let mut schemes = self.lock_schemes()?;
		let records = schemes
			.get_mut(scheme)
			.ok_or_else(|| RepositoryError::Rejected(format!("unknown scheme {scheme}")))?;
		match records.iter_mut().find(|r| r.id == record.id) {
			Some(existing) => *existing = record,
			None => records.push(record),
		}
		Ok(())
	}

	fn lock_schemes(
		&self,
	) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<ConceptRecord>>>, RepositoryError> {
		self.schemes
			.lock()
			.map_err(|_| RepositoryError::Unavailable("scheme store poisoned".into()))
	}
}

#[async_trait(?Send)]
impl ConceptRepository for MemoryRepository {
	async fn fetch_graph(&self, scheme: &str) -> Result<Vec<ConceptRecord>, RepositoryError> {
		if let Some(err) = self.fail_next_fetch.lock().ok().and_then(|mut slot| slot.take()) {
			return Err(err);
		}
		self.lock_schemes()?
			.get(scheme)
			.cloned()
			.ok_or_else(|| RepositoryError::Rejected(format!("unknown scheme {scheme}")))
	}

	async fn reparent(&self, command: &ReparentCommand) -> Result<(), RepositoryError> {
		if let Some(err) = self.fail_next.lock().ok().and_then(|mut slot| slot.take()) {
			return Err(err);
		}
		let mut schemes = self.lock_schemes()?;
		let records = schemes
			.values_mut()
			.find(|records| records.iter().any(|r| r.id == command.concept_id))
			.ok_or_else(|| RepositoryError::NotFound(command.concept_id.clone()))?;

		if let Some(parent) = &command.new_parent_id {
			if !records.iter().any(|r| &r.id == parent) {
				return Err(RepositoryError::NotFound(parent.clone()));
			}
			let graph = GraphModel::from_records(records);
			if parent == &command.concept_id
				|| DescendantIndex::build(&graph).is_descendant(&command.concept_id, parent)
			{
				return Err(RepositoryError::WouldCreateCycle {
					concept: command.concept_id.clone(),
					parent: parent.clone(),
				});
			}
		}

		let record = records
			.iter_mut()
			.find(|r| r.id == command.concept_id)
			.ok_or_else(|| RepositoryError::NotFound(command.concept_id.clone()))?;
		apply(record, command);
		Ok(())
	}
}

fn apply(record: &mut ConceptRecord, command: &ReparentCommand) {
	if let Some(previous) = &command.previous_parent_id_to_remove {
		record.broader_ids.retain(|id| id != previous);
	}
	if let Some(parent) = &command.new_parent_id {
		if !record.broader_ids.contains(parent) {
			record.broader_ids.push(parent.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ConceptId;

	fn children_in(records: &[ConceptRecord], parent: &ConceptId) -> Vec<ConceptId> {
		records
			.iter()
			.filter(|r| r.broader_ids.contains(parent))
			.map(|r| r.id.clone())
			.collect()
	}

	fn repo() -> MemoryRepository {
		MemoryRepository::new().with_scheme(
			"animals",
			vec![
				ConceptRecord::new("A", "A"),
				ConceptRecord::new("B", "B").with_broader("A"),
				ConceptRecord::new("C", "C").with_broader("B"),
			],
		)
	}

	#[tokio::test]
	async fn reparent_rejects_cycles() {
		let repo = repo();
		let command = ReparentCommand {
			concept_id: "A".into(),
			new_parent_id: Some("C".into()),
			previous_parent_id_to_remove: None,
		};
		let err = repo.reparent(&command).await.unwrap_err();
		assert!(matches!(err, RepositoryError::WouldCreateCycle { .. }));
	}

	#[tokio::test]
	async fn reparent_moves_edge() {
		let repo = repo();
		let command = ReparentCommand {
			concept_id: "C".into(),
			new_parent_id: Some("A".into()),
			previous_parent_id_to_remove: Some("B".into()),
		};
		repo.reparent(&command).await.unwrap();
		let records = repo.fetch_graph("animals").await.unwrap();
		assert_eq!(children_in(&records, &"A".into()), vec![ConceptId::from("B"), ConceptId::from("C")]);
		assert!(children_in(&records, &"B".into()).is_empty());
	}

	#[tokio::test]
	async fn unknown_concept_and_injected_failure() {
		let repo = repo();
		let command = ReparentCommand {
			concept_id: "Z".into(),
			new_parent_id: None,
			previous_parent_id_to_remove: None,
		};
		assert_eq!(
			repo.reparent(&command).await,
			Err(RepositoryError::NotFound("Z".into()))
		);

		repo.fail_next_reparent(RepositoryError::Rejected("locked".into()));
		let command = ReparentCommand {
			concept_id: "C".into(),
			new_parent_id: None,
			previous_parent_id_to_remove: Some("B".into()),
		};
		assert_eq!(
			repo.reparent(&command).await,
			Err(RepositoryError::Rejected("locked".into()))
		);
		// the failure is one-shot
		assert_eq!(repo.reparent(&command).await, Ok(()));
	}

	#[tokio::test]
	async fn failed_refresh_reports_the_saved_change() {
		let repo = repo();
		repo.fail_next_fetch(RepositoryError::Unavailable("timeout".into()));
		let command = ReparentCommand {
			concept_id: "C".into(),
			new_parent_id: Some("A".into()),
			previous_parent_id_to_remove: Some("B".into()),
		};
		let err = reparent_and_refresh(&repo, "animals", &command)
			.await
			.unwrap_err();
		assert!(err.change_saved());
		assert!(err.to_string().starts_with("change saved"));
		let records = repo.fetch_graph("animals").await.unwrap();
		assert_eq!(children_in(&records, &"A".into()), vec![ConceptId::from("B"), ConceptId::from("C")]);
	}

	#[tokio::test]
	async fn unknown_scheme_is_rejected() {
		assert!(fetch_model(&repo(), "plants").await.is_err());
	}
}
