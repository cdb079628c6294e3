//! Create-or-update decision for a single story.

use color_eyre::eyre::{Result, eyre};
use serde::Serialize;

use crate::{
	payload::RecordPayload,
	servicenow::{RemoteRecord, StoryClient, record_url},
};

#[derive(Clone, Copy, Debug, derive_more::Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
	#[display("created")]
	Created,
	#[display("updated")]
	Updated,
	#[display("already_exists")]
	AlreadyExists,
}

/// Terminal state of one publish run.
#[derive(Clone, Debug, PartialEq)]
pub enum PublishOutcome {
	Created(RemoteRecord),
	/// `sys_id` is the updated record's id, or the matched record's when the response omits it.
	Updated { record: RemoteRecord, sys_id: String },
	/// A match was found and updating was not requested.
	AlreadyExists(RemoteRecord),
}

impl PublishOutcome {
	pub fn action(&self) -> PublishAction {
		match self {
			Self::Created(_) => PublishAction::Created,
			Self::Updated { .. } => PublishAction::Updated,
			Self::AlreadyExists(_) => PublishAction::AlreadyExists,
		}
	}

	pub fn record(&self) -> &RemoteRecord {
		match self {
			Self::Created(record) | Self::AlreadyExists(record) | Self::Updated { record, .. } => record,
		}
	}

	pub fn sys_id(&self) -> Option<&str> {
		match self {
			Self::Updated { sys_id, .. } => Some(sys_id),
			Self::Created(record) | Self::AlreadyExists(record) => record.sys_id(),
		}
	}

	pub fn url(&self, base_url: &str) -> Option<String> {
		self.sys_id().map(|sys_id| record_url(base_url, sys_id))
	}

	pub fn headline(&self) -> &'static str {
		match self {
			Self::Created(_) => "Created new story:",
			Self::Updated { .. } => "Updated existing story:",
			Self::AlreadyExists(_) => "A story with the same short_description already exists.",
		}
	}
}

/// Search for `title`, then update, report, or create. No step is retried.
pub fn publish(client: &dyn StoryClient, title: &str, payload: &RecordPayload, update_if_exists: bool) -> Result<PublishOutcome> {
	let existing = client.find_by_exact_title(title)?;

	let outcome = match existing {
		Some(existing) if update_if_exists => {
			let existing_id = existing.sys_id().ok_or_else(|| eyre!("Matching story has no sys_id, cannot update it"))?.to_string();
			let record = client.update(&existing_id, payload)?;
			let sys_id = record.sys_id().map(str::to_string).unwrap_or(existing_id);
			PublishOutcome::Updated { record, sys_id }
		}
		Some(existing) => PublishOutcome::AlreadyExists(existing),
		None => PublishOutcome::Created(client.create(payload)?),
	};
	tracing::info!(action = %outcome.action(), sys_id = outcome.sys_id(), "publish finished");
	Ok(outcome)
}
