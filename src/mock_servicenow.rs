//! Mock ServiceNow client for testing purposes.
//!
//! Stores the `rm_story` table in memory and mirrors the server's exact-match
//! search semantics. Integration-test builds can seed it from, and persist it
//! back to, a JSON state file named by `SNSTORY_MOCK_STATE`.

#[cfg(feature = "is_integration_test")]
use std::path::PathBuf;
use std::sync::{
	Mutex,
	atomic::{AtomicU64, Ordering},
};

use color_eyre::eyre::Result;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
	payload::RecordPayload,
	servicenow::{RemoteError, RemoteRecord, StoryClient, WriteOp},
};

pub const MOCK_STATE_ENV: &str = "SNSTORY_MOCK_STATE";

/// Mock client holding all records in memory.
pub struct MockServiceNowClient {
	/// Counter for generating unique sys_ids
	next_sys_id: AtomicU64,

	/// Counter for generating record numbers
	next_number: AtomicU64,

	/// All records, in insertion order
	records: Mutex<Vec<Map<String, Value>>>,

	/// Call log for assertions and debugging
	call_log: Mutex<Vec<String>>,

	/// Where to persist state after every write
	#[cfg(feature = "is_integration_test")]
	state_file: Option<PathBuf>,
}

impl Default for MockServiceNowClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockServiceNowClient {
	pub fn new() -> Self {
		Self {
			next_sys_id: AtomicU64::new(1),
			next_number: AtomicU64::new(10001),
			records: Mutex::new(Vec::new()),
			call_log: Mutex::new(Vec::new()),
			#[cfg(feature = "is_integration_test")]
			state_file: None,
		}
	}

	/// Load state from `path` if it exists; writes are saved back to it.
	#[cfg(feature = "is_integration_test")]
	pub fn from_state_file(path: PathBuf) -> Result<Self> {
		use color_eyre::eyre::WrapErr;

		let mut client = Self::new();
		if path.exists() {
			let content = std::fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read mock state from {}", path.display()))?;
			client.load_state_json(&content)?;
			eprintln!("[mock] Loaded state from {}", path.display());
		}
		client.state_file = Some(path);
		Ok(client)
	}

	/// State format: `{ "records": [ { "sys_id": ..., "short_description": ..., ... }, ... ] }`
	#[cfg(feature = "is_integration_test")]
	fn load_state_json(&self, content: &str) -> Result<()> {
		use color_eyre::eyre::eyre;

		let state: Value = serde_json::from_str(content)?;
		let records = state.get("records").and_then(|v| v.as_array()).ok_or_else(|| eyre!("mock state is missing `records` array"))?;
		for record in records {
			self.insert(record.clone());
		}
		Ok(())
	}

	#[cfg(feature = "is_integration_test")]
	fn save_state(&self) -> Result<()> {
		if let Some(path) = &self.state_file {
			let records = self.records.lock().unwrap().clone();
			std::fs::write(path, serde_json::to_string_pretty(&serde_json::json!({ "records": records }))?)?;
		}
		Ok(())
	}

	/// Add a record directly, bypassing the call log. Missing `sys_id`/`number` are generated.
	pub fn insert(&self, record: Value) -> RemoteRecord {
		let mut fields = RemoteRecord::from_value(record).0;
		if !fields.contains_key("sys_id") {
			fields.insert("sys_id".into(), Value::String(self.generate_sys_id()));
		}
		if !fields.contains_key("number") {
			fields.insert("number".into(), Value::String(self.generate_number()));
		}
		self.records.lock().unwrap().push(fields.clone());
		RemoteRecord(fields)
	}

	/// Snapshot of all stored records.
	pub fn records(&self) -> Vec<RemoteRecord> {
		self.records.lock().unwrap().iter().cloned().map(RemoteRecord).collect()
	}

	/// Get the call log
	pub fn calls(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	fn log_call(&self, call: String) {
		self.call_log.lock().unwrap().push(call);
	}

	fn generate_sys_id(&self) -> String {
		format!("{:032x}", self.next_sys_id.fetch_add(1, Ordering::SeqCst))
	}

	fn generate_number(&self) -> String {
		format!("STRY{:07}", self.next_number.fetch_add(1, Ordering::SeqCst))
	}

	fn persist(&self) -> Result<()> {
		#[cfg(feature = "is_integration_test")]
		self.save_state()?;
		Ok(())
	}
}

impl StoryClient for MockServiceNowClient {
	#[instrument(skip(self), name = "MockServiceNowClient::search")]
	fn search(&self, short_description: &str) -> Result<Option<RemoteRecord>> {
		tracing::info!(target: "mock_servicenow", short_description, "search");
		self.log_call(format!("search {short_description}"));

		let records = self.records.lock().unwrap();
		Ok(records
			.iter()
			.find(|r| r.get("short_description").and_then(Value::as_str) == Some(short_description))
			.cloned()
			.map(RemoteRecord))
	}

	#[instrument(skip(self, payload), name = "MockServiceNowClient::create")]
	fn create(&self, payload: &RecordPayload) -> Result<RemoteRecord> {
		let short_description = payload.get("short_description").and_then(Value::as_str).unwrap_or_default();
		tracing::info!(target: "mock_servicenow", short_description, "create");
		self.log_call(format!("create {short_description}"));

		let mut fields = payload.fields().clone();
		fields.insert("sys_id".into(), Value::String(self.generate_sys_id()));
		fields.insert("number".into(), Value::String(self.generate_number()));
		self.records.lock().unwrap().push(fields.clone());
		self.persist()?;
		Ok(RemoteRecord(fields))
	}

	#[instrument(skip(self, payload), name = "MockServiceNowClient::update")]
	fn update(&self, sys_id: &str, payload: &RecordPayload) -> Result<RemoteRecord> {
		tracing::info!(target: "mock_servicenow", sys_id, "update");
		self.log_call(format!("update {sys_id}"));

		let updated = {
			let mut records = self.records.lock().unwrap();
			let Some(record) = records.iter_mut().find(|r| r.get("sys_id").and_then(Value::as_str) == Some(sys_id)) else {
				return Err(RemoteError::Write {
					op: WriteOp::Update,
					status: 404,
					body: r#"{"error":{"message":"No Record found"}}"#.to_string(),
				}
				.into());
			};
			for (key, value) in payload.fields() {
				record.insert(key.clone(), value.clone());
			}
			record.clone()
		};
		self.persist()?;
		Ok(RemoteRecord(updated))
	}
}
