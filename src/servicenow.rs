use color_eyre::eyre::{Result, WrapErr};
use reqwest::{
	blocking::{Client, Response},
	header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{config::Credentials, payload::RecordPayload};

pub const TABLE_PATH: &str = "/api/now/table/rm_story";
/// Titles used to be stored with this prefix; lookups still try it.
pub const LEGACY_TITLE_PREFIX: &str = "User Story: ";

/// A record as returned by the Table API. Only `sys_id` and `number` are interpreted.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RemoteRecord(pub Map<String, Value>);

impl RemoteRecord {
	/// Objects become records; anything else (missing `result`, `null`) becomes an empty record.
	pub fn from_value(value: Value) -> Self {
		match value {
			Value::Object(map) => Self(map),
			_ => Self::default(),
		}
	}

	pub fn sys_id(&self) -> Option<&str> {
		self.str_field("sys_id")
	}

	/// Human record number, e.g. `STRY0010001`
	pub fn number(&self) -> Option<&str> {
		self.str_field("number")
	}

	pub fn str_field(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
	}

	pub fn to_pretty_json(&self) -> String {
		serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
	}
}

/// Table API response envelope: `{ "result": ... }`
#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	result: Value,
}

#[derive(Clone, Copy, Debug, derive_more::Display, Eq, PartialEq)]
pub enum WriteOp {
	Create,
	Update,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
	#[error("Failed to search stories: {status} {body}")]
	Search { status: u16, body: String },

	#[error("{op} failed: {status} {body}")]
	Write { op: WriteOp, status: u16, body: String },
}

/// Direct link to a story in the instance UI.
pub fn record_url(base_url: &str, sys_id: &str) -> String {
	format!("{base_url}/nav_to.do?uri=rm_story.do?sys_id={sys_id}")
}

//==============================================================================
// Story Client Trait
//==============================================================================

/// Operations on the `rm_story` table.
/// Implemented by the real HTTP client and by the in-memory mock.
pub trait StoryClient {
	/// First record whose `short_description` equals `short_description` exactly.
	fn search(&self, short_description: &str) -> Result<Option<RemoteRecord>>;

	fn create(&self, payload: &RecordPayload) -> Result<RemoteRecord>;

	/// Partial update of the record identified by `sys_id`.
	fn update(&self, sys_id: &str, payload: &RecordPayload) -> Result<RemoteRecord>;

	/// Look up a story by exact title, falling back to the legacy `User Story: <title>` form.
	/// Failure of the fallback query is treated as "not found".
	fn find_by_exact_title(&self, title: &str) -> Result<Option<RemoteRecord>> {
		if let Some(record) = self.search(title)? {
			return Ok(Some(record));
		}

		let legacy = format!("{LEGACY_TITLE_PREFIX}{title}");
		match self.search(&legacy) {
			Ok(found) => Ok(found),
			Err(e) => {
				tracing::warn!("legacy title lookup failed, treating as not found: {e}");
				Ok(None)
			}
		}
	}
}

//==============================================================================
// Real ServiceNow Client Implementation
//==============================================================================

/// Table API client over blocking HTTP with basic auth.
pub struct ServiceNowClient {
	http_client: Client,
	base_url: String,
	username: String,
	password: String,
}

impl ServiceNowClient {
	pub fn new(credentials: &Credentials) -> Result<Self> {
		let http_client = Client::builder()
			.default_headers(make_headers())
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.wrap_err("Failed to build HTTP client")?;

		Ok(Self {
			http_client,
			base_url: credentials.base_url.trim_end_matches('/').to_string(),
			username: credentials.username.clone(),
			password: credentials.password.clone(),
		})
	}

	fn table_url(&self) -> String {
		format!("{}{TABLE_PATH}", self.base_url)
	}

	fn read_result(res: Response) -> Result<Value> {
		let envelope: Envelope = res.json().wrap_err("Failed to parse ServiceNow response")?;
		Ok(envelope.result)
	}

	fn write(&self, op: WriteOp, res: Response) -> Result<RemoteRecord> {
		let status = res.status();
		if !status.is_success() {
			let body = res.text().unwrap_or_default();
			return Err(RemoteError::Write {
				op,
				status: status.as_u16(),
				body,
			}
			.into());
		}
		Ok(RemoteRecord::from_value(Self::read_result(res)?))
	}
}

fn make_headers() -> HeaderMap {
	let mut h = HeaderMap::new();
	h.insert(ACCEPT, HeaderValue::from_static("application/json"));
	h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	h
}

impl StoryClient for ServiceNowClient {
	fn search(&self, short_description: &str) -> Result<Option<RemoteRecord>> {
		let query = format!("short_description={short_description}");
		let api_url = format!("{}?sysparm_query={}&sysparm_limit=1", self.table_url(), urlencoding::encode(&query));
		tracing::info!(short_description, "searching stories");

		let res = self
			.http_client
			.get(&api_url)
			.basic_auth(&self.username, Some(&self.password))
			.send()
			.wrap_err("Failed to reach ServiceNow")?;

		let status = res.status();
		if !status.is_success() {
			let body = res.text().unwrap_or_default();
			return Err(RemoteError::Search { status: status.as_u16(), body }.into());
		}

		match Self::read_result(res)? {
			Value::Array(items) => Ok(items.into_iter().next().map(RemoteRecord::from_value)),
			_ => Ok(None),
		}
	}

	fn create(&self, payload: &RecordPayload) -> Result<RemoteRecord> {
		tracing::info!("creating story");
		let res = self
			.http_client
			.post(self.table_url())
			.basic_auth(&self.username, Some(&self.password))
			.json(payload)
			.send()
			.wrap_err("Failed to reach ServiceNow")?;
		self.write(WriteOp::Create, res)
	}

	fn update(&self, sys_id: &str, payload: &RecordPayload) -> Result<RemoteRecord> {
		tracing::info!(sys_id, "updating story");
		let api_url = format!("{}/{}", self.table_url(), urlencoding::encode(sys_id));
		let res = self
			.http_client
			.patch(&api_url)
			.basic_auth(&self.username, Some(&self.password))
			.json(payload)
			.send()
			.wrap_err("Failed to reach ServiceNow")?;
		self.write(WriteOp::Update, res)
	}
}

//==============================================================================
// Convenience type alias for boxed client
//==============================================================================

pub type BoxedStoryClient = Box<dyn StoryClient>;

/// Create the client for this run.
///
/// Integration-test builds use the in-memory mock when `SNSTORY_MOCK_STATE` is set.
pub fn create_client(credentials: &Credentials) -> Result<BoxedStoryClient> {
	#[cfg(feature = "is_integration_test")]
	if let Ok(state_file) = std::env::var(crate::mock_servicenow::MOCK_STATE_ENV) {
		return Ok(Box::new(crate::mock_servicenow::MockServiceNowClient::from_state_file(state_file.into())?));
	}

	Ok(Box::new(ServiceNowClient::new(credentials)?))
}
