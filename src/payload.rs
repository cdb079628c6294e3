//! Request body for `rm_story` writes.

use clap::Args;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::story::ParsedDocument;

/// ServiceNow keeps `short_description` short; longer titles are cut here rather than by the server.
pub const SHORT_DESCRIPTION_MAX_CHARS: usize = 160;

/// Optional scalar fields settable from the command line.
#[derive(Args, Clone, Debug, Default)]
pub struct FieldOverrides {
	/// Set priority (e.g., 1, 2, 3, 4, 5)
	#[arg(long)]
	pub priority: Option<String>,
	/// Assigned to (user sys_id)
	#[arg(long)]
	pub assigned_to: Option<String>,
	/// Product (sys_id)
	#[arg(long)]
	pub product: Option<String>,
	/// Story points (integer)
	#[arg(long)]
	pub story_points: Option<String>,
}

impl FieldOverrides {
	fn fields(&self) -> [(&'static str, Option<&str>); 4] {
		[
			("priority", self.priority.as_deref()),
			("assigned_to", self.assigned_to.as_deref()),
			("product", self.product.as_deref()),
			("story_points", self.story_points.as_deref()),
		]
	}
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidAdditionalPayload {
	#[error("Invalid --additional JSON: {0}")]
	Malformed(#[from] serde_json::Error),

	#[error("Invalid --additional JSON: additional payload must be a JSON object, got {found}")]
	NotAnObject { found: &'static str },
}

/// Field name -> value mapping sent as the JSON body.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordPayload(Map<String, Value>);

impl RecordPayload {
	pub fn from_document(doc: &ParsedDocument) -> Self {
		let mut fields = Map::new();
		let short_description: String = doc.title.chars().take(SHORT_DESCRIPTION_MAX_CHARS).collect();
		fields.insert("short_description".into(), Value::String(short_description));
		fields.insert("description".into(), Value::String(doc.description.clone()));
		if let Some(ac) = doc.acceptance_criteria.as_deref().filter(|ac| !ac.is_empty()) {
			fields.insert("acceptance_criteria".into(), Value::String(ac.to_string()));
		}
		Self(fields)
	}

	pub fn with_overrides(mut self, overrides: &FieldOverrides) -> Self {
		for (key, value) in overrides.fields() {
			if let Some(value) = value.filter(|v| !v.is_empty()) {
				self.0.insert(key.into(), Value::String(value.to_string()));
			}
		}
		self
	}

	/// Shallow-merge a JSON object given on the command line. Its keys win over computed ones.
	pub fn merge_additional(mut self, raw: &str) -> Result<Self, InvalidAdditionalPayload> {
		match serde_json::from_str::<Value>(raw)? {
			Value::Object(extra) => {
				self.0.extend(extra);
				Ok(self)
			}
			other => Err(InvalidAdditionalPayload::NotAnObject { found: json_kind(&other) }),
		}
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn fields(&self) -> &Map<String, Value> {
		&self.0
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
