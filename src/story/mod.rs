//! Markdown user story format.
//!
//! A story file is plain markdown. The title is taken from the first
//! level-1 heading (or, failing that, the first non-blank line), and the
//! remaining body is split into a description and optional acceptance
//! criteria using bold section labels:
//!
//! ```markdown
//! # Login
//!
//! **Description:**
//! User can log in.
//!
//! **Acceptance Criteria:**
//! Given... Then...
//! ```

mod error;
pub use error::{ParseContext, ParseError};

mod sections;
pub use sections::{Sections, is_label_for, label_name};

use std::{path::Path, sync::LazyLock};

use color_eyre::eyre::{Result, WrapErr};
use regex::Regex;

static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#\s+.+").unwrap());
static H1_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#\s+").unwrap());
static USER_STORY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*user\s*story:\s*").unwrap());

pub const DESCRIPTION_LABEL: &str = "description";
pub const ACCEPTANCE_CRITERIA_LABEL: &str = "acceptance criteria";

/// A story file split into the parts that map onto record fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedDocument {
	pub title: String,
	pub description: String,
	pub acceptance_criteria: Option<String>,
}

impl ParsedDocument {
	/// Parse story markdown. `ctx` is only used for diagnostics.
	pub fn parse(content: &str, ctx: &ParseContext) -> Result<Self, ParseError> {
		let content = content.trim();
		if content.is_empty() {
			return Err(ParseError::EmptyFile { filename: ctx.filename.clone() });
		}

		let lines: Vec<&str> = content.lines().collect();
		let (title_idx, title) = find_title(&lines).ok_or_else(|| ParseError::NoTitle {
			src: ctx.named_source(),
			span: ctx.full_span(),
		})?;
		let title = strip_user_story_label(&title);
		tracing::debug!(title_idx, %title, "found title");

		let body = &lines[title_idx + 1..];
		let sections = Sections::scan(body);

		let acceptance_criteria = sections.body(ACCEPTANCE_CRITERIA_LABEL);
		let description = match sections.body(DESCRIPTION_LABEL) {
			Some(description) => description,
			None => {
				let mut desc_lines = body;
				if acceptance_criteria.as_deref().is_some_and(|ac| !ac.is_empty())
					&& let Some(ac_idx) = desc_lines.iter().position(|l| is_label_for(l, ACCEPTANCE_CRITERIA_LABEL))
				{
					desc_lines = &desc_lines[..ac_idx];
				}
				desc_lines.join("\n").trim().to_string()
			}
		};

		Ok(Self {
			title,
			description,
			acceptance_criteria,
		})
	}

	/// Read and parse a story file.
	pub fn parse_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read story file at {}", path.display()))?;
		let ctx = ParseContext::new(content.clone(), path.display().to_string());
		Ok(Self::parse(&content, &ctx)?)
	}
}

/// First level-1 heading, or else the first non-blank line.
fn find_title(lines: &[&str]) -> Option<(usize, String)> {
	lines
		.iter()
		.position(|l| H1_RE.is_match(l))
		.map(|idx| (idx, H1_MARKER_RE.replace(lines[idx], "").trim().to_string()))
		.or_else(|| lines.iter().position(|l| !l.trim().is_empty()).map(|idx| (idx, lines[idx].trim().to_string())))
}

fn strip_user_story_label(title: &str) -> String {
	USER_STORY_RE.replace(title, "").trim().to_string()
}
