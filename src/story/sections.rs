//! Bold-label sections (`**Label:**` on a line of its own).

use std::sync::LazyLock;

use regex::Regex;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*\*\*([^*]+):\*\*\s*$").unwrap());

/// Returns the label name if `line` is a standalone section label.
pub fn label_name(line: &str) -> Option<&str> {
	LABEL_RE.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

/// Whether `line` is the label line for `name` (case-insensitive).
pub fn is_label_for(line: &str, name: &str) -> bool {
	label_name(line).is_some_and(|label| label.eq_ignore_ascii_case(name))
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Section<'a> {
	name: &'a str,
	lines: Vec<&'a str>,
}

/// Named sections in document order.
///
/// Lines preceding the first label belong to no section and are not kept.
/// Repeating a label restarts that section in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Sections<'a> {
	sections: Vec<Section<'a>>,
}

impl<'a> Sections<'a> {
	pub fn scan(lines: &[&'a str]) -> Self {
		let mut sections: Vec<Section<'a>> = Vec::new();
		let mut current: Option<usize> = None;

		for &line in lines {
			if let Some(name) = label_name(line) {
				let idx = match sections.iter().position(|s| s.name == name) {
					Some(idx) => {
						sections[idx].lines.clear();
						idx
					}
					None => {
						sections.push(Section { name, lines: Vec::new() });
						sections.len() - 1
					}
				};
				current = Some(idx);
				continue;
			}
			if let Some(idx) = current {
				sections[idx].lines.push(line);
			}
		}

		Self { sections }
	}

	/// Joined and trimmed body of the first section whose name matches case-insensitively.
	pub fn body(&self, name: &str) -> Option<String> {
		self.sections
			.iter()
			.find(|s| s.name.eq_ignore_ascii_case(name))
			.map(|s| s.lines.join("\n").trim().to_string())
	}

	pub fn is_empty(&self) -> bool {
		self.sections.is_empty()
	}
}
