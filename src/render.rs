//! Markdown to HTML rendering for record fields.

use pulldown_cmark::{Options, Parser, html};

use crate::story::ParsedDocument;

/// Render markdown into an HTML fragment.
pub fn to_html(markdown: &str) -> String {
	let mut options = Options::empty();
	options.insert(Options::ENABLE_TABLES);
	options.insert(Options::ENABLE_STRIKETHROUGH);
	options.insert(Options::ENABLE_TASKLISTS);

	let parser = Parser::new_ext(markdown, options);
	let mut out = String::with_capacity(markdown.len() * 3 / 2);
	html::push_html(&mut out, parser);
	out
}

/// Render the description, and acceptance criteria when non-blank, to HTML. The title stays plain.
pub fn document_to_html(doc: ParsedDocument) -> ParsedDocument {
	ParsedDocument {
		description: to_html(&doc.description),
		acceptance_criteria: doc.acceptance_criteria.map(|ac| if ac.trim().is_empty() { ac } else { to_html(&ac) }),
		title: doc.title,
	}
}
