//! Error types for parsing story files.
//!
//! Uses miette for rich diagnostics with source code spans.

#![allow(unused_assignments)] // Fields are read by miette's derive macro via attributes

use miette::{Diagnostic, NamedSource, SourceSpan};

/// Error type for story file parsing.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ParseError {
	#[error("Markdown file is empty.")]
	#[diagnostic(code(snstory::parse::empty_file), help("write at least a title line, e.g. '# Login'"))]
	EmptyFile { filename: String },

	#[error("Could not determine a title from the markdown.")]
	#[diagnostic(code(snstory::parse::no_title), help("start the file with a level-1 heading: '# Title'"))]
	NoTitle {
		#[source_code]
		src: NamedSource<String>,
		#[label("no heading or non-blank line found")]
		span: SourceSpan,
	},
}

/// Holds source content and filename for error reporting.
#[derive(Clone, Debug)]
pub struct ParseContext {
	pub content: String,
	pub filename: String,
}

impl ParseContext {
	pub fn new(content: String, filename: impl Into<String>) -> Self {
		Self { content, filename: filename.into() }
	}

	/// Create a NamedSource for miette diagnostics.
	pub fn named_source(&self) -> NamedSource<String> {
		NamedSource::new(&self.filename, self.content.clone())
	}

	/// Span covering the whole source.
	pub fn full_span(&self) -> SourceSpan {
		(0, self.content.len()).into()
	}
}
