use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use snstory::{Credentials, FieldOverrides, ParseError, ParsedDocument, PublishOutcome, RecordPayload, create_client, publish, render};
use tracing_subscriber::{EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// When set, tracing events are also written to this file as JSON lines.
const TRACE_FILE_ENV: &str = "SNSTORY_TRACE_FILE";

#[derive(Debug, Parser)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " ", env!("GIT_HASH")), about = "Publish a Markdown user story to ServiceNow rm_story", long_about = None)]
struct Cli {
	/// Path to the markdown file
	#[arg(long)]
	file: PathBuf,

	/// If a story with the same short_description exists, update it instead of creating a new one
	#[arg(long)]
	update_if_exists: bool,

	/// Send plain text (disable Markdown to HTML conversion)
	#[arg(long)]
	plain: bool,

	#[command(flatten)]
	overrides: FieldOverrides,

	/// Additional JSON to merge into payload (e.g. '{"u_custom":"val"}')
	#[arg(long)]
	additional: Option<String>,

	/// Print a JSON summary (action, sys_id, number, url, record) instead of the report
	#[arg(long)]
	json: bool,
}

fn main() -> Result<()> {
	color_eyre::install()?;
	let cli = Cli::parse();
	init_tracing()?;

	match run(&cli) {
		Ok(()) => Ok(()),
		Err(report) => match report.downcast::<ParseError>() {
			Ok(parse_error) => {
				eprintln!("{:?}", miette::Report::new(parse_error));
				std::process::exit(1);
			}
			Err(report) => Err(report),
		},
	}
}

fn run(cli: &Cli) -> Result<()> {
	let path = expand_home(&cli.file);
	if !path.is_file() {
		bail!("File not found: {}", path.display());
	}

	let mut doc = ParsedDocument::parse_file(&path)?;
	if !cli.plain {
		doc = render::document_to_html(doc);
	}

	let credentials = Credentials::load()?;
	tracing::debug!(?credentials, "loaded credentials");

	let mut payload = RecordPayload::from_document(&doc).with_overrides(&cli.overrides);
	if let Some(raw) = &cli.additional {
		payload = payload.merge_additional(raw)?;
	}
	tracing::debug!(?payload, "built payload");

	let client = create_client(&credentials)?;
	let outcome = publish(client.as_ref(), &doc.title, &payload, cli.update_if_exists)?;
	print_outcome(&outcome, &credentials.base_url, cli.json)
}

fn print_outcome(outcome: &PublishOutcome, base_url: &str, json: bool) -> Result<()> {
	let url = outcome.url(base_url);

	if json {
		let summary = serde_json::json!({
			"action": outcome.action(),
			"sys_id": outcome.sys_id(),
			"number": outcome.record().number(),
			"url": url,
			"record": outcome.record(),
		});
		println!("{}", serde_json::to_string_pretty(&summary)?);
		return Ok(());
	}

	println!("{}", outcome.headline());
	println!("{}", outcome.record().to_pretty_json());
	match url {
		Some(url) => println!("URL: {url}"),
		None => tracing::warn!("record has no sys_id, cannot build a link to it"),
	}
	if matches!(outcome, PublishOutcome::AlreadyExists(_)) {
		println!("Re-run with --update-if-exists to update it, or edit your title.");
	}
	Ok(())
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
	match (path.strip_prefix("~"), dirs::home_dir()) {
		(Ok(rest), Some(home)) => home.join(rest),
		_ => path.to_path_buf(),
	}
}

fn init_tracing() -> Result<()> {
	let default_directives = option_env!("LOG_DIRECTIVES").unwrap_or("warn");
	let stderr_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives)));

	let file_layer = match std::env::var_os(TRACE_FILE_ENV) {
		Some(path) => {
			let file = std::fs::File::create(&path).wrap_err_with(|| format!("Failed to create trace file at {}", Path::new(&path).display()))?;
			Some(fmt::layer().json().with_writer(std::sync::Mutex::new(file)).with_filter(EnvFilter::new("info")))
		}
		None => None,
	};

	tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();
	Ok(())
}
