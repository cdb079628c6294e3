//! End-to-end runs of the binary against the mock ServiceNow table.
//!
//! Each run reads the seeded table from `SNSTORY_MOCK_STATE`, writes it back
//! after any create/update, and traces every mock call to `SNSTORY_TRACE_FILE`.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::{
	assert_not_traced, assert_traced,
	common::{BASE_URL, TestContext},
	tracing_utils::TraceLog,
};

const LOGIN_STORY: &str = "# Login\n\n**Description:**\nUser can log in.\n\n**Acceptance Criteria:**\nGiven... Then...\n";

#[fixture]
fn login_ctx() -> TestContext {
	TestContext::new(LOGIN_STORY)
}

fn first_record(ctx: &TestContext) -> Value {
	ctx.records().into_iter().next().expect("no record was written")
}

#[rstest]
fn test_creates_new_story(login_ctx: TestContext) {
	let (status, stdout, stderr) = login_ctx.run(&[]);
	assert!(status.success(), "stderr: {stderr}");

	let records = login_ctx.records();
	assert_eq!(records.len(), 1);
	let record = &records[0];
	assert_eq!(record["short_description"], "Login");
	assert_eq!(record["description"], "<p>User can log in.</p>\n");
	assert_eq!(record["acceptance_criteria"], "<p>Given... Then...</p>\n");

	let sys_id = record["sys_id"].as_str().unwrap();
	assert!(stdout.starts_with("Created new story:\n"), "stdout: {stdout}");
	assert!(stdout.contains(&format!("URL: {BASE_URL}/nav_to.do?uri=rm_story.do?sys_id={sys_id}")), "stdout: {stdout}");

	let trace = TraceLog::from_file(&login_ctx.trace_file);
	assert!(trace.has_search_for("Login"));
	assert!(trace.has_search_for("User Story: Login"));
	assert_traced!(trace, "create");
	assert_not_traced!(trace, "update");
}

#[rstest]
fn test_existing_story_is_reported_not_updated(login_ctx: TestContext) {
	login_ctx.setup_records(json!([{"sys_id": "abc123", "number": "STRY0000042", "short_description": "Login", "description": "old"}]));

	let (status, stdout, stderr) = login_ctx.run(&[]);
	assert_eq!(status.code(), Some(0), "stderr: {stderr}");
	assert!(stdout.starts_with("A story with the same short_description already exists.\n"), "stdout: {stdout}");
	assert!(stdout.contains("\"STRY0000042\""));
	assert!(stdout.contains(&format!("URL: {BASE_URL}/nav_to.do?uri=rm_story.do?sys_id=abc123")));
	assert!(stdout.trim_end().ends_with("Re-run with --update-if-exists to update it, or edit your title."));

	assert_eq!(login_ctx.records()[0]["description"], "old");
	let trace = TraceLog::from_file(&login_ctx.trace_file);
	assert_not_traced!(trace, "create");
	assert_not_traced!(trace, "update");
}

#[rstest]
fn test_existing_story_updated_with_flag(login_ctx: TestContext) {
	login_ctx.setup_records(json!([{"sys_id": "abc123", "short_description": "Login", "description": "old", "state": "draft"}]));

	let (status, stdout, stderr) = login_ctx.run(&["--update-if-exists"]);
	assert!(status.success(), "stderr: {stderr}");
	assert!(stdout.starts_with("Updated existing story:\n"), "stdout: {stdout}");
	assert!(stdout.contains(&format!("URL: {BASE_URL}/nav_to.do?uri=rm_story.do?sys_id=abc123")));

	let records = login_ctx.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0]["description"], "<p>User can log in.</p>\n");
	assert_eq!(records[0]["state"], "draft");

	let trace = TraceLog::from_file(&login_ctx.trace_file);
	assert!(trace.has_update_of("abc123"));
	assert_not_traced!(trace, "create");
}

#[rstest]
fn test_legacy_titled_story_is_found(login_ctx: TestContext) {
	login_ctx.setup_records(json!([{"sys_id": "legacy1", "short_description": "User Story: Login"}]));

	let (status, _stdout, stderr) = login_ctx.run(&["--update-if-exists"]);
	assert!(status.success(), "stderr: {stderr}");

	let records = login_ctx.records();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0]["sys_id"], "legacy1");
	assert_eq!(records[0]["short_description"], "Login");
}

#[rstest]
fn test_second_run_finds_created_story(login_ctx: TestContext) {
	let (status, _, stderr) = login_ctx.run(&[]);
	assert!(status.success(), "stderr: {stderr}");

	let (status, stdout, stderr) = login_ctx.run(&[]);
	assert!(status.success(), "stderr: {stderr}");
	assert!(stdout.starts_with("A story with the same short_description already exists."), "stdout: {stdout}");
	assert_eq!(login_ctx.records().len(), 1);
}

#[rstest]
fn test_plain_sends_markdown_unrendered() {
	let ctx = TestContext::new("User Story: Add cart\nAs a user I want a **cart**.");

	let (status, _, stderr) = ctx.run(&["--plain"]);
	assert!(status.success(), "stderr: {stderr}");

	let record = first_record(&ctx);
	assert_eq!(record["short_description"], "Add cart");
	assert_eq!(record["description"], "As a user I want a **cart**.");
	assert_eq!(record.get("acceptance_criteria"), None);
}

#[rstest]
fn test_overrides_and_additional_fields(login_ctx: TestContext) {
	let (status, _, stderr) = login_ctx.run(&[
		"--plain",
		"--priority",
		"2",
		"--story-points",
		"5",
		"--assigned-to",
		"user1",
		"--additional",
		r#"{"priority": "1", "u_team": "payments"}"#,
	]);
	assert!(status.success(), "stderr: {stderr}");

	let record = first_record(&login_ctx);
	assert_eq!(record["priority"], "1");
	assert_eq!(record["story_points"], "5");
	assert_eq!(record["assigned_to"], "user1");
	assert_eq!(record["u_team"], "payments");
	assert_eq!(record.get("product"), None);
}

#[rstest]
#[case(r#"["not", "an", "object"]"#)]
#[case("{broken")]
fn test_invalid_additional_fails_before_network(login_ctx: TestContext, #[case] additional: &str) {
	let (status, _, stderr) = login_ctx.run(&["--additional", additional]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("Invalid --additional JSON"), "stderr: {stderr}");

	let trace = TraceLog::from_file(&login_ctx.trace_file);
	assert!(trace.mock_calls().is_empty());
	assert!(login_ctx.records().is_empty());
}

#[rstest]
fn test_missing_file(login_ctx: TestContext) {
	let missing = login_ctx.dir.path().join("nope.md");
	let (status, _, stderr) = login_ctx.run_with_file(&missing, &[]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("File not found"), "stderr: {stderr}");
}

#[rstest]
fn test_missing_credentials() {
	let ctx = TestContext::new(LOGIN_STORY).without_credentials();
	let (status, _, stderr) = ctx.run(&[]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("SN_INSTANCE, SN_USERNAME, SN_PASSWORD"), "stderr: {stderr}");
}

#[rstest]
fn test_empty_story_fails_before_network() {
	let ctx = TestContext::new("  \n\n");
	let (status, _, stderr) = ctx.run(&[]);
	assert_eq!(status.code(), Some(1));
	assert!(stderr.contains("Markdown file is empty."), "stderr: {stderr}");

	let trace = TraceLog::from_file(&ctx.trace_file);
	assert!(trace.mock_calls().is_empty());
}

#[rstest]
fn test_json_summary(login_ctx: TestContext) {
	let (status, stdout, stderr) = login_ctx.run(&["--json"]);
	assert!(status.success(), "stderr: {stderr}");

	let summary: Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(summary["action"], "created");
	let sys_id = summary["sys_id"].as_str().unwrap();
	assert_eq!(summary["record"]["sys_id"], sys_id);
	assert_eq!(summary["number"], summary["record"]["number"]);
	assert_eq!(summary["url"], format!("{BASE_URL}/nav_to.do?uri=rm_story.do?sys_id={sys_id}"));
}
