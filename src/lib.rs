//! Publish a markdown user story to a ServiceNow `rm_story` record.

pub mod config;
pub mod mock_servicenow;
pub mod payload;
pub mod publish;
pub mod render;
pub mod servicenow;
pub mod story;

// Re-export the main types at crate root for convenience
pub use config::{ConfigError, Credentials, normalize_instance_url};
pub use payload::{FieldOverrides, InvalidAdditionalPayload, RecordPayload};
pub use publish::{PublishAction, PublishOutcome, publish};
pub use servicenow::{BoxedStoryClient, RemoteError, RemoteRecord, ServiceNowClient, StoryClient, create_client, record_url};
pub use story::{ParseContext, ParseError, ParsedDocument};
