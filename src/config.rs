//! Instance credentials, read from `SN_*` environment variables (optionally via `.env`).

use config::{Config, Environment};
use url::Url;

pub const ENV_PREFIX: &str = "SN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Missing credentials ({}). Set SN_INSTANCE, SN_USERNAME, and SN_PASSWORD via environment variables or a .env file.", missing.join(", "))]
	MissingCredentials { missing: Vec<&'static str> },

	#[error("SN_INSTANCE is empty.")]
	EmptyInstance,

	#[error("SN_INSTANCE must be a full URL like https://yourinstance.service-now.com, got `{raw}`")]
	InvalidInstance { raw: String },

	#[error(transparent)]
	Source(#[from] config::ConfigError),
}

/// Connection settings for one ServiceNow instance.
#[derive(Clone, derive_new::new)]
pub struct Credentials {
	/// Normalized `scheme://host[:port]`, no trailing slash.
	pub base_url: String,
	pub username: String,
	pub password: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials")
			.field("base_url", &self.base_url)
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

impl Credentials {
	/// Load from the process environment, after populating it from `.env` if one is found.
	/// Variables already set in the environment take precedence over `.env`.
	pub fn load() -> Result<Self, ConfigError> {
		match dotenvy::dotenv() {
			Ok(path) => tracing::debug!(path = %path.display(), "loaded dotenv file"),
			Err(e) if e.not_found() => {}
			Err(e) => tracing::warn!("ignoring unreadable .env file: {e}"),
		}
		Self::from_environment(Environment::with_prefix(ENV_PREFIX))
	}

	pub fn from_environment(env: Environment) -> Result<Self, ConfigError> {
		let settings = Config::builder().add_source(env).build()?;
		let read = |key: &str| settings.get_string(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		let instance = read("instance");
		let username = read("username");
		let password = read("password");

		let missing: Vec<&'static str> = [("SN_INSTANCE", instance.is_none()), ("SN_USERNAME", username.is_none()), ("SN_PASSWORD", password.is_none())]
			.into_iter()
			.filter_map(|(name, is_missing)| is_missing.then_some(name))
			.collect();

		match (instance, username, password) {
			(Some(instance), Some(username), Some(password)) => Ok(Self::new(normalize_instance_url(&instance)?, username, password)),
			_ => Err(ConfigError::MissingCredentials { missing }),
		}
	}
}

/// Normalize the instance setting to `scheme://host[:port]`.
///
/// Accepts full UI URLs like `https://instance.service-now.com/now/nav/ui/home`,
/// or a bare host containing a dot, to which `https://` is prepended.
pub fn normalize_instance_url(raw: &str) -> Result<String, ConfigError> {
	let raw = raw.trim();
	if raw.is_empty() {
		return Err(ConfigError::EmptyInstance);
	}

	if let Ok(url) = Url::parse(raw)
		&& let Some(host) = url.host_str()
	{
		return Ok(match url.port() {
			Some(port) => format!("{}://{host}:{port}", url.scheme()),
			None => format!("{}://{host}", url.scheme()),
		});
	}

	if raw.contains('.') {
		return Ok(format!("https://{}", raw.trim_end_matches('/')));
	}
	Err(ConfigError::InvalidInstance { raw: raw.to_string() })
}
