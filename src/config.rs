//! Immutable client settings resolved once at startup.
//!
//! Values are merged in order: explicit builder value → environment variable →
//! hard-coded default. Validation happens in [`SettingsBuilder::build`] so every
//! other component can treat [`Settings`] as trusted, read-only state.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

const ENV_BASE_URL: &str = "API_BASE_URL";
const ENV_PROXY_URL: &str = "AUTH_PROXY_URL";
const ENV_TOKEN_ENDPOINT: &str = "TOKEN_ENDPOINT";
const ENV_TIMEOUT_MS: &str = "API_TIMEOUT_MS";
const ENV_MAX_RETRIES: &str = "API_MAX_RETRIES";
const ENV_AUTH_MODE: &str = "AUTH_MODE";
const ENV_DISABLE_AUTH: &str = "DISABLE_AUTH";

/// How a bearer credential is attached to outgoing requests.
///
/// The service deployments disagree on this: some run with auth disabled entirely,
/// some expect an `Authorization: Bearer` header, and PDF downloads need the token
/// as a query parameter. The policy is therefore configuration, not client logic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
	/// No credential is attached and the token cache is never consulted.
	#[default]
	Disabled,
	/// Attach `Authorization: Bearer <token>` to every request.
	BearerHeader,
	/// Append `access_token=<token>` as a query parameter.
	QueryParameter,
}
impl AuthMode {
	fn parse(name: &'static str, value: &str) -> Result<Self, ConfigError> {
		match value.trim().to_ascii_lowercase().as_str() {
			"disabled" => Ok(Self::Disabled),
			"bearer" => Ok(Self::BearerHeader),
			"query" => Ok(Self::QueryParameter),
			_ => Err(ConfigError::UnknownAuthMode { name, value: value.to_owned() }),
		}
	}
}

/// Immutable settings record consumed by every other component.
#[derive(Clone, Debug)]
pub struct Settings {
	/// Base URL of the analysis API.
	pub base_url: Url,
	/// Fully resolved token endpoint URL, when an auth proxy is configured.
	pub token_url: Option<Url>,
	/// Per-attempt timeout applied to API requests.
	pub timeout: StdDuration,
	/// Maximum automatic retries for transient API failures.
	pub max_retries: u32,
	/// Credential attachment policy.
	pub auth_mode: AuthMode,
	/// Default user email stamped onto submissions that carry none.
	pub user_email: Option<String>,
}
impl Settings {
	/// Default API base URL for local development.
	pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8002";
	/// Default retry budget for API requests.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default per-attempt timeout for API requests.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// Default token endpoint path on the auth proxy.
	pub const DEFAULT_TOKEN_ENDPOINT: &'static str = "/api/token";

	/// Returns a builder seeded with defaults only.
	pub fn builder() -> SettingsBuilder {
		SettingsBuilder::default()
	}

	/// Builds settings from the process environment merged over defaults.
	pub fn from_env() -> Result<Self, ConfigError> {
		SettingsBuilder::default().merge_lookup(|key| env::var(key).ok())?.build()
	}
}

/// Builder for [`Settings`].
#[derive(Clone, Debug, Default)]
pub struct SettingsBuilder {
	base_url: Option<String>,
	auth_proxy_url: Option<String>,
	token_endpoint: Option<String>,
	timeout: Option<StdDuration>,
	max_retries: Option<u32>,
	auth_mode: Option<AuthMode>,
	user_email: Option<String>,
}
impl SettingsBuilder {
	/// Sets the API base URL.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());

		self
	}

	/// Sets the auth proxy origin serving the token endpoint.
	pub fn auth_proxy_url(mut self, url: impl Into<String>) -> Self {
		self.auth_proxy_url = Some(url.into());

		self
	}

	/// Sets the token endpoint path (must start with `/`).
	pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.token_endpoint = Some(endpoint.into());

		self
	}

	/// Sets the per-attempt timeout for API requests.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the retry budget for transient API failures.
	pub fn max_retries(mut self, retries: u32) -> Self {
		self.max_retries = Some(retries);

		self
	}

	/// Sets the credential attachment policy.
	pub fn auth_mode(mut self, mode: AuthMode) -> Self {
		self.auth_mode = Some(mode);

		self
	}

	/// Sets the default user email for submissions.
	pub fn user_email(mut self, email: impl Into<String>) -> Self {
		self.user_email = Some(email.into());

		self
	}

	/// Fills unset fields from a key/value lookup (the environment, in production).
	///
	/// Explicit builder values always win over looked-up ones.
	fn merge_lookup(
		mut self,
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, ConfigError> {
		if self.base_url.is_none() {
			self.base_url = lookup(ENV_BASE_URL);
		}
		if self.auth_proxy_url.is_none() {
			self.auth_proxy_url = lookup(ENV_PROXY_URL);
		}
		if self.token_endpoint.is_none() {
			self.token_endpoint = lookup(ENV_TOKEN_ENDPOINT);
		}
		if self.timeout.is_none()
			&& let Some(raw) = lookup(ENV_TIMEOUT_MS)
		{
			let millis = raw
				.trim()
				.parse::<u64>()
				.map_err(|source| ConfigError::InvalidEnvNumber { name: ENV_TIMEOUT_MS, source })?;

			self.timeout = Some(StdDuration::from_millis(millis));
		}
		if self.max_retries.is_none()
			&& let Some(raw) = lookup(ENV_MAX_RETRIES)
		{
			let retries = raw.trim().parse::<u32>().map_err(|source| {
				ConfigError::InvalidEnvNumber { name: ENV_MAX_RETRIES, source }
			})?;

			self.max_retries = Some(retries);
		}
		if self.auth_mode.is_none()
			&& let Some(raw) = lookup(ENV_AUTH_MODE)
		{
			self.auth_mode = Some(AuthMode::parse(ENV_AUTH_MODE, &raw)?);
		}
		// The kill switch wins over any configured mode.
		if lookup(ENV_DISABLE_AUTH).is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true")) {
			self.auth_mode = Some(AuthMode::Disabled);
		}

		Ok(self)
	}

	/// Consumes the builder, validates every field, and produces [`Settings`].
	pub fn build(self) -> Result<Settings, ConfigError> {
		let base_url = self.base_url.as_deref().unwrap_or(Settings::DEFAULT_BASE_URL);
		let base_url =
			Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		validate_scheme(&base_url)?;

		let auth_mode = self.auth_mode.unwrap_or_default();
		let token_endpoint =
			self.token_endpoint.unwrap_or_else(|| Settings::DEFAULT_TOKEN_ENDPOINT.to_owned());

		if !token_endpoint.starts_with('/') {
			return Err(ConfigError::RelativeTokenEndpoint { endpoint: token_endpoint });
		}

		let token_url = match &self.auth_proxy_url {
			Some(proxy) => {
				let proxy_url =
					Url::parse(proxy).map_err(|source| ConfigError::InvalidProxyUrl { source })?;

				validate_scheme(&proxy_url)?;

				// `Url` renders a trailing slash for bare origins; strip it so the
				// endpoint path concatenates cleanly.
				let joined =
					format!("{}{token_endpoint}", proxy_url.as_str().trim_end_matches('/'));

				Some(Url::parse(&joined).map_err(|source| ConfigError::InvalidProxyUrl { source })?)
			},
			None => None,
		};

		if !matches!(auth_mode, AuthMode::Disabled) && token_url.is_none() {
			return Err(ConfigError::MissingProxyUrl);
		}

		Ok(Settings {
			base_url,
			token_url,
			timeout: self.timeout.unwrap_or(Settings::DEFAULT_TIMEOUT),
			max_retries: self.max_retries.unwrap_or(Settings::DEFAULT_MAX_RETRIES),
			auth_mode,
			user_email: self.user_email,
		})
	}
}

fn validate_scheme(url: &Url) -> Result<(), ConfigError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(ConfigError::UnsupportedScheme { url: url.to_string() })
	}
}
