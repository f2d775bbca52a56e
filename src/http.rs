//! Shared HTTP transport primitives.
//!
//! Every outbound call in the crate goes through [`ReqwestHttpClient`] so connection
//! pooling and client construction live in one place. The helpers here also capture
//! the response metadata (JSON content type, `Retry-After` hints) that the request
//! helper and the token cache use to classify outcomes.

// std
use std::ops::Deref;
// crates.io
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client with the crate's default transport configuration.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Returns `true` when the response declares a JSON body.
pub(crate) fn declares_json(headers: &HeaderMap) -> bool {
	headers
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.contains("application/json"))
}

/// Parses a `Retry-After` header into a relative duration, accepting both the
/// delta-seconds and HTTP-date forms.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
