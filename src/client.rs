//! The retrying request helper and its typed operations.
//!
//! [`DmpClient`] performs one logical HTTP operation per call: each attempt is
//! bound to its own timeout, transient failures (5xx, timeout, transport) are
//! retried with capped exponential backoff, and everything else surfaces
//! immediately. Timing out one attempt never cancels the retry sequence.

mod ops;

// crates.io
use reqwest::RequestBuilder;
// self
use crate::{
	_prelude::*,
	auth::TokenCache,
	config::{AuthMode, Settings},
	error::{ConfigError, TransientError, TransportError},
	http::{self, ReqwestHttpClient},
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	retry::{FailureClass, RetryPolicy},
};

/// Client for the DMP analysis service.
///
/// Stateless across calls except for the shared [`TokenCache`]; clones of the
/// underlying transport share the same connection pool.
pub struct DmpClient {
	/// Immutable settings resolved at startup.
	pub settings: Arc<Settings>,
	/// HTTP client wrapper used for every outbound request.
	pub http: ReqwestHttpClient,
	token_cache: Option<Arc<TokenCache>>,
	policy: RetryPolicy,
}
impl DmpClient {
	/// Creates a client with the crate's default transport.
	pub fn new(settings: Settings) -> Result<Self> {
		let http = ReqwestHttpClient::new()?;

		Ok(Self::with_http_client(Arc::new(settings), http))
	}

	/// Creates a client that reuses the caller-provided transport.
	///
	/// A [`TokenCache`] is provisioned automatically unless auth is disabled.
	pub fn with_http_client(settings: Arc<Settings>, http: ReqwestHttpClient) -> Self {
		let policy = RetryPolicy::api(&settings);
		let token_cache = (!matches!(settings.auth_mode, AuthMode::Disabled))
			.then(|| Arc::new(TokenCache::new(settings.clone(), http.clone())));

		Self { settings, http, token_cache, policy }
	}

	/// Replaces the API retry policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Shares an existing token cache (e.g. across several clients).
	pub fn with_token_cache(mut self, cache: Arc<TokenCache>) -> Self {
		self.token_cache = Some(cache);

		self
	}

	/// Returns the token cache, when auth is enabled.
	pub fn token_cache(&self) -> Option<&Arc<TokenCache>> {
		self.token_cache.as_ref()
	}

	/// Performs one logical request with bounded retries.
	///
	/// `build` is invoked once per attempt so non-replayable bodies (multipart) can
	/// be reconstructed. On a 2xx response a declared-JSON body is parsed and
	/// returned; any other body yields an empty JSON object.
	pub async fn request<F>(&self, kind: RequestKind, build: F) -> Result<serde_json::Value>
	where
		F: Fn(&ReqwestClient) -> RequestBuilder,
	{
		let span = RequestSpan::new(kind, "request");

		obs::record_request_outcome(kind, RequestOutcome::Attempt);

		let result = span.instrument(self.run_attempts(kind, build)).await;

		match &result {
			Ok(_) => obs::record_request_outcome(kind, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(kind, RequestOutcome::Failure),
		}

		result
	}

	/// Issues `GET {base_url}{endpoint}` through the retrying helper.
	pub async fn get(&self, endpoint: &str) -> Result<serde_json::Value> {
		let url = self.endpoint_url(endpoint)?;

		self.request(RequestKind::Api, move |client| client.get(url.clone())).await
	}

	/// Issues `POST {base_url}{endpoint}` with a JSON body through the retrying
	/// helper.
	pub async fn post_json<T>(&self, endpoint: &str, body: &T) -> Result<serde_json::Value>
	where
		T: Serialize,
	{
		let url = self.endpoint_url(endpoint)?;

		self.request(RequestKind::Api, move |client| client.post(url.clone()).json(body)).await
	}

	async fn run_attempts<F>(&self, kind: RequestKind, build: F) -> Result<serde_json::Value>
	where
		F: Fn(&ReqwestClient) -> RequestBuilder,
	{
		let mut retries = 0;

		loop {
			let builder = self.prepare(build(&self.http)).await?;

			match self.attempt(builder, retries + 1).await {
				Ok(value) => return Ok(value),
				Err(error) => {
					if failure_class(&error) == FailureClass::Retryable
						&& retries < self.policy.max_retries
					{
						retries += 1;

						obs::record_request_outcome(kind, RequestOutcome::Retry);
						tokio::time::sleep(self.policy.backoff_delay(retries)).await;

						continue;
					}

					return Err(error);
				},
			}
		}
	}

	/// Attaches the configured credential to an outgoing request.
	async fn prepare(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
		match self.settings.auth_mode {
			AuthMode::Disabled => Ok(builder),
			AuthMode::BearerHeader => {
				let token = self.require_cache()?.access_token().await?;

				Ok(builder.bearer_auth(token.expose()))
			},
			AuthMode::QueryParameter => {
				let token = self.require_cache()?.access_token().await?;

				Ok(builder.query(&[("access_token", token.expose())]))
			},
		}
	}

	async fn attempt(&self, builder: RequestBuilder, attempt: u32) -> Result<serde_json::Value> {
		let timeout = self.policy.attempt_timeout;
		let response = builder.timeout(timeout).send().await.map_err(|error| {
			if error.is_timeout() {
				Error::from(TransientError::Timeout {
					timeout_ms: timeout.as_millis() as u64,
					attempts: attempt,
				})
			} else if error.is_builder() {
				ConfigError::request_build(error).into()
			} else {
				TransportError::from(error).into()
			}
		})?;
		let status = response.status();

		if status.is_success() {
			if !http::declares_json(response.headers()) {
				return Ok(serde_json::Value::Object(serde_json::Map::new()));
			}

			let bytes = response.bytes().await.map_err(TransportError::from)?;
			let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

			serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| Error::Parse { source, status: Some(status.as_u16()) })
		} else {
			let retry_after = http::parse_retry_after(response.headers());
			let body = response.text().await.unwrap_or_default();

			if status.is_server_error() {
				Err(TransientError::Status {
					status: status.as_u16(),
					attempts: attempt,
					body,
					retry_after,
				}
				.into())
			} else {
				Err(Error::Client { status: status.as_u16(), body })
			}
		}
	}

	pub(crate) fn require_cache(&self) -> Result<&TokenCache> {
		self.token_cache.as_deref().ok_or_else(|| ConfigError::MissingProxyUrl.into())
	}

	/// Resolves an endpoint path against the configured base URL.
	///
	/// The base URL is known-valid from [`Settings`] construction, so a parse
	/// failure here is attributed to the endpoint.
	pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
		let joined = format!("{}{endpoint}", self.settings.base_url.as_str().trim_end_matches('/'));

		Url::parse(&joined).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source }.into()
		})
	}
}
impl Debug for DmpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DmpClient")
			.field("base_url", &self.settings.base_url)
			.field("auth_mode", &self.settings.auth_mode)
			.field("policy", &self.policy)
			.finish()
	}
}

/// Decodes a parsed response body into a typed payload.
pub(crate) fn decode<T>(value: serde_json::Value) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|source| Error::Parse { source, status: None })
}

fn failure_class(error: &Error) -> FailureClass {
	match error {
		Error::Transient(_) | Error::Transport(_) => FailureClass::Retryable,
		_ => FailureClass::Fatal,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TokenFetchError;

	fn transient() -> Error {
		TransientError::Status { status: 503, attempts: 1, body: String::new(), retry_after: None }
			.into()
	}

	#[test]
	fn failure_class_retries_transient_and_transport_only() {
		assert_eq!(failure_class(&transient()), FailureClass::Retryable);
		assert_eq!(
			failure_class(&TransientError::Timeout { timeout_ms: 100, attempts: 1 }.into()),
			FailureClass::Retryable,
		);
		assert_eq!(
			failure_class(&Error::Client { status: 404, body: String::new() }),
			FailureClass::Fatal,
		);
		assert_eq!(
			failure_class(&ConfigError::MissingProxyUrl.into()),
			FailureClass::Fatal,
		);
		assert_eq!(
			failure_class(
				&TokenFetchError::Endpoint { status: 503, message: String::new() }.into(),
			),
			FailureClass::Fatal,
		);
	}

	#[test]
	fn endpoint_url_joins_cleanly() {
		let settings = Settings::builder()
			.base_url("https://api.example.com")
			.build()
			.expect("Settings fixture should build successfully.");
		let client = DmpClient::with_http_client(Arc::new(settings), ReqwestHttpClient::default());
		let url = client.endpoint_url("/health").expect("Endpoint URL should resolve.");

		assert_eq!(url.as_str(), "https://api.example.com/health");
	}

	#[test]
	fn endpoint_url_blames_the_endpoint_not_the_base() {
		let settings = Settings::builder()
			.base_url("https://api.example.com")
			.build()
			.expect("Settings fixture should build successfully.");
		let client = DmpClient::with_http_client(Arc::new(settings), ReqwestHttpClient::default());
		let err = client
			.endpoint_url(":not-a-port")
			.expect_err("A malformed endpoint should be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::InvalidEndpoint { ref endpoint, .. })
				if endpoint == ":not-a-port",
		));
	}

	#[test]
	fn decode_reports_the_failing_path() {
		let value = serde_json::json!({ "status": 7 });
		let err = decode::<crate::api::HealthStatus>(value)
			.expect_err("Mistyped payload should fail to decode.");

		assert!(matches!(err, Error::Parse { status: None, .. }));
	}
}
