//! Coalescing bearer-token cache.
//!
//! The cache serves a valid credential without touching the network, and funnels
//! every concurrent refresh into a single in-flight fetch: callers that arrive
//! while one is running attach to the same shared future and receive its result,
//! success or failure, without issuing a second request. The in-flight handle is
//! cleared when the fetch settles so a later call can try again.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::{
	FutureExt,
	future::{BoxFuture, Shared},
};
// self
use crate::{
	_prelude::*,
	api::TokenResponse,
	auth::{BearerToken, Credential},
	config::Settings,
	error::{ConfigError, TokenFetchError},
	http::{self, ReqwestHttpClient},
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	retry::RetryPolicy,
};

type SharedFetch = Shared<BoxFuture<'static, Result<Credential, TokenFetchError>>>;

// One year. Anything longer is a proxy bug, not a credential lifetime.
const MAX_EXPIRES_IN_SECS: i64 = 31_536_000;

/// Shared mutable cache state: the credential plus the in-flight fetch marker.
#[derive(Default)]
struct CacheState {
	credential: Option<Credential>,
	in_flight: Option<SharedFetch>,
}

/// Always-on counters for cache activity.
#[derive(Debug, Default)]
pub struct RefreshStats {
	fetches: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	coalesced: AtomicU64,
}
impl RefreshStats {
	/// Returns the number of network fetches started.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches that produced a credential.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches that failed after exhausting their budget.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined an already-running fetch.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}
}

/// Bearer credential provider hiding refresh latency behind a cache.
pub struct TokenCache {
	settings: Arc<Settings>,
	http: ReqwestHttpClient,
	policy: RetryPolicy,
	state: Arc<Mutex<CacheState>>,
	stats: Arc<RefreshStats>,
}
impl TokenCache {
	/// Creates a cache over the provided settings and transport.
	pub fn new(settings: Arc<Settings>, http: ReqwestHttpClient) -> Self {
		Self {
			settings,
			http,
			policy: RetryPolicy::token(),
			state: Arc::new(Mutex::new(CacheState::default())),
			stats: Arc::new(RefreshStats::default()),
		}
	}

	/// Replaces the token fetch retry policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Returns the cache activity counters.
	pub fn stats(&self) -> &RefreshStats {
		&self.stats
	}

	/// Returns the cached credential when it is still valid.
	pub fn cached(&self) -> Option<Credential> {
		let now = OffsetDateTime::now_utc();

		self.state.lock().credential.clone().filter(|credential| credential.is_valid_at(now))
	}

	/// Discards the cached credential, forcing the next [`access_token`] to refresh.
	///
	/// [`access_token`]: Self::access_token
	pub fn clear(&self) {
		self.state.lock().credential = None;
	}

	/// Returns a valid bearer token, refreshing only when the cache cannot serve one.
	pub async fn access_token(&self) -> Result<BearerToken> {
		if let Some(credential) = self.cached() {
			return Ok(credential.token);
		}

		Ok(self.refresh().await?.token)
	}

	/// Fetches a fresh credential, joining the in-flight fetch when one exists.
	pub async fn refresh(&self) -> Result<Credential> {
		let span = RequestSpan::new(RequestKind::Token, "refresh");

		obs::record_request_outcome(RequestKind::Token, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let fetch = self.attach_or_start()?;

				fetch.await.map_err(Error::from)
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(RequestKind::Token, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(RequestKind::Token, RequestOutcome::Failure),
		}

		result
	}

	fn attach_or_start(&self) -> Result<SharedFetch> {
		let Some(token_url) = self.settings.token_url.clone() else {
			return Err(ConfigError::MissingProxyUrl.into());
		};
		let mut state = self.state.lock();

		if let Some(fetch) = &state.in_flight {
			self.stats.record_coalesced();

			return Ok(fetch.clone());
		}

		self.stats.record_fetch();

		let fetch = start_fetch(
			self.http.0.clone(),
			token_url,
			self.policy,
			self.state.clone(),
			self.stats.clone(),
		);

		state.in_flight = Some(fetch.clone());

		Ok(fetch)
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("token_url", &self.settings.token_url)
			.field("policy", &self.policy)
			.field("cached", &self.state.lock().credential.is_some())
			.finish()
	}
}

/// Builds the shared fetch future. The future owns clones of everything it needs so
/// it stays `'static`; when it settles it stores the credential (on success) and
/// clears the in-flight marker either way.
fn start_fetch(
	client: ReqwestClient,
	url: Url,
	policy: RetryPolicy,
	state: Arc<Mutex<CacheState>>,
	stats: Arc<RefreshStats>,
) -> SharedFetch {
	async move {
		let result = fetch_credential(&client, &url, &policy).await;
		let mut guard = state.lock();

		match &result {
			Ok(credential) => {
				stats.record_success();

				guard.credential = Some(credential.clone());
			},
			Err(_) => stats.record_failure(),
		}

		guard.in_flight = None;

		result
	}
	.boxed()
	.shared()
}

/// Runs the bounded retry loop around individual fetch attempts.
///
/// Any failure class is eligible for a retry here: the token proxy is a single
/// trusted peer, and a malformed payload from it is as likely to be a rolling
/// deploy as a 502.
async fn fetch_credential(
	client: &ReqwestClient,
	url: &Url,
	policy: &RetryPolicy,
) -> Result<Credential, TokenFetchError> {
	let mut retries = 0;

	loop {
		match fetch_once(client, url.clone(), policy.attempt_timeout).await {
			Ok(credential) => return Ok(credential),
			Err(error) => {
				if retries >= policy.max_retries {
					return Err(error);
				}

				retries += 1;

				obs::record_request_outcome(RequestKind::Token, RequestOutcome::Retry);
				tokio::time::sleep(policy.backoff_delay(retries)).await;
			},
		}
	}
}

async fn fetch_once(
	client: &ReqwestClient,
	url: Url,
	timeout: StdDuration,
) -> Result<Credential, TokenFetchError> {
	let response = client.get(url).timeout(timeout).send().await.map_err(|error| {
		if error.is_timeout() {
			TokenFetchError::Timeout { timeout_ms: timeout.as_millis() as u64 }
		} else {
			TokenFetchError::Network { message: error.to_string() }
		}
	})?;
	let status = response.status();

	if !status.is_success() {
		let message = match response.text().await {
			Ok(body) if !body.is_empty() => body,
			_ => status.to_string(),
		};

		return Err(TokenFetchError::Endpoint { status: status.as_u16(), message });
	}
	if !http::declares_json(response.headers()) {
		let content_type = response
			.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.unwrap_or("<missing>")
			.to_owned();

		return Err(TokenFetchError::UnexpectedContentType { content_type });
	}

	let bytes = response
		.bytes()
		.await
		.map_err(|error| TokenFetchError::Network { message: error.to_string() })?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let payload: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|error| TokenFetchError::InvalidPayload { message: error.to_string() })?;

	if payload.access_token.is_empty() {
		return Err(TokenFetchError::InvalidPayload { message: "access_token is empty".into() });
	}
	if !(1..=MAX_EXPIRES_IN_SECS).contains(&payload.expires_in) {
		return Err(TokenFetchError::InvalidPayload {
			message: format!(
				"expires_in must be within 1..={MAX_EXPIRES_IN_SECS}, got {}",
				payload.expires_in,
			),
		});
	}

	Ok(Credential::from_response(
		payload.access_token,
		payload.expires_in,
		OffsetDateTime::now_utc(),
	))
}
