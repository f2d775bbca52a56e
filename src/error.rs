//! Client-level error types shared across configuration, auth, and the request helper.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fails fast, never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token fetch failure, delivered to every caller that joined the in-flight refresh.
	#[error(transparent)]
	TokenFetch(#[from] TokenFetchError),

	/// Server rejected the request with a non-retryable status (4xx).
	#[error("Server rejected the request with status {status}.")]
	Client {
		/// HTTP status code returned by the server.
		status: u16,
		/// Response body captured for diagnostics.
		body: String,
	},
	/// Successful response carried a body that could not be decoded.
	#[error("Response body could not be decoded.")]
	Parse {
		/// Structured parsing failure, including the path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the offending response, when decoding happened inline.
		status: Option<u16>,
	},
}
impl Error {
	/// Returns the HTTP status associated with the error, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Client { status, .. } => Some(*status),
			Self::Parse { status, .. } => *status,
			Self::Transient(TransientError::Status { status, .. }) => Some(*status),
			Self::TokenFetch(TokenFetchError::Endpoint { status, .. }) => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while building [`Settings`] or requests.
///
/// [`Settings`]: crate::config::Settings
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Base URL could not be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Auth proxy URL could not be parsed.
	#[error("Auth proxy URL is invalid.")]
	InvalidProxyUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL uses a scheme other than http/https.
	#[error("URL `{url}` must use the http or https scheme.")]
	UnsupportedScheme {
		/// Offending URL rendered as a string.
		url: String,
	},
	/// Authentication is enabled but no proxy URL was supplied.
	#[error("Auth proxy URL is required when authentication is enabled.")]
	MissingProxyUrl,
	/// An endpoint path does not join onto the base URL as a valid URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Offending endpoint value.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint is not an absolute path.
	#[error("Token endpoint `{endpoint}` must start with `/`.")]
	RelativeTokenEndpoint {
		/// Offending endpoint value.
		endpoint: String,
	},
	/// An environment variable holds a non-numeric value.
	#[error("Environment variable `{name}` is not a valid integer.")]
	InvalidEnvNumber {
		/// Environment variable name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: std::num::ParseIntError,
	},
	/// An environment variable holds an unrecognized auth mode.
	#[error("Environment variable `{name}` holds an unknown auth mode `{value}`.")]
	UnknownAuthMode {
		/// Environment variable name.
		name: &'static str,
		/// Offending value.
		value: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request could not be constructed.
	#[error("HTTP request could not be constructed.")]
	RequestBuild {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a request builder failure inside [`ConfigError`].
	pub fn request_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::RequestBuild { source: Box::new(src) }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Server returned a 5xx status and the retry budget is exhausted.
	#[error("Server returned status {status} after {attempts} attempt(s).")]
	Status {
		/// HTTP status code returned by the server.
		status: u16,
		/// Total attempts performed for the logical request.
		attempts: u32,
		/// Response body captured for diagnostics.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Every attempt exceeded its timeout.
	#[error("Request timed out after {timeout_ms} ms ({attempts} attempt(s)).")]
	Timeout {
		/// Per-attempt timeout in milliseconds.
		timeout_ms: u64,
		/// Total attempts performed for the logical request.
		attempts: u32,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

/// Token fetch failures.
///
/// Kept `Clone` with string payloads so a single terminal failure can be handed to
/// every caller that attached to the in-flight refresh.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenFetchError {
	/// Token endpoint returned a non-2xx status.
	#[error("Token endpoint returned status {status}: {message}.")]
	Endpoint {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Response body or status text captured for diagnostics.
		message: String,
	},
	/// Token request exceeded its timeout.
	#[error("Token request timed out after {timeout_ms} ms.")]
	Timeout {
		/// Per-attempt timeout in milliseconds.
		timeout_ms: u64,
	},
	/// Transport failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint: {message}.")]
	Network {
		/// Human-readable error payload.
		message: String,
	},
	/// Token endpoint responded with something other than JSON.
	#[error("Token endpoint returned an unexpected content type: {content_type}.")]
	UnexpectedContentType {
		/// Declared content type, or `<missing>`.
		content_type: String,
	},
	/// Token endpoint returned JSON that is malformed or missing required fields.
	#[error("Token endpoint returned an invalid payload: {message}.")]
	InvalidPayload {
		/// Human-readable error payload.
		message: String,
	},
}
