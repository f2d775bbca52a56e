//! Wire payloads exchanged with the analysis service and its auth proxy.

// self
use crate::_prelude::*;

/// Body returned by the auth proxy's token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
	/// The bearer token value.
	pub access_token: String,
	/// Server-declared lifetime, in seconds.
	pub expires_in: i64,
}

/// Body returned by the health probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
	/// Free-form status label; `"ok"` when the service is up.
	pub status: String,
}

/// Text analysis submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
	/// Checklist the document is evaluated against.
	pub checklist_id: String,
	/// Document text to analyze.
	pub text: String,
	/// Analysis configuration identifier.
	pub config_id: String,
	/// Email notified when the analysis completes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_email: Option<String>,
}
impl AnalyzeRequest {
	/// Creates a submission for the provided checklist/config pair.
	pub fn new(
		checklist_id: impl Into<String>,
		text: impl Into<String>,
		config_id: impl Into<String>,
	) -> Self {
		Self {
			checklist_id: checklist_id.into(),
			text: text.into(),
			config_id: config_id.into(),
			user_email: None,
		}
	}

	/// Attaches the notification email.
	pub fn with_user_email(mut self, email: impl Into<String>) -> Self {
		self.user_email = Some(email.into());

		self
	}
}

/// Receipt returned when an analysis is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReceipt {
	/// Identifier of the queued analysis run.
	pub run_id: String,
	/// Token granting access to the run's results page.
	pub access_token: String,
}

/// A PDF document staged for upload.
///
/// The bytes are owned so the multipart body can be rebuilt for every retry
/// attempt; multipart streams cannot be replayed.
#[derive(Clone, Debug)]
pub struct PdfDocument {
	/// File name reported to the server.
	pub file_name: String,
	/// Raw PDF bytes.
	pub bytes: Vec<u8>,
}
impl PdfDocument {
	/// Wraps a named byte buffer.
	pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self { file_name: file_name.into(), bytes: bytes.into() }
	}
}

/// What a feedback submission targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
	/// Feedback on one evaluated domain.
	Domain,
	/// Feedback on one checklist item.
	Item,
	/// Feedback on the analysis as a whole.
	Overall,
}
impl FeedbackKind {
	/// Returns the wire label for the kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			FeedbackKind::Domain => "domain",
			FeedbackKind::Item => "item",
			FeedbackKind::Overall => "overall",
		}
	}
}
impl Display for FeedbackKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reviewer's accuracy verdict on a domain or item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyRating {
	/// The finding is accurate.
	Yes,
	/// The finding is accurate but not useful.
	NotUseful,
	/// The finding is inaccurate.
	No,
}

/// Accuracy + comment pair collected for a domain or item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
	/// Accuracy verdict, when one was given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accuracy: Option<AccuracyRating>,
	/// Free-form comment, when one was given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub comment: Option<String>,
}
impl FeedbackEntry {
	/// Returns `true` when neither an accuracy verdict nor a comment was given.
	pub fn is_empty(&self) -> bool {
		self.accuracy.is_none() && self.comment.is_none()
	}
}

/// Star rating + comment for the analysis as a whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallFeedback {
	/// Rating from 1 to 5; 0 means not rated.
	pub rating: u8,
	/// Free-form comment.
	pub comment: String,
}
impl OverallFeedback {
	/// Returns `true` when no rating was given and the comment is empty.
	pub fn is_empty(&self) -> bool {
		self.rating == 0 && self.comment.is_empty()
	}
}

/// One feedback submission as posted to the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
	/// Analysis run the feedback belongs to.
	pub run_id: String,
	/// What the feedback targets.
	pub feedback_type: FeedbackKind,
	/// Domain or item identifier; absent for overall feedback.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// The feedback payload itself.
	pub feedback: serde_json::Value,
}
impl FeedbackSubmission {
	/// Builds a domain or item submission.
	pub fn entry(
		run_id: impl Into<String>,
		kind: FeedbackKind,
		id: impl Into<String>,
		entry: &FeedbackEntry,
	) -> Result<Self> {
		Ok(Self {
			run_id: run_id.into(),
			feedback_type: kind,
			id: Some(id.into()),
			feedback: to_value(entry)?,
		})
	}

	/// Builds an overall submission.
	pub fn overall(run_id: impl Into<String>, overall: &OverallFeedback) -> Result<Self> {
		Ok(Self {
			run_id: run_id.into(),
			feedback_type: FeedbackKind::Overall,
			id: None,
			feedback: to_value(overall)?,
		})
	}
}

fn to_value<T>(value: &T) -> Result<serde_json::Value>
where
	T: Serialize,
{
	serde_json::to_value(value)
		.map_err(|error| crate::error::ConfigError::request_build(error).into())
}
