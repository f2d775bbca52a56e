//! Typed operations layered over the retrying request helper.

// crates.io
use reqwest::multipart::{Form, Part};
// self
use crate::{
	_prelude::*,
	api::{AnalysisReceipt, AnalyzeRequest, FeedbackSubmission, HealthStatus, PdfDocument},
	client::{DmpClient, decode},
	config::AuthMode,
	feedback::FeedbackDraft,
	obs::RequestKind,
};

const ANALYZE_ENDPOINT: &str = "/api/dmp/enriched-checklists/analyze";
const UPLOAD_PDF_ENDPOINT: &str = "/api/dmp/enriched-checklists/upload-pdf";
const FEEDBACK_ENDPOINT: &str = "/api/dmp/enriched-checklists/results-feedback";
const PROMPTS_ENDPOINT: &str = "/api/reproai/prompts";

impl DmpClient {
	/// Probes the service's health endpoint.
	pub async fn health(&self) -> Result<HealthStatus> {
		let value = self.get("/health").await?;

		decode(value)
	}

	/// Submits document text for analysis.
	///
	/// When the request carries no notification email, the one configured in
	/// [`Settings`](crate::config::Settings) is stamped in.
	pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisReceipt> {
		let url = self.endpoint_url(ANALYZE_ENDPOINT)?;
		let mut request = request.clone();

		if request.user_email.is_none() {
			request.user_email = self.settings.user_email.clone();
		}

		let value = self
			.request(RequestKind::Analyze, move |client| client.post(url.clone()).json(&request))
			.await?;

		decode(value)
	}

	/// Uploads a PDF for analysis.
	///
	/// Identifiers travel as query parameters and the document as a multipart
	/// `pdf_file` part, rebuilt from the owned bytes on every attempt.
	pub async fn upload_pdf(
		&self,
		document: &PdfDocument,
		checklist_id: &str,
		config_id: &str,
		user_email: Option<&str>,
	) -> Result<AnalysisReceipt> {
		let mut url = self.endpoint_url(UPLOAD_PDF_ENDPOINT)?;

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("checklist_id", checklist_id).append_pair("config_id", config_id);

			if let Some(email) = user_email.or(self.settings.user_email.as_deref()) {
				pairs.append_pair("user_email", email);
			}
		}

		let document = document.clone();
		let value = self
			.request(RequestKind::UploadPdf, move |client| {
				let part =
					Part::bytes(document.bytes.clone()).file_name(document.file_name.clone());
				let form = Form::new().part("pdf_file", part);

				client.post(url.clone()).multipart(form)
			})
			.await?;

		decode(value)
	}

	/// Submits one piece of results feedback.
	pub async fn submit_feedback(
		&self,
		submission: &FeedbackSubmission,
	) -> Result<serde_json::Value> {
		let url = self.endpoint_url(FEEDBACK_ENDPOINT)?;
		let submission = submission.clone();

		self.request(RequestKind::Feedback, move |client| {
			client.post(url.clone()).json(&submission)
		})
		.await
	}

	/// Submits every non-empty entry of a feedback draft, overall rating last.
	///
	/// Stops at the first failure; returns how many submissions went through.
	pub async fn submit_draft(&self, draft: &FeedbackDraft) -> Result<usize> {
		let mut submitted = 0;

		for submission in draft.submissions()? {
			self.submit_feedback(&submission).await?;

			submitted += 1;
		}

		Ok(submitted)
	}

	/// Fetches the service's prompt catalogue.
	pub async fn prompts(&self) -> Result<serde_json::Value> {
		let url = self.endpoint_url(PROMPTS_ENDPOINT)?;

		self.request(RequestKind::Prompts, move |client| client.get(url.clone())).await
	}

	/// Builds the results-page URL for an accepted analysis.
	pub fn results_url(&self, receipt: &AnalysisReceipt) -> Result<Url> {
		let mut url = self.endpoint_url("/results.html")?;

		url.query_pairs_mut().append_pair("token", &receipt.access_token);

		Ok(url)
	}

	/// Builds the export-PDF URL for a checklist.
	pub fn checklist_export_url(&self, checklist_id: &str) -> Result<Url> {
		self.endpoint_url(&format!("/api/dmp/checklists/{checklist_id}/export-pdf"))
	}

	/// Builds the export-PDF URL for an analysis run's results.
	pub fn run_export_url(&self, run_id: &str) -> Result<Url> {
		self.endpoint_url(&format!("/api/dmp/enriched-checklists/run/{run_id}/export-pdf"))
	}

	/// Resolves an endpoint into a URL a browser can open directly.
	///
	/// With auth disabled the URL is returned unchanged; otherwise a valid
	/// access token is appended as a query parameter, refreshing it first when
	/// necessary.
	pub async fn authenticated_url(&self, endpoint: &str) -> Result<Url> {
		let mut url = self.endpoint_url(endpoint)?;

		if matches!(self.settings.auth_mode, AuthMode::Disabled) {
			return Ok(url);
		}

		let token = self.require_cache()?.access_token().await?;

		url.query_pairs_mut().append_pair("access_token", token.expose());

		Ok(url)
	}
}
