// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use dmp_client::{
	api::{AccuracyRating, AnalyzeRequest, PdfDocument},
	auth::TokenCache,
	client::DmpClient,
	config::{AuthMode, Settings},
	feedback::{FeedbackDraft, FeedbackTarget},
	http::ReqwestHttpClient,
	retry::RetryPolicy,
};

const RECEIPT_BODY: &str = "{\"run_id\":\"run-7\",\"access_token\":\"results-token\"}";

fn build_client(server: &MockServer) -> DmpClient {
	let settings = Settings::builder()
		.base_url(server.url(""))
		.user_email("analyst@example.com")
		.build()
		.expect("Settings fixture should build successfully.");

	DmpClient::with_http_client(Arc::new(settings), ReqwestHttpClient::default())
}

fn build_authed_client(server: &MockServer, mode: AuthMode) -> DmpClient {
	let settings = Settings::builder()
		.base_url(server.url(""))
		.auth_proxy_url(server.url(""))
		.auth_mode(mode)
		.build()
		.expect("Settings fixture should build successfully.");
	let settings = Arc::new(settings);
	let cache = TokenCache::new(settings.clone(), ReqwestHttpClient::default()).with_policy(
		RetryPolicy::token()
			.with_attempt_timeout(Duration::from_millis(250))
			.with_backoff_base(Duration::from_millis(1)),
	);

	DmpClient::with_http_client(settings, ReqwestHttpClient::default())
		.with_token_cache(Arc::new(cache))
}

async fn mock_token_endpoint<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let body = format!("{{\"access_token\":\"{token}\",\"expires_in\":3600}}");

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/api/token");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test]
async fn analyze_stamps_the_configured_email() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/dmp/enriched-checklists/analyze").json_body(json!({
				"checklist_id": "c-1",
				"text": "Data will be archived.",
				"config_id": "cfg-1",
				"user_email": "analyst@example.com",
			}));
			then.status(200).header("content-type", "application/json").body(RECEIPT_BODY);
		})
		.await;
	let client = build_client(&server);
	let receipt = client
		.analyze(&AnalyzeRequest::new("c-1", "Data will be archived.", "cfg-1"))
		.await
		.expect("Analyze submission should succeed.");

	mock.assert_async().await;

	assert_eq!(receipt.run_id, "run-7");
	assert_eq!(receipt.access_token, "results-token");
}

#[tokio::test]
async fn analyze_keeps_an_explicit_email() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/dmp/enriched-checklists/analyze").json_body(json!({
				"checklist_id": "c-1",
				"text": "text",
				"config_id": "cfg-1",
				"user_email": "override@example.com",
			}));
			then.status(200).header("content-type", "application/json").body(RECEIPT_BODY);
		})
		.await;
	let client = build_client(&server);
	let request =
		AnalyzeRequest::new("c-1", "text", "cfg-1").with_user_email("override@example.com");

	client.analyze(&request).await.expect("Analyze submission should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn upload_pdf_sends_identifiers_as_query_parameters() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/dmp/enriched-checklists/upload-pdf")
				.query_param("checklist_id", "c-9")
				.query_param("config_id", "cfg-9")
				.query_param("user_email", "analyst@example.com")
				.header_includes("content-type", "multipart/form-data");
			then.status(200).header("content-type", "application/json").body(RECEIPT_BODY);
		})
		.await;
	let client = build_client(&server);
	let document = PdfDocument::new("plan.pdf", b"%PDF-1.7 minimal".to_vec());
	let receipt = client
		.upload_pdf(&document, "c-9", "cfg-9", None)
		.await
		.expect("PDF upload should succeed.");

	mock.assert_async().await;

	assert_eq!(receipt.run_id, "run-7");
}

#[tokio::test]
async fn feedback_draft_submits_entries_then_overall() {
	let server = MockServer::start_async().await;
	let entry_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/dmp/enriched-checklists/results-feedback").json_body(
				json!({
					"run_id": "run-7",
					"feedback_type": "item",
					"id": "item-3",
					"feedback": { "accuracy": "yes", "comment": "Matches the plan." },
				}),
			);
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let overall_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/dmp/enriched-checklists/results-feedback").json_body(
				json!({
					"run_id": "run-7",
					"feedback_type": "overall",
					"feedback": { "rating": 4, "comment": "" },
				}),
			);
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let client = build_client(&server);
	let mut draft = FeedbackDraft::new("run-7");

	draft.set_accuracy(FeedbackTarget::item("item-3"), AccuracyRating::Yes);
	draft.set_comment(FeedbackTarget::item("item-3"), "Matches the plan.");
	draft.set_overall_rating(4);

	let submitted = client.submit_draft(&draft).await.expect("Draft submission should succeed.");

	entry_mock.assert_async().await;
	overall_mock.assert_async().await;

	assert_eq!(submitted, 2);
}

#[tokio::test]
async fn prompts_round_trip_untouched() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/reproai/prompts");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"prompts\":[{\"name\":\"coverage\"}]}");
		})
		.await;
	let client = build_client(&server);
	let prompts = client.prompts().await.expect("Prompt fetch should succeed.");

	mock.assert_async().await;

	assert_eq!(prompts, json!({ "prompts": [{ "name": "coverage" }] }));
}

#[tokio::test]
async fn bearer_mode_attaches_an_authorization_header() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server, "token-bearer").await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/health").header("authorization", "Bearer token-bearer");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"ok\"}");
		})
		.await;
	let client = build_authed_client(&server, AuthMode::BearerHeader);
	let health = client.health().await.expect("Authed health probe should succeed.");

	token_mock.assert_async().await;
	api_mock.assert_async().await;

	assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn query_mode_appends_the_token_parameter() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server, "token-query").await;
	let api_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/health").query_param("access_token", "token-query");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"status\":\"ok\"}");
		})
		.await;
	let client = build_authed_client(&server, AuthMode::QueryParameter);

	client.health().await.expect("Authed health probe should succeed.");

	token_mock.assert_async().await;
	api_mock.assert_async().await;
}

#[tokio::test]
async fn authenticated_url_embeds_a_fresh_token() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server, "token-url").await;
	let client = build_authed_client(&server, AuthMode::QueryParameter);
	let url = client
		.authenticated_url("/api/dmp/checklists/c-1/export-pdf")
		.await
		.expect("Authenticated URL should resolve.");

	token_mock.assert_async().await;

	assert!(url.as_str().ends_with("/api/dmp/checklists/c-1/export-pdf?access_token=token-url"));
}
