#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
// self
use tourney_auth::{
	client::{ApiClient, ReqwestApiClient, RequestOptions},
	config::ClientConfig,
	error::Error,
	logout::{NavigationFuture, Navigator},
	store::MemoryStore,
};

struct Idle;
impl Navigator for Idle {
	fn current_path(&self) -> String {
		"/".into()
	}

	fn sign_out<'a>(&'a self, _: &'a str) -> NavigationFuture<'a> {
		Box::pin(async { Ok(()) })
	}

	fn hard_navigate(&self, _: &str) {}
}

#[derive(Debug, Deserialize)]
struct Company {
	id: u64,
	name: String,
}

fn client(server: &MockServer, store: &MemoryStore) -> ReqwestApiClient {
	let config = ClientConfig::builder()
		.base_url(server.base_url())
		.build()
		.expect("Mock server URL should validate.");

	ApiClient::new(config, Arc::new(store.clone()), Arc::new(Idle)).expect("Client should build.")
}

#[tokio::test]
async fn login_then_profile_uses_issued_token() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/login")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-1\",\"refresh_token\":\"refresh-1\",\"token_type\":\"bearer\"}");
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/companies/me").header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":12,\"name\":\"Club Norte\",\"plan\":\"pro\"}");
		})
		.await;
	let store = MemoryStore::default();
	let client = client(&server, &store);
	let session = client.login("owner@club.test", "hunter2").await.expect("Login should succeed.");

	assert_eq!(session.access_token.expose(), "access-1");
	assert!(session.can_refresh());

	let company: Company = client.profile().await.expect("Profile should load.");

	assert_eq!(company.id, 12);
	assert_eq!(company.name, "Club Norte");

	login.assert_async().await;
	profile.assert_async().await;
}

#[tokio::test]
async fn login_and_profile_errors_carry_backend_messages() {
	let server = MockServer::start_async().await;
	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"message\":\"Email not verified\"}");
		})
		.await;
	let _profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/companies/me");
			then.status(500).body("Internal Server Error");
		})
		.await;
	let store = MemoryStore::default();
	let client = client(&server, &store);
	let err = client.login("owner@club.test", "hunter2").await.expect_err("400 should fail.");

	assert!(matches!(
		&err,
		Error::Api { status: 400, message } if message == "Email not verified"
	));
	assert!(store.snapshot().is_none());

	let err = client.profile::<Company>().await.expect_err("500 should fail.");

	assert!(matches!(
		&err,
		Error::Api { status: 500, message } if message == "Failed to load profile."
	));
}

#[tokio::test]
async fn call_json_posts_json_with_default_error_message() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/tournaments").header("content-type", "application/json");
			then.status(422).body("{\"detail\":[{\"msg\":\"name is required\"}]}");
		})
		.await;
	let store = MemoryStore::default();
	let client = client(&server, &store);
	let err = client
		.call_json::<Company>(
			"/tournaments",
			RequestOptions::post()
				.json(&serde_json::json!({ "name": "" }))
				.expect("JSON body should serialize."),
		)
		.await
		.expect_err("422 should fail.");

	mock.assert_async().await;

	assert_eq!(err.status(), Some(422));
	assert!(err.to_string().contains("name is required"));
}
