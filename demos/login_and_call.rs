//! Demonstrates logging in, calling an authenticated endpoint, and recovering from an expired
//! access token with the default reqwest transport and in-memory session store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use tourney_auth::{
	client::{ApiClient, RequestOptions},
	config::ClientConfig,
	logout::{NavigationFuture, Navigator},
	store::MemoryStore,
};

struct ConsoleNavigator;
impl Navigator for ConsoleNavigator {
	fn current_path(&self) -> String {
		"/en/dashboard".into()
	}

	fn sign_out<'a>(&'a self, callback_url: &'a str) -> NavigationFuture<'a> {
		Box::pin(async move {
			println!("Signed out; redirecting to {callback_url}.");

			Ok(())
		})
	}

	fn hard_navigate(&self, url: &str) {
		println!("Hard navigation to {url}.");
	}
}

#[derive(Debug, Deserialize)]
struct Company {
	name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/login");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"token_type\":\"bearer\"}",
			);
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/companies/me").header("authorization", "Bearer demo-access");
			then.status(401).body("{\"detail\":\"Token expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access-2\",\"token_type\":\"bearer\"}");
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/companies/me").header("authorization", "Bearer demo-access-2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"name\":\"Club Demo\"}");
		})
		.await;
	let config = ClientConfig::builder().base_url(server.base_url()).build()?;
	let client = ApiClient::new(config, Arc::new(MemoryStore::default()), Arc::new(ConsoleNavigator))?;

	client.login("owner@club.test", "demo-password").await?;

	let company: Company = client.profile().await?;

	println!("Signed in as {}.", company.name);

	let response = client.execute("/companies/me", RequestOptions::get()).await?;

	println!("Plain execute after rotation returned {}.", response.status());

	client.logout(None).await;

	login.assert_async().await;
	stale.assert_async().await;
	refresh.assert_async().await;
	fresh.assert_calls_async(2).await;

	Ok(())
}
