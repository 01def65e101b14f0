//! Authenticated API client: bearer injection, one-shot 401 recovery, and account helpers.
//!
//! [`ApiClient`] owns the transport, the session store, and the two coordinators that share it.
//! [`ApiClient::execute`] is the plain authenticated send; [`ApiClient::execute_with_auth_recovery`]
//! layers the [`recovery`](crate::recovery) state machine on top so an expired access token is
//! refreshed once and the request retried once. The typed helpers in this module turn non-2xx
//! statuses into [`Error::Api`].

mod account;
mod request;

pub use account::*;
pub use request::RequestOptions;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	config::ClientConfig,
	error::ConfigError,
	http::{ApiHttpClient, ApiResponse},
	logout::{LogoutCoordinator, Navigator},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, log_debug},
	recovery::{self, RecoveryAction, RecoveryEvent, RecoveryState, Transition},
	refresh::RefreshCoordinator,
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use request::AuthHeader;

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Authenticated client for the tournament backend.
///
/// Cloning is cheap and clones share the session store, the refresh slot, and the logout guard.
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Transport every request goes through.
	pub http_client: Arc<C>,
	/// Holder of the current session.
	pub store: Arc<dyn SessionStore>,
	/// Validated configuration.
	pub config: ClientConfig,
	refresh: Arc<RefreshCoordinator<C>>,
	logout: Arc<LogoutCoordinator>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let http_client = http_client.into();
		let refresh_endpoint = config.resolve(&config.endpoints.refresh)?;
		let refresh = RefreshCoordinator::new(http_client.clone(), store.clone(), refresh_endpoint)
			.with_timeout(config.refresh_timeout);
		let logout = LogoutCoordinator::new(store.clone(), navigator, config.locales.clone());

		Ok(Self {
			http_client,
			store,
			config,
			refresh: Arc::new(refresh),
			logout: Arc::new(logout),
		})
	}

	/// Single-flight refresh coordinator shared by every clone of this client.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator<C> {
		&self.refresh
	}

	/// Logout coordinator shared by every clone of this client.
	pub fn logout_coordinator(&self) -> &LogoutCoordinator {
		&self.logout
	}

	/// Returns the stored session, if any.
	pub async fn session(&self) -> Result<Option<Session>> {
		Ok(self.store.get().await?)
	}

	/// Clears the session and signs the user out; see [`LogoutCoordinator::logout`].
	pub async fn logout(&self, callback_url: Option<&str>) {
		self.logout.logout(callback_url).await
	}

	/// Sends an authenticated request once.
	///
	/// The stored access token is attached as `Authorization: Bearer <token>` unless the caller
	/// already set `Authorization`. HTTP error statuses come back as responses; only transport,
	/// configuration, and store failures are errors.
	pub async fn execute(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
		let url = self.config.resolve(endpoint)?;
		let token = self.current_token().await?;
		let request = options.to_request(&url, token.as_ref(), AuthHeader::IfAbsent)?;

		Ok(self.http_client.send(request).await?)
	}

	/// Sends an authenticated request, recovering from a single 401.
	///
	/// On 401 the refresh coordinator is asked for a new token. When one is issued the request
	/// is resent once with that token replacing any `Authorization` header, and the retry's
	/// response is returned whatever its status. When none is issued a logout is started without
	/// being awaited and the original 401 is returned.
	pub async fn execute_with_auth_recovery(
		&self,
		endpoint: &str,
		options: RequestOptions,
	) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "execute_with_auth_recovery");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.recover(endpoint, &options)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn recover(&self, endpoint: &str, options: &RequestOptions) -> Result<ApiResponse> {
		let url = self.config.resolve(endpoint)?;
		let mut state = RecoveryState::Initial;
		let mut event = RecoveryEvent::Begin;
		let mut response = None;
		let mut refreshed = None;

		loop {
			let Transition { action, next } = recovery::step(state, event);

			state = next;
			event = match action {
				RecoveryAction::SendOriginal => {
					let token = self.current_token().await?;
					let request = options.to_request(&url, token.as_ref(), AuthHeader::IfAbsent)?;
					let sent = self.http_client.send(request).await?;
					let status = sent.status();

					response = Some(sent);

					RecoveryEvent::Responded { status }
				},
				RecoveryAction::Refresh => {
					refreshed = self.refresh.refresh().await;

					RecoveryEvent::RefreshSettled { issued: refreshed.is_some() }
				},
				RecoveryAction::SendRetry => {
					let request = options.to_request(&url, refreshed.as_ref(), AuthHeader::Replace)?;
					let sent = self.http_client.send(request).await?;
					let status = sent.status();

					response = Some(sent);

					RecoveryEvent::Responded { status }
				},
				RecoveryAction::ScheduleLogout => {
					self.schedule_logout().await;

					RecoveryEvent::LogoutScheduled
				},
				RecoveryAction::Return =>
					return response.ok_or_else(|| ConfigError::RecoveryWithoutResponse.into()),
			};
		}
	}

	// Spawns logout onto the current tokio runtime; without one, logout runs inline.
	async fn schedule_logout(&self) {
		let logout = self.logout.clone();

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move { logout.logout(None).await });
			},
			Err(_) => {
				log_debug!("No tokio runtime is available; running logout inline.");

				logout.logout(None).await;
			},
		}
	}

	async fn current_token(&self) -> Result<Option<TokenSecret>> {
		let Some(session) = self.store.get().await? else {
			return Ok(None);
		};

		if self.config.preemptive_refresh && session.is_expired() && session.can_refresh() {
			log_debug!("Stored session expired; refreshing before sending.");

			if let Some(token) = self.refresh.refresh().await {
				return Ok(Some(token));
			}
		}

		Ok(Some(session.access_token))
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		Self::with_http_client(config, store, navigator, ReqwestHttpClient::default())
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh: self.refresh.clone(),
			logout: self.logout.clone(),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh", &self.refresh)
			.field("logout", &self.logout)
			.finish_non_exhaustive()
	}
}
