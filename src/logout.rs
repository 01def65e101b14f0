//! Logout that always leaves the user signed out, whatever the sign-out provider does.
//!
//! The session is dropped first so that no later request can reuse it. Navigation then
//! escalates: the preferred redirect, then the root redirect, then a hard navigation that
//! cannot fail. Nothing here returns an error.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	locale::{LocaleSet, ROOT_PATH},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, log_debug, log_warn},
	store::SessionStore,
};

/// Boxed future returned by [`Navigator::sign_out`].
pub type NavigationFuture<'a> =
	Pin<Box<dyn Future<Output = Result<(), NavigationError>> + 'a + Send>>;

/// Failure reported by a [`Navigator`] sign-out attempt.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Sign-out navigation failed: {message}.")]
pub struct NavigationError {
	/// Human-readable reason.
	pub message: String,
}
impl NavigationError {
	/// Creates an error carrying `message`.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Hooks into the host application's routing and sign-out provider.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Path the user is currently on, used to preserve the locale across sign-out.
	fn current_path(&self) -> String;

	/// Ends the provider session and redirects to `callback_url`.
	fn sign_out<'a>(&'a self, callback_url: &'a str) -> NavigationFuture<'a>;

	/// Full-page navigation used as the last resort; must not fail.
	fn hard_navigate(&self, url: &str);
}

/// Clears the session and drives the sign-out fallback chain.
pub struct LogoutCoordinator {
	store: Arc<dyn SessionStore>,
	navigator: Arc<dyn Navigator>,
	locales: LocaleSet,
	in_progress: AtomicBool,
}
impl LogoutCoordinator {
	/// Creates a coordinator over `store` and `navigator`.
	pub fn new(
		store: Arc<dyn SessionStore>,
		navigator: Arc<dyn Navigator>,
		locales: LocaleSet,
	) -> Self {
		Self { store, navigator, locales, in_progress: AtomicBool::new(false) }
	}

	/// Redirect used when the caller supplies none: `/<locale>` or `/`.
	pub fn default_callback(&self) -> String {
		self.locales.callback_for(&self.navigator.current_path())
	}

	/// Returns `true` while a logout is navigating.
	pub fn is_in_progress(&self) -> bool {
		self.in_progress.load(Ordering::Acquire)
	}

	/// Clears the session and signs the user out.
	///
	/// A call that arrives while another logout is navigating only clears the store.
	pub async fn logout(&self, callback_url: Option<&str>) {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		span.instrument(async {
			let target = match callback_url.filter(|url| !url.trim().is_empty()) {
				Some(url) => url.to_owned(),
				None => self.default_callback(),
			};

			if let Err(e) = self.store.clear().await {
				log_warn!("Failed to clear the session during logout: {e}");
			}

			if self.in_progress.swap(true, Ordering::AcqRel) {
				log_debug!("Logout already in progress; skipping navigation.");

				return;
			}

			let _reset = InProgressReset(&self.in_progress);

			if self.navigate(&target).await {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			} else {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			}
		})
		.await
	}

	// Returns `false` when only the hard navigation fallback was reached.
	async fn navigate(&self, target: &str) -> bool {
		match self.navigator.sign_out(target).await {
			Ok(()) => return true,
			Err(e) => log_warn!("Sign-out to {target} failed: {e}"),
		}

		match self.navigator.sign_out(ROOT_PATH).await {
			Ok(()) => return true,
			Err(e) => log_warn!("Sign-out to {ROOT_PATH} failed: {e}"),
		}

		self.navigator.hard_navigate(ROOT_PATH);

		false
	}
}
impl Debug for LogoutCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LogoutCoordinator")
			.field("locales", &self.locales)
			.field("in_progress", &self.is_in_progress())
			.finish_non_exhaustive()
	}
}

struct InProgressReset<'a>(&'a AtomicBool);
impl Drop for InProgressReset<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}
