//! Pure state machine behind [`ApiClient::execute_with_auth_recovery`].
//!
//! The machine never touches the network. The client feeds it events (a response status, the
//! outcome of a refresh) and performs whatever [`RecoveryAction`] comes back. Every path reaches
//! [`RecoveryState::Done`] after at most two sends, so sustained 401s cannot loop.
//!
//! ```text
//! Initial ─Begin─▶ FirstAttempt ─non-401─▶ Done
//!                       │401
//!                       ▼
//!                  Refreshing ─token─▶ Retry ─any status─▶ Done
//!                       │no token
//!                       ▼
//!                    Logout ─scheduled─▶ Done
//! ```
//!
//! [`ApiClient::execute_with_auth_recovery`]: crate::client::ApiClient::execute_with_auth_recovery

// self
use crate::_prelude::*;

/// Position of a single request inside the recovery flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecoveryState {
	/// Nothing has been sent yet.
	Initial,
	/// The original request is in flight.
	FirstAttempt,
	/// Waiting on the refresh coordinator.
	Refreshing,
	/// The single retry is in flight.
	Retry,
	/// Refresh failed; logout is being scheduled.
	Logout,
	/// Terminal state.
	Done,
}

/// Input fed to [`step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryEvent {
	/// The caller started the flow.
	Begin,
	/// A response arrived for the request currently in flight.
	Responded {
		/// Status of that response.
		status: StatusCode,
	},
	/// The refresh coordinator settled.
	RefreshSettled {
		/// `true` when a new access token was issued.
		issued: bool,
	},
	/// Logout was handed off to run out of band.
	LogoutScheduled,
}

/// Side effect the driver must perform next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
	/// Send the request as given, injecting the stored bearer token when absent.
	SendOriginal,
	/// Ask the refresh coordinator for a new access token.
	Refresh,
	/// Resend once with the refreshed token replacing any `Authorization` header.
	SendRetry,
	/// Schedule logout without waiting for it.
	ScheduleLogout,
	/// Return the most recent response to the caller.
	Return,
}

/// Result of a single [`step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
	/// Side effect to perform.
	pub action: RecoveryAction,
	/// State after the side effect.
	pub next: RecoveryState,
}
impl Transition {
	const fn to(action: RecoveryAction, next: RecoveryState) -> Self {
		Self { action, next }
	}
}

/// Computes the next action and state for `event` observed in `state`.
///
/// Events that do not belong to `state` terminate the flow.
pub fn step(state: RecoveryState, event: RecoveryEvent) -> Transition {
	use RecoveryAction as A;
	use RecoveryEvent as E;
	use RecoveryState as S;

	match (state, event) {
		(S::Initial, E::Begin) => Transition::to(A::SendOriginal, S::FirstAttempt),
		(S::FirstAttempt, E::Responded { status }) if status == StatusCode::UNAUTHORIZED =>
			Transition::to(A::Refresh, S::Refreshing),
		(S::Refreshing, E::RefreshSettled { issued: true }) =>
			Transition::to(A::SendRetry, S::Retry),
		(S::Refreshing, E::RefreshSettled { issued: false }) =>
			Transition::to(A::ScheduleLogout, S::Logout),
		_ => Transition::to(A::Return, S::Done),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn run(first: StatusCode, refreshed: bool, retry: StatusCode) -> (Vec<RecoveryAction>, usize) {
		let mut transition = step(RecoveryState::Initial, RecoveryEvent::Begin);
		let mut actions = vec![transition.action];
		let mut sends = 0;

		while transition.action != RecoveryAction::Return {
			let event = match transition.action {
				RecoveryAction::SendOriginal => {
					sends += 1;

					RecoveryEvent::Responded { status: first }
				},
				RecoveryAction::SendRetry => {
					sends += 1;

					RecoveryEvent::Responded { status: retry }
				},
				RecoveryAction::Refresh => RecoveryEvent::RefreshSettled { issued: refreshed },
				RecoveryAction::ScheduleLogout => RecoveryEvent::LogoutScheduled,
				RecoveryAction::Return => unreachable!(),
			};

			transition = step(transition.next, event);
			actions.push(transition.action);
		}

		assert_eq!(transition.next, RecoveryState::Done);

		(actions, sends)
	}

	#[test]
	fn non_401_returns_after_first_attempt() {
		for status in [StatusCode::OK, StatusCode::FORBIDDEN, StatusCode::INTERNAL_SERVER_ERROR] {
			let (actions, sends) = run(status, true, StatusCode::OK);

			assert_eq!(actions, [RecoveryAction::SendOriginal, RecoveryAction::Return]);
			assert_eq!(sends, 1);
		}
	}

	#[test]
	fn sustained_401_retries_exactly_once() {
		let (actions, sends) = run(StatusCode::UNAUTHORIZED, true, StatusCode::UNAUTHORIZED);

		assert_eq!(
			actions,
			[
				RecoveryAction::SendOriginal,
				RecoveryAction::Refresh,
				RecoveryAction::SendRetry,
				RecoveryAction::Return,
			]
		);
		assert_eq!(sends, 2);
	}

	#[test]
	fn failed_refresh_schedules_logout_without_retry() {
		let (actions, sends) = run(StatusCode::UNAUTHORIZED, false, StatusCode::OK);

		assert_eq!(
			actions,
			[
				RecoveryAction::SendOriginal,
				RecoveryAction::Refresh,
				RecoveryAction::ScheduleLogout,
				RecoveryAction::Return,
			]
		);
		assert_eq!(sends, 1);
	}

	#[test]
	fn out_of_place_events_terminate() {
		let done = Transition::to(RecoveryAction::Return, RecoveryState::Done);

		assert_eq!(step(RecoveryState::Initial, RecoveryEvent::LogoutScheduled), done);
		assert_eq!(step(RecoveryState::Retry, RecoveryEvent::RefreshSettled { issued: true }), done);
		assert_eq!(step(RecoveryState::Done, RecoveryEvent::Begin), done);
	}
}
