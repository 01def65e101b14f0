//! Client configuration: API host, endpoint paths, refresh bounds, and routing locales.
//!
//! The base URL comes from the `API_BASE_URL` environment variable and falls back to a local
//! development address when unset. Everything else has defaults matching the tournament backend
//! and can be overridden through [`ClientConfigBuilder`].

// self
use crate::{_prelude::*, error::ConfigError, locale::LocaleSet};

/// Environment variable selecting the API host.
pub const BASE_URL_ENV: &str = "API_BASE_URL";
/// Base URL used when [`BASE_URL_ENV`] is unset or blank.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Errors raised while building or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL failed to parse.
	#[error("Base URL `{url}` is invalid: {reason}.")]
	InvalidBaseUrl {
		/// Supplied URL.
		url: String,
		/// Parser diagnostic.
		reason: String,
	},
	/// Base URL must be HTTP(S) and usable as a prefix.
	#[error("Base URL `{url}` must be an http or https URL.")]
	UnsupportedScheme {
		/// Supplied URL.
		url: String,
	},
	/// Endpoint paths must be non-empty and relative.
	#[error("The {endpoint} endpoint path `{path}` must be a non-empty relative path.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// Refresh timeout must be positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
}

/// Paths of the backend endpoints the client calls directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
	/// Form-encoded credential exchange.
	pub login: String,
	/// Refresh-token exchange.
	pub refresh: String,
	/// Authenticated profile lookup.
	pub profile: String,
}
impl Default for EndpointPaths {
	fn default() -> Self {
		Self { login: "/login".into(), refresh: "/refresh".into(), profile: "/companies/me".into() }
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API host all relative endpoints are resolved against.
	pub base_url: Url,
	/// Endpoint paths used by account and refresh helpers.
	pub endpoints: EndpointPaths,
	/// Upper bound on a single refresh exchange; expiry settles the refresh as failed.
	pub refresh_timeout: Duration,
	/// Refresh expired sessions before sending instead of waiting for a 401.
	pub preemptive_refresh: bool,
	/// Locales recognized when deriving sign-out redirects.
	pub locales: LocaleSet,
}
impl ClientConfig {
	const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a builder seeded with defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Builds a configuration from the process environment.
	pub fn from_env() -> Result<Self, ClientConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut builder = Self::builder();

		if let Some(url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
			builder = builder.base_url(url.trim());
		}

		builder.build()
	}

	/// Resolves `endpoint` against the base URL.
	///
	/// Absolute URLs are used unchanged. Relative endpoints are appended to the base URL's
	/// path, so a base of `https://api.example.com/v1` and `/courts?page=2` yield
	/// `https://api.example.com/v1/courts?page=2`.
	pub fn resolve(&self, endpoint: &str) -> Result<Url, ConfigError> {
		if let Ok(absolute) = Url::parse(endpoint) {
			return Ok(absolute);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = format!("{base}/{}", endpoint.trim_start_matches('/'));

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source })
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if !self.refresh_timeout.is_positive() {
			return Err(ClientConfigError::NonPositiveRefreshTimeout);
		}

		validate_path("login", &self.endpoints.login)?;
		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("profile", &self.endpoints.profile)?;

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	base_url: Option<String>,
	endpoints: Option<EndpointPaths>,
	refresh_timeout: Option<Duration>,
	preemptive_refresh: Option<bool>,
	locales: Option<LocaleSet>,
}
impl ClientConfigBuilder {
	/// Sets the API host.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());

		self
	}

	/// Overrides the endpoint paths.
	pub fn endpoints(mut self, endpoints: EndpointPaths) -> Self {
		self.endpoints = Some(endpoints);

		self
	}

	/// Overrides the refresh timeout (defaults to 10 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Enables or disables preemptive refresh of expired sessions (enabled by default).
	pub fn preemptive_refresh(mut self, enabled: bool) -> Self {
		self.preemptive_refresh = Some(enabled);

		self
	}

	/// Overrides the routing locales (defaults to `en` and `es`).
	pub fn locales(mut self, locales: LocaleSet) -> Self {
		self.locales = Some(locales);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let raw = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
		let base_url = Url::parse(&raw)
			.map_err(|e| ClientConfigError::InvalidBaseUrl { url: raw.clone(), reason: e.to_string() })?;
		let config = ClientConfig {
			base_url,
			endpoints: self.endpoints.unwrap_or_default(),
			refresh_timeout: self.refresh_timeout.unwrap_or(ClientConfig::DEFAULT_REFRESH_TIMEOUT),
			preemptive_refresh: self.preemptive_refresh.unwrap_or(true),
			locales: self.locales.unwrap_or_default(),
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ClientConfigError> {
	if path.trim().is_empty() || Url::parse(path).is_ok() {
		Err(ClientConfigError::InvalidEndpointPath { endpoint, path: path.to_owned() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn env_lookup_falls_back_to_local_default() {
		let config = ClientConfig::from_lookup(|_| None).expect("Defaults should validate.");

		assert_eq!(config.base_url.as_str(), "http://localhost:8000/");

		let config = ClientConfig::from_lookup(|_| Some("   ".into()))
			.expect("Blank values should fall back to defaults.");

		assert_eq!(config.base_url.as_str(), "http://localhost:8000/");

		let config = ClientConfig::from_lookup(|key| {
			(key == BASE_URL_ENV).then(|| "https://api.tourney.example".to_owned())
		})
		.expect("Explicit base URL should validate.");

		assert_eq!(config.base_url.as_str(), "https://api.tourney.example/");
	}

	#[test]
	fn resolve_appends_to_base_path() {
		let config = ClientConfig::builder()
			.base_url("https://api.tourney.example/v1/")
			.build()
			.expect("Config should validate.");

		assert_eq!(
			config.resolve("/courts?page=2").expect("Relative endpoint should resolve.").as_str(),
			"https://api.tourney.example/v1/courts?page=2",
		);
		assert_eq!(
			config.resolve("players").expect("Bare endpoint should resolve.").as_str(),
			"https://api.tourney.example/v1/players",
		);
		assert_eq!(
			config
				.resolve("https://other.example/hook")
				.expect("Absolute endpoint should pass through.")
				.as_str(),
			"https://other.example/hook",
		);
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		assert!(matches!(
			ClientConfig::builder().base_url("not a url").build(),
			Err(ClientConfigError::InvalidBaseUrl { .. })
		));
		assert!(matches!(
			ClientConfig::builder().base_url("ftp://files.example").build(),
			Err(ClientConfigError::UnsupportedScheme { .. })
		));
		assert_eq!(
			ClientConfig::builder().refresh_timeout(Duration::ZERO).build(),
			Err(ClientConfigError::NonPositiveRefreshTimeout)
		);
		assert!(matches!(
			ClientConfig::builder()
				.endpoints(EndpointPaths { login: " ".into(), ..EndpointPaths::default() })
				.build(),
			Err(ClientConfigError::InvalidEndpointPath { endpoint: "login", .. })
		));
	}
}
