//! Locale segment detection used to keep users in their language across sign-out redirects.

// self
use crate::_prelude::*;

/// Root path used whenever no locale segment is recognized.
pub const ROOT_PATH: &str = "/";

/// Ordered set of locale codes the front end routes under (`/<locale>/...`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSet(Vec<String>);
impl LocaleSet {
	/// Builds a set from the provided locale codes, dropping blanks and duplicates.
	pub fn new<I, S>(locales: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut codes = Vec::new();

		for locale in locales {
			let code = locale.as_ref().trim().trim_matches('/');

			if !code.is_empty() && !codes.iter().any(|known: &String| known == code) {
				codes.push(code.to_owned());
			}
		}

		Self(codes)
	}

	/// Returns `true` when no locale is configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over the configured locale codes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Returns the locale named by the first path segment of `path`, if it is supported.
	///
	/// Query strings and fragments are ignored, so `/es?tab=courts` and `/es#top` both resolve
	/// to `es`.
	pub fn detect<'a>(&self, path: &'a str) -> Option<&'a str> {
		let path = path.split(['?', '#']).next().unwrap_or_default();
		let segment = path.trim_start_matches('/').split('/').next()?;

		self.0.iter().any(|code| code == segment).then_some(segment)
	}

	/// Derives the post-logout redirect for `current_path`: `/<locale>` when a supported locale
	/// leads the path, otherwise [`ROOT_PATH`].
	pub fn callback_for(&self, current_path: &str) -> String {
		match self.detect(current_path) {
			Some(locale) => format!("/{locale}"),
			None => ROOT_PATH.to_owned(),
		}
	}
}
impl Default for LocaleSet {
	fn default() -> Self {
		Self::new(["en", "es"])
	}
}
