//! Session cookies persisted between runs

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, CookieSameSite, TimeSinceEpoch};
use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize};

/// Name of the cookie that is only present for a logged-in session
pub const SESSION_COOKIE: &str = "jwt_token";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StoredCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	#[serde(default = "default_path")]
	pub path: String,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub http_only: bool,
	/// Expiry in seconds since the epoch, `None` for session cookies
	#[serde(default)]
	pub expires: Option<f64>,
	#[serde(default)]
	pub same_site: Option<CookieSameSite>,
}

fn default_path() -> String {
	"/".to_string()
}

impl From<&Cookie> for StoredCookie {
	fn from(cookie: &Cookie) -> Self {
		Self {
			name: cookie.name.clone(),
			value: cookie.value.clone(),
			domain: cookie.domain.clone(),
			path: cookie.path.clone(),
			secure: cookie.secure,
			http_only: cookie.http_only,
			// the browser reports session cookies with a non-positive expiry
			expires: (cookie.expires > 0.0).then_some(cookie.expires),
			same_site: cookie.same_site.clone(),
		}
	}
}

impl StoredCookie {
	pub fn to_param(&self) -> Result<CookieParam> {
		let mut builder = CookieParam::builder()
			.name(self.name.clone())
			.value(self.value.clone())
			.domain(self.domain.clone())
			.path(self.path.clone())
			.secure(self.secure)
			.http_only(self.http_only);
		if let Some(expires) = self.expires {
			builder = builder.expires(TimeSinceEpoch::new(expires));
		}
		if let Some(same_site) = &self.same_site {
			builder = builder.same_site(same_site.clone());
		}
		builder.build().map_err(|e| eyre!("Failed to build cookie {}: {}", self.name, e))
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CookieJar {
	/// RFC 3339 time of the last save
	#[serde(default)]
	pub saved_at: Option<String>,
	#[serde(default)]
	pub cookies: Vec<StoredCookie>,
}

impl CookieJar {
	pub fn from_browser(cookies: &[Cookie]) -> Self {
		Self {
			saved_at: Some(chrono::Utc::now().to_rfc3339()),
			cookies: cookies.iter().map(StoredCookie::from).collect(),
		}
	}

	/// Load the jar; a missing file is an empty jar
	pub fn load(path: &Path) -> Result<Self> {
		if !path.exists() {
			return Ok(Self::default());
		}
		let content = std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read cookie jar {}: {}", path.display(), e))?;
		serde_json::from_str(&content).map_err(|e| eyre!("Failed to parse cookie jar {}: {}", path.display(), e))
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent).map_err(|e| eyre!("Failed to create cookie dir {}: {}", parent.display(), e))?;
		}
		let content = serde_json::to_string_pretty(self)?;
		std::fs::write(path, content).map_err(|e| eyre!("Failed to write cookie jar {}: {}", path.display(), e))
	}

	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty()
	}

	pub fn has_session(&self) -> bool {
		self.cookies.iter().any(|c| c.name == SESSION_COOKIE)
	}

	pub fn to_params(&self) -> Result<Vec<CookieParam>> {
		self.cookies.iter().map(StoredCookie::to_param).collect()
	}
}
