use std::path::PathBuf;

use v_utils::macros::{MyConfigPrimitives, Settings};

const DEFAULT_BASE_URL: &str = "https://www.duolingo.com";

#[derive(Clone, Debug, Default, MyConfigPrimitives, Settings)]
pub struct AppConfig {
	/// Run without a browser window. Logging in still requires a stored session cookie.
	#[serde(default)]
	pub headless: bool,
	/// Site root (default: https://www.duolingo.com)
	#[serde(default)]
	pub base_url: Option<String>,
	/// Path of the SQLite answers database (default: `answers.db` in the state dir)
	#[serde(default)]
	pub answers_db: Option<String>,
	/// Path of the persisted cookie jar (default: `cookies.json` in the state dir)
	#[serde(default)]
	pub cookies_file: Option<String>,
	/// Delay between polls of the page while waiting for the human (default: 100)
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Pause after each word-bank click while replaying a translation (default: 200)
	#[serde(default = "default_fragment_click_delay_ms")]
	pub fragment_click_delay_ms: u64,
	/// Pause after a recorded answer, so the status can be read (default: 1000)
	#[serde(default = "default_feedback_pause_ms")]
	pub feedback_pause_ms: u64,
	/// Pause after pressing next, before scraping the following challenge (default: 2000)
	#[serde(default = "default_next_pause_ms")]
	pub next_pause_ms: u64,
	/// Practice start attempts before falling back to a plain lesson (default: 3)
	#[serde(default = "default_max_practice_attempts")]
	pub max_practice_attempts: u32,
	/// Wait before re-checking whether a practice is already running (default: 3000)
	#[serde(default = "default_practice_recheck_ms")]
	pub practice_recheck_ms: u64,
	/// Wait after a practice start attempt before checking it took (default: 6000)
	#[serde(default = "default_practice_confirm_ms")]
	pub practice_confirm_ms: u64,
	/// Upper bound on waiting for a navigation to settle (default: 30)
	#[serde(default = "default_navigation_timeout_secs")]
	pub navigation_timeout_secs: u64,
	/// How long to wait for the consent dialog to show up (default: 10)
	#[serde(default = "default_consent_timeout_secs")]
	pub consent_timeout_secs: u64,
	/// Command to run whenever human intervention is needed (receives message as argument)
	#[serde(default)]
	pub stop_hook: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
	100
}

fn default_fragment_click_delay_ms() -> u64 {
	200
}

fn default_feedback_pause_ms() -> u64 {
	1000
}

fn default_next_pause_ms() -> u64 {
	2000
}

fn default_max_practice_attempts() -> u32 {
	3
}

fn default_practice_recheck_ms() -> u64 {
	3000
}

fn default_practice_confirm_ms() -> u64 {
	6000
}

fn default_navigation_timeout_secs() -> u64 {
	30
}

fn default_consent_timeout_secs() -> u64 {
	10
}

impl AppConfig {
	pub fn base_url(&self) -> &str {
		self.base_url.as_deref().filter(|u| !u.trim().is_empty()).unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
	}

	pub fn answers_db_path(&self) -> PathBuf {
		match &self.answers_db {
			Some(path) => PathBuf::from(path),
			None => state_dir().join("answers.db"),
		}
	}

	pub fn cookies_path(&self) -> PathBuf {
		match &self.cookies_file {
			Some(path) => PathBuf::from(path),
			None => state_dir().join("cookies.json"),
		}
	}

	pub fn learn_url(&self) -> String {
		format!("{}/learn", self.base_url())
	}

	/// First lesson of the first unit, used when practice can't be started
	pub fn fallback_lesson_url(&self) -> String {
		format!("{}/lesson/unit/1/level/1", self.base_url())
	}
}

#[cfg(feature = "xdg")]
fn state_dir() -> PathBuf {
	v_utils::xdg_state_dir!("")
}

#[cfg(not(feature = "xdg"))]
fn state_dir() -> PathBuf {
	PathBuf::from(".")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_paths_win_over_state_dir() {
		let config = AppConfig {
			answers_db: Some("/tmp/a.db".to_string()),
			cookies_file: Some("/tmp/c.json".to_string()),
			..Default::default()
		};
		assert_eq!(config.answers_db_path(), PathBuf::from("/tmp/a.db"));
		assert_eq!(config.cookies_path(), PathBuf::from("/tmp/c.json"));
	}

	#[test]
	fn base_url_defaults_to_duolingo() {
		let config = AppConfig::default();
		assert_eq!(config.base_url(), "https://www.duolingo.com");
		assert_eq!(config.learn_url(), "https://www.duolingo.com/learn");

		let blank = AppConfig {
			base_url: Some("  ".to_string()),
			..Default::default()
		};
		assert_eq!(blank.base_url(), "https://www.duolingo.com");
	}

	#[test]
	fn site_urls_ignore_trailing_slash() {
		let config = AppConfig {
			base_url: Some("https://preview.duolingo.test/".to_string()),
			..Default::default()
		};
		assert_eq!(config.learn_url(), "https://preview.duolingo.test/learn");
		assert_eq!(config.fallback_lesson_url(), "https://preview.duolingo.test/lesson/unit/1/level/1");
	}
}
