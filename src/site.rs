use color_eyre::Result;
use v_utils::{elog, log};

use crate::{
	browser::{BrowserSession, SiteSession},
	config::AppConfig,
	cookies::CookieJar,
	runner::run_stop_hook,
	status::{Mood, StatusDisplay},
};

/// Open the site and restore the previous session if one was saved
pub async fn open<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, config: &AppConfig) -> Result<()> {
	status.set_status("Opening Duolingo");
	session.goto(config.base_url(), config.navigation_timeout_secs).await?;

	let jar = match CookieJar::load(&config.cookies_path()) {
		Ok(jar) => jar,
		Err(e) => {
			elog!("Ignoring cookie jar: {e}");
			CookieJar::default()
		}
	};
	if !jar.is_empty() {
		status.set_status(&format!("Loading {} cookie(s)...", jar.cookies.len()));
		session.restore_cookies(&jar).await?;
		status.set_status("Refreshing...");
		session.reload(config.navigation_timeout_secs).await?;
	}

	status.set_status("Opened Duolingo");
	Ok(())
}

pub async fn accept_cookie_banner<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D) -> Result<()> {
	status.set_status("Accepting cookies...");
	if session.accept_cookie_banner().await? {
		status.set_status("Accepted cookies!");
	} else {
		status.set_status("Couldn't accept cookies");
	}
	Ok(())
}

pub async fn logged_in<S: SiteSession>(session: &S) -> Result<bool> {
	Ok(session.cookie_jar().await?.has_session())
}

/// Wait for the human to log in, unless a session is already there
pub async fn login<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, config: &AppConfig) -> Result<()> {
	if !logged_in(session).await? {
		status.set_status("Logging in...");
		session.click_have_account().await?;
		status.set_status("Please login to Duolingo");
		status.set_mood(Mood::AwaitInput);
		run_stop_hook(config, "Please login to Duolingo");

		while !logged_in(session).await? {
			tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
		}
	}

	status.set_status("Logged in!");
	status.set_mood(Mood::Dormant);
	Ok(())
}

/// Accept the ad-consent dialog if it shows up, then persist the session cookies
pub async fn accept_consent<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, config: &AppConfig) -> Result<()> {
	status.set_status("Waiting for consent dialog...");
	status.set_mood(Mood::Waiting);
	let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(config.consent_timeout_secs);
	let mut shown = false;
	while tokio::time::Instant::now() < deadline {
		if session.consent_dialog_shown().await? {
			shown = true;
			break;
		}
		tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
	}
	status.set_mood(Mood::Dormant);

	if shown {
		status.set_status("Accepting consent...");
		if session.click_consent().await? {
			status.set_status("Accepted consent!");
		} else {
			status.set_status("Couldn't accept consent");
		}
	} else {
		status.set_status("No consent dialog... skipping");
	}

	let path = config.cookies_path();
	session.cookie_jar().await?.save(&path)?;
	log!("Saved session cookies to {}", path.display());
	Ok(())
}

/// Read the hearts counter into the status; returns the last known count
pub async fn refresh_hearts<S: BrowserSession, D: StatusDisplay>(session: &S, status: &mut D) -> Result<Option<u32>> {
	status.set_hearts(session.hearts_on_page().await?);
	Ok(status.hearts())
}

/// A challenge is on screen and we aren't out of hearts
pub async fn in_practice<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D) -> Result<bool> {
	let hearts = session.hearts_on_page().await?;
	status.set_hearts(hearts);
	Ok(session.has_challenge().await? && hearts != Some(0))
}

/// Get into a practice session, falling back to a plain lesson when that doesn't work out
pub async fn start_practice<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, config: &AppConfig) -> Result<()> {
	let mut attempt: u32 = 0;

	while !in_practice(session, status).await? {
		attempt += 1;
		let full_hearts = refresh_hearts(session, status).await?.is_some_and(|h| h >= 5);

		if attempt > config.max_practice_attempts || full_hearts {
			status.set_status("Couldn't start practice, doing a lesson instead...");
			status.set_mood(Mood::Dormant);
			session.goto(&config.fallback_lesson_url(), config.navigation_timeout_secs).await?;
		}

		let started = if attempt > config.max_practice_attempts + 1 || full_hearts {
			Ok(false)
		} else {
			try_start_practice(session, status, config).await
		};

		match started {
			Ok(true) => {}
			Ok(false) => {
				status.set_mood(Mood::Waiting);
				let step = config.practice_confirm_ms / 10;
				for i in 0..10 {
					status.set_status(&format!("Confirming practice... [{}] ({:.1}/{:.1}s)", attempt, (i * step) as f64 / 1000.0, config.practice_confirm_ms as f64 / 1000.0));
					tokio::time::sleep(tokio::time::Duration::from_millis(step)).await;
				}
			}
			Err(e) => {
				elog!("Failed to start practice: {e}");
				attempt = 0;
			}
		}
	}

	status.set_status("Started practice!");
	status.set_mood(Mood::Dormant);
	Ok(())
}

/// Ok(true) if a practice turned out to be running already
async fn try_start_practice<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, config: &AppConfig) -> Result<bool> {
	let learn_url = config.learn_url();

	if !session.current_url().await.contains(&learn_url) {
		// leftover "continue" from a finished session
		let _ = session.press_next().await;
		if refresh_hearts(session, status).await?.is_some_and(|h| h < 1) {
			session.dismiss_no_hearts().await?;
		}
		status.set_status("Double checking practice...");
		tokio::time::sleep(tokio::time::Duration::from_millis(config.practice_recheck_ms)).await;
		if in_practice(session, status).await? {
			return Ok(true);
		}
		status.set_status("Navigating to learn page...");
		session.goto(&learn_url, config.navigation_timeout_secs).await?;
	}

	status.set_status("Starting practice...");
	if !session.click_practice_for_hearts().await? {
		log!("Practice button not found, retrying");
	}
	Ok(false)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		classify::RawChallenge,
		runner::testing::{FakeSession, RecordingStatus, test_config},
	};

	fn lesson_challenge() -> RawChallenge {
		RawChallenge {
			data_test: "challenge challenge-listenTap".to_string(),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn practice_falls_back_to_lesson_after_max_attempts() {
		let session = FakeSession::default();
		session.on_lesson.borrow_mut().push(lesson_challenge());
		let mut status = RecordingStatus::default();
		let config = AppConfig {
			max_practice_attempts: 1,
			..test_config()
		};

		start_practice(&session, &mut status, &config).await.unwrap();

		assert_eq!(session.visits.borrow().as_slice(), &[config.learn_url(), config.fallback_lesson_url()]);
		assert_eq!(session.practice_clicks.get(), 1);
		assert!(status.statuses.contains(&"Couldn't start practice, doing a lesson instead...".to_string()));
		assert_eq!(status.statuses.last().map(String::as_str), Some("Started practice!"));
	}

	#[tokio::test]
	async fn full_hearts_go_straight_to_a_lesson() {
		let session = FakeSession::default();
		session.hearts.set(Some(5));
		session.on_lesson.borrow_mut().push(lesson_challenge());
		let mut status = RecordingStatus::default();
		let config = test_config();

		start_practice(&session, &mut status, &config).await.unwrap();

		assert_eq!(session.visits.borrow().as_slice(), &[config.fallback_lesson_url()]);
		assert_eq!(session.practice_clicks.get(), 0);
		assert_eq!(status.hearts, Some(5));
	}

	#[tokio::test]
	async fn running_practice_needs_no_navigation() {
		let session = FakeSession::default();
		session.scrapes.borrow_mut().push_back(Ok(lesson_challenge()));
		let mut status = RecordingStatus::default();

		start_practice(&session, &mut status, &test_config()).await.unwrap();
		assert!(session.visits.borrow().is_empty());
	}

	#[tokio::test]
	async fn out_of_hearts_is_not_practice() {
		let session = FakeSession::default();
		session.hearts.set(Some(0));
		session.scrapes.borrow_mut().push_back(Ok(lesson_challenge()));
		let mut status = RecordingStatus::default();

		assert!(!in_practice(&session, &mut status).await.unwrap());
		assert_eq!(status.hearts, Some(0));
	}

	#[tokio::test]
	async fn login_state_follows_session_cookie() {
		let session = FakeSession::default();
		assert!(!logged_in(&session).await.unwrap());

		session.logins_left.set(1);
		assert!(logged_in(&session).await.unwrap());
		assert!(!logged_in(&session).await.unwrap());
	}
}
