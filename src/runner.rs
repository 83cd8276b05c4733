//! Challenge solving and the main practice loop

use color_eyre::Result;
use v_utils::{elog, log};

use crate::{
	Challenge,
	browser::{BrowserSession, SiteSession, Tint},
	classify::classify,
	config::AppConfig,
	elicit::elicit,
	replay::{self, ReplayPlan},
	site,
	status::{Mood, StatusDisplay},
	store::AnswerStore,
};

/// Run the stop hook with a message if configured
pub fn run_stop_hook(config: &AppConfig, message: &str) {
	if let Some(ref hook) = config.stop_hook {
		log!("Running stop hook: {} {:?}", hook, message);
		// Escape single quotes for shell: replace ' with '\''
		let escaped = message.replace('\'', "'\\''");
		let _ = tokio::process::Command::new("sh").arg("-c").arg(format!("{} '{}'", hook, escaped)).spawn();
	}
}

/// Try to answer the challenge on screen.
/// Returns Ok(false) when the human still has to take over.
pub async fn solve_challenge<S: BrowserSession, D: StatusDisplay>(session: &S, status: &mut D, store: &AnswerStore, challenge: &Challenge, config: &AppConfig) -> Result<bool> {
	if challenge.question().is_some_and(|q| q.trim().is_empty()) {
		status.set_status("ERROR, couldn't get question!");
		session.highlight(Tint::NeedAnswer).await?;
		return Ok(false);
	}

	let hearts = session.hearts_on_page().await?;
	status.set_hearts(hearts);
	if hearts.is_some() {
		status.set_status("LESSON MODE");
		return play_lesson_mode(session, challenge, config).await;
	}

	if !challenge.is_answerable() {
		return match challenge {
			Challenge::ListenTap { .. } => {
				status.set_status("Skipping...");
				session.press_skip().await?;
				status.set_status("Skipped!");
				Ok(true)
			}
			_ => {
				log!("Don't know how to solve {}", challenge.kind_marker());
				Ok(false)
			}
		};
	}
	let question = challenge.question().unwrap_or_default();

	let answers = store.lookup(question)?;
	if answers.is_empty() {
		return elicit(session, status, store, challenge, config).await;
	}

	session.highlight(Tint::AnswerKnown).await?;
	let Some((qa, plan)) = replay::first_viable(challenge, &answers) else {
		log!("None of the {} stored answer(s) fit this challenge", answers.len());
		return elicit(session, status, store, challenge, config).await;
	};

	status.set_status(&format!("Replaying: {}", qa.answer));
	perform(session, &plan, config).await?;
	Ok(true)
}

async fn perform<S: BrowserSession>(session: &S, plan: &ReplayPlan, config: &AppConfig) -> Result<()> {
	match plan {
		ReplayPlan::Select(idx) => session.click_option(*idx).await,
		ReplayPlan::Assemble(fragments) => {
			for &idx in fragments {
				session.click_fragment(idx).await?;
				tokio::time::sleep(tokio::time::Duration::from_millis(config.fragment_click_delay_ms)).await;
			}
			Ok(())
		}
	}
}

/// Regular lessons cost hearts but teach nothing to the store, so just get through them
async fn play_lesson_mode<S: BrowserSession>(session: &S, challenge: &Challenge, config: &AppConfig) -> Result<bool> {
	match challenge {
		Challenge::ListenTap { .. } => session.press_skip().await?,
		Challenge::Translate { word_bank, .. } =>
			for idx in 0..word_bank.len() {
				session.click_fragment(idx).await?;
				tokio::time::sleep(tokio::time::Duration::from_millis(config.fragment_click_delay_ms)).await;
			},
		Challenge::Assist { options, .. } => {
			if options.is_empty() {
				return Ok(false);
			}
			session.click_option(rand::random_range(0..options.len())).await?;
		}
		Challenge::Unsupported { .. } => return Ok(false),
	}
	session.dismiss_no_hearts().await?;
	Ok(true)
}

/// Practice until logged out
pub async fn run<S: SiteSession, D: StatusDisplay>(session: &S, status: &mut D, store: &AnswerStore, config: &AppConfig) -> Result<()> {
	let mut challenge_num = 0;

	while site::logged_in(session).await? {
		site::start_practice(session, status, config).await?;

		while site::in_practice(session, status).await? {
			status.set_status("Getting challenge info...");
			let raw = match session.challenge_metadata().await {
				Ok(Some(raw)) => raw,
				Ok(None) => break,
				Err(e) => {
					elog!("Failed to read challenge: {e}");
					break;
				}
			};
			let challenge = classify(raw);
			challenge_num += 1;
			status.set_status("Got challenge info!");
			tracing::info!("--- Challenge {} {} ---\n{}", challenge_num, challenge.kind_marker(), challenge);

			let solved = match solve_challenge(session, status, store, &challenge, config).await {
				Ok(solved) => solved,
				Err(e) => {
					elog!("Failed to solve challenge {challenge_num}: {e}");
					false
				}
			};
			if !solved {
				run_stop_hook(config, "Challenge needs manual intervention");
				status.wait_for_ack().await;
			}

			status.set_status("Continuing...");
			status.set_mood(Mood::Waiting);
			match session.press_next().await {
				Ok(()) => status.set_status("OK!"),
				Err(e) => elog!("Couldn't continue: {e}"),
			}
			status.set_mood(Mood::Dormant);
			tokio::time::sleep(tokio::time::Duration::from_millis(config.next_pause_ms)).await;
		}
	}

	log!("No longer logged in after {challenge_num} challenge(s), stopping.");
	Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
	use std::{
		cell::{Cell, RefCell},
		collections::VecDeque,
	};

	use color_eyre::{Result, eyre::eyre};

	use crate::{
		browser::{BrowserSession, SiteSession, Tint},
		classify::RawChallenge,
		config::AppConfig,
		cookies::{CookieJar, SESSION_COOKIE, StoredCookie},
		status::{Mood, StatusDisplay},
	};

	pub fn test_config() -> AppConfig {
		AppConfig {
			poll_interval_ms: 1,
			fragment_click_delay_ms: 0,
			feedback_pause_ms: 0,
			next_pause_ms: 0,
			practice_recheck_ms: 0,
			practice_confirm_ms: 0,
			max_practice_attempts: 3,
			..Default::default()
		}
	}

	/// In-memory page: records every interaction
	#[derive(Default)]
	pub struct FakeSession {
		/// Challenges still to come; each scrape takes the front one
		pub scrapes: RefCell<VecDeque<Result<RawChallenge, String>>>,
		/// Queued as soon as a lesson page is visited
		pub on_lesson: RefCell<Vec<RawChallenge>>,
		pub hearts: Cell<Option<u32>>,
		pub checked: Cell<Option<usize>>,
		pub assembled: RefCell<Vec<String>>,
		/// Cookie reads that still see a session
		pub logins_left: Cell<u32>,
		pub visits: RefCell<Vec<String>>,
		pub clicked_options: RefCell<Vec<usize>>,
		pub clicked_fragments: RefCell<Vec<usize>>,
		pub tints: RefCell<Vec<Tint>>,
		pub skips: Cell<u32>,
		pub nexts: Cell<u32>,
		pub dismissals: Cell<u32>,
		pub practice_clicks: Cell<u32>,
		/// Fail option clicks, like an intercepted click would
		pub fail_clicks: Cell<bool>,
		/// Fail every press of the next button, after counting it
		pub fail_next: Cell<bool>,
	}

	impl BrowserSession for FakeSession {
		async fn challenge_metadata(&self) -> Result<Option<RawChallenge>> {
			match self.scrapes.borrow_mut().pop_front() {
				Some(Ok(raw)) => Ok(Some(raw)),
				Some(Err(e)) => Err(eyre!("Failed to scrape challenge: {}", e)),
				None => Ok(None),
			}
		}

		async fn hearts_on_page(&self) -> Result<Option<u32>> {
			Ok(self.hearts.get())
		}

		async fn click_option(&self, idx: usize) -> Result<()> {
			if self.fail_clicks.get() {
				return Err(eyre!("click intercepted"));
			}
			self.clicked_options.borrow_mut().push(idx);
			Ok(())
		}

		async fn click_fragment(&self, idx: usize) -> Result<()> {
			self.clicked_fragments.borrow_mut().push(idx);
			Ok(())
		}

		async fn checked_option(&self) -> Result<Option<usize>> {
			Ok(self.checked.get())
		}

		async fn assembled_fragments(&self) -> Result<Vec<String>> {
			Ok(self.assembled.borrow().clone())
		}

		async fn press_next(&self) -> Result<()> {
			self.nexts.set(self.nexts.get() + 1);
			if self.fail_next.get() {
				return Err(eyre!("Failed to find next button"));
			}
			Ok(())
		}

		async fn press_skip(&self) -> Result<()> {
			self.skips.set(self.skips.get() + 1);
			Ok(())
		}

		async fn dismiss_no_hearts(&self) -> Result<()> {
			self.dismissals.set(self.dismissals.get() + 1);
			Ok(())
		}

		async fn highlight(&self, tint: Tint) -> Result<()> {
			self.tints.borrow_mut().push(tint);
			Ok(())
		}
	}

	impl SiteSession for FakeSession {
		async fn goto(&self, url: &str, _timeout_secs: u64) -> Result<()> {
			self.visits.borrow_mut().push(url.to_string());
			if url.contains("/lesson/") {
				self.scrapes.borrow_mut().extend(self.on_lesson.borrow().iter().cloned().map(Ok));
			}
			Ok(())
		}

		async fn reload(&self, _timeout_secs: u64) -> Result<()> {
			Ok(())
		}

		async fn current_url(&self) -> String {
			self.visits.borrow().last().cloned().unwrap_or_default()
		}

		async fn cookie_jar(&self) -> Result<CookieJar> {
			let left = self.logins_left.get();
			if left == 0 {
				return Ok(CookieJar::default());
			}
			self.logins_left.set(left - 1);
			Ok(CookieJar {
				saved_at: None,
				cookies: vec![StoredCookie {
					name: SESSION_COOKIE.to_string(),
					value: "token".to_string(),
					domain: ".duolingo.com".to_string(),
					path: "/".to_string(),
					secure: true,
					http_only: true,
					expires: None,
					same_site: None,
				}],
			})
		}

		async fn restore_cookies(&self, _jar: &CookieJar) -> Result<()> {
			Ok(())
		}

		async fn has_challenge(&self) -> Result<bool> {
			Ok(!self.scrapes.borrow().is_empty())
		}

		async fn accept_cookie_banner(&self) -> Result<bool> {
			Ok(false)
		}

		async fn click_have_account(&self) -> Result<bool> {
			Ok(false)
		}

		async fn consent_dialog_shown(&self) -> Result<bool> {
			Ok(false)
		}

		async fn click_consent(&self) -> Result<bool> {
			Ok(false)
		}

		async fn click_practice_for_hearts(&self) -> Result<bool> {
			self.practice_clicks.set(self.practice_clicks.get() + 1);
			Ok(false)
		}
	}

	#[derive(Debug, Default)]
	pub struct RecordingStatus {
		pub statuses: Vec<String>,
		pub moods: Vec<Mood>,
		pub hearts: Option<u32>,
		/// Answer given to every acknowledgement request
		pub ack: bool,
		pub acks_requested: u32,
	}

	impl StatusDisplay for RecordingStatus {
		fn set_status(&mut self, status: &str) {
			self.statuses.push(status.to_string());
		}

		fn set_mood(&mut self, mood: Mood) {
			self.moods.push(mood);
		}

		fn set_hearts(&mut self, hearts: Option<u32>) {
			if hearts.is_some() {
				self.hearts = hearts;
			}
		}

		fn hearts(&self) -> Option<u32> {
			self.hearts
		}

		async fn wait_for_ack(&mut self) -> bool {
			self.acks_requested += 1;
			self.ack
		}
	}
}
