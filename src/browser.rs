//! Browser session: scraping challenge content and simulating input.
//!
//! Everything site-specific about the challenge DOM lives here. Missing elements are reported as
//! `Ok(None)`/`Ok(false)`, never as errors; only failures to talk to the browser are errors.

use chromiumoxide::Page;
use color_eyre::{Result, eyre::eyre};
use v_utils::log;

use crate::{classify::RawChallenge, cookies::CookieJar};

/// Attribute the scrape puts on each choice of the current challenge, valued with its index
pub const OPTION_ATTR: &str = "data-replay-option";
/// Attribute the scrape puts on each word-bank fragment of the current challenge, valued with its index
pub const FRAGMENT_ATTR: &str = "data-replay-fragment";

/// Selector of the element tagged with `attr` at index `idx` by the last scrape
pub fn tagged_selector(attr: &str, idx: usize) -> String {
	format!(r#"[{attr}="{idx}"]"#)
}

/// Background tint of the challenge container
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Tint {
	#[default]
	Default,
	NeedAnswer,
	AnswerKnown,
}

impl Tint {
	pub fn css(&self) -> &'static str {
		match self {
			Tint::Default => "cadetblue",
			Tint::NeedAnswer => "rgb(250, 129, 49)",
			Tint::AnswerKnown => "rgba(121, 185, 51, 0.9)",
		}
	}
}

/// What the solver needs from the page
#[allow(async_fn_in_trait)]
pub trait BrowserSession {
	/// Metadata of the challenge on screen, `None` if there is no challenge
	async fn challenge_metadata(&self) -> Result<Option<RawChallenge>>;
	/// Hearts counter, `None` when it isn't displayed (practice sessions hide it)
	async fn hearts_on_page(&self) -> Result<Option<u32>>;
	async fn click_option(&self, idx: usize) -> Result<()>;
	async fn click_fragment(&self, idx: usize) -> Result<()>;
	/// Option the human has selected, if any
	async fn checked_option(&self) -> Result<Option<usize>>;
	/// Fragments currently placed in the answer area, in order
	async fn assembled_fragments(&self) -> Result<Vec<String>>;
	async fn press_next(&self) -> Result<()>;
	async fn press_skip(&self) -> Result<()>;
	/// Close "no thanks" drawers that show up when hearts run out
	async fn dismiss_no_hearts(&self) -> Result<()>;
	async fn highlight(&self, tint: Tint) -> Result<()>;
}

/// Navigation, session and site chrome around the challenges
#[allow(async_fn_in_trait)]
pub trait SiteSession: BrowserSession {
	/// Navigate and wait for the site to finish loading
	async fn goto(&self, url: &str, timeout_secs: u64) -> Result<()>;
	async fn reload(&self, timeout_secs: u64) -> Result<()>;
	async fn current_url(&self) -> String;
	async fn cookie_jar(&self) -> Result<CookieJar>;
	async fn restore_cookies(&self, jar: &CookieJar) -> Result<()>;
	async fn has_challenge(&self) -> Result<bool>;
	/// Accept the cookie banner; `false` if it isn't there
	async fn accept_cookie_banner(&self) -> Result<bool>;
	async fn click_have_account(&self) -> Result<bool>;
	async fn consent_dialog_shown(&self) -> Result<bool>;
	async fn click_consent(&self) -> Result<bool>;
	/// Open the hearts menu and click "Practice to earn hearts"; `false` if the button didn't show up
	async fn click_practice_for_hearts(&self) -> Result<bool>;
}

/// Shared JS helpers: challenge container lookup and language-tagged text extraction
const CHALLENGE_JS: &str = r#"
	function challengeRoot() {
		const header = document.querySelector('[data-test="challenge-header"]');
		if (!header) return null;
		return header.parentElement?.parentElement?.parentElement || null;
	}

	function challengeContainer() {
		const root = challengeRoot();
		const main = root?.querySelector('div');
		return main?.children[1] || null;
	}

	function langText(element) {
		if (!element) return '';
		const texts = element.querySelectorAll('[lang]');
		let out = '';
		for (const t of texts) {
			const lang = t.getAttribute('lang');
			if (lang !== 'en' && lang !== 'ja') continue;
			if (t.querySelector('ruby') || t.querySelector('[lang]')) continue;
			out += t.innerText;
		}
		return out;
	}

	function fragmentText(part) {
		const textEl = part?.children[0]?.children[0]?.children[1]?.children[0];
		if (!textEl) return '';
		return textEl.innerText.includes('\n') ? langText(textEl) : textEl.innerText;
	}

	function wordBankParts() {
		const answer = challengeContainer()?.children[1];
		const bank = answer?.querySelector('[data-test="word-bank"]');
		return bank ? Array.from(bank.querySelectorAll('div')) : [];
	}

	function choices() {
		const container = challengeContainer();
		return container ? Array.from(container.querySelectorAll('[data-test="challenge-choice"]')) : [];
	}

	function tagAll(attr, elements) {
		for (const el of document.querySelectorAll('[' + attr + ']')) el.removeAttribute(attr);
		elements.forEach((el, i) => el.setAttribute(attr, String(i)));
		return elements;
	}
"#;

/// Challenge metadata; tags choices and fragments so later clicks hit exactly the scraped elements
const SCRAPE_JS: &str = r#"
	const root = challengeRoot();
	if (!root) return null;
	const header = document.querySelector('[data-test="challenge-header"] span');
	const container = challengeContainer();
	return {
		data_test: root.getAttribute('data-test') || '',
		header: header ? header.innerText : null,
		question: langText(container?.children[0]),
		choices: tagAll('data-replay-option', choices()).map(choice => ({
			inner: langText(choice.children[1]?.children[0]),
			outer: langText(choice.children[1]),
		})),
		word_bank: tagAll('data-replay-fragment', wordBankParts()).map(fragmentText),
	};
"#;

/// A Duolingo tab driven through chromiumoxide
pub struct DuolingoTab {
	page: Page,
}

impl DuolingoTab {
	pub fn new(page: Page) -> Self {
		Self { page }
	}

	async fn eval_json<T: serde::de::DeserializeOwned>(&self, body: &str, what: &str) -> Result<Option<T>> {
		let script = format!(
			r#"
			(function() {{
				{CHALLENGE_JS}
				const result = (function() {{ {body} }})();
				return result === null || result === undefined ? null : JSON.stringify(result);
			}})()
			"#
		);
		let result = self.page.evaluate(script).await.map_err(|e| eyre!("Failed to {}: {}", what, e))?;
		let Some(json_str) = result.value().and_then(|v| v.as_str()) else {
			return Ok(None);
		};
		let parsed = serde_json::from_str(json_str).map_err(|e| eyre!("Failed to parse {} result: {} - raw: '{}'", what, e, json_str))?;
		Ok(Some(parsed))
	}

	async fn eval_bool(&self, body: &str, what: &str) -> Result<bool> {
		Ok(self.eval_json::<bool>(body, what).await?.unwrap_or(false))
	}

	/// Click the element the last scrape tagged with `attr` = `idx`, with a real mouse event
	async fn click_tagged(&self, attr: &str, idx: usize) -> Result<()> {
		let selector = tagged_selector(attr, idx);
		let element = self.page.find_element(selector.as_str()).await.map_err(|e| eyre!("Failed to find {}: {}", selector, e))?;
		element.click().await.map_err(|e| eyre!("Failed to click {}: {}", selector, e))?;
		Ok(())
	}

	async fn click_selector(&self, selector: &str) -> Result<bool> {
		match self.page.find_element(selector).await {
			Ok(element) => {
				element.click().await.map_err(|e| eyre!("Failed to click {}: {}", selector, e))?;
				Ok(true)
			}
			Err(_) => Ok(false),
		}
	}

	async fn title(&self) -> String {
		self.page.get_title().await.ok().flatten().unwrap_or_default()
	}

	async fn url(&self) -> String {
		self.page.url().await.ok().flatten().unwrap_or_default()
	}

	/// Wait until the page title names the site
	async fn wait_for_site_title(&self, timeout_secs: u64) -> Result<()> {
		let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(timeout_secs);
		while !self.title().await.contains("Duolingo") {
			if tokio::time::Instant::now() >= deadline {
				return Err(eyre!("Timed out after {}s waiting for the site to load (at {})", timeout_secs, self.url().await));
			}
			tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
		}
		Ok(())
	}
}

impl BrowserSession for DuolingoTab {
	async fn challenge_metadata(&self) -> Result<Option<RawChallenge>> {
		self.eval_json(SCRAPE_JS, "scrape challenge").await
	}

	async fn hearts_on_page(&self) -> Result<Option<u32>> {
		let text: Option<String> = self
			.eval_json(
				r#"
				const icon = document.querySelector('[src*="hearts"]');
				let sibling = icon?.nextElementSibling;
				while (sibling && sibling.tagName !== 'SPAN') sibling = sibling.nextElementSibling;
				return sibling ? sibling.innerText : null;
				"#,
				"read hearts",
			)
			.await?;
		Ok(text.and_then(|t| t.trim().parse().ok()))
	}

	async fn click_option(&self, idx: usize) -> Result<()> {
		self.click_tagged(OPTION_ATTR, idx).await
	}

	async fn click_fragment(&self, idx: usize) -> Result<()> {
		self.click_tagged(FRAGMENT_ATTR, idx).await
	}

	async fn checked_option(&self) -> Result<Option<usize>> {
		self.eval_json(
			r#"
			const idx = choices().findIndex(choice => choice.getAttribute('aria-checked') === 'true');
			return idx < 0 ? null : idx;
			"#,
			"read selected option",
		)
		.await
	}

	async fn assembled_fragments(&self) -> Result<Vec<String>> {
		let fragments: Option<Vec<String>> = self
			.eval_json(
				r#"
				const answer = challengeContainer()?.children[1];
				const line = answer?.children[0]?.children[0]?.children[0]?.children[0]?.children[0]?.children[1];
				if (!line) return [];
				return Array.from(line.querySelectorAll('div')).map(fragmentText);
				"#,
				"read assembled answer",
			)
			.await?;
		Ok(fragments.unwrap_or_default())
	}

	async fn press_next(&self) -> Result<()> {
		let selector = r#"[data-test="player-next"]"#;
		let button = self.page.find_element(selector).await.map_err(|e| eyre!("Failed to find next button: {}", e))?;
		button.click().await.map_err(|e| eyre!("Failed to click next: {}", e))?;
		tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
		// "Check" turns into "Continue" in place
		button.click().await.map_err(|e| eyre!("Failed to click next: {}", e))?;
		Ok(())
	}

	async fn press_skip(&self) -> Result<()> {
		if !self.click_selector(r#"[data-test="player-skip"]"#).await? {
			return Err(eyre!("Failed to find skip button"));
		}
		Ok(())
	}

	async fn dismiss_no_hearts(&self) -> Result<()> {
		self.eval_bool(
			r#"
			let clicked = false;
			for (const span of document.querySelectorAll('span')) {
				if (span.textContent === 'No thanks' && span.parentElement) {
					span.parentElement.click();
					clicked = true;
					break;
				}
			}
			const drawer = document.querySelector('[data-test="notification-drawer-no-thanks-button"]');
			if (drawer) { drawer.click(); clicked = true; }
			return clicked;
			"#,
			"dismiss no-hearts drawer",
		)
		.await?;
		Ok(())
	}

	async fn highlight(&self, tint: Tint) -> Result<()> {
		let body = format!(
			r#"
			const container = challengeContainer();
			if (!container) return false;
			container.setAttribute('modified', '');
			container.style.backgroundColor = '{}';
			container.style.borderRadius = '10px';
			return true;
			"#,
			tint.css()
		);
		self.eval_bool(&body, "highlight challenge").await?;
		Ok(())
	}
}

impl SiteSession for DuolingoTab {
	async fn goto(&self, url: &str, timeout_secs: u64) -> Result<()> {
		self.page.goto(url).await.map_err(|e| eyre!("Failed to navigate to {}: {}", url, e))?;
		self.wait_for_site_title(timeout_secs).await
	}

	async fn reload(&self, timeout_secs: u64) -> Result<()> {
		self.page.reload().await.map_err(|e| eyre!("Failed to reload: {}", e))?;
		self.wait_for_site_title(timeout_secs).await
	}

	async fn current_url(&self) -> String {
		self.url().await
	}

	async fn cookie_jar(&self) -> Result<CookieJar> {
		let cookies = self.page.get_cookies().await.map_err(|e| eyre!("Failed to read cookies: {}", e))?;
		Ok(CookieJar::from_browser(&cookies))
	}

	async fn restore_cookies(&self, jar: &CookieJar) -> Result<()> {
		self.page.set_cookies(jar.to_params()?).await.map_err(|e| eyre!("Failed to set cookies: {}", e))?;
		Ok(())
	}

	async fn has_challenge(&self) -> Result<bool> {
		self.eval_bool("return challengeRoot() !== null;", "look for challenge").await
	}

	async fn accept_cookie_banner(&self) -> Result<bool> {
		self.click_selector("#onetrust-accept-btn-handler").await
	}

	async fn click_have_account(&self) -> Result<bool> {
		self.click_selector(r#"[data-test="have-account"]"#).await
	}

	async fn consent_dialog_shown(&self) -> Result<bool> {
		self.eval_bool("return document.querySelector('.fc-dialog-content') !== null;", "look for consent dialog").await
	}

	async fn click_consent(&self) -> Result<bool> {
		self.click_selector(".fc-cta-consent").await
	}

	async fn click_practice_for_hearts(&self) -> Result<bool> {
		let menu = self
			.page
			.find_element(r#"[data-test="hearts-menu"]"#)
			.await
			.map_err(|e| eyre!("Failed to find hearts menu: {}", e))?;
		menu.hover().await.map_err(|e| eyre!("Failed to hover hearts menu: {}", e))?;
		log!("Hovered over practice menu");
		tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;

		self.eval_bool(
			r#"
			for (const el of document.querySelectorAll('span, div, p')) {
				if (el.childElementCount === 0 && el.textContent.trim() === 'Practice to earn hearts') {
					const button = el.closest('button');
					if (button) { button.click(); return true; }
				}
			}
			return false;
			"#,
			"click practice button",
		)
		.await
	}
}
