//! Asking the human for an answer we don't have yet, and remembering it

use color_eyre::Result;
use v_utils::log;

use crate::{
	Challenge, QuestionAnswer,
	browser::{BrowserSession, Tint},
	config::AppConfig,
	runner::run_stop_hook,
	status::{Mood, StatusDisplay},
	store::AnswerStore,
};

/// What the human did once asked for an answer
enum Response {
	Answer(String),
	/// Dealt with the challenge, but left nothing worth recording
	Dismissed,
}

/// Wait for the human to answer, record the answer.
/// Returns true once the human has dealt with the challenge, whether or not an answer was stored.
pub async fn elicit<S: BrowserSession, D: StatusDisplay>(session: &S, status: &mut D, store: &AnswerStore, challenge: &Challenge, config: &AppConfig) -> Result<bool> {
	let Some(question) = challenge.question() else {
		return Ok(false);
	};

	session.highlight(Tint::NeedAnswer).await?;
	status.set_status("Please provide answer");
	status.set_mood(Mood::AwaitInput);
	run_stop_hook(config, &format!("Answer needed: {question}"));

	let observed = observe_answer(session, status, challenge, config).await;
	session.highlight(Tint::Default).await?;

	let Response::Answer(answer) = observed? else {
		status.set_mood(Mood::Dormant);
		return Ok(true);
	};
	let qa = QuestionAnswer::new(question.to_string(), answer);
	store.insert(&qa)?;
	status.set_status(&format!("Answer saved: {}", qa.answer));
	status.set_mood(Mood::Dormant);
	tracing::info!(question = %qa.question, answer = %qa.answer, "recorded new answer");
	tokio::time::sleep(tokio::time::Duration::from_millis(config.feedback_pause_ms)).await;
	Ok(true)
}

async fn observe_answer<S: BrowserSession, D: StatusDisplay>(session: &S, status: &mut D, challenge: &Challenge, config: &AppConfig) -> Result<Response> {
	match challenge {
		Challenge::Assist { options, .. } => {
			let poll = tokio::time::Duration::from_millis(config.poll_interval_ms.max(1));
			loop {
				if let Some(idx) = session.checked_option().await? {
					let Some(label) = options.get(idx) else {
						log!("Selected option {} is outside the {} scraped options, waiting...", idx + 1, options.len());
						tokio::time::sleep(poll).await;
						continue;
					};
					status.set_status(&format!("User chose answer {}!", idx + 1));
					status.set_mood(Mood::Dormant);
					tokio::time::sleep(tokio::time::Duration::from_millis(config.feedback_pause_ms)).await;
					return Ok(Response::Answer(label.clone()));
				}
				tokio::time::sleep(poll).await;
			}
		}
		Challenge::Translate { .. } => {
			if !status.wait_for_ack().await {
				log!("Translation not confirmed, nothing recorded");
				return Ok(Response::Dismissed);
			}
			let fragments: Vec<String> = session.assembled_fragments().await?.into_iter().filter(|f| !f.trim().is_empty()).collect();
			if fragments.is_empty() {
				log!("Answer area is empty, nothing recorded");
				return Ok(Response::Dismissed);
			}
			Ok(Response::Answer(fragments.join(" ")))
		}
		Challenge::ListenTap { .. } | Challenge::Unsupported { .. } => Ok(Response::Dismissed),
	}
}
