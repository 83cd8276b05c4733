//! Reconstructs the clicks needed to re-enter a stored answer.
//!
//! Plans are computed up front; nothing here touches the page.

use crate::{Challenge, QuestionAnswer};

/// Clicks that re-enter an answer
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplayPlan {
	/// Click the option at this index
	Select(usize),
	/// Click these word-bank fragments, in order
	Assemble(Vec<usize>),
}

/// Index of the first option whose label is exactly `answer`
pub fn plan_assist(options: &[String], answer: &str) -> Option<usize> {
	options.iter().position(|option| option == answer)
}

/// Greedy longest-prefix reconstruction of `answer` from the word bank.
///
/// At every step the longest unused fragment that prefixes the remaining text wins (ties go to the earlier
/// fragment); the matched fragment and surrounding whitespace are consumed. Fails as soon as no fragment fits.
pub fn plan_translate(word_bank: &[String], answer: &str) -> Option<Vec<usize>> {
	let mut by_length: Vec<usize> = (0..word_bank.len()).filter(|&i| !word_bank[i].is_empty()).collect();
	by_length.sort_by_key(|&i| std::cmp::Reverse(word_bank[i].chars().count()));

	let mut used = vec![false; word_bank.len()];
	let mut clicks = Vec::new();
	let mut rest = answer.trim();
	if rest.is_empty() {
		return None;
	}

	while !rest.is_empty() {
		let next = by_length.iter().copied().find(|&i| !used[i] && rest.starts_with(word_bank[i].as_str()))?;
		used[next] = true;
		clicks.push(next);
		rest = rest[word_bank[next].len()..].trim();
	}
	Some(clicks)
}

/// Plan for one stored answer, or `None` if it can't be entered on this challenge
pub fn plan(challenge: &Challenge, answer: &str) -> Option<ReplayPlan> {
	match challenge {
		Challenge::Assist { options, .. } => plan_assist(options, answer).map(ReplayPlan::Select),
		Challenge::Translate { word_bank, .. } => plan_translate(word_bank, answer).map(ReplayPlan::Assemble),
		Challenge::ListenTap { .. } | Challenge::Unsupported { .. } => None,
	}
}

/// First stored answer, in recording order, that can be replayed
pub fn first_viable<'a>(challenge: &Challenge, answers: &'a [QuestionAnswer]) -> Option<(&'a QuestionAnswer, ReplayPlan)> {
	answers.iter().find_map(|qa| plan(challenge, &qa.answer).map(|p| (qa, p)))
}
