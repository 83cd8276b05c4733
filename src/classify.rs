//! Turns scraped challenge metadata into a [`Challenge`]

use serde::{Deserialize, Serialize};

use crate::Challenge;

/// Labels scraped from one `challenge-choice` element.
///
/// Assist challenges keep the label one level deeper than select challenges, so both are collected.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawChoice {
	/// Text of the choice's second child's first child
	#[serde(default)]
	pub inner: String,
	/// Text of the choice's second child
	#[serde(default)]
	pub outer: String,
}

/// Challenge metadata as delivered by the browser session
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawChallenge {
	/// `data-test` attribute of the challenge container, e.g. `challenge challenge-assist`
	pub data_test: String,
	#[serde(default)]
	pub header: Option<String>,
	#[serde(default)]
	pub question: String,
	#[serde(default)]
	pub choices: Vec<RawChoice>,
	#[serde(default)]
	pub word_bank: Vec<String>,
}

/// Kind name carried by the container's `data-test` attribute (its last token)
pub fn kind_name(data_test: &str) -> &str {
	data_test.split_whitespace().last().unwrap_or("")
}

pub fn classify(raw: RawChallenge) -> Challenge {
	let RawChallenge {
		data_test,
		header,
		question,
		choices,
		word_bank,
	} = raw;
	let header = header.filter(|h| !h.trim().is_empty());

	match kind_name(&data_test) {
		"challenge-assist" => Challenge::Assist {
			header,
			question,
			options: choices.into_iter().map(|c| c.inner).collect(),
		},
		"challenge-select" => Challenge::Assist {
			header,
			question,
			options: choices.into_iter().map(|c| c.outer).collect(),
		},
		"challenge-translate" => Challenge::Translate { header, question, word_bank },
		"challenge-listenTap" => Challenge::ListenTap { header },
		other => Challenge::Unsupported { header, kind: other.to_string() },
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn choice(inner: &str, outer: &str) -> RawChoice {
		RawChoice {
			inner: inner.to_string(),
			outer: outer.to_string(),
		}
	}

	#[test]
	fn kind_is_last_token_of_data_test() {
		assert_eq!(kind_name("challenge challenge-translate"), "challenge-translate");
		assert_eq!(kind_name("  challenge-assist  "), "challenge-assist");
		assert_eq!(kind_name(""), "");
	}

	#[test]
	fn assist_uses_inner_labels() {
		let raw = RawChallenge {
			data_test: "challenge challenge-assist".to_string(),
			header: Some("Select the correct meaning".to_string()),
			question: "perro".to_string(),
			choices: vec![choice("dog", "1dog"), choice("cat", "2cat")],
			word_bank: vec![],
		};

		assert_eq!(
			classify(raw),
			Challenge::Assist {
				header: Some("Select the correct meaning".to_string()),
				question: "perro".to_string(),
				options: vec!["dog".to_string(), "cat".to_string()],
			}
		);
	}

	#[test]
	fn select_becomes_assist_with_outer_labels() {
		let raw = RawChallenge {
			data_test: "challenge challenge-select".to_string(),
			question: "Which one is \"water\"?".to_string(),
			choices: vec![choice("", "agua"), choice("", "leche")],
			..Default::default()
		};

		let Challenge::Assist { options, .. } = classify(raw) else {
			panic!("expected assist");
		};
		assert_eq!(options, vec!["agua", "leche"]);
	}

	#[test]
	fn translate_keeps_word_bank_order() {
		let raw = RawChallenge {
			data_test: "challenge challenge-translate".to_string(),
			header: Some("   ".to_string()),
			question: "Yo bebo agua".to_string(),
			word_bank: vec!["water".to_string(), "I".to_string(), "drink".to_string()],
			..Default::default()
		};

		assert_eq!(
			classify(raw),
			Challenge::Translate {
				header: None,
				question: "Yo bebo agua".to_string(),
				word_bank: vec!["water".to_string(), "I".to_string(), "drink".to_string()],
			}
		);
	}

	#[test]
	fn listen_tap_and_unknown_kinds() {
		let listen = RawChallenge {
			data_test: "challenge challenge-listenTap".to_string(),
			question: "ignored".to_string(),
			..Default::default()
		};
		assert_eq!(classify(listen), Challenge::ListenTap { header: None });

		let other = RawChallenge {
			data_test: "challenge challenge-match".to_string(),
			..Default::default()
		};
		assert_eq!(
			classify(other),
			Challenge::Unsupported {
				header: None,
				kind: "challenge-match".to_string()
			}
		);
	}

	#[test]
	fn raw_challenge_parses_from_scrape_json() {
		let json = r#"{"data_test":"challenge challenge-assist","header":null,"question":"hola","choices":[{"inner":"hello","outer":"1hello"}]}"#;
		let raw: RawChallenge = serde_json::from_str(json).unwrap();
		assert_eq!(raw.choices.len(), 1);
		assert!(raw.word_bank.is_empty());
	}
}
