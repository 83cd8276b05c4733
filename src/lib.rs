use std::fmt;

use derive_new::new;
use serde::{Deserialize, Serialize};

pub mod browser;
pub mod classify;
pub mod config;
pub mod cookies;
pub mod elicit;
pub mod replay;
pub mod runner;
pub mod site;
pub mod status;
pub mod store;

/// A question together with an answer a human once gave for it
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, new)]
pub struct QuestionAnswer {
	/// Question text exactly as scraped
	pub question: String,
	/// Answer text: an option label, or word-bank fragments joined with spaces
	pub answer: String,
}

/// A classified challenge, as currently shown on the page
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Challenge {
	/// Multiple choice: click the option whose label is the answer
	Assist {
		/// Instruction line above the challenge
		header: Option<String>,
		/// The question text/prompt
		question: String,
		/// Option labels, in page order
		options: Vec<String>,
	},
	/// Rebuild a sentence by clicking word-bank fragments
	Translate {
		/// Instruction line above the challenge
		header: Option<String>,
		/// The sentence to translate
		question: String,
		/// Word-bank fragments, in page order
		word_bank: Vec<String>,
	},
	/// Listening challenge, always skipped
	ListenTap { header: Option<String> },
	/// Anything else; left to the human
	Unsupported {
		header: Option<String>,
		/// Raw kind name, e.g. `challenge-match`
		kind: String,
	},
}

impl Challenge {
	/// Question text for kinds that are answered from the store
	pub fn question(&self) -> Option<&str> {
		match self {
			Challenge::Assist { question, .. } | Challenge::Translate { question, .. } => Some(question),
			Challenge::ListenTap { .. } | Challenge::Unsupported { .. } => None,
		}
	}

	pub fn header(&self) -> Option<&str> {
		match self {
			Challenge::Assist { header, .. } | Challenge::Translate { header, .. } | Challenge::ListenTap { header } | Challenge::Unsupported { header, .. } =>
				header.as_deref(),
		}
	}

	/// Whether answers for this challenge are looked up and recorded
	pub fn is_answerable(&self) -> bool {
		matches!(self, Challenge::Assist { .. } | Challenge::Translate { .. })
	}

	/// Short marker used in log lines
	pub fn kind_marker(&self) -> &str {
		match self {
			Challenge::Assist { .. } => "[assist]",
			Challenge::Translate { .. } => "[translate]",
			Challenge::ListenTap { .. } => "[listen]",
			Challenge::Unsupported { .. } => "[other]",
		}
	}
}

impl fmt::Display for Challenge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(header) = self.header() {
			writeln!(f, "{}", header)?;
		}
		match self {
			Challenge::Assist { question, options, .. } => {
				writeln!(f, "{}", question)?;
				writeln!(f)?;
				for (i, option) in options.iter().enumerate() {
					writeln!(f, "( ) {}. {}", i + 1, option)?;
				}
			}
			Challenge::Translate { question, word_bank, .. } => {
				writeln!(f, "{}", question)?;
				writeln!(f)?;
				writeln!(f, "Word bank: {}", word_bank.iter().map(|w| format!("[{w}]")).collect::<Vec<_>>().join(" "))?;
			}
			Challenge::ListenTap { .. } => {
				writeln!(f, "(listening challenge)")?;
			}
			Challenge::Unsupported { kind, .. } => {
				writeln!(f, "(unsupported challenge: {})", kind)?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_lists_options_and_word_bank() {
		let assist = Challenge::Assist {
			header: Some("Select the correct meaning".to_string()),
			question: "gato".to_string(),
			options: vec!["dog".to_string(), "cat".to_string()],
		};
		let rendered = assist.to_string();
		assert!(rendered.starts_with("Select the correct meaning\ngato\n"));
		assert!(rendered.contains("( ) 2. cat"));

		let translate = Challenge::Translate {
			header: None,
			question: "Yo soy".to_string(),
			word_bank: vec!["I".to_string(), "am".to_string()],
		};
		assert!(translate.to_string().contains("Word bank: [I] [am]"));
	}

	#[test]
	fn only_assist_and_translate_carry_questions() {
		let listen = Challenge::ListenTap { header: None };
		assert_eq!(listen.question(), None);
		assert!(!listen.is_answerable());

		let translate = Challenge::Translate {
			header: None,
			question: "Hola".to_string(),
			word_bank: vec![],
		};
		assert_eq!(translate.question(), Some("Hola"));
		assert!(translate.is_answerable());
	}
}
