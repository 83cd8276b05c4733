//! Status reporting towards the human operator

use v_utils::{
	io::{ConfirmResult, confirmation},
	log,
};

/// What the tool currently expects from the human
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mood {
	#[default]
	Dormant,
	Waiting,
	AwaitInput,
	AwaitClick,
}

impl Mood {
	pub fn color(&self) -> &'static str {
		match self {
			Mood::Dormant => "white",
			Mood::Waiting => "aqua",
			Mood::AwaitInput => "yellow",
			Mood::AwaitClick => "orange",
		}
	}
}

/// Receives progress notifications; never drives the flow itself
#[allow(async_fn_in_trait)]
pub trait StatusDisplay {
	fn set_status(&mut self, status: &str);
	fn set_mood(&mut self, mood: Mood);
	/// Heart count read from the page, `None` when the counter isn't shown
	fn set_hearts(&mut self, hearts: Option<u32>);
	/// Last heart count seen on the page
	fn hearts(&self) -> Option<u32>;
	/// Block until the human says to continue. `false` if they declined.
	async fn wait_for_ack(&mut self) -> bool;
}

/// Status line on the terminal, prefixed with the last known heart count
#[derive(Debug, Default)]
pub struct TerminalStatus {
	status: String,
	mood: Mood,
	hearts: Option<u32>,
}

impl TerminalStatus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mood(&self) -> Mood {
		self.mood
	}

	pub fn render(&self) -> String {
		match self.hearts {
			Some(h) => format!("❤{} {}", h, self.status),
			None => format!("❤? {}", self.status),
		}
	}
}

impl StatusDisplay for TerminalStatus {
	fn set_status(&mut self, status: &str) {
		self.status = status.to_string();
		log!("{}", self.render());
	}

	fn set_mood(&mut self, mood: Mood) {
		if mood != self.mood {
			tracing::debug!("status mood: {:?} -> {:?} ({})", self.mood, mood, mood.color());
		}
		self.mood = mood;
	}

	fn set_hearts(&mut self, hearts: Option<u32>) {
		// keep the last known count when the counter disappears
		if hearts.is_some() {
			self.hearts = hearts;
		}
	}

	fn hearts(&self) -> Option<u32> {
		self.hearts
	}

	async fn wait_for_ack(&mut self) -> bool {
		let previous = self.mood;
		self.set_mood(Mood::AwaitClick);
		let ack = confirmation(&format!("{} Continue?", self.render())).flush().await == ConfirmResult::Yes;
		self.set_mood(previous);
		ack
	}
}
