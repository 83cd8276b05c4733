//! Persistent question -> answers table.
//!
//! Exact-text keyed, append-only. Several answers may exist for one question; they are returned in the order
//! they were recorded.

use std::path::Path;

use color_eyre::{Result, eyre::eyre};
use rusqlite::{Connection, params};

use crate::QuestionAnswer;

pub struct AnswerStore {
	conn: Connection,
}

impl AnswerStore {
	/// Open (or create) the store at `path`
	pub fn open(path: &Path) -> Result<Self> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent).map_err(|e| eyre!("Failed to create answers dir {}: {}", parent.display(), e))?;
		}
		let conn = Connection::open(path).map_err(|e| eyre!("Failed to open answers db {}: {}", path.display(), e))?;
		Self::init(conn)
	}

	pub fn open_in_memory() -> Result<Self> {
		let conn = Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory answers db: {}", e))?;
		Self::init(conn)
	}

	fn init(conn: Connection) -> Result<Self> {
		conn.execute(
			"CREATE TABLE IF NOT EXISTS question_answers (
				id INTEGER PRIMARY KEY,
				question TEXT NOT NULL,
				answer TEXT NOT NULL,
				recorded_at TEXT NOT NULL
			)",
			[],
		)?;
		conn.execute("CREATE INDEX IF NOT EXISTS idx_question_answers_question ON question_answers(question)", [])?;
		Ok(Self { conn })
	}

	/// All answers recorded for exactly this question, oldest first
	pub fn lookup(&self, question: &str) -> Result<Vec<QuestionAnswer>> {
		let mut stmt = self.conn.prepare("SELECT question, answer FROM question_answers WHERE question = ?1 ORDER BY id ASC")?;
		let rows = stmt.query_map(params![question], |row| Ok(QuestionAnswer::new(row.get(0)?, row.get(1)?)))?;

		let mut answers = Vec::new();
		for row in rows {
			answers.push(row?);
		}
		tracing::debug!("lookup {:?}: {} answer(s)", question, answers.len());
		Ok(answers)
	}

	/// Append a pair; returns its row id
	pub fn insert(&self, qa: &QuestionAnswer) -> Result<i64> {
		self.conn.execute(
			"INSERT INTO question_answers (question, answer, recorded_at) VALUES (?1, ?2, ?3)",
			params![qa.question, qa.answer, chrono::Utc::now().to_rfc3339()],
		)?;
		Ok(self.conn.last_insert_rowid())
	}

	pub fn count(&self) -> Result<u64> {
		let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM question_answers", [], |row| row.get(0))?;
		Ok(count as u64)
	}
}
