//! crates/lecture_agent_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifies one job and, through it, that job's isolated workspace directories.
pub type JobId = Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// One record in a user's append-only activity log.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub details: String,
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The fields a caller supplies when appending to the history log.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub user_id: Uuid,
    pub action: String,
    pub details: String,
    pub files: Vec<String>,
}

/// A page of history entries plus the total number of entries the user owns.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub total: u64,
}

/// The three document packages the summarization agent is expected to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Summaries,
    Flashcards,
    FormulaSheet,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Summaries,
        ArtifactKind::Flashcards,
        ArtifactKind::FormulaSheet,
    ];

    /// The file name the agent writes this artifact under.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Summaries => "summaries.docx",
            ArtifactKind::Flashcards => "flashcards.docx",
            ArtifactKind::FormulaSheet => "formula_sheet.docx",
        }
    }
}

/// A generated document package found in a job's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub size: u64,
}

/// A file stored in a job's input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// What the external agent left behind: its exit code and everything it printed.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub code: i32,
    pub log: String,
}

impl AgentRun {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// A question/answer pair reconstructed from a flashcards document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}
