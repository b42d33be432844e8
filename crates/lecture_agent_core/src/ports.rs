//! crates/lecture_agent_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, child
//! processes, or document formats.

use crate::domain::{
    AgentRun, AuthSession, HistoryEntry, HistoryPage, NewHistoryEntry, User, UserCredentials,
};
use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, process).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---

    /// Fails with `PortError::Conflict` when the e-mail is already registered.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, session: AuthSession) -> PortResult<()>;

    /// Returns the owning user, or `PortError::Unauthorized` for unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- History ---
    async fn append_history(&self, entry: NewHistoryEntry) -> PortResult<HistoryEntry>;

    /// Newest entries first.
    async fn list_history(&self, user_id: Uuid, limit: u32, offset: u64)
        -> PortResult<HistoryPage>;

    /// Returns how many entries were removed.
    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait AgentService: Send + Sync {
    /// Runs the summarization agent over `input_dir`, writing into `output_dir`.
    ///
    /// A non-zero exit is still `Ok`; `Err` means the agent could not be started at all.
    async fn run(&self, input_dir: &Path, output_dir: &Path) -> PortResult<AgentRun>;
}

#[async_trait]
pub trait DocumentTextReader: Send + Sync {
    /// Reads every text run of a document package, in document order.
    ///
    /// Returns `PortError::NotFound` if the file or its main document part is missing.
    async fn read_text_runs(&self, path: &Path) -> PortResult<Vec<String>>;
}
