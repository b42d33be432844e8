pub mod domain;
pub mod ports;
pub mod preview;

pub use domain::{
    AgentRun, Artifact, ArtifactKind, AuthSession, Flashcard, HistoryEntry, HistoryPage, JobId,
    NewHistoryEntry, StoredFile, User, UserCredentials,
};
pub use ports::{AgentService, DatabaseService, DocumentTextReader, PortError, PortResult};
