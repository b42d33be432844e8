pub mod agent;
pub mod db;
pub mod docx;
pub mod workspace;

pub use agent::{default_candidates, Candidate, PythonAgentAdapter};
pub use db::DbAdapter;
pub use docx::DocxTextReader;
pub use workspace::{Staging, Workspace};
