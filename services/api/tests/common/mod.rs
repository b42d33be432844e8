//! Shared fixtures for the HTTP-level tests: an in-memory database, a scripted
//! agent, and helpers to build requests and `.docx` packages.

#![allow(dead_code)]

use api_lib::{
    adapters::DocxTextReader,
    config::Config,
    web::{router, AppState},
};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use lecture_agent_core::{
    domain::{
        AgentRun, AuthSession, HistoryEntry, HistoryPage, NewHistoryEntry, User, UserCredentials,
    },
    ports::{AgentService, DatabaseService, PortError, PortResult},
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use zip::{write::SimpleFileOptions, ZipWriter};

pub const BOUNDARY: &str = "lecture-agent-test-boundary";

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    sessions: HashMap<String, AuthSession>,
    history: Vec<HistoryEntry>,
}

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
    reject_history: AtomicBool,
}

impl MemoryDb {
    /// Makes every later `append_history` fail.
    pub fn fail_history_writes(&self) {
        self.reject_history.store(true, Ordering::SeqCst);
    }

    pub fn history_of(&self, user_id: Uuid) -> Vec<HistoryEntry> {
        let tables = self.tables.lock().unwrap();
        tables
            .history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.tables.lock().unwrap().sessions.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> PortResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|c| c.user.email == email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            verified: false,
            created_at: Utc::now(),
        };
        tables.users.push(UserCredentials {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(&self, session: AuthSession) -> PortResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.lock().unwrap();
        match tables.sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> PortResult<HistoryEntry> {
        if self.reject_history.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("history table is read-only".to_string()));
        }
        let saved = HistoryEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            action: entry.action,
            details: entry.details,
            files: entry.files,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().history.push(saved.clone());
        Ok(saved)
    }

    async fn list_history(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> PortResult<HistoryPage> {
        let owned = self.history_of(user_id);
        let total = owned.len() as u64;
        // Insertion order is creation order; newest first.
        let entries = owned
            .into_iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(HistoryPage { entries, total })
    }

    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.history.len();
        tables.history.retain(|e| e.user_id != user_id);
        Ok((before - tables.history.len()) as u64)
    }
}

//=========================================================================================
// Scripted agent
//=========================================================================================

/// Stands in for the Python agent: writes the configured documents and exits with `code`.
pub struct FakeAgent {
    code: i32,
    writes: Vec<(String, Vec<String>)>,
    start_error: Option<String>,
    calls: AtomicUsize,
}

impl FakeAgent {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            writes: Vec::new(),
            start_error: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Behaves like a machine without any usable interpreter.
    pub fn unstartable() -> Self {
        Self {
            start_error: Some(
                "no Python interpreter could be started (tried: python3, python)".to_string(),
            ),
            ..Self::new(0)
        }
    }

    /// Exits 0 after writing all three expected documents.
    pub fn producing_everything() -> Self {
        Self::new(0)
            .writing("summaries.docx", &["Lecture Summaries", "Newton's Second Law"])
            .writing(
                "flashcards.docx",
                &["Q: What is inertia?", "A: Resistance to change in motion"],
            )
            .writing("formula_sheet.docx", &["F = m * a"])
    }

    pub fn writing(mut self, name: &str, runs: &[&str]) -> Self {
        self.writes.push((
            name.to_string(),
            runs.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentService for FakeAgent {
    async fn run(&self, input_dir: &Path, output_dir: &Path) -> PortResult<AgentRun> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.start_error {
            return Err(PortError::Unexpected(message.clone()));
        }
        let inputs = std::fs::read_dir(input_dir)
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .count();
        for (name, runs) in &self.writes {
            let runs: Vec<&str> = runs.iter().map(String::as_str).collect();
            std::fs::write(output_dir.join(name), docx_bytes(&runs))
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        Ok(AgentRun {
            code: self.code,
            log: format!("read {} input file(s)\n", inputs),
        })
    }
}

//=========================================================================================
// Application under test
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub agent: Arc<FakeAgent>,
    pub db: Option<Arc<MemoryDb>>,
    _dir: TempDir,
}

impl TestApp {
    /// An app with an in-memory database.
    pub fn new(agent: FakeAgent) -> Self {
        Self::build(agent, true)
    }

    /// An app started without `DATABASE_URL`.
    pub fn without_database(agent: FakeAgent) -> Self {
        Self::build(agent, false)
    }

    fn build(agent: FakeAgent, with_db: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: None,
            log_level: tracing::Level::INFO,
            python_override: None,
            agent_module: "src.agent.cli".to_string(),
            agent_dir: dir.path().to_path_buf(),
            workspace_dir: dir.path().join("workspace"),
            cors_origin: "http://localhost:5173".to_string(),
            cookie_secure: false,
            max_upload_bytes: 10 * 1024 * 1024,
        };

        let memory_db = with_db.then(|| Arc::new(MemoryDb::default()));
        let db = memory_db
            .clone()
            .map(|db| -> Arc<dyn DatabaseService> { db });
        let agent = Arc::new(agent);
        let state = Arc::new(AppState::new(
            db,
            Arc::new(config),
            agent.clone(),
            Arc::new(DocxTextReader),
        ));

        Self {
            router: router(state.clone()),
            state,
            agent,
            db: memory_db,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &MemoryDb {
        self.db.as_deref().unwrap()
    }

    pub fn input_dir(&self, job: Uuid) -> PathBuf {
        self.state.workspace.input_dir(job)
    }

    pub fn output_dir(&self, job: Uuid) -> PathBuf {
        self.state.workspace.output_dir(job)
    }

    /// Names of the job directories on disk.
    pub fn job_dirs(&self) -> Vec<String> {
        dir_entries(&self.state.config.workspace_dir.join("jobs"))
    }

    /// Names left in the upload staging area.
    pub fn staged_uploads(&self) -> Vec<String> {
        dir_entries(&self.state.config.workspace_dir.join("staging"))
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Reply {
            status,
            headers,
            body,
        }
    }

    /// Uploads `files` as one multipart request; `job` selects an existing job.
    pub async fn upload(&self, job: Option<Uuid>, files: &[(&str, &[u8])]) -> Reply {
        let uri = match job {
            Some(job) => format!("/api/upload?job={}", job),
            None => "/api/upload".to_string(),
        };
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(files)))
            .unwrap();
        self.send(request).await
    }

    /// Uploads `files` into a fresh job and returns its id.
    pub async fn upload_job(&self, files: &[(&str, &[u8])]) -> Uuid {
        let reply = self.upload(None, files).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
        reply.json()["job_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> Reply {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Reply {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Sends a request carrying the given `token=...` cookie pair.
    pub async fn with_cookie(&self, method: &str, uri: &str, cookie: &str) -> Reply {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Registers a user and returns the `token=...` cookie pair of its session.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let reply = self
            .post_json(
                "/api/auth/register",
                serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.cookie_pair()
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn set_cookie(&self) -> String {
        self.headers
            .get(header::SET_COOKIE)
            .expect("response sets a cookie")
            .to_str()
            .unwrap()
            .to_string()
    }

    /// The `name=value` part of the `Set-Cookie` header.
    pub fn cookie_pair(&self) -> String {
        self.set_cookie().split(';').next().unwrap().to_string()
    }
}

//=========================================================================================
// Request and document builders
//=========================================================================================

pub fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in files {
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, name
        )
        .unwrap();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    write!(body, "--{}--\r\n", BOUNDARY).unwrap();
    body
}

/// A minimal `.docx` package with one paragraph per text run.
pub fn docx_bytes(runs: &[&str]) -> Vec<u8> {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );
    for run in runs {
        let escaped = run
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        xml.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escaped
        ));
    }
    xml.push_str("</w:body></w:document>");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<Types/>").unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Writes a `.docx` straight into a job's output directory.
pub fn write_artifact(app: &TestApp, job: Uuid, name: &str, runs: &[&str]) {
    let dir = app.output_dir(job);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), docx_bytes(runs)).unwrap();
}

/// Like `file_names`, but a missing directory is empty.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    if dir.exists() {
        file_names(dir)
    } else {
        Vec::new()
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
