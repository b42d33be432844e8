//! services/api/src/adapters/agent.rs
//!
//! This module contains the adapter for the external summarization agent.
//! It implements the `AgentService` port by launching the agent as a child
//! process through the first interpreter that can be started.

use async_trait::async_trait;
use lecture_agent_core::{
    domain::AgentRun,
    ports::{AgentService, PortError, PortResult},
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    sync::Mutex,
};
use tracing::{debug, info, warn};

//=========================================================================================
// Interpreter Candidates
//=========================================================================================

/// One way of starting the interpreter: a program plus arguments placed before `-m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl Candidate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            leading_args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// The interpreters to try, in order: the configured override, then the
/// platform launcher, then the generic names.
pub fn default_candidates(python_override: Option<&str>) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if let Some(program) = python_override {
        candidates.push(Candidate::new(program));
    }
    if cfg!(windows) {
        candidates.push(Candidate::with_args("py", ["-3"]));
        candidates.push(Candidate::new("py"));
        candidates.push(Candidate::new("python"));
        candidates.push(Candidate::new("python3"));
    } else {
        candidates.push(Candidate::new("python3"));
        candidates.push(Candidate::new("python"));
    }
    candidates
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AgentService` by running `<python> -m <module> <in> --out <out>`.
#[derive(Debug, Clone)]
pub struct PythonAgentAdapter {
    candidates: Vec<Candidate>,
    module: String,
    working_dir: PathBuf,
}

impl PythonAgentAdapter {
    /// Creates a new `PythonAgentAdapter`.
    pub fn new(candidates: Vec<Candidate>, module: String, working_dir: PathBuf) -> Self {
        Self {
            candidates,
            module,
            working_dir,
        }
    }

    fn arguments(&self, candidate: &Candidate, input_dir: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = candidate.leading_args.clone();
        args.push("-m".to_string());
        args.push(self.module.clone());
        args.push(input_dir.display().to_string());
        args.push("--out".to_string());
        args.push(output_dir.display().to_string());
        args
    }
}

//=========================================================================================
// `AgentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AgentService for PythonAgentAdapter {
    /// Tries each candidate until one starts. A candidate that starts is final:
    /// its exit code is the result even when it is non-zero.
    async fn run(&self, input_dir: &Path, output_dir: &Path) -> PortResult<AgentRun> {
        let mut log = String::new();

        for candidate in &self.candidates {
            let args = self.arguments(candidate, input_dir, output_dir);
            log.push_str(&format!(
                "[runner] trying: {} {}\n",
                candidate.program,
                args.join(" ")
            ));

            let spawned = Command::new(&candidate.program)
                .args(&args)
                .current_dir(&self.working_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn();

            let mut child = match spawned {
                Ok(child) => child,
                Err(e) => {
                    warn!(program = %candidate.program, error = %e, "Interpreter failed to start");
                    log.push_str(&format!(
                        "[runner] failed to start {}: {}\n",
                        candidate.program, e
                    ));
                    continue;
                }
            };

            info!(program = %candidate.program, module = %self.module, "Agent started");
            let (code, output) = collect_output(&mut child).await;
            log.push_str(&output);
            info!(program = %candidate.program, code, "Agent exited");

            return Ok(AgentRun { code, log });
        }

        let tried: Vec<&str> = self.candidates.iter().map(|c| c.program.as_str()).collect();
        Err(PortError::Unexpected(format!(
            "no Python interpreter could be started (tried: {})\n{}",
            tried.join(", "),
            log
        )))
    }
}

//=========================================================================================
// Child Process Plumbing
//=========================================================================================

/// Waits for the child while draining stdout and stderr into one buffer in arrival order.
async fn collect_output(child: &mut Child) -> (i32, String) {
    let buffer = Arc::new(Mutex::new(String::new()));
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, stdout_result, stderr_result) = tokio::join!(
        child.wait(),
        pump(stdout, buffer.clone(), "stdout"),
        pump(stderr, buffer.clone(), "stderr"),
    );

    let mut output = buffer.lock().await.clone();
    for (stream, result) in [("stdout", stdout_result), ("stderr", stderr_result)] {
        if let Err(e) = result {
            warn!(stream, error = %e, "Failed reading agent output");
            output.push_str(&format!("[runner] failed reading {}: {}\n", stream, e));
        }
    }

    let code = match status {
        // No code means the agent was killed by a signal.
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            warn!(error = %e, "Failed waiting for agent");
            output.push_str(&format!("[runner] failed waiting for agent: {}\n", e));
            -1
        }
    };
    (code, output)
}

async fn pump<R>(
    stream: Option<R>,
    sink: Arc<Mutex<String>>,
    source: &'static str,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(());
    };
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line);
        debug!(stream = source, "{}", text.trim_end());
        let mut sink = sink.lock().await;
        sink.push_str(&text);
        if !text.ends_with('\n') {
            sink.push('\n');
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A shell script standing in for the interpreter. Positional parameters follow
    /// the real invocation: `$1=-m $2=<module> $3=<input> $4=--out $5=<output>`.
    fn fake(script: &str) -> Candidate {
        Candidate::with_args("sh", ["-c", script, "agent"])
    }

    fn adapter(candidates: Vec<Candidate>) -> (PythonAgentAdapter, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let adapter =
            PythonAgentAdapter::new(candidates, "src.agent.cli".to_string(), dir.path().to_path_buf());
        (adapter, dir)
    }

    #[test]
    fn override_comes_first() {
        let candidates = default_candidates(Some("/opt/venv/bin/python"));
        assert_eq!(candidates[0], Candidate::new("/opt/venv/bin/python"));
        assert!(candidates.len() > 1);
        assert!(default_candidates(None)
            .iter()
            .all(|c| c.program != "/opt/venv/bin/python"));
    }

    #[tokio::test]
    async fn passes_module_and_directories() {
        let (adapter, dir) = adapter(vec![fake(
            r#"[ "$1" = "-m" ] && [ "$2" = "src.agent.cli" ] && [ "$4" = "--out" ] || exit 9
               printf 'docx' > "$5/summaries.docx"
               echo "[INFO] Done."
            "#,
        )]);
        let run = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(run.code, 0);
        assert!(run.succeeded());
        assert!(run.log.starts_with("[runner] trying: sh -c"));
        assert!(run.log.contains("[INFO] Done."));
        assert!(dir.path().join("out/summaries.docx").exists());
    }

    #[tokio::test]
    async fn missing_interpreter_falls_through_to_next() {
        let (adapter, dir) = adapter(vec![
            Candidate::new("/nonexistent/python-for-tests"),
            fake("echo working; exit 3"),
        ]);
        let run = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(run.code, 3);
        assert!(run.log.contains("[runner] trying: /nonexistent/python-for-tests"));
        assert!(run.log.contains("[runner] failed to start /nonexistent/python-for-tests"));
        assert!(run.log.contains("working"));
    }

    #[tokio::test]
    async fn started_candidate_failing_is_final() {
        let (adapter, dir) = adapter(vec![
            fake("echo broken >&2; exit 2"),
            fake(r#"touch "$5/second-ran""#),
        ]);
        let run = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(run.code, 2);
        assert!(!run.succeeded());
        assert!(run.log.contains("broken"));
        assert!(!dir.path().join("out/second-ran").exists());
    }

    #[tokio::test]
    async fn stdout_and_stderr_share_one_log() {
        let (adapter, dir) = adapter(vec![fake("echo out-line; echo err-line >&2; printf tail")]);
        let run = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap();

        assert!(run.log.contains("out-line\n"));
        assert!(run.log.contains("err-line\n"));
        assert!(run.log.contains("tail\n"));
    }

    #[tokio::test]
    async fn killed_agent_reports_minus_one() {
        let (adapter, dir) = adapter(vec![fake("kill -9 $$")]);
        let run = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap();
        assert_eq!(run.code, -1);
    }

    #[tokio::test]
    async fn no_startable_candidate_is_an_error() {
        let (adapter, dir) = adapter(vec![
            Candidate::new("/nonexistent/python-a"),
            Candidate::new("/nonexistent/python-b"),
        ]);
        let err = adapter
            .run(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no Python interpreter could be started"));
        assert!(message.contains("/nonexistent/python-a, /nonexistent/python-b"));
    }
}
