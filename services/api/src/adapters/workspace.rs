//! services/api/src/adapters/workspace.rs
//!
//! Filesystem layout for jobs. Every job owns an input and an output directory
//! under `<root>/jobs/<job_id>/`, so concurrent jobs never see each other's files.

use lecture_agent_core::domain::{Artifact, JobId, StoredFile};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

const DOCUMENT_EXTENSION: &str = "docx";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn job_dir(&self, job: JobId) -> PathBuf {
        self.jobs_dir().join(job.to_string())
    }

    pub fn input_dir(&self, job: JobId) -> PathBuf {
        self.job_dir(job).join("input")
    }

    pub fn output_dir(&self, job: JobId) -> PathBuf {
        self.job_dir(job).join("output")
    }

    pub async fn exists(&self, job: JobId) -> bool {
        fs::metadata(self.job_dir(job))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Empties the job's input and output directories, creating them if needed.
    pub async fn reset(&self, job: JobId) -> io::Result<()> {
        clear_dir(&self.input_dir(job)).await?;
        clear_dir(&self.output_dir(job)).await?;
        debug!(%job, "Job workspace reset");
        Ok(())
    }

    /// Starts a private staging area for an upload. Nothing in any job changes
    /// until the staged files are committed.
    pub async fn stage(&self) -> io::Result<Staging> {
        let dir = self.root.join("staging").join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir).await?;
        Ok(Staging {
            dir,
            files: Vec::new(),
        })
    }

    /// Names of the regular files in the job's input directory, sorted.
    pub async fn list_inputs(&self, job: JobId) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = list_files(&self.input_dir(job))
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Every `.docx` file in the job's output directory, sorted by name.
    pub async fn list_artifacts(&self, job: JobId) -> io::Result<Vec<Artifact>> {
        let mut artifacts: Vec<Artifact> = list_files(&self.output_dir(job))
            .await?
            .into_iter()
            .filter(|(name, _)| {
                Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
            })
            .map(|(name, size)| Artifact { name, size })
            .collect();
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }

    /// The path of an output file, if it exists. `name` must already be validated.
    pub async fn artifact_path(&self, job: JobId, name: &str) -> Option<PathBuf> {
        let path = self.output_dir(job).join(name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    pub async fn remove(&self, job: JobId) -> io::Result<()> {
        match fs::remove_dir_all(self.job_dir(job)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub async fn remove_all(&self) -> io::Result<()> {
        clear_dir(&self.jobs_dir()).await
    }
}

/// Uploaded files held aside until the whole upload has been accepted.
#[derive(Debug)]
pub struct Staging {
    dir: PathBuf,
    files: Vec<StoredFile>,
}

impl Staging {
    /// Opens `<staging>/<name>` for writing, replacing any file of the same name.
    /// Only the final path component of `name` is used.
    pub async fn create_file(&self, name: &str) -> io::Result<InputFile> {
        let name = sanitize_file_name(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unusable file name '{}'", name))
        })?;
        let file = fs::File::create(self.dir.join(&name)).await?;
        Ok(InputFile {
            name,
            file,
            size: 0,
        })
    }

    /// Records a finished file. A repeated name keeps one entry with the latest size.
    pub fn add(&mut self, stored: StoredFile) {
        match self.files.iter_mut().find(|f| f.name == stored.name) {
            Some(existing) => *existing = stored,
            None => self.files.push(stored),
        }
    }

    /// Replaces the job's input with the staged files and empties its output.
    pub async fn commit(self, workspace: &Workspace, job: JobId) -> io::Result<Vec<StoredFile>> {
        workspace.reset(job).await?;
        let input_dir = workspace.input_dir(job);
        for file in &self.files {
            fs::rename(self.dir.join(&file.name), input_dir.join(&file.name)).await?;
        }
        fs::remove_dir_all(&self.dir).await?;
        debug!(%job, count = self.files.len(), "Staged upload committed");
        Ok(self.files)
    }

    /// Throws the staged files away.
    pub async fn discard(self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir).await
    }
}

/// A file being written into a staging area.
pub struct InputFile {
    name: String,
    file: fs::File,
    size: u64,
}

impl InputFile {
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> io::Result<StoredFile> {
        self.file.flush().await?;
        Ok(StoredFile {
            name: self.name,
            size: self.size,
        })
    }
}

fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

async fn clear_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(entry.path()).await?;
        } else {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

async fn list_files(dir: &Path) -> io::Result<Vec<(String, u64)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if meta.is_file() {
            files.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
        }
    }
    Ok(files)
}
