//! services/api/src/adapters/docx.rs
//!
//! Implements the `DocumentTextReader` port for `.docx` packages: a zip archive
//! whose `word/document.xml` part holds the text in `<w:t>` elements.

use async_trait::async_trait;
use lecture_agent_core::ports::{DocumentTextReader, PortError, PortResult};
use quick_xml::{events::Event, Reader};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use zip::{result::ZipError, ZipArchive};

const DOCUMENT_PART: &str = "word/document.xml";
const TEXT_RUN: &[u8] = b"w:t";

/// Reads text runs from `.docx` files on a blocking thread.
#[derive(Debug, Clone, Default)]
pub struct DocxTextReader;

#[async_trait]
impl DocumentTextReader for DocxTextReader {
    async fn read_text_runs(&self, path: &Path) -> PortResult<Vec<String>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_package(&path))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}

fn read_package(path: &Path) -> PortResult<Vec<String>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PortError::NotFound(format!("{} not found", path.display())),
        _ => PortError::Unexpected(e.to_string()),
    })?;

    let mut archive = ZipArchive::new(file).map_err(|e| {
        PortError::Unexpected(format!("{} is not a document package: {}", path.display(), e))
    })?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
        ZipError::FileNotFound => PortError::NotFound(format!(
            "{} has no {} part",
            path.display(),
            DOCUMENT_PART
        )),
        other => PortError::Unexpected(other.to_string()),
    })?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    text_runs(&xml)
}

/// Collects the content of every `<w:t>` element in document order, one string each.
pub fn text_runs(xml: &str) -> PortResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut runs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == TEXT_RUN => current = Some(String::new()),
            Ok(Event::End(e)) if e.name().as_ref() == TEXT_RUN => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == TEXT_RUN => runs.push(String::new()),
            Ok(Event::Text(text)) => {
                if let Some(run) = current.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?;
                    run.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(run) = current.as_mut() {
                    run.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "malformed document XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok(runs)
}
