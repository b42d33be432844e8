//! crates/lecture_agent_core/src/preview.rs
//!
//! Turns the text runs of a generated document into something a browser can show:
//! plain paragraph HTML for summaries and formula sheets, question/answer cards
//! for flashcards. Works on already-extracted runs; reading the package itself is
//! the job of a `DocumentTextReader`.

use crate::domain::Flashcard;
use regex::Regex;
use std::sync::LazyLock;

/// A run that is nothing but a path or file name of an uploaded lecture document.
/// Generated documents use these as section headers.
static INPUT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z]:)?[\\/]?(?:[^\\/\r\n]+[\\/])*[^\\/\r\n]+\.(?:pdf|txt|docx?|pptx?|md)$")
        .unwrap()
});

static QUESTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*q(?:uestion)?\s*\d*\s*[:.]").unwrap());

static ANSWER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*a(?:nswer)?\s*\d*\s*[:.]").unwrap());

static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:q(?:uestion)?|a(?:nswer)?)\s*\d*\s*[:.)]\s*|[•·▪◦*\-–—]+\s+)").unwrap()
});

static HEADER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:flashcards|summary|contents|study)").unwrap());

/// True when the whole run looks like a path ending in a known input extension.
pub fn is_input_path(run: &str) -> bool {
    INPUT_PATH.is_match(run.trim())
}

/// Drops blank runs and runs that merely name an input file.
pub fn filter_runs<I>(runs: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    runs.into_iter()
        .filter(|run| !run.trim().is_empty() && !is_input_path(run))
        .collect()
}

/// Renders each run as its own paragraph.
pub fn render_paragraphs(runs: &[String]) -> String {
    runs.iter()
        .map(|run| format!("<p>{}</p>", escape_html(run)))
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reconstructs question/answer pairs from the runs of a flashcards document.
///
/// Prefixed runs (`Q:`, `Answer:`, `Q3.` ...) are honoured; unprefixed runs
/// alternate between question and answer. A leading header-like pair is dropped
/// and labels are stripped from what remains.
pub fn pair_flashcards(runs: &[String]) -> Vec<Flashcard> {
    let mut cards = Vec::new();
    let mut pending: Option<&str> = None;

    for run in runs {
        if QUESTION_PREFIX.is_match(run) {
            if let Some(question) = pending.take() {
                cards.push(Flashcard::new(question, ""));
            }
            pending = Some(run.as_str());
        } else if ANSWER_PREFIX.is_match(run) {
            if let Some(question) = pending.take() {
                cards.push(Flashcard::new(question, run.as_str()));
            }
        } else {
            match pending.take() {
                Some(question) => cards.push(Flashcard::new(question, run.as_str())),
                None => pending = Some(run.as_str()),
            }
        }
    }
    if let Some(question) = pending {
        cards.push(Flashcard::new(question, ""));
    }

    if cards.first().is_some_and(looks_like_header) {
        cards.remove(0);
    }

    cards
        .into_iter()
        .map(|card| Flashcard::new(strip_label(&card.question), strip_label(&card.answer)))
        .collect()
}

fn looks_like_header(card: &Flashcard) -> bool {
    card.answer.trim().is_empty()
        || card.question.split_whitespace().count() < 3
        || HEADER_WORD.is_match(&card.question)
}

fn strip_label(text: &str) -> String {
    LEADING_LABEL.replace(text, "").trim().to_string()
}
