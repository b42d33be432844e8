//! services/api/src/lib.rs
//!
//! The HTTP service of the lecture agent: configuration, adapters for the
//! database, the external agent process, and `.docx` packages, plus the axum
//! handlers that tie them together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
