//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, storage and scoring calls into use-case APIs.
//! - Keep callers (CLI, future HTTP layer) decoupled from storage details.

pub mod contractor_service;
pub mod dashboard_service;
pub mod feedback_service;
pub mod project_service;

/// Raw uploaded file as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}
