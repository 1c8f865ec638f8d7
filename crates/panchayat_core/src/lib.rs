//! Core domain logic for the Panchayat transparency backend.
//! This crate is the single source of truth for project, feedback and
//! contractor invariants, the risk evaluator and photo integrity checks.

pub mod config;
pub mod db;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod risk;
pub mod service;
pub mod storage;

pub use config::{ConfigError, PanchayatConfig};
pub use integrity::{IntegrityChecker, IntegrityGate, IntegrityPolicy, IntegrityVerdict};
pub use logging::{default_log_level, init_console_logging, init_logging, logging_status};
pub use model::project::{NewProject, Project, ProjectId, ProjectPatch, ProjectStatus};
pub use notify::{LogNotifier, Notifier};
pub use repo::{RegionScope, RepoError, RepoResult};
pub use risk::{evaluate, RiskAssessment, RiskError, RiskInput, RiskLevel, RiskScore, RiskStrategy};
pub use storage::{FileStore, LocalFileStore, StorageError};
