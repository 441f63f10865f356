//! Completions Hub core
//!
//! Backend library for a precommissioning/completions tracking dashboard:
//! projects own systems, systems own subsystems, and subsystems carry the
//! completion records — ITRs, punch items, tags, and preservation tasks —
//! that the KPI aggregator reduces into dashboard metrics and the AI
//! copilot turns into prose answers.
//!
//! The hosted Postgres store, the authentication service, and the
//! chat-completion provider are external collaborators; this crate only
//! fetches, reduces, and writes the two append-only tables it owns
//! (`ai_insights` and `import_logs`).

// Core error handling
pub mod error;

// Row structures and enumerations
pub mod models;

// Connection pooling and table-scoped repositories
pub mod database;

// Derived completion metrics
pub mod kpi;

// Natural-language question answering
pub mod copilot;

// Bulk CSV/JSON import
pub mod import;

// Reporting snapshot export
pub mod export;

// Session identity and the auth collaborator
pub mod session;

pub use error::{CompletionsError, CompletionsResult};
