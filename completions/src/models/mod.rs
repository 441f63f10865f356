//! Models module for the completions data model
//!
//! This module contains the row structures and enumerations that represent
//! projects, systems, subsystems, and their completion records in the
//! database.

pub mod domain_models;

// Re-export commonly used types for convenience
pub use domain_models::{
    Criticality, Discipline, ImportLog, Insight, Itr, ItrStatus, ItrType, NewImportLog,
    NewInsight, NewItr, NewPreservationTask, NewProject, NewPunchItem, NewSubsystem, NewSystem,
    NewTag, OverduePreservationTask, PreservationStatus, PreservationTask, Project, ProjectStatus,
    PunchCategory, PunchItem, PunchStatus, Subsystem, System, SystemStatus, SystemWithProject,
    Tag, UpdateProject, UpdateSubsystem, UpdateSystem, UserProfile, UserRole,
};
