//! Domain models for the completions data model
//!
//! These structures map one-to-one onto the hosted Postgres tables. The core
//! treats every row as a read-mostly snapshot fetched per request; only
//! insights and import logs are written here, and both are append-only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    Execution,
    Completions,
    Closed,
}

/// System / subsystem progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "system_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    NotStarted,
    InProgress,
    ReadyForEnergization,
    Energized,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::NotStarted => "NOT_STARTED",
            SystemStatus::InProgress => "IN_PROGRESS",
            SystemStatus::ReadyForEnergization => "READY_FOR_ENERGIZATION",
            SystemStatus::Energized => "ENERGIZED",
        }
    }
}

/// Severity classification on systems and tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "criticality", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Criticality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Criticality::Low),
            "MEDIUM" => Ok(Criticality::Medium),
            "HIGH" => Ok(Criticality::High),
            other => Err(format!("unknown criticality '{other}'")),
        }
    }
}

/// Engineering discipline of tags and ITRs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "discipline", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Discipline {
    Mech,
    Elec,
    Inst,
    Civil,
    Pipe,
    Other,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Mech => "MECH",
            Discipline::Elec => "ELEC",
            Discipline::Inst => "INST",
            Discipline::Civil => "CIVIL",
            Discipline::Pipe => "PIPE",
            Discipline::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MECH" => Ok(Discipline::Mech),
            "ELEC" => Ok(Discipline::Elec),
            "INST" => Ok(Discipline::Inst),
            "CIVIL" => Ok(Discipline::Civil),
            "PIPE" => Ok(Discipline::Pipe),
            "OTHER" => Ok(Discipline::Other),
            other => Err(format!("unknown discipline '{other}'")),
        }
    }
}

/// ITR phase: A = construction, B = precommissioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "itr_type", rename_all = "UPPERCASE")]
pub enum ItrType {
    A,
    B,
}

impl std::str::FromStr for ItrType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(ItrType::A),
            "B" => Ok(ItrType::B),
            other => Err(format!("unknown itr_type '{other}'")),
        }
    }
}

/// ITR verification status. Transitions are externally driven; the core
/// never validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "itr_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItrStatus {
    NotStarted,
    InProgress,
    Completed,
    Rejected,
}

impl std::str::FromStr for ItrStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(ItrStatus::NotStarted),
            "IN_PROGRESS" => Ok(ItrStatus::InProgress),
            "COMPLETED" => Ok(ItrStatus::Completed),
            "REJECTED" => Ok(ItrStatus::Rejected),
            other => Err(format!("unknown itr_status '{other}'")),
        }
    }
}

/// Punch severity category; open category-A items block energization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "punch_category", rename_all = "UPPERCASE")]
pub enum PunchCategory {
    A,
    B,
    C,
}

impl std::str::FromStr for PunchCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(PunchCategory::A),
            "B" => Ok(PunchCategory::B),
            "C" => Ok(PunchCategory::C),
            other => Err(format!("unknown punch_category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "punch_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchStatus {
    Open,
    InProgress,
    Closed,
}

impl std::str::FromStr for PunchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(PunchStatus::Open),
            "IN_PROGRESS" => Ok(PunchStatus::InProgress),
            "CLOSED" => Ok(PunchStatus::Closed),
            other => Err(format!("unknown punch_status '{other}'")),
        }
    }
}

/// Preservation task state. OVERDUE is set by the maintenance cycle,
/// independently of the due date stored on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "preservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PreservationStatus {
    Ok,
    Overdue,
}

impl std::str::FromStr for PreservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(PreservationStatus::Ok),
            "OVERDUE" => Ok(PreservationStatus::Overdue),
            other => Err(format!("unknown preservation_status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Manager,
    Qaqc,
    Precom,
    Viewer,
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// System row; belongs to exactly one project
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct System {
    pub id: Uuid,
    pub project_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub criticality: Option<Criticality>,
    pub status: Option<SystemStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Subsystem row; belongs to exactly one system
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subsystem {
    pub id: Uuid,
    pub system_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<SystemStatus>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Tag (equipment instance) row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub subsystem_id: Uuid,
    pub tag_code: String,
    pub discipline: Discipline,
    pub description: Option<String>,
    pub device_type: Option<String>,
    pub criticality: Option<Criticality>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Inspection & Test Record row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Itr {
    pub id: Uuid,
    pub subsystem_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub itr_code: String,
    pub itr_type: ItrType,
    pub discipline: Discipline,
    pub status: Option<ItrStatus>,
    pub comments: Option<String>,
    pub last_update: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Punch item row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PunchItem {
    pub id: Uuid,
    pub subsystem_id: Uuid,
    pub tag_id: Option<Uuid>,
    pub category: PunchCategory,
    pub description: String,
    pub status: Option<PunchStatus>,
    pub raised_by: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Preservation task row; belongs to a tag
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreservationTask {
    pub id: Uuid,
    pub tag_id: Uuid,
    pub description: String,
    pub frequency_days: i32,
    pub next_due_date: NaiveDate,
    pub last_done_date: Option<NaiveDate>,
    pub status: Option<PreservationStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// AI insight row; append-only, produced by the copilot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Insight {
    pub id: Uuid,
    pub project_id: Uuid,
    pub system_id: Option<Uuid>,
    pub subsystem_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Import log row; append-only, produced by the bulk importer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImportLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub import_type: String,
    pub entity_type: String,
    pub project_id: Option<Uuid>,
    pub system_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub records_processed: Option<i32>,
    pub records_success: Option<i32>,
    pub records_failed: Option<i32>,
    pub status: Option<String>,
    pub error_details: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Option<UserRole>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// System joined with its owning project, as consumed by the copilot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemWithProject {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub status: Option<SystemStatus>,
    pub criticality: Option<Criticality>,
    pub project_id: Uuid,
    pub project_code: String,
    pub project_name: String,
}

/// Overdue preservation task joined with its tag code, as consumed by the
/// copilot context builder
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OverduePreservationTask {
    pub id: Uuid,
    pub tag_id: Uuid,
    pub tag_code: String,
    pub description: String,
    pub next_due_date: NaiveDate,
}

/// Request to create a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Partial update of a project; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSystem {
    pub project_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub criticality: Option<Criticality>,
    pub status: Option<SystemStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSystem {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub criticality: Option<Criticality>,
    pub status: Option<SystemStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubsystem {
    pub system_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<SystemStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubsystem {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<SystemStatus>,
}

/// Typed ITR insert, as produced by the bulk importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItr {
    pub subsystem_id: Uuid,
    pub tag_id: Option<Uuid>,
    pub itr_code: String,
    pub itr_type: ItrType,
    pub discipline: Discipline,
    pub status: ItrStatus,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub subsystem_id: Uuid,
    pub tag_code: String,
    pub discipline: Discipline,
    pub description: Option<String>,
    pub device_type: Option<String>,
    pub criticality: Criticality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPunchItem {
    pub subsystem_id: Uuid,
    pub tag_id: Option<Uuid>,
    pub category: PunchCategory,
    pub description: String,
    pub status: PunchStatus,
    pub raised_by: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPreservationTask {
    pub tag_id: Uuid,
    pub description: String,
    pub frequency_days: i32,
    pub next_due_date: NaiveDate,
    pub status: PreservationStatus,
}

/// Request to persist a copilot answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInsight {
    pub project_id: Uuid,
    pub system_id: Option<Uuid>,
    pub subsystem_id: Option<Uuid>,
    pub title: String,
    pub content: String,
}

/// Request to open an import log in `processing` state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImportLog {
    pub user_id: Uuid,
    pub import_type: String,
    pub entity_type: String,
    pub project_id: Option<Uuid>,
    pub system_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub records_processed: i32,
}
