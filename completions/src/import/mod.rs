//! Bulk import of completion records
//!
//! Accepts either a CSV upload or a JSON record array, inserts rows one at
//! a time against the matching table, and records an import log summarizing
//! processed/succeeded/failed counts. A row failure never aborts the run;
//! the log is finalized to `failed` when any row failed.
//!
//! CSV parsing is naive by inherited contract: raw newline and comma
//! splitting with no quoting or escaping support. The import templates are
//! machine-generated without quoted fields; see DESIGN.md for the known
//! gap.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{CompletionRepository, ImportLogRepository};
use crate::error::{CompletionsError, CompletionsResult};
use crate::models::{
    Criticality, ItrStatus, NewImportLog, NewItr, NewPreservationTask, NewPunchItem, NewTag,
    PreservationStatus, PunchStatus,
};
use crate::session::SessionContext;

/// At most this many row errors are returned to the caller; the import log
/// keeps the full list.
const MAX_REPORTED_ERRORS: usize = 10;

/// The entity kinds the importer accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportEntity {
    Itrs,
    Tags,
    PunchItems,
    Preservation,
}

impl ImportEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportEntity::Itrs => "itrs",
            ImportEntity::Tags => "tags",
            ImportEntity::PunchItems => "punch_items",
            ImportEntity::Preservation => "preservation",
        }
    }
}

impl std::str::FromStr for ImportEntity {
    type Err = CompletionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "itrs" => Ok(ImportEntity::Itrs),
            "tags" => Ok(ImportEntity::Tags),
            "punch_items" => Ok(ImportEntity::PunchItems),
            "preservation" => Ok(ImportEntity::Preservation),
            other => Err(CompletionsError::InvalidParameter(format!(
                "unsupported entity_type '{other}'"
            ))),
        }
    }
}

/// One failed row: the record as received plus the failure message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub record: JsonValue,
    pub error: String,
}

/// Outcome of one import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub import_id: Uuid,
    pub records_processed: i32,
    pub records_success: i32,
    pub records_failed: i32,
    /// First few row errors only; the import log has the full list
    pub errors: Vec<RowError>,
}

/// Parse CSV text into header-keyed string records.
///
/// Naive on purpose: splits on raw newlines and commas, trims every cell,
/// drops blank lines, and fills missing trailing cells with empty strings.
pub fn parse_csv(text: &str) -> Vec<JsonValue> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let headers: Vec<String> = match lines.next() {
        Some(header_line) => header_line.split(',').map(|h| h.trim().to_string()).collect(),
        None => return Vec::new(),
    };

    lines
        .map(|line| {
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            let mut record = serde_json::Map::new();
            for (index, header) in headers.iter().enumerate() {
                let value = values.get(index).copied().unwrap_or("");
                record.insert(header.clone(), JsonValue::String(value.to_string()));
            }
            JsonValue::Object(record)
        })
        .collect()
}

// ---- record field helpers ----

fn opt_str(record: &JsonValue, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn req_str(record: &JsonValue, key: &str) -> anyhow::Result<String> {
    opt_str(record, key).ok_or_else(|| anyhow!("missing required field '{key}'"))
}

fn req_uuid(record: &JsonValue, key: &str) -> anyhow::Result<Uuid> {
    let raw = req_str(record, key)?;
    Uuid::parse_str(&raw).with_context(|| format!("field '{key}' is not a valid uuid"))
}

fn opt_uuid(record: &JsonValue, key: &str) -> anyhow::Result<Option<Uuid>> {
    match opt_str(record, key) {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .with_context(|| format!("field '{key}' is not a valid uuid")),
        None => Ok(None),
    }
}

fn req_date(record: &JsonValue, key: &str) -> anyhow::Result<NaiveDate> {
    let raw = req_str(record, key)?;
    raw.parse::<NaiveDate>()
        .with_context(|| format!("field '{key}' is not a valid date"))
}

fn opt_date(record: &JsonValue, key: &str) -> anyhow::Result<Option<NaiveDate>> {
    match opt_str(record, key) {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map(Some)
            .with_context(|| format!("field '{key}' is not a valid date")),
        None => Ok(None),
    }
}

/// Integer field that may arrive as a JSON number (API path) or a string
/// (CSV path).
fn req_i32(record: &JsonValue, key: &str) -> anyhow::Result<i32> {
    match record.get(key) {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| anyhow!("field '{key}' is out of range")),
        Some(JsonValue::String(s)) if !s.trim().is_empty() => s
            .trim()
            .parse::<i32>()
            .with_context(|| format!("field '{key}' is not a valid integer")),
        _ => Err(anyhow!("missing required field '{key}'")),
    }
}

fn parse_enum<T>(raw: &str, key: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| anyhow!("field '{key}': {e}"))
}

// ---- typed record builders ----

fn itr_from_record(record: &JsonValue) -> anyhow::Result<NewItr> {
    Ok(NewItr {
        subsystem_id: req_uuid(record, "subsystem_id")?,
        tag_id: opt_uuid(record, "tag_id")?,
        itr_code: req_str(record, "itr_code")?,
        itr_type: parse_enum(&req_str(record, "itr_type")?, "itr_type")?,
        discipline: parse_enum(&req_str(record, "discipline")?, "discipline")?,
        status: match opt_str(record, "status") {
            Some(raw) => parse_enum(&raw, "status")?,
            None => ItrStatus::NotStarted,
        },
        comments: opt_str(record, "comments"),
    })
}

fn tag_from_record(record: &JsonValue) -> anyhow::Result<NewTag> {
    Ok(NewTag {
        subsystem_id: req_uuid(record, "subsystem_id")?,
        tag_code: req_str(record, "tag_code")?,
        discipline: parse_enum(&req_str(record, "discipline")?, "discipline")?,
        description: opt_str(record, "description"),
        device_type: opt_str(record, "device_type"),
        criticality: match opt_str(record, "criticality") {
            Some(raw) => parse_enum(&raw, "criticality")?,
            None => Criticality::Medium,
        },
    })
}

fn punch_item_from_record(record: &JsonValue) -> anyhow::Result<NewPunchItem> {
    Ok(NewPunchItem {
        subsystem_id: req_uuid(record, "subsystem_id")?,
        tag_id: opt_uuid(record, "tag_id")?,
        category: parse_enum(&req_str(record, "category")?, "category")?,
        description: req_str(record, "description")?,
        status: match opt_str(record, "status") {
            Some(raw) => parse_enum(&raw, "status")?,
            None => PunchStatus::Open,
        },
        raised_by: opt_str(record, "raised_by"),
        due_date: opt_date(record, "due_date")?,
    })
}

fn preservation_from_record(record: &JsonValue) -> anyhow::Result<NewPreservationTask> {
    Ok(NewPreservationTask {
        tag_id: req_uuid(record, "tag_id")?,
        description: req_str(record, "description")?,
        frequency_days: req_i32(record, "frequency_days")?,
        next_due_date: req_date(record, "next_due_date")?,
        status: match opt_str(record, "status") {
            Some(raw) => parse_enum(&raw, "status")?,
            None => PreservationStatus::Ok,
        },
    })
}

/// Bulk importer over the completion tables
#[derive(Clone)]
pub struct ImportService {
    completions: CompletionRepository,
    import_logs: ImportLogRepository,
}

/// Parameters shared by both import paths
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub entity_type: String,
    pub project_id: Uuid,
    pub system_id: Option<Uuid>,
    pub file_name: Option<String>,
}

impl ImportService {
    pub fn new(completions: CompletionRepository, import_logs: ImportLogRepository) -> Self {
        Self {
            completions,
            import_logs,
        }
    }

    /// Import a CSV upload.
    pub async fn import_csv(
        &self,
        session: &SessionContext,
        request: &ImportRequest,
        text: &str,
    ) -> CompletionsResult<ImportOutcome> {
        let entity: ImportEntity = request.entity_type.parse()?;
        let records = parse_csv(text);
        self.run_import(session, "csv", entity, request, records).await
    }

    /// Import a JSON record array.
    pub async fn import_records(
        &self,
        session: &SessionContext,
        request: &ImportRequest,
        records: Vec<JsonValue>,
    ) -> CompletionsResult<ImportOutcome> {
        let entity: ImportEntity = request.entity_type.parse()?;
        self.run_import(session, "api", entity, request, records).await
    }

    async fn run_import(
        &self,
        session: &SessionContext,
        import_type: &str,
        entity: ImportEntity,
        request: &ImportRequest,
        records: Vec<JsonValue>,
    ) -> CompletionsResult<ImportOutcome> {
        info!(
            entity = entity.as_str(),
            records = records.len(),
            import_type,
            "Starting import"
        );

        let log = self
            .import_logs
            .create(&NewImportLog {
                user_id: session.user_id,
                import_type: import_type.to_string(),
                entity_type: entity.as_str().to_string(),
                project_id: Some(request.project_id),
                system_id: request.system_id,
                file_name: request.file_name.clone(),
                records_processed: records.len() as i32,
            })
            .await?;

        let mut success: i32 = 0;
        let mut failed: i32 = 0;
        let mut errors: Vec<RowError> = Vec::new();

        for record in &records {
            match self.insert_record(entity, record).await {
                Ok(()) => success += 1,
                Err(err) => {
                    failed += 1;
                    warn!(entity = entity.as_str(), error = %err, "Import row failed");
                    errors.push(RowError {
                        record: record.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let status = if failed == 0 { "completed" } else { "failed" };
        let error_details = (!errors.is_empty()).then(|| json!(errors));
        self.import_logs
            .finalize(log.id, status, success, failed, error_details)
            .await?;

        errors.truncate(MAX_REPORTED_ERRORS);
        Ok(ImportOutcome {
            import_id: log.id,
            records_processed: records.len() as i32,
            records_success: success,
            records_failed: failed,
            errors,
        })
    }

    async fn insert_record(&self, entity: ImportEntity, record: &JsonValue) -> anyhow::Result<()> {
        match entity {
            ImportEntity::Itrs => {
                let fields = itr_from_record(record)?;
                self.completions.insert_itr(&fields).await?;
            }
            ImportEntity::Tags => {
                let fields = tag_from_record(record)?;
                self.completions.insert_tag(&fields).await?;
            }
            ImportEntity::PunchItems => {
                let fields = punch_item_from_record(record)?;
                self.completions.insert_punch_item(&fields).await?;
            }
            ImportEntity::Preservation => {
                let fields = preservation_from_record(record)?;
                self.completions.insert_preservation_task(&fields).await?;
            }
        }
        Ok(())
    }
}
