//! Import log repository
//!
//! An import log is opened in `processing` state before any row insert and
//! finalized once with the outcome counts. Logs are append-only apart from
//! that single finalize step.

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ImportLog, NewImportLog};

#[derive(Clone)]
pub struct ImportLogRepository {
    pool: PgPool,
}

impl ImportLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, fields: &NewImportLog) -> Result<ImportLog> {
        let log = sqlx::query_as::<_, ImportLog>(
            r#"
            INSERT INTO import_logs
                (id, user_id, import_type, entity_type, project_id, system_id, file_name, records_processed, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'processing', NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fields.user_id)
        .bind(&fields.import_type)
        .bind(&fields.entity_type)
        .bind(fields.project_id)
        .bind(fields.system_id)
        .bind(&fields.file_name)
        .bind(fields.records_processed)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create import log")?;

        Ok(log)
    }

    pub async fn finalize(
        &self,
        import_id: Uuid,
        status: &str,
        records_success: i32,
        records_failed: i32,
        error_details: Option<JsonValue>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE import_logs
            SET status = $1, records_success = $2, records_failed = $3, error_details = $4
            WHERE id = $5
            "#,
        )
        .bind(status)
        .bind(records_success)
        .bind(records_failed)
        .bind(error_details)
        .bind(import_id)
        .execute(&self.pool)
        .await
        .context("Failed to finalize import log")?;

        Ok(())
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ImportLog>> {
        let logs = sqlx::query_as::<_, ImportLog>(
            "SELECT * FROM import_logs WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list import logs")?;

        Ok(logs)
    }
}
