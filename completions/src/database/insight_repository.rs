//! AI insight repository
//!
//! Insights are append-only: the copilot inserts one row per answered
//! question and the UI lists them newest-first. No update or delete path
//! exists on purpose.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{Insight, NewInsight};

#[derive(Clone)]
pub struct InsightRepository {
    pool: PgPool,
}

impl InsightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, fields: &NewInsight) -> Result<Insight> {
        let insight = sqlx::query_as::<_, Insight>(
            r#"
            INSERT INTO ai_insights (id, project_id, system_id, subsystem_id, title, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fields.project_id)
        .bind(fields.system_id)
        .bind(fields.subsystem_id)
        .bind(&fields.title)
        .bind(&fields.content)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create insight")?;

        info!(insight_id = %insight.id, "Persisted insight");
        Ok(insight)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Insight>> {
        let insights = sqlx::query_as::<_, Insight>(
            "SELECT * FROM ai_insights WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list insights")?;

        Ok(insights)
    }
}
