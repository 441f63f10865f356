//! Completion records repository
//!
//! Read and insert operations for ITRs, punch items, tags, and preservation
//! tasks. Every read is a filter-by-foreign-key query over a subsystem or
//! tag id set; the inserts are used by the bulk importer.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Itr, NewItr, NewPreservationTask, NewPunchItem, NewTag, OverduePreservationTask,
    PreservationTask, PunchItem, Tag,
};

#[derive(Clone)]
pub struct CompletionRepository {
    pool: PgPool,
}

impl CompletionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // ITRs
    // ============================================

    pub async fn itrs_for_subsystems(&self, subsystem_ids: &[Uuid]) -> Result<Vec<Itr>> {
        let itrs = sqlx::query_as::<_, Itr>(
            "SELECT * FROM itrs WHERE subsystem_id = ANY($1) ORDER BY itr_code",
        )
        .bind(subsystem_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch ITRs for subsystems")?;

        Ok(itrs)
    }

    pub async fn itrs_for_subsystem(&self, subsystem_id: Uuid) -> Result<Vec<Itr>> {
        let itrs = sqlx::query_as::<_, Itr>(
            "SELECT * FROM itrs WHERE subsystem_id = $1 ORDER BY itr_code",
        )
        .bind(subsystem_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch ITRs for subsystem")?;

        Ok(itrs)
    }

    pub async fn insert_itr(&self, fields: &NewItr) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO itrs (id, subsystem_id, tag_id, itr_code, itr_type, discipline, status, comments, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(fields.subsystem_id)
        .bind(fields.tag_id)
        .bind(&fields.itr_code)
        .bind(fields.itr_type)
        .bind(fields.discipline)
        .bind(fields.status)
        .bind(&fields.comments)
        .execute(&self.pool)
        .await
        .context("Failed to insert ITR")?;

        Ok(id)
    }

    // ============================================
    // Punch items
    // ============================================

    pub async fn punch_items_for_subsystems(
        &self,
        subsystem_ids: &[Uuid],
    ) -> Result<Vec<PunchItem>> {
        let items = sqlx::query_as::<_, PunchItem>(
            "SELECT * FROM punch_items WHERE subsystem_id = ANY($1) ORDER BY created_at",
        )
        .bind(subsystem_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch punch items for subsystems")?;

        Ok(items)
    }

    pub async fn punch_items_for_subsystem(&self, subsystem_id: Uuid) -> Result<Vec<PunchItem>> {
        let items = sqlx::query_as::<_, PunchItem>(
            "SELECT * FROM punch_items WHERE subsystem_id = $1 ORDER BY created_at",
        )
        .bind(subsystem_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch punch items for subsystem")?;

        Ok(items)
    }

    /// Open category-A punch items, the energization blockers
    pub async fn open_punch_a_for_subsystems(
        &self,
        subsystem_ids: &[Uuid],
    ) -> Result<Vec<PunchItem>> {
        let items = sqlx::query_as::<_, PunchItem>(
            r#"
            SELECT * FROM punch_items
            WHERE subsystem_id = ANY($1)
              AND category = 'A'
              AND status IN ('OPEN', 'IN_PROGRESS')
            ORDER BY due_date NULLS LAST
            "#,
        )
        .bind(subsystem_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch open category-A punch items")?;

        Ok(items)
    }

    pub async fn insert_punch_item(&self, fields: &NewPunchItem) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO punch_items (id, subsystem_id, tag_id, category, description, status, raised_by, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(fields.subsystem_id)
        .bind(fields.tag_id)
        .bind(fields.category)
        .bind(&fields.description)
        .bind(fields.status)
        .bind(&fields.raised_by)
        .bind(fields.due_date)
        .execute(&self.pool)
        .await
        .context("Failed to insert punch item")?;

        Ok(id)
    }

    // ============================================
    // Tags
    // ============================================

    pub async fn tags_for_subsystems(&self, subsystem_ids: &[Uuid]) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE subsystem_id = ANY($1) ORDER BY tag_code",
        )
        .bind(subsystem_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tags for subsystems")?;

        Ok(tags)
    }

    pub async fn tags_for_subsystem(&self, subsystem_id: Uuid) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE subsystem_id = $1 ORDER BY tag_code",
        )
        .bind(subsystem_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch tags for subsystem")?;

        Ok(tags)
    }

    pub async fn insert_tag(&self, fields: &NewTag) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tags (id, subsystem_id, tag_code, discipline, description, device_type, criticality, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(fields.subsystem_id)
        .bind(&fields.tag_code)
        .bind(fields.discipline)
        .bind(&fields.description)
        .bind(&fields.device_type)
        .bind(fields.criticality)
        .execute(&self.pool)
        .await
        .context("Failed to insert tag")?;

        Ok(id)
    }

    // ============================================
    // Preservation tasks
    // ============================================

    pub async fn preservation_for_tags(&self, tag_ids: &[Uuid]) -> Result<Vec<PreservationTask>> {
        let tasks = sqlx::query_as::<_, PreservationTask>(
            "SELECT * FROM preservation_tasks WHERE tag_id = ANY($1) ORDER BY next_due_date",
        )
        .bind(tag_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch preservation tasks for tags")?;

        Ok(tasks)
    }

    /// Overdue preservation tasks joined with their tag code, for prose
    pub async fn overdue_preservation_for_tags(
        &self,
        tag_ids: &[Uuid],
    ) -> Result<Vec<OverduePreservationTask>> {
        let tasks = sqlx::query_as::<_, OverduePreservationTask>(
            r#"
            SELECT p.id, p.tag_id, t.tag_code, p.description, p.next_due_date
            FROM preservation_tasks p
            JOIN tags t ON t.id = p.tag_id
            WHERE p.tag_id = ANY($1) AND p.status = 'OVERDUE'
            ORDER BY p.next_due_date
            "#,
        )
        .bind(tag_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch overdue preservation tasks")?;

        Ok(tasks)
    }

    pub async fn insert_preservation_task(&self, fields: &NewPreservationTask) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO preservation_tasks (id, tag_id, description, frequency_days, next_due_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(fields.tag_id)
        .bind(&fields.description)
        .bind(fields.frequency_days)
        .bind(fields.next_due_date)
        .bind(fields.status)
        .execute(&self.pool)
        .await
        .context("Failed to insert preservation task")?;

        Ok(id)
    }
}
