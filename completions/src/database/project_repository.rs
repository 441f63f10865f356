//! Project hierarchy repository
//!
//! CRUD and lookup operations for the project -> system -> subsystem
//! hierarchy. The KPI aggregator only needs the id-resolution queries; the
//! admin screens use the rest.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    NewProject, NewSubsystem, NewSystem, Project, Subsystem, System, SystemWithProject,
    UpdateProject, UpdateSubsystem, UpdateSystem,
};

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Projects
    // ============================================

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list projects")?;

        Ok(projects)
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get project")?;

        Ok(project)
    }

    pub async fn create_project(&self, fields: &NewProject) -> Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, code, name, description, location, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create project")?;

        Ok(project)
    }

    pub async fn update_project(&self, project_id: Uuid, fields: &UpdateProject) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET code = COALESCE($1, code),
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(fields.status)
        .bind(project_id)
        .execute(&self.pool)
        .await
        .context("Failed to update project")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_project(&self, project_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete project")?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Systems
    // ============================================

    pub async fn systems_for_project(&self, project_id: Uuid) -> Result<Vec<System>> {
        let systems = sqlx::query_as::<_, System>(
            "SELECT * FROM systems WHERE project_id = $1 ORDER BY code",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list systems for project")?;

        Ok(systems)
    }

    pub async fn get_system(&self, system_id: Uuid) -> Result<Option<System>> {
        let system = sqlx::query_as::<_, System>("SELECT * FROM systems WHERE id = $1")
            .bind(system_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get system")?;

        Ok(system)
    }

    /// System joined with its owning project, for prose generation
    pub async fn get_system_with_project(
        &self,
        system_id: Uuid,
    ) -> Result<Option<SystemWithProject>> {
        let system = sqlx::query_as::<_, SystemWithProject>(
            r#"
            SELECT s.id, s.code, s.name, s.status, s.criticality,
                   p.id AS project_id, p.code AS project_code, p.name AS project_name
            FROM systems s
            JOIN projects p ON p.id = s.project_id
            WHERE s.id = $1
            "#,
        )
        .bind(system_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get system with project")?;

        Ok(system)
    }

    pub async fn create_system(&self, fields: &NewSystem) -> Result<System> {
        let system = sqlx::query_as::<_, System>(
            r#"
            INSERT INTO systems (id, project_id, code, name, description, criticality, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fields.project_id)
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.criticality)
        .bind(fields.status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create system")?;

        Ok(system)
    }

    pub async fn update_system(&self, system_id: Uuid, fields: &UpdateSystem) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE systems
            SET code = COALESCE($1, code),
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                criticality = COALESCE($4, criticality),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.criticality)
        .bind(fields.status)
        .bind(system_id)
        .execute(&self.pool)
        .await
        .context("Failed to update system")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_system(&self, system_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM systems WHERE id = $1")
            .bind(system_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete system")?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Subsystems
    // ============================================

    pub async fn subsystems_for_system(&self, system_id: Uuid) -> Result<Vec<Subsystem>> {
        let subsystems = sqlx::query_as::<_, Subsystem>(
            "SELECT * FROM subsystems WHERE system_id = $1 ORDER BY code",
        )
        .bind(system_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list subsystems for system")?;

        Ok(subsystems)
    }

    pub async fn subsystems_for_systems(&self, system_ids: &[Uuid]) -> Result<Vec<Subsystem>> {
        let subsystems = sqlx::query_as::<_, Subsystem>(
            "SELECT * FROM subsystems WHERE system_id = ANY($1) ORDER BY code",
        )
        .bind(system_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list subsystems for systems")?;

        Ok(subsystems)
    }

    /// Resolve the subsystem ids under a system; the first step of every
    /// system-level aggregation.
    pub async fn subsystem_ids(&self, system_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM subsystems WHERE system_id = $1",
        )
        .bind(system_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to resolve subsystem ids")?;

        Ok(ids)
    }

    pub async fn get_subsystem(&self, subsystem_id: Uuid) -> Result<Option<Subsystem>> {
        let subsystem = sqlx::query_as::<_, Subsystem>("SELECT * FROM subsystems WHERE id = $1")
            .bind(subsystem_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get subsystem")?;

        Ok(subsystem)
    }

    pub async fn create_subsystem(&self, fields: &NewSubsystem) -> Result<Subsystem> {
        let subsystem = sqlx::query_as::<_, Subsystem>(
            r#"
            INSERT INTO subsystems (id, system_id, code, name, description, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fields.system_id)
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create subsystem")?;

        Ok(subsystem)
    }

    pub async fn update_subsystem(
        &self,
        subsystem_id: Uuid,
        fields: &UpdateSubsystem,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subsystems
            SET code = COALESCE($1, code),
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&fields.code)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.status)
        .bind(subsystem_id)
        .execute(&self.pool)
        .await
        .context("Failed to update subsystem")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_subsystem(&self, subsystem_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subsystems WHERE id = $1")
            .bind(subsystem_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete subsystem")?;

        Ok(result.rows_affected() > 0)
    }
}
