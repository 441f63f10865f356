//! Reporting snapshot export
//!
//! Bundles everything under a project (optionally narrowed to one system)
//! into a single JSON document for BI tooling: a metadata header, the six
//! entity arrays, and a small rollup KPI block. A snapshot, not a live
//! view — the sequential fetches are not transactionally consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{CompletionRepository, ProjectRepository};
use crate::error::{CompletionsError, CompletionsResult};
use crate::models::{
    Itr, ItrStatus, PreservationStatus, PreservationTask, Project, PunchCategory, PunchItem,
    PunchStatus, Subsystem, System, Tag,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub project: Project,
    pub export_date: DateTime<Utc>,
    pub systems_count: usize,
    pub subsystems_count: usize,
}

/// Project-wide rollup counts included with every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupKpis {
    pub total_itrs: i64,
    pub completed_itrs: i64,
    pub total_punch_a: i64,
    pub open_punch_a: i64,
    pub overdue_preservation: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub metadata: SnapshotMetadata,
    pub systems: Vec<System>,
    pub subsystems: Vec<Subsystem>,
    pub itrs: Vec<Itr>,
    pub tags: Vec<Tag>,
    pub punch_items: Vec<PunchItem>,
    pub preservation_tasks: Vec<PreservationTask>,
    pub kpis: RollupKpis,
}

/// Reduce the fetched rows into the rollup block. Only punch items with
/// status OPEN count as open here — IN_PROGRESS is excluded on purpose,
/// matching the report consumers' definition.
pub fn rollup_kpis(
    itrs: &[Itr],
    punch_items: &[PunchItem],
    preservation_tasks: &[PreservationTask],
) -> RollupKpis {
    RollupKpis {
        total_itrs: itrs.len() as i64,
        completed_itrs: itrs
            .iter()
            .filter(|i| i.status == Some(ItrStatus::Completed))
            .count() as i64,
        total_punch_a: punch_items
            .iter()
            .filter(|p| p.category == PunchCategory::A)
            .count() as i64,
        open_punch_a: punch_items
            .iter()
            .filter(|p| p.category == PunchCategory::A && p.status == Some(PunchStatus::Open))
            .count() as i64,
        overdue_preservation: preservation_tasks
            .iter()
            .filter(|t| t.status == Some(PreservationStatus::Overdue))
            .count() as i64,
    }
}

#[derive(Clone)]
pub struct ExportService {
    projects: ProjectRepository,
    completions: CompletionRepository,
}

impl ExportService {
    pub fn new(projects: ProjectRepository, completions: CompletionRepository) -> Self {
        Self {
            projects,
            completions,
        }
    }

    /// Build the snapshot. Unlike the dashboard KPIs, a failed fetch here
    /// aborts the export — a report silently missing a table would be worse
    /// than no report.
    pub async fn export_project(
        &self,
        project_id: Uuid,
        system_id: Option<Uuid>,
    ) -> CompletionsResult<ProjectSnapshot> {
        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| {
                CompletionsError::InvalidParameter(format!("project {project_id} not found"))
            })?;

        let mut systems = self.projects.systems_for_project(project_id).await?;
        if let Some(system_id) = system_id {
            systems.retain(|s| s.id == system_id);
        }
        let system_ids: Vec<Uuid> = systems.iter().map(|s| s.id).collect();

        let subsystems = self.projects.subsystems_for_systems(&system_ids).await?;
        let subsystem_ids: Vec<Uuid> = subsystems.iter().map(|s| s.id).collect();

        let itrs = self.completions.itrs_for_subsystems(&subsystem_ids).await?;
        let tags = self.completions.tags_for_subsystems(&subsystem_ids).await?;
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        let punch_items = self
            .completions
            .punch_items_for_subsystems(&subsystem_ids)
            .await?;
        let preservation_tasks = self.completions.preservation_for_tags(&tag_ids).await?;

        let kpis = rollup_kpis(&itrs, &punch_items, &preservation_tasks);

        Ok(ProjectSnapshot {
            metadata: SnapshotMetadata {
                project,
                export_date: Utc::now(),
                systems_count: systems.len(),
                subsystems_count: subsystems.len(),
            },
            systems,
            subsystems,
            itrs,
            tags,
            punch_items,
            preservation_tasks,
            kpis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Discipline, ItrType};

    fn itr(status: ItrStatus) -> Itr {
        Itr {
            id: Uuid::new_v4(),
            subsystem_id: Some(Uuid::new_v4()),
            tag_id: None,
            itr_code: "ITR".to_string(),
            itr_type: ItrType::A,
            discipline: Discipline::Mech,
            status: Some(status),
            comments: None,
            last_update: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn punch(category: PunchCategory, status: PunchStatus) -> PunchItem {
        PunchItem {
            id: Uuid::new_v4(),
            subsystem_id: Uuid::new_v4(),
            tag_id: None,
            category,
            description: "defect".to_string(),
            status: Some(status),
            raised_by: None,
            due_date: None,
            closed_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_rollup_counts() {
        let itrs = vec![
            itr(ItrStatus::Completed),
            itr(ItrStatus::Completed),
            itr(ItrStatus::InProgress),
        ];
        let punch_items = vec![
            punch(PunchCategory::A, PunchStatus::Open),
            // in-progress category A counts toward total but not open
            punch(PunchCategory::A, PunchStatus::InProgress),
            punch(PunchCategory::B, PunchStatus::Open),
        ];
        let kpis = rollup_kpis(&itrs, &punch_items, &[]);
        assert_eq!(
            kpis,
            RollupKpis {
                total_itrs: 3,
                completed_itrs: 2,
                total_punch_a: 2,
                open_punch_a: 1,
                overdue_preservation: 0,
            }
        );
    }
}
