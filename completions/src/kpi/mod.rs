//! KPI aggregation for systems and subsystems
//!
//! Computes derived completion metrics on demand: ITR completion
//! percentages per type, punch open/closed counts, and preservation
//! due-date classifications. Pure read-and-reduce — no caching, no
//! persistence of results, every call re-fetches from the store.
//!
//! Dependent collection fetches run through [`fetch_or_empty`], so a failed
//! sub-fetch degrades its counts to zero instead of failing the whole
//! aggregation. Only the initial subsystem-id resolution propagates its
//! error.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::database::{CompletionRepository, ProjectRepository};
use crate::error::CompletionsResult;
use crate::models::{
    Itr, ItrStatus, ItrType, PreservationStatus, PreservationTask, PunchCategory, PunchItem,
    PunchStatus,
};

/// Days ahead of the evaluation date within which an OK preservation task
/// counts as "upcoming". The window is half-open: exclusive of today,
/// inclusive of the boundary day.
const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Open punch counts broken down by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunchOpenByCategory {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    #[serde(rename = "C")]
    pub c: i64,
}

/// Derived completion metrics for a system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemKpis {
    pub total_itr_a: i64,
    pub completed_itr_a: i64,
    pub percent_itr_a_completed: i64,
    pub total_itr_b: i64,
    pub completed_itr_b: i64,
    pub percent_itr_b_completed: i64,
    pub punch_open_by_category: PunchOpenByCategory,
    pub punch_closed: i64,
    pub preservation_overdue_count: i64,
    pub preservation_upcoming_count: i64,
    pub has_critical_punch: bool,
    pub has_incomplete_itr_b: bool,
}

/// Derived completion metrics for a single subsystem. No per-category punch
/// breakdown and no derived flags at this scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemKpis {
    pub total_itr_a: i64,
    pub completed_itr_a: i64,
    pub percent_itr_a_completed: i64,
    pub total_itr_b: i64,
    pub completed_itr_b: i64,
    pub percent_itr_b_completed: i64,
    pub punch_open: i64,
    pub punch_closed: i64,
    pub preservation_overdue_count: i64,
}

/// Zero-safe completion percentage with half-up rounding
pub fn percent(completed: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as i64
    }
}

fn is_completed(itr: &Itr) -> bool {
    itr.status == Some(ItrStatus::Completed)
}

fn is_open(item: &PunchItem) -> bool {
    matches!(item.status, Some(PunchStatus::Open) | Some(PunchStatus::InProgress))
}

/// "Upcoming" means status OK and due in `(today, today + 7 days]`
fn is_upcoming(task: &PreservationTask, today: NaiveDate) -> bool {
    task.status == Some(PreservationStatus::Ok)
        && task.next_due_date > today
        && task.next_due_date <= today + Duration::days(UPCOMING_WINDOW_DAYS)
}

/// Reduce fetched rows into system-level KPIs. Pure; `today` is the
/// evaluation date for the upcoming-preservation window.
pub fn reduce_system_kpis(
    itrs: &[Itr],
    punch_items: &[PunchItem],
    preservation_tasks: &[PreservationTask],
    today: NaiveDate,
) -> SystemKpis {
    let itr_a: Vec<&Itr> = itrs.iter().filter(|i| i.itr_type == ItrType::A).collect();
    let itr_b: Vec<&Itr> = itrs.iter().filter(|i| i.itr_type == ItrType::B).collect();

    let completed_itr_a = itr_a.iter().filter(|i| is_completed(i)).count() as i64;
    let completed_itr_b = itr_b.iter().filter(|i| is_completed(i)).count() as i64;
    let total_itr_a = itr_a.len() as i64;
    let total_itr_b = itr_b.len() as i64;

    let open: Vec<&PunchItem> = punch_items.iter().filter(|p| is_open(p)).collect();
    let punch_closed = punch_items
        .iter()
        .filter(|p| p.status == Some(PunchStatus::Closed))
        .count() as i64;

    let count_open = |category: PunchCategory| -> i64 {
        open.iter().filter(|p| p.category == category).count() as i64
    };
    let punch_open_by_category = PunchOpenByCategory {
        a: count_open(PunchCategory::A),
        b: count_open(PunchCategory::B),
        c: count_open(PunchCategory::C),
    };

    let preservation_overdue_count = preservation_tasks
        .iter()
        .filter(|t| t.status == Some(PreservationStatus::Overdue))
        .count() as i64;
    let preservation_upcoming_count = preservation_tasks
        .iter()
        .filter(|t| is_upcoming(t, today))
        .count() as i64;

    SystemKpis {
        total_itr_a,
        completed_itr_a,
        percent_itr_a_completed: percent(completed_itr_a, total_itr_a),
        total_itr_b,
        completed_itr_b,
        percent_itr_b_completed: percent(completed_itr_b, total_itr_b),
        has_critical_punch: punch_open_by_category.a > 0,
        has_incomplete_itr_b: completed_itr_b < total_itr_b,
        punch_open_by_category,
        punch_closed,
        preservation_overdue_count,
        preservation_upcoming_count,
    }
}

/// Reduce fetched rows into subsystem-level KPIs. Pure.
pub fn reduce_subsystem_kpis(
    itrs: &[Itr],
    punch_items: &[PunchItem],
    preservation_tasks: &[PreservationTask],
) -> SubsystemKpis {
    let itr_a: Vec<&Itr> = itrs.iter().filter(|i| i.itr_type == ItrType::A).collect();
    let itr_b: Vec<&Itr> = itrs.iter().filter(|i| i.itr_type == ItrType::B).collect();

    let completed_itr_a = itr_a.iter().filter(|i| is_completed(i)).count() as i64;
    let completed_itr_b = itr_b.iter().filter(|i| is_completed(i)).count() as i64;
    let total_itr_a = itr_a.len() as i64;
    let total_itr_b = itr_b.len() as i64;

    let punch_open = punch_items.iter().filter(|p| is_open(p)).count() as i64;
    let punch_closed = punch_items
        .iter()
        .filter(|p| p.status == Some(PunchStatus::Closed))
        .count() as i64;

    let preservation_overdue_count = preservation_tasks
        .iter()
        .filter(|t| t.status == Some(PreservationStatus::Overdue))
        .count() as i64;

    SubsystemKpis {
        total_itr_a,
        completed_itr_a,
        percent_itr_a_completed: percent(completed_itr_a, total_itr_a),
        total_itr_b,
        completed_itr_b,
        percent_itr_b_completed: percent(completed_itr_b, total_itr_b),
        punch_open,
        punch_closed,
        preservation_overdue_count,
    }
}

/// Fail-open-to-empty policy for dependent fetches: any fetch error becomes
/// an empty collection plus a logged warning, so partial data never blocks
/// dashboard rendering. This is the single place the policy lives.
fn fetch_or_empty<T>(result: anyhow::Result<Vec<T>>, what: &str) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(fetch = what, error = %err, "Fetch failed, continuing with empty set");
            Vec::new()
        }
    }
}

/// On-demand KPI computation over the hosted store
#[derive(Clone)]
pub struct KpiService {
    projects: ProjectRepository,
    completions: CompletionRepository,
}

impl KpiService {
    pub fn new(projects: ProjectRepository, completions: CompletionRepository) -> Self {
        Self {
            projects,
            completions,
        }
    }

    /// Compute KPIs across every subsystem of the given system.
    ///
    /// The subsystem-id resolution is the one fetch whose failure aborts the
    /// computation; everything downstream fails open to empty sets.
    pub async fn system_kpis(&self, system_id: Uuid) -> CompletionsResult<SystemKpis> {
        let subsystem_ids = self.projects.subsystem_ids(system_id).await?;

        let itrs = fetch_or_empty(
            self.completions.itrs_for_subsystems(&subsystem_ids).await,
            "itrs",
        );
        let punch_items = fetch_or_empty(
            self.completions
                .punch_items_for_subsystems(&subsystem_ids)
                .await,
            "punch_items",
        );
        let tags = fetch_or_empty(
            self.completions.tags_for_subsystems(&subsystem_ids).await,
            "tags",
        );
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        let preservation_tasks = fetch_or_empty(
            self.completions.preservation_for_tags(&tag_ids).await,
            "preservation_tasks",
        );

        Ok(reduce_system_kpis(
            &itrs,
            &punch_items,
            &preservation_tasks,
            Utc::now().date_naive(),
        ))
    }

    /// Compute KPIs for a single subsystem.
    pub async fn subsystem_kpis(&self, subsystem_id: Uuid) -> CompletionsResult<SubsystemKpis> {
        let itrs = fetch_or_empty(
            self.completions.itrs_for_subsystem(subsystem_id).await,
            "itrs",
        );
        let punch_items = fetch_or_empty(
            self.completions.punch_items_for_subsystem(subsystem_id).await,
            "punch_items",
        );
        let tags = fetch_or_empty(
            self.completions.tags_for_subsystem(subsystem_id).await,
            "tags",
        );
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        let preservation_tasks = fetch_or_empty(
            self.completions.preservation_for_tags(&tag_ids).await,
            "preservation_tasks",
        );

        Ok(reduce_subsystem_kpis(&itrs, &punch_items, &preservation_tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Discipline;

    fn itr(itr_type: ItrType, status: ItrStatus) -> Itr {
        Itr {
            id: Uuid::new_v4(),
            subsystem_id: Some(Uuid::new_v4()),
            tag_id: None,
            itr_code: "ITR-001".to_string(),
            itr_type,
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

    fn preservation(status: PreservationStatus, next_due_date: NaiveDate) -> PreservationTask {
        PreservationTask {
            id: Uuid::new_v4(),
            tag_id: Uuid::new_v4(),
            description: "grease bearings".to_string(),
            frequency_days: 30,
            next_due_date,
            last_done_date: None,
            status: Some(status),
            created_at: None,
            updated_at: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn test_percent_zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 8), 13); // 12.5 rounds up
    }

    #[test]
    fn test_system_kpis_reference_scenario() {
        // 10 ITR-A with 7 completed, 5 ITR-B with 2 completed,
        // punch {2 open-A, 1 open-B, 3 closed}, 1 overdue preservation.
        let mut itrs = Vec::new();
        for i in 0..10 {
            let status = if i < 7 {
                ItrStatus::Completed
            } else {
                ItrStatus::NotStarted
            };
            itrs.push(itr(ItrType::A, status));
        }
        for i in 0..5 {
            let status = if i < 2 {
                ItrStatus::Completed
            } else {
                ItrStatus::InProgress
            };
            itrs.push(itr(ItrType::B, status));
        }

        let punch_items = vec![
            punch(PunchCategory::A, PunchStatus::Open),
            punch(PunchCategory::A, PunchStatus::InProgress),
            punch(PunchCategory::B, PunchStatus::Open),
            punch(PunchCategory::B, PunchStatus::Closed),
            punch(PunchCategory::C, PunchStatus::Closed),
            punch(PunchCategory::C, PunchStatus::Closed),
        ];

        let tasks = vec![preservation(PreservationStatus::Overdue, today())];

        let kpis = reduce_system_kpis(&itrs, &punch_items, &tasks, today());

        assert_eq!(kpis.percent_itr_a_completed, 70);
        assert_eq!(kpis.percent_itr_b_completed, 40);
        assert_eq!(
            kpis.punch_open_by_category,
            PunchOpenByCategory { a: 2, b: 1, c: 0 }
        );
        assert_eq!(kpis.punch_closed, 3);
        assert_eq!(kpis.preservation_overdue_count, 1);
        assert!(kpis.has_critical_punch);
        assert!(kpis.has_incomplete_itr_b);
    }

    #[test]
    fn test_empty_result_sets_are_all_zero() {
        let kpis = reduce_system_kpis(&[], &[], &[], today());
        assert_eq!(kpis.total_itr_a, 0);
        assert_eq!(kpis.percent_itr_a_completed, 0);
        assert_eq!(kpis.percent_itr_b_completed, 0);
        assert_eq!(kpis.punch_closed, 0);
        assert_eq!(kpis.preservation_overdue_count, 0);
        assert_eq!(kpis.preservation_upcoming_count, 0);
        assert!(!kpis.has_critical_punch);
        // zero ITR B means nothing is incomplete
        assert!(!kpis.has_incomplete_itr_b);
    }

    #[test]
    fn test_critical_punch_requires_open_category_a() {
        let closed_a = vec![punch(PunchCategory::A, PunchStatus::Closed)];
        let kpis = reduce_system_kpis(&[], &closed_a, &[], today());
        assert!(!kpis.has_critical_punch);

        let in_progress_a = vec![punch(PunchCategory::A, PunchStatus::InProgress)];
        let kpis = reduce_system_kpis(&[], &in_progress_a, &[], today());
        assert!(kpis.has_critical_punch);
    }

    #[test]
    fn test_upcoming_window_is_half_open() {
        let t = today();
        // due today: outside the window (exclusive lower bound)
        assert!(!is_upcoming(&preservation(PreservationStatus::Ok, t), t));
        // due tomorrow: inside
        assert!(is_upcoming(
            &preservation(PreservationStatus::Ok, t + Duration::days(1)),
            t
        ));
        // due exactly 7 days out: inside (inclusive upper bound)
        assert!(is_upcoming(
            &preservation(PreservationStatus::Ok, t + Duration::days(7)),
            t
        ));
        // due 8 days out: outside
        assert!(!is_upcoming(
            &preservation(PreservationStatus::Ok, t + Duration::days(8)),
            t
        ));
    }

    #[test]
    fn test_overdue_is_status_driven_not_date_driven() {
        let t = today();
        // OVERDUE with a future due date still counts as overdue
        let tasks = vec![
            preservation(PreservationStatus::Overdue, t + Duration::days(30)),
            preservation(PreservationStatus::Ok, t - Duration::days(30)),
        ];
        let kpis = reduce_system_kpis(&[], &[], &tasks, t);
        assert_eq!(kpis.preservation_overdue_count, 1);
        // an OK task already past due is neither overdue nor upcoming
        assert_eq!(kpis.preservation_upcoming_count, 0);
    }

    #[test]
    fn test_rejected_and_in_progress_itrs_count_as_incomplete() {
        let itrs = vec![
            itr(ItrType::B, ItrStatus::Completed),
            itr(ItrType::B, ItrStatus::Rejected),
            itr(ItrType::B, ItrStatus::InProgress),
            itr(ItrType::B, ItrStatus::NotStarted),
        ];
        let kpis = reduce_system_kpis(&itrs, &[], &[], today());
        assert_eq!(kpis.total_itr_b, 4);
        assert_eq!(kpis.completed_itr_b, 1);
        assert_eq!(kpis.percent_itr_b_completed, 25);
        assert!(kpis.has_incomplete_itr_b);
    }

    #[test]
    fn test_subsystem_kpis_single_punch_counts() {
        let itrs = vec![
            itr(ItrType::A, ItrStatus::Completed),
            itr(ItrType::B, ItrStatus::NotStarted),
        ];
        let punch_items = vec![
            punch(PunchCategory::A, PunchStatus::Open),
            punch(PunchCategory::C, PunchStatus::InProgress),
            punch(PunchCategory::B, PunchStatus::Closed),
        ];
        let kpis = reduce_subsystem_kpis(&itrs, &punch_items, &[]);
        assert_eq!(kpis.percent_itr_a_completed, 100);
        assert_eq!(kpis.percent_itr_b_completed, 0);
        assert_eq!(kpis.punch_open, 2);
        assert_eq!(kpis.punch_closed, 1);
        assert_eq!(kpis.preservation_overdue_count, 0);
    }

    #[test]
    fn test_kpi_json_field_names() {
        let kpis = reduce_system_kpis(&[], &[], &[], today());
        let json = serde_json::to_value(&kpis).unwrap();
        assert!(json.get("percentItrACompleted").is_some());
        assert!(json.get("punchOpenByCategory").is_some());
        assert!(json["punchOpenByCategory"].get("A").is_some());
        assert!(json.get("hasCriticalPunch").is_some());
        assert!(json.get("hasIncompleteItrB").is_some());
    }
}
