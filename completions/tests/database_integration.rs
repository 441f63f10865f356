//! End-to-end tests against a live database
//!
//! These exercise the repositories, the KPI aggregation, the bulk importer,
//! and the rule-based copilot against the schema at `DATABASE_URL`. They
//! are `#[ignore]`d so the default test run needs no database; run with:
//!
//!   DATABASE_URL=postgresql://localhost/completions cargo test -- --ignored

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use completions::copilot::{CopilotQuestion, CopilotService, ResponseStrategy, FALLBACK_BANNER};
use completions::database::{
    CompletionRepository, ImportLogRepository, InsightRepository, ProjectRepository,
};
use completions::import::{ImportRequest, ImportService};
use completions::kpi::KpiService;
use completions::models::{
    Criticality, Discipline, ItrStatus, ItrType, NewItr, NewPreservationTask, NewProject,
    NewPunchItem, NewSubsystem, NewSystem, NewTag, PreservationStatus, PunchCategory,
    PunchStatus,
};
use completions::session::SessionContext;

async fn connect() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost:5432/completions".to_string());
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

struct Fixture {
    projects: ProjectRepository,
    completions: CompletionRepository,
    insights: InsightRepository,
    import_logs: ImportLogRepository,
    project_id: Uuid,
    system_id: Uuid,
    subsystem_id: Uuid,
}

/// Seed a project -> system -> subsystem chain with a unique project code.
async fn seed_hierarchy(pool: PgPool) -> Fixture {
    let projects = ProjectRepository::new(pool.clone());
    let completions = CompletionRepository::new(pool.clone());
    let insights = InsightRepository::new(pool.clone());
    let import_logs = ImportLogRepository::new(pool);

    let unique = Uuid::new_v4().simple().to_string();
    let suffix = &unique[..8];
    let project = projects
        .create_project(&NewProject {
            code: format!("TST-{suffix}"),
            name: "Integration test project".to_string(),
            description: None,
            location: None,
            status: None,
        })
        .await
        .expect("Failed to create project");

    let system = projects
        .create_system(&NewSystem {
            project_id: project.id,
            code: format!("SYS-{suffix}"),
            name: "Test system".to_string(),
            description: None,
            criticality: Some(Criticality::High),
            status: None,
        })
        .await
        .expect("Failed to create system");

    let subsystem = projects
        .create_subsystem(&NewSubsystem {
            system_id: system.id,
            code: format!("SUB-{suffix}"),
            name: "Test subsystem".to_string(),
            description: None,
            status: None,
        })
        .await
        .expect("Failed to create subsystem");

    Fixture {
        projects,
        completions,
        insights,
        import_logs,
        project_id: project.id,
        system_id: system.id,
        subsystem_id: subsystem.id,
    }
}

/// The reference scenario: 10 ITR-A (7 completed), 5 ITR-B (2 completed),
/// punch {2 open-A, 1 open-B, 3 closed}, 1 overdue preservation task.
async fn seed_reference_records(fx: &Fixture) {
    for i in 0..10 {
        let status = if i < 7 {
            ItrStatus::Completed
        } else {
            ItrStatus::NotStarted
        };
        fx.completions
            .insert_itr(&NewItr {
                subsystem_id: fx.subsystem_id,
                tag_id: None,
                itr_code: format!("ITR-A-{i}"),
                itr_type: ItrType::A,
                discipline: Discipline::Mech,
                status,
                comments: None,
            })
            .await
            .expect("Failed to insert ITR A");
    }
    for i in 0..5 {
        let status = if i < 2 {
            ItrStatus::Completed
        } else {
            ItrStatus::InProgress
        };
        fx.completions
            .insert_itr(&NewItr {
                subsystem_id: fx.subsystem_id,
                tag_id: None,
                itr_code: format!("ITR-B-{i}"),
                itr_type: ItrType::B,
                discipline: Discipline::Elec,
                status,
                comments: None,
            })
            .await
            .expect("Failed to insert ITR B");
    }

    let punch = [
        (PunchCategory::A, PunchStatus::Open),
        (PunchCategory::A, PunchStatus::InProgress),
        (PunchCategory::B, PunchStatus::Open),
        (PunchCategory::B, PunchStatus::Closed),
        (PunchCategory::C, PunchStatus::Closed),
        (PunchCategory::C, PunchStatus::Closed),
    ];
    for (category, status) in punch {
        fx.completions
            .insert_punch_item(&NewPunchItem {
                subsystem_id: fx.subsystem_id,
                tag_id: None,
                category,
                description: "integration punch".to_string(),
                status,
                raised_by: None,
                due_date: Some(Utc::now().date_naive() + Duration::days(14)),
            })
            .await
            .expect("Failed to insert punch item");
    }

    let tag_id = fx
        .completions
        .insert_tag(&NewTag {
            subsystem_id: fx.subsystem_id,
            tag_code: "TAG-001".to_string(),
            discipline: Discipline::Mech,
            description: None,
            device_type: None,
            criticality: Criticality::Medium,
        })
        .await
        .expect("Failed to insert tag");

    fx.completions
        .insert_preservation_task(&NewPreservationTask {
            tag_id,
            description: "rotate shaft".to_string(),
            frequency_days: 30,
            next_due_date: Utc::now().date_naive() - Duration::days(3),
            status: PreservationStatus::Overdue,
        })
        .await
        .expect("Failed to insert preservation task");
}

#[tokio::test]
#[ignore = "requires a live database"]
async fn test_system_kpis_end_to_end() {
    let pool = connect().await;
    let fx = seed_hierarchy(pool).await;
    seed_reference_records(&fx).await;

    let service = KpiService::new(fx.projects.clone(), fx.completions.clone());
    let kpis = service
        .system_kpis(fx.system_id)
        .await
        .expect("Failed to compute system KPIs");

    assert_eq!(kpis.percent_itr_a_completed, 70);
    assert_eq!(kpis.percent_itr_b_completed, 40);
    assert_eq!(kpis.punch_open_by_category.a, 2);
    assert_eq!(kpis.punch_open_by_category.b, 1);
    assert_eq!(kpis.punch_open_by_category.c, 0);
    assert_eq!(kpis.punch_closed, 3);
    assert_eq!(kpis.preservation_overdue_count, 1);
    assert!(kpis.has_critical_punch);
    assert!(kpis.has_incomplete_itr_b);
}

#[tokio::test]
#[ignore = "requires a live database"]
async fn test_subsystem_without_tags_has_zero_preservation_counts() {
    let pool = connect().await;
    let fx = seed_hierarchy(pool).await;

    let service = KpiService::new(fx.projects.clone(), fx.completions.clone());
    let kpis = service
        .subsystem_kpis(fx.subsystem_id)
        .await
        .expect("Failed to compute subsystem KPIs");

    assert_eq!(kpis.preservation_overdue_count, 0);
    assert_eq!(kpis.punch_open, 0);
}

#[tokio::test]
#[ignore = "requires a live database"]
async fn test_csv_import_records_row_level_failures() {
    let pool = connect().await;
    let fx = seed_hierarchy(pool).await;

    let tag_id = fx
        .completions
        .insert_tag(&NewTag {
            subsystem_id: fx.subsystem_id,
            tag_code: "TAG-IMP".to_string(),
            discipline: Discipline::Inst,
            description: None,
            device_type: None,
            criticality: Criticality::Medium,
        })
        .await
        .expect("Failed to insert tag");

    // 10 preservation rows; row 4 references a tag that does not exist, so
    // its insert violates the foreign key.
    let missing_tag = Uuid::new_v4();
    let mut csv = String::from("tag_id,description,frequency_days,next_due_date\n");
    for row in 1..=10 {
        let tag = if row == 4 { missing_tag } else { tag_id };
        csv.push_str(&format!("{tag},task {row},30,2026-01-01\n"));
    }

    let importer = ImportService::new(fx.completions.clone(), fx.import_logs.clone());
    let session = SessionContext {
        user_id: Uuid::new_v4(),
        email: "qa@example.com".to_string(),
    };
    let outcome = importer
        .import_csv(
            &session,
            &ImportRequest {
                entity_type: "preservation".to_string(),
                project_id: fx.project_id,
                system_id: Some(fx.system_id),
                file_name: Some("preservation.csv".to_string()),
            },
            &csv,
        )
        .await
        .expect("Import run failed outright");

    assert_eq!(outcome.records_processed, 10);
    assert_eq!(outcome.records_success, 9);
    assert_eq!(outcome.records_failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        outcome.errors[0].record["description"],
        serde_json::json!("task 4")
    );

    let logs = fx
        .import_logs
        .list_for_project(fx.project_id)
        .await
        .expect("Failed to list import logs");
    let log = logs
        .iter()
        .find(|l| l.id == outcome.import_id)
        .expect("Import log missing");
    assert_eq!(log.status.as_deref(), Some("failed"));
    assert_eq!(log.records_success, Some(9));
    assert_eq!(log.records_failed, Some(1));
}

#[tokio::test]
#[ignore = "requires a live database"]
async fn test_rule_based_copilot_persists_insight() {
    let pool = connect().await;
    let fx = seed_hierarchy(pool).await;
    seed_reference_records(&fx).await;

    let copilot = CopilotService::new(
        fx.projects.clone(),
        fx.completions.clone(),
        fx.insights.clone(),
        ResponseStrategy::RuleBased,
    );

    let answer = copilot
        .answer_question(&CopilotQuestion {
            question: "¿Qué falta para la energización?".to_string(),
            project_id: fx.project_id,
            system_id: fx.system_id,
            subsystem_id: None,
        })
        .await
        .expect("Copilot failed");

    assert!(answer.response.starts_with(FALLBACK_BANNER));
    assert!(answer.response.contains("2 punch items categoría A pendientes"));
    assert!(answer.response.contains("Faltan 3 ITR B por completar"));
    assert!(answer.context.contains("RESUMEN DE ITRs:"));

    let insights = fx
        .insights
        .list_for_project(fx.project_id)
        .await
        .expect("Failed to list insights");
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].title, "¿Qué falta para la energización?");
}
