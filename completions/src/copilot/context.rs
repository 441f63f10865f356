//! Copilot context block
//!
//! Assembles the deterministic plain-text snapshot of a system's completion
//! state that backs every copilot answer. The block is returned to the
//! caller alongside the response as an auditability aid, so its shape is
//! part of the contract: fixed section headers, bulleted lists, and literal
//! "none" sentinel lines when a section is empty.

use std::fmt::Write as _;

use crate::kpi::percent;
use crate::models::{
    Discipline, Itr, ItrStatus, ItrType, OverduePreservationTask, PunchItem, Subsystem,
    SystemWithProject,
};

/// Everything the context builder and the rule-based responder need,
/// fetched once per question.
#[derive(Debug, Clone)]
pub struct CopilotData {
    pub system: SystemWithProject,
    pub subsystems: Vec<Subsystem>,
    pub itrs: Vec<Itr>,
    pub open_punch_a: Vec<PunchItem>,
    pub overdue_preservation: Vec<OverduePreservationTask>,
}

fn status_label(status: Option<crate::models::SystemStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("N/A")
}

/// Pending ITR B counts grouped by discipline, in insertion order of first
/// occurrence — deliberately not sorted.
pub fn pending_itr_b_by_discipline(itrs: &[Itr]) -> Vec<(Discipline, usize)> {
    let mut groups: Vec<(Discipline, usize)> = Vec::new();
    for itr in itrs {
        if itr.itr_type != ItrType::B || itr.status == Some(ItrStatus::Completed) {
            continue;
        }
        match groups.iter_mut().find(|(d, _)| *d == itr.discipline) {
            Some((_, count)) => *count += 1,
            None => groups.push((itr.discipline, 1)),
        }
    }
    groups
}

/// Build the plain-text context block.
pub fn build_context(data: &CopilotData) -> String {
    let itr_a_total = data.itrs.iter().filter(|i| i.itr_type == ItrType::A).count() as i64;
    let itr_b_total = data.itrs.iter().filter(|i| i.itr_type == ItrType::B).count() as i64;
    let itr_a_completed = data
        .itrs
        .iter()
        .filter(|i| i.itr_type == ItrType::A && i.status == Some(ItrStatus::Completed))
        .count() as i64;
    let itr_b_completed = data
        .itrs
        .iter()
        .filter(|i| i.itr_type == ItrType::B && i.status == Some(ItrStatus::Completed))
        .count() as i64;

    let mut out = String::new();

    let _ = writeln!(
        out,
        "Proyecto: {} ({})",
        data.system.project_name, data.system.project_code
    );
    let _ = writeln!(out, "Sistema: {} ({})", data.system.name, data.system.code);
    let _ = writeln!(
        out,
        "Estado del sistema: {}",
        status_label(data.system.status)
    );
    out.push('\n');

    let _ = writeln!(out, "RESUMEN DE ITRs:");
    let _ = writeln!(
        out,
        "- ITR A: {} de {} completados ({}%)",
        itr_a_completed,
        itr_a_total,
        percent(itr_a_completed, itr_a_total)
    );
    let _ = writeln!(
        out,
        "- ITR B: {} de {} completados ({}%)",
        itr_b_completed,
        itr_b_total,
        percent(itr_b_completed, itr_b_total)
    );
    let _ = writeln!(out, "- ITR B pendientes por disciplina:");
    for (discipline, count) in pending_itr_b_by_discipline(&data.itrs) {
        let _ = writeln!(out, "  - {}: {}", discipline.as_str(), count);
    }
    out.push('\n');

    let _ = writeln!(out, "PUNCH ITEMS CRÍTICOS (Categoría A abiertos):");
    if data.open_punch_a.is_empty() {
        let _ = writeln!(out, "No hay punch categoría A abiertos");
    } else {
        for item in &data.open_punch_a {
            let due = item
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "sin fecha".to_string());
            let _ = writeln!(out, "- {} (vence: {})", item.description, due);
        }
    }
    out.push('\n');

    let _ = writeln!(out, "PRESERVACIONES VENCIDAS:");
    if data.overdue_preservation.is_empty() {
        let _ = writeln!(out, "No hay preservaciones vencidas");
    } else {
        for task in &data.overdue_preservation {
            let _ = writeln!(
                out,
                "- Tag {}: {} (vencida desde {})",
                task.tag_code, task.description, task.next_due_date
            );
        }
    }
    out.push('\n');

    let _ = writeln!(out, "SUBSISTEMAS:");
    for subsystem in &data.subsystems {
        let _ = writeln!(
            out,
            "- {}: {} ({})",
            subsystem.code,
            subsystem.name,
            status_label(subsystem.status)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemStatus;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn system() -> SystemWithProject {
        SystemWithProject {
            id: Uuid::new_v4(),
            code: "SYS-01".to_string(),
            name: "Power Generation".to_string(),
            status: Some(SystemStatus::InProgress),
            criticality: None,
            project_id: Uuid::new_v4(),
            project_code: "PRJ-01".to_string(),
            project_name: "Offshore Alpha".to_string(),
        }
    }

    fn itr_b(discipline: Discipline, status: ItrStatus) -> Itr {
        Itr {
            id: Uuid::new_v4(),
            subsystem_id: Some(Uuid::new_v4()),
            tag_id: None,
            itr_code: "ITR-B".to_string(),
            itr_type: ItrType::B,
            discipline,
            status: Some(status),
            comments: None,
            last_update: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn base_data() -> CopilotData {
        CopilotData {
            system: system(),
            subsystems: Vec::new(),
            itrs: Vec::new(),
            open_punch_a: Vec::new(),
            overdue_preservation: Vec::new(),
        }
    }

    #[test]
    fn test_discipline_grouping_keeps_insertion_order() {
        let itrs = vec![
            itr_b(Discipline::Elec, ItrStatus::NotStarted),
            itr_b(Discipline::Mech, ItrStatus::InProgress),
            itr_b(Discipline::Elec, ItrStatus::Rejected),
            itr_b(Discipline::Inst, ItrStatus::NotStarted),
        ];
        let groups = pending_itr_b_by_discipline(&itrs);
        assert_eq!(
            groups,
            vec![
                (Discipline::Elec, 2),
                (Discipline::Mech, 1),
                (Discipline::Inst, 1),
            ]
        );
    }

    #[test]
    fn test_completed_itr_b_is_not_pending() {
        let itrs = vec![itr_b(Discipline::Pipe, ItrStatus::Completed)];
        assert!(pending_itr_b_by_discipline(&itrs).is_empty());
    }

    #[test]
    fn test_context_carries_none_sentinels_when_empty() {
        let context = build_context(&base_data());
        assert!(context.contains("No hay punch categoría A abiertos"));
        assert!(context.contains("No hay preservaciones vencidas"));
    }

    #[test]
    fn test_context_identity_and_percentages() {
        let mut data = base_data();
        data.itrs = vec![
            {
                let mut i = itr_b(Discipline::Mech, ItrStatus::Completed);
                i.itr_type = ItrType::A;
                i
            },
            itr_b(Discipline::Mech, ItrStatus::NotStarted),
        ];
        let context = build_context(&data);
        assert!(context.contains("Proyecto: Offshore Alpha (PRJ-01)"));
        assert!(context.contains("Sistema: Power Generation (SYS-01)"));
        assert!(context.contains("- ITR A: 1 de 1 completados (100%)"));
        assert!(context.contains("- ITR B: 0 de 1 completados (0%)"));
        assert!(context.contains("  - MECH: 1"));
    }

    #[test]
    fn test_overdue_lines_carry_tag_code_and_date() {
        let mut data = base_data();
        data.overdue_preservation = vec![OverduePreservationTask {
            id: Uuid::new_v4(),
            tag_id: Uuid::new_v4(),
            tag_code: "P-101".to_string(),
            description: "rotate shaft".to_string(),
            next_due_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }];
        let context = build_context(&data);
        assert!(context.contains("- Tag P-101: rotate shaft (vencida desde 2024-03-01)"));
    }
}
