//! Rule-based responder
//!
//! Deterministic fallback used when no AI credential is configured. Routes
//! on substring matches against the lowercased question in fixed priority
//! order — readiness, ITR, punch, preservation, generic — first match wins.
//! Every answer starts with the fixed banner marking it as the non-AI mode.

use crate::copilot::context::CopilotData;
use crate::kpi::percent;
use crate::models::{ItrStatus, ItrType};

/// Fixed banner prefixed to every rule-based answer
pub const FALLBACK_BANNER: &str =
    "**[Modo sin IA externa - Respuesta basada en datos estructurados]**\n\n";

/// The handful of counts the router branches on
#[derive(Debug, Clone, Default)]
pub struct RuleBasedFacts {
    pub total_itr_a: i64,
    pub completed_itr_a: i64,
    pub total_itr_b: i64,
    pub completed_itr_b: i64,
    pub open_punch_a: i64,
    pub overdue_preservation: i64,
}

impl RuleBasedFacts {
    pub fn from_data(data: &CopilotData) -> Self {
        let is_completed = |i: &&crate::models::Itr| i.status == Some(ItrStatus::Completed);
        let itr_a = data.itrs.iter().filter(|i| i.itr_type == ItrType::A);
        let itr_b = data.itrs.iter().filter(|i| i.itr_type == ItrType::B);
        Self {
            total_itr_a: itr_a.clone().count() as i64,
            completed_itr_a: itr_a.filter(is_completed).count() as i64,
            total_itr_b: itr_b.clone().count() as i64,
            completed_itr_b: itr_b.filter(is_completed).count() as i64,
            open_punch_a: data.open_punch_a.len() as i64,
            overdue_preservation: data.overdue_preservation.len() as i64,
        }
    }

    fn pending_itr_b(&self) -> i64 {
        self.total_itr_b - self.completed_itr_b
    }
}

/// Answer a question from structured data alone.
pub fn rule_based_response(question: &str, facts: &RuleBasedFacts) -> String {
    let mut response = String::from(FALLBACK_BANNER);
    let lower = question.to_lowercase();

    if lower.contains("energización") || lower.contains("listo") {
        let blocked_by_punch = facts.open_punch_a > 0;
        let blocked_by_itr_b = facts.completed_itr_b < facts.total_itr_b;
        if blocked_by_punch || blocked_by_itr_b {
            response.push_str("⚠️ El sistema NO está listo para energización:\n");
            if blocked_by_punch {
                response.push_str(&format!(
                    "- Hay {} punch items categoría A pendientes\n",
                    facts.open_punch_a
                ));
            }
            if blocked_by_itr_b {
                response.push_str(&format!(
                    "- Faltan {} ITR B por completar\n",
                    facts.pending_itr_b()
                ));
            }
        } else {
            response.push_str(
                "✅ El sistema cumple requisitos básicos para energización (todos los ITR B completados y sin punch A)\n",
            );
        }
    } else if lower.contains("itr") {
        response.push_str("📊 Estado de ITRs:\n");
        response.push_str(&format!(
            "- ITR A: {}/{} completados ({}%)\n",
            facts.completed_itr_a,
            facts.total_itr_a,
            percent(facts.completed_itr_a, facts.total_itr_a)
        ));
        response.push_str(&format!(
            "- ITR B: {}/{} completados ({}%)\n",
            facts.completed_itr_b,
            facts.total_itr_b,
            percent(facts.completed_itr_b, facts.total_itr_b)
        ));
    } else if lower.contains("punch") {
        response.push_str("📋 Punch items críticos:\n");
        if facts.open_punch_a > 0 {
            response.push_str(&format!(
                "- {} punch categoría A abiertos que requieren atención inmediata\n",
                facts.open_punch_a
            ));
        } else {
            response.push_str("- No hay punch categoría A abiertos\n");
        }
    } else if lower.contains("preserv") {
        response.push_str("🔧 Preservación:\n");
        if facts.overdue_preservation > 0 {
            response.push_str(&format!(
                "- {} tareas de preservación vencidas que requieren atención\n",
                facts.overdue_preservation
            ));
        } else {
            response.push_str("- No hay tareas de preservación vencidas\n");
        }
    } else {
        response.push_str("Resumen general del sistema:\n");
        response.push_str(&format!(
            "- ITR A: {}% completado\n",
            percent(facts.completed_itr_a, facts.total_itr_a)
        ));
        response.push_str(&format!(
            "- ITR B: {}% completado\n",
            percent(facts.completed_itr_b, facts.total_itr_b)
        ));
        response.push_str(&format!("- Punch A abiertos: {}\n", facts.open_punch_a));
        response.push_str(&format!(
            "- Preservaciones vencidas: {}\n",
            facts.overdue_preservation
        ));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_facts() -> RuleBasedFacts {
        // 10 ITR-A (7 done), 5 ITR-B (2 done), 2 open punch A, 1 overdue task
        RuleBasedFacts {
            total_itr_a: 10,
            completed_itr_a: 7,
            total_itr_b: 5,
            completed_itr_b: 2,
            open_punch_a: 2,
            overdue_preservation: 1,
        }
    }

    #[test]
    fn test_every_response_carries_the_banner() {
        let facts = reference_facts();
        for question in ["¿listo?", "estado itr", "punch", "preservación", "hola"] {
            let response = rule_based_response(question, &facts);
            assert!(response.starts_with(FALLBACK_BANNER), "missing banner for {question}");
        }
    }

    #[test]
    fn test_energization_question_lists_both_blockers() {
        let response =
            rule_based_response("¿Qué falta para la energización?", &reference_facts());
        assert!(response.contains("NO está listo"));
        assert!(response.contains("2 punch items categoría A pendientes"));
        assert!(response.contains("Faltan 3 ITR B por completar"));
    }

    #[test]
    fn test_readiness_branch_wins_over_punch_branch() {
        // priority order: readiness before punch, even if both keywords match
        let response = rule_based_response("¿listo? ¿y el punch?", &reference_facts());
        assert!(response.contains("energización"));
        assert!(!response.contains("Punch items críticos"));
    }

    #[test]
    fn test_ready_verdict_when_nothing_blocks() {
        let facts = RuleBasedFacts {
            total_itr_b: 5,
            completed_itr_b: 5,
            open_punch_a: 0,
            ..reference_facts()
        };
        let response = rule_based_response("¿está listo el sistema?", &facts);
        assert!(response.contains("✅"));
        assert!(response.contains("cumple requisitos básicos"));
    }

    #[test]
    fn test_itr_branch_reports_both_percentages() {
        let response = rule_based_response("¿cómo van los ITR?", &reference_facts());
        assert!(response.contains("- ITR A: 7/10 completados (70%)"));
        assert!(response.contains("- ITR B: 2/5 completados (40%)"));
    }

    #[test]
    fn test_punch_branch_none_sentinel() {
        let facts = RuleBasedFacts {
            open_punch_a: 0,
            ..reference_facts()
        };
        let response = rule_based_response("¿hay punch pendientes?", &facts);
        assert!(response.contains("No hay punch categoría A abiertos"));
    }

    #[test]
    fn test_preservation_branch_counts_overdue() {
        let response = rule_based_response("estado de preservación", &reference_facts());
        assert!(response.contains("1 tareas de preservación vencidas"));
    }

    #[test]
    fn test_generic_summary_combines_all_four_metrics() {
        let response = rule_based_response("resumen por favor", &reference_facts());
        assert!(response.contains("- ITR A: 70% completado"));
        assert!(response.contains("- ITR B: 40% completado"));
        assert!(response.contains("- Punch A abiertos: 2"));
        assert!(response.contains("- Preservaciones vencidas: 1"));
    }

    #[test]
    fn test_generic_summary_safe_on_empty_system() {
        let response = rule_based_response("resumen", &RuleBasedFacts::default());
        assert!(response.contains("- ITR A: 0% completado"));
        assert!(response.contains("- ITR B: 0% completado"));
    }
}
