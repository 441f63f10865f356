//! AI copilot — the insight responder
//!
//! Answers natural-language questions about a system's completion status.
//! The same data that feeds the KPI aggregator is assembled into a prose
//! context block; response generation is polymorphic over two strategies
//! selected once per service from configuration: delegate to the chat
//! provider when a credential exists, otherwise answer from the structured
//! data directly. Every generated answer is persisted as an append-only
//! insight.

pub mod chat_client;
pub mod context;
pub mod responder;

pub use chat_client::{ChatClient, ChatConfig};
pub use context::{build_context, CopilotData};
pub use responder::{rule_based_response, RuleBasedFacts, FALLBACK_BANNER};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::database::{CompletionRepository, InsightRepository, ProjectRepository};
use crate::error::{CompletionsError, CompletionsResult};
use crate::models::NewInsight;

/// Fixed system prompt for the delegated strategy
const SYSTEM_PROMPT: &str = "Eres un asistente experto en gestión de completions para proyectos \
    Oil & Gas. Analizas ITRs, punch lists y preservación de equipos. Proporciona respuestas \
    claras, concisas y accionables basadas en los datos proporcionados.";

/// Hard character cutoff for insight titles. No word-boundary awareness.
const INSIGHT_TITLE_MAX_CHARS: usize = 100;

/// How a question gets answered. Selected once, from configuration — a
/// provider failure never downgrades Delegated to RuleBased mid-flight.
#[derive(Clone)]
pub enum ResponseStrategy {
    /// Send the context and question to the external chat provider.
    Delegated(ChatClient),
    /// Deterministic keyword routing over the structured data.
    RuleBased,
}

impl ResponseStrategy {
    pub fn from_env() -> Self {
        match ChatConfig::from_env() {
            Some(config) => {
                info!(model = %config.model, "Copilot using delegated AI strategy");
                ResponseStrategy::Delegated(ChatClient::new(config))
            }
            None => {
                info!("No AI credential configured, copilot using rule-based strategy");
                ResponseStrategy::RuleBased
            }
        }
    }
}

/// A question scoped to a project/system (and optionally a subsystem)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotQuestion {
    pub question: String,
    pub project_id: Uuid,
    pub system_id: Uuid,
    pub subsystem_id: Option<Uuid>,
}

/// The generated answer plus the context block it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotAnswer {
    pub response: String,
    pub context: String,
}

#[derive(Clone)]
pub struct CopilotService {
    projects: ProjectRepository,
    completions: CompletionRepository,
    insights: InsightRepository,
    strategy: ResponseStrategy,
}

impl CopilotService {
    pub fn new(
        projects: ProjectRepository,
        completions: CompletionRepository,
        insights: InsightRepository,
        strategy: ResponseStrategy,
    ) -> Self {
        Self {
            projects,
            completions,
            insights,
            strategy,
        }
    }

    /// Answer a question and persist the result as an insight.
    ///
    /// Fetch errors and provider errors are hard failures: nothing is
    /// retried, and the insight is only written after generation succeeds.
    pub async fn answer_question(
        &self,
        request: &CopilotQuestion,
    ) -> CompletionsResult<CopilotAnswer> {
        if request.question.trim().is_empty() {
            return Err(CompletionsError::InvalidParameter(
                "question must not be empty".to_string(),
            ));
        }

        let system = self
            .projects
            .get_system_with_project(request.system_id)
            .await?
            .ok_or_else(|| {
                CompletionsError::InvalidParameter(format!(
                    "system {} not found",
                    request.system_id
                ))
            })?;

        let subsystems = self.projects.subsystems_for_system(request.system_id).await?;
        let subsystem_ids: Vec<Uuid> = subsystems.iter().map(|s| s.id).collect();

        let itrs = self.completions.itrs_for_subsystems(&subsystem_ids).await?;
        let open_punch_a = self
            .completions
            .open_punch_a_for_subsystems(&subsystem_ids)
            .await?;
        let tags = self.completions.tags_for_subsystems(&subsystem_ids).await?;
        let tag_ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        let overdue_preservation = self
            .completions
            .overdue_preservation_for_tags(&tag_ids)
            .await?;

        let data = CopilotData {
            system,
            subsystems,
            itrs,
            open_punch_a,
            overdue_preservation,
        };
        let context = build_context(&data);

        let response = match &self.strategy {
            ResponseStrategy::Delegated(client) => {
                let user_prompt = format!(
                    "Contexto del proyecto:\n{}\n\nPregunta del usuario: {}",
                    context, request.question
                );
                client.complete(SYSTEM_PROMPT, &user_prompt).await?
            }
            ResponseStrategy::RuleBased => {
                rule_based_response(&request.question, &RuleBasedFacts::from_data(&data))
            }
        };

        self.insights
            .create(&NewInsight {
                project_id: request.project_id,
                system_id: Some(request.system_id),
                subsystem_id: request.subsystem_id,
                title: truncate_title(&request.question),
                content: response.clone(),
            })
            .await?;

        Ok(CopilotAnswer { response, context })
    }
}

/// Title for the persisted insight: the question hard-truncated to 100
/// characters on a char boundary.
fn truncate_title(question: &str) -> String {
    question.chars().take(INSIGHT_TITLE_MAX_CHARS).collect()
}
