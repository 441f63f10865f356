use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use completions::{
    copilot::{CopilotQuestion, CopilotService, ResponseStrategy},
    database::{
        create_pool, CompletionRepository, DatabaseConfig, ImportLogRepository,
        InsightRepository, ProjectRepository,
    },
    export::ExportService,
    import::{ImportRequest, ImportService},
    kpi::KpiService,
    models::{
        NewProject, NewSubsystem, NewSystem, UpdateProject, UpdateSubsystem, UpdateSystem,
    },
    session::{AuthClient, SessionContext},
    CompletionsError,
};

// Application state
#[derive(Clone)]
pub struct AppState {
    pub projects: ProjectRepository,
    pub completions: CompletionRepository,
    pub insights: InsightRepository,
    pub import_logs: ImportLogRepository,
    pub kpis: KpiService,
    pub copilot: CopilotService,
    pub importer: ImportService,
    pub exporter: ExportService,
    pub auth: Option<AuthClient>,
}

// API envelope
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Error half of every handler: a status code plus the error envelope
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "no autorizado".to_string(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<CompletionsError> for ApiError {
    fn from(err: CompletionsError) -> Self {
        let status = match &err {
            CompletionsError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            CompletionsError::Unauthorized => StatusCode::UNAUTHORIZED,
            CompletionsError::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("completions_web_server=info,completions=info,tower_http=info")
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let db_config = DatabaseConfig::default();
    let pool = create_pool(&db_config).await?;

    let projects = ProjectRepository::new(pool.clone());
    let completions = CompletionRepository::new(pool.clone());
    let insights = InsightRepository::new(pool.clone());
    let import_logs = ImportLogRepository::new(pool);

    let state = AppState {
        kpis: KpiService::new(projects.clone(), completions.clone()),
        copilot: CopilotService::new(
            projects.clone(),
            completions.clone(),
            insights.clone(),
            ResponseStrategy::from_env(),
        ),
        importer: ImportService::new(completions.clone(), import_logs.clone()),
        exporter: ExportService::new(projects.clone(), completions.clone()),
        auth: AuthClient::from_env(),
        projects,
        completions,
        insights,
        import_logs,
    };

    let app = create_router(state);

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Project hierarchy
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:id", put(update_project).delete(delete_project))
        .route("/api/projects/:id/systems", get(list_systems))
        .route("/api/systems", post(create_system))
        .route("/api/systems/:id", put(update_system).delete(delete_system))
        .route("/api/systems/:id/subsystems", get(list_subsystems))
        .route("/api/subsystems", post(create_subsystem))
        .route(
            "/api/subsystems/:id",
            put(update_subsystem).delete(delete_subsystem),
        )
        // KPIs
        .route("/api/systems/:id/kpis", get(system_kpis))
        .route("/api/subsystems/:id/kpis", get(subsystem_kpis))
        // Completion record listings
        .route("/api/subsystems/:id/itrs", get(list_itrs))
        .route("/api/subsystems/:id/punch-items", get(list_punch_items))
        .route("/api/subsystems/:id/tags", get(list_tags))
        // Copilot
        .route("/api/copilot/query", post(copilot_query))
        .route("/api/projects/:id/insights", get(list_insights))
        // Bulk import
        .route("/api/import/csv", post(import_csv))
        .route("/api/import/json", post(import_json))
        .route("/api/projects/:id/import-logs", get(list_import_logs))
        // Reporting export
        .route("/api/export/:project_id", get(export_project))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<String>> {
    ApiResponse::ok("OK".to_string())
}

// ============================================
// Project hierarchy
// ============================================

async fn list_projects(
    State(state): State<AppState>,
) -> ApiResult<Vec<completions::models::Project>> {
    let projects = state.projects.list_projects().await.map_err(wrap_db)?;
    Ok(ApiResponse::ok(projects))
}

async fn create_project(
    State(state): State<AppState>,
    Json(fields): Json<NewProject>,
) -> ApiResult<completions::models::Project> {
    let project = state.projects.create_project(&fields).await.map_err(wrap_db)?;
    Ok(ApiResponse::ok(project))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<UpdateProject>,
) -> ApiResult<bool> {
    let updated = state
        .projects
        .update_project(id, &fields)
        .await
        .map_err(wrap_db)?;
    if !updated {
        return Err(ApiError::not_found(format!("project {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

async fn delete_project(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<bool> {
    let deleted = state.projects.delete_project(id).await.map_err(wrap_db)?;
    if !deleted {
        return Err(ApiError::not_found(format!("project {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

async fn list_systems(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::System>> {
    let systems = state
        .projects
        .systems_for_project(project_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(systems))
}

async fn create_system(
    State(state): State<AppState>,
    Json(fields): Json<NewSystem>,
) -> ApiResult<completions::models::System> {
    let system = state.projects.create_system(&fields).await.map_err(wrap_db)?;
    Ok(ApiResponse::ok(system))
}

async fn update_system(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<UpdateSystem>,
) -> ApiResult<bool> {
    let updated = state
        .projects
        .update_system(id, &fields)
        .await
        .map_err(wrap_db)?;
    if !updated {
        return Err(ApiError::not_found(format!("system {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

async fn delete_system(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<bool> {
    let deleted = state.projects.delete_system(id).await.map_err(wrap_db)?;
    if !deleted {
        return Err(ApiError::not_found(format!("system {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

async fn list_subsystems(
    State(state): State<AppState>,
    Path(system_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::Subsystem>> {
    let subsystems = state
        .projects
        .subsystems_for_system(system_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(subsystems))
}

async fn create_subsystem(
    State(state): State<AppState>,
    Json(fields): Json<NewSubsystem>,
) -> ApiResult<completions::models::Subsystem> {
    let subsystem = state
        .projects
        .create_subsystem(&fields)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(subsystem))
}

async fn update_subsystem(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<UpdateSubsystem>,
) -> ApiResult<bool> {
    let updated = state
        .projects
        .update_subsystem(id, &fields)
        .await
        .map_err(wrap_db)?;
    if !updated {
        return Err(ApiError::not_found(format!("subsystem {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

async fn delete_subsystem(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<bool> {
    let deleted = state.projects.delete_subsystem(id).await.map_err(wrap_db)?;
    if !deleted {
        return Err(ApiError::not_found(format!("subsystem {id} not found")));
    }
    Ok(ApiResponse::ok(true))
}

// ============================================
// KPIs
// ============================================

async fn system_kpis(
    State(state): State<AppState>,
    Path(system_id): Path<Uuid>,
) -> ApiResult<completions::kpi::SystemKpis> {
    let kpis = state.kpis.system_kpis(system_id).await?;
    Ok(ApiResponse::ok(kpis))
}

async fn subsystem_kpis(
    State(state): State<AppState>,
    Path(subsystem_id): Path<Uuid>,
) -> ApiResult<completions::kpi::SubsystemKpis> {
    let kpis = state.kpis.subsystem_kpis(subsystem_id).await?;
    Ok(ApiResponse::ok(kpis))
}

// ============================================
// Completion record listings
// ============================================

async fn list_itrs(
    State(state): State<AppState>,
    Path(subsystem_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::Itr>> {
    let itrs = state
        .completions
        .itrs_for_subsystem(subsystem_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(itrs))
}

async fn list_punch_items(
    State(state): State<AppState>,
    Path(subsystem_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::PunchItem>> {
    let items = state
        .completions
        .punch_items_for_subsystem(subsystem_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(items))
}

async fn list_tags(
    State(state): State<AppState>,
    Path(subsystem_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::Tag>> {
    let tags = state
        .completions
        .tags_for_subsystem(subsystem_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(tags))
}

// ============================================
// Copilot
// ============================================

async fn copilot_query(
    State(state): State<AppState>,
    Json(request): Json<CopilotQuestion>,
) -> ApiResult<completions::copilot::CopilotAnswer> {
    let answer = state.copilot.answer_question(&request).await?;
    Ok(ApiResponse::ok(answer))
}

async fn list_insights(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::Insight>> {
    let insights = state
        .insights
        .list_for_project(project_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(insights))
}

// ============================================
// Bulk import
// ============================================

/// Resolve the bearer token in the request headers into a session via the
/// auth collaborator. Import endpoints reject anonymous callers.
async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionContext, ApiError> {
    let auth = state.auth.as_ref().ok_or_else(ApiError::unauthorized)?;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthorized)?;
    Ok(auth.get_user(token).await?)
}

async fn import_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<completions::import::ImportOutcome> {
    let session = require_session(&state, &headers).await?;

    let mut file_text: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut entity_type: Option<String> = None;
    let mut project_id: Option<Uuid> = None;
    let mut system_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                file_text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("unreadable file: {e}")))?,
                );
            }
            Some("entity_type") => {
                entity_type = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            Some("project_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                project_id = Some(
                    raw.parse()
                        .map_err(|_| ApiError::bad_request("project_id is not a valid uuid"))?,
                );
            }
            Some("system_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                if !raw.trim().is_empty() {
                    system_id = Some(
                        raw.parse()
                            .map_err(|_| ApiError::bad_request("system_id is not a valid uuid"))?,
                    );
                }
            }
            _ => {}
        }
    }

    let (file_text, entity_type, project_id) = match (file_text, entity_type, project_id) {
        (Some(f), Some(e), Some(p)) => (f, e, p),
        _ => return Err(ApiError::bad_request("Faltan parámetros requeridos")),
    };

    let request = ImportRequest {
        entity_type,
        project_id,
        system_id,
        file_name,
    };
    let outcome = state.importer.import_csv(&session, &request, &file_text).await?;
    Ok(ApiResponse::ok(outcome))
}

#[derive(Deserialize)]
struct JsonImportBody {
    entity_type: String,
    project_id: Uuid,
    system_id: Option<Uuid>,
    data: Vec<JsonValue>,
}

async fn import_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<JsonImportBody>,
) -> ApiResult<completions::import::ImportOutcome> {
    let session = require_session(&state, &headers).await?;

    let request = ImportRequest {
        entity_type: body.entity_type,
        project_id: body.project_id,
        system_id: body.system_id,
        file_name: None,
    };
    let outcome = state
        .importer
        .import_records(&session, &request, body.data)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

async fn list_import_logs(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Vec<completions::models::ImportLog>> {
    let logs = state
        .import_logs
        .list_for_project(project_id)
        .await
        .map_err(wrap_db)?;
    Ok(ApiResponse::ok(logs))
}

// ============================================
// Reporting export
// ============================================

#[derive(Deserialize)]
struct ExportQuery {
    system_id: Option<Uuid>,
}

async fn export_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .exporter
        .export_project(project_id, query.system_id)
        .await?;

    let disposition = format!("attachment; filename=\"project-export-{}.json\"", project_id);
    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(snapshot),
    )
        .into_response())
}

/// Repository errors arrive as anyhow; wrap them into the core taxonomy so
/// the envelope mapping stays in one place.
fn wrap_db(err: anyhow::Error) -> ApiError {
    ApiError::from(CompletionsError::Database(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let err = ApiError::bad_request("Faltan parámetros requeridos");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Faltan parámetros requeridos");
    }

    #[test]
    fn test_provider_errors_map_to_bad_gateway() {
        let err = ApiError::from(CompletionsError::Provider {
            status: 500,
            message: "upstream down".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err = ApiError::from(CompletionsError::Unauthorized);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
