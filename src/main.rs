use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use bridge_core::{
    BridgeConfig, CanonicalPatientRecord, EnvValues, IngestError, ResolutionError, SourcePayload,
    SourceSystem, TargetSystem, TransferError, TransferService,
};
use bridge_transport::{SourceHttpClient, TargetHttpClient};

type Service = TransferService<Arc<dyn SourceSystem>, Arc<dyn TargetSystem>>;

/// Application state shared across REST API handlers
#[derive(Clone)]
struct AppState {
    service: Arc<Service>,
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct NameQuery {
    /// Name or part of a name
    name: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ReverseQuery {
    /// Project the patient without submitting it
    #[serde(default)]
    dry_run: bool,
}

#[derive(Serialize, ToSchema)]
struct SourceSummaryRes {
    uuid: String,
    display: String,
    record_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct SourceSearchRes {
    patients: Vec<SourceSummaryRes>,
}

#[derive(Serialize, ToSchema)]
struct CanonicalRes {
    #[schema(value_type = Object)]
    record: CanonicalPatientRecord,
    warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
struct TargetSearchRes {
    #[schema(value_type = Vec<Object>)]
    patients: Vec<fhir::Patient>,
}

#[derive(Serialize, ToSchema)]
struct ForwardRes {
    status: u16,
    id: Option<String>,
    #[schema(value_type = Object)]
    submitted: fhir::Patient,
    warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
struct ReverseRes {
    /// Absent on a dry run
    status: Option<u16>,
    id: Option<String>,
    #[schema(value_type = Object)]
    payload: SourcePayload,
    warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
struct ErrorRes {
    error: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        search_source,
        canonical_record,
        transfer_to_target,
        search_target,
        transfer_to_source,
    ),
    components(schemas(
        HealthRes,
        SourceSummaryRes,
        SourceSearchRes,
        CanonicalRes,
        TargetSearchRes,
        ForwardRes,
        ReverseRes,
        ErrorRes,
    ))
)]
struct ApiDoc;

// ============================================================================
// Errors
// ============================================================================

struct ApiError(TransferError);

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        Self(err)
    }
}

fn resolution_status(err: &ResolutionError) -> StatusCode {
    match err {
        ResolutionError::NotFound { .. } => StatusCode::NOT_FOUND,
        ResolutionError::InvalidLocator { .. } => StatusCode::BAD_REQUEST,
        ResolutionError::Unreachable { .. }
        | ResolutionError::MalformedPayload { .. }
        | ResolutionError::Remote { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TransferError::Search(e) | TransferError::RecordFetch(e) => resolution_status(e),
            TransferError::MissingRecordLink { .. } => StatusCode::NOT_FOUND,
            TransferError::Ingest(_) => StatusCode::BAD_GATEWAY,
        };
        // The receiving system's own text, unwrapped.
        let error = match self.0 {
            TransferError::Ingest(IngestError::Rejected { message, .. }) => message,
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(%status, %error, "request failed");
        } else {
            tracing::warn!(%status, %error, "request failed");
        }
        (status, Json(ErrorRes { error })).into_response()
    }
}

// ============================================================================
// Server
// ============================================================================

fn app(service: Arc<Service>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/source/patients", get(search_source))
        .route("/source/patients/:id/canonical", get(canonical_record))
        .route("/source/patients/:id/transfer", post(transfer_to_target))
        .route("/target/patients", get(search_target))
        .route("/target/patients/:id/transfer", post(transfer_to_source))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// Main entry point for the bridge REST server
///
/// # Environment Variables
/// - `BRIDGE_SOURCE_URL`: base URL of the source proxy
/// - `BRIDGE_TARGET_URL`: base URL of the FHIR server
/// - `BRIDGE_FETCH_TIMEOUT_MS`: per-fetch timeout in milliseconds
/// - `BRIDGE_REST_ADDR`: listen address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - the configuration is invalid,
/// - an HTTP client cannot be built, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bridge_run=info".parse()?)
                .add_directive("bridge_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = BridgeConfig::from_env_values(EnvValues::from_process_env())?;
    let source = SourceHttpClient::new(cfg.source_base_url().clone(), cfg.fetch_timeout())?;
    let target = TargetHttpClient::new(cfg.target_base_url().clone(), cfg.fetch_timeout())?;
    let service = TransferService::new(
        Arc::new(source) as Arc<dyn SourceSystem>,
        Arc::new(target) as Arc<dyn TargetSystem>,
        cfg.fetch_timeout(),
    );

    tracing::info!(
        source = %cfg.source_base_url(),
        target = %cfg.target_base_url(),
        "++ Starting bridge REST on {}",
        cfg.rest_addr()
    );

    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app(Arc::new(service))).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "bridge is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/source/patients",
    params(NameQuery),
    responses(
        (status = 200, description = "Matching source patients, in source order", body = SourceSearchRes),
        (status = 502, description = "Source system failed", body = ErrorRes)
    )
)]
/// Search the source system by name
async fn search_source(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<SourceSearchRes>, ApiError> {
    let summaries = state.service.search_source(&query.name).await?;
    let patients = summaries
        .into_iter()
        .map(|s| SourceSummaryRes {
            record_id: s.record_id().map(str::to_string),
            uuid: s.uuid,
            display: s.display,
        })
        .collect();
    Ok(Json(SourceSearchRes { patients }))
}

#[utoipa::path(
    get,
    path = "/source/patients/{id}/canonical",
    params(("id" = String, Path, description = "Source record id")),
    responses(
        (status = 200, description = "Canonical record and anything that went wrong building it", body = CanonicalRes),
        (status = 404, description = "No such record", body = ErrorRes),
        (status = 502, description = "Source system failed", body = ErrorRes)
    )
)]
/// Assemble the canonical record for a source patient
async fn canonical_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CanonicalRes>, ApiError> {
    let forward = state.service.load_canonical(&id).await?;
    Ok(Json(CanonicalRes {
        warnings: forward.report.messages(),
        record: forward.record,
    }))
}

#[utoipa::path(
    post,
    path = "/source/patients/{id}/transfer",
    params(("id" = String, Path, description = "Source record id")),
    responses(
        (status = 201, description = "Patient created on the FHIR server", body = ForwardRes),
        (status = 404, description = "No such record", body = ErrorRes),
        (status = 502, description = "Source or FHIR server failed; FHIR rejections carry the server's message", body = ErrorRes)
    )
)]
/// Create a source patient on the FHIR server
async fn transfer_to_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ForwardRes>), ApiError> {
    let outcome = state.service.transfer_to_target(&id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ForwardRes {
            status: outcome.ack.status,
            id: outcome.ack.id,
            submitted: outcome.submitted,
            warnings: outcome.transfer.report.messages(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/target/patients",
    params(NameQuery),
    responses(
        (status = 200, description = "Matching FHIR patients", body = TargetSearchRes),
        (status = 502, description = "FHIR server failed", body = ErrorRes)
    )
)]
/// Search the FHIR server by name
async fn search_target(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<TargetSearchRes>, ApiError> {
    let patients = state.service.search_target(&query.name).await?;
    Ok(Json(TargetSearchRes { patients }))
}

#[utoipa::path(
    post,
    path = "/target/patients/{id}/transfer",
    params(
        ("id" = String, Path, description = "FHIR Patient id"),
        ReverseQuery
    ),
    responses(
        (status = 200, description = "Projected payload (dry run)", body = ReverseRes),
        (status = 201, description = "Payload ingested into the source system", body = ReverseRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 502, description = "FHIR server or source failed; source rejections carry its message", body = ErrorRes)
    )
)]
/// Ingest a FHIR patient into the source system
async fn transfer_to_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReverseQuery>,
) -> Result<(StatusCode, Json<ReverseRes>), ApiError> {
    if query.dry_run {
        let projection = state.service.prepare_reverse(&id).await?;
        return Ok((
            StatusCode::OK,
            Json(ReverseRes {
                status: None,
                id: None,
                warnings: projection.unmapped.iter().map(ToString::to_string).collect(),
                payload: projection.payload,
            }),
        ));
    }

    let outcome = state.service.transfer_to_source(&id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReverseRes {
            status: Some(outcome.ack.status),
            id: outcome.ack.id,
            warnings: outcome
                .projection
                .unmapped
                .iter()
                .map(ToString::to_string)
                .collect(),
            payload: outcome.projection.payload,
        }),
    ))
}
