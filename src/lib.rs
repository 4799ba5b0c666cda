use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod moderation;
pub mod repository;
pub mod session;

// Module for routing segregation (Public, Moderator).
pub mod routes;
use auth::AuthSession; // The resolved authenticated session.
use routes::{moderator, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the binary entry point and tests.
pub use auth::{GateState, IdentityGate, JwtSessionGate, StoredSessionGate};
pub use config::AppConfig;
pub use listing::ListingService;
pub use moderation::ModerationService;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::{MemorySessionStore, PgSessionStore, SessionStoreState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the service,
/// aggregating every annotated handler and schema. Served at
/// `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_submission, handlers::list_submissions, handlers::get_submission,
        handlers::approve_submission, handlers::reject_submission, handlers::delete_submission,
        handlers::login, handlers::logout, handlers::current_session,
        handlers::create_message, handlers::list_messages, handlers::update_message,
        handlers::get_stats
    ),
    components(
        schemas(
            models::Submission, models::PublicSubmission, models::NewSubmission,
            models::SubmissionState, models::ContactMessage, models::NewContactMessage,
            models::UpdateMessageRequest, models::MessageStatus, models::LoginRequest,
            models::SessionResponse, models::SessionInfo, models::GalleryStats,
        )
    ),
    tags(
        (name = "fan-gallery", description = "Moderated fan photo gallery API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across all incoming requests. Every
/// dependency is constructed once at process start and injected here; nothing
/// is reached through ambient global lookup.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts submission/message persistence.
    pub repo: RepositoryState,
    /// Identity Gate: the authentication seam (stored-session or JWT backend).
    pub gate: GateState,
    /// Moderation workflow over the repository.
    pub moderation: ModerationService,
    /// Public approved-only listing projection.
    pub listing: ListingService,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the services around the injected repository and gate.
    pub fn new(repo: RepositoryState, gate: GateState, config: AppConfig) -> Self {
        Self {
            moderation: ModerationService::new(repo.clone()),
            listing: ListingService::new(repo.clone()),
            repo,
            gate,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Allow extractors and handlers to selectively pull components from the shared
// AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for GateState {
    fn from_ref(app_state: &AppState) -> GateState {
        app_state.gate.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the moderator routes. It attempts to extract
/// `AuthSession` from the request; if token resolution fails the extractor
/// rejects with 401 before the handler runs. Role authorization happens a
/// layer deeper, in the services, so a valid-but-underprivileged session is a
/// 403 from there.
async fn auth_middleware(_auth: AuthSession, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Moderator routes: protected by the session-resolving middleware.
        .merge(
            moderator::moderator_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a
                // span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: includes the `x-request-id` header
/// (if present) alongside the HTTP method and URI so every log line of a
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
