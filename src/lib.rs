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
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod storage;
pub mod validation;

// Module for routing segregation (Public, Reader, Writer).
pub mod routes;
use auth::{AuthUser, ROLE_READER, ROLE_WRITER};
use error::ApiError;
use routes::{public, reader, writer};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and the integration tests.
pub use config::AppConfig;
pub use repository::{MockRepository, PostgresRepository, RepositoryState};
pub use storage::{ImageStoreState, LocalImageStore, MockImageStore};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application. It aggregates all API paths and data schemas decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::register, handlers::login,
        handlers::get_regions, handlers::get_region, handlers::create_region,
        handlers::update_region, handlers::delete_region,
        handlers::get_difficulties, handlers::get_difficulty,
        handlers::get_walks, handlers::get_walk, handlers::create_walk,
        handlers::update_walk, handlers::delete_walk,
        handlers::upload_image
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::RegionDto, models::DifficultyDto, models::WalkDto, models::ImageDto,
            models::AddRegionRequest, models::UpdateRegionRequest,
            models::AddWalkRequest, models::UpdateWalkRequest,
            models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            validation::FieldError,
        )
    ),
    tags(
        (name = "trailwalks", description = "TrailWalks catalogue API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe,
/// and immutable container holding all essential application services and
/// configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Image Store: abstracts where uploaded image bytes land.
    pub images: ImageStoreState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors and middleware to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for ImageStoreState {
    fn from_ref(app_state: &AppState) -> ImageStoreState {
        app_state.images.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// reader_middleware
///
/// Role gate for the read-only routes. The `AuthUser` extractor has already
/// rejected requests without a valid token (401); this layer then requires
/// the `Reader` or `Writer` role claim before the handler body executes,
/// rejecting with 403 otherwise.
async fn reader_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if auth_user.has_any_role(&[ROLE_READER, ROLE_WRITER]) {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// writer_middleware
///
/// Role gate for the mutating routes: requires the `Writer` role claim.
async fn writer_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if auth_user.has_any_role(&[ROLE_WRITER]) {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Forbidden)
    }
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

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Uploaded images are served statically from the configured directory.
    let image_dir = state.config.image_dir.clone();

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware applied.
        .merge(public::public_routes())
        // Reader Routes: token required, Reader or Writer role required.
        .merge(
            reader::reader_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    reader_middleware,
                )),
        )
        // Writer Routes: token required, Writer role required.
        .merge(
            writer::writer_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    writer_middleware,
                )),
        )
        // Static hosting for the uploaded image files.
        .nest_service("/images", ServeDir::new(image_dir))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in
                // a tracing span that carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns the x-request-id header
                // to the client for end-to-end correlation.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize the tracing span
/// creation. It extracts the `x-request-id` header (if present) and includes
/// it in the structured logging metadata alongside the HTTP method and URI,
/// so every log line for a single request is correlated by a unique ID.
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
