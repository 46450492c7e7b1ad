use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{post, put},
};

/// Request-body limit for the upload route: the image cap plus headroom for
/// multipart framing and the text fields. Axum's default limit is 2 MB, well
/// under the cap, so without this layer a valid upload never reaches the
/// handler's own size check.
const UPLOAD_BODY_LIMIT: usize = handlers::MAX_IMAGE_BYTES + 64 * 1024;

/// Writer Router Module
///
/// All catalogue mutations. Every route here is layered with the writer-role
/// middleware in `create_router`: a valid token carrying `Writer` is required
/// before any handler body executes.
pub fn writer_routes() -> Router<AppState> {
    Router::new()
        // POST /api/walks, PUT/DELETE /api/walks/{id}
        // Walk mutations. Boundary validation runs first; referential
        // integrity against regions and difficulties is the store's call.
        .route("/api/walks", post(handlers::create_walk))
        .route(
            "/api/walks/{id}",
            put(handlers::update_walk).delete(handlers::delete_walk),
        )
        // POST /api/regions, PUT/DELETE /api/regions/{id}
        .route("/api/regions", post(handlers::create_region))
        .route(
            "/api/regions/{id}",
            put(handlers::update_region).delete(handlers::delete_region),
        )
        // POST /api/images/upload
        // Multipart upload to the disk-backed image store; metadata row is
        // persisted and the public URL returned.
        .route(
            "/api/images/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
