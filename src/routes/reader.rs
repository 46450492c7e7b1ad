use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Reader Router Module
///
/// Read-only catalogue access. Every route here is layered with the
/// reader-role middleware in `create_router`: a valid token carrying either
/// `Reader` or `Writer` is required before any handler body executes.
pub fn reader_routes() -> Router<AppState> {
    Router::new()
        // GET /api/walks?filterOn=&filterQuery=&sortBy=&isAscending=&pageNumber=&pageSize=
        // The listing pipeline over the walk collection. Unrecognized filter
        // and sort selectors degrade silently to the unfiltered/unsorted view.
        .route("/api/walks", get(handlers::get_walks))
        // GET /api/walks/{id}
        .route("/api/walks/{id}", get(handlers::get_walk))
        // GET /api/regions and GET /api/regions/{id}
        .route("/api/regions", get(handlers::get_regions))
        .route("/api/regions/{id}", get(handlers::get_region))
        // GET /api/difficulties and GET /api/difficulties/{id}
        // Lookup data only; there are deliberately no mutation routes for it.
        .route("/api/difficulties", get(handlers::get_difficulties))
        .route("/api/difficulties/{id}", get(handlers::get_difficulty))
}
