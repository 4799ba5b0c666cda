use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch},
};

/// Moderator Router Module
///
/// Defines the routes requiring an authenticated session. The router is
/// wrapped (in `create_router`) in a middleware layer that resolves the
/// session up front; the moderator role itself is then authorized inside the
/// services and handlers, so a submitter-role session passes the layer but is
/// still refused with 403.
pub fn moderator_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /sessions/current
        // The caller's own session, mostly for back-office bootstrapping.
        .route("/sessions/current", get(handlers::current_session))
        // PATCH /submissions/{id}/approve | /reject
        // The two legal transitions out of `pending`. Racing decisions on the
        // same id resolve to exactly one 200 and one 409.
        .route(
            "/submissions/{id}/approve",
            patch(handlers::approve_submission),
        )
        .route(
            "/submissions/{id}/reject",
            patch(handlers::reject_submission),
        )
        // DELETE /submissions/{id}
        // Removes the record outright (any state).
        .route("/submissions/{id}", delete(handlers::delete_submission))
        // --- Contact inbox ---
        .route("/messages", get(handlers::list_messages))
        .route("/messages/{id}", patch(handlers::update_message))
        // GET /stats
        // Dashboard counters for the moderation queue and inbox.
        .route("/stats", get(handlers::get_stats))
}
