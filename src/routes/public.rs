use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are accessible without authentication. The two
/// listing endpoints (`GET /submissions`, `GET /submissions/{id}`) accept an
/// *optional* session: with a moderator session they serve the full records,
/// otherwise strictly the approved-only projection. A presented-but-invalid
/// token on these routes is rejected outright rather than treated as
/// anonymous.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /submissions
        // Accepts a new fan photo into the moderation queue (always `pending`).
        // GET /submissions?state=approved
        // Public gallery listing; moderators get the unfiltered view here too.
        .route(
            "/submissions",
            post(handlers::create_submission).get(handlers::list_submissions),
        )
        // GET /submissions/{id}
        // Detail view, approved-only for anonymous callers.
        .route("/submissions/{id}", get(handlers::get_submission))
        // POST /messages
        // Contact form intake; lands in the moderator inbox as `unread`.
        .route("/messages", post(handlers::create_message))
        // POST /sessions
        // Credential exchange through the Identity Gate.
        // DELETE /sessions
        // Logout. Deliberately unauthenticated: destroying an absent or stale
        // session is a no-op 204, never an error.
        .route("/sessions", post(handlers::login).delete(handlers::logout))
}
