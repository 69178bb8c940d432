use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_context::{
    make_span_with_request_id, request_id_middleware, sync_mode_middleware,
};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session
        .route("/session", get(handlers::get_session))
        .route("/session", put(handlers::switch_session))
        // Lists
        .route("/lists", get(handlers::get_lists))
        .route("/lists/:list/:id", get(handlers::contains_item))
        .route("/lists/:list/:id", post(handlers::add_item))
        .route("/lists/:list/:id", delete(handlers::remove_item))
        .route("/lists/:list/:id/rating", put(handlers::update_rating))
        // Notifications
        .route("/notifications", get(handlers::get_notifications))
        .route("/notifications/:id", delete(handlers::dismiss_notification))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sync_mode_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
