use super::{handlers, state::AppState};
use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let cors_origin = app_state.config.cors_origin.clone();

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/chat/query", post(handlers::query_handler))
        .route("/chat/feedback", post(handlers::feedback_handler))
        .route("/chat/escalate", post(handlers::escalate_handler))
        .route("/chat/end-session", post(handlers::end_session_handler))
        .route("/chat/history", get(handlers::history_handler))
        .route(
            "/faq",
            get(handlers::list_faq_handler).post(handlers::create_faq_handler),
        )
        .route(
            "/faq/{id}",
            put(handlers::update_faq_handler).delete(handlers::delete_faq_handler),
        )
        .route(
            "/erp/integrations",
            get(handlers::list_integrations_handler).post(handlers::create_integration_handler),
        )
        .route(
            "/erp/execute/{id}",
            post(handlers::execute_integration_handler),
        )
        .route("/analytics/usage", get(handlers::usage_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(value) => {
                router = router.layer(
                    CorsLayer::new()
                        .allow_origin(value)
                        .allow_methods(tower_http::cors::Any)
                        .allow_headers(tower_http::cors::Any),
                );
            }
            Err(e) => warn!(%origin, error = %e, "Ignoring unparsable CORS origin"),
        }
    }

    router
}
