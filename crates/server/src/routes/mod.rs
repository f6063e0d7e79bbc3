use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::{AppState, middleware::require_session};

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod boards;
pub mod comments;
pub mod events;
pub mod health;
pub mod labels;
pub mod lists;
pub mod notifications;
pub mod projects;
pub mod subtasks;
pub mod tasks;

pub fn router(state: AppState) -> Router {
    // WebSocket endpoints authenticate via `?token=` (browsers cannot set
    // headers on upgrades), so they sit outside the bearer-auth layer.
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(events::router());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .merge(projects::router(&state))
        .merge(boards::router(&state))
        .merge(lists::router(&state))
        .merge(tasks::router(&state))
        .merge(subtasks::router(&state))
        .merge(labels::router(&state))
        .merge(comments::router(&state))
        .merge(attachments::router(&state))
        .merge(notifications::router(&state))
        .layer(from_fn_with_state(state.clone(), require_session));

    let api = public_routes.merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(&state))
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match &state.config().cors_origin {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => base.allow_origin(value),
            Err(_) => {
                tracing::warn!(%origin, "invalid CORS origin, allowing any");
                base.allow_origin(Any)
            }
        },
        None => base.allow_origin(Any),
    }
}
