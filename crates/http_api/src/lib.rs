mod assets;
mod errors;
mod handlers;
mod middleware;
mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, put},
};

pub use state::{BasicCredentials, HttpState};

pub fn router(state: HttpState) -> Router<()> {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/summary", get(handlers::summary))
        .route("/daily", get(handlers::daily))
        .route("/offset", put(handlers::offset_put))
        .route("/state", get(handlers::state_get).put(handlers::state_put));

    // Every route sits behind basic auth, dashboard included.
    Router::new()
        .nest("/api", api)
        .route("/", get(handlers::dashboard))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_basic_auth,
        ))
        .with_state(state)
}
