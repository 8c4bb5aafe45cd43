//! Axum router assembly.

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use switchyard_app::ports::DeviceClient;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api`, behind Basic authentication when
/// users are configured. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level.
pub fn build<C>(state: AppState<C>) -> Router
where
    C: DeviceClient + 'static,
{
    let mut api = crate::api::routes();
    if !state.credentials.is_empty() {
        api = api.route_layer(middleware::from_fn_with_state(
            state.credentials.clone(),
            crate::auth::require_user,
        ));
    }
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
