use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use crate::app::AppState;
use crate::middleware;

pub mod system;
pub mod tenants;
pub mod webhooks;

/// Router for every endpoint, each group behind its auth sequence.
pub fn router(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/me", get(system::me))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let optional = Router::new()
        .route("/session", get(system::session))
        .route_layer(from_fn_with_state(state.clone(), middleware::optional_auth));

    Router::new()
        .route("/health", get(system::health))
        .merge(authenticated)
        .merge(optional)
        .nest("/tenants", tenants::router(state))
        .nest("/webhooks", webhooks::router())
}
