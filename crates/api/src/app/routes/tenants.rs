use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::app::dto::{ApiResponse, TenantAccessDto, ok};
use crate::context::{CurrentUser, TenantContext};
use crate::middleware;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:tenant_id/access", get(access))
        .route_layer(from_fn_with_state(state, middleware::require_tenant_access))
}

/// Reports on which basis the caller may act within the tenant.
pub async fn access(
    CurrentUser(user): CurrentUser,
    tenant: TenantContext,
) -> Json<ApiResponse<TenantAccessDto>> {
    ok(TenantAccessDto {
        tenant_id: tenant.tenant_id(),
        user_id: user.id,
        access: tenant.access().clone(),
    })
}
