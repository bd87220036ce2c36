//! Response envelope and route DTOs.

use axum::Json;
use serde::Serialize;

use learnhub_auth::{AuthenticatedIdentity, TenantAccess};
use learnhub_core::{TenantId, UserId};

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub authenticated: bool,
    pub user: Option<AuthenticatedIdentity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAccessDto {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub access: TenantAccess,
}

#[derive(Debug, Serialize)]
pub struct WebhookAckDto {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}
