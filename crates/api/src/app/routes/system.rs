use axum::Json;

use learnhub_auth::AuthenticatedIdentity;
use learnhub_core::AppError;

use crate::app::dto::{ApiResponse, HealthDto, SessionDto, ok};
use crate::app::errors::ApiError;
use crate::context::{CurrentUser, MaybeUser};

pub async fn health() -> Json<ApiResponse<HealthDto>> {
    ok(HealthDto { status: "ok" })
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<AuthenticatedIdentity>> {
    ok(user)
}

pub async fn session(MaybeUser(user): MaybeUser) -> Json<ApiResponse<SessionDto>> {
    ok(SessionDto {
        authenticated: user.is_some(),
        user,
    })
}

pub async fn not_found() -> ApiError {
    AppError::not_found("Route").into()
}
