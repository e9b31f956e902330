// ============================
// crates/backend-lib/src/routes/account.rs
// ============================
//! Account endpoints.
use crate::auth::CurrentPrincipal;
use crate::error::AppError;
use crate::store::PrincipalId;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use easymeal_common::{CredentialsRequest, LoginRequest, PrincipalSummary, TokenResponse};
use std::sync::Arc;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::InvalidInput(e.body_text()))
}

/// `POST /temp-account`
pub async fn create_temp_account(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TokenResponse>, AppError> {
    let (_, token) = state.accounts.create_temporary(Utc::now()).await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// `POST /register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PrincipalSummary>), AppError> {
    let req = json_body(payload)?;
    let summary = state
        .accounts
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// `POST /login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let req = json_body(payload)?;
    let token = state
        .accounts
        .login(&req.username, &req.password, Utc::now())
        .await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// `POST /convert-account`
pub async fn convert_account(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(me): CurrentPrincipal,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<PrincipalSummary>, AppError> {
    let req = json_body(payload)?;
    let summary = state
        .accounts
        .convert(PrincipalId(me.id), &req.username, &req.email, &req.password)
        .await?;
    Ok(Json(summary))
}

/// `GET /me`
pub async fn me(CurrentPrincipal(me): CurrentPrincipal) -> Json<PrincipalSummary> {
    Json(me)
}
