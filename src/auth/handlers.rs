use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::gate::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!(email = %req.email, "received registration request");

    let response = state
        .user_service
        .register(&req.email, &req.password, &req.username)
        .await?;

    info!(email = %req.email, user_id = response.user.id, "registration successful");
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!(email = %req.email, "received login request");

    let response = state.user_service.login(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Returns the caller resolved by the auth gate.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    let user = user.into_inner();

    HttpResponse::Ok().json(json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "role": user.role,
        "created_at": user.created_at,
        "is_active": user.is_active,
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
