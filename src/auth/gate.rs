//! Request gate for protected routes.
//!
//! [`authorize`] runs the header → token → user lookup checks and returns
//! the current user record. [`require_auth`] wraps it as actix-web middleware:
//! whatever the internal reason, a refused request gets the same 401 body.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::{ready, Ready};
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::token::TokenCodec;
use crate::db::{User, UserRepository};
use crate::error::{AppError, AuthError};
use crate::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the token out of an `Authorization` header value.
///
/// Only `Bearer <token>` with exactly one space is accepted.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    if token.contains(' ') {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Resolve the caller behind an `Authorization` header.
///
/// Token failures are reported as [`AuthError::Unauthorized`] and store
/// failures (including timeouts) as [`AuthError::LookupFailed`]; the
/// precise token defect is only logged.
pub async fn authorize(
    header: Option<&str>,
    tokens: &TokenCodec,
    users: &dyn UserRepository,
    lookup_timeout: Duration,
) -> Result<User, AuthError> {
    let token = bearer_token(header)?;

    let claims = tokens.parse(token).map_err(|reason| {
        debug!(%reason, "token rejected");
        AuthError::Unauthorized
    })?;

    // Claims are only a pointer; role and active flag come from the store.
    let user = match tokio::time::timeout(lookup_timeout, users.find_by_id(claims.user_id)).await {
        Ok(Ok(user)) => user,
        Ok(Err(e)) => {
            debug!(user_id = claims.user_id, error = %e, "user lookup failed");
            return Err(AuthError::LookupFailed);
        }
        Err(_) => {
            warn!(user_id = claims.user_id, "user lookup timed out");
            return Err(AuthError::LookupFailed);
        }
    };

    if !user.is_active {
        debug!(user_id = user.id, "inactive user presented a valid token");
        return Err(AuthError::Unauthorized);
    }

    Ok(user)
}

/// Middleware for protected routes. On success the resolved user is stored
/// in the request extensions as an [`AuthenticatedUser`].
pub async fn require_auth<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        let err = AppError::InternalError("application state not configured".into());
        return Ok(req.into_response(err.error_response()).map_into_right_body());
    };

    let header = match req.headers().get(AUTHORIZATION).map(|value| value.to_str()) {
        None => None,
        Some(Ok(value)) => Some(value.to_owned()),
        Some(Err(_)) => return Ok(reject(req, AuthError::MalformedHeader)),
    };

    let outcome = authorize(
        header.as_deref(),
        &state.tokens,
        state.users.as_ref(),
        state.config.lookup_timeout(),
    )
    .await;

    match outcome {
        Ok(user) => {
            debug!(user_id = user.id, path = req.path(), "request authenticated");
            req.extensions_mut().insert(AuthenticatedUser(user));
            Ok(next.call(req).await?.map_into_left_body())
        }
        Err(reason) => Ok(reject(req, reason)),
    }
}

fn reject<B>(req: ServiceRequest, reason: AuthError) -> ServiceResponse<EitherBody<B>> {
    warn!(%reason, path = req.path(), "request rejected by auth gate");
    let response = AppError::AuthError(AuthError::Unauthorized).error_response();
    req.into_response(response).map_into_right_body()
}

/// The user attached to a request by [`require_auth`].
///
/// Extracting it reads the request extensions, so handlers never trigger a
/// second store lookup within the same request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AppError::AuthError(AuthError::Unauthorized)),
        )
    }
}
