use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    middleware::Next,
    web, Error, ResponseError,
};
use tracing::warn;

use super::{client_key, Decision};
use crate::error::{AppError, AuthError};
use crate::AppState;

pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Outermost middleware: admits or refuses the request before any routing
/// or authentication work happens.
pub async fn rate_limit<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        let err = AppError::InternalError("application state not configured".into());
        return Ok(req.into_response(err.error_response()).map_into_right_body());
    };

    let key = req
        .peer_addr()
        .map(|addr| client_key(&addr.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let decision = state.limiter.admit(&key).await;

    if !decision.allowed {
        warn!(client = %key, limit = decision.limit, "rate limit exceeded");
        let mut response = AppError::AuthError(AuthError::RateLimited).error_response();
        set_headers(response.headers_mut(), &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from(decision.reset_after.as_secs().max(1)),
        );
        return Ok(req.into_response(response).map_into_right_body());
    }

    let mut res = next.call(req).await?;
    set_headers(res.headers_mut(), &decision);
    Ok(res.map_into_left_body())
}

fn set_headers(headers: &mut actix_web::http::header::HeaderMap, decision: &Decision) {
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
        HeaderValue::from(decision.remaining),
    );
}
