use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

/// Body text for every rejection produced by the auth gate.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
/// Body text for rate-limited requests.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Try again later.";
/// Body text for failed logins; never says which half of the pair was wrong.
pub const INVALID_LOGIN_MESSAGE: &str = "invalid email or password";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl AppError {
    /// The message sent to the client. Auth failures collapse to fixed
    /// strings so the body never reveals why a credential was refused.
    pub fn public_message(&self) -> String {
        match self {
            AppError::AuthError(AuthError::RateLimited) => RATE_LIMITED_MESSAGE.to_string(),
            AppError::AuthError(AuthError::InvalidCredentials) => INVALID_LOGIN_MESSAGE.to_string(),
            AppError::AuthError(e) if e.is_rejection() => UNAUTHORIZED_MESSAGE.to_string(),
            AppError::AuthError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
            AppError::DatabaseError(DatabaseError::Duplicate) => "email already exists".to_string(),
            AppError::DatabaseError(DatabaseError::NotFound) => "Record not found".to_string(),
            AppError::DatabaseError(_) => "Internal server error".to_string(),
            AppError::ValidationError(e) => e.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.public_message()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AppError::AuthError(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::AuthError(e) if e.is_rejection() => StatusCode::UNAUTHORIZED,
            AppError::AuthError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(DatabaseError::Duplicate) => StatusCode::CONFLICT,
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    // Configuration and issuance.
    #[error("Signing secret is empty")]
    EmptySecret,

    #[error("Invalid user for token issuance")]
    InvalidUser,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Password exceeds {0} bytes")]
    PasswordTooLong(usize),

    #[error("Token lifetime out of range")]
    InvalidTtl,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Token validation.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token is missing a required claim")]
    MissingClaim,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    // Request shape at the gate.
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Malformed Authorization header")]
    MalformedHeader,

    #[error("Empty bearer token")]
    EmptyToken,

    #[error("User lookup failed")]
    LookupFailed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited,
}

impl AuthError {
    /// True for every outcome that must surface as a plain 401.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken
                | AuthError::MissingClaim
                | AuthError::Expired
                | AuthError::NotYetValid
                | AuthError::MissingHeader
                | AuthError::MalformedHeader
                | AuthError::EmptyToken
                | AuthError::LookupFailed
                | AuthError::Unauthorized
        )
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::Duplicate
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid email format")]
    InvalidEmail,

    #[error("password must be at least 8 characters")]
    PasswordTooShort,

    #[error("password must be at most 72 bytes")]
    PasswordTooLong,

    #[error("username must be 3-30 characters, alphanumeric")]
    InvalidUsername,

    #[error("invalid credentials")]
    InvalidCredentials,
}
