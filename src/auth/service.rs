use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenCodec;
use crate::auth::validation::{validate_login, validate_register};
use crate::db::{NewUser, User, UserRepository};
use crate::error::{AppError, AuthError, DatabaseError};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Register and login. These run before any token exists, so they use the
/// hasher and the codec directly instead of going through the gate.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenCodec>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenCodec>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<LoginResponse, AppError> {
        if let Err(e) = validate_register(email, password, username) {
            warn!(email, error = %e, "registration validation failed");
            return Err(e.into());
        }

        match self.users.find_by_email(email).await {
            Ok(_) => return Err(DatabaseError::Duplicate.into()),
            Err(DatabaseError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))??;

        let user = self
            .users
            .create(&NewUser::new(email.to_owned(), password_hash, username.to_owned()))
            .await?;

        let token = self.tokens.issue(&user).map_err(|e| {
            error!(error = %e, "failed to generate token");
            e
        })?;

        info!(email, user_id = user.id, "user registered");
        Ok(LoginResponse { user, token })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        if let Err(e) = validate_login(email, password) {
            warn!(email, error = %e, "login validation failed");
            return Err(e.into());
        }

        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound) => {
                warn!(email, "user not found");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };

        let password = password.to_owned();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        if !matches {
            warn!(email, "wrong password for user");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            warn!(email, "login attempt for inactive user");
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.tokens.issue(&user).map_err(|e| {
            error!(error = %e, "failed to generate token");
            e
        })?;

        info!(email, "login successful");
        Ok(LoginResponse { user, token })
    }
}
