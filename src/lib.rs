pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod rate_limit;

use actix_web::{middleware::from_fn, web};
use std::sync::Arc;
use std::time::Duration;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthenticatedUser, TokenCodec, UserService};
pub use db::{DbOperations, User, UserRepository};
pub use rate_limit::{RateLimitConfig, RateLimiter};

/// Application state shared across all workers.
///
/// This is the composition root: the signing secret, the user store and the
/// rate limiter are chosen here once and handed to everything else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<TokenCodec>,
    pub limiter: Arc<RateLimiter>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Connect to PostgreSQL and the rate limit backend named in `config`.
    pub async fn new(config: Settings) -> Result<Self> {
        config.validate()?;

        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(5),
        )
        .await?;
        db.migrate().await?;

        let limiter = RateLimiter::connect(&config.rate_limit).await?;

        Self::with_components(config, Arc::new(db), Arc::new(limiter))
    }

    /// Assemble state from an already-built user store and limiter.
    pub fn with_components(
        config: Settings,
        users: Arc<dyn UserRepository>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        config.validate()?;

        let tokens = Arc::new(TokenCodec::new(config.auth.jwt_secret.clone(), config.token_ttl()?)?);
        let user_service = Arc::new(UserService::new(users.clone(), tokens.clone()));

        Ok(Self {
            config: Arc::new(config),
            users,
            tokens,
            limiter,
            user_service,
        })
    }
}

/// Public and protected routes. Only `/me` passes through the auth gate;
/// register and login mint tokens themselves.
///
/// The rate limiter is applied around the whole app with
/// `App::wrap(from_fn(rate_limit::rate_limit))` so it runs first.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(auth::handlers::health_check))
        .route("/register", web::post().to(auth::handlers::register))
        .route("/login", web::post().to(auth::handlers::login))
        .service(
            web::resource("/me")
                .wrap(from_fn(auth::require_auth))
                .route(web::get().to(auth::handlers::me)),
        );
}
