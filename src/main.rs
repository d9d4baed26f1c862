use actix_web::{middleware::from_fn, web, App, HttpServer};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use user_service::rate_limit;
use user_service::{configure_routes, AppError, AppState, Settings};

/// How often counters for closed windows are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> user_service::Result<()> {
    dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new()?;
    if let Err(e) = config.validate() {
        error!(error = %e, "refusing to start with invalid configuration");
        return Err(e);
    }
    info!("Configuration loaded successfully");

    let state = AppState::new(config.clone()).await?;
    info!(backend = state.limiter.backend(), "rate limiter ready");

    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match limiter.purge_expired().await {
                Ok(removed) => debug!(removed, "purged expired rate limit counters"),
                Err(e) => warn!(error = %e, "failed to purge rate limit counters"),
            }
        }
    });

    let state = web::Data::new(state);
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(rate_limit::rate_limit))
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    info!("server stopped");
    Ok(())
}
