#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use user_service::auth::hash_password;
use user_service::db::{NewUser, User, UserRepository};
use user_service::error::DatabaseError;
use user_service::{AppState, RateLimitConfig, RateLimiter, Settings};

/// User store kept in a vector, with a switch to simulate an outage.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
    unavailable: AtomicBool,
}

impl InMemoryUsers {
    pub async fn insert(&self, email: &str, password: &str, active: bool) -> User {
        let mut new_user = NewUser::new(
            email.to_string(),
            hash_password(password).unwrap(),
            email.split('@').next().unwrap().to_string(),
        );
        new_user.is_active = active;
        self.create(&new_user).await.unwrap()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, user: &NewUser) -> Result<User, DatabaseError> {
        self.check_available()?;
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate);
        }
        let created = user.clone().into_user(users.len() as i64 + 1);
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        self.check_available()?;
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, DatabaseError> {
        self.check_available()?;
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }
}

/// State with in-process counters admitting `limit` requests per minute.
pub fn test_state(limit: u32) -> (AppState, Arc<InMemoryUsers>) {
    let settings = Settings::new_for_test().expect("Failed to load test config");
    let users = Arc::new(InMemoryUsers::default());
    let limiter = Arc::new(RateLimiter::in_memory(RateLimitConfig {
        limit,
        window: chrono::Duration::minutes(1),
    }));

    let state = AppState::with_components(settings, users.clone(), limiter)
        .expect("Failed to build app state");
    (state, users)
}
