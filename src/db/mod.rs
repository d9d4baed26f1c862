//! User store for the service.
//!
//! The auth core only needs [`UserRepository`]; [`DbOperations`] is the
//! PostgreSQL implementation wired up by the binary.

pub mod models;
pub mod operations;

use async_trait::async_trait;

use crate::error::DatabaseError;

pub use models::{NewUser, User, DEFAULT_ROLE};
pub use operations::DbOperations;

/// Lookup and creation of user records.
///
/// Implementations may perform network I/O; callers treat every method as a
/// suspension point. Missing rows are reported as [`DatabaseError::NotFound`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<User, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<User, DatabaseError>;
}
