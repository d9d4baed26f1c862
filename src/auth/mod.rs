//! Authentication for the user service.
//!
//! Password hashing, bearer token issuance and validation, the gate that
//! protects routes, and the register/login flow built on top of them.

pub mod gate;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;
pub mod validation;

pub use gate::{authorize, bearer_token, require_auth, AuthenticatedUser};
pub use password::{hash_password, verify_password};
pub use service::{LoginResponse, UserService};
pub use token::{issue_token, parse_token, Claims, TokenCodec};
