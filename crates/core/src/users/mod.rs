//! User directory rules: roles, manager assignments and sign-up input.
//!
//! # Modules
//!
//! - `types` - Role, User and NewUser
//! - `error` - Directory error types
//! - `service` - Manager-relation and role-change validation

pub mod error;
pub mod service;
pub mod types;

pub use error::UserError;
pub use service::UserService;
pub use types::{NewUser, Role, User};
