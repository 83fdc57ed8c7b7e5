//! Repository abstractions for data access.
//!
//! Repositories own the application state keyed by typed ids and hand out
//! cloned snapshots; they are cheap to clone and share one underlying map.

pub mod approval_rule;
pub mod expense;
pub mod user;

pub use approval_rule::ApprovalRuleRepository;
pub use expense::{ExpenseHandle, ExpenseRepository};
pub use user::UserRepository;
