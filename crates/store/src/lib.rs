//! In-memory store and approval orchestration for ApprovalFlow.
//!
//! This crate provides:
//! - Repositories for users, approval rules and expenses
//! - A `Directory` implementation resolving rules for employees
//! - The `ApprovalService` that serializes work per expense
//! - Notification sinks for workflow events

pub mod directory;
pub mod notify;
pub mod repositories;
pub mod workflow;

pub use directory::StoreDirectory;
pub use notify::{ChannelSink, FanoutSink, TracingSink};
pub use repositories::{ApprovalRuleRepository, ExpenseRepository, UserRepository};
pub use workflow::{ApprovalService, ApprovalSettings, StatusTotal};
