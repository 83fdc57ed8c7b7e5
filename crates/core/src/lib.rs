//! Core business logic for ApprovalFlow.
//!
//! This crate contains pure business logic with ZERO storage or web dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `users` - Company directory: roles, manager relationships
//! - `workflow` - Expense lifecycle and approval rule evaluation
//! - `currency` - Multi-currency handling and exchange rates

pub mod currency;
pub mod users;
pub mod workflow;
