//! Expense approval workflow.
//!
//! This module implements the expense lifecycle state machine and the
//! approval engine that evaluates approver decisions against a rule.
//!
//! # Modules
//!
//! - `types` - Expense, approval history and workflow events
//! - `rule` - Approval rule configuration and approver resolution
//! - `error` - Workflow-specific error types
//! - `service` - State transition table
//! - `approval` - Submission and decision evaluation
//! - `ports` - Directory and notification seams

pub mod approval;
pub mod error;
pub mod ports;
pub mod rule;
pub mod service;
pub mod types;

#[cfg(test)]
mod approval_props;

pub use approval::{ApprovalEngine, DecisionReport, Evaluation};
pub use error::WorkflowError;
pub use ports::{Directory, NoopSink, NotificationSink};
pub use rule::{ApprovalRule, DEFAULT_MIN_APPROVAL_PERCENTAGE, RuleApprover, RuleConfig};
pub use service::WorkflowService;
pub use types::{
    ApprovalDecision, ApprovalHistory, ConvertedAmount, DecisionOutcome, Expense,
    ExpenseCategory, ExpenseDraftUpdate, ExpenseStatus, NewExpense, RejectionReason, RuleBinding,
    Verdict, WorkflowEvent,
};
