//! Workflow error types for the expense approval lifecycle.
//!
//! This module defines all error types that can occur during
//! workflow operations such as submission and approver decisions.

use approvalflow_shared::AppError;
use approvalflow_shared::types::{ExpenseId, UserId};
use thiserror::Error;

use crate::workflow::types::{DecisionOutcome, ExpenseStatus};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Operation attempted outside the required expense status.
    #[error("Expense {expense_id} is {status}, expected {expected}")]
    InvalidState {
        /// The expense.
        expense_id: ExpenseId,
        /// The current status.
        status: ExpenseStatus,
        /// The status the operation requires.
        expected: ExpenseStatus,
    },

    /// No approval rule resolves for the submitting employee.
    #[error("No approval rule found for employee {employee_id}")]
    NoRuleFound {
        /// The submitting employee.
        employee_id: UserId,
    },

    /// Sequential rule violated.
    #[error("Approver {approver} acted out of order; waiting on {expected}")]
    OutOfOrder {
        /// The approver who tried to act.
        approver: UserId,
        /// The approver holding the actionable slot.
        expected: UserId,
    },

    /// The approver's slot is already resolved.
    #[error("Approver {approver} already {outcome} this expense")]
    AlreadyDecided {
        /// The approver.
        approver: UserId,
        /// The recorded outcome.
        outcome: DecisionOutcome,
    },

    /// Approver is not part of the bound approver list.
    #[error("User {approver} is not an approver of expense {expense_id}")]
    UnknownApprover {
        /// The expense.
        expense_id: ExpenseId,
        /// The user who tried to act.
        approver: UserId,
    },

    /// Rule configuration is inconsistent.
    #[error("Invalid approval rule: {0}")]
    InvalidRule(String),

    /// Expense not found.
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Referenced user not found.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The acting user does not own the expense.
    #[error("User {user_id} does not own expense {expense_id}")]
    NotOwner {
        /// The expense.
        expense_id: ExpenseId,
        /// The acting user.
        user_id: UserId,
    },

    /// The expense is no longer a draft.
    #[error("Expense {expense_id} is {status} and can no longer be edited")]
    NotEditable {
        /// The expense.
        expense_id: ExpenseId,
        /// The current status.
        status: ExpenseStatus,
    },

    /// Expense input failed validation.
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRule(_) | Self::InvalidExpense(_) => 400,

            Self::NotOwner { .. } | Self::UnknownApprover { .. } => 403,

            Self::ExpenseNotFound(_) | Self::UserNotFound(_) | Self::NoRuleFound { .. } => 404,

            Self::InvalidState { .. }
            | Self::OutOfOrder { .. }
            | Self::AlreadyDecided { .. }
            | Self::NotEditable { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::NoRuleFound { .. } => "NO_RULE_FOUND",
            Self::OutOfOrder { .. } => "OUT_OF_ORDER",
            Self::AlreadyDecided { .. } => "ALREADY_DECIDED",
            Self::UnknownApprover { .. } => "UNKNOWN_APPROVER",
            Self::InvalidRule(_) => "INVALID_RULE",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::NotOwner { .. } => "NOT_OWNER",
            Self::NotEditable { .. } => "NOT_EDITABLE",
            Self::InvalidExpense(_) => "INVALID_EXPENSE",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::InvalidRule(_) | WorkflowError::InvalidExpense(_) => {
                Self::Validation(message)
            }
            WorkflowError::NotOwner { .. } | WorkflowError::UnknownApprover { .. } => {
                Self::Forbidden(message)
            }
            WorkflowError::ExpenseNotFound(_)
            | WorkflowError::UserNotFound(_)
            | WorkflowError::NoRuleFound { .. } => Self::NotFound(message),
            WorkflowError::InvalidState { .. }
            | WorkflowError::OutOfOrder { .. }
            | WorkflowError::AlreadyDecided { .. }
            | WorkflowError::NotEditable { .. } => Self::Conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_error() {
        let err = WorkflowError::InvalidState {
            expense_id: ExpenseId::new(),
            status: ExpenseStatus::Approved,
            expected: ExpenseStatus::WaitingApproval,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_STATE");
        assert!(err.to_string().contains("approved"));
        assert!(err.to_string().contains("waiting_approval"));
    }

    #[test]
    fn test_no_rule_found_error() {
        let err = WorkflowError::NoRuleFound {
            employee_id: UserId::new(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NO_RULE_FOUND");
    }

    #[test]
    fn test_out_of_order_error() {
        let err = WorkflowError::OutOfOrder {
            approver: UserId::new(),
            expected: UserId::new(),
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "OUT_OF_ORDER");
    }

    #[test]
    fn test_already_decided_error() {
        let err = WorkflowError::AlreadyDecided {
            approver: UserId::new(),
            outcome: DecisionOutcome::Approved,
        };
        assert_eq!(err.error_code(), "ALREADY_DECIDED");
        assert!(err.to_string().contains("already approved"));
    }

    #[test]
    fn test_unknown_approver_error() {
        let err = WorkflowError::UnknownApprover {
            expense_id: ExpenseId::new(),
            approver: UserId::new(),
        };
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "UNKNOWN_APPROVER");
    }

    #[test]
    fn test_not_editable_error() {
        let err = WorkflowError::NotEditable {
            expense_id: ExpenseId::new(),
            status: ExpenseStatus::WaitingApproval,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "NOT_EDITABLE");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = WorkflowError::OutOfOrder {
            approver: UserId::new(),
            expected: UserId::new(),
        }
        .into();
        assert_eq!(app.status_code(), 409);

        let app: AppError = WorkflowError::InvalidRule("x".into()).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
    }
}
