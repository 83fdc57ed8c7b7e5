//! Expense status transitions.
//!
//! This module holds the transition table of the expense state machine.
//! Every status change made by the engine goes through `transition`.

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Expense, ExpenseStatus};

/// Stateless guard for expense status transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Draft → Submitted (submit)
    /// - Submitted → WaitingApproval (rule bound)
    /// - WaitingApproval → Approved (threshold met)
    /// - WaitingApproval → Rejected (required rejection or unreachable threshold)
    #[must_use]
    pub fn is_valid_transition(from: ExpenseStatus, to: ExpenseStatus) -> bool {
        matches!(
            (from, to),
            (ExpenseStatus::Draft, ExpenseStatus::Submitted)
                | (ExpenseStatus::Submitted, ExpenseStatus::WaitingApproval)
                | (
                    ExpenseStatus::WaitingApproval,
                    ExpenseStatus::Approved | ExpenseStatus::Rejected
                )
        )
    }

    /// Moves `expense` to `to` if the transition is valid.
    ///
    /// # Returns
    /// * `Err(WorkflowError::InvalidState)` if the transition is not in the table
    pub fn transition(expense: &mut Expense, to: ExpenseStatus) -> Result<(), WorkflowError> {
        if !Self::is_valid_transition(expense.status, to) {
            return Err(WorkflowError::InvalidState {
                expense_id: expense.id,
                status: expense.status,
                expected: Self::required_status_for(to),
            });
        }
        expense.status = to;
        Ok(())
    }

    /// The status an expense must be in to move to `to`.
    #[must_use]
    pub fn required_status_for(to: ExpenseStatus) -> ExpenseStatus {
        match to {
            ExpenseStatus::Draft | ExpenseStatus::Submitted => ExpenseStatus::Draft,
            ExpenseStatus::WaitingApproval => ExpenseStatus::Submitted,
            ExpenseStatus::Approved | ExpenseStatus::Rejected => ExpenseStatus::WaitingApproval,
        }
    }
}
