//! Expense approval service.
//!
//! Orchestrates the expense ledger around the approval engine. Every
//! operation on an expense locks that expense alone, lets the engine work
//! on it and releases the lock before notifying, so decisions on one
//! expense are serialized while different expenses proceed in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;

use approvalflow_core::currency::ExchangeRateService;
use approvalflow_core::workflow::{
    ApprovalEngine, ConvertedAmount, Directory, Expense, ExpenseDraftUpdate, ExpenseStatus,
    NewExpense, NotificationSink, Verdict, WorkflowError, WorkflowEvent,
};
use approvalflow_shared::AppConfig;
use approvalflow_shared::types::{Currency, ExpenseId, Money, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::repositories::ExpenseRepository;

/// Settings the service applies to every expense.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalSettings {
    /// Currency approved amounts are converted into.
    pub base_currency: Currency,
    /// Threshold for rules that leave it unset.
    pub default_min_percentage: u8,
}

impl From<&AppConfig> for ApprovalSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_currency: config.company.base_currency,
            default_min_percentage: config.approval.default_min_percentage,
        }
    }
}

/// Sum of an employee's expenses for one status and currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTotal {
    /// Expense status.
    pub status: ExpenseStatus,
    /// Summed amount.
    pub total: Money,
    /// Number of expenses.
    pub count: usize,
}

/// Expense ledger and approval orchestration.
#[derive(Clone)]
pub struct ApprovalService {
    expenses: ExpenseRepository,
    directory: Arc<dyn Directory>,
    rates: Arc<dyn ExchangeRateService>,
    sink: Arc<dyn NotificationSink>,
    settings: ApprovalSettings,
}

impl ApprovalService {
    /// Creates a service over an expense repository and its collaborators.
    #[must_use]
    pub fn new(
        expenses: ExpenseRepository,
        directory: Arc<dyn Directory>,
        rates: Arc<dyn ExchangeRateService>,
        sink: Arc<dyn NotificationSink>,
        settings: ApprovalSettings,
    ) -> Self {
        Self {
            expenses,
            directory,
            rates,
            sink,
            settings,
        }
    }

    /// The underlying expense repository.
    #[must_use]
    pub fn expenses(&self) -> &ExpenseRepository {
        &self.expenses
    }

    /// Creates a draft expense.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the employee does not exist, `InvalidExpense` if
    /// the description is blank or the amount is not positive.
    pub fn create_draft(&self, input: NewExpense) -> Result<Expense, WorkflowError> {
        if self.directory.user(input.employee_id).is_none() {
            return Err(WorkflowError::UserNotFound(input.employee_id));
        }
        if input.description.trim().is_empty() {
            return Err(WorkflowError::InvalidExpense(
                "description must not be blank".to_string(),
            ));
        }
        Self::check_amount(input.amount)?;

        let expense = Expense::draft(input, Utc::now());
        self.expenses.insert(expense.clone());

        info!(
            expense_id = %expense.id,
            employee_id = %expense.employee_id,
            amount = %expense.amount,
            "Draft expense created"
        );
        Ok(expense)
    }

    /// Applies `update` to a draft owned by `editor`.
    ///
    /// # Errors
    ///
    /// `ExpenseNotFound`, `NotOwner`, `NotEditable` once submitted, or
    /// `InvalidExpense` for a non-positive amount.
    pub async fn update_draft(
        &self,
        expense_id: ExpenseId,
        editor: UserId,
        update: ExpenseDraftUpdate,
    ) -> Result<Expense, WorkflowError> {
        let handle = self
            .expenses
            .handle(expense_id)
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))?;
        let mut expense = handle.lock().await;

        if expense.employee_id != editor {
            return Err(WorkflowError::NotOwner {
                expense_id,
                user_id: editor,
            });
        }
        if !expense.status.is_editable() {
            return Err(WorkflowError::NotEditable {
                expense_id,
                status: expense.status,
            });
        }
        if let Some(amount) = update.amount {
            Self::check_amount(amount)?;
        }
        if update
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(WorkflowError::InvalidExpense(
                "description must not be blank".to_string(),
            ));
        }

        update.apply_to(&mut expense);
        Ok(expense.clone())
    }

    /// Submits a draft for approval under the rule resolved for its owner.
    ///
    /// # Errors
    ///
    /// `ExpenseNotFound`, `NotOwner`, or any submission error of the engine.
    pub async fn submit(
        &self,
        expense_id: ExpenseId,
        submitted_by: UserId,
    ) -> Result<Expense, WorkflowError> {
        let handle = self
            .expenses
            .handle(expense_id)
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))?;
        let mut expense = handle.lock().await;

        if expense.employee_id != submitted_by {
            return Err(WorkflowError::NotOwner {
                expense_id,
                user_id: submitted_by,
            });
        }

        let rule = self.directory.rule_for_employee(expense.employee_id);
        let event = ApprovalEngine::submit(
            &mut expense,
            rule.as_ref(),
            self.settings.default_min_percentage,
            Utc::now(),
        )
        .inspect_err(|e| {
            warn!(expense_id = %expense_id, error = %e, "Submission refused");
        })?;

        let snapshot = expense.clone();
        drop(expense);

        self.sink.notify(&event);
        Ok(snapshot)
    }

    /// Records an approver's verdict.
    ///
    /// On approval the amount is converted into the base currency; a failed
    /// conversion is logged and leaves the snapshot empty.
    ///
    /// # Errors
    ///
    /// `ExpenseNotFound`, or any decision error of the engine. The expense
    /// is unchanged on error.
    pub async fn record_decision(
        &self,
        expense_id: ExpenseId,
        approver: UserId,
        verdict: Verdict,
        comment: Option<String>,
    ) -> Result<Expense, WorkflowError> {
        let handle = self
            .expenses
            .handle(expense_id)
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))?;
        let mut expense = handle.lock().await;

        let now = Utc::now();
        let mut report = ApprovalEngine::record_decision(&mut expense, approver, verdict, comment, now)
            .inspect_err(|e| {
                warn!(
                    expense_id = %expense_id,
                    approver = %approver,
                    error = %e,
                    "Decision refused"
                );
            })?;

        if report.status == ExpenseStatus::Approved {
            expense.converted = self.convert(&expense, now);
            let converted_amount = expense.converted.as_ref().map(|c| c.amount);
            for event in &mut report.events {
                if let WorkflowEvent::ExpenseApproved { converted, .. } = event {
                    *converted = converted_amount;
                }
            }
        }

        let snapshot = expense.clone();
        drop(expense);

        for event in &report.events {
            self.sink.notify(event);
        }
        Ok(snapshot)
    }

    /// Current state of an expense.
    ///
    /// # Errors
    ///
    /// `ExpenseNotFound` if no such expense exists.
    pub async fn expense(&self, expense_id: ExpenseId) -> Result<Expense, WorkflowError> {
        self.expenses
            .get(expense_id)
            .await
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))
    }

    /// Expenses owned by `employee_id`, oldest first.
    pub async fn expenses_for_employee(&self, employee_id: UserId) -> Vec<Expense> {
        self.expenses.for_employee(employee_id).await
    }

    /// Expenses waiting on a decision from `approver`.
    ///
    /// Sequential rules only list an expense for the approver holding the
    /// earliest pending slot.
    pub async fn approval_queue(&self, approver: UserId) -> Vec<Expense> {
        self.expenses
            .find(|e| ApprovalEngine::actionable_approvers(e).contains(&approver))
            .await
    }

    /// Sums an employee's expenses per status and currency.
    ///
    /// Ordered by lifecycle status, then currency.
    pub async fn totals_by_status(&self, employee_id: UserId) -> Vec<StatusTotal> {
        let mut totals: BTreeMap<(u8, Currency), (ExpenseStatus, Decimal, usize)> = BTreeMap::new();
        for expense in self.expenses.for_employee(employee_id).await {
            let entry = totals
                .entry((status_rank(expense.status), expense.amount.currency))
                .or_insert((expense.status, Decimal::ZERO, 0));
            entry.1 = entry.1.saturating_add(expense.amount.amount);
            entry.2 += 1;
        }

        totals
            .into_iter()
            .map(|((_, currency), (status, amount, count))| StatusTotal {
                status,
                total: Money::new(amount, currency),
                count,
            })
            .collect()
    }

    fn convert(&self, expense: &Expense, now: DateTime<Utc>) -> Option<ConvertedAmount> {
        match self
            .rates
            .convert(expense.amount, self.settings.base_currency, now.date_naive())
        {
            Ok(conversion) => Some(ConvertedAmount {
                amount: conversion.amount,
                rate: conversion.rate,
                converted_at: now,
            }),
            Err(e) => {
                warn!(
                    expense_id = %expense.id,
                    from = %expense.amount.currency,
                    to = %self.settings.base_currency,
                    error = %e,
                    "Currency conversion failed"
                );
                None
            }
        }
    }

    fn check_amount(amount: Money) -> Result<(), WorkflowError> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(WorkflowError::InvalidExpense(format!(
                "amount must be positive, got {amount}"
            )))
        }
    }
}

fn status_rank(status: ExpenseStatus) -> u8 {
    match status {
        ExpenseStatus::Draft => 0,
        ExpenseStatus::Submitted => 1,
        ExpenseStatus::WaitingApproval => 2,
        ExpenseStatus::Approved => 3,
        ExpenseStatus::Rejected => 4,
    }
}
