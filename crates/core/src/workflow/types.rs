//! Workflow domain types for the expense approval lifecycle.
//!
//! This module defines the expense record, its approval history and the
//! events emitted while an expense moves through the workflow.

use approvalflow_shared::types::{ApprovalRuleId, ExpenseId, Money, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflow::rule::RuleApprover;

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Draft → Submitted (submit)
/// - Submitted → WaitingApproval (rule bound)
/// - WaitingApproval → Approved | Rejected (decisions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Expense is being drafted and can be modified.
    Draft,
    /// Expense has been submitted; the approval rule is being bound.
    Submitted,
    /// Expense is waiting for approver decisions.
    WaitingApproval,
    /// Expense has been approved (terminal).
    Approved,
    /// Expense has been rejected (terminal).
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::WaitingApproval => "waiting_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "waiting_approval" => Some(Self::WaitingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the expense fields can still be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expense category offered on the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    /// Meals and client lunches.
    Food,
    /// Taxis and local transport.
    Transport,
    /// Flights and conference trips.
    Travel,
    /// Hotels.
    Accommodation,
    /// Hardware and tools.
    Equipment,
    /// Office supplies.
    Office,
    /// Anything else.
    Other,
}

impl ExpenseCategory {
    /// Parses a category from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "food" => Some(Self::Food),
            "transport" => Some(Self::Transport),
            "travel" => Some(Self::Travel),
            "accommodation" => Some(Self::Accommodation),
            "equipment" => Some(Self::Equipment),
            "office" => Some(Self::Office),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// An approver's verdict as submitted to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Approve the expense.
    Approved,
    /// Reject the expense.
    Rejected,
}

/// State of one approver slot in an expense's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    /// Waiting for the approver.
    Pending,
    /// The approver approved.
    Approved,
    /// The approver rejected.
    Rejected,
    /// The expense terminated before the approver acted.
    Skipped,
}

impl DecisionOutcome {
    /// Returns true once the approver has acted on the slot.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl From<Verdict> for DecisionOutcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => Self::Approved,
            Verdict::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One approver slot bound to an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// The approver occupying the slot.
    pub approver: UserId,
    /// Whether a rejection from this approver terminates the expense.
    pub required: bool,
    /// Current state of the slot.
    pub outcome: DecisionOutcome,
    /// When the approver acted; `None` while pending or skipped.
    pub decided_at: Option<DateTime<Utc>>,
    /// Optional note left with the decision.
    pub comment: Option<String>,
}

impl ApprovalDecision {
    /// Creates a pending slot for the approver.
    #[must_use]
    pub fn pending(approver: &RuleApprover) -> Self {
        Self {
            approver: approver.approver,
            required: approver.required,
            outcome: DecisionOutcome::Pending,
            decided_at: None,
            comment: None,
        }
    }
}

/// Ordered approval history of an expense, one entry per approver slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalHistory(Vec<ApprovalDecision>);

impl ApprovalHistory {
    /// Builds a fresh history with every slot pending, in approver order.
    #[must_use]
    pub fn from_approvers(approvers: &[RuleApprover]) -> Self {
        Self(approvers.iter().map(ApprovalDecision::pending).collect())
    }

    /// Returns the slots in order.
    #[must_use]
    pub fn entries(&self) -> &[ApprovalDecision] {
        &self.0
    }

    /// Number of approver slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no approver is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the approver's slot.
    #[must_use]
    pub fn position_of(&self, approver: UserId) -> Option<usize> {
        self.0.iter().position(|d| d.approver == approver)
    }

    /// Index of the earliest pending slot.
    #[must_use]
    pub fn first_pending(&self) -> Option<usize> {
        self.0
            .iter()
            .position(|d| d.outcome == DecisionOutcome::Pending)
    }

    /// Number of slots with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: DecisionOutcome) -> usize {
        self.0.iter().filter(|d| d.outcome == outcome).count()
    }

    /// Returns true if every required slot has approved.
    #[must_use]
    pub fn required_all_approved(&self) -> bool {
        self.0
            .iter()
            .filter(|d| d.required)
            .all(|d| d.outcome == DecisionOutcome::Approved)
    }

    /// Share of approved slots, in percent with two decimals.
    #[must_use]
    pub fn approval_percentage(&self) -> Decimal {
        if self.0.is_empty() {
            return Decimal::ZERO;
        }
        let approved = Decimal::from(self.count(DecisionOutcome::Approved));
        let total = Decimal::from(self.0.len());
        (approved * Decimal::ONE_HUNDRED / total).round_dp(2)
    }

    /// Records a decision on a slot.
    pub(crate) fn decide(
        &mut self,
        index: usize,
        verdict: Verdict,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) {
        if let Some(slot) = self.0.get_mut(index) {
            slot.outcome = verdict.into();
            slot.decided_at = Some(at);
            slot.comment = comment;
        }
    }

    /// Marks every pending slot as skipped; returns how many were skipped.
    pub(crate) fn skip_pending(&mut self) -> usize {
        let mut skipped = 0;
        for slot in &mut self.0 {
            if slot.outcome == DecisionOutcome::Pending {
                slot.outcome = DecisionOutcome::Skipped;
                skipped += 1;
            }
        }
        skipped
    }
}

/// Snapshot of the rule an expense was submitted under.
///
/// Later edits to the rule do not affect in-flight expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBinding {
    /// The rule that was resolved at submission.
    pub rule_id: ApprovalRuleId,
    /// Rule name at submission time.
    pub rule_name: String,
    /// Whether slots must be decided in order.
    pub sequential: bool,
    /// Effective approval threshold in percent.
    pub min_approval_percentage: u8,
}

/// Amount converted into the company base currency at approval time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    /// Converted amount.
    pub amount: Money,
    /// Rate used (1 source unit = rate target units).
    pub rate: Decimal,
    /// When the snapshot was taken.
    pub converted_at: DateTime<Utc>,
}

/// An expense claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier.
    pub id: ExpenseId,
    /// Employee who owns the claim.
    pub employee_id: UserId,
    /// Short description ("Client dinner").
    pub description: String,
    /// Category.
    pub category: ExpenseCategory,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
    /// Who paid.
    pub paid_by: String,
    /// Amount and currency as submitted.
    pub amount: Money,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Opaque reference to an uploaded receipt.
    pub receipt: Option<String>,
    /// Current workflow status.
    pub status: ExpenseStatus,
    /// Rule snapshot bound at submission.
    pub binding: Option<RuleBinding>,
    /// Approver slots and their decisions.
    pub history: ApprovalHistory,
    /// Base-currency snapshot taken on approval.
    pub converted: Option<ConvertedAmount>,
    /// When the draft was created.
    pub created_at: DateTime<Utc>,
    /// When the expense was submitted.
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the expense reached a terminal status.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Creates a draft expense from form input.
    #[must_use]
    pub fn draft(input: NewExpense, now: DateTime<Utc>) -> Self {
        Self {
            id: ExpenseId::new(),
            employee_id: input.employee_id,
            description: input.description,
            category: input.category,
            expense_date: input.expense_date,
            paid_by: input.paid_by,
            amount: input.amount,
            remarks: input.remarks,
            receipt: input.receipt,
            status: ExpenseStatus::Draft,
            binding: None,
            history: ApprovalHistory::default(),
            converted: None,
            created_at: now,
            submitted_at: None,
            resolved_at: None,
        }
    }
}

/// Input for creating a draft expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Owning employee.
    pub employee_id: UserId,
    /// Short description.
    pub description: String,
    /// Category.
    pub category: ExpenseCategory,
    /// Date incurred.
    pub expense_date: NaiveDate,
    /// Who paid.
    pub paid_by: String,
    /// Amount and currency.
    pub amount: Money,
    /// Free-form remarks.
    pub remarks: Option<String>,
    /// Opaque receipt reference.
    pub receipt: Option<String>,
}

/// Partial update of a draft; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ExpenseDraftUpdate {
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<ExpenseCategory>,
    /// New date.
    pub expense_date: Option<NaiveDate>,
    /// New payer.
    pub paid_by: Option<String>,
    /// New amount.
    pub amount: Option<Money>,
    /// New remarks.
    pub remarks: Option<String>,
    /// New receipt reference.
    pub receipt: Option<String>,
}

impl ExpenseDraftUpdate {
    /// Applies the set fields to `expense`.
    pub fn apply_to(self, expense: &mut Expense) {
        if let Some(description) = self.description {
            expense.description = description;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(date) = self.expense_date {
            expense.expense_date = date;
        }
        if let Some(paid_by) = self.paid_by {
            expense.paid_by = paid_by;
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(remarks) = self.remarks {
            expense.remarks = Some(remarks);
        }
        if let Some(receipt) = self.receipt {
            expense.receipt = Some(receipt);
        }
    }
}

/// Why an expense was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// A required approver rejected.
    RequiredApproverRejected {
        /// The approver who rejected.
        approver: UserId,
    },
    /// Remaining pending slots can no longer reach the threshold.
    ThresholdUnreachable {
        /// Approved slots at the time of rejection.
        approved: usize,
        /// Total slots.
        total: usize,
        /// Threshold in percent.
        min_approval_percentage: u8,
    },
}

/// Event emitted to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// An expense entered the approval queue.
    ExpenseSubmitted {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning employee.
        employee_id: UserId,
        /// Rule bound at submission.
        rule_id: ApprovalRuleId,
        /// Approvers in slot order.
        approvers: Vec<UserId>,
        /// When the expense was submitted.
        at: DateTime<Utc>,
    },
    /// An approver acted on a slot.
    DecisionRecorded {
        /// The expense.
        expense_id: ExpenseId,
        /// The approver.
        approver: UserId,
        /// The verdict.
        verdict: Verdict,
        /// When the decision was recorded.
        at: DateTime<Utc>,
    },
    /// The expense reached Approved.
    ExpenseApproved {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning employee.
        employee_id: UserId,
        /// Share of approved slots at approval time.
        approval_percentage: Decimal,
        /// Base-currency amount, when a conversion was available.
        converted: Option<Money>,
        /// When the expense was approved.
        at: DateTime<Utc>,
    },
    /// The expense reached Rejected.
    ExpenseRejected {
        /// The expense.
        expense_id: ExpenseId,
        /// Owning employee.
        employee_id: UserId,
        /// Why it was rejected.
        reason: RejectionReason,
        /// When the expense was rejected.
        at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// The expense the event concerns.
    #[must_use]
    pub fn expense_id(&self) -> ExpenseId {
        match self {
            Self::ExpenseSubmitted { expense_id, .. }
            | Self::DecisionRecorded { expense_id, .. }
            | Self::ExpenseApproved { expense_id, .. }
            | Self::ExpenseRejected { expense_id, .. } => *expense_id,
        }
    }
}
