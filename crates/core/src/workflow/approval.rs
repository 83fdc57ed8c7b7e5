//! Approval engine for expense decisions.
//!
//! This module binds a rule's approvers to an expense on submission and
//! evaluates every approver decision against the bound rule: sequencing,
//! required-approver rejection and percentage aggregation.
//!
//! Every operation validates first and then applies its changes to a copy
//! that replaces the expense only on success, so a failed call leaves the
//! expense untouched.

use approvalflow_shared::types::UserId;
use chrono::{DateTime, Utc};

use crate::workflow::error::WorkflowError;
use crate::workflow::rule::ApprovalRule;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{
    ApprovalHistory, DecisionOutcome, Expense, ExpenseStatus, RejectionReason, RuleBinding,
    Verdict, WorkflowEvent,
};

/// Result of evaluating a history after a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// More decisions are needed.
    Open,
    /// Threshold met and every required approver approved.
    Approved,
    /// The expense cannot be approved any more.
    Rejected(RejectionReason),
}

/// Outcome of a recorded decision.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    /// Expense status after the decision.
    pub status: ExpenseStatus,
    /// Events to hand to the notification sink, in order.
    pub events: Vec<WorkflowEvent>,
}

/// Stateless engine evaluating approval rules against expenses.
pub struct ApprovalEngine;

impl ApprovalEngine {
    /// Submit a draft expense under the rule resolved for its employee.
    ///
    /// # Arguments
    /// * `expense` - The draft expense
    /// * `rule` - The rule resolved for the employee, if any
    /// * `default_min_percentage` - Threshold for rules that leave it unset
    /// * `now` - Submission time
    ///
    /// # Returns
    /// * `Ok(WorkflowEvent::ExpenseSubmitted)` with the expense in WaitingApproval
    /// * `Err(WorkflowError::InvalidState)` if the expense is not a draft
    /// * `Err(WorkflowError::NoRuleFound)` if no rule resolved
    /// * `Err(WorkflowError::InvalidRule)` if the rule binds no approver
    pub fn submit(
        expense: &mut Expense,
        rule: Option<&ApprovalRule>,
        default_min_percentage: u8,
        now: DateTime<Utc>,
    ) -> Result<WorkflowEvent, WorkflowError> {
        if expense.status != ExpenseStatus::Draft {
            return Err(WorkflowError::InvalidState {
                expense_id: expense.id,
                status: expense.status,
                expected: ExpenseStatus::Draft,
            });
        }

        let rule = rule.ok_or(WorkflowError::NoRuleFound {
            employee_id: expense.employee_id,
        })?;
        rule.validate()?;

        let approvers = rule.resolved_approvers();
        let min_approval_percentage = rule.config.effective_min_percentage(default_min_percentage);
        if min_approval_percentage > 100 {
            return Err(WorkflowError::InvalidRule(format!(
                "minimum approval percentage must be within 0..=100, got {min_approval_percentage}"
            )));
        }

        let mut next = expense.clone();
        WorkflowService::transition(&mut next, ExpenseStatus::Submitted)?;
        next.submitted_at = Some(now);
        next.binding = Some(RuleBinding {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            sequential: rule.config.sequential,
            min_approval_percentage,
        });
        next.history = ApprovalHistory::from_approvers(&approvers);
        WorkflowService::transition(&mut next, ExpenseStatus::WaitingApproval)?;

        *expense = next;

        Ok(WorkflowEvent::ExpenseSubmitted {
            expense_id: expense.id,
            employee_id: expense.employee_id,
            rule_id: rule.id,
            approvers: approvers.iter().map(|a| a.approver).collect(),
            at: now,
        })
    }

    /// Record an approver's verdict on an expense.
    ///
    /// # Arguments
    /// * `expense` - The expense, normally in WaitingApproval
    /// * `approver` - The acting approver
    /// * `verdict` - Approved or Rejected
    /// * `comment` - Optional note stored on the slot
    /// * `now` - Decision time
    ///
    /// # Returns
    /// * `Ok(DecisionReport)` with the new status and the emitted events
    /// * `Err(..)` from [`ApprovalEngine::check_decision`]; the expense is unchanged
    pub fn record_decision(
        expense: &mut Expense,
        approver: UserId,
        verdict: Verdict,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DecisionReport, WorkflowError> {
        let index = Self::check_decision(expense, approver)?;
        let min_approval_percentage = expense
            .binding
            .as_ref()
            .map_or(100, |b| b.min_approval_percentage);

        let mut next = expense.clone();
        next.history.decide(index, verdict, comment, now);

        let mut events = vec![WorkflowEvent::DecisionRecorded {
            expense_id: next.id,
            approver,
            verdict,
            at: now,
        }];

        match Self::evaluate(&next.history, min_approval_percentage, index) {
            Evaluation::Open => {}
            Evaluation::Approved => {
                WorkflowService::transition(&mut next, ExpenseStatus::Approved)?;
                next.history.skip_pending();
                next.resolved_at = Some(now);
                events.push(WorkflowEvent::ExpenseApproved {
                    expense_id: next.id,
                    employee_id: next.employee_id,
                    approval_percentage: next.history.approval_percentage(),
                    converted: None,
                    at: now,
                });
            }
            Evaluation::Rejected(reason) => {
                WorkflowService::transition(&mut next, ExpenseStatus::Rejected)?;
                next.history.skip_pending();
                next.resolved_at = Some(now);
                events.push(WorkflowEvent::ExpenseRejected {
                    expense_id: next.id,
                    employee_id: next.employee_id,
                    reason,
                    at: now,
                });
            }
        }

        *expense = next;

        Ok(DecisionReport {
            status: expense.status,
            events,
        })
    }

    /// Check whether `approver` may act on `expense` right now.
    ///
    /// Checks run in this order and the first failure wins:
    /// 1. the expense has been submitted (`InvalidState`)
    /// 2. the approver holds a slot (`UnknownApprover`)
    /// 3. the slot is still open (`AlreadyDecided`)
    /// 4. the expense is not terminal (`InvalidState`)
    /// 5. on sequential rules, the slot is the earliest pending one (`OutOfOrder`)
    ///
    /// # Returns
    /// The index of the approver's slot.
    pub fn check_decision(expense: &Expense, approver: UserId) -> Result<usize, WorkflowError> {
        let not_waiting = || WorkflowError::InvalidState {
            expense_id: expense.id,
            status: expense.status,
            expected: ExpenseStatus::WaitingApproval,
        };

        if matches!(expense.status, ExpenseStatus::Draft | ExpenseStatus::Submitted) {
            return Err(not_waiting());
        }
        let binding = expense.binding.as_ref().ok_or_else(not_waiting)?;

        let index =
            expense
                .history
                .position_of(approver)
                .ok_or(WorkflowError::UnknownApprover {
                    expense_id: expense.id,
                    approver,
                })?;

        let slot = &expense.history.entries()[index];
        if slot.outcome.is_decided() {
            return Err(WorkflowError::AlreadyDecided {
                approver,
                outcome: slot.outcome,
            });
        }

        if expense.status.is_terminal() {
            return Err(not_waiting());
        }

        if binding.sequential
            && let Some(first) = expense.history.first_pending()
            && first != index
        {
            return Err(WorkflowError::OutOfOrder {
                approver,
                expected: expense.history.entries()[first].approver,
            });
        }

        Ok(index)
    }

    /// Evaluate a history right after the slot at `decided` was resolved.
    ///
    /// Approval is only granted on an approving decision; a rejection
    /// terminates the expense when it came from a required approver, or
    /// when the pending slots can no longer lift the approvals to the
    /// threshold.
    #[must_use]
    pub fn evaluate(history: &ApprovalHistory, min_approval_percentage: u8, decided: usize) -> Evaluation {
        let Some(slot) = history.entries().get(decided) else {
            return Evaluation::Open;
        };

        let total = history.len();
        let approved = history.count(DecisionOutcome::Approved);
        let pending = history.count(DecisionOutcome::Pending);

        match slot.outcome {
            DecisionOutcome::Approved => {
                if Self::meets_threshold(approved, total, min_approval_percentage)
                    && history.required_all_approved()
                {
                    Evaluation::Approved
                } else {
                    Evaluation::Open
                }
            }
            DecisionOutcome::Rejected if slot.required => {
                Evaluation::Rejected(RejectionReason::RequiredApproverRejected {
                    approver: slot.approver,
                })
            }
            DecisionOutcome::Rejected => {
                if pending == 0
                    || !Self::meets_threshold(approved + pending, total, min_approval_percentage)
                {
                    Evaluation::Rejected(RejectionReason::ThresholdUnreachable {
                        approved,
                        total,
                        min_approval_percentage,
                    })
                } else {
                    Evaluation::Open
                }
            }
            DecisionOutcome::Pending | DecisionOutcome::Skipped => Evaluation::Open,
        }
    }

    /// Returns true if `approved / total * 100 >= min_percentage`.
    ///
    /// Compared as `approved * 100 >= min_percentage * total` to stay exact.
    #[must_use]
    pub fn meets_threshold(approved: usize, total: usize, min_percentage: u8) -> bool {
        total > 0 && approved * 100 >= usize::from(min_percentage) * total
    }

    /// Approvers who can act on the expense right now.
    #[must_use]
    pub fn actionable_approvers(expense: &Expense) -> Vec<UserId> {
        if expense.status != ExpenseStatus::WaitingApproval {
            return Vec::new();
        }
        let pending = expense
            .history
            .entries()
            .iter()
            .filter(|d| d.outcome == DecisionOutcome::Pending)
            .map(|d| d.approver);

        match &expense.binding {
            Some(binding) if binding.sequential => pending.take(1).collect(),
            _ => pending.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::rule::{RuleApprover, RuleConfig};
    use crate::workflow::types::{ExpenseCategory, NewExpense};
    use approvalflow_shared::types::{Currency, Money};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn draft() -> Expense {
        Expense::draft(
            NewExpense {
                employee_id: UserId::new(),
                description: "Client dinner".to_string(),
                category: ExpenseCategory::Food,
                expense_date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
                paid_by: "Sarah".to_string(),
                amount: Money::new(dec!(3567), Currency::Inr),
                remarks: Some("Team meeting".to_string()),
                receipt: None,
            },
            Utc::now(),
        )
    }

    fn rule(sequential: bool, min: Option<u8>, approvers: Vec<RuleApprover>) -> ApprovalRule {
        ApprovalRule::new(
            "Test rule",
            UserId::new(),
            RuleConfig {
                sequential,
                manager_is_approver: false,
                min_approval_percentage: min,
            },
            approvers,
        )
    }

    fn submitted(rule: &ApprovalRule) -> Expense {
        let mut expense = draft();
        ApprovalEngine::submit(&mut expense, Some(rule), 100, Utc::now()).unwrap();
        expense
    }

    #[test]
    fn test_submit_binds_pending_history() {
        let (a, b) = (UserId::new(), UserId::new());
        let r = rule(true, None, vec![RuleApprover::required(a), RuleApprover::optional(b)]);
        let mut expense = draft();

        let event = ApprovalEngine::submit(&mut expense, Some(&r), 100, Utc::now()).unwrap();

        assert_eq!(expense.status, ExpenseStatus::WaitingApproval);
        assert!(expense.submitted_at.is_some());
        assert_eq!(expense.history.len(), 2);
        assert_eq!(expense.history.count(DecisionOutcome::Pending), 2);
        let binding = expense.binding.as_ref().unwrap();
        assert_eq!(binding.rule_id, r.id);
        assert_eq!(binding.min_approval_percentage, 100);
        assert!(binding.sequential);
        assert!(matches!(
            event,
            WorkflowEvent::ExpenseSubmitted { ref approvers, .. } if approvers == &vec![a, b]
        ));
    }

    #[test]
    fn test_submit_non_draft_fails() {
        let r = rule(false, None, vec![RuleApprover::optional(UserId::new())]);
        let mut expense = submitted(&r);
        let before = expense.clone();

        let result = ApprovalEngine::submit(&mut expense, Some(&r), 100, Utc::now());
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidState {
                expected: ExpenseStatus::Draft,
                ..
            })
        ));
        assert_eq!(expense, before);
    }

    #[test]
    fn test_submit_without_rule_fails() {
        let mut expense = draft();
        let result = ApprovalEngine::submit(&mut expense, None, 100, Utc::now());
        assert!(matches!(result, Err(WorkflowError::NoRuleFound { .. })));
        assert_eq!(expense.status, ExpenseStatus::Draft);
    }

    #[test]
    fn test_submit_uses_default_percentage() {
        let r = rule(false, None, vec![RuleApprover::optional(UserId::new())]);
        let mut expense = draft();
        ApprovalEngine::submit(&mut expense, Some(&r), 75, Utc::now()).unwrap();
        assert_eq!(expense.binding.unwrap().min_approval_percentage, 75);
    }

    #[test]
    fn test_decision_on_draft_fails() {
        let mut expense = draft();
        let result =
            ApprovalEngine::record_decision(&mut expense, UserId::new(), Verdict::Approved, None, Utc::now());
        assert!(matches!(result, Err(WorkflowError::InvalidState { .. })));
    }

    #[test]
    fn test_unknown_approver() {
        let r = rule(false, None, vec![RuleApprover::optional(UserId::new())]);
        let mut expense = submitted(&r);
        let result =
            ApprovalEngine::record_decision(&mut expense, UserId::new(), Verdict::Approved, None, Utc::now());
        assert!(matches!(result, Err(WorkflowError::UnknownApprover { .. })));
    }

    #[test]
    fn test_single_approver_approves() {
        let a = UserId::new();
        let r = rule(false, None, vec![RuleApprover::optional(a)]);
        let mut expense = submitted(&r);

        let report =
            ApprovalEngine::record_decision(&mut expense, a, Verdict::Approved, Some("ok".into()), Utc::now())
                .unwrap();

        assert_eq!(report.status, ExpenseStatus::Approved);
        assert_eq!(report.events.len(), 2);
        assert!(expense.resolved_at.is_some());
        let slot = &expense.history.entries()[0];
        assert_eq!(slot.comment.as_deref(), Some("ok"));
        assert!(slot.decided_at.is_some());
    }

    #[test]
    fn test_required_rejection_in_parallel_rule() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let r = rule(
            false,
            Some(50),
            vec![
                RuleApprover::optional(a),
                RuleApprover::required(b),
                RuleApprover::optional(c),
            ],
        );
        let mut expense = submitted(&r);

        ApprovalEngine::record_decision(&mut expense, a, Verdict::Approved, None, Utc::now()).unwrap();
        let report =
            ApprovalEngine::record_decision(&mut expense, b, Verdict::Rejected, None, Utc::now()).unwrap();

        assert_eq!(report.status, ExpenseStatus::Rejected);
        assert_eq!(expense.history.entries()[2].outcome, DecisionOutcome::Skipped);
        assert!(matches!(
            report.events.last(),
            Some(WorkflowEvent::ExpenseRejected {
                reason: RejectionReason::RequiredApproverRejected { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_optional_rejection_keeps_expense_open() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let r = rule(
            false,
            Some(50),
            vec![
                RuleApprover::optional(a),
                RuleApprover::optional(b),
                RuleApprover::optional(c),
            ],
        );
        let mut expense = submitted(&r);

        let report =
            ApprovalEngine::record_decision(&mut expense, a, Verdict::Rejected, None, Utc::now()).unwrap();
        assert_eq!(report.status, ExpenseStatus::WaitingApproval);
        assert_eq!(report.events.len(), 1);

        ApprovalEngine::record_decision(&mut expense, b, Verdict::Approved, None, Utc::now()).unwrap();
        let report =
            ApprovalEngine::record_decision(&mut expense, c, Verdict::Approved, None, Utc::now()).unwrap();
        assert_eq!(report.status, ExpenseStatus::Approved);
    }

    #[test]
    fn test_required_approver_gates_threshold() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let r = rule(
            false,
            Some(50),
            vec![
                RuleApprover::required(a),
                RuleApprover::optional(b),
                RuleApprover::optional(c),
            ],
        );
        let mut expense = submitted(&r);

        ApprovalEngine::record_decision(&mut expense, b, Verdict::Approved, None, Utc::now()).unwrap();
        let report =
            ApprovalEngine::record_decision(&mut expense, c, Verdict::Approved, None, Utc::now()).unwrap();
        // 2/3 meets 50 % but the required approver is still pending.
        assert_eq!(report.status, ExpenseStatus::WaitingApproval);

        let report =
            ApprovalEngine::record_decision(&mut expense, a, Verdict::Approved, None, Utc::now()).unwrap();
        assert_eq!(report.status, ExpenseStatus::Approved);
    }

    #[test]
    fn test_zero_threshold_all_rejections_terminate() {
        let (a, b) = (UserId::new(), UserId::new());
        let r = rule(
            false,
            Some(0),
            vec![RuleApprover::optional(a), RuleApprover::optional(b)],
        );
        let mut expense = submitted(&r);

        ApprovalEngine::record_decision(&mut expense, a, Verdict::Rejected, None, Utc::now()).unwrap();
        assert_eq!(expense.status, ExpenseStatus::WaitingApproval);
        let report =
            ApprovalEngine::record_decision(&mut expense, b, Verdict::Rejected, None, Utc::now()).unwrap();
        assert_eq!(report.status, ExpenseStatus::Rejected);
    }

    #[test]
    fn test_decision_after_terminal_on_skipped_slot() {
        let (a, b) = (UserId::new(), UserId::new());
        let r = rule(
            false,
            Some(50),
            vec![RuleApprover::optional(a), RuleApprover::optional(b)],
        );
        let mut expense = submitted(&r);
        ApprovalEngine::record_decision(&mut expense, a, Verdict::Approved, None, Utc::now()).unwrap();
        assert_eq!(expense.status, ExpenseStatus::Approved);

        let result =
            ApprovalEngine::record_decision(&mut expense, b, Verdict::Approved, None, Utc::now());
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidState {
                status: ExpenseStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn test_actionable_approvers() {
        let (a, b) = (UserId::new(), UserId::new());
        let seq = submitted(&rule(
            true,
            None,
            vec![RuleApprover::optional(a), RuleApprover::optional(b)],
        ));
        assert_eq!(ApprovalEngine::actionable_approvers(&seq), vec![a]);

        let par = submitted(&rule(
            false,
            None,
            vec![RuleApprover::optional(a), RuleApprover::optional(b)],
        ));
        assert_eq!(ApprovalEngine::actionable_approvers(&par), vec![a, b]);

        assert!(ApprovalEngine::actionable_approvers(&draft()).is_empty());
    }

    #[test]
    fn test_meets_threshold() {
        assert!(ApprovalEngine::meets_threshold(2, 3, 66));
        assert!(!ApprovalEngine::meets_threshold(1, 3, 66));
        assert!(ApprovalEngine::meets_threshold(2, 4, 50));
        assert!(!ApprovalEngine::meets_threshold(1, 4, 50));
        assert!(ApprovalEngine::meets_threshold(3, 3, 100));
        assert!(!ApprovalEngine::meets_threshold(0, 0, 0));
    }
}
