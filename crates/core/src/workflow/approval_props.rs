//! Property-based tests for ApprovalEngine.
//!
//! These tests check decision ordering, aggregation and idempotence over
//! randomly generated rules and decision sequences.

use approvalflow_shared::types::{Currency, Money, UserId};
use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::workflow::approval::ApprovalEngine;
use crate::workflow::error::WorkflowError;
use crate::workflow::rule::{ApprovalRule, RuleApprover, RuleConfig};
use crate::workflow::types::{
    DecisionOutcome, Expense, ExpenseCategory, ExpenseStatus, NewExpense, Verdict,
};

fn draft() -> Expense {
    Expense::draft(
        NewExpense {
            employee_id: UserId::new(),
            description: "Taxi fare".to_string(),
            category: ExpenseCategory::Transport,
            expense_date: NaiveDate::from_ymd_opt(2025, 10, 4).unwrap_or_default(),
            paid_by: "Sarah".to_string(),
            amount: Money::new(Decimal::new(500, 0), Currency::Inr),
            remarks: None,
            receipt: None,
        },
        Utc::now(),
    )
}

fn submit(sequential: bool, min: u8, approvers: &[RuleApprover]) -> Expense {
    let rule = ApprovalRule::new(
        "Generated",
        UserId::new(),
        RuleConfig {
            sequential,
            manager_is_approver: false,
            min_approval_percentage: Some(min),
        },
        approvers.to_vec(),
    );
    let mut expense = draft();
    ApprovalEngine::submit(&mut expense, Some(&rule), 100, Utc::now()).unwrap();
    expense
}

/// Strategy for approver lists of 1..=6 with random required flags.
fn arb_approvers() -> impl Strategy<Value = Vec<RuleApprover>> {
    prop::collection::vec(any::<bool>(), 1..=6).prop_map(|flags| {
        flags
            .into_iter()
            .map(|required| RuleApprover {
                approver: UserId::new(),
                required,
            })
            .collect()
    })
}

fn arb_verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![Just(Verdict::Approved), Just(Verdict::Rejected)]
}

/// Applies verdicts in the given slot order, ignoring rejected calls.
fn apply(expense: &mut Expense, order: &[usize], verdicts: &[Verdict]) {
    for &slot in order {
        let approver = expense.history.entries()[slot].approver;
        let _ = ApprovalEngine::record_decision(expense, approver, verdicts[slot], None, Utc::now());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Parallel evaluation does not depend on decision order
    // =========================================================================

    /// With every slot decided, the final status is the same for any order.
    #[test]
    fn prop_parallel_outcome_is_order_insensitive(
        (approvers, verdicts, order) in arb_approvers().prop_flat_map(|approvers| {
            let n = approvers.len();
            (
                Just(approvers),
                prop::collection::vec(arb_verdict(), n),
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            )
        }),
        min in 0u8..=100,
    ) {
        let mut in_order = submit(false, min, &approvers);
        let mut shuffled = in_order.clone();

        let natural: Vec<usize> = (0..approvers.len()).collect();
        apply(&mut in_order, &natural, &verdicts);
        apply(&mut shuffled, &order, &verdicts);

        prop_assert!(in_order.status.is_terminal());
        prop_assert_eq!(in_order.status, shuffled.status);
    }

    /// Once every slot has been decided or skipped, the expense is terminal.
    #[test]
    fn prop_all_decided_is_terminal(
        approvers in arb_approvers(),
        seed in prop::collection::vec(arb_verdict(), 6),
        min in 0u8..=100,
        sequential in any::<bool>(),
    ) {
        let mut expense = submit(sequential, min, &approvers);
        let order: Vec<usize> = (0..approvers.len()).collect();
        apply(&mut expense, &order, &seed);

        prop_assert!(expense.status.is_terminal());
        prop_assert_eq!(expense.history.count(DecisionOutcome::Pending), 0);
        prop_assert!(expense.resolved_at.is_some());
    }

    // =========================================================================
    // Sequential ordering
    // =========================================================================

    /// Acting ahead of the earliest pending slot fails and changes nothing.
    #[test]
    fn prop_sequential_out_of_order_is_rejected(
        approvers in arb_approvers().prop_filter("needs two slots", |a| a.len() >= 2),
        pick in any::<prop::sample::Index>(),
        verdict in arb_verdict(),
    ) {
        let mut expense = submit(true, 100, &approvers);
        let before = expense.clone();
        let slot = 1 + pick.index(approvers.len() - 1);

        let result = ApprovalEngine::record_decision(
            &mut expense,
            approvers[slot].approver,
            verdict,
            None,
            Utc::now(),
        );

        let is_out_of_order = matches!(
            result,
            Err(WorkflowError::OutOfOrder { expected, .. }) if expected == approvers[0].approver
        );
        prop_assert!(is_out_of_order);
        prop_assert_eq!(expense, before);
    }

    // =========================================================================
    // Required approvers and idempotence
    // =========================================================================

    /// A rejection from any required slot rejects the expense.
    #[test]
    fn prop_required_rejection_terminates(
        approvers in arb_approvers().prop_filter("needs a required slot", |a| a.iter().any(|x| x.required)),
        min in 0u8..=100,
    ) {
        let mut expense = submit(false, min, &approvers);
        let required = approvers.iter().find(|a| a.required).map(|a| a.approver).unwrap();

        let report = ApprovalEngine::record_decision(
            &mut expense,
            required,
            Verdict::Rejected,
            None,
            Utc::now(),
        )
        .unwrap();

        prop_assert_eq!(report.status, ExpenseStatus::Rejected);
        prop_assert_eq!(expense.history.count(DecisionOutcome::Pending), 0);
    }

    /// A second decision by the same approver fails and changes nothing.
    #[test]
    fn prop_second_decision_is_rejected(
        approvers in arb_approvers(),
        first in arb_verdict(),
        second in arb_verdict(),
    ) {
        let mut expense = submit(false, 100, &approvers);
        let approver = approvers[0].approver;
        ApprovalEngine::record_decision(&mut expense, approver, first, None, Utc::now()).unwrap();
        let before = expense.clone();

        let result = ApprovalEngine::record_decision(&mut expense, approver, second, None, Utc::now());
        let already_decided = matches!(result, Err(WorkflowError::AlreadyDecided { .. }));
        prop_assert!(already_decided);
        prop_assert_eq!(expense, before);
    }

    /// The threshold comparison matches the exact rational comparison.
    #[test]
    fn prop_threshold_matches_percentage(
        total in 1usize..50,
        approved_seed in 0usize..50,
        min in 0u8..=100,
    ) {
        let approved = approved_seed % (total + 1);
        let pct = Decimal::from(approved) * Decimal::ONE_HUNDRED / Decimal::from(total);
        prop_assert_eq!(
            ApprovalEngine::meets_threshold(approved, total, min),
            pct >= Decimal::from(min)
        );
    }
}

/// Two of four approvals meet a 50 % threshold exactly.
#[test]
fn test_half_of_four_meets_fifty_percent() {
    let approvers: Vec<RuleApprover> = (0..4).map(|_| RuleApprover::optional(UserId::new())).collect();
    let mut expense = submit(false, 50, &approvers);

    ApprovalEngine::record_decision(&mut expense, approvers[0].approver, Verdict::Approved, None, Utc::now())
        .unwrap();
    assert_eq!(expense.status, ExpenseStatus::WaitingApproval);

    let report =
        ApprovalEngine::record_decision(&mut expense, approvers[3].approver, Verdict::Approved, None, Utc::now())
            .unwrap();
    assert_eq!(report.status, ExpenseStatus::Approved);
    assert_eq!(expense.history.count(DecisionOutcome::Skipped), 2);
}
