//! Approval rule configuration.
//!
//! A rule belongs to a manager and lists the approvers an expense must
//! collect decisions from, plus the flags that drive sequencing and
//! aggregation.

use approvalflow_shared::types::{ApprovalRuleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::workflow::error::WorkflowError;

/// Threshold applied when a rule does not set a minimum approval percentage.
pub const DEFAULT_MIN_APPROVAL_PERCENTAGE: u8 = 100;

/// Behavioural flags of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Approvers must decide one at a time in list order.
    pub sequential: bool,
    /// The owning manager decides first, ahead of every listed approver.
    pub manager_is_approver: bool,
    /// Share of approvers (0..=100) that must approve; `None` uses the default.
    pub min_approval_percentage: Option<u8>,
}

impl RuleConfig {
    /// Threshold in percent, falling back to `default` when unset.
    #[must_use]
    pub fn effective_min_percentage(&self, default: u8) -> u8 {
        self.min_approval_percentage.unwrap_or(default)
    }
}

/// One configured approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApprover {
    /// The approving user.
    pub approver: UserId,
    /// A rejection from a required approver rejects the expense outright.
    pub required: bool,
}

impl RuleApprover {
    /// An optional approver.
    #[must_use]
    pub const fn optional(approver: UserId) -> Self {
        Self {
            approver,
            required: false,
        }
    }

    /// A required approver.
    #[must_use]
    pub const fn required(approver: UserId) -> Self {
        Self {
            approver,
            required: true,
        }
    }
}

/// An approval rule owned by a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Unique identifier for the rule.
    pub id: ApprovalRuleId,
    /// Human-readable name ("Approval rule for miscellaneous expenses").
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// The manager who owns the rule.
    pub manager_id: UserId,
    /// Sequencing and threshold flags.
    pub config: RuleConfig,
    /// Approvers in the order fixed at save time.
    pub approvers: Vec<RuleApprover>,
    /// When the rule was last saved.
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRule {
    /// Creates a rule with a fresh id.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        manager_id: UserId,
        config: RuleConfig,
        approvers: Vec<RuleApprover>,
    ) -> Self {
        Self {
            id: ApprovalRuleId::new(),
            name: name.into(),
            description: None,
            manager_id,
            config,
            approvers,
            updated_at: Utc::now(),
        }
    }

    /// Checks the rule's own consistency.
    ///
    /// # Returns
    /// * `Err(WorkflowError::InvalidRule)` if the name is blank, the
    ///   percentage is above 100, an approver is listed twice, or no
    ///   approver would be bound
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::InvalidRule(
                "rule name must not be blank".to_string(),
            ));
        }

        if let Some(pct) = self.config.min_approval_percentage
            && pct > 100
        {
            return Err(WorkflowError::InvalidRule(format!(
                "minimum approval percentage must be within 0..=100, got {pct}"
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.approvers.iter().find(|a| !seen.insert(a.approver)) {
            return Err(WorkflowError::InvalidRule(format!(
                "approver {} is listed more than once",
                dup.approver
            )));
        }

        if self.resolved_approvers().is_empty() {
            return Err(WorkflowError::InvalidRule(
                "rule has no approvers".to_string(),
            ));
        }

        Ok(())
    }

    /// Approver slots in the order they are bound to an expense.
    ///
    /// With `manager_is_approver`, the owning manager takes slot 0. A
    /// manager already listed is moved there with their configured flag;
    /// an unlisted manager is inserted as a required approver.
    #[must_use]
    pub fn resolved_approvers(&self) -> Vec<RuleApprover> {
        if !self.config.manager_is_approver {
            return self.approvers.clone();
        }

        let manager_slot = self
            .approvers
            .iter()
            .find(|a| a.approver == self.manager_id)
            .copied()
            .unwrap_or(RuleApprover::required(self.manager_id));

        std::iter::once(manager_slot)
            .chain(
                self.approvers
                    .iter()
                    .filter(|a| a.approver != self.manager_id)
                    .copied(),
            )
            .collect()
    }
}
