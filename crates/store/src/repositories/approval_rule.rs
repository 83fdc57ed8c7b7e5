//! Approval rule repository.
//!
//! Stores rules by id and explicit employee bindings. Rule resolution for
//! an employee lives in [`crate::directory::StoreDirectory`].

use std::sync::Arc;

use approvalflow_core::workflow::{ApprovalRule, WorkflowError};
use approvalflow_shared::types::{ApprovalRuleId, UserId};
use chrono::Utc;
use dashmap::DashMap;
use tracing::info;

use super::user::UserRepository;

/// In-memory approval rule store.
#[derive(Debug, Clone, Default)]
pub struct ApprovalRuleRepository {
    rules: Arc<DashMap<ApprovalRuleId, ApprovalRule>>,
    bindings: Arc<DashMap<UserId, ApprovalRuleId>>,
}

impl ApprovalRuleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a rule, creating or replacing it.
    ///
    /// Approver order is frozen as given. Expenses already submitted keep
    /// the snapshot they were bound with.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The rule itself is inconsistent (`InvalidRule`)
    /// - The owner or an approver does not exist (`UserNotFound`)
    /// - The owner is not a Manager (`InvalidRule`)
    pub fn save_rule(
        &self,
        mut rule: ApprovalRule,
        users: &UserRepository,
    ) -> Result<ApprovalRule, WorkflowError> {
        rule.validate()?;

        let owner = users
            .user(rule.manager_id)
            .ok_or(WorkflowError::UserNotFound(rule.manager_id))?;
        if !owner.is_manager() {
            return Err(WorkflowError::InvalidRule(format!(
                "rule owner {} has role {}, expected Manager",
                owner.id, owner.role
            )));
        }

        if let Some(missing) = rule
            .approvers
            .iter()
            .find(|a| users.user(a.approver).is_none())
        {
            return Err(WorkflowError::UserNotFound(missing.approver));
        }

        rule.updated_at = Utc::now();
        self.rules.insert(rule.id, rule.clone());

        info!(
            rule_id = %rule.id,
            manager_id = %rule.manager_id,
            approvers = rule.approvers.len(),
            sequential = rule.config.sequential,
            "Approval rule saved"
        );
        Ok(rule)
    }

    /// Binds `employee_id` to a rule, replacing any earlier binding.
    ///
    /// # Errors
    ///
    /// `InvalidRule` if the rule does not exist, `UserNotFound` if the
    /// employee does not.
    pub fn bind_employee(
        &self,
        rule_id: ApprovalRuleId,
        employee_id: UserId,
        users: &UserRepository,
    ) -> Result<(), WorkflowError> {
        if !self.rules.contains_key(&rule_id) {
            return Err(WorkflowError::InvalidRule(format!("rule {rule_id} not found")));
        }
        if users.user(employee_id).is_none() {
            return Err(WorkflowError::UserNotFound(employee_id));
        }

        self.bindings.insert(employee_id, rule_id);
        info!(rule_id = %rule_id, employee_id = %employee_id, "Employee bound to rule");
        Ok(())
    }

    /// Looks up a rule.
    #[must_use]
    pub fn rule(&self, id: ApprovalRuleId) -> Option<ApprovalRule> {
        self.rules.get(&id).map(|r| r.value().clone())
    }

    /// Rule explicitly bound to `employee_id`, if any.
    #[must_use]
    pub fn bound_rule(&self, employee_id: UserId) -> Option<ApprovalRule> {
        let rule_id = *self.bindings.get(&employee_id)?;
        self.rule(rule_id)
    }

    /// Rules owned by `manager_id`, most recently saved first.
    #[must_use]
    pub fn rules_for_manager(&self, manager_id: UserId) -> Vec<ApprovalRule> {
        let mut rules: Vec<ApprovalRule> = self
            .rules
            .iter()
            .filter(|r| r.manager_id == manager_id)
            .map(|r| r.value().clone())
            .collect();
        rules.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        rules
    }
}
