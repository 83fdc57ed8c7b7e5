//! Directory backed by the in-memory repositories.

use approvalflow_core::users::User;
use approvalflow_core::workflow::{ApprovalRule, Directory};
use approvalflow_shared::types::UserId;
use tracing::debug;

use crate::repositories::{ApprovalRuleRepository, UserRepository};

/// Resolves users and rules from the store.
///
/// An employee's rule is the one explicitly bound to them; failing that,
/// the most recently saved rule owned by their manager. Rules whose owner
/// no longer holds the Manager role never resolve.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    users: UserRepository,
    rules: ApprovalRuleRepository,
}

impl StoreDirectory {
    /// Creates a directory over the given repositories.
    #[must_use]
    pub fn new(users: UserRepository, rules: ApprovalRuleRepository) -> Self {
        Self { users, rules }
    }

    fn owner_is_manager(&self, rule: &ApprovalRule) -> bool {
        let active = self
            .users
            .user(rule.manager_id)
            .is_some_and(|owner| owner.is_manager());
        if !active {
            debug!(rule_id = %rule.id, manager_id = %rule.manager_id, "Rule owner is not a manager");
        }
        active
    }
}

impl Directory for StoreDirectory {
    fn user(&self, id: UserId) -> Option<User> {
        self.users.user(id)
    }

    fn rule_for_employee(&self, employee_id: UserId) -> Option<ApprovalRule> {
        if let Some(rule) = self
            .rules
            .bound_rule(employee_id)
            .filter(|r| self.owner_is_manager(r))
        {
            debug!(employee_id = %employee_id, rule_id = %rule.id, "Rule resolved by binding");
            return Some(rule);
        }

        let manager_id = self.users.user(employee_id)?.manager_id?;
        let rule = self
            .rules
            .rules_for_manager(manager_id)
            .into_iter()
            .next()
            .filter(|r| self.owner_is_manager(r))?;
        debug!(
            employee_id = %employee_id,
            manager_id = %manager_id,
            rule_id = %rule.id,
            "Rule resolved by manager"
        );
        Some(rule)
    }
}
