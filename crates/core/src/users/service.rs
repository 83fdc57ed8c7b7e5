//! Validation of directory changes.
//!
//! The directory itself lives in the store; these functions only decide
//! whether a change keeps the manager relation well-formed.

use std::collections::HashSet;

use approvalflow_shared::types::UserId;
use garde::Validate;

use crate::users::error::UserError;
use crate::users::types::{NewUser, Role, User};

/// Stateless validator for user directory changes.
pub struct UserService;

impl UserService {
    /// Validate the fields of a new user.
    ///
    /// Name and email are checked as stored, with surrounding whitespace
    /// removed.
    ///
    /// # Returns
    /// * `Ok(())` if name and email are well-formed
    /// * `Err(UserError::Validation)` with the garde report otherwise
    pub fn validate_new(input: &NewUser) -> Result<(), UserError> {
        let trimmed = NewUser {
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            ..input.clone()
        };
        if trimmed.name.is_empty() {
            return Err(UserError::Validation("name must not be blank".to_string()));
        }
        trimmed
            .validate()
            .map_err(|report| UserError::Validation(report.to_string()))
    }

    /// Check that `manager_id` may become the manager of `user_id`.
    ///
    /// The manager must exist, hold the Manager role, differ from the user,
    /// and must not already report (directly or transitively) to the user.
    ///
    /// # Arguments
    /// * `user_id` - The user being assigned
    /// * `manager_id` - The proposed manager
    /// * `lookup` - Directory lookup by id
    pub fn validate_manager_assignment<F>(
        user_id: UserId,
        manager_id: UserId,
        lookup: F,
    ) -> Result<(), UserError>
    where
        F: Fn(UserId) -> Option<User>,
    {
        if user_id == manager_id {
            return Err(UserError::SelfManagement(user_id));
        }

        let manager = lookup(manager_id).ok_or(UserError::ManagerNotFound(manager_id))?;
        if manager.role != Role::Manager {
            return Err(UserError::InvalidManager {
                manager_id,
                role: manager.role,
            });
        }

        // Walk up from the proposed manager; reaching the user closes a loop.
        let mut visited = HashSet::new();
        let mut cursor = manager.manager_id;
        while let Some(current) = cursor {
            if current == user_id {
                return Err(UserError::ManagerCycle {
                    user_id,
                    manager_id,
                });
            }
            if !visited.insert(current) {
                break;
            }
            cursor = lookup(current).and_then(|u| u.manager_id);
        }

        Ok(())
    }

    /// Check that `user` may switch to `new_role`.
    ///
    /// A manager who still has direct reports must stay a Manager.
    pub fn validate_role_change(
        user: &User,
        new_role: Role,
        direct_reports: usize,
    ) -> Result<(), UserError> {
        if user.role == Role::Manager && new_role != Role::Manager && direct_reports > 0 {
            return Err(UserError::ManagerHasReports {
                user_id: user.id,
                reports: direct_reports,
            });
        }
        Ok(())
    }
}
