//! User directory repository.

use std::sync::{Arc, Mutex, PoisonError};

use approvalflow_core::users::{NewUser, Role, User, UserError, UserService};
use approvalflow_shared::types::UserId;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

/// In-memory user directory.
///
/// Reads go straight to the map. Changes that touch the manager relation
/// are serialized so cycle checks see a consistent directory.
#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    users: Arc<DashMap<UserId, User>>,
    emails: Arc<DashMap<String, UserId>>,
    relation_lock: Arc<Mutex<()>>,
}

impl UserRepository {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Name or email are malformed
    /// - The email is already registered (case-insensitive)
    /// - The manager does not exist or is not a Manager
    pub fn create_user(&self, input: NewUser) -> Result<User, UserError> {
        UserService::validate_new(&input)?;

        let _relation = self.relation_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let user = User::from_input(input, Utc::now());
        if let Some(manager_id) = user.manager_id {
            UserService::validate_manager_assignment(user.id, manager_id, |id| self.user(id))?;
        }

        match self.emails.entry(user.email.to_lowercase()) {
            Entry::Occupied(_) => return Err(UserError::DuplicateEmail(user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());

        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Looks up a user.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.value().clone())
    }

    /// Looks up a user by email, ignoring case.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let id = *self.emails.get(&email.trim().to_lowercase())?;
        self.user(id)
    }

    /// All users, ordered by name.
    #[must_use]
    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users
    }

    /// Users with the Manager role, ordered by name.
    #[must_use]
    pub fn managers(&self) -> Vec<User> {
        self.list_users()
            .into_iter()
            .filter(User::is_manager)
            .collect()
    }

    /// Number of users whose manager is `manager_id`.
    #[must_use]
    pub fn direct_reports(&self, manager_id: UserId) -> usize {
        self.users
            .iter()
            .filter(|u| u.manager_id == Some(manager_id))
            .count()
    }

    /// Changes a user's role.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, or `ManagerHasReports` when a manager with reports
    /// would lose the Manager role.
    pub fn change_role(&self, user_id: UserId, role: Role) -> Result<User, UserError> {
        let _relation = self.relation_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let user = self.user(user_id).ok_or(UserError::UserNotFound(user_id))?;
        UserService::validate_role_change(&user, role, self.direct_reports(user_id))?;

        let updated = self.update(user_id, |u| u.role = role)?;
        info!(user_id = %user_id, role = %role, "User role changed");
        Ok(updated)
    }

    /// Sets or clears a user's manager.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, or any manager-assignment violation.
    pub fn assign_manager(
        &self,
        user_id: UserId,
        manager_id: Option<UserId>,
    ) -> Result<User, UserError> {
        let _relation = self.relation_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.users.contains_key(&user_id) {
            return Err(UserError::UserNotFound(user_id));
        }
        if let Some(manager_id) = manager_id {
            UserService::validate_manager_assignment(user_id, manager_id, |id| self.user(id))?;
        }

        let updated = self.update(user_id, |u| u.manager_id = manager_id)?;
        debug!(user_id = %user_id, manager_id = ?manager_id, "Manager assigned");
        Ok(updated)
    }

    fn update(&self, user_id: UserId, apply: impl FnOnce(&mut User)) -> Result<User, UserError> {
        let mut entry = self
            .users
            .get_mut(&user_id)
            .ok_or(UserError::UserNotFound(user_id))?;
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}
