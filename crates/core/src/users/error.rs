//! Directory error types.

use approvalflow_shared::AppError;
use approvalflow_shared::types::UserId;
use thiserror::Error;

use crate::users::types::Role;

/// Errors raised while maintaining the user directory.
#[derive(Debug, Error)]
pub enum UserError {
    /// Input failed field validation.
    #[error("Invalid user input: {0}")]
    Validation(String),

    /// Another user already has this email.
    #[error("Email {0} is already registered")]
    DuplicateEmail(String),

    /// User not found.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Referenced manager does not exist.
    #[error("Manager {0} not found")]
    ManagerNotFound(UserId),

    /// Referenced manager does not have the Manager role.
    #[error("User {manager_id} has role {role} and cannot be assigned as a manager")]
    InvalidManager {
        /// The referenced user.
        manager_id: UserId,
        /// Their actual role.
        role: Role,
    },

    /// A user cannot manage themselves.
    #[error("User {0} cannot be their own manager")]
    SelfManagement(UserId),

    /// Assignment would close a loop in the manager chain.
    #[error("Assigning manager {manager_id} to {user_id} would create a cycle")]
    ManagerCycle {
        /// The user being updated.
        user_id: UserId,
        /// The proposed manager.
        manager_id: UserId,
    },

    /// A manager with reports cannot lose the Manager role.
    #[error("User {user_id} still manages {reports} user(s)")]
    ManagerHasReports {
        /// The manager.
        user_id: UserId,
        /// Number of direct reports.
        reports: usize,
    },
}

impl UserError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::UserNotFound(_) | Self::ManagerNotFound(_) => 404,
            Self::DuplicateEmail(_) => 409,
            Self::InvalidManager { .. }
            | Self::SelfManagement(_)
            | Self::ManagerCycle { .. }
            | Self::ManagerHasReports { .. } => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::ManagerNotFound(_) => "MANAGER_NOT_FOUND",
            Self::InvalidManager { .. } => "INVALID_MANAGER",
            Self::SelfManagement(_) => "SELF_MANAGEMENT",
            Self::ManagerCycle { .. } => "MANAGER_CYCLE",
            Self::ManagerHasReports { .. } => "MANAGER_HAS_REPORTS",
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let message = err.to_string();
        match err {
            UserError::Validation(_) => Self::Validation(message),
            UserError::UserNotFound(_) | UserError::ManagerNotFound(_) => Self::NotFound(message),
            UserError::DuplicateEmail(_) => Self::Conflict(message),
            UserError::InvalidManager { .. }
            | UserError::SelfManagement(_)
            | UserError::ManagerCycle { .. }
            | UserError::ManagerHasReports { .. } => Self::BusinessRule(message),
        }
    }
}
