//! Directory domain types.

use approvalflow_shared::types::UserId;
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user in the company.
///
/// A closed set: anything else is rejected at parse time and never
/// reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Company administrator (created at sign-up).
    Admin,
    /// Can own approval rules and manage employees.
    Manager,
    /// Submits expenses.
    Employee,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Employee => "Employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of the company directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address, unique case-insensitively.
    pub email: String,
    /// Role in the company.
    pub role: Role,
    /// Direct manager, always a user with role `Manager`.
    pub manager_id: Option<UserId>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a user from validated input.
    #[must_use]
    pub fn from_input(input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            role: input.role,
            manager_id: input.manager_id,
            created_at: now,
        }
    }

    /// Returns true if the user can own rules and have reports.
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

/// Input for adding a user from the dashboard or sign-up.
#[derive(Debug, Clone, Validate)]
pub struct NewUser {
    /// Display name.
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    /// Email address.
    #[garde(email)]
    pub email: String,
    /// Role in the company.
    #[garde(skip)]
    pub role: Role,
    /// Optional direct manager.
    #[garde(skip)]
    pub manager_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("employee"), Some(Role::Employee));
        assert_eq!(Role::parse(" ADMIN "), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Manager.to_string(), "Manager");
        assert_eq!(Role::Employee.as_str(), "Employee");
    }

    #[test]
    fn test_from_input_trims() {
        let user = User::from_input(
            NewUser {
                name: "  Sarah ".to_string(),
                email: " sarah@company.com".to_string(),
                role: Role::Employee,
                manager_id: None,
            },
            Utc::now(),
        );
        assert_eq!(user.name, "Sarah");
        assert_eq!(user.email, "sarah@company.com");
        assert!(!user.is_manager());
    }

    #[test]
    fn test_new_user_validation() {
        let valid = NewUser {
            name: "Marc".to_string(),
            email: "marc@gmail.com".to_string(),
            role: Role::Manager,
            manager_id: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = NewUser {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let empty_name = NewUser {
            name: String::new(),
            ..valid
        };
        assert!(empty_name.validate().is_err());
    }
}
