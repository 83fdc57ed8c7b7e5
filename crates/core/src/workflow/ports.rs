//! Seams between the engine and its collaborators.
//!
//! The engine itself never performs lookups or I/O; callers resolve users
//! and rules through a [`Directory`] and hand emitted events to a
//! [`NotificationSink`].

use approvalflow_shared::types::UserId;

use crate::users::User;
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::WorkflowEvent;

/// Read access to users and rule resolution.
pub trait Directory: Send + Sync {
    /// Looks up a user.
    fn user(&self, id: UserId) -> Option<User>;

    /// Resolves the rule that applies to expenses of `employee_id`.
    fn rule_for_employee(&self, employee_id: UserId) -> Option<ApprovalRule>;
}

/// Receiver of workflow events.
///
/// Events are delivered after the state change they describe has been
/// committed. Delivery failures must not surface to the caller.
pub trait NotificationSink: Send + Sync {
    /// Delivers one event.
    fn notify(&self, event: &WorkflowEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _event: &WorkflowEvent) {}
}
