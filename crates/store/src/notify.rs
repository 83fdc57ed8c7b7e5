//! Notification sinks for workflow events.

use std::sync::Arc;

use approvalflow_core::workflow::{NotificationSink, WorkflowEvent};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info};

/// Logs one structured line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::ExpenseSubmitted {
                expense_id,
                rule_id,
                approvers,
                ..
            } => info!(
                expense_id = %expense_id,
                rule_id = %rule_id,
                approvers = approvers.len(),
                "Expense submitted for approval"
            ),
            WorkflowEvent::DecisionRecorded {
                expense_id,
                approver,
                verdict,
                ..
            } => info!(
                expense_id = %expense_id,
                approver = %approver,
                verdict = ?verdict,
                "Approval decision recorded"
            ),
            WorkflowEvent::ExpenseApproved {
                expense_id,
                approval_percentage,
                converted,
                ..
            } => info!(
                expense_id = %expense_id,
                approval_percentage = %approval_percentage,
                converted = ?converted.map(|m| m.to_string()),
                "Expense approved"
            ),
            WorkflowEvent::ExpenseRejected {
                expense_id, reason, ..
            } => info!(expense_id = %expense_id, reason = ?reason, "Expense rejected"),
        }
    }
}

/// Forwards events to an unbounded channel.
///
/// A dropped receiver is not an error; events are then discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<WorkflowEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that consumes its events.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: &WorkflowEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!(expense_id = %event.expense_id(), "Event receiver dropped");
        }
    }
}

/// Delivers every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, event: &WorkflowEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}
