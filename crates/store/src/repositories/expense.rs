//! Expense repository.
//!
//! Each expense sits behind its own async mutex. Callers clone the handle
//! out of the map before locking so no map shard is held across an await.

use std::sync::Arc;

use approvalflow_core::workflow::Expense;
use approvalflow_shared::types::{ExpenseId, UserId};
use dashmap::DashMap;
use tokio::sync::Mutex;

/// Shared handle to one expense.
pub type ExpenseHandle = Arc<Mutex<Expense>>;

/// In-memory expense store keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ExpenseRepository {
    expenses: Arc<DashMap<ExpenseId, ExpenseHandle>>,
}

impl ExpenseRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new expense.
    pub fn insert(&self, expense: Expense) {
        self.expenses
            .insert(expense.id, Arc::new(Mutex::new(expense)));
    }

    /// Lock handle for an expense.
    #[must_use]
    pub fn handle(&self, id: ExpenseId) -> Option<ExpenseHandle> {
        self.expenses.get(&id).map(|h| Arc::clone(h.value()))
    }

    /// Current state of an expense.
    pub async fn get(&self, id: ExpenseId) -> Option<Expense> {
        let handle = self.handle(id)?;
        let expense = handle.lock().await;
        Some(expense.clone())
    }

    /// Snapshot of every expense matching `filter`, oldest first.
    pub async fn find(&self, filter: impl Fn(&Expense) -> bool) -> Vec<Expense> {
        let handles: Vec<ExpenseHandle> = self
            .expenses
            .iter()
            .map(|h| Arc::clone(h.value()))
            .collect();

        let mut found = Vec::new();
        for handle in handles {
            let expense = handle.lock().await;
            if filter(&expense) {
                found.push(expense.clone());
            }
        }
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        found
    }

    /// Expenses owned by `employee_id`, oldest first.
    pub async fn for_employee(&self, employee_id: UserId) -> Vec<Expense> {
        self.find(|e| e.employee_id == employee_id).await
    }

    /// Number of stored expenses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }
}
