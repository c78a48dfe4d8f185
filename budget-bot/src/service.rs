//! # Budget service
//!
//! Boundary to the budget-management backend. Handlers only need success or failure from it to decide
//! where a conversation goes next. [`InMemoryBudgetService`] is the bundled backend; its data does not
//! survive a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Budget already exists for chat {0}")]
    BudgetExists(i64),

    #[error("No budget for chat {0}")]
    BudgetNotFound(i64),

    #[error("Income '{0}' already exists")]
    IncomeExists(String),

    #[error("Income '{0}' not found")]
    IncomeNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// A chat's budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub chat_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A named income inside a budget, with its running balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Income {
    pub name: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BudgetService: Send + Sync {
    /// Creates the budget of a chat.
    async fn create_budget(&self, chat_id: i64) -> Result<Budget, ServiceError>;

    /// The chat's budget, or `BudgetNotFound`.
    async fn get_budget(&self, chat_id: i64) -> Result<Budget, ServiceError>;

    /// Adds an income with zero balance. Names are compared case-insensitively.
    async fn create_income(&self, chat_id: i64, name: &str) -> Result<Income, ServiceError>;

    /// Adds a positive `amount` to an existing income and returns it updated.
    async fn top_up_income(
        &self,
        chat_id: i64,
        name: &str,
        amount: i64,
    ) -> Result<Income, ServiceError>;

    /// Incomes of the chat's budget in creation order.
    async fn list_incomes(&self, chat_id: i64) -> Result<Vec<Income>, ServiceError>;
}

#[derive(Debug, Clone)]
struct BudgetRecord {
    budget: Budget,
    incomes: Vec<Income>,
}

impl BudgetRecord {
    fn income_mut(&mut self, name: &str) -> Option<&mut Income> {
        let wanted = name.to_lowercase();
        self.incomes
            .iter_mut()
            .find(|i| i.name.to_lowercase() == wanted)
    }
}

/// In-memory [`BudgetService`] for development and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBudgetService {
    budgets: Arc<RwLock<HashMap<i64, BudgetRecord>>>,
}

impl InMemoryBudgetService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetService for InMemoryBudgetService {
    async fn create_budget(&self, chat_id: i64) -> Result<Budget, ServiceError> {
        let mut budgets = self.budgets.write().await;
        if budgets.contains_key(&chat_id) {
            return Err(ServiceError::BudgetExists(chat_id));
        }
        let budget = Budget {
            chat_id,
            created_at: Utc::now(),
        };
        budgets.insert(
            chat_id,
            BudgetRecord {
                budget: budget.clone(),
                incomes: Vec::new(),
            },
        );
        info!(chat_id = chat_id, "Budget created");
        Ok(budget)
    }

    async fn get_budget(&self, chat_id: i64) -> Result<Budget, ServiceError> {
        let budgets = self.budgets.read().await;
        budgets
            .get(&chat_id)
            .map(|record| record.budget.clone())
            .ok_or(ServiceError::BudgetNotFound(chat_id))
    }

    async fn create_income(&self, chat_id: i64, name: &str) -> Result<Income, ServiceError> {
        let name = name.trim();
        let mut budgets = self.budgets.write().await;
        let record = budgets
            .get_mut(&chat_id)
            .ok_or(ServiceError::BudgetNotFound(chat_id))?;
        if record.income_mut(name).is_some() {
            return Err(ServiceError::IncomeExists(name.to_string()));
        }
        let income = Income {
            name: name.to_string(),
            balance: 0,
            created_at: Utc::now(),
        };
        record.incomes.push(income.clone());
        info!(chat_id = chat_id, income = %name, "Income created");
        Ok(income)
    }

    async fn top_up_income(
        &self,
        chat_id: i64,
        name: &str,
        amount: i64,
    ) -> Result<Income, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::InvalidAmount(amount));
        }
        let mut budgets = self.budgets.write().await;
        let record = budgets
            .get_mut(&chat_id)
            .ok_or(ServiceError::BudgetNotFound(chat_id))?;
        let income = record
            .income_mut(name.trim())
            .ok_or_else(|| ServiceError::IncomeNotFound(name.trim().to_string()))?;
        income.balance = income
            .balance
            .checked_add(amount)
            .ok_or(ServiceError::InvalidAmount(amount))?;
        info!(chat_id = chat_id, income = %income.name, amount = amount, "Income topped up");
        Ok(income.clone())
    }

    async fn list_incomes(&self, chat_id: i64) -> Result<Vec<Income>, ServiceError> {
        let budgets = self.budgets.read().await;
        budgets
            .get(&chat_id)
            .map(|record| record.incomes.clone())
            .ok_or(ServiceError::BudgetNotFound(chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_budget_lifecycle() {
        let service = InMemoryBudgetService::new();
        assert_eq!(
            service.list_incomes(1).await,
            Err(ServiceError::BudgetNotFound(1))
        );

        let budget = service.create_budget(1).await.unwrap();
        assert_eq!(
            service.create_budget(1).await.unwrap_err(),
            ServiceError::BudgetExists(1)
        );
        assert_eq!(service.get_budget(1).await, Ok(budget));
        assert_eq!(
            service.get_budget(2).await,
            Err(ServiceError::BudgetNotFound(2))
        );

        service.create_income(1, " Salary ").await.unwrap();
        assert_eq!(
            service.create_income(1, "salary").await.unwrap_err(),
            ServiceError::IncomeExists("salary".to_string())
        );

        let income = service.top_up_income(1, "SALARY", 500).await.unwrap();
        assert_eq!(income.name, "Salary");
        assert_eq!(income.balance, 500);
        let income = service.top_up_income(1, "salary", 250).await.unwrap();
        assert_eq!(income.balance, 750);

        let incomes = service.list_incomes(1).await.unwrap();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].balance, 750);
    }

    #[tokio::test]
    async fn test_top_up_rejects_bad_input() {
        let service = InMemoryBudgetService::new();
        service.create_budget(1).await.unwrap();
        service.create_income(1, "Salary").await.unwrap();

        assert_eq!(
            service.top_up_income(1, "Salary", 0).await.unwrap_err(),
            ServiceError::InvalidAmount(0)
        );
        assert_eq!(
            service.top_up_income(1, "Bonus", 10).await.unwrap_err(),
            ServiceError::IncomeNotFound("Bonus".to_string())
        );
        assert_eq!(
            service.top_up_income(2, "Salary", 10).await.unwrap_err(),
            ServiceError::BudgetNotFound(2)
        );
        service.top_up_income(1, "Salary", i64::MAX).await.unwrap();
        assert!(matches!(
            service.top_up_income(1, "Salary", 1).await,
            Err(ServiceError::InvalidAmount(1))
        ));
    }
}
