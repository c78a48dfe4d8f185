//! Handler actions of the budget bot. Each action replies through [`budget_core::Bot`], calls the
//! [`BudgetService`](crate::service::BudgetService) and returns a [`Signal`](update_dispatcher::Signal).

mod budget;
mod cancel;
mod incomes;
mod top_up;

pub use budget::CreateBudgetAction;
pub use cancel::{CancelAction, GOODBYE};
pub use incomes::{CreateIncomeAction, CreateIncomeInfoAction, ListIncomesAction};
pub use top_up::{parse_top_up, StartTopUpAction, TopUpDraft, TopUpDrafts, TopUpIncomeAction};

use crate::service::{Income, ServiceError};
use budget_core::HandlerError;

/// State in which both flows wait for an income name.
pub const INCOME_CREATING: &str = "income_creating";

/// Callback data of the "Create income" button.
pub const CREATE_INCOME_CALLBACK: &str = "_create_income";

fn format_incomes(incomes: &[Income]) -> String {
    incomes
        .iter()
        .map(|i| format!("• {}: {}", i.name, i.balance))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<ServiceError> for HandlerError {
    fn from(e: ServiceError) -> Self {
        HandlerError::Service(e.to_string())
    }
}
