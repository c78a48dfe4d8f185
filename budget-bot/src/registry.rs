//! Handler wiring. Registration order is the tie-break: the first matching route wins.

use budget_core::Bot;
use std::sync::Arc;
use update_dispatcher::{
    DispatchError, Filter, Flow, HandlerBinding, HandlerRegistry, MembershipFilter,
};

use crate::handlers::{
    CancelAction, CreateBudgetAction, CreateIncomeAction, CreateIncomeInfoAction,
    ListIncomesAction, StartTopUpAction, TopUpDrafts, TopUpIncomeAction, CREATE_INCOME_CALLBACK,
    INCOME_CREATING,
};
use crate::service::BudgetService;

pub const CREATE_INCOME_FLOW: &str = "create_income";
pub const TOP_UP_FLOW: &str = "top_up";

/// `+<digits> <anything>`: the top-up shorthand.
pub const TOP_UP_PATTERN: &str = r"^\+\d+\s+.*";

/// Builds the bot's registry:
///
/// 1. bot joined a group → create budget
/// 2. `/incomes` → list incomes
/// 3. `/cancel` outside a conversation → goodbye
/// 4. `create_income` flow, started by the "Create income" button
/// 5. `top_up` flow, started by `+<amount> <note>`
///
/// `drafts` is shared by the top-up actions and cancel; give it the conversation store's TTL.
pub fn build_registry(
    bot: Arc<dyn Bot>,
    service: Arc<dyn BudgetService>,
    drafts: TopUpDrafts,
) -> Result<HandlerRegistry, DispatchError> {
    let cancel = || {
        HandlerBinding::new(
            "cancel",
            Filter::command("cancel"),
            Arc::new(CancelAction::new(bot.clone(), drafts.clone())),
        )
    };

    let create_income = Flow::builder(CREATE_INCOME_FLOW)
        .entry(HandlerBinding::new(
            "create_income_info",
            Filter::callback_data(CREATE_INCOME_CALLBACK),
            Arc::new(CreateIncomeInfoAction::new(bot.clone())),
        ))
        .state(
            INCOME_CREATING,
            HandlerBinding::new(
                "create_income",
                Filter::no_command(),
                Arc::new(CreateIncomeAction::new(bot.clone(), service.clone())),
            ),
        )
        .exit(cancel())
        .build()?;

    let top_up = Flow::builder(TOP_UP_FLOW)
        .entry(HandlerBinding::new(
            "start_top_up",
            Filter::regex(TOP_UP_PATTERN)?,
            Arc::new(StartTopUpAction::new(
                bot.clone(),
                service.clone(),
                drafts.clone(),
            )),
        ))
        .state(
            INCOME_CREATING,
            HandlerBinding::new(
                "top_up_income",
                Filter::no_command(),
                Arc::new(TopUpIncomeAction::new(
                    bot.clone(),
                    service.clone(),
                    drafts.clone(),
                )),
            ),
        )
        .exit(cancel())
        .build()?;

    HandlerRegistry::builder()
        .add_handler(HandlerBinding::new(
            "create_budget",
            Filter::membership(MembershipFilter::InGroup)
                .and(Filter::membership(MembershipFilter::Joined)),
            Arc::new(CreateBudgetAction::new(bot.clone(), service.clone())),
        ))
        .add_handler(HandlerBinding::new(
            "list_incomes",
            Filter::command("incomes"),
            Arc::new(ListIncomesAction::new(bot.clone(), service.clone())),
        ))
        .add_handler(cancel())
        .add_flow(create_income)
        .add_flow(top_up)
        .build()
}
