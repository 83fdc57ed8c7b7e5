//! Mock data seeder for ApprovalFlow development.
//!
//! Seeds the demo company (users, an approval rule, exchange rates and
//! expenses), walks the expenses through the approval workflow and prints
//! the resulting state as JSON.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use approvalflow_core::currency::{CachedRates, ExchangeRate, RateTable};
use approvalflow_core::users::{NewUser, Role, User};
use approvalflow_core::workflow::{
    ApprovalRule, Expense, ExpenseCategory, NewExpense, RuleApprover, RuleConfig, Verdict,
    WorkflowEvent,
};
use approvalflow_shared::AppConfig;
use approvalflow_shared::types::{Currency, ExpenseId, Money};
use approvalflow_store::{
    ApprovalRuleRepository, ApprovalService, ApprovalSettings, ChannelSink, ExpenseRepository,
    FanoutSink, StatusTotal, StoreDirectory, TracingSink, UserRepository,
};

/// USD-based rates seeded for every supported currency.
const USD_RATES: [(Currency, Decimal); 11] = [
    (Currency::Inr, dec!(88.20)),
    (Currency::Eur, dec!(0.86)),
    (Currency::Gbp, dec!(0.75)),
    (Currency::Krw, dec!(1420)),
    (Currency::Aed, dec!(3.6725)),
    (Currency::Cad, dec!(1.39)),
    (Currency::Aud, dec!(1.52)),
    (Currency::Jpy, dec!(150)),
    (Currency::Chf, dec!(0.80)),
    (Currency::Sgd, dec!(1.29)),
    (Currency::Idr, dec!(16500)),
];

/// Seeded directory.
struct Staff {
    marc: User,
    sarah: User,
    john: User,
    mitchell: User,
    andreas: User,
}

/// Printed once the walkthrough completes.
#[derive(Serialize)]
struct Summary {
    company: String,
    base_currency: Currency,
    users: Vec<User>,
    rules: Vec<ApprovalRule>,
    expenses: Vec<Expense>,
    totals: Vec<StatusTotal>,
    manager_queue: Vec<ExpenseId>,
    notifications: Vec<WorkflowEvent>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    let users = UserRepository::new();
    let rules = ApprovalRuleRepository::new();

    info!("Seeding users...");
    let staff = seed_users(&users)?;

    info!("Seeding approval rule...");
    seed_rule(&rules, &users, &staff)?;

    info!("Seeding exchange rates...");
    let rates = seed_rates()?;
    let rates = CachedRates::with_config(
        rates,
        config.rates.cache_capacity,
        config.rates.cache_ttl_secs,
    );

    let (channel, mut notifications) = ChannelSink::new();
    let sink = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(Arc::new(channel));

    let service = ApprovalService::new(
        ExpenseRepository::new(),
        Arc::new(StoreDirectory::new(users.clone(), rules.clone())),
        Arc::new(rates),
        Arc::new(sink),
        ApprovalSettings::from(&config),
    );

    info!("Seeding expenses...");
    walkthrough(&service, &staff).await?;

    let manager_queue = service
        .approval_queue(staff.marc.id)
        .await
        .into_iter()
        .map(|e| e.id)
        .collect();

    let mut events = Vec::new();
    while let Ok(event) = notifications.try_recv() {
        events.push(event);
    }

    let summary = Summary {
        company: config.company.name.clone(),
        base_currency: config.company.base_currency,
        users: users.list_users(),
        rules: rules.rules_for_manager(staff.marc.id),
        expenses: service.expenses_for_employee(staff.sarah.id).await,
        totals: service.totals_by_status(staff.sarah.id).await,
        manager_queue,
        notifications: events,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("Seeding complete!");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let json = config.logging.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn seed_users(users: &UserRepository) -> anyhow::Result<Staff> {
    let add = |name: &str, role: Role, manager: Option<&User>| {
        users.create_user(NewUser {
            name: name.to_string(),
            email: format!("{}@acme.example", name.to_lowercase()),
            role,
            manager_id: manager.map(|m| m.id),
        })
    };

    let marc = add("Marc", Role::Manager, None)?;
    let sarah = add("Sarah", Role::Employee, Some(&marc))?;
    let john = add("John", Role::Manager, None)?;
    let mitchell = add("Mitchell", Role::Manager, None)?;
    let andreas = add("Andreas", Role::Manager, None)?;

    Ok(Staff {
        marc,
        sarah,
        john,
        mitchell,
        andreas,
    })
}

fn seed_rule(
    rules: &ApprovalRuleRepository,
    users: &UserRepository,
    staff: &Staff,
) -> anyhow::Result<()> {
    let mut rule = ApprovalRule::new(
        "Approval rule for miscellaneous expenses",
        staff.marc.id,
        RuleConfig {
            sequential: true,
            manager_is_approver: true,
            min_approval_percentage: Some(66),
        },
        vec![
            RuleApprover::required(staff.john.id),
            RuleApprover::optional(staff.mitchell.id),
            RuleApprover::optional(staff.andreas.id),
        ],
    );
    rule.description = Some("Client dinners, taxis and other small claims".to_string());

    let rule = rules.save_rule(rule, users)?;
    rules.bind_employee(rule.id, staff.sarah.id, users)?;
    Ok(())
}

fn seed_rates() -> anyhow::Result<RateTable> {
    let effective = NaiveDate::from_ymd_opt(2025, 10, 1).context("invalid seed date")?;
    let mut table = RateTable::new();
    for (currency, rate) in USD_RATES {
        table.insert(ExchangeRate::new(Currency::Usd, currency, rate, effective))?;
    }
    Ok(table)
}

fn claim(
    staff: &Staff,
    description: &str,
    category: ExpenseCategory,
    day: u32,
    amount: Money,
) -> anyhow::Result<NewExpense> {
    Ok(NewExpense {
        employee_id: staff.sarah.id,
        description: description.to_string(),
        category,
        expense_date: NaiveDate::from_ymd_opt(2025, 10, day).context("invalid expense date")?,
        paid_by: staff.sarah.name.clone(),
        amount,
        remarks: None,
        receipt: None,
    })
}

async fn walkthrough(service: &ApprovalService, staff: &Staff) -> anyhow::Result<()> {
    let sarah = staff.sarah.id;

    // Stays a draft.
    let mut restaurant = claim(
        staff,
        "Restaurant bill",
        ExpenseCategory::Food,
        9,
        Money::new(dec!(5000), Currency::Inr),
    )?;
    restaurant.remarks = Some("Wine".to_string());
    service.create_draft(restaurant)?;

    // Walked through the whole sequential chain.
    let mut dinner = claim(
        staff,
        "Client dinner",
        ExpenseCategory::Food,
        5,
        Money::new(dec!(3567), Currency::Inr),
    )?;
    dinner.remarks = Some("Team meeting".to_string());
    let dinner = service.create_draft(dinner)?;
    service.submit(dinner.id, sarah).await?;
    for approver in [&staff.marc, &staff.john, &staff.mitchell] {
        let expense = service
            .record_decision(dinner.id, approver.id, Verdict::Approved, None)
            .await?;
        info!(
            expense_id = %expense.id,
            status = %expense.status,
            approver = %approver.name,
            "Walkthrough step"
        );
    }

    // Waiting on the manager.
    let taxi = service.create_draft(claim(
        staff,
        "Taxi fare",
        ExpenseCategory::Transport,
        4,
        Money::new(dec!(500), Currency::Inr),
    )?)?;
    service.submit(taxi.id, sarah).await?;

    for (description, category, day, amount) in [
        (
            "Conference travel",
            ExpenseCategory::Travel,
            2,
            Money::new(dec!(150), Currency::Usd),
        ),
        (
            "Hotel stay",
            ExpenseCategory::Accommodation,
            3,
            Money::new(dec!(850), Currency::Eur),
        ),
        (
            "Team lunch",
            ExpenseCategory::Food,
            6,
            Money::new(dec!(75.50), Currency::Gbp),
        ),
    ] {
        let expense = service.create_draft(claim(staff, description, category, day, amount)?)?;
        service.submit(expense.id, sarah).await?;
    }

    // The manager is a required approver, so this rejects the lunch outright.
    if let Some(lunch) = service
        .approval_queue(staff.marc.id)
        .await
        .into_iter()
        .find(|e| e.description == "Team lunch")
    {
        service
            .record_decision(
                lunch.id,
                staff.marc.id,
                Verdict::Rejected,
                Some("Not a client meeting".to_string()),
            )
            .await?;
    }

    Ok(())
}
