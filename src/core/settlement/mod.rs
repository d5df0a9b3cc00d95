//! Multi-party expense settlement.
//!
//! Balances are folded from the expense list by [`compute_balances`], then
//! [`SettlementPlanner`] nets them into debtor→creditor transfers.
//! [`SettlementEngine`] runs both stages behind input validation and the
//! zero-sum check. Everything here is pure: no I/O, no caching, no shared state.

pub mod balance;
pub mod engine;
pub mod planner;
pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub use balance::{compute_balances, round_balances, validate_expense};
pub use engine::SettlementEngine;
pub use planner::{SettlementPlanner, residual_balances};
pub use source::{ExpenseSource, SettlementInput};

/// Participant identifier.
pub type Member = String;

/// Net balance per member. Positive: owed money. Negative: owes money.
pub type Balances = BTreeMap<Member, f64>;

/// Tolerance below which a balance or transfer counts as zero.
pub const EPSILON: f64 = 0.01;

/// Allowed drift of the balance sum away from zero. Large totals get a
/// relative allowance of `total * 1e-12` instead.
pub const ZERO_SUM_TOLERANCE: f64 = 1e-6;

/// Largest expense amount the engine accepts, so every cent count fits an `i64`.
pub const MAX_AMOUNT: f64 = 1e12;

/// One shared cost, split equally among `split_among`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub payer: Member,
    pub amount: f64,
    pub split_among: Vec<Member>,
}

impl Expense {
    pub fn new(id: impl Into<String>, payer: impl Into<String>, amount: f64, split_among: &[&str]) -> Self {
        Expense {
            id: id.into(),
            payer: payer.into(),
            amount,
            split_among: split_among.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// `from` should pay `amount` to `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Settlement {
    pub from: Member,
    pub to: Member,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SettlementPlan {
    pub balances: Balances,
    pub settlements: Vec<Settlement>,
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
