use super::{Expense, Member};
use crate::core::errors::TripError;
use async_trait::async_trait;

/// Everything the engine needs for one trip, read as a single snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettlementInput {
    pub members: Vec<Member>,
    pub expenses: Vec<Expense>,
}

/// Where settlement input comes from. Storage backends implement this so the
/// engine never sees how members and expenses are fetched.
#[async_trait]
pub trait ExpenseSource: Send + Sync {
    async fn settlement_input(&self, trip_id: &str) -> Result<SettlementInput, TripError>;
}
