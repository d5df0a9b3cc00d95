use super::{Balances, Expense, Member, SettlementPlan, SettlementPlanner, ZERO_SUM_TOLERANCE, compute_balances};
use crate::core::errors::{InvariantViolation, SettlementError};
use tracing::{debug, error};

/// Runs balance computation and settlement planning as one call.
///
/// Holds nothing but the planner's tolerance, so a single engine can be
/// shared freely between tasks.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementEngine {
    planner: SettlementPlanner,
}

impl SettlementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_planner(planner: SettlementPlanner) -> Self {
        SettlementEngine { planner }
    }

    /// Validates the input, folds it into balances and plans the transfers.
    ///
    /// Input problems surface as [`SettlementError::Validation`] before any
    /// output exists. Balances that fail to net to zero surface as
    /// [`SettlementError::Invariant`] instead of a plan that would not balance.
    pub fn settle(&self, members: &[Member], expenses: &[Expense]) -> Result<SettlementPlan, SettlementError> {
        let balances = compute_balances(members, expenses)?;

        let total: f64 = expenses.iter().map(|e| e.amount).sum();
        if let Err(violation) = check_zero_sum(&balances, total) {
            error!(
                "Balances for {} members and {} expenses: {}",
                members.len(),
                expenses.len(),
                violation
            );
            return Err(violation.into());
        }

        let settlements = self.planner.plan(&balances);
        debug!(
            "Settled {} expenses among {} members with {} transfers",
            expenses.len(),
            members.len(),
            settlements.len()
        );
        Ok(SettlementPlan { balances, settlements })
    }
}

/// Balances must net to zero within [`ZERO_SUM_TOLERANCE`], or within
/// `total * 1e-12` when the expenses being netted are large.
fn check_zero_sum(balances: &Balances, total: f64) -> Result<(), InvariantViolation> {
    let sum: f64 = balances.values().sum();
    let tolerance = ZERO_SUM_TOLERANCE.max(total.abs() * 1e-12);
    if !sum.is_finite() || sum.abs() > tolerance {
        return Err(InvariantViolation::NonZeroSum { sum });
    }
    Ok(())
}
