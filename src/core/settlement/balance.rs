use super::{Balances, Expense, MAX_AMOUNT, Member, round_cents};
use crate::core::errors::ValidationError;
use std::collections::BTreeSet;
use tracing::debug;

/// Checks one expense against the group. Used by the engine and by the
/// service before an expense is stored, so stored expenses stay settleable.
pub fn validate_expense(members: &BTreeSet<&str>, expense: &Expense) -> Result<(), ValidationError> {
    if !expense.amount.is_finite() {
        return Err(ValidationError::NonFiniteAmount {
            expense: expense.id.clone(),
        });
    }
    if expense.amount < 0.0 {
        return Err(ValidationError::NegativeAmount {
            expense: expense.id.clone(),
            amount: expense.amount,
        });
    }
    if expense.amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            expense: expense.id.clone(),
            amount: expense.amount,
        });
    }
    if expense.split_among.is_empty() {
        return Err(ValidationError::EmptySplit {
            expense: expense.id.clone(),
        });
    }

    let unknown = |member: &Member| ValidationError::UnknownParticipant {
        member: member.clone(),
        expense: expense.id.clone(),
    };
    if !members.contains(expense.payer.as_str()) {
        return Err(unknown(&expense.payer));
    }

    let mut seen = BTreeSet::new();
    for member in &expense.split_among {
        if !members.contains(member.as_str()) {
            return Err(unknown(member));
        }
        if !seen.insert(member.as_str()) {
            return Err(ValidationError::DuplicateMember(member.clone()));
        }
    }
    Ok(())
}

pub(crate) fn member_set(members: &[Member]) -> Result<BTreeSet<&str>, ValidationError> {
    if members.is_empty() {
        return Err(ValidationError::NoMembers);
    }
    let mut set = BTreeSet::new();
    for member in members {
        if !set.insert(member.as_str()) {
            return Err(ValidationError::DuplicateMember(member.clone()));
        }
    }
    Ok(set)
}

/// Folds `expenses` into a net balance per member.
///
/// Every expense is validated before anything is accumulated, so an error
/// never comes with partial balances. The payer is credited the full amount
/// and each split member is debited an equal share; a payer who is also in
/// the split gets both. Values are kept at full precision.
pub fn compute_balances(members: &[Member], expenses: &[Expense]) -> Result<Balances, ValidationError> {
    let known = member_set(members)?;
    for expense in expenses {
        validate_expense(&known, expense)?;
    }

    let mut balances: Balances = members.iter().map(|m| (m.clone(), 0.0)).collect();
    for expense in expenses {
        if let Some(paid) = balances.get_mut(&expense.payer) {
            *paid += expense.amount;
        }
        let share = expense.amount / expense.split_among.len() as f64;
        for member in &expense.split_among {
            if let Some(owed) = balances.get_mut(member) {
                *owed -= share;
            }
        }
    }

    debug!("Balances computed for {} members: {:?}", balances.len(), balances);
    Ok(balances)
}

/// Rounds every balance to two decimals, for display.
pub fn round_balances(balances: &Balances) -> Balances {
    balances.iter().map(|(m, b)| (m.clone(), round_cents(*b))).collect()
}
