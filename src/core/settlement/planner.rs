use super::{Balances, EPSILON, Member, Settlement};
use std::cmp::Ordering;
use tracing::debug;

/// Greedy largest-first netting of a balance map.
///
/// Not guaranteed to produce the fewest possible transfers, but deterministic:
/// ties are broken by member id, so the same balances always yield the same
/// plan.
#[derive(Clone, Copy, Debug)]
pub struct SettlementPlanner {
    epsilon: f64,
}

impl Default for SettlementPlanner {
    fn default() -> Self {
        SettlementPlanner { epsilon: EPSILON }
    }
}

struct Party<'a> {
    member: &'a Member,
    balance: f64,
    cents: i64,
}

impl SettlementPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        SettlementPlanner { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Emits debtor→creditor transfers that bring every balance within
    /// epsilon of zero. Members already within epsilon take no part.
    ///
    /// Order is decided on the raw balances: largest magnitude first, equal
    /// magnitudes by member id. At most `k - 1` transfers for `k` unsettled
    /// members. If the balances do not sum to zero the sweep stops once
    /// either side is exhausted and the remainder is left unsettled; see
    /// [`residual_balances`].
    pub fn plan(&self, balances: &Balances) -> Vec<Settlement> {
        let mut parties: Vec<Party> = balances
            .iter()
            .filter(|(_, b)| b.abs() > self.epsilon)
            .map(|(member, balance)| Party {
                member,
                balance: *balance,
                cents: (balance * 100.0).round() as i64,
            })
            .collect();
        parties.sort_by(largest_first);
        let target = balances.values().map(|b| b * 100.0).sum::<f64>().round() as i64;
        absorb_rounding(&mut parties, target);

        let (mut creditors, mut debtors): (Vec<Party>, Vec<Party>) = parties
            .into_iter()
            .filter(|p| p.cents != 0)
            .partition(|p| p.balance > 0.0);
        for party in creditors.iter_mut().chain(debtors.iter_mut()) {
            party.cents = party.cents.saturating_abs();
        }

        let mut settlements = Vec::new();
        let mut next_creditor = 0;
        for debtor in debtors.iter_mut() {
            while debtor.cents > 0 && next_creditor < creditors.len() {
                let creditor = &mut creditors[next_creditor];
                let transfer = debtor.cents.min(creditor.cents);
                settlements.push(Settlement {
                    from: debtor.member.clone(),
                    to: creditor.member.clone(),
                    amount: transfer as f64 / 100.0,
                });
                debtor.cents -= transfer;
                creditor.cents -= transfer;
                if creditor.cents == 0 {
                    next_creditor += 1;
                }
            }
        }

        debug!("Planned {} settlements: {:?}", settlements.len(), settlements);
        settlements
    }
}

fn largest_first(a: &Party, b: &Party) -> Ordering {
    b.balance
        .abs()
        .total_cmp(&a.balance.abs())
        .then_with(|| a.member.cmp(b.member))
}

/// Each party starts at its nearest cent. When those cents miss `target`,
/// the rounded total of every balance including the settled ones, the
/// difference is moved one cent at a time. Parties rounded in the excess
/// direction give first, so they end within a cent of their raw balance.
/// Among those the side holding the excess goes first (creditors for surplus
/// credit, debtors for surplus debt), then the largest rounding drift, then
/// the planning order. Each party moves at most once.
fn absorb_rounding(parties: &mut [Party], target: i64) {
    let rounded = parties.iter().fold(0i64, |acc, p| acc.saturating_add(p.cents));
    let excess = rounded.saturating_sub(target);
    if excess == 0 {
        return;
    }
    let direction = excess.signum();

    let mut order: Vec<(usize, bool, bool, i64)> = parties
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            // quantized so float noise in the drift does not decide ties
            let drift = ((p.cents as f64 - p.balance * 100.0) * direction as f64 * 1e6).round() as i64;
            let holds_excess = (p.balance > 0.0) == (direction > 0);
            (idx, drift > 0, holds_excess, drift)
        })
        .collect();
    order.sort_by(|(ia, ra, ha, da), (ib, rb, hb, db)| {
        rb.cmp(ra).then(hb.cmp(ha)).then(db.cmp(da)).then(ia.cmp(ib))
    });

    for (idx, _, _, _) in order.into_iter().take(excess.unsigned_abs() as usize) {
        parties[idx].cents = parties[idx].cents.saturating_sub(direction);
    }
}

/// Applies `settlements` to `balances` and returns what is left. Entries
/// outside epsilon after a plan mean the input did not sum to zero.
pub fn residual_balances(balances: &Balances, settlements: &[Settlement]) -> Balances {
    let mut residual = balances.clone();
    for s in settlements {
        *residual.entry(s.from.clone()).or_insert(0.0) += s.amount;
        *residual.entry(s.to.clone()).or_insert(0.0) -= s.amount;
    }
    residual
}
