use crate::core::errors::TripError;
use crate::core::models::{
    audit::TripAudit,
    expense::ExpenseRecord,
    trip::{Trip, TripMember},
    user::User,
};
use crate::core::settlement::{Expense, ExpenseSource, SettlementInput, validate_expense};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use bcrypt::hash;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Expenses kept per trip in insertion order; the position is what settlement
/// input order is based on.
///
/// Guards that are held together are always taken in the order trips,
/// expenses, expense_trips.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    users_by_email: Arc<RwLock<HashMap<String, String>>>,
    trips: Arc<RwLock<HashMap<String, Trip>>>,
    expenses: Arc<RwLock<HashMap<String, Vec<ExpenseRecord>>>>,
    expense_trips: Arc<RwLock<HashMap<String, String>>>,
    trip_audits: Arc<RwLock<HashMap<String, Vec<TripAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, TripError> {
        let mut users_by_email = self.users_by_email.write().await;
        if users_by_email.contains_key(&user.email) {
            return Ok(None);
        }
        let hashed_user = User {
            password: hash(&user.password, bcrypt::DEFAULT_COST)
                .map_err(|e| TripError::InternalServerError(format!("Password hashing error: {}", e)))?,
            ..user
        };
        users_by_email.insert(hashed_user.email.clone(), hashed_user.id.clone());
        let mut users = self.users.write().await;
        users.insert(hashed_user.id.clone(), hashed_user.clone());
        Ok(Some(hashed_user))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, TripError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, TripError> {
        let users_by_email = self.users_by_email.read().await;
        let users = self.users.read().await;
        Ok(users_by_email.get(email).and_then(|id| users.get(id).cloned()))
    }

    async fn save_trip(&self, trip: Trip) -> Result<(), TripError> {
        let mut trips = self.trips.write().await;
        trips.insert(trip.id.clone(), trip);
        Ok(())
    }

    async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, TripError> {
        let trips = self.trips.read().await;
        Ok(trips.get(trip_id).cloned())
    }

    async fn get_user_trips(&self, user_id: &str) -> Result<Vec<Trip>, TripError> {
        let trips = self.trips.read().await;
        let mut found: Vec<Trip> = trips.values().filter(|t| t.is_member(user_id)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn add_trip_member(&self, trip_id: &str, member: TripMember) -> Result<Trip, TripError> {
        let mut trips = self.trips.write().await;
        let trip = trips
            .get_mut(trip_id)
            .ok_or_else(|| TripError::TripNotFound(trip_id.to_string()))?;
        if trip.is_member(&member.user_id) {
            return Err(TripError::AlreadyTripMember(member.user_id));
        }
        trip.members.push(member);
        Ok(trip.clone())
    }

    async fn remove_trip_member(&self, trip_id: &str, user_id: &str) -> Result<Trip, TripError> {
        let mut trips = self.trips.write().await;
        let expenses = self.expenses.read().await;
        let trip = trips
            .get_mut(trip_id)
            .ok_or_else(|| TripError::TripNotFound(trip_id.to_string()))?;
        if !trip.is_member(user_id) {
            return Err(TripError::NotTripMember(user_id.to_string()));
        }
        let referenced = expenses.get(trip_id).is_some_and(|list| {
            list.iter()
                .any(|e| e.paid_by == user_id || e.split_among.iter().any(|m| m == user_id))
        });
        if referenced {
            return Err(TripError::MemberHasExpenses(user_id.to_string()));
        }
        trip.members.retain(|m| m.user_id != user_id);
        Ok(trip.clone())
    }

    async fn save_expense(&self, expense: ExpenseRecord) -> Result<(), TripError> {
        let trips = self.trips.read().await;
        let mut expenses = self.expenses.write().await;
        let mut expense_trips = self.expense_trips.write().await;
        let trip = trips
            .get(&expense.trip_id)
            .ok_or_else(|| TripError::TripNotFound(expense.trip_id.clone()))?;
        let members: BTreeSet<&str> = trip.members.iter().map(|m| m.user_id.as_str()).collect();
        validate_expense(&members, &Expense::from(&expense))?;

        let trip_expenses = expenses.entry(expense.trip_id.clone()).or_default();
        match trip_expenses.iter_mut().find(|e| e.id == expense.id) {
            Some(existing) => *existing = expense,
            None => {
                expense_trips.insert(expense.id.clone(), expense.trip_id.clone());
                trip_expenses.push(expense);
            }
        }
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<ExpenseRecord>, TripError> {
        let expenses = self.expenses.read().await;
        let expense_trips = self.expense_trips.read().await;
        Ok(expense_trips
            .get(expense_id)
            .and_then(|trip_id| expenses.get(trip_id))
            .and_then(|list| list.iter().find(|e| e.id == expense_id).cloned()))
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), TripError> {
        let mut expenses = self.expenses.write().await;
        let mut expense_trips = self.expense_trips.write().await;
        if let Some(trip_id) = expense_trips.remove(expense_id) {
            if let Some(list) = expenses.get_mut(&trip_id) {
                list.retain(|e| e.id != expense_id);
            }
        }
        Ok(())
    }

    async fn get_trip_expenses(&self, trip_id: &str) -> Result<Vec<ExpenseRecord>, TripError> {
        let expenses = self.expenses.read().await;
        Ok(expenses.get(trip_id).cloned().unwrap_or_default())
    }

    async fn save_trip_audit(&self, audit: TripAudit) -> Result<(), TripError> {
        let mut trip_audits = self.trip_audits.write().await;
        trip_audits.entry(audit.trip_id.clone()).or_default().push(audit);
        Ok(())
    }

    async fn get_trip_audits(&self, trip_id: &str) -> Result<Vec<TripAudit>, TripError> {
        let trip_audits = self.trip_audits.read().await;
        Ok(trip_audits.get(trip_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ExpenseSource for InMemoryStorage {
    /// Members and expenses are read under both guards at once so a
    /// concurrent write cannot slip between them.
    async fn settlement_input(&self, trip_id: &str) -> Result<SettlementInput, TripError> {
        let trips = self.trips.read().await;
        let expenses = self.expenses.read().await;
        let trip = trips
            .get(trip_id)
            .ok_or_else(|| TripError::TripNotFound(trip_id.to_string()))?;
        Ok(SettlementInput {
            members: trip.member_ids(),
            expenses: expenses
                .get(trip_id)
                .map(|list| list.iter().map(Expense::from).collect())
                .unwrap_or_default(),
        })
    }
}
