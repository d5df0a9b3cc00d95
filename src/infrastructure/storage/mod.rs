use crate::core::errors::TripError;
use crate::core::models::{
    audit::TripAudit,
    expense::ExpenseRecord,
    trip::{Trip, TripMember},
    user::User,
};
use crate::core::settlement::ExpenseSource;
use async_trait::async_trait;

#[async_trait]
pub trait Storage: ExpenseSource + Send + Sync {
    /// Hashes the password and stores the user. Returns `None` without
    /// writing when the email is already taken.
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, TripError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, TripError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, TripError>;
    async fn save_trip(&self, trip: Trip) -> Result<(), TripError>;
    async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, TripError>;
    async fn get_user_trips(&self, user_id: &str) -> Result<Vec<Trip>, TripError>;
    /// Appends `member` unless the user is already in the trip. The check and
    /// the write happen as one step.
    async fn add_trip_member(&self, trip_id: &str, member: TripMember) -> Result<Trip, TripError>;
    /// Removes the user unless an expense of the trip still names them as
    /// payer or split member. The check and the write happen as one step.
    async fn remove_trip_member(&self, trip_id: &str, user_id: &str) -> Result<Trip, TripError>;
    /// Inserts or replaces the expense. Payer and split members are checked
    /// against the trip's current members in the same step, so a stored
    /// expense never names someone who has left.
    async fn save_expense(&self, expense: ExpenseRecord) -> Result<(), TripError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<ExpenseRecord>, TripError>;
    async fn delete_expense(&self, expense_id: &str) -> Result<(), TripError>;
    /// Expenses of a trip in the order they were first saved.
    async fn get_trip_expenses(&self, trip_id: &str) -> Result<Vec<ExpenseRecord>, TripError>;
    async fn save_trip_audit(&self, audit: TripAudit) -> Result<(), TripError>;
    async fn get_trip_audits(&self, trip_id: &str) -> Result<Vec<TripAudit>, TripError>;
}

pub mod in_memory;
