use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

/// Rejections of settlement input. Always the caller's fault (400-class).
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ValidationError {
    #[error("Member {member} in expense {expense} is not part of the group")]
    UnknownParticipant { member: String, expense: String },
    #[error("Expense {expense} is not split among anyone")]
    EmptySplit { expense: String },
    #[error("Expense {expense} has negative amount {amount}")]
    NegativeAmount { expense: String, amount: f64 },
    #[error("Expense {expense} has a non-finite amount")]
    NonFiniteAmount { expense: String },
    #[error("Expense {expense} amount {amount} is too large")]
    AmountTooLarge { expense: String, amount: f64 },
    #[error("Member list is empty")]
    NoMembers,
    #[error("Member {0} is listed more than once")]
    DuplicateMember(String),
}

/// Internal consistency failures. These indicate a defect, not bad input.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum InvariantViolation {
    #[error("Balances do not net to zero (sum = {sum})")]
    NonZeroSum { sum: f64 },
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SettlementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl SettlementError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, SettlementError::Validation(_))
    }
}

#[derive(Error, Debug, Serialize)]
pub enum TripError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Trip {0} not found")]
    TripNotFound(String),
    #[error("User {0} is already a trip member")]
    AlreadyTripMember(String),
    #[error("User {0} is not a trip member")]
    NotTripMember(String),
    #[error("User {0} is not the trip owner")]
    NotTripOwner(String),
    #[error("Owner cannot remove themselves")]
    OwnerCannotRemoveSelf,
    #[error("User {0} still has expenses in this trip")]
    MemberHasExpenses(String),
    #[error("Expense {0} not found")]
    ExpenseNotFound(String),
    #[error("User {0} not allowed to modify expense {1}")]
    NotExpenseEditor(String, String),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl From<ValidationError> for TripError {
    fn from(err: ValidationError) -> Self {
        TripError::Settlement(SettlementError::Validation(err))
    }
}
