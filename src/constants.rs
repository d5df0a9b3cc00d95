// Action names recorded in app logs and trip audits.
pub const USER_REGISTERED: &str = "USER_REGISTERED";
pub const TRIP_CREATED: &str = "TRIP_CREATED";
pub const MEMBER_ADDED: &str = "MEMBER_ADDED";
pub const MEMBER_REMOVED: &str = "MEMBER_REMOVED";
pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const SETTLEMENT_QUERIED: &str = "SETTLEMENT_QUERIED";
pub const SPLIT_SUMMARY_QUERIED: &str = "SPLIT_SUMMARY_QUERIED";

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const MAX_NOTES_LENGTH: usize = 1000;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_EXPENSE_AMOUNT: f64 = 1_000_000.0;
