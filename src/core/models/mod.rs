pub mod audit;
pub mod expense;
pub mod trip;
pub mod user;
