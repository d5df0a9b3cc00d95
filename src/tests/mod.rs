mod expense_tests;
mod settlement_tests;
mod trip_tests;

use crate::auth::jwt::JwtService;
use crate::core::models::{trip::Trip, user::User};
use crate::core::services::TripService;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

pub type TestService = TripService<InMemoryLogging, InMemoryStorage>;

pub fn create_test_service() -> TestService {
    let storage = InMemoryStorage::new();
    let logging = InMemoryLogging::new();
    TripService::new(storage, logging, JwtService::new("test-secret".to_string(), 3600))
}

pub async fn register(service: &TestService, name: &str) -> User {
    service
        .register_user(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "password123".to_string(),
        )
        .await
        .unwrap()
}

/// Registers `names` and puts them all in one trip owned by the first.
pub async fn trip_with(service: &TestService, names: &[&str]) -> (Trip, Vec<User>) {
    let mut users = Vec::new();
    for name in names {
        users.push(register(service, name).await);
    }
    let member_ids = users[1..].iter().map(|u| u.id.clone()).collect();
    let trip = service
        .create_trip("Lisbon".to_string(), Some("Portugal".to_string()), member_ids, &users[0])
        .await
        .unwrap();
    (trip, users)
}
