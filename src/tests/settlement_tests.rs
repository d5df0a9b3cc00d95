use super::{create_test_service, register, trip_with};
use crate::core::errors::TripError;
use crate::core::models::expense::{ExpenseCategory, NewExpense};
use crate::core::settlement::{EPSILON, ExpenseSource, SettlementEngine, residual_balances};
use crate::infrastructure::storage::Storage;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

fn expense(amount: f64, paid_by: &str, split_among: &[&str]) -> NewExpense {
    NewExpense {
        description: "Shared".to_string(),
        amount,
        category: ExpenseCategory::Misc,
        paid_by: paid_by.to_string(),
        split_among: split_among.iter().map(|m| m.to_string()).collect(),
        notes: String::new(),
    }
}

#[tokio::test]
async fn test_settle_up_three_way_dinner() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;
    let (a, b, c) = (&users[0].id, &users[1].id, &users[2].id);
    service.add_expense(&trip.id, expense(90.0, a, &[a, b, c]), a).await.unwrap();

    let plan = service.settle_trip(&trip.id, b).await.unwrap();
    assert_eq!(plan.balances[a], 60.0);
    assert_eq!(plan.balances[b], -30.0);
    assert_eq!(plan.balances[c], -30.0);
    assert_eq!(plan.settlements.len(), 2);
    assert!(plan.settlements.iter().all(|s| s.to == *a && s.amount == 30.0));
}

#[tokio::test]
async fn test_settle_up_matches_engine_on_same_data() {
    let storage = InMemoryStorage::new();
    let service = crate::core::services::TripService::new(
        storage.clone(),
        crate::infrastructure::logging::in_memory::InMemoryLogging::new(),
        crate::auth::jwt::JwtService::new("test-secret".to_string(), 3600),
    );
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai", "Dev"]).await;
    let (a, b, c, d) = (&users[0].id, &users[1].id, &users[2].id, &users[3].id);
    service.add_expense(&trip.id, expense(100.0, a, &[a, b, c]), a).await.unwrap();
    service.add_expense(&trip.id, expense(47.5, b, &[b, c, d]), b).await.unwrap();
    service.add_expense(&trip.id, expense(12.34, d, &[a, d]), d).await.unwrap();

    let through_service = service.settle_trip(&trip.id, a).await.unwrap();
    let input = storage.settlement_input(&trip.id).await.unwrap();
    assert_eq!(input.expenses.len(), storage.get_trip_expenses(&trip.id).await.unwrap().len());
    let direct = SettlementEngine::new().settle(&input.members, &input.expenses).unwrap();
    assert_eq!(through_service, direct);

    let sum: f64 = through_service.balances.values().sum();
    assert!(sum.abs() < 1e-6);
    let residual = residual_balances(&through_service.balances, &through_service.settlements);
    assert!(residual.values().all(|r| r.abs() <= EPSILON));
}

#[tokio::test]
async fn test_settle_up_with_no_expenses() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let plan = service.settle_trip(&trip.id, &users[0].id).await.unwrap();
    assert!(plan.balances.values().all(|b| *b == 0.0));
    assert!(plan.settlements.is_empty());
}

#[tokio::test]
async fn test_settle_up_requires_membership() {
    let service = create_test_service();
    let (trip, _) = trip_with(&service, &["Ana", "Ben"]).await;
    let outsider = register(&service, "Cai").await;
    let result = service.settle_trip(&trip.id, &outsider.id).await;
    assert!(matches!(result, Err(TripError::NotTripMember(_))));
}

#[tokio::test]
async fn test_split_summary() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;
    let (a, b, c) = (&users[0].id, &users[1].id, &users[2].id);
    service.add_expense(&trip.id, expense(100.0, a, &[a, b, c]), a).await.unwrap();
    service.add_expense(&trip.id, expense(20.0, b, &[b, c]), b).await.unwrap();

    let summary = service.split_summary(&trip.id, c).await.unwrap();
    assert_eq!(summary.total_amount, 120.0);
    assert_eq!(summary.per_person, 40.0);
    assert_eq!(summary.member_count, 3);
    assert_eq!(summary.expense_count, 2);
    assert_eq!(summary.balances[a], 66.67);
    assert_eq!(summary.balances[b], -23.33);
    assert_eq!(summary.balances[c], -43.33);

    // the creditor's rounded cent gives way, debtors pay their own rounding
    let paid: f64 = summary.settlements.iter().map(|s| s.amount).sum();
    assert!((paid - 66.66).abs() < 1e-9);
    assert!(summary.settlements.iter().all(|s| s.to == *a));
    assert_eq!(summary.settlements[0].from, *c);
    assert_eq!(summary.settlements[0].amount, 43.33);
    assert_eq!(summary.settlements[1].amount, 23.33);
}

#[tokio::test]
async fn test_custom_engine_tolerance_is_used() {
    use crate::core::settlement::SettlementPlanner;

    let service = create_test_service()
        .with_engine(SettlementEngine::with_planner(SettlementPlanner::with_epsilon(1.0)));
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let (a, b) = (&users[0].id, &users[1].id);
    service.add_expense(&trip.id, expense(1.6, a, &[a, b]), a).await.unwrap();

    let plan = service.settle_trip(&trip.id, a).await.unwrap();
    assert!((plan.balances[a] - 0.8).abs() < 1e-9);
    assert!(plan.settlements.is_empty());
}
