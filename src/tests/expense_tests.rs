use super::{create_test_service, register, trip_with};
use crate::constants::{EXPENSE_ADDED, EXPENSE_DELETED, EXPENSE_UPDATED};
use crate::core::errors::{SettlementError, TripError, ValidationError};
use crate::core::models::expense::{ExpenseCategory, ExpensePatch, NewExpense};

fn expense(description: &str, amount: f64, paid_by: &str, split_among: &[&str]) -> NewExpense {
    NewExpense {
        description: description.to_string(),
        amount,
        category: ExpenseCategory::Food,
        paid_by: paid_by.to_string(),
        split_among: split_among.iter().map(|m| m.to_string()).collect(),
        notes: String::new(),
    }
}

#[tokio::test]
async fn test_add_expense() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let (ana, ben) = (&users[0].id, &users[1].id);

    let record = service
        .add_expense(&trip.id, expense("  Dinner ", 90.0, ana, &[ana, ben]), ben)
        .await
        .unwrap();
    assert_eq!(record.description, "Dinner");
    assert_eq!(record.created_by, *ben);
    assert_eq!(record.trip_id, trip.id);

    let audits = service.get_trip_audits(&trip.id, ana).await.unwrap();
    assert_eq!(audits.last().unwrap().action, EXPENSE_ADDED);
    assert_eq!(audits.last().unwrap().details["expense_id"], record.id);
}

#[tokio::test]
async fn test_add_expense_rejects_invalid_input() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let (ana, ben) = (&users[0].id, &users[1].id);

    let empty = service.add_expense(&trip.id, expense(" ", 10.0, ana, &[ana]), ana).await;
    assert!(matches!(empty, Err(TripError::InvalidInput(field, _)) if field == "description"));

    let too_long = service
        .add_expense(&trip.id, expense(&"x".repeat(256), 10.0, ana, &[ana]), ana)
        .await;
    assert!(matches!(too_long, Err(TripError::InvalidInput(field, _)) if field == "description"));

    for amount in [-5.0, f64::NAN, f64::INFINITY, 1_000_000.01] {
        let result = service.add_expense(&trip.id, expense("Taxi", amount, ana, &[ana]), ana).await;
        assert!(matches!(result, Err(TripError::InvalidInput(field, _)) if field == "amount"));
    }

    let free = service.add_expense(&trip.id, expense("Museum", 0.0, ana, &[ana, ben]), ana).await;
    assert!(free.is_ok());

    let outsider = service.add_expense(&trip.id, expense("Taxi", 10.0, ana, &[ana, "ghost"]), ana).await;
    assert!(matches!(
        outsider,
        Err(TripError::Settlement(SettlementError::Validation(ValidationError::UnknownParticipant { member, .. })))
            if member == "ghost"
    ));

    let bad_payer = service.add_expense(&trip.id, expense("Taxi", 10.0, "ghost", &[ana]), ana).await;
    assert!(matches!(
        bad_payer,
        Err(TripError::Settlement(SettlementError::Validation(ValidationError::UnknownParticipant { .. })))
    ));
}

#[tokio::test]
async fn test_add_expense_with_empty_split_is_rejected() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let ana = &users[0].id;

    let result = service.add_expense(&trip.id, expense("Hotel", 200.0, ana, &[]), ana).await;
    assert!(matches!(
        result,
        Err(TripError::Settlement(SettlementError::Validation(ValidationError::EmptySplit { .. })))
    ));
    assert!(service.list_expenses(&trip.id, ana).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_expense_requires_membership() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let outsider = register(&service, "Cai").await;
    let ana = &users[0].id;

    let result = service
        .add_expense(&trip.id, expense("Taxi", 10.0, ana, &[ana]), &outsider.id)
        .await;
    assert!(matches!(result, Err(TripError::NotTripMember(_))));
}

#[tokio::test]
async fn test_list_expenses_newest_first() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let (ana, ben) = (&users[0].id, &users[1].id);

    for name in ["first", "second", "third"] {
        service.add_expense(&trip.id, expense(name, 10.0, ana, &[ana, ben]), ana).await.unwrap();
    }
    let listed: Vec<String> = service
        .list_expenses(&trip.id, ben)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.description)
        .collect();
    assert_eq!(listed, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_update_expense_permissions_and_validation() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;
    let (ana, ben, cai) = (&users[0].id, &users[1].id, &users[2].id);
    let record = service
        .add_expense(&trip.id, expense("Dinner", 90.0, ben, &[ana, ben, cai]), ben)
        .await
        .unwrap();

    let denied = service
        .update_expense(&record.id, ExpensePatch { amount: Some(60.0), ..Default::default() }, cai)
        .await;
    assert!(matches!(denied, Err(TripError::NotExpenseEditor(..))));

    let by_creator = service
        .update_expense(&record.id, ExpensePatch { amount: Some(60.0), ..Default::default() }, ben)
        .await
        .unwrap();
    assert_eq!(by_creator.amount, 60.0);
    assert_eq!(by_creator.description, "Dinner");

    let by_owner = service
        .update_expense(
            &record.id,
            ExpensePatch {
                category: Some(ExpenseCategory::Transport),
                ..Default::default()
            },
            ana,
        )
        .await
        .unwrap();
    assert_eq!(by_owner.category, ExpenseCategory::Transport);
    assert_eq!(by_owner.amount, 60.0);

    let emptied = service
        .update_expense(
            &record.id,
            ExpensePatch {
                split_among: Some(vec![]),
                ..Default::default()
            },
            ana,
        )
        .await;
    assert!(matches!(
        emptied,
        Err(TripError::Settlement(SettlementError::Validation(ValidationError::EmptySplit { .. })))
    ));
    let stored = service.list_expenses(&trip.id, ana).await.unwrap();
    assert_eq!(stored[0].split_among.len(), 3);

    let audits = service.get_trip_audits(&trip.id, ana).await.unwrap();
    assert_eq!(audits.last().unwrap().action, EXPENSE_UPDATED);
}

#[tokio::test]
async fn test_delete_expense() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;
    let (ana, ben, cai) = (&users[0].id, &users[1].id, &users[2].id);
    let record = service
        .add_expense(&trip.id, expense("Dinner", 90.0, ben, &[ana, ben, cai]), ben)
        .await
        .unwrap();

    let denied = service.delete_expense(&record.id, cai).await;
    assert!(matches!(denied, Err(TripError::NotExpenseEditor(..))));

    service.delete_expense(&record.id, ana).await.unwrap();
    assert!(service.list_expenses(&trip.id, ana).await.unwrap().is_empty());
    let missing = service.delete_expense(&record.id, ana).await;
    assert!(matches!(missing, Err(TripError::ExpenseNotFound(_))));

    let audits = service.get_trip_audits(&trip.id, ana).await.unwrap();
    assert_eq!(audits.last().unwrap().action, EXPENSE_DELETED);
}

#[tokio::test]
async fn test_category_summary() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let (ana, ben) = (&users[0].id, &users[1].id);

    service.add_expense(&trip.id, expense("Lunch", 20.10, ana, &[ana, ben]), ana).await.unwrap();
    service.add_expense(&trip.id, expense("Dinner", 40.20, ben, &[ana, ben]), ben).await.unwrap();
    let mut taxi = expense("Taxi", 15.0, ana, &[ana, ben]);
    taxi.category = ExpenseCategory::Transport;
    service.add_expense(&trip.id, taxi, ana).await.unwrap();

    let summary = service.category_summary(&trip.id, ana).await.unwrap();
    assert_eq!(summary.len(), 2);
    let food = &summary[&ExpenseCategory::Food];
    assert_eq!(food.count, 2);
    assert_eq!(food.total, 60.3);
    assert_eq!(food.items[0].description, "Lunch");
    assert_eq!(summary[&ExpenseCategory::Transport].total, 15.0);
}
