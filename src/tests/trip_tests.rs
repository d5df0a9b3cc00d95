use super::{create_test_service, register, trip_with};
use crate::constants::{MEMBER_ADDED, MEMBER_REMOVED, TRIP_CREATED};
use crate::core::errors::TripError;
use crate::core::models::expense::NewExpense;
use crate::core::models::trip::Role;
use std::sync::Arc;

#[tokio::test]
async fn test_create_trip_makes_creator_owner() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;
    let ben = register(&service, "Ben").await;

    let trip = service
        .create_trip(
            "Lisbon".to_string(),
            None,
            vec![ben.id.clone(), ben.id.clone(), ana.id.clone()],
            &ana,
        )
        .await
        .unwrap();

    assert_eq!(trip.members.len(), 2);
    assert_eq!(trip.members[0].user_id, ana.id);
    assert_eq!(trip.members[0].role, Role::Owner);
    assert_eq!(trip.members[1].role, Role::Traveler);
    assert!(trip.is_owner(&ana.id));
    assert!(!trip.is_owner(&ben.id));

    let audits = service.get_trip_audits(&trip.id, &ana.id).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, TRIP_CREATED);
}

#[tokio::test]
async fn test_create_trip_with_unknown_member() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;
    let result = service
        .create_trip("Lisbon".to_string(), None, vec!["ghost".to_string()], &ana)
        .await;
    assert!(matches!(result, Err(TripError::UserNotFound(id)) if id == "ghost"));
}

#[tokio::test]
async fn test_trip_visible_to_members_only() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let outsider = register(&service, "Cai").await;

    assert_eq!(service.get_trip(&trip.id, &users[1].id).await.unwrap().id, trip.id);
    let result = service.get_trip(&trip.id, &outsider.id).await;
    assert!(matches!(result, Err(TripError::NotTripMember(_))));
    let missing = service.get_trip("missing", &users[0].id).await;
    assert!(matches!(missing, Err(TripError::TripNotFound(_))));

    assert_eq!(service.list_user_trips(&users[1].id).await.unwrap().len(), 1);
    assert!(service.list_user_trips(&outsider.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_member_owner_only() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben"]).await;
    let cai = register(&service, "Cai").await;

    let denied = service.add_trip_member(&trip.id, &cai.id, &users[1].id).await;
    assert!(matches!(denied, Err(TripError::NotTripOwner(_))));

    let updated = service.add_trip_member(&trip.id, &cai.id, &users[0].id).await.unwrap();
    assert!(updated.is_member(&cai.id));

    let again = service.add_trip_member(&trip.id, &cai.id, &users[0].id).await;
    assert!(matches!(again, Err(TripError::AlreadyTripMember(_))));

    let audits = service.get_trip_audits(&trip.id, &cai.id).await.unwrap();
    assert_eq!(audits.last().unwrap().action, MEMBER_ADDED);
}

#[tokio::test]
async fn test_remove_member() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;

    let self_removal = service.remove_trip_member(&trip.id, &users[0].id, &users[0].id).await;
    assert!(matches!(self_removal, Err(TripError::OwnerCannotRemoveSelf)));

    let by_traveler = service.remove_trip_member(&trip.id, &users[2].id, &users[1].id).await;
    assert!(matches!(by_traveler, Err(TripError::NotTripOwner(_))));

    let updated = service.remove_trip_member(&trip.id, &users[2].id, &users[0].id).await.unwrap();
    assert!(!updated.is_member(&users[2].id));
    assert_eq!(updated.members.len(), 2);

    let audits = service.get_trip_audits(&trip.id, &users[0].id).await.unwrap();
    assert_eq!(audits.last().unwrap().action, MEMBER_REMOVED);
}

#[tokio::test]
async fn test_remove_member_with_expenses_is_refused() {
    let service = create_test_service();
    let (trip, users) = trip_with(&service, &["Ana", "Ben", "Cai"]).await;
    service
        .add_expense(
            &trip.id,
            NewExpense {
                description: "Taxi".to_string(),
                amount: 30.0,
                category: Default::default(),
                paid_by: users[0].id.clone(),
                split_among: vec![users[0].id.clone(), users[2].id.clone()],
                notes: String::new(),
            },
            &users[0].id,
        )
        .await
        .unwrap();

    let result = service.remove_trip_member(&trip.id, &users[2].id, &users[0].id).await;
    assert!(matches!(result, Err(TripError::MemberHasExpenses(id)) if id == users[2].id));

    // not referenced by any expense
    service.remove_trip_member(&trip.id, &users[1].id, &users[0].id).await.unwrap();
    service.settle_trip(&trip.id, &users[0].id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_member_additions_are_all_kept() {
    let service = Arc::new(create_test_service());
    let (trip, users) = trip_with(&service, &["Ana"]).await;
    let mut newcomers = Vec::new();
    for name in ["Ben", "Cai", "Dev", "Eli"] {
        newcomers.push(register(&service, name).await);
    }

    let handles: Vec<_> = newcomers
        .iter()
        .map(|user| {
            let service = Arc::clone(&service);
            let (trip_id, user_id, owner_id) = (trip.id.clone(), user.id.clone(), users[0].id.clone());
            tokio::spawn(async move { service.add_trip_member(&trip_id, &user_id, &owner_id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = service.get_trip(&trip.id, &users[0].id).await.unwrap();
    assert_eq!(stored.members.len(), 5);
    assert!(newcomers.iter().all(|u| stored.is_member(&u.id)));
}
