mod common;

use std::time::Duration;

use backend_storage::memory::InMemoryDirectory;
use common::*;
use common_types::EventKind;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

fn feed_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_profile("ana", "ana")
        .with_profile("ben", "ben")
        .with_profile("cy", "cy")
        .with_card("card-1", "Rust in 30 days")
}

#[tokio::test]
async fn test_list_notifications_groups_and_counts() {
    let setup = TestSetup::new(TestConfig {
        records: vec![
            create_record(EventKind::Like, Some("ana"), "me", Some("card-1"), 10),
            create_record(EventKind::Like, Some("ben"), "me", Some("card-1"), 20),
            create_record(EventKind::Like, Some("ana"), "me", Some("card-1"), 5),
            create_record(EventKind::Follow, Some("cy"), "me", None, 30),
            create_record(EventKind::Follow, Some("ghost"), "me", None, 1),
            create_record(EventKind::Follow, Some("ana"), "someone-else", None, 40),
        ],
        directory: feed_directory(),
        ..TestConfig::default()
    });

    let response = setup.send_get_request("/api/notifications/me").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["unreadCount"], 5);

    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);

    assert_eq!(groups[0]["key"], "follow");
    assert_eq!(groups[0]["text"], "cy and 1 other started following you");
    assert_eq!(groups[0]["actors"][1], json!({ "id": "ghost" }));

    assert_eq!(groups[1]["key"], "like::card-1");
    assert_eq!(groups[1]["cardTitle"], "Rust in 30 days");
    assert_eq!(groups[1]["eventIds"].as_array().unwrap().len(), 3);
    assert_eq!(
        groups[1]["text"],
        "ben and 1 other liked your roadmap \"Rust in 30 days\""
    );
    assert_eq!(groups[1]["isRead"], false);
}

#[tokio::test]
async fn test_list_notifications_empty() {
    let setup = TestSetup::empty();

    let response = setup.send_get_request("/api/notifications/me").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        parse_response_body(response).await,
        json!({ "groups": [], "unreadCount": 0 })
    );
}

#[tokio::test]
async fn test_record_event_stores_row_and_pushes_receiver() {
    let subscription = create_subscription("me");
    let setup = TestSetup::new(TestConfig {
        subscriptions: vec![subscription.clone()],
        directory: feed_directory(),
        ..TestConfig::default()
    });

    let response = setup
        .send_post_request(
            "/api/notifications",
            json!({
                "type": "comment",
                "actorId": "ana",
                "receiverId": "me",
                "cardId": "card-1"
            }),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["type"], "comment");
    assert_eq!(body["is_read"], false);

    let stored = setup.notifications.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, EventKind::Comment);
    assert_eq!(stored[0].actor_id.as_deref(), Some("ana"));

    wait_for_sends(setup.sender(), 1).await;
    let (endpoint, payload) = &setup.sender().sent()[0];
    assert_eq!(endpoint, &subscription.endpoint);
    assert_eq!(payload.title, "New comment");
    assert_eq!(payload.body, "ana commented on your roadmap \"Rust in 30 days\"");
    assert_eq!(payload.url, "/notifications");
}

#[tokio::test]
async fn test_record_event_for_own_action_does_not_push() {
    let setup = TestSetup::new(TestConfig {
        subscriptions: vec![create_subscription("me")],
        ..TestConfig::default()
    });

    let response = setup
        .send_post_request(
            "/api/notifications",
            json!({ "type": "like", "actorId": "me", "receiverId": "me", "cardId": "card-1" }),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(setup.notifications.all().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(setup.sender().sent().is_empty());
}

#[tokio::test]
async fn test_record_event_succeeds_without_push_configured() {
    let setup = TestSetup::new(TestConfig {
        subscriptions: vec![create_subscription("me")],
        sender: None,
        ..TestConfig::default()
    });

    let response = setup
        .send_post_request(
            "/api/notifications",
            json!({ "type": "follow", "actorId": "ana", "receiverId": "me" }),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(setup.notifications.all().await.len(), 1);
}

#[tokio::test]
async fn test_record_event_keeps_unknown_kinds() {
    let setup = TestSetup::empty();

    let response = setup
        .send_post_request(
            "/api/notifications",
            json!({ "type": "streak", "receiverId": "me" }),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = setup.notifications.all().await;
    assert_eq!(stored[0].kind, EventKind::Unknown("streak".to_string()));
}

#[tokio::test]
async fn test_record_event_requires_receiver() {
    let setup = TestSetup::empty();

    let response = setup
        .send_post_request(
            "/api/notifications",
            json!({ "type": "like", "actorId": "ana", "receiverId": "" }),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(setup.notifications.all().await.is_empty());
}

#[tokio::test]
async fn test_mark_read_selected_and_all() {
    let first = create_record(EventKind::Like, Some("ana"), "me", Some("card-1"), 0);
    let second = create_record(EventKind::Follow, Some("ben"), "me", None, 10);
    let third = create_record(EventKind::Comment, Some("cy"), "me", Some("card-1"), 20);
    let setup = TestSetup::new(TestConfig {
        records: vec![first.clone(), second, third],
        ..TestConfig::default()
    });

    let response = setup
        .send_post_request(
            "/api/notifications/me/read",
            json!({ "ids": [first.id, "unknown-id"] }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!({ "updated": 1 }));

    let response = setup
        .send_post_request("/api/notifications/me/read", json!({}))
        .await
        .unwrap();
    assert_eq!(parse_response_body(response).await, json!({ "updated": 2 }));

    let response = setup.send_get_request("/api/notifications/me").await.unwrap();
    let feed = parse_response_body(response).await;
    assert_eq!(feed["unreadCount"], 0);
}

#[tokio::test]
async fn test_delete_single_notification() {
    let record = create_record(EventKind::Like, Some("ana"), "me", Some("card-1"), 0);
    let setup = TestSetup::new(TestConfig {
        records: vec![record.clone()],
        ..TestConfig::default()
    });

    let response = setup
        .send_delete_request(&format!("/api/notifications/someone-else/{}", record.id), None)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["code"], "not_found");

    let response = setup
        .send_delete_request(&format!("/api/notifications/me/{}", record.id), None)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(setup.notifications.all().await.is_empty());
}

#[tokio::test]
async fn test_clear_notifications() {
    let setup = TestSetup::new(TestConfig {
        records: vec![
            create_record(EventKind::Like, Some("ana"), "me", Some("card-1"), 0),
            create_record(EventKind::Follow, Some("ben"), "me", None, 10),
            create_record(EventKind::Follow, Some("me"), "ben", None, 20),
        ],
        ..TestConfig::default()
    });

    let response = setup
        .send_delete_request("/api/notifications/me", None)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!({ "deleted": 2 }));
    assert_eq!(setup.notifications.all().await.len(), 1);
}
