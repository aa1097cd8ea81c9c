mod common;

use common::*;
use common_types::EventKind;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

fn setup_with_user_data(deleter: Option<FakeAccountDeleter>) -> TestSetup {
    TestSetup::new(TestConfig {
        subscriptions: vec![
            create_subscription("alice"),
            create_subscription("alice"),
            create_subscription("bob"),
        ],
        records: vec![
            create_record(EventKind::Like, Some("bob"), "alice", Some("card-1"), 0),
            create_record(EventKind::Follow, Some("carol"), "alice", None, 10),
            create_record(EventKind::Follow, Some("alice"), "bob", None, 20),
        ],
        deleter,
        ..TestConfig::default()
    })
}

#[tokio::test]
async fn test_delete_account_removes_user_data_and_auth_user() {
    let setup = setup_with_user_data(Some(FakeAccountDeleter::new()));

    let response = setup
        .send_post_request("/api/delete-account", json!({ "userId": "alice" }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!({ "success": true }));
    assert_eq!(setup.deleter().deleted(), vec!["alice"]);

    let subscriptions = setup.subscriptions.all().await;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].user_id, "bob");

    let notifications = setup.notifications.all().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].receiver_id, "bob");
}

#[tokio::test]
async fn test_delete_account_accepts_delete_method() {
    let setup = setup_with_user_data(Some(FakeAccountDeleter::new()));

    let response = setup
        .send_delete_request("/api/delete-account", Some(json!({ "userId": "bob" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(setup.deleter().deleted(), vec!["bob"]);
}

#[tokio::test]
async fn test_delete_account_missing_user_id() {
    let setup = setup_with_user_data(Some(FakeAccountDeleter::new()));

    for payload in [json!({}), json!({ "userId": "" })] {
        let response = setup
            .send_post_request("/api/delete-account", payload)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "userId is required");
    }

    assert!(setup.deleter().deleted().is_empty());
    assert_eq!(setup.subscriptions.all().await.len(), 3);
}

#[tokio::test]
async fn test_delete_account_without_credentials_touches_nothing() {
    let setup = setup_with_user_data(None);

    let response = setup
        .send_post_request("/api/delete-account", json!({ "userId": "alice" }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_response_body(response).await;
    assert_eq!(body["code"], "account_deletion_not_configured");

    assert_eq!(setup.subscriptions.all().await.len(), 3);
    assert_eq!(setup.notifications.all().await.len(), 3);
}

#[tokio::test]
async fn test_delete_account_reports_auth_provider_status() {
    let setup = setup_with_user_data(Some(FakeAccountDeleter::rejecting(404)));

    let response = setup
        .send_post_request("/api/delete-account", json!({ "userId": "alice" }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_response_body(response).await;
    assert_eq!(body["code"], "account_deletion_failed");
    assert_eq!(body["statusCode"], 404);

    assert_eq!(setup.subscriptions.all().await.len(), 3);
    assert_eq!(setup.notifications.all().await.len(), 3);
}

#[tokio::test]
async fn test_delete_account_keeps_user_data_when_auth_provider_fails() {
    let setup = setup_with_user_data(Some(FakeAccountDeleter::rejecting(500)));

    let response = setup
        .send_post_request("/api/delete-account", json!({ "userId": "alice" }))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(setup.deleter().deleted().is_empty());

    let alice_subscriptions = setup
        .subscriptions
        .all()
        .await
        .into_iter()
        .filter(|s| s.user_id == "alice")
        .count();
    assert_eq!(alice_subscriptions, 2);

    let alice_notifications = setup
        .notifications
        .all()
        .await
        .into_iter()
        .filter(|n| n.receiver_id == "alice")
        .count();
    assert_eq!(alice_notifications, 2);
}
