use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use common_types::{EventKind, NotificationRecord, PushSubscription};
use http_body_util::BodyExt;
use uuid::Uuid;

use super::fakes::FakePushSender;

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Subscription for `user_id` on a unique endpoint
pub fn create_subscription(user_id: &str) -> PushSubscription {
    PushSubscription {
        user_id: user_id.to_string(),
        endpoint: format!("https://push.example.com/send/{}", Uuid::new_v4().simple()),
        p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_string(),
        auth: "tBHItJI5svbpez7KI4CCXg".to_string(),
    }
}

/// Fixed point in time, offset by `seconds`
pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

/// Stored notification row with a deterministic timestamp
pub fn create_record(
    kind: EventKind,
    actor_id: Option<&str>,
    receiver_id: &str,
    card_id: Option<&str>,
    seconds: i64,
) -> NotificationRecord {
    NotificationRecord {
        created_at: at(seconds),
        ..NotificationRecord::new(
            kind,
            actor_id.map(ToString::to_string),
            receiver_id.to_string(),
            card_id.map(ToString::to_string),
        )
    }
}

/// Waits until the fake sender has seen `count` deliveries
pub async fn wait_for_sends(sender: &FakePushSender, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while sender.sent().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for push deliveries");
}
