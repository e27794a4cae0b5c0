// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Create-data builders for each entity and a few seeding helpers.
//!
//! The `*_data` functions return the `data` object of a `create` with every
//! required field filled in; callers merge overrides with [`with`].

use chrono::{Duration, Utc};
use reeldata_core::query::CreateArgs;
use reeldata_core::{DataError, ShapedRecord};
use reeldata_storage::DataClient;
use serde_json::{json, Value as JsonValue};

/// Returns `base` with the keys of `overrides` replaced or added.
pub fn with(mut base: JsonValue, overrides: JsonValue) -> JsonValue {
    if let (Some(obj), JsonValue::Object(extra)) = (base.as_object_mut(), overrides) {
        obj.extend(extra);
    }
    base
}

/// A unique address for tests that create many users.
pub fn unique_email() -> String {
    format!("{}@test.reeldata", uuid::Uuid::new_v4().simple())
}

pub fn user_data(email: &str) -> JsonValue {
    json!({ "email": email })
}

pub fn otp_code_data(user_id: &str, email: &str) -> JsonValue {
    json!({
        "userId": user_id,
        "email": email,
        "code": "123456",
        "purpose": "LOGIN",
        "expiresAt": (Utc::now() + Duration::minutes(10)).to_rfc3339(),
    })
}

pub fn session_data(user_id: &str, token: &str) -> JsonValue {
    let now = Utc::now();
    json!({
        "userId": user_id,
        "accessToken": format!("access-{token}"),
        "refreshToken": format!("refresh-{token}"),
        "accessTokenExpiresAt": (now + Duration::hours(1)).to_rfc3339(),
        "refreshTokenExpiresAt": (now + Duration::days(30)).to_rfc3339(),
        "deviceId": "device-1",
    })
}

pub fn subscription_data(user_id: &str) -> JsonValue {
    json!({
        "userId": user_id,
        "status": "FREE",
        "plan": "FREE",
        "provider": "MANUAL",
        "features": {},
        "limits": {},
    })
}

pub fn history_data(subscription_id: &str, amount: JsonValue) -> JsonValue {
    json!({
        "subscriptionId": subscription_id,
        "eventType": "PAYMENT_SUCCEEDED",
        "fromStatus": "ACTIVE",
        "toStatus": "ACTIVE",
        "fromPlan": "PRO",
        "toPlan": "PRO",
        "amount": amount,
        "currency": "USD",
    })
}

pub fn video_data(user_id: &str, status: &str, duration: i64) -> JsonValue {
    json!({
        "userId": user_id,
        "prompt": format!("a {duration}s video"),
        "duration": duration,
        "style": "EXPLAINER",
        "status": status,
    })
}

pub fn analytics_event_data(user_id: Option<&str>, name: &str) -> JsonValue {
    json!({
        "userId": user_id,
        "eventName": name,
        "eventCategory": "app",
    })
}

/// Creates a user and returns its id.
pub async fn seed_user(client: &DataClient, email: &str) -> Result<String, DataError> {
    let user = client.user().create(CreateArgs::new(user_data(email))).await?;
    record_id(&user)
}

/// Creates a user with a FREE subscription; returns `(user_id, subscription_id)`.
pub async fn seed_subscriber(client: &DataClient, email: &str) -> Result<(String, String), DataError> {
    let user_id = seed_user(client, email).await?;
    let subscription = client
        .subscription()
        .create(CreateArgs::new(subscription_data(&user_id)))
        .await?;
    Ok((user_id, record_id(&subscription)?))
}

pub fn record_id(record: &ShapedRecord) -> Result<String, DataError> {
    record
        .id()
        .map(String::from)
        .ok_or_else(|| DataError::Internal("record was shaped without its id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_replaces_and_adds_keys() {
        let data = with(user_data("a@x.com"), json!({"email": "b@x.com", "name": "B"}));
        assert_eq!(data, json!({"email": "b@x.com", "name": "B"}));
    }

    #[test]
    fn unique_emails_differ() {
        assert_ne!(unique_email(), unique_email());
    }
}
