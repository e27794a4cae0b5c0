// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-model invariants checked on every row before it is written.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::DataError;
use crate::record::Record;
use crate::schema::Entity;
use crate::value::Value;

/// Whether the row is being inserted or rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

/// Checks the post-write `row` of `entity`.
pub fn check(entity: Entity, row: &Record, kind: WriteKind, now: DateTime<Utc>) -> Result<(), DataError> {
    let violated = |rule: &str| {
        Err(DataError::InvariantViolation {
            entity: entity.to_string(),
            rule: rule.to_string(),
        })
    };
    let flag = |field: &str| row.get(field).as_bool().unwrap_or(false);
    let set = |field: &str| !row.get(field).is_null();

    match entity {
        Entity::User => {
            if flag("isDeleted") && !set("deletedAt") {
                return violated("isDeleted requires deletedAt");
            }
        }
        Entity::OtpCode => {
            if row.get("attempts").as_i64().is_some_and(|a| a < 0) {
                return violated("attempts must not be negative");
            }
            if flag("isUsed") && !set("usedAt") {
                return violated("isUsed requires usedAt");
            }
            if kind == WriteKind::Create
                && row.get("expiresAt").as_datetime().is_some_and(|at| at <= now)
            {
                return violated("expiresAt must be in the future when the code is created");
            }
        }
        Entity::Session => {
            if flag("isRevoked") && !set("revokedAt") {
                return violated("isRevoked requires revokedAt");
            }
        }
        Entity::Subscription => {
            for field in ["features", "limits"] {
                if matches!(row.get(field), Value::Null | Value::Json(JsonValue::Null)) {
                    return violated(&format!("{field} must be a JSON value, not null"));
                }
            }
        }
        Entity::SubscriptionHistory => {
            let initial = row.get("eventType").as_str() == Some("CREATED");
            if !initial && (!set("fromStatus") || !set("fromPlan")) {
                return violated("fromStatus and fromPlan may only be null for the CREATED event");
            }
        }
        Entity::Video => {
            let status = row.get("status").as_str().unwrap_or_default();
            if set("errorMessage") && status != "FAILED" {
                return violated("errorMessage is only set when status is FAILED");
            }
            if ["videoUrl", "thumbnailUrl", "captionUrl"].into_iter().any(set) && status != "COMPLETED" {
                return violated("output urls are only set when status is COMPLETED");
            }
            if row.get("tokensUsed").as_i64().is_some_and(|t| t < 0) {
                return violated("tokensUsed must not be negative");
            }
        }
        Entity::AnalyticsEvent => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::tests::record;
    use crate::value::now_millis;
    use chrono::Duration;
    use serde_json::json;

    fn is_violation(result: Result<(), DataError>) -> bool {
        matches!(result, Err(DataError::InvariantViolation { .. }))
    }

    #[test]
    fn soft_deleted_user_needs_timestamp() {
        let now = now_millis();
        let row = record(&[("isDeleted", Value::Boolean(true))]);
        assert!(is_violation(check(Entity::User, &row, WriteKind::Update, now)));
        let row = record(&[("isDeleted", Value::Boolean(true)), ("deletedAt", Value::DateTime(now))]);
        assert!(check(Entity::User, &row, WriteKind::Update, now).is_ok());
    }

    #[test]
    fn otp_expiry_checked_only_on_create() {
        let now = now_millis();
        let row = record(&[
            ("attempts", Value::Int(0)),
            ("expiresAt", Value::DateTime(now - Duration::minutes(1))),
        ]);
        assert!(is_violation(check(Entity::OtpCode, &row, WriteKind::Create, now)));
        assert!(check(Entity::OtpCode, &row, WriteKind::Update, now).is_ok());
    }

    #[test]
    fn subscription_json_must_not_be_null() {
        let now = now_millis();
        let row = record(&[("features", Value::Json(JsonValue::Null)), ("limits", Value::Json(json!({})))]);
        assert!(is_violation(check(Entity::Subscription, &row, WriteKind::Create, now)));
    }

    #[test]
    fn history_from_fields_only_null_for_created() {
        let now = now_millis();
        let created = record(&[("eventType", Value::Enum("CREATED".into()))]);
        assert!(check(Entity::SubscriptionHistory, &created, WriteKind::Create, now).is_ok());
        let upgraded = record(&[("eventType", Value::Enum("UPGRADED".into()))]);
        assert!(is_violation(check(Entity::SubscriptionHistory, &upgraded, WriteKind::Create, now)));
    }

    #[test]
    fn video_outputs_follow_status() {
        let now = now_millis();
        let failed_msg = record(&[
            ("status", Value::Enum("QUEUED".into())),
            ("errorMessage", Value::String("boom".into())),
        ]);
        assert!(is_violation(check(Entity::Video, &failed_msg, WriteKind::Update, now)));
        let early_url = record(&[
            ("status", Value::Enum("PROCESSING".into())),
            ("videoUrl", Value::String("https://cdn/v.mp4".into())),
        ]);
        assert!(is_violation(check(Entity::Video, &early_url, WriteKind::Update, now)));
        let done = record(&[
            ("status", Value::Enum("COMPLETED".into())),
            ("videoUrl", Value::String("https://cdn/v.mp4".into())),
            ("tokensUsed", Value::Int(12)),
        ]);
        assert!(check(Entity::Video, &done, WriteKind::Update, now).is_ok());
    }
}
