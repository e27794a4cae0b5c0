// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed views of the seven entities and the enums their fields use.
//!
//! The dispatcher works on untyped [`ShapedRecord`](crate::record::ShapedRecord)s;
//! these structs are what callers deserialize a fully selected record into via
//! [`ShapedRecord::into_model`](crate::record::ShapedRecord::into_model).
//! Enum variant names double as the allowed values in the schema registry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString, VariantNames};

/// Billing state of a user's subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Free,
    Active,
    Trialing,
    PastDue,
    Canceled,
    Expired,
}

/// Commercial plan tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    Free,
    Starter,
    Pro,
    Enterprise,
}

/// Who bills the subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Manual,
    Stripe,
    Apple,
    Google,
}

/// Audit event recorded in the subscription history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionEventType {
    Created,
    Upgraded,
    Downgraded,
    Renewed,
    Canceled,
    Reactivated,
    Expired,
    TrialStarted,
    TrialEnded,
    PaymentSucceeded,
    PaymentFailed,
}

/// What a one-time code is issued for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Login,
    Signup,
}

/// Visual style requested for a generated video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStyle {
    Cinematic,
    Animated,
    Documentary,
    Explainer,
    Social,
}

/// Rendering pipeline state of a video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpCode {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub attempts: i64,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub is_valid: bool,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub invalidated_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub device_id: String,
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub last_activity_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub status: SubscriptionStatus,
    pub plan: SubscriptionPlan,
    pub provider: PaymentProvider,
    pub provider_id: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub features: JsonValue,
    pub limits: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionHistory {
    pub id: String,
    pub subscription_id: String,
    pub event_type: SubscriptionEventType,
    pub from_status: Option<SubscriptionStatus>,
    pub to_status: SubscriptionStatus,
    pub from_plan: Option<SubscriptionPlan>,
    pub to_plan: SubscriptionPlan,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub custom_script: Option<String>,
    pub duration: i64,
    pub style: VideoStyle,
    pub language: String,
    pub audio_language: String,
    pub has_captions: bool,
    pub status: VideoStatus,
    pub error_message: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub caption_url: Option<String>,
    pub tokens_used: i64,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
    pub user_id: Option<String>,
    pub event_name: String,
    pub event_category: String,
    pub properties: Option<JsonValue>,
    pub session_id: Option<String>,
    pub device_id: Option<String>,
    pub platform: Option<String>,
    pub app_version: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enum_names_are_screaming_snake_case() {
        assert_eq!(SubscriptionStatus::PastDue.to_string(), "PAST_DUE");
        assert_eq!(
            SubscriptionEventType::from_str("PAYMENT_FAILED").unwrap(),
            SubscriptionEventType::PaymentFailed
        );
        assert_eq!(VideoStatus::VARIANTS, &["QUEUED", "PROCESSING", "COMPLETED", "FAILED"]);
    }

    #[test]
    fn enum_serde_matches_display() {
        let json = serde_json::to_string(&OtpPurpose::Signup).unwrap();
        assert_eq!(json, "\"SIGNUP\"");
        let parsed: PaymentProvider = serde_json::from_str("\"MANUAL\"").unwrap();
        assert_eq!(parsed, PaymentProvider::Manual);
    }
}
