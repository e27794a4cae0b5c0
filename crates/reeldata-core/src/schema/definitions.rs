// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seven entity definitions. Column names must match the storage DDL.

use strum::VariantNames;

use super::field::{DefaultValue as D, FieldDef as F, OnDelete, RelationDef as R, ScalarType as T};
use super::{Entity, EntitySchema};
use crate::models::{
    OtpPurpose, PaymentProvider, SubscriptionEventType, SubscriptionPlan, SubscriptionStatus,
    VideoStatus, VideoStyle,
};

const SUBSCRIPTION_STATUS: T = T::Enum {
    name: "SubscriptionStatus",
    variants: SubscriptionStatus::VARIANTS,
};
const SUBSCRIPTION_PLAN: T = T::Enum {
    name: "SubscriptionPlan",
    variants: SubscriptionPlan::VARIANTS,
};
const PAYMENT_PROVIDER: T = T::Enum {
    name: "PaymentProvider",
    variants: PaymentProvider::VARIANTS,
};
const SUBSCRIPTION_EVENT_TYPE: T = T::Enum {
    name: "SubscriptionEventType",
    variants: SubscriptionEventType::VARIANTS,
};
const OTP_PURPOSE: T = T::Enum {
    name: "OtpPurpose",
    variants: OtpPurpose::VARIANTS,
};
const VIDEO_STYLE: T = T::Enum {
    name: "VideoStyle",
    variants: VideoStyle::VARIANTS,
};
const VIDEO_STATUS: T = T::Enum {
    name: "VideoStatus",
    variants: VideoStatus::VARIANTS,
};

fn created_at() -> F {
    F::new("createdAt", "created_at", T::DateTime).default(D::Now)
}

fn updated_at() -> F {
    F::new("updatedAt", "updated_at", T::DateTime).updated_at()
}

pub(super) fn schema_for(entity: Entity) -> EntitySchema {
    match entity {
        Entity::User => EntitySchema {
            entity,
            table: "users",
            fields: vec![
                F::id(),
                F::new("email", "email", T::String).unique(),
                F::new("name", "name", T::String).optional(),
                F::new("avatarUrl", "avatar_url", T::String).optional(),
                F::new("subscriptionStatus", "subscription_status", SUBSCRIPTION_STATUS)
                    .default(D::Str("FREE")),
                F::new("isDeleted", "is_deleted", T::Boolean).default(D::Bool(false)),
                F::new("deletedAt", "deleted_at", T::DateTime).optional(),
                created_at(),
                updated_at(),
            ],
            relations: vec![
                R::has_many("otpCodes", entity, Entity::OtpCode, "userId"),
                R::has_many("sessions", entity, Entity::Session, "userId"),
                R::has_one("subscription", entity, Entity::Subscription, "userId"),
                R::has_many("videos", entity, Entity::Video, "userId"),
                R::has_many("analyticsEvents", entity, Entity::AnalyticsEvent, "userId"),
            ],
        },
        Entity::OtpCode => EntitySchema {
            entity,
            table: "otp_codes",
            fields: vec![
                F::id(),
                F::new("userId", "user_id", T::String),
                F::new("email", "email", T::String),
                F::new("code", "code", T::String),
                F::new("purpose", "purpose", OTP_PURPOSE),
                F::new("expiresAt", "expires_at", T::DateTime),
                F::new("attempts", "attempts", T::Int).default(D::Int(0)),
                F::new("isUsed", "is_used", T::Boolean).default(D::Bool(false)),
                F::new("usedAt", "used_at", T::DateTime).optional(),
                F::new("isValid", "is_valid", T::Boolean).default(D::Bool(true)),
                F::new("invalidatedAt", "invalidated_at", T::DateTime).optional(),
                F::new("invalidatedReason", "invalidated_reason", T::String).optional(),
                created_at(),
            ],
            relations: vec![R::belongs_to(
                "user",
                entity,
                Entity::User,
                "userId",
                OnDelete::Cascade,
            )],
        },
        Entity::Session => EntitySchema {
            entity,
            table: "sessions",
            fields: vec![
                F::id(),
                F::new("userId", "user_id", T::String),
                F::new("accessToken", "access_token", T::String).unique(),
                F::new("refreshToken", "refresh_token", T::String).unique(),
                F::new("accessTokenExpiresAt", "access_token_expires_at", T::DateTime),
                F::new("refreshTokenExpiresAt", "refresh_token_expires_at", T::DateTime),
                F::new("deviceId", "device_id", T::String),
                F::new("deviceName", "device_name", T::String).optional(),
                F::new("ipAddress", "ip_address", T::String).optional(),
                F::new("userAgent", "user_agent", T::String).optional(),
                F::new("isActive", "is_active", T::Boolean).default(D::Bool(true)),
                F::new("lastActivityAt", "last_activity_at", T::DateTime).default(D::Now),
                F::new("isRevoked", "is_revoked", T::Boolean).default(D::Bool(false)),
                F::new("revokedAt", "revoked_at", T::DateTime).optional(),
                F::new("revokedReason", "revoked_reason", T::String).optional(),
                created_at(),
                updated_at(),
            ],
            relations: vec![R::belongs_to(
                "user",
                entity,
                Entity::User,
                "userId",
                OnDelete::Cascade,
            )],
        },
        Entity::Subscription => EntitySchema {
            entity,
            table: "subscriptions",
            fields: vec![
                F::id(),
                F::new("userId", "user_id", T::String).unique(),
                F::new("status", "status", SUBSCRIPTION_STATUS).default(D::Str("FREE")),
                F::new("plan", "plan", SUBSCRIPTION_PLAN).default(D::Str("FREE")),
                F::new("provider", "provider", PAYMENT_PROVIDER).default(D::Str("MANUAL")),
                F::new("providerId", "provider_id", T::String)
                    .optional()
                    .unique(),
                F::new("currentPeriodStart", "current_period_start", T::DateTime)
                    .default(D::Now),
                F::new("currentPeriodEnd", "current_period_end", T::DateTime).optional(),
                F::new("cancelAtPeriodEnd", "cancel_at_period_end", T::Boolean)
                    .default(D::Bool(false)),
                F::new("canceledAt", "canceled_at", T::DateTime).optional(),
                F::new("trialStart", "trial_start", T::DateTime).optional(),
                F::new("trialEnd", "trial_end", T::DateTime).optional(),
                F::new("features", "features", T::Json),
                F::new("limits", "limits", T::Json),
                created_at(),
                updated_at(),
            ],
            relations: vec![
                R::belongs_to("user", entity, Entity::User, "userId", OnDelete::Cascade),
                R::has_many("history", entity, Entity::SubscriptionHistory, "subscriptionId"),
            ],
        },
        Entity::SubscriptionHistory => EntitySchema {
            entity,
            table: "subscription_history",
            fields: vec![
                F::id(),
                F::new("subscriptionId", "subscription_id", T::String),
                F::new("eventType", "event_type", SUBSCRIPTION_EVENT_TYPE),
                F::new("fromStatus", "from_status", SUBSCRIPTION_STATUS).optional(),
                F::new("toStatus", "to_status", SUBSCRIPTION_STATUS),
                F::new("fromPlan", "from_plan", SUBSCRIPTION_PLAN).optional(),
                F::new("toPlan", "to_plan", SUBSCRIPTION_PLAN),
                F::new("amount", "amount", T::Decimal).optional(),
                F::new("currency", "currency", T::String).optional(),
                F::new("metadata", "metadata", T::Json).optional(),
                created_at(),
            ],
            relations: vec![R::belongs_to(
                "subscription",
                entity,
                Entity::Subscription,
                "subscriptionId",
                OnDelete::Cascade,
            )],
        },
        Entity::Video => EntitySchema {
            entity,
            table: "videos",
            fields: vec![
                F::id(),
                F::new("userId", "user_id", T::String),
                F::new("prompt", "prompt", T::String),
                F::new("customScript", "custom_script", T::String).optional(),
                F::new("duration", "duration", T::Int),
                F::new("style", "style", VIDEO_STYLE),
                F::new("language", "language", T::String).default(D::Str("en")),
                F::new("audioLanguage", "audio_language", T::String).default(D::Str("en")),
                F::new("hasCaptions", "has_captions", T::Boolean).default(D::Bool(true)),
                F::new("status", "status", VIDEO_STATUS).default(D::Str("QUEUED")),
                F::new("errorMessage", "error_message", T::String).optional(),
                F::new("videoUrl", "video_url", T::String).optional(),
                F::new("thumbnailUrl", "thumbnail_url", T::String).optional(),
                F::new("captionUrl", "caption_url", T::String).optional(),
                F::new("tokensUsed", "tokens_used", T::Int).default(D::Int(0)),
                F::new("metadata", "metadata", T::Json).optional(),
                created_at(),
                updated_at(),
            ],
            relations: vec![R::belongs_to(
                "user",
                entity,
                Entity::User,
                "userId",
                OnDelete::Cascade,
            )],
        },
        Entity::AnalyticsEvent => EntitySchema {
            entity,
            table: "analytics_events",
            fields: vec![
                F::id(),
                F::new("userId", "user_id", T::String).optional(),
                F::new("eventName", "event_name", T::String),
                F::new("eventCategory", "event_category", T::String),
                F::new("properties", "properties", T::Json).optional(),
                F::new("sessionId", "session_id", T::String).optional(),
                F::new("deviceId", "device_id", T::String).optional(),
                F::new("platform", "platform", T::String).optional(),
                F::new("appVersion", "app_version", T::String).optional(),
                F::new("ipAddress", "ip_address", T::String).optional(),
                F::new("timestamp", "timestamp", T::DateTime).default(D::Now),
            ],
            relations: vec![R::belongs_to(
                "user",
                entity,
                Entity::User,
                "userId",
                OnDelete::SetNull,
            )],
        },
    }
}
