// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests against a temp SQLite database.

use std::str::FromStr;

use reeldata_core::query::{
    AggregateArgs, AggregateFn, Args, CountArgs, CreateArgs, CreateManyArgs, DeleteArgs, DeleteManyArgs,
    FindManyArgs, FindUniqueArgs, GroupByArgs, UpdateArgs, UpdateManyArgs, UpsertArgs,
};
use reeldata_core::{any_null, db_null, json_null, DataError, ErrorKind, Value};
use reeldata_test_utils::fixtures::{
    analytics_event_data, history_data, record_id, seed_subscriber, seed_user, session_data,
    subscription_data, unique_email, user_data, video_data, with,
};
use reeldata_test_utils::TestHarness;
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

async fn harness() -> TestHarness {
    TestHarness::new().await.expect("harness should build")
}

fn args<T: Args>(value: JsonValue) -> T {
    T::from_json(value).expect("valid arguments")
}

// --- Unique keys ---

#[tokio::test]
async fn create_then_find_unique_on_every_unique_field() {
    let h = harness().await;
    let client = &h.client;

    let user = client.user().create(CreateArgs::new(user_data("a@x.com"))).await.unwrap();
    let found = client
        .user()
        .find_unique(FindUniqueArgs::new(json!({"email": "a@x.com"})))
        .await
        .unwrap();
    assert_eq!(found.as_ref(), Some(&user));
    let user_id = record_id(&user).unwrap();

    let session = client
        .session()
        .create(CreateArgs::new(session_data(&user_id, "t1")))
        .await
        .unwrap();
    for key in [json!({"accessToken": "access-t1"}), json!({"refreshToken": "refresh-t1"})] {
        let found = client.session().find_unique(FindUniqueArgs::new(key)).await.unwrap();
        assert_eq!(found.as_ref(), Some(&session));
    }

    let subscription = client
        .subscription()
        .create(CreateArgs::new(with(subscription_data(&user_id), json!({"providerId": "cus_1"}))))
        .await
        .unwrap();
    for key in [json!({"userId": user_id}), json!({"providerId": "cus_1"})] {
        let found = client
            .subscription()
            .find_unique_or_throw(FindUniqueArgs::new(key))
            .await
            .unwrap();
        assert_eq!(found, subscription);
    }
}

#[tokio::test]
async fn second_create_with_same_unique_value_fails() {
    let h = harness().await;
    let client = &h.client;
    let user_id = seed_user(client, "dup@x.com").await.unwrap();

    let err = client.user().create(CreateArgs::new(user_data("dup@x.com"))).await.unwrap_err();
    match err {
        DataError::UniqueConstraintViolation { entity, fields } => {
            assert_eq!(entity, "User");
            assert_eq!(fields, ["email"]);
        }
        other => panic!("expected UniqueConstraintViolation, got {other:?}"),
    }

    client
        .session()
        .create(CreateArgs::new(session_data(&user_id, "same")))
        .await
        .unwrap();
    let err = client
        .session()
        .create(CreateArgs::new(with(
            session_data(&user_id, "other"),
            json!({"accessToken": "access-same"}),
        )))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DataError::UniqueConstraintViolation { fields, .. } if fields == &["accessToken"]),
        "got: {err:?}"
    );

    client
        .subscription()
        .create(CreateArgs::new(subscription_data(&user_id)))
        .await
        .unwrap();
    let err = client
        .subscription()
        .create(CreateArgs::new(subscription_data(&user_id)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
}

#[tokio::test]
async fn null_provider_ids_do_not_collide() {
    let h = harness().await;
    for email in ["p1@x.com", "p2@x.com"] {
        seed_subscriber(&h.client, email).await.unwrap();
    }
    let count = h
        .client
        .subscription()
        .count(CountArgs::filter(json!({"providerId": null})))
        .await
        .unwrap();
    assert_eq!(count.total(), Some(2));
}

#[tokio::test]
async fn create_many_skips_or_rejects_duplicates() {
    let h = harness().await;
    let users = h.client.user();
    let rows = json!([user_data("m1@x.com"), user_data("m2@x.com"), user_data("m1@x.com")]);

    let batch = users
        .create_many(CreateManyArgs::new(rows).skip_duplicates())
        .await
        .unwrap();
    assert_eq!(batch.count, 2);

    let err = users
        .create_many(CreateManyArgs::new(json!([user_data("m3@x.com"), user_data("m2@x.com")])))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
    assert_eq!(users.count(CountArgs::default()).await.unwrap().total(), Some(2));

    let last = users
        .find_first(FindManyArgs::default().order_by(json!({"email": "desc"})))
        .await
        .unwrap()
        .expect("two users exist");
    assert_eq!(last.get("email").and_then(Value::as_str), Some("m2@x.com"));
    let none = users
        .find_first(FindManyArgs::default().filter(json!({"email": {"startsWith": "zz"}})))
        .await
        .unwrap();
    assert!(none.is_none());
}

// --- Upsert ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_converge_on_one_row() {
    let h = harness().await;
    let email = unique_email();

    let mut handles = Vec::new();
    for i in 0..32 {
        let client = h.client();
        let email = email.clone();
        handles.push(tokio::spawn(async move {
            client
                .user()
                .upsert(UpsertArgs::new(
                    json!({"email": email}),
                    json!({"email": email, "name": format!("creator-{i}")}),
                    json!({"name": format!("updater-{i}")}),
                ))
                .await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        let user = handle.await.unwrap().expect("upsert should not fail");
        ids.push(record_id(&user).unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "every upsert must resolve to the same row");

    let count = h
        .client
        .user()
        .count(CountArgs::filter(json!({"email": email})))
        .await
        .unwrap();
    assert_eq!(count.total(), Some(1));
}

#[tokio::test]
async fn upsert_updates_existing_row() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "up@x.com").await.unwrap();
    let user = h
        .client
        .user()
        .upsert(UpsertArgs::new(
            json!({"email": "up@x.com"}),
            json!({"email": "up@x.com"}),
            json!({"name": "Updated"}),
        ))
        .await
        .unwrap();
    assert_eq!(record_id(&user).unwrap(), user_id);
    assert_eq!(user.get("name"), Some(&Value::String("Updated".into())));
}

// --- Update / delete ---

#[tokio::test]
async fn update_missing_row_is_not_found_but_update_many_counts_zero() {
    let h = harness().await;
    let err = h
        .client
        .user()
        .update(UpdateArgs::new(json!({"email": "ghost@x.com"}), json!({"name": "x"})))
        .await
        .unwrap_err();
    match err {
        DataError::NotFound { entity, operation } => {
            assert_eq!(entity, "User");
            assert_eq!(operation, "update");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    let batch = h
        .client
        .user()
        .update_many(UpdateManyArgs::new(Some(json!({"email": "ghost@x.com"})), json!({"name": "x"})))
        .await
        .unwrap();
    assert_eq!(batch.count, 0);
}

#[tokio::test]
async fn update_applies_numeric_operators_and_refreshes_updated_at() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "ops@x.com").await.unwrap();
    let video = h
        .client
        .video()
        .create(CreateArgs::new(video_data(&user_id, "PROCESSING", 30)))
        .await
        .unwrap();
    let video_id = record_id(&video).unwrap();

    let updated = h
        .client
        .video()
        .update(UpdateArgs::new(
            json!({"id": video_id}),
            json!({"tokensUsed": {"increment": 120}, "duration": {"multiply": 2}}),
        ))
        .await
        .unwrap();
    assert_eq!(updated.get("tokensUsed"), Some(&Value::Int(120)));
    assert_eq!(updated.get("duration"), Some(&Value::Int(60)));
    let before = video.get("updatedAt").and_then(Value::as_datetime).unwrap();
    let after = updated.get("updatedAt").and_then(Value::as_datetime).unwrap();
    assert!(after >= before);
}

#[tokio::test]
async fn update_many_respects_limit_in_row_order() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "limit@x.com").await.unwrap();
    for duration in [10, 20, 30] {
        h.client
            .video()
            .create(CreateArgs::new(video_data(&user_id, "QUEUED", duration)))
            .await
            .unwrap();
    }
    let batch = h
        .client
        .video()
        .update_many(args(json!({"data": {"status": "PROCESSING"}, "limit": 2})))
        .await
        .unwrap();
    assert_eq!(batch.count, 2);

    let processing = h
        .client
        .video()
        .find_many(FindManyArgs::default().filter(json!({"status": "PROCESSING"})))
        .await
        .unwrap();
    let durations: Vec<_> = processing.iter().filter_map(|v| v.get("duration").cloned()).collect();
    assert_eq!(durations, [Value::Int(10), Value::Int(20)]);
}

#[tokio::test]
async fn invariant_violations_roll_back_the_write() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "inv@x.com").await.unwrap();

    let err = h
        .client
        .video()
        .create(CreateArgs::new(with(
            video_data(&user_id, "QUEUED", 10),
            json!({"errorMessage": "boom"}),
        )))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DataError::InvariantViolation { entity, .. } if entity == "Video"),
        "got: {err:?}"
    );

    let err = h
        .client
        .user()
        .update(UpdateArgs::new(json!({"id": user_id}), json!({"isDeleted": true})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    let user = h
        .client
        .user()
        .find_unique_or_throw(FindUniqueArgs::new(json!({"id": user_id})))
        .await
        .unwrap();
    assert_eq!(user.get("isDeleted"), Some(&Value::Boolean(false)));
}

#[tokio::test]
async fn deleting_a_user_cascades_and_anonymizes_events() {
    let h = harness().await;
    let (user_id, subscription_id) = seed_subscriber(&h.client, "gone@x.com").await.unwrap();
    h.client
        .subscription_history()
        .create(CreateArgs::new(history_data(&subscription_id, json!("9.99"))))
        .await
        .unwrap();
    h.client
        .video()
        .create(CreateArgs::new(video_data(&user_id, "QUEUED", 10)))
        .await
        .unwrap();
    h.client
        .analytics_event()
        .create(CreateArgs::new(analytics_event_data(Some(&user_id), "open")))
        .await
        .unwrap();

    let deleted = h
        .client
        .user()
        .delete(DeleteArgs::new(json!({"id": user_id})).select(json!({"email": true})))
        .await
        .unwrap();
    assert_eq!(deleted.to_json(), json!({"email": "gone@x.com"}));

    for total in [
        h.client.video().count(CountArgs::default()).await.unwrap().total(),
        h.client.subscription().count(CountArgs::default()).await.unwrap().total(),
        h.client.subscription_history().count(CountArgs::default()).await.unwrap().total(),
    ] {
        assert_eq!(total, Some(0));
    }
    let anonymous = h
        .client
        .analytics_event()
        .count(CountArgs::filter(json!({"userId": null})))
        .await
        .unwrap();
    assert_eq!(anonymous.total(), Some(1));
}

#[tokio::test]
async fn connect_to_missing_record_is_a_foreign_key_violation() {
    let h = harness().await;
    let err = h
        .client
        .video()
        .create(CreateArgs::new(json!({
            "user": {"connect": {"email": "nobody@x.com"}},
            "prompt": "p",
            "duration": 5,
            "style": "SOCIAL"
        })))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DataError::ForeignKeyViolation { field, .. } if field == "userId"),
        "got: {err:?}"
    );
}

// --- Shaping ---

#[tokio::test]
async fn select_id_returns_exactly_id() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "sel@x.com").await.unwrap();
    let user = h
        .client
        .user()
        .find_unique_or_throw(FindUniqueArgs::new(json!({"email": "sel@x.com"})).select(json!({"id": true})))
        .await
        .unwrap();
    assert_eq!(user.to_json(), json!({"id": user_id}));
}

#[tokio::test]
async fn select_with_omit_is_rejected() {
    let h = harness().await;
    let err = h
        .client
        .user()
        .find_many(
            FindManyArgs::default()
                .select(json!({"id": true, "email": true}))
                .omit(json!({"email": true})),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConflictingSelectOmit);
}

/// Relations are loaded one level per `include`: the subscription's `history`
/// appears (as `[]`) only when it is included explicitly, and a bare
/// `include: {subscription: true}` returns the subscription's scalars alone.
#[tokio::test]
async fn nested_include_yields_empty_history_and_bare_include_omits_it() {
    let h = harness().await;
    let (_, subscription_id) = seed_subscriber(&h.client, "a@x.com").await.unwrap();

    let user = h
        .client
        .user()
        .find_unique(
            FindUniqueArgs::new(json!({"email": "a@x.com"}))
                .include(json!({"subscription": {"include": {"history": true}}})),
        )
        .await
        .unwrap()
        .expect("user exists");
    let subscription = user.one("subscription").expect("subscription is populated");
    assert_eq!(subscription.id(), Some(subscription_id.as_str()));
    assert_eq!(subscription.get("plan"), Some(&Value::Enum("FREE".into())));
    assert_eq!(subscription.many("history").map(<[_]>::len), Some(0));
    assert_eq!(user.to_json()["subscription"]["history"], json!([]));

    let plain = h
        .client
        .user()
        .find_unique_or_throw(FindUniqueArgs::new(json!({"email": "a@x.com"})).include(json!({"subscription": true})))
        .await
        .unwrap();
    let subscription = plain.one("subscription").expect("subscription is populated");
    assert!(subscription.many("history").is_none());
    assert!(plain.to_json()["subscription"].get("history").is_none());
}

#[tokio::test]
async fn relation_counts_and_typed_models() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "count@x.com").await.unwrap();
    for token in ["a", "b"] {
        h.client
            .session()
            .create(CreateArgs::new(session_data(&user_id, token)))
            .await
            .unwrap();
    }
    let user = h
        .client
        .user()
        .find_unique_or_throw(
            FindUniqueArgs::new(json!({"id": user_id})).include(json!({"_count": {"select": {"sessions": true, "videos": true}}})),
        )
        .await
        .unwrap();
    assert_eq!(user.count("sessions"), Some(2));
    assert_eq!(user.count("videos"), Some(0));

    let typed: reeldata_core::models::User = h
        .client
        .user()
        .find_unique_or_throw(FindUniqueArgs::new(json!({"id": user_id})))
        .await
        .unwrap()
        .into_model()
        .unwrap();
    assert_eq!(typed.email, "count@x.com");
    assert!(!typed.is_deleted);
}

// --- JSON null tri-state ---

#[tokio::test]
async fn json_null_db_null_and_string_null_are_distinct() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "json@x.com").await.unwrap();
    for (prompt, metadata) in [("json-null", json_null()), ("db-null", db_null()), ("string-null", json!("null"))] {
        h.client
            .video()
            .create(CreateArgs::new(with(
                video_data(&user_id, "QUEUED", 10),
                json!({"prompt": prompt, "metadata": metadata}),
            )))
            .await
            .unwrap();
    }

    let prompts = |filter: JsonValue| {
        let client = h.client();
        async move {
            client
                .video()
                .find_many(FindManyArgs::default().filter(filter))
                .await
                .unwrap()
                .iter()
                .filter_map(|v| v.get("prompt").and_then(Value::as_str).map(String::from))
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(prompts(json!({"metadata": {"equals": json_null()}})).await, ["json-null"]);
    assert_eq!(prompts(json!({"metadata": {"equals": db_null()}})).await, ["db-null"]);
    assert_eq!(prompts(json!({"metadata": {"equals": "null"}})).await, ["string-null"]);
    assert_eq!(
        prompts(json!({"metadata": {"equals": any_null()}})).await,
        ["json-null", "db-null"]
    );

    let err = h
        .client
        .video()
        .find_many(FindManyArgs::default().filter(json!({"metadata": {"equals": null}})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

// --- Decimals ---

#[tokio::test]
async fn string_and_numeric_decimals_compare_equal() {
    let h = harness().await;
    let (_, subscription_id) = seed_subscriber(&h.client, "dec@x.com").await.unwrap();
    for amount in [json!("10.10"), json!(10.10)] {
        h.client
            .subscription_history()
            .create(CreateArgs::new(history_data(&subscription_id, amount)))
            .await
            .unwrap();
    }

    let rows = h
        .client
        .subscription_history()
        .find_many(FindManyArgs::default().filter(json!({"amount": "10.10"})))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let amounts: Vec<_> = rows.iter().filter_map(|r| r.get("amount").and_then(Value::as_decimal)).collect();
    assert_eq!(amounts[0], amounts[1]);

    let numeric = h
        .client
        .subscription_history()
        .count(CountArgs::filter(json!({"amount": {"equals": 10.1}})))
        .await
        .unwrap();
    assert_eq!(numeric.total(), Some(2));
}

#[tokio::test]
async fn decimal_sums_have_no_float_artifacts() {
    let h = harness().await;
    let (_, subscription_id) = seed_subscriber(&h.client, "sum@x.com").await.unwrap();
    let data: Vec<_> = [json!(0.1), json!(0.2)]
        .into_iter()
        .map(|amount| history_data(&subscription_id, amount))
        .collect();
    let batch = h
        .client
        .subscription_history()
        .create_many(CreateManyArgs::new(JsonValue::Array(data)))
        .await
        .unwrap();
    assert_eq!(batch.count, 2);

    let result = h
        .client
        .subscription_history()
        .aggregate(args::<AggregateArgs>(json!({"_sum": {"amount": true}, "_count": {"_all": true}})))
        .await
        .unwrap();
    assert_eq!(
        result.get(AggregateFn::Sum, "amount"),
        Some(&Value::Decimal(Decimal::from_str("0.3").unwrap()))
    );
    assert_eq!(result.count_all(), Some(2));

    let matching = h
        .client
        .subscription_history()
        .count(CountArgs::filter(json!({"amount": {"gt": 0.15, "lte": "0.2"}})))
        .await
        .unwrap();
    assert_eq!(matching.total(), Some(1));
}

// --- groupBy ---

#[tokio::test]
async fn group_by_having_on_grouped_field() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "group@x.com").await.unwrap();
    for (status, duration) in [("QUEUED", 30), ("QUEUED", 90), ("COMPLETED", 120)] {
        h.client
            .video()
            .create(CreateArgs::new(video_data(&user_id, status, duration)))
            .await
            .unwrap();
    }

    let groups = h
        .client
        .video()
        .group_by(args::<GroupByArgs>(json!({
            "by": ["status"],
            "having": {"status": {"equals": "QUEUED"}},
            "_count": {"_all": true},
            "_avg": {"duration": true}
        })))
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key("status"), Some(&Value::Enum("QUEUED".into())));
    assert_eq!(groups[0].aggregates.count_all(), Some(2));
    assert_eq!(
        groups[0].aggregates.get(AggregateFn::Avg, "duration"),
        Some(&Value::Decimal(Decimal::from(60)))
    );

    let long = h
        .client
        .video()
        .group_by(args::<GroupByArgs>(json!({
            "by": ["status"],
            "having": {"duration": {"_avg": {"gt": 60}}},
            "orderBy": {"status": "asc"}
        })))
        .await
        .unwrap();
    let statuses: Vec<_> = long.iter().filter_map(|g| g.key("status").cloned()).collect();
    assert_eq!(statuses, [Value::Enum("COMPLETED".into())]);
}

#[tokio::test]
async fn group_by_having_on_ungrouped_field_is_rejected() {
    let h = harness().await;
    let err = h
        .client
        .video()
        .group_by(args::<GroupByArgs>(json!({
            "by": ["status"],
            "having": {"duration": {"gt": 60}}
        })))
        .await
        .unwrap_err();
    match err {
        DataError::InvalidHavingField { entity, field } => {
            assert_eq!(entity, "Video");
            assert_eq!(field, "duration");
        }
        other => panic!("expected InvalidHavingField, got {other:?}"),
    }
}

// --- deleteMany / count ---

#[tokio::test]
async fn delete_many_removes_anonymous_events() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "events@x.com").await.unwrap();
    let data = JsonValue::Array(vec![
        analytics_event_data(None, "launch"),
        analytics_event_data(None, "scroll"),
        analytics_event_data(Some(&user_id), "login"),
    ]);
    h.client
        .analytics_event()
        .create_many(CreateManyArgs::new(data))
        .await
        .unwrap();

    let removed = h
        .client
        .analytics_event()
        .delete_many(DeleteManyArgs::new(Some(json!({"userId": null}))))
        .await
        .unwrap();
    assert_eq!(removed.count, 2);

    let remaining = h
        .client
        .analytics_event()
        .count(CountArgs::filter(json!({"userId": null})))
        .await
        .unwrap();
    assert_eq!(remaining.total(), Some(0));
    let all = h.client.analytics_event().count(CountArgs::default()).await.unwrap();
    assert_eq!(all.total(), Some(1));
}

#[tokio::test]
async fn count_select_reports_non_null_fields() {
    let h = harness().await;
    let user_id = seed_user(&h.client, "cnt@x.com").await.unwrap();
    h.client
        .analytics_event()
        .create_many(CreateManyArgs::new(JsonValue::Array(vec![
            analytics_event_data(None, "a"),
            analytics_event_data(Some(&user_id), "b"),
        ])))
        .await
        .unwrap();
    let counts = h
        .client
        .analytics_event()
        .count(args(json!({"select": {"_all": true, "userId": true}})))
        .await
        .unwrap();
    assert_eq!(counts.to_json(), json!({"_all": 2, "userId": 1}));
}

// --- Queries ---

#[tokio::test]
async fn find_many_orders_paginates_and_filters_relations() {
    let h = harness().await;
    let busy = seed_user(&h.client, "busy@x.com").await.unwrap();
    seed_user(&h.client, "idle@x.com").await.unwrap();
    for duration in [15, 45, 30] {
        h.client
            .video()
            .create(CreateArgs::new(video_data(&busy, "QUEUED", duration)))
            .await
            .unwrap();
    }

    let page = h
        .client
        .video()
        .find_many(args(json!({"orderBy": {"duration": "desc"}, "skip": 1, "take": 1})))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].get("duration"), Some(&Value::Int(30)));

    let with_videos = h
        .client
        .user()
        .find_many(
            FindManyArgs::default()
                .filter(json!({"videos": {"some": {"duration": {"gte": 45}}}}))
                .select(json!({"email": true})),
        )
        .await
        .unwrap();
    assert_eq!(
        with_videos.iter().map(|u| u.to_json()).collect::<Vec<_>>(),
        [json!({"email": "busy@x.com"})]
    );

    let without = h
        .client
        .user()
        .find_first_or_throw(FindManyArgs::default().filter(json!({"videos": {"none": {}}})))
        .await
        .unwrap();
    assert_eq!(without.get("email"), Some(&Value::String("idle@x.com".into())));

    let err = h
        .client
        .user()
        .find_first_or_throw(FindManyArgs::default().filter(json!({"email": {"endsWith": "@nowhere"}})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn insensitive_mode_and_not_follow_null_semantics() {
    let h = harness().await;
    h.client.user().create(CreateArgs::new(json!({"email": "Mixed@X.com", "name": "Ann"}))).await.unwrap();
    h.client.user().create(CreateArgs::new(json!({"email": "anon@x.com"}))).await.unwrap();

    let found = h
        .client
        .user()
        .count(CountArgs::filter(json!({"email": {"equals": "mixed@x.com", "mode": "insensitive"}})))
        .await
        .unwrap();
    assert_eq!(found.total(), Some(1));

    // `not` never matches a NULL name.
    let not_bob = h
        .client
        .user()
        .count(CountArgs::filter(json!({"name": {"not": "Bob"}})))
        .await
        .unwrap();
    assert_eq!(not_bob.total(), Some(1));
}
