// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Metadata update tests.

use serde_json::json;

use crate::{assert_fails, expect_failure, expect_success, TestEnv};

const USER_ID: &str = "user";

#[tokio::test]
async fn test_unauthenticated_cannot_update_metadata() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.unauthenticated().user_image(USER_ID, "icon.png");
    assert_fails(image.update_metadata(json!({})).await);
}

#[tokio::test]
async fn test_owner_cannot_update_metadata() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let response = expect_failure(image.update_metadata(json!({})).await).unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rules_disabled_can_update_metadata() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.rules_disabled().user_image(USER_ID, "icon.png");
    let update = json!({ "cacheControl": "max-age=60", "customMetadata": { "owner": "user" } });
    let response = expect_success(image.update_metadata(update).await).unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cacheControl"], "max-age=60");
    assert_eq!(body["customMetadata"]["owner"], "user");
    assert_eq!(body["metageneration"], 2);
}

#[tokio::test]
async fn test_malformed_update_is_rejected() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.rules_disabled().user_image(USER_ID, "icon.png");
    let response = image.update_metadata(json!({ "cacheControl": 5 })).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
