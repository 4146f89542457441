// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Directory listing tests.

use crate::{assert_fails, expect_success, TestEnv};

const USER_ID: &str = "user";

async fn seeded_env() -> TestEnv {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon1.png").await;
    env.seed_icon(USER_ID, "icon2.png").await;
    env
}

#[tokio::test]
async fn test_unauthenticated_cannot_list_images() {
    let env = seeded_env().await;
    assert_fails(env.unauthenticated().list_user_images(USER_ID).await);
}

#[tokio::test]
async fn test_owner_can_list_images() {
    let env = seeded_env().await;

    let response = expect_success(env.authenticated(USER_ID).list_user_images(USER_ID).await);
    let body: serde_json::Value = response.unwrap().json().await.unwrap();
    assert_eq!(
        body["items"],
        serde_json::json!(["users/user/icon1.png", "users/user/icon2.png"])
    );
    assert_eq!(body["prefixes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_another_user_cannot_list_images() {
    let env = seeded_env().await;
    assert_fails(env.authenticated("user2").list_user_images(USER_ID).await);
}

#[tokio::test]
async fn test_only_admin_lists_root() {
    let env = seeded_env().await;
    assert_fails(env.authenticated(USER_ID).list("").await);
    assert_fails(env.authenticated(USER_ID).list("users").await);

    let response = expect_success(env.rules_disabled().list("").await);
    let body: serde_json::Value = response.unwrap().json().await.unwrap();
    assert_eq!(body["prefixes"], serde_json::json!(["users"]));
}
