// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Download URL tests.

use crate::{assert_fails, assert_succeeds, expect_failure, expect_success, TestEnv};

const USER_ID: &str = "user";
const ANOTHER_USER_ID: &str = "user2";

#[tokio::test]
async fn test_unauthenticated_cannot_get_image() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.unauthenticated().user_image(USER_ID, "icon.png");
    assert_fails(image.get_download_url().await);
}

#[tokio::test]
async fn test_owner_can_get_image() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let response = expect_success(image.get_download_url().await).unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["path"], "users/user/icon.png");
    assert_eq!(body["contentType"], "image/png");
    assert!(body["downloadUrl"].as_str().unwrap().starts_with("/download/"));
}

#[tokio::test]
async fn test_another_user_cannot_get_image() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.authenticated(ANOTHER_USER_ID).user_image(USER_ID, "icon.png");
    let response = expect_failure(image.get_download_url().await).unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["status"], "storage/unauthorized");
}

/// Seeded without a content type, the image is still readable by its owner.
#[tokio::test]
async fn test_owner_can_get_image_without_content_type() {
    let env = TestEnv::new().await;
    let seed = env.rules_disabled().user_image(USER_ID, "icon.png");
    assert_succeeds(seed.put(crate::load_icon_image(), None).await);

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    assert_succeeds(image.get_download_url().await);
}

/// Missing objects are hidden behind the rules: strangers see 403, the owner 404.
#[tokio::test]
async fn test_missing_image() {
    let env = TestEnv::new().await;

    let stranger = env.authenticated(ANOTHER_USER_ID).user_image(USER_ID, "none.png");
    let response = stranger.get_download_url().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);

    let owner = env.authenticated(USER_ID).user_image(USER_ID, "none.png");
    let response = owner.get_download_url().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
