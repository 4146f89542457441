// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Upload tests.

use reqwest::StatusCode;
use warden_core::Config;

use crate::{
    assert_fails, expect_failure, expect_success, load_big_icon_image, load_icon_image, TestEnv,
    CONTENT_TYPE, FIVE_HUNDRED_MB,
};

const USER_ID: &str = "user";

/// A denied upload leaves nothing behind.
async fn assert_absent(env: &TestEnv, name: &str) {
    let image = env.rules_disabled().user_image(USER_ID, name);
    let response = image.get_download_url().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unauthenticated_cannot_put_image() {
    let env = TestEnv::new().await;

    let image = env.unauthenticated().user_image(USER_ID, "icon.png");
    assert_fails(image.put(load_icon_image(), Some(CONTENT_TYPE)).await);
    assert_absent(&env, "icon.png").await;
}

#[tokio::test]
async fn test_owner_can_put_image() {
    let env = TestEnv::new().await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let response = image.put(load_icon_image(), Some(CONTENT_TYPE)).await;
    let response = expect_success(response).unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["size"], 2048);
    assert_eq!(body["contentType"], CONTENT_TYPE);
}

#[tokio::test]
async fn test_another_user_cannot_put_image() {
    let env = TestEnv::new().await;

    let image = env.authenticated("user2").user_image(USER_ID, "icon.png");
    assert_fails(image.put(load_icon_image(), Some(CONTENT_TYPE)).await);
    assert_absent(&env, "icon.png").await;
}

#[tokio::test]
async fn test_owner_cannot_put_image_over_100kb() {
    let env = TestEnv::new().await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "big_icon.png");
    assert_fails(image.put(load_big_icon_image(), Some(CONTENT_TYPE)).await);
    assert_absent(&env, "big_icon.png").await;
}

#[tokio::test]
async fn test_owner_cannot_put_500mb_image() {
    let env = TestEnv::new().await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "big_icon.png");
    let status = expect_failure(image.put_declared(FIVE_HUNDRED_MB, CONTENT_TYPE).await);
    // Refused on the declared length, before any body byte is read.
    assert_eq!(status.unwrap(), StatusCode::FORBIDDEN);
    assert_absent(&env, "big_icon.png").await;
}

#[tokio::test]
async fn test_owner_cannot_put_image_with_invalid_content_type() {
    let env = TestEnv::new().await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    assert_fails(image.put(load_icon_image(), Some("image/jpeg")).await);
    assert_fails(image.put(load_icon_image(), Some("image/png; charset=binary")).await);
    assert_fails(image.put(load_icon_image(), None).await);
    assert_absent(&env, "icon.png").await;
}

#[tokio::test]
async fn test_owner_cannot_put_image_with_invalid_extension() {
    let env = TestEnv::new().await;

    let user = env.authenticated(USER_ID);
    for name in ["icon.jpg", "icon.PNG", "icon"] {
        let image = user.user_image(USER_ID, name);
        assert_fails(image.put(load_icon_image(), Some(CONTENT_TYPE)).await);
        assert_absent(&env, name).await;
    }
}

#[tokio::test]
async fn test_owner_cannot_put_outside_own_directory() {
    let env = TestEnv::new().await;

    let user = env.authenticated(USER_ID);
    let nested = user.object("users/user/album/icon.png");
    assert_fails(nested.put(load_icon_image(), Some(CONTENT_TYPE)).await);
    let root = user.object("icon.png");
    assert_fails(root.put(load_icon_image(), Some(CONTENT_TYPE)).await);
}

#[tokio::test]
async fn test_owner_can_overwrite_image() {
    let env = TestEnv::new().await;
    env.seed_icon(USER_ID, "icon.png").await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let response = image.put(load_icon_image(), Some(CONTENT_TYPE)).await;
    let response = expect_success(response).unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_fails(image.put(load_big_icon_image(), Some(CONTENT_TYPE)).await);
}

#[tokio::test]
async fn test_chunked_upload_is_checked_before_body_is_read() {
    let mut config = Config::default();
    config.server.max_body_size = 4096;
    let env = TestEnv::with_config(config).await;
    let body = vec![0u8; 8192];

    // Over the body limit, but refused by the rules first.
    let image = env.authenticated("user2").user_image(USER_ID, "icon.png");
    let status = expect_failure(image.put_chunked(&body, CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::FORBIDDEN);

    let image = env.unauthenticated().user_image(USER_ID, "icon.png");
    let status = expect_failure(image.put_chunked(&body, CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::FORBIDDEN);

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.jpg");
    let status = expect_failure(image.put_chunked(&body, CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::FORBIDDEN);

    // The owner passes the rules, so the body limit applies.
    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let status = expect_failure(image.put_chunked(&body, CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_absent(&env, "icon.png").await;
}

#[tokio::test]
async fn test_owner_chunked_upload_is_checked_on_received_size() {
    let env = TestEnv::new().await;

    let image = env.authenticated(USER_ID).user_image(USER_ID, "icon.png");
    let status = expect_success(image.put_chunked(&load_icon_image(), CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::CREATED);

    let big = env.authenticated(USER_ID).user_image(USER_ID, "big_icon.png");
    let status = expect_failure(big.put_chunked(&load_big_icon_image(), CONTENT_TYPE).await);
    assert_eq!(status.unwrap(), StatusCode::FORBIDDEN);
    assert_absent(&env, "big_icon.png").await;
}
