use serde_json::json;

use crate::common::{TestApp, routes};

mod register {
    use super::*;

    #[tokio::test]
    async fn creates_user() {
        let app = TestApp::spawn().await;

        let res = app.register("alice", "password123").await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].as_i64().is_some());
        assert_eq!(res.body["username"].as_str().unwrap(), "alice");
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let app = TestApp::spawn().await;

        assert_eq!(app.register("bob", "password123").await.status, 201);

        let res = app.register("bob", "otherpassword").await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"].as_str().unwrap(), "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn rejects_short_password() {
        let app = TestApp::spawn().await;

        let res = app.register("carol", "short").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rejects_invalid_username() {
        let app = TestApp::spawn().await;

        let res = app.register("not a name", "password123").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn returns_token_for_valid_credentials() {
        let app = TestApp::spawn().await;
        app.register("dave", "password123").await;

        let res = app
            .post_json(
                routes::LOGIN,
                json!({ "username": "dave", "password": "password123" }),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].as_str().is_some());
        assert_eq!(res.body["username"].as_str().unwrap(), "dave");
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let app = TestApp::spawn().await;
        app.register("erin", "password123").await;

        let res = app
            .post_json(
                routes::LOGIN,
                json!({ "username": "erin", "password": "wrongpassword" }),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"].as_str().unwrap(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_user_is_indistinguishable_from_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::LOGIN,
                json!({ "username": "nobody", "password": "password123" }),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"].as_str().unwrap(), "INVALID_CREDENTIALS");
    }
}

mod profile {
    use super::*;

    #[tokio::test]
    async fn returns_current_user() {
        let app = TestApp::spawn().await;
        let token = app.register_and_login("frank").await;

        let res = app.get(routes::PROFILE, Some(&token)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"].as_str().unwrap(), "frank");
        assert!(res.body["id"].as_i64().is_some());
    }

    #[tokio::test]
    async fn requires_token() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PROFILE, None).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"].as_str().unwrap(), "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PROFILE, Some("not.a.jwt")).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"].as_str().unwrap(), "TOKEN_INVALID");
    }
}
