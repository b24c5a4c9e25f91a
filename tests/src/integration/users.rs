//! # User Flows
//!
//! Registration validation, activation token handling, login, logout and
//! account deletion.

#[cfg(test)]
mod tests {
    use crate::harness::{test_config, TestApp};
    use axum::http::{Method, StatusCode};
    use chrono::Duration;
    use serde_json::json;
    use std::time::Instant;

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let app = TestApp::new();
        let response = app
            .call(
                Method::POST,
                "/v1/user",
                None,
                Some(json!({"username": "", "email": "not-an-email", "password": "short"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = &response.json()["error"];
        assert!(errors["username"].is_string());
        assert!(errors["email"].is_string());
        assert!(errors["password"].is_string());
        assert!(app.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_fields() {
        let app = TestApp::new();
        let response = app
            .call(
                Method::POST,
                "/v1/user",
                None,
                Some(json!({
                    "username": "mallory",
                    "email": "mallory@x.com",
                    "password": "pa55word1",
                    "is_admin": true
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["error"], "body contains unknown key \"is_admin\"");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unprocessable() {
        let app = TestApp::new();
        app.register("alice", "alice@x.com", "pa55word1").await;
        let response = app
            .call(
                Method::POST,
                "/v1/user",
                None,
                Some(json!({"username": "alice2", "email": "ALICE@x.com", "password": "pa55word1"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.json()["error"]["email"],
            "a user with this email address already exists"
        );
    }

    #[tokio::test]
    async fn test_registration_survives_mail_failure() {
        let app = TestApp::new();
        app.mailer.set_failing(true);
        let response = app
            .call(
                Method::POST,
                "/v1/user",
                None,
                Some(json!({"username": "alice", "email": "alice@x.com", "password": "pa55word1"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.json()["user"]["activated"], false);
        assert!(response.json()["user"].get("password").is_none());
        app.state.background.wait_idle().await;
        assert!(app.mailer.sent().is_empty());
    }

    // =========================================================================
    // ACTIVATION
    // =========================================================================

    #[tokio::test]
    async fn test_activation_token_is_single_use() {
        let app = TestApp::new();
        let token = app.register("alice", "alice@x.com", "pa55word1").await;
        assert_eq!(app.activate(&token).await.status, StatusCode::OK);

        let again = app.activate(&token).await;
        assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            again.json()["error"]["token"],
            "invalid or expired activation token"
        );
    }

    #[tokio::test]
    async fn test_activation_token_expires() {
        let app = TestApp::new();
        let token = app.register("alice", "alice@x.com", "pa55word1").await;
        app.clock.advance(Duration::days(3) + Duration::seconds(1));
        assert_eq!(
            app.activate(&token).await.status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_malformed_activation_token() {
        let app = TestApp::new();
        let response = app.activate("short").await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json()["error"]["token"], "must be 26 bytes long");
    }

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let app = TestApp::new();
        app.signup("alice", "alice@x.com", "pa55word1").await;

        let wrong_password = app.login("alice@x.com", "pa55word2").await;
        let unknown_email = app.login("nobody@x.com", "pa55word1").await;
        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.bytes, unknown_email.bytes);
    }

    #[tokio::test]
    async fn test_unknown_email_pays_password_cost() {
        let mut config = test_config();
        config.security.bcrypt_cost = 10;
        let app = TestApp::with_config(config);
        app.signup("alice", "alice@x.com", "pa55word1").await;

        let started = Instant::now();
        for _ in 0..3 {
            app.login("alice@x.com", "pa55word2").await;
        }
        let wrong_password = started.elapsed();

        let started = Instant::now();
        for _ in 0..3 {
            app.login("nobody@x.com", "pa55word2").await;
        }
        let unknown_email = started.elapsed();

        assert!(
            unknown_email * 3 >= wrong_password,
            "unknown email {:?} vs wrong password {:?}",
            unknown_email,
            wrong_password
        );
    }

    #[tokio::test]
    async fn test_login_returns_token_and_expiry() {
        let app = TestApp::new();
        app.signup("alice", "alice@x.com", "pa55word1").await;
        let login = app.login("alice@x.com", "pa55word1").await;
        let token = &login.json()["authentication_token"];
        assert_eq!(token["token"].as_str().unwrap().len(), 26);
        assert!(token["expiry"].is_string());
    }

    #[tokio::test]
    async fn test_activation_token_is_not_a_bearer_token() {
        let app = TestApp::new();
        let activation = app.register("alice", "alice@x.com", "pa55word1").await;
        let response = app.get("/v1/documents", Some(&activation)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers["www-authenticate"], "Bearer");
    }

    #[tokio::test]
    async fn test_unactivated_user_cannot_upload() {
        let app = TestApp::new();
        app.register("alice", "alice@x.com", "pa55word1").await;
        let login = app.login("alice@x.com", "pa55word1").await;
        let token = login.json()["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .upload(Some(&token), "a.pdf", b"data", json!({}))
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_revokes_every_session() {
        let app = TestApp::new();
        let first = app.signup("alice", "alice@x.com", "pa55word1").await;
        let second = app.login("alice@x.com", "pa55word1").await.json()
            ["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .call(Method::DELETE, "/v1/user/authenticate", Some(&first), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);

        for token in [&first, &second] {
            let response = app.get("/v1/documents?owner=me", Some(token)).await;
            assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_logout_requires_authentication() {
        let app = TestApp::new();
        let response = app
            .call(Method::DELETE, "/v1/user/authenticate", None, None)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    // =========================================================================
    // DELETION
    // =========================================================================

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        app.upload_document(&alice, "one", false).await;
        app.upload_document(&alice, "two", true).await;
        assert_eq!(app.objects.len(), 2);

        let id = app.user_id("alice@x.com").await;

        let response = app
            .call(Method::DELETE, &format!("/v1/user/{}", id), Some(&alice), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["message"], "user successfully deleted");
        assert!(app.objects.is_empty());
        assert!(app.tokens.is_empty());

        let listing = app.get("/v1/documents", None).await;
        assert_eq!(listing.json()["documents"], json!([]));
        assert_eq!(
            app.login("alice@x.com", "pa55word1").await.status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_delete_other_user_needs_admin() {
        let app = TestApp::new();
        app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        let alice_id = app.user_id("alice@x.com").await;

        let response = app
            .call(Method::DELETE, &format!("/v1/user/{}", alice_id), Some(&bob), None)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        app.promote("bob@x.com").await;
        let response = app
            .call(Method::DELETE, &format!("/v1/user/{}", alice_id), Some(&bob), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = app
            .call(Method::DELETE, &format!("/v1/user/{}", alice_id), Some(&bob), None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
