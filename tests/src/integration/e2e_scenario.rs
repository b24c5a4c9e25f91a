//! # End-to-End Scenario
//!
//! Two users, one hidden document:
//!
//! 1. alice registers (202), activates (200) and logs in (201)
//! 2. alice uploads a hidden document (201)
//! 3. anonymous read of the document is refused (401), alice's succeeds (200)
//! 4. bob cannot toggle alice's document (401)
//! 5. the public listing is served from cache until a mutation happens

#[cfg(test)]
mod tests {
    use crate::harness::TestApp;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_alice_and_bob() {
        let app = TestApp::new();

        // Registration and activation
        let activation = app.register("alice", "alice@x.com", "pa55word1").await;
        let activated = app.activate(&activation).await;
        assert_eq!(activated.status, StatusCode::OK);
        assert_eq!(activated.json()["user"]["activated"], true);

        let login = app.login("alice@x.com", "pa55word1").await;
        assert_eq!(login.status, StatusCode::CREATED);
        let alice = login.json()["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string();
        let alice_id = activated.json()["user"]["id"].as_i64().unwrap();

        // Hidden upload
        let id = app.upload_document(&alice, "quarterly", true).await;
        let document = app.get(&format!("/v1/document/{}", id), Some(&alice)).await;
        assert_eq!(document.status, StatusCode::OK);
        assert_eq!(document.json()["document"]["owner_id"], alice_id);
        assert_eq!(document.json()["document"]["is_hidden"], true);

        // Anonymous is refused
        let anonymous = app.get(&format!("/v1/document/{}", id), None).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        // bob may not toggle it
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        let toggled = app
            .call(Method::PATCH, &format!("/v1/document/{}", id), Some(&bob), None)
            .await;
        assert_eq!(toggled.status, StatusCode::UNAUTHORIZED);

        // Listing cache
        let first = app.get("/v1/documents", None).await;
        let second = app.get("/v1/documents", None).await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(app.state.cache.stats().hits, 1);

        let toggled = app
            .call(Method::PATCH, &format!("/v1/document/{}", id), Some(&alice), None)
            .await;
        assert_eq!(toggled.status, StatusCode::OK);
        assert_eq!(toggled.json()["document"]["is_hidden"], false);

        let third = app.get("/v1/documents", None).await;
        assert_ne!(first.bytes, third.bytes);
        assert_eq!(third.json()["documents"][0]["id"], id);
    }
}
