//! # Listing Cache
//!
//! The cache must never hand one viewer's listing to another, and every
//! document mutation must make the next listing differ from what was cached
//! before it.

#[cfg(test)]
mod tests {
    use crate::harness::{test_config, TestApp};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_identity_scoped_listings_do_not_share_entries() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        app.upload_document(&alice, "alice private", true).await;
        app.upload_document(&bob, "bob private", true).await;

        let alice_mine = app.get("/v1/documents?owner=me", Some(&alice)).await.json();
        let bob_mine = app.get("/v1/documents?owner=me", Some(&bob)).await.json();
        assert_eq!(alice_mine["documents"][0]["title"], "alice private");
        assert_eq!(bob_mine["documents"][0]["title"], "bob private");

        // The anonymous default view is cached separately too
        let anonymous = app.get("/v1/documents", None).await.json();
        assert_eq!(anonymous["documents"].as_array().unwrap().len(), 0);
        assert_eq!(app.state.cache.stats().hits, 0);
        assert_eq!(app.cache_store.len(), 3);
    }

    #[tokio::test]
    async fn test_owner_sees_masked_fields_only_in_own_cached_view() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        app.upload_document(&alice, "shared", false).await;

        let as_alice = app.get("/v1/documents", Some(&alice)).await.json();
        let as_anonymous = app.get("/v1/documents", None).await.json();
        assert!(as_alice["documents"][0].get("storage_key").is_some());
        assert!(as_anonymous["documents"][0].get("storage_key").is_none());
    }

    #[tokio::test]
    async fn test_every_mutation_changes_next_listing() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;

        let before_insert = app.get("/v1/documents", None).await;
        let id = app.upload_document(&alice, "mutating", false).await;
        let after_insert = app.get("/v1/documents", None).await;
        assert_ne!(before_insert.bytes, after_insert.bytes);

        let uri = format!("/v1/document/{}", id);
        app.call(Method::PATCH, &uri, Some(&alice), None).await;
        let after_toggle = app.get("/v1/documents", None).await;
        assert_ne!(after_insert.bytes, after_toggle.bytes);

        app.call(Method::PATCH, &uri, Some(&alice), None).await;
        let after_second_toggle = app.get("/v1/documents", None).await;
        assert_ne!(after_toggle.bytes, after_second_toggle.bytes);
        // Same documents, different epoch
        assert_eq!(
            after_insert.json()["documents"],
            after_second_toggle.json()["documents"]
        );

        let deleted = app.call(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(deleted.status, StatusCode::OK);
        let after_delete = app.get("/v1/documents", None).await;
        assert_ne!(after_second_toggle.bytes, after_delete.bytes);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        let id = app.upload_document(&alice, "stable", false).await;

        let first = app.get("/v1/documents", None).await;
        let denied = app
            .call(Method::DELETE, &format!("/v1/document/{}", id), Some(&bob), None)
            .await;
        assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
        let second = app.get("/v1/documents", None).await;
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(app.state.cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_misses() {
        let app = TestApp::new();
        app.cache_store.set_unavailable(true);

        let first = app.get("/v1/documents", None).await;
        let second = app.get("/v1/documents", None).await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(second.status, StatusCode::OK);
        let stats = app.state.cache.stats();
        assert_eq!(stats.hits, 0);
        assert!(stats.errors >= 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() {
        let mut config = test_config();
        config.cache.enabled = false;
        let app = TestApp::with_config(config);

        app.get("/v1/documents", None).await;
        app.get("/v1/documents", None).await;
        assert!(app.cache_store.is_empty());
        assert_eq!(app.state.cache.stats().hits, 0);
    }
}
