//! # Document Flows
//!
//! Upload validation, visibility rules, listing filters and admin views.

#[cfg(test)]
mod tests {
    use crate::harness::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    // =========================================================================
    // UPLOAD
    // =========================================================================

    #[tokio::test]
    async fn test_upload_stores_object_then_row() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;

        let response = app
            .upload(
                Some(&alice),
                "Annual Report.PDF",
                b"%PDF-1.4",
                json!({"tags": ["finance", "2024", "finance"], "is_hidden": false}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let document = &response.json()["document"];
        let id = document["id"].as_i64().unwrap();
        assert_eq!(
            response.headers["location"],
            format!("/v1/document/{}", id).as_str()
        );
        assert_eq!(document["title"], "Annual Report.PDF");
        assert_eq!(document["filetype"], ".pdf");
        assert_eq!(document["tags"], json!(["2024", "finance"]));

        let key = document["storage_key"].as_str().unwrap();
        let stored = app.objects.get(key).expect("object stored");
        assert_eq!(&stored.body[..], b"%PDF-1.4");
        assert_eq!(document["link"], format!("memory://objects/{}", key).as_str());
    }

    #[tokio::test]
    async fn test_upload_requires_activated_user() {
        let app = TestApp::new();
        let response = app.upload(None, "a.pdf", b"data", json!({})).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(app.objects.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let response = app.upload(Some(&alice), "a.pdf", b"", json!({})).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json()["error"]["document"], "must not be empty");
        assert!(app.objects.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_metadata() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let response = app
            .upload(Some(&alice), "a.pdf", b"data", json!({"owner_id": 99}))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(app.objects.is_empty());
    }

    #[tokio::test]
    async fn test_upload_with_long_file_name() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let file_name = format!("{}.pdf", "a".repeat(230));

        let response = app
            .upload(Some(&alice), &file_name, b"%PDF-1.4", json!({"title": "long"}))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());

        let document = &response.json()["document"];
        assert_eq!(document["filetype"], ".pdf");
        let key = document["storage_key"].as_str().unwrap();
        assert!(key.len() <= 255 - ".partial".len() - 1);
        assert!(key.ends_with(".pdf"));
        assert!(app.objects.get(key).is_some());
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    #[tokio::test]
    async fn test_hidden_document_visibility() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        let carol = app.signup("carol", "carol@x.com", "pa55word3").await;
        app.promote("carol@x.com").await;

        let id = app.upload_document(&alice, "secret", true).await;
        let uri = format!("/v1/document/{}", id);

        assert_eq!(app.get(&uri, None).await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.get(&uri, Some(&bob)).await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.get(&uri, Some(&alice)).await.status, StatusCode::OK);

        let admin_view = app.get(&uri, Some(&carol)).await;
        assert_eq!(admin_view.status, StatusCode::OK);
        assert_eq!(admin_view.json()["document"]["is_hidden"], true);
    }

    #[tokio::test]
    async fn test_public_document_masks_owner_fields() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let id = app.upload_document(&alice, "open", false).await;

        let response = app.get(&format!("/v1/document/{}", id), None).await;
        assert_eq!(response.status, StatusCode::OK);
        let document = &response.json()["document"];
        assert!(document.get("storage_key").is_none());
        assert!(document.get("is_hidden").is_none());
        assert_eq!(document["title"], "open");
    }

    #[tokio::test]
    async fn test_bad_ids_are_not_found() {
        let app = TestApp::new();
        for uri in ["/v1/document/0", "/v1/document/-4", "/v1/document/abc", "/v1/document/999"] {
            assert_eq!(app.get(uri, None).await.status, StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_visibility() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let id = app.upload_document(&alice, "flip", true).await;
        let uri = format!("/v1/document/{}", id);

        let once = app.call(Method::PATCH, &uri, Some(&alice), None).await;
        assert_eq!(once.json()["document"]["is_hidden"], false);
        let twice = app.call(Method::PATCH, &uri, Some(&alice), None).await;
        assert_eq!(twice.json()["document"]["is_hidden"], true);
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_row() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        let id = app.upload_document(&alice, "gone", false).await;
        let uri = format!("/v1/document/{}", id);

        let denied = app.call(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.objects.len(), 1);

        let deleted = app.call(Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(deleted.status, StatusCode::OK);
        assert_eq!(deleted.json()["message"], "document successfully deleted");
        assert!(app.objects.is_empty());
        assert_eq!(app.get(&uri, Some(&alice)).await.status, StatusCode::NOT_FOUND);
    }

    // =========================================================================
    // LISTINGS
    // =========================================================================

    #[tokio::test]
    async fn test_listing_filters_and_pagination() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let bob = app.signup("bob", "bob@x.com", "pa55word2").await;
        app.upload_document(&alice, "Tax Return 2023", false).await;
        app.upload_document(&alice, "tax notes", true).await;
        app.upload_document(&bob, "Holiday Photos", false).await;

        let public = app.get("/v1/documents", None).await.json();
        assert_eq!(public["metadata"]["total_records"], 2);

        let taxes = app.get("/v1/documents?title=TAX", Some(&alice)).await.json();
        assert_eq!(taxes["documents"].as_array().unwrap().len(), 1);

        let mine = app.get("/v1/documents?owner=me", Some(&alice)).await.json();
        assert_eq!(mine["metadata"]["total_records"], 2);

        let others = app.get("/v1/documents?owner=-me", Some(&alice)).await.json();
        assert_eq!(others["documents"][0]["title"], "Holiday Photos");

        let paged = app
            .get("/v1/documents?page=2&page_size=1&sort=-title", None)
            .await
            .json();
        assert_eq!(paged["documents"][0]["title"], "Holiday Photos");
        assert_eq!(paged["metadata"]["current_page"], 2);
        assert_eq!(paged["metadata"]["last_page"], 2);
    }

    #[tokio::test]
    async fn test_title_search_matches_file_name_title() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let response = app
            .upload(Some(&alice), "report.pdf", b"%PDF-1.4", json!({}))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json()["document"]["title"], "report.pdf");

        for title in ["report.pdf", "report", "REPORT%20pdf"] {
            let listing = app
                .get(&format!("/v1/documents?title={}", title), None)
                .await;
            assert_eq!(listing.status, StatusCode::OK);
            assert_eq!(
                listing.json()["documents"].as_array().unwrap().len(),
                1,
                "title={}",
                title
            );
        }

        let listing = app.get("/v1/documents?title=report.docx", None).await;
        assert!(listing.json()["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_parameter_errors() {
        let app = TestApp::new();
        let response = app
            .get("/v1/documents?page=0&page_size=500&sort=owner", None)
            .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = &response.json()["error"];
        assert_eq!(errors["page"], "must be greater than zero");
        assert_eq!(errors["page_size"], "must be a maximum of 100");
        assert_eq!(errors["sort"], "invalid sort value");
    }

    #[tokio::test]
    async fn test_owner_listing_requires_activation() {
        let app = TestApp::new();
        let response = app.get("/v1/documents?owner=me", None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    #[tokio::test]
    async fn test_admin_endpoints() {
        let app = TestApp::new();
        let alice = app.signup("alice", "alice@x.com", "pa55word1").await;
        let root = app.signup("root", "root@x.com", "pa55word9").await;
        app.upload_document(&alice, "hidden one", true).await;

        assert_eq!(
            app.get("/v1/admin/users", Some(&alice)).await.status,
            StatusCode::FORBIDDEN
        );

        app.promote("root@x.com").await;
        let users = app.get("/v1/admin/users", Some(&root)).await;
        assert_eq!(users.status, StatusCode::OK);
        assert_eq!(users.json()["users"].as_array().unwrap().len(), 2);

        let everything = app.get("/v1/admin/documents", Some(&root)).await.json();
        assert_eq!(everything["metadata"]["total_records"], 1);
        assert_eq!(everything["documents"][0]["is_hidden"], true);

        let alice_id = app.user_id("alice@x.com").await;
        let toggled = app
            .call(Method::PATCH, &format!("/v1/admin/user/{}", alice_id), Some(&root), None)
            .await;
        assert_eq!(toggled.status, StatusCode::OK);
        assert_eq!(toggled.json()["user"]["is_admin"], true);
        assert_eq!(
            app.get("/v1/admin/users", Some(&alice)).await.status,
            StatusCode::OK
        );

        let missing = app
            .call(Method::PATCH, "/v1/admin/user/999", Some(&root), None)
            .await;
        assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(missing.json()["error"]["user"], "user not found");
    }
}
