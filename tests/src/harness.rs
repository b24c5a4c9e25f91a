//! Test harness: the real router over in-memory collaborators.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use viadro_api::adapters::{
    extract_activation_token, InMemoryCacheStore, InMemoryDocumentRepository,
    InMemoryObjectStore, InMemoryTokenRepository, InMemoryUserRepository, ManualClock,
    MemoryMailer,
};
use viadro_api::ports::UserRepository;
use viadro_api::{AppState, Collaborators, ServerConfig, ViadroService};

const BOUNDARY: &str = "viadro-test-boundary";

/// Response captured for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

/// A running application plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub tokens: Arc<InMemoryTokenRepository>,
    pub objects: Arc<InMemoryObjectStore>,
    pub cache_store: Arc<InMemoryCacheStore>,
    pub mailer: Arc<MemoryMailer>,
    pub clock: Arc<ManualClock>,
}

/// Defaults for tests: cheap bcrypt, in-memory objects.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.environment = "testing".to_string();
    config.security.bcrypt_cost = 4;
    config.storage.root = None;
    config.storage.public_base_url = "memory://objects".to_string();
    config
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let users = Arc::new(InMemoryUserRepository::new(clock.clone()));
        let tokens = Arc::new(InMemoryTokenRepository::new());
        let documents = Arc::new(InMemoryDocumentRepository::new(clock.clone()));
        let objects = Arc::new(InMemoryObjectStore::new(
            config.storage.public_base_url.clone(),
        ));
        let cache_store = Arc::new(InMemoryCacheStore::new());
        let mailer = Arc::new(MemoryMailer::new());

        let service = ViadroService::new(
            config,
            Collaborators {
                users: users.clone(),
                tokens: tokens.clone(),
                documents,
                objects: objects.clone(),
                cache_store: cache_store.clone(),
                mailer: mailer.clone(),
                clock: clock.clone(),
            },
        )
        .expect("valid test config");

        Self {
            router: service.router(),
            state: service.state().clone(),
            users,
            tokens,
            objects,
            cache_store,
            mailer,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    /// JSON request with an optional bearer token.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("valid request")).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, token, None).await
    }

    /// Register and return the activation token sent by mail.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> String {
        let response = self
            .call(
                Method::POST,
                "/v1/user",
                None,
                Some(json!({"username": username, "email": email, "password": password})),
            )
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.json());
        self.state.background.wait_idle().await;
        let mail = self.mailer.last_to(email).expect("welcome email sent");
        extract_activation_token(&mail).expect("token in welcome email")
    }

    pub async fn activate(&self, token: &str) -> TestResponse {
        self.call(
            Method::PUT,
            "/v1/user/activate",
            None,
            Some(json!({ "token": token })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::PUT,
            "/v1/user/authenticate",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Register, activate and log in; returns the bearer token.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> String {
        let activation = self.register(username, email, password).await;
        assert_eq!(self.activate(&activation).await.status, StatusCode::OK);
        let login = self.login(email, password).await;
        assert_eq!(login.status, StatusCode::CREATED);
        login.json()["authentication_token"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub async fn user_id(&self, email: &str) -> i64 {
        self.users.get_by_email(email).await.expect("user exists").id.0
    }

    /// Flip the admin flag directly in the repository.
    pub async fn promote(&self, email: &str) {
        let mut user = self.users.get_by_email(email).await.expect("user exists");
        user.is_admin = true;
        self.users.update(&user).await.expect("user updated");
    }

    /// Multipart upload of `content` as `file_name`.
    pub async fn upload(
        &self,
        token: Option<&str>,
        file_name: &str,
        content: &[u8],
        metadata: Value,
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\
                 Content-Type: application/json\r\n\r\n{m}\r\n",
                b = BOUNDARY,
                m = metadata
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{f}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n",
                b = BOUNDARY,
                f = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::post("/v1/document").header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body)).expect("valid request"))
            .await
    }

    /// Upload and return the new document id.
    pub async fn upload_document(&self, token: &str, title: &str, hidden: bool) -> i64 {
        let response = self
            .upload(
                Some(token),
                &format!("{}.pdf", title),
                b"%PDF-1.4 test",
                json!({"title": title, "is_hidden": hidden}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        response.json()["document"]["id"]
            .as_i64()
            .expect("document id")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
