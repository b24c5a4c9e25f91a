//! Document upload, retrieval, listing and mutation.

use crate::adapters::object_store::MAX_KEY_LEN;
use crate::cache::{ReadScope, Viewer};
use crate::domain::filters::{ListingQuery, Metadata, OwnerParam};
use crate::domain::policy::{can_mutate, can_read, list_filter, ListFilter, ListingScope};
use crate::domain::principal::Principal;
use crate::domain::types::{normalize_tags, Document, DocumentId, NewDocument, UserId, Visibility};
use crate::domain::validation::FieldErrors;
use crate::domain::ApiError;
use crate::handlers::extract::{decode_json, ActivatedUser, CurrentPrincipal, IdParam, ListingParams};
use crate::handlers::AppState;
use crate::ports::StoreError;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Outward shape of a document. Owner-only fields are masked for everyone
/// else.
#[derive(Debug, Serialize)]
pub struct DocumentView<'a> {
    pub id: DocumentId,
    pub owner_id: UserId,
    pub title: &'a str,
    pub link: &'a str,
    pub filetype: &'a str,
    pub tags: &'a [String],
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<&'a str>,
}

impl<'a> DocumentView<'a> {
    pub fn new(document: &'a Document, viewer: &Principal) -> Self {
        let privileged = viewer.owns(document.owner_id) || viewer.is_admin();
        Self {
            id: document.id,
            owner_id: document.owner_id,
            title: &document.title,
            link: &document.location,
            filetype: &document.filetype,
            tags: &document.tags,
            created_at: document.created_at,
            is_hidden: privileged.then(|| document.visibility.is_hidden()),
            storage_key: privileged.then_some(document.storage_key.as_str()),
        }
    }
}

fn json_bytes(payload: Bytes) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        payload,
    )
        .into_response()
}

/// Answer a listing from the cache, or compute, cache and return it.
pub(crate) async fn serve_listing(
    state: &AppState,
    principal: &Principal,
    filter: ListFilter,
    query: &ListingQuery,
) -> Result<Response, ApiError> {
    let scope = ReadScope {
        filter,
        viewer: Viewer::of(principal),
    };
    let key = state.cache.key_for(&scope, query);

    if let Some(payload) = state.cache.get(&key).await {
        debug!(key = %key, "listing served from cache");
        return Ok(json_bytes(payload));
    }

    let (documents, total) = state.documents.list(&filter, query).await?;
    let views: Vec<DocumentView<'_>> = documents
        .iter()
        .map(|d| DocumentView::new(d, principal))
        .collect();
    let metadata = Metadata::calculate(total, query.page, query.page_size)
        .with_epoch(key.epoch().unwrap_or_default());

    let payload = serde_json::to_vec(&json!({
        "documents": views,
        "metadata": metadata,
    }))
    .map_err(ApiError::server_error)?;
    let payload = Bytes::from(payload);

    state.cache.put(&key, payload.clone()).await;
    Ok(json_bytes(payload))
}

/// `GET /v1/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ListingParams { query, owner }: ListingParams,
) -> Result<Response, ApiError> {
    let scope = match owner {
        OwnerParam::All => ListingScope::Public,
        OwnerParam::Me => ListingScope::Mine,
        OwnerParam::NotMe => ListingScope::Others,
    };
    let filter = list_filter(&principal, scope)?;
    serve_listing(&state, &principal, filter, &query).await
}

/// `GET /v1/document/:id`
pub async fn get_document(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    IdParam(id): IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.documents.get(DocumentId(id)).await?;
    if !can_read(&principal, &document) {
        return Err(ApiError::invalid_credentials());
    }
    Ok(Json(
        json!({ "document": DocumentView::new(&document, &principal) }),
    ))
}

/// The `metadata` part of an upload.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    body: Bytes,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "body is larger than the allowed limit")
    } else {
        ApiError::bad_request(e.body_text())
    }
}

/// Lowercased extension of `file_name`, with its leading dot.
pub fn filetype_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

/// Cut an ASCII file name to `max` bytes, keeping its extension when it fits.
fn truncate_name(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max => {
            format!("{}.{}", &stem[..max - ext.len() - 1], ext)
        }
        _ => name[..max].to_string(),
    }
}

/// Object key for an upload: a fresh UUID plus the sanitized file name,
/// shortened to fit the object store's key limit.
pub fn storage_key_for(file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let id = uuid::Uuid::now_v7().to_string();
    if sanitized.is_empty() {
        id
    } else {
        let name = truncate_name(sanitized, MAX_KEY_LEN - id.len() - 1);
        format!("{}-{}", id, name)
    }
}

/// `POST /v1/document` (multipart: `metadata` JSON part, `document` file part)
pub async fn add_document(
    State(state): State<AppState>,
    ActivatedUser(user): ActivatedUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut metadata = UploadMetadata::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "metadata" => {
                let raw = field.bytes().await.map_err(multipart_error)?;
                metadata = decode_json(&raw)?;
            }
            "document" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    body,
                });
            }
            other => {
                return Err(ApiError::bad_request(format!(
                    "body contains unknown part \"{}\"",
                    other
                )))
            }
        }
    }

    let mut errors = FieldErrors::new();
    let file = match file {
        Some(f) if !f.body.is_empty() => Some(f),
        Some(_) => {
            errors.add("document", "must not be empty");
            None
        }
        None => {
            errors.add("document", "must be provided");
            None
        }
    };
    let title = metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| file.as_ref().map(|f| f.file_name.clone()))
        .unwrap_or_default();
    errors.check(!title.is_empty(), "title", "must be provided");
    errors.check(title.chars().count() <= 500, "title", "must not be more than 500 characters long");
    errors.into_result()?;
    let Some(file) = file else {
        return Err(ApiError::server_error("validated upload without a file"));
    };

    let storage_key = storage_key_for(&file.file_name);
    let location = state
        .objects
        .put(&storage_key, &file.content_type, file.body)
        .await?;

    let new_document = NewDocument {
        owner_id: user.id,
        title,
        filetype: filetype_of(&file.file_name),
        tags: normalize_tags(&metadata.tags),
        storage_key: storage_key.clone(),
        location,
        visibility: Visibility::from_hidden(metadata.is_hidden),
    };
    let document = match state.documents.insert(new_document).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.objects.delete(&storage_key).await {
                warn!(key = %storage_key, error = %cleanup, "failed to remove orphaned object");
            }
            return Err(e.into());
        }
    };

    state.cache.invalidate_all().await;
    info!(document_id = %document.id, owner_id = %user.id, "document added");

    let principal = Principal::Authenticated(user);
    let location = format!("/v1/document/{}", document.id);
    let mut response = (
        StatusCode::CREATED,
        Json(json!({ "document": DocumentView::new(&document, &principal) })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    Ok(response)
}

/// Load a document the caller may mutate.
async fn load_for_mutation(
    state: &AppState,
    principal: &Principal,
    id: DocumentId,
) -> Result<Document, ApiError> {
    let document = state.documents.get(id).await?;
    if !can_mutate(principal, &document) {
        return Err(ApiError::invalid_credentials());
    }
    Ok(document)
}

/// `DELETE /v1/document/:id`
pub async fn delete_document(
    State(state): State<AppState>,
    ActivatedUser(user): ActivatedUser,
    IdParam(id): IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let principal = Principal::Authenticated(user);
    let document = load_for_mutation(&state, &principal, DocumentId(id)).await?;

    state.objects.delete(&document.storage_key).await?;
    match state.documents.delete(document.id).await {
        Ok(()) => {}
        // Lost a race with a concurrent delete
        Err(StoreError::NotFound) => return Err(ApiError::not_found()),
        Err(e) => return Err(e.into()),
    }

    state.cache.invalidate_all().await;
    info!(document_id = %document.id, "document deleted");
    Ok(Json(json!({ "message": "document successfully deleted" })))
}

/// `PATCH /v1/document/:id`: flip visibility.
pub async fn toggle_document(
    State(state): State<AppState>,
    ActivatedUser(user): ActivatedUser,
    IdParam(id): IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let principal = Principal::Authenticated(user);
    let document = load_for_mutation(&state, &principal, DocumentId(id)).await?;

    let document = state.documents.toggle_visibility(document.id).await?;
    state.cache.invalidate_all().await;

    info!(
        document_id = %document.id,
        hidden = document.visibility.is_hidden(),
        "document visibility toggled"
    );
    Ok(Json(
        json!({ "document": DocumentView::new(&document, &principal) }),
    ))
}
