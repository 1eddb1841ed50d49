use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{build_audit_trail, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::fields::{self, FieldSpec};
use crate::models::{Document, DocumentStatus, NewDocument, NewDocumentView, SignatureField, Signatory};
use crate::registry::{self, SignatoryEntry};
use crate::state::AppState;
use crate::workflow::SigningLink;

pub fn format_ts(ts: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc).to_rfc3339()
}

#[derive(Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub file_path: String,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub file_path: String,
    /// Effective status: stored status with the expiry gate applied.
    pub status: DocumentStatus,
    pub draft: bool,
    pub signatories_count: i32,
    pub signed_count: i32,
    pub expires_at: Option<String>,
    pub password_protected: bool,
    pub publicly_viewable: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: doc.id,
            status: doc.effective_status(now),
            draft: doc.is_draft(),
            expires_at: doc.expires_at.map(format_ts),
            created_at: format_ts(doc.created_at),
            updated_at: format_ts(doc.updated_at),
            title: doc.title,
            file_path: doc.file_path,
            signatories_count: doc.signatories_count,
            signed_count: doc.signed_count,
            password_protected: doc.password_protected,
            publicly_viewable: doc.publicly_viewable,
        }
    }
}

#[derive(Serialize)]
pub struct SignatoryResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub signed: bool,
    pub signed_at: Option<String>,
    pub last_reminded_at: Option<String>,
}

impl From<Signatory> for SignatoryResponse {
    fn from(signatory: Signatory) -> Self {
        Self {
            id: signatory.id,
            email: signatory.email,
            name: signatory.name,
            signed: signatory.signed,
            signed_at: signatory.signed_at.map(format_ts),
            last_reminded_at: signatory.last_reminded_at.map(format_ts),
        }
    }
}

#[derive(Serialize)]
pub struct FieldResponse {
    pub id: Uuid,
    pub signatory_id: Option<Uuid>,
    pub x: f64,
    pub y: f64,
    pub page: i32,
    pub field_type: String,
    pub value: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl From<SignatureField> for FieldResponse {
    fn from(field: SignatureField) -> Self {
        Self {
            id: field.id,
            signatory_id: field.signatory_id,
            x: field.x_position,
            y: field.y_position,
            page: field.page,
            field_type: field.field_type,
            value: field.value,
            width: field.width,
            height: field.height,
        }
    }
}

#[derive(Serialize)]
pub struct DocumentDetailResponse {
    pub document: DocumentResponse,
    pub signatories: Vec<SignatoryResponse>,
    pub fields: Vec<FieldResponse>,
}

async fn load_owned_document(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> AppResult<Document> {
    let document = state
        .store
        .document(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    // Foreign documents look like missing ones.
    if document.user_id != user.user_id {
        return Err(AppError::not_found());
    }
    Ok(document)
}

pub async fn create_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("a document title is required"));
    }
    if payload.file_path.trim().is_empty() {
        return Err(AppError::validation("a file path is required"));
    }

    let document = state
        .store
        .insert_document(NewDocument {
            id: Uuid::new_v4(),
            title: title.to_string(),
            user_id: user.user_id,
            file_path: payload.file_path.trim().to_string(),
            status: DocumentStatus::Pending.as_str().to_string(),
            signatories_count: 0,
            signed_count: 0,
        })
        .await?;

    info!(document_id = %document.id, owner = %user.email, "created document");
    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<DocumentResponse>>> {
    let documents = state.store.documents_for_user(user.user_id).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentDetailResponse>> {
    let document = load_owned_document(&state, &user, id).await?;
    let signatories = state.store.signatories_for_document(id).await?;
    let fields = state.store.fields_for_document(id).await?;

    Ok(Json(DocumentDetailResponse {
        document: document.into(),
        signatories: signatories.into_iter().map(Into::into).collect(),
        fields: fields.into_iter().map(Into::into).collect(),
    }))
}

// Distinguishes an omitted key (keep current) from an explicit null (clear).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct UpdateDocumentRequest {
    /// Omitted: keep current. `null`: clear the deadline. Value: set it.
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub password_protected: Option<bool>,
    #[serde(default)]
    pub publicly_viewable: Option<bool>,
}

pub async fn update_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let document = load_owned_document(&state, &user, id).await?;

    let expires_at = match payload.expires_at {
        Some(value) => value.map(|dt| dt.naive_utc()),
        None => document.expires_at,
    };
    let settings = crate::store::DocumentSettings {
        expires_at,
        password_protected: payload
            .password_protected
            .unwrap_or(document.password_protected),
        publicly_viewable: payload
            .publicly_viewable
            .unwrap_or(document.publicly_viewable),
    };

    let updated = state.store.set_document_settings(id, settings).await?;
    Ok(Json(updated.into()))
}

#[derive(Serialize)]
pub struct AuditTrailResponse {
    pub events: Vec<AuditEventResponse>,
}

#[derive(Serialize)]
pub struct AuditEventResponse {
    pub event: &'static str,
    pub timestamp: String,
    pub user: String,
    pub details: String,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(event: AuditEvent) -> Self {
        Self {
            event: event.event,
            timestamp: format_ts(event.timestamp),
            user: event.user,
            details: event.details,
        }
    }
}

pub async fn audit_trail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AuditTrailResponse>> {
    load_owned_document(&state, &user, id).await?;
    let events = build_audit_trail(&state.store, id).await?;
    Ok(Json(AuditTrailResponse {
        events: events.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Deserialize)]
pub struct ReplaceFieldsRequest {
    pub fields: Vec<FieldSpec>,
}

pub async fn replace_fields(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceFieldsRequest>,
) -> AppResult<Json<Vec<FieldResponse>>> {
    load_owned_document(&state, &user, id).await?;
    let saved = fields::replace_fields(&state.store, id, payload.fields).await?;
    Ok(Json(saved.into_iter().map(Into::into).collect()))
}

pub async fn list_fields(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<FieldResponse>>> {
    load_owned_document(&state, &user, id).await?;
    let fields = state.store.fields_for_document(id).await?;
    Ok(Json(fields.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct AddSignatoriesRequest {
    pub signatories: Vec<SignatoryEntry>,
}

pub async fn add_signatories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddSignatoriesRequest>,
) -> AppResult<Json<Vec<SignatoryResponse>>> {
    load_owned_document(&state, &user, id).await?;
    let inserted = registry::add_signatories(&state.store, id, payload.signatories).await?;
    Ok(Json(inserted.into_iter().map(Into::into).collect()))
}

pub async fn list_signatories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<SignatoryResponse>>> {
    load_owned_document(&state, &user, id).await?;
    let signatories = state.store.signatories_for_document(id).await?;
    Ok(Json(signatories.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub recipients: Vec<SignatoryEntry>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub links: Vec<SigningLink>,
    pub requested: usize,
}

pub async fn send_signing_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendRequest>,
) -> AppResult<Json<SendResponse>> {
    load_owned_document(&state, &user, id).await?;
    if payload.recipients.is_empty() {
        return Err(AppError::validation("at least one recipient is required"));
    }

    let requested = payload.recipients.len();
    let links = state
        .workflow()
        .dispatch_signing_requests(id, payload.recipients, payload.message.as_deref())
        .await?;
    Ok(Json(SendResponse { links, requested }))
}

#[derive(Deserialize)]
pub struct RemindRequest {
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn remind_signatory(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, signatory_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RemindRequest>,
) -> AppResult<Json<SigningLink>> {
    load_owned_document(&state, &user, id).await?;
    let link = state
        .workflow()
        .remind(id, signatory_id, payload.message.as_deref())
        .await?;
    Ok(Json(link))
}

#[derive(Deserialize)]
pub struct RecordViewRequest {
    #[serde(default)]
    pub viewer: Option<String>,
}

pub async fn record_view(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordViewRequest>,
) -> AppResult<StatusCode> {
    load_owned_document(&state, &user, id).await?;
    state
        .store
        .insert_view(NewDocumentView {
            id: Uuid::new_v4(),
            document_id: id,
            viewer: payload.viewer.or(Some(user.email)),
            viewed_at: Utc::now().naive_utc(),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
