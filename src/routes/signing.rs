use axum::extract::{Json, Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DocumentStatus, NewDocumentView, SignatureType};
use crate::routes::documents::{format_ts, FieldResponse};
use crate::state::AppState;
use crate::workflow::{signing_context, SignatureReceipt};

#[derive(Serialize)]
pub struct SigningPageResponse {
    pub token_id: Uuid,
    pub document: SigningDocumentResponse,
    pub signatory: SigningSignatoryResponse,
    pub fields: Vec<FieldResponse>,
}

#[derive(Serialize)]
pub struct SigningDocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub file_path: String,
    pub status: DocumentStatus,
}

#[derive(Serialize)]
pub struct SigningSignatoryResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub signed: bool,
    pub signed_at: Option<String>,
}

/// Loads everything a signer needs, authorized purely by the token in the
/// link. Also appends a view-log entry for the audit trail.
pub async fn signing_page(
    State(state): State<AppState>,
    Path((document_id, raw_token)): Path<(Uuid, String)>,
) -> AppResult<Json<SigningPageResponse>> {
    let token = state
        .token_service()
        .validate(document_id, &raw_token)
        .await?;

    let (document, signatory, fields) =
        signing_context(&state.store, document_id, token.signatory_id).await?;

    state
        .store
        .insert_view(NewDocumentView {
            id: Uuid::new_v4(),
            document_id,
            viewer: Some(signatory.email.clone()),
            viewed_at: Utc::now().naive_utc(),
        })
        .await?;

    let now = Utc::now().naive_utc();
    Ok(Json(SigningPageResponse {
        token_id: token.id,
        document: SigningDocumentResponse {
            id: document.id,
            status: document.effective_status(now),
            title: document.title,
            file_path: document.file_path,
        },
        signatory: SigningSignatoryResponse {
            id: signatory.id,
            email: signatory.email,
            name: signatory.name,
            signed: signatory.signed,
            signed_at: signatory.signed_at.map(format_ts),
        },
        fields: fields.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Deserialize)]
pub struct SubmitSignatureRequest {
    pub signature_data: String,
    pub signature_type: SignatureType,
}

/// Commit step: re-validates the token from the link, then records the
/// signature, consuming the token atomically with the state update.
pub async fn submit_signature(
    State(state): State<AppState>,
    Path((document_id, raw_token)): Path<(Uuid, String)>,
    Json(payload): Json<SubmitSignatureRequest>,
) -> AppResult<Json<SignatureReceipt>> {
    let token = state
        .token_service()
        .validate(document_id, &raw_token)
        .await?;

    let receipt = state
        .workflow()
        .record_signature(
            document_id,
            token.signatory_id,
            token.id,
            payload.signature_data,
            payload.signature_type,
        )
        .await?;

    info!(
        document_id = %document_id,
        signatory_id = %token.signatory_id,
        completed = receipt.completed,
        "signature submitted"
    );
    Ok(Json(receipt))
}
