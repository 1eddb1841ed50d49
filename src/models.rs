use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;

/// Stored lifecycle state of a document. `Expired` is only authoritative when
/// written by an explicit settings change; readers should go through
/// [`Document::effective_status`], which applies the expiry gate at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Completed,
    Expired,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DocumentStatus::Pending),
            "completed" => Some(DocumentStatus::Completed),
            "expired" => Some(DocumentStatus::Expired),
            _ => None,
        }
    }
}

/// How a signature artifact was captured: drawn on the pad or typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    Draw,
    Type,
}

impl SignatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::Draw => "draw",
            SignatureType::Type => "type",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draw" => Some(SignatureType::Draw),
            "type" => Some(SignatureType::Type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Display name for email templates; falls back to the mailbox part of
    /// the address, as the original notification flow did.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or(&self.email)
                .to_string(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(User))]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub file_path: String,
    pub status: String,
    pub signatories_count: i32,
    pub signed_count: i32,
    pub expires_at: Option<NaiveDateTime>,
    pub password_protected: bool,
    pub publicly_viewable: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Document {
    pub fn stored_status(&self) -> DocumentStatus {
        DocumentStatus::parse(&self.status).unwrap_or(DocumentStatus::Pending)
    }

    /// Expiry is a read-time derivation: a past `expires_at` never beats a
    /// completed document, and is never swept into the stored column.
    pub fn effective_status(&self, now: NaiveDateTime) -> DocumentStatus {
        let stored = self.stored_status();
        if stored == DocumentStatus::Completed {
            return DocumentStatus::Completed;
        }
        match self.expires_at {
            Some(expires_at) if expires_at < now => DocumentStatus::Expired,
            _ => stored,
        }
    }

    /// A document with no signatories yet is a draft; this is derived, never
    /// stored, so a stale stored status cannot contradict the registry.
    pub fn is_draft(&self) -> bool {
        self.signatories_count == 0
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatories_count > 0 && self.signed_count == self.signatories_count
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub file_path: String,
    pub status: String,
    pub signatories_count: i32,
    pub signed_count: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = signatories)]
#[diesel(belongs_to(Document))]
pub struct Signatory {
    pub id: Uuid,
    pub document_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub signed: bool,
    pub signed_at: Option<NaiveDateTime>,
    pub last_reminded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Signatory {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.email.clone(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = signatories)]
pub struct NewSignatory {
    pub id: Uuid,
    pub document_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub signed: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = signature_fields)]
#[diesel(belongs_to(Document))]
pub struct SignatureField {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signatory_id: Option<Uuid>,
    pub x_position: f64,
    pub y_position: f64,
    pub page: i32,
    pub field_type: String,
    pub value: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = signature_fields)]
pub struct NewSignatureField {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signatory_id: Option<Uuid>,
    pub x_position: f64,
    pub y_position: f64,
    pub page: i32,
    pub field_type: String,
    pub value: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = signatures)]
#[diesel(belongs_to(Document))]
#[diesel(belongs_to(Signatory))]
pub struct Signature {
    pub id: Uuid,
    pub signatory_id: Uuid,
    pub document_id: Uuid,
    pub signature_data: String,
    pub signature_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = signatures)]
pub struct NewSignature {
    pub id: Uuid,
    pub signatory_id: Uuid,
    pub document_id: Uuid,
    pub signature_data: String,
    pub signature_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = signing_tokens)]
#[diesel(belongs_to(Document))]
#[diesel(belongs_to(Signatory))]
pub struct SigningToken {
    pub id: Uuid,
    pub token: String,
    pub document_id: Uuid,
    pub signatory_id: Uuid,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub used_at: Option<NaiveDateTime>,
}

impl SigningToken {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at < now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = signing_tokens)]
pub struct NewSigningToken {
    pub id: Uuid,
    pub token: String,
    pub document_id: Uuid,
    pub signatory_id: Uuid,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_views)]
#[diesel(belongs_to(Document))]
pub struct DocumentView {
    pub id: Uuid,
    pub document_id: Uuid,
    pub viewer: Option<String>,
    pub viewed_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_views)]
pub struct NewDocumentView {
    pub id: Uuid,
    pub document_id: Uuid,
    pub viewer: Option<String>,
    pub viewed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_shares)]
#[diesel(belongs_to(Document))]
pub struct DocumentShare {
    pub id: Uuid,
    pub document_id: Uuid,
    pub recipient_email: String,
    pub shared_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_shares)]
pub struct NewDocumentShare {
    pub id: Uuid,
    pub document_id: Uuid,
    pub recipient_email: String,
    pub shared_at: NaiveDateTime,
}
