pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Document, DocumentShare, DocumentView, NewDocument, NewDocumentShare, NewDocumentView,
    NewSignatureField, NewSignatory, NewSigningToken, NewUser, Signature, SignatureField,
    Signatory, SigningToken, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("signing token already used")]
    TokenUsed,
    #[error("conflicts with an existing record: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};
        match value {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Expiry/access-control attributes an owner can change after creation.
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub expires_at: Option<NaiveDateTime>,
    pub password_protected: bool,
    pub publicly_viewable: bool,
}

/// Everything needed to commit one signing event atomically.
#[derive(Debug, Clone)]
pub struct SignatureCommit {
    pub document_id: Uuid,
    pub signatory_id: Uuid,
    pub token_id: Uuid,
    pub signature_data: String,
    pub signature_type: String,
    pub now: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub signature: Signature,
    pub signed_count: i32,
    pub signatories_count: i32,
    /// True when this commit moved the document from pending to completed.
    pub newly_completed: bool,
}

/// Persistence port for the signing core. Injected into the token service and
/// workflow engine so tests can substitute [`MemoryStore`] for Postgres.
#[async_trait]
pub trait SigningStore: Send + Sync + 'static {
    // users
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    // documents
    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document>;
    async fn document(&self, id: Uuid) -> StoreResult<Option<Document>>;
    async fn documents_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Document>>;
    async fn set_document_settings(
        &self,
        id: Uuid,
        settings: DocumentSettings,
    ) -> StoreResult<Document>;
    async fn set_signatories_count(&self, id: Uuid, count: i32) -> StoreResult<Document>;

    // signatories
    async fn insert_signatories(&self, rows: Vec<NewSignatory>) -> StoreResult<Vec<Signatory>>;
    async fn signatory(&self, id: Uuid) -> StoreResult<Option<Signatory>>;
    async fn signatories_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signatory>>;
    async fn set_last_reminded(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()>;

    // fields: whole-collection replacement, delete + insert in one transaction
    async fn replace_fields(
        &self,
        document_id: Uuid,
        rows: Vec<NewSignatureField>,
    ) -> StoreResult<Vec<SignatureField>>;
    async fn fields_for_document(&self, document_id: Uuid) -> StoreResult<Vec<SignatureField>>;

    // signing tokens
    async fn insert_token(&self, token: NewSigningToken) -> StoreResult<SigningToken>;
    async fn find_token(&self, document_id: Uuid, raw: &str) -> StoreResult<Option<SigningToken>>;
    async fn token(&self, id: Uuid) -> StoreResult<Option<SigningToken>>;
    /// Compare-and-set on `used_at IS NULL`. Returns false when another
    /// caller consumed the token first.
    async fn consume_token(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool>;

    // signatures
    async fn signatures_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signature>>;

    /// Single transaction: insert the signature artifact, mark the signatory
    /// signed, consume the token (aborting the whole commit when the CAS
    /// loses), recount `signed_count` from the registry, and recompute the
    /// document status.
    async fn commit_signature(&self, commit: SignatureCommit) -> StoreResult<CommitOutcome>;

    // audit sources
    async fn insert_view(&self, view: NewDocumentView) -> StoreResult<DocumentView>;
    async fn views_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentView>>;
    async fn insert_share(&self, share: NewDocumentShare) -> StoreResult<DocumentShare>;
    async fn shares_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentShare>>;
}
