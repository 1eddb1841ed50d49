use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Document, DocumentShare, DocumentStatus, DocumentView, NewDocument, NewDocumentShare,
    NewDocumentView, NewSignatureField, NewSignatory, NewSigningToken, NewUser, Signature,
    SignatureField, Signatory, SigningToken, User,
};
use crate::store::{
    CommitOutcome, DocumentSettings, SignatureCommit, SigningStore, StoreError, StoreResult,
};

/// In-memory signing store. Exists so the workflow engine and token service
/// can be exercised without a live Postgres; the integration tests run
/// entirely against it. One mutex over the whole state keeps every operation,
/// including the signature commit, atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    documents: Vec<Document>,
    signatories: Vec<Signatory>,
    fields: Vec<SignatureField>,
    tokens: Vec<SigningToken>,
    signatures: Vec<Signature>,
    views: Vec<DocumentView>,
    shares: Vec<DocumentShare>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[async_trait]
impl SigningStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.lock().await;
        // Mirrors the unique constraint on users.email.
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                user.email
            )));
        }
        let ts = now();
        let row = User {
            id: user.id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: ts,
            updated_at: ts,
        };
        inner.users.push(row.clone());
        Ok(row)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document> {
        let mut inner = self.inner.lock().await;
        let ts = now();
        let row = Document {
            id: document.id,
            title: document.title,
            user_id: document.user_id,
            file_path: document.file_path,
            status: document.status,
            signatories_count: document.signatories_count,
            signed_count: document.signed_count,
            expires_at: None,
            password_protected: false,
            publicly_viewable: false,
            created_at: ts,
            updated_at: ts,
        };
        inner.documents.push(row.clone());
        Ok(row)
    }

    async fn document(&self, id: Uuid) -> StoreResult<Option<Document>> {
        let inner = self.inner.lock().await;
        Ok(inner.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn documents_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Document>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Document> = inner
            .documents
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_document_settings(
        &self,
        id: Uuid,
        settings: DocumentSettings,
    ) -> StoreResult<Document> {
        let mut inner = self.inner.lock().await;
        let doc = inner
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound)?;
        doc.expires_at = settings.expires_at;
        doc.password_protected = settings.password_protected;
        doc.publicly_viewable = settings.publicly_viewable;
        doc.updated_at = now();
        Ok(doc.clone())
    }

    async fn set_signatories_count(&self, id: Uuid, count: i32) -> StoreResult<Document> {
        let mut inner = self.inner.lock().await;
        let doc = inner
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound)?;
        doc.signatories_count = count;
        doc.updated_at = now();
        Ok(doc.clone())
    }

    async fn insert_signatories(&self, rows: Vec<NewSignatory>) -> StoreResult<Vec<Signatory>> {
        let mut inner = self.inner.lock().await;
        // Mirrors the unique index on (document_id, lower(email)).
        let mut taken: HashSet<(Uuid, String)> = inner
            .signatories
            .iter()
            .map(|s| (s.document_id, s.email.to_lowercase()))
            .collect();
        for row in &rows {
            if !taken.insert((row.document_id, row.email.to_lowercase())) {
                return Err(StoreError::Conflict(format!(
                    "signatory '{}' already exists for this document",
                    row.email
                )));
            }
        }
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Signatory {
                id: row.id,
                document_id: row.document_id,
                email: row.email,
                name: row.name,
                signed: row.signed,
                signed_at: None,
                last_reminded_at: None,
                created_at: now(),
            };
            inner.signatories.push(record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn signatory(&self, id: Uuid) -> StoreResult<Option<Signatory>> {
        let inner = self.inner.lock().await;
        Ok(inner.signatories.iter().find(|s| s.id == id).cloned())
    }

    async fn signatories_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signatory>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .signatories
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn set_last_reminded(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let signatory = inner
            .signatories
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound)?;
        signatory.last_reminded_at = Some(at);
        Ok(())
    }

    async fn replace_fields(
        &self,
        document_id: Uuid,
        rows: Vec<NewSignatureField>,
    ) -> StoreResult<Vec<SignatureField>> {
        let mut inner = self.inner.lock().await;
        inner.fields.retain(|f| f.document_id != document_id);
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let record = SignatureField {
                id: row.id,
                document_id: row.document_id,
                signatory_id: row.signatory_id,
                x_position: row.x_position,
                y_position: row.y_position,
                page: row.page,
                field_type: row.field_type,
                value: row.value,
                width: row.width,
                height: row.height,
            };
            inner.fields.push(record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn fields_for_document(&self, document_id: Uuid) -> StoreResult<Vec<SignatureField>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .fields
            .iter()
            .filter(|f| f.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn insert_token(&self, token: NewSigningToken) -> StoreResult<SigningToken> {
        let mut inner = self.inner.lock().await;
        let row = SigningToken {
            id: token.id,
            token: token.token,
            document_id: token.document_id,
            signatory_id: token.signatory_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            used_at: None,
        };
        inner.tokens.push(row.clone());
        Ok(row)
    }

    async fn find_token(&self, document_id: Uuid, raw: &str) -> StoreResult<Option<SigningToken>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .iter()
            .find(|t| t.document_id == document_id && t.token == raw)
            .cloned())
    }

    async fn token(&self, id: Uuid) -> StoreResult<Option<SigningToken>> {
        let inner = self.inner.lock().await;
        Ok(inner.tokens.iter().find(|t| t.id == id).cloned())
    }

    async fn consume_token(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.tokens.iter_mut().find(|t| t.id == id) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(at);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound),
        }
    }

    async fn signatures_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signature>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Signature> = inner
            .signatures
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn commit_signature(&self, commit: SignatureCommit) -> StoreResult<CommitOutcome> {
        let mut inner = self.inner.lock().await;

        // There is no rollback here, so referential checks that Postgres
        // enforces via foreign keys have to pass before anything mutates.
        if !inner
            .signatories
            .iter()
            .any(|s| s.id == commit.signatory_id)
        {
            return Err(StoreError::NotFound);
        }
        if !inner.documents.iter().any(|d| d.id == commit.document_id) {
            return Err(StoreError::NotFound);
        }

        // Token CAS first; a lost race leaves the rest of the state untouched.
        match inner.tokens.iter_mut().find(|t| t.id == commit.token_id) {
            Some(token) if token.used_at.is_none() => token.used_at = Some(commit.now),
            Some(_) => return Err(StoreError::TokenUsed),
            None => return Err(StoreError::NotFound),
        }

        let signature = Signature {
            id: Uuid::new_v4(),
            signatory_id: commit.signatory_id,
            document_id: commit.document_id,
            signature_data: commit.signature_data,
            signature_type: commit.signature_type,
            created_at: commit.now,
        };
        inner.signatures.push(signature.clone());

        if let Some(signatory) = inner
            .signatories
            .iter_mut()
            .find(|s| s.id == commit.signatory_id)
        {
            if !signatory.signed {
                signatory.signed = true;
                signatory.signed_at = Some(commit.now);
            }
        }

        let signatories_count = inner
            .signatories
            .iter()
            .filter(|s| s.document_id == commit.document_id)
            .count() as i32;
        let signed_count = inner
            .signatories
            .iter()
            .filter(|s| s.document_id == commit.document_id && s.signed)
            .count() as i32;

        let doc = inner
            .documents
            .iter_mut()
            .find(|d| d.id == commit.document_id)
            .ok_or(StoreError::NotFound)?;
        let was_completed = doc.stored_status() == DocumentStatus::Completed;
        let completed = signatories_count > 0 && signed_count == signatories_count;
        doc.signatories_count = signatories_count;
        doc.signed_count = signed_count;
        doc.status = if completed {
            DocumentStatus::Completed.as_str().to_string()
        } else {
            DocumentStatus::Pending.as_str().to_string()
        };
        doc.updated_at = commit.now;

        Ok(CommitOutcome {
            signature,
            signed_count,
            signatories_count,
            newly_completed: completed && !was_completed,
        })
    }

    async fn insert_view(&self, view: NewDocumentView) -> StoreResult<DocumentView> {
        let mut inner = self.inner.lock().await;
        let row = DocumentView {
            id: view.id,
            document_id: view.document_id,
            viewer: view.viewer,
            viewed_at: view.viewed_at,
        };
        inner.views.push(row.clone());
        Ok(row)
    }

    async fn views_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentView>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<DocumentView> = inner
            .views
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.viewed_at.cmp(&b.viewed_at));
        Ok(rows)
    }

    async fn insert_share(&self, share: NewDocumentShare) -> StoreResult<DocumentShare> {
        let mut inner = self.inner.lock().await;
        let row = DocumentShare {
            id: share.id,
            document_id: share.document_id,
            recipient_email: share.recipient_email,
            shared_at: share.shared_at,
        };
        inner.shares.push(row.clone());
        Ok(row)
    }

    async fn shares_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentShare>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<DocumentShare> = inner
            .shares
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.shared_at.cmp(&b.shared_at));
        Ok(rows)
    }
}
