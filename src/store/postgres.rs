use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::{
    Document, DocumentShare, DocumentStatus, DocumentView, NewDocument, NewDocumentShare,
    NewDocumentView, NewSignature, NewSignatureField, NewSignatory, NewSigningToken, NewUser,
    Signature, SignatureField, Signatory, SigningToken, User,
};
use crate::schema::{
    document_shares, document_views, documents, signatories, signature_fields, signatures,
    signing_tokens, users,
};
use crate::store::{
    CommitOutcome, DocumentSettings, SignatureCommit, SigningStore, StoreError, StoreResult,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Diesel-backed implementation of the signing store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| StoreError::Database(format!("database pool error: {err}")))
    }
}

fn order_by_ids<T, F>(rows: Vec<T>, ids: &[Uuid], id_of: F) -> Vec<T>
where
    F: Fn(&T) -> Uuid,
{
    let mut by_id: std::collections::HashMap<Uuid, T> =
        rows.into_iter().map(|row| (id_of(&row), row)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[async_trait]
impl SigningStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.conn()?;
        diesel::insert_into(users::table)
            .values(&user)
            .execute(&mut conn)?;
        let row = users::table.find(user.id).first(&mut conn)?;
        Ok(row)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        let row = users::table.find(id).first(&mut conn).optional()?;
        Ok(row)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        let row = users::table
            .filter(users::email.eq(email))
            .first(&mut conn)
            .optional()?;
        Ok(row)
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document> {
        let mut conn = self.conn()?;
        diesel::insert_into(documents::table)
            .values(&document)
            .execute(&mut conn)?;
        let row = documents::table.find(document.id).first(&mut conn)?;
        Ok(row)
    }

    async fn document(&self, id: Uuid) -> StoreResult<Option<Document>> {
        let mut conn = self.conn()?;
        let row = documents::table.find(id).first(&mut conn).optional()?;
        Ok(row)
    }

    async fn documents_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Document>> {
        let mut conn = self.conn()?;
        let rows = documents::table
            .filter(documents::user_id.eq(user_id))
            .order(documents::created_at.desc())
            .load(&mut conn)?;
        Ok(rows)
    }

    async fn set_document_settings(
        &self,
        id: Uuid,
        settings: DocumentSettings,
    ) -> StoreResult<Document> {
        let mut conn = self.conn()?;
        let updated = diesel::update(documents::table.find(id))
            .set((
                documents::expires_at.eq(settings.expires_at),
                documents::password_protected.eq(settings.password_protected),
                documents::publicly_viewable.eq(settings.publicly_viewable),
                documents::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        let row = documents::table.find(id).first(&mut conn)?;
        Ok(row)
    }

    async fn set_signatories_count(&self, id: Uuid, count: i32) -> StoreResult<Document> {
        let mut conn = self.conn()?;
        let updated = diesel::update(documents::table.find(id))
            .set((
                documents::signatories_count.eq(count),
                documents::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        let row = documents::table.find(id).first(&mut conn)?;
        Ok(row)
    }

    async fn insert_signatories(&self, rows: Vec<NewSignatory>) -> StoreResult<Vec<Signatory>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        diesel::insert_into(signatories::table)
            .values(&rows)
            .execute(&mut conn)?;
        let inserted: Vec<Signatory> = signatories::table
            .filter(signatories::id.eq_any(&ids))
            .load(&mut conn)?;
        Ok(order_by_ids(inserted, &ids, |row| row.id))
    }

    async fn signatory(&self, id: Uuid) -> StoreResult<Option<Signatory>> {
        let mut conn = self.conn()?;
        let row = signatories::table.find(id).first(&mut conn).optional()?;
        Ok(row)
    }

    async fn signatories_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signatory>> {
        let mut conn = self.conn()?;
        let rows = signatories::table
            .filter(signatories::document_id.eq(document_id))
            .order(signatories::created_at.asc())
            .load(&mut conn)?;
        Ok(rows)
    }

    async fn set_last_reminded(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(signatories::table.find(id))
            .set(signatories::last_reminded_at.eq(at))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_fields(
        &self,
        document_id: Uuid,
        rows: Vec<NewSignatureField>,
    ) -> StoreResult<Vec<SignatureField>> {
        let mut conn = self.conn()?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        // Delete + insert must not leave a field-loss window.
        conn.transaction::<_, StoreError, _>(|conn| {
            diesel::delete(
                signature_fields::table.filter(signature_fields::document_id.eq(document_id)),
            )
            .execute(conn)?;
            if !rows.is_empty() {
                diesel::insert_into(signature_fields::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(())
        })?;
        let inserted: Vec<SignatureField> = signature_fields::table
            .filter(signature_fields::id.eq_any(&ids))
            .load(&mut conn)?;
        Ok(order_by_ids(inserted, &ids, |row| row.id))
    }

    async fn fields_for_document(&self, document_id: Uuid) -> StoreResult<Vec<SignatureField>> {
        let mut conn = self.conn()?;
        let rows = signature_fields::table
            .filter(signature_fields::document_id.eq(document_id))
            .order((signature_fields::page.asc(), signature_fields::y_position.asc()))
            .load(&mut conn)?;
        Ok(rows)
    }

    async fn insert_token(&self, token: NewSigningToken) -> StoreResult<SigningToken> {
        let mut conn = self.conn()?;
        diesel::insert_into(signing_tokens::table)
            .values(&token)
            .execute(&mut conn)?;
        let row = signing_tokens::table.find(token.id).first(&mut conn)?;
        Ok(row)
    }

    async fn find_token(&self, document_id: Uuid, raw: &str) -> StoreResult<Option<SigningToken>> {
        let mut conn = self.conn()?;
        let row = signing_tokens::table
            .filter(signing_tokens::token.eq(raw))
            .filter(signing_tokens::document_id.eq(document_id))
            .first(&mut conn)
            .optional()?;
        Ok(row)
    }

    async fn token(&self, id: Uuid) -> StoreResult<Option<SigningToken>> {
        let mut conn = self.conn()?;
        let row = signing_tokens::table.find(id).first(&mut conn).optional()?;
        Ok(row)
    }

    async fn consume_token(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            signing_tokens::table
                .find(id)
                .filter(signing_tokens::used_at.is_null()),
        )
        .set(signing_tokens::used_at.eq(at))
        .execute(&mut conn)?;
        Ok(updated == 1)
    }

    async fn signatures_for_document(&self, document_id: Uuid) -> StoreResult<Vec<Signature>> {
        let mut conn = self.conn()?;
        let rows = signatures::table
            .filter(signatures::document_id.eq(document_id))
            .order(signatures::created_at.asc())
            .load(&mut conn)?;
        Ok(rows)
    }

    async fn commit_signature(&self, commit: SignatureCommit) -> StoreResult<CommitOutcome> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            // The token CAS is the concurrency control for the whole commit:
            // the losing caller rolls back with nothing applied.
            let consumed = diesel::update(
                signing_tokens::table
                    .find(commit.token_id)
                    .filter(signing_tokens::used_at.is_null()),
            )
            .set(signing_tokens::used_at.eq(commit.now))
            .execute(conn)?;
            if consumed == 0 {
                let known: i64 = signing_tokens::table
                    .find(commit.token_id)
                    .count()
                    .get_result(conn)?;
                return Err(if known > 0 {
                    StoreError::TokenUsed
                } else {
                    StoreError::NotFound
                });
            }

            let new_signature = NewSignature {
                id: Uuid::new_v4(),
                signatory_id: commit.signatory_id,
                document_id: commit.document_id,
                signature_data: commit.signature_data.clone(),
                signature_type: commit.signature_type.clone(),
                created_at: commit.now,
            };
            diesel::insert_into(signatures::table)
                .values(&new_signature)
                .execute(conn)?;
            let signature: Signature = signatures::table.find(new_signature.id).first(conn)?;

            // Monotonic: an already-signed signatory keeps its original
            // signed_at.
            diesel::update(
                signatories::table
                    .find(commit.signatory_id)
                    .filter(signatories::signed.eq(false)),
            )
            .set((
                signatories::signed.eq(true),
                signatories::signed_at.eq(commit.now),
            ))
            .execute(conn)?;

            // Full recount rather than an increment, so repeated or
            // concurrent events converge on the registry's truth.
            let signatories_count: i64 = signatories::table
                .filter(signatories::document_id.eq(commit.document_id))
                .count()
                .get_result(conn)?;
            let signed_count: i64 = signatories::table
                .filter(signatories::document_id.eq(commit.document_id))
                .filter(signatories::signed.eq(true))
                .count()
                .get_result(conn)?;

            let document: Document = documents::table.find(commit.document_id).first(conn)?;
            let was_completed = document.stored_status() == DocumentStatus::Completed;
            let completed = signatories_count > 0 && signed_count == signatories_count;
            let status = if completed {
                DocumentStatus::Completed
            } else {
                DocumentStatus::Pending
            };

            diesel::update(documents::table.find(commit.document_id))
                .set((
                    documents::signatories_count.eq(signatories_count as i32),
                    documents::signed_count.eq(signed_count as i32),
                    documents::status.eq(status.as_str()),
                    documents::updated_at.eq(commit.now),
                ))
                .execute(conn)?;

            Ok(CommitOutcome {
                signature,
                signed_count: signed_count as i32,
                signatories_count: signatories_count as i32,
                newly_completed: completed && !was_completed,
            })
        })
    }

    async fn insert_view(&self, view: NewDocumentView) -> StoreResult<DocumentView> {
        let mut conn = self.conn()?;
        diesel::insert_into(document_views::table)
            .values(&view)
            .execute(&mut conn)?;
        let row = document_views::table.find(view.id).first(&mut conn)?;
        Ok(row)
    }

    async fn views_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentView>> {
        let mut conn = self.conn()?;
        let rows = document_views::table
            .filter(document_views::document_id.eq(document_id))
            .order(document_views::viewed_at.asc())
            .load(&mut conn)?;
        Ok(rows)
    }

    async fn insert_share(&self, share: NewDocumentShare) -> StoreResult<DocumentShare> {
        let mut conn = self.conn()?;
        diesel::insert_into(document_shares::table)
            .values(&share)
            .execute(&mut conn)?;
        let row = document_shares::table.find(share.id).first(&mut conn)?;
        Ok(row)
    }

    async fn shares_for_document(&self, document_id: Uuid) -> StoreResult<Vec<DocumentShare>> {
        let mut conn = self.conn()?;
        let rows = document_shares::table
            .filter(document_shares::document_id.eq(document_id))
            .order(document_shares::shared_at.asc())
            .load(&mut conn)?;
        Ok(rows)
    }
}
