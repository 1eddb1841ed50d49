use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::email::{
    completion_subject, render_completion, render_signature_request, signature_request_subject,
    CompletionEmail, SignatureRequestEmail,
};
use crate::error::{AppError, AppResult};
use crate::mailer::Mailer;
use crate::models::{Document, NewDocumentShare, Signatory};
use crate::registry::{self, SignatoryEntry};
use crate::store::{SignatureCommit, SigningStore};
use crate::tokens::TokenService;

/// One delivered (or deliverable) signing link, as returned to the sharing
/// UI. Recipients whose email failed do not appear in the result.
#[derive(Debug, Clone, Serialize)]
pub struct SigningLink {
    pub signatory_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureReceipt {
    pub signed_count: i32,
    pub signatories_count: i32,
    pub completed: bool,
}

/// Orchestrates the signing lifecycle: dispatching requests, committing
/// signature events, recomputing aggregate status, and notifying the owner on
/// completion. All persistence and mail goes through the injected ports.
#[derive(Clone)]
pub struct SigningWorkflow {
    store: Arc<dyn SigningStore>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenService,
    public_origin: String,
}

impl SigningWorkflow {
    pub fn new(
        store: Arc<dyn SigningStore>,
        mailer: Arc<dyn Mailer>,
        tokens: TokenService,
        public_origin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            tokens,
            public_origin: public_origin.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn signing_link(&self, document_id: Uuid, raw_token: &str) -> String {
        format!("{}/sign/{}/{}", self.public_origin, document_id, raw_token)
    }

    fn document_link(&self, document_id: Uuid) -> String {
        format!("{}/document/{}", self.public_origin, document_id)
    }

    /// Sends a signing request to each recipient. Recipients are processed
    /// independently: a failure for one is logged and skipped, never aborting
    /// the batch. The caller can compare input and output lengths to detect
    /// partial delivery.
    pub async fn dispatch_signing_requests(
        &self,
        document_id: Uuid,
        recipients: Vec<SignatoryEntry>,
        message: Option<&str>,
    ) -> AppResult<Vec<SigningLink>> {
        let document = self
            .store
            .document(document_id)
            .await?
            .ok_or_else(AppError::not_found)?;

        let mut links = Vec::new();
        for recipient in recipients {
            match self.dispatch_one(&document, &recipient, message).await {
                Ok(link) => links.push(link),
                Err(err) => {
                    warn!(
                        document_id = %document_id,
                        recipient = %recipient.email,
                        error = %err.message(),
                        "failed to send signing request, skipping recipient"
                    );
                }
            }
        }

        info!(
            document_id = %document_id,
            delivered = links.len(),
            "dispatched signing requests"
        );
        Ok(links)
    }

    async fn dispatch_one(
        &self,
        document: &Document,
        recipient: &SignatoryEntry,
        message: Option<&str>,
    ) -> AppResult<SigningLink> {
        let signatory = registry::ensure_signatory(&self.store, document.id, recipient).await?;

        let token = self.tokens.issue(document.id, signatory.id).await?;
        let link = self.signing_link(document.id, &token.token);

        let html = render_signature_request(&SignatureRequestEmail {
            document_name: &document.title,
            signatory_name: signatory.name.as_deref(),
            message,
            signing_link: &link,
        });
        self.mailer
            .send_email(
                &signatory.email,
                &signature_request_subject(&document.title),
                &html,
            )
            .await
            .map_err(AppError::internal)?;

        self.store
            .insert_share(NewDocumentShare {
                id: Uuid::new_v4(),
                document_id: document.id,
                recipient_email: signatory.email.clone(),
                shared_at: Utc::now().naive_utc(),
            })
            .await?;

        Ok(SigningLink {
            signatory_id: signatory.id,
            email: signatory.email.clone(),
            name: signatory.name.clone(),
            link,
        })
    }

    /// The commit step of a signing action. The caller must already have
    /// validated the token; this consumes it atomically with recording the
    /// signature and updating the aggregates, then fires the completion
    /// notice when this signature was the last one.
    pub async fn record_signature(
        &self,
        document_id: Uuid,
        signatory_id: Uuid,
        token_id: Uuid,
        signature_data: String,
        signature_type: crate::models::SignatureType,
    ) -> AppResult<SignatureReceipt> {
        if signature_data.trim().is_empty() {
            return Err(AppError::validation("a signature is required"));
        }

        let outcome = self
            .store
            .commit_signature(SignatureCommit {
                document_id,
                signatory_id,
                token_id,
                signature_data,
                signature_type: signature_type.as_str().to_string(),
                now: Utc::now().naive_utc(),
            })
            .await?;

        info!(
            document_id = %document_id,
            signatory_id = %signatory_id,
            signed_count = outcome.signed_count,
            signatories_count = outcome.signatories_count,
            "recorded signature"
        );

        if outcome.newly_completed {
            self.notify_owner_completed(document_id).await;
        }

        Ok(SignatureReceipt {
            signed_count: outcome.signed_count,
            signatories_count: outcome.signatories_count,
            completed: outcome.signed_count == outcome.signatories_count
                && outcome.signatories_count > 0,
        })
    }

    // Completion notice is at-least-once: a delivery failure is logged, never
    // propagated into the signer's response.
    async fn notify_owner_completed(&self, document_id: Uuid) {
        let result: AppResult<()> = async {
            let document = self
                .store
                .document(document_id)
                .await?
                .ok_or_else(AppError::not_found)?;
            let owner = self
                .store
                .user(document.user_id)
                .await?
                .ok_or_else(AppError::not_found)?;

            let html = render_completion(&CompletionEmail {
                document_name: &document.title,
                owner_name: Some(&owner.display_name()),
                document_link: &self.document_link(document_id),
            });
            self.mailer
                .send_email(&owner.email, &completion_subject(&document.title), &html)
                .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => info!(document_id = %document_id, "sent completion notice to owner"),
            Err(err) => warn!(
                document_id = %document_id,
                error = %err.message(),
                "failed to send completion notice"
            ),
        }
    }

    /// Re-sends a signing request to one signatory. Mints a brand-new token;
    /// outstanding tokens stay valid until their own expiry or consumption.
    pub async fn remind(
        &self,
        document_id: Uuid,
        signatory_id: Uuid,
        message: Option<&str>,
    ) -> AppResult<SigningLink> {
        let document = self
            .store
            .document(document_id)
            .await?
            .ok_or_else(AppError::not_found)?;
        let signatory = self
            .store
            .signatory(signatory_id)
            .await?
            .filter(|s| s.document_id == document_id)
            .ok_or_else(AppError::not_found)?;

        if signatory.signed {
            return Err(AppError::validation("signatory has already signed"));
        }

        let token = self.tokens.issue(document_id, signatory_id).await?;
        let link = self.signing_link(document_id, &token.token);

        let html = render_signature_request(&SignatureRequestEmail {
            document_name: &document.title,
            signatory_name: signatory.name.as_deref(),
            message,
            signing_link: &link,
        });
        self.mailer
            .send_email(
                &signatory.email,
                &signature_request_subject(&document.title),
                &html,
            )
            .await
            .map_err(AppError::internal)?;

        self.store
            .set_last_reminded(signatory_id, Utc::now().naive_utc())
            .await?;

        info!(
            document_id = %document_id,
            signatory_id = %signatory_id,
            "sent signing reminder"
        );

        Ok(SigningLink {
            signatory_id: signatory.id,
            email: signatory.email,
            name: signatory.name,
            link,
        })
    }
}

/// Loads the signing-page payload pieces a signer needs after token
/// validation: the document, their signatory record, and the field layout.
pub async fn signing_context(
    store: &Arc<dyn SigningStore>,
    document_id: Uuid,
    signatory_id: Uuid,
) -> AppResult<(Document, Signatory, Vec<crate::models::SignatureField>)> {
    let document = store
        .document(document_id)
        .await?
        .ok_or_else(AppError::not_found)?;
    let signatory = store
        .signatory(signatory_id)
        .await?
        .filter(|s| s.document_id == document_id)
        .ok_or_else(AppError::not_found)?;
    let fields = store.fields_for_document(document_id).await?;
    Ok((document, signatory, fields))
}
