use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::SigningStore;

pub const EVENT_CREATED: &str = "Document Created";
pub const EVENT_SENT: &str = "Document Sent";
pub const EVENT_VIEWED: &str = "Document Viewed";
pub const EVENT_SIGNED: &str = "Document Signed";

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub timestamp: NaiveDateTime,
    pub user: String,
    pub details: String,
}

// Tie-break rank for identical timestamps: creation precedes everything, a
// send precedes the view it caused, a view precedes the signature.
fn rank(event: &str) -> u8 {
    match event {
        EVENT_CREATED => 0,
        EVENT_SENT => 1,
        EVENT_VIEWED => 2,
        _ => 3,
    }
}

/// Reconstructs the chronological history of a document from four event
/// sources: its own creation, the share log, the view log, and the signature
/// artifacts. Read-only; sources with no entries simply contribute nothing.
pub async fn build_audit_trail(
    store: &Arc<dyn SigningStore>,
    document_id: Uuid,
) -> AppResult<Vec<AuditEvent>> {
    let document = store
        .document(document_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let mut events = vec![AuditEvent {
        event: EVENT_CREATED,
        timestamp: document.created_at,
        user: "Owner".to_string(),
        details: format!("Document \"{}\" was created", document.title),
    }];

    for share in store.shares_for_document(document_id).await? {
        events.push(AuditEvent {
            event: EVENT_SENT,
            timestamp: share.shared_at,
            user: "Owner".to_string(),
            details: format!("Signing request sent to {}", share.recipient_email),
        });
    }

    for view in store.views_for_document(document_id).await? {
        let viewer = view.viewer.unwrap_or_else(|| "Anonymous".to_string());
        events.push(AuditEvent {
            event: EVENT_VIEWED,
            timestamp: view.viewed_at,
            user: viewer.clone(),
            details: format!("Document viewed by {viewer}"),
        });
    }

    let signatories: HashMap<Uuid, String> = store
        .signatories_for_document(document_id)
        .await?
        .into_iter()
        .map(|s| (s.id, s.display_name()))
        .collect();
    for signature in store.signatures_for_document(document_id).await? {
        let signer = signatories
            .get(&signature.signatory_id)
            .cloned()
            .unwrap_or_else(|| "Unknown signer".to_string());
        events.push(AuditEvent {
            event: EVENT_SIGNED,
            timestamp: signature.created_at,
            user: signer.clone(),
            details: format!("Signed by {signer}"),
        });
    }

    // Stable total order: ascending timestamp, ties broken by source rank.
    events.sort_by_key(|e| (e.timestamp, rank(e.event)));
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_outranks_everything_on_equal_timestamps() {
        assert!(rank(EVENT_CREATED) < rank(EVENT_SENT));
        assert!(rank(EVENT_SENT) < rank(EVENT_VIEWED));
        assert!(rank(EVENT_VIEWED) < rank(EVENT_SIGNED));
    }
}
