use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewSignatory, Signatory};
use crate::store::SigningStore;

/// One recipient as submitted by the share dialog.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatoryEntry {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// RFC-lite shape check, matching what the sharing UI enforced: one `@`, a
/// non-empty local part, and a dotted domain without whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let mut labels = domain.split('.');
    labels.clone().count() >= 2 && labels.all(|label| !label.is_empty())
}

/// Adds a batch of signatories to a document. Emails are validated up front
/// (nothing persisted on a malformed entry), duplicates are silently dropped
/// both against existing rows and within the batch, comparing
/// case-insensitively. The document's `signatories_count` is recounted from
/// the registry afterwards.
pub async fn add_signatories(
    store: &Arc<dyn SigningStore>,
    document_id: Uuid,
    entries: Vec<SignatoryEntry>,
) -> AppResult<Vec<Signatory>> {
    for entry in &entries {
        if !is_valid_email(&entry.email) {
            return Err(AppError::validation(format!(
                "'{}' is not a valid email address",
                entry.email
            )));
        }
    }

    let existing = store.signatories_for_document(document_id).await?;
    let mut seen: HashSet<String> = existing.iter().map(|s| s.email.to_lowercase()).collect();

    let mut rows = Vec::new();
    for entry in entries {
        let email = entry.email.trim().to_string();
        if !seen.insert(email.to_lowercase()) {
            continue;
        }
        rows.push(NewSignatory {
            id: Uuid::new_v4(),
            document_id,
            email,
            name: entry.name.filter(|n| !n.trim().is_empty()),
            signed: false,
        });
    }

    let inserted = store.insert_signatories(rows).await?;

    let total = store.signatories_for_document(document_id).await?.len() as i32;
    store.set_signatories_count(document_id, total).await?;

    Ok(inserted)
}

/// Finds the signatory with this email (case-insensitive) or creates one,
/// keeping the document's count in step. Dispatch resolves each recipient
/// through here.
pub async fn ensure_signatory(
    store: &Arc<dyn SigningStore>,
    document_id: Uuid,
    entry: &SignatoryEntry,
) -> AppResult<Signatory> {
    if !is_valid_email(&entry.email) {
        return Err(AppError::validation(format!(
            "'{}' is not a valid email address",
            entry.email
        )));
    }

    let wanted = entry.email.trim().to_lowercase();
    let existing = store.signatories_for_document(document_id).await?;
    if let Some(found) = existing
        .into_iter()
        .find(|s| s.email.to_lowercase() == wanted)
    {
        return Ok(found);
    }

    let inserted = store
        .insert_signatories(vec![NewSignatory {
            id: Uuid::new_v4(),
            document_id,
            email: entry.email.trim().to_string(),
            name: entry.name.clone().filter(|n| !n.trim().is_empty()),
            signed: false,
        }])
        .await?;

    let total = store.signatories_for_document(document_id).await?.len() as i32;
    store.set_signatories_count(document_id, total).await?;

    inserted
        .into_iter()
        .next()
        .ok_or_else(|| AppError::persistence("signatory insert returned no row"))
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x..com"));
    }
}
