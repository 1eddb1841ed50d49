use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewSigningToken, SigningToken};
use crate::store::{SigningStore, StoreError};

pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing token not found")]
    NotFound,
    #[error("signing token expired")]
    Expired,
    #[error("signing token already used")]
    AlreadyUsed,
    #[error("document is past its signing deadline")]
    DocumentExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Issues, validates, and consumes single-use signing tokens. A token is the
/// sole authorization for the public signing page; no login is involved.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn SigningStore>,
    validity: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn SigningStore>, validity_days: i64) -> Self {
        Self {
            store,
            validity: Duration::days(validity_days.max(1)),
        }
    }

    /// Mints a fresh token for one signatory of one document. Re-issuing does
    /// not revoke earlier tokens; each expires or is consumed on its own.
    pub async fn issue(&self, document_id: Uuid, signatory_id: Uuid) -> TokenResult<SigningToken> {
        let now = Utc::now().naive_utc();
        let token = NewSigningToken {
            id: Uuid::new_v4(),
            token: generate_token(),
            document_id,
            signatory_id,
            created_at: now,
            expires_at: now + self.validity,
        };
        let issued = self.store.insert_token(token).await?;
        Ok(issued)
    }

    /// Looks up the raw token for this document and checks every gate that
    /// must hold before a signer may proceed: the token exists, has not
    /// expired, has not been consumed, and the document itself is not past
    /// its signing deadline.
    pub async fn validate(&self, document_id: Uuid, raw: &str) -> TokenResult<SigningToken> {
        let token = self
            .store
            .find_token(document_id, raw)
            .await?
            .ok_or(TokenError::NotFound)?;

        let now = Utc::now().naive_utc();
        if token.is_expired(now) {
            return Err(TokenError::Expired);
        }
        if token.is_used() {
            return Err(TokenError::AlreadyUsed);
        }

        // Document expiry is a read-time gate, never a stored sweep.
        if let Some(document) = self.store.document(document_id).await? {
            if document.effective_status(now) == crate::models::DocumentStatus::Expired {
                return Err(TokenError::DocumentExpired);
            }
        }

        Ok(token)
    }

    /// One-way transition of `used_at`. Exactly one of two racing callers
    /// succeeds; the other gets `AlreadyUsed`.
    pub async fn consume(&self, token_id: Uuid) -> TokenResult<()> {
        let now = Utc::now().naive_utc();
        if self.store.consume_token(token_id, now).await? {
            Ok(())
        } else {
            Err(TokenError::AlreadyUsed)
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
