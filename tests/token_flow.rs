mod common;

use anyhow::Result;
use chrono::Duration;
use common::{now_naive, TestApp};
use inkpact::models::{NewSignatory, NewSigningToken, Signatory};
use inkpact::store::DocumentSettings;
use inkpact::tokens::TokenError;
use uuid::Uuid;

async fn seed_signatory(app: &TestApp, document_id: Uuid, email: &str) -> Result<Signatory> {
    let mut inserted = app
        .state
        .store
        .insert_signatories(vec![NewSignatory {
            id: Uuid::new_v4(),
            document_id,
            email: email.to_string(),
            name: None,
            signed: false,
        }])
        .await?;
    Ok(inserted.pop().expect("one signatory inserted"))
}

#[tokio::test]
async fn issued_token_validates_then_consumes_exactly_once() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let signatory = seed_signatory(&app, document.id, "a@x.com").await?;

    let tokens = app.tokens();
    let issued = tokens.issue(document.id, signatory.id).await?;

    let validated = tokens.validate(document.id, &issued.token).await?;
    assert_eq!(validated.id, issued.id);
    assert_eq!(validated.signatory_id, signatory.id);

    tokens.consume(issued.id).await?;
    assert!(matches!(
        tokens.consume(issued.id).await,
        Err(TokenError::AlreadyUsed)
    ));
    assert!(matches!(
        tokens.validate(document.id, &issued.token).await,
        Err(TokenError::AlreadyUsed)
    ));
    Ok(())
}

#[tokio::test]
async fn racing_consumers_get_exactly_one_success() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let signatory = seed_signatory(&app, document.id, "a@x.com").await?;

    let tokens = app.tokens();
    let issued = tokens.issue(document.id, signatory.id).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tokens = tokens.clone();
        let token_id = issued.id;
        handles.push(tokio::spawn(
            async move { tokens.consume(token_id).await },
        ));
    }

    let mut successes = 0;
    let mut already_used = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => successes += 1,
            Err(TokenError::AlreadyUsed) => already_used += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(already_used, 7);
    Ok(())
}

#[tokio::test]
async fn expired_tokens_are_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let signatory = seed_signatory(&app, document.id, "a@x.com").await?;

    let now = now_naive();
    let stale = app
        .state
        .store
        .insert_token(NewSigningToken {
            id: Uuid::new_v4(),
            token: "a".repeat(64),
            document_id: document.id,
            signatory_id: signatory.id,
            created_at: now - Duration::days(8),
            expires_at: now - Duration::days(1),
        })
        .await?;

    assert!(matches!(
        app.tokens().validate(document.id, &stale.token).await,
        Err(TokenError::Expired)
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_tokens_are_not_found() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;

    assert!(matches!(
        app.tokens().validate(document.id, &"f".repeat(64)).await,
        Err(TokenError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn reissuing_leaves_outstanding_tokens_valid() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let signatory = seed_signatory(&app, document.id, "a@x.com").await?;

    let tokens = app.tokens();
    let first = tokens.issue(document.id, signatory.id).await?;
    let second = tokens.issue(document.id, signatory.id).await?;
    assert_ne!(first.token, second.token);

    // Both resolve independently until each is consumed.
    tokens.validate(document.id, &first.token).await?;
    tokens.validate(document.id, &second.token).await?;

    tokens.consume(second.id).await?;
    tokens.validate(document.id, &first.token).await?;
    Ok(())
}

#[tokio::test]
async fn document_deadline_gates_token_validation() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let signatory = seed_signatory(&app, document.id, "a@x.com").await?;

    let tokens = app.tokens();
    let issued = tokens.issue(document.id, signatory.id).await?;

    app.state
        .store
        .set_document_settings(
            document.id,
            DocumentSettings {
                expires_at: Some(now_naive() - Duration::hours(1)),
                password_protected: false,
                publicly_viewable: false,
            },
        )
        .await?;
    assert!(matches!(
        tokens.validate(document.id, &issued.token).await,
        Err(TokenError::DocumentExpired)
    ));

    // Lifting the deadline restores the token without reissuing it.
    app.state
        .store
        .set_document_settings(
            document.id,
            DocumentSettings {
                expires_at: None,
                password_protected: false,
                publicly_viewable: false,
            },
        )
        .await?;
    tokens.validate(document.id, &issued.token).await?;
    Ok(())
}
