mod common;

use anyhow::Result;
use common::{raw_token_from_link, TestApp, PUBLIC_ORIGIN};
use inkpact::registry::SignatoryEntry;

fn entry(email: &str, name: Option<&str>) -> SignatoryEntry {
    SignatoryEntry {
        email: email.to_string(),
        name: name.map(str::to_string),
    }
}

#[tokio::test]
async fn delivery_failure_skips_only_that_recipient() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    app.mailer.fail_for("b@x.com").await;

    let links = app
        .workflow()
        .dispatch_signing_requests(
            document.id,
            vec![
                entry("a@x.com", Some("Ada")),
                entry("b@x.com", None),
                entry("c@x.com", None),
            ],
            Some("please sign"),
        )
        .await?;

    let delivered: Vec<&str> = links.iter().map(|l| l.email.as_str()).collect();
    assert_eq!(delivered, vec!["a@x.com", "c@x.com"]);
    assert_eq!(app.mailer.sent().await.len(), 2);

    // Shares only record actual deliveries.
    let shares = app.state.store.shares_for_document(document.id).await?;
    let shared: Vec<&str> = shares.iter().map(|s| s.recipient_email.as_str()).collect();
    assert_eq!(shared, vec!["a@x.com", "c@x.com"]);

    // The failed recipient is still registered as a signatory for a retry.
    let signatories = app.state.store.signatories_for_document(document.id).await?;
    assert_eq!(signatories.len(), 3);
    let refreshed = app.state.store.document(document.id).await?.unwrap();
    assert_eq!(refreshed.signatories_count, 3);
    Ok(())
}

#[tokio::test]
async fn links_use_the_public_origin() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;

    let links = app
        .workflow()
        .dispatch_signing_requests(document.id, vec![entry("a@x.com", None)], None)
        .await?;
    let link = &links[0].link;
    assert!(link.starts_with(&format!("{PUBLIC_ORIGIN}/sign/{}/", document.id)));

    // The email body carries the same link.
    let sent = app.mailer.sent().await;
    assert_eq!(sent[0].to, "a@x.com");
    assert!(sent[0].html.contains(link.as_str()));
    Ok(())
}

#[tokio::test]
async fn repeat_dispatch_reuses_the_signatory_with_a_fresh_token() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let workflow = app.workflow();

    let first = workflow
        .dispatch_signing_requests(document.id, vec![entry("a@x.com", None)], None)
        .await?;
    let second = workflow
        .dispatch_signing_requests(document.id, vec![entry("A@X.COM", None)], None)
        .await?;

    assert_eq!(first[0].signatory_id, second[0].signatory_id);
    assert_ne!(first[0].link, second[0].link);

    let signatories = app.state.store.signatories_for_document(document.id).await?;
    assert_eq!(signatories.len(), 1);

    // Both outstanding links still validate.
    let tokens = app.tokens();
    tokens
        .validate(document.id, &raw_token_from_link(&first[0].link))
        .await?;
    tokens
        .validate(document.id, &raw_token_from_link(&second[0].link))
        .await?;
    Ok(())
}

#[tokio::test]
async fn invalid_recipient_is_skipped_not_fatal() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;

    let links = app
        .workflow()
        .dispatch_signing_requests(
            document.id,
            vec![entry("not-an-email", None), entry("a@x.com", None)],
            None,
        )
        .await?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].email, "a@x.com");

    let signatories = app.state.store.signatories_for_document(document.id).await?;
    assert_eq!(signatories.len(), 1);
    Ok(())
}

#[tokio::test]
async fn reminder_mints_a_new_token_and_stamps_the_signatory() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let workflow = app.workflow();

    let links = workflow
        .dispatch_signing_requests(document.id, vec![entry("a@x.com", None)], None)
        .await?;
    let signatory_id = links[0].signatory_id;

    let reminder = workflow
        .remind(document.id, signatory_id, Some("still waiting"))
        .await?;
    assert_ne!(reminder.link, links[0].link);
    assert_eq!(app.mailer.sent_to("a@x.com").await.len(), 2);

    let signatory = app.state.store.signatory(signatory_id).await?.unwrap();
    assert!(signatory.last_reminded_at.is_some());

    // The original link survives the reminder.
    app.tokens()
        .validate(document.id, &raw_token_from_link(&links[0].link))
        .await?;
    Ok(())
}

#[tokio::test]
async fn reminders_to_signed_signatories_are_rejected() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let workflow = app.workflow();

    let links = workflow
        .dispatch_signing_requests(document.id, vec![entry("a@x.com", None)], None)
        .await?;
    let signatory_id = links[0].signatory_id;
    let token = app
        .tokens()
        .validate(document.id, &raw_token_from_link(&links[0].link))
        .await?;

    workflow
        .record_signature(
            document.id,
            signatory_id,
            token.id,
            "Ada Lovelace".to_string(),
            inkpact::models::SignatureType::Type,
        )
        .await?;

    let err = workflow
        .remind(document.id, signatory_id, None)
        .await
        .expect_err("reminding a signed signatory must fail");
    assert_eq!(err.code(), "validation_error");
    Ok(())
}
