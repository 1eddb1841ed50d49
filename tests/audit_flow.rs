mod common;

use anyhow::Result;
use chrono::Duration;
use common::{now_naive, raw_token_from_link, TestApp};
use inkpact::audit::{
    build_audit_trail, EVENT_CREATED, EVENT_SENT, EVENT_SIGNED, EVENT_VIEWED,
};
use inkpact::models::{NewDocumentShare, NewDocumentView, SignatureType};
use inkpact::registry::SignatoryEntry;
use uuid::Uuid;

#[tokio::test]
async fn trail_of_an_untouched_document_is_just_its_creation() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;

    let trail = build_audit_trail(&app.store_dyn(), document.id).await?;
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].event, EVENT_CREATED);
    assert!(trail[0].details.contains("lease"));
    Ok(())
}

#[tokio::test]
async fn full_lifecycle_events_come_back_in_order() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();
    let workflow = app.workflow();

    let links = workflow
        .dispatch_signing_requests(
            document.id,
            vec![SignatoryEntry {
                email: "a@x.com".to_string(),
                name: Some("Ada".to_string()),
            }],
            None,
        )
        .await?;
    store
        .insert_view(NewDocumentView {
            id: Uuid::new_v4(),
            document_id: document.id,
            viewer: Some("a@x.com".to_string()),
            viewed_at: now_naive(),
        })
        .await?;
    let token = app
        .tokens()
        .validate(document.id, &raw_token_from_link(&links[0].link))
        .await?;
    workflow
        .record_signature(
            document.id,
            links[0].signatory_id,
            token.id,
            "Ada Lovelace".to_string(),
            SignatureType::Type,
        )
        .await?;

    let trail = build_audit_trail(&store, document.id).await?;
    let events: Vec<&str> = trail.iter().map(|e| e.event).collect();
    assert_eq!(events, vec![EVENT_CREATED, EVENT_SENT, EVENT_VIEWED, EVENT_SIGNED]);

    // Timestamps never decrease along the trail.
    for pair in trail.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }

    // The signer is named by their registry entry, not their raw id.
    assert_eq!(trail[3].user, "Ada");
    assert!(trail[1].details.contains("a@x.com"));
    Ok(())
}

#[tokio::test]
async fn equal_timestamps_fall_back_to_source_order() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    // Share and view stamped at the exact creation instant.
    let at = document.created_at;
    store
        .insert_view(NewDocumentView {
            id: Uuid::new_v4(),
            document_id: document.id,
            viewer: None,
            viewed_at: at,
        })
        .await?;
    store
        .insert_share(NewDocumentShare {
            id: Uuid::new_v4(),
            document_id: document.id,
            recipient_email: "a@x.com".to_string(),
            shared_at: at,
        })
        .await?;

    let trail = build_audit_trail(&store, document.id).await?;
    let events: Vec<&str> = trail.iter().map(|e| e.event).collect();
    assert_eq!(events, vec![EVENT_CREATED, EVENT_SENT, EVENT_VIEWED]);
    assert_eq!(trail[2].user, "Anonymous");
    Ok(())
}

#[tokio::test]
async fn events_interleave_across_sources_by_timestamp() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    let base = document.created_at;
    // A second share lands after the first view.
    store
        .insert_share(NewDocumentShare {
            id: Uuid::new_v4(),
            document_id: document.id,
            recipient_email: "a@x.com".to_string(),
            shared_at: base + Duration::minutes(1),
        })
        .await?;
    store
        .insert_view(NewDocumentView {
            id: Uuid::new_v4(),
            document_id: document.id,
            viewer: Some("a@x.com".to_string()),
            viewed_at: base + Duration::minutes(2),
        })
        .await?;
    store
        .insert_share(NewDocumentShare {
            id: Uuid::new_v4(),
            document_id: document.id,
            recipient_email: "b@x.com".to_string(),
            shared_at: base + Duration::minutes(3),
        })
        .await?;

    let trail = build_audit_trail(&store, document.id).await?;
    let events: Vec<&str> = trail.iter().map(|e| e.event).collect();
    assert_eq!(events, vec![EVENT_CREATED, EVENT_SENT, EVENT_VIEWED, EVENT_SENT]);
    assert!(trail[3].details.contains("b@x.com"));
    Ok(())
}
