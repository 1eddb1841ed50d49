mod common;

use anyhow::Result;
use common::TestApp;
use inkpact::fields::{replace_fields, FieldSpec, FieldType};
use inkpact::models::SignatureField;

fn spec(x: f64, y: f64, page: i32, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        x,
        y,
        page,
        field_type,
        signatory_id: None,
        value: None,
        width: None,
        height: None,
    }
}

fn layout_key(field: &SignatureField) -> (String, String, i32, String, Option<String>) {
    (
        format!("{:.3}", field.x_position),
        format!("{:.3}", field.y_position),
        field.page,
        field.field_type.clone(),
        field.value.clone(),
    )
}

#[tokio::test]
async fn replace_is_idempotent_on_the_layout() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    let layout = vec![
        spec(10.0, 20.0, 1, FieldType::Signature),
        spec(30.0, 20.0, 1, FieldType::Date),
        spec(10.0, 90.0, 2, FieldType::Name),
    ];

    let first = replace_fields(&store, document.id, layout.clone()).await?;
    let second = replace_fields(&store, document.id, layout).await?;

    // Row ids change on every save; the layout itself does not.
    let mut before: Vec<_> = first.iter().map(layout_key).collect();
    let mut after: Vec<_> = second.iter().map(layout_key).collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
    assert_eq!(store.fields_for_document(document.id).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn replacing_with_fewer_fields_drops_the_rest() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    replace_fields(
        &store,
        document.id,
        vec![
            spec(10.0, 20.0, 1, FieldType::Signature),
            spec(30.0, 20.0, 1, FieldType::Date),
        ],
    )
    .await?;
    replace_fields(&store, document.id, vec![spec(50.0, 50.0, 1, FieldType::Initials)]).await?;

    let remaining = store.fields_for_document(document.id).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].field_type, "initials");
    Ok(())
}

#[tokio::test]
async fn empty_replace_clears_the_document() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    replace_fields(&store, document.id, vec![spec(10.0, 20.0, 1, FieldType::Signature)]).await?;
    replace_fields(&store, document.id, Vec::new()).await?;
    assert!(store.fields_for_document(document.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_entries_abort_before_anything_persists() -> Result<()> {
    let app = TestApp::new()?;
    let (owner, _) = app.seed_user("owner@x.com", "ownerpass1").await?;
    let document = app.seed_document(&owner, "lease").await?;
    let store = app.store_dyn();

    replace_fields(&store, document.id, vec![spec(10.0, 20.0, 1, FieldType::Signature)]).await?;

    // A prefilled email value must look like an address.
    let mut bad_value = spec(30.0, 40.0, 1, FieldType::Email);
    bad_value.value = Some("not-an-email".to_string());
    let err = replace_fields(
        &store,
        document.id,
        vec![spec(5.0, 5.0, 1, FieldType::Name), bad_value],
    )
    .await
    .expect_err("malformed email value must be rejected");
    assert_eq!(err.code(), "validation_error");

    let err = replace_fields(&store, document.id, vec![spec(5.0, 5.0, 0, FieldType::Name)])
        .await
        .expect_err("page zero must be rejected");
    assert_eq!(err.code(), "validation_error");

    // The earlier layout is untouched by either failed save.
    let remaining = store.fields_for_document(document.id).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].field_type, "signature");
    Ok(())
}
