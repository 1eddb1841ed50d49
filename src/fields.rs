use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewSignatureField, SignatureField};
use crate::registry::is_valid_email;
use crate::store::SigningStore;

/// Closed set of placeable field kinds. Adding a kind means extending the
/// matches below; nothing dispatches on raw strings past the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Signature,
    Initials,
    Name,
    Email,
    Date,
    Address,
    Title,
    Company,
    Phone,
}

/// Input modality required when a field is activated for filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldInputKind {
    /// Drawn or typed graphical artifact, captured by the signature pad.
    SignatureCapture,
    /// Prefilled with the current date, editable.
    DateDefaultToday,
    /// Free text that must look like an email address.
    EmailText,
    /// Unconstrained free text.
    FreeText,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Signature => "signature",
            FieldType::Initials => "initials",
            FieldType::Name => "name",
            FieldType::Email => "email",
            FieldType::Date => "date",
            FieldType::Address => "address",
            FieldType::Title => "title",
            FieldType::Company => "company",
            FieldType::Phone => "phone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signature" => Some(FieldType::Signature),
            "initials" => Some(FieldType::Initials),
            "name" => Some(FieldType::Name),
            "email" => Some(FieldType::Email),
            "date" => Some(FieldType::Date),
            "address" => Some(FieldType::Address),
            "title" => Some(FieldType::Title),
            "company" => Some(FieldType::Company),
            "phone" => Some(FieldType::Phone),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Signature => "Signature",
            FieldType::Initials => "Initials",
            FieldType::Name => "Full Name",
            FieldType::Email => "Email Address",
            FieldType::Date => "Date",
            FieldType::Address => "Address",
            FieldType::Title => "Job Title",
            FieldType::Company => "Company",
            FieldType::Phone => "Phone Number",
        }
    }

    pub fn input_kind(&self) -> FieldInputKind {
        match self {
            FieldType::Signature | FieldType::Initials => FieldInputKind::SignatureCapture,
            FieldType::Date => FieldInputKind::DateDefaultToday,
            FieldType::Email => FieldInputKind::EmailText,
            FieldType::Name
            | FieldType::Address
            | FieldType::Title
            | FieldType::Company
            | FieldType::Phone => FieldInputKind::FreeText,
        }
    }

    /// Validates a filled value for this field. Signature-like fields carry
    /// image data, everything else text; only email is shape-checked.
    pub fn validate_value(&self, value: &str) -> Result<(), String> {
        match self.input_kind() {
            FieldInputKind::EmailText => {
                if is_valid_email(value) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not a valid email address"))
                }
            }
            _ => Ok(()),
        }
    }
}

/// One field as submitted by the editing UI.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_page")]
    pub page: i32,
    pub field_type: FieldType,
    #[serde(default)]
    pub signatory_id: Option<Uuid>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

fn default_page() -> i32 {
    1
}

/// Full replace-on-save: the editing UI owns the authoritative field list, so
/// persistence is delete-then-insert of the whole collection, wrapped in one
/// store transaction.
pub async fn replace_fields(
    store: &Arc<dyn SigningStore>,
    document_id: Uuid,
    fields: Vec<FieldSpec>,
) -> AppResult<Vec<SignatureField>> {
    for field in &fields {
        if !(1..=10_000).contains(&field.page) {
            return Err(AppError::validation(format!(
                "page {} is out of range",
                field.page
            )));
        }
        if let Some(value) = &field.value {
            field
                .field_type
                .validate_value(value)
                .map_err(AppError::validation)?;
        }
    }

    let rows: Vec<NewSignatureField> = fields
        .into_iter()
        .map(|field| NewSignatureField {
            id: Uuid::new_v4(),
            document_id,
            signatory_id: field.signatory_id,
            x_position: field.x,
            y_position: field.y,
            page: field.page,
            field_type: field.field_type.as_str().to_string(),
            value: field.value,
            width: field.width,
            height: field.height,
        })
        .collect();

    let saved = store.replace_fields(document_id, rows).await?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_type_round_trips_through_parse() {
        for raw in [
            "signature",
            "initials",
            "name",
            "email",
            "date",
            "address",
            "title",
            "company",
            "phone",
        ] {
            let parsed = FieldType::parse(raw).expect("known field type");
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(FieldType::parse("checkbox").is_none());
    }

    #[test]
    fn signature_like_fields_require_capture() {
        assert_eq!(
            FieldType::Signature.input_kind(),
            FieldInputKind::SignatureCapture
        );
        assert_eq!(
            FieldType::Initials.input_kind(),
            FieldInputKind::SignatureCapture
        );
        assert_eq!(FieldType::Date.input_kind(), FieldInputKind::DateDefaultToday);
        assert_eq!(FieldType::Email.input_kind(), FieldInputKind::EmailText);
        assert_eq!(FieldType::Company.input_kind(), FieldInputKind::FreeText);
    }

    #[test]
    fn email_fields_reject_malformed_values() {
        assert!(FieldType::Email.validate_value("a@x.com").is_ok());
        assert!(FieldType::Email.validate_value("not-an-email").is_err());
        assert!(FieldType::Name.validate_value("anything at all").is_ok());
    }
}
