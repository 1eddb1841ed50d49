//! HTML bodies for the two workflow notifications. Only the interpolated
//! fields are contractual; the wording is presentation.

pub struct SignatureRequestEmail<'a> {
    pub document_name: &'a str,
    pub signatory_name: Option<&'a str>,
    pub message: Option<&'a str>,
    pub signing_link: &'a str,
}

pub struct CompletionEmail<'a> {
    pub document_name: &'a str,
    pub owner_name: Option<&'a str>,
    pub document_link: &'a str,
}

pub fn signature_request_subject(document_name: &str) -> String {
    format!("Signature Required: {document_name}")
}

pub fn completion_subject(document_name: &str) -> String {
    format!("Document Fully Signed: {document_name}")
}

pub fn render_signature_request(email: &SignatureRequestEmail<'_>) -> String {
    let greeting = email.signatory_name.unwrap_or("there");
    let message_block = match email.message {
        Some(message) if !message.trim().is_empty() => {
            format!("<p>Message: {}</p>", escape_html(message))
        }
        _ => String::new(),
    };

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; text-align: center;">
    <h2 style="color: #333;">Document Signature Request</h2>
  </div>
  <div style="padding: 20px; border: 1px solid #e9ecef; border-top: none;">
    <p>Hello {greeting},</p>
    <p>You have been requested to sign the document: <strong>{document}</strong></p>
    {message_block}
    <div style="margin: 30px 0; text-align: center;">
      <a href="{link}" style="background-color: #0f172a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">Review &amp; Sign Document</a>
    </div>
    <p style="color: #6c757d; font-size: 14px;">This link will expire in 7 days.</p>
  </div>
  <div style="background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 12px; color: #6c757d;">
    <p>This is an automated message. Please do not reply to this email.</p>
  </div>
</div>"#,
        greeting = escape_html(greeting),
        document = escape_html(email.document_name),
        message_block = message_block,
        link = email.signing_link,
    )
}

pub fn render_completion(email: &CompletionEmail<'_>) -> String {
    let greeting = email.owner_name.unwrap_or("there");

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background-color: #f8f9fa; padding: 20px; text-align: center;">
    <h2 style="color: #333;">Document Fully Signed</h2>
  </div>
  <div style="padding: 20px; border: 1px solid #e9ecef; border-top: none;">
    <p>Hello {greeting},</p>
    <p>Great news! Your document <strong>{document}</strong> has been signed by all parties.</p>
    <div style="margin: 30px 0; text-align: center;">
      <a href="{link}" style="background-color: #0f172a; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">View Completed Document</a>
    </div>
  </div>
  <div style="background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 12px; color: #6c757d;">
    <p>This is an automated message. Please do not reply to this email.</p>
  </div>
</div>"#,
        greeting = escape_html(greeting),
        document = escape_html(email.document_name),
        link = email.document_link,
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
