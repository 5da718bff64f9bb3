//! File attachments and the message composer.
//!
//! A message carries at most one file and only PDFs are accepted.  The
//! [`Composer`] holds the draft text and the single attachment slot; staging
//! a valid file replaces whatever was staged before, and rejecting an
//! invalid one leaves the slot untouched.

use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::http::FormPart;
use crate::observability::CHAT_ATTACHMENTS_REJECTED;
use crate::types::MessageAttachment;

/// MIME type accepted for attachments.
pub const PDF_MIME: &str = "application/pdf";

const ONLY_ONE_FILE: &str = "Only one file can be attached to a message.";
const ONLY_PDF: &str = "Only PDF files are supported.";

/// A file staged for sending.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// File name, without directories.
    pub name: String,
    /// MIME type as reported by the source of the file.
    pub content_type: String,
    /// File content.
    pub content: Bytes,
}

impl Attachment {
    /// Creates an attachment from in-memory content.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Reads a file from disk.  The content type is inferred from the
    /// extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| Error::io(format!("cannot read {}: {e}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::validation(
                    format!("{} has no file name", path.display()),
                    Some("path".to_string()),
                )
            })?;
        let content_type = if has_pdf_suffix(&name) {
            PDF_MIME
        } else {
            "application/octet-stream"
        };
        Ok(Self::new(name, content_type, content))
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// True when the MIME type or the file name marks this as a PDF.
    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_MIME) || has_pdf_suffix(&self.name)
    }

    /// Name, size and type, for display in the thread.
    pub fn metadata(&self) -> MessageAttachment {
        MessageAttachment {
            name: self.name.clone(),
            size: self.size(),
            r#type: self.content_type.clone(),
        }
    }

    /// The multipart field carrying this file.
    pub fn form_part(&self) -> FormPart {
        let content_type = if self.content_type.is_empty() {
            PDF_MIME
        } else {
            self.content_type.as_str()
        };
        FormPart::file("file", &self.name, content_type, self.content.clone())
    }
}

fn has_pdf_suffix(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// Applies the attachment policy to one staging action.
///
/// Returns `Ok(None)` for an empty selection, `Ok(Some(file))` for a single
/// PDF, and an attachment error otherwise.
pub fn validate_selection(mut files: Vec<Attachment>) -> Result<Option<Attachment>> {
    if files.len() > 1 {
        return Err(Error::attachment(ONLY_ONE_FILE));
    }
    match files.pop() {
        None => Ok(None),
        Some(file) if file.is_pdf() => Ok(Some(file)),
        Some(_) => Err(Error::attachment(ONLY_PDF)),
    }
}

/// Draft state of the message input.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    attachment: Option<Attachment>,
    error: Option<String>,
}

impl Composer {
    /// Creates an empty composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The draft text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the draft text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The staged file.
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Number of staged files: zero or one.
    pub fn attachment_count(&self) -> usize {
        usize::from(self.attachment.is_some())
    }

    /// The last attachment error, cleared by the next successful staging.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stages files chosen through a picker.
    ///
    /// A valid file replaces the staged one.  A rejected selection records
    /// an error and keeps the staged file.
    pub fn stage(&mut self, files: Vec<Attachment>) -> Result<()> {
        match validate_selection(files) {
            Ok(Some(file)) => {
                self.attachment = Some(file);
                self.error = None;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                CHAT_ATTACHMENTS_REJECTED.click();
                tracing::debug!(error = %err, "attachment rejected");
                self.error = Some(err.message().to_string());
                Err(err)
            }
        }
    }

    /// Stages files dropped onto the input.  Same policy as [`Composer::stage`];
    /// dropping never sends.
    pub fn drop_files(&mut self, files: Vec<Attachment>) -> Result<()> {
        self.stage(files)
    }

    /// Removes the staged file.
    pub fn remove_attachment(&mut self) {
        self.attachment = None;
        self.error = None;
    }

    /// Clears text, attachment and error.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
