//! Multipart ingestion.
//!
//! Scalar fields are collected by name (last write wins). File parts declared
//! as `application/pdf` are buffered and handed to a finalizer task; every
//! other file part is drained without being retained. Finalizers run in a
//! [`JoinSet`] and are all joined before the form is returned, so a failure
//! in one file never leaves another one unsettled.

use crate::config::StorageMode;
use crate::models::{Attachment, AttachmentBody};
use crate::services::metrics::record_attachment;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinSet;

pub const PDF_MIME_TYPE: &str = "application/pdf";

const DEFAULT_TRANSFER_ENCODING: &str = "7bit";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Multipart parsing error: {0}")]
    Malformed(String),

    #[error("File \"{filename}\" exceeds the maximum size of {limit}.")]
    TooLarge { filename: String, limit: String },

    #[error("File \"{filename}\" could not be stored: {source}")]
    Spool {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("An uploaded file could not be processed: {0}")]
    Finalizer(String),
}

impl From<MultipartError> for IngestError {
    fn from(err: MultipartError) -> Self {
        IngestError::Malformed(err.body_text())
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_file_bytes: usize,
    pub storage: StorageMode,
    /// Directory owned by the current request; spooled files land here.
    pub scratch: PathBuf,
}

/// Result of a fully decoded form.
#[derive(Debug, Default)]
pub struct ParsedForm {
    pub fields: HashMap<String, String>,
    /// Accepted PDFs in arrival order.
    pub attachments: Vec<Attachment>,
}

/// A PDF part that has been read off the wire but not yet validated.
struct PendingFile {
    filename: String,
    mime_type: String,
    encoding: String,
    received: usize,
    chunks: Vec<Bytes>,
}

pub async fn ingest_form(
    mut multipart: Multipart,
    options: &IngestOptions,
) -> Result<ParsedForm, IngestError> {
    let mut fields = HashMap::new();
    let mut finalizers: JoinSet<(usize, Result<Attachment, IngestError>)> = JoinSet::new();
    let mut arrivals = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                finalizers.shutdown().await;
                return Err(e.into());
            }
        };

        let filename = field.file_name().map(str::to_string);
        let step = match filename {
            None => read_scalar(field, &mut fields).await,
            Some(filename) => match read_file(field, filename, options.max_file_bytes).await {
                Ok(Some(pending)) => {
                    let index = arrivals;
                    arrivals += 1;
                    let spool_path = match options.storage {
                        StorageMode::Memory => None,
                        StorageMode::Disk => Some(
                            options
                                .scratch
                                .join(format!("{:03}-{}", index, sanitize_filename(&pending.filename))),
                        ),
                    };
                    let max_file_bytes = options.max_file_bytes;
                    finalizers.spawn(async move {
                        (index, finalize(pending, max_file_bytes, spool_path).await)
                    });
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            },
        };

        if let Err(e) = step {
            finalizers.shutdown().await;
            return Err(e);
        }
    }

    let attachments = join_finalizers(finalizers).await?;

    Ok(ParsedForm {
        fields,
        attachments,
    })
}

async fn read_scalar(
    field: Field<'_>,
    fields: &mut HashMap<String, String>,
) -> Result<(), IngestError> {
    let name = field.name().unwrap_or_default().to_string();
    let value = field.text().await?;
    fields.insert(name, value);
    Ok(())
}

/// Read one file part. Returns `None` when the part was drained and skipped.
async fn read_file(
    mut field: Field<'_>,
    filename: String,
    max_file_bytes: usize,
) -> Result<Option<PendingFile>, IngestError> {
    let declared = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    if !is_pdf(&declared) {
        while field.chunk().await?.is_some() {}
        tracing::warn!(
            filename = %filename,
            mime_type = %declared,
            "Skipping non-PDF file"
        );
        record_attachment("skipped");
        return Ok(None);
    }

    let encoding = field
        .headers()
        .get("content-transfer-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_TRANSFER_ENCODING.to_string());

    let mut chunks = Vec::new();
    let mut received = 0usize;
    while let Some(chunk) = field.chunk().await? {
        received = received.saturating_add(chunk.len());
        if received <= max_file_bytes {
            chunks.push(chunk);
        } else if !chunks.is_empty() {
            // Over the ceiling: keep counting, stop holding bytes.
            chunks = Vec::new();
        }
    }

    // Parameters and casing are not forwarded to the model.
    Ok(Some(PendingFile {
        filename,
        mime_type: PDF_MIME_TYPE.to_string(),
        encoding,
        received,
        chunks,
    }))
}

async fn finalize(
    pending: PendingFile,
    max_file_bytes: usize,
    spool_path: Option<PathBuf>,
) -> Result<Attachment, IngestError> {
    if pending.received > max_file_bytes {
        return Err(IngestError::TooLarge {
            filename: pending.filename,
            limit: describe_limit(max_file_bytes),
        });
    }

    let mut content = Vec::with_capacity(pending.received);
    for chunk in &pending.chunks {
        content.extend_from_slice(chunk);
    }
    let size = content.len();

    let body = match spool_path {
        None => AttachmentBody::Memory(Bytes::from(content)),
        Some(path) => {
            tokio::fs::write(&path, &content)
                .await
                .map_err(|source| IngestError::Spool {
                    filename: pending.filename.clone(),
                    source,
                })?;
            AttachmentBody::Disk(path)
        }
    };

    tracing::info!(
        filename = %pending.filename,
        mime_type = %pending.mime_type,
        size = size,
        "Accepted PDF attachment"
    );

    Ok(Attachment {
        filename: pending.filename,
        mime_type: pending.mime_type,
        encoding: pending.encoding,
        size,
        body,
    })
}

/// Join every finalizer, then report the first failure in arrival order.
async fn join_finalizers(
    mut finalizers: JoinSet<(usize, Result<Attachment, IngestError>)>,
) -> Result<Vec<Attachment>, IngestError> {
    let mut settled = Vec::with_capacity(finalizers.len());

    while let Some(joined) = finalizers.join_next().await {
        match joined {
            Ok(entry) => settled.push(entry),
            Err(e) => {
                tracing::error!(error = %e, "Attachment finalizer did not complete");
                settled.push((usize::MAX, Err(IngestError::Finalizer(e.to_string()))));
            }
        }
    }

    settled.sort_by_key(|(index, _)| *index);

    let mut attachments = Vec::with_capacity(settled.len());
    let mut first_error = None;
    for (_, result) in settled {
        match result {
            Ok(attachment) => {
                record_attachment("accepted");
                attachments.push(attachment);
            }
            Err(e) => {
                record_attachment("rejected");
                tracing::warn!(error = %e, "Rejected uploaded file");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(attachments),
    }
}

/// Compare the media type essence, ignoring parameters and case.
pub fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}

/// Render a byte limit the way users read it, e.g. `20MB`.
fn describe_limit(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Reduce a client-supplied filename to a single safe path component.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}
