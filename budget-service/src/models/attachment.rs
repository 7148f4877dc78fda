use axum::body::Bytes;
use std::path::PathBuf;

/// An accepted upload, either held in memory or spooled into the request's
/// scratch directory.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    /// Declared `Content-Transfer-Encoding` of the part.
    pub encoding: String,
    pub size: usize,
    pub body: AttachmentBody,
}

#[derive(Debug, Clone)]
pub enum AttachmentBody {
    Memory(Bytes),
    /// Path inside the owning request's scratch directory. Only valid while
    /// that directory is alive.
    Disk(PathBuf),
}

/// Attachment bytes ready to be inlined into a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: Bytes,
}

impl Attachment {
    pub async fn load(&self) -> std::io::Result<InlineDocument> {
        let data = match &self.body {
            AttachmentBody::Memory(bytes) => bytes.clone(),
            AttachmentBody::Disk(path) => Bytes::from(tokio::fs::read(path).await?),
        };

        Ok(InlineDocument {
            mime_type: self.mime_type.clone(),
            data,
        })
    }
}
