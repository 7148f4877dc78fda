use super::{Attachment, InlineDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decoded form submission. Empty text fields are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct BudgetRequest {
    pub feedback: Option<String>,
    pub context: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl BudgetRequest {
    pub fn from_parts(mut fields: HashMap<String, String>, attachments: Vec<Attachment>) -> Self {
        Self {
            feedback: fields.remove("feedback").filter(|v| !v.is_empty()),
            context: fields.remove("context").filter(|v| !v.is_empty()),
            attachments,
        }
    }

    /// True when there is nothing to generate from.
    pub fn is_empty(&self) -> bool {
        self.feedback.is_none() && self.context.is_none() && self.attachments.is_empty()
    }

    /// Read every attachment in arrival order.
    pub async fn load_documents(&self) -> std::io::Result<Vec<InlineDocument>> {
        let mut documents = Vec::with_capacity(self.attachments.len());
        for attachment in &self.attachments {
            documents.push(attachment.load().await?);
        }
        Ok(documents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetResponse {
    pub content: String,
}
