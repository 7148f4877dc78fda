//! Prompt assembly.
//!
//! Builds the ordered segment list sent to the text provider. Assembly is pure:
//! the same fields and documents always produce the same segments.

use crate::models::InlineDocument;
use axum::body::Bytes;

/// One unit of a prompt: instruction text or an inlined binary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSegment {
    Text(String),
    InlineData { mime_type: String, data: Bytes },
}

impl PromptSegment {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptSegment::Text(text) => Some(text),
            PromptSegment::InlineData { .. } => None,
        }
    }
}

const DIRECTIVES: &str = "Do NOT restate these instructions. Do NOT answer conversationally. \
Do NOT attempt to interact with the user. Do NOT explain what you are doing, just do it.";

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI agent that creates, manages, and edits \
school budgets, and writes in-depth reports that help the user make budgeting decisions for the \
school district. Follow the user's instructions and produce analytical, thorough reports that meet \
the user's requirements. You have access to files the user has provided; study them closely and use \
the context they give to produce output that satisfies the user's requirements. Besides the files, \
the user may provide two sets of input.";

const FEEDBACK_INSTRUCTION: &str = "The first set of input is feedback. It contains constraints to \
keep in mind while writing the report and possibly feedback from students and staff about district \
needs and the budget.";

const CONTEXT_INSTRUCTION: &str = "The second set of input is context that explains specifically \
what the user is asking for. Use it to understand the user's requirements and directions. Be \
thorough and very detailed in your report.";

pub const FILES_INSTRUCTION: &str = "The user has also provided budget reports from previous fiscal \
years. Use them to understand the areas of expense within the school district, and base the \
resulting report on the categories in those budgets. Be thorough and very detailed in your report.";

/// Assemble the prompt in a fixed order: system instruction, feedback,
/// context, then the file introduction followed by one inline segment per
/// document.
pub fn assemble_prompt(
    feedback: Option<&str>,
    context: Option<&str>,
    documents: &[InlineDocument],
) -> Vec<PromptSegment> {
    let mut segments = Vec::with_capacity(4 + documents.len());

    segments.push(PromptSegment::Text(SYSTEM_INSTRUCTION.to_string()));

    if let Some(feedback) = feedback.filter(|f| !f.is_empty()) {
        segments.push(PromptSegment::Text(format!(
            "{} {} Here is the feedback: {}",
            FEEDBACK_INSTRUCTION, DIRECTIVES, feedback
        )));
    }

    if let Some(context) = context.filter(|c| !c.is_empty()) {
        segments.push(PromptSegment::Text(format!(
            "{} {} Here is the context: {}",
            CONTEXT_INSTRUCTION, DIRECTIVES, context
        )));
    }

    if !documents.is_empty() {
        segments.push(PromptSegment::Text(format!(
            "{} {}",
            FILES_INSTRUCTION, DIRECTIVES
        )));
        segments.extend(documents.iter().map(|doc| PromptSegment::InlineData {
            mime_type: doc.mime_type.clone(),
            data: doc.data.clone(),
        }));
    }

    segments
}
