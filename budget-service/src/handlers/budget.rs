use crate::models::{BudgetRequest, BudgetResponse};
use crate::services::metrics::record_request_outcome;
use crate::services::providers::ProviderError;
use crate::services::{assemble_prompt, ingest_form, IngestError, IngestOptions, ScratchDir};
use crate::startup::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequest, Multipart, Request, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use service_core::middleware::RequestId;

/// Returned when the provider answers without a usable text part.
pub const PLACEHOLDER_CONTENT: &str = "No content generated or unexpected response format.";

/// Preflight: the origin gate has already attached CORS headers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn generate_budget(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<BudgetResponse>, AppError> {
    let result = relay(&state, request).await;

    record_request_outcome(match &result {
        Ok(_) => "success",
        Err(e) if e.status().is_client_error() => "rejected",
        Err(_) => "failed",
    });

    result.map(Json)
}

async fn relay(state: &AppState, request: Request) -> Result<BudgetResponse, AppError> {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .extensions
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let body = to_bytes(body, state.config.upload.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to read request body");
            AppError::PayloadTooLarge(anyhow::anyhow!(
                "Request body exceeds {} bytes.",
                state.config.upload.max_body_bytes
            ))
        })?;

    if body.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Missing request body."
        )));
    }

    // Held until this function returns; dropping it removes everything below.
    let scratch = ScratchDir::create(&state.config.upload.scratch_root).map_err(|e| {
        tracing::error!(error = %e, "Failed to create scratch directory");
        generation_failure(&e.to_string())
    })?;

    let multipart = Multipart::from_request(Request::from_parts(parts, Body::from(body)), &())
        .await
        .map_err(|rejection| {
            AppError::BadRequest(anyhow::anyhow!(
                "Multipart parsing error: {}",
                rejection.body_text()
            ))
        })?;

    let options = IngestOptions {
        max_file_bytes: state.config.upload.max_file_bytes,
        storage: state.config.upload.storage,
        scratch: scratch.path().to_path_buf(),
    };

    let form = ingest_form(multipart, &options).await.map_err(|e| {
        tracing::error!(error = %e, "Error processing uploaded files");
        match e {
            IngestError::Spool { .. } | IngestError::Finalizer(_) => {
                generation_failure(&e.to_string())
            }
            _ => AppError::BadRequest(anyhow::Error::new(e)),
        }
    })?;

    let budget_request = BudgetRequest::from_parts(form.fields, form.attachments);
    if budget_request.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Please provide feedback, context, or upload a PDF file."
        )));
    }

    let documents = budget_request.load_documents().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read spooled attachment");
        generation_failure(&e.to_string())
    })?;

    let segments = assemble_prompt(
        budget_request.feedback.as_deref(),
        budget_request.context.as_deref(),
        &documents,
    );

    tracing::info!(
        request_id = %request_id,
        model = %state.text_provider.model(),
        has_feedback = budget_request.feedback.is_some(),
        has_context = budget_request.context.is_some(),
        attachment_count = budget_request.attachments.len(),
        segment_count = segments.len(),
        "Generating budget report"
    );

    let response = state
        .text_provider
        .generate(&segments)
        .await
        .map_err(|e: ProviderError| {
            tracing::error!(error = %e, "Error in generate budget handler");
            generation_failure(&e.to_string())
        })?;

    let content = match response.text {
        Some(text) => text,
        None => {
            tracing::warn!(
                finish_reason = ?response.finish_reason,
                "Gemini API response did not contain expected text content structure"
            );
            PLACEHOLDER_CONTENT.to_string()
        }
    };

    tracing::info!(
        request_id = %request_id,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        content_len = content.len(),
        "Budget report generated"
    );

    drop(scratch);

    Ok(BudgetResponse { content })
}

fn generation_failure(message: &str) -> AppError {
    let message = if message.trim().is_empty() {
        "Internal Server Error"
    } else {
        message
    };
    AppError::InternalError(anyhow::anyhow!("Error generating budget: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failure_defaults_empty_message() {
        assert_eq!(
            generation_failure("  ").to_string(),
            "Error generating budget: Internal Server Error"
        );
        assert_eq!(
            generation_failure("Rate limited").to_string(),
            "Error generating budget: Rate limited"
        );
    }
}
