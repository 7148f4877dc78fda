//! Application startup and lifecycle management.

use crate::config::BudgetConfig;
use crate::handlers;
use crate::middleware::{origin_gate, OriginPolicy};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BudgetConfig,
    pub text_provider: Arc<dyn TextProvider>,
    pub origin_policy: OriginPolicy,
}

impl AppState {
    pub fn new(config: BudgetConfig, text_provider: Arc<dyn TextProvider>) -> Self {
        let origin_policy = OriginPolicy::new(config.cors.allowed_origins.iter().cloned());
        Self {
            config,
            text_provider,
            origin_policy,
        }
    }
}

fn budget_method_router() -> MethodRouter<AppState> {
    post(handlers::generate_budget)
        .options(handlers::preflight)
        .fallback(handlers::method_not_allowed)
}

/// Build the full router. The origin gate wraps only the budget routes, and it
/// runs before method dispatch.
pub fn build_router(state: AppState) -> Router {
    let budget_routes = Router::new()
        .route("/", budget_method_router())
        .route("/generate-budget", budget_method_router())
        .layer(DefaultBodyLimit::max(state.config.upload.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.origin_policy.clone(),
            origin_gate,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(budget_routes)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini provider.
    pub async fn build(config: BudgetConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.genai.api_key.clone(),
            model: config.genai.text_model.clone(),
            api_base: config.genai.api_base.clone(),
            timeout: Duration::from_secs(config.genai.request_timeout_secs),
        };
        let text_provider: Arc<dyn TextProvider> = Arc::new(
            GeminiTextProvider::new(gemini_config)
                .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?,
        );

        tracing::info!(
            model = %config.genai.text_model,
            "Initialized Gemini text provider"
        );

        Self::build_with_provider(config, text_provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: BudgetConfig,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        tracing::info!(
            origins = ?config.cors.allowed_origins,
            storage = ?config.upload.storage,
            scratch_root = %config.upload.scratch_root.display(),
            "Configured upload handling"
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let router = build_router(AppState::new(config, text_provider));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .into_future()
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
