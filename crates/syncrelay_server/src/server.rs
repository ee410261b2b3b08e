//! Main relay server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::http;
use axum::Router;
use std::sync::Arc;
use syncrelay_protocol::{
    CredentialsRequest, CredentialsResponse, SyncDataRequest, SyncDataResponse, SyncLogRequest,
    SyncLogResponse,
};
use syncrelay_store::StoreGateway;

/// The sync relay server.
///
/// Tenants authenticate with a client identifier and access token, then
/// either fetch their delegated database credentials, replace their record
/// partition, or append to the sync audit log.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use syncrelay_server::{ServerConfig, SyncServer};
/// use syncrelay_store::InMemoryStore;
///
/// let server = SyncServer::new(ServerConfig::default(), Arc::new(InMemoryStore::new()));
///
/// // `server.router()` is a ready axum router; `server.serve()` binds it.
/// let _router = server.router();
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new relay server over a store gateway.
    pub fn new(config: ServerConfig, gateway: Arc<dyn StoreGateway>) -> Self {
        let context = Arc::new(HandlerContext::new(config, gateway));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Handles a credentials request.
    pub async fn handle_credentials(
        &self,
        request: CredentialsRequest,
    ) -> ServerResult<CredentialsResponse> {
        self.handler.disclose_credentials(request).await
    }

    /// Handles a replace-sync request.
    pub async fn handle_sync_data(
        &self,
        request: SyncDataRequest,
    ) -> ServerResult<SyncDataResponse> {
        self.handler.replace_sync(request).await
    }

    /// Handles a sync log request.
    pub async fn handle_sync_log(&self, request: SyncLogRequest) -> ServerResult<SyncLogResponse> {
        self.handler.record_log(request).await
    }

    /// Returns the HTTP router for this server.
    pub fn router(&self) -> Router {
        http::router(self.handler.clone())
    }

    /// Binds [`ServerConfig::bind_addr`] and serves until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.context.config.bind_addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(
            addr = %addr,
            timeout_ms = self.context.config.request_timeout.as_millis() as u64,
            "Sync relay listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("Sync relay stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
