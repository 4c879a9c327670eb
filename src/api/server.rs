//! API server assembly
//!
//! Builds the axum application: shared state, the `/api` route tree,
//! CORS and request-tracing layers, and the serve loop with optional
//! graceful shutdown.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::enrich::DbpediaClient;
use crate::error::Error;
use crate::llm::GeminiClient;
use crate::search::SearchPipeline;
use crate::store::SparqlStore;

use super::{entities, meta, search};

// ============================================================================
// App State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Triple-store client
    pub store: Arc<SparqlStore>,

    /// NL → SPARQL pipeline
    pub pipeline: Arc<SearchPipeline>,

    /// DBpedia lookup client
    pub dbpedia: Arc<DbpediaClient>,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// API Server
// ============================================================================

/// The HTTP API server.
pub struct ApiServer {
    config: Config,
    state: AppState,
}

impl ApiServer {
    /// Create the server and its clients from a validated configuration.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::config(e.to_string()))?;

        let store = Arc::new(
            SparqlStore::with_timeout(&config.store.endpoint, config.store_timeout())
                .map_err(Error::Store)?,
        );

        let gemini = GeminiClient::new(config.gemini.clone()).map_err(Error::Llm)?;
        if gemini.is_configured() {
            tracing::info!(model = gemini.model(), "Gemini generation enabled");
        } else {
            tracing::info!("no GEMINI_API_KEY, search will use deterministic fallbacks");
        }

        let pipeline = Arc::new(SearchPipeline::new(gemini));
        let dbpedia =
            Arc::new(DbpediaClient::new(config.dbpedia.clone()).map_err(Error::Enrich)?);

        let state = AppState {
            store,
            pipeline,
            dbpedia,
            start_time: Instant::now(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state (used by integration tests).
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and layers.
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server.
    pub async fn start(&self) -> Result<(), Error> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        tracing::info!(%addr, store = %self.state.store.endpoint(), "starting API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(Error::Io)?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::other(format!("server error: {e}")))?;

        Ok(())
    }

    /// Start with graceful shutdown.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), Error> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        tracing::info!(%addr, "starting API server (with graceful shutdown)");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(Error::Io)?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| Error::other(format!("server error: {e}")))?;

        tracing::info!("API server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Router
// ============================================================================

/// Assemble the full route tree.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(meta::routes())
        .merge(search::routes())
        .merge(entities::persons::routes())
        .merge(entities::universities::routes())
        .merge(entities::specialties::routes())
        .merge(entities::courses::routes())
        .merge(entities::competencies::routes())
        .merge(entities::projects::routes())
        .merge(entities::resources::routes())
        .merge(entities::technologies::routes())
        .merge(entities::evaluations::routes())
        .merge(entities::orientations::routes());

    Router::new()
        .route("/", axum::routing::get(meta::home))
        .nest("/api", api)
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation_with_defaults() {
        let config = Config::default();
        let server = ApiServer::new(config);
        assert!(server.is_ok());
    }

    #[test]
    fn test_server_rejects_invalid_config() {
        let mut config = Config::default();
        config.store.endpoint = String::new();
        assert!(ApiServer::new(config).is_err());
    }

    #[test]
    fn test_router_builds() {
        let server = ApiServer::new(Config::default()).unwrap();
        let _router = server.build_router();
    }
}
