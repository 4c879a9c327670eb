//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Instant;

use edugraph::api::{create_router, AppState};
use edugraph::config::{Config, DbpediaConfig};
use edugraph::enrich::DbpediaClient;
use edugraph::llm::GeminiClient;
use edugraph::search::SearchPipeline;
use edugraph::store::SparqlStore;

/// Build an application state wired to mock endpoints. No Gemini key,
/// so the search pipeline runs on its deterministic fallbacks.
pub fn test_state(store_url: &str, dbpedia_url: &str) -> AppState {
    let config = Config::default();

    let store = Arc::new(SparqlStore::new(store_url).unwrap());
    let gemini = GeminiClient::new(config.gemini.clone()).unwrap();
    let pipeline = Arc::new(SearchPipeline::new(gemini));
    let dbpedia = Arc::new(
        DbpediaClient::new(DbpediaConfig {
            lookup_url: format!("{dbpedia_url}/api/search/KeywordSearch"),
            timeout_secs: 5,
            max_hits: 10,
        })
        .unwrap(),
    );

    AppState {
        store,
        pipeline,
        dbpedia,
        start_time: Instant::now(),
    }
}

/// Serve the API on an ephemeral port and return its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

/// A SPARQL JSON results document with the given bindings.
pub fn sparql_results(bindings: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "head": { "vars": [] },
        "results": { "bindings": bindings }
    })
}
