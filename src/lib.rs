//! edugraph - Education-ontology SPARQL API service
//!
//! A REST API over an Apache Fuseki triple store for an intelligent
//! education ontology, plus a natural-language-to-SPARQL search
//! pipeline backed by the Gemini API with deterministic fallbacks.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`store`] - Fuseki SPARQL protocol client
//! - [`ontology`] - Vocabulary, URI conventions, literal escaping
//! - [`sparql`] - Query/update text construction helpers
//! - [`validation`] - Request body validators
//! - [`api`] - HTTP JSON API (axum routes and server)
//! - [`nlp`] - Question analysis (pattern fallback)
//! - [`llm`] - Gemini client, LLM analysis, SPARQL generation
//! - [`search`] - Search pipeline and template engine
//! - [`enrich`] - DBpedia Lookup enrichment
//! - [`loader`] - One-off dataset loading and verification
//!
//! # Example
//!
//! ```no_run
//! use edugraph::api::ApiServer;
//! use edugraph::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = ApiServer::new(config)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod llm;
pub mod loader;
pub mod nlp;
pub mod ontology;
pub mod search;
pub mod sparql;
pub mod store;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{ApiServer, AppState};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::search::SearchPipeline;
    pub use crate::store::results::Row;
    pub use crate::store::SparqlStore;
}
