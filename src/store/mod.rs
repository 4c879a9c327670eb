//! Triple-store client
//!
//! [`SparqlStore`] wraps one Fuseki dataset and speaks the SPARQL 1.1
//! protocol over HTTP: queries go to `<base>/query`, updates to
//! `<base>/update`, bulk data to `<base>/data`. All queries are sent via
//! POST to avoid URL length limits on the large generated queries.
//!
//! The store performs no retries and keeps no state; every call is one
//! HTTP round trip.

pub mod results;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;

use results::{flatten, Row, SelectResults, Term};

/// Errors from the triple-store protocol layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, ...).
    #[error("Erreur SPARQL: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Erreur SPARQL: {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not valid SPARQL JSON results.
    #[error("Erreur SPARQL: réponse illisible: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for one Fuseki dataset.
#[derive(Debug, Clone)]
pub struct SparqlStore {
    client: Client,
    base: String,
}

impl SparqlStore {
    /// Create a store client for the given dataset base URL
    /// (e.g. `http://localhost:3030/education`).
    pub fn new(endpoint: &str) -> Result<Self, StoreError> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    /// Create a store client with an explicit request timeout.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Dataset base URL this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.base
    }

    /// Execute a SELECT query and return flattened rows.
    ///
    /// Binding values are trimmed to their local name, matching what the
    /// REST layer serves to clients.
    pub async fn query(&self, query: &str) -> Result<Vec<Row>, StoreError> {
        Ok(flatten(self.select(query).await?))
    }

    /// Execute a SELECT query and return the raw terms, with URI/literal
    /// kinds preserved. Used by the ontology graph view, which needs to
    /// distinguish edges from literal properties.
    pub async fn query_raw(
        &self,
        query: &str,
    ) -> Result<Vec<BTreeMap<String, Term>>, StoreError> {
        Ok(self.select(query).await?.results.bindings)
    }

    async fn select(&self, query: &str) -> Result<SelectResults, StoreError> {
        let query = normalize_query(query);
        tracing::debug!(len = query.len(), "executing SPARQL query");

        let response = self
            .client
            .post(format!("{}/query", self.base))
            .header(ACCEPT, "application/sparql-results+json")
            .form(&[("query", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "SPARQL query rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Execute a SPARQL Update (INSERT/DELETE).
    pub async fn update(&self, update: &str) -> Result<(), StoreError> {
        let update = normalize_query(update);
        tracing::debug!(len = update.len(), "executing SPARQL update");

        let response = self
            .client
            .post(format!("{}/update", self.base))
            .header(CONTENT_TYPE, "application/sparql-update")
            .body(update)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "SPARQL update rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Upload a Turtle document into the dataset (`<base>/data`).
    pub async fn upload_turtle(&self, turtle: String) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!("{}/data", self.base))
            .header(CONTENT_TYPE, "text/turtle")
            .body(turtle)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Check that the Fuseki server behind the dataset answers at all.
    pub async fn ping(&self) -> Result<(), StoreError> {
        // The dataset base itself may 404 on GET; the server root is enough
        // to prove connectivity.
        let root = match url::Url::parse(&self.base) {
            Ok(mut parsed) => {
                parsed.set_path("/");
                parsed.set_query(None);
                parsed.to_string()
            }
            Err(_) => self.base.clone(),
        };
        self.client.get(root).send().await?;
        Ok(())
    }
}

/// Strip carriage returns and surrounding whitespace before sending a
/// query. SPARQL comments are newline-terminated, so `\n` is kept.
fn normalize_query(query: &str) -> String {
    query.replace('\r', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  SELECT * WHERE { ?s ?p ?o }\r\n"), "SELECT * WHERE { ?s ?p ?o }");
        assert_eq!(
            normalize_query("PREFIX ont: <x>\r\nSELECT ?s WHERE {}"),
            "PREFIX ont: <x>\nSELECT ?s WHERE {}"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let store = SparqlStore::new("http://localhost:3030/education/").unwrap();
        assert_eq!(store.endpoint(), "http://localhost:3030/education");
    }
}
