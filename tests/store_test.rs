//! Integration tests for the Fuseki store client using wiremock

mod common;

use edugraph::store::{SparqlStore, StoreError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::sparql_results;

/// Queries go over POST and the bindings come back flattened to local
/// names.
#[tokio::test]
async fn test_query_flattens_bindings() {
    let mock_server = MockServer::start().await;

    let body = sparql_results(serde_json::json!([
        {
            "cours": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Cours_BD_1"},
            "intitule": {"type": "literal", "value": "Bases de données"}
        },
        {
            "cours": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Cours_RX_2"},
            "intitule": {"type": "literal", "value": "Réseaux"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    let rows = store.query("SELECT ?cours ?intitule WHERE { }").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["cours"], "Cours_BD_1");
    assert_eq!(rows[0]["intitule"], "Bases de données");
    assert_eq!(rows[1]["cours"], "Cours_RX_2");
}

/// The raw variant keeps term kinds, needed by the graph view.
#[tokio::test]
async fn test_query_raw_preserves_kinds() {
    let mock_server = MockServer::start().await;

    let body = sparql_results(serde_json::json!([
        {
            "s": {"type": "uri", "value": "http://example.org/a"},
            "o": {"type": "literal", "value": "texte"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    let bindings = store.query_raw("SELECT * WHERE { }").await.unwrap();

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0]["s"].value, "http://example.org/a");
    assert_eq!(
        bindings[0]["s"].kind,
        edugraph::store::results::TermKind::Uri
    );
    assert_eq!(
        bindings[0]["o"].kind,
        edugraph::store::results::TermKind::Literal
    );
}

/// Non-2xx from Fuseki surfaces as a status error with the body text.
#[tokio::test]
async fn test_query_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Parse error at line 1"))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    let result = store.query("not sparql").await;

    match result {
        Err(StoreError::Status { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Parse error"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

/// Malformed JSON results are a decode error, not a panic.
#[tokio::test]
async fn test_query_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    assert!(matches!(
        store.query("SELECT * WHERE { }").await,
        Err(StoreError::Decode(_))
    ));
}

/// Updates POST the raw body with the SPARQL update content type.
#[tokio::test]
async fn test_update_posts_sparql_update() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .and(header("content-type", "application/sparql-update"))
        .and(body_string_contains("INSERT DATA"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    store
        .update("INSERT DATA { <http://example.org/a> a <http://example.org/B> . }")
        .await
        .unwrap();
}

/// A rejected update carries the status and body back to the caller.
#[tokio::test]
async fn test_update_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(500).set_body_string("update failed"))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    assert!(matches!(
        store.update("DELETE WHERE { ?s ?p ?o }").await,
        Err(StoreError::Status { status: 500, .. })
    ));
}

/// Turtle uploads hit the dataset's /data endpoint.
#[tokio::test]
async fn test_upload_turtle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/data"))
        .and(header("content-type", "text/turtle"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    store
        .upload_turtle("<http://example.org/a> a <http://example.org/B> .".to_string())
        .await
        .unwrap();
}

/// Carriage returns are stripped before the query is sent.
#[tokio::test]
async fn test_query_normalization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_results(serde_json::json!([]))))
        .mount(&mock_server)
        .await;

    let store = SparqlStore::new(&mock_server.uri()).unwrap();
    let rows = store
        .query("SELECT ?s\r\nWHERE { ?s ?p ?o }\r\n")
        .await
        .unwrap();
    assert!(rows.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(!body.contains("%0D")); // no CR survived the form encoding
}
