//! DBpedia lookup tests: client parsing and the enrichment endpoints

mod common;

use edugraph::config::DbpediaConfig;
use edugraph::enrich::DbpediaClient;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{sparql_results, spawn_app, test_state};

fn lookup_client(base: &str) -> DbpediaClient {
    DbpediaClient::new(DbpediaConfig {
        lookup_url: format!("{base}/api/search/KeywordSearch"),
        timeout_secs: 5,
        max_hits: 10,
    })
    .unwrap()
}

/// XML answers (the Lookup API default) parse into title/uri pairs.
#[tokio::test]
async fn test_lookup_parses_xml() {
    let mock = MockServer::start().await;

    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ArrayOfResult>
  <Result>
    <Label>Sorbonne University</Label>
    <URI>http://dbpedia.org/resource/Sorbonne_University</URI>
  </Result>
</ArrayOfResult>"#;

    Mock::given(method("GET"))
        .and(path("/api/search/KeywordSearch"))
        .and(query_param("QueryString", "Sorbonne"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(xml)
                .insert_header("content-type", "application/xml"),
        )
        .mount(&mock)
        .await;

    let client = lookup_client(&mock.uri());
    let response = client.search_entities("Sorbonne").await.unwrap();

    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].title, "Sorbonne University");
    assert_eq!(response.search_text, "Sorbonne");
}

/// JSON answers with the docs/array-field shape parse too.
#[tokio::test]
async fn test_lookup_parses_json_docs() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search/KeywordSearch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "docs": [
                        {
                            "label": ["Machine learning"],
                            "resource": ["http://dbpedia.org/resource/Machine_learning"]
                        }
                    ]
                }))
                .insert_header("content-type", "application/json"),
        )
        .mount(&mock)
        .await;

    let client = lookup_client(&mock.uri());
    let response = client.search_entities("machine learning").await.unwrap();

    assert_eq!(response.results[0].uri, "http://dbpedia.org/resource/Machine_learning");
}

/// The /api/dbpedia/search endpoint degrades lookup failures into an
/// error payload, not an HTTP error.
#[tokio::test]
async fn test_dbpedia_search_endpoint_degrades() {
    let fuseki = MockServer::start().await;
    // No lookup mock mounted: the call will fail.
    let base = spawn_app(test_state(&fuseki.uri(), "http://127.0.0.1:1")).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/dbpedia/search"))
        .json(&json!({"text": "Sorbonne"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["search_text"], "Sorbonne");
    assert!(body["error"].is_string());
}

/// Empty search text is a 400.
#[tokio::test]
async fn test_dbpedia_search_requires_text() {
    let fuseki = MockServer::start().await;
    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/dbpedia/search"))
        .json(&json!({"text": ""}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

/// The per-entity enrichment endpoint attaches the best reference and
/// up to five alternatives to the local entity data.
#[tokio::test]
async fn test_course_enrichment_payload() {
    let services = MockServer::start().await;

    let course = sparql_results(json!([
        {
            "intitule": {"type": "literal", "value": "Apprentissage automatique"},
            "codeCours": {"type": "literal", "value": "ML101"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(course))
        .mount(&services)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/search/KeywordSearch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "docs": [
                        {"label": ["Machine learning"], "resource": ["http://dbpedia.org/resource/Machine_learning"]},
                        {"label": ["Apprentissage"], "resource": ["http://dbpedia.org/resource/Apprentissage"]}
                    ]
                }))
                .insert_header("content-type", "application/json"),
        )
        .mount(&services)
        .await;

    let base = spawn_app(test_state(&services.uri(), &services.uri())).await;

    let body: serde_json::Value =
        reqwest::get(format!("{base}/api/cours/Cours_ML101_ab12cd34/dbpedia-enrich"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

    assert_eq!(body["search_term"], "Apprentissage automatique");
    assert_eq!(body["cours"]["codeCours"], "ML101");
    assert_eq!(body["dbpedia_enrichment"]["title"], "Machine learning");
    assert_eq!(
        body["dbpedia_enrichment"]["all_results"].as_array().unwrap().len(),
        2
    );
}

/// A custom ?term= overrides the entity-derived search term.
#[tokio::test]
async fn test_enrichment_term_override() {
    let services = MockServer::start().await;

    let course = sparql_results(json!([
        {"intitule": {"type": "literal", "value": "Bases de données"}}
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(course))
        .mount(&services)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/search/KeywordSearch"))
        .and(query_param("QueryString", "SQL"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "docs": [{"label": ["SQL"], "resource": ["http://dbpedia.org/resource/SQL"]}]
                }))
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&services)
        .await;

    let base = spawn_app(test_state(&services.uri(), &services.uri())).await;

    let body: serde_json::Value = reqwest::get(format!(
        "{base}/api/cours/Cours_BD101_ab12cd34/dbpedia-enrich?term=SQL"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(body["search_term"], "SQL");
    assert_eq!(body["dbpedia_enrichment"]["uri"], "http://dbpedia.org/resource/SQL");
}
