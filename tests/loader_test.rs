//! Dataset loader tests against a wiremock Fuseki

mod common;

use std::io::Write;

use edugraph::loader::Loader;
use edugraph::store::SparqlStore;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::sparql_results;

#[tokio::test]
async fn test_load_uploads_and_verifies() {
    let fuseki = MockServer::start().await;

    // Connectivity probe against the server root.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fuseki)
        .await;

    // Turtle upload.
    Mock::given(method("POST"))
        .and(path("/data"))
        .and(header("content-type", "text/turtle"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&fuseki)
        .await;

    // Verification counts, one query per class family.
    let count = sparql_results(serde_json::json!([
        {"count": {"type": "typed-literal", "value": "7"}}
    ]));
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(count))
        .mount(&fuseki)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "<http://www.education-intelligente.org/ontologie#U1> a <http://www.education-intelligente.org/ontologie#Universite> ."
    )
    .unwrap();

    let loader = Loader::new(SparqlStore::new(&fuseki.uri()).unwrap());
    let counts = loader.run(file.path(), false).await.unwrap();

    assert_eq!(counts.len(), 10);
    assert!(counts.iter().all(|c| c.count == 7));
    assert!(counts.iter().any(|c| c.label == "Universites"));
}

#[tokio::test]
async fn test_load_clear_flag_issues_clear_all() {
    let fuseki = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fuseki)
        .await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .and(body_string_contains("CLEAR ALL"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fuseki)
        .await;

    Mock::given(method("POST"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fuseki)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sparql_results(serde_json::json!([]))),
        )
        .mount(&fuseki)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# empty dataset").unwrap();

    let loader = Loader::new(SparqlStore::new(&fuseki.uri()).unwrap());
    let counts = loader.run(file.path(), true).await.unwrap();

    // No bindings means every count reads as zero.
    assert!(counts.iter().all(|c| c.count == 0));
}
