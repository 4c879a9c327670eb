//! Search pipeline tests: template fallback without a Gemini key

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{sparql_results, spawn_app, test_state};

/// With no Gemini key the pipeline answers from the template engine
/// and says so in pipeline_info.
#[tokio::test]
async fn test_search_uses_template_fallback() {
    let fuseki = MockServer::start().await;

    let bindings = sparql_results(json!([
        {
            "universite": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Universite_TUNIS_1"},
            "nomUniversite": {"type": "literal", "value": "Université de Tunis"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"question": "liste des universités"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["pipeline_info"]["method"], "template_fallback");
    assert_eq!(body["pipeline_info"]["status"], "success");
    assert_eq!(body["pipeline_info"]["results_count"], 1);
    assert!(body["sparql_query"]
        .as_str()
        .unwrap()
        .contains("ont:Universite"));
    assert_eq!(body["results"][0]["nomUniversite"], "Université de Tunis");
}

/// The analysis travels with the response.
#[tokio::test]
async fn test_search_response_carries_analysis() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_results(json!([]))))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"question": "combien d'étudiants ?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let analysis = &body["taln_analysis"];
    assert_eq!(analysis["original_question"], "combien d'étudiants ?");
    assert_eq!(analysis["intent"]["primary_intent"], "count");
    assert!(analysis["entities"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["ontology_class"] == "edu:Etudiant"));
    assert_eq!(
        analysis["analysis_metadata"]["method"],
        "pattern_matching"
    );
}

/// An empty question is a 400.
#[tokio::test]
async fn test_search_empty_question() {
    let fuseki = MockServer::start().await;
    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"question": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Question vide");
}

/// A failing SPARQL execution reports sparql_error with a 500 but
/// still returns the generated query for debugging.
#[tokio::test]
async fn test_search_sparql_error_status() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"question": "liste des cours"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["pipeline_info"]["status"], "sparql_error");
    assert!(body["sparql_query"].as_str().unwrap().contains("SELECT"));
}

/// Questions with no recognizable entity still produce a query (the
/// broad inventory fallback), never a failure.
#[tokio::test]
async fn test_search_unrecognized_question_falls_back() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_results(json!([]))))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{base}/api/search"))
        .json(&json!({"question": "dis bonjour"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["pipeline_info"]["status"], "success");
    assert!(body["sparql_query"].as_str().unwrap().contains("SELECT"));
}
