//! End-to-end API tests: the axum router in front of a wiremock Fuseki

mod common;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{sparql_results, spawn_app, test_state};

#[tokio::test]
async fn test_health_endpoint() {
    let fuseki = MockServer::start().await;
    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::get(format!("{base}/api/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_root_banner() {
    let fuseki = MockServer::start().await;
    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["message"].as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_list_courses_returns_rows() {
    let fuseki = MockServer::start().await;

    let bindings = sparql_results(json!([
        {
            "cours": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Cours_BD_1"},
            "intitule": {"type": "literal", "value": "Bases de données"},
            "codeCours": {"type": "literal", "value": "BD101"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let rows: serde_json::Value = reqwest::get(format!("{base}/api/cours"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["cours"], "Cours_BD_1");
    assert_eq!(rows[0]["codeCours"], "BD101");
}

#[tokio::test]
async fn test_create_course_returns_201_and_uri() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .and(body_string_contains("INSERT DATA"))
        .and(body_string_contains("ont:codeCours \"BD101\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/cours"))
        .json(&json!({"intitule": "Bases de données", "codeCours": "BD101", "creditsECTS": 6}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["uri"]
        .as_str()
        .unwrap()
        .starts_with("http://www.education-intelligente.org/ontologie#Cours_BD101_"));
    assert_eq!(body["message"], "Cours créé avec succès");
}

#[tokio::test]
async fn test_create_course_validation_error_map() {
    let fuseki = MockServer::start().await;
    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/cours"))
        .json(&json!({"creditsECTS": 99}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["errors"]["intitule"], "Intitule est requis");
    assert_eq!(body["errors"]["codeCours"], "Code cours est requis");
    assert!(body["errors"]["creditsECTS"]
        .as_str()
        .unwrap()
        .contains("inférieur ou égal à 30"));
}

#[tokio::test]
async fn test_get_missing_entity_is_404() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_results(json!([]))))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::get(format!("{base}/api/cours/Cours_INCONNU_123"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cours non trouvé");
}

/// Delete normalizes bare fragments into full ontology URIs.
#[tokio::test]
async fn test_delete_normalizes_uri() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .and(body_string_contains(
            "<http://www.education-intelligente.org/ontologie#Personne_DUPONT_JEAN_ab12cd34>",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .delete(format!("{base}/api/personnes/Personne_DUPONT_JEAN_ab12cd34"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Personne supprimée avec succès");
}

/// Update runs two sequential updates: a delete then an insert.
#[tokio::test]
async fn test_update_runs_delete_then_insert() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/update"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::Client::new()
        .put(format!("{base}/api/cours/Cours_BD101_ab12cd34"))
        .json(&json!({"intitule": "Bases de données avancées", "codeCours": "BD201"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let requests = fuseki.received_requests().await.unwrap();
    let bodies: Vec<String> = requests
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .collect();
    assert!(bodies[0].contains("DELETE"));
    assert!(bodies[1].contains("INSERT DATA"));
}

/// Store failures come back as 500 with the error string.
#[tokio::test]
async fn test_store_failure_maps_to_500() {
    let fuseki = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Fuseki down"))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let response = reqwest::get(format!("{base}/api/universites")).await.unwrap();
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("503"));
}

/// Facets endpoints aggregate several GROUP BY queries into one object.
#[tokio::test]
async fn test_course_facets_shape() {
    let fuseki = MockServer::start().await;

    let counts = sparql_results(json!([
        {
            "semestre": {"type": "literal", "value": "S1"},
            "count": {"type": "typed-literal", "value": "4"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(counts))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/cours/facets"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for key in ["by_semestre", "by_langue", "by_specialite", "by_credits"] {
        assert!(body[key].is_array(), "missing facet {key}");
    }
}

/// The university detail endpoint regroups relation rows.
#[tokio::test]
async fn test_university_detail_regroups() {
    let fuseki = MockServer::start().await;

    let bindings = sparql_results(json!([
        {
            "universite": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Universite_TUNIS_1"},
            "nomUniversite": {"type": "literal", "value": "Université de Tunis"},
            "specialite": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Specialite_INFO_1"},
            "nomSpecialite": {"type": "literal", "value": "Informatique"}
        },
        {
            "universite": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Universite_TUNIS_1"},
            "nomUniversite": {"type": "literal", "value": "Université de Tunis"},
            "specialite": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Specialite_DROIT_2"},
            "nomSpecialite": {"type": "literal", "value": "Droit"}
        }
    ]));

    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bindings))
        .mount(&fuseki)
        .await;

    let base = spawn_app(test_state(&fuseki.uri(), &fuseki.uri())).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/universites/Universite_TUNIS_1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["info_generale"]["nomUniversite"], "Université de Tunis");
    assert_eq!(body["specialites"].as_array().unwrap().len(), 2);
    assert_eq!(body["etudiants"].as_array().unwrap().len(), 0);
}
