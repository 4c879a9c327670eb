//! Diagnostics and statistics endpoints
//!
//! The root banner, health check, the Fuseki connectivity test with its
//! per-class data summary, ontology-wide statistics, education-domain
//! statistics, and the graph view used by the frontend visualization.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::ontology::{ONT, RDF, RDFS};
use crate::store::results::{Term, TermKind};

use super::error::ApiResult;
use super::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/test", get(test_connection))
        .route("/ontology-stats", get(ontology_stats))
        .route("/education-stats", get(education_stats))
        .route("/ontology/graph", get(ontology_graph))
}

/// Root banner.
pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Education Intelligente Platform API is running!" }))
}

/// Liveness probe.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "API fonctionnelle" }))
}

/// Connectivity test: total triple count plus counts of the main
/// person/course classes, or 500 with the store error.
async fn test_connection(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let total = state
        .store
        .query("SELECT (COUNT(*) as ?count) WHERE { ?s ?p ?o }")
        .await?;

    let count_of = |class: &str| {
        format!(
            "PREFIX edu: <{ONT}>\nSELECT (COUNT(*) as ?count) WHERE {{ ?s a edu:{class} . }}"
        )
    };

    let persons = state.store.query(&count_of("Personne")).await?;
    let students = state.store.query(&count_of("Etudiant")).await?;
    let teachers = state.store.query(&count_of("Enseignant")).await?;
    let courses = state.store.query(&count_of("Cours")).await?;

    let first_count = |rows: &[BTreeMap<String, String>]| {
        rows.first()
            .and_then(|row| row.get("count"))
            .cloned()
            .unwrap_or_else(|| "0".to_string())
    };

    Ok(Json(json!({
        "status": "success",
        "message": "Connexion Fuseki OK",
        "data_summary": {
            "total_triplets": first_count(&total),
            "total_personnes": first_count(&persons),
            "total_etudiants": first_count(&students),
            "total_enseignants": first_count(&teachers),
            "total_cours": first_count(&courses),
        }
    })))
}

/// Ontology-wide statistics for the navbar: schema counts, per-class
/// instance counts and the ontology header metadata.
async fn ontology_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats_query = format!(
        r#"PREFIX edu: <{ONT}>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX rdfs: <{RDFS}>

SELECT
    (COUNT(DISTINCT ?class) as ?total_classes)
    (COUNT(DISTINCT ?property) as ?total_properties)
    (COUNT(DISTINCT ?individual) as ?total_individuals)
WHERE {{
    {{
        ?class a owl:Class .
        FILTER(STRSTARTS(STR(?class), "{ONT}"))
    }} UNION {{
        ?property a owl:ObjectProperty .
        FILTER(STRSTARTS(STR(?property), "{ONT}"))
    }} UNION {{
        ?property a owl:DatatypeProperty .
        FILTER(STRSTARTS(STR(?property), "{ONT}"))
    }} UNION {{
        ?individual a ?class .
        FILTER(STRSTARTS(STR(?class), "{ONT}"))
    }}
}}"#
    );

    let instances_query = format!(
        r#"PREFIX edu: <{ONT}>

SELECT
    (COUNT(DISTINCT ?personne) as ?personnes)
    (COUNT(DISTINCT ?etudiant) as ?etudiants)
    (COUNT(DISTINCT ?enseignant) as ?enseignants)
    (COUNT(DISTINCT ?cours) as ?cours)
    (COUNT(DISTINCT ?universite) as ?universites)
    (COUNT(DISTINCT ?specialite) as ?specialites)
    (COUNT(DISTINCT ?competence) as ?competences)
    (COUNT(DISTINCT ?projet) as ?projets)
    (COUNT(DISTINCT ?ressource) as ?ressources)
    (COUNT(DISTINCT ?technologie) as ?technologies)
WHERE {{
    OPTIONAL {{ ?personne a edu:Personne }}
    OPTIONAL {{ ?etudiant a edu:Etudiant }}
    OPTIONAL {{ ?enseignant a edu:Enseignant }}
    OPTIONAL {{ ?cours a edu:Cours }}
    OPTIONAL {{ ?universite a edu:Universite }}
    OPTIONAL {{ ?specialite a edu:Specialite }}
    OPTIONAL {{ ?competence a edu:Competence }}
    OPTIONAL {{ ?projet a edu:ProjetAcademique }}
    OPTIONAL {{ ?ressource a edu:RessourcePedagogique }}
    OPTIONAL {{ ?technologie a edu:TechnologieEducative }}
}}"#
    );

    let info_query = format!(
        r#"PREFIX edu: <{ONT}>
PREFIX terms: <http://purl.org/dc/terms/>
PREFIX owl: <http://www.w3.org/2002/07/owl#>

SELECT ?title ?description ?version ?creator ?created
WHERE {{
    ?ontology a owl:Ontology .
    OPTIONAL {{ ?ontology terms:title ?title }}
    OPTIONAL {{ ?ontology terms:description ?description }}
    OPTIONAL {{ ?ontology owl:versionInfo ?version }}
    OPTIONAL {{ ?ontology terms:creator ?creator }}
    OPTIONAL {{ ?ontology terms:created ?created }}
}}"#
    );

    let statistics = state.store.query(&stats_query).await?;
    let instances = state.store.query(&instances_query).await?;
    let info = state.store.query(&info_query).await?;

    Ok(Json(json!({
        "status": "success",
        "ontology_info": info.first().cloned().unwrap_or_default(),
        "statistics": statistics.first().cloned().unwrap_or_default(),
        "instances": instances.first().cloned().unwrap_or_default(),
    })))
}

/// Education-domain statistics: students by level, teachers by grade,
/// courses by specialty.
async fn education_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let students_by_level = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?niveau (COUNT(?etudiant) as ?count)
WHERE {{
    ?etudiant a edu:Etudiant .
    OPTIONAL {{ ?etudiant edu:niveauEtude ?niveau . }}
}}
GROUP BY ?niveau"#
    );

    let teachers_by_grade = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?grade (COUNT(?enseignant) as ?count)
WHERE {{
    ?enseignant a edu:Enseignant .
    OPTIONAL {{ ?enseignant edu:grade ?grade . }}
}}
GROUP BY ?grade"#
    );

    let courses_by_specialty = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?specialite ?nomSpecialite (COUNT(?cours) as ?count)
WHERE {{
    ?cours a edu:Cours .
    ?cours edu:faitPartieDe ?specialite .
    ?specialite edu:nomSpecialite ?nomSpecialite .
}}
GROUP BY ?specialite ?nomSpecialite"#
    );

    Ok(Json(json!({
        "status": "success",
        "etudiants_par_niveau": state.store.query(&students_by_level).await?,
        "enseignants_par_grade": state.store.query(&teachers_by_grade).await?,
        "cours_par_specialite": state.store.query(&courses_by_specialty).await?,
    })))
}

// ============================================================================
// Ontology graph view
// ============================================================================

#[derive(Debug, Serialize)]
struct GraphNode {
    id: String,
    label: String,
    types: Vec<String>,
    properties: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
struct GraphEdge {
    source: String,
    target: String,
    predicate: String,
    #[serde(rename = "predicateLabel")]
    predicate_label: String,
}

fn short_label(uri: &str) -> String {
    let tail = uri.rsplit('#').next().unwrap_or(uri);
    tail.rsplit('/').next().unwrap_or(tail).to_string()
}

/// Graph of the main-class individuals and their outgoing properties:
/// URI objects become edges (rdf:type excluded), literals accumulate on
/// the subject node.
async fn ontology_graph(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let query = format!(
        r#"PREFIX edu: <{ONT}>
PREFIX rdfs: <{RDFS}>
PREFIX rdf: <{RDF}>

SELECT DISTINCT ?s ?sLabel ?type ?p ?pLabel ?o ?oLabel WHERE {{
    ?s a ?type .
    ?type rdfs:subClassOf* ?superType .
    VALUES ?superType {{ edu:Personne edu:Etudiant edu:Enseignant edu:Cours edu:Universite edu:Specialite edu:Competence }}
    OPTIONAL {{ ?s rdfs:label ?sLabel }}
    OPTIONAL {{
        ?s ?p ?o .
        OPTIONAL {{ ?p rdfs:label ?pLabel }}
        OPTIONAL {{ ?o rdfs:label ?oLabel }}
    }}
}}
LIMIT 2000"#
    );

    let bindings = state.store.query_raw(&query).await?;

    let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
    let mut edges: Vec<GraphEdge> = Vec::new();

    let value_of = |binding: &BTreeMap<String, Term>, var: &str| -> Option<String> {
        binding.get(var).map(|t| t.value.clone())
    };

    for binding in &bindings {
        let Some(subject) = value_of(binding, "s") else {
            continue;
        };
        let subject_label = value_of(binding, "sLabel");

        let node = nodes.entry(subject.clone()).or_insert_with(|| GraphNode {
            id: subject.clone(),
            label: subject_label.clone().unwrap_or_else(|| short_label(&subject)),
            types: Vec::new(),
            properties: BTreeMap::new(),
        });

        if let Some(ty) = value_of(binding, "type") {
            if !node.types.contains(&ty) {
                node.types.push(ty);
            }
        }

        let (Some(predicate), Some(object)) = (binding.get("p"), binding.get("o")) else {
            continue;
        };
        let predicate_value = predicate.value.clone();
        let predicate_label = value_of(binding, "pLabel");

        if object.kind == TermKind::Uri {
            let target = object.value.clone();
            let target_label = value_of(binding, "oLabel");
            nodes.entry(target.clone()).or_insert_with(|| GraphNode {
                id: target.clone(),
                label: target_label.unwrap_or_else(|| short_label(&target)),
                types: Vec::new(),
                properties: BTreeMap::new(),
            });

            // rdf:type triples are shown via node types, not as edges.
            if predicate_value != format!("{RDF}type") {
                edges.push(GraphEdge {
                    source: subject.clone(),
                    target,
                    predicate_label: predicate_label
                        .unwrap_or_else(|| short_label(&predicate_value)),
                    predicate: predicate_value,
                });
            }
        } else if let Some(node) = nodes.get_mut(&subject) {
            node.properties
                .entry(predicate_value)
                .or_default()
                .push(object.value.clone());
        }
    }

    let nodes: Vec<&GraphNode> = nodes.values().collect();
    Ok(Json(json!({ "nodes": nodes, "edges": edges })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("http://example.org/onto#Cours_X"), "Cours_X");
        assert_eq!(short_label("http://example.org/resource/Paris"), "Paris");
        assert_eq!(short_label("plain"), "plain");
    }
}
