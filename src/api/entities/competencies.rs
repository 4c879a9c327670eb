//! Competency endpoints (`/api/competences`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, RDFS};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{str_field, validate_competency};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/competences", get(list_competencies).post(create_competency))
        .route("/competences/facets", get(competency_facets))
        .route("/competences/search", post(search_competencies))
        .route(
            "/competences/{id}",
            get(get_competency)
                .put(update_competency)
                .delete(delete_competency),
        )
        .route("/competences/{id}/dbpedia-enrich", get(enrich_competency))
}

/// All competencies with the specialty training them.
async fn list_competencies(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?competence ?nomCompetence ?typeCompetence ?niveauCompetence ?descriptionCompetence ?motsCles
       ?specialite ?nomSpecialite
WHERE {{
    ?competence a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    OPTIONAL {{ ?competence ont:nomCompetence ?nomCompetence . }}
    OPTIONAL {{ ?competence ont:typeCompetence ?typeCompetence . }}
    OPTIONAL {{ ?competence ont:niveauCompetence ?niveauCompetence . }}
    OPTIONAL {{ ?competence ont:descriptionCompetence ?descriptionCompetence . }}
    OPTIONAL {{ ?competence ont:motsCles ?motsCles . }}
    OPTIONAL {{
        ?specialite ont:formePour ?competence .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
}}
ORDER BY ?nomCompetence"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One competency with its specialty and related projects.
async fn get_competency(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?competence ?nomCompetence ?typeCompetence ?niveauCompetence ?descriptionCompetence ?motsCles
       ?specialite ?nomSpecialite ?projet ?titreProjet
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    OPTIONAL {{ <{uri}> ont:nomCompetence ?nomCompetence . }}
    OPTIONAL {{ <{uri}> ont:typeCompetence ?typeCompetence . }}
    OPTIONAL {{ <{uri}> ont:niveauCompetence ?niveauCompetence . }}
    OPTIONAL {{ <{uri}> ont:descriptionCompetence ?descriptionCompetence . }}
    OPTIONAL {{ <{uri}> ont:motsCles ?motsCles . }}
    OPTIONAL {{
        ?specialite ont:formePour <{uri}> .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
    OPTIONAL {{
        ?projet ont:requiertCompetence <{uri}> .
        ?projet ont:titreProjet ?titreProjet .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Compétence non trouvée"))
}

/// Create a competency.
async fn create_competency(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_competency(&data))?;

    let name = str_field(&data, "nomCompetence").unwrap_or_default();
    let uri = mint_uri("Competence", &sanitize_fragment(name, 50));

    let mut builder = InsertBuilder::new(&uri, "Competence");
    builder.literal("nomCompetence", name);
    append_competency_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Compétence créée avec succès", "uri": uri })),
    ))
}

fn append_competency_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(kind) = str_field(data, "typeCompetence") {
        builder.literal("typeCompetence", kind);
    }
    if let Some(level) = str_field(data, "niveauCompetence") {
        builder.literal("niveauCompetence", level);
    }
    if let Some(description) = str_field(data, "descriptionCompetence") {
        builder.literal("descriptionCompetence", description);
    }
    if let Some(keywords) = str_field(data, "motsCles") {
        builder.literal("motsCles", keywords);
    }
}

/// Update a competency (delete-then-insert, no transaction).
async fn update_competency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_competency(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "Competence");
    if let Some(name) = str_field(&data, "nomCompetence") {
        builder.literal("nomCompetence", name);
    }
    append_competency_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Compétence mise à jour avec succès" })))
}

/// Delete a competency.
async fn delete_competency(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Compétence supprimée avec succès" })))
}

/// Search competencies by name and type regex.
async fn search_competencies(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?competence ?nomCompetence ?typeCompetence ?niveauCompetence ?descriptionCompetence
WHERE {{
    ?competence a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    OPTIONAL {{ ?competence ont:nomCompetence ?nomCompetence . }}
    OPTIONAL {{ ?competence ont:typeCompetence ?typeCompetence . }}
    OPTIONAL {{ ?competence ont:niveauCompetence ?niveauCompetence . }}
    OPTIONAL {{ ?competence ont:descriptionCompetence ?descriptionCompetence . }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("nomCompetence", str_field(&data, "nomCompetence")),
        ("typeCompetence", str_field(&data, "typeCompetence")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?nomCompetence");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type, level and training specialty.
async fn competency_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?typeCompetence (COUNT(DISTINCT ?competence) as ?count)
WHERE {{
    ?competence a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    ?competence ont:typeCompetence ?typeCompetence .
}}
GROUP BY ?typeCompetence
ORDER BY DESC(?count)"#
    );

    let by_level = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?niveauCompetence (COUNT(DISTINCT ?competence) as ?count)
WHERE {{
    ?competence a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    ?competence ont:niveauCompetence ?niveauCompetence .
}}
GROUP BY ?niveauCompetence
ORDER BY DESC(?count)"#
    );

    let by_specialty = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?specialite ?nomSpecialite (COUNT(DISTINCT ?competence) as ?count)
WHERE {{
    ?specialite ont:formePour ?competence .
    ?specialite ont:nomSpecialite ?nomSpecialite .
}}
GROUP BY ?specialite ?nomSpecialite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_niveau": state.store.query(&by_level).await?,
        "by_specialite": state.store.query(&by_specialty).await?,
    })))
}

/// Linked-data enrichment keyed on the competency name.
async fn enrich_competency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?nomCompetence ?typeCompetence
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Competence .
    OPTIONAL {{ <{uri}> ont:nomCompetence ?nomCompetence . }}
    OPTIONAL {{ <{uri}> ont:typeCompetence ?typeCompetence . }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let competency = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Compétence non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&competency, &["nomCompetence", "typeCompetence"]));

    Ok(Json(
        dbpedia_enrichment(&state, "competence", competency, term).await,
    ))
}
