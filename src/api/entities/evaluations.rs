//! Evaluation endpoints (`/api/evaluations`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{escape_literal, mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, RDFS, XSD};
use crate::sparql::{delete_all_properties, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{str_field, validate_evaluation};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/evaluations", get(list_evaluations).post(create_evaluation))
        .route("/evaluations/facets", get(evaluation_facets))
        .route("/evaluations/search", post(search_evaluations))
        .route(
            "/evaluations/{id}",
            get(get_evaluation)
                .put(update_evaluation)
                .delete(delete_evaluation),
        )
        .route("/evaluations/{id}/dbpedia-enrich", get(enrich_evaluation))
}

/// All evaluations with course, competency and technology context.
async fn list_evaluations(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?evaluation ?typeEvaluation ?dateEvaluation
       ?cours ?intitule ?competence ?nomCompetence
       ?technologie ?nomTechnologie
WHERE {{
    ?evaluation a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    OPTIONAL {{ ?evaluation ont:typeEvaluation ?typeEvaluation . }}
    OPTIONAL {{ ?evaluation ont:dateEvaluation ?dateEvaluation . }}
    OPTIONAL {{
        ?evaluation ont:porteSur ?cours .
        ?cours ont:intitule ?intitule .
    }}
    OPTIONAL {{
        ?evaluation ont:mesureCompetence ?competence .
        ?competence ont:nomCompetence ?nomCompetence .
    }}
    OPTIONAL {{
        ?evaluation ont:faciliteePar ?technologie .
        ?technologie ont:nomTechnologie ?nomTechnologie .
    }}
}}
ORDER BY DESC(?dateEvaluation)"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One evaluation; `porteSur` may point at a course or a project.
async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?evaluation ?typeEvaluation ?dateEvaluation
       ?cours ?intitule ?projet ?titreProjet
       ?competence ?nomCompetence
       ?technologie ?nomTechnologie
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    OPTIONAL {{ <{uri}> ont:typeEvaluation ?typeEvaluation . }}
    OPTIONAL {{ <{uri}> ont:dateEvaluation ?dateEvaluation . }}
    OPTIONAL {{
        <{uri}> ont:porteSur ?cours .
        ?cours ont:intitule ?intitule .
    }}
    OPTIONAL {{
        <{uri}> ont:porteSur ?projet .
        ?projet ont:titreProjet ?titreProjet .
    }}
    OPTIONAL {{
        <{uri}> ont:mesureCompetence ?competence .
        ?competence ont:nomCompetence ?nomCompetence .
    }}
    OPTIONAL {{
        <{uri}> ont:faciliteePar ?technologie .
        ?technologie ont:nomTechnologie ?nomTechnologie .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Évaluation non trouvée"))
}

/// Create an evaluation. The URI fragment embeds type and date.
async fn create_evaluation(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_evaluation(&data))?;

    let kind = str_field(&data, "typeEvaluation").unwrap_or_default();
    let date = str_field(&data, "dateEvaluation").unwrap_or_default();
    let fragment = format!(
        "{}_{}",
        sanitize_fragment(kind, 30),
        date.replace('-', "")
    );
    let uri = mint_uri("Evaluation", &fragment);

    let mut builder = InsertBuilder::new(&uri, "Evaluation");
    builder.literal("typeEvaluation", kind);
    append_evaluation_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Évaluation créée avec succès", "uri": uri })),
    ))
}

fn append_evaluation_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(date) = str_field(data, "dateEvaluation") {
        builder.date("dateEvaluation", date);
    }
    if let Some(course) = str_field(data, "cours") {
        builder.link("porteSur", course);
    }
    if let Some(project) = str_field(data, "projet") {
        builder.link("porteSur", project);
    }
    if let Some(competency) = str_field(data, "competence") {
        builder.link("mesureCompetence", competency);
    }
    if let Some(technology) = str_field(data, "technologie") {
        builder.link("faciliteePar", technology);
    }
}

/// Update an evaluation (delete-then-insert, no transaction).
async fn update_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_evaluation(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "Evaluation");
    if let Some(kind) = str_field(&data, "typeEvaluation") {
        builder.literal("typeEvaluation", kind);
    }
    append_evaluation_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Évaluation mise à jour avec succès" })))
}

/// Delete an evaluation.
async fn delete_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Évaluation supprimée avec succès" })))
}

/// Search evaluations by type regex and exact date.
async fn search_evaluations(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut clauses: Vec<String> = Vec::new();
    if let Some(kind) = str_field(&data, "typeEvaluation") {
        if !kind.is_empty() {
            clauses.push(format!(
                "REGEX(?typeEvaluation, \"{}\", \"i\")",
                escape_literal(kind)
            ));
        }
    }
    if let Some(date) = str_field(&data, "dateEvaluation") {
        if !date.is_empty() {
            clauses.push(format!(
                "?dateEvaluation = \"{}\"^^xsd:date",
                escape_literal(date)
            ));
        }
    }

    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
PREFIX xsd: <{XSD}>
SELECT ?evaluation ?typeEvaluation ?dateEvaluation
WHERE {{
    ?evaluation a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    OPTIONAL {{ ?evaluation ont:typeEvaluation ?typeEvaluation . }}
    OPTIONAL {{ ?evaluation ont:dateEvaluation ?dateEvaluation . }}
"#
    );

    if !clauses.is_empty() {
        query.push_str(&format!("    FILTER({})\n", clauses.join(" && ")));
    }
    query.push_str("} ORDER BY DESC(?dateEvaluation)");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type, evaluated course and measured competency.
async fn evaluation_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?typeEvaluation (COUNT(DISTINCT ?evaluation) as ?count)
WHERE {{
    ?evaluation a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    ?evaluation ont:typeEvaluation ?typeEvaluation .
}}
GROUP BY ?typeEvaluation
ORDER BY DESC(?count)"#
    );

    let by_course = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?cours ?intitule (COUNT(DISTINCT ?evaluation) as ?count)
WHERE {{
    ?evaluation a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    ?evaluation ont:porteSur ?cours .
    ?cours ont:intitule ?intitule .
}}
GROUP BY ?cours ?intitule
ORDER BY DESC(?count)
LIMIT 20"#
    );

    let by_competency = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?competence ?nomCompetence (COUNT(DISTINCT ?evaluation) as ?count)
WHERE {{
    ?evaluation a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    ?evaluation ont:mesureCompetence ?competence .
    ?competence ont:nomCompetence ?nomCompetence .
}}
GROUP BY ?competence ?nomCompetence
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_cours": state.store.query(&by_course).await?,
        "by_competence": state.store.query(&by_competency).await?,
    })))
}

/// Linked-data enrichment keyed on the evaluation type, else the
/// evaluated course title.
async fn enrich_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?typeEvaluation ?intituleCours
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Evaluation .
    OPTIONAL {{ <{uri}> ont:typeEvaluation ?typeEvaluation . }}
    OPTIONAL {{
        <{uri}> ont:porteSur ?cours .
        ?cours ont:intitule ?intituleCours .
    }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let evaluation = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Évaluation non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&evaluation, &["typeEvaluation", "intituleCours"]));

    Ok(Json(
        dbpedia_enrichment(&state, "evaluation", evaluation, term).await,
    ))
}
