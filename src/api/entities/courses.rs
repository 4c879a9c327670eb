//! Course endpoints (`/api/cours`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, RDFS};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{int_field, str_field, validate_course};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cours", get(list_courses).post(create_course))
        .route("/cours/facets", get(course_facets))
        .route("/cours/search", post(search_courses))
        .route(
            "/cours/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/cours/{id}/dbpedia-enrich", get(enrich_course))
}

/// All courses, subclasses included.
async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre ?volumeHoraire ?langueCours
       ?specialite ?nomSpecialite
WHERE {{
    ?cours a ?type .
    ?type rdfs:subClassOf* ont:Cours .
    OPTIONAL {{ ?cours ont:intitule ?intitule . }}
    OPTIONAL {{ ?cours ont:codeCours ?codeCours . }}
    OPTIONAL {{ ?cours ont:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ ?cours ont:semestre ?semestre . }}
    OPTIONAL {{ ?cours ont:volumeHoraire ?volumeHoraire . }}
    OPTIONAL {{ ?cours ont:langueCours ?langueCours . }}
    OPTIONAL {{
        ?cours ont:faitPartieDe ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
}}
ORDER BY ?codeCours"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One course with its specialty and teacher.
async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre ?volumeHoraire ?langueCours
       ?specialite ?nomSpecialite ?enseignant ?nomEnseignant ?prenomEnseignant
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Cours .
    OPTIONAL {{ <{uri}> ont:intitule ?intitule . }}
    OPTIONAL {{ <{uri}> ont:codeCours ?codeCours . }}
    OPTIONAL {{ <{uri}> ont:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ <{uri}> ont:semestre ?semestre . }}
    OPTIONAL {{ <{uri}> ont:volumeHoraire ?volumeHoraire . }}
    OPTIONAL {{ <{uri}> ont:langueCours ?langueCours . }}
    OPTIONAL {{
        <{uri}> ont:faitPartieDe ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
    OPTIONAL {{
        <{uri}> ont:enseignePar ?enseignant .
        ?enseignant ont:nom ?nomEnseignant .
        ?enseignant ont:prenom ?prenomEnseignant .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cours non trouvé"))
}

/// Create a course.
async fn create_course(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_course(&data))?;

    let code = str_field(&data, "codeCours").unwrap_or_default();
    let uri = mint_uri("Cours", &sanitize_fragment(code, usize::MAX));

    let mut builder = InsertBuilder::new(&uri, "Cours");
    builder.literal("intitule", str_field(&data, "intitule").unwrap_or_default());
    builder.literal("codeCours", code);
    if let Some(Ok(credits)) = int_field(&data, "creditsECTS") {
        builder.integer("creditsECTS", credits);
    }
    if let Some(semester) = str_field(&data, "semestre") {
        builder.literal("semestre", semester);
    }
    if let Some(Ok(hours)) = int_field(&data, "volumeHoraire") {
        builder.integer("volumeHoraire", hours);
    }
    if let Some(language) = str_field(&data, "langueCours") {
        builder.literal("langueCours", language);
    }
    if let Some(specialty) = str_field(&data, "specialite") {
        builder.link("faitPartieDe", specialty);
    }

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Cours créé avec succès", "uri": uri })),
    ))
}

/// Update a course: delete all properties, reinsert from the body.
/// Two sequential updates, no transaction.
async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_course(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "Cours");
    if let Some(title) = str_field(&data, "intitule") {
        builder.literal("intitule", title);
    }
    if let Some(code) = str_field(&data, "codeCours") {
        builder.literal("codeCours", code);
    }
    if let Some(Ok(credits)) = int_field(&data, "creditsECTS") {
        builder.integer("creditsECTS", credits);
    }
    if let Some(semester) = str_field(&data, "semestre") {
        builder.literal("semestre", semester);
    }
    if let Some(Ok(hours)) = int_field(&data, "volumeHoraire") {
        builder.integer("volumeHoraire", hours);
    }
    if let Some(language) = str_field(&data, "langueCours") {
        builder.literal("langueCours", language);
    }
    if let Some(specialty) = str_field(&data, "specialite") {
        builder.link("faitPartieDe", specialty);
    }

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Cours mis à jour avec succès" })))
}

/// Delete a course and every triple it is the subject of.
async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Cours supprimé avec succès" })))
}

/// Search courses by title/code/semester regex.
async fn search_courses(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre ?volumeHoraire ?langueCours
WHERE {{
    ?cours a ?type .
    ?type rdfs:subClassOf* ont:Cours .
    OPTIONAL {{ ?cours ont:intitule ?intitule . }}
    OPTIONAL {{ ?cours ont:codeCours ?codeCours . }}
    OPTIONAL {{ ?cours ont:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ ?cours ont:semestre ?semestre . }}
    OPTIONAL {{ ?cours ont:volumeHoraire ?volumeHoraire . }}
    OPTIONAL {{ ?cours ont:langueCours ?langueCours . }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("intitule", str_field(&data, "intitule")),
        ("codeCours", str_field(&data, "codeCours")),
        ("semestre", str_field(&data, "semestre")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?codeCours");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts: by semester, language, specialty and ECTS credits.
async fn course_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let facet = |select: &str, pattern: &str, group: &str, limit: &str| {
        format!(
            r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT {select} (COUNT(DISTINCT ?cours) as ?count)
WHERE {{
    ?cours a ?type .
    ?type rdfs:subClassOf* ont:Cours .
    {pattern}
}}
GROUP BY {group}
ORDER BY DESC(?count){limit}"#
        )
    };

    let by_semester = facet("?semestre", "?cours ont:semestre ?semestre .", "?semestre", "");
    let by_language = facet(
        "?langueCours",
        "?cours ont:langueCours ?langueCours .",
        "?langueCours",
        "",
    );
    let by_specialty = facet(
        "?specialite ?nomSpecialite",
        "?cours ont:faitPartieDe ?specialite .\n    ?specialite ont:nomSpecialite ?nomSpecialite .",
        "?specialite ?nomSpecialite",
        "\nLIMIT 20",
    );
    let by_credits = facet(
        "?creditsECTS",
        "?cours ont:creditsECTS ?creditsECTS .",
        "?creditsECTS",
        "",
    );

    Ok(Json(json!({
        "by_semestre": state.store.query(&by_semester).await?,
        "by_langue": state.store.query(&by_language).await?,
        "by_specialite": state.store.query(&by_specialty).await?,
        "by_credits": state.store.query(&by_credits).await?,
    })))
}

/// Linked-data enrichment from DBpedia, keyed on the course title.
async fn enrich_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?intitule ?codeCours ?nomSpecialite
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:Cours .
    OPTIONAL {{ <{uri}> ont:intitule ?intitule . }}
    OPTIONAL {{ <{uri}> ont:codeCours ?codeCours . }}
    OPTIONAL {{
        <{uri}> ont:faitPartieDe ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let course = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Cours non trouvé"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&course, &["intitule", "codeCours"]));

    Ok(Json(dbpedia_enrichment(&state, "cours", course, term).await))
}
