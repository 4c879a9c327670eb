//! Academic orientation endpoints (`/api/orientations-academiques`)
//!
//! Orientations carry relationship triples besides their own
//! properties: the person participating, the recommended specialty and
//! course, the proposed internship project. Create and update issue
//! one INSERT per relationship, after the main block.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, RDFS};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{str_field, validate_orientation};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orientations-academiques",
            get(list_orientations).post(create_orientation),
        )
        .route("/orientations-academiques/facets", get(orientation_facets))
        .route("/orientations-academiques/search", post(search_orientations))
        .route(
            "/orientations-academiques/{id}",
            get(get_orientation)
                .put(update_orientation)
                .delete(delete_orientation),
        )
        .route(
            "/orientations-academiques/{id}/dbpedia-enrich",
            get(enrich_orientation),
        )
}

/// All orientations with their relationships.
async fn list_orientations(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?orientation ?objectifOrientation ?typeOrientation ?dateOrientation
       ?personne ?nomPersonne ?prenomPersonne ?specialite ?nomSpecialite
       ?cours ?intitule ?projet ?titreProjet
WHERE {{
    ?orientation a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    OPTIONAL {{ ?orientation ont:objectifOrientation ?objectifOrientation . }}
    OPTIONAL {{ ?orientation ont:typeOrientation ?typeOrientation . }}
    OPTIONAL {{ ?orientation ont:dateOrientation ?dateOrientation . }}
    OPTIONAL {{
        ?personne ont:participeA ?orientation .
        ?personne ont:nom ?nomPersonne .
        ?personne ont:prenom ?prenomPersonne .
    }}
    OPTIONAL {{
        ?orientation ont:recommandeSpecialite ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
    OPTIONAL {{
        ?orientation ont:recommandeCours ?cours .
        ?cours ont:intitule ?intitule .
    }}
    OPTIONAL {{
        ?orientation ont:proposeStage ?projet .
        ?projet ont:titreProjet ?titreProjet .
    }}
}}
ORDER BY DESC(?dateOrientation)"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One orientation with its relationships.
async fn get_orientation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?orientation ?objectifOrientation ?typeOrientation ?dateOrientation
       ?personne ?nomPersonne ?prenomPersonne ?specialite ?nomSpecialite
       ?cours ?intitule ?projet ?titreProjet
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    OPTIONAL {{ <{uri}> ont:objectifOrientation ?objectifOrientation . }}
    OPTIONAL {{ <{uri}> ont:typeOrientation ?typeOrientation . }}
    OPTIONAL {{ <{uri}> ont:dateOrientation ?dateOrientation . }}
    OPTIONAL {{
        ?personne ont:participeA <{uri}> .
        ?personne ont:nom ?nomPersonne .
        ?personne ont:prenom ?prenomPersonne .
    }}
    OPTIONAL {{
        <{uri}> ont:recommandeSpecialite ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
    OPTIONAL {{
        <{uri}> ont:recommandeCours ?cours .
        ?cours ont:intitule ?intitule .
    }}
    OPTIONAL {{
        <{uri}> ont:proposeStage ?projet .
        ?projet ont:titreProjet ?titreProjet .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Orientation non trouvée"))
}

/// Relationship INSERTs attached to an orientation, one update each.
fn relationship_updates(uri: &str, data: &Value) -> Vec<String> {
    let mut updates = Vec::new();
    if let Some(person) = str_field(data, "personne") {
        updates.push(format!(
            "PREFIX ont: <{ONT}>\nINSERT DATA {{ <{person}> ont:participeA <{uri}> . }}"
        ));
    }
    if let Some(specialty) = str_field(data, "specialite") {
        updates.push(format!(
            "PREFIX ont: <{ONT}>\nINSERT DATA {{ <{uri}> ont:recommandeSpecialite <{specialty}> . }}"
        ));
    }
    if let Some(course) = str_field(data, "cours") {
        updates.push(format!(
            "PREFIX ont: <{ONT}>\nINSERT DATA {{ <{uri}> ont:recommandeCours <{course}> . }}"
        ));
    }
    if let Some(project) = str_field(data, "projet") {
        updates.push(format!(
            "PREFIX ont: <{ONT}>\nINSERT DATA {{ <{uri}> ont:proposeStage <{project}> . }}"
        ));
    }
    updates
}

/// Create an orientation plus its relationship triples.
async fn create_orientation(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_orientation(&data))?;

    let objective = str_field(&data, "objectifOrientation").unwrap_or_default();
    let uri = mint_uri("OrientationAcademique", &sanitize_fragment(objective, 50));

    let mut builder = InsertBuilder::new(&uri, "OrientationAcademique");
    builder.literal("objectifOrientation", objective);
    if let Some(kind) = str_field(&data, "typeOrientation") {
        builder.literal("typeOrientation", kind);
    }
    if let Some(date) = str_field(&data, "dateOrientation") {
        builder.date("dateOrientation", date);
    }

    state.store.update(&builder.build()).await?;
    for update in relationship_updates(&uri, &data) {
        state.store.update(&update).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Orientation créée avec succès", "uri": uri })),
    ))
}

/// Update an orientation: drop its properties and every relationship
/// triple, then reinsert from the body. Several sequential updates, no
/// transaction.
async fn update_orientation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_orientation(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let reverse_deletes = [
        format!("PREFIX ont: <{ONT}>\nDELETE WHERE {{ ?personne ont:participeA <{uri}> . }}"),
        format!("PREFIX ont: <{ONT}>\nDELETE WHERE {{ <{uri}> ont:recommandeSpecialite ?specialite . }}"),
        format!("PREFIX ont: <{ONT}>\nDELETE WHERE {{ <{uri}> ont:recommandeCours ?cours . }}"),
        format!("PREFIX ont: <{ONT}>\nDELETE WHERE {{ <{uri}> ont:proposeStage ?projet . }}"),
    ];
    for update in &reverse_deletes {
        state.store.update(update).await?;
    }

    let mut builder = InsertBuilder::new(&uri, "OrientationAcademique");
    if let Some(objective) = str_field(&data, "objectifOrientation") {
        builder.literal("objectifOrientation", objective);
    }
    if let Some(kind) = str_field(&data, "typeOrientation") {
        builder.literal("typeOrientation", kind);
    }
    if let Some(date) = str_field(&data, "dateOrientation") {
        builder.date("dateOrientation", date);
    }

    state.store.update(&builder.build()).await?;
    for update in relationship_updates(&uri, &data) {
        state.store.update(&update).await?;
    }

    Ok(Json(json!({ "message": "Orientation mise à jour avec succès" })))
}

/// Delete an orientation.
async fn delete_orientation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Orientation supprimée avec succès" })))
}

/// Search orientations by objective and type regex.
async fn search_orientations(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?orientation ?objectifOrientation ?typeOrientation ?dateOrientation
WHERE {{
    ?orientation a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    OPTIONAL {{ ?orientation ont:objectifOrientation ?objectifOrientation . }}
    OPTIONAL {{ ?orientation ont:typeOrientation ?typeOrientation . }}
    OPTIONAL {{ ?orientation ont:dateOrientation ?dateOrientation . }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("objectifOrientation", str_field(&data, "objectifOrientation")),
        ("typeOrientation", str_field(&data, "typeOrientation")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY DESC(?dateOrientation)");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type and recommended specialty.
async fn orientation_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?typeOrientation (COUNT(DISTINCT ?orientation) as ?count)
WHERE {{
    ?orientation a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    ?orientation ont:typeOrientation ?typeOrientation .
}}
GROUP BY ?typeOrientation
ORDER BY DESC(?count)"#
    );

    let by_specialty = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?specialite ?nomSpecialite (COUNT(DISTINCT ?orientation) as ?count)
WHERE {{
    ?orientation a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    ?orientation ont:recommandeSpecialite ?specialite .
    ?specialite ont:nomSpecialite ?nomSpecialite .
}}
GROUP BY ?specialite ?nomSpecialite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_specialite": state.store.query(&by_specialty).await?,
    })))
}

/// Linked-data enrichment keyed on the orientation objective.
async fn enrich_orientation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?objectifOrientation ?typeOrientation
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:OrientationAcademique .
    OPTIONAL {{ <{uri}> ont:objectifOrientation ?objectifOrientation . }}
    OPTIONAL {{ <{uri}> ont:typeOrientation ?typeOrientation . }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let orientation = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Orientation non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            first_field(&orientation, &["objectifOrientation", "typeOrientation"])
        });

    Ok(Json(
        dbpedia_enrichment(&state, "orientation", orientation, term).await,
    ))
}
