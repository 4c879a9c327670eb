//! Educational technology endpoints (`/api/technologies-educatives`)
//!
//! Technologies are linked from both sides: universities adopt them,
//! courses integrate them, resources are hosted on them. Create takes
//! an optional adopting university (a reverse triple); delete cleans
//! the reverse links as well.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{mint_uri, normalize_uri, sanitize_fragment, ONT};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{str_field, validate_technology};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/technologies-educatives",
            get(list_technologies).post(create_technology),
        )
        .route("/technologies-educatives/facets", get(technology_facets))
        .route("/technologies-educatives/search", post(search_technologies))
        .route(
            "/technologies-educatives/{id}",
            get(get_technology)
                .put(update_technology)
                .delete(delete_technology),
        )
        .route(
            "/technologies-educatives/{id}/dbpedia-enrich",
            get(enrich_technology),
        )
}

/// All technologies with adopting universities and hosted resources.
async fn list_technologies(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?technologie ?nomTechnologie ?typeTechnologie ?universite ?nomUniversite
       ?ressource ?titreRessource
WHERE {{
    ?technologie a ont:TechnologieEducative .
    OPTIONAL {{ ?technologie ont:nomTechnologie ?nomTechnologie . }}
    OPTIONAL {{ ?technologie ont:typeTechnologie ?typeTechnologie . }}
    OPTIONAL {{
        ?universite ont:adopteTechnologie ?technologie .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
    OPTIONAL {{
        ?technologie ont:hebergeRessource ?ressource .
        ?ressource ont:titreRessource ?titreRessource .
    }}
}}
ORDER BY ?nomTechnologie"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One technology with its university, resource and course links.
async fn get_technology(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?technologie ?nomTechnologie ?typeTechnologie
       ?universite ?nomUniversite
       ?ressource ?titreRessource
       ?cours ?intitule
WHERE {{
    <{uri}> a ont:TechnologieEducative .
    OPTIONAL {{ <{uri}> ont:nomTechnologie ?nomTechnologie . }}
    OPTIONAL {{ <{uri}> ont:typeTechnologie ?typeTechnologie . }}
    OPTIONAL {{
        ?universite ont:adopteTechnologie <{uri}> .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
    OPTIONAL {{
        <{uri}> ont:hebergeRessource ?ressource .
        ?ressource ont:titreRessource ?titreRessource .
    }}
    OPTIONAL {{
        ?cours ont:integreTechnologie <{uri}> .
        ?cours ont:intitule ?intitule .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Technologie non trouvée"))
}

/// Create a technology; an optional `universite` adds the reverse
/// adoption link.
async fn create_technology(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_technology(&data))?;

    let name = str_field(&data, "nomTechnologie").unwrap_or_default();
    let uri = mint_uri("TechnologieEducative", &sanitize_fragment(name, 50));

    let mut builder = InsertBuilder::new(&uri, "TechnologieEducative");
    builder.literal("nomTechnologie", name);
    if let Some(kind) = str_field(&data, "typeTechnologie") {
        builder.literal("typeTechnologie", kind);
    }
    if let Some(university) = str_field(&data, "universite") {
        builder.triple(university, "adopteTechnologie", &uri);
    }

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Technologie créée avec succès", "uri": uri })),
    ))
}

/// Update a technology (delete-then-insert, no transaction).
async fn update_technology(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_technology(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "TechnologieEducative");
    if let Some(name) = str_field(&data, "nomTechnologie") {
        builder.literal("nomTechnologie", name);
    }
    if let Some(kind) = str_field(&data, "typeTechnologie") {
        builder.literal("typeTechnologie", kind);
    }

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Technologie mise à jour avec succès" })))
}

/// Delete a technology, including the reverse adoption/integration
/// triples pointing at it. Three sequential updates.
async fn delete_technology(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);

    state.store.update(&delete_all_properties(&uri)).await?;
    state
        .store
        .update(&format!(
            "PREFIX ont: <{ONT}>\nDELETE WHERE {{\n    ?univ ont:adopteTechnologie <{uri}> .\n}}"
        ))
        .await?;
    state
        .store
        .update(&format!(
            "PREFIX ont: <{ONT}>\nDELETE WHERE {{\n    ?cours ont:integreTechnologie <{uri}> .\n}}"
        ))
        .await?;

    Ok(Json(json!({ "message": "Technologie supprimée avec succès" })))
}

/// Search technologies by name and type regex.
async fn search_technologies(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?technologie ?nomTechnologie ?typeTechnologie
WHERE {{
    ?technologie a ont:TechnologieEducative .
    OPTIONAL {{ ?technologie ont:nomTechnologie ?nomTechnologie . }}
    OPTIONAL {{ ?technologie ont:typeTechnologie ?typeTechnologie . }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("nomTechnologie", str_field(&data, "nomTechnologie")),
        ("typeTechnologie", str_field(&data, "typeTechnologie")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?nomTechnologie");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type and adopting university.
async fn technology_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?typeTechnologie (COUNT(DISTINCT ?technologie) as ?count)
WHERE {{
    ?technologie a ont:TechnologieEducative .
    ?technologie ont:typeTechnologie ?typeTechnologie .
}}
GROUP BY ?typeTechnologie
ORDER BY DESC(?count)"#
    );

    let by_university = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?universite ?nomUniversite (COUNT(DISTINCT ?technologie) as ?count)
WHERE {{
    ?universite ont:adopteTechnologie ?technologie .
    ?universite ont:nomUniversite ?nomUniversite .
}}
GROUP BY ?universite ?nomUniversite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_universite": state.store.query(&by_university).await?,
    })))
}

/// Linked-data enrichment keyed on the technology name.
async fn enrich_technology(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?nomTechnologie ?typeTechnologie
WHERE {{
    <{uri}> a ont:TechnologieEducative .
    OPTIONAL {{ <{uri}> ont:nomTechnologie ?nomTechnologie . }}
    OPTIONAL {{ <{uri}> ont:typeTechnologie ?typeTechnologie . }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let technology = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Technologie non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&technology, &["nomTechnologie", "typeTechnologie"]));

    Ok(Json(
        dbpedia_enrichment(&state, "technologie", technology, term).await,
    ))
}
