//! Pedagogical resource endpoints (`/api/ressources-pedagogiques`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{escape_literal, mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, RDFS};
use crate::sparql::{delete_all_properties, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{str_field, validate_resource};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ressources-pedagogiques",
            get(list_resources).post(create_resource),
        )
        .route("/ressources-pedagogiques/facets", get(resource_facets))
        .route("/ressources-pedagogiques/search", post(search_resources))
        .route(
            "/ressources-pedagogiques/{id}",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route(
            "/ressources-pedagogiques/{id}/dbpedia-enrich",
            get(enrich_resource),
        )
}

/// All resources with their hosting technology.
async fn list_resources(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?ressource ?titreRessource ?typeRessource ?formatRessource ?urlRessource
       ?technologie ?nomTechnologie
WHERE {{
    ?ressource a ?type .
    ?type rdfs:subClassOf* ont:RessourcePedagogique .
    OPTIONAL {{ ?ressource ont:titreRessource ?titreRessource . }}
    OPTIONAL {{ ?ressource ont:typeRessource ?typeRessource . }}
    OPTIONAL {{ ?ressource ont:formatRessource ?formatRessource . }}
    OPTIONAL {{ ?ressource ont:urlRessource ?urlRessource . }}
    OPTIONAL {{
        ?ressource ont:estHebergePar ?technologie .
        ?technologie ont:nomTechnologie ?nomTechnologie .
    }}
}}
ORDER BY ?titreRessource"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One resource.
async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?ressource ?titreRessource ?typeRessource ?formatRessource ?urlRessource
       ?technologie ?nomTechnologie
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:RessourcePedagogique .
    OPTIONAL {{ <{uri}> ont:titreRessource ?titreRessource . }}
    OPTIONAL {{ <{uri}> ont:typeRessource ?typeRessource . }}
    OPTIONAL {{ <{uri}> ont:formatRessource ?formatRessource . }}
    OPTIONAL {{ <{uri}> ont:urlRessource ?urlRessource . }}
    OPTIONAL {{
        <{uri}> ont:estHebergePar ?technologie .
        ?technologie ont:nomTechnologie ?nomTechnologie .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Ressource non trouvée"))
}

/// Create a resource.
async fn create_resource(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_resource(&data))?;

    let title = str_field(&data, "titreRessource").unwrap_or_default();
    let uri = mint_uri("RessourcePedagogique", &sanitize_fragment(title, 50));

    let mut builder = InsertBuilder::new(&uri, "RessourcePedagogique");
    builder.literal("titreRessource", title);
    append_resource_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Ressource créée avec succès", "uri": uri })),
    ))
}

fn append_resource_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(kind) = str_field(data, "typeRessource") {
        builder.literal("typeRessource", kind);
    }
    if let Some(format) = str_field(data, "formatRessource") {
        builder.literal("formatRessource", format);
    }
    // The resource URL is stored as a URI object, not a literal.
    if let Some(url) = str_field(data, "urlRessource") {
        builder.link("urlRessource", url);
    }
    if let Some(technology) = str_field(data, "technologie") {
        builder.link("estHebergePar", technology);
    }
}

/// Update a resource (delete-then-insert, no transaction).
async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_resource(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "RessourcePedagogique");
    if let Some(title) = str_field(&data, "titreRessource") {
        builder.literal("titreRessource", title);
    }
    append_resource_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Ressource mise à jour avec succès" })))
}

/// Delete a resource.
async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Ressource supprimée avec succès" })))
}

/// Search resources: case-insensitive title contains, exact type match.
async fn search_resources(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut constraints = String::new();
    if let Some(kind) = str_field(&data, "typeRessource") {
        constraints.push_str(&format!(
            "    ?ressource ont:typeRessource \"{}\" .\n",
            escape_literal(kind)
        ));
    }

    let mut filter = String::new();
    if let Some(title) = str_field(&data, "titreRessource") {
        filter = format!(
            "    FILTER(CONTAINS(LCASE(?titreRessource), LCASE(\"{}\")))\n",
            escape_literal(title)
        );
    }

    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
PREFIX rdfs: <{RDFS}>
SELECT ?ressource ?titreRessource ?typeRessource ?formatRessource ?urlRessource
WHERE {{
    ?ressource a ?type .
    ?type rdfs:subClassOf* ont:RessourcePedagogique .
{constraints}    OPTIONAL {{ ?ressource ont:titreRessource ?titreRessource . }}
    OPTIONAL {{ ?ressource ont:typeRessource ?typeRessource . }}
    OPTIONAL {{ ?ressource ont:formatRessource ?formatRessource . }}
    OPTIONAL {{ ?ressource ont:urlRessource ?urlRessource . }}
{filter}}}
ORDER BY ?titreRessource"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type and hosting technology.
async fn resource_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?typeRessource (COUNT(DISTINCT ?ressource) as ?count)
WHERE {{
    ?ressource a ?type .
    ?type rdfs:subClassOf* ont:RessourcePedagogique .
    ?ressource ont:typeRessource ?typeRessource .
}}
GROUP BY ?typeRessource
ORDER BY DESC(?count)"#
    );

    let by_technology = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?technologie ?nomTechnologie (COUNT(DISTINCT ?ressource) as ?count)
WHERE {{
    ?technologie ont:hebergeRessource ?ressource .
    ?technologie ont:nomTechnologie ?nomTechnologie .
}}
GROUP BY ?technologie ?nomTechnologie
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_technologie": state.store.query(&by_technology).await?,
    })))
}

/// Linked-data enrichment keyed on the resource title.
async fn enrich_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdfs: <{RDFS}>
SELECT ?titreRessource ?typeRessource
WHERE {{
    <{uri}> a ?type .
    ?type rdfs:subClassOf* ont:RessourcePedagogique .
    OPTIONAL {{ <{uri}> ont:titreRessource ?titreRessource . }}
    OPTIONAL {{ <{uri}> ont:typeRessource ?typeRessource . }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let resource = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Ressource non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&resource, &["titreRessource", "typeRessource"]));

    Ok(Json(
        dbpedia_enrichment(&state, "ressource", resource, term).await,
    ))
}
