//! Academic project endpoints (`/api/projets-academiques`)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{mint_uri, normalize_uri, sanitize_fragment, ONT};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{float_field, str_field, validate_project};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projets-academiques",
            get(list_projects).post(create_project),
        )
        .route("/projets-academiques/facets", get(project_facets))
        .route("/projets-academiques/search", post(search_projects))
        .route(
            "/projets-academiques/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projets-academiques/{id}/dbpedia-enrich", get(enrich_project))
}

/// All projects with their student and the student's university.
async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?projet ?titreProjet ?domaineProjet ?typeProjet ?noteProjet ?etudiant ?nomEtudiant ?prenomEtudiant
       ?universite ?nomUniversite
WHERE {{
    ?projet a ont:ProjetAcademique .
    OPTIONAL {{ ?projet ont:titreProjet ?titreProjet . }}
    OPTIONAL {{ ?projet ont:domaineProjet ?domaineProjet . }}
    OPTIONAL {{ ?projet ont:typeProjet ?typeProjet . }}
    OPTIONAL {{ ?projet ont:noteProjet ?noteProjet . }}
    OPTIONAL {{
        ?projet ont:realisePar ?etudiant .
        ?etudiant ont:nom ?nomEtudiant .
        ?etudiant ont:prenom ?prenomEtudiant .
    }}
    OPTIONAL {{
        ?etudiant ont:appartientA ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY ?titreProjet"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One project with student, required competency and orientation links.
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?projet ?titreProjet ?domaineProjet ?typeProjet ?noteProjet
       ?etudiant ?nomEtudiant ?prenomEtudiant
       ?competence ?nomCompetence
       ?orientation ?objectifOrientation
WHERE {{
    <{uri}> a ont:ProjetAcademique .
    OPTIONAL {{ <{uri}> ont:titreProjet ?titreProjet . }}
    OPTIONAL {{ <{uri}> ont:domaineProjet ?domaineProjet . }}
    OPTIONAL {{ <{uri}> ont:typeProjet ?typeProjet . }}
    OPTIONAL {{ <{uri}> ont:noteProjet ?noteProjet . }}
    OPTIONAL {{
        <{uri}> ont:realisePar ?etudiant .
        ?etudiant ont:nom ?nomEtudiant .
        ?etudiant ont:prenom ?prenomEtudiant .
    }}
    OPTIONAL {{
        <{uri}> ont:requiertCompetence ?competence .
        ?competence ont:nomCompetence ?nomCompetence .
    }}
    OPTIONAL {{
        ?orientation ont:proposeStage <{uri}> .
        ?orientation ont:objectifOrientation ?objectifOrientation .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Projet non trouvé"))
}

/// Create a project.
async fn create_project(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_project(&data))?;

    let title = str_field(&data, "titreProjet").unwrap_or_default();
    let uri = mint_uri("ProjetAcademique", &sanitize_fragment(title, 50));

    let mut builder = InsertBuilder::new(&uri, "ProjetAcademique");
    builder.literal("titreProjet", title);
    append_project_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Projet créé avec succès", "uri": uri })),
    ))
}

fn append_project_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(domain) = str_field(data, "domaineProjet") {
        builder.literal("domaineProjet", domain);
    }
    if let Some(kind) = str_field(data, "typeProjet") {
        builder.literal("typeProjet", kind);
    }
    if let Some(Ok(grade)) = float_field(data, "noteProjet") {
        builder.decimal("noteProjet", grade);
    }
    if let Some(student) = str_field(data, "etudiant") {
        builder.link("realisePar", student);
    }
    if let Some(competency) = str_field(data, "competence") {
        builder.link("requiertCompetence", competency);
    }
}

/// Update a project (delete-then-insert, no transaction).
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_project(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "ProjetAcademique");
    if let Some(title) = str_field(&data, "titreProjet") {
        builder.literal("titreProjet", title);
    }
    append_project_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Projet mis à jour avec succès" })))
}

/// Delete a project.
async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Projet supprimé avec succès" })))
}

/// Search projects by title, domain and type regex.
async fn search_projects(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?projet ?titreProjet ?domaineProjet ?typeProjet ?noteProjet
WHERE {{
    ?projet a ont:ProjetAcademique .
    OPTIONAL {{ ?projet ont:titreProjet ?titreProjet . }}
    OPTIONAL {{ ?projet ont:domaineProjet ?domaineProjet . }}
    OPTIONAL {{ ?projet ont:typeProjet ?typeProjet . }}
    OPTIONAL {{ ?projet ont:noteProjet ?noteProjet . }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("titreProjet", str_field(&data, "titreProjet")),
        ("domaineProjet", str_field(&data, "domaineProjet")),
        ("typeProjet", str_field(&data, "typeProjet")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?titreProjet");

    Ok(Json(state.store.query(&query).await?))
}

/// Faceted counts by type, domain and organizing university.
async fn project_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?typeProjet (COUNT(DISTINCT ?projet) as ?count)
WHERE {{
    ?projet a ont:ProjetAcademique .
    ?projet ont:typeProjet ?typeProjet .
}}
GROUP BY ?typeProjet
ORDER BY DESC(?count)"#
    );

    let by_domain = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?domaineProjet (COUNT(DISTINCT ?projet) as ?count)
WHERE {{
    ?projet a ont:ProjetAcademique .
    ?projet ont:domaineProjet ?domaineProjet .
}}
GROUP BY ?domaineProjet
ORDER BY DESC(?count)"#
    );

    let by_university = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?universite ?nomUniversite (COUNT(DISTINCT ?projet) as ?count)
WHERE {{
    ?projet a ont:ProjetAcademique .
    ?projet ont:estOrganisePar ?universite .
    ?universite ont:nomUniversite ?nomUniversite .
}}
GROUP BY ?universite ?nomUniversite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    Ok(Json(json!({
        "by_type": state.store.query(&by_type).await?,
        "by_domaine": state.store.query(&by_domain).await?,
        "by_universite": state.store.query(&by_university).await?,
    })))
}

/// Linked-data enrichment keyed on the project title, else the
/// organizing university's city.
async fn enrich_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?titreProjet ?ville ?pays ?nomUniversite
WHERE {{
    <{uri}> a ont:ProjetAcademique .
    OPTIONAL {{ <{uri}> ont:titreProjet ?titreProjet . }}
    OPTIONAL {{
        <{uri}> ont:estOrganisePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
        OPTIONAL {{ ?universite ont:ville ?ville . }}
        OPTIONAL {{ ?universite ont:pays ?pays . }}
    }}
}}
LIMIT 1"#
    );

    let rows = state.store.query(&query).await?;
    let project = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Projet non trouvé"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&project, &["titreProjet", "ville"]));

    Ok(Json(dbpedia_enrichment(&state, "projet", project, term).await))
}
