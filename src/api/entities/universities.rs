//! University endpoints (`/api/universites`)
//!
//! Besides the usual CRUD tree, universities expose relation listings
//! (specialties, teachers, students, technologies, projects), global
//! statistics with facets, and the national ranking. The detail view
//! regroups one wide query into per-relation lists.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{
    class_filter, mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, UNIVERSITY_CLASSES,
};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{int_field, str_field, validate_university};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, first_field, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/universites", get(list_universities).post(create_university))
        .route("/universites/stats", get(university_stats))
        .route("/universites/ranking", get(university_ranking))
        .route("/universites/search", post(search_universities))
        .route(
            "/universites/{id}",
            get(get_university)
                .put(update_university)
                .delete(delete_university),
        )
        .route("/universites/{id}/specialites", get(university_specialties))
        .route("/universites/{id}/enseignants", get(university_teachers))
        .route("/universites/{id}/etudiants", get(university_students))
        .route("/universites/{id}/technologies", get(university_technologies))
        .route("/universites/{id}/projets", get(university_projects))
        .route("/universites/{id}/dbpedia-enrich", get(enrich_university))
}

/// BIND expression deriving the display type from the RDF class.
const TYPE_BIND: &str = r#"BIND(
        IF(?type = ont:UniversitePublique, "Publique",
          IF(?type = ont:UniversitePrivee, "Privée", "Générale")
        ) AS ?typeUniversite
      )"#;

/// All universities with their display type.
async fn list_universities(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>

SELECT ?universite ?type ?nomUniversite ?anneeFondation ?ville ?pays
       ?nombreEtudiants ?rangNational ?siteWeb ?typeUniversite
WHERE {{
    ?universite rdf:type ?type .
    {filter}

    OPTIONAL {{ ?universite ont:nomUniversite ?nomUniversite }}
    OPTIONAL {{ ?universite ont:anneeFondation ?anneeFondation }}
    OPTIONAL {{ ?universite ont:ville ?ville }}
    OPTIONAL {{ ?universite ont:pays ?pays }}
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nombreEtudiants }}
    OPTIONAL {{ ?universite ont:rangNational ?rangNational }}
    OPTIONAL {{ ?universite ont:siteWeb ?siteWeb }}

    {TYPE_BIND}
}}
ORDER BY ?nomUniversite"#,
        filter = class_filter("type", UNIVERSITY_CLASSES)
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One university regrouped: general info plus specialty / teacher /
/// student / technology / project lists, deduplicated by URI.
async fn get_university(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>

SELECT ?universite ?nomUniversite ?anneeFondation ?ville ?pays
       ?nombreEtudiants ?rangNational ?siteWeb ?typeUniversite
       ?specialite ?nomSpecialite ?codeSpecialite ?niveauDiplome
       ?enseignant ?nomEnseignant ?prenomEnseignant ?grade ?email
       ?etudiant ?nomEtudiant ?prenomEtudiant ?niveauEtude ?moyenneGenerale
       ?technologie ?nomTechnologie ?typeTechnologie
       ?projet ?titreProjet ?typeProjet
WHERE {{
    <{uri}> rdf:type ?type .
    {filter}
    <{uri}> ont:nomUniversite ?nomUniversite .

    OPTIONAL {{ <{uri}> ont:anneeFondation ?anneeFondation . }}
    OPTIONAL {{ <{uri}> ont:ville ?ville . }}
    OPTIONAL {{ <{uri}> ont:pays ?pays . }}
    OPTIONAL {{ <{uri}> ont:nombreEtudiants ?nombreEtudiants . }}
    OPTIONAL {{ <{uri}> ont:rangNational ?rangNational . }}
    OPTIONAL {{ <{uri}> ont:siteWeb ?siteWeb . }}

    OPTIONAL {{
        <{uri}> a ?subType .
        FILTER(?subType IN (ont:UniversitePublique, ont:UniversitePrivee))
        BIND(
          IF(?subType = ont:UniversitePublique, "Publique",
            IF(?subType = ont:UniversitePrivee, "Privée", "Générale")
          ) AS ?typeUniversite
        )
    }}

    OPTIONAL {{
        <{uri}> ont:offre ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
        OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite . }}
        OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome . }}
    }}

    OPTIONAL {{
        <{uri}> ont:emploie ?enseignant .
        ?enseignant ont:nom ?nomEnseignant .
        ?enseignant ont:prenom ?prenomEnseignant .
        OPTIONAL {{ ?enseignant ont:grade ?grade . }}
        OPTIONAL {{ ?enseignant ont:email ?email . }}
    }}

    OPTIONAL {{
        ?etudiant ont:appartientA <{uri}> .
        ?etudiant ont:nom ?nomEtudiant .
        ?etudiant ont:prenom ?prenomEtudiant .
        OPTIONAL {{ ?etudiant ont:niveauEtude ?niveauEtude . }}
        OPTIONAL {{ ?etudiant ont:moyenneGenerale ?moyenneGenerale . }}
    }}

    OPTIONAL {{
        <{uri}> ont:adopteTechnologie ?technologie .
        ?technologie ont:nomTechnologie ?nomTechnologie .
        OPTIONAL {{ ?technologie ont:typeTechnologie ?typeTechnologie . }}
    }}

    OPTIONAL {{
        ?projet ont:estOrganisePar <{uri}> .
        ?projet ont:titreProjet ?titreProjet .
        OPTIONAL {{ ?projet ont:typeProjet ?typeProjet . }}
    }}
}}"#,
        filter = class_filter("type", UNIVERSITY_CLASSES)
    );

    let rows = state.store.query(&query).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Université non trouvée"));
    }

    Ok(Json(regroup_university(rows)))
}

/// Regroup the wide detail rows into one structured document.
fn regroup_university(rows: Vec<Row>) -> Value {
    let field = |row: &Row, key: &str| -> Value {
        row.get(key).map(|v| json!(v)).unwrap_or(Value::Null)
    };

    let mut info: Value = Value::Null;
    let mut specialties: BTreeMap<String, Value> = BTreeMap::new();
    let mut teachers: BTreeMap<String, Value> = BTreeMap::new();
    let mut students: BTreeMap<String, Value> = BTreeMap::new();
    let mut technologies: BTreeMap<String, Value> = BTreeMap::new();
    let mut projects: BTreeMap<String, Value> = BTreeMap::new();

    for row in &rows {
        if info.is_null() {
            info = json!({
                "universite": field(row, "universite"),
                "nomUniversite": field(row, "nomUniversite"),
                "anneeFondation": field(row, "anneeFondation"),
                "ville": field(row, "ville"),
                "pays": field(row, "pays"),
                "nombreEtudiants": field(row, "nombreEtudiants"),
                "rangNational": field(row, "rangNational"),
                "siteWeb": field(row, "siteWeb"),
                "typeUniversite": field(row, "typeUniversite"),
            });
        }

        if let Some(key) = row.get("specialite") {
            specialties.entry(key.clone()).or_insert_with(|| {
                json!({
                    "specialite": field(row, "specialite"),
                    "nomSpecialite": field(row, "nomSpecialite"),
                    "codeSpecialite": field(row, "codeSpecialite"),
                    "niveauDiplome": field(row, "niveauDiplome"),
                })
            });
        }

        if let Some(key) = row.get("enseignant") {
            teachers.entry(key.clone()).or_insert_with(|| {
                json!({
                    "enseignant": field(row, "enseignant"),
                    "nomEnseignant": field(row, "nomEnseignant"),
                    "prenomEnseignant": field(row, "prenomEnseignant"),
                    "grade": field(row, "grade"),
                    "email": field(row, "email"),
                })
            });
        }

        if let Some(key) = row.get("etudiant") {
            students.entry(key.clone()).or_insert_with(|| {
                json!({
                    "etudiant": field(row, "etudiant"),
                    "nomEtudiant": field(row, "nomEtudiant"),
                    "prenomEtudiant": field(row, "prenomEtudiant"),
                    "niveauEtude": field(row, "niveauEtude"),
                    "moyenneGenerale": field(row, "moyenneGenerale"),
                })
            });
        }

        if let Some(key) = row.get("technologie") {
            technologies.entry(key.clone()).or_insert_with(|| {
                json!({
                    "technologie": field(row, "technologie"),
                    "nomTechnologie": field(row, "nomTechnologie"),
                    "typeTechnologie": field(row, "typeTechnologie"),
                })
            });
        }

        if let Some(key) = row.get("projet") {
            projects.entry(key.clone()).or_insert_with(|| {
                json!({
                    "projet": field(row, "projet"),
                    "titreProjet": field(row, "titreProjet"),
                    "typeProjet": field(row, "typeProjet"),
                })
            });
        }
    }

    json!({
        "info_generale": info,
        "specialites": specialties.into_values().collect::<Vec<_>>(),
        "enseignants": teachers.into_values().collect::<Vec<_>>(),
        "etudiants": students.into_values().collect::<Vec<_>>(),
        "technologies": technologies.into_values().collect::<Vec<_>>(),
        "projets": projects.into_values().collect::<Vec<_>>(),
    })
}

/// Search universities by name, city, country and type.
async fn search_universities(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?universite ?nomUniversite ?ville ?pays ?typeUniversite
       ?nombreEtudiants ?rangNational ?anneeFondation
WHERE {{
    ?universite a ont:Universite ;
           ont:nomUniversite ?nomUniversite .

    OPTIONAL {{ ?universite ont:ville ?ville . }}
    OPTIONAL {{ ?universite ont:pays ?pays . }}
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nombreEtudiants . }}
    OPTIONAL {{ ?universite ont:rangNational ?rangNational . }}
    OPTIONAL {{ ?universite ont:anneeFondation ?anneeFondation . }}

    OPTIONAL {{
        ?universite a ?type .
        FILTER(?type IN (ont:UniversitePublique, ont:UniversitePrivee))
        {TYPE_BIND}
    }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("nomUniversite", str_field(&data, "nom")),
        ("ville", str_field(&data, "ville")),
        ("pays", str_field(&data, "pays")),
        ("typeUniversite", str_field(&data, "type")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?nomUniversite");

    Ok(Json(state.store.query(&query).await?))
}

/// Specialties offered by a university.
async fn university_specialties(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?specialite ?nomSpecialite ?codeSpecialite ?description
       ?dureeFormation ?niveauDiplome ?nombreModules
WHERE {{
    <{uri}> ont:offre ?specialite .
    ?specialite ont:nomSpecialite ?nomSpecialite .

    OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite . }}
    OPTIONAL {{ ?specialite ont:description ?description . }}
    OPTIONAL {{ ?specialite ont:dureeFormation ?dureeFormation . }}
    OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome . }}
    OPTIONAL {{ ?specialite ont:nombreModules ?nombreModules . }}
}}
ORDER BY ?nomSpecialite"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Teachers employed by a university, with taught courses.
async fn university_teachers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?enseignant ?nom ?prenom ?email ?telephone ?dateNaissance
       ?grade ?anciennete ?cours ?intituleCours
WHERE {{
    <{uri}> ont:emploie ?enseignant .
    ?enseignant ont:nom ?nom ;
               ont:prenom ?prenom .

    OPTIONAL {{ ?enseignant ont:email ?email . }}
    OPTIONAL {{ ?enseignant ont:telephone ?telephone . }}
    OPTIONAL {{ ?enseignant ont:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?enseignant ont:grade ?grade . }}
    OPTIONAL {{ ?enseignant ont:anciennete ?anciennete . }}

    OPTIONAL {{
        ?enseignant ont:enseigne ?cours .
        ?cours ont:intitule ?intituleCours .
    }}
}}
ORDER BY ?nom ?prenom"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Students enrolled at a university, with their specialty.
async fn university_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?etudiant ?nom ?prenom ?email ?telephone ?dateNaissance
       ?numeroMatricule ?niveauEtude ?moyenneGenerale ?specialite ?nomSpecialite
WHERE {{
    ?etudiant ont:appartientA <{uri}> ;
           ont:nom ?nom ;
           ont:prenom ?prenom .

    OPTIONAL {{ ?etudiant ont:email ?email . }}
    OPTIONAL {{ ?etudiant ont:telephone ?telephone . }}
    OPTIONAL {{ ?etudiant ont:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?etudiant ont:numeroMatricule ?numeroMatricule . }}
    OPTIONAL {{ ?etudiant ont:niveauEtude ?niveauEtude . }}
    OPTIONAL {{ ?etudiant ont:moyenneGenerale ?moyenneGenerale . }}

    OPTIONAL {{
        ?etudiant ont:specialiseEn ?specialite .
        ?specialite ont:nomSpecialite ?nomSpecialite .
    }}
}}
ORDER BY ?nom ?prenom"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Technologies adopted by a university.
async fn university_technologies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?technologie ?nomTechnologie ?typeTechnologie ?version
       ?editeur ?anneeImpl ?nbUtilisateurs
WHERE {{
    <{uri}> ont:adopteTechnologie ?technologie .
    ?technologie ont:nomTechnologie ?nomTechnologie .

    OPTIONAL {{ ?technologie ont:typeTechnologie ?typeTechnologie . }}
    OPTIONAL {{ ?technologie ont:version ?version . }}
    OPTIONAL {{ ?technologie ont:editeur ?editeur . }}
    OPTIONAL {{ ?technologie ont:anneeImpl ?anneeImpl . }}
    OPTIONAL {{ ?technologie ont:nbUtilisateurs ?nbUtilisateurs . }}
}}
ORDER BY ?nomTechnologie"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Projects organized by a university.
async fn university_projects(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?projet ?titreProjet ?typeProjet ?domaineProjet ?anneeRealisation
       ?noteProjet ?etudiant ?nomEtudiant ?encadrant ?nomEncadrant
WHERE {{
    ?projet ont:estOrganisePar <{uri}> ;
           ont:titreProjet ?titreProjet .

    OPTIONAL {{ ?projet ont:typeProjet ?typeProjet . }}
    OPTIONAL {{ ?projet ont:domaineProjet ?domaineProjet . }}
    OPTIONAL {{ ?projet ont:anneeRealisation ?anneeRealisation . }}
    OPTIONAL {{ ?projet ont:noteProjet ?noteProjet . }}

    OPTIONAL {{
        ?projet ont:realisePar ?etudiant .
        ?etudiant ont:nom ?nomEtudiant .
    }}

    OPTIONAL {{
        ?projet ont:encadrePar ?encadrant .
        ?encadrant ont:nom ?nomEncadrant .
    }}
}}
ORDER BY DESC(?anneeRealisation)"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Global statistics plus type/country/city facets and the top-rated
/// shortlist (rank ≤ 5).
async fn university_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = format!(
        r#"PREFIX ont: <{ONT}>

SELECT
    (COUNT(DISTINCT ?universite) as ?total_universites)
    (SUM(?nbEtudiants) as ?total_etudiants)
    (COUNT(DISTINCT ?enseignant) as ?total_enseignants)
    (COUNT(DISTINCT ?specialite) as ?total_specialites)
    (COUNT(DISTINCT ?technologie) as ?total_technologies)
WHERE {{
    ?universite a ont:Universite .
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nbEtudiants . }}
    OPTIONAL {{ ?universite ont:emploie ?enseignant . }}
    OPTIONAL {{ ?universite ont:offre ?specialite . }}
    OPTIONAL {{ ?universite ont:adopteTechnologie ?technologie . }}
}}"#
    );

    let by_type = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>

SELECT ?typeUniversite (COUNT(DISTINCT ?universite) as ?count)
WHERE {{
    ?universite rdf:type ?type .
    {filter}
    {TYPE_BIND}
}}
GROUP BY ?typeUniversite
ORDER BY DESC(?count)"#,
        filter = class_filter("type", UNIVERSITY_CLASSES)
    );

    let by_country = format!(
        r#"PREFIX ont: <{ONT}>

SELECT ?pays (COUNT(DISTINCT ?universite) as ?count)
WHERE {{
    ?universite a ont:Universite .
    ?universite ont:pays ?pays .
}}
GROUP BY ?pays
ORDER BY DESC(?count)
LIMIT 20"#
    );

    let by_city = format!(
        r#"PREFIX ont: <{ONT}>

SELECT ?ville (COUNT(DISTINCT ?universite) as ?count)
WHERE {{
    ?universite a ont:Universite .
    ?universite ont:ville ?ville .
}}
GROUP BY ?ville
ORDER BY DESC(?count)
LIMIT 20"#
    );

    let top_rated = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

SELECT ?universite ?nomUniversite ?ville ?pays ?rangNational ?nombreEtudiants
WHERE {{
    ?universite a ont:Universite .
    ?universite ont:nomUniversite ?nomUniversite .
    ?universite ont:rangNational ?rangNational .
    FILTER(xsd:integer(?rangNational) <= 5)
    OPTIONAL {{ ?universite ont:ville ?ville . }}
    OPTIONAL {{ ?universite ont:pays ?pays . }}
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nombreEtudiants . }}
}}
ORDER BY xsd:integer(?rangNational)"#
    );

    let stats_rows = state.store.query(&stats).await?;

    Ok(Json(json!({
        "stats": stats_rows.first().cloned().unwrap_or_default(),
        "facets": {
            "by_type": state.store.query(&by_type).await?,
            "by_pays": state.store.query(&by_country).await?,
            "by_ville": state.store.query(&by_city).await?,
            "top_rated": state.store.query(&top_rated).await?,
        }
    })))
}

/// National ranking, best rank first.
async fn university_ranking(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?universite ?nomUniversite ?ville ?pays ?rangNational
       ?nombreEtudiants ?anneeFondation ?typeUniversite
WHERE {{
    ?universite a ont:Universite ;
               ont:nomUniversite ?nomUniversite ;
               ont:rangNational ?rangNational .

    OPTIONAL {{ ?universite ont:ville ?ville . }}
    OPTIONAL {{ ?universite ont:pays ?pays . }}
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nombreEtudiants . }}
    OPTIONAL {{ ?universite ont:anneeFondation ?anneeFondation . }}

    OPTIONAL {{
        ?universite a ?type .
        FILTER(?type IN (ont:UniversitePublique, ont:UniversitePrivee))
        {TYPE_BIND}
    }}
}}
ORDER BY xsd:integer(?rangNational)"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Create a university; the `type` field decides public/private.
async fn create_university(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_university(&data))?;

    let name = str_field(&data, "nomUniversite").unwrap_or_default();
    let uri = mint_uri("Universite", &sanitize_fragment(name, 50));

    let class = match str_field(&data, "type") {
        Some("Publique") => "UniversitePublique",
        Some("Privée") => "UniversitePrivee",
        _ => "Universite",
    };

    let mut builder = InsertBuilder::new(&uri, class);
    builder.literal("nomUniversite", name);
    append_university_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Université créée avec succès", "uri": uri })),
    ))
}

fn append_university_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(Ok(year)) = int_field(data, "anneeFondation") {
        builder.integer("anneeFondation", year);
    }
    if let Some(city) = str_field(data, "ville") {
        builder.literal("ville", city);
    }
    if let Some(country) = str_field(data, "pays") {
        builder.literal("pays", country);
    }
    if let Some(Ok(students)) = int_field(data, "nombreEtudiants") {
        builder.integer("nombreEtudiants", students);
    }
    if let Some(Ok(rank)) = int_field(data, "rangNational") {
        builder.integer("rangNational", rank);
    }
    if let Some(website) = str_field(data, "siteWeb") {
        builder.literal("siteWeb", website);
    }
}

/// Update a university (delete-then-insert, no transaction).
async fn update_university(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_university(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "Universite");
    if let Some(name) = str_field(&data, "nomUniversite") {
        builder.literal("nomUniversite", name);
    }
    append_university_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Université mise à jour avec succès" })))
}

/// Delete a university.
async fn delete_university(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Université supprimée avec succès" })))
}

/// Linked-data enrichment keyed on the university name.
async fn enrich_university(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
SELECT ?nomUniversite ?ville ?pays
WHERE {{
    <{uri}> rdf:type ?type .
    {filter}
    OPTIONAL {{ <{uri}> ont:nomUniversite ?nomUniversite . }}
    OPTIONAL {{ <{uri}> ont:ville ?ville . }}
    OPTIONAL {{ <{uri}> ont:pays ?pays . }}
}}
LIMIT 1"#,
        filter = class_filter("type", UNIVERSITY_CLASSES)
    );

    let rows = state.store.query(&query).await?;
    let university = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Université non trouvée"))?;

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_field(&university, &["nomUniversite", "ville"]));

    Ok(Json(
        dbpedia_enrichment(&state, "universite", university, term).await,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regroup_dedups_by_uri() {
        let mut row1 = Row::new();
        row1.insert("universite".into(), "U1".into());
        row1.insert("nomUniversite".into(), "Université de Tunis".into());
        row1.insert("specialite".into(), "S1".into());
        row1.insert("nomSpecialite".into(), "Informatique".into());
        row1.insert("enseignant".into(), "E1".into());
        row1.insert("nomEnseignant".into(), "Ben Ali".into());
        row1.insert("prenomEnseignant".into(), "Sami".into());

        let mut row2 = row1.clone();
        row2.insert("specialite".into(), "S2".into());
        row2.insert("nomSpecialite".into(), "Droit".into());

        let doc = regroup_university(vec![row1, row2]);
        assert_eq!(doc["info_generale"]["nomUniversite"], "Université de Tunis");
        assert_eq!(doc["specialites"].as_array().unwrap().len(), 2);
        assert_eq!(doc["enseignants"].as_array().unwrap().len(), 1);
        assert_eq!(doc["etudiants"].as_array().unwrap().len(), 0);
    }
}
