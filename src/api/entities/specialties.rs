//! Specialty endpoints (`/api/specialites`)
//!
//! Specialties link most of the domain together: offered by a
//! university, composed of courses, training competencies, chosen by
//! students. The detail view regroups one wide query accordingly.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{
    class_filter, mint_uri, normalize_uri, sanitize_fragment, ONT, RDF, SPECIALTY_CLASSES,
};
use crate::sparql::{delete_all_properties, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{int_field, str_field, validate_specialty};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/specialites", get(list_specialties).post(create_specialty))
        .route("/specialites/stats", get(specialty_stats))
        .route("/specialites/par-universite", get(specialties_by_university))
        .route("/specialites/search", post(search_specialties))
        .route(
            "/specialites/{id}",
            get(get_specialty)
                .put(update_specialty)
                .delete(delete_specialty),
        )
        .route("/specialites/{id}/cours", get(specialty_courses))
        .route("/specialites/{id}/etudiants", get(specialty_students))
        .route("/specialites/{id}/competences", get(specialty_competencies))
}

/// All specialties, subclasses included, with their university.
async fn list_specialties(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>

SELECT ?specialite ?type ?nomSpecialite ?codeSpecialite ?description
       ?dureeFormation ?niveauDiplome ?nombreModules ?universite ?nomUniversite
WHERE {{
    ?specialite rdf:type ?type .
    {filter}

    OPTIONAL {{ ?specialite ont:nomSpecialite ?nomSpecialite }}
    OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite }}
    OPTIONAL {{ ?specialite ont:description ?description }}
    OPTIONAL {{ ?specialite ont:dureeFormation ?dureeFormation }}
    OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome }}
    OPTIONAL {{ ?specialite ont:nombreModules ?nombreModules }}

    OPTIONAL {{
        ?specialite ont:estOffertePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite
    }}
}}
ORDER BY ?nomSpecialite"#,
        filter = class_filter("type", SPECIALTY_CLASSES)
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One specialty regrouped: info, university, courses, competencies,
/// students.
async fn get_specialty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>

SELECT ?specialite ?nomSpecialite ?codeSpecialite ?description ?dureeFormation
       ?niveauDiplome ?nombreModules ?universite ?nomUniversite ?ville ?pays
       ?cours ?intituleCours ?codeCours ?creditsECTS
       ?competence ?nomCompetence ?typeCompetence
       ?etudiant ?nomEtudiant ?prenomEtudiant
WHERE {{
    <{uri}> a ont:Specialite ;
           ont:nomSpecialite ?nomSpecialite ;
           ont:codeSpecialite ?codeSpecialite .

    OPTIONAL {{ <{uri}> ont:description ?description . }}
    OPTIONAL {{ <{uri}> ont:dureeFormation ?dureeFormation . }}
    OPTIONAL {{ <{uri}> ont:niveauDiplome ?niveauDiplome . }}
    OPTIONAL {{ <{uri}> ont:nombreModules ?nombreModules . }}

    OPTIONAL {{
        <{uri}> ont:estOffertePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
        OPTIONAL {{ ?universite ont:ville ?ville . }}
        OPTIONAL {{ ?universite ont:pays ?pays . }}
    }}

    OPTIONAL {{
        ?cours ont:faitPartieDe <{uri}> .
        ?cours ont:intitule ?intituleCours .
        OPTIONAL {{ ?cours ont:codeCours ?codeCours . }}
        OPTIONAL {{ ?cours ont:creditsECTS ?creditsECTS . }}
    }}

    OPTIONAL {{
        <{uri}> ont:formePour ?competence .
        ?competence ont:nomCompetence ?nomCompetence .
        OPTIONAL {{ ?competence ont:typeCompetence ?typeCompetence . }}
    }}

    OPTIONAL {{
        ?etudiant ont:specialiseEn <{uri}> .
        ?etudiant ont:nom ?nomEtudiant .
        ?etudiant ont:prenom ?prenomEtudiant .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    if rows.is_empty() {
        return Err(ApiError::not_found("Spécialité non trouvée"));
    }

    Ok(Json(regroup_specialty(rows)))
}

fn regroup_specialty(rows: Vec<Row>) -> Value {
    let field = |row: &Row, key: &str| -> Value {
        row.get(key).map(|v| json!(v)).unwrap_or(Value::Null)
    };

    let mut info: Value = Value::Null;
    let mut university: Value = Value::Null;
    let mut courses: BTreeMap<String, Value> = BTreeMap::new();
    let mut competencies: BTreeMap<String, Value> = BTreeMap::new();
    let mut students: BTreeMap<String, Value> = BTreeMap::new();

    for row in &rows {
        if info.is_null() {
            info = json!({
                "specialite": field(row, "specialite"),
                "nomSpecialite": field(row, "nomSpecialite"),
                "codeSpecialite": field(row, "codeSpecialite"),
                "description": field(row, "description"),
                "dureeFormation": field(row, "dureeFormation"),
                "niveauDiplome": field(row, "niveauDiplome"),
                "nombreModules": field(row, "nombreModules"),
            });
        }

        if university.is_null() && row.contains_key("universite") {
            university = json!({
                "universite": field(row, "universite"),
                "nomUniversite": field(row, "nomUniversite"),
                "ville": field(row, "ville"),
                "pays": field(row, "pays"),
            });
        }

        if let Some(key) = row.get("cours") {
            courses.entry(key.clone()).or_insert_with(|| {
                json!({
                    "cours": field(row, "cours"),
                    "intituleCours": field(row, "intituleCours"),
                    "codeCours": field(row, "codeCours"),
                    "creditsECTS": field(row, "creditsECTS"),
                })
            });
        }

        if let Some(key) = row.get("competence") {
            competencies.entry(key.clone()).or_insert_with(|| {
                json!({
                    "competence": field(row, "competence"),
                    "nomCompetence": field(row, "nomCompetence"),
                    "typeCompetence": field(row, "typeCompetence"),
                })
            });
        }

        if let Some(key) = row.get("etudiant") {
            students.entry(key.clone()).or_insert_with(|| {
                json!({
                    "etudiant": field(row, "etudiant"),
                    "nomEtudiant": field(row, "nomEtudiant"),
                    "prenomEtudiant": field(row, "prenomEtudiant"),
                })
            });
        }
    }

    json!({
        "info_generale": info,
        "universite": university,
        "cours": courses.into_values().collect::<Vec<_>>(),
        "competences": competencies.into_values().collect::<Vec<_>>(),
        "etudiants": students.into_values().collect::<Vec<_>>(),
    })
}

/// Search specialties by name, domain, university and diploma level.
async fn search_specialties(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?specialite ?nomSpecialite ?codeSpecialite ?description ?dureeFormation
       ?niveauDiplome ?universite ?nomUniversite
WHERE {{
    ?specialite a ont:Specialite ;
           ont:nomSpecialite ?nomSpecialite .

    OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite . }}
    OPTIONAL {{ ?specialite ont:description ?description . }}
    OPTIONAL {{ ?specialite ont:dureeFormation ?dureeFormation . }}
    OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome . }}
    OPTIONAL {{
        ?specialite ont:estOffertePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("nomSpecialite", str_field(&data, "nom")),
        // Domain criteria search the description text.
        ("description", str_field(&data, "domaine")),
        ("nomUniversite", str_field(&data, "universite")),
        ("niveauDiplome", str_field(&data, "niveau")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?nomSpecialite");

    Ok(Json(state.store.query(&query).await?))
}

/// Courses composing a specialty, with teachers.
async fn specialty_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre ?volumeHoraire
       ?langueCours ?enseignant ?nomEnseignant ?prenomEnseignant
WHERE {{
    ?cours ont:faitPartieDe <{uri}> ;
           ont:intitule ?intitule .

    OPTIONAL {{ ?cours ont:codeCours ?codeCours . }}
    OPTIONAL {{ ?cours ont:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ ?cours ont:semestre ?semestre . }}
    OPTIONAL {{ ?cours ont:volumeHoraire ?volumeHoraire . }}
    OPTIONAL {{ ?cours ont:langueCours ?langueCours . }}

    OPTIONAL {{
        ?cours ont:enseignePar ?enseignant .
        ?enseignant ont:nom ?nomEnseignant .
        ?enseignant ont:prenom ?prenomEnseignant .
    }}
}}
ORDER BY ?semestre ?codeCours"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Students enrolled in a specialty.
async fn specialty_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?etudiant ?nom ?prenom ?email ?telephone ?dateNaissance
       ?numeroMatricule ?niveauEtude ?moyenneGenerale ?universite ?nomUniversite
WHERE {{
    ?etudiant ont:specialiseEn <{uri}> ;
           ont:nom ?nom ;
           ont:prenom ?prenom .

    OPTIONAL {{ ?etudiant ont:email ?email . }}
    OPTIONAL {{ ?etudiant ont:telephone ?telephone . }}
    OPTIONAL {{ ?etudiant ont:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?etudiant ont:numeroMatricule ?numeroMatricule . }}
    OPTIONAL {{ ?etudiant ont:niveauEtude ?niveauEtude . }}
    OPTIONAL {{ ?etudiant ont:moyenneGenerale ?moyenneGenerale . }}
    OPTIONAL {{
        ?etudiant ont:appartientA ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY ?nom ?prenom"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Competencies a specialty trains for.
async fn specialty_competencies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?competence ?nomCompetence ?typeCompetence ?niveauCompetence
       ?descriptionCompetence ?motsCles
WHERE {{
    <{uri}> ont:formePour ?competence .
    ?competence ont:nomCompetence ?nomCompetence .

    OPTIONAL {{ ?competence ont:typeCompetence ?typeCompetence . }}
    OPTIONAL {{ ?competence ont:niveauCompetence ?niveauCompetence . }}
    OPTIONAL {{ ?competence ont:descriptionCompetence ?descriptionCompetence . }}
    OPTIONAL {{ ?competence ont:motsCles ?motsCles . }}
}}
ORDER BY ?typeCompetence ?nomCompetence"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Aggregate counts across the specialty graph.
async fn specialty_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>

SELECT
    (COUNT(DISTINCT ?specialite) as ?total_specialites)
    (COUNT(DISTINCT ?etudiant) as ?total_etudiants)
    (COUNT(DISTINCT ?cours) as ?total_cours)
    (COUNT(DISTINCT ?competence) as ?total_competences)
WHERE {{
    ?specialite a ont:Specialite .
    OPTIONAL {{ ?etudiant ont:specialiseEn ?specialite . }}
    OPTIONAL {{ ?cours ont:faitPartieDe ?specialite . }}
    OPTIONAL {{ ?specialite ont:formePour ?competence . }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    Ok(Json(json!(rows.first().cloned().unwrap_or_default())))
}

/// Specialties grouped by the university offering them.
async fn specialties_by_university(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?universite ?nomUniversite ?specialite ?nomSpecialite ?codeSpecialite
       ?niveauDiplome ?dureeFormation
WHERE {{
    ?specialite a ont:Specialite ;
               ont:nomSpecialite ?nomSpecialite ;
               ont:estOffertePar ?universite .
    ?universite ont:nomUniversite ?nomUniversite .

    OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite . }}
    OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome . }}
    OPTIONAL {{ ?specialite ont:dureeFormation ?dureeFormation . }}
}}
ORDER BY ?nomUniversite ?nomSpecialite"#
    );

    let rows = state.store.query(&query).await?;

    let field = |row: &Row, key: &str| -> Value {
        row.get(key).map(|v| json!(v)).unwrap_or(Value::Null)
    };

    let mut grouped: BTreeMap<String, Value> = BTreeMap::new();
    for row in &rows {
        let Some(name) = row.get("nomUniversite") else {
            continue;
        };
        let group = grouped.entry(name.clone()).or_insert_with(|| {
            json!({
                "universite": field(row, "universite"),
                "nomUniversite": name,
                "specialites": [],
            })
        });
        if let Some(list) = group["specialites"].as_array_mut() {
            list.push(json!({
                "specialite": field(row, "specialite"),
                "nomSpecialite": field(row, "nomSpecialite"),
                "codeSpecialite": field(row, "codeSpecialite"),
                "niveauDiplome": field(row, "niveauDiplome"),
                "dureeFormation": field(row, "dureeFormation"),
            }));
        }
    }

    Ok(Json(json!(grouped.into_values().collect::<Vec<_>>())))
}

/// Create a specialty.
async fn create_specialty(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_specialty(&data))?;

    let name = str_field(&data, "nomSpecialite").unwrap_or_default();
    let uri = mint_uri("Specialite", &sanitize_fragment(name, 50));

    let mut builder = InsertBuilder::new(&uri, "Specialite");
    builder.literal("nomSpecialite", name);
    append_specialty_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Spécialité créée avec succès", "uri": uri })),
    ))
}

fn append_specialty_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(code) = str_field(data, "codeSpecialite") {
        builder.literal("codeSpecialite", code);
    }
    if let Some(description) = str_field(data, "description") {
        builder.literal("description", description);
    }
    if let Some(duration) = str_field(data, "dureeFormation") {
        builder.literal("dureeFormation", duration);
    }
    if let Some(level) = str_field(data, "niveauDiplome") {
        builder.literal("niveauDiplome", level);
    }
    if let Some(Ok(modules)) = int_field(data, "nombreModules") {
        builder.integer("nombreModules", modules);
    }
    if let Some(university) = str_field(data, "universite") {
        builder.link("estOffertePar", university);
    }
}

/// Update a specialty (delete-then-insert, no transaction).
async fn update_specialty(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_specialty(&data))?;

    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;

    let mut builder = InsertBuilder::new(&uri, "Specialite");
    if let Some(name) = str_field(&data, "nomSpecialite") {
        builder.literal("nomSpecialite", name);
    }
    append_specialty_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Spécialité mise à jour avec succès" })))
}

/// Delete a specialty.
async fn delete_specialty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state.store.update(&delete_all_properties(&uri)).await?;
    Ok(Json(json!({ "message": "Spécialité supprimée avec succès" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regroup_specialty() {
        let mut row1 = Row::new();
        row1.insert("specialite".into(), "S1".into());
        row1.insert("nomSpecialite".into(), "Informatique".into());
        row1.insert("codeSpecialite".into(), "INFO".into());
        row1.insert("universite".into(), "U1".into());
        row1.insert("nomUniversite".into(), "Université de Tunis".into());
        row1.insert("cours".into(), "C1".into());
        row1.insert("intituleCours".into(), "Bases de données".into());

        let mut row2 = row1.clone();
        row2.insert("cours".into(), "C2".into());
        row2.insert("intituleCours".into(), "Réseaux".into());

        let doc = regroup_specialty(vec![row1, row2]);
        assert_eq!(doc["info_generale"]["codeSpecialite"], "INFO");
        assert_eq!(doc["universite"]["nomUniversite"], "Université de Tunis");
        assert_eq!(doc["cours"].as_array().unwrap().len(), 2);
    }
}
