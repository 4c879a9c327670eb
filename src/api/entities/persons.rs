//! Person endpoints (`/api/personnes`)
//!
//! Persons cover the whole class family (students, teachers,
//! professors, assistants, supervisors); the role field of a create
//! request decides which subclass the individual is typed as.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::ontology::{
    class_filter, mint_uri, normalize_uri, sanitize_fragment, ONT, PERSON_CLASSES, RDF,
};
use crate::sparql::{delete_properties_except, regex_filters, InsertBuilder};
use crate::store::results::Row;
use crate::validation::{float_field, str_field, validate_person};

use super::super::error::{ensure_valid, ApiError, ApiResult};
use super::super::server::AppState;
use super::{dbpedia_enrichment, TermQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/personnes", get(list_persons).post(create_person))
        .route("/personnes/etudiants", get(list_students))
        .route("/personnes/enseignants", get(list_teachers))
        .route("/personnes/facets", get(person_facets))
        .route("/personnes/search", post(search_persons))
        .route(
            "/personnes/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
        .route("/personnes/{id}/cours", get(person_courses))
        .route("/personnes/{id}/dbpedia-enrich", get(enrich_person))
}

/// Which subclass a declared role maps to on creation.
fn class_for_role(role: &str) -> &'static str {
    match role {
        "Etudiant" => "Etudiant",
        "Enseignant" => "Enseignant",
        "Professeur" => "Professeur",
        "Assistant" => "Assistant",
        "Encadrant" => "Encadrant",
        _ => "Personne",
    }
}

/// Everyone, across the person class family.
async fn list_persons(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>

SELECT ?personne ?type ?nom ?prenom ?email ?telephone ?role
WHERE {{
    ?personne rdf:type ?type .
    {filter}
    OPTIONAL {{ ?personne ont:nom ?nom }}
    OPTIONAL {{ ?personne ont:prenom ?prenom }}
    OPTIONAL {{ ?personne ont:email ?email }}
    OPTIONAL {{ ?personne ont:telephone ?telephone }}
    OPTIONAL {{ ?personne ont:role ?role }}
}}
ORDER BY ?type ?nom"#,
        filter = class_filter("type", PERSON_CLASSES)
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Students with their enrollment details.
async fn list_students(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?etudiant ?nom ?prenom ?email ?telephone ?dateNaissance ?numeroMatricule ?niveauEtude ?moyenneGenerale ?universite ?nomUniversite
WHERE {{
    ?etudiant a edu:Etudiant ;
           edu:nom ?nom ;
           edu:prenom ?prenom .

    OPTIONAL {{ ?etudiant edu:email ?email . }}
    OPTIONAL {{ ?etudiant edu:telephone ?telephone . }}
    OPTIONAL {{ ?etudiant edu:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?etudiant edu:numeroMatricule ?numeroMatricule . }}
    OPTIONAL {{ ?etudiant edu:niveauEtude ?niveauEtude . }}
    OPTIONAL {{ ?etudiant edu:moyenneGenerale ?moyenneGenerale . }}
    OPTIONAL {{
        ?etudiant edu:appartientA ?universite .
        ?universite edu:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY ?nom ?prenom"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Teachers with grade and seniority.
async fn list_teachers(State(state): State<AppState>) -> ApiResult<Json<Vec<Row>>> {
    let query = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?enseignant ?nom ?prenom ?email ?telephone ?dateNaissance ?grade ?anciennete ?universite ?nomUniversite
WHERE {{
    ?enseignant a edu:Enseignant ;
           edu:nom ?nom ;
           edu:prenom ?prenom .

    OPTIONAL {{ ?enseignant edu:email ?email . }}
    OPTIONAL {{ ?enseignant edu:telephone ?telephone . }}
    OPTIONAL {{ ?enseignant edu:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?enseignant edu:grade ?grade . }}
    OPTIONAL {{ ?enseignant edu:anciennete ?anciennete . }}
    OPTIONAL {{
        ?enseignant edu:appartientA ?universite .
        ?universite edu:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY ?nom ?prenom"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// One person with university, specialty and course context.
async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?personne ?nom ?prenom ?email ?telephone ?dateNaissance ?role ?universite ?nomUniversite
       ?specialite ?nomSpecialite ?cours ?intituleCours
WHERE {{
    <{uri}> a edu:Personne ;
           edu:nom ?nom ;
           edu:prenom ?prenom .

    OPTIONAL {{ <{uri}> edu:email ?email . }}
    OPTIONAL {{ <{uri}> edu:telephone ?telephone . }}
    OPTIONAL {{ <{uri}> edu:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ <{uri}> edu:role ?role . }}
    OPTIONAL {{
        <{uri}> edu:appartientA ?universite .
        ?universite edu:nomUniversite ?nomUniversite .
    }}
    OPTIONAL {{
        <{uri}> edu:specialiseEn ?specialite .
        ?specialite edu:nomSpecialite ?nomSpecialite .
    }}
    OPTIONAL {{
        <{uri}> edu:suitCours ?cours .
        ?cours edu:intitule ?intituleCours .
    }}
    OPTIONAL {{
        <{uri}> edu:enseigne ?cours .
        ?cours edu:intitule ?intituleCours .
    }}
}}"#
    );

    let rows = state.store.query(&query).await?;
    rows.into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Personne non trouvée"))
}

/// Courses a person follows or teaches.
async fn person_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Row>>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre ?volumeHoraire
WHERE {{
    {{ <{uri}> edu:suitCours ?cours . }}
    UNION
    {{ <{uri}> edu:enseigne ?cours . }}

    ?cours edu:intitule ?intitule .
    OPTIONAL {{ ?cours edu:codeCours ?codeCours . }}
    OPTIONAL {{ ?cours edu:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ ?cours edu:semestre ?semestre . }}
    OPTIONAL {{ ?cours edu:volumeHoraire ?volumeHoraire . }}
}}
ORDER BY ?semestre"#
    );

    Ok(Json(state.store.query(&query).await?))
}

/// Search persons by name, first name, role and university.
async fn search_persons(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut query = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?personne ?nom ?prenom ?email ?telephone ?dateNaissance ?role ?universite ?nomUniversite
WHERE {{
    ?personne a edu:Personne ;
           edu:nom ?nom ;
           edu:prenom ?prenom .

    OPTIONAL {{ ?personne edu:email ?email . }}
    OPTIONAL {{ ?personne edu:telephone ?telephone . }}
    OPTIONAL {{ ?personne edu:dateNaissance ?dateNaissance . }}
    OPTIONAL {{ ?personne edu:role ?role . }}
    OPTIONAL {{
        ?personne edu:appartientA ?universite .
        ?universite edu:nomUniversite ?nomUniversite .
    }}
"#
    );

    if let Some(filter) = regex_filters(&[
        ("nom", str_field(&data, "nom")),
        ("prenom", str_field(&data, "prenom")),
        ("role", str_field(&data, "role")),
        ("nomUniversite", str_field(&data, "universite")),
    ]) {
        query.push_str(&filter);
    }
    query.push_str("\n} ORDER BY ?nom ?prenom");

    Ok(Json(state.store.query(&query).await?))
}

/// Create a person; the role decides the subclass.
async fn create_person(
    State(state): State<AppState>,
    Json(data): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ensure_valid(validate_person(&data))?;

    let last_name = str_field(&data, "nom").unwrap_or_default();
    let first_name = str_field(&data, "prenom").unwrap_or_default();
    let fragment = format!(
        "{}_{}",
        sanitize_fragment(last_name, 30),
        sanitize_fragment(first_name, 30)
    );
    let uri = mint_uri("Personne", &fragment);

    let role = str_field(&data, "role").unwrap_or("Personne");
    let mut builder = InsertBuilder::new(&uri, class_for_role(role));
    builder.literal("nom", last_name);
    builder.literal("prenom", first_name);
    append_person_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Personne créée avec succès", "uri": uri })),
    ))
}

/// Optional person fields shared by create and update.
fn append_person_fields(builder: &mut InsertBuilder, data: &Value) {
    if let Some(email) = str_field(data, "email") {
        builder.literal("email", email);
    }
    if let Some(phone) = str_field(data, "telephone") {
        builder.literal("telephone", phone);
    }
    if let Some(birth) = str_field(data, "dateNaissance") {
        builder.date("dateNaissance", birth);
    }
    if let Some(role) = str_field(data, "role") {
        builder.literal("role", role);
    }
    if let Some(university) = str_field(data, "universite") {
        builder.link("appartientA", university);
    }
    if let Some(specialty) = str_field(data, "specialite") {
        builder.link("specialiseEn", specialty);
    }
    if let Some(registration) = str_field(data, "numeroMatricule") {
        builder.literal("numeroMatricule", registration);
    }
    if let Some(level) = str_field(data, "niveauEtude") {
        builder.literal("niveauEtude", level);
    }
    if let Some(Ok(average)) = float_field(data, "moyenneGenerale") {
        builder.decimal("moyenneGenerale", average);
    }
    if let Some(grade) = str_field(data, "grade") {
        builder.literal("grade", grade);
    }
    if let Some(seniority) = str_field(data, "anciennete") {
        builder.literal("anciennete", seniority);
    }
}

/// Update a person. Course links (suitCours/enseigne) survive the
/// delete-and-reinsert.
async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> ApiResult<Json<Value>> {
    ensure_valid(validate_person(&data))?;

    let uri = normalize_uri(&id);
    state
        .store
        .update(&delete_properties_except(&uri, &["suitCours", "enseigne"]))
        .await?;

    let mut builder = InsertBuilder::new(&uri, "Personne");
    if let Some(last_name) = str_field(&data, "nom") {
        builder.literal("nom", last_name);
    }
    if let Some(first_name) = str_field(&data, "prenom") {
        builder.literal("prenom", first_name);
    }
    append_person_fields(&mut builder, &data);

    state.store.update(&builder.build()).await?;
    Ok(Json(json!({ "message": "Personne mise à jour avec succès" })))
}

/// Delete a person and every triple they are the subject of.
async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    state
        .store
        .update(&crate::sparql::delete_all_properties(&uri))
        .await?;
    Ok(Json(json!({ "message": "Personne supprimée avec succès" })))
}

/// Faceted counts by role class, university and specialty.
async fn person_facets(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let by_role = format!(
        r#"PREFIX edu: <{ONT}>
PREFIX rdf: <{RDF}>
SELECT ?typePersonne (COUNT(DISTINCT ?personne) as ?count)
WHERE {{
    ?personne rdf:type ?typePersonne .
    FILTER(?typePersonne IN (edu:Personne, edu:Etudiant, edu:Enseignant,
                             edu:Professeur, edu:Assistant, edu:Encadrant))
}}
GROUP BY ?typePersonne
ORDER BY DESC(?count)"#
    );

    let by_university = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?universite ?nomUniversite (COUNT(DISTINCT ?personne) as ?count)
WHERE {{
    ?personne a edu:Personne .
    ?personne edu:appartientA ?universite .
    ?universite edu:nomUniversite ?nomUniversite .
}}
GROUP BY ?universite ?nomUniversite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    let by_specialty = format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?specialite ?nomSpecialite (COUNT(DISTINCT ?personne) as ?count)
WHERE {{
    ?personne a edu:Etudiant .
    ?personne edu:specialiseEn ?specialite .
    ?specialite edu:nomSpecialite ?nomSpecialite .
}}
GROUP BY ?specialite ?nomSpecialite
ORDER BY DESC(?count)
LIMIT 20"#
    );

    let mut roles = state.store.query(&by_role).await?;
    // Type URIs come back flattened already; expose the bare class name
    // under a separate label key for the frontend.
    for row in &mut roles {
        if let Some(type_uri) = row.get("typePersonne").cloned() {
            row.insert("typePersonneLabel".to_string(), type_uri);
        }
    }

    Ok(Json(json!({
        "by_role": roles,
        "by_universite": state.store.query(&by_university).await?,
        "by_specialite": state.store.query(&by_specialty).await?,
    })))
}

/// Linked-data enrichment keyed on the person's full name.
async fn enrich_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TermQuery>,
) -> ApiResult<Json<Value>> {
    let uri = normalize_uri(&id);
    let query = format!(
        r#"PREFIX ont: <{ONT}>
PREFIX rdf: <{RDF}>
SELECT ?nom ?prenom ?role
WHERE {{
    <{uri}> rdf:type ?type .
    {filter}
    OPTIONAL {{ <{uri}> ont:nom ?nom . }}
    OPTIONAL {{ <{uri}> ont:prenom ?prenom . }}
    OPTIONAL {{ <{uri}> ont:role ?role . }}
}}
LIMIT 1"#,
        filter = class_filter("type", &PERSON_CLASSES[..6])
    );

    let rows = state.store.query(&query).await?;
    let person = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Personne non trouvée"))?;

    let full_name = format!(
        "{} {}",
        person.get("nom").cloned().unwrap_or_default(),
        person.get("prenom").cloned().unwrap_or_default()
    )
    .trim()
    .to_string();

    let term = params
        .term
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(full_name);
    let term = if term.is_empty() {
        person.get("role").cloned().unwrap_or_default()
    } else {
        term
    };

    Ok(Json(dbpedia_enrichment(&state, "personne", person, term).await))
}
