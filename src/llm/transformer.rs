//! Natural language to SPARQL transformation
//!
//! Builds the ontology-documentation prompt sent to Gemini, extracts a
//! SPARQL query from the free-text answer, repairs the usual syntax
//! slips, and carries the deterministic keyword fallback queries used
//! when generation fails. A configured transformer always produces
//! *some* query; only an unconfigured one reports an error so the
//! caller can hand over to the template engine.

use crate::nlp::QuestionAnalysis;
use crate::ontology::ONT;

use super::{GeminiClient, GenerationOptions, LlmError};

/// Transforms questions (or their structured analysis) into SPARQL.
#[derive(Debug, Clone)]
pub struct SparqlTransformer {
    client: GeminiClient,
}

impl SparqlTransformer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Whether generation is available at all.
    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Generate a query from a structured analysis.
    ///
    /// Falls back internally: analysis prompt → plain question prompt →
    /// deterministic keyword query. Only returns `Err` when no API key
    /// is configured.
    pub async fn from_analysis(
        &self,
        analysis: &QuestionAnalysis,
    ) -> Result<String, LlmError> {
        if !self.client.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let prompt = build_analysis_prompt(analysis);
        let options = GenerationOptions {
            max_output_tokens: 1200,
            ..GenerationOptions::default()
        };

        match self.client.generate(&prompt, options).await {
            Ok(text) => {
                let query = extract_sparql(&text);
                Ok(clean_query(&query).unwrap_or_else(|| fallback_query("personnes")))
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis prompt failed, retrying with plain question");
                self.from_question(&analysis.original_question).await
            }
        }
    }

    /// Generate a query from the raw question text.
    pub async fn from_question(&self, question: &str) -> Result<String, LlmError> {
        if !self.client.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let prompt = build_question_prompt(question);
        match self.client.generate(&prompt, GenerationOptions::default()).await {
            Ok(text) => {
                let query = extract_sparql(&text);
                Ok(clean_query(&query).unwrap_or_else(|| fallback_query(question)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed, using keyword fallback query");
                Ok(fallback_query(question))
            }
        }
    }
}

/// Shared ontology documentation block for the prompts.
fn ontology_documentation() -> String {
    format!(
        r#"ONTOLOGY CONTEXT:
PREFIX edu: <{ONT}>
PREFIX ont: <{ONT}>

MAIN CLASSES AND THEIR PROPERTIES (Education Domain):
- Personne (edu:Personne): nom, prenom, email, telephone, dateNaissance, role
  - Etudiant (edu:Etudiant): nom, prenom, email, telephone, numeroMatricule, niveauEtude, moyenneGenerale, appartientA, specialiseEn, suitCours
  - EtudiantLicence / EtudiantMaster / EtudiantDoctorat: same as Etudiant
  - Enseignant (edu:Enseignant): nom, prenom, email, telephone, grade, anciennete, appartientA, enseigne
  - Professeur / Assistant / Encadrant: same as Enseignant
- Universite (edu:Universite): nomUniversite, anneeFondation, ville, pays, nombreEtudiants, rangNational, siteWeb, offre, emploie, adopteTechnologie
  - UniversitePublique / UniversitePrivee: same as Universite
- Specialite (edu:Specialite): nomSpecialite, codeSpecialite, description, dureeFormation, niveauDiplome, nombreModules, estOffertePar, faitPartieDe, formePour
  - SpecialiteInformatique / SpecialiteDataScience / SpecialiteIngenierie / SpecialiteSciences / SpecialiteMedecine / SpecialiteEconomie / SpecialiteDroit / SpecialiteLettres: same as Specialite
- Cours (edu:Cours): intitule, codeCours, creditsECTS, semestre, volumeHoraire, langueCours, faitPartieDe, enseignePar
  - CoursTheorique / CoursPratique: same as Cours
- Competence (edu:Competence): nomCompetence, description, niveau, estFormeePar
- ProjetAcademique (edu:ProjetAcademique): nomProjet, description, dateDebut, dateFin, typeProjet, estRealisePar, concerne
- RessourcePedagogique (edu:RessourcePedagogique): nomRessource, description, typeRessource, estUtiliseDans
- TechnologieEducative (edu:TechnologieEducative): nomTechnologie, description, typeTechnologie, estUtilisePar
- Evaluation (edu:Evaluation): typeEvaluation, dateEvaluation, note, estRealisePar, concerne
- OrientationAcademique (edu:OrientationAcademique): typeOrientation, dateOrientation, concerne
  - EntretienConseiller (edu:EntretienConseiller): same as OrientationAcademique"#
    )
}

fn generation_rules() -> &'static str {
    r#"QUERY GENERATION RULES:
1. Always use PREFIX edu: or PREFIX ont: with the education ontology namespace
2. For education domain entities, use edu: or ont: prefix (edu:Personne, edu:Universite, edu:Cours)
3. For education properties, use edu: prefix (edu:nom, edu:prenom, edu:nomUniversite, edu:intitule)
4. CRITICAL: Always use proper SPARQL syntax: ?entity edu:property ?variable
5. Use OPTIONAL for properties that might not exist
6. Use FILTER with CONTAINS/REGEX for text searches: FILTER(CONTAINS(LCASE(STR(?nom)), "searchterm"))
7. Use FILTER with date comparisons for temporal queries: FILTER(?date >= NOW()) for future
8. Use FILTER with city/location matching for location queries: FILTER(CONTAINS(LCASE(STR(?ville)), "cityname"))
9. Use ORDER BY when appropriate for sorting: ORDER BY ?nom
10. Use LIMIT 20-50 to prevent too many results
11. Use GROUP BY and COUNT for counting queries: SELECT (COUNT(?entity) as ?count)
12. Use UNION for multiple entity types or subclasses
13. For Personne queries, use UNION to include all subclasses (Etudiant, Enseignant, etc.)
14. For Cours queries, use UNION to include all subclasses (CoursTheorique, CoursPratique)
15. Return ONLY the SPARQL query, no explanations

SPARQL SYNTAX EXAMPLES (Education Domain):
- Correct: ?personne a edu:Personne . ?personne edu:nom ?nom . ?personne edu:prenom ?prenom .
- Correct: ?etudiant a edu:Etudiant . ?etudiant edu:numeroMatricule ?matricule .
- Correct: ?universite a edu:Universite . ?universite edu:nomUniversite ?nom .
- Correct: ?cours a edu:Cours . ?cours edu:intitule ?intitule . ?cours edu:codeCours ?code .
- Incorrect: edu:nom ?nom (missing subject)
- Incorrect: ?personne edu:nom (missing object)"#
}

/// Prompt used when only the raw question is available.
fn build_question_prompt(question: &str) -> String {
    format!(
        r#"You are a SPARQL query generator for an educational platform. Convert the natural language question to a valid SPARQL query.

{}

{}

QUESTION: "{question}"

SPARQL QUERY:"#,
        ontology_documentation(),
        generation_rules()
    )
}

/// Prompt embedding the structured analysis context.
fn build_analysis_prompt(analysis: &QuestionAnalysis) -> String {
    format!(
        r#"You are an expert SPARQL query generator for an educational platform. Generate a precise SPARQL query based on the structured analysis provided below.

{}

ANALYSIS RESULTS:
{}

{}

Generate a SPARQL query that accurately addresses the user's intent using the detected entities and relationships:

SPARQL QUERY:"#,
        ontology_documentation(),
        analysis.structured_context(),
        generation_rules()
    )
}

/// Extract the SPARQL query from free-form model output.
pub fn extract_sparql(text: &str) -> String {
    // Strip markdown fences, keeping their content.
    let defenced: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut query_lines = Vec::new();
    let mut in_query = false;

    for line in defenced.lines() {
        let stripped = line.trim();
        if stripped.starts_with("PREFIX")
            || stripped.starts_with("SELECT")
            || stripped.starts_with("CONSTRUCT")
            || stripped.starts_with("ASK")
            || stripped.starts_with("DESCRIBE")
        {
            in_query = true;
        }
        if in_query && !stripped.is_empty() && !stripped.starts_with("QUESTION:") {
            query_lines.push(line);
        }
    }

    let mut query = query_lines.join("\n").trim().to_string();

    // Make sure the education prefix is declared when used.
    let has_prefix = query.contains("PREFIX edu:") || query.contains("PREFIX ont:");
    if !has_prefix {
        query = format!("PREFIX edu: <{ONT}>\n{query}");
    }

    query
}

/// Validate and repair a generated query. Returns `None` when nothing
/// usable remains (no `SELECT`), in which case the caller substitutes a
/// fallback query.
pub fn clean_query(query: &str) -> Option<String> {
    if query.trim().is_empty() || !query.contains("SELECT") {
        return None;
    }

    let mut fixed_lines = Vec::new();
    for line in query.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("PREFIX")
            || line.starts_with("SELECT")
            || line.starts_with("WHERE")
            || line.starts_with("LIMIT")
            || line.starts_with("ORDER")
        {
            fixed_lines.push(line.to_string());
            continue;
        }

        // A line that opens with a bare property has lost its subject.
        if line.starts_with("edu:") || line.starts_with("ont:") {
            tracing::debug!(line, "dropping subject-less triple from generated query");
            continue;
        }

        // A line that ends on a dangling prefix is an incomplete triple.
        if line.ends_with("edu:") || line.ends_with("ont:") {
            tracing::debug!(line, "dropping incomplete triple from generated query");
            continue;
        }

        fixed_lines.push(line.to_string());
    }

    let mut cleaned = fixed_lines.join("\n");
    if !cleaned.contains("LIMIT") {
        cleaned.push_str("\nLIMIT 50");
    }

    Some(cleaned)
}

/// Deterministic keyword fallback: one canned query per entity family.
pub fn fallback_query(question: &str) -> String {
    let q = question.to_lowercase();

    if q.contains("étudiant") || q.contains("etudiant") || q.contains("student") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?etudiant ?nom ?prenom ?email ?numeroMatricule ?niveauEtude ?moyenneGenerale
WHERE {{
    {{ ?etudiant a edu:Etudiant . }}
    UNION {{ ?etudiant a edu:EtudiantLicence . }}
    UNION {{ ?etudiant a edu:EtudiantMaster . }}
    UNION {{ ?etudiant a edu:EtudiantDoctorat . }}
    OPTIONAL {{ ?etudiant edu:nom ?nom }}
    OPTIONAL {{ ?etudiant edu:prenom ?prenom }}
    OPTIONAL {{ ?etudiant edu:email ?email }}
    OPTIONAL {{ ?etudiant edu:numeroMatricule ?numeroMatricule }}
    OPTIONAL {{ ?etudiant edu:niveauEtude ?niveauEtude }}
    OPTIONAL {{ ?etudiant edu:moyenneGenerale ?moyenneGenerale }}
}}
ORDER BY ?nom
LIMIT 50"#
        );
    }

    if q.contains("enseignant") || q.contains("teacher") || q.contains("professeur") || q.contains("professor") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?enseignant ?nom ?prenom ?email ?grade ?anciennete
WHERE {{
    {{ ?enseignant a edu:Enseignant . }}
    UNION {{ ?enseignant a edu:Professeur . }}
    UNION {{ ?enseignant a edu:Assistant . }}
    UNION {{ ?enseignant a edu:Encadrant . }}
    OPTIONAL {{ ?enseignant edu:nom ?nom }}
    OPTIONAL {{ ?enseignant edu:prenom ?prenom }}
    OPTIONAL {{ ?enseignant edu:email ?email }}
    OPTIONAL {{ ?enseignant edu:grade ?grade }}
    OPTIONAL {{ ?enseignant edu:anciennete ?anciennete }}
}}
ORDER BY ?nom
LIMIT 50"#
        );
    }

    if q.contains("personne") || q.contains("person") || q.contains("people") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?personne ?nom ?prenom ?email ?telephone ?role
WHERE {{
    {{ ?personne a edu:Personne . }}
    UNION {{ ?personne a edu:Etudiant . }}
    UNION {{ ?personne a edu:Enseignant . }}
    OPTIONAL {{ ?personne edu:nom ?nom }}
    OPTIONAL {{ ?personne edu:prenom ?prenom }}
    OPTIONAL {{ ?personne edu:email ?email }}
    OPTIONAL {{ ?personne edu:telephone ?telephone }}
    OPTIONAL {{ ?personne edu:role ?role }}
}}
ORDER BY ?nom
LIMIT 50"#
        );
    }

    if q.contains("université") || q.contains("universite") || q.contains("university") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?universite ?nomUniversite ?ville ?pays ?nombreEtudiants
WHERE {{
    {{ ?universite a edu:Universite . }}
    UNION {{ ?universite a edu:UniversitePublique . }}
    UNION {{ ?universite a edu:UniversitePrivee . }}
    OPTIONAL {{ ?universite edu:nomUniversite ?nomUniversite }}
    OPTIONAL {{ ?universite edu:ville ?ville }}
    OPTIONAL {{ ?universite edu:pays ?pays }}
    OPTIONAL {{ ?universite edu:nombreEtudiants ?nombreEtudiants }}
}}
ORDER BY ?nomUniversite
LIMIT 50"#
        );
    }

    if q.contains("spécialité") || q.contains("specialite") || q.contains("specialization") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?specialite ?nomSpecialite ?codeSpecialite ?description
WHERE {{
    ?specialite a edu:Specialite .
    OPTIONAL {{ ?specialite edu:nomSpecialite ?nomSpecialite }}
    OPTIONAL {{ ?specialite edu:codeSpecialite ?codeSpecialite }}
    OPTIONAL {{ ?specialite edu:description ?description }}
}}
ORDER BY ?nomSpecialite
LIMIT 50"#
        );
    }

    if q.contains("cours") || q.contains("course") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre
WHERE {{
    {{ ?cours a edu:Cours . }}
    UNION {{ ?cours a edu:CoursTheorique . }}
    UNION {{ ?cours a edu:CoursPratique . }}
    OPTIONAL {{ ?cours edu:intitule ?intitule }}
    OPTIONAL {{ ?cours edu:codeCours ?codeCours }}
    OPTIONAL {{ ?cours edu:creditsECTS ?creditsECTS }}
    OPTIONAL {{ ?cours edu:semestre ?semestre }}
}}
ORDER BY ?intitule
LIMIT 50"#
        );
    }

    if q.contains("compétence") || q.contains("competence") || q.contains("skill") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?competence ?nomCompetence ?description ?niveau
WHERE {{
    ?competence a edu:Competence .
    OPTIONAL {{ ?competence edu:nomCompetence ?nomCompetence }}
    OPTIONAL {{ ?competence edu:description ?description }}
    OPTIONAL {{ ?competence edu:niveau ?niveau }}
}}
ORDER BY ?nomCompetence
LIMIT 50"#
        );
    }

    if q.contains("projet") || q.contains("project") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?projet ?nomProjet ?description ?dateDebut ?dateFin
WHERE {{
    ?projet a edu:ProjetAcademique .
    OPTIONAL {{ ?projet edu:nomProjet ?nomProjet }}
    OPTIONAL {{ ?projet edu:description ?description }}
    OPTIONAL {{ ?projet edu:dateDebut ?dateDebut }}
    OPTIONAL {{ ?projet edu:dateFin ?dateFin }}
}}
ORDER BY ?nomProjet
LIMIT 50"#
        );
    }

    if q.contains("ressource") || q.contains("resource") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?ressource ?nomRessource ?description ?typeRessource
WHERE {{
    ?ressource a edu:RessourcePedagogique .
    OPTIONAL {{ ?ressource edu:nomRessource ?nomRessource }}
    OPTIONAL {{ ?ressource edu:description ?description }}
    OPTIONAL {{ ?ressource edu:typeRessource ?typeRessource }}
}}
ORDER BY ?nomRessource
LIMIT 50"#
        );
    }

    if q.contains("technologie") || q.contains("technology") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?technologie ?nomTechnologie ?description ?typeTechnologie
WHERE {{
    ?technologie a edu:TechnologieEducative .
    OPTIONAL {{ ?technologie edu:nomTechnologie ?nomTechnologie }}
    OPTIONAL {{ ?technologie edu:description ?description }}
    OPTIONAL {{ ?technologie edu:typeTechnologie ?typeTechnologie }}
}}
ORDER BY ?nomTechnologie
LIMIT 50"#
        );
    }

    if q.contains("évaluation") || q.contains("evaluation") || q.contains("examen") || q.contains("exam") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?evaluation ?typeEvaluation ?dateEvaluation ?note
WHERE {{
    ?evaluation a edu:Evaluation .
    OPTIONAL {{ ?evaluation edu:typeEvaluation ?typeEvaluation }}
    OPTIONAL {{ ?evaluation edu:dateEvaluation ?dateEvaluation }}
    OPTIONAL {{ ?evaluation edu:note ?note }}
}}
ORDER BY ?dateEvaluation
LIMIT 50"#
        );
    }

    if q.contains("orientation") {
        return format!(
            r#"PREFIX edu: <{ONT}>
SELECT ?orientation ?typeOrientation ?dateOrientation
WHERE {{
    {{ ?orientation a edu:OrientationAcademique . }}
    UNION {{ ?orientation a edu:EntretienConseiller . }}
    OPTIONAL {{ ?orientation edu:typeOrientation ?typeOrientation }}
    OPTIONAL {{ ?orientation edu:dateOrientation ?dateOrientation }}
}}
ORDER BY ?dateOrientation
LIMIT 50"#
        );
    }

    // Nothing recognized: a broad inventory across the main classes.
    format!(
        r#"PREFIX edu: <{ONT}>
SELECT ?item ?name ?type
WHERE {{
    {{
        ?item a edu:Personne .
        OPTIONAL {{ ?item edu:nom ?nom1 . ?item edu:prenom ?prenom1 . }}
        BIND(CONCAT(COALESCE(?nom1, ""), " ", COALESCE(?prenom1, "")) as ?name)
        BIND("Personne" as ?type)
    }}
    UNION {{ ?item a edu:Universite . ?item edu:nomUniversite ?name . BIND("Universite" as ?type) }}
    UNION {{ ?item a edu:Specialite . ?item edu:nomSpecialite ?name . BIND("Specialite" as ?type) }}
    UNION {{ ?item a edu:Cours . ?item edu:intitule ?name . BIND("Cours" as ?type) }}
    UNION {{ ?item a edu:Competence . ?item edu:nomCompetence ?name . BIND("Competence" as ?type) }}
    UNION {{ ?item a edu:ProjetAcademique . ?item edu:nomProjet ?name . BIND("ProjetAcademique" as ?type) }}
    UNION {{ ?item a edu:RessourcePedagogique . ?item edu:nomRessource ?name . BIND("RessourcePedagogique" as ?type) }}
    UNION {{ ?item a edu:TechnologieEducative . ?item edu:nomTechnologie ?name . BIND("TechnologieEducative" as ?type) }}
    UNION {{ ?item a edu:Evaluation . ?item edu:typeEvaluation ?name . BIND("Evaluation" as ?type) }}
    UNION {{ ?item a edu:OrientationAcademique . ?item edu:typeOrientation ?name . BIND("OrientationAcademique" as ?type) }}
}}
ORDER BY ?type ?name
LIMIT 50"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sparql_strips_fences() {
        let text = "Here is the query:\n```sparql\nPREFIX edu: <http://www.education-intelligente.org/ontologie#>\nSELECT ?s WHERE { ?s a edu:Cours }\n```\nHope it helps!";
        let query = extract_sparql(text);
        assert!(query.starts_with("PREFIX edu:"));
        assert!(query.contains("SELECT ?s"));
        assert!(!query.contains("```"));
        assert!(!query.contains("Hope it helps"));
    }

    #[test]
    fn test_extract_sparql_adds_missing_prefix() {
        let query = extract_sparql("SELECT ?s WHERE { ?s a edu:Cours }");
        assert!(query.starts_with(&format!("PREFIX edu: <{ONT}>")));
    }

    #[test]
    fn test_clean_query_drops_subjectless_lines() {
        let raw = "PREFIX edu: <x>\nSELECT ?s\nWHERE {\n?s a edu:Cours .\nedu:intitule ?titre .\n}";
        let cleaned = clean_query(raw).unwrap();
        assert!(!cleaned.contains("edu:intitule ?titre"));
        assert!(cleaned.contains("?s a edu:Cours ."));
    }

    #[test]
    fn test_clean_query_appends_limit() {
        let cleaned = clean_query("SELECT ?s\nWHERE { ?s ?p ?o }").unwrap();
        assert!(cleaned.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_clean_query_keeps_existing_limit() {
        let cleaned = clean_query("SELECT ?s\nWHERE { ?s ?p ?o }\nLIMIT 10").unwrap();
        assert!(cleaned.contains("LIMIT 10"));
        assert!(!cleaned.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_clean_query_rejects_non_select() {
        assert!(clean_query("this is not a query").is_none());
        assert!(clean_query("").is_none());
    }

    #[test]
    fn test_fallback_query_students() {
        let query = fallback_query("liste des étudiants en master");
        assert!(query.contains("edu:EtudiantMaster"));
        assert!(query.contains("UNION"));
    }

    #[test]
    fn test_fallback_query_students_before_persons() {
        // "étudiant" must win over the broader "personne" branch.
        let query = fallback_query("les étudiants de cette personne");
        assert!(query.contains("?etudiant"));
    }

    #[test]
    fn test_fallback_query_default_inventory() {
        let query = fallback_query("montre-moi tout");
        assert!(query.contains("BIND(\"Universite\" as ?type)"));
        assert!(query.contains("LIMIT 50"));
    }
}
