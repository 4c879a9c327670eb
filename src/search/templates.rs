//! Deterministic SPARQL template engine
//!
//! Last line of defense for the search pipeline: a regex keyword match
//! chooses among canned queries. No external service involved, so it
//! always answers instantly — or not at all when no entity is
//! recognized.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ontology::ONT;

/// Entity families the engine recognizes, in priority order.
const ENTITY_PATTERNS: &[(&str, &str)] = &[
    ("universite", r"(universit[ée]|univ|facult[ée])"),
    ("specialite", r"(sp[ée]cialit[ée]|formation|programme|domaine)"),
    ("cours", r"(cours|matière|module|enseignement)"),
    ("competence", r"(comp[ée]tence|skill|savoir-faire)"),
    ("projet", r"(projet|stage|travail)"),
    ("personne", r"(personne|étudiant|enseignant|professeur)"),
    ("evaluation", r"(évaluation|examen|note|contrôle)"),
    ("orientation", r"(orientation|conseil|guidance)"),
    ("ressource", r"(ressource|matériel|support)"),
    ("technologie", r"(technologie|outil|logiciel|plateforme)"),
];

const INTENT_PATTERNS: &[(&str, &str)] = &[
    ("list", r"(liste|tous|toutes|montrer|afficher|quels|quelles)"),
    ("count", r"(combien|nombre|total|statistique)"),
    ("filter", r"(selon|filtrer|où|qui|avec)"),
    ("search", r"(rechercher|trouver|chercher)"),
    ("top", r"(meilleur|top|premier|classement|rang)"),
];

lazy_static! {
    static ref ENTITY_REGEXES: Vec<(&'static str, Regex)> = ENTITY_PATTERNS
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(pattern).unwrap()))
        .collect();
    static ref INTENT_REGEXES: Vec<(&'static str, Regex)> = INTENT_PATTERNS
        .iter()
        .map(|(name, pattern)| (*name, Regex::new(pattern).unwrap()))
        .collect();
}

/// Template-based SPARQL query generator.
#[derive(Debug, Default, Clone)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Detect the dominant intent; defaults to `list`.
    pub fn match_intent(&self, question: &str) -> &'static str {
        let lower = question.to_lowercase();
        for (intent, re) in INTENT_REGEXES.iter() {
            if re.is_match(&lower) {
                return intent;
            }
        }
        "list"
    }

    /// Detect every entity family mentioned, in priority order.
    pub fn match_entities(&self, question: &str) -> Vec<&'static str> {
        let lower = question.to_lowercase();
        ENTITY_REGEXES
            .iter()
            .filter(|(_, re)| re.is_match(&lower))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Pick a canned query for the question, or `None` when no entity
    /// is recognized.
    pub fn generate(&self, question: &str) -> Option<String> {
        let entities = self.match_entities(question);
        let intent = self.match_intent(question);
        let primary = *entities.first()?;

        tracing::debug!(entity = primary, intent, "template engine selected");

        let query = match (primary, intent) {
            ("universite", "count") => universities_count(),
            ("universite", "top") => universities_top_rated(),
            ("universite", _) => universities_list(),
            ("specialite", "count") => specialties_count(),
            ("specialite", _) => specialties_list(),
            ("cours", _) => courses_list(),
            ("personne", _) => persons_list(),
            ("projet", _) => projects_list(),
            _ => universities_list(),
        };

        Some(query)
    }
}

fn universities_list() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?universite ?nomUniversite ?ville ?pays ?rangNational ?nombreEtudiants
WHERE {{
    ?universite a ont:Universite .
    OPTIONAL {{ ?universite ont:nomUniversite ?nomUniversite . }}
    OPTIONAL {{ ?universite ont:ville ?ville . }}
    OPTIONAL {{ ?universite ont:pays ?pays . }}
    OPTIONAL {{ ?universite ont:rangNational ?rangNational . }}
    OPTIONAL {{ ?universite ont:nombreEtudiants ?nombreEtudiants . }}
}}
ORDER BY ?nomUniversite
LIMIT 50"#
    )
}

fn universities_count() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT (COUNT(DISTINCT ?universite) as ?total)
WHERE {{
    ?universite a ont:Universite .
}}"#
    )
}

fn universities_top_rated() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?universite ?nomUniversite ?ville ?pays ?rangNational
WHERE {{
    ?universite a ont:Universite .
    ?universite ont:nomUniversite ?nomUniversite .
    ?universite ont:rangNational ?rangNational .
    FILTER(xsd:integer(?rangNational) <= 5)
    OPTIONAL {{ ?universite ont:ville ?ville . }}
    OPTIONAL {{ ?universite ont:pays ?pays . }}
}}
ORDER BY xsd:integer(?rangNational)
LIMIT 10"#
    )
}

fn specialties_list() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?specialite ?nomSpecialite ?codeSpecialite ?niveauDiplome ?universite ?nomUniversite
WHERE {{
    ?specialite a ont:Specialite .
    OPTIONAL {{ ?specialite ont:nomSpecialite ?nomSpecialite . }}
    OPTIONAL {{ ?specialite ont:codeSpecialite ?codeSpecialite . }}
    OPTIONAL {{ ?specialite ont:niveauDiplome ?niveauDiplome . }}
    OPTIONAL {{
        ?specialite ont:estOffertePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY ?nomSpecialite
LIMIT 50"#
    )
}

fn specialties_count() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT (COUNT(DISTINCT ?specialite) as ?total)
WHERE {{
    ?specialite a ont:Specialite .
}}"#
    )
}

fn courses_list() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?cours ?intitule ?codeCours ?creditsECTS ?semestre
WHERE {{
    ?cours a ont:Cours .
    OPTIONAL {{ ?cours ont:intitule ?intitule . }}
    OPTIONAL {{ ?cours ont:codeCours ?codeCours . }}
    OPTIONAL {{ ?cours ont:creditsECTS ?creditsECTS . }}
    OPTIONAL {{ ?cours ont:semestre ?semestre . }}
}}
ORDER BY ?intitule
LIMIT 50"#
    )
}

fn persons_list() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?personne ?nom ?prenom ?type ?email
WHERE {{
    ?personne a ?type .
    FILTER(?type IN (ont:Personne, ont:Etudiant, ont:Enseignant))
    OPTIONAL {{ ?personne ont:nom ?nom . }}
    OPTIONAL {{ ?personne ont:prenom ?prenom . }}
    OPTIONAL {{ ?personne ont:email ?email . }}
}}
ORDER BY ?nom ?prenom
LIMIT 50"#
    )
}

fn projects_list() -> String {
    format!(
        r#"PREFIX ont: <{ONT}>
SELECT ?projet ?titreProjet ?typeProjet ?anneeRealisation ?universite ?nomUniversite
WHERE {{
    ?projet a ont:ProjetAcademique .
    OPTIONAL {{ ?projet ont:titreProjet ?titreProjet . }}
    OPTIONAL {{ ?projet ont:typeProjet ?typeProjet . }}
    OPTIONAL {{ ?projet ont:anneeRealisation ?anneeRealisation . }}
    OPTIONAL {{
        ?projet ont:estOrganisePar ?universite .
        ?universite ont:nomUniversite ?nomUniversite .
    }}
}}
ORDER BY DESC(?anneeRealisation)
LIMIT 50"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_intent_count() {
        let engine = TemplateEngine::new();
        assert_eq!(engine.match_intent("combien d'universités ?"), "count");
        assert_eq!(engine.match_intent("liste des cours"), "list");
        assert_eq!(engine.match_intent("bonjour"), "list");
    }

    #[test]
    fn test_match_entities_order() {
        let engine = TemplateEngine::new();
        let entities = engine.match_entities("les cours de cette université");
        assert_eq!(entities[0], "universite");
        assert!(entities.contains(&"cours"));
    }

    #[test]
    fn test_generate_university_count() {
        let engine = TemplateEngine::new();
        let query = engine.generate("combien d'universités au total ?").unwrap();
        assert!(query.contains("COUNT(DISTINCT ?universite)"));
    }

    #[test]
    fn test_generate_top_universities() {
        let engine = TemplateEngine::new();
        let query = engine.generate("classement des universités").unwrap();
        assert!(query.contains("rangNational"));
        assert!(query.contains("LIMIT 10"));
    }

    #[test]
    fn test_generate_course_list() {
        let engine = TemplateEngine::new();
        let query = engine.generate("montrer les cours").unwrap();
        assert!(query.contains("ont:Cours"));
    }

    #[test]
    fn test_generate_none_when_no_entity() {
        let engine = TemplateEngine::new();
        assert!(engine.generate("quelle heure est-il ?").is_none());
    }
}
