//! Pattern-based question analyzer
//!
//! Deterministic fallback used whenever no generative API is available
//! (or it fails): a keyword table maps French/English terms to ontology
//! classes, small word lists detect intent, temporal hints and city
//! names. Shallow by design — it only needs to be good enough to steer
//! the SPARQL templates.

use super::{
    AnalysisMetadata, ConfidenceScores, DetectedEntity, Intent, Keyword, LocationInfo,
    QuestionAnalysis, TemporalInfo,
};

/// Keyword table: ontology class → trigger terms (French and English).
/// Matched by plain substring on the lowercased question.
const ENTITY_KEYWORDS: &[(&str, &[&str])] = &[
    ("edu:Personne", &["personne", "person", "personnes", "people", "individu", "individual"]),
    ("edu:Etudiant", &["étudiant", "etudiant", "student", "étudiants", "students", "élève", "eleve", "pupil", "apprenant", "learner"]),
    ("edu:Enseignant", &["enseignant", "teacher", "professeur", "professor", "prof", "instructeur", "instructor", "formateur", "trainer"]),
    ("edu:Professeur", &["professeur", "professor", "prof", "professeurs", "professors"]),
    ("edu:Assistant", &["assistant", "assistants", "aide", "helper"]),
    ("edu:Encadrant", &["encadrant", "supervisor", "encadrants", "supervisors", "tuteur", "tutor"]),
    ("edu:Universite", &["université", "universite", "university", "universités", "universities", "établissement", "etablissement", "institution", "institut", "institute"]),
    ("edu:UniversitePublique", &["université publique", "public university", "université d'état"]),
    ("edu:UniversitePrivee", &["université privée", "private university"]),
    ("edu:Specialite", &["spécialité", "specialite", "specialization", "spécialisations", "specializations", "domaine", "field", "discipline", "branche", "branch", "majeure", "major"]),
    ("edu:SpecialiteInformatique", &["informatique", "computer science", "computing", "technologie de l'information"]),
    ("edu:SpecialiteDataScience", &["data science", "science des données", "big data", "analytics"]),
    ("edu:SpecialiteIngenierie", &["ingénierie", "engineering", "génie", "engineer"]),
    ("edu:Cours", &["cours", "course", "courses", "matière", "matiere", "subject", "module", "modules", "classe", "class"]),
    ("edu:CoursTheorique", &["cours théorique", "theoretical course"]),
    ("edu:CoursPratique", &["cours pratique", "practical course", "travaux pratiques"]),
    ("edu:Competence", &["compétence", "competence", "skill", "skills", "compétences", "competencies", "capacité", "capacity", "aptitude", "savoir-faire", "know-how"]),
    ("edu:ProjetAcademique", &["projet académique", "academic project", "projet", "project", "projets", "projects", "travail", "work", "recherche", "research"]),
    ("edu:RessourcePedagogique", &["ressource pédagogique", "pedagogical resource", "ressource", "resource", "ressources", "resources", "matériel pédagogique", "educational material", "support de cours", "course material"]),
    ("edu:TechnologieEducative", &["technologie éducative", "educational technology", "technologie", "technology", "technologies", "tech", "outil pédagogique", "educational tool", "plateforme", "platform"]),
    ("edu:Evaluation", &["évaluation", "evaluation", "assessment", "évaluations", "assessments", "examen", "exam", "examens", "exams", "test", "tests", "contrôle", "contrôle continu", "continuous assessment"]),
    ("edu:OrientationAcademique", &["orientation académique", "academic orientation", "orientation", "guidance", "conseil", "counseling", "parcours", "path", "voie", "way"]),
    ("edu:EntretienConseiller", &["entretien conseiller", "counselor interview", "entretien", "interview"]),
];

/// Broader second-pass groups, tried only when the exact table found
/// nothing: one representative entity per class family.
const BROAD_GROUPS: &[(&str, &str, &str, &[&str])] = &[
    ("personne", "Personne", "edu:Personne", &["personne", "person", "personnes", "people"]),
    ("étudiant", "Etudiant", "edu:Etudiant", &["étudiant", "etudiant", "student", "étudiants", "students"]),
    ("enseignant", "Enseignant", "edu:Enseignant", &["enseignant", "teacher", "professeur", "professor", "prof"]),
    ("université", "Universite", "edu:Universite", &["université", "universite", "university", "universités", "universities"]),
    ("spécialité", "Specialite", "edu:Specialite", &["spécialité", "specialite", "specialization", "spécialisations", "specializations"]),
    ("cours", "Cours", "edu:Cours", &["cours", "course", "courses", "matière", "matiere", "subject", "module"]),
    ("compétence", "Competence", "edu:Competence", &["compétence", "competence", "skill", "skills", "compétences", "competencies"]),
    ("projet", "ProjetAcademique", "edu:ProjetAcademique", &["projet", "project", "projets", "projects", "travail", "work"]),
    ("ressource", "RessourcePedagogique", "edu:RessourcePedagogique", &["ressource", "resource", "ressources", "resources", "matériel", "material"]),
    ("technologie", "TechnologieEducative", "edu:TechnologieEducative", &["technologie", "technology", "technologies", "tech", "outil", "tool"]),
    ("évaluation", "Evaluation", "edu:Evaluation", &["évaluation", "evaluation", "assessment", "examen", "exam", "test", "tests"]),
    ("orientation", "OrientationAcademique", "edu:OrientationAcademique", &["orientation", "guidance", "conseil", "counseling"]),
];

const TEMPORAL_KEYWORDS: &[(&str, &[&str])] = &[
    ("future", &["à venir", "futur", "future", "upcoming", "prochain", "demain", "tomorrow"]),
    ("past", &["passé", "past", "ancien", "previous", "terminé", "hier", "yesterday"]),
    ("present", &["aujourd'hui", "today", "ce jour", "actuel", "current"]),
    ("week", &["semaine", "week", "weekend", "week-end"]),
    ("month", &["mois", "month"]),
    ("year", &["année", "year", "annuel", "annual"]),
];

const LOCATION_KEYWORDS: &[&str] =
    &["paris", "london", "new york", "boston", "chicago", "san francisco", "tunis"];

const INTENT_PATTERNS: &[(&str, &[&str])] = &[
    ("list", &["quelles", "quels", "montre", "liste", "tous", "all", "every"]),
    ("count", &["combien", "nombre", "total", "count", "how many"]),
    ("filter", &["par type", "par catégorie", "par ville", "par date"]),
    ("search", &["recherche", "trouve", "find", "search", "cherche"]),
    ("details", &["détails", "informations", "details", "information", "qui", "où", "quand"]),
];

const STOPWORDS: &[&str] = &["les", "des", "une", "pour", "avec", "dans", "sur"];

/// Deterministic keyword analyzer.
#[derive(Debug, Default, Clone)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a question with keyword matching only.
    pub fn analyze(&self, question: &str) -> QuestionAnalysis {
        let lower = question.to_lowercase();

        let mut entities = Vec::new();
        for (class, keywords) in ENTITY_KEYWORDS {
            for keyword in *keywords {
                if lower.contains(keyword) {
                    let kind = class.split(':').nth(1).unwrap_or(class).to_string();
                    tracing::debug!(keyword, class, "entity keyword matched");
                    entities.push(DetectedEntity {
                        text: (*keyword).to_string(),
                        kind,
                        category: String::from("domain_entity"),
                        confidence: 0.8,
                        start_pos: None,
                        end_pos: None,
                        ontology_class: (*class).to_string(),
                    });
                }
            }
        }

        // Broad families as a second chance when nothing matched exactly.
        if entities.is_empty() {
            for (text, kind, class, terms) in BROAD_GROUPS {
                if terms.iter().any(|t| lower.contains(t)) {
                    entities.push(DetectedEntity {
                        text: (*text).to_string(),
                        kind: (*kind).to_string(),
                        category: String::from("domain_entity"),
                        confidence: 0.9,
                        start_pos: None,
                        end_pos: None,
                        ontology_class: (*class).to_string(),
                    });
                }
            }
        }

        let mut temporal = TemporalInfo::default();
        for (time_type, keywords) in TEMPORAL_KEYWORDS {
            if let Some(found) = keywords.iter().find(|k| lower.contains(*k)) {
                temporal.time_expressions.push((*found).to_string());
                temporal.relative_time = Some((*time_type).to_string());
            }
        }

        let mut location = LocationInfo::default();
        for city in LOCATION_KEYWORDS {
            if lower.contains(city) {
                location.locations.push((*city).to_string());
            }
        }

        let mut intent = Intent::default();
        for (intent_type, keywords) in INTENT_PATTERNS {
            if keywords.iter().any(|k| lower.contains(k)) {
                intent.primary_intent = (*intent_type).to_string();
                intent.query_type = (*intent_type).to_string();
            }
        }

        let keywords = question
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .map(|word| word.to_lowercase())
            .filter(|word| !STOPWORDS.contains(&word.as_str()))
            .map(|word| Keyword {
                text: word,
                importance: 0.5,
                category: String::from("general"),
                semantic_type: String::from("keyword"),
            })
            .collect();

        QuestionAnalysis {
            original_question: question.to_string(),
            entities,
            relationships: Vec::new(),
            intent,
            keywords,
            temporal_info: temporal,
            location_info: location,
            semantic_roles: Vec::new(),
            confidence_scores: ConfidenceScores {
                overall_confidence: 0.6,
                entity_recognition: 0.7,
                relationship_extraction: 0.3,
                intent_classification: 0.8,
            },
            analysis_metadata: AnalysisMetadata {
                language: String::from("fr"),
                processing_time: Some(0.1),
                api_version: Some(String::from("fallback")),
                method: Some(String::from("pattern_matching")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_students() {
        let analysis = PatternAnalyzer::new().analyze("Liste tous les étudiants");
        assert!(analysis
            .entities
            .iter()
            .any(|e| e.ontology_class == "edu:Etudiant"));
    }

    #[test]
    fn test_detects_english_terms() {
        let analysis = PatternAnalyzer::new().analyze("how many universities are there?");
        assert!(analysis
            .entities
            .iter()
            .any(|e| e.ontology_class == "edu:Universite"));
        assert_eq!(analysis.intent.primary_intent, "count");
    }

    #[test]
    fn test_intent_later_patterns_win() {
        // "combien" (count) and "qui" (details) both match; the later
        // pattern in the table takes precedence.
        let analysis = PatternAnalyzer::new().analyze("combien et qui ?");
        assert_eq!(analysis.intent.primary_intent, "details");
    }

    #[test]
    fn test_unknown_intent_default() {
        let analysis = PatternAnalyzer::new().analyze("bonjour");
        assert_eq!(analysis.intent.primary_intent, "unknown");
        assert_eq!(analysis.intent.query_type, "general");
    }

    #[test]
    fn test_temporal_and_location() {
        let analysis =
            PatternAnalyzer::new().analyze("Quels examens à venir à Paris cette semaine ?");
        assert_eq!(analysis.temporal_info.relative_time.as_deref(), Some("week"));
        assert!(analysis
            .temporal_info
            .time_expressions
            .contains(&"à venir".to_string()));
        assert_eq!(analysis.location_info.locations, vec!["paris"]);
    }

    #[test]
    fn test_keywords_skip_stopwords_and_short_words() {
        let analysis = PatternAnalyzer::new().analyze("Trouve les projets pour Marie");
        let words: Vec<&str> = analysis.keywords.iter().map(|k| k.text.as_str()).collect();
        assert!(words.contains(&"projets"));
        assert!(words.contains(&"marie"));
        assert!(!words.contains(&"les"));
        assert!(!words.contains(&"pour"));
    }

    #[test]
    fn test_metadata_marks_fallback() {
        let analysis = PatternAnalyzer::new().analyze("liste des cours");
        assert_eq!(
            analysis.analysis_metadata.method.as_deref(),
            Some("pattern_matching")
        );
    }
}
