//! Request body validation for the education domain entities
//!
//! Validators take the raw JSON body and return a field → message map;
//! an empty map means the body is acceptable. Messages are the
//! French strings the frontend displays verbatim.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Field name to error message. Empty means valid.
pub type FieldErrors = BTreeMap<String, String>;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref CODE_RE: Regex = Regex::new(r"^[A-Z0-9]+$").unwrap();
}

/// Fetch a string field, treating non-strings as absent.
pub fn str_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

/// Fetch a field that should hold an integer; numeric strings are
/// accepted the way the original API accepted them.
pub fn int_field(data: &Value, key: &str) -> Option<Result<i64, ()>> {
    match data.get(key)? {
        Value::Number(n) => Some(n.as_i64().ok_or(())),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().parse().map_err(|_| ())),
        Value::Null => None,
        Value::String(_) => None,
        _ => Some(Err(())),
    }
}

/// Fetch a field that should hold a float; numeric strings accepted.
pub fn float_field(data: &Value, key: &str) -> Option<Result<f64, ()>> {
    match data.get(key)? {
        Value::Number(n) => Some(n.as_f64().ok_or(())),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().parse().map_err(|_| ())),
        Value::Null => None,
        Value::String(_) => None,
        _ => Some(Err(())),
    }
}

fn is_blank(data: &Value, key: &str) -> bool {
    match data.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn require(errors: &mut FieldErrors, data: &Value, key: &str, label: &str) {
    if is_blank(data, key) {
        errors.insert(key.to_string(), format!("{label} est requis"));
    }
}

fn check_length(errors: &mut FieldErrors, data: &Value, key: &str, label: &str, max: usize) {
    if let Some(value) = str_field(data, key) {
        if value.chars().count() > max {
            errors.insert(
                key.to_string(),
                format!("{label} ne peut pas dépasser {max} caractères"),
            );
        }
    }
}

fn check_email(errors: &mut FieldErrors, data: &Value, key: &str) {
    if let Some(email) = str_field(data, key) {
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            errors.insert(key.to_string(), "Format d'email invalide".to_string());
        }
    }
}

fn check_code(errors: &mut FieldErrors, data: &Value, key: &str, label: &str) {
    if let Some(code) = str_field(data, key) {
        if !code.is_empty() && !CODE_RE.is_match(code) {
            errors.insert(
                key.to_string(),
                format!("{label} doit contenir uniquement des lettres majuscules et des chiffres"),
            );
        }
    }
}

fn check_int_range(
    errors: &mut FieldErrors,
    data: &Value,
    key: &str,
    label: &str,
    min: Option<i64>,
    max: Option<i64>,
) {
    if let Some(parsed) = int_field(data, key) {
        match parsed {
            Ok(v) => {
                if let Some(lo) = min {
                    if v < lo {
                        errors.insert(
                            key.to_string(),
                            format!("{label} doit être supérieur ou égal à {lo}"),
                        );
                        return;
                    }
                }
                if let Some(hi) = max {
                    if v > hi {
                        errors.insert(
                            key.to_string(),
                            format!("{label} doit être inférieur ou égal à {hi}"),
                        );
                    }
                }
            }
            Err(()) => {
                errors.insert(key.to_string(), format!("{label} doit être un nombre entier"));
            }
        }
    }
}

fn check_float_range(
    errors: &mut FieldErrors,
    data: &Value,
    key: &str,
    label: &str,
    min: f64,
    max: f64,
) {
    if let Some(parsed) = float_field(data, key) {
        match parsed {
            Ok(v) => {
                if v < min {
                    errors.insert(
                        key.to_string(),
                        format!("{label} doit être supérieur ou égal à {min}"),
                    );
                } else if v > max {
                    errors.insert(
                        key.to_string(),
                        format!("{label} doit être inférieur ou égal à {max}"),
                    );
                }
            }
            Err(()) => {
                errors.insert(key.to_string(), format!("{label} doit être un nombre"));
            }
        }
    }
}

fn check_date(errors: &mut FieldErrors, data: &Value, key: &str, label: &str) {
    if let Some(date) = str_field(data, key) {
        if !date.is_empty() && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            errors.insert(
                key.to_string(),
                format!("{label} doit être au format YYYY-MM-DD"),
            );
        }
    }
}

/// Personne: nom/prenom required, email format checked.
pub fn validate_person(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "nom", "Nom");
    require(&mut errors, data, "prenom", "Prénom");
    check_email(&mut errors, data, "email");
    errors
}

/// Cours: intitule + codeCours required, code uppercase-alnum,
/// creditsECTS in 0..=30, volumeHoraire >= 0.
pub fn validate_course(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "intitule", "Intitule");
    require(&mut errors, data, "codeCours", "Code cours");
    if !errors.contains_key("codeCours") {
        check_code(&mut errors, data, "codeCours", "Code cours");
    }
    check_int_range(&mut errors, data, "creditsECTS", "Credits ECTS", Some(0), Some(30));
    check_int_range(&mut errors, data, "volumeHoraire", "Volume horaire", Some(0), None);
    if !errors.contains_key("intitule") {
        check_length(&mut errors, data, "intitule", "Intitule", 200);
    }
    errors
}

/// Competence: nomCompetence required, descriptions bounded.
pub fn validate_competency(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "nomCompetence", "Nom compétence");
    if !errors.contains_key("nomCompetence") {
        check_length(&mut errors, data, "nomCompetence", "Nom compétence", 200);
    }
    check_length(&mut errors, data, "descriptionCompetence", "Description", 1000);
    errors
}

/// ProjetAcademique: titreProjet required, noteProjet in 0..=20.
pub fn validate_project(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "titreProjet", "Titre projet");
    if !errors.contains_key("titreProjet") {
        check_length(&mut errors, data, "titreProjet", "Titre projet", 300);
    }
    check_float_range(&mut errors, data, "noteProjet", "Note projet", 0.0, 20.0);
    errors
}

/// RessourcePedagogique: titreRessource required.
pub fn validate_resource(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "titreRessource", "Titre ressource");
    if !errors.contains_key("titreRessource") {
        check_length(&mut errors, data, "titreRessource", "Titre ressource", 300);
    }
    errors
}

/// TechnologieEducative: nomTechnologie required.
pub fn validate_technology(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "nomTechnologie", "Nom technologie");
    if !errors.contains_key("nomTechnologie") {
        check_length(&mut errors, data, "nomTechnologie", "Nom technologie", 200);
    }
    errors
}

/// Evaluation: typeEvaluation required, dateEvaluation well-formed.
pub fn validate_evaluation(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "typeEvaluation", "Type évaluation");
    check_date(&mut errors, data, "dateEvaluation", "Date évaluation");
    errors
}

/// OrientationAcademique: objectifOrientation required, date checked.
pub fn validate_orientation(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "objectifOrientation", "Objectif orientation");
    if !errors.contains_key("objectifOrientation") {
        check_length(&mut errors, data, "objectifOrientation", "Objectif orientation", 500);
    }
    check_date(&mut errors, data, "dateOrientation", "Date orientation");
    errors
}

/// Specialite: nomSpecialite required.
pub fn validate_specialty(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "nomSpecialite", "Nom spécialité");
    errors
}

/// Universite: nomUniversite required.
pub fn validate_university(data: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, data, "nomUniversite", "Nom université");
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_person_requires_names() {
        let errors = validate_person(&json!({"email": "a@b.fr"}));
        assert_eq!(errors.get("nom").unwrap(), "Nom est requis");
        assert_eq!(errors.get("prenom").unwrap(), "Prénom est requis");
    }

    #[test]
    fn test_person_email_format() {
        let errors =
            validate_person(&json!({"nom": "Dupont", "prenom": "Jean", "email": "pas-un-email"}));
        assert_eq!(errors.get("email").unwrap(), "Format d'email invalide");

        let ok = validate_person(&json!({"nom": "Dupont", "prenom": "Jean", "email": "j@u.fr"}));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_blank_string_counts_as_missing() {
        let errors = validate_university(&json!({"nomUniversite": "   "}));
        assert!(errors.contains_key("nomUniversite"));
    }

    #[test]
    fn test_course_code_format() {
        let errors = validate_course(&json!({"intitule": "BD", "codeCours": "info-101"}));
        assert!(errors.get("codeCours").unwrap().contains("majuscules"));

        let ok = validate_course(&json!({"intitule": "BD", "codeCours": "INFO101"}));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_course_credits_bounds() {
        let errors =
            validate_course(&json!({"intitule": "BD", "codeCours": "BD1", "creditsECTS": 45}));
        assert!(errors.get("creditsECTS").unwrap().contains("inférieur ou égal à 30"));

        let errors =
            validate_course(&json!({"intitule": "BD", "codeCours": "BD1", "creditsECTS": "abc"}));
        assert!(errors.get("creditsECTS").unwrap().contains("nombre entier"));
    }

    #[test]
    fn test_credits_accepts_numeric_string() {
        let ok = validate_course(&json!({"intitule": "BD", "codeCours": "BD1", "creditsECTS": "6"}));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_project_grade_range() {
        let errors = validate_project(&json!({"titreProjet": "P", "noteProjet": 25.0}));
        assert!(errors.contains_key("noteProjet"));

        let ok = validate_project(&json!({"titreProjet": "P", "noteProjet": 15.5}));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_evaluation_date_format() {
        let errors =
            validate_evaluation(&json!({"typeEvaluation": "Examen", "dateEvaluation": "01/06/2024"}));
        assert!(errors.get("dateEvaluation").unwrap().contains("YYYY-MM-DD"));

        let ok =
            validate_evaluation(&json!({"typeEvaluation": "Examen", "dateEvaluation": "2024-06-01"}));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_orientation_objective_length() {
        let long = "x".repeat(501);
        let errors = validate_orientation(&json!({"objectifOrientation": long}));
        assert!(errors.get("objectifOrientation").unwrap().contains("500"));
    }
}
