//! Education ontology vocabulary
//!
//! Central place for the ontology namespace, the class hierarchies the
//! API exposes, and the URI conventions used when minting or resolving
//! individuals. Every SPARQL template in the crate builds on these
//! helpers so the namespace is written down exactly once.

use uuid::Uuid;

/// Base namespace of the education ontology.
pub const ONT: &str = "http://www.education-intelligente.org/ontologie#";

/// XSD namespace, used for typed literals in updates.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// rdf: namespace.
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// rdfs: namespace.
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";

/// `PREFIX` header shared by most queries.
pub fn prefix_ont() -> String {
    format!("PREFIX ont: <{ONT}>")
}

/// Full prefix block for queries that also walk the class hierarchy.
pub fn prefix_block() -> String {
    format!("PREFIX ont: <{ONT}>\nPREFIX rdf: <{RDF}>\nPREFIX rdfs: <{RDFS}>")
}

/// Person class and its subclasses, as exposed by the list endpoints.
pub const PERSON_CLASSES: &[&str] = &[
    "Personne",
    "Etudiant",
    "Enseignant",
    "Professeur",
    "Assistant",
    "Encadrant",
    "EtudiantLicence",
    "EtudiantMaster",
    "EtudiantDoctorat",
];

/// University class and its subclasses.
pub const UNIVERSITY_CLASSES: &[&str] =
    &["Universite", "UniversitePublique", "UniversitePrivee"];

/// Specialty class and its subclasses.
pub const SPECIALTY_CLASSES: &[&str] = &[
    "Specialite",
    "SpecialiteInformatique",
    "SpecialiteDataScience",
    "SpecialiteIngenierie",
    "SpecialiteSciences",
    "SpecialiteMedecine",
    "SpecialiteEconomie",
    "SpecialiteDroit",
    "SpecialiteLettres",
];

/// Builds a `FILTER(?var IN (ont:A, ont:B, ...))` clause over local class names.
pub fn class_filter(var: &str, classes: &[&str]) -> String {
    let list = classes
        .iter()
        .map(|c| format!("ont:{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("FILTER(?{var} IN ({list}))")
}

/// Escape a string for use inside a double-quoted SPARQL literal.
///
/// Backslashes and quotes are escaped, newlines collapsed to spaces so an
/// `INSERT DATA` block stays on one logical line.
pub fn escape_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', " ")
        .replace('\r', " ")
}

/// Sanitize a display name into a URI fragment: uppercase, spaces to
/// underscores, apostrophes removed, truncated to `max_len` characters.
pub fn sanitize_fragment(name: &str, max_len: usize) -> String {
    let cleaned: String = name
        .to_uppercase()
        .replace(' ', "_")
        .replace('\'', "")
        .replace('\u{2019}', "");
    cleaned.chars().take(max_len).collect()
}

/// Mint a fresh individual URI: `ont:<Kind>_<FRAGMENT>_<8 hex chars>`.
pub fn mint_uri(kind: &str, fragment: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{ONT}{kind}_{fragment}_{}", &suffix[..8])
}

/// Resolve an identifier from a URL path into a full ontology URI.
///
/// Full http(s) URIs pass through untouched; bare fragments get the
/// ontology namespace prepended.
pub fn normalize_uri(id: &str) -> String {
    if id.starts_with("http://") || id.starts_with("https://") || id.starts_with(ONT) {
        id.to_string()
    } else {
        format!("{ONT}{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_filter() {
        let clause = class_filter("type", UNIVERSITY_CLASSES);
        assert!(clause.starts_with("FILTER(?type IN (ont:Universite"));
        assert!(clause.contains("ont:UniversitePrivee"));
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(r#"dit "bonjour""#), r#"dit \"bonjour\""#);
        assert_eq!(escape_literal("a\\b"), "a\\\\b");
        assert_eq!(escape_literal("ligne1\nligne2"), "ligne1 ligne2");
    }

    #[test]
    fn test_sanitize_fragment() {
        assert_eq!(sanitize_fragment("Pierre d'Alembert", 50), "PIERRE_DALEMBERT");
        assert_eq!(sanitize_fragment("abcdef", 3), "ABC");
    }

    #[test]
    fn test_mint_uri_shape() {
        let uri = mint_uri("Cours", "INFO101");
        assert!(uri.starts_with(&format!("{ONT}Cours_INFO101_")));
        let suffix = uri.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(
            normalize_uri("Universite_PARIS_abc12345"),
            format!("{ONT}Universite_PARIS_abc12345")
        );
        assert_eq!(normalize_uri("http://example.org/x"), "http://example.org/x");
        let full = format!("{ONT}Cours_X_12345678");
        assert_eq!(normalize_uri(&full), full);
    }
}
