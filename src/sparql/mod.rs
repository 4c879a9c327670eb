//! SPARQL text construction helpers
//!
//! The API builds its queries as text, the same way the store executes
//! them. [`InsertBuilder`] assembles `INSERT DATA` blocks from the
//! optional fields of a request body; [`regex_filters`] renders the
//! case-insensitive search clauses shared by the search endpoints.

use crate::ontology::{escape_literal, ONT, XSD};

/// Accumulates the predicate/object pairs of one new individual and
/// renders a complete `INSERT DATA` update.
///
/// Optional fields map to conditional [`InsertBuilder::literal`]-style
/// calls; relationship triples whose subject is *not* the new individual
/// (reverse links) go through [`InsertBuilder::triple`].
pub struct InsertBuilder {
    subject: String,
    class: String,
    parts: Vec<String>,
    extra_triples: Vec<String>,
    needs_xsd: bool,
}

impl InsertBuilder {
    /// Start a block for `<uri> a ont:<class>`.
    pub fn new(uri: &str, class: &str) -> Self {
        Self {
            subject: uri.to_string(),
            class: class.to_string(),
            parts: Vec::new(),
            extra_triples: Vec::new(),
            needs_xsd: false,
        }
    }

    /// Add a plain string literal predicate. Values are escaped.
    pub fn literal(&mut self, prop: &str, value: &str) -> &mut Self {
        self.parts
            .push(format!("; ont:{prop} \"{}\"", escape_literal(value)));
        self
    }

    /// Add an `xsd:date` typed literal predicate.
    pub fn date(&mut self, prop: &str, value: &str) -> &mut Self {
        self.needs_xsd = true;
        self.parts
            .push(format!("; ont:{prop} \"{}\"^^xsd:date", escape_literal(value)));
        self
    }

    /// Add a bare integer predicate.
    pub fn integer(&mut self, prop: &str, value: i64) -> &mut Self {
        self.parts.push(format!("; ont:{prop} {value}"));
        self
    }

    /// Add a bare decimal predicate.
    pub fn decimal(&mut self, prop: &str, value: f64) -> &mut Self {
        self.parts.push(format!("; ont:{prop} {value}"));
        self
    }

    /// Add an object-property link to another individual.
    pub fn link(&mut self, prop: &str, uri: &str) -> &mut Self {
        self.parts.push(format!("; ont:{prop} <{uri}>"));
        self
    }

    /// Add a standalone triple (for reverse links such as
    /// `<universite> ont:adopteTechnologie <new>`).
    pub fn triple(&mut self, subject: &str, prop: &str, object: &str) -> &mut Self {
        self.extra_triples
            .push(format!("<{subject}> ont:{prop} <{object}> ."));
        self
    }

    /// Render the full `INSERT DATA` update.
    pub fn build(&self) -> String {
        let mut statement = format!("<{}> a ont:{}", self.subject, self.class);
        for part in &self.parts {
            statement.push(' ');
            statement.push_str(part);
        }
        statement.push_str(" .");

        let mut body = format!("        {statement}\n");
        for triple in &self.extra_triples {
            body.push_str(&format!("        {triple}\n"));
        }

        let xsd_prefix = if self.needs_xsd {
            format!("PREFIX xsd: <{XSD}>\n")
        } else {
            String::new()
        };

        format!("PREFIX ont: <{ONT}>\n{xsd_prefix}INSERT DATA {{\n{body}    }}")
    }
}

/// Render the combined `FILTER(REGEX(...) && ...)` clause used by the
/// per-entity search endpoints. Returns `None` when no criterion is set.
pub fn regex_filters(criteria: &[(&str, Option<&str>)]) -> Option<String> {
    let clauses: Vec<String> = criteria
        .iter()
        .filter_map(|(var, needle)| {
            needle.filter(|n| !n.is_empty()).map(|n| {
                format!("REGEX(?{var}, \"{}\", \"i\")", escape_literal(n))
            })
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(format!(" FILTER({})", clauses.join(" && ")))
    }
}

/// `DELETE WHERE` update removing every outgoing triple of an individual.
pub fn delete_all_properties(uri: &str) -> String {
    format!("PREFIX ont: <{ONT}>\nDELETE WHERE {{\n    <{uri}> ?p ?o .\n}}")
}

/// DELETE update that keeps the predicates listed in `preserve`
/// (used by the person update, which must not sever course links).
pub fn delete_properties_except(uri: &str, preserve: &[&str]) -> String {
    if preserve.is_empty() {
        return format!(
            "PREFIX ont: <{ONT}>\nDELETE {{\n    <{uri}> ?p ?o .\n}}\nWHERE {{\n    <{uri}> ?p ?o .\n}}"
        );
    }
    let guard = preserve
        .iter()
        .map(|p| format!("?p != ont:{p}"))
        .collect::<Vec<_>>()
        .join(" && ");
    format!(
        "PREFIX ont: <{ONT}>\nDELETE {{\n    <{uri}> ?p ?o .\n}}\nWHERE {{\n    <{uri}> ?p ?o .\n    FILTER({guard})\n}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_builder_minimal() {
        let query = InsertBuilder::new("http://example.org/C1", "Cours").build();
        assert!(query.contains("INSERT DATA"));
        assert!(query.contains("<http://example.org/C1> a ont:Cours ."));
        assert!(!query.contains("xsd:"));
    }

    #[test]
    fn test_insert_builder_fields() {
        let mut builder = InsertBuilder::new("http://example.org/C1", "Cours");
        builder
            .literal("intitule", "Bases de données")
            .integer("creditsECTS", 6)
            .link("faitPartieDe", "http://example.org/S1");
        let query = builder.build();
        assert!(query.contains("; ont:intitule \"Bases de données\""));
        assert!(query.contains("; ont:creditsECTS 6"));
        assert!(query.contains("; ont:faitPartieDe <http://example.org/S1>"));
    }

    #[test]
    fn test_insert_builder_date_pulls_xsd_prefix() {
        let mut builder = InsertBuilder::new("http://example.org/E1", "Evaluation");
        builder.date("dateEvaluation", "2024-06-01");
        let query = builder.build();
        assert!(query.contains("PREFIX xsd:"));
        assert!(query.contains("\"2024-06-01\"^^xsd:date"));
    }

    #[test]
    fn test_insert_builder_escapes_literals() {
        let mut builder = InsertBuilder::new("http://example.org/P1", "ProjetAcademique");
        builder.literal("titreProjet", "Projet \"Alpha\"");
        assert!(builder.build().contains("\\\"Alpha\\\""));
    }

    #[test]
    fn test_regex_filters_joined() {
        let clause = regex_filters(&[
            ("nom", Some("dupont")),
            ("prenom", None),
            ("role", Some("etudiant")),
        ])
        .unwrap();
        assert!(clause.contains("REGEX(?nom, \"dupont\", \"i\")"));
        assert!(clause.contains(" && "));
        assert!(!clause.contains("?prenom"));
    }

    #[test]
    fn test_regex_filters_empty() {
        assert!(regex_filters(&[("nom", None), ("ville", Some(""))]).is_none());
    }

    #[test]
    fn test_delete_properties_except() {
        let query =
            delete_properties_except("http://example.org/P1", &["suitCours", "enseigne"]);
        assert!(query.contains("?p != ont:suitCours && ?p != ont:enseigne"));
    }
}
