//! SPARQL JSON results handling
//!
//! Deserialization of the `application/sparql-results+json` format and
//! the flattening applied before rows reach the HTTP layer: binding
//! values are reduced to their local name (the segment after the last
//! `#`, else after the last `/`) so clients see `Cours_INFO101_ab12cd34`
//! instead of full URIs.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One RDF term of a result binding, with its kind preserved.
#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    #[serde(rename = "type")]
    pub kind: TermKind,
    pub value: String,
}

/// Term kinds of the SPARQL JSON results format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TermKind {
    Uri,
    Literal,
    TypedLiteral,
    Bnode,
}

/// Top-level shape of a SELECT response.
#[derive(Debug, Deserialize)]
pub struct SelectResults {
    pub results: BindingSet,
}

#[derive(Debug, Deserialize)]
pub struct BindingSet {
    pub bindings: Vec<BTreeMap<String, Term>>,
}

/// A flattened result row: variable name to display value.
pub type Row = BTreeMap<String, String>;

/// Trim a binding value to its local name.
pub fn local_name(value: &str) -> &str {
    if let Some(idx) = value.rfind('#') {
        &value[idx + 1..]
    } else if let Some(idx) = value.rfind('/') {
        &value[idx + 1..]
    } else {
        value
    }
}

/// Flatten raw bindings into display rows.
pub fn flatten(results: SelectResults) -> Vec<Row> {
    results
        .results
        .bindings
        .into_iter()
        .map(|binding| {
            binding
                .into_iter()
                .map(|(var, term)| {
                    let value = local_name(&term.value).to_string();
                    (var, value)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_hash_wins() {
        assert_eq!(
            local_name("http://www.education-intelligente.org/ontologie#Cours_X_1"),
            "Cours_X_1"
        );
        assert_eq!(local_name("http://example.org/resource/item"), "item");
        assert_eq!(local_name("Jean Dupont"), "Jean Dupont");
    }

    #[test]
    fn test_flatten_rows() {
        let json = r#"{
            "head": {"vars": ["cours", "intitule"]},
            "results": {"bindings": [
                {
                    "cours": {"type": "uri", "value": "http://www.education-intelligente.org/ontologie#Cours_BD_1"},
                    "intitule": {"type": "literal", "value": "Bases de données"}
                }
            ]}
        }"#;
        let parsed: SelectResults = serde_json::from_str(json).unwrap();
        let rows = flatten(parsed);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["cours"], "Cours_BD_1");
        assert_eq!(rows[0]["intitule"], "Bases de données");
    }

    #[test]
    fn test_typed_literal_kind() {
        let json = r#"{
            "results": {"bindings": [
                {"count": {"type": "typed-literal", "value": "42", "datatype": "http://www.w3.org/2001/XMLSchema#integer"}}
            ]}
        }"#;
        let parsed: SelectResults = serde_json::from_str(json).unwrap();
        let rows = flatten(parsed);
        assert_eq!(rows[0]["count"], "42");
    }
}
