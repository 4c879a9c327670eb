//! Per-entity route trees
//!
//! One module per ontology entity, each exposing `routes()` with the
//! list/get/create/update/delete/search handlers plus entity-specific
//! extras (facets, relation listings, DBpedia enrichment). The SPARQL
//! templates live next to the handlers that send them.

pub mod competencies;
pub mod courses;
pub mod evaluations;
pub mod orientations;
pub mod persons;
pub mod projects;
pub mod resources;
pub mod specialties;
pub mod technologies;
pub mod universities;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::results::Row;

use super::server::AppState;

/// `?term=` query parameter of the enrichment endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TermQuery {
    pub term: Option<String>,
}

/// Shared DBpedia enrichment payload: the local entity data, the search
/// term used, and either the best reference (with up to five
/// alternatives) or the lookup error. Lookup failures never fail the
/// request.
pub async fn dbpedia_enrichment(
    state: &AppState,
    entity_key: &str,
    entity_data: Row,
    search_term: String,
) -> Value {
    let mut payload = serde_json::Map::new();
    payload.insert(
        entity_key.to_string(),
        serde_json::to_value(entity_data).unwrap_or_default(),
    );
    payload.insert("search_term".to_string(), json!(search_term));
    payload.insert("dbpedia_enrichment".to_string(), Value::Null);

    if search_term.is_empty() {
        return Value::Object(payload);
    }

    let enrichment = match state.dbpedia.search_entities(&search_term).await {
        Ok(response) => {
            let all: Vec<&crate::enrich::LookupResult> =
                response.results.iter().take(5).collect();
            match response.results.first() {
                Some(first) => json!({
                    "title": first.title,
                    "uri": first.uri,
                    "all_results": all,
                }),
                None => json!({ "search_text": response.search_text, "error": "No results" }),
            }
        }
        Err(e) => json!({ "search_text": search_term, "error": e.to_string() }),
    };

    payload.insert("dbpedia_enrichment".to_string(), enrichment);
    Value::Object(payload)
}

/// First non-empty value among the given row fields, used to pick a
/// lookup term from entity data.
pub fn first_field(row: &Row, fields: &[&str]) -> String {
    fields
        .iter()
        .filter_map(|f| row.get(*f))
        .find(|v| !v.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_field_order() {
        let mut row = Row::new();
        row.insert("intitule".into(), "Bases de données".into());
        row.insert("codeCours".into(), "BD101".into());
        assert_eq!(first_field(&row, &["intitule", "codeCours"]), "Bases de données");
        assert_eq!(first_field(&row, &["absent", "codeCours"]), "BD101");
        assert_eq!(first_field(&row, &["absent"]), "");
    }
}
