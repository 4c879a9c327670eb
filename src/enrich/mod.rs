//! DBpedia Lookup enrichment
//!
//! Client for the DBpedia Lookup keyword-search API, used to attach
//! linked-data references to local entities. The API has answered in
//! several shapes over the years — XML with `Result`/`Label`/`URI`
//! elements, JSON documents with varying key spellings — so parsing is
//! deliberately tolerant and failures degrade to an error payload
//! rather than an HTTP error for the caller.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::DbpediaConfig;

/// Errors from the lookup layer.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Empty search text.
    #[error("Search text is required")]
    EmptyText,

    /// Transport-level failure (the 10s timeout included).
    #[error("DBpedia lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response was neither parseable XML nor JSON.
    #[error("Failed to parse response (not XML or JSON): {0}")]
    Parse(String),

    /// Parsing succeeded but yielded nothing.
    #[error("No results found for '{search_text}'")]
    NoResults { search_text: String },
}

/// One DBpedia reference.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LookupResult {
    pub title: String,
    pub uri: String,
}

/// Successful lookup payload: `{search_text, results, count}`.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub search_text: String,
    pub results: Vec<LookupResult>,
    pub count: usize,
}

/// Client for the DBpedia Lookup keyword search API.
#[derive(Debug, Clone)]
pub struct DbpediaClient {
    client: Client,
    config: DbpediaConfig,
}

impl DbpediaClient {
    pub fn new(config: DbpediaConfig) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Search DBpedia for references matching free text.
    pub async fn search_entities(&self, search_text: &str) -> Result<LookupResponse, EnrichError> {
        let search_text = search_text.trim();
        if search_text.is_empty() {
            return Err(EnrichError::EmptyText);
        }

        tracing::debug!(search_text, "querying DBpedia Lookup");

        let max_hits = self.config.max_hits.to_string();
        let response = self
            .client
            .get(&self.config.lookup_url)
            .query(&[("QueryString", search_text), ("MaxHits", max_hits.as_str())])
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let body = response.text().await?;

        let references = if content_type.contains("xml") || content_type.contains("text") {
            parse_xml(&body)?
        } else {
            parse_json(&body)?
        };

        tracing::debug!(found = references.len(), "DBpedia lookup parsed");

        if references.is_empty() {
            return Err(EnrichError::NoResults {
                search_text: search_text.to_string(),
            });
        }

        let limit = self.config.max_hits as usize;
        let results: Vec<LookupResult> = references.into_iter().take(limit).collect();
        let count = results.len();

        Ok(LookupResponse {
            search_text: search_text.to_string(),
            results,
            count,
        })
    }
}

/// Parse the XML flavour of the Lookup response: `Result` (or `result`)
/// elements with `Label`/`URI` (or lowercase / `resource`) children.
fn parse_xml(body: &str) -> Result<Vec<LookupResult>, EnrichError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut references = Vec::new();
    let mut in_result = false;
    let mut current_field: Option<String> = None;
    let mut label: Option<String> = None;
    let mut uri: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.eq_ignore_ascii_case("result") {
                    in_result = true;
                    label = None;
                    uri = None;
                } else if in_result {
                    current_field = Some(name);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = &current_field {
                    let text = t
                        .unescape()
                        .map_err(|e| EnrichError::Parse(e.to_string()))?
                        .to_string();
                    if field.eq_ignore_ascii_case("label") && label.is_none() {
                        label = Some(text);
                    } else if (field.eq_ignore_ascii_case("uri")
                        || field.eq_ignore_ascii_case("resource"))
                        && uri.is_none()
                    {
                        uri = Some(text);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name.eq_ignore_ascii_case("result") {
                    if let (Some(title), Some(link)) = (label.take(), uri.take()) {
                        if !title.is_empty() && !link.is_empty() {
                            references.push(LookupResult { title, uri: link });
                        }
                    }
                    in_result = false;
                }
                current_field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(EnrichError::Parse(format!("XML parsing error: {e}"))),
            _ => {}
        }
    }

    Ok(references)
}

/// Parse the JSON flavour, accepting the historical key spellings.
fn parse_json(body: &str) -> Result<Vec<LookupResult>, EnrichError> {
    let data: Value =
        serde_json::from_str(body).map_err(|e| EnrichError::Parse(e.to_string()))?;

    let raw_results: Vec<Value> = match &data {
        Value::Object(map) => ["results", "docs", "data"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default(),
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    };

    let mut references = Vec::new();
    for item in raw_results {
        match item {
            Value::Object(obj) => {
                let label = pick_string(&obj, &["label", "Label", "name", "Name"]);
                let mut uri = pick_string(&obj, &["uri", "URI", "@URI"]);

                if uri.is_none() {
                    uri = match obj.get("resource").or_else(|| obj.get("Resource")) {
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(Value::Object(inner)) => {
                            pick_string(inner, &["uri", "URI"])
                        }
                        // The modern API wraps each field in an array.
                        Some(Value::Array(items)) => items
                            .first()
                            .and_then(Value::as_str)
                            .map(String::from),
                        _ => None,
                    };
                }

                if let (Some(title), Some(uri)) = (label, uri) {
                    references.push(LookupResult { title, uri });
                }
            }
            Value::String(uri) => {
                let title = uri.rsplit('/').next().unwrap_or(&uri).replace('_', " ");
                references.push(LookupResult { title, uri });
            }
            _ => {}
        }
    }

    Ok(references)
}

fn pick_string(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(String::from),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xml_classic_shape() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ArrayOfResult>
  <Result>
    <Label>Sorbonne University</Label>
    <URI>http://dbpedia.org/resource/Sorbonne_University</URI>
  </Result>
  <Result>
    <Label>Sorbonne</Label>
    <URI>http://dbpedia.org/resource/Sorbonne</URI>
  </Result>
</ArrayOfResult>"#;
        let results = parse_xml(xml).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Sorbonne University");
        assert!(results[0].uri.ends_with("Sorbonne_University"));
    }

    #[test]
    fn test_parse_xml_lowercase_shape() {
        let xml = r#"<results><result><label>Paris</label><uri>http://dbpedia.org/resource/Paris</uri></result></results>"#;
        let results = parse_xml(xml).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Paris");
    }

    #[test]
    fn test_parse_json_docs_array_fields() {
        let json = r#"{"docs": [{"label": ["Machine learning"], "resource": ["http://dbpedia.org/resource/Machine_learning"]}]}"#;
        let results = parse_json(json).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Machine learning");
        assert_eq!(results[0].uri, "http://dbpedia.org/resource/Machine_learning");
    }

    #[test]
    fn test_parse_json_plain_strings() {
        let json = r#"["http://dbpedia.org/resource/Data_science"]"#;
        let results = parse_json(json).unwrap();
        assert_eq!(results[0].title, "Data science");
    }

    #[test]
    fn test_parse_json_invalid_is_error() {
        assert!(matches!(parse_json("not json"), Err(EnrichError::Parse(_))));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let client = DbpediaClient::new(DbpediaConfig {
            lookup_url: String::from("http://localhost:1/api"),
            timeout_secs: 1,
            max_hits: 10,
        })
        .unwrap();
        let result = client.search_entities("   ").await;
        assert!(matches!(result, Err(EnrichError::EmptyText)));
    }
}
