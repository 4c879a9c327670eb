//! Natural-language question analysis
//!
//! Types shared by the two analyzers (pattern-based fallback and
//! LLM-backed) plus the structured-context rendering handed to the
//! SPARQL generation prompt.

pub mod analyzer;

use serde::{Deserialize, Serialize};

pub use analyzer::PatternAnalyzer;

/// One entity mention detected in the question, mapped to an ontology class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub confidence: f32,
    #[serde(default)]
    pub start_pos: Option<usize>,
    #[serde(default)]
    pub end_pos: Option<usize>,
    pub ontology_class: String,
}

/// A subject/predicate/object relation between detected entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedRelation {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub confidence: f32,
    #[serde(default)]
    pub relation_type: Option<String>,
}

/// What the user wants from the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub primary_intent: String,
    pub query_type: String,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            primary_intent: String::from("unknown"),
            query_type: String::from("general"),
            action_type: None,
            confidence: 0.0,
        }
    }
}

/// A content keyword extracted from the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub importance: f32,
    pub category: String,
    pub semantic_type: String,
}

/// Temporal hints (future/past/present, expressions found).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalInfo {
    pub time_expressions: Vec<String>,
    #[serde(default)]
    pub relative_time: Option<String>,
    #[serde(default)]
    pub absolute_time: Option<String>,
    #[serde(default)]
    pub time_period: Option<String>,
}

/// Location hints (city names found in the question).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationInfo {
    pub locations: Vec<String>,
    #[serde(default)]
    pub geographical_entities: Vec<String>,
    #[serde(default)]
    pub spatial_relations: Vec<String>,
}

/// Per-stage confidence estimates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub overall_confidence: f32,
    pub entity_recognition: f32,
    pub relationship_extraction: f32,
    pub intent_classification: f32,
}

/// Provenance of an analysis result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub language: String,
    #[serde(default)]
    pub processing_time: Option<f32>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

/// Full structured analysis of one natural-language question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub original_question: String,
    pub entities: Vec<DetectedEntity>,
    pub relationships: Vec<DetectedRelation>,
    pub intent: Intent,
    pub keywords: Vec<Keyword>,
    pub temporal_info: TemporalInfo,
    pub location_info: LocationInfo,
    pub semantic_roles: Vec<serde_json::Value>,
    pub confidence_scores: ConfidenceScores,
    pub analysis_metadata: AnalysisMetadata,
}

impl QuestionAnalysis {
    /// Render the analysis as the structured context block embedded in
    /// the SPARQL generation prompt.
    pub fn structured_context(&self) -> String {
        let mut parts = vec![format!("QUESTION: {}", self.original_question)];

        if !self.entities.is_empty() {
            let entities: Vec<String> = self
                .entities
                .iter()
                .map(|e| format!("- {} ({})", e.text, e.ontology_class))
                .collect();
            parts.push(format!("ENTITIES: {}", entities.join(", ")));
        }

        parts.push(format!(
            "INTENT: {} - {}",
            self.intent.primary_intent, self.intent.query_type
        ));

        if let Some(relative) = &self.temporal_info.relative_time {
            parts.push(format!("TIME: {relative}"));
        }

        if !self.location_info.locations.is_empty() {
            parts.push(format!(
                "LOCATIONS: {}",
                self.location_info.locations.join(", ")
            ));
        }

        if !self.keywords.is_empty() {
            let keywords: Vec<&str> = self
                .keywords
                .iter()
                .take(10)
                .map(|k| k.text.as_str())
                .collect();
            parts.push(format!("KEYWORDS: {}", keywords.join(", ")));
        }

        if !self.relationships.is_empty() {
            let relations: Vec<String> = self
                .relationships
                .iter()
                .map(|r| format!("{} -> {} -> {}", r.subject, r.predicate, r.object))
                .collect();
            parts.push(format!("RELATIONSHIPS: {}", relations.join("; ")));
        }

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_context_sections() {
        let analyzer = PatternAnalyzer::new();
        let analysis = analyzer.analyze("Quels sont les cours disponibles à Paris ?");
        let context = analysis.structured_context();
        assert!(context.starts_with("QUESTION: Quels sont les cours"));
        assert!(context.contains("ENTITIES:"));
        assert!(context.contains("INTENT:"));
        assert!(context.contains("LOCATIONS: paris"));
    }
}
