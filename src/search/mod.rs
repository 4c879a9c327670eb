//! Semantic search pipeline
//!
//! Orchestrates the three steps of `POST /api/search`: question
//! analysis, SPARQL generation, execution against the store. Every
//! stage has a deterministic fallback so an answer comes back even
//! with no generative API configured; the response records which
//! method produced the query.

pub mod templates;

use serde::Serialize;

use crate::llm::analysis::GeminiAnalyzer;
use crate::llm::transformer::{self, SparqlTransformer};
use crate::llm::GeminiClient;
use crate::nlp::QuestionAnalysis;
use crate::store::results::Row;
use crate::store::SparqlStore;

pub use templates::TemplateEngine;

/// Which stage produced the executed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMethod {
    GeminiTaln,
    TemplateFallback,
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct SearchOutcome {
    pub analysis: QuestionAnalysis,
    pub sparql_query: String,
    pub method: PipelineMethod,
    pub result: Result<Vec<Row>, String>,
}

/// The question → analysis → SPARQL → results pipeline.
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    analyzer: GeminiAnalyzer,
    transformer: SparqlTransformer,
    templates: TemplateEngine,
}

impl SearchPipeline {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            analyzer: GeminiAnalyzer::new(client.clone()),
            transformer: SparqlTransformer::new(client),
            templates: TemplateEngine::new(),
        }
    }

    /// Run the full pipeline for one question.
    pub async fn answer(&self, question: &str, store: &SparqlStore) -> SearchOutcome {
        tracing::info!(question, "processing semantic search");

        let analysis = self.analyzer.analyze(question).await;
        tracing::debug!(
            entities = analysis.entities.len(),
            intent = %analysis.intent.primary_intent,
            "analysis completed"
        );

        let (sparql_query, method) = match self.transformer.from_analysis(&analysis).await {
            Ok(query) => (query, PipelineMethod::GeminiTaln),
            Err(e) => {
                tracing::debug!(error = %e, "generation unavailable, using template engine");
                let query = self
                    .templates
                    .generate(question)
                    .unwrap_or_else(|| transformer::fallback_query(question));
                (query, PipelineMethod::TemplateFallback)
            }
        };

        tracing::debug!(query_len = sparql_query.len(), ?method, "query selected");

        let result = store
            .query(&sparql_query)
            .await
            .map_err(|e| e.to_string());

        match &result {
            Ok(rows) => tracing::info!(results = rows.len(), "search executed"),
            Err(e) => tracing::warn!(error = %e, "search query failed"),
        }

        SearchOutcome {
            analysis,
            sparql_query,
            method,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_method_serializes_snake_case() {
        let json = serde_json::to_string(&PipelineMethod::GeminiTaln).unwrap();
        assert_eq!(json, "\"gemini_taln\"");
        let json = serde_json::to_string(&PipelineMethod::TemplateFallback).unwrap();
        assert_eq!(json, "\"template_fallback\"");
    }
}
