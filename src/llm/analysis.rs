//! LLM-backed question analysis
//!
//! When a Gemini key is configured, question analysis is delegated to
//! the model: one prompt asks for a strict JSON object with entities,
//! intent, temporal/location hints and keywords. Any failure — HTTP,
//! refusal, unparseable JSON — silently falls back to the pattern
//! analyzer so the search endpoint never depends on the external API.

use serde::Deserialize;

use crate::nlp::{
    AnalysisMetadata, ConfidenceScores, DetectedEntity, DetectedRelation, Intent, Keyword,
    LocationInfo, PatternAnalyzer, QuestionAnalysis, TemporalInfo,
};

use super::{extract_json_block, GeminiClient, GenerationOptions, LlmError};

/// Analyzer that prefers the LLM and falls back to keyword patterns.
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    client: GeminiClient,
    fallback: PatternAnalyzer,
}

/// Relaxed shape of the JSON the model is asked to produce.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    intent: Option<RawIntent>,
    #[serde(default)]
    temporal_info: Option<RawTemporal>,
    #[serde(default)]
    location_info: Option<RawLocation>,
    #[serde(default)]
    keywords: Vec<RawKeyword>,
    #[serde(default)]
    relationships: Vec<RawRelation>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    ontology_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    primary_intent: Option<String>,
    #[serde(default)]
    query_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTemporal {
    #[serde(default)]
    relative_time: Option<String>,
    #[serde(default)]
    time_expressions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(default)]
    locations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyword {
    #[serde(default)]
    text: String,
    #[serde(default)]
    importance: Option<f32>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    semantic_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    predicate: String,
    #[serde(default)]
    object: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    relation_type: Option<String>,
}

impl GeminiAnalyzer {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            fallback: PatternAnalyzer::new(),
        }
    }

    /// Analyze a question, preferring the model when configured.
    pub async fn analyze(&self, question: &str) -> QuestionAnalysis {
        if !self.client.is_configured() {
            tracing::debug!("Gemini not configured, using pattern analysis");
            return self.fallback.analyze(question);
        }

        match self.analyze_with_model(question).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "Gemini analysis failed, falling back to patterns");
                self.fallback.analyze(question)
            }
        }
    }

    async fn analyze_with_model(&self, question: &str) -> Result<QuestionAnalysis, LlmError> {
        let prompt = build_analysis_prompt(question);
        let options = GenerationOptions {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1500,
        };
        let response = self.client.generate(&prompt, options).await?;

        let json = extract_json_block(&response);
        let raw: RawAnalysis = serde_json::from_str(&json)?;
        tracing::debug!(entities = raw.entities.len(), "Gemini analysis parsed");

        Ok(assemble(question, raw))
    }
}

fn assemble(question: &str, raw: RawAnalysis) -> QuestionAnalysis {
    let entities = raw
        .entities
        .into_iter()
        .map(|e| DetectedEntity {
            text: e.text,
            kind: e.kind.unwrap_or_else(|| String::from("unknown")),
            category: e.category.unwrap_or_else(|| String::from("domain_entity")),
            confidence: e.confidence.unwrap_or(0.8),
            start_pos: None,
            end_pos: None,
            ontology_class: e.ontology_class.unwrap_or_else(|| String::from("unknown")),
        })
        .collect();

    let intent = raw
        .intent
        .map(|i| Intent {
            primary_intent: i.primary_intent.unwrap_or_else(|| String::from("unknown")),
            query_type: i.query_type.unwrap_or_else(|| String::from("general")),
            action_type: None,
            confidence: 0.8,
        })
        .unwrap_or_default();

    let temporal_info = raw
        .temporal_info
        .map(|t| TemporalInfo {
            time_expressions: t.time_expressions,
            relative_time: t.relative_time.filter(|r| r != "null"),
            absolute_time: None,
            time_period: None,
        })
        .unwrap_or_default();

    let location_info = raw
        .location_info
        .map(|l| LocationInfo {
            locations: l.locations,
            geographical_entities: Vec::new(),
            spatial_relations: Vec::new(),
        })
        .unwrap_or_default();

    let keywords = raw
        .keywords
        .into_iter()
        .map(|k| Keyword {
            text: k.text,
            importance: k.importance.unwrap_or(0.7),
            category: k.category.unwrap_or_else(|| String::from("general")),
            semantic_type: k.semantic_type.unwrap_or_else(|| String::from("keyword")),
        })
        .collect();

    let relationships = raw
        .relationships
        .into_iter()
        .map(|r| DetectedRelation {
            subject: r.subject,
            predicate: r.predicate,
            object: r.object,
            confidence: r.confidence.unwrap_or(0.7),
            relation_type: r.relation_type,
        })
        .collect();

    QuestionAnalysis {
        original_question: question.to_string(),
        entities,
        relationships,
        intent,
        keywords,
        temporal_info,
        location_info,
        semantic_roles: Vec::new(),
        confidence_scores: ConfidenceScores {
            overall_confidence: 0.85,
            entity_recognition: 0.9,
            relationship_extraction: 0.7,
            intent_classification: 0.85,
        },
        analysis_metadata: AnalysisMetadata {
            language: String::from("fr"),
            processing_time: Some(0.5),
            api_version: Some(String::from("gemini_nlp")),
            method: Some(String::from("gemini_analysis")),
        },
    }
}

fn build_analysis_prompt(question: &str) -> String {
    format!(
        r#"You are an expert NLP analyst for an educational platform. Analyze the following French question and extract structured information in JSON format.

Analyze the question and extract:
1. Entities (people, universities, specializations, courses, competencies, projects, resources, technologies, evaluations, orientations)
2. Intent (what the user wants: list, count, filter, search, details)
3. Temporal information (future, past, present, specific dates)
4. Location information (cities, places mentioned)
5. Keywords and important terms
6. Relationships between entities

Return ONLY a valid JSON object with this exact structure:
{{
  "entities": [
    {{
      "text": "entity text from question",
      "type": "Personne|Etudiant|Enseignant|Universite|Specialite|Cours|Competence|ProjetAcademique|RessourcePedagogique|TechnologieEducative|Evaluation|OrientationAcademique",
      "category": "domain_entity",
      "confidence": 0.9,
      "ontology_class": "edu:Personne|edu:Etudiant|edu:Enseignant|edu:Universite|edu:Specialite|edu:Cours|edu:Competence|edu:ProjetAcademique|edu:RessourcePedagogique|edu:TechnologieEducative|edu:Evaluation|edu:OrientationAcademique"
    }}
  ],
  "intent": {{
    "primary_intent": "list|count|filter|search|details",
    "query_type": "list|count|filter|search|details"
  }},
  "temporal_info": {{
    "relative_time": "future|past|present|null",
    "time_expressions": ["à venir", "futur"]
  }},
  "location_info": {{
    "locations": ["paris", "tunis"]
  }},
  "keywords": [
    {{
      "text": "keyword",
      "importance": 0.8,
      "category": "content_word"
    }}
  ],
  "relationships": []
}}

ONTOLOGY CONTEXT (Education Domain):
- edu:Personne, edu:Etudiant, edu:Enseignant, edu:Professeur, edu:Assistant, edu:Encadrant
- edu:EtudiantLicence, edu:EtudiantMaster, edu:EtudiantDoctorat
- edu:Universite, edu:UniversitePublique, edu:UniversitePrivee
- edu:Specialite, edu:SpecialiteInformatique, edu:SpecialiteDataScience, edu:SpecialiteIngenierie
- edu:Cours, edu:CoursTheorique, edu:CoursPratique
- edu:Competence
- edu:ProjetAcademique
- edu:RessourcePedagogique
- edu:TechnologieEducative
- edu:Evaluation
- edu:OrientationAcademique, edu:EntretienConseiller

QUESTION: "{question}"

Return ONLY the JSON object, no explanations:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_fills_defaults() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{"entities": [{"text": "étudiants", "type": "Etudiant", "ontology_class": "edu:Etudiant"}]}"#,
        )
        .unwrap();
        let analysis = assemble("Liste les étudiants", raw);
        assert_eq!(analysis.entities.len(), 1);
        assert_eq!(analysis.entities[0].confidence, 0.8);
        assert_eq!(analysis.intent.primary_intent, "unknown");
        assert_eq!(
            analysis.analysis_metadata.method.as_deref(),
            Some("gemini_analysis")
        );
    }

    #[test]
    fn test_assemble_filters_null_relative_time() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{"temporal_info": {"relative_time": "null", "time_expressions": []}}"#,
        )
        .unwrap();
        let analysis = assemble("q", raw);
        assert!(analysis.temporal_info.relative_time.is_none());
    }

    #[test]
    fn test_prompt_embeds_question() {
        let prompt = build_analysis_prompt("Combien d'universités ?");
        assert!(prompt.contains("QUESTION: \"Combien d'universités ?\""));
        assert!(prompt.contains("edu:Universite"));
    }
}
