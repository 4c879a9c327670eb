//! Semantic search endpoints
//!
//! `POST /api/search` runs the analysis → generation → execution
//! pipeline; `POST /api/dbpedia/search` is a direct passthrough to the
//! DBpedia Lookup client.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::search::PipelineMethod;

use super::error::{ApiError, ApiResult};
use super::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(semantic_search))
        .route("/dbpedia/search", post(dbpedia_search))
}

/// Natural-language search over the ontology.
async fn semantic_search(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    let question = body
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if question.is_empty() {
        return Err(ApiError::bad_request("Question vide"));
    }

    let outcome = state.pipeline.answer(question, &state.store).await;

    let method = match outcome.method {
        PipelineMethod::GeminiTaln => "gemini_taln",
        PipelineMethod::TemplateFallback => "template_fallback",
    };

    let response = match outcome.result {
        Ok(results) => {
            let count = results.len();
            Json(json!({
                "results": results,
                "taln_analysis": outcome.analysis,
                "sparql_query": outcome.sparql_query,
                "pipeline_info": {
                    "method": method,
                    "status": "success",
                    "results_count": count,
                }
            }))
            .into_response()
        }
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("Erreur lors de l'exécution de la requête SPARQL: {error}"),
                "taln_analysis": outcome.analysis,
                "sparql_query": outcome.sparql_query,
                "pipeline_info": {
                    "method": method,
                    "status": "sparql_error",
                }
            })),
        )
            .into_response(),
    };

    Ok(response)
}

/// DBpedia reference search: `{text}` → `{search_text, results, count}`.
async fn dbpedia_search(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ApiError::bad_request("Search text is required"));
    }

    tracing::info!(text, "DBpedia search");

    match state.dbpedia.search_entities(text).await {
        Ok(response) => Ok(Json(serde_json::to_value(response).unwrap_or_default())),
        // Lookup failures are a degraded payload, not an HTTP error.
        Err(e) => Ok(Json(json!({ "search_text": text, "error": e.to_string() }))),
    }
}
