use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use ragbot_knowledge::corpus;
use ragbot_knowledge::types::{DocumentSummary, Metadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentContent {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "RAG Bot API is running".to_string(),
    })
}

pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let outcome = state.pipeline.query(&req.question, req.top_k).await?;

    Ok(Json(QueryResponse {
        answer: outcome.answer.text,
        sources: outcome.answer.sources,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let retrieval = state.pipeline.search(&req.question, req.top_k).await?;

    let results = retrieval
        .passages
        .into_iter()
        .map(|p| SearchHit {
            content: p.text,
            source: p.source_id,
            metadata: p.metadata,
        })
        .collect();

    Ok(Json(SearchResponse { results }))
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentList>, ApiError> {
    let documents = corpus::list_documents(&state.data_dir)?;
    Ok(Json(DocumentList { documents }))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DocumentContent>, ApiError> {
    let content = corpus::read_document(&state.data_dir, &filename)?;
    Ok(Json(DocumentContent { filename, content }))
}
