//! Retrieval and answer composition over a small geography corpus.

use super::doubles::{KeywordEmbedder, RecordingStore, ScriptedLlm};
use crate::chunk::ChunkConfig;
use crate::composer::{AnswerComposer, ComposerSettings, INSUFFICIENT_CONTEXT_ANSWER};
use crate::index_manager::IndexManager;
use crate::ingest::{IngestSettings, Ingestor};
use crate::pipeline::RagPipeline;
use crate::retriever::{Retriever, RetrieverSettings};
use crate::embeddings::providers::MockProvider;
use crate::stack::RagStack;
use crate::types::{Document, Metadata, Metric, RetrievalResult, ScoredPassage};
use crate::vector_store::{SqliteStore, VectorRecord, VectorStore};
use ragbot_core::{AppConfig, AppError, DimensionPolicy};
use ragbot_prompt::GroundingTemplate;
use std::sync::Arc;
use std::time::Duration;

const VOCABULARY: &[&str] = &[
    "paris", "france", "berlin", "germany", "capital", "rome", "italy", "river",
];
const TIMEOUT: Duration = Duration::from_secs(5);

struct Fixture {
    store: Arc<RecordingStore>,
    embedder: Arc<KeywordEmbedder>,
    llm: Arc<ScriptedLlm>,
    pipeline: RagPipeline,
}

fn fixture_with(embedder: KeywordEmbedder, max_top_k: usize, min_score: Option<f32>) -> Fixture {
    let store = Arc::new(RecordingStore::new());
    let embedder = Arc::new(embedder);
    let llm = Arc::new(ScriptedLlm::new("Paris."));

    let index = Arc::new(IndexManager::new(
        store.clone(),
        "geo",
        DimensionPolicy::Recreate,
        TIMEOUT,
    ));
    let retriever = Retriever::new(
        embedder.clone(),
        store.clone(),
        index,
        RetrieverSettings {
            max_top_k,
            min_score,
            timeout: TIMEOUT,
        },
    );
    let composer = AnswerComposer::new(
        llm.clone(),
        GroundingTemplate::builtin().unwrap(),
        ComposerSettings {
            model: "test-model".to_string(),
            max_tokens: 256,
            timeout: TIMEOUT,
        },
    );

    Fixture {
        pipeline: RagPipeline::new(retriever, composer, 5),
        store,
        embedder,
        llm,
    }
}

fn fixture() -> Fixture {
    fixture_with(KeywordEmbedder::new(VOCABULARY), 50, None)
}

async fn ingest(fixture: &Fixture, documents: &[Document]) {
    let index = Arc::new(IndexManager::new(
        fixture.store.clone(),
        "geo",
        DimensionPolicy::Recreate,
        TIMEOUT,
    ));
    let ingestor = Ingestor::new(
        fixture.embedder.clone(),
        fixture.store.clone(),
        index,
        ChunkConfig::new(200, 20).unwrap(),
        IngestSettings {
            batch_size: 2,
            concurrency: 2,
            timeout: TIMEOUT,
        },
    );
    ingestor.ingest(documents).await.unwrap();
}

fn geography() -> Vec<Document> {
    vec![
        Document::new("geo1.md", "Paris is the capital of France."),
        Document::new("geo2.md", "Berlin is the capital of Germany."),
    ]
}

#[tokio::test]
async fn test_answer_grounded_on_best_passage_first() {
    let fixture = fixture();
    ingest(&fixture, &geography()).await;

    let outcome = fixture
        .pipeline
        .query("What is the capital of France?", Some(2))
        .await
        .unwrap();

    let sources: Vec<&str> = outcome
        .passages
        .passages
        .iter()
        .map(|p| p.source_id.as_str())
        .collect();
    assert_eq!(sources, vec!["geo1.md", "geo2.md"]);
    assert_eq!(outcome.answer.sources, vec!["geo1.md", "geo2.md"]);
    assert_eq!(outcome.answer.text, "Paris.");
    assert_eq!(fixture.llm.calls(), 1);

    let request = fixture.llm.last_request().unwrap();
    assert_eq!(request.temperature, Some(0.0));
    assert_eq!(request.max_tokens, Some(256));
    assert_eq!(request.model, "test-model");

    let prompt = fixture.llm.last_prompt();
    let first = prompt.find("Paris is the capital").unwrap();
    let second = prompt.find("Berlin is the capital").unwrap();
    let question = prompt.find("What is the capital of France?").unwrap();
    assert!(first < second);
    assert!(second < question);
}

#[tokio::test]
async fn test_search_ranks_descending_within_top_k() {
    let fixture = fixture();
    let documents = vec![
        Document::new("a.md", "Rome is the capital of Italy."),
        Document::new("b.md", "The river Seine runs through Paris, France."),
        Document::new("c.md", "Paris is the capital of France."),
        Document::new("d.md", "Berlin sits on a river in Germany."),
        Document::new("e.md", "France and Italy share a border."),
    ];
    ingest(&fixture, &documents).await;

    let result = fixture.pipeline.search("capital of France", Some(3)).await.unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result.passages[0].source_id, "c.md");
    assert!(result
        .passages
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(result.passages[0].sequence_index, Some(0));
    assert_eq!(fixture.llm.calls(), 0);
}

#[tokio::test]
async fn test_top_k_is_clamped() {
    let fixture = fixture_with(KeywordEmbedder::new(VOCABULARY), 2, None);
    let documents: Vec<Document> = (0..5)
        .map(|i| Document::new(format!("doc{}.md", i), "Paris, France."))
        .collect();
    ingest(&fixture, &documents).await;

    let result = fixture.pipeline.search("Paris", Some(10)).await.unwrap();
    assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn test_min_score_filters_weak_matches() {
    let fixture = fixture_with(KeywordEmbedder::new(VOCABULARY), 50, Some(0.6));
    ingest(&fixture, &geography()).await;

    let result = fixture
        .pipeline
        .search("What is the capital of France?", Some(5))
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.passages[0].source_id, "geo1.md");
}

#[tokio::test]
async fn test_empty_index_gives_insufficient_context_without_llm() {
    let fixture = fixture();

    let outcome = fixture
        .pipeline
        .query("What is the capital of France?", None)
        .await
        .unwrap();

    assert!(outcome.passages.is_empty());
    assert_eq!(outcome.answer.text, INSUFFICIENT_CONTEXT_ANSWER);
    assert!(outcome.answer.sources.is_empty());
    assert_eq!(fixture.llm.calls(), 0);
    assert_eq!(RecordingStore::count(&fixture.store.creates), 0);
    assert_eq!(RecordingStore::count(&fixture.embedder.calls), 0);
}

#[tokio::test]
async fn test_stale_index_fails_query_without_repair() {
    let fixture = fixture();
    fixture
        .store
        .create_index("geo", 768, Metric::Cosine)
        .await
        .unwrap();
    let records = (0..10)
        .map(|i| VectorRecord {
            id: format!("v{}", i),
            values: vec![0.1; 768],
            metadata: Metadata::new(),
        })
        .collect();
    fixture.store.upsert("geo", records).await.unwrap();

    let err = fixture
        .pipeline
        .search("What is the capital of France?", Some(3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::DimensionMismatch { expected, actual: 768 } if expected == VOCABULARY.len() + 1
    ));
    assert_eq!(RecordingStore::count(&fixture.store.deletes), 0);
    assert_eq!(RecordingStore::count(&fixture.store.creates), 1);
    assert_eq!(RecordingStore::count(&fixture.store.queries), 0);

    let stats = fixture.store.describe_index("geo").await.unwrap().unwrap();
    assert_eq!(stats.dimension, 768);
    assert_eq!(stats.vector_count, 10);
}

#[tokio::test]
async fn test_invalid_requests_make_no_external_calls() {
    let fixture = fixture();

    let err = fixture.pipeline.query("   ", None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = fixture.pipeline.query("Paris?", Some(0)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(RecordingStore::count(&fixture.embedder.calls), 0);
    assert_eq!(RecordingStore::count(&fixture.store.describes), 0);
    assert_eq!(RecordingStore::count(&fixture.store.queries), 0);
    assert_eq!(fixture.llm.calls(), 0);
}

#[tokio::test]
async fn test_wrong_length_question_vector_is_rejected() {
    let fixture = fixture_with(KeywordEmbedder::truncating(VOCABULARY), 50, None);
    let dimension = VOCABULARY.len() + 1;
    fixture
        .store
        .create_index("geo", dimension, Metric::Cosine)
        .await
        .unwrap();

    let err = fixture.pipeline.search("Paris", None).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::DimensionMismatch { expected, actual }
            if expected == dimension && actual == dimension - 1
    ));
    assert_eq!(RecordingStore::count(&fixture.store.queries), 0);
}

#[tokio::test]
async fn test_sources_deduplicated_in_ranking_order() {
    let llm = Arc::new(ScriptedLlm::new("answer"));
    let composer = AnswerComposer::new(
        llm.clone(),
        GroundingTemplate::builtin().unwrap(),
        ComposerSettings {
            model: "test-model".to_string(),
            max_tokens: 64,
            timeout: TIMEOUT,
        },
    );

    let passage = |source: &str, text: &str, score: f32| ScoredPassage {
        text: text.to_string(),
        source_id: source.to_string(),
        score,
        sequence_index: None,
        metadata: Metadata::new(),
    };
    let retrieval = RetrievalResult {
        passages: vec![
            passage("A", "first", 0.9),
            passage("B", "second", 0.8),
            passage("A", "third", 0.7),
            passage("C", "fourth", 0.6),
        ],
    };

    let answer = composer.compose("question?", &retrieval).await.unwrap();

    assert_eq!(answer.sources, vec!["A", "B", "C"]);
    assert_eq!(answer.text, "answer");
    assert_eq!(llm.calls(), 1);
    assert!(llm.last_prompt().contains("first\n\nsecond\n\nthird\n\nfourth"));
}

#[tokio::test]
async fn test_capital_of_france_end_to_end() {
    let config = AppConfig::default();
    let stack = RagStack::new(
        Arc::new(MockProvider::new(384)),
        Arc::new(SqliteStore::in_memory().unwrap()),
        &config,
    );
    let documents = vec![
        Document::new("geo1", "Paris is the capital of France."),
        Document::new("geo2", "The Eiffel Tower is in Paris."),
    ];
    stack.ingestor(&config).unwrap().ingest(&documents).await.unwrap();

    let llm = Arc::new(ScriptedLlm::new("Paris is the capital of France."));
    let pipeline = stack.pipeline(&config, llm.clone(), GroundingTemplate::builtin().unwrap());

    let outcome = pipeline
        .query("What is the capital of France?", Some(2))
        .await
        .unwrap();

    let texts: Vec<&str> = outcome
        .passages
        .passages
        .iter()
        .map(|p| p.text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["Paris is the capital of France.", "The Eiffel Tower is in Paris."]
    );
    assert_eq!(outcome.answer.sources, vec!["geo1", "geo2"]);
    assert_eq!(outcome.answer.text, "Paris is the capital of France.");
    assert_eq!(llm.calls(), 1);

    let request = llm.last_request().unwrap();
    assert_eq!(request.temperature, Some(0.0));
    assert_eq!(request.max_tokens, Some(config.llm.max_tokens));
}
