//! SQLite-backed vector store.
//!
//! Vectors are stored as little-endian f32 blobs and scored by brute-force
//! cosine similarity, which is plenty for a corpus of a few thousand chunks.
//! `":memory:"` opens an ephemeral store.

use super::{cosine_similarity, IndexStats, VectorMatch, VectorRecord, VectorStore};
use crate::types::{Metadata, Metric};
use chrono::Utc;
use ragbot_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS indexes (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vectors (
        index_name TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        PRIMARY KEY (index_name, id)
    );
"#;

/// Local vector store in a single SQLite database.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)
        }
        .map_err(|e| AppError::Config(format!("Failed to open SQLite store {:?}: {}", path, e)))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Config(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened SQLite vector store at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Ephemeral store, used by tests and throwaway runs.
    pub fn in_memory() -> AppResult<Self> {
        Self::open(Path::new(":memory:"))
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::fatal_provider("SQLite connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::fatal_provider(format!("SQLite task failed: {}", e)))?
    }
}

fn sql_error(operation: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::retryable(format!("SQLite {} failed: {}", operation, e))
}

fn index_dimension(conn: &Connection, name: &str) -> AppResult<Option<usize>> {
    conn.query_row(
        "SELECT dimension FROM indexes WHERE name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map(|d| d.map(|d| d as usize))
    .map_err(sql_error("index lookup"))
}

fn require_dimension(conn: &Connection, name: &str) -> AppResult<usize> {
    index_dimension(conn, name)?
        .ok_or_else(|| AppError::NotFound(format!("Index '{}' does not exist", name)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Serialization(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[async_trait::async_trait]
impl VectorStore for SqliteStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
        if metric != Metric::Cosine {
            return Err(AppError::Config(format!(
                "SQLite store only supports cosine indexes, not {}",
                metric.as_str()
            )));
        }

        let name = name.to_string();
        self.with_conn(move |conn| {
            if index_dimension(conn, &name)?.is_some() {
                return Err(AppError::fatal_provider(format!(
                    "Index '{}' already exists",
                    name
                )));
            }
            conn.execute(
                "INSERT INTO indexes (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![name, dimension as i64, metric.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(sql_error("create index"))?;

            tracing::info!("Created SQLite index '{}' (dimension={})", name, dimension);
            Ok(())
        })
        .await
    }

    async fn delete_index(&self, name: &str) -> AppResult<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(sql_error("delete index"))?;
            let removed = tx
                .execute("DELETE FROM vectors WHERE index_name = ?1", params![name])
                .map_err(sql_error("delete vectors"))?;
            tx.execute("DELETE FROM indexes WHERE name = ?1", params![name])
                .map_err(sql_error("delete index"))?;
            tx.commit().map_err(sql_error("delete index"))?;

            tracing::info!("Deleted SQLite index '{}' ({} vectors)", name, removed);
            Ok(())
        })
        .await
    }

    async fn describe_index(&self, name: &str) -> AppResult<Option<IndexStats>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT dimension, metric FROM indexes WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
                .map_err(sql_error("describe index"))?;

            let Some((dimension, metric)) = row else {
                return Ok(None);
            };

            let metric = Metric::parse(&metric).ok_or_else(|| {
                AppError::Serialization(format!("Unknown metric '{}' in index '{}'", metric, name))
            })?;

            let vector_count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM vectors WHERE index_name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .map_err(sql_error("count vectors"))?;

            Ok(Some(IndexStats {
                name,
                dimension: dimension as usize,
                metric,
                vector_count: vector_count as u64,
            }))
        })
        .await
    }

    async fn list_indexes(&self) -> AppResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM indexes ORDER BY name")
                .map_err(sql_error("list indexes"))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(sql_error("list indexes"))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(sql_error("list indexes"))?;
            Ok(names)
        })
        .await
    }

    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> AppResult<usize> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &name)?;
            let tx = conn.transaction().map_err(sql_error("upsert"))?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT OR REPLACE INTO vectors (index_name, id, embedding, metadata)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(sql_error("upsert"))?;

                for record in &records {
                    if record.values.len() != dimension {
                        return Err(AppError::DimensionMismatch {
                            expected: dimension,
                            actual: record.values.len(),
                        });
                    }
                    let metadata = serde_json::to_string(&record.metadata)?;
                    stmt.execute(params![
                        name,
                        record.id,
                        embedding_to_bytes(&record.values),
                        metadata
                    ])
                    .map_err(sql_error("upsert"))?;
                }
            }
            tx.commit().map_err(sql_error("upsert"))?;

            tracing::debug!("Upserted {} vectors into '{}'", records.len(), name);
            Ok(records.len())
        })
        .await
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> AppResult<Vec<VectorMatch>> {
        let name = name.to_string();
        let query = vector.to_vec();
        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &name)?;
            if query.len() != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: query.len(),
                });
            }

            let mut stmt = conn
                .prepare("SELECT id, embedding, metadata FROM vectors WHERE index_name = ?1")
                .map_err(sql_error("query"))?;
            let rows = stmt
                .query_map(params![name], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(sql_error("query"))?;

            let mut matches = Vec::new();
            for row in rows {
                let (id, bytes, metadata) = row.map_err(sql_error("query"))?;
                let embedding = bytes_to_embedding(&bytes)?;
                let metadata: Metadata = serde_json::from_str(&metadata)?;
                matches.push(VectorMatch {
                    id,
                    score: cosine_similarity(&query, &embedding),
                    metadata,
                });
            }

            // Sort by score descending
            matches.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            matches.truncate(top_k);

            Ok(matches)
        })
        .await
    }
}
