//! SQLite-backed document store.
//!
//! Documents live in a single table; search is a brute-force
//! term-frequency match over every row, scored in process.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::document_store::{Document, DocumentStore, IndexStatus, ScoredDocument};
use super::StoreError;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StoreError::unavailable)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        Ok(())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, StoreError> {
        let raw_id: String = row.get("id");
        let id = Uuid::parse_str(&raw_id).map_err(StoreError::malformed)?;
        Ok(Document {
            id,
            text: row.get("text"),
        })
    }
}

/// Lowercased alphanumeric terms.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
}

/// Number of query-term occurrences in `text`; each distinct query term counts once.
fn relevance(query_terms: &HashSet<String>, text: &str) -> f32 {
    tokenize(text)
        .filter(|term| query_terms.contains(term))
        .count() as f32
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    async fn index(&self, doc: &Document) -> Result<IndexStatus, StoreError> {
        doc.validate()?;

        // The insert decides the status on its own, so racing creates of one
        // id yield exactly one `Created`. Updating in place keeps the rowid,
        // and with it the tie order in search.
        let inserted = sqlx::query(
            "INSERT INTO documents (id, text) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        )
        .bind(doc.id.to_string())
        .bind(&doc.text)
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        if inserted.rows_affected() == 1 {
            return Ok(IndexStatus::Created);
        }

        sqlx::query("UPDATE documents SET text = ?2 WHERE id = ?1")
            .bind(doc.id.to_string())
            .bind(&doc.text)
            .execute(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        Ok(IndexStatus::Updated)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT id, text FROM documents WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, StoreError> {
        let query_terms: HashSet<String> = tokenize(query).collect();
        if query_terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT id, text FROM documents ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        let mut scored = Vec::new();
        for row in &rows {
            let document = Self::row_to_document(row)?;
            let score = relevance(&query_terms, &document.text);
            if score > 0.0 {
                scored.push(ScoredDocument { document, score });
            }
        }

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteDocumentStore {
        let tmp = std::env::temp_dir().join(format!(
            "answerdesk-store-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteDocumentStore::with_path(tmp).await.unwrap()
    }

    async fn insert(store: &SqliteDocumentStore, text: &str) -> Uuid {
        let doc = Document::new(Uuid::new_v4(), text).unwrap();
        store.index(&doc).await.unwrap();
        doc.id
    }

    #[tokio::test]
    async fn index_get_and_reindex() {
        let store = test_store().await;
        let id = Uuid::new_v4();

        let status = store
            .index(&Document::new(id, "first").unwrap())
            .await
            .unwrap();
        assert_eq!(status, IndexStatus::Created);

        let status = store
            .index(&Document::new(id, "second").unwrap())
            .await
            .unwrap();
        assert_eq!(status, IndexStatus::Updated);

        let doc = store.get(id).await.unwrap().unwrap();
        assert_eq!(doc.text, "second");
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_one_id_report_a_single_creation() {
        let store = std::sync::Arc::new(test_store().await);

        for round in 0..10 {
            let id = Uuid::new_v4();
            let tasks: Vec<_> = (0..4)
                .map(|writer| {
                    let store = store.clone();
                    let doc = Document::new(id, format!("round {} writer {}", round, writer)).unwrap();
                    tokio::spawn(async move { store.index(&doc).await })
                })
                .collect();

            let mut created = 0;
            for task in tasks {
                if task.await.unwrap().unwrap() == IndexStatus::Created {
                    created += 1;
                }
            }
            assert_eq!(created, 1, "round {}", round);
        }
        assert_eq!(store.count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn index_rejects_empty_text() {
        let store = test_store().await;
        let doc = Document {
            id: Uuid::new_v4(),
            text: String::new(),
        };
        assert!(matches!(
            store.index(&doc).await,
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn search_ranks_by_term_frequency() {
        let store = test_store().await;
        let dogs = insert(&store, "dogs are loyal").await;
        let cats = insert(&store, "cats are great").await;
        let many_cats = insert(&store, "Cats, cats and more cats!").await;

        let hits = store.search("cats", 3).await.unwrap();
        let ids: Vec<Uuid> = hits.iter().map(|h| h.document.id).collect();
        assert_eq!(ids, vec![many_cats, cats]);
        assert!(hits[0].score > hits[1].score);

        let hits = store.search("are", 3).await.unwrap();
        let ids: Vec<Uuid> = hits.iter().map(|h| h.document.id).collect();
        assert_eq!(ids, vec![dogs, cats]);
    }

    #[tokio::test]
    async fn search_respects_limit_and_empty_queries() {
        let store = test_store().await;
        for i in 0..5 {
            insert(&store, &format!("sample document {}", i)).await;
        }

        assert_eq!(store.search("sample", 3).await.unwrap().len(), 3);
        assert!(store.search("", 3).await.unwrap().is_empty());
        assert!(store.search("  ?! ", 3).await.unwrap().is_empty());
        assert!(store.search("absent", 3).await.unwrap().is_empty());
    }
}
