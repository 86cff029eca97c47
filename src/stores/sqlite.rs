//! SQLite-backed fragment store using `sqlite-vec` for similarity search.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{
    Column, ColumnValue, SqliteVectorIndex, SqliteVectorStore, SqliteVectorStoreTable,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};

use crate::types::PipelineError;

use super::{FragmentRecord, FragmentStore};
use async_trait::async_trait;

/// Row shape of the `fragments` table.
///
/// `fragment_index` and `metadata` are stored as TEXT; the custom
/// deserializers accept both the stored text form and the natural JSON form
/// so documents round-trip through the rig vector index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FragmentDocument {
    pub id: String,
    pub source: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_fragment_index")]
    pub fragment_index: usize,
    pub content: String,
    #[serde(deserialize_with = "deserialize_metadata_field")]
    pub metadata: serde_json::Value,
}

impl SqliteVectorStoreTable for FragmentDocument {
    fn name() -> &'static str {
        "fragments"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("source", "TEXT").indexed(),
            Column::new("title", "TEXT"),
            Column::new("fragment_index", "TEXT"),
            Column::new("metadata", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("source", Box::new(self.source.clone())),
            ("title", Box::new(self.title.clone())),
            ("fragment_index", Box::new(self.fragment_index.to_string())),
            ("metadata", Box::new(self.metadata.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

fn deserialize_fragment_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => usize::try_from(value).map_err(|_| {
            de::Error::custom(format!("fragment_index {value} does not fit in usize"))
        }),
        Repr::Text(text) => text.parse::<usize>().map_err(|err| {
            de::Error::custom(format!("unable to parse fragment_index '{text}': {err}"))
        }),
    }
}

fn deserialize_metadata_field<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if let serde_json::Value::String(raw) = value {
        serde_json::from_str(&raw).map_or(Ok(serde_json::Value::String(raw)), Ok)
    } else {
        Ok(value)
    }
}

/// Fragment store over a local SQLite file with `sqlite-vec` vectors.
#[derive(Clone)]
pub struct SqliteFragmentStore<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, FragmentDocument>,
    /// Separate connection handle for direct queries not covered by
    /// rig-sqlite. Clone of the connection owned by the inner store.
    conn: Connection,
}

impl<E> SqliteFragmentStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the index file and verifies the `sqlite-vec`
    /// extension is live.
    pub async fn open(path: impl AsRef<Path>, model: &E) -> Result<Self, PipelineError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| PipelineError::Storage(err.to_string()))?;
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
        })
    }

    /// Persists fragments paired with their embeddings.
    pub async fn add_fragments(
        &self,
        documents: Vec<(FragmentDocument, Vec<f32>)>,
    ) -> Result<(), PipelineError> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents {
            let converted: Vec<f64> = embedding.into_iter().map(|value| value as f64).collect();
            let embed = Embedding {
                document: doc.content.clone(),
                vec: converted,
            };
            rows.push((doc, OneOrMany::one(embed)));
        }
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        Ok(())
    }

    /// Rig vector index over the stored fragments, used by the retriever.
    pub fn index(&self, model: E) -> SqliteVectorIndex<E, FragmentDocument> {
        self.inner.clone().index(model)
    }

    /// Direct connection for queries not covered by [`FragmentStore`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Registers the `sqlite-vec` extension for every subsequent connection.
/// Process-wide, done once.
fn register_sqlite_vec() -> Result<(), PipelineError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTERED
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != ffi::SQLITE_OK {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            } else {
                Ok(())
            }
        })
        .clone()
        .map_err(PipelineError::Storage)
}

#[async_trait]
impl<E> FragmentStore for SqliteFragmentStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn insert_fragments(&self, fragments: Vec<FragmentRecord>) -> Result<(), PipelineError> {
        if fragments.is_empty() {
            return Ok(());
        }

        let documents_with_embeddings: Vec<(FragmentDocument, Vec<f32>)> = fragments
            .into_iter()
            .filter_map(|record| {
                let embedding = record.embedding.clone()?;
                let doc = FragmentDocument::from(record);
                Some((doc, embedding))
            })
            .collect();

        self.add_fragments(documents_with_embeddings).await
    }

    async fn fragments_by_source(
        &self,
        source: &str,
    ) -> Result<Vec<FragmentRecord>, PipelineError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, source, title, fragment_index, content, metadata \
                         FROM fragments WHERE source = ? \
                         ORDER BY CAST(fragment_index AS INTEGER) ASC",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&source], |row| {
                        Ok(FragmentDocument {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            title: row.get(2)?,
                            fragment_index: row.get::<_, String>(3)?.parse().unwrap_or(0),
                            content: row.get(4)?,
                            metadata: row
                                .get::<_, String>(5)
                                .map(|s| serde_json::from_str(&s).unwrap_or_default())
                                .unwrap_or_default(),
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(FragmentRecord::from(
                        row.map_err(tokio_rusqlite::Error::Rusqlite)?,
                    ));
                }
                Ok(results)
            })
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, PipelineError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let deleted = conn
                    .execute("DELETE FROM fragments WHERE source = ?", [&source])
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(deleted)
            })
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(FragmentRecord, f32)>, PipelineError> {
        // The rig index embeds query *text*; this entry point takes an
        // already-computed vector, so it goes straight to sqlite-vec.
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| PipelineError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT f.id, f.source, f.title, f.fragment_index, f.content, f.metadata, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                         FROM fragments f \
                         JOIN fragments_embeddings e ON e.rowid = f.rowid \
                         ORDER BY distance ASC \
                         LIMIT {}",
                        top_k
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let doc = FragmentDocument {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            title: row.get(2)?,
                            fragment_index: row.get::<_, String>(3)?.parse().unwrap_or(0),
                            content: row.get(4)?,
                            metadata: row
                                .get::<_, String>(5)
                                .map(|s| serde_json::from_str(&s).unwrap_or_default())
                                .unwrap_or_default(),
                        };
                        let distance: f32 = row.get(6)?;
                        Ok((FragmentRecord::from(doc), 1.0 - distance))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM fragments", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))
    }
}
