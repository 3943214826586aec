use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use souschef_catalog::RecipeCatalog;
use tokio::task;

use crate::embedding::EmbeddingProvider;
use crate::{RetrievalHit, SemanticRetriever};

/// Initialize sqlite-vec extension. Must be called before Connection::open().
fn init_sqlite_vec() {
    use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};

    type Sqlite3AutoExtFn =
        unsafe extern "C" fn(*mut sqlite3, *mut *mut i8, *const sqlite3_api_routines) -> i32;

    unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), Sqlite3AutoExtFn>(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS recipe_docs (
            recipe_id INTEGER PRIMARY KEY,
            doc TEXT NOT NULL,
            embedding TEXT NOT NULL,
            model TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Local vector index over the recipe catalog, one document per recipe.
/// Implements the semantic-retriever contract; rebuilds are explicit
/// (`index_catalog`), lookups are read-only.
#[derive(Clone)]
pub struct RecipeVectorIndex {
    db: Arc<Mutex<Connection>>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl RecipeVectorIndex {
    pub fn open(path: &str, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        init_sqlite_vec();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            provider,
        })
    }

    pub fn open_in_memory(provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            provider,
        })
    }

    fn ensure_vec_table(&self, dimensions: usize) -> Result<()> {
        let conn = self
            .db
            .lock()
            .map_err(|_| anyhow!("failed to lock sqlite connection"))?;

        let current: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'vec_dimensions'",
                [],
                |r| r.get(0),
            )
            .optional()?;

        let recreate = match current {
            Some(d) => d.parse::<usize>().unwrap_or(0) != dimensions,
            None => true,
        };

        if recreate {
            conn.execute_batch("DROP TABLE IF EXISTS recipes_vec;")?;
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE recipes_vec USING vec0(recipe_id TEXT PRIMARY KEY, embedding float[{dimensions}]);"
            ))?;
            conn.execute(
                "INSERT INTO meta(key, value) VALUES('vec_dimensions', ?1) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![dimensions.to_string()],
            )?;
            tracing::info!("created recipes_vec virtual table with {dimensions} dimensions");
        }

        Ok(())
    }

    /// True when the index was built with a different embedding model or
    /// does not cover the whole catalog.
    pub fn needs_reindex(&self, catalog: &RecipeCatalog) -> Result<bool> {
        let conn = self
            .db
            .lock()
            .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
        let model: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'embedding_model'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        if model.as_deref() != Some(self.provider.model_id()) {
            return Ok(true);
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipe_docs", [], |r| r.get(0))?;
        Ok(count as usize != catalog.len())
    }

    /// Embed every catalog recipe and replace the stored index.
    pub async fn index_catalog(&self, catalog: &RecipeCatalog) -> Result<usize> {
        self.ensure_vec_table(self.provider.dimensions())?;

        let docs: Vec<(u32, String)> = catalog
            .iter()
            .map(|r| (r.id, RecipeCatalog::document_text(r)))
            .collect();
        if docs.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = docs.iter().map(|(_, doc)| doc.clone()).collect();
        let embedded = self.provider.embed(&texts).await?;
        if embedded.vectors.len() != docs.len() {
            return Err(anyhow!(
                "embedding count mismatch: expected {}, got {}",
                docs.len(),
                embedded.vectors.len()
            ));
        }

        let model = embedded.model.clone();
        let rows: Vec<(u32, String, String)> = docs
            .into_iter()
            .zip(embedded.vectors.iter())
            .map(|((id, doc), vector)| (id, doc, vector_to_json(vector)))
            .collect();

        let db = Arc::clone(&self.db);
        let model_for_write = model.clone();
        let indexed = task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let tx = conn.unchecked_transaction()?;

            tx.execute("DELETE FROM recipes_vec", [])?;
            tx.execute("DELETE FROM recipe_docs", [])?;

            let count = rows.len();
            for (id, doc, embedding) in rows {
                tx.execute(
                    "INSERT INTO recipe_docs(recipe_id, doc, embedding, model) VALUES (?1, ?2, ?3, ?4)",
                    params![id, doc, embedding, model_for_write],
                )?;
                tx.execute(
                    "INSERT INTO recipes_vec(recipe_id, embedding) VALUES (?1, ?2)",
                    params![id.to_string(), embedding],
                )?;
            }

            tx.execute(
                "INSERT INTO meta(key, value) VALUES('embedding_model', ?1) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![model_for_write],
            )?;
            tx.commit()?;
            Ok::<usize, anyhow::Error>(count)
        })
        .await??;

        tracing::info!(recipes = indexed, model = %model, "recipe vector index rebuilt");
        Ok(indexed)
    }
}

#[async_trait]
impl SemanticRetriever for RecipeVectorIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let embedded = self.provider.embed(&[query.to_owned()]).await?;
        let query_vector = embedded
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedding provider returned empty query embedding"))?;
        let query_json = vector_to_json(&query_vector);

        let db = Arc::clone(&self.db);
        let hits = task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;

            let has_vec_table: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='recipes_vec'",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or(false);

            if has_vec_table {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT recipe_id, distance
                    FROM recipes_vec
                    WHERE embedding MATCH ?1 AND k = ?2
                    "#,
                )?;
                let rows = stmt.query_map(params![query_json, k as i64], |r| {
                    Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
                })?;

                let mut out = Vec::new();
                for row in rows {
                    let (id_text, distance) = row?;
                    let recipe_id = id_text
                        .parse::<u32>()
                        .map_err(|_| anyhow!("non-numeric recipe id in vector index: {id_text}"))?;
                    let similarity = (1.0 - distance as f32).clamp(0.0, 1.0);
                    out.push(RetrievalHit { recipe_id, similarity });
                }
                out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
                return Ok::<Vec<RetrievalHit>, anyhow::Error>(out);
            }

            // Vec table absent: brute-force cosine over stored embeddings.
            let mut stmt = conn.prepare("SELECT recipe_id, embedding FROM recipe_docs")?;
            let rows = stmt.query_map([], |r| {
                Ok((r.get::<_, u32>(0)?, r.get::<_, String>(1)?))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (recipe_id, embedding_json) = row?;
                let vector = json_to_vector(&embedding_json)?;
                let similarity = cosine_similarity(&query_vector, &vector);
                out.push(RetrievalHit { recipe_id, similarity });
            }
            out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            out.truncate(k);
            Ok::<Vec<RetrievalHit>, anyhow::Error>(out)
        })
        .await??;

        Ok(hits)
    }
}

fn vector_to_json(vector: &[f32]) -> String {
    serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_owned())
}

fn json_to_vector(json: &str) -> Result<Vec<f32>> {
    Ok(serde_json::from_str::<Vec<f32>>(json)?)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}
