pub mod models;

use crate::embedding::{bytes_to_embedding, embedding_to_bytes};
use models::{IndexedChunk, Message};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session store is unavailable after an earlier failure")]
    Poisoned,
    #[error("Index has {chunks} chunks but {embeddings} embeddings")]
    IndexMismatch { chunks: usize, embeddings: usize },
    #[error("The documents changed while the question was being answered. Please ask again.")]
    Stale,
}

type Result<T> = std::result::Result<T, SessionError>;

/// Per-session context: the processed document, its similarity index and
/// the conversation history. Lives in memory only; [`SessionStore::reset`]
/// is the clear boundary.
pub struct SessionStore {
    conn: Mutex<Connection>,
    /// Bumped whenever the index is replaced or cleared. Only read or
    /// written while `conn` is locked.
    generation: AtomicU64,
}

/// Consistent view of the session taken under one lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub chunks: Vec<IndexedChunk>,
    pub history: Vec<Message>,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            generation: AtomicU64::new(0),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SessionError::Poisoned)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS document (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                content TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Index ──

    /// Replace the document, its index and the history in one step.
    pub fn replace_index(
        &self,
        document: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(SessionError::IndexMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute_batch("DELETE FROM document; DELETE FROM chunks; DELETE FROM messages;")?;
        tx.execute(
            "INSERT INTO document (id, content) VALUES (1, ?1)",
            params![document],
        )?;
        for (i, (chunk, emb)) in chunks.iter().zip(embeddings).enumerate() {
            tx.execute(
                "INSERT INTO chunks (id, chunk_index, content, embedding) VALUES (?1, ?2, ?3, ?4)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    i as i64,
                    chunk,
                    embedding_to_bytes(emb)
                ],
            )?;
        }
        tx.commit()?;
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let conn = self.conn()?;
        Ok(Snapshot {
            generation: self.generation.load(Ordering::Relaxed),
            chunks: query_chunks(&conn)?,
            history: query_messages(&conn)?,
        })
    }

    pub fn chunks(&self) -> Result<Vec<IndexedChunk>> {
        query_chunks(&*self.conn()?)
    }

    pub fn document_text(&self) -> Result<Option<String>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row("SELECT content FROM document WHERE id = 1", [], |row| row.get(0))
            .optional()?)
    }

    // ── Messages ──

    /// Append a question and its answer as two consecutive turns.
    ///
    /// `generation` is the one the answer was computed against; if the index
    /// has been replaced or cleared since, nothing is written.
    pub fn add_exchange(&self, generation: u64, question: &str, answer: &str) -> Result<()> {
        let mut conn = self.conn()?;
        if self.generation.load(Ordering::Relaxed) != generation {
            return Err(SessionError::Stale);
        }
        let tx = conn.transaction()?;
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM messages",
            [],
            |row| row.get(0),
        )?;
        for (offset, (role, content)) in [("user", question), ("assistant", answer)]
            .into_iter()
            .enumerate()
        {
            tx.execute(
                "INSERT INTO messages (seq, id, role, content) VALUES (?1, ?2, ?3, ?4)",
                params![
                    next + offset as i64,
                    uuid::Uuid::new_v4().to_string(),
                    role,
                    content
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn messages(&self) -> Result<Vec<Message>> {
        query_messages(&*self.conn()?)
    }

    /// Drop everything the session holds.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("DELETE FROM document; DELETE FROM chunks; DELETE FROM messages;")?;
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn query_chunks(conn: &Connection) -> Result<Vec<IndexedChunk>> {
    let mut stmt =
        conn.prepare("SELECT id, chunk_index, content, embedding FROM chunks ORDER BY chunk_index")?;
    let rows = stmt.query_map([], |row| {
        let bytes: Vec<u8> = row.get(3)?;
        Ok(IndexedChunk {
            id: row.get(0)?,
            chunk_index: row.get(1)?,
            content: row.get(2)?,
            embedding: bytes_to_embedding(&bytes),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_messages(conn: &Connection) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare("SELECT id, seq, role, content FROM messages ORDER BY seq ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Message {
            id: row.get(0)?,
            seq: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed() -> SessionStore {
        let store = SessionStore::new().unwrap();
        store
            .replace_index(
                "alpha beta",
                &["alpha".to_string(), "beta".to_string()],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = SessionStore::new().unwrap();
        assert!(store.chunks().unwrap().is_empty());
        assert!(store.messages().unwrap().is_empty());
        assert!(store.document_text().unwrap().is_none());
    }

    #[test]
    fn test_replace_index_roundtrips_embeddings() {
        let store = indexed();
        let chunks = store.chunks().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "beta");
        assert_eq!(chunks[1].embedding, vec![0.0, 1.0]);
        assert_eq!(store.document_text().unwrap().as_deref(), Some("alpha beta"));
    }

    #[test]
    fn test_replace_index_rejects_mismatch() {
        let store = SessionStore::new().unwrap();
        let err = store.replace_index("x", &["x".to_string()], &[]).unwrap_err();
        assert!(matches!(err, SessionError::IndexMismatch { chunks: 1, embeddings: 0 }));
    }

    #[test]
    fn test_exchanges_alternate_roles() {
        let store = indexed();
        let generation = store.snapshot().unwrap().generation;
        store.add_exchange(generation, "q1", "a1").unwrap();
        store.add_exchange(generation, "q2", "a2").unwrap();
        let messages = store.messages().unwrap();
        let seqs: Vec<i64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
        for m in &messages {
            assert_eq!(m.is_user(), m.seq % 2 == 0);
        }
        assert_eq!(messages[3].content, "a2");
    }

    #[test]
    fn test_rebuilding_index_clears_history() {
        let store = indexed();
        let generation = store.snapshot().unwrap().generation;
        store.add_exchange(generation, "q", "a").unwrap();
        store
            .replace_index("gamma", &["gamma".to_string()], &[vec![1.0]])
            .unwrap();
        assert!(store.messages().unwrap().is_empty());
        assert_eq!(store.chunks().unwrap().len(), 1);
    }

    #[test]
    fn test_exchange_after_reindex_is_rejected() {
        let store = indexed();
        let before = store.snapshot().unwrap();
        assert_eq!(before.chunks.len(), 2);
        store
            .replace_index("gamma", &["gamma".to_string()], &[vec![1.0]])
            .unwrap();
        let err = store.add_exchange(before.generation, "q", "a").unwrap_err();
        assert!(matches!(err, SessionError::Stale));
        assert!(store.messages().unwrap().is_empty());

        let after = store.snapshot().unwrap().generation;
        store.reset().unwrap();
        assert!(matches!(store.add_exchange(after, "q", "a"), Err(SessionError::Stale)));
    }

    #[test]
    fn test_reset_drops_everything() {
        let store = indexed();
        let generation = store.snapshot().unwrap().generation;
        store.add_exchange(generation, "q", "a").unwrap();
        store.reset().unwrap();
        assert!(store.chunks().unwrap().is_empty());
        assert!(store.messages().unwrap().is_empty());
        assert!(store.document_text().unwrap().is_none());
    }
}
