use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqlResult, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::common::ChatMessage;

use super::database::Database;
use super::models::{ChatSession, MediaItem, MoodEntry, NewMoodEntry};

/// Local store for sessions, messages, mood entries and media.
///
/// Shared between the UI backend task and the mood queue worker, so the
/// connection sits behind a mutex.
pub struct ChatDatabase {
    db: Mutex<Database>,
}

impl ChatDatabase {
    /// Initialize database at custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::init(Database::new(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> SqlResult<Self> {
        Self::init(Database::in_memory()?)
    }

    fn init(db: Database) -> SqlResult<Self> {
        let chat_db = Self { db: Mutex::new(db) };
        chat_db.init_schema()?;
        Ok(chat_db)
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let db = self.lock();
        db.connection().execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                is_user INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS mood_entries (
                id TEXT PRIMARY KEY,
                session_id TEXT REFERENCES chat_sessions(id) ON DELETE SET NULL,
                mood TEXT NOT NULL,
                intensity INTEGER NOT NULL,
                note TEXT,
                context TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS media_library (
                id TEXT PRIMARY KEY,
                session_id TEXT REFERENCES chat_sessions(id) ON DELETE SET NULL,
                file_name TEXT NOT NULL,
                file_url TEXT NOT NULL,
                file_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session ON chat_messages(session_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON chat_sessions(updated_at);
            CREATE INDEX IF NOT EXISTS idx_moods_created_at ON mood_entries(created_at);",
        )
    }

    // ========== Sessions ==========

    pub fn create_session(&self, title: &str) -> SqlResult<ChatSession> {
        let now = Utc::now().timestamp_millis();
        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };

        let db = self.lock();
        db.connection().execute(
            "INSERT INTO chat_sessions (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![session.id, session.title, session.created_at, session.updated_at],
        )?;
        Ok(session)
    }

    /// All sessions, most recently updated first.
    pub fn list_sessions(&self) -> SqlResult<Vec<ChatSession>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(
            "SELECT id, title, created_at, updated_at
             FROM chat_sessions
             ORDER BY updated_at DESC, created_at DESC",
        )?;

        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(sessions)
    }

    #[cfg(test)]
    pub fn get_session(&self, id: &str) -> SqlResult<Option<ChatSession>> {
        let db = self.lock();
        db.connection()
            .query_row(
                "SELECT id, title, created_at, updated_at FROM chat_sessions WHERE id = ?1",
                params![id],
                session_from_row,
            )
            .optional()
    }

    pub fn touch_session(&self, id: &str) -> SqlResult<()> {
        let db = self.lock();
        db.connection().execute(
            "UPDATE chat_sessions SET updated_at = MAX(updated_at + 1, ?1) WHERE id = ?2",
            params![Utc::now().timestamp_millis(), id],
        )?;
        Ok(())
    }

    /// Returns whether a session was removed.
    pub fn delete_session(&self, id: &str) -> SqlResult<bool> {
        let db = self.lock();
        let removed = db
            .connection()
            .execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Sessions whose title or any message contains `query`, ignoring case.
    pub fn search_sessions(&self, query: &str) -> SqlResult<Vec<ChatSession>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_sessions();
        }
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let db = self.lock();
        let mut stmt = db.connection().prepare(
            "SELECT s.id, s.title, s.created_at, s.updated_at
             FROM chat_sessions s
             WHERE casefold(s.title) LIKE ?1 ESCAPE '\\'
                OR EXISTS (
                    SELECT 1 FROM chat_messages m
                    WHERE m.session_id = s.id AND casefold(m.content) LIKE ?1 ESCAPE '\\'
                )
             ORDER BY s.updated_at DESC, s.created_at DESC",
        )?;

        let sessions = stmt
            .query_map(params![pattern], session_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(sessions)
    }

    // ========== Messages ==========

    pub fn insert_message(&self, session_id: &str, message: &ChatMessage) -> SqlResult<()> {
        let db = self.lock();
        db.connection().execute(
            "INSERT OR IGNORE INTO chat_messages (id, session_id, content, is_user, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                session_id,
                message.content,
                message.is_user,
                message.timestamp
            ],
        )?;
        Ok(())
    }

    /// Messages of one session in conversation order.
    pub fn session_messages(&self, session_id: &str) -> SqlResult<Vec<ChatMessage>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(
            "SELECT id, content, is_user, timestamp
             FROM chat_messages
             WHERE session_id = ?1
             ORDER BY timestamp ASC, rowid ASC",
        )?;

        let messages = stmt
            .query_map(params![session_id], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    is_user: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(messages)
    }

    #[cfg(test)]
    pub fn message_count(&self) -> SqlResult<usize> {
        let db = self.lock();
        let count: i64 =
            db.connection()
                .query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Moods ==========

    pub fn insert_mood(&self, entry: &NewMoodEntry) -> SqlResult<MoodEntry> {
        let stored = MoodEntry {
            id: Uuid::new_v4().to_string(),
            session_id: entry.session_id.clone(),
            mood: entry.mood.clone(),
            intensity: i64::from(entry.intensity),
            note: entry.note.clone(),
            context: entry.context.as_str().to_string(),
            created_at: Utc::now().timestamp_millis(),
        };

        let db = self.lock();
        db.connection().execute(
            "INSERT INTO mood_entries (id, session_id, mood, intensity, note, context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stored.id,
                stored.session_id,
                stored.mood,
                stored.intensity,
                stored.note,
                stored.context,
                stored.created_at
            ],
        )?;
        Ok(stored)
    }

    /// All mood entries, oldest first.
    pub fn mood_entries(&self) -> SqlResult<Vec<MoodEntry>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(
            "SELECT id, session_id, mood, intensity, note, context, created_at
             FROM mood_entries
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(MoodEntry {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    mood: row.get(2)?,
                    intensity: row.get(3)?,
                    note: row.get(4)?,
                    context: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(entries)
    }

    // ========== Media ==========

    pub fn insert_media(
        &self,
        session_id: Option<&str>,
        file_name: &str,
        file_url: &str,
        file_type: &str,
    ) -> SqlResult<MediaItem> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp_millis();

        let db = self.lock();
        db.connection().execute(
            "INSERT INTO media_library (id, session_id, file_name, file_url, file_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, session_id, file_name, file_url, file_type, created_at],
        )?;

        let session_title = match session_id {
            Some(session_id) => db
                .connection()
                .query_row(
                    "SELECT title FROM chat_sessions WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?,
            None => None,
        };

        Ok(MediaItem {
            id,
            session_id: session_id.map(str::to_string),
            file_name: file_name.to_string(),
            file_url: file_url.to_string(),
            file_type: file_type.to_string(),
            created_at,
            session_title,
        })
    }

    /// Media library, newest first, with the owning session's title.
    pub fn media_library(&self) -> SqlResult<Vec<MediaItem>> {
        let db = self.lock();
        let mut stmt = db.connection().prepare(
            "SELECT m.id, m.session_id, m.file_name, m.file_url, m.file_type, m.created_at, s.title
             FROM media_library m
             LEFT JOIN chat_sessions s ON s.id = m.session_id
             ORDER BY m.created_at DESC, m.rowid DESC",
        )?;

        let items = stmt
            .query_map([], |row| {
                Ok(MediaItem {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    file_name: row.get(2)?,
                    file_url: row.get(3)?,
                    file_type: row.get(4)?,
                    created_at: row.get(5)?,
                    session_title: row.get(6)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(items)
    }
}

fn session_from_row(row: &Row<'_>) -> SqlResult<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
