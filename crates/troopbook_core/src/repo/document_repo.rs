//! Document repository contract with SQLite and in-memory implementations.
//!
//! # Responsibility
//! - Persist the four named troop values (`roster`, `games`, `settings`,
//!   `levels`) as independent JSON documents.
//!
//! # Invariants
//! - `save_document` replaces the whole value for a key.
//! - `load_document` returns `None` for keys never written.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Named top-level value of the troop document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKey {
    Roster,
    Games,
    Settings,
    Levels,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 4] = [Self::Roster, Self::Games, Self::Settings, Self::Levels];

    /// Stable storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Games => "games",
            Self::Settings => "settings",
            Self::Levels => "levels",
        }
    }
}

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence adapter injected into the troop store.
pub trait DocumentRepository {
    fn load_document(&self, key: DocumentKey) -> RepoResult<Option<String>>;
    fn save_document(&self, key: DocumentKey, body: &str) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates a repository from a connection returned by `open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn load_document(&self, key: DocumentKey) -> RepoResult<Option<String>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE doc_key = ?1;",
                [key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn save_document(&self, key: DocumentKey, body: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO documents (doc_key, body)
             VALUES (?1, ?2)
             ON CONFLICT(doc_key) DO UPDATE SET
                body = excluded.body,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key.as_str(), body],
        )?;
        Ok(())
    }
}

/// In-memory document repository for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDocumentRepository {
    values: RefCell<BTreeMap<DocumentKey, String>>,
    writes: RefCell<u64>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, if any.
    pub fn stored(&self, key: DocumentKey) -> Option<String> {
        self.values.borrow().get(&key).cloned()
    }

    /// Number of successful `save_document` calls.
    pub fn write_count(&self) -> u64 {
        *self.writes.borrow()
    }
}

impl DocumentRepository for MemoryDocumentRepository {
    fn load_document(&self, key: DocumentKey) -> RepoResult<Option<String>> {
        Ok(self.stored(key))
    }

    fn save_document(&self, key: DocumentKey, body: &str) -> RepoResult<()> {
        self.values.borrow_mut().insert(key, body.to_string());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentKey, DocumentRepository, MemoryDocumentRepository};

    #[test]
    fn memory_repository_replaces_values_per_key() {
        let repo = MemoryDocumentRepository::new();
        assert!(repo.load_document(DocumentKey::Games).unwrap().is_none());

        repo.save_document(DocumentKey::Games, "[]").unwrap();
        repo.save_document(DocumentKey::Games, "[1]").unwrap();

        assert_eq!(
            repo.load_document(DocumentKey::Games).unwrap().as_deref(),
            Some("[1]")
        );
        assert!(repo.load_document(DocumentKey::Roster).unwrap().is_none());
        assert_eq!(repo.write_count(), 2);
    }

    #[test]
    fn document_keys_are_stable() {
        let keys: Vec<&str> = DocumentKey::ALL.iter().map(|key| key.as_str()).collect();
        assert_eq!(keys, vec!["roster", "games", "settings", "levels"]);
    }
}
