//! Core domain logic for troopbook, an activity tracker for youth groups.
//! This crate owns the points ledger and every other business invariant.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::TroopDocument;
pub use model::member::{Member, MemberId, Role, TaskStatus};
pub use repo::document_repo::{
    DocumentKey, DocumentRepository, MemoryDocumentRepository, RepoError, RepoResult,
    SqliteDocumentRepository,
};
pub use service::access::Session;
pub use service::leaderboard::{LeaderboardMetric, LeaderboardRow};
pub use service::troop_service::{TroopError, TroopResult, TroopService};

/// Core crate version, reported by the CLI at startup.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
