//! Troop document model.
//!
//! # Responsibility
//! - Define the canonical data structures persisted in the troop document.
//! - Keep one serializable shape shared by storage, export and import.
//!
//! # Invariants
//! - Every map is ordered so serialization is deterministic.
//! - Every record is addressed by a stable string id that is never reused.

pub mod curriculum;
pub mod document;
pub mod game;
pub mod meeting;
pub mod member;
pub mod settings;

use uuid::Uuid;

/// Generates a fresh stable record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
