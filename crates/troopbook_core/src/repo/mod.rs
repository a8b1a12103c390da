//! Persistence adapters for the troop document.
//!
//! # Responsibility
//! - Define the load/save contract the store depends on.
//! - Isolate SQLite details from the store and its mutation operations.
//!
//! # Invariants
//! - Adapters store opaque JSON text per key; they never interpret it.

pub mod document_repo;
