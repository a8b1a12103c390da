//! Troop use-case services.
//!
//! # Responsibility
//! - Pure rule modules (`ledger`, `progress`, `signature`, `access`,
//!   `chronicle`, `leaderboard`, `arcade`, `transfer`) with no storage access.
//! - `TroopService`, the store that applies those rules to the persisted
//!   document.

pub mod access;
pub mod arcade;
pub mod chronicle;
pub mod leaderboard;
pub mod ledger;
pub mod meeting_ops;
pub mod progress;
pub mod roster_ops;
pub mod signature;
pub mod trail_ops;
pub mod transfer;
pub mod troop_service;
