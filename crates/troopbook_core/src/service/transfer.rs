//! Export/import of the whole troop document as one JSON object.
//!
//! # Invariants
//! - Export -> import -> export yields identical bytes apart from `exported_at`.
//! - Parsing never touches a live document; callers swap only on success.

use crate::model::curriculum::Level;
use crate::model::document::{default_levels, TroopDocument};
use crate::model::game::Game;
use crate::model::member::Member;
use crate::model::settings::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Version tag written into every export.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub members: Vec<Member>,
    #[serde(default)]
    pub games: Vec<Game>,
    pub settings: Settings,
    /// Files without a curriculum fall back to the built-in levels.
    #[serde(default = "default_levels")]
    pub levels: Vec<Level>,
}

#[derive(Debug)]
pub enum TransferError {
    Malformed(serde_json::Error),
    Encode(serde_json::Error),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "import file is not a valid troop export: {err}"),
            Self::Encode(err) => write!(f, "failed to encode export: {err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Malformed(err) | Self::Encode(err) => Some(err),
        }
    }
}

/// Serializes the document as pretty-printed JSON stamped with `now`.
pub fn export_document(doc: &TroopDocument, now: DateTime<Utc>) -> Result<String, TransferError> {
    let bundle = ExportBundle {
        version: EXPORT_FORMAT_VERSION.to_string(),
        exported_at: now,
        members: doc.members.clone(),
        games: doc.games.clone(),
        settings: doc.settings.clone(),
        levels: doc.levels.clone(),
    };
    serde_json::to_string_pretty(&bundle).map_err(TransferError::Encode)
}

/// Parses an export into a fresh document.
pub fn parse_export(json: &str) -> Result<TroopDocument, TransferError> {
    let bundle: ExportBundle = serde_json::from_str(json).map_err(TransferError::Malformed)?;
    Ok(TroopDocument {
        members: bundle.members,
        games: bundle.games,
        settings: bundle.settings,
        levels: bundle.levels,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_export, TransferError};
    use crate::model::document::default_levels;

    #[test]
    fn rejects_truncated_and_foreign_json() {
        assert!(matches!(
            parse_export("{\"members\": ["),
            Err(TransferError::Malformed(_))
        ));
        assert!(matches!(
            parse_export("{\"hello\": 1}"),
            Err(TransferError::Malformed(_))
        ));
    }

    #[test]
    fn missing_games_and_levels_fall_back_to_defaults() {
        let json = r#"{
            "version": "1.0",
            "exported_at": "2025-06-01T18:00:00Z",
            "members": [],
            "settings": {"signing_secret": "camp", "active_level_id": "earth"}
        }"#;
        let doc = parse_export(json).unwrap();
        assert!(doc.games.is_empty());
        assert_eq!(doc.levels, default_levels());
        assert_eq!(doc.settings.signing_secret, "camp");
    }
}
