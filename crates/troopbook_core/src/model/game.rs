//! Meeting game model.

use crate::model::curriculum::LevelId;
use crate::model::meeting::MeetingId;
use serde::{Deserialize, Serialize};

pub type GameId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Results are keyed by member id.
    Individual,
    /// Results are keyed by team name of the owning meeting.
    Team,
}

/// Points gained by one participant (member id or team name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub participant: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub meeting_id: MeetingId,
    pub level_id: LevelId,
    pub kind: GameKind,
    /// Team names taking part; empty for individual games.
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub results: Vec<GameResult>,
}

impl Game {
    pub fn result_for(&self, participant: &str) -> Option<i64> {
        self.results
            .iter()
            .find(|result| result.participant == participant)
            .map(|result| result.points)
    }
}
