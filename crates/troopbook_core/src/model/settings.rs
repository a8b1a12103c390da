//! Troop settings and the collections stored alongside them.
//!
//! # Invariants
//! - `high_scores` is sorted by score descending and holds at most ten entries.
//! - `play_times` holds at most one entry per `(player_id, day)`.

use crate::model::curriculum::LevelId;
use crate::model::meeting::{Meeting, MeetingId};
use crate::model::member::MemberId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type BonusId = String;

/// Default signing secret for a freshly created troop document.
pub const DEFAULT_SIGNING_SECRET: &str = "TROOP-SIGNING-SECRET";
/// Level active in a freshly created troop document.
pub const DEFAULT_LEVEL_ID: &str = "earth";

/// Points awarded per event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringTable {
    pub mandatory_task: u32,
    pub optional_task: u32,
    pub attendance_present: u32,
    pub attendance_late: u32,
    pub attendance_excused: u32,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            mandatory_task: 10,
            optional_task: 5,
            attendance_present: 10,
            attendance_late: 5,
            attendance_excused: 2,
        }
    }
}

/// Ad-hoc point grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    pub id: BonusId,
    pub member_id: MemberId,
    pub points: i64,
    pub reason: String,
    /// Missing dates are excluded from windowed totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,
    pub level_id: LevelId,
}

/// Display profile of the root operator, who has no roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub nickname: String,
    pub avatar: String,
}

impl Default for AdminProfile {
    fn default() -> Self {
        Self {
            nickname: "Admin".to_string(),
            avatar: "⚙️".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScore {
    pub nickname: String,
    pub score: u32,
    pub date: NaiveDate,
}

/// Accumulated arcade play time of one player on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlayTime {
    pub player_id: String,
    pub day: NaiveDate,
    pub played_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub signing_secret: String,
    #[serde(default)]
    pub scoring: ScoringTable,
    pub active_level_id: LevelId,
    #[serde(default)]
    pub show_total_leaderboard: bool,
    #[serde(default)]
    pub admin_profile: AdminProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_album_url: Option<String>,
    /// Link to the curriculum handbook document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handbook_url: Option<String>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub bonuses: Vec<Bonus>,
    #[serde(default)]
    pub high_scores: Vec<HighScore>,
    #[serde(default)]
    pub play_times: Vec<DailyPlayTime>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            signing_secret: DEFAULT_SIGNING_SECRET.to_string(),
            scoring: ScoringTable::default(),
            active_level_id: DEFAULT_LEVEL_ID.to_string(),
            show_total_leaderboard: false,
            admin_profile: AdminProfile::default(),
            default_album_url: None,
            handbook_url: None,
            meetings: Vec::new(),
            bonuses: Vec::new(),
            high_scores: Vec::new(),
            play_times: Vec::new(),
        }
    }
}

impl Settings {
    pub fn meeting(&self, meeting_id: &str) -> Option<&Meeting> {
        self.meetings.iter().find(|meeting| meeting.id == meeting_id)
    }

    pub fn meeting_mut(&mut self, meeting_id: &str) -> Option<&mut Meeting> {
        self.meetings
            .iter_mut()
            .find(|meeting| meeting.id == meeting_id)
    }

    pub fn played_ms(&self, player_id: &str, day: NaiveDate) -> u64 {
        self.play_times
            .iter()
            .find(|entry| entry.player_id == player_id && entry.day == day)
            .map_or(0, |entry| entry.played_ms)
    }
}
