//! Meeting, attendance, team and chronicle article models.

use crate::model::member::MemberId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type MeetingId = String;
pub type ArticleId = String;

/// Attendance status of one member at one meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Excused,
    #[default]
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Excused => "excused",
            Self::Absent => "absent",
        }
    }

    /// Eligible for team assignment.
    pub fn is_on_site(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

/// Named team of members formed for one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTeam {
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberId>,
}

/// Chronicle entry written for a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub author_id: String,
    pub author_nickname: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attendance: BTreeMap<MemberId, AttendanceStatus>,
    #[serde(default)]
    pub teams: Vec<MeetingTeam>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_url: Option<String>,
}

impl Meeting {
    pub fn attendance_of(&self, member_id: &str) -> AttendanceStatus {
        self.attendance.get(member_id).copied().unwrap_or_default()
    }

    pub fn team_of(&self, member_id: &str) -> Option<&MeetingTeam> {
        self.teams
            .iter()
            .find(|team| team.members.iter().any(|id| id == member_id))
    }
}
