//! Member (roster entry) model.
//!
//! # Invariants
//! - `nickname` is unique across the roster, compared case-insensitively.
//! - `points_by_level` values never go below zero.
//! - A task missing from `task_progress` is in `TaskStatus::None`.

use crate::model::curriculum::{LevelId, TaskId};
use crate::model::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable member identifier.
pub type MemberId = String;

/// Password assigned to new members and on password reset.
pub const DEFAULT_PASSWORD: &str = "1234";

/// Authorization role of a member or operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Leader,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Leader => "leader",
            Self::User => "user",
        }
    }
}

/// Progress of one member on one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    None,
    /// Member is working on the task.
    Working,
    /// Member reports the task as finished; waits for an approver.
    Done,
    /// Approver certified completion. Terminal for member-side transitions.
    Signed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Working => "working",
            Self::Done => "done",
            Self::Signed => "signed",
        }
    }

    /// Working or done: counts against the optional-task quota.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Working | Self::Done)
    }
}

/// Roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub nickname: String,
    pub avatar: String,
    pub role: Role,
    /// Cached per-level point totals, maintained eagerly by the ledger.
    #[serde(default)]
    pub points_by_level: BTreeMap<LevelId, u64>,
    #[serde(default)]
    pub task_progress: BTreeMap<TaskId, TaskStatus>,
    #[serde(default)]
    pub task_completed_at: BTreeMap<TaskId, DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default)]
    pub is_profile_locked: bool,
}

impl Member {
    /// Creates a `user` member with the default password and empty progress.
    pub fn new(nickname: impl Into<String>, avatar: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            id: new_id(),
            name: nickname.clone(),
            nickname,
            avatar: avatar.into(),
            role: Role::User,
            points_by_level: BTreeMap::new(),
            task_progress: BTreeMap::new(),
            task_completed_at: BTreeMap::new(),
            password: Some(DEFAULT_PASSWORD.to_string()),
            must_change_password: true,
            is_profile_locked: false,
        }
    }

    pub fn task_status(&self, task_id: &str) -> TaskStatus {
        self.task_progress.get(task_id).copied().unwrap_or_default()
    }

    /// Stores a status; `None` removes the entry so absent and none stay equivalent.
    pub fn set_task_status(&mut self, task_id: &str, status: TaskStatus) {
        if status == TaskStatus::None {
            self.task_progress.remove(task_id);
        } else {
            self.task_progress.insert(task_id.to_string(), status);
        }
    }

    /// Cached all-time total for one level.
    pub fn level_points(&self, level_id: &str) -> u64 {
        self.points_by_level.get(level_id).copied().unwrap_or(0)
    }

    pub fn nickname_matches(&self, nickname: &str) -> bool {
        self.nickname.to_lowercase() == nickname.trim().to_lowercase()
    }
}
