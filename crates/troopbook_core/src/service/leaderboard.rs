//! Leaderboard and points history views.
//!
//! # Responsibility
//! - Expose the cached all-time total and the trailing 30-day total as two
//!   separately named computations.
//! - Rank members by the selected metric.
//!
//! # Invariants
//! - `trailing_total` is rebuilt from history on every call and never reads
//!   `points_by_level`; the two numbers may disagree.
//! - Ranking is a stable descending sort; ties keep roster order.

use crate::model::document::TroopDocument;
use crate::model::game::GameKind;
use crate::model::member::{Member, MemberId, TaskStatus};
use crate::model::settings::Settings;
use crate::service::ledger::{attendance_reward, task_reward};
use chrono::{DateTime, Duration, Utc};

pub const TRAILING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardMetric {
    AllTime,
    Trailing30Days,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub member_id: MemberId,
    pub nickname: String,
    pub avatar: String,
    pub all_time: u64,
    pub trailing: i64,
}

impl LeaderboardRow {
    pub fn value(&self, metric: LeaderboardMetric) -> i64 {
        match metric {
            LeaderboardMetric::AllTime => i64::try_from(self.all_time).unwrap_or(i64::MAX),
            LeaderboardMetric::Trailing30Days => self.trailing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Task,
    Bonus,
    Game,
}

/// One point-earning entry in a member's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub source_id: String,
    pub title: String,
    pub points: i64,
    pub date: Option<DateTime<Utc>>,
}

/// Metrics the leaderboard may offer under the current settings.
pub fn available_metrics(settings: &Settings) -> Vec<LeaderboardMetric> {
    if settings.show_total_leaderboard {
        vec![
            LeaderboardMetric::Trailing30Days,
            LeaderboardMetric::AllTime,
        ]
    } else {
        vec![LeaderboardMetric::Trailing30Days]
    }
}

/// Cached aggregate maintained by the ledger.
pub fn cached_total(member: &Member, level_id: &str) -> u64 {
    member.level_points(level_id)
}

/// Points earned within the trailing window, recomputed from history.
pub fn trailing_total(
    doc: &TroopDocument,
    member: &Member,
    level_id: &str,
    now: DateTime<Utc>,
) -> i64 {
    let cutoff = now - Duration::days(TRAILING_WINDOW_DAYS);
    let settings = &doc.settings;
    let mut total = 0;

    if let Some(level) = doc.level(level_id) {
        for task in level.tasks() {
            if member.task_status(&task.id) != TaskStatus::Signed {
                continue;
            }
            if matches!(member.task_completed_at.get(&task.id), Some(done_at) if *done_at >= cutoff)
            {
                total += task_reward(&settings.scoring, task);
            }
        }
    }

    total += settings
        .bonuses
        .iter()
        .filter(|bonus| bonus.member_id == member.id && bonus.level_id == level_id)
        .filter(|bonus| matches!(bonus.date, Some(date) if date >= cutoff))
        .map(|bonus| bonus.points)
        .sum::<i64>();

    for game in doc.games.iter().filter(|game| game.level_id == level_id) {
        let Some(meeting) = settings.meeting(&game.meeting_id) else {
            continue;
        };
        if meeting.date < cutoff {
            continue;
        }
        match game.kind {
            GameKind::Individual => total += game.result_for(&member.id).unwrap_or(0),
            GameKind::Team => {
                if let Some(team) = meeting.team_of(&member.id) {
                    total += game.result_for(&team.name).unwrap_or(0);
                }
            }
        }
    }

    total += settings
        .meetings
        .iter()
        .filter(|meeting| meeting.date >= cutoff)
        .map(|meeting| attendance_reward(&settings.scoring, meeting.attendance_of(&member.id)))
        .sum::<i64>();

    total
}

/// Ranked leaderboard for one level.
pub fn standings(
    doc: &TroopDocument,
    level_id: &str,
    now: DateTime<Utc>,
    metric: LeaderboardMetric,
) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = doc
        .members
        .iter()
        .map(|member| LeaderboardRow {
            member_id: member.id.clone(),
            nickname: member.nickname.clone(),
            avatar: member.avatar.clone(),
            all_time: cached_total(member, level_id),
            trailing: trailing_total(doc, member, level_id, now),
        })
        .collect();
    rows.sort_by(|a, b| b.value(metric).cmp(&a.value(metric)));
    rows
}

/// Point history of one member for one level, newest first, undated last.
pub fn points_history(doc: &TroopDocument, member: &Member, level_id: &str) -> Vec<HistoryEntry> {
    let settings = &doc.settings;
    let mut entries = Vec::new();

    if let Some(level) = doc.level(level_id) {
        for task in level.tasks() {
            if member.task_status(&task.id) == TaskStatus::Signed {
                entries.push(HistoryEntry {
                    kind: HistoryKind::Task,
                    source_id: task.id.clone(),
                    title: task.title.clone(),
                    points: task_reward(&settings.scoring, task),
                    date: member.task_completed_at.get(&task.id).copied(),
                });
            }
        }
    }

    for bonus in settings
        .bonuses
        .iter()
        .filter(|bonus| bonus.member_id == member.id && bonus.level_id == level_id)
    {
        entries.push(HistoryEntry {
            kind: HistoryKind::Bonus,
            source_id: bonus.id.clone(),
            title: bonus.reason.clone(),
            points: bonus.points,
            date: bonus.date,
        });
    }

    for game in doc.games.iter().filter(|game| game.level_id == level_id) {
        if game.kind != GameKind::Individual {
            continue;
        }
        match game.result_for(&member.id) {
            Some(points) if points > 0 => entries.push(HistoryEntry {
                kind: HistoryKind::Game,
                source_id: game.id.clone(),
                title: game.name.clone(),
                points,
                date: settings.meeting(&game.meeting_id).map(|meeting| meeting.date),
            }),
            _ => {}
        }
    }

    // `None < Some(_)`, so a descending sort leaves undated entries last.
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}
