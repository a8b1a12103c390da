//! Points ledger: delta arithmetic for cached per-level totals.
//!
//! # Responsibility
//! - Map attendance, task, bonus and game events to point deltas.
//! - Apply deltas to cached totals with a floor at zero.
//!
//! # Invariants
//! - Totals never go negative; negative deltas saturate at zero.
//! - Clamping is lossy: re-applying the inverse delta after a clamp does not
//!   restore the prior total.
//! - Game credits for team games follow team membership at evaluation time.

use crate::model::curriculum::Task;
use crate::model::game::{Game, GameKind};
use crate::model::meeting::{AttendanceStatus, MeetingTeam};
use crate::model::member::{Member, MemberId};
use crate::model::settings::ScoringTable;
use std::collections::BTreeMap;

/// Adds a signed delta to a total, saturating at zero.
pub fn apply_delta(total: u64, delta: i64) -> u64 {
    if delta >= 0 {
        total.saturating_add(delta.unsigned_abs())
    } else {
        total.saturating_sub(delta.unsigned_abs())
    }
}

/// Applies a delta to one member's cached total for one level.
///
/// Returns the new total.
pub fn credit(member: &mut Member, level_id: &str, delta: i64) -> u64 {
    let total = member
        .points_by_level
        .entry(level_id.to_string())
        .or_insert(0);
    *total = apply_delta(*total, delta);
    *total
}

pub fn attendance_reward(scoring: &ScoringTable, status: AttendanceStatus) -> i64 {
    let points = match status {
        AttendanceStatus::Present => scoring.attendance_present,
        AttendanceStatus::Late => scoring.attendance_late,
        AttendanceStatus::Excused => scoring.attendance_excused,
        AttendanceStatus::Absent => 0,
    };
    i64::from(points)
}

pub fn attendance_delta(
    scoring: &ScoringTable,
    previous: AttendanceStatus,
    next: AttendanceStatus,
) -> i64 {
    attendance_reward(scoring, next) - attendance_reward(scoring, previous)
}

/// Reward for signing a task: task-specific value, else the scoring default.
pub fn task_reward(scoring: &ScoringTable, task: &Task) -> i64 {
    let points = task.points.unwrap_or(if task.mandatory {
        scoring.mandatory_task
    } else {
        scoring.optional_task
    });
    i64::from(points)
}

/// Points each member gains from a game under the given team assignment.
///
/// Individual results are keyed by member id. Team results are credited to
/// every member currently listed on the team with that name.
pub fn game_credits(game: &Game, teams: &[MeetingTeam]) -> BTreeMap<MemberId, i64> {
    let mut credits = BTreeMap::new();
    match game.kind {
        GameKind::Individual => {
            for result in &game.results {
                *credits.entry(result.participant.clone()).or_insert(0) += result.points;
            }
        }
        GameKind::Team => {
            for result in &game.results {
                let Some(team) = teams.iter().find(|team| team.name == result.participant) else {
                    continue;
                };
                for member_id in &team.members {
                    *credits.entry(member_id.clone()).or_insert(0) += result.points;
                }
            }
        }
    }
    credits
}

/// Per-member delta turning `previous` credits into `next` credits.
///
/// `None` stands for "no game" (creation or deletion). Members with a zero
/// delta are omitted.
pub fn game_deltas(
    previous: Option<&Game>,
    next: Option<&Game>,
    teams: &[MeetingTeam],
) -> BTreeMap<MemberId, i64> {
    let mut deltas: BTreeMap<MemberId, i64> = BTreeMap::new();
    if let Some(game) = previous {
        for (member_id, points) in game_credits(game, teams) {
            *deltas.entry(member_id).or_insert(0) -= points;
        }
    }
    if let Some(game) = next {
        for (member_id, points) in game_credits(game, teams) {
            *deltas.entry(member_id).or_insert(0) += points;
        }
    }
    deltas.retain(|_, delta| *delta != 0);
    deltas
}
