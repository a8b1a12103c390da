//! Arcade mini-game session: fixed-step obstacle avoidance.
//!
//! # Responsibility
//! - Advance gravity/flap physics, spawn obstacles and count passed ones.
//! - Accrue play time while playing and stop at the daily budget.
//!
//! # Invariants
//! - A session never enters `Playing` once the daily budget is spent.
//! - Score only grows while `Playing`.
//! - Has no effect on the points ledger.

use crate::model::settings::HighScore;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const FIELD_WIDTH: f64 = 320.0;
pub const FIELD_HEIGHT: f64 = 480.0;
pub const GRAVITY: f64 = 0.25;
pub const FLAP_VELOCITY: f64 = -4.5;
pub const LAUNCH_VELOCITY: f64 = -10.0;
pub const OBSTACLE_WIDTH: f64 = 50.0;
pub const OBSTACLE_GAP: f64 = 150.0;
pub const OBSTACLE_SPEED: f64 = 2.0;
pub const OBSTACLE_SPACING: f64 = 200.0;
pub const PLAYER_X: f64 = 50.0;
pub const PLAYER_SIZE: f64 = 34.0;
pub const COUNTDOWN_MS: u64 = 3_000;
/// Daily play-time ceiling per member.
pub const DAILY_BUDGET_MS: u64 = 300_000;
pub const MAX_HIGH_SCORES: usize = 10;
pub const DISPLAYED_HIGH_SCORES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcadeError {
    BudgetExhausted { played_ms: u64 },
}

impl Display for ArcadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetExhausted { played_ms } => write!(
                f,
                "daily play time exhausted ({} of {} seconds)",
                played_ms / 1000,
                DAILY_BUDGET_MS / 1000
            ),
        }
    }
}

impl Error for ArcadeError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcadePhase {
    Idle,
    Countdown { remaining_ms: u64 },
    Playing,
    GameOver,
    LimitExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    /// Top edge of the gap.
    pub gap_top: f64,
    pub passed: bool,
}

/// Terminal event reported by `ArcadeSession::tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcadeOutcome {
    /// Collision ended the run; the score is eligible for the high-score table.
    Crashed { score: u32, played_ms: u64 },
    /// Daily budget ran out mid-run.
    BudgetReached { played_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct ArcadeSession {
    phase: ArcadePhase,
    player_y: f64,
    velocity: f64,
    obstacles: Vec<Obstacle>,
    score: u32,
    played_ms: u64,
    unlimited: bool,
}

impl ArcadeSession {
    /// Opens a session with today's already accumulated play time.
    pub fn new(played_ms_today: u64, unlimited: bool) -> Self {
        let phase = if !unlimited && played_ms_today >= DAILY_BUDGET_MS {
            ArcadePhase::LimitExceeded
        } else {
            ArcadePhase::Idle
        };
        Self {
            phase,
            player_y: FIELD_HEIGHT / 2.0,
            velocity: 0.0,
            obstacles: Vec::new(),
            score: 0,
            played_ms: played_ms_today,
            unlimited,
        }
    }

    pub fn phase(&self) -> ArcadePhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn played_ms(&self) -> u64 {
        self.played_ms
    }

    pub fn player_y(&self) -> f64 {
        self.player_y
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        (!self.unlimited).then(|| DAILY_BUDGET_MS.saturating_sub(self.played_ms))
    }

    /// Starts the countdown from `Idle` or `GameOver`.
    pub fn start(&mut self) -> Result<(), ArcadeError> {
        if !self.unlimited && self.played_ms >= DAILY_BUDGET_MS {
            self.phase = ArcadePhase::LimitExceeded;
            return Err(ArcadeError::BudgetExhausted {
                played_ms: self.played_ms,
            });
        }
        if matches!(self.phase, ArcadePhase::Idle | ArcadePhase::GameOver) {
            self.phase = ArcadePhase::Countdown {
                remaining_ms: COUNTDOWN_MS,
            };
            self.obstacles.clear();
            self.player_y = FIELD_HEIGHT - 100.0;
            self.velocity = LAUNCH_VELOCITY;
            self.score = 0;
        }
        Ok(())
    }

    /// Player input: flap while playing, otherwise (re)start.
    pub fn action(&mut self) -> Result<(), ArcadeError> {
        if self.phase == ArcadePhase::Playing {
            self.velocity = FLAP_VELOCITY;
            Ok(())
        } else {
            self.start()
        }
    }

    /// Advances one frame of `dt_ms` milliseconds.
    pub fn tick<R: Rng>(&mut self, dt_ms: u64, rng: &mut R) -> Option<ArcadeOutcome> {
        match self.phase {
            ArcadePhase::Countdown { remaining_ms } => {
                self.phase = if remaining_ms <= dt_ms {
                    ArcadePhase::Playing
                } else {
                    ArcadePhase::Countdown {
                        remaining_ms: remaining_ms - dt_ms,
                    }
                };
                None
            }
            ArcadePhase::Playing => {
                self.played_ms = self.played_ms.saturating_add(dt_ms);
                if !self.unlimited && self.played_ms >= DAILY_BUDGET_MS {
                    self.phase = ArcadePhase::LimitExceeded;
                    return Some(ArcadeOutcome::BudgetReached {
                        played_ms: self.played_ms,
                    });
                }
                if self.step_physics(rng) {
                    self.phase = ArcadePhase::GameOver;
                    return Some(ArcadeOutcome::Crashed {
                        score: self.score,
                        played_ms: self.played_ms,
                    });
                }
                None
            }
            ArcadePhase::Idle | ArcadePhase::GameOver | ArcadePhase::LimitExceeded => None,
        }
    }

    /// One physics step. Returns `true` on collision.
    fn step_physics<R: Rng>(&mut self, rng: &mut R) -> bool {
        self.velocity += GRAVITY;
        self.player_y += self.velocity;

        let needs_obstacle = self
            .obstacles
            .last()
            .map_or(true, |last| last.x < FIELD_WIDTH - OBSTACLE_SPACING);
        if needs_obstacle {
            let span = FIELD_HEIGHT - OBSTACLE_GAP - 100.0;
            self.obstacles.push(Obstacle {
                x: FIELD_WIDTH,
                gap_top: 50.0 + rng.gen::<f64>() * span,
                passed: false,
            });
        }

        let mut collided = false;
        for obstacle in &mut self.obstacles {
            obstacle.x -= OBSTACLE_SPEED;

            let overlaps_x =
                PLAYER_X + PLAYER_SIZE > obstacle.x && PLAYER_X < obstacle.x + OBSTACLE_WIDTH;
            let outside_gap = self.player_y < obstacle.gap_top
                || self.player_y + PLAYER_SIZE > obstacle.gap_top + OBSTACLE_GAP;
            if overlaps_x && outside_gap {
                collided = true;
            }

            if !obstacle.passed && obstacle.x < PLAYER_X {
                obstacle.passed = true;
                self.score += 1;
            }
        }

        if self.player_y > FIELD_HEIGHT - PLAYER_SIZE || self.player_y < 0.0 {
            collided = true;
        }

        self.obstacles
            .retain(|obstacle| obstacle.x > -OBSTACLE_WIDTH);
        collided
    }
}

/// Inserts a score and keeps the table sorted descending and capped.
///
/// Equal scores keep the newer entry first.
pub fn insert_high_score(scores: &mut Vec<HighScore>, entry: HighScore) {
    scores.insert(0, entry);
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores.truncate(MAX_HIGH_SCORES);
}

/// Entries shown to players.
pub fn displayed_high_scores(scores: &[HighScore]) -> &[HighScore] {
    &scores[..scores.len().min(DISPLAYED_HIGH_SCORES)]
}

#[cfg(test)]
mod tests {
    use super::{
        insert_high_score, ArcadeOutcome, ArcadePhase, ArcadeSession, COUNTDOWN_MS,
        DAILY_BUDGET_MS, MAX_HIGH_SCORES,
    };
    use crate::model::settings::HighScore;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME_MS: u64 = 16;

    #[test]
    fn exhausted_budget_blocks_start() {
        let mut session = ArcadeSession::new(DAILY_BUDGET_MS, false);
        assert_eq!(session.phase(), ArcadePhase::LimitExceeded);
        assert!(session.start().is_err());

        let mut unlimited = ArcadeSession::new(DAILY_BUDGET_MS, true);
        assert!(unlimited.start().is_ok());
    }

    #[test]
    fn idle_player_falls_and_crashes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = ArcadeSession::new(0, false);
        session.start().unwrap();
        assert!(session.tick(COUNTDOWN_MS, &mut rng).is_none());
        assert_eq!(session.phase(), ArcadePhase::Playing);

        let mut outcome = None;
        for _ in 0..1_000 {
            outcome = session.tick(FRAME_MS, &mut rng);
            if outcome.is_some() {
                break;
            }
        }
        assert!(matches!(outcome, Some(ArcadeOutcome::Crashed { score: 0, .. })));
        assert_eq!(session.phase(), ArcadePhase::GameOver);
        assert!(session.played_ms() > 0);
    }

    #[test]
    fn budget_runs_out_mid_run() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = ArcadeSession::new(DAILY_BUDGET_MS - 10, false);
        session.start().unwrap();
        session.tick(COUNTDOWN_MS, &mut rng);
        let outcome = session.tick(FRAME_MS, &mut rng);
        assert_eq!(
            outcome,
            Some(ArcadeOutcome::BudgetReached {
                played_ms: DAILY_BUDGET_MS + 6
            })
        );
        assert_eq!(session.phase(), ArcadePhase::LimitExceeded);
    }

    #[test]
    fn high_scores_stay_sorted_and_capped() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut scores = Vec::new();
        for score in 0..12 {
            insert_high_score(
                &mut scores,
                HighScore {
                    nickname: format!("p{score}"),
                    score,
                    date: day,
                },
            );
        }
        assert_eq!(scores.len(), MAX_HIGH_SCORES);
        assert_eq!(scores[0].score, 11);
        assert_eq!(scores[9].score, 2);
    }
}
