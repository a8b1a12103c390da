//! Meeting operations: attendance, teams, games, bonuses and chronicle articles.
//!
//! # Invariants
//! - Attendance credits the level active at the time of the change.
//! - Games credit their own level; team credits follow the meeting's teams at
//!   save time and are not re-evaluated when teams change later.
//! - Deleting a game or meeting reverses the credits it holds.

use crate::model::curriculum::LevelId;
use crate::model::game::{Game, GameId, GameKind, GameResult};
use crate::model::meeting::{Article, ArticleId, AttendanceStatus, Meeting, MeetingId, MeetingTeam};
use crate::model::member::MemberId;
use crate::model::new_id;
use crate::model::settings::{Bonus, BonusId};
use crate::repo::document_repo::{DocumentKey, DocumentRepository};
use crate::service::access::{ensure_approver, AccessError, Session, ROOT_USERNAME};
use crate::service::chronicle::normalize_article;
use crate::service::ledger::{attendance_delta, attendance_reward, credit, game_deltas};
use crate::service::troop_service::{TroopError, TroopResult, TroopService};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDraft {
    pub title: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: String,
    /// Falls back to the settings' default album link when unset.
    pub album_url: Option<String>,
}

/// Game as entered by an approver. `id: None` creates a new game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDraft {
    pub id: Option<GameId>,
    pub name: String,
    pub meeting_id: MeetingId,
    /// Defaults to the active level.
    pub level_id: Option<LevelId>,
    pub kind: GameKind,
    pub teams: Vec<String>,
    pub results: Vec<GameResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusDraft {
    pub member_id: MemberId,
    pub points: i64,
    pub reason: String,
    pub date: Option<DateTime<Utc>>,
    pub meeting_id: Option<MeetingId>,
    /// Defaults to the active level.
    pub level_id: Option<LevelId>,
}

const DEFAULT_BONUS_REASON: &str = "Bonus";

impl<R: DocumentRepository> TroopService<R> {
    pub fn add_meeting(&mut self, actor: &Session, draft: MeetingDraft) -> TroopResult<MeetingId> {
        ensure_approver(actor.role)?;
        let meeting = Meeting {
            id: new_id(),
            title: clean_title(draft.title),
            date: draft.date,
            notes: draft.notes,
            attendance: BTreeMap::new(),
            teams: Vec::new(),
            articles: Vec::new(),
            album_url: draft
                .album_url
                .or_else(|| self.doc.settings.default_album_url.clone()),
        };
        let meeting_id = meeting.id.clone();
        self.doc.settings.meetings.push(meeting);
        info!("event=meeting_add module=meetings status=ok");
        self.persist(&[DocumentKey::Settings])?;
        Ok(meeting_id)
    }

    /// Replaces title, date, notes and album link.
    pub fn update_meeting(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        draft: MeetingDraft,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let meeting = self.meeting_entry(meeting_id)?;
        meeting.title = clean_title(draft.title);
        meeting.date = draft.date;
        meeting.notes = draft.notes;
        meeting.album_url = draft.album_url;
        self.persist(&[DocumentKey::Settings])
    }

    /// Deletes a meeting, reversing its attendance and deleting its games.
    pub fn delete_meeting(&mut self, actor: &Session, meeting_id: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let meeting = self.meeting(meeting_id)?.clone();

        let scoring = self.doc.settings.scoring;
        let active_level = self.doc.settings.active_level_id.clone();
        let attendance_reversal: BTreeMap<MemberId, i64> = meeting
            .attendance
            .iter()
            .map(|(member_id, status)| (member_id.clone(), -attendance_reward(&scoring, *status)))
            .collect();
        self.credit_members(&active_level, &attendance_reversal);

        let games: Vec<Game> = self
            .doc
            .games
            .iter()
            .filter(|game| game.meeting_id == meeting_id)
            .cloned()
            .collect();
        for game in &games {
            let reversal = game_deltas(Some(game), None, &meeting.teams);
            self.credit_members(&game.level_id, &reversal);
        }
        self.doc.games.retain(|game| game.meeting_id != meeting_id);
        self.doc
            .settings
            .meetings
            .retain(|meeting| meeting.id != meeting_id);

        info!(
            "event=meeting_delete module=meetings status=ok games_removed={}",
            games.len()
        );
        self.persist(&[DocumentKey::Roster, DocumentKey::Games, DocumentKey::Settings])
    }

    /// Sets one member's attendance and applies the reward delta to the
    /// active level. Setting the current status again changes nothing.
    pub fn update_attendance(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        member_id: &str,
        status: AttendanceStatus,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.member(member_id)?;
        let previous = self.meeting(meeting_id)?.attendance_of(member_id);
        if previous == status {
            return Ok(());
        }

        let delta = attendance_delta(&self.doc.settings.scoring, previous, status);
        let active_level = self.doc.settings.active_level_id.clone();
        self.meeting_entry(meeting_id)?
            .attendance
            .insert(member_id.to_string(), status);
        let total = credit(self.member_entry(member_id)?, &active_level, delta);
        debug!(
            "event=attendance_update module=meetings status=ok from={} to={} delta={} total={}",
            previous.as_str(),
            status.as_str(),
            delta,
            total
        );
        self.persist(&[DocumentKey::Roster, DocumentKey::Settings])
    }

    /// Shuffles present and late members round-robin into `team_count` teams.
    pub fn randomize_teams<G: Rng + ?Sized>(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        team_count: usize,
        rng: &mut G,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        if team_count == 0 {
            return Err(TroopError::InvalidTeamCount(team_count));
        }
        let meeting = self.meeting(meeting_id)?;
        let mut on_site: Vec<MemberId> = self
            .doc
            .members
            .iter()
            .filter(|member| meeting.attendance_of(&member.id).is_on_site())
            .map(|member| member.id.clone())
            .collect();
        if on_site.is_empty() {
            return Err(TroopError::NoMembersPresent);
        }
        on_site.shuffle(rng);

        let mut teams: Vec<MeetingTeam> = (1..=team_count)
            .map(|index| MeetingTeam {
                name: format!("Team {index}"),
                members: Vec::new(),
            })
            .collect();
        for (index, member_id) in on_site.into_iter().enumerate() {
            teams[index % team_count].members.push(member_id);
        }

        self.meeting_entry(meeting_id)?.teams = teams;
        self.persist(&[DocumentKey::Settings])
    }

    /// Moves a member out of every team of the meeting into `target_team`.
    pub fn move_member_between_teams(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        member_id: &str,
        target_team: &str,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let meeting = self.meeting_entry(meeting_id)?;
        if !meeting.teams.iter().any(|team| team.name == target_team) {
            return Err(TroopError::TeamNotFound(target_team.to_string()));
        }
        for team in &mut meeting.teams {
            team.members.retain(|id| id != member_id);
            if team.name == target_team {
                team.members.push(member_id.to_string());
            }
        }
        self.persist(&[DocumentKey::Settings])
    }

    /// Creates or replaces a game and applies the per-member point deltas.
    pub fn save_game(&mut self, actor: &Session, draft: GameDraft) -> TroopResult<GameId> {
        ensure_approver(actor.role)?;
        let teams = self.meeting(&draft.meeting_id)?.teams.clone();
        let level_id = draft
            .level_id
            .unwrap_or_else(|| self.doc.settings.active_level_id.clone());
        if self.doc.level(&level_id).is_none() {
            return Err(TroopError::LevelNotFound(level_id));
        }
        let previous = match draft.id.as_deref() {
            Some(game_id) => Some(
                self.doc
                    .game(game_id)
                    .cloned()
                    .ok_or_else(|| TroopError::GameNotFound(game_id.to_string()))?,
            ),
            None => None,
        };

        let game = Game {
            id: draft.id.unwrap_or_else(new_id),
            name: draft.name,
            meeting_id: draft.meeting_id,
            level_id,
            kind: draft.kind,
            teams: draft.teams,
            results: draft.results,
        };

        // Moving a game to another level or meeting reverses the old credit in
        // full before crediting the new one.
        match previous.as_ref() {
            Some(old)
                if old.level_id != game.level_id || old.meeting_id != game.meeting_id =>
            {
                let old_teams = self.meeting_teams(&old.meeting_id);
                let reversal = game_deltas(Some(old), None, &old_teams);
                self.credit_members(&old.level_id, &reversal);
                let deltas = game_deltas(None, Some(&game), &teams);
                self.credit_members(&game.level_id, &deltas);
            }
            _ => {
                let deltas = game_deltas(previous.as_ref(), Some(&game), &teams);
                self.credit_members(&game.level_id, &deltas);
            }
        }

        let game_id = game.id.clone();
        match self.doc.games.iter_mut().find(|existing| existing.id == game_id) {
            Some(existing) => *existing = game,
            None => self.doc.games.push(game),
        }
        info!(
            "event=game_save module=meetings status=ok created={}",
            previous.is_none()
        );
        self.persist(&[DocumentKey::Roster, DocumentKey::Games])?;
        Ok(game_id)
    }

    /// Deletes a game and reverses its credits under the current teams.
    pub fn delete_game(&mut self, actor: &Session, game_id: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let game = self
            .doc
            .game(game_id)
            .cloned()
            .ok_or_else(|| TroopError::GameNotFound(game_id.to_string()))?;
        let teams = self.meeting_teams(&game.meeting_id);
        let reversal = game_deltas(Some(&game), None, &teams);
        self.credit_members(&game.level_id, &reversal);
        self.doc.games.retain(|existing| existing.id != game_id);
        self.persist(&[DocumentKey::Roster, DocumentKey::Games])
    }

    /// Grants an ad-hoc bonus. Bonuses are never reversed.
    pub fn grant_bonus(&mut self, actor: &Session, draft: BonusDraft) -> TroopResult<BonusId> {
        ensure_approver(actor.role)?;
        self.member(&draft.member_id)?;
        if let Some(meeting_id) = draft.meeting_id.as_deref() {
            self.meeting(meeting_id)?;
        }
        let level_id = draft
            .level_id
            .unwrap_or_else(|| self.doc.settings.active_level_id.clone());
        let reason = match draft.reason.trim() {
            "" => DEFAULT_BONUS_REASON.to_string(),
            reason => reason.to_string(),
        };

        let total = credit(self.member_entry(&draft.member_id)?, &level_id, draft.points);
        let bonus = Bonus {
            id: new_id(),
            member_id: draft.member_id,
            points: draft.points,
            reason,
            date: draft.date,
            meeting_id: draft.meeting_id,
            level_id,
        };
        let bonus_id = bonus.id.clone();
        self.doc.settings.bonuses.push(bonus);
        debug!(
            "event=bonus_grant module=meetings status=ok points={} total={}",
            draft.points, total
        );
        self.persist(&[DocumentKey::Roster, DocumentKey::Settings])?;
        Ok(bonus_id)
    }

    /// Adds a chronicle article authored by `author`.
    pub fn add_article(
        &mut self,
        author: &Session,
        meeting_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> TroopResult<ArticleId> {
        let content = normalize_article(content)?;
        self.meeting(meeting_id)?;
        let article = Article {
            id: new_id(),
            author_id: author
                .member_id
                .clone()
                .unwrap_or_else(|| ROOT_USERNAME.to_string()),
            author_nickname: self.display_nickname(author),
            content,
            timestamp: now,
        };
        let article_id = article.id.clone();
        self.meeting_entry(meeting_id)?.articles.push(article);
        self.persist(&[DocumentKey::Settings])?;
        Ok(article_id)
    }

    pub fn edit_article(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        article_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> TroopResult<()> {
        let content = normalize_article(content)?;
        let article = self.article_entry(actor, meeting_id, article_id)?;
        article.content = content;
        article.timestamp = now;
        self.persist(&[DocumentKey::Settings])
    }

    pub fn delete_article(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        article_id: &str,
    ) -> TroopResult<()> {
        self.article_entry(actor, meeting_id, article_id)?;
        self.meeting_entry(meeting_id)?
            .articles
            .retain(|article| article.id != article_id);
        self.persist(&[DocumentKey::Settings])
    }

    pub(crate) fn meeting(&self, meeting_id: &str) -> TroopResult<&Meeting> {
        self.doc
            .settings
            .meeting(meeting_id)
            .ok_or_else(|| TroopError::MeetingNotFound(meeting_id.to_string()))
    }

    /// Current teams of a meeting; a deleted meeting has none.
    fn meeting_teams(&self, meeting_id: &str) -> Vec<MeetingTeam> {
        self.doc
            .settings
            .meeting(meeting_id)
            .map(|meeting| meeting.teams.clone())
            .unwrap_or_default()
    }

    fn meeting_entry(&mut self, meeting_id: &str) -> TroopResult<&mut Meeting> {
        self.doc
            .settings
            .meeting_mut(meeting_id)
            .ok_or_else(|| TroopError::MeetingNotFound(meeting_id.to_string()))
    }

    /// Article lookup restricted to its author and approvers.
    fn article_entry(
        &mut self,
        actor: &Session,
        meeting_id: &str,
        article_id: &str,
    ) -> TroopResult<&mut Article> {
        let article = self
            .meeting_entry(meeting_id)?
            .articles
            .iter_mut()
            .find(|article| article.id == article_id)
            .ok_or_else(|| TroopError::ArticleNotFound(article_id.to_string()))?;
        let is_author = actor.member_id.as_deref() == Some(article.author_id.as_str());
        if !is_author && !actor.is_approver() {
            return Err(AccessError::NotAuthor.into());
        }
        Ok(article)
    }

    /// Applies deltas to members of the roster; unknown ids are skipped.
    pub(crate) fn credit_members(&mut self, level_id: &str, deltas: &BTreeMap<MemberId, i64>) {
        for (member_id, delta) in deltas {
            if let Some(member) = self.doc.member_mut(member_id) {
                credit(member, level_id, *delta);
            }
        }
    }
}

fn clean_title(title: Option<String>) -> Option<String> {
    title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}
