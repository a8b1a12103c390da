//! Troop store: the single mutable document plus write-through persistence.
//!
//! # Responsibility
//! - Load the four document parts at startup, defaulting absent ones.
//! - Expose named mutation operations; each one validates, mutates the
//!   in-memory document, then rewrites the changed parts.
//! - Keep cached point totals consistent through `service::ledger`.
//!
//! # Invariants
//! - A rejected operation leaves the document untouched.
//! - A failed write keeps the in-memory mutation and returns the storage error.
//! - Import replaces the whole document only after the input parsed.
//!
//! # See also
//! - `roster_ops`, `meeting_ops`, `trail_ops` for the remaining operations.

use crate::model::curriculum::LevelId;
use crate::model::document::TroopDocument;
use crate::model::meeting::Meeting;
use crate::model::settings::{DailyPlayTime, HighScore, ScoringTable};
use crate::repo::document_repo::{DocumentKey, DocumentRepository, RepoError};
use crate::service::access::{authenticate, ensure_approver, AccessError, Session, ROOT_USERNAME};
use crate::service::arcade::{insert_high_score, ArcadeError, ArcadeOutcome, ArcadeSession};
use crate::service::chronicle::ChronicleError;
use crate::service::leaderboard::{standings, LeaderboardMetric, LeaderboardRow};
use crate::service::progress::ProgressError;
use crate::service::signature::SignatureError;
use crate::service::transfer::{export_document, parse_export, TransferError};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error returned by troop store operations.
#[derive(Debug)]
pub enum TroopError {
    EmptyNickname,
    DuplicateNickname(String),
    EmptyPassword,
    ProfileLocked,
    MemberNotFound(String),
    MeetingNotFound(String),
    GameNotFound(String),
    TaskNotFound(String),
    LevelNotFound(String),
    AreaNotFound(String),
    SubcategoryNotFound { area_id: String, index: usize },
    ArticleNotFound(String),
    TeamNotFound(String),
    /// Team split requested for a meeting with nobody present or late.
    NoMembersPresent,
    InvalidTeamCount(usize),
    /// Stored JSON for one document part failed to parse.
    CorruptDocument {
        key: DocumentKey,
        source: serde_json::Error,
    },
    Encode {
        key: DocumentKey,
        source: serde_json::Error,
    },
    Progress(ProgressError),
    Access(AccessError),
    Chronicle(ChronicleError),
    Signature(SignatureError),
    Arcade(ArcadeError),
    Transfer(TransferError),
    Repo(RepoError),
}

impl Display for TroopError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNickname => write!(f, "nickname cannot be empty"),
            Self::DuplicateNickname(nickname) => {
                write!(f, "nickname `{nickname}` is already taken")
            }
            Self::EmptyPassword => write!(f, "password cannot be empty"),
            Self::ProfileLocked => write!(f, "profile is locked by a leader"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::MeetingNotFound(id) => write!(f, "meeting not found: {id}"),
            Self::GameNotFound(id) => write!(f, "game not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::LevelNotFound(id) => write!(f, "level not found: {id}"),
            Self::AreaNotFound(id) => write!(f, "area not found: {id}"),
            Self::SubcategoryNotFound { area_id, index } => {
                write!(f, "subcategory {index} not found in area {area_id}")
            }
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::TeamNotFound(name) => write!(f, "team not found: {name}"),
            Self::NoMembersPresent => write!(f, "nobody is present at the meeting"),
            Self::InvalidTeamCount(count) => write!(f, "invalid team count: {count}"),
            Self::CorruptDocument { key, source } => {
                write!(f, "stored `{}` document is corrupt: {source}", key.as_str())
            }
            Self::Encode { key, source } => {
                write!(f, "failed to encode `{}` document: {source}", key.as_str())
            }
            Self::Progress(err) => write!(f, "{err}"),
            Self::Access(err) => write!(f, "{err}"),
            Self::Chronicle(err) => write!(f, "{err}"),
            Self::Signature(err) => write!(f, "{err}"),
            Self::Arcade(err) => write!(f, "{err}"),
            Self::Transfer(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TroopError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CorruptDocument { source, .. } | Self::Encode { source, .. } => Some(source),
            Self::Progress(err) => Some(err),
            Self::Access(err) => Some(err),
            Self::Chronicle(err) => Some(err),
            Self::Signature(err) => Some(err),
            Self::Arcade(err) => Some(err),
            Self::Transfer(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProgressError> for TroopError {
    fn from(value: ProgressError) -> Self {
        Self::Progress(value)
    }
}

impl From<AccessError> for TroopError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<ChronicleError> for TroopError {
    fn from(value: ChronicleError) -> Self {
        Self::Chronicle(value)
    }
}

impl From<SignatureError> for TroopError {
    fn from(value: SignatureError) -> Self {
        Self::Signature(value)
    }
}

impl From<ArcadeError> for TroopError {
    fn from(value: ArcadeError) -> Self {
        Self::Arcade(value)
    }
}

impl From<TransferError> for TroopError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

impl From<RepoError> for TroopError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type TroopResult<T> = Result<T, TroopError>;

/// Store facade over a document repository.
pub struct TroopService<R: DocumentRepository> {
    pub(crate) repo: R,
    pub(crate) doc: TroopDocument,
}

impl<R: DocumentRepository> TroopService<R> {
    /// Loads every document part, defaulting the ones never written.
    pub fn open(repo: R) -> TroopResult<Self> {
        let defaults = TroopDocument::default();
        let doc = TroopDocument {
            members: load_part(&repo, DocumentKey::Roster)?.unwrap_or(defaults.members),
            games: load_part(&repo, DocumentKey::Games)?.unwrap_or(defaults.games),
            settings: load_part(&repo, DocumentKey::Settings)?.unwrap_or(defaults.settings),
            levels: load_part(&repo, DocumentKey::Levels)?.unwrap_or(defaults.levels),
        };
        info!(
            "event=document_load module=store status=ok members={} games={} meetings={} levels={}",
            doc.members.len(),
            doc.games.len(),
            doc.settings.meetings.len(),
            doc.levels.len()
        );
        Ok(Self { repo, doc })
    }

    pub fn document(&self) -> &TroopDocument {
        &self.doc
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Rewrites the given document parts.
    pub(crate) fn persist(&self, keys: &[DocumentKey]) -> TroopResult<()> {
        for &key in keys {
            let encoded = match key {
                DocumentKey::Roster => serde_json::to_string(&self.doc.members),
                DocumentKey::Games => serde_json::to_string(&self.doc.games),
                DocumentKey::Settings => serde_json::to_string(&self.doc.settings),
                DocumentKey::Levels => serde_json::to_string(&self.doc.levels),
            };
            let body = encoded.map_err(|source| TroopError::Encode { key, source })?;
            if let Err(err) = self.repo.save_document(key, &body) {
                warn!(
                    "event=document_save module=store status=error key={} error={}",
                    key.as_str(),
                    err
                );
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Resolves typed credentials against the roster and the root credential.
    pub fn login(&self, username: &str, password: &str) -> TroopResult<Session> {
        match authenticate(&self.doc.members, username, password) {
            Ok(session) => {
                info!(
                    "event=login module=store status=ok role={}",
                    session.role.as_str()
                );
                Ok(session)
            }
            Err(err) => {
                info!("event=login module=store status=rejected");
                Err(err.into())
            }
        }
    }

    pub fn set_active_level(&mut self, actor: &Session, level_id: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        if self.doc.level(level_id).is_none() {
            return Err(TroopError::LevelNotFound(level_id.to_string()));
        }
        self.doc.settings.active_level_id = level_id.to_string();
        self.persist(&[DocumentKey::Settings])
    }

    pub fn set_scoring(&mut self, actor: &Session, scoring: ScoringTable) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.doc.settings.scoring = scoring;
        self.persist(&[DocumentKey::Settings])
    }

    pub fn set_leaderboard_visibility(
        &mut self,
        actor: &Session,
        show_total: bool,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.doc.settings.show_total_leaderboard = show_total;
        self.persist(&[DocumentKey::Settings])
    }

    pub fn set_signing_secret(&mut self, actor: &Session, secret: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.doc.settings.signing_secret = secret.trim().to_string();
        self.persist(&[DocumentKey::Settings])
    }

    pub fn set_default_album_url(
        &mut self,
        actor: &Session,
        album_url: Option<String>,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.doc.settings.default_album_url = album_url;
        self.persist(&[DocumentKey::Settings])
    }

    /// A blank link clears the handbook.
    pub fn set_handbook_url(&mut self, actor: &Session, url: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.doc.settings.handbook_url = match url.trim() {
            "" => None,
            url => Some(url.to_string()),
        };
        self.persist(&[DocumentKey::Settings])
    }

    pub fn handbook_url(&self) -> Option<&str> {
        self.doc.settings.handbook_url.as_deref()
    }

    /// Display profile of the root operator.
    pub fn update_admin_profile(
        &mut self,
        actor: &Session,
        nickname: &str,
        avatar: &str,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(TroopError::EmptyNickname);
        }
        self.doc.settings.admin_profile.nickname = nickname.to_string();
        self.doc.settings.admin_profile.avatar = avatar.to_string();
        self.persist(&[DocumentKey::Settings])
    }

    /// Ranked leaderboard for one level.
    pub fn leaderboard(
        &self,
        level_id: &str,
        now: DateTime<Utc>,
        metric: LeaderboardMetric,
    ) -> Vec<LeaderboardRow> {
        standings(&self.doc, level_id, now, metric)
    }

    pub fn active_level_id(&self) -> &LevelId {
        &self.doc.settings.active_level_id
    }

    /// Earliest meeting dated at or after `now`.
    pub fn next_meeting(&self, now: DateTime<Utc>) -> Option<&Meeting> {
        self.doc
            .settings
            .meetings
            .iter()
            .filter(|meeting| meeting.date >= now)
            .min_by_key(|meeting| meeting.date)
    }

    /// Meetings dated before `now`, newest first.
    pub fn past_meetings(&self, now: DateTime<Utc>) -> Vec<&Meeting> {
        let mut past: Vec<&Meeting> = self
            .doc
            .settings
            .meetings
            .iter()
            .filter(|meeting| meeting.date < now)
            .collect();
        past.sort_by(|a, b| b.date.cmp(&a.date));
        past
    }

    /// Serializes the whole document for export.
    pub fn export(&self, now: DateTime<Utc>) -> TroopResult<String> {
        let json = export_document(&self.doc, now)?;
        info!(
            "event=export module=store status=ok bytes={}",
            json.len()
        );
        Ok(json)
    }

    /// Replaces the whole document with an export; approver only.
    pub fn import(&mut self, actor: &Session, json: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let doc = match parse_export(json) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("event=import module=store status=rejected error={}", err);
                return Err(err.into());
            }
        };
        self.doc = doc;
        info!(
            "event=import module=store status=ok members={} games={}",
            self.doc.members.len(),
            self.doc.games.len()
        );
        self.persist(&DocumentKey::ALL)
    }

    /// Opens an arcade session with the player's play time for `today`.
    ///
    /// The root operator has no daily budget.
    pub fn open_arcade(&self, player: &Session, today: NaiveDate) -> TroopResult<ArcadeSession> {
        let unlimited = player.member_id.is_none();
        let played_ms = self.doc.settings.played_ms(arcade_player_id(player), today);
        let session = ArcadeSession::new(played_ms, unlimited);
        if !unlimited && session.remaining_ms() == Some(0) {
            return Err(ArcadeError::BudgetExhausted { played_ms }.into());
        }
        Ok(session)
    }

    /// Stores accumulated play time for `today`; never lowers a stored value.
    pub fn record_play_time(
        &mut self,
        player: &Session,
        today: NaiveDate,
        played_ms: u64,
    ) -> TroopResult<()> {
        let player_id = arcade_player_id(player);
        let play_times = &mut self.doc.settings.play_times;
        match play_times
            .iter_mut()
            .find(|entry| entry.player_id == player_id && entry.day == today)
        {
            Some(entry) => entry.played_ms = entry.played_ms.max(played_ms),
            None => play_times.push(DailyPlayTime {
                player_id: player_id.to_string(),
                day: today,
                played_ms,
            }),
        }
        self.persist(&[DocumentKey::Settings])
    }

    /// Records a finished run: play time, plus the high score for crashes.
    pub fn record_arcade_outcome(
        &mut self,
        player: &Session,
        today: NaiveDate,
        outcome: ArcadeOutcome,
    ) -> TroopResult<()> {
        if let ArcadeOutcome::Crashed { score, .. } = outcome {
            if score > 0 {
                let nickname = self.display_nickname(player);
                insert_high_score(
                    &mut self.doc.settings.high_scores,
                    HighScore {
                        nickname,
                        score,
                        date: today,
                    },
                );
            }
        }
        let played_ms = match outcome {
            ArcadeOutcome::Crashed { played_ms, .. }
            | ArcadeOutcome::BudgetReached { played_ms } => played_ms,
        };
        self.record_play_time(player, today, played_ms)
    }

    /// Nickname shown for an actor; the root operator uses the admin profile.
    pub fn display_nickname(&self, actor: &Session) -> String {
        actor
            .member_id
            .as_deref()
            .and_then(|member_id| self.doc.member(member_id))
            .map(|member| member.nickname.clone())
            .unwrap_or_else(|| self.doc.settings.admin_profile.nickname.clone())
    }
}

fn arcade_player_id(player: &Session) -> &str {
    player.member_id.as_deref().unwrap_or(ROOT_USERNAME)
}

fn load_part<R: DocumentRepository, T: DeserializeOwned>(
    repo: &R,
    key: DocumentKey,
) -> TroopResult<Option<T>> {
    let Some(body) = repo.load_document(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|source| TroopError::CorruptDocument { key, source })
}
