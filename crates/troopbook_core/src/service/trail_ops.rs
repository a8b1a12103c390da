//! Trail operations: curriculum editing and task progress/signing.
//!
//! # Invariants
//! - Signing credits the level owning the task and stamps the completion time.
//! - Unsigning (approver toggle only) reverses the reward and clears the stamp.

use crate::model::curriculum::{Area, AreaId, Level, LevelId, Subcategory, Task, TaskId};
use crate::model::document::TaskRef;
use crate::model::member::{MemberId, TaskStatus};
use crate::model::new_id;
use crate::repo::document_repo::{DocumentKey, DocumentRepository};
use crate::service::access::{ensure_approver, Session};
use crate::service::ledger::{credit, task_reward};
use crate::service::progress::{ensure_signable, plan_transition, ProgressError, ProgressRequest};
use crate::service::roster_ops::session_member_id;
use crate::service::signature::{accepts_scanned_payload, SignatureError};
use crate::service::troop_service::{TroopError, TroopResult, TroopService};
use chrono::{DateTime, Utc};
use log::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub mandatory: bool,
    pub points: Option<u32>,
}

impl<R: DocumentRepository> TroopService<R> {
    pub fn add_level(
        &mut self,
        actor: &Session,
        name: &str,
        color: &str,
        icon: &str,
    ) -> TroopResult<LevelId> {
        ensure_approver(actor.role)?;
        let level = Level {
            id: new_id(),
            name: name.trim().to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            areas: Vec::new(),
        };
        let level_id = level.id.clone();
        self.doc.levels.push(level);
        self.persist(&[DocumentKey::Levels])?;
        Ok(level_id)
    }

    pub fn add_area(
        &mut self,
        actor: &Session,
        level_id: &str,
        title: &str,
        icon: &str,
    ) -> TroopResult<AreaId> {
        ensure_approver(actor.role)?;
        let area = Area {
            id: new_id(),
            title: title.trim().to_string(),
            icon: icon.to_string(),
            subcategories: Vec::new(),
        };
        let area_id = area.id.clone();
        self.level_entry(level_id)?.areas.push(area);
        self.persist(&[DocumentKey::Levels])?;
        Ok(area_id)
    }

    pub fn update_area(
        &mut self,
        actor: &Session,
        level_id: &str,
        area_id: &str,
        title: &str,
        icon: &str,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let area = self.area_entry(level_id, area_id)?;
        area.title = title.trim().to_string();
        area.icon = icon.to_string();
        self.persist(&[DocumentKey::Levels])
    }

    pub fn delete_area(&mut self, actor: &Session, level_id: &str, area_id: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let level = self.level_entry(level_id)?;
        let before = level.areas.len();
        level.areas.retain(|area| area.id != area_id);
        if level.areas.len() == before {
            return Err(TroopError::AreaNotFound(area_id.to_string()));
        }
        self.persist(&[DocumentKey::Levels])
    }

    /// Appends a subcategory and returns its index within the area.
    pub fn add_subcategory(
        &mut self,
        actor: &Session,
        level_id: &str,
        area_id: &str,
        title: &str,
        goal: u32,
    ) -> TroopResult<usize> {
        ensure_approver(actor.role)?;
        let area = self.area_entry(level_id, area_id)?;
        area.subcategories.push(Subcategory {
            title: title.trim().to_string(),
            goal,
            tasks: Vec::new(),
        });
        let index = area.subcategories.len() - 1;
        self.persist(&[DocumentKey::Levels])?;
        Ok(index)
    }

    /// Renames a subcategory and sets its goal. Tasks already active beyond
    /// a lowered goal stay active.
    pub fn update_subcategory(
        &mut self,
        actor: &Session,
        level_id: &str,
        area_id: &str,
        index: usize,
        title: &str,
        goal: u32,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let sub = self.subcategory_entry(level_id, area_id, index)?;
        sub.title = title.trim().to_string();
        sub.goal = goal;
        self.persist(&[DocumentKey::Levels])
    }

    pub fn delete_subcategory(
        &mut self,
        actor: &Session,
        level_id: &str,
        area_id: &str,
        index: usize,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.subcategory_entry(level_id, area_id, index)?;
        self.area_entry(level_id, area_id)?
            .subcategories
            .remove(index);
        self.persist(&[DocumentKey::Levels])
    }

    pub fn add_task(
        &mut self,
        actor: &Session,
        level_id: &str,
        area_id: &str,
        index: usize,
        draft: TaskDraft,
    ) -> TroopResult<TaskId> {
        ensure_approver(actor.role)?;
        let task = Task {
            id: new_id(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            mandatory: draft.mandatory,
            points: draft.points,
        };
        let task_id = task.id.clone();
        self.subcategory_entry(level_id, area_id, index)?
            .tasks
            .push(task);
        self.persist(&[DocumentKey::Levels])?;
        Ok(task_id)
    }

    pub fn update_task(&mut self, actor: &Session, task_id: &str, draft: TaskDraft) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let task = self
            .doc
            .levels
            .iter_mut()
            .flat_map(|level| level.areas.iter_mut())
            .flat_map(|area| area.subcategories.iter_mut())
            .flat_map(|sub| sub.tasks.iter_mut())
            .find(|task| task.id == task_id)
            .ok_or_else(|| TroopError::TaskNotFound(task_id.to_string()))?;
        task.title = draft.title.trim().to_string();
        task.description = draft.description;
        task.mandatory = draft.mandatory;
        task.points = draft.points;
        self.persist(&[DocumentKey::Levels])
    }

    /// Removes a task from the curriculum. Member progress and points stay.
    pub fn delete_task(&mut self, actor: &Session, task_id: &str) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        let sub = self
            .doc
            .levels
            .iter_mut()
            .flat_map(|level| level.areas.iter_mut())
            .flat_map(|area| area.subcategories.iter_mut())
            .find(|sub| sub.contains_task(task_id))
            .ok_or_else(|| TroopError::TaskNotFound(task_id.to_string()))?;
        sub.tasks.retain(|task| task.id != task_id);
        self.persist(&[DocumentKey::Levels])
    }

    /// Member-side progress change on one of the member's own tasks.
    pub fn update_task_progress(
        &mut self,
        session: &Session,
        task_id: &str,
        request: ProgressRequest,
    ) -> TroopResult<TaskStatus> {
        let member_id = session_member_id(session)?;
        let task_ref = self.task_ref(task_id)?;
        let next = plan_transition(
            &task_ref.subcategory,
            &task_ref.task,
            self.member(member_id)?,
            request,
        )?;
        self.member_entry(member_id)?.set_task_status(task_id, next);
        debug!(
            "event=task_progress module=trail status=ok to={}",
            next.as_str()
        );
        self.persist(&[DocumentKey::Roster])?;
        Ok(next)
    }

    /// Signs the member's own task with a scanned approver code.
    pub fn sign_task_with_code(
        &mut self,
        session: &Session,
        task_id: &str,
        scanned: &str,
        now: DateTime<Utc>,
    ) -> TroopResult<u64> {
        let member_id = session_member_id(session)?.to_string();
        let task_ref = self.task_ref(task_id)?;
        if !accepts_scanned_payload(&self.doc.settings.signing_secret, scanned) {
            info!("event=task_sign module=trail status=rejected source=code");
            return Err(SignatureError::UnrecognizedPayload.into());
        }
        let total = self.sign(&member_id, &task_ref, now)?;
        info!("event=task_sign module=trail status=ok source=code");
        self.persist(&[DocumentKey::Roster])?;
        Ok(total)
    }

    /// Approver toggle: signs an unsigned task or unsigns a signed one.
    pub fn toggle_task_signature(
        &mut self,
        actor: &Session,
        member_id: &str,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> TroopResult<TaskStatus> {
        ensure_approver(actor.role)?;
        let task_ref = self.task_ref(task_id)?;
        let status = if self.member(member_id)?.task_status(task_id) == TaskStatus::Signed {
            self.unsign(member_id, &task_ref)?;
            TaskStatus::None
        } else {
            self.sign(member_id, &task_ref, now)?;
            TaskStatus::Signed
        };
        info!(
            "event=task_toggle module=trail status=ok to={}",
            status.as_str()
        );
        self.persist(&[DocumentKey::Roster])?;
        Ok(status)
    }

    /// Signs one task for several members; already signed members are
    /// skipped. Returns how many members were newly signed.
    pub fn bulk_sign_task(
        &mut self,
        actor: &Session,
        task_id: &str,
        member_ids: &[MemberId],
        now: DateTime<Utc>,
    ) -> TroopResult<usize> {
        ensure_approver(actor.role)?;
        let task_ref = self.task_ref(task_id)?;
        for member_id in member_ids {
            self.member(member_id)?;
        }

        let mut signed = 0;
        for member_id in member_ids {
            match self.sign(member_id, &task_ref, now) {
                Ok(_) => signed += 1,
                Err(TroopError::Progress(ProgressError::AlreadySigned(_))) => {}
                Err(err) => return Err(err),
            }
        }
        info!(
            "event=task_bulk_sign module=trail status=ok requested={} signed={}",
            member_ids.len(),
            signed
        );
        self.persist(&[DocumentKey::Roster])?;
        Ok(signed)
    }

    fn sign(&mut self, member_id: &str, task_ref: &TaskRef, now: DateTime<Utc>) -> TroopResult<u64> {
        let reward = task_reward(&self.doc.settings.scoring, &task_ref.task);
        let member = self.member_entry(member_id)?;
        ensure_signable(member, &task_ref.task.id)?;
        member.set_task_status(&task_ref.task.id, TaskStatus::Signed);
        member
            .task_completed_at
            .insert(task_ref.task.id.clone(), now);
        Ok(credit(member, &task_ref.level_id, reward))
    }

    fn unsign(&mut self, member_id: &str, task_ref: &TaskRef) -> TroopResult<u64> {
        let reward = task_reward(&self.doc.settings.scoring, &task_ref.task);
        let member = self.member_entry(member_id)?;
        if member.task_status(&task_ref.task.id) != TaskStatus::Signed {
            return Err(ProgressError::NotSigned(task_ref.task.id.clone()).into());
        }
        member.set_task_status(&task_ref.task.id, TaskStatus::None);
        member.task_completed_at.remove(&task_ref.task.id);
        Ok(credit(member, &task_ref.level_id, -reward))
    }

    fn task_ref(&self, task_id: &str) -> TroopResult<TaskRef> {
        self.doc
            .find_task(task_id)
            .ok_or_else(|| TroopError::TaskNotFound(task_id.to_string()))
    }

    fn level_entry(&mut self, level_id: &str) -> TroopResult<&mut Level> {
        self.doc
            .level_mut(level_id)
            .ok_or_else(|| TroopError::LevelNotFound(level_id.to_string()))
    }

    fn area_entry(&mut self, level_id: &str, area_id: &str) -> TroopResult<&mut Area> {
        self.level_entry(level_id)?
            .area_mut(area_id)
            .ok_or_else(|| TroopError::AreaNotFound(area_id.to_string()))
    }

    fn subcategory_entry(
        &mut self,
        level_id: &str,
        area_id: &str,
        index: usize,
    ) -> TroopResult<&mut Subcategory> {
        self.area_entry(level_id, area_id)?
            .subcategories
            .get_mut(index)
            .ok_or_else(|| TroopError::SubcategoryNotFound {
                area_id: area_id.to_string(),
                index,
            })
    }
}
