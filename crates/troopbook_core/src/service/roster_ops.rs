//! Roster operations: member CRUD, credentials and self-service profile edits.

use crate::model::member::{Member, MemberId, Role, DEFAULT_PASSWORD};
use crate::repo::document_repo::{DocumentKey, DocumentRepository};
use crate::service::access::{
    authorize_member_action, ensure_approver, MemberAction, Session, ROOT_USERNAME,
};
use crate::service::troop_service::{TroopError, TroopResult, TroopService};
use log::info;

/// Editable member fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub name: String,
    pub nickname: String,
    pub avatar: String,
    pub role: Role,
}

impl<R: DocumentRepository> TroopService<R> {
    /// Adds a member with the default password; approver only.
    pub fn add_member(&mut self, actor: &Session, draft: MemberDraft) -> TroopResult<MemberId> {
        authorize_member_action(actor.role, Role::User, MemberAction::Edit)?;
        if draft.role != Role::User {
            authorize_member_action(actor.role, Role::User, MemberAction::AssignRole(draft.role))?;
        }
        let nickname = self.checked_nickname(&draft.nickname, None)?;

        let mut member = Member::new(nickname, draft.avatar);
        member.role = draft.role;
        if !draft.name.trim().is_empty() {
            member.name = draft.name.trim().to_string();
        }
        let member_id = member.id.clone();
        self.doc.members.push(member);
        info!(
            "event=member_add module=roster status=ok role={}",
            draft.role.as_str()
        );
        self.persist(&[DocumentKey::Roster])?;
        Ok(member_id)
    }

    /// Saves name, nickname, avatar and role of an existing member.
    pub fn save_member_profile(
        &mut self,
        actor: &Session,
        member_id: &str,
        draft: MemberDraft,
    ) -> TroopResult<()> {
        let current_role = self.member_role(member_id)?;
        authorize_member_action(actor.role, current_role, MemberAction::Edit)?;
        if draft.role != current_role {
            authorize_member_action(actor.role, current_role, MemberAction::AssignRole(draft.role))?;
        }
        let nickname = self.checked_nickname(&draft.nickname, Some(member_id))?;

        let member = self.member_entry(member_id)?;
        member.nickname = nickname;
        member.avatar = draft.avatar;
        member.role = draft.role;
        if !draft.name.trim().is_empty() {
            member.name = draft.name.trim().to_string();
        }
        self.persist(&[DocumentKey::Roster])
    }

    pub fn delete_member(&mut self, actor: &Session, member_id: &str) -> TroopResult<()> {
        let target = self.member_role(member_id)?;
        authorize_member_action(actor.role, target, MemberAction::Delete)?;
        self.doc.members.retain(|member| member.id != member_id);
        info!("event=member_delete module=roster status=ok");
        self.persist(&[DocumentKey::Roster])
    }

    /// Restores the default password and forces a change on next login.
    pub fn reset_password(&mut self, actor: &Session, member_id: &str) -> TroopResult<()> {
        let target = self.member_role(member_id)?;
        authorize_member_action(actor.role, target, MemberAction::ResetPassword)?;
        let member = self.member_entry(member_id)?;
        member.password = Some(DEFAULT_PASSWORD.to_string());
        member.must_change_password = true;
        self.persist(&[DocumentKey::Roster])
    }

    pub fn set_profile_lock(
        &mut self,
        actor: &Session,
        member_id: &str,
        locked: bool,
    ) -> TroopResult<()> {
        ensure_approver(actor.role)?;
        self.member_entry(member_id)?.is_profile_locked = locked;
        self.persist(&[DocumentKey::Roster])
    }

    /// Member-side nickname and avatar edit.
    pub fn update_own_profile(
        &mut self,
        session: &Session,
        nickname: &str,
        avatar: &str,
    ) -> TroopResult<()> {
        let member_id = session_member_id(session)?;
        if self.member(member_id)?.is_profile_locked {
            return Err(TroopError::ProfileLocked);
        }
        let nickname = self.checked_nickname(nickname, Some(member_id))?;
        let member = self.member_entry(member_id)?;
        member.nickname = nickname;
        member.avatar = avatar.to_string();
        self.persist(&[DocumentKey::Roster])
    }

    pub fn change_password(&mut self, session: &Session, new_password: &str) -> TroopResult<()> {
        let member_id = session_member_id(session)?;
        let password = new_password.trim();
        if password.is_empty() {
            return Err(TroopError::EmptyPassword);
        }
        let member = self.member_entry(member_id)?;
        member.password = Some(password.to_string());
        member.must_change_password = false;
        self.persist(&[DocumentKey::Roster])
    }

    pub(crate) fn member(&self, member_id: &str) -> TroopResult<&Member> {
        self.doc
            .member(member_id)
            .ok_or_else(|| TroopError::MemberNotFound(member_id.to_string()))
    }

    pub(crate) fn member_entry(&mut self, member_id: &str) -> TroopResult<&mut Member> {
        self.doc
            .member_mut(member_id)
            .ok_or_else(|| TroopError::MemberNotFound(member_id.to_string()))
    }

    fn member_role(&self, member_id: &str) -> TroopResult<Role> {
        self.member(member_id).map(|member| member.role)
    }

    /// Trimmed nickname, rejected when empty or taken by another member.
    fn checked_nickname(&self, nickname: &str, except: Option<&str>) -> TroopResult<String> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(TroopError::EmptyNickname);
        }
        if self.doc.nickname_taken(nickname, except) {
            return Err(TroopError::DuplicateNickname(nickname.to_string()));
        }
        Ok(nickname.to_string())
    }
}

pub(crate) fn session_member_id(session: &Session) -> TroopResult<&str> {
    session
        .member_id
        .as_deref()
        .ok_or_else(|| TroopError::MemberNotFound(ROOT_USERNAME.to_string()))
}
