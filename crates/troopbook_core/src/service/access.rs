//! Credential check and role-based permission rules.
//!
//! # Invariants
//! - Only `admin` may grant the `admin` role.
//! - A `leader` may not delete, promote or demote an `admin` member.
//! - A `user` never manages other members.

use crate::model::member::{Member, MemberId, Role};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Static root credential; grants `admin` without a roster entry.
pub const ROOT_USERNAME: &str = "admin";
pub const ROOT_PASSWORD: &str = "admin";

/// Authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    /// `None` for the root operator.
    pub member_id: Option<MemberId>,
}

impl Session {
    pub fn root() -> Self {
        Self {
            role: Role::Admin,
            member_id: None,
        }
    }

    pub fn member(member: &Member) -> Self {
        Self {
            role: member.role,
            member_id: Some(member.id.clone()),
        }
    }

    pub fn is_approver(&self) -> bool {
        is_approver(self.role)
    }
}

/// Action an approver performs on a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    Edit,
    Delete,
    ResetPassword,
    AssignRole(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    UnknownUser(String),
    WrongPassword,
    NotApprover,
    LeaderCannotDeleteAdmin,
    LeaderCannotGrantAdmin,
    LeaderCannotDemoteAdmin,
    NotAuthor,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(name) => write!(f, "no member with nickname `{name}`"),
            Self::WrongPassword => write!(f, "wrong password"),
            Self::NotApprover => write!(f, "action requires leader or admin role"),
            Self::LeaderCannotDeleteAdmin => write!(f, "a leader cannot delete an admin"),
            Self::LeaderCannotGrantAdmin => write!(f, "a leader cannot grant the admin role"),
            Self::LeaderCannotDemoteAdmin => write!(f, "a leader cannot demote an admin"),
            Self::NotAuthor => write!(f, "only the author or an approver may change this entry"),
        }
    }
}

impl Error for AccessError {}

/// Leaders and admins certify tasks and manage the roster.
pub fn is_approver(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Leader)
}

pub fn ensure_approver(role: Role) -> Result<(), AccessError> {
    if is_approver(role) {
        Ok(())
    } else {
        Err(AccessError::NotApprover)
    }
}

/// Checks whether `actor` may perform `action` on a member whose current
/// role is `target`.
pub fn authorize_member_action(
    actor: Role,
    target: Role,
    action: MemberAction,
) -> Result<(), AccessError> {
    match actor {
        Role::User => Err(AccessError::NotApprover),
        Role::Admin => Ok(()),
        Role::Leader => match action {
            MemberAction::Delete if target == Role::Admin => {
                Err(AccessError::LeaderCannotDeleteAdmin)
            }
            MemberAction::AssignRole(Role::Admin) if target != Role::Admin => {
                Err(AccessError::LeaderCannotGrantAdmin)
            }
            MemberAction::AssignRole(role) if target == Role::Admin && role != Role::Admin => {
                Err(AccessError::LeaderCannotDemoteAdmin)
            }
            _ => Ok(()),
        },
    }
}

/// Resolves typed credentials to a session.
///
/// The username is trimmed and compared case-insensitively; the password is
/// trimmed and compared exactly.
pub fn authenticate(
    members: &[Member],
    username: &str,
    password: &str,
) -> Result<Session, AccessError> {
    let clean_user = username.trim().to_lowercase();
    let clean_pass = password.trim();

    if clean_user == ROOT_USERNAME && clean_pass == ROOT_PASSWORD {
        return Ok(Session::root());
    }

    let member = members
        .iter()
        .find(|member| member.nickname.to_lowercase() == clean_user)
        .ok_or_else(|| AccessError::UnknownUser(username.trim().to_string()))?;

    match member.password.as_deref() {
        Some(stored) if stored == clean_pass => Ok(Session::member(member)),
        _ => Err(AccessError::WrongPassword),
    }
}
