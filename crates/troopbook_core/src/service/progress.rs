//! Task progress state machine.
//!
//! # Responsibility
//! - Decide member-side transitions `none -> working -> done` and withdrawals.
//! - Enforce the per-subcategory optional-task quota on activation.
//!
//! # Invariants
//! - `signed` is terminal for every member-side request.
//! - Moving into `done` requires an explicit confirmation.
//! - The quota is checked only when a task goes from `none` to active; tasks
//!   already active beyond a later-lowered goal stay active.

use crate::model::curriculum::{Subcategory, Task, TaskId};
use crate::model::member::{Member, TaskStatus};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Member-side progress request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRequest {
    /// `none -> working`, or `working -> none`.
    ToggleWorking,
    /// `none|working -> done`; `confirmed` is the second step of the UI gate.
    MarkDone { confirmed: bool },
    /// `working|done -> none`.
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    AlreadySigned(TaskId),
    ConfirmationRequired(TaskId),
    QuotaExceeded {
        subcategory: String,
        max_optional: u32,
    },
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        request: ProgressRequest,
    },
    NotSigned(TaskId),
}

impl Display for ProgressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySigned(task_id) => write!(f, "task already signed: {task_id}"),
            Self::ConfirmationRequired(task_id) => {
                write!(f, "marking task {task_id} as done requires confirmation")
            }
            Self::QuotaExceeded {
                subcategory,
                max_optional,
            } => write!(
                f,
                "subcategory `{subcategory}` allows at most {max_optional} active optional tasks"
            ),
            Self::InvalidTransition {
                task_id,
                from,
                request,
            } => write!(
                f,
                "task {task_id} cannot apply {request:?} from status {}",
                from.as_str()
            ),
            Self::NotSigned(task_id) => write!(f, "task is not signed: {task_id}"),
        }
    }
}

impl Error for ProgressError {}

/// Number of optional tasks of `sub` currently working or done for `member`.
pub fn active_optional_count(sub: &Subcategory, member: &Member) -> u32 {
    sub.tasks
        .iter()
        .filter(|task| !task.mandatory && member.task_status(&task.id).is_active())
        .count() as u32
}

/// Computes the next status for a member-side request.
pub fn plan_transition(
    sub: &Subcategory,
    task: &Task,
    member: &Member,
    request: ProgressRequest,
) -> Result<TaskStatus, ProgressError> {
    let current = member.task_status(&task.id);
    if current == TaskStatus::Signed {
        return Err(ProgressError::AlreadySigned(task.id.clone()));
    }

    let next = match (request, current) {
        (ProgressRequest::ToggleWorking, TaskStatus::None) => TaskStatus::Working,
        (ProgressRequest::ToggleWorking, TaskStatus::Working) => TaskStatus::None,
        (ProgressRequest::MarkDone { confirmed: false }, TaskStatus::None | TaskStatus::Working) => {
            return Err(ProgressError::ConfirmationRequired(task.id.clone()));
        }
        (ProgressRequest::MarkDone { confirmed: true }, TaskStatus::None | TaskStatus::Working) => {
            TaskStatus::Done
        }
        (ProgressRequest::Withdraw, TaskStatus::Working | TaskStatus::Done) => TaskStatus::None,
        (request, from) => {
            return Err(ProgressError::InvalidTransition {
                task_id: task.id.clone(),
                from,
                request,
            });
        }
    };

    if current == TaskStatus::None && next.is_active() {
        ensure_quota(sub, task, member)?;
    }
    Ok(next)
}

/// Rejects signing a task that is already signed.
pub fn ensure_signable(member: &Member, task_id: &str) -> Result<(), ProgressError> {
    if member.task_status(task_id) == TaskStatus::Signed {
        return Err(ProgressError::AlreadySigned(task_id.to_string()));
    }
    Ok(())
}

fn ensure_quota(sub: &Subcategory, task: &Task, member: &Member) -> Result<(), ProgressError> {
    if task.mandatory {
        return Ok(());
    }
    let max_optional = sub.optional_quota();
    if active_optional_count(sub, member) >= max_optional {
        return Err(ProgressError::QuotaExceeded {
            subcategory: sub.title.clone(),
            max_optional,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{plan_transition, ProgressError, ProgressRequest};
    use crate::model::curriculum::{Subcategory, Task};
    use crate::model::member::{Member, TaskStatus};

    fn task(id: &str, mandatory: bool) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            mandatory,
            points: None,
        }
    }

    fn subcategory() -> Subcategory {
        Subcategory {
            title: "Practical life".to_string(),
            goal: 3,
            tasks: vec![
                task("m1", true),
                task("o1", false),
                task("o2", false),
                task("o3", false),
            ],
        }
    }

    #[test]
    fn toggle_working_round_trips() {
        let sub = subcategory();
        let mut member = Member::new("Fox", "🦊");
        let next = plan_transition(&sub, &sub.tasks[1], &member, ProgressRequest::ToggleWorking)
            .unwrap();
        assert_eq!(next, TaskStatus::Working);
        member.set_task_status("o1", next);
        let back = plan_transition(&sub, &sub.tasks[1], &member, ProgressRequest::ToggleWorking)
            .unwrap();
        assert_eq!(back, TaskStatus::None);
    }

    #[test]
    fn done_requires_confirmation() {
        let sub = subcategory();
        let member = Member::new("Fox", "🦊");
        let err = plan_transition(
            &sub,
            &sub.tasks[1],
            &member,
            ProgressRequest::MarkDone { confirmed: false },
        )
        .unwrap_err();
        assert!(matches!(err, ProgressError::ConfirmationRequired(_)));
    }

    #[test]
    fn third_optional_activation_is_rejected_but_mandatory_is_exempt() {
        let sub = subcategory();
        let mut member = Member::new("Fox", "🦊");
        member.set_task_status("o1", TaskStatus::Working);
        member.set_task_status("o2", TaskStatus::Done);

        let err = plan_transition(&sub, &sub.tasks[3], &member, ProgressRequest::ToggleWorking)
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::QuotaExceeded {
                subcategory: "Practical life".to_string(),
                max_optional: 2,
            }
        );

        let mandatory =
            plan_transition(&sub, &sub.tasks[0], &member, ProgressRequest::ToggleWorking).unwrap();
        assert_eq!(mandatory, TaskStatus::Working);
    }

    #[test]
    fn working_to_done_skips_quota_check() {
        let mut sub = subcategory();
        let mut member = Member::new("Fox", "🦊");
        member.set_task_status("o1", TaskStatus::Working);
        member.set_task_status("o2", TaskStatus::Working);
        sub.goal = 1;

        let next = plan_transition(
            &sub,
            &sub.tasks[1],
            &member,
            ProgressRequest::MarkDone { confirmed: true },
        )
        .unwrap();
        assert_eq!(next, TaskStatus::Done);
    }

    #[test]
    fn signed_is_terminal_and_done_cannot_go_back_to_working() {
        let sub = subcategory();
        let mut member = Member::new("Fox", "🦊");
        member.set_task_status("o1", TaskStatus::Signed);
        member.set_task_status("o2", TaskStatus::Done);

        let signed = plan_transition(&sub, &sub.tasks[1], &member, ProgressRequest::Withdraw)
            .unwrap_err();
        assert!(matches!(signed, ProgressError::AlreadySigned(_)));

        let invalid = plan_transition(&sub, &sub.tasks[2], &member, ProgressRequest::ToggleWorking)
            .unwrap_err();
        assert!(matches!(invalid, ProgressError::InvalidTransition { .. }));
    }
}
