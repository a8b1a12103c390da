use chrono::{DateTime, Duration, TimeZone, Utc};
use troopbook_core::service::progress::{ProgressError, ProgressRequest};
use troopbook_core::service::roster_ops::MemberDraft;
use troopbook_core::service::signature::signature_payload;
use troopbook_core::service::trail_ops::TaskDraft;
use troopbook_core::{MemoryDocumentRepository, Role, Session, TaskStatus, TroopError, TroopService};

const LEVEL: &str = "earth";

struct Trail {
    store: TroopService<MemoryDocumentRepository>,
    area_id: String,
    mandatory: String,
    optional: Vec<String>,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap()
}

/// One subcategory with goal 3, one mandatory and four optional tasks.
fn trail() -> Trail {
    let root = Session::root();
    let mut store = TroopService::open(MemoryDocumentRepository::new()).unwrap();
    let area_id = store.add_area(&root, LEVEL, "Camp", "⛺").unwrap();
    store
        .add_subcategory(&root, LEVEL, &area_id, "Fire", 3)
        .unwrap();

    let mut add = |title: &str, mandatory: bool| {
        store
            .add_task(
                &root,
                LEVEL,
                &area_id,
                0,
                TaskDraft {
                    title: title.to_string(),
                    description: String::new(),
                    mandatory,
                    points: None,
                },
            )
            .unwrap()
    };
    let mandatory = add("Fire safety", true);
    let optional = vec![
        add("Tepee fire", false),
        add("Log cabin fire", false),
        add("Star fire", false),
        add("Fire without matches", false),
    ];
    Trail {
        store,
        area_id,
        mandatory,
        optional,
    }
}

fn login_new_member(store: &mut TroopService<MemoryDocumentRepository>, nickname: &str) -> Session {
    store
        .add_member(
            &Session::root(),
            MemberDraft {
                name: String::new(),
                nickname: nickname.to_string(),
                avatar: "🦉".to_string(),
                role: Role::User,
            },
        )
        .unwrap();
    store.login(nickname, "1234").unwrap()
}

#[test]
fn optional_quota_blocks_third_activation() {
    let Trail {
        mut store,
        mandatory,
        optional,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");

    store
        .update_task_progress(&owl, &optional[0], ProgressRequest::ToggleWorking)
        .unwrap();
    store
        .update_task_progress(&owl, &optional[1], ProgressRequest::MarkDone { confirmed: true })
        .unwrap();
    let err = store
        .update_task_progress(&owl, &optional[2], ProgressRequest::ToggleWorking)
        .unwrap_err();
    assert!(matches!(
        err,
        TroopError::Progress(ProgressError::QuotaExceeded { max_optional: 2, .. })
    ));

    assert_eq!(
        store
            .update_task_progress(&owl, &mandatory, ProgressRequest::ToggleWorking)
            .unwrap(),
        TaskStatus::Working
    );

    store
        .update_task_progress(&owl, &optional[0], ProgressRequest::ToggleWorking)
        .unwrap();
    assert_eq!(
        store
            .update_task_progress(&owl, &optional[2], ProgressRequest::ToggleWorking)
            .unwrap(),
        TaskStatus::Working
    );
}

#[test]
fn signed_optional_tasks_do_not_count_against_quota() {
    let Trail {
        mut store,
        optional,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    let payload = signature_payload(&store.document().settings.signing_secret, now());

    for task in &optional[..2] {
        store
            .update_task_progress(&owl, task, ProgressRequest::ToggleWorking)
            .unwrap();
        store
            .sign_task_with_code(&owl, task, &payload, now())
            .unwrap();
    }
    assert!(store
        .update_task_progress(&owl, &optional[2], ProgressRequest::ToggleWorking)
        .is_ok());
}

#[test]
fn lowering_goal_keeps_already_active_tasks() {
    let Trail {
        mut store,
        area_id,
        optional,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    for task in &optional[..2] {
        store
            .update_task_progress(&owl, task, ProgressRequest::ToggleWorking)
            .unwrap();
    }

    store
        .update_subcategory(&Session::root(), LEVEL, &area_id, 0, "Fire", 1)
        .unwrap();

    let member_id = owl.member_id.clone().unwrap();
    let member = store.document().member(&member_id).unwrap();
    assert_eq!(member.task_status(&optional[0]), TaskStatus::Working);
    assert_eq!(member.task_status(&optional[1]), TaskStatus::Working);
    assert!(store
        .update_task_progress(&owl, &optional[2], ProgressRequest::ToggleWorking)
        .is_err());
}

#[test]
fn done_requires_confirmation_and_unlisted_transitions_fail() {
    let Trail {
        mut store,
        mandatory,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");

    assert!(matches!(
        store.update_task_progress(&owl, &mandatory, ProgressRequest::MarkDone { confirmed: false }),
        Err(TroopError::Progress(ProgressError::ConfirmationRequired(_)))
    ));
    store
        .update_task_progress(&owl, &mandatory, ProgressRequest::MarkDone { confirmed: true })
        .unwrap();
    assert!(matches!(
        store.update_task_progress(&owl, &mandatory, ProgressRequest::ToggleWorking),
        Err(TroopError::Progress(ProgressError::InvalidTransition { .. }))
    ));
    assert_eq!(
        store
            .update_task_progress(&owl, &mandatory, ProgressRequest::Withdraw)
            .unwrap(),
        TaskStatus::None
    );
}

#[test]
fn signed_task_is_terminal_for_member() {
    let Trail {
        mut store,
        mandatory,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    let payload = signature_payload(&store.document().settings.signing_secret, now());

    let total = store
        .sign_task_with_code(&owl, &mandatory, &payload, now())
        .unwrap();
    assert_eq!(total, 10);

    assert!(matches!(
        store.update_task_progress(&owl, &mandatory, ProgressRequest::Withdraw),
        Err(TroopError::Progress(ProgressError::AlreadySigned(_)))
    ));
    assert!(matches!(
        store.sign_task_with_code(&owl, &mandatory, &payload, now()),
        Err(TroopError::Progress(ProgressError::AlreadySigned(_)))
    ));
}

#[test]
fn scanned_code_checks_secret_prefix_only() {
    let Trail {
        mut store,
        mandatory,
        optional,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    let secret = store.document().settings.signing_secret.clone();

    assert!(matches!(
        store.sign_task_with_code(&owl, &mandatory, "SOMETHING-ELSE-1", now()),
        Err(TroopError::Signature(_))
    ));

    let stale = signature_payload(&secret, now() - Duration::days(90));
    assert!(store
        .sign_task_with_code(&owl, &optional[0], &stale, now())
        .is_ok());
}

#[test]
fn bulk_sign_skips_members_already_signed() {
    let Trail {
        mut store,
        mandatory,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    let fox = login_new_member(&mut store, "Fox");
    let owl_id = owl.member_id.clone().unwrap();
    let fox_id = fox.member_id.clone().unwrap();
    let root = Session::root();

    store
        .toggle_task_signature(&root, &owl_id, &mandatory, now())
        .unwrap();
    let signed = store
        .bulk_sign_task(&root, &mandatory, &[owl_id.clone(), fox_id.clone()], now())
        .unwrap();

    assert_eq!(signed, 1);
    let doc = store.document();
    assert_eq!(doc.member(&owl_id).unwrap().level_points(LEVEL), 10);
    assert_eq!(doc.member(&fox_id).unwrap().level_points(LEVEL), 10);
}

#[test]
fn members_cannot_toggle_signatures() {
    let Trail {
        mut store,
        mandatory,
        ..
    } = trail();
    let owl = login_new_member(&mut store, "Owl");
    let owl_id = owl.member_id.clone().unwrap();

    assert!(matches!(
        store.toggle_task_signature(&owl, &owl_id, &mandatory, now()),
        Err(TroopError::Access(_))
    ));
}
