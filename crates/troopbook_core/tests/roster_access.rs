use chrono::{Duration, TimeZone, Utc};
use troopbook_core::service::access::AccessError;
use troopbook_core::service::chronicle::ChronicleError;
use troopbook_core::service::meeting_ops::MeetingDraft;
use troopbook_core::service::roster_ops::MemberDraft;
use troopbook_core::{MemoryDocumentRepository, Role, Session, TroopError, TroopService};

fn open_store() -> TroopService<MemoryDocumentRepository> {
    TroopService::open(MemoryDocumentRepository::new()).unwrap()
}

fn draft(nickname: &str, role: Role) -> MemberDraft {
    MemberDraft {
        name: String::new(),
        nickname: nickname.to_string(),
        avatar: "🐺".to_string(),
        role,
    }
}

#[test]
fn nickname_duplicates_are_case_insensitive() {
    let mut store = open_store();
    let root = Session::root();
    let wolf = store.add_member(&root, draft("Vlk", Role::User)).unwrap();

    assert!(matches!(
        store.add_member(&root, draft(" vlk ", Role::User)),
        Err(TroopError::DuplicateNickname(_))
    ));
    assert!(matches!(
        store.add_member(&root, draft("   ", Role::User)),
        Err(TroopError::EmptyNickname)
    ));
    store
        .save_member_profile(&root, &wolf, draft("VLK", Role::User))
        .unwrap();
    assert_eq!(store.document().member(&wolf).unwrap().nickname, "VLK");
}

#[test]
fn leader_cannot_delete_admin_but_can_delete_user() {
    let mut store = open_store();
    let root = Session::root();
    store.add_member(&root, draft("Chief", Role::Leader)).unwrap();
    let admin = store.add_member(&root, draft("Boss", Role::Admin)).unwrap();
    let user = store.add_member(&root, draft("Cub", Role::User)).unwrap();
    let leader = store.login("chief", "1234").unwrap();

    assert!(matches!(
        store.delete_member(&leader, &admin),
        Err(TroopError::Access(AccessError::LeaderCannotDeleteAdmin))
    ));
    store.delete_member(&leader, &user).unwrap();
    assert!(store.document().member(&user).is_none());
    assert!(store.document().member(&admin).is_some());
}

#[test]
fn leader_cannot_grant_or_revoke_admin() {
    let mut store = open_store();
    let root = Session::root();
    store.add_member(&root, draft("Chief", Role::Leader)).unwrap();
    let admin = store.add_member(&root, draft("Boss", Role::Admin)).unwrap();
    let user = store.add_member(&root, draft("Cub", Role::User)).unwrap();
    let leader = store.login("Chief", "1234").unwrap();

    assert!(matches!(
        store.save_member_profile(&leader, &user, draft("Cub", Role::Admin)),
        Err(TroopError::Access(AccessError::LeaderCannotGrantAdmin))
    ));
    assert!(matches!(
        store.save_member_profile(&leader, &admin, draft("Boss", Role::User)),
        Err(TroopError::Access(AccessError::LeaderCannotDemoteAdmin))
    ));
    store
        .save_member_profile(&leader, &user, draft("Cub", Role::Leader))
        .unwrap();
    assert_eq!(store.document().member(&user).unwrap().role, Role::Leader);
}

#[test]
fn users_cannot_manage_members() {
    let mut store = open_store();
    store
        .add_member(&Session::root(), draft("Cub", Role::User))
        .unwrap();
    let user = store.login("cub", "1234").unwrap();

    assert!(matches!(
        store.add_member(&user, draft("Other", Role::User)),
        Err(TroopError::Access(AccessError::NotApprover))
    ));
}

#[test]
fn password_lifecycle() {
    let mut store = open_store();
    let root = Session::root();
    let cub = store.add_member(&root, draft("Cub", Role::User)).unwrap();
    assert!(store.document().member(&cub).unwrap().must_change_password);

    let session = store.login(" CUB ", " 1234 ").unwrap();
    store.change_password(&session, "  secret  ").unwrap();
    assert!(!store.document().member(&cub).unwrap().must_change_password);
    assert!(matches!(
        store.login("cub", "1234"),
        Err(TroopError::Access(AccessError::WrongPassword))
    ));
    assert!(store.login("cub", "secret").is_ok());
    assert!(matches!(
        store.change_password(&session, "   "),
        Err(TroopError::EmptyPassword)
    ));

    store.reset_password(&root, &cub).unwrap();
    assert!(store.login("cub", "1234").is_ok());
    assert!(store.document().member(&cub).unwrap().must_change_password);
}

#[test]
fn root_credential_needs_no_member_record() {
    let store = open_store();
    let session = store.login("Admin", "admin").unwrap();
    assert_eq!(session, Session::root());
    assert!(matches!(
        store.login("nobody", "1234"),
        Err(TroopError::Access(AccessError::UnknownUser(_)))
    ));
}

#[test]
fn locked_profile_rejects_self_service_edits() {
    let mut store = open_store();
    let root = Session::root();
    let cub = store.add_member(&root, draft("Cub", Role::User)).unwrap();
    store.add_member(&root, draft("Fox", Role::User)).unwrap();
    let session = store.login("cub", "1234").unwrap();

    assert!(matches!(
        store.update_own_profile(&session, "fox", "🦊"),
        Err(TroopError::DuplicateNickname(_))
    ));
    store.update_own_profile(&session, "Cubby", "🐻").unwrap();
    assert_eq!(store.document().member(&cub).unwrap().nickname, "Cubby");

    store.set_profile_lock(&root, &cub, true).unwrap();
    assert!(matches!(
        store.update_own_profile(&session, "Bear", "🐻"),
        Err(TroopError::ProfileLocked)
    ));
}

#[test]
fn articles_are_editable_by_author_or_approver_only() {
    let mut store = open_store();
    let root = Session::root();
    store.add_member(&root, draft("Cub", Role::User)).unwrap();
    store.add_member(&root, draft("Fox", Role::User)).unwrap();
    store.add_member(&root, draft("Chief", Role::Leader)).unwrap();
    let cub = store.login("cub", "1234").unwrap();
    let fox = store.login("fox", "1234").unwrap();
    let leader = store.login("chief", "1234").unwrap();
    let when = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap();
    let meeting = store
        .add_meeting(
            &root,
            MeetingDraft {
                title: Some("Hike".to_string()),
                date: when,
                notes: String::new(),
                album_url: None,
            },
        )
        .unwrap();

    assert!(matches!(
        store.add_article(&cub, &meeting, "  ok  ", when),
        Err(TroopError::Chronicle(ChronicleError::TooShort { .. }))
    ));
    let article = store
        .add_article(&cub, &meeting, "  We reached the summit.  ", when)
        .unwrap();
    let stored = &store.document().settings.meetings[0].articles[0];
    assert_eq!(stored.content, "We reached the summit.");
    assert_eq!(stored.author_nickname, "Cub");

    assert!(matches!(
        store.edit_article(&fox, &meeting, &article, "Not my story at all.", when),
        Err(TroopError::Access(AccessError::NotAuthor))
    ));
    let later = when + Duration::hours(2);
    store
        .edit_article(&cub, &meeting, &article, "We reached the summit at noon.", later)
        .unwrap();
    let edited = &store.document().settings.meetings[0].articles[0];
    assert_eq!(edited.content, "We reached the summit at noon.");
    assert_eq!(edited.timestamp, later);
    store.delete_article(&leader, &meeting, &article).unwrap();
    assert!(store.document().settings.meetings[0].articles.is_empty());
}
