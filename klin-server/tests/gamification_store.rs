use chrono::NaiveDate;
use klin_server::storage::{StorageError, Store, TaskSpec};
use klin_shared::auth::MemberRole;
use klin_shared::domain::{self, Recurrence};

struct Fixture {
    store: Store,
    _tempdir: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("store.db");
    let store = Store::connect_sqlite(db.to_str().unwrap()).await.unwrap();
    store.seed_badges(&domain::default_badges()).await.unwrap();
    Fixture {
        store,
        _tempdir: dir,
    }
}

async fn user(store: &Store, email: &str, name: &str) -> String {
    store
        .create_user(email, name, "not-a-real-hash", "UTC")
        .await
        .unwrap()
        .id
}

async fn household_with_admin(store: &Store) -> (String, String) {
    let admin = user(store, "ann@example.com", "Ann").await;
    let h = store.create_household(&admin, "Flat 4").await.unwrap();
    (h.id, admin)
}

#[tokio::test]
async fn points_start_at_zero_and_accumulate() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;

    assert_eq!(f.store.get_points(&hid, &uid).await.unwrap(), 0);
    assert_eq!(f.store.add_points(&hid, &uid, 5).await.unwrap(), 5);
    assert_eq!(f.store.add_points(&hid, &uid, 3).await.unwrap(), 8);
    assert_eq!(f.store.add_points(&hid, &uid, -2).await.unwrap(), 6);
    assert_eq!(f.store.get_points(&hid, &uid).await.unwrap(), 6);

    assert!(matches!(
        f.store.add_points(&hid, &uid, 0).await,
        Err(StorageError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn overflowing_point_total_is_rejected() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;

    assert_eq!(f.store.add_points(&hid, &uid, i64::MAX).await.unwrap(), i64::MAX);
    assert!(matches!(
        f.store.add_points(&hid, &uid, 1).await,
        Err(StorageError::InvalidInput(msg)) if msg == "points total out of range"
    ));
    assert_eq!(f.store.get_points(&hid, &uid).await.unwrap(), i64::MAX);

    assert_eq!(f.store.add_points(&hid, &uid, -1).await.unwrap(), i64::MAX - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_point_additions_are_not_lost() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = f.store.clone();
        let hid = hid.clone();
        let uid = uid.clone();
        handles.push(tokio::spawn(async move {
            store.add_points(&hid, &uid, 5).await.unwrap()
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(f.store.get_points(&hid, &uid).await.unwrap(), 80);
}

#[tokio::test]
async fn streak_increments_breaks_and_restarts() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;

    assert!(f.store.get_streak(&hid, &uid).await.unwrap().is_none());
    assert!(f.store.break_streak(&hid, &uid).await.unwrap().is_none());

    assert_eq!(f.store.increment_streak(&hid, &uid).await.unwrap(), 1);
    assert_eq!(f.store.increment_streak(&hid, &uid).await.unwrap(), 2);

    let broken = f.store.break_streak(&hid, &uid).await.unwrap().unwrap();
    assert!(!broken.is_active);
    assert_eq!(broken.current_streak, 2);
    assert!(broken.broken_at.is_some());

    assert_eq!(f.store.increment_streak(&hid, &uid).await.unwrap(), 1);
    let restarted = f.store.get_streak(&hid, &uid).await.unwrap().unwrap();
    assert!(restarted.is_active);
    assert!(restarted.broken_at.is_none());
}

#[tokio::test]
async fn badge_is_awarded_once() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;

    assert!(f.store.award_badge(&hid, &uid, "on_fire").await.unwrap());
    assert!(!f.store.award_badge(&hid, &uid, "on_fire").await.unwrap());
    let earned = f.store.list_user_badges(&hid, &uid).await.unwrap();
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].badge_id, "on_fire");

    assert!(matches!(
        f.store.award_badge(&hid, &uid, "no_such_badge").await,
        Err(StorageError::NotFound(_))
    ));
    assert_eq!(f.store.list_badges().await.unwrap().len(), 8);
}

#[tokio::test]
async fn invite_codes_admit_each_member_once() {
    let f = fixture().await;
    let (hid, admin) = household_with_admin(&f.store).await;
    let h = f.store.get_household(&hid).await.unwrap().unwrap();
    assert_eq!(h.invite_code, domain::invite_code_for(&hid));
    assert_eq!(
        f.store.member_role(&hid, &admin).await.unwrap(),
        Some(MemberRole::Admin)
    );

    let bob = user(&f.store, "bob@example.com", "Bob").await;
    match f.store.join_household(&bob, "ZZZZZZZZ").await {
        Err(StorageError::InvalidInput(m)) => assert_eq!(m, "invalid invite code"),
        other => panic!("unexpected join result: {other:?}"),
    }

    let code = format!("  {}  ", h.invite_code.to_lowercase());
    let joined = f.store.join_household(&bob, &code).await.unwrap();
    assert_eq!(joined.id, hid);
    assert_eq!(
        f.store.member_role(&hid, &bob).await.unwrap(),
        Some(MemberRole::Member)
    );

    match f.store.join_household(&bob, &h.invite_code).await {
        Err(StorageError::Conflict(m)) => assert_eq!(m, "already a member"),
        other => panic!("unexpected join result: {other:?}"),
    }
    assert_eq!(f.store.list_members(&hid).await.unwrap().len(), 2);
    assert_eq!(f.store.list_households_for_user(&bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn completion_does_not_touch_points_or_streak() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;
    let task = f
        .store
        .create_task(
            &hid,
            &uid,
            TaskSpec {
                title: "Take out bins".into(),
                recurrence: Recurrence::Weekly,
                due_day_of_week: Some(2),
                description: None,
                emoji: Some("🗑️".into()),
            },
        )
        .await
        .unwrap();
    let due = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    let inst = f
        .store
        .create_task_instance(&hid, &task.id, due, Some(uid.as_str()))
        .await
        .unwrap();
    assert!(inst.completed_at.is_none());

    let done = f
        .store
        .complete_task_instance(&hid, &inst.id, &uid, Some("https://img/1.jpg"), 1)
        .await
        .unwrap();
    assert!(done.completed_at.is_some());
    assert_eq!(done.completed_by.as_deref(), Some(uid.as_str()));
    assert_eq!(done.photo_url.as_deref(), Some("https://img/1.jpg"));
    assert_eq!(done.points_awarded, Some(1));

    assert_eq!(f.store.get_points(&hid, &uid).await.unwrap(), 0);
    assert!(f.store.get_streak(&hid, &uid).await.unwrap().is_none());

    assert!(matches!(
        f.store
            .complete_task_instance(&hid, "missing", &uid, None, 1)
            .await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn instances_are_idempotent_and_range_filtered() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;
    let task = f
        .store
        .create_task(
            &hid,
            &uid,
            TaskSpec {
                title: "Dishes".into(),
                recurrence: Recurrence::Daily,
                due_day_of_week: None,
                description: None,
                emoji: None,
            },
        )
        .await
        .unwrap();
    let d = |day| NaiveDate::from_ymd_opt(2026, 5, day).unwrap();

    let first = f
        .store
        .create_task_instance(&hid, &task.id, d(2), None)
        .await
        .unwrap();
    let again = f
        .store
        .create_task_instance(&hid, &task.id, d(2), None)
        .await
        .unwrap();
    assert_eq!(first.id, again.id);
    f.store
        .create_task_instance(&hid, &task.id, d(1), None)
        .await
        .unwrap();
    f.store
        .create_task_instance(&hid, &task.id, d(5), None)
        .await
        .unwrap();

    let got = f.store.list_task_instances(&hid, d(1), d(2)).await.unwrap();
    let dates: Vec<_> = got.iter().map(|i| i.due_date).collect();
    assert_eq!(dates, vec![d(1), d(2)]);

    assert!(matches!(
        f.store.list_task_instances(&hid, d(3), d(1)).await,
        Err(StorageError::InvalidInput(_))
    ));

    let stranger = user(&f.store, "eve@example.com", "Eve").await;
    assert!(matches!(
        f.store
            .create_task_instance(&hid, &task.id, d(9), Some(stranger.as_str()))
            .await,
        Err(StorageError::InvalidInput(_))
    ));

    assert!(f.store.delete_task(&hid, &task.id).await.unwrap());
    assert!(f.store.list_task_instances(&hid, d(1), d(9)).await.unwrap().is_empty());
    assert!(!f.store.delete_task(&hid, &task.id).await.unwrap());
}

#[tokio::test]
async fn task_validation_rejects_bad_templates() {
    let f = fixture().await;
    let (hid, uid) = household_with_admin(&f.store).await;
    let spec = |title: &str, recurrence, day| TaskSpec {
        title: title.into(),
        recurrence,
        due_day_of_week: day,
        description: None,
        emoji: None,
    };
    for bad in [
        spec("  ", Recurrence::Daily, None),
        spec("Vacuum", Recurrence::Weekly, None),
        spec("Vacuum", Recurrence::Weekly, Some(7)),
        spec("Vacuum", Recurrence::Oneoff, Some(1)),
    ] {
        assert!(matches!(
            f.store.create_task(&hid, &uid, bad).await,
            Err(StorageError::InvalidInput(_))
        ));
    }
    f.store
        .create_task(&hid, &uid, spec("Vacuum", Recurrence::Oneoff, None))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    f.store
        .create_task(&hid, &uid, spec("Mop", Recurrence::Daily, None))
        .await
        .unwrap();
    let titles: Vec<_> = f
        .store
        .list_tasks(&hid)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Mop", "Vacuum"]);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let f = fixture().await;
    user(&f.store, "ann@example.com", "Ann").await;
    assert!(matches!(
        f.store
            .create_user("ann@example.com", "Other", "h", "UTC")
            .await,
        Err(StorageError::Conflict(_))
    ));
}

#[tokio::test]
async fn leaderboard_orders_by_points_then_name() {
    let f = fixture().await;
    let (hid, ann) = household_with_admin(&f.store).await;
    let h = f.store.get_household(&hid).await.unwrap().unwrap();
    let bob = user(&f.store, "bob@example.com", "Bob").await;
    let cat = user(&f.store, "cat@example.com", "Cat").await;
    f.store.join_household(&bob, &h.invite_code).await.unwrap();
    f.store.join_household(&cat, &h.invite_code).await.unwrap();

    f.store.add_points(&hid, &bob, 10).await.unwrap();
    f.store.add_points(&hid, &cat, 10).await.unwrap();
    f.store.add_points(&hid, &ann, 3).await.unwrap();
    f.store.increment_streak(&hid, &bob).await.unwrap();
    f.store.increment_streak(&hid, &cat).await.unwrap();
    f.store.break_streak(&hid, &cat).await.unwrap();
    f.store.award_badge(&hid, &bob, "committed").await.unwrap();

    let board = f.store.leaderboard(&hid).await.unwrap();
    let names: Vec<_> = board.iter().map(|r| r.user_name.as_str()).collect();
    assert_eq!(names, vec!["Bob", "Cat", "Ann"]);
    assert_eq!(board[0].streak, 1);
    assert_eq!(board[0].badges, vec!["committed".to_string()]);
    assert_eq!(board[1].streak, 0);
    assert_eq!(board[2].points, 3);
    assert_eq!(board[2].tasks_completed, 0);
}
