//! Scenario tests: several tabs sharing one store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::errors::StoreError;
use crate::mail::{EmailDispatcher, SimulatedMailer};
use crate::models::{
    Collection, Hackathon, Idea, NewHackathon, NewIdea, NewTeam, NewUser, ProjectIdea, Team, User,
    UserRole,
};
use crate::notify::ChangeBus;
use crate::store::{KeyValueStore, SqliteStore, Store};
use crate::tab::Tab;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
});

fn test_config() -> Config {
    Config {
        email_delay: Duration::ZERO,
        watch_interval: Duration::from_millis(20),
        max_write_retries: 100,
        log_level: "warn".to_string(),
        ..Config::default()
    }
}

/// Test fixture: one tab plus the mailer it sends through.
struct TestFixture {
    tab: Tab,
    mailer: Arc<SimulatedMailer>,
}

impl TestFixture {
    async fn open(store: Store, bus: &ChangeBus) -> Self {
        Self::open_with_config(store, bus, &test_config()).await
    }

    async fn open_with_config(store: Store, bus: &ChangeBus, config: &Config) -> Self {
        Lazy::force(&TRACING);

        let mailer = Arc::new(SimulatedMailer::new(Duration::ZERO));
        let dispatcher: Arc<dyn EmailDispatcher> = mailer.clone();
        let tab = Tab::open_with_mailer(store, bus, config, dispatcher)
            .await
            .expect("Failed to open tab");

        TestFixture { tab, mailer }
    }

    async fn new() -> Self {
        Self::open(Store::in_memory(), &ChangeBus::new()).await
    }

    async fn login(&self, identifier: &str) -> User {
        self.tab
            .api()
            .log_in(identifier)
            .await
            .expect("Failed to log in")
    }

    async fn team(&self, id: &str) -> Team {
        self.tab
            .api()
            .find_by_id::<Team>(id)
            .await
            .unwrap()
            .expect("Team not found")
    }

    async fn user(&self, id: &str) -> User {
        self.tab
            .api()
            .find_by_id::<User>(id)
            .await
            .unwrap()
            .expect("User not found")
    }

    /// Add a team straight through the store, bypassing the mutators.
    async fn insert_team(&self, team: serde_json::Value) -> Team {
        let team: Team = serde_json::from_value(team).unwrap();
        let mut teams: Vec<Team> = self.tab.api().list().await.unwrap();
        teams.push(team.clone());
        self.tab.store().write(Collection::Teams, &teams).await.unwrap();
        team
    }
}

fn signal_channel(tab: &Tab) -> (mpsc::UnboundedReceiver<()>, crate::notify::Subscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = tab.notifier().subscribe(move || {
        let _ = tx.send(());
    });
    (rx, subscription)
}

/// A fixed clock ahead of every seeded hackathon's registration deadline.
fn before_events() -> chrono::DateTime<chrono::Utc> {
    crate::models::parse_timestamp("2026-10-01").unwrap()
}

async fn expect_signal(rx: &mut mpsc::UnboundedReceiver<()>) {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("No change signal within 2s")
        .expect("Signal channel closed");
}

#[tokio::test]
async fn test_seeding_is_idempotent() {
    let store = Store::in_memory();
    let bus = ChangeBus::new();

    let first = TestFixture::open(store.clone(), &bus).await;
    assert_eq!(first.tab.seed_report().seeded, Collection::ALL.to_vec());

    let second = TestFixture::open(store, &bus).await;
    assert!(second.tab.seed_report().seeded.is_empty());

    let hackathons: Vec<Hackathon> = second.tab.api().list().await.unwrap();
    assert_eq!(hackathons.len(), 3);
    let users: Vec<User> = second.tab.api().list().await.unwrap();
    assert_eq!(users.len(), 4);
}

#[tokio::test]
async fn test_seeding_skips_emptied_collection() {
    let fixture = TestFixture::new().await;
    fixture
        .tab
        .store()
        .write::<Idea>(Collection::SharedIdeas, &[])
        .await
        .unwrap();

    // A later tab must not refill a collection the user emptied
    let reopened = TestFixture::open(fixture.tab.store().clone(), &ChangeBus::new()).await;
    let ideas: Vec<Idea> = reopened.tab.api().list().await.unwrap();
    assert!(ideas.is_empty());
}

#[tokio::test]
async fn test_forced_reseed_keeps_later_writes() {
    let store = Store::in_memory();
    let bus = ChangeBus::new();
    let config = Config {
        force_reseed: true,
        ..test_config()
    };

    let first = TestFixture::open_with_config(store.clone(), &bus, &config).await;
    assert_eq!(first.tab.seed_report().seeded, Collection::ALL.to_vec());
    first
        .tab
        .api()
        .sign_up(NewUser {
            username: "newbie".to_string(),
            email: "newbie@example.com".to_string(),
            role: UserRole::Attendee,
        })
        .await
        .unwrap();

    // A second tab of the same process must not overwrite the sign-up
    let second = TestFixture::open_with_config(store, &bus, &config).await;
    assert!(second.tab.seed_report().seeded.is_empty());

    let users: Vec<User> = second.tab.api().list().await.unwrap();
    assert_eq!(users.len(), 5);
    assert!(users.iter().any(|u| u.username == "newbie"));
}

#[tokio::test]
async fn test_read_after_write() {
    let fixture = TestFixture::new().await;
    fixture.login("sarahchen").await;

    let idea = fixture
        .tab
        .api()
        .share_idea(NewIdea {
            title: "Offline-first notes".to_string(),
            description: "Sync when the venue wifi comes back.".to_string(),
            tags: ["Sync".to_string()].into_iter().collect(),
        })
        .await
        .unwrap();
    assert_eq!(idea.author, "sarahchen");

    let found = fixture
        .tab
        .api()
        .find_by_id::<Idea>(&idea.id)
        .await
        .unwrap();
    assert_eq!(found, Some(idea));
}

#[tokio::test]
async fn test_update_preserves_order() {
    let fixture = TestFixture::new().await;
    fixture.login("mikej").await;

    let before: Vec<Idea> = fixture.tab.api().list().await.unwrap();
    let liked = fixture.tab.api().like_idea("idea-2").await.unwrap();
    assert_eq!(liked.likes, before[1].likes + 1);

    let after: Vec<Idea> = fixture.tab.api().list().await.unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], liked);
    assert_eq!(after[2], before[2]);
}

#[tokio::test]
async fn test_join_full_team_is_rejected() {
    let fixture = TestFixture::new().await;
    fixture
        .insert_team(json!({
            "id": "team-full",
            "name": "Full House",
            "members": [
                { "id": "user-sarah", "username": "sarahchen", "role": "leader" },
                { "id": "user-mike", "username": "mikej", "role": "member" }
            ],
            "membersCount": 2,
            "maxMembers": 2,
            "inviteCode": "FULL22"
        }))
        .await;
    fixture.login("emmaw").await;

    let result = fixture.tab.api().join_with_invite_code("FULL22").await;
    assert!(matches!(result, Err(StoreError::CapacityExceeded(_))));

    let result = fixture.tab.api().request_to_join("team-full").await;
    assert!(matches!(result, Err(StoreError::CapacityExceeded(_))));

    let team = fixture.team("team-full").await;
    assert_eq!(team.members.len(), 2);
    assert_eq!(team.members_count, 2);
    assert!(team.join_requests.is_empty());
}

#[tokio::test]
async fn test_join_with_invite_code() {
    let fixture = TestFixture::new().await;
    fixture
        .insert_team(json!({
            "id": "team-abc",
            "name": "Alphabet",
            "members": [{ "id": "user-emma", "name": "emmaw", "role": "Team Lead" }],
            "membersCount": 1,
            "maxMembers": 5,
            "inviteCode": "ABC123"
        }))
        .await;
    let mike = fixture.login("mikej").await;
    let before = fixture.team("team-abc").await;

    let result = fixture.tab.api().join_with_invite_code("WRONG1").await;
    assert!(matches!(result, Err(StoreError::InvalidInviteCode(_))));
    assert_eq!(fixture.team("team-abc").await, before);

    let team = fixture
        .tab
        .api()
        .join_with_invite_code("ABC123")
        .await
        .unwrap();
    assert_eq!(team.members_count, 2);
    assert_eq!(team.members.len(), 2);
    assert_eq!(team.members[1].id, mike.id);
    assert_eq!(team.members[1].username, "mikej");

    let result = fixture.tab.api().join_with_invite_code("abc123").await;
    assert!(matches!(result, Err(StoreError::DuplicateMembership(_))));

    assert_eq!(fixture.user("user-mike").await.team_count, mike.team_count + 1);
}

#[tokio::test]
async fn test_join_survives_failed_team_count_update() {
    let fixture = TestFixture::new().await;
    fixture
        .insert_team(json!({
            "id": "team-abc",
            "name": "Alphabet",
            "members": [{ "id": "user-emma", "username": "emmaw", "role": "leader" }],
            "membersCount": 1,
            "maxMembers": 5,
            "inviteCode": "ABC123"
        }))
        .await;
    fixture.login("mikej").await;

    fixture
        .tab
        .store()
        .backend()
        .put(Collection::Users.key(), "{ broken")
        .await
        .unwrap();

    // The membership write is committed; the counter is best effort
    let team = fixture
        .tab
        .api()
        .join_with_invite_code("ABC123")
        .await
        .unwrap();
    assert_eq!(team.members.len(), 2);

    let stored = fixture.team("team-abc").await;
    assert_eq!(stored.members.len(), 2);
    assert_eq!(stored.members_count, 2);
}

#[tokio::test]
async fn test_team_update_repairs_member_count() {
    let fixture = TestFixture::new().await;
    fixture
        .insert_team(json!({
            "id": "team-drift",
            "name": "Drifters",
            "members": [{ "id": "user-emma", "username": "emmaw", "role": "leader" }],
            "membersCount": 7,
            "maxMembers": 8,
            "inviteCode": "DRIFT7"
        }))
        .await;
    fixture.login("emmaw").await;

    let team = fixture
        .tab
        .api()
        .update_project_idea(
            "team-drift",
            ProjectIdea {
                title: "Tide tables".to_string(),
                description: String::new(),
                tech_stack: vec!["rust".to_string()],
                progress: 40,
            },
        )
        .await
        .unwrap();
    assert_eq!(team.members_count, 1);
    assert_eq!(fixture.team("team-drift").await.members_count, 1);
}

#[tokio::test]
async fn test_member_counts_stay_consistent() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    fixture.login("techorganizer").await;
    let team = api
        .create_team(NewTeam {
            name: "Night Owls".to_string(),
            hackathon_id: Some("hack-web3-2027".to_string()),
            description: String::new(),
            max_members: 3,
            skills: Default::default(),
        })
        .await
        .unwrap();
    assert_eq!(team.hackathon_name.as_deref(), Some("Open Web Sprint"));
    assert!(team.members[0].is_leader());
    assert_eq!(team.invite_code.len(), 6);

    fixture.login("emmaw").await;
    let joined = api.join_with_invite_code(&team.invite_code).await.unwrap();
    assert_eq!(joined.members_count as usize, joined.members.len());

    fixture.login("sarahchen").await;
    let joined = api.join_with_invite_code(&team.invite_code).await.unwrap();
    assert_eq!(joined.members_count, 3);

    fixture.login("techorganizer").await;
    let after_leave = api.leave_team(&team.id).await.unwrap();
    assert_eq!(after_leave.members_count as usize, after_leave.members.len());
    assert_eq!(after_leave.members_count, 2);
    // Leadership passes to the longest-standing member
    assert_eq!(after_leave.leader().unwrap().username, "emmaw");

    let after_remove = api.remove_member(&team.id, "user-sarah").await.unwrap();
    assert_eq!(after_remove.members_count as usize, after_remove.members.len());
    assert_eq!(after_remove.members_count, 1);

    let result = api.remove_member(&team.id, "user-sarah").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    assert_eq!(fixture.user("user-organizer").await.team_count, 0);
    assert_eq!(fixture.user("user-sarah").await.team_count, 1);
}

#[tokio::test]
async fn test_sign_up_uniqueness() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    for username in ["sarahchen", "SarahChen", "  SARAHCHEN "] {
        let result = api
            .sign_up(NewUser {
                username: username.to_string(),
                email: "someone.new@example.com".to_string(),
                role: UserRole::Attendee,
            })
            .await;
        assert!(
            matches!(result, Err(StoreError::UniquenessViolation(_))),
            "{:?} should be taken",
            username
        );
    }

    let result = api
        .sign_up(NewUser {
            username: "newcomer".to_string(),
            email: "Sarah@Example.com".to_string(),
            role: UserRole::Attendee,
        })
        .await;
    assert!(matches!(result, Err(StoreError::UniquenessViolation(_))));

    let user = api
        .sign_up(NewUser {
            username: "newcomer".to_string(),
            email: "newcomer@example.com".to_string(),
            role: UserRole::Attendee,
        })
        .await
        .unwrap();
    assert!(!user.is_logged_in);
    assert_eq!(api.find_by_id::<User>(&user.id).await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_notification_delivery() {
    let fixture = TestFixture::new().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = fixture.tab.notifier().subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    fixture.tab.notifier().notify();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    fixture.tab.notifier().notify();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // One successful mutator call, one signal
    fixture.login("mikej").await;
    let after_login = calls.load(Ordering::SeqCst);
    fixture.tab.api().comment_on_idea("idea-1").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), after_login + 1);

    subscription.unsubscribe();
    fixture.tab.notifier().notify();
    fixture.tab.api().like_idea("idea-1").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), after_login + 1);
}

#[tokio::test]
async fn test_failed_mutation_writes_nothing_and_stays_silent() {
    let fixture = TestFixture::new().await;
    fixture.login("mikej").await;

    let revision = fixture.tab.store().revision().await.unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let _subscription = fixture.tab.notifier().subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = fixture.tab.api().like_idea("no-such-idea").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    assert_eq!(fixture.tab.store().revision().await.unwrap(), revision);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_change_reaches_other_tab() {
    let store = Store::in_memory();
    let bus = ChangeBus::new();
    let writer = TestFixture::open(store.clone(), &bus).await;
    let reader = TestFixture::open(store, &bus).await;

    let (mut signals, _subscription) = signal_channel(&reader.tab);

    writer.login("emmaw").await;
    // Drain the login signal
    expect_signal(&mut signals).await;

    let idea = writer
        .tab
        .api()
        .share_idea(NewIdea {
            title: "Grid-aware CI scheduler".to_string(),
            description: String::new(),
            tags: Default::default(),
        })
        .await
        .unwrap();

    expect_signal(&mut signals).await;
    let seen = reader.tab.api().find_by_id::<Idea>(&idea.id).await.unwrap();
    assert_eq!(seen, Some(idea));
}

#[tokio::test]
async fn test_watcher_does_not_repeat_own_writes() {
    let fixture = TestFixture::new().await;
    let _watcher = fixture.tab.watch_revisions().await.unwrap();
    fixture.login("mikej").await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let _subscription = fixture.tab.notifier().subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    fixture.tab.api().like_idea("idea-1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reconciler_follows_other_tab() {
    let store = Store::in_memory();
    let bus = ChangeBus::new();
    let writer = TestFixture::open(store.clone(), &bus).await;
    let reader = TestFixture::open(store, &bus).await;

    let reconciler = reader.tab.reconciler(None).await.unwrap();
    assert!(reconciler.snapshot().current_user.is_none());
    let mut updates = reconciler.subscribe();

    writer.login("sarahchen").await;

    let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            updates.changed().await.unwrap();
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.current_user.is_some() {
                return snapshot;
            }
        }
    })
    .await
    .expect("Reader never saw the login");

    assert_eq!(snapshot.current_user.as_ref().unwrap().username, "sarahchen");
    assert!(snapshot.users.iter().any(|u| u.username == "sarahchen" && u.is_logged_in));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tabs_lose_no_updates() {
    let store = Store::in_memory();
    let bus = ChangeBus::new();
    let first = TestFixture::open(store.clone(), &bus).await;
    let second = TestFixture::open(store, &bus).await;
    first.login("mikej").await;

    let likes_before = first
        .tab
        .api()
        .find_by_id::<Idea>("idea-3")
        .await
        .unwrap()
        .unwrap()
        .likes;

    let mut handles = Vec::new();
    for i in 0..20 {
        let api = if i % 2 == 0 {
            first.tab.api().clone()
        } else {
            second.tab.api().clone()
        };
        handles.push(tokio::spawn(async move { api.like_idea("idea-3").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let idea = second
        .tab
        .api()
        .find_by_id::<Idea>("idea-3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(idea.likes, likes_before + 20);
}

#[tokio::test]
async fn test_sqlite_tabs_share_changes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("hackmap.sqlite");

    // Separate pools and buses, as two processes would have
    let first_store = Store::new(Arc::new(SqliteStore::open(&db_path).await.unwrap()));
    let second_store = Store::new(Arc::new(SqliteStore::open(&db_path).await.unwrap()));
    let first = TestFixture::open(first_store, &ChangeBus::new()).await;
    let second = TestFixture::open(second_store, &ChangeBus::new()).await;
    assert_eq!(first.tab.seed_report().seeded.len(), 4);
    assert!(second.tab.seed_report().seeded.is_empty());

    let _watcher = second.tab.watch_revisions().await.unwrap();
    let (mut signals, _subscription) = signal_channel(&second.tab);

    first.login("emmaw").await;
    expect_signal(&mut signals).await;
    let current = second.tab.api().current_user().await.unwrap();
    assert_eq!(current.map(|u| u.username), Some("emmaw".to_string()));

    let (a, b) = tokio::join!(
        first.tab.api().like_idea("idea-1"),
        second.tab.api().like_idea("idea-1")
    );
    a.unwrap();
    b.unwrap();

    let idea = first
        .tab
        .api()
        .find_by_id::<Idea>("idea-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(idea.likes, 26);
}

#[tokio::test]
async fn test_team_flows_send_email() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    // Leader invites a registered user
    fixture.login("emmaw").await;
    let team = api.invite_user("team-solar", "SarahChen").await.unwrap();
    assert!(team.pending_invitation_for("sarahchen").is_some());
    api.invite_user("team-solar", "sarahchen").await.unwrap();

    let sent = fixture.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "sarah@example.com");
    assert!(sent[0].body.contains("SUN777"));

    // Join request notifies the leader
    fixture.login("techorganizer").await;
    api.request_to_join("team-solar").await.unwrap();
    api.request_to_join("team-solar").await.unwrap();
    let sent = fixture.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, "emma@example.com");

    // Accepting notifies the requester
    let team = api.accept_join_request("team-solar", "req-1").await.unwrap();
    assert!(team.has_member("user-mike"));
    assert_eq!(team.join_requests.len(), 1);
    let sent = fixture.mailer.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].to, "mike@example.com");
    assert_eq!(fixture.user("user-mike").await.team_count, 2);

    // Team is now full (3/3 with the invitee accepting)
    fixture.login("sarahchen").await;
    let team = api.respond_to_invitation("team-solar", true).await.unwrap();
    assert_eq!(team.members_count, 3);
    assert!(team.pending_invitation_for("sarahchen").is_none());

    let result = api
        .accept_join_request("team-solar", &team.join_requests[0].id)
        .await;
    assert!(matches!(result, Err(StoreError::CapacityExceeded(_))));
}

#[tokio::test]
async fn test_decline_and_regenerate() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    // Leader actions need a logged-in user
    let result = api.decline_join_request("team-solar", "req-1").await;
    assert!(matches!(result, Err(StoreError::NotAuthenticated(_))));
    let result = api.regenerate_invite_code("team-neural").await;
    assert!(matches!(result, Err(StoreError::NotAuthenticated(_))));
    assert_eq!(fixture.team("team-solar").await.join_requests.len(), 1);

    fixture.login("emmaw").await;
    let team = api.decline_join_request("team-solar", "req-1").await.unwrap();
    assert!(team.join_requests.is_empty());
    let result = api.decline_join_request("team-solar", "req-1").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    let team = api.regenerate_invite_code("team-neural").await.unwrap();
    assert_ne!(team.invite_code, "NEUR42");

    let result = api.join_with_invite_code("NEUR42").await;
    assert!(matches!(result, Err(StoreError::InvalidInviteCode(_))));
    api.join_with_invite_code(&team.invite_code).await.unwrap();

    let teams = api.teams_for_user("user-emma").await.unwrap();
    assert_eq!(teams.len(), 2);
    let teams = api.teams_for_hackathon("hack-ai-2026").await.unwrap();
    assert_eq!(teams.len(), 1);
}

#[tokio::test]
async fn test_hackathon_registration() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    let now = before_events();

    let result = api.register_for_hackathon("hack-green-2026", now).await;
    assert!(matches!(result, Err(StoreError::NotAuthenticated(_))));

    fixture.login("sarahchen").await;
    assert!(api.register_for_hackathon("hack-green-2026", now).await.unwrap());
    assert!(!api.register_for_hackathon("hack-green-2026", now).await.unwrap());

    let hackathon = api
        .find_by_id::<Hackathon>("hack-green-2026")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hackathon.participants, 65);

    let user = api.current_user().await.unwrap().unwrap();
    assert_eq!(user.hackathon_count, 2);
    assert!(user.registered_hackathons.contains(&"hack-green-2026".to_string()));

    let result = api.register_for_hackathon("hack-missing", now).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_registration_closes_at_deadline() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();
    fixture.login("emmaw").await;

    // hack-ai-2026 closes on 2026-11-07, a week before it starts
    let late = crate::models::parse_timestamp("2026-11-10").unwrap();
    let result = api.register_for_hackathon("hack-ai-2026", late).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let hackathon = api
        .find_by_id::<Hackathon>("hack-ai-2026")
        .await
        .unwrap()
        .unwrap();
    let user = fixture.user("user-emma").await;
    assert!(!user.registered_hackathons.contains(&hackathon.id));

    assert!(api
        .register_for_hackathon("hack-ai-2026", before_events())
        .await
        .unwrap());
    let after = api
        .find_by_id::<Hackathon>("hack-ai-2026")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.participants, hackathon.participants + 1);
}

#[tokio::test]
async fn test_only_organizers_create_hackathons() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    let request = NewHackathon {
        title: "Winter Build".to_string(),
        theme: "Tooling".to_string(),
        description: String::new(),
        start_date: "2030-02-10".to_string(),
        end_date: "2030-02-12".to_string(),
        registration_deadline: None,
        location: "Online".to_string(),
        tags: Default::default(),
        prizes: Vec::new(),
        sponsors: Vec::new(),
        schedule: Vec::new(),
    };

    fixture.login("mikej").await;
    let result = api.create_hackathon(request.clone()).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    fixture.login("events@techorg.example").await;
    let backwards = NewHackathon {
        end_date: "2030-02-01".to_string(),
        ..request.clone()
    };
    let result = api.create_hackathon(backwards).await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let hackathon = api.create_hackathon(request).await.unwrap();
    assert_eq!(
        hackathon.organizer.as_ref().map(|o| o.username.as_str()),
        Some("techorganizer")
    );

    let organizer = api.current_user().await.unwrap().unwrap();
    assert!(organizer.created_hackathons.contains(&hackathon.id));

    let upcoming = api
        .upcoming_hackathons(chrono::Utc::now())
        .await
        .unwrap();
    assert!(upcoming.iter().any(|h| h.id == hackathon.id));
}

#[tokio::test]
async fn test_login_logout_cycle() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    // Nobody logged in: a no-op
    api.log_out().await.unwrap();

    let result = api.log_in("nobody").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    let user = api.log_in("MIKE@example.com").await.unwrap();
    assert_eq!(user.username, "mikej");
    assert!(user.is_logged_in);

    api.log_out().await.unwrap();
    assert!(api.current_user().await.unwrap().is_none());
    assert!(!fixture.user("user-mike").await.is_logged_in);

    let result = api
        .share_idea(NewIdea {
            title: "Anonymous".to_string(),
            description: String::new(),
            tags: Default::default(),
        })
        .await;
    assert!(matches!(result, Err(StoreError::NotAuthenticated(_))));
}

#[tokio::test]
async fn test_legacy_shapes_read_back_canonical() {
    let fixture = TestFixture::new().await;
    let api = fixture.tab.api();

    let green = api
        .find_by_id::<Hackathon>("hack-green-2026")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(green.prizes[0].place, None);
    assert_eq!(green.prizes[0].reward, "$3,000 grand prize");
    assert_eq!(green.organizer.as_ref().unwrap().username, "greenfuture");

    // Rewriting any hackathon stores every record in the canonical shape
    fixture.login("sarahchen").await;
    assert!(api
        .register_for_hackathon("hack-green-2026", before_events())
        .await
        .unwrap());

    let raw = fixture
        .tab
        .store()
        .backend()
        .get(Collection::Hackathons.key())
        .await
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw.value).unwrap();
    assert_eq!(value[1]["prizes"][0]["reward"], "$3,000 grand prize");
    assert_eq!(value[1]["organizer"]["username"], "greenfuture");
}
