use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use voxingest_seed::loader::{ingest_all, ingest_users, SeedFiles};
use voxingest_seed::records::{Award, Topic, Trophy, User, UserTrophy};
use voxingest_seed::store::{JsonlStore, SeedStore};

#[derive(Default)]
struct MemoryStore {
    topics: Mutex<Vec<Topic>>,
    trophies: Mutex<Vec<Trophy>>,
    awards: Mutex<Vec<Award>>,
    users: Mutex<Vec<User>>,
    user_trophies: Mutex<Vec<UserTrophy>>,
}

impl SeedStore for MemoryStore {
    fn add_topics(&self, topics: Vec<Topic>) -> Result<()> {
        self.topics.lock().expect("topics mutex poisoned").extend(topics);
        Ok(())
    }

    fn add_trophies(&self, trophies: Vec<Trophy>) -> Result<()> {
        self.trophies
            .lock()
            .expect("trophies mutex poisoned")
            .extend(trophies);
        Ok(())
    }

    fn add_awards(&self, awards: Vec<Award>) -> Result<()> {
        self.awards.lock().expect("awards mutex poisoned").extend(awards);
        Ok(())
    }

    fn add_users(&self, users: Vec<User>) -> Result<()> {
        self.users.lock().expect("users mutex poisoned").extend(users);
        Ok(())
    }

    fn link_user_trophies(&self, links: Vec<UserTrophy>) -> Result<()> {
        self.user_trophies
            .lock()
            .expect("user_trophies mutex poisoned")
            .extend(links);
        Ok(())
    }
}

fn write_seed_files(dir: &Path) -> Result<SeedFiles> {
    let topics = dir.join("topics.json");
    std::fs::write(
        &topics,
        r#"{
            "Technology": ["rust", "databases"],
            "Science": ["astronomy"]
        }"#,
    )?;

    let trophies = dir.join("trophies.json");
    std::fs::write(
        &trophies,
        r#"[
            {"title": "one-year club", "description": "member for a year", "image_link": "https://img/one-year.png"},
            {"title": "verified email", "description": "", "image_link": "https://img/verified.png"}
        ]"#,
    )?;

    let awards = dir.join("awards.json");
    std::fs::write(
        &awards,
        r#"[
            {"title": "gold", "image_link": "https://img/gold.png"},
            {"title": "silver", "image_link": "https://img/silver.png"},
            {"title": "helpful", "image_link": "https://img/helpful.png"}
        ]"#,
    )?;

    let users = dir.join("users.json");
    std::fs::write(
        &users,
        r#"[
            {"name": "ada", "cake_day_utc": 1500000000, "over18": false,
             "trophies": [{"title": "one-year club"}, {"title": "verified email"}]},
            {"name": "grace", "cake_day_utc": 1600000000, "suspended": true,
             "public_description": "compiles things",
             "trophies": [{"title": "one-year club"}]}
        ]"#,
    )?;

    Ok(SeedFiles {
        topics,
        trophies,
        awards,
        users,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingest_all_persists_every_stage() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = write_seed_files(dir.path())?;

    let store = Arc::new(MemoryStore::default());
    let summary = ingest_all(store.clone(), &files, &CancellationToken::new()).await?;

    assert_eq!(summary.topics, 3);
    assert_eq!(summary.trophies, 2);
    assert_eq!(summary.awards, 3);
    assert_eq!(summary.users, 2);
    assert_eq!(summary.user_trophies, 3);

    let topics = store.topics.lock().expect("topics mutex poisoned");
    assert_eq!(topics.len(), 3);
    assert!(topics
        .iter()
        .any(|t| t.name == "rust" && t.category == "Technology"));

    let users = store.users.lock().expect("users mutex poisoned");
    let trophies = store.trophies.lock().expect("trophies mutex poisoned");
    let links = store
        .user_trophies
        .lock()
        .expect("user_trophies mutex poisoned");

    let by_id: HashMap<Uuid, &User> = users.iter().map(|u| (u.id, u)).collect();
    let ada = users.iter().find(|u| u.name == "ada").expect("ada missing");
    let grace = users
        .iter()
        .find(|u| u.name == "grace")
        .expect("grace missing");
    assert!(grace.suspended);
    assert_eq!(grace.public_description.as_deref(), Some("compiles things"));
    assert_eq!(ada.created_at_unix, 1_500_000_000);

    // Every link row points at a persisted user and trophy; ada earned both.
    for link in links.iter() {
        assert!(by_id.contains_key(&link.user_id));
        assert!(trophies.iter().any(|t| t.id == link.trophy_id));
    }
    assert_eq!(links.iter().filter(|l| l.user_id == ada.id).count(), 2);
    assert_eq!(links.iter().filter(|l| l.user_id == grace.id).count(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_trophy_title_fails_the_users_stage() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = write_seed_files(dir.path())?;

    let users = dir.path().join("bad_users.json");
    std::fs::write(
        &users,
        r#"[{"name": "mallory", "trophies": [{"title": "no such trophy"}]}]"#,
    )?;

    let store: Arc<dyn SeedStore> = Arc::new(MemoryStore::default());
    let cancel = CancellationToken::new();
    let trophies = voxingest_seed::loader::ingest_trophies(store.clone(), &files.trophies, &cancel)
        .await?;

    let err = ingest_users(store, &users, &trophies, &cancel)
        .await
        .expect_err("an unresolvable trophy title must fail the stage");
    assert!(
        format!("{err:#}").contains("unknown trophy title"),
        "unexpected error: {err:#}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn jsonl_store_appends_one_line_per_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = write_seed_files(dir.path())?;

    let out = dir.path().join("out");
    let store = Arc::new(JsonlStore::create(&out)?);
    ingest_all(store, &files, &CancellationToken::new()).await?;

    let lines = |name: &str| -> Result<usize> {
        let content = std::fs::read_to_string(out.join(name))?;
        Ok(content.lines().count())
    };
    assert_eq!(lines("topics.jsonl")?, 3);
    assert_eq!(lines("trophies.jsonl")?, 2);
    assert_eq!(lines("awards.jsonl")?, 3);
    assert_eq!(lines("users.jsonl")?, 2);
    assert_eq!(lines("user_trophies.jsonl")?, 3);

    // Each line is a standalone JSON document.
    let content = std::fs::read_to_string(out.join("users.jsonl"))?;
    for line in content.lines() {
        let user: User = serde_json::from_str(line)?;
        assert!(!user.name.is_empty());
    }
    Ok(())
}
