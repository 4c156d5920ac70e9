use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use voxingest_runtime::inserter::{
    Inserter, InserterCaps, ServeError, SubmitHandle, DEFAULT_QUEUE_CAPACITY,
};

use crate::records::{Award, Topic, Trophy, User, UserTrophy};
use crate::shared::SharedMap;
use crate::store::SeedStore;
use crate::types::{AwardSeed, TopicsSeed, TrophySeed, UserSeed};

fn stage_caps(breathing_ms: u64, batch_size_hint: usize) -> InserterCaps {
    InserterCaps {
        breathing_time: Duration::from_millis(breathing_ms),
        batch_size_hint,
        queue_capacity: DEFAULT_QUEUE_CAPACITY,
    }
}

/// Runs one ingest stage: spawns the producer, drains the inserter to
/// completion, then joins the producer.
///
/// A producer that fails mid-stream cancels the stage token so the drain loop
/// unblocks instead of waiting for a total that will never arrive; the
/// producer's error takes precedence when surfacing.
async fn drive<T, F, Fut>(
    stage: &str,
    inserter: Inserter<T>,
    cancel: &CancellationToken,
    produce: F,
) -> Result<()>
where
    T: Send + 'static,
    F: FnOnce(SubmitHandle<T>) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    info!(
        target: "voxingest_seed",
        stage = stage,
        expected = inserter.expected_total(),
        batch_size = inserter.effective_batch_size() as u64,
        "stage starting"
    );

    let stage_cancel = cancel.child_token();
    let submitting = produce(inserter.handle());
    let producer = tokio::spawn({
        let guard = stage_cancel.clone();
        async move {
            let res = submitting.await;
            if res.is_err() {
                // The declared total will never arrive; unblock the drain loop.
                guard.cancel();
            }
            res
        }
    });

    let drained = inserter.serve(stage_cancel).await;
    let produced = producer.await.map_err(anyhow::Error::from)?;

    if cancel.is_cancelled() {
        return Err(anyhow::Error::new(ServeError::Cancelled)).context(format!("{stage} stage"));
    }

    match (produced, drained) {
        (Ok(()), Ok(())) => {
            info!(target: "voxingest_seed", stage = stage, "stage complete");
            Ok(())
        }
        (Err(e), _) => Err(e.context(format!("{stage} stage producer failed"))),
        (Ok(()), Err(e)) => Err(anyhow::Error::new(e)).context(format!("{stage} stage failed")),
    }
}

fn read_seed<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {what} seed"))
}

pub async fn ingest_topics(
    store: Arc<dyn SeedStore>,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64> {
    let seed: TopicsSeed = read_seed(path, "topics")?;
    let expected: u64 = seed.values().map(|names| names.len() as u64).sum();

    let inserter = Inserter::new(
        expected,
        move |topics: Vec<Topic>| store.add_topics(topics),
        stage_caps(300, 500),
    );

    drive("topics", inserter, cancel, move |handle| async move {
        for (category, names) in seed {
            for name in names {
                let topic = Topic {
                    id: Uuid::new_v4(),
                    name,
                    category: category.clone(),
                };
                handle.submit(topic).await?;
            }
        }
        Ok(())
    })
    .await?;

    Ok(expected)
}

pub async fn ingest_trophies(
    store: Arc<dyn SeedStore>,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<Trophy>> {
    let seed: Vec<TrophySeed> = read_seed(path, "trophies")?;
    let trophies: Vec<Trophy> = seed
        .into_iter()
        .map(|t| Trophy {
            id: Uuid::new_v4(),
            title: t.title,
            description: t.description,
            image_link: t.image_link,
        })
        .collect();

    let inserter = Inserter::new(
        trophies.len() as u64,
        move |batch: Vec<Trophy>| store.add_trophies(batch),
        stage_caps(300, 500),
    );

    let to_submit = trophies.clone();
    drive("trophies", inserter, cancel, move |handle| async move {
        for trophy in to_submit {
            handle.submit(trophy).await?;
        }
        Ok(())
    })
    .await?;

    Ok(trophies)
}

pub async fn ingest_awards(
    store: Arc<dyn SeedStore>,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64> {
    let seed: Vec<AwardSeed> = read_seed(path, "awards")?;
    let expected = seed.len() as u64;

    let inserter = Inserter::new(
        expected,
        move |awards: Vec<Award>| store.add_awards(awards),
        stage_caps(300, 500),
    );

    drive("awards", inserter, cancel, move |handle| async move {
        for award in seed {
            handle.submit(Award {
                id: Uuid::new_v4(),
                title: award.title,
                image_link: award.image_link,
            })
            .await?;
        }
        Ok(())
    })
    .await?;

    Ok(expected)
}

/// Ingests users, then the user-to-trophy link rows.
///
/// The producer resolves each user's trophy titles against the already
/// ingested trophies and parks the earned set in a [`SharedMap`] keyed by the
/// new user id; the link stage drains a snapshot of that map once the user
/// stage has completed. Returns `(users, links)` ingested.
pub async fn ingest_users(
    store: Arc<dyn SeedStore>,
    path: &Path,
    trophies: &[Trophy],
    cancel: &CancellationToken,
) -> Result<(u64, u64)> {
    let seed: Vec<UserSeed> = read_seed(path, "users")?;
    let expected = seed.len() as u64;

    let earned_by_user: Arc<SharedMap<Uuid, Vec<Trophy>>> = Arc::new(SharedMap::new());

    let inserter = Inserter::new(
        expected,
        {
            let store = store.clone();
            move |users: Vec<User>| store.add_users(users)
        },
        stage_caps(100, 100),
    );

    drive("users", inserter, cancel, {
        let earned_by_user = earned_by_user.clone();
        let trophies = trophies.to_vec();
        move |handle| async move {
            for user in seed {
                let user_id = Uuid::new_v4();

                let mut earned = Vec::with_capacity(user.trophies.len());
                for earned_seed in &user.trophies {
                    let trophy = trophies
                        .iter()
                        .find(|have| have.title == earned_seed.title)
                        .with_context(|| {
                            format!(
                                "unknown trophy title {:?} for user {:?}",
                                earned_seed.title, user.name
                            )
                        })?;
                    earned.push(trophy.clone());
                }
                earned_by_user.insert(user_id, earned);

                let none_if_empty = |s: String| if s.is_empty() { None } else { Some(s) };
                handle.submit(User {
                    id: user_id,
                    name: user.name,
                    public_description: none_if_empty(user.public_description),
                    avatar_img: none_if_empty(user.avatar_img),
                    banner_img: none_if_empty(user.banner_img),
                    over_18: user.over18,
                    suspended: user.suspended,
                    created_at_unix: user.cake_day_utc,
                })
                .await?;
            }
            Ok(())
        }
    })
    .await?;

    let earned = earned_by_user.snapshot();
    let link_total: u64 = earned.values().map(|t| t.len() as u64).sum();

    let inserter = Inserter::new(
        link_total,
        move |links: Vec<UserTrophy>| store.link_user_trophies(links),
        stage_caps(100, 3000),
    );

    drive("user_trophies", inserter, cancel, move |handle| async move {
        for (user_id, trophies) in earned {
            for trophy in trophies {
                handle.submit(UserTrophy {
                    user_id,
                    trophy_id: trophy.id,
                })
                .await?;
            }
        }
        Ok(())
    })
    .await?;

    Ok((expected, link_total))
}

#[derive(Debug, Clone)]
pub struct SeedFiles {
    pub topics: PathBuf,
    pub trophies: PathBuf,
    pub awards: PathBuf,
    pub users: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub topics: u64,
    pub trophies: u64,
    pub awards: u64,
    pub users: u64,
    pub user_trophies: u64,
}

/// Runs every stage in dependency order: topics, trophies, awards, then users
/// and their trophy links.
pub async fn ingest_all(
    store: Arc<dyn SeedStore>,
    files: &SeedFiles,
    cancel: &CancellationToken,
) -> Result<IngestSummary> {
    let topics = ingest_topics(store.clone(), &files.topics, cancel).await?;
    let trophies = ingest_trophies(store.clone(), &files.trophies, cancel).await?;
    let awards = ingest_awards(store.clone(), &files.awards, cancel).await?;
    let (users, user_trophies) =
        ingest_users(store, &files.users, &trophies, cancel).await?;

    Ok(IngestSummary {
        topics,
        trophies: trophies.len() as u64,
        awards,
        users,
        user_trophies,
    })
}
