use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::records::{Award, Topic, Trophy, User, UserTrophy};

/// Batch-persistence boundary for the seed driver.
///
/// Synchronous by contract: each call durably writes the whole batch or fails
/// as a unit, with no partial-success reporting. Callers that want retries
/// wrap these methods before handing them to an inserter.
pub trait SeedStore: Send + Sync + 'static {
    fn add_topics(&self, topics: Vec<Topic>) -> Result<()>;
    fn add_trophies(&self, trophies: Vec<Trophy>) -> Result<()>;
    fn add_awards(&self, awards: Vec<Award>) -> Result<()>;
    fn add_users(&self, users: Vec<User>) -> Result<()>;
    fn link_user_trophies(&self, links: Vec<UserTrophy>) -> Result<()>;
}

/// Store that appends one JSON document per record to `<root>/<entity>.jsonl`.
///
/// Keeps the binary runnable without external services; swapping in a real
/// database is a matter of implementing [`SeedStore`] over its client.
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create store root {}", root.display()))?;
        Ok(Self { root })
    }

    fn append<R: Serialize>(&self, file_name: &str, rows: &[R]) -> Result<()> {
        let path = self.root.join(file_name);
        let mut out = String::new();
        for row in rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        file.write_all(out.as_bytes())
            .with_context(|| format!("append {}", path.display()))?;
        Ok(())
    }
}

impl SeedStore for JsonlStore {
    fn add_topics(&self, topics: Vec<Topic>) -> Result<()> {
        self.append("topics.jsonl", &topics)
    }

    fn add_trophies(&self, trophies: Vec<Trophy>) -> Result<()> {
        self.append("trophies.jsonl", &trophies)
    }

    fn add_awards(&self, awards: Vec<Award>) -> Result<()> {
        self.append("awards.jsonl", &awards)
    }

    fn add_users(&self, users: Vec<User>) -> Result<()> {
        self.append("users.jsonl", &users)
    }

    fn link_user_trophies(&self, links: Vec<UserTrophy>) -> Result<()> {
        self.append("user_trophies.jsonl", &links)
    }
}
