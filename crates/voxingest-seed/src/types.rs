use std::collections::BTreeMap;

use serde::Deserialize;

/// Topics seed file: parent category mapped to the topic names under it.
pub type TopicsSeed = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Deserialize)]
pub struct TrophySeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardSeed {
    pub title: String,
    #[serde(default)]
    pub image_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub name: String,
    #[serde(default)]
    pub cake_day_utc: i64,
    #[serde(default)]
    pub public_description: String,
    #[serde(default)]
    pub avatar_img: String,
    #[serde(default)]
    pub banner_img: String,
    #[serde(default)]
    pub over18: bool,
    #[serde(default)]
    pub suspended: bool,
    /// Trophies earned by the user, referenced by title; each must resolve to
    /// an already-ingested trophy.
    #[serde(default)]
    pub trophies: Vec<TrophySeed>,
}
