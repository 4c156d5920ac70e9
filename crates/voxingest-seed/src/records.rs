use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rows handed to the [`SeedStore`](crate::store::SeedStore). Shapes mirror the
/// relational entities the store ultimately persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trophy {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: Uuid,
    pub title: String,
    pub image_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub public_description: Option<String>,
    pub avatar_img: Option<String>,
    pub banner_img: Option<String>,
    pub over_18: bool,
    pub suspended: bool,
    pub created_at_unix: i64,
}

/// User-to-trophy link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTrophy {
    pub user_id: Uuid,
    pub trophy_id: Uuid,
}
