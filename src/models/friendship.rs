use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipStatus {
    /// Statuses that prevent a new request between the same pair
    pub fn blocks_new_request(self) -> bool {
        matches!(self, FriendshipStatus::Pending | FriendshipStatus::Accepted)
    }
}

/// Directed request between a requester and an addressee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: String,
    pub addressee_id: String,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }

    /// The party that is not `user_id`
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.requester_id == user_id {
            &self.addressee_id
        } else {
            &self.requester_id
        }
    }
}

/// A friendship seen from one side, with the other party's public profile
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FriendListItem {
    pub friendship_id: Uuid,
    pub status: FriendshipStatus,
    pub friendship_created_at: DateTime<Utc>,
    pub friend_id: String,
    pub friend_name: Option<String>,
    pub friend_avatar: Option<String>,
    pub friend_email: String,
}

impl FriendListItem {
    pub fn label(&self) -> &str {
        self.friend_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.friend_email)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendWithStats {
    #[serde(flatten)]
    pub friend: FriendListItem,
    pub anime_count: i64,
    pub common_anime_count: i64,
}

/// Relationship between the caller and another user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipStatusInfo {
    pub status: Option<FriendshipStatus>,
    pub friendship_id: Option<Uuid>,
    pub is_requester: bool,
}

impl FriendshipStatusInfo {
    pub fn none() -> Self {
        Self {
            status: None,
            friendship_id: None,
            is_requester: false,
        }
    }

    pub fn for_user(friendship: &Friendship, user_id: &str) -> Self {
        Self {
            status: Some(friendship.status),
            friendship_id: Some(friendship.id),
            is_requester: friendship.requester_id == user_id,
        }
    }
}
