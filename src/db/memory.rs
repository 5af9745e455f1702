//! In-process store with the same filtering semantics as the Postgres queries.
//!
//! Backs the test suites and local runs without a database.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{AnimeRepository, FriendshipRepository, UserRepository},
    error::{AppError, AppResult},
    models::{
        AddAnimeInput, AnimeMetadata, FriendListItem, Friendship, FriendshipStatus, ListOptions,
        PublicProfile, SortBy, SortOrder, UpdateAnimeInput, UpdateProfileInput, User,
        UserAnimeDetails, UserAnimeEntry,
    },
};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    animes: HashMap<i32, AnimeMetadata>,
    entries: Vec<UserAnimeEntry>,
    friendships: Vec<Friendship>,
}

impl State {
    fn details(&self, entry: &UserAnimeEntry) -> Option<UserAnimeDetails> {
        self.animes.get(&entry.mal_id).map(|anime| UserAnimeDetails {
            entry: entry.clone(),
            anime: anime.clone(),
        })
    }

    fn list_item(&self, friendship: &Friendship, friend_id: &str) -> Option<FriendListItem> {
        self.users.get(friend_id).map(|friend| FriendListItem {
            friendship_id: friendship.id,
            status: friendship.status,
            friendship_created_at: friendship.created_at,
            friend_id: friend.id.clone(),
            friend_name: friend.display_name.clone(),
            friend_avatar: friend.avatar_url.clone(),
            friend_email: friend.email.clone(),
        })
    }
}

fn is_pair(friendship: &Friendship, a: &str, b: &str) -> bool {
    (friendship.requester_id == a && friendship.addressee_id == b)
        || (friendship.requester_id == b && friendship.addressee_id == a)
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile, standing in for the identity provider's sign-up hook
    pub async fn insert_user(&self, id: &str, email: &str, display_name: Option<&str>) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        user
    }

    /// All friendship rows, in insertion order
    pub async fn friendships(&self) -> Vec<Friendship> {
        self.state.read().await.friendships.clone()
    }
}

#[async_trait::async_trait]
impl AnimeRepository for MemoryStore {
    async fn find_metadata(&self, mal_id: i32) -> AppResult<Option<AnimeMetadata>> {
        Ok(self.state.read().await.animes.get(&mal_id).cloned())
    }

    async fn upsert_metadata(&self, metadata: &AnimeMetadata) -> AppResult<AnimeMetadata> {
        self.state
            .write()
            .await
            .animes
            .insert(metadata.mal_id, metadata.clone());
        Ok(metadata.clone())
    }

    async fn find_entry_by_mal_id(
        &self,
        user_id: &str,
        mal_id: i32,
    ) -> AppResult<Option<UserAnimeEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .find(|e| e.user_id == user_id && e.mal_id == mal_id)
            .cloned())
    }

    async fn insert_entry(
        &self,
        user_id: &str,
        input: &AddAnimeInput,
    ) -> AppResult<UserAnimeEntry> {
        let mut state = self.state.write().await;
        if state
            .entries
            .iter()
            .any(|e| e.user_id == user_id && e.mal_id == input.mal_id)
        {
            return Err(AppError::AlreadyExists(
                "Anime already in your list".to_string(),
            ));
        }
        if !state.animes.contains_key(&input.mal_id) {
            return Err(AppError::Internal(format!(
                "No cached metadata for anime {}",
                input.mal_id
            )));
        }

        let now = Utc::now();
        let entry = UserAnimeEntry {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            mal_id: input.mal_id,
            user_rating: input.user_rating,
            animation_rating: input.animation_rating,
            user_description: input.user_description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> AppResult<Option<UserAnimeDetails>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .find(|e| e.id == entry_id && e.user_id == user_id)
            .and_then(|e| state.details(e)))
    }

    async fn list_entries(
        &self,
        user_id: &str,
        options: &ListOptions,
    ) -> AppResult<Vec<UserAnimeDetails>> {
        let state = self.state.read().await;
        let mut rows: Vec<UserAnimeDetails> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| state.details(e))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match options.sort_by {
                SortBy::AddedAt => a.entry.created_at.cmp(&b.entry.created_at),
                SortBy::UserRating => a.entry.user_rating.cmp(&b.entry.user_rating),
                SortBy::Title => a.anime.title.cmp(&b.anime.title),
            };
            match options.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Ok(rows
            .into_iter()
            .skip(options.offset() as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count_entries(&self, user_id: &str) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.entries.iter().filter(|e| e.user_id == user_id).count() as i64)
    }

    async fn all_entries(&self, user_id: &str) -> AppResult<Vec<UserAnimeDetails>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| state.details(e))
            .collect())
    }

    async fn mal_ids(&self, user_id: &str) -> AppResult<Vec<i32>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.mal_id)
            .collect())
    }

    async fn ratings(&self, user_id: &str) -> AppResult<Vec<(i16, i16)>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| (e.user_rating, e.animation_rating))
            .collect())
    }

    async fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        patch: &UpdateAnimeInput,
    ) -> AppResult<Option<UserAnimeEntry>> {
        let mut state = self.state.write().await;
        let Some(entry) = state
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id && e.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(rating) = patch.user_rating {
            entry.user_rating = rating;
        }
        if let Some(rating) = patch.animation_rating {
            entry.animation_rating = rating;
        }
        if let Some(description) = &patch.user_description {
            entry.user_description = description.clone();
        }
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    async fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state
            .entries
            .retain(|e| !(e.id == entry_id && e.user_id == user_id));
        Ok(state.entries.len() < before)
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for MemoryStore {
    async fn find_active_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .filter(|f| is_pair(f, a, b) && f.status.blocks_new_request())
            .last()
            .cloned())
    }

    async fn find_latest_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .filter(|f| is_pair(f, a, b))
            .last()
            .cloned())
    }

    async fn insert_request(
        &self,
        requester_id: &str,
        addressee_id: &str,
    ) -> AppResult<Friendship> {
        let mut state = self.state.write().await;
        if state
            .friendships
            .iter()
            .any(|f| is_pair(f, requester_id, addressee_id) && f.status.blocks_new_request())
        {
            return Err(AppError::AlreadyExists(
                "Friend request already pending".to_string(),
            ));
        }
        let friendship = Friendship {
            id: Uuid::new_v4(),
            requester_id: requester_id.to_string(),
            addressee_id: addressee_id.to_string(),
            status: FriendshipStatus::Pending,
            created_at: Utc::now(),
        };
        state.friendships.push(friendship.clone());
        Ok(friendship)
    }

    async fn respond(
        &self,
        addressee_id: &str,
        friendship_id: Uuid,
        status: FriendshipStatus,
    ) -> AppResult<Option<Friendship>> {
        let mut state = self.state.write().await;
        let Some(friendship) = state.friendships.iter_mut().find(|f| {
            f.id == friendship_id
                && f.addressee_id == addressee_id
                && f.status == FriendshipStatus::Pending
        }) else {
            return Ok(None);
        };
        friendship.status = status;
        Ok(Some(friendship.clone()))
    }

    async fn delete_sent_request(
        &self,
        requester_id: &str,
        friendship_id: Uuid,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.friendships.len();
        state.friendships.retain(|f| {
            !(f.id == friendship_id
                && f.requester_id == requester_id
                && f.status == FriendshipStatus::Pending)
        });
        Ok(state.friendships.len() < before)
    }

    async fn delete_settled(&self, user_id: &str, friendship_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let before = state.friendships.len();
        state.friendships.retain(|f| {
            !(f.id == friendship_id
                && f.involves(user_id)
                && f.status != FriendshipStatus::Pending)
        });
        Ok(state.friendships.len() < before)
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        friendship_id: Uuid,
    ) -> AppResult<Option<Friendship>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .find(|f| f.id == friendship_id && f.involves(user_id))
            .cloned())
    }

    async fn friends(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .rev()
            .filter(|f| f.status == FriendshipStatus::Accepted && f.involves(user_id))
            .filter_map(|f| state.list_item(f, f.other_party(user_id)))
            .collect())
    }

    async fn pending_received(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .rev()
            .filter(|f| f.status == FriendshipStatus::Pending && f.addressee_id == user_id)
            .filter_map(|f| state.list_item(f, &f.requester_id))
            .collect())
    }

    async fn pending_sent(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .rev()
            .filter(|f| f.status == FriendshipStatus::Pending && f.requester_id == user_id)
            .filter_map(|f| state.list_item(f, &f.addressee_id))
            .collect())
    }

    async fn count_friends(&self, user_id: &str) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted && f.involves(user_id))
            .count() as i64)
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<PublicProfile>> {
        let needle = query.to_lowercase();
        let state = self.state.read().await;
        let mut matches: Vec<&User> = state
            .users
            .values()
            .filter(|u| u.id != excluding_user_id)
            .filter(|u| {
                u.email.to_lowercase().contains(&needle)
                    || u
                        .display_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .collect();

        matches.sort_by(|a, b| match (&a.display_name, &b.display_name) {
            (Some(x), Some(y)) => x.cmp(y).then_with(|| a.email.cmp(&b.email)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.email.cmp(&b.email),
        });

        Ok(matches
            .into_iter()
            .take(limit.max(0) as usize)
            .cloned()
            .map(PublicProfile::from)
            .collect())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        input: &UpdateProfileInput,
    ) -> AppResult<Option<User>> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(name) = &input.display_name {
            user.display_name = Some(name.clone());
        }
        if let Some(url) = &input.avatar_url {
            user.avatar_url = Some(url.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, user_id: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.users.remove(user_id).is_some();
        if removed {
            state.entries.retain(|e| e.user_id != user_id);
            state.friendships.retain(|f| !f.involves(user_id));
        }
        Ok(removed)
    }
}
