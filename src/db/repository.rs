//! Storage seams used by the services.
//!
//! Every method that reads or mutates user-owned rows takes the acting user id
//! and must apply it as a filter predicate in the underlying query. A row owned
//! by someone else is indistinguishable from a missing row.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AddAnimeInput, AnimeMetadata, FriendListItem, Friendship, FriendshipStatus, ListOptions,
        PublicProfile, UpdateAnimeInput, UpdateProfileInput, User, UserAnimeDetails,
        UserAnimeEntry,
    },
};

#[async_trait::async_trait]
pub trait AnimeRepository: Send + Sync {
    async fn find_metadata(&self, mal_id: i32) -> AppResult<Option<AnimeMetadata>>;

    /// Inserts or replaces the cache row for `metadata.mal_id`
    async fn upsert_metadata(&self, metadata: &AnimeMetadata) -> AppResult<AnimeMetadata>;

    async fn find_entry_by_mal_id(
        &self,
        user_id: &str,
        mal_id: i32,
    ) -> AppResult<Option<UserAnimeEntry>>;

    /// Fails with `AlreadyExists` if `(user_id, mal_id)` is taken
    async fn insert_entry(&self, user_id: &str, input: &AddAnimeInput)
        -> AppResult<UserAnimeEntry>;

    async fn get_entry(&self, user_id: &str, entry_id: Uuid)
        -> AppResult<Option<UserAnimeDetails>>;

    async fn list_entries(
        &self,
        user_id: &str,
        options: &ListOptions,
    ) -> AppResult<Vec<UserAnimeDetails>>;

    async fn count_entries(&self, user_id: &str) -> AppResult<i64>;

    /// Every entry of a user, unpaginated, most recent first
    async fn all_entries(&self, user_id: &str) -> AppResult<Vec<UserAnimeDetails>>;

    async fn mal_ids(&self, user_id: &str) -> AppResult<Vec<i32>>;

    /// `(user_rating, animation_rating)` for each entry of a user
    async fn ratings(&self, user_id: &str) -> AppResult<Vec<(i16, i16)>>;

    /// Returns `None` when no row matches both id and owner
    async fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        patch: &UpdateAnimeInput,
    ) -> AppResult<Option<UserAnimeEntry>>;

    /// Returns whether a row was deleted
    async fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<bool>;
}

#[async_trait::async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// A pending or accepted row between the pair, in either direction
    async fn find_active_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>>;

    /// The most recent row between the pair, in either direction, any status
    async fn find_latest_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>>;

    async fn insert_request(&self, requester_id: &str, addressee_id: &str)
        -> AppResult<Friendship>;

    /// Moves a pending row addressed to `addressee_id` to `status`
    async fn respond(
        &self,
        addressee_id: &str,
        friendship_id: Uuid,
        status: FriendshipStatus,
    ) -> AppResult<Option<Friendship>>;

    /// Deletes a pending row sent by `requester_id`
    async fn delete_sent_request(&self, requester_id: &str, friendship_id: Uuid)
        -> AppResult<bool>;

    /// Deletes a settled (accepted or rejected) row touching `user_id`
    async fn delete_settled(&self, user_id: &str, friendship_id: Uuid) -> AppResult<bool>;

    async fn find_for_user(&self, user_id: &str, friendship_id: Uuid)
        -> AppResult<Option<Friendship>>;

    /// Accepted friendships touching `user_id`, seen from `user_id`
    async fn friends(&self, user_id: &str) -> AppResult<Vec<FriendListItem>>;

    async fn pending_received(&self, user_id: &str) -> AppResult<Vec<FriendListItem>>;

    async fn pending_sent(&self, user_id: &str) -> AppResult<Vec<FriendListItem>>;

    async fn count_friends(&self, user_id: &str) -> AppResult<i64>;
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>>;

    /// Case-insensitive substring match on email or display name
    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<PublicProfile>>;

    async fn update_profile(
        &self,
        user_id: &str,
        input: &UpdateProfileInput,
    ) -> AppResult<Option<User>>;

    async fn delete(&self, user_id: &str) -> AppResult<bool>;
}
