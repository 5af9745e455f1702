use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{AnimeRepository, FriendshipRepository, UserRepository},
    error::{AppError, AppResult},
    models::{
        FriendListItem, FriendWithStats, Friendship, FriendshipStatus, FriendshipStatusInfo,
    },
};

/// Friend requests and the accepted-friend graph
pub struct FriendService {
    friendships: Arc<dyn FriendshipRepository>,
    users: Arc<dyn UserRepository>,
    animes: Arc<dyn AnimeRepository>,
}

impl FriendService {
    pub fn new(
        friendships: Arc<dyn FriendshipRepository>,
        users: Arc<dyn UserRepository>,
        animes: Arc<dyn AnimeRepository>,
    ) -> Self {
        Self {
            friendships,
            users,
            animes,
        }
    }

    pub async fn get_friends(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        self.friendships.friends(user_id).await
    }

    /// Friends with their list size and the number of anime shared with the caller
    pub async fn get_friends_with_stats(&self, user_id: &str) -> AppResult<Vec<FriendWithStats>> {
        let friends = self.friendships.friends(user_id).await?;
        let mine: HashSet<i32> = self.animes.mal_ids(user_id).await?.into_iter().collect();

        let mut result = Vec::with_capacity(friends.len());
        for friend in friends {
            let theirs = self.animes.mal_ids(&friend.friend_id).await?;
            let common = theirs.iter().filter(|id| mine.contains(id)).count();
            result.push(FriendWithStats {
                anime_count: theirs.len() as i64,
                common_anime_count: common as i64,
                friend,
            });
        }

        Ok(result)
    }

    pub async fn get_pending_requests(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        self.friendships.pending_received(user_id).await
    }

    pub async fn get_sent_requests(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        self.friendships.pending_sent(user_id).await
    }

    /// Creates a pending request from `user_id` to `target_id`
    ///
    /// Refused when a pending or accepted row already links the pair in either
    /// direction. A rejected row does not block a new request.
    pub async fn send_friend_request(
        &self,
        user_id: &str,
        target_id: &str,
    ) -> AppResult<Friendship> {
        if user_id == target_id {
            return Err(AppError::InvalidInput(
                "Cannot send a friend request to yourself".to_string(),
            ));
        }

        if self.users.find_by_id(target_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        if let Some(existing) = self
            .friendships
            .find_active_between(user_id, target_id)
            .await?
        {
            let message = match existing.status {
                FriendshipStatus::Accepted => "Already friends",
                _ => "Friend request already pending",
            };
            return Err(AppError::AlreadyExists(message.to_string()));
        }

        let friendship = self.friendships.insert_request(user_id, target_id).await?;

        tracing::info!(
            requester_id = %user_id,
            addressee_id = %target_id,
            friendship_id = %friendship.id,
            "Friend request sent"
        );

        Ok(friendship)
    }

    pub async fn accept_request(&self, user_id: &str, friendship_id: Uuid) -> AppResult<Friendship> {
        self.respond(user_id, friendship_id, FriendshipStatus::Accepted)
            .await
    }

    pub async fn reject_request(&self, user_id: &str, friendship_id: Uuid) -> AppResult<Friendship> {
        self.respond(user_id, friendship_id, FriendshipStatus::Rejected)
            .await
    }

    async fn respond(
        &self,
        user_id: &str,
        friendship_id: Uuid,
        status: FriendshipStatus,
    ) -> AppResult<Friendship> {
        let friendship = self
            .friendships
            .respond(user_id, friendship_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

        tracing::info!(
            user_id = %user_id,
            friendship_id = %friendship_id,
            status = ?status,
            "Friend request answered"
        );

        Ok(friendship)
    }

    /// Deletes an accepted or rejected row touching the caller
    pub async fn remove_friend(&self, user_id: &str, friendship_id: Uuid) -> AppResult<()> {
        if !self.friendships.delete_settled(user_id, friendship_id).await? {
            return Err(AppError::NotFound("Friendship not found".to_string()));
        }
        tracing::info!(user_id = %user_id, friendship_id = %friendship_id, "Friend removed");
        Ok(())
    }

    /// Withdraws a pending request the caller sent
    pub async fn cancel_request(&self, user_id: &str, friendship_id: Uuid) -> AppResult<()> {
        if !self
            .friendships
            .delete_sent_request(user_id, friendship_id)
            .await?
        {
            return Err(AppError::NotFound("Friend request not found".to_string()));
        }
        tracing::info!(user_id = %user_id, friendship_id = %friendship_id, "Friend request cancelled");
        Ok(())
    }

    /// Cancels the row if it is a pending request the caller sent, removes it otherwise
    pub async fn remove_or_cancel(&self, user_id: &str, friendship_id: Uuid) -> AppResult<()> {
        let friendship = self
            .friendships
            .find_for_user(user_id, friendship_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Friendship not found".to_string()))?;

        match friendship.status {
            FriendshipStatus::Pending if friendship.requester_id == user_id => {
                self.cancel_request(user_id, friendship_id).await
            }
            FriendshipStatus::Pending => Err(AppError::InvalidInput(
                "Pending requests must be accepted or rejected".to_string(),
            )),
            _ => self.remove_friend(user_id, friendship_id).await,
        }
    }

    /// Latest relationship between the caller and another user, if any
    pub async fn check_friendship_status(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> AppResult<FriendshipStatusInfo> {
        Ok(self
            .friendships
            .find_latest_between(user_id, other_id)
            .await?
            .map(|f| FriendshipStatusInfo::for_user(&f, user_id))
            .unwrap_or_else(FriendshipStatusInfo::none))
    }

    pub async fn are_friends(&self, user_id: &str, other_id: &str) -> AppResult<bool> {
        Ok(self
            .friendships
            .find_active_between(user_id, other_id)
            .await?
            .is_some_and(|f| f.status == FriendshipStatus::Accepted))
    }
}
