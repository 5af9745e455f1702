use std::sync::Arc;

use crate::{
    db::{AnimeRepository, FriendshipRepository, UserRepository},
    error::{AppError, AppResult},
    models::{round_one_decimal, PublicProfile, UpdateProfileInput, User, UserStats},
};

pub const MIN_USER_QUERY_LEN: usize = 3;
pub const USER_SEARCH_LIMIT: i64 = 10;

/// Profiles, user search and list statistics
pub struct UserService {
    users: Arc<dyn UserRepository>,
    animes: Arc<dyn AnimeRepository>,
    friendships: Arc<dyn FriendshipRepository>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        animes: Arc<dyn AnimeRepository>,
        friendships: Arc<dyn FriendshipRepository>,
    ) -> Self {
        Self {
            users,
            animes,
            friendships,
        }
    }

    /// The caller's own profile; `None` until the identity provider has created it
    pub async fn get_current_user(&self, user_id: &str) -> AppResult<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> AppResult<Option<PublicProfile>> {
        Ok(self.users.find_by_id(user_id).await?.map(PublicProfile::from))
    }

    /// Substring search over email and display name, excluding the caller
    pub async fn search_users(&self, query: &str, user_id: &str) -> AppResult<Vec<PublicProfile>> {
        let query = query.trim();
        if query.chars().count() < MIN_USER_QUERY_LEN {
            return Err(AppError::InvalidInput(format!(
                "Query must be at least {} characters",
                MIN_USER_QUERY_LEN
            )));
        }
        self.users.search(query, user_id, USER_SEARCH_LIMIT).await
    }

    pub async fn update_profile(&self, user_id: &str, input: &UpdateProfileInput) -> AppResult<User> {
        input.validate()?;

        let user = self
            .users
            .update_profile(user_id, input)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, "Profile updated");

        Ok(user)
    }

    /// List size, mean ratings rounded to one decimal, and friend count
    pub async fn get_user_stats(&self, user_id: &str) -> AppResult<UserStats> {
        let ratings = self.animes.ratings(user_id).await?;
        let total_friends = self.friendships.count_friends(user_id).await?;

        let (average_rating, average_animation_rating) = if ratings.is_empty() {
            (0.0, 0.0)
        } else {
            let count = ratings.len() as f64;
            let (user_sum, animation_sum) = ratings
                .iter()
                .fold((0i64, 0i64), |(u, a), (user, animation)| {
                    (u + i64::from(*user), a + i64::from(*animation))
                });
            (
                round_one_decimal(user_sum as f64 / count),
                round_one_decimal(animation_sum as f64 / count),
            )
        };

        Ok(UserStats {
            total_animes: ratings.len() as i64,
            average_rating,
            average_animation_rating,
            total_friends,
        })
    }

    /// Deletes the profile together with its entries and friendships
    ///
    /// The identity provider's own account record is not touched.
    pub async fn delete_account(&self, user_id: &str) -> AppResult<()> {
        if !self.users.delete(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::warn!(
            user_id = %user_id,
            "Profile deleted; identity provider account must be removed separately"
        );
        Ok(())
    }
}
