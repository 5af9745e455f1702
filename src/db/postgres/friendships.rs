use uuid::Uuid;

use super::PgStore;
use crate::{
    db::FriendshipRepository,
    error::{AppError, AppResult},
    models::{FriendListItem, Friendship, FriendshipStatus},
};

const PAIR_FILTER: &str =
    "((requester_id = $1 AND addressee_id = $2) OR (requester_id = $2 AND addressee_id = $1))";

#[async_trait::async_trait]
impl FriendshipRepository for PgStore {
    async fn find_active_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>> {
        let sql = format!(
            "SELECT * FROM friendships WHERE {} AND status IN ('pending', 'accepted') \
             ORDER BY created_at DESC LIMIT 1",
            PAIR_FILTER
        );
        let row = sqlx::query_as::<_, Friendship>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_latest_between(&self, a: &str, b: &str) -> AppResult<Option<Friendship>> {
        let sql = format!(
            "SELECT * FROM friendships WHERE {} ORDER BY created_at DESC LIMIT 1",
            PAIR_FILTER
        );
        let row = sqlx::query_as::<_, Friendship>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_request(
        &self,
        requester_id: &str,
        addressee_id: &str,
    ) -> AppResult<Friendship> {
        let row = sqlx::query_as::<_, Friendship>(
            r#"
            INSERT INTO friendships (id, requester_id, addressee_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(addressee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Friend request already pending"))?;
        Ok(row)
    }

    async fn respond(
        &self,
        addressee_id: &str,
        friendship_id: Uuid,
        status: FriendshipStatus,
    ) -> AppResult<Option<Friendship>> {
        let row = sqlx::query_as::<_, Friendship>(
            r#"
            UPDATE friendships SET status = $3
            WHERE id = $1 AND addressee_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(friendship_id)
        .bind(addressee_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_sent_request(
        &self,
        requester_id: &str,
        friendship_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM friendships WHERE id = $1 AND requester_id = $2 AND status = 'pending'",
        )
        .bind(friendship_id)
        .bind(requester_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_settled(&self, user_id: &str, friendship_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM friendships
            WHERE id = $1
              AND (requester_id = $2 OR addressee_id = $2)
              AND status IN ('accepted', 'rejected')
            "#,
        )
        .bind(friendship_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        friendship_id: Uuid,
    ) -> AppResult<Option<Friendship>> {
        let row = sqlx::query_as::<_, Friendship>(
            "SELECT * FROM friendships WHERE id = $1 AND (requester_id = $2 OR addressee_id = $2)",
        )
        .bind(friendship_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn friends(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let rows = sqlx::query_as::<_, FriendListItem>(
            r#"
            SELECT f.id AS friendship_id, f.status, f.created_at AS friendship_created_at,
                   u.id AS friend_id, u.display_name AS friend_name,
                   u.avatar_url AS friend_avatar, u.email AS friend_email
            FROM friendships f
            JOIN users u ON u.id = CASE WHEN f.requester_id = $1 THEN f.addressee_id ELSE f.requester_id END
            WHERE (f.requester_id = $1 OR f.addressee_id = $1) AND f.status = 'accepted'
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pending_received(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let rows = sqlx::query_as::<_, FriendListItem>(
            r#"
            SELECT f.id AS friendship_id, f.status, f.created_at AS friendship_created_at,
                   u.id AS friend_id, u.display_name AS friend_name,
                   u.avatar_url AS friend_avatar, u.email AS friend_email
            FROM friendships f
            JOIN users u ON u.id = f.requester_id
            WHERE f.addressee_id = $1 AND f.status = 'pending'
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pending_sent(&self, user_id: &str) -> AppResult<Vec<FriendListItem>> {
        let rows = sqlx::query_as::<_, FriendListItem>(
            r#"
            SELECT f.id AS friendship_id, f.status, f.created_at AS friendship_created_at,
                   u.id AS friend_id, u.display_name AS friend_name,
                   u.avatar_url AS friend_avatar, u.email AS friend_email
            FROM friendships f
            JOIN users u ON u.id = f.addressee_id
            WHERE f.requester_id = $1 AND f.status = 'pending'
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_friends(&self, user_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM friendships
            WHERE (requester_id = $1 OR addressee_id = $1) AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
