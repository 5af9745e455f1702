use super::{like_pattern, PgStore};
use crate::{
    db::UserRepository,
    error::AppResult,
    models::{PublicProfile, UpdateProfileInput, User},
};

#[async_trait::async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn search(
        &self,
        query: &str,
        excluding_user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<PublicProfile>> {
        let rows = sqlx::query_as::<_, PublicProfile>(
            r#"
            SELECT id, email, display_name, avatar_url FROM users
            WHERE (email ILIKE $1 OR display_name ILIKE $1) AND id <> $2
            ORDER BY display_name NULLS LAST, email
            LIMIT $3
            "#,
        )
        .bind(like_pattern(query))
        .bind(excluding_user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        input: &UpdateProfileInput,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                avatar_url = COALESCE($3, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.display_name)
        .bind(&input.avatar_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
