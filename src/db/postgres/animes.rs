use uuid::Uuid;

use super::PgStore;
use crate::{
    db::AnimeRepository,
    error::{AppError, AppResult},
    models::{
        AddAnimeInput, AnimeMetadata, ListOptions, SortBy, SortOrder, UpdateAnimeInput,
        UserAnimeDetails, UserAnimeEntry,
    },
};

const DETAILS_COLUMNS: &str = r#"
    ua.id, ua.user_id, ua.mal_id, ua.user_rating, ua.animation_rating, ua.user_description,
    ua.created_at, ua.updated_at,
    a.title, a.title_english, a.title_japanese, a.synopsis, a.type, a.status, a.episodes,
    a.duration, a.score, a.rank, a.popularity, a.season, a.year, a.source, a.rating,
    a.images, a.genres, a.themes, a.demographics, a.studios, a.aired, a.cached_at
"#;

fn order_clause(options: &ListOptions) -> String {
    let column = match options.sort_by {
        SortBy::AddedAt => "ua.created_at",
        SortBy::UserRating => "ua.user_rating",
        SortBy::Title => "a.title",
    };
    let direction = match options.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!("ORDER BY {} {}, ua.id", column, direction)
}

#[async_trait::async_trait]
impl AnimeRepository for PgStore {
    async fn find_metadata(&self, mal_id: i32) -> AppResult<Option<AnimeMetadata>> {
        let row = sqlx::query_as::<_, AnimeMetadata>("SELECT * FROM animes WHERE mal_id = $1")
            .bind(mal_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_metadata(&self, metadata: &AnimeMetadata) -> AppResult<AnimeMetadata> {
        let row = sqlx::query_as::<_, AnimeMetadata>(
            r#"
            INSERT INTO animes (
                mal_id, title, title_english, title_japanese, synopsis, type, status, episodes,
                duration, score, rank, popularity, season, year, source, rating,
                images, genres, themes, demographics, studios, aired, cached_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23)
            ON CONFLICT (mal_id) DO UPDATE SET
                title = EXCLUDED.title,
                title_english = EXCLUDED.title_english,
                title_japanese = EXCLUDED.title_japanese,
                synopsis = EXCLUDED.synopsis,
                type = EXCLUDED.type,
                status = EXCLUDED.status,
                episodes = EXCLUDED.episodes,
                duration = EXCLUDED.duration,
                score = EXCLUDED.score,
                rank = EXCLUDED.rank,
                popularity = EXCLUDED.popularity,
                season = EXCLUDED.season,
                year = EXCLUDED.year,
                source = EXCLUDED.source,
                rating = EXCLUDED.rating,
                images = EXCLUDED.images,
                genres = EXCLUDED.genres,
                themes = EXCLUDED.themes,
                demographics = EXCLUDED.demographics,
                studios = EXCLUDED.studios,
                aired = EXCLUDED.aired,
                cached_at = EXCLUDED.cached_at
            RETURNING *
            "#,
        )
        .bind(metadata.mal_id)
        .bind(&metadata.title)
        .bind(&metadata.title_english)
        .bind(&metadata.title_japanese)
        .bind(&metadata.synopsis)
        .bind(&metadata.anime_type)
        .bind(&metadata.status)
        .bind(metadata.episodes)
        .bind(&metadata.duration)
        .bind(metadata.score)
        .bind(metadata.rank)
        .bind(metadata.popularity)
        .bind(&metadata.season)
        .bind(metadata.year)
        .bind(&metadata.source)
        .bind(&metadata.rating)
        .bind(&metadata.images)
        .bind(&metadata.genres)
        .bind(&metadata.themes)
        .bind(&metadata.demographics)
        .bind(&metadata.studios)
        .bind(&metadata.aired)
        .bind(metadata.cached_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_entry_by_mal_id(
        &self,
        user_id: &str,
        mal_id: i32,
    ) -> AppResult<Option<UserAnimeEntry>> {
        let row = sqlx::query_as::<_, UserAnimeEntry>(
            "SELECT * FROM user_animes WHERE user_id = $1 AND mal_id = $2",
        )
        .bind(user_id)
        .bind(mal_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_entry(
        &self,
        user_id: &str,
        input: &AddAnimeInput,
    ) -> AppResult<UserAnimeEntry> {
        sqlx::query_as::<_, UserAnimeEntry>(
            r#"
            INSERT INTO user_animes (id, user_id, mal_id, user_rating, animation_rating, user_description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.mal_id)
        .bind(input.user_rating)
        .bind(input.animation_rating)
        .bind(&input.user_description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Anime already in your list"))
    }

    async fn get_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> AppResult<Option<UserAnimeDetails>> {
        let sql = format!(
            "SELECT {} FROM user_animes ua JOIN animes a ON a.mal_id = ua.mal_id \
             WHERE ua.id = $1 AND ua.user_id = $2",
            DETAILS_COLUMNS
        );
        let row = sqlx::query_as::<_, UserAnimeDetails>(&sql)
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_entries(
        &self,
        user_id: &str,
        options: &ListOptions,
    ) -> AppResult<Vec<UserAnimeDetails>> {
        let sql = format!(
            "SELECT {} FROM user_animes ua JOIN animes a ON a.mal_id = ua.mal_id \
             WHERE ua.user_id = $1 {} LIMIT $2 OFFSET $3",
            DETAILS_COLUMNS,
            order_clause(options)
        );
        let rows = sqlx::query_as::<_, UserAnimeDetails>(&sql)
            .bind(user_id)
            .bind(i64::from(options.limit))
            .bind(options.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_entries(&self, user_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_animes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn all_entries(&self, user_id: &str) -> AppResult<Vec<UserAnimeDetails>> {
        let sql = format!(
            "SELECT {} FROM user_animes ua JOIN animes a ON a.mal_id = ua.mal_id \
             WHERE ua.user_id = $1 ORDER BY ua.created_at DESC, ua.id",
            DETAILS_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserAnimeDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn mal_ids(&self, user_id: &str) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar("SELECT mal_id FROM user_animes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn ratings(&self, user_id: &str) -> AppResult<Vec<(i16, i16)>> {
        let rows: Vec<(i16, i16)> = sqlx::query_as(
            "SELECT user_rating, animation_rating FROM user_animes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        patch: &UpdateAnimeInput,
    ) -> AppResult<Option<UserAnimeEntry>> {
        let row = sqlx::query_as::<_, UserAnimeEntry>(
            r#"
            UPDATE user_animes SET
                user_rating = COALESCE($3, user_rating),
                animation_rating = COALESCE($4, animation_rating),
                user_description = CASE WHEN $5 THEN $6 ELSE user_description END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(patch.user_rating)
        .bind(patch.animation_rating)
        .bind(patch.user_description.is_some())
        .bind(patch.user_description.clone().flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_animes WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
