use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lowest value on the rating scale
pub const MIN_RATING: i16 = 1;
/// Highest value on the rating scale
pub const MAX_RATING: i16 = 6;

/// Rejects ratings outside the 1-6 scale. Values are never clamped.
pub fn validate_rating(field: &str, value: i16) -> AppResult<()> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "{} must be between {} and {}",
            field, MIN_RATING, MAX_RATING
        )))
    }
}

/// Categorical tag attached to an anime (genre, theme, demographic, studio)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: Option<ImageSet>,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aired {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub string: Option<String>,
}

/// Anime as returned by the Jikan API (search results and detail lookups)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JikanAnime {
    pub mal_id: i32,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub images: Option<AnimeImages>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episodes: Option<i32>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rank: Option<i32>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub aired: Option<Aired>,
    #[serde(default)]
    pub genres: Option<Vec<Tag>>,
    #[serde(default)]
    pub themes: Option<Vec<Tag>>,
    #[serde(default)]
    pub demographics: Option<Vec<Tag>>,
    #[serde(default)]
    pub studios: Option<Vec<Tag>>,
}

/// Cached anime metadata, one row per external id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnimeMetadata {
    pub mal_id: i32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub synopsis: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub status: Option<String>,
    pub episodes: Option<i32>,
    pub duration: Option<String>,
    pub score: Option<f64>,
    pub rank: Option<i32>,
    pub popularity: Option<i32>,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub source: Option<String>,
    pub rating: Option<String>,
    pub images: Option<Json<AnimeImages>>,
    pub genres: Json<Vec<Tag>>,
    pub themes: Json<Vec<Tag>>,
    pub demographics: Json<Vec<Tag>>,
    pub studios: Json<Vec<Tag>>,
    pub aired: Option<Json<Aired>>,
    pub cached_at: DateTime<Utc>,
}

impl AnimeMetadata {
    /// Builds a cache row from a provider response, stamped with `cached_at`
    pub fn from_jikan(anime: JikanAnime, cached_at: DateTime<Utc>) -> Self {
        Self {
            mal_id: anime.mal_id,
            title: anime.title,
            title_english: anime.title_english,
            title_japanese: anime.title_japanese,
            synopsis: anime.synopsis,
            anime_type: anime.anime_type,
            status: anime.status,
            episodes: anime.episodes,
            duration: anime.duration,
            score: anime.score,
            rank: anime.rank,
            popularity: anime.popularity,
            season: anime.season,
            year: anime.year,
            source: anime.source,
            rating: anime.rating,
            images: anime.images.map(Json),
            genres: Json(anime.genres.unwrap_or_default()),
            themes: Json(anime.themes.unwrap_or_default()),
            demographics: Json(anime.demographics.unwrap_or_default()),
            studios: Json(anime.studios.unwrap_or_default()),
            aired: anime.aired.map(Json),
            cached_at,
        }
    }

    /// True while the row is younger than `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.cached_at < ttl
    }
}

/// One user's personal record for one anime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAnimeEntry {
    pub id: Uuid,
    pub user_id: String,
    pub mal_id: i32,
    pub user_rating: i16,
    pub animation_rating: i16,
    pub user_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list entry joined with its cached metadata
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAnimeDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: UserAnimeEntry,
    #[sqlx(flatten)]
    pub anime: AnimeMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAnimeInput {
    pub mal_id: i32,
    pub user_rating: i16,
    pub animation_rating: i16,
    #[serde(default)]
    pub user_description: Option<String>,
}

impl AddAnimeInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.mal_id <= 0 {
            return Err(AppError::InvalidInput(
                "malId is required and must be a positive number".to_string(),
            ));
        }
        validate_rating("userRating", self.user_rating)?;
        validate_rating("animationRating", self.animation_rating)
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update; `None` fields are left untouched
///
/// `user_description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnimeInput {
    #[serde(default)]
    pub user_rating: Option<i16>,
    #[serde(default)]
    pub animation_rating: Option<i16>,
    #[serde(default, deserialize_with = "present")]
    pub user_description: Option<Option<String>>,
}

impl UpdateAnimeInput {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(rating) = self.user_rating {
            validate_rating("userRating", rating)?;
        }
        if let Some(rating) = self.animation_rating {
            validate_rating("animationRating", rating)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "addedAt", alias = "added_at")]
    AddedAt,
    #[serde(rename = "userRating", alias = "user_rating")]
    UserRating,
    #[serde(rename = "title")]
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Paging and ordering for a user's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl ListOptions {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamps page to >= 1 and limit to 1..=100
    pub fn new(page: u32, limit: u32, sort_by: SortBy, sort_order: SortOrder) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
            sort_by,
            sort_order,
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn has_more(&self, total: i64) -> bool {
        i64::from(self.page) * i64::from(self.limit) < total
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT, SortBy::default(), SortOrder::default())
    }
}

/// Result of partitioning two users' lists by shared external id
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListComparison {
    pub common: Vec<UserAnimeDetails>,
    pub only_me: Vec<UserAnimeDetails>,
    pub only_them: Vec<UserAnimeDetails>,
}
