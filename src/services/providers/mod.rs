/// External anime metadata provider abstraction
///
/// The provider is the only source of anime metadata. It serves free-text
/// search (passed through to callers) and detail lookups by external id
/// (used to fill the metadata cache).
use crate::{error::AppResult, models::JikanAnime};

pub mod jikan;

pub use jikan::JikanProvider;

/// Trait for anime metadata providers
///
/// Implementations report non-2xx responses as `AppError::ExternalApi` and
/// never retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnimeProvider: Send + Sync {
    /// Search anime by free-text query, returning at most `limit` results
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<JikanAnime>>;

    /// Fetch full metadata for one external id
    async fn fetch_anime(&self, mal_id: i32) -> AppResult<JikanAnime>;
}
