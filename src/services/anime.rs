use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::AnimeRepository,
    error::{AppError, AppResult},
    models::{
        AddAnimeInput, AnimeMetadata, JikanAnime, ListComparison, ListOptions, UpdateAnimeInput,
        UserAnimeDetails, UserAnimeEntry,
    },
    services::{providers::AnimeProvider, rate_limit::SearchThrottle},
};

/// Minimum length of a provider search query
pub const MIN_SEARCH_QUERY_LEN: usize = 3;
/// Largest page a provider search may return
pub const MAX_SEARCH_LIMIT: u32 = 25;
/// Default metadata freshness window
pub const DEFAULT_METADATA_TTL_DAYS: i64 = 7;

/// List entries, metadata cache and provider search
pub struct AnimeService {
    repo: Arc<dyn AnimeRepository>,
    provider: Arc<dyn AnimeProvider>,
    throttle: Arc<SearchThrottle>,
    metadata_ttl: chrono::Duration,
}

impl AnimeService {
    pub fn new(
        repo: Arc<dyn AnimeRepository>,
        provider: Arc<dyn AnimeProvider>,
        throttle: Arc<SearchThrottle>,
        metadata_ttl: chrono::Duration,
    ) -> Self {
        Self {
            repo,
            provider,
            throttle,
            metadata_ttl,
        }
    }

    /// One page of a user's list plus the total entry count
    ///
    /// The count and the page are read separately and may disagree under
    /// concurrent writes.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        options: &ListOptions,
    ) -> AppResult<(Vec<UserAnimeDetails>, i64)> {
        let total = self.repo.count_entries(user_id).await?;
        let items = self.repo.list_entries(user_id, options).await?;
        Ok((items, total))
    }

    pub async fn get_one(&self, user_id: &str, entry_id: Uuid) -> AppResult<UserAnimeDetails> {
        self.repo
            .get_entry(user_id, entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Anime not found".to_string()))
    }

    /// Every entry of a user, unpaginated
    pub async fn entries_for_user(&self, user_id: &str) -> AppResult<Vec<UserAnimeDetails>> {
        self.repo.all_entries(user_id).await
    }

    /// Adds an anime to the user's list, caching its metadata first
    ///
    /// A provider failure while caching aborts the add; nothing is inserted.
    pub async fn add_to_list(
        &self,
        user_id: &str,
        input: &AddAnimeInput,
    ) -> AppResult<UserAnimeEntry> {
        input.validate()?;

        if self
            .repo
            .find_entry_by_mal_id(user_id, input.mal_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyExists(
                "Anime already in your list".to_string(),
            ));
        }

        self.ensure_cached(input.mal_id).await?;

        let entry = self.repo.insert_entry(user_id, input).await?;

        tracing::info!(
            user_id = %user_id,
            mal_id = input.mal_id,
            entry_id = %entry.id,
            "Anime added to list"
        );

        Ok(entry)
    }

    pub async fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        patch: &UpdateAnimeInput,
    ) -> AppResult<UserAnimeEntry> {
        patch.validate()?;

        let entry = self
            .repo
            .update_entry(user_id, entry_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Anime not found".to_string()))?;

        tracing::info!(user_id = %user_id, entry_id = %entry_id, "Anime entry updated");

        Ok(entry)
    }

    /// Removes an entry; returns whether anything was deleted
    pub async fn remove_from_list(&self, user_id: &str, entry_id: Uuid) -> AppResult<bool> {
        let deleted = self.repo.delete_entry(user_id, entry_id).await?;

        tracing::info!(
            user_id = %user_id,
            entry_id = %entry_id,
            deleted = deleted,
            "Anime removal processed"
        );

        Ok(deleted)
    }

    /// Passes a search through to the provider, throttled
    pub async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<JikanAnime>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Err(AppError::InvalidInput(format!(
                "Query must be at least {} characters",
                MIN_SEARCH_QUERY_LEN
            )));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        self.throttle.wait().await;

        let mut results = self.provider.search(query, limit).await.map_err(|e| match e {
            AppError::ExternalApi(_) | AppError::HttpClient(_) => e,
            other => AppError::ExternalApi(other.to_string()),
        })?;
        results.truncate(limit as usize);

        Ok(results)
    }

    /// Cached metadata for an external id, refreshed when stale
    pub async fn get_metadata(&self, mal_id: i32) -> AppResult<AnimeMetadata> {
        if mal_id <= 0 {
            return Err(AppError::InvalidInput(
                "malId must be a positive number".to_string(),
            ));
        }
        self.ensure_cached(mal_id).await
    }

    /// Partitions two users' lists by shared external id
    pub async fn compare(&self, user_id: &str, other_user_id: &str) -> AppResult<ListComparison> {
        let mine = self.repo.all_entries(user_id).await?;
        let theirs = self.repo.all_entries(other_user_id).await?;
        Ok(partition_lists(mine, theirs))
    }

    async fn ensure_cached(&self, mal_id: i32) -> AppResult<AnimeMetadata> {
        let now = Utc::now();

        if let Some(cached) = self.repo.find_metadata(mal_id).await? {
            if cached.is_fresh(now, self.metadata_ttl) {
                tracing::debug!(mal_id = mal_id, "Metadata cache hit");
                return Ok(cached);
            }
            tracing::debug!(mal_id = mal_id, cached_at = %cached.cached_at, "Metadata cache stale");
        } else {
            tracing::debug!(mal_id = mal_id, "Metadata cache miss");
        }

        let anime = self.provider.fetch_anime(mal_id).await?;
        let metadata = AnimeMetadata::from_jikan(anime, now);
        self.repo.upsert_metadata(&metadata).await
    }
}

/// Splits two lists into shared, mine-only and theirs-only by external id
pub fn partition_lists(
    mine: Vec<UserAnimeDetails>,
    theirs: Vec<UserAnimeDetails>,
) -> ListComparison {
    let my_ids: HashSet<i32> = mine.iter().map(|a| a.entry.mal_id).collect();
    let their_ids: HashSet<i32> = theirs.iter().map(|a| a.entry.mal_id).collect();

    let (common, only_me) = mine
        .into_iter()
        .partition(|a| their_ids.contains(&a.entry.mal_id));
    let only_them = theirs
        .into_iter()
        .filter(|a| !my_ids.contains(&a.entry.mal_id))
        .collect();

    ListComparison {
        common,
        only_me,
        only_them,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::{SortBy, SortOrder},
        services::providers::MockAnimeProvider,
    };
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    fn jikan(mal_id: i32, title: &str) -> JikanAnime {
        serde_json::from_value(serde_json::json!({
            "mal_id": mal_id,
            "title": title,
            "genres": [{ "name": "Drama" }],
        }))
        .unwrap()
    }

    fn add(mal_id: i32, user_rating: i16, animation_rating: i16) -> AddAnimeInput {
        AddAnimeInput {
            mal_id,
            user_rating,
            animation_rating,
            user_description: None,
        }
    }

    fn service(store: Arc<MemoryStore>, provider: MockAnimeProvider) -> AnimeService {
        AnimeService::new(
            store,
            Arc::new(provider),
            Arc::new(SearchThrottle::new(Duration::from_millis(350))),
            chrono::Duration::days(DEFAULT_METADATA_TTL_DAYS),
        )
    }

    fn fetching_provider(times: usize) -> MockAnimeProvider {
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_fetch_anime()
            .times(times)
            .returning(|id| Ok(jikan(id, &format!("Anime {}", id))));
        provider
    }

    #[tokio::test]
    async fn test_add_then_get_returns_exact_ratings() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_fetch_anime()
            .returning(|id| Ok(jikan(id, "Any")));
        let service = service(store, provider);

        for user_rating in 1..=6 {
            for animation_rating in 1..=6 {
                let user = format!("user-{}-{}", user_rating, animation_rating);
                let entry = service
                    .add_to_list(&user, &add(1, user_rating, animation_rating))
                    .await
                    .unwrap();
                let fetched = service.get_one(&user, entry.id).await.unwrap();
                assert_eq!(fetched.entry.user_rating, user_rating);
                assert_eq!(fetched.entry.animation_rating, animation_rating);
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_add_fails_and_keeps_first_entry() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(1));

        let first = service.add_to_list("u1", &add(5114, 6, 5)).await.unwrap();
        let err = service
            .add_to_list("u1", &add(5114, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));

        let stored = service.get_one("u1", first.id).await.unwrap();
        assert_eq!(stored.entry.user_rating, 6);
        assert_eq!(stored.entry.animation_rating, 5);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_rejected_before_fetch() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(0));

        let err = service.add_to_list("u1", &add(1, 0, 3)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_metadata_fetched_once_for_first_add() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(1));

        service.add_to_list("u1", &add(21, 5, 5)).await.unwrap();
        service.add_to_list("u2", &add(21, 3, 4)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_metadata_refetched() {
        let store = Arc::new(MemoryStore::new());
        let stale = AnimeMetadata::from_jikan(
            jikan(21, "One Piece"),
            Utc::now() - chrono::Duration::days(8),
        );
        store.upsert_metadata(&stale).await.unwrap();

        let service = service(store.clone(), fetching_provider(1));
        service.add_to_list("u1", &add(21, 5, 5)).await.unwrap();

        let refreshed = store.find_metadata(21).await.unwrap().unwrap();
        assert!(refreshed.cached_at > stale.cached_at);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_add() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_fetch_anime()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("Jikan API returned status 503".into())));
        let service = service(store.clone(), provider);

        let err = service.add_to_list("u1", &add(99, 4, 4)).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
        assert_eq!(store.count_entries("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_ratings() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(1));
        let entry = service.add_to_list("u1", &add(1, 2, 3)).await.unwrap();

        let patch = UpdateAnimeInput {
            user_description: Some(Some("x".to_string())),
            ..Default::default()
        };
        service.update_entry("u1", entry.id, &patch).await.unwrap();

        let stored = service.get_one("u1", entry.id).await.unwrap();
        assert_eq!(stored.entry.user_description.as_deref(), Some("x"));
        assert_eq!(stored.entry.user_rating, 2);
        assert_eq!(stored.entry.animation_rating, 3);
    }

    #[tokio::test]
    async fn test_description_can_be_cleared() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(1));
        let input = AddAnimeInput {
            user_description: Some("rewatch later".to_string()),
            ..add(1, 4, 4)
        };
        let entry = service.add_to_list("u1", &input).await.unwrap();

        let rating_only = UpdateAnimeInput {
            user_rating: Some(5),
            ..Default::default()
        };
        service.update_entry("u1", entry.id, &rating_only).await.unwrap();
        let stored = service.get_one("u1", entry.id).await.unwrap();
        assert_eq!(stored.entry.user_description.as_deref(), Some("rewatch later"));

        let clear = UpdateAnimeInput {
            user_description: Some(None),
            ..Default::default()
        };
        service.update_entry("u1", entry.id, &clear).await.unwrap();
        let stored = service.get_one("u1", entry.id).await.unwrap();
        assert_eq!(stored.entry.user_description, None);
        assert_eq!(stored.entry.user_rating, 5);
    }

    #[tokio::test]
    async fn test_other_users_entries_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fetching_provider(1));
        let entry = service.add_to_list("owner", &add(1, 4, 4)).await.unwrap();

        assert!(matches!(
            service.get_one("intruder", entry.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_entry("intruder", entry.id, &UpdateAnimeInput::default())
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(!service.remove_from_list("intruder", entry.id).await.unwrap());
        assert!(service.get_one("owner", entry.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_pagination_has_more() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_fetch_anime()
            .returning(|id| Ok(jikan(id, &format!("Anime {:02}", id))));
        let service = service(store, provider);

        for mal_id in 1..=25 {
            let user = if mal_id <= 15 { "small" } else { "large" };
            service.add_to_list(user, &add(mal_id, 3, 3)).await.unwrap();
        }
        for mal_id in 1..=15 {
            service.add_to_list("large", &add(mal_id, 3, 3)).await.unwrap();
        }

        let options = ListOptions::new(2, 10, SortBy::Title, SortOrder::Asc);

        let (items, total) = service.list_for_user("small", &options).await.unwrap();
        assert_eq!(total, 15);
        assert_eq!(items.len(), 5);
        assert!(!options.has_more(total));

        let (items, total) = service.list_for_user("large", &options).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(items.len(), 10);
        assert!(options.has_more(total));
        assert_eq!(items[0].anime.title, "Anime 11");
    }

    #[tokio::test]
    async fn test_short_query_rejected_without_calling_provider() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider.expect_search().times(0);
        let service = service(store, provider);

        assert!(matches!(
            service.search("ab", 10).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_searches_are_spaced() {
        let store = Arc::new(MemoryStore::new());
        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut provider = MockAnimeProvider::new();
        provider.expect_search().times(2).returning(move |query, _| {
            recorded.lock().unwrap().push(Instant::now());
            Ok(vec![jikan(1, query)])
        });
        let service = service(store, provider);

        service.search("naruto", 10).await.unwrap();
        service.search("bleach", 10).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].duration_since(calls[0]) >= Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_search_limit_clamped() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_search()
            .withf(|_, limit| *limit == MAX_SEARCH_LIMIT)
            .times(1)
            .returning(|_, _| Ok((1..=30).map(|id| jikan(id, "x")).collect()));
        let service = service(store, provider);

        let results = service.search("monogatari", 100).await.unwrap();
        assert_eq!(results.len(), MAX_SEARCH_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_compare_partitions_by_external_id() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = MockAnimeProvider::new();
        provider
            .expect_fetch_anime()
            .returning(|id| Ok(jikan(id, "x")));
        let service = service(store, provider);

        for mal_id in [1, 2, 3] {
            service.add_to_list("me", &add(mal_id, 4, 4)).await.unwrap();
        }
        for mal_id in [2, 3, 4, 5] {
            service.add_to_list("them", &add(mal_id, 4, 4)).await.unwrap();
        }

        let result = service.compare("me", "them").await.unwrap();
        let ids = |list: &[UserAnimeDetails]| {
            let mut ids: Vec<i32> = list.iter().map(|a| a.entry.mal_id).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(&result.common), vec![2, 3]);
        assert_eq!(ids(&result.only_me), vec![1]);
        assert_eq!(ids(&result.only_them), vec![4, 5]);
    }
}
