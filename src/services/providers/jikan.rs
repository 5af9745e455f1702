/// Jikan API provider
///
/// Unofficial MyAnimeList REST API. Every response wraps its payload in a
/// top-level `data` field.
///
/// API Flow:
/// 1. Search: /anime?q={query}&limit={n}&sfw=true → list of anime
/// 2. Details: /anime/{mal_id} → single anime
use crate::{
    error::{AppError, AppResult},
    models::JikanAnime,
    services::providers::AnimeProvider,
};
use reqwest::{Client as HttpClient, Response};
use serde::{de::DeserializeOwned, Deserialize};

#[derive(Debug, Deserialize)]
struct JikanEnvelope<T> {
    data: T,
}

#[derive(Clone)]
pub struct JikanProvider {
    http_client: HttpClient,
    api_url: String,
}

impl JikanProvider {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Turns a non-2xx response into an `ExternalApi` error, otherwise unwraps `data`
    async fn read_data<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Jikan API request failed");
            return Err(AppError::ExternalApi(format!(
                "Jikan API returned status {}",
                status
            )));
        }

        let response_text = response.text().await?;
        let envelope: JikanEnvelope<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(error = %e, "Failed to deserialize Jikan response");
            AppError::ExternalApi(format!("Failed to parse Jikan response: {}", e))
        })?;

        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl AnimeProvider for JikanProvider {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<JikanAnime>> {
        let url = format!("{}/anime", self.api_url);
        let limit = limit.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("limit", limit.as_str()), ("sfw", "true")])
            .send()
            .await?;

        let results: Vec<JikanAnime> = Self::read_data(response).await?;

        tracing::info!(
            query = %query,
            results = results.len(),
            provider = "jikan",
            "Anime search completed"
        );

        Ok(results)
    }

    async fn fetch_anime(&self, mal_id: i32) -> AppResult<JikanAnime> {
        let url = format!("{}/anime/{}", self.api_url, mal_id);

        let response = self.http_client.get(&url).send().await?;
        let anime: JikanAnime = Self::read_data(response).await?;

        tracing::info!(mal_id = mal_id, provider = "jikan", "Anime details fetched");

        Ok(anime)
    }
}
