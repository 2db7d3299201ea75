//! TMDb v3 HTTP client.
//!
//! See: <https://developer.themoviedb.org/reference/intro/getting-started>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::traits::CatalogSource;
use crate::types::raw::{RawGenreList, RawListing, RawMovieDetail};
use crate::types::{CatalogRequest, RawResponse};
use crate::{CatalogError, Result};

/// Default base URL for the TMDb v3 API.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the TMDb movie endpoints.
///
/// Performs exactly one HTTP request per [`fetch`](CatalogSource::fetch):
/// no caching and no retries. Wrap it in
/// [`RetryingSource`](super::RetryingSource) for backoff.
#[derive(Clone)]
pub struct TmdbClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl TmdbClient {
    /// Create a client for the public TMDb API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and timeout (for testing with
    /// wiremock, or a proxy).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CatalogError::Configuration(
                "TMDb API key is empty".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path, "tmdb request");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &headers, &body, path));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Map a request to its TMDb path and query parameters (without the key).
fn route(request: &CatalogRequest) -> (String, Vec<(&'static str, String)>) {
    let mut query = Vec::new();
    if let Some(page) = request.page() {
        query.push(("page", page.to_string()));
    }
    let path = match request {
        CatalogRequest::Trending { window, .. } => format!("/trending/movie/{}", window.as_str()),
        CatalogRequest::Popular { .. } => "/movie/popular".to_string(),
        CatalogRequest::TopRated { .. } => "/movie/top_rated".to_string(),
        CatalogRequest::NowPlaying { .. } => "/movie/now_playing".to_string(),
        CatalogRequest::Upcoming { .. } => "/movie/upcoming".to_string(),
        CatalogRequest::Search { query: text, .. } => {
            query.push(("query", text.clone()));
            "/search/movie".to_string()
        }
        CatalogRequest::Discover { filters, .. } => {
            if let Some(genre) = filters.genre {
                query.push(("with_genres", genre.to_string()));
            }
            if let Some(year) = filters.year {
                query.push(("primary_release_year", year.to_string()));
            }
            if let Some(sort_by) = &filters.sort_by {
                query.push(("sort_by", sort_by.clone()));
            }
            "/discover/movie".to_string()
        }
        CatalogRequest::Detail { movie_id } => {
            query.push(("append_to_response", "videos,credits".to_string()));
            format!("/movie/{movie_id}")
        }
        CatalogRequest::Recommendations { movie_id, .. } => {
            format!("/movie/{movie_id}/recommendations")
        }
        CatalogRequest::Similar { movie_id, .. } => format!("/movie/{movie_id}/similar"),
        CatalogRequest::Genres => "/genre/movie/list".to_string(),
    };
    (path, query)
}

fn transport_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::UpstreamUnavailable(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &str, path: &str) -> CatalogError {
    match status.as_u16() {
        401 => CatalogError::Unauthorized,
        404 => CatalogError::NotFound(path.to_string()),
        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            CatalogError::RateLimited { retry_after }
        }
        code if status.is_server_error() => {
            CatalogError::UpstreamUnavailable(format!("TMDb returned {code} for {path}"))
        }
        code => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or_else(|| status.to_string());
            CatalogError::Rejected {
                status: code,
                message,
            }
        }
    }
}

#[async_trait]
impl CatalogSource for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn fetch(&self, request: &CatalogRequest) -> Result<RawResponse> {
        request.validate()?;
        let (path, query) = route(request);
        match request {
            CatalogRequest::Detail { .. } => {
                let detail: RawMovieDetail = self.get(&path, &query).await?;
                Ok(RawResponse::Detail(Box::new(detail)))
            }
            CatalogRequest::Genres => Ok(RawResponse::Genres(
                self.get::<RawGenreList>(&path, &query).await?,
            )),
            _ => Ok(RawResponse::Listing(
                self.get::<RawListing>(&path, &query).await?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscoverFilters, TimeWindow};

    #[test]
    fn routes_trending_window() {
        let (path, query) = route(&CatalogRequest::trending(TimeWindow::Week, 2));
        assert_eq!(path, "/trending/movie/week");
        assert_eq!(query, vec![("page", "2".to_string())]);
    }

    #[test]
    fn routes_detail_with_appended_resources() {
        let (path, query) = route(&CatalogRequest::detail(550));
        assert_eq!(path, "/movie/550");
        assert_eq!(
            query,
            vec![("append_to_response", "videos,credits".to_string())]
        );
    }

    #[test]
    fn routes_discover_filters() {
        let filters = DiscoverFilters::new().genre(28).year(1999).sort_by("vote_average.desc");
        let (path, query) = route(&CatalogRequest::discover(filters, 1));
        assert_eq!(path, "/discover/movie");
        assert!(query.contains(&("with_genres", "28".to_string())));
        assert!(query.contains(&("primary_release_year", "1999".to_string())));
        assert!(query.contains(&("sort_by", "vote_average.desc".to_string())));
    }

    #[test]
    fn routes_genres_without_page() {
        let (path, query) = route(&CatalogRequest::genres());
        assert_eq!(path, "/genre/movie/list");
        assert!(query.is_empty());
    }

    #[test]
    fn rejected_message_comes_from_body() {
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &HeaderMap::new(),
            r#"{"status_code":22,"status_message":"Invalid page."}"#,
            "/movie/popular",
        );
        match err {
            CatalogError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid page.");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            TmdbClient::new("  "),
            Err(CatalogError::Configuration(_))
        ));
    }
}
