//! Catalog requests and resource classes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CatalogError, Result};

/// Category of cached resource. Each class has its own TTL and tag namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Trending,
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    Search,
    Discover,
    Detail,
    Recommendations,
    Similar,
    Genres,
}

impl ResourceClass {
    /// Every known class, in declaration order.
    pub const ALL: [ResourceClass; 11] = [
        ResourceClass::Trending,
        ResourceClass::Popular,
        ResourceClass::TopRated,
        ResourceClass::NowPlaying,
        ResourceClass::Upcoming,
        ResourceClass::Search,
        ResourceClass::Discover,
        ResourceClass::Detail,
        ResourceClass::Recommendations,
        ResourceClass::Similar,
        ResourceClass::Genres,
    ];

    /// Stable wire name, used in cache keys, tags, config and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Trending => "trending",
            ResourceClass::Popular => "popular",
            ResourceClass::TopRated => "top_rated",
            ResourceClass::NowPlaying => "now_playing",
            ResourceClass::Upcoming => "upcoming",
            ResourceClass::Search => "search",
            ResourceClass::Discover => "discover",
            ResourceClass::Detail => "detail",
            ResourceClass::Recommendations => "recommendations",
            ResourceClass::Similar => "similar",
            ResourceClass::Genres => "genres",
        }
    }

    /// Whether responses of this class are paginated movie listings.
    pub fn is_listing(&self) -> bool {
        !matches!(self, ResourceClass::Detail | ResourceClass::Genres)
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceClass {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| CatalogError::Configuration(format!("unknown resource class '{s}'")))
    }
}

/// Trending time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            other => Err(CatalogError::InvalidRequest(format!(
                "time window must be 'day' or 'week', got '{other}'"
            ))),
        }
    }
}

/// Filters for the discover endpoint. All optional; an empty filter set
/// discovers by upstream default ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscoverFilters {
    /// Genre id (`with_genres`).
    pub genre: Option<u32>,
    /// Primary release year.
    pub year: Option<u16>,
    /// Upstream sort order, e.g. `popularity.desc`.
    pub sort_by: Option<String>,
}

impl DiscoverFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genre(mut self, genre: u32) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }
}

/// A single logical read against the catalog.
///
/// Use the constructors rather than the variants directly: they normalize
/// inputs (e.g. trim search queries) so that equal logical requests produce
/// equal cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogRequest {
    Trending { window: TimeWindow, page: u32 },
    Popular { page: u32 },
    TopRated { page: u32 },
    NowPlaying { page: u32 },
    Upcoming { page: u32 },
    Search { query: String, page: u32 },
    Discover { filters: DiscoverFilters, page: u32 },
    Detail { movie_id: u64 },
    Recommendations { movie_id: u64, page: u32 },
    Similar { movie_id: u64, page: u32 },
    Genres,
}

impl CatalogRequest {
    pub fn trending(window: TimeWindow, page: u32) -> Self {
        CatalogRequest::Trending { window, page }
    }

    pub fn popular(page: u32) -> Self {
        CatalogRequest::Popular { page }
    }

    pub fn top_rated(page: u32) -> Self {
        CatalogRequest::TopRated { page }
    }

    pub fn now_playing(page: u32) -> Self {
        CatalogRequest::NowPlaying { page }
    }

    pub fn upcoming(page: u32) -> Self {
        CatalogRequest::Upcoming { page }
    }

    pub fn search(query: impl AsRef<str>, page: u32) -> Self {
        CatalogRequest::Search {
            query: query.as_ref().trim().to_string(),
            page,
        }
    }

    pub fn discover(filters: DiscoverFilters, page: u32) -> Self {
        let sort_by = filters
            .sort_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        CatalogRequest::Discover {
            filters: DiscoverFilters { sort_by, ..filters },
            page,
        }
    }

    pub fn detail(movie_id: u64) -> Self {
        CatalogRequest::Detail { movie_id }
    }

    pub fn recommendations(movie_id: u64, page: u32) -> Self {
        CatalogRequest::Recommendations { movie_id, page }
    }

    pub fn similar(movie_id: u64, page: u32) -> Self {
        CatalogRequest::Similar { movie_id, page }
    }

    pub fn genres() -> Self {
        CatalogRequest::Genres
    }

    pub fn class(&self) -> ResourceClass {
        match self {
            CatalogRequest::Trending { .. } => ResourceClass::Trending,
            CatalogRequest::Popular { .. } => ResourceClass::Popular,
            CatalogRequest::TopRated { .. } => ResourceClass::TopRated,
            CatalogRequest::NowPlaying { .. } => ResourceClass::NowPlaying,
            CatalogRequest::Upcoming { .. } => ResourceClass::Upcoming,
            CatalogRequest::Search { .. } => ResourceClass::Search,
            CatalogRequest::Discover { .. } => ResourceClass::Discover,
            CatalogRequest::Detail { .. } => ResourceClass::Detail,
            CatalogRequest::Recommendations { .. } => ResourceClass::Recommendations,
            CatalogRequest::Similar { .. } => ResourceClass::Similar,
            CatalogRequest::Genres => ResourceClass::Genres,
        }
    }

    /// Requested page, for paginated classes.
    pub fn page(&self) -> Option<u32> {
        match self {
            CatalogRequest::Trending { page, .. }
            | CatalogRequest::Popular { page }
            | CatalogRequest::TopRated { page }
            | CatalogRequest::NowPlaying { page }
            | CatalogRequest::Upcoming { page }
            | CatalogRequest::Search { page, .. }
            | CatalogRequest::Discover { page, .. }
            | CatalogRequest::Recommendations { page, .. }
            | CatalogRequest::Similar { page, .. } => Some(*page),
            CatalogRequest::Detail { .. } | CatalogRequest::Genres => None,
        }
    }

    /// Movie the request is about, if any.
    pub fn movie_id(&self) -> Option<u64> {
        match self {
            CatalogRequest::Detail { movie_id }
            | CatalogRequest::Recommendations { movie_id, .. }
            | CatalogRequest::Similar { movie_id, .. } => Some(*movie_id),
            _ => None,
        }
    }

    /// Reject requests the upstream would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if let Some(page) = self.page()
            && page == 0
        {
            return Err(CatalogError::InvalidRequest(
                "page must be at least 1".to_string(),
            ));
        }
        if let Some(0) = self.movie_id() {
            return Err(CatalogError::InvalidRequest(
                "movie id must be positive".to_string(),
            ));
        }
        match self {
            CatalogRequest::Search { query, .. } if query.trim().is_empty() => Err(
                CatalogError::InvalidRequest("search query must not be empty".to_string()),
            ),
            CatalogRequest::Discover { filters, .. }
                if filters.sort_by.as_deref().is_some_and(|s| s.trim().is_empty()) =>
            {
                Err(CatalogError::InvalidRequest(
                    "sort_by must not be empty".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Parameters that identify this request within its class.
    ///
    /// Sorted by name; feeds the cache key.
    pub fn identifying_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        if let Some(page) = self.page() {
            params.insert("page", page.to_string());
        }
        if let Some(movie_id) = self.movie_id() {
            params.insert("movie_id", movie_id.to_string());
        }
        match self {
            CatalogRequest::Trending { window, .. } => {
                params.insert("time_window", window.as_str().to_string());
            }
            CatalogRequest::Search { query, .. } => {
                params.insert("query", query.clone());
            }
            CatalogRequest::Discover { filters, .. } => {
                if let Some(genre) = filters.genre {
                    params.insert("genre", genre.to_string());
                }
                if let Some(year) = filters.year {
                    params.insert("year", year.to_string());
                }
                if let Some(sort_by) = &filters.sort_by {
                    params.insert("sort_by", sort_by.clone());
                }
            }
            _ => {}
        }
        params
    }

    /// Invalidation tags attached to the cached response.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![self.class().as_str().to_string()];
        if let Some(movie_id) = self.movie_id() {
            tags.push(movie_tag(movie_id));
        }
        match self {
            CatalogRequest::Genres => tags.push(GENRE_TAG.to_string()),
            CatalogRequest::Discover { filters, .. } => {
                if let Some(genre) = filters.genre {
                    tags.push(GENRE_TAG.to_string());
                    tags.push(format!("{GENRE_TAG}:{genre}"));
                }
            }
            _ => {}
        }
        tags
    }
}

/// Tag carried by every entry derived from the genre catalog.
pub const GENRE_TAG: &str = "genre";

/// Tag carried by every entry about a specific movie.
pub fn movie_tag(movie_id: u64) -> String {
    format!("movie:{movie_id}")
}
