//! Canonical response shapes handed to consumers.

use serde::{Deserialize, Serialize};

use super::movie::{Genre, MovieDetail, MovieSummary};

/// One page of results, identical in shape for every listing endpoint.
///
/// `next` / `previous` carry page numbers; turning them into absolute URLs is
/// the transport layer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedEnvelope<T> {
    /// Total number of items across all pages.
    pub count: u64,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> PaginatedEnvelope<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Anything the catalog can return: a paginated listing or a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogPayload {
    Movies(PaginatedEnvelope<MovieSummary>),
    Genres(PaginatedEnvelope<Genre>),
    Movie(Box<MovieDetail>),
}

impl CatalogPayload {
    pub fn as_movies(&self) -> Option<&PaginatedEnvelope<MovieSummary>> {
        match self {
            CatalogPayload::Movies(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_genres(&self) -> Option<&PaginatedEnvelope<Genre>> {
        match self {
            CatalogPayload::Genres(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_movie(&self) -> Option<&MovieDetail> {
        match self {
            CatalogPayload::Movie(movie) => Some(movie),
            _ => None,
        }
    }

    /// Page number for paginated payloads.
    pub fn page(&self) -> Option<u32> {
        match self {
            CatalogPayload::Movies(page) => Some(page.page),
            CatalogPayload::Genres(page) => Some(page.page),
            CatalogPayload::Movie(_) => None,
        }
    }
}
