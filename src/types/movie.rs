//! Normalized catalog items.
//!
//! Every field is non-optional: the normalizer fills anything the upstream
//! omitted with a neutral value (empty string, 0, empty list).

use serde::{Deserialize, Serialize};

/// Base URL for upstream image paths.
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";

/// Build an absolute image URL, or `None` for an empty path.
pub fn image_url(path: &str, size: &str) -> Option<String> {
    if path.is_empty() {
        None
    } else {
        Some(format!("{IMAGE_BASE_URL}{size}{path}"))
    }
}

/// A movie as it appears in listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub poster_path: String,
    pub backdrop_path: String,
    pub original_language: String,
    pub adult: bool,
    pub video: bool,
    pub genre_ids: Vec<u32>,
}

impl MovieSummary {
    /// Poster URL at the given size (e.g. `w500`).
    pub fn poster_url(&self, size: &str) -> Option<String> {
        image_url(&self.poster_path, size)
    }

    /// Backdrop URL at the given size (e.g. `original`).
    pub fn backdrop_url(&self, size: &str) -> Option<String> {
        image_url(&self.backdrop_path, size)
    }

    /// Vote average as a whole percentage (7.84 -> 78).
    pub fn rating_percentage(&self) -> u32 {
        rating_percentage(self.vote_average)
    }
}

/// Full movie record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: String,
    pub release_date: String,
    /// Minutes; 0 when unknown.
    pub runtime: u32,
    pub status: String,
    pub imdb_id: String,
    pub homepage: String,
    pub budget: u64,
    pub revenue: u64,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub poster_path: String,
    pub backdrop_path: String,
    pub original_language: String,
    pub adult: bool,
    pub video: bool,
    pub genres: Vec<Genre>,
    pub videos: Vec<Video>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

impl MovieDetail {
    pub fn poster_url(&self, size: &str) -> Option<String> {
        image_url(&self.poster_path, size)
    }

    pub fn backdrop_url(&self, size: &str) -> Option<String> {
        image_url(&self.backdrop_path, size)
    }

    pub fn rating_percentage(&self) -> u32 {
        rating_percentage(self.vote_average)
    }
}

fn rating_percentage(vote_average: f64) -> u32 {
    (vote_average * 10.0).max(0.0) as u32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Trailer, teaser, clip and similar attached media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Site-specific video key (e.g. YouTube id).
    pub key: String,
    pub name: String,
    pub site: String,
    /// Upstream `type` (Trailer, Teaser, ...).
    pub kind: String,
    pub official: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: String,
    /// Billing order.
    pub order: u32,
    pub profile_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    pub job: String,
    pub department: String,
    pub profile_path: String,
}
