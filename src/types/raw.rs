//! Raw upstream response shapes.
//!
//! Every field is optional: the upstream omits or nulls fields freely, and
//! deciding what "missing" means is the normalizer's job, not the decoder's.

use serde::Deserialize;

/// Raw response, tagged by the shape the endpoint returns.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Paged movie listing (trending, popular, search, ...).
    Listing(RawListing),
    /// Single movie with appended videos and credits.
    Detail(Box<RawMovieDetail>),
    /// Official genre list.
    Genres(RawGenreList),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawListing {
    pub page: Option<u32>,
    pub results: Option<Vec<RawMovie>>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawMovie {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub original_language: Option<String>,
    pub adult: Option<bool>,
    pub video: Option<bool>,
    pub genre_ids: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawMovieDetail {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub status: Option<String>,
    pub imdb_id: Option<String>,
    pub homepage: Option<String>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub original_language: Option<String>,
    pub adult: Option<bool>,
    pub video: Option<bool>,
    pub genres: Option<Vec<RawGenre>>,
    pub videos: Option<RawVideos>,
    pub credits: Option<RawCredits>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawGenreList {
    pub genres: Option<Vec<RawGenre>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawGenre {
    pub id: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawVideos {
    pub results: Option<Vec<RawVideo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawVideo {
    pub key: Option<String>,
    pub name: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub official: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCredits {
    pub cast: Option<Vec<RawCastMember>>,
    pub crew: Option<Vec<RawCrewMember>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCastMember {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub character: Option<String>,
    pub order: Option<u32>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCrewMember {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub job: Option<String>,
    pub department: Option<String>,
    pub profile_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_and_missing_fields_decode() {
        let raw: RawMovie = serde_json::from_value(serde_json::json!({
            "id": 27205,
            "title": "Inception",
            "poster_path": null
        }))
        .unwrap();
        assert_eq!(raw.id, Some(27205));
        assert_eq!(raw.poster_path, None);
        assert_eq!(raw.genre_ids, None);
    }

    #[test]
    fn video_type_maps_to_kind() {
        let raw: RawVideo = serde_json::from_value(serde_json::json!({
            "key": "YoHD9XEInc0",
            "type": "Trailer"
        }))
        .unwrap();
        assert_eq!(raw.kind.as_deref(), Some("Trailer"));
    }
}
