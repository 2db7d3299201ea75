//! Pagination normalizer.
//!
//! Maps each upstream endpoint's raw shape into [`CatalogPayload`]. Pure: the
//! same input always produces the same output, with no hidden state.
//!
//! # Envelope rules
//!
//! - `count` is the upstream's reported total when available, else the
//!   number of results on the page.
//! - `total_results` passes through, else equals `count`.
//! - `total_pages` passes through, else `ceil(count / page_size)`.
//! - `previous` is `None` on page 1; `next` is `None` once `page >=
//!   total_pages`.
//! - A page past the end (with `count > 0`) is clamped to `total_pages`.
//! - Results beyond `page_size` are dropped.
//!
//! Items only get null-safety defaults; movie fields are never reinterpreted.

use crate::types::raw::{
    RawCastMember, RawCrewMember, RawGenre, RawGenreList, RawListing, RawMovie, RawMovieDetail,
    RawVideo,
};
use crate::types::{
    CastMember, CatalogPayload, CatalogRequest, CrewMember, Genre, MovieDetail, MovieSummary,
    PaginatedEnvelope, RawResponse, Video,
};
use crate::{CatalogError, Result};

/// Upstream page size (TMDb serves 20 results per page).
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Normalize a raw upstream response for `request`.
///
/// Returns `MalformedResponse` when the raw shape does not belong to the
/// request's resource class.
pub fn normalize(
    request: &CatalogRequest,
    raw: &RawResponse,
    page_size: u32,
) -> Result<CatalogPayload> {
    let class = request.class();
    match raw {
        RawResponse::Listing(listing) if class.is_listing() => {
            let requested_page = request.page().unwrap_or(1);
            Ok(CatalogPayload::Movies(normalize_listing(
                listing,
                requested_page,
                page_size,
            )))
        }
        RawResponse::Detail(detail) if matches!(request, CatalogRequest::Detail { .. }) => {
            Ok(CatalogPayload::Movie(Box::new(normalize_detail(detail))))
        }
        RawResponse::Genres(list) if matches!(request, CatalogRequest::Genres) => {
            Ok(CatalogPayload::Genres(normalize_genres(list)))
        }
        _ => Err(CatalogError::MalformedResponse(format!(
            "unexpected response shape for resource class '{class}'"
        ))),
    }
}

/// Normalize a paged movie listing.
pub fn normalize_listing(
    raw: &RawListing,
    requested_page: u32,
    page_size: u32,
) -> PaginatedEnvelope<MovieSummary> {
    let page_size = page_size.max(1);
    let mut results: Vec<MovieSummary> = raw
        .results
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_movie)
        .collect();
    results.truncate(page_size as usize);

    let count = raw.total_results.unwrap_or(results.len() as u64);
    paginate(
        results,
        raw.page.unwrap_or(requested_page),
        count,
        raw.total_pages,
        raw.total_results,
        page_size,
    )
}

/// Normalize the genre list into a single-page envelope.
pub fn normalize_genres(raw: &RawGenreList) -> PaginatedEnvelope<Genre> {
    let results: Vec<Genre> = raw
        .genres
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_genre)
        .collect();
    let count = results.len() as u64;
    let page_size = u32::try_from(results.len()).unwrap_or(u32::MAX).max(1);
    paginate(results, 1, count, None, None, page_size)
}

fn paginate<T>(
    results: Vec<T>,
    page: u32,
    count: u64,
    total_pages: Option<u32>,
    total_results: Option<u64>,
    page_size: u32,
) -> PaginatedEnvelope<T> {
    let total_pages = total_pages.unwrap_or_else(|| {
        u32::try_from(count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
    });
    let page = if count > 0 && page > total_pages {
        total_pages
    } else {
        page.max(1)
    };

    PaginatedEnvelope {
        count,
        page,
        total_pages,
        total_results: total_results.unwrap_or(count),
        next: (page < total_pages).then(|| page + 1),
        previous: (page > 1).then(|| page - 1),
        results,
    }
}

fn normalize_movie(raw: &RawMovie) -> MovieSummary {
    MovieSummary {
        id: raw.id.unwrap_or_default(),
        title: text(&raw.title),
        original_title: text(&raw.original_title),
        overview: text(&raw.overview),
        release_date: text(&raw.release_date),
        vote_average: raw.vote_average.unwrap_or_default(),
        vote_count: raw.vote_count.unwrap_or_default(),
        popularity: raw.popularity.unwrap_or_default(),
        poster_path: text(&raw.poster_path),
        backdrop_path: text(&raw.backdrop_path),
        original_language: text(&raw.original_language),
        adult: raw.adult.unwrap_or_default(),
        video: raw.video.unwrap_or_default(),
        genre_ids: raw.genre_ids.clone().unwrap_or_default(),
    }
}

fn normalize_detail(raw: &RawMovieDetail) -> MovieDetail {
    let credits = raw.credits.as_ref();
    MovieDetail {
        id: raw.id.unwrap_or_default(),
        title: text(&raw.title),
        original_title: text(&raw.original_title),
        overview: text(&raw.overview),
        tagline: text(&raw.tagline),
        release_date: text(&raw.release_date),
        runtime: raw.runtime.unwrap_or_default(),
        status: text(&raw.status),
        imdb_id: text(&raw.imdb_id),
        homepage: text(&raw.homepage),
        budget: raw.budget.unwrap_or_default(),
        revenue: raw.revenue.unwrap_or_default(),
        vote_average: raw.vote_average.unwrap_or_default(),
        vote_count: raw.vote_count.unwrap_or_default(),
        popularity: raw.popularity.unwrap_or_default(),
        poster_path: text(&raw.poster_path),
        backdrop_path: text(&raw.backdrop_path),
        original_language: text(&raw.original_language),
        adult: raw.adult.unwrap_or_default(),
        video: raw.video.unwrap_or_default(),
        genres: list(&raw.genres, normalize_genre),
        videos: list(
            &raw.videos.as_ref().and_then(|v| v.results.clone()),
            normalize_video,
        ),
        cast: list(&credits.and_then(|c| c.cast.clone()), normalize_cast),
        crew: list(&credits.and_then(|c| c.crew.clone()), normalize_crew),
    }
}

fn normalize_genre(raw: &RawGenre) -> Genre {
    Genre {
        id: raw.id.unwrap_or_default(),
        name: text(&raw.name),
    }
}

fn normalize_video(raw: &RawVideo) -> Video {
    Video {
        key: text(&raw.key),
        name: text(&raw.name),
        site: text(&raw.site),
        kind: text(&raw.kind),
        official: raw.official.unwrap_or_default(),
    }
}

fn normalize_cast(raw: &RawCastMember) -> CastMember {
    CastMember {
        id: raw.id.unwrap_or_default(),
        name: text(&raw.name),
        character: text(&raw.character),
        order: raw.order.unwrap_or_default(),
        profile_path: text(&raw.profile_path),
    }
}

fn normalize_crew(raw: &RawCrewMember) -> CrewMember {
    CrewMember {
        id: raw.id.unwrap_or_default(),
        name: text(&raw.name),
        job: text(&raw.job),
        department: text(&raw.department),
        profile_path: text(&raw.profile_path),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn list<R, T>(raw: &Option<Vec<R>>, f: impl Fn(&R) -> T) -> Vec<T> {
    raw.as_deref().unwrap_or_default().iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_falls_back_to_result_length() {
        let raw = RawListing {
            page: Some(1),
            results: Some(vec![RawMovie::default(); 3]),
            total_pages: None,
            total_results: None,
        };
        let envelope = normalize_listing(&raw, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(envelope.count, 3);
        assert_eq!(envelope.total_results, 3);
        assert_eq!(envelope.total_pages, 1);
        assert_eq!(envelope.next, None);
        assert_eq!(envelope.previous, None);
    }

    #[test]
    fn total_pages_computed_by_ceiling() {
        let raw = RawListing {
            page: Some(2),
            results: Some(vec![RawMovie::default(); 20]),
            total_pages: None,
            total_results: Some(41),
        };
        let envelope = normalize_listing(&raw, 2, 20);
        assert_eq!(envelope.total_pages, 3);
        assert_eq!(envelope.next, Some(3));
        assert_eq!(envelope.previous, Some(1));
    }

    #[test]
    fn missing_page_uses_requested_page() {
        let raw = RawListing {
            page: None,
            results: Some(vec![RawMovie::default()]),
            total_pages: Some(4),
            total_results: Some(70),
        };
        assert_eq!(normalize_listing(&raw, 3, 20).page, 3);
    }

    #[test]
    fn page_past_the_end_is_clamped() {
        let raw = RawListing {
            page: Some(9),
            results: Some(vec![]),
            total_pages: Some(5),
            total_results: Some(100),
        };
        let envelope = normalize_listing(&raw, 9, 20);
        assert_eq!(envelope.page, 5);
        assert_eq!(envelope.next, None);
        assert_eq!(envelope.previous, Some(4));
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let envelope = normalize_listing(&RawListing::default(), 1, 20);
        assert_eq!(envelope.count, 0);
        assert_eq!(envelope.total_pages, 0);
        assert_eq!(envelope.page, 1);
        assert_eq!(envelope.next, None);
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn oversized_page_is_truncated() {
        let raw = RawListing {
            page: Some(1),
            results: Some(vec![RawMovie::default(); 25]),
            total_pages: Some(2),
            total_results: Some(25),
        };
        assert_eq!(normalize_listing(&raw, 1, 20).results.len(), 20);
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let raw = RawResponse::Genres(RawGenreList::default());
        let err = normalize(&CatalogRequest::popular(1), &raw, 20).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }
}
