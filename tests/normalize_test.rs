use marquee::normalize::{DEFAULT_PAGE_SIZE, normalize, normalize_genres, normalize_listing};
use marquee::types::raw::{RawGenre, RawGenreList, RawListing, RawMovie, RawMovieDetail};
use marquee::{CatalogError, CatalogPayload, CatalogRequest, RawResponse, TimeWindow};

fn movies(n: u64) -> Vec<RawMovie> {
    (1..=n)
        .map(|id| RawMovie {
            id: Some(id),
            title: Some(format!("Movie {id}")),
            ..RawMovie::default()
        })
        .collect()
}

fn listing(page: u32, total_pages: u32, total_results: u64) -> RawListing {
    RawListing {
        page: Some(page),
        results: Some(movies(20)),
        total_pages: Some(total_pages),
        total_results: Some(total_results),
    }
}

#[test]
fn first_page_has_next_only() {
    let page = normalize_listing(&listing(1, 5, 100), 1, DEFAULT_PAGE_SIZE);
    assert_eq!(page.count, 100);
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 5);
    assert_eq!(page.next, Some(2));
    assert_eq!(page.previous, None);
    assert_eq!(page.results.len(), 20);
}

#[test]
fn middle_page_links_both_ways() {
    let page = normalize_listing(&listing(3, 5, 100), 3, DEFAULT_PAGE_SIZE);
    assert_eq!(page.next, Some(4));
    assert_eq!(page.previous, Some(2));
}

#[test]
fn last_page_has_previous_only() {
    let page = normalize_listing(&listing(5, 5, 100), 5, DEFAULT_PAGE_SIZE);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, Some(4));
    assert!(!page.has_next());
    assert!(page.has_previous());
}

#[test]
fn page_past_the_end_is_clamped() {
    let raw = RawListing {
        page: None,
        results: Some(Vec::new()),
        total_pages: Some(5),
        total_results: Some(100),
    };
    let page = normalize_listing(&raw, 9, DEFAULT_PAGE_SIZE);
    assert_eq!(page.page, 5);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, Some(4));
}

#[test]
fn empty_listing_is_a_single_empty_page() {
    let page = normalize_listing(&RawListing::default(), 1, DEFAULT_PAGE_SIZE);
    assert_eq!(page.count, 0);
    assert_eq!(page.page, 1);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, None);
    assert!(page.results.is_empty());
}

#[test]
fn missing_totals_fall_back_to_page_contents() {
    let raw = RawListing {
        results: Some(movies(3)),
        ..RawListing::default()
    };
    let page = normalize_listing(&raw, 1, DEFAULT_PAGE_SIZE);
    assert_eq!(page.count, 3);
    assert_eq!(page.total_results, 3);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.next, None);
}

#[test]
fn oversized_page_is_truncated() {
    let raw = RawListing {
        page: Some(1),
        results: Some(movies(25)),
        total_pages: Some(2),
        total_results: Some(25),
    };
    let page = normalize_listing(&raw, 1, DEFAULT_PAGE_SIZE);
    assert_eq!(page.results.len(), 20);
    assert_eq!(page.results.last().unwrap().id, 20);
}

#[test]
fn null_fields_get_safe_defaults() {
    let raw = RawListing {
        results: Some(vec![RawMovie {
            id: Some(27205),
            ..RawMovie::default()
        }]),
        ..RawListing::default()
    };
    let page = normalize_listing(&raw, 1, DEFAULT_PAGE_SIZE);
    let movie = &page.results[0];
    assert_eq!(movie.id, 27205);
    assert_eq!(movie.title, "");
    assert_eq!(movie.poster_path, "");
    assert_eq!(movie.vote_average, 0.0);
    assert!(movie.genre_ids.is_empty());
    assert_eq!(movie.poster_url("w500"), None);
}

#[test]
fn normalization_is_deterministic() {
    let request = CatalogRequest::trending(TimeWindow::Week, 2);
    let raw = RawResponse::Listing(listing(2, 5, 100));

    let a = serde_json::to_vec(&normalize(&request, &raw, DEFAULT_PAGE_SIZE).unwrap()).unwrap();
    let b = serde_json::to_vec(&normalize(&request, &raw, DEFAULT_PAGE_SIZE).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn every_listing_class_shares_the_envelope() {
    let raw = RawResponse::Listing(listing(1, 5, 100));
    for request in [
        CatalogRequest::trending(TimeWindow::Day, 1),
        CatalogRequest::popular(1),
        CatalogRequest::top_rated(1),
        CatalogRequest::now_playing(1),
        CatalogRequest::upcoming(1),
        CatalogRequest::search("alien", 1),
        CatalogRequest::recommendations(550, 1),
        CatalogRequest::similar(550, 1),
    ] {
        let payload = normalize(&request, &raw, DEFAULT_PAGE_SIZE).unwrap();
        assert!(matches!(payload, CatalogPayload::Movies(_)), "{request:?}");
    }
}

#[test]
fn genres_are_one_page() {
    let raw = RawGenreList {
        genres: Some(vec![
            RawGenre {
                id: Some(28),
                name: Some("Action".into()),
            },
            RawGenre {
                id: Some(35),
                name: None,
            },
        ]),
    };
    let page = normalize_genres(&raw);
    assert_eq!(page.count, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.next, None);
    assert_eq!(page.previous, None);
    assert_eq!(page.results[1].name, "");
}

#[test]
fn detail_passes_through_as_single_item() {
    let raw = RawResponse::Detail(Box::new(RawMovieDetail {
        id: Some(550),
        title: Some("Fight Club".into()),
        ..RawMovieDetail::default()
    }));
    let payload = normalize(&CatalogRequest::detail(550), &raw, DEFAULT_PAGE_SIZE).unwrap();
    let movie = payload.as_movie().unwrap();
    assert_eq!(movie.title, "Fight Club");
    assert!(movie.videos.is_empty());
    assert!(movie.cast.is_empty());
    assert_eq!(payload.page(), None);
}

#[test]
fn mismatched_shape_is_malformed() {
    let raw = RawResponse::Listing(RawListing::default());
    let err = normalize(&CatalogRequest::detail(550), &raw, DEFAULT_PAGE_SIZE).unwrap_err();
    assert!(matches!(err, CatalogError::MalformedResponse(_)));
}
