//! Public types for the Marquee API.

mod envelope;
mod movie;
pub mod raw;
mod request;

pub use envelope::{CatalogPayload, PaginatedEnvelope};
pub use movie::{
    CastMember, CrewMember, Genre, IMAGE_BASE_URL, MovieDetail, MovieSummary, Video, image_url,
};
pub use raw::RawResponse;
pub use request::{
    CatalogRequest, DiscoverFilters, GENRE_TAG, ResourceClass, TimeWindow, movie_tag,
};
