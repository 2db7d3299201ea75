use std::time::Duration;

use marquee::{CatalogError, ErrorClass, Result};

#[test]
fn test_error_display() {
    let err = CatalogError::NotFound("/movie/550".to_string());
    assert!(err.to_string().contains("/movie/550"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(CatalogError::Unauthorized)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(CatalogError::Timeout.is_transient());
    assert!(CatalogError::RateLimited { retry_after: None }.is_transient());
    assert!(CatalogError::UpstreamUnavailable("502".into()).is_transient());
}

#[test]
fn permanent_errors() {
    for err in [
        CatalogError::NotFound("/movie/1".into()),
        CatalogError::MalformedResponse("eof".into()),
        CatalogError::Unauthorized,
        CatalogError::Rejected {
            status: 422,
            message: "Invalid page.".into(),
        },
    ] {
        assert_eq!(err.class(), ErrorClass::UpstreamPermanent, "{err}");
        assert!(!err.is_transient(), "{err}");
        assert!(!err.is_retryable(), "{err}");
    }
}

#[test]
fn local_errors_are_not_upstream() {
    assert_eq!(CatalogError::Cache("down".into()).class(), ErrorClass::CacheBackend);
    assert_eq!(
        CatalogError::InvalidRequest("page".into()).class(),
        ErrorClass::Request
    );
    assert!(!CatalogError::Cache("down".into()).is_transient());

    let internal = CatalogError::Internal("fetch task failed".into());
    assert_eq!(internal.class(), ErrorClass::Internal);
    assert!(!internal.is_transient());
    assert!(!internal.is_retryable());
    assert_eq!(internal.suggested_status(), 500);
}

#[test]
fn retry_after_only_on_rate_limit() {
    let err = CatalogError::RateLimited {
        retry_after: Some(Duration::from_secs(7)),
    };
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    assert_eq!(CatalogError::Timeout.retry_after(), None);
}

#[test]
fn suggested_status_codes() {
    assert_eq!(CatalogError::Timeout.suggested_status(), 504);
    assert_eq!(
        CatalogError::RateLimited { retry_after: None }.suggested_status(),
        503
    );
    assert_eq!(
        CatalogError::UpstreamUnavailable("x".into()).suggested_status(),
        502
    );
    assert_eq!(CatalogError::NotFound("x".into()).suggested_status(), 404);
    assert_eq!(
        CatalogError::InvalidRequest("x".into()).suggested_status(),
        400
    );
}

#[test]
fn errors_are_cloneable_for_shared_outcomes() {
    let err = CatalogError::RateLimited {
        retry_after: Some(Duration::from_secs(2)),
    };
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}

#[test]
fn json_errors_are_malformed_responses() {
    let err: CatalogError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, CatalogError::MalformedResponse(_)));
}
