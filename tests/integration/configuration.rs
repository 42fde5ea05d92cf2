//! Loading stream configuration from disk

use facetstream::{FacetPolicy, StreamConfig, StreamError, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn test_default_file_is_written_once_and_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    StreamConfig::write_default_if_missing(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("refill_ratio"));

    let config = StreamConfig::from_file(&path).unwrap();
    assert_eq!(config, StreamConfig::default());
    assert_eq!(config.refill_threshold(), 4);
}

#[test]
fn test_custom_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "page_size = 48\nrefill_ratio = 0.5\nfacet_policy = \"replace\"\n").unwrap();

    let config = StreamConfig::from_file(&path).unwrap();
    assert_eq!(config.page_size, 48);
    assert_eq!(config.refill_threshold(), 24);
    assert_eq!(config.facet_policy, FacetPolicy::Replace);
}

#[test]
fn test_bad_file_fails_at_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "refill_ratio = 2.0\n").unwrap();

    let err = StreamConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, StreamError::Config(_)));
    assert!(err.to_string().contains("refill_ratio"));
}
