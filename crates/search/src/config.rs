//! Result stream configuration via TOML
//!
//! A host either uses [`StreamConfig::default`] or loads a `facetstream.toml`.
//! Values are validated eagerly so a bad file fails at load time rather than
//! on the first scroll.

use crate::facets::FacetPolicy;
use facetstream_core::{StreamError, StreamResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "facetstream.toml";

fn default_page_size() -> u32 {
    20
}

fn default_refill_ratio() -> f64 {
    0.2
}

fn default_max_pending_pages() -> usize {
    4
}

/// Result stream configuration
///
/// # Example
///
/// ```toml
/// page_size = 24
/// refill_ratio = 0.25
/// facet_policy = "active-facet"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Items requested per page. Must be positive.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Buffer level, as a fraction of `page_size`, at or below which the next
    /// page is fetched. Must lie in `[0, 1]`.
    #[serde(default = "default_refill_ratio")]
    pub refill_ratio: f64,
    /// How facet counts from each page are merged
    #[serde(default)]
    pub facet_policy: FacetPolicy,
    /// Out-of-order pages held before a diagnostic is logged
    #[serde(default = "default_max_pending_pages")]
    pub max_pending_pages: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            page_size: default_page_size(),
            refill_ratio: default_refill_ratio(),
            facet_policy: FacetPolicy::default(),
            max_pending_pages: default_max_pending_pages(),
        }
    }
}

impl StreamConfig {
    /// Builder: set page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Builder: set refill ratio
    pub fn with_refill_ratio(mut self, refill_ratio: f64) -> Self {
        self.refill_ratio = refill_ratio;
        self
    }

    /// Builder: set facet policy
    pub fn with_facet_policy(mut self, facet_policy: FacetPolicy) -> Self {
        self.facet_policy = facet_policy;
        self
    }

    /// Buffer length at or below which a refill is issued
    pub fn refill_threshold(&self) -> usize {
        (f64::from(self.page_size) * self.refill_ratio).floor() as usize
    }

    /// Check every value is in range
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] describing the first bad value.
    pub fn validate(&self) -> StreamResult<()> {
        if self.page_size == 0 {
            return Err(StreamError::config("page_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.refill_ratio) {
            return Err(StreamError::config(format!(
                "refill_ratio must be between 0 and 1, got {}",
                self.refill_ratio
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# facetstream result stream configuration
#
# Items requested per page (default: 20)
page_size = 20

# Refill when the read-ahead buffer drops to this fraction of a page (default: 0.2)
refill_ratio = 0.2

# Facet merging: "replace", "accumulate" or "active-facet" (default)
#   "active-facet" keeps sibling counts for fields with a selection
facet_policy = "active-facet"

# Out-of-order pages held before a warning is logged (default: 4)
# max_pending_pages = 4
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> StreamResult<Self> {
        let config: StreamConfig = toml::from_str(content)
            .map_err(|e| StreamError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> StreamResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            StreamError::Config(message) => {
                StreamError::config(format!("{} (in '{}')", message, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> StreamResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                StreamError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
