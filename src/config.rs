use crate::{
    error::PageError,
    properties::{Page, PageStatus},
};
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path};

pub const DEFAULT_MAX_TRIM_ITERATIONS: usize = 15;
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Policy knobs for walks over the page tree.
///
/// Neither bound affects correctness of a well-formed tree of modest depth. A page nested more than
/// `max_trim_iterations` segments above the request path cannot be reached by trimming, and a page
/// nested more than `max_depth` levels deep is reported as an inconsistent tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Upper bound on exact-path lookups performed while trimming one request.
    pub max_trim_iterations: usize,
    /// Upper bound on parent hops while building a lookup.
    pub max_depth: usize,
    /// Status pages must have to be resolved. `None` resolves pages of any status.
    pub resolve_status: Option<PageStatus>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_trim_iterations: DEFAULT_MAX_TRIM_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            resolve_status: Some(PageStatus::Live),
        }
    }
}

impl TreeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, PageError> {
        let config: TreeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PageError> {
        tracing::debug!("Attempting to read tree config from: {:?}", path.as_ref());
        if !path.as_ref().exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(TreeConfig::default());
        }
        let content = read_to_string(path)?;
        TreeConfig::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), PageError> {
        if self.max_trim_iterations == 0 {
            return Err(PageError::Config(
                "max_trim_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(PageError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// A page table snapshot in TOML, used to seed a [crate::store::MemoryStore].
///
/// ```toml
/// [config]
/// max_trim_iterations = 10
///
/// [[pages]]
/// id = 1
/// slug = "about"
///
/// [[pages]]
/// id = 2
/// slug = "team"
/// parent_id = 1
/// ```
///
/// Lookups in a fixture are not trusted; callers rebuild them after loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub config: TreeConfig,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl PageFixture {
    pub fn from_toml_str(content: &str) -> Result<Self, PageError> {
        let fixture: PageFixture = toml::from_str(content)?;
        fixture.config.validate()?;
        Ok(fixture)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PageError> {
        tracing::debug!("Reading page fixture {:?}", path.as_ref());
        let content = read_to_string(path)?;
        PageFixture::from_toml_str(&content)
    }
}
