use crate::config::FiltersConfig;
use regex::Regex;

/// Compiled restrict/exclude rules for a website
///
/// A URL is accepted when it matches `restrict` (or no restrict rule is set)
/// and does not match `exclude` (or no exclude rule is set).
#[derive(Debug, Clone, Default)]
pub struct UrlFilters {
    restrict: Option<Regex>,
    exclude: Option<Regex>,
}

impl UrlFilters {
    pub fn new(restrict: Option<Regex>, exclude: Option<Regex>) -> Self {
        Self { restrict, exclude }
    }

    /// Compiles the raw expressions of a website configuration
    pub fn from_config(config: &FiltersConfig) -> Result<Self, regex::Error> {
        let restrict = config.restrict.as_deref().map(Regex::new).transpose()?;
        let exclude = config.exclude.as_deref().map(Regex::new).transpose()?;
        Ok(Self { restrict, exclude })
    }

    /// Compiles optional filters; a website without filters accepts everything
    pub fn from_optional(config: Option<&FiltersConfig>) -> Result<Self, regex::Error> {
        config.map(Self::from_config).unwrap_or_else(|| Ok(Self::default()))
    }

    pub fn matches_restrict(&self, url: &str) -> bool {
        self.restrict.as_ref().map_or(true, |re| re.is_match(url))
    }

    pub fn matches_exclude(&self, url: &str) -> bool {
        self.exclude.as_ref().map_or(false, |re| re.is_match(url))
    }

    pub fn accepts(&self, url: &str) -> bool {
        self.matches_restrict(url) && !self.matches_exclude(url)
    }
}
