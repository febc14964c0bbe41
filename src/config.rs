//! Run configuration: search query, keyword weights and target keywords.
//!
//! Settings come from an optional YAML file and then from the environment
//! (a `.env` file in the working directory is loaded first), later sources
//! overriding earlier ones:
//!
//! | Setting | YAML key | Environment variable | Format |
//! |---------|----------|----------------------|--------|
//! | Query expression | `query` | `EPMC_QUERY_KEYWORDS` | text |
//! | Keyword weights | `keyword_weights` | `EPMC_KEYWORD_WEIGHTS` | JSON object |
//! | Target keywords | `target_keywords` | `EPMC_TARGET_KEYWORDS` | JSON array |
//! | Search endpoint | `search_url` | `EPMC_SEARCH_URL` | URL |
//!
//! Everything present is parsed and validated at load time. Whether a
//! setting is required depends on the subcommand, which asks for it through
//! [`Settings::query`], [`Settings::weights`] or [`Settings::scoring`] before
//! doing any work.

use crate::api::EUROPE_PMC_SEARCH_URL;
use crate::error::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

pub const ENV_QUERY: &str = "EPMC_QUERY_KEYWORDS";
pub const ENV_WEIGHTS: &str = "EPMC_KEYWORD_WEIGHTS";
pub const ENV_TARGETS: &str = "EPMC_TARGET_KEYWORDS";
pub const ENV_SEARCH_URL: &str = "EPMC_SEARCH_URL";

/// Ordered keyword → weight mapping.
///
/// Order matters only for the human-readable match list; scores are sums.
/// A keyword given twice keeps its first position and takes the last weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordWeights(Vec<(String, f64)>);

/// One weight as embedded in report pages.
#[derive(Debug, Serialize)]
pub struct WeightEntry<'a> {
    pub keyword: &'a str,
    pub weight: f64,
}

impl KeywordWeights {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        let mut weights = Self::default();
        for (keyword, weight) in entries {
            weights.insert(keyword, weight);
        }
        weights
    }

    fn insert(&mut self, keyword: String, weight: f64) {
        match self.0.iter_mut().find(|(k, _)| *k == keyword) {
            Some(existing) => existing.1 = weight,
            None => self.0.push((keyword, weight)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in order, in the shape the client script expects.
    pub fn entries(&self) -> Vec<WeightEntry<'_>> {
        self.iter()
            .map(|(keyword, weight)| WeightEntry { keyword, weight })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for (keyword, weight) in self.iter() {
            if !weight.is_finite() {
                return Err(Error::config(format!(
                    "weight for keyword '{keyword}' is not a finite number"
                )));
            }
            if weight < 0.0 {
                warn!(keyword, weight, "Negative keyword weight");
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for KeywordWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct WeightsVisitor;

        impl<'de> Visitor<'de> for WeightsVisitor {
            type Value = KeywordWeights;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping from keyword to numeric weight")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut weights = KeywordWeights::default();
                while let Some((keyword, weight)) = map.next_entry::<String, f64>()? {
                    weights.insert(keyword, weight);
                }
                Ok(weights)
            }
        }

        deserializer.deserialize_map(WeightsVisitor)
    }
}

/// Keywords that gate inclusion in a report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TargetKeywords(Vec<String>);

impl TargetKeywords {
    pub fn new(keywords: Vec<String>) -> Self {
        Self(keywords)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The YAML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    query: Option<String>,
    keyword_weights: Option<KeywordWeights>,
    target_keywords: Option<TargetKeywords>,
    search_url: Option<String>,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    query: Option<String>,
    keyword_weights: Option<KeywordWeights>,
    target_keywords: Option<TargetKeywords>,
    pub search_url: String,
}

/// Weights and targets, both present and non-empty.
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig<'a> {
    pub weights: &'a KeywordWeights,
    pub targets: &'a TargetKeywords,
}

impl Settings {
    /// Load `.env`, the optional YAML file and the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::config(format!("failed to read .env: {e}"))),
        }
        Self::from_sources(config_path, |key| std::env::var(key).ok())
    }

    /// Build settings from a YAML file and an environment lookup.
    pub fn from_sources<F>(config_path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::MissingInput(path.to_path_buf()));
                }
                let text = std::fs::read_to_string(path)?;
                let parsed: FileSettings = serde_yaml::from_str(&text)
                    .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
                info!(path = %path.display(), "Loaded configuration file");
                parsed
            }
            None => FileSettings::default(),
        };

        let query = env(ENV_QUERY).or(file.query);

        let keyword_weights = match env(ENV_WEIGHTS) {
            Some(raw) => Some(
                serde_json::from_str::<KeywordWeights>(&raw)
                    .map_err(|e| Error::config(format!("{ENV_WEIGHTS} must be a JSON object of numbers: {e}")))?,
            ),
            None => file.keyword_weights,
        };

        let target_keywords = match env(ENV_TARGETS) {
            Some(raw) => Some(
                serde_json::from_str::<TargetKeywords>(&raw)
                    .map_err(|e| Error::config(format!("{ENV_TARGETS} must be a JSON array of strings: {e}")))?,
            ),
            None => file.target_keywords,
        };

        let search_url = env(ENV_SEARCH_URL)
            .or(file.search_url)
            .unwrap_or_else(|| EUROPE_PMC_SEARCH_URL.to_string());

        let settings = Self {
            query,
            keyword_weights,
            target_keywords,
            search_url,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.search_url)
            .map_err(|e| Error::config(format!("invalid search URL '{}': {e}", self.search_url)))?;
        if let Some(weights) = &self.keyword_weights {
            weights.validate()?;
        }
        Ok(())
    }

    /// The keyword query expression; required by `fetch`.
    pub fn query(&self) -> Result<&str> {
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Ok(q),
            _ => Err(Error::config(format!("{ENV_QUERY} is not set"))),
        }
    }

    /// The keyword weights; required by every scoring or rendering step.
    pub fn weights(&self) -> Result<&KeywordWeights> {
        match &self.keyword_weights {
            Some(w) if !w.is_empty() => Ok(w),
            _ => Err(Error::config(format!("{ENV_WEIGHTS} is not set or empty"))),
        }
    }

    /// Weights and targets; required by `parse`.
    pub fn scoring(&self) -> Result<ScoringConfig<'_>> {
        let weights = self.weights()?;
        match &self.target_keywords {
            Some(targets) if !targets.is_empty() => Ok(ScoringConfig { weights, targets }),
            _ => Err(Error::config(format!("{ENV_TARGETS} is not set or empty"))),
        }
    }
}
