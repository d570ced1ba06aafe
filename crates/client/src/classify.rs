//! Request classification.
//!
//! Maps a request URL to a resource class, the partition it is cached in and
//! the strategy that serves it. Rules match against the URL path only.
//!
//! When rules of several classes match, the class priority decides:
//! static > api > image > navigation. Navigation is the fallback for
//! everything that matches nothing.

use beekon_core::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::partition::Partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Static,
    Api,
    Image,
    Navigation,
}

impl ResourceClass {
    /// Lower wins.
    fn priority(self) -> u8 {
        match self {
            ResourceClass::Static => 0,
            ResourceClass::Api => 1,
            ResourceClass::Image => 2,
            ResourceClass::Navigation => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceClass::Static => "static",
            ResourceClass::Api => "api",
            ResourceClass::Image => "image",
            ResourceClass::Navigation => "navigation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

/// Result of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub class: ResourceClass,
    pub partition: Partition,
    pub strategy: Strategy,
}

impl Classification {
    pub const NAVIGATION: Classification = Classification {
        class: ResourceClass::Navigation,
        partition: Partition::Pages,
        strategy: Strategy::NetworkFirst,
    };
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub pattern: Regex,
    pub class: ResourceClass,
    pub partition: Partition,
    pub strategy: Strategy,
}

impl ClassificationRule {
    pub fn new(pattern: &str, class: ResourceClass, partition: Partition, strategy: Strategy) -> Result<Self, Error> {
        let pattern = Regex::new(pattern).map_err(|e| Error::InvalidInput(format!("bad rule {pattern:?}: {e}")))?;
        Ok(Self { pattern, class, partition, strategy })
    }

    fn classification(&self) -> Classification {
        Classification { class: self.class, partition: self.partition, strategy: self.strategy }
    }
}

const STATIC_PATTERNS: &[&str] = &[r"(?i)\.(js|mjs|css|woff2?|ttf|otf|eot|ico|webmanifest|map)$", r"^/assets/"];

const API_PATTERNS: &[&str] = &[r"^/rest/v1/", r"^/functions/v1/", r"^/api/", r"^/storage/v1/object/"];

const IMAGE_PATTERNS: &[&str] = &[r"(?i)\.(png|jpe?g|gif|svg|webp|avif|bmp)$"];

/// Static, read-only rule table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ClassificationRule>,
}

impl RuleTable {
    /// Rules are ordered by class priority; within a class, declaration order holds.
    pub fn new(mut rules: Vec<ClassificationRule>) -> Self {
        rules.sort_by_key(|rule| rule.class.priority());
        Self { rules }
    }

    /// The dashboard's rule set. `metrics_patterns` select the
    /// stale-while-revalidate api endpoints.
    pub fn with_defaults(metrics_patterns: &[String]) -> Result<Self, Error> {
        let mut rules = Vec::new();
        for pattern in STATIC_PATTERNS {
            rules.push(ClassificationRule::new(pattern, ResourceClass::Static, Partition::Static, Strategy::CacheFirst)?);
        }
        for pattern in metrics_patterns {
            rules.push(ClassificationRule::new(
                pattern,
                ResourceClass::Api,
                Partition::Metrics,
                Strategy::StaleWhileRevalidate,
            )?);
        }
        for pattern in API_PATTERNS {
            rules.push(ClassificationRule::new(pattern, ResourceClass::Api, Partition::Api, Strategy::NetworkFirst)?);
        }
        for pattern in IMAGE_PATTERNS {
            rules.push(ClassificationRule::new(pattern, ResourceClass::Image, Partition::Images, Strategy::CacheFirst)?);
        }
        Ok(Self::new(rules))
    }

    pub fn classify(&self, url: &Url) -> Classification {
        let path = url.path();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(path))
            .map(ClassificationRule::classification)
            .unwrap_or(Classification::NAVIGATION)
    }
}
