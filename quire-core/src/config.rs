//! Configuration types

use crate::error::{ConfigError, QuireResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on keys per batch-get call imposed by the backend.
pub const BACKEND_BATCH_GET_LIMIT: usize = 100;

/// Store-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuireConfig {
    /// Collection name documents are batch-read from.
    pub documents_table: String,

    /// Keys per batch-get call. Must be in `1..=100`.
    pub batch_get_max: usize,

    /// Page size used when a request gives no usable limit.
    pub default_page_limit: usize,

    /// Largest page size a request may ask for.
    pub max_page_limit: usize,

    /// How long pagination tokens stay readable.
    pub pagination_ttl: Duration,

    /// Ceiling on eqOr cross-product size in one search.
    pub max_eq_or_combinations: usize,

    /// Attribute key groups that also get a composite index row,
    /// e.g. `[["category", "year"]]` indexes `category::year`.
    pub composite_keys: Vec<Vec<String>>,
}

impl Default for QuireConfig {
    fn default() -> Self {
        Self {
            documents_table: "documents".to_string(),
            batch_get_max: BACKEND_BATCH_GET_LIMIT,
            default_page_limit: 10,
            max_page_limit: 100,
            pagination_ttl: Duration::from_secs(60),
            max_eq_or_combinations: 100,
            composite_keys: Vec::new(),
        }
    }
}

impl QuireConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `QUIRE_DOCUMENTS_TABLE`: Documents collection name (default: documents)
    /// - `QUIRE_BATCH_GET_MAX`: Keys per batch-get call (default: 100)
    /// - `QUIRE_DEFAULT_PAGE_LIMIT`: Default page size (default: 10)
    /// - `QUIRE_MAX_PAGE_LIMIT`: Largest page size (default: 100)
    /// - `QUIRE_PAGINATION_TTL_SECS`: Pagination token lifetime (default: 60)
    /// - `QUIRE_MAX_EQ_OR_COMBINATIONS`: eqOr expansion ceiling (default: 100)
    /// - `QUIRE_COMPOSITE_KEYS`: Groups separated by `;`, keys by `,`
    ///   (e.g. `category,year;owner,status`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            documents_table: std::env::var("QUIRE_DOCUMENTS_TABLE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.documents_table),
            batch_get_max: std::env::var("QUIRE_BATCH_GET_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_get_max),
            default_page_limit: std::env::var("QUIRE_DEFAULT_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_page_limit),
            max_page_limit: std::env::var("QUIRE_MAX_PAGE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_limit),
            pagination_ttl: std::env::var("QUIRE_PAGINATION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pagination_ttl),
            max_eq_or_combinations: std::env::var("QUIRE_MAX_EQ_OR_COMBINATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_eq_or_combinations),
            composite_keys: std::env::var("QUIRE_COMPOSITE_KEYS")
                .ok()
                .map(|s| parse_composite_keys(&s))
                .unwrap_or(defaults.composite_keys),
        }
    }

    pub fn with_documents_table(mut self, name: impl Into<String>) -> Self {
        self.documents_table = name.into();
        self
    }

    pub fn with_batch_get_max(mut self, max: usize) -> Self {
        self.batch_get_max = max;
        self
    }

    pub fn with_page_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_page_limit = default_limit;
        self.max_page_limit = max_limit;
        self
    }

    pub fn with_pagination_ttl(mut self, ttl: Duration) -> Self {
        self.pagination_ttl = ttl;
        self
    }

    pub fn with_max_eq_or_combinations(mut self, max: usize) -> Self {
        self.max_eq_or_combinations = max;
        self
    }

    pub fn with_composite_key<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composite_keys
            .push(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Composite key groups that include `attribute_key`.
    pub fn composite_keys_for(&self, attribute_key: &str) -> Vec<&[String]> {
        self.composite_keys
            .iter()
            .filter(|group| group.iter().any(|k| k == attribute_key))
            .map(Vec::as_slice)
            .collect()
    }

    /// True when `keys` is a configured composite key group, in that order.
    pub fn has_composite_key(&self, keys: &[String]) -> bool {
        self.composite_keys.iter().any(|group| group.as_slice() == keys)
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(QuireError::Config) if invalid.
    ///
    /// Validates:
    /// - documents_table is not blank
    /// - batch_get_max in 1..=100
    /// - default_page_limit in 1..=max_page_limit
    /// - pagination_ttl is positive
    /// - max_eq_or_combinations > 0
    /// - every composite key group has at least two distinct, non-blank keys
    pub fn validate(&self) -> QuireResult<()> {
        if self.documents_table.trim().is_empty() {
            return Err(invalid(
                "documents_table",
                &self.documents_table,
                "documents_table must not be blank",
            ));
        }

        if self.batch_get_max == 0 || self.batch_get_max > BACKEND_BATCH_GET_LIMIT {
            return Err(invalid(
                "batch_get_max",
                &self.batch_get_max.to_string(),
                "batch_get_max must be between 1 and 100",
            ));
        }

        if self.max_page_limit == 0 {
            return Err(invalid(
                "max_page_limit",
                &self.max_page_limit.to_string(),
                "max_page_limit must be greater than 0",
            ));
        }

        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(invalid(
                "default_page_limit",
                &self.default_page_limit.to_string(),
                "default_page_limit must be between 1 and max_page_limit",
            ));
        }

        if self.pagination_ttl.is_zero() {
            return Err(invalid(
                "pagination_ttl",
                &format!("{:?}", self.pagination_ttl),
                "pagination_ttl must be positive",
            ));
        }

        if self.max_eq_or_combinations == 0 {
            return Err(invalid(
                "max_eq_or_combinations",
                "0",
                "max_eq_or_combinations must be greater than 0",
            ));
        }

        for group in &self.composite_keys {
            let joined = group.join(",");
            if group.len() < 2 {
                return Err(invalid(
                    "composite_keys",
                    &joined,
                    "a composite key needs at least two attribute keys",
                ));
            }
            if group.iter().any(|k| k.trim().is_empty()) {
                return Err(invalid(
                    "composite_keys",
                    &joined,
                    "composite key components must not be blank",
                ));
            }
            let mut unique = group.clone();
            unique.sort();
            unique.dedup();
            if unique.len() != group.len() {
                return Err(invalid(
                    "composite_keys",
                    &joined,
                    "composite key components must be distinct",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::QuireError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Parse `a,b;c,d` into `[[a, b], [c, d]]`, skipping empty groups.
pub fn parse_composite_keys(raw: &str) -> Vec<Vec<String>> {
    raw.split(';')
        .map(|group| {
            group
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
