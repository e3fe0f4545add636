//! Multi-attribute search compilation.
//!
//! The backend can only run one equality, prefix or range condition against
//! one sort key. Several attribute predicates are folded into one predicate
//! over a composite attribute whose key is the attribute keys joined with
//! `::` and whose value is the attribute values joined the same way, in the
//! order the caller supplied them.

use crate::error::{ValidationError, ValidationErrors};
use crate::keys::{format_number, COMPOSITE_KEY_DELIMITER};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How range bounds are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    /// Bounds are compared as stored strings.
    String,
    /// Bounds are numbers, normalized to the fixed-width number format.
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchRange {
    pub kind: RangeKind,
    pub start: String,
    pub end: String,
}

impl SearchRange {
    pub fn new(kind: RangeKind, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            kind,
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Predicate on one attribute key. Exactly one of the value fields is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchAttributeCriteria {
    pub key: String,
    pub eq: Option<String>,
    pub eq_or: Option<Vec<String>>,
    pub begins_with: Option<String>,
    pub range: Option<SearchRange>,
}

impl SearchAttributeCriteria {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn eq(mut self, value: impl Into<String>) -> Self {
        self.eq = Some(value.into());
        self
    }

    pub fn eq_or<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eq_or = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn begins_with(mut self, value: impl Into<String>) -> Self {
        self.begins_with = Some(value.into());
        self
    }

    pub fn range(mut self, range: SearchRange) -> Self {
        self.range = Some(range);
        self
    }

    fn predicate_count(&self) -> usize {
        [
            self.eq.is_some(),
            self.eq_or.is_some(),
            self.begins_with.is_some(),
            self.range.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Values this attribute contributes to an eqOr expansion.
    fn or_set(&self) -> Vec<&str> {
        match (&self.eq_or, &self.eq) {
            (Some(values), _) => values.iter().map(String::as_str).collect(),
            (None, Some(eq)) => vec![eq.as_str()],
            (None, None) => Vec::new(),
        }
    }
}

/// Single composite predicate the backend can execute.
///
/// Fields not used by the active predicate are `None`. The one exception is
/// a prefix search with no exact-match attributes, which reports `eq` as the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CompiledCriteria {
    pub key: String,
    pub eq: Option<String>,
    pub eq_or: Option<Vec<String>>,
    pub begins_with: Option<String>,
    pub range: Option<SearchRange>,
}

/// The attribute keys of a composite search, in order.
pub fn composite_key_name(keys: &[String]) -> String {
    keys.join(COMPOSITE_KEY_DELIMITER)
}

/// A validated, ordered list of attribute predicates.
///
/// Construction enforces every rule the compiler relies on, so
/// [`SearchCriteria::compile`] cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    attributes: Vec<SearchAttributeCriteria>,
}

impl SearchCriteria {
    /// Validate `attributes` and cap eqOr expansion at `max_combinations`.
    pub fn new(
        attributes: Vec<SearchAttributeCriteria>,
        max_combinations: usize,
    ) -> Result<Self, ValidationErrors> {
        validate(&attributes, max_combinations)?;
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[SearchAttributeCriteria] {
        &self.attributes
    }

    pub fn keys(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.key.clone()).collect()
    }

    /// True when more than one attribute is combined.
    pub fn is_composite(&self) -> bool {
        self.attributes.len() > 1
    }

    /// Fold the attribute predicates into one composite predicate.
    pub fn compile(&self) -> CompiledCriteria {
        let key = composite_key_name(&self.keys());

        let eq_values: Vec<&str> = self
            .attributes
            .iter()
            .filter_map(|a| a.eq.as_deref())
            .collect();
        let eq_joined = eq_values.join(COMPOSITE_KEY_DELIMITER);
        let eq_prefix = |value: &str| {
            if eq_values.is_empty() {
                value.to_string()
            } else {
                format!("{eq_joined}{COMPOSITE_KEY_DELIMITER}{value}")
            }
        };

        let mut compiled = CompiledCriteria {
            key,
            eq: None,
            eq_or: None,
            begins_with: None,
            range: None,
        };

        if self.attributes.iter().any(|a| a.eq_or.is_some()) {
            compiled.eq_or = Some(cross_product(&self.attributes));
            return compiled;
        }

        let last = self.attributes.last();

        if let Some(range) = last.and_then(|a| a.range.as_ref()) {
            let (start, end) = match range.kind {
                RangeKind::Number => (
                    normalize_number(&range.start).unwrap_or_else(|| range.start.clone()),
                    normalize_number(&range.end).unwrap_or_else(|| range.end.clone()),
                ),
                RangeKind::String => (range.start.clone(), range.end.clone()),
            };
            compiled.range = Some(SearchRange {
                kind: range.kind,
                start: eq_prefix(&start),
                end: eq_prefix(&end),
            });
            return compiled;
        }

        if let Some(prefix) = last.and_then(|a| a.begins_with.as_deref()) {
            compiled.begins_with = Some(eq_prefix(prefix));
            if eq_values.is_empty() {
                compiled.eq = Some(String::new());
            }
            return compiled;
        }

        compiled.eq = Some(eq_joined);
        compiled
    }
}

fn normalize_number(value: &str) -> Option<String> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(format_number)
}

/// Every combination of the attributes' value sets, first attribute
/// varying slowest.
fn cross_product(attributes: &[SearchAttributeCriteria]) -> Vec<String> {
    let mut combinations: Vec<Vec<&str>> = vec![Vec::new()];
    for attribute in attributes {
        let values = attribute.or_set();
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(*value);
                    next
                })
            })
            .collect();
    }
    combinations
        .into_iter()
        .map(|parts| parts.join(COMPOSITE_KEY_DELIMITER))
        .collect()
}

fn combination_count(attributes: &[SearchAttributeCriteria]) -> usize {
    attributes
        .iter()
        .map(|a| a.or_set().len())
        .try_fold(1usize, |acc, n| acc.checked_mul(n))
        .unwrap_or(usize::MAX)
}

// ============================================================================
// VALIDATION
// ============================================================================

fn validate(
    attributes: &[SearchAttributeCriteria],
    max_combinations: usize,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if attributes.is_empty() {
        errors.push(ValidationError::new(
            "attributes",
            "at least one search attribute is required",
        ));
        return errors.into_result();
    }

    let mut seen = HashSet::new();
    let last_index = attributes.len() - 1;
    let has_eq_or = attributes.iter().any(|a| a.eq_or.is_some());

    for (i, attribute) in attributes.iter().enumerate() {
        let key = attribute.key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new("key", "attribute key is required"));
            continue;
        }
        if key.contains(COMPOSITE_KEY_DELIMITER) {
            errors.push(ValidationError::new(
                key,
                format!("attribute key must not contain '{COMPOSITE_KEY_DELIMITER}'"),
            ));
        }
        if !seen.insert(key) {
            errors.push(ValidationError::new(key, "attribute key is listed more than once"));
        }

        match attribute.predicate_count() {
            0 => errors.push(ValidationError::new(
                key,
                "one of eq, eqOr, beginsWith or range is required",
            )),
            1 => {}
            _ => errors.push(ValidationError::new(
                key,
                "only one of eq, eqOr, beginsWith or range may be set",
            )),
        }

        if let Some(values) = &attribute.eq_or {
            if values.is_empty() {
                errors.push(ValidationError::new(key, "eqOr requires at least one value"));
            }
        }

        if attribute.begins_with.is_some() && i != last_index {
            errors.push(ValidationError::new(
                key,
                "only the last attribute may use beginsWith",
            ));
        }

        if let Some(range) = &attribute.range {
            if i != last_index {
                errors.push(ValidationError::new(
                    key,
                    "only the last attribute may use a range",
                ));
            }
            if range.kind == RangeKind::Number {
                for bound in [&range.start, &range.end] {
                    if normalize_number(bound).is_none() {
                        errors.push(ValidationError::new(
                            key,
                            format!("range value '{bound}' is not a number"),
                        ));
                    }
                }
            }
        }

        if has_eq_or && (attribute.begins_with.is_some() || attribute.range.is_some()) {
            errors.push(ValidationError::new(
                key,
                "eqOr cannot be combined with beginsWith or range",
            ));
        }
    }

    let tail = &attributes[last_index];
    if tail.range.is_some() || tail.begins_with.is_some() {
        for attribute in &attributes[..last_index] {
            if attribute.eq.is_none() {
                errors.push(ValidationError::new(
                    attribute.key.trim(),
                    "attributes before a range or beginsWith must use eq",
                ));
            }
        }
    }

    if has_eq_or {
        let count = combination_count(attributes);
        if count > max_combinations {
            errors.push(ValidationError::new(
                "eqOr",
                format!("{count} value combinations exceed the limit of {max_combinations}"),
            ));
        }
    }

    errors.into_result()
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// PROPERTY TESTS
// =============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value_sets() -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec(prop::collection::vec("[a-z0-9]{1,6}", 1..5), 1..4)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_eq_or_count_is_product(sets in arb_value_sets()) {
            let attributes: Vec<_> = sets
                .iter()
                .enumerate()
                .map(|(i, values)| {
                    SearchAttributeCriteria::new(format!("k{i}")).eq_or(values.clone())
                })
                .collect();
            let criteria = SearchCriteria::new(attributes, usize::MAX).expect("valid");
            let compiled = criteria.compile();

            let expected: usize = sets.iter().map(Vec::len).product();
            let combinations = compiled.eq_or.expect("eqOr");
            prop_assert_eq!(combinations.len(), expected);

            let first = sets.iter().map(|s| s[0].as_str()).collect::<Vec<_>>().join("::");
            prop_assert_eq!(&combinations[0], &first);
        }

        #[test]
        fn prop_eq_key_and_value_align(values in prop::collection::vec("[a-z0-9]{1,8}", 1..5)) {
            let attributes: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| SearchAttributeCriteria::new(format!("k{i}")).eq(v.clone()))
                .collect();
            let compiled = SearchCriteria::new(attributes, 100).expect("valid").compile();
            let key_parts = compiled.key.split("::").count();
            let eq = compiled.eq.expect("eq");
            let value_parts = eq.split("::").count();
            prop_assert_eq!(key_parts, values.len());
            prop_assert_eq!(value_parts, values.len());
        }

        #[test]
        fn prop_number_range_bounds_sort_numerically(a in 0u32..1_000_000, b in 0u32..1_000_000) {
            let (lo, hi) = (a.min(b), a.max(b));
            let compiled = SearchCriteria::new(
                vec![SearchAttributeCriteria::new("n")
                    .range(SearchRange::new(RangeKind::Number, lo.to_string(), hi.to_string()))],
                100,
            )
            .expect("valid")
            .compile();
            let range = compiled.range.expect("range");
            prop_assert!(range.start <= range.end);
        }
    }
}
