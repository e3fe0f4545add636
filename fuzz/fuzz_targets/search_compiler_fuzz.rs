//! Fuzz test for the multi-attribute search compiler
//!
//! Each input line is `<op><key>\t<value>` where the op byte picks eq,
//! eqOr (values split on `,`), beginsWith or a numeric range (`start,end`).
//! Whatever validates must compile without panicking.
//!
//! Run with: cargo +nightly fuzz run search_compiler_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use quire_core::{RangeKind, SearchAttributeCriteria, SearchCriteria, SearchRange};

fn criterion(line: &str) -> Option<SearchAttributeCriteria> {
    let mut chars = line.chars();
    let op = chars.next()?;
    let (key, value) = chars.as_str().split_once('\t')?;
    let criteria = SearchAttributeCriteria::new(key);
    Some(match op {
        'e' => criteria.eq(value),
        'o' => criteria.eq_or(value.split(',')),
        'b' => criteria.begins_with(value),
        'r' => {
            let (start, end) = value.split_once(',')?;
            criteria.range(SearchRange::new(RangeKind::Number, start, end))
        }
        _ => criteria,
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let attributes: Vec<SearchAttributeCriteria> = input.lines().filter_map(criterion).collect();

    let Ok(criteria) = SearchCriteria::new(attributes, 64) else {
        return;
    };
    let compiled = criteria.compile();
    assert_eq!(compiled.key, criteria.keys().join("::"));

    let predicates = [
        compiled.eq_or.is_some(),
        compiled.range.is_some(),
        compiled.begins_with.is_some(),
    ];
    assert!(predicates.iter().filter(|set| **set).count() <= 1);
    if let Some(values) = &compiled.eq_or {
        assert!(!values.is_empty() && values.len() <= 64);
    }
});
