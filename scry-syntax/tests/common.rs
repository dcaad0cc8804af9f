#![allow(dead_code)]
//! Shared helpers for `scry-syntax` integration tests.

use scry_syntax::*;

pub fn parse_ok(input: &str) -> ParsedQuery {
    parse_query(input).unwrap_or_else(|err| panic!("query {input:?} failed: {err}"))
}

pub fn parse_err(input: &str) -> QueryError {
    match parse_query(input) {
        Ok(parsed) => panic!("query {input:?} unexpectedly parsed: {parsed:?}"),
        Err(err) => err,
    }
}

/// The single flat filter of a one-filter query.
pub fn only_filter(input: &str) -> Filter {
    let parsed = parse_ok(input);
    assert!(
        parsed.or_groups.is_empty(),
        "query {input:?} produced OR groups"
    );
    assert_eq!(
        parsed.filters.len(),
        1,
        "query {input:?} produced {} filters",
        parsed.filters.len()
    );
    parsed.filters.into_iter().next().unwrap()
}

pub fn only_kind(input: &str) -> FilterKind {
    let filter = only_filter(input);
    assert!(!filter.negated, "query {input:?} is negated");
    filter.kind
}

pub fn colors(letters: &str) -> ColorSet {
    letters
        .chars()
        .map(|ch| match ch.to_ascii_lowercase() {
            'w' => Color::White,
            'u' => Color::Blue,
            'b' => Color::Black,
            'r' => Color::Red,
            'g' => Color::Green,
            other => panic!("bad test color letter {other:?}"),
        })
        .collect()
}

pub fn group_sizes(parsed: &ParsedQuery) -> Vec<usize> {
    parsed.or_groups.iter().map(Vec::len).collect()
}
