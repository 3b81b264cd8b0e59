//! Integration tests for TextQuery evaluation.

use std::sync::Arc;
use std::thread;

use textquery::prelude::*;
use textquery::query::{PatternCache, TermPatternCache};

fn query(text: &str) -> TextQuery {
    TextQuery::with_query(text, QueryOptions::default())
        .unwrap()
        .with_cache(Arc::new(TermPatternCache::new()))
}

#[test]
fn test_boundary_anchoring() -> Result<()> {
    let query = query("cat");

    assert!(query.eval("the cat sat")?);
    assert!(query.eval("cat")?);
    assert!(!query.eval("concatenate")?);
    assert!(!query.eval("the cats")?);

    Ok(())
}

#[test]
fn test_fuzzy_terms() -> Result<()> {
    assert!(query("~cat").eval("bobcat here")?);
    assert!(!query("cat").eval("bobcat here")?);

    assert!(query("2~cat").eval("xxcat foo")?);
    assert!(!query("2~cat").eval("xxxcat foo")?);

    assert!(query("cat~3").eval("cathys")?);
    assert!(!query("cat~3").eval("cathy")?);
    assert!(query("~cat~").eval("a concatenated string")?);

    Ok(())
}

#[test]
fn test_wildcards_span_delimiters() -> Result<()> {
    assert!(query("2~cat").eval("a cat")?);
    assert!(query("cat~4").eval("cat dog")?);
    assert!(query("~dog").eval("cat dog")?);
    assert!(!query("cat~3").eval("cat dog")?);

    Ok(())
}

#[test]
fn test_case_sensitivity_toggle() -> Result<()> {
    let insensitive = query("Cat");
    assert!(insensitive.eval("the cat")?);

    let sensitive = TextQuery::with_query("Cat", QueryOptions::new().ignore_case(false))?;
    assert!(!sensitive.eval("the cat")?);
    assert!(sensitive.eval("the Cat")?);

    Ok(())
}

#[test]
fn test_boolean_combinators() -> Result<()> {
    let cases = [
        ("a b", true, true),
        ("a x", true, false),
        ("x b", false, true),
        ("x y", false, false),
    ];

    let and = query("a AND b");
    let implicit_and = query("a b");
    let or = query("a OR b");
    let not = query("NOT a");
    let minus = query("-a");

    for (text, has_a, has_b) in cases {
        assert_eq!(and.eval(text)?, has_a && has_b, "a AND b on '{text}'");
        assert_eq!(implicit_and.eval(text)?, has_a && has_b, "a b on '{text}'");
        assert_eq!(or.eval(text)?, has_a || has_b, "a OR b on '{text}'");
        assert_eq!(not.eval(text)?, !has_a, "NOT a on '{text}'");
        assert_eq!(minus.eval(text)?, !has_a, "-a on '{text}'");
    }

    Ok(())
}

#[test]
fn test_grouping_and_precedence() -> Result<()> {
    let query = query("(cat OR dog) AND NOT bird");

    assert!(query.eval("a cat")?);
    assert!(query.eval("a dog")?);
    assert!(!query.eval("a cat and a bird")?);
    assert!(!query.eval("a fish")?);

    // AND binds tighter than OR.
    let query = self::query("cat dog OR bird");
    assert!(query.eval("bird")?);
    assert!(query.eval("cat dog")?);
    assert!(!query.eval("cat")?);

    Ok(())
}

#[test]
fn test_phrases_and_patterns() -> Result<()> {
    assert!(query("\"big cat\"").eval("a big cat here")?);
    assert!(!query("\"big cat\"").eval("a big dog and a cat")?);

    assert!(query("/colou?r/").eval("what color is it")?);
    assert!(query("/colou?r/").eval("what colour is it")?);
    assert!(!query("colou?r").eval("what color is it")?);
    assert!(query("a.c").eval("x a.c y")?);
    assert!(!query("a.c").eval("x abc y")?);

    Ok(())
}

#[test]
fn test_field_terms() -> Result<()> {
    let query = query("title:cat author:bob");

    assert!(query.eval("title:the cat sat author:bob")?);
    assert!(!query.eval("title:the dog author:bob cat")?);
    assert!(!query.eval("the cat bob")?);

    Ok(())
}

#[test]
fn test_custom_delimiters() -> Result<()> {
    let options = QueryOptions::new().delimiters([" ", ",", ";"]);
    let query = TextQuery::with_query("cat", options)?;

    assert!(query.eval("dog;cat,bird")?);
    assert!(!query.eval("dog;cats")?);

    let options = QueryOptions::new().delimiters([Delimiter::pattern(r"[^\w]+")?]);
    let query = TextQuery::with_query("cat", options)?;
    assert!(query.eval("(cat)")?);
    assert!(!query.eval("(cats)")?);

    Ok(())
}

#[test]
fn test_newlines_are_not_boundaries_by_default() -> Result<()> {
    let query = query("cat");
    assert!(!query.eval("cat\ndog")?);
    assert!(!query.eval("dog\ncat")?);

    let options = QueryOptions::new().delimiters([" ", "\n"]);
    let query = TextQuery::with_query("cat", options)?;
    assert!(query.eval("cat\ndog")?);
    assert!(query.eval("dog\ncat")?);

    Ok(())
}

#[test]
fn test_parse_failure_diagnostics() {
    let mut query = TextQuery::new(QueryOptions::default()).unwrap();

    let error = query.parse("(cat AND").unwrap_err();
    assert!(error.to_string().starts_with("could not parse query string"));
    assert!(!query.terminal_failures().is_empty());
    assert!(!query.is_parsed());
}

#[test]
fn test_no_query_specified() {
    let query = TextQuery::new(QueryOptions::default()).unwrap();

    assert!(matches!(
        query.eval("anything"),
        Err(TextQueryError::NoQuerySpecified)
    ));
    assert!(matches!(
        query.accept(&mut |_: VisitKind, _: &str| {}),
        Err(TextQueryError::NoQuerySpecified)
    ));
}

#[test]
fn test_visitor_sees_terms_in_order() -> Result<()> {
    let query = query("alpha (beta OR \"gamma delta\") -epsilon field:zeta");

    let mut seen = Vec::new();
    query.accept(&mut |kind: VisitKind, payload: &str| {
        assert_eq!(kind, VisitKind::Value);
        seen.push(payload.to_string());
    })?;

    assert_eq!(seen, vec!["alpha", "beta", "gamma delta", "epsilon", "zeta"]);
    Ok(())
}

#[test]
fn test_concurrent_evaluation_compiles_once() {
    let cache = Arc::new(TermPatternCache::new());
    let query = Arc::new(
        TextQuery::with_query("~cat~ OR dog", QueryOptions::default())
            .unwrap()
            .with_cache(cache.clone()),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let query = Arc::clone(&query);
            thread::spawn(move || {
                for _ in 0..50 {
                    let text = if i % 2 == 0 { "a bobcat" } else { "a dog" };
                    assert!(query.eval(text).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.compilations, 2);
}
