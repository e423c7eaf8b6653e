mod helpers;

use helpers::{entry, index_with};
use jotter::index::passage_text;

#[test]
fn empty_index_search_returns_empty_for_any_k() {
    let (index, _) = index_with(&[]);
    assert!(index.is_empty().unwrap());
    assert!(index.search("anything", 3).unwrap().is_empty());
    assert!(index.search("anything", 100).unwrap().is_empty());
    assert!(index.search("", 1).unwrap().is_empty());
}

#[test]
fn search_with_k_zero_returns_empty() {
    let (index, embedder) = index_with(&[entry("01-01-2024", "Met Alice.")]);
    let before = embedder.calls();
    assert!(index.search("meetings", 0).unwrap().is_empty());
    // k = 0 short-circuits before embedding the query.
    assert_eq!(embedder.calls(), before);
}

#[test]
fn sparse_corpus_returns_fewer_than_k() {
    let (index, _) = index_with(&[
        entry("01-01-2024", "Met Alice."),
        entry("02-01-2024", "Met Bob."),
    ]);
    let results = index.search("meetings", 5).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn exact_text_match_ranks_first() {
    let e = entry("01-01-2024", "Met Alice to discuss the roadmap.");
    let (index, _) = index_with(&[
        e.clone(),
        entry("02-01-2024", "Fixed the build."),
        entry("03-01-2024", "Reviewed the budget."),
    ]);

    // The spike embedder maps identical text to identical vectors, so querying
    // with the passage's own text must rank it first.
    let results = index.search(&passage_text(&e), 3).unwrap();
    assert_eq!(results[0], "Date: 01-01-2024. Met Alice to discuss the roadmap.");
    assert_eq!(results.len(), 3);
}

#[test]
fn bulk_load_reports_passage_count() {
    let (index, _) = index_with(&[]);
    let count = index
        .bulk_load(&[
            entry("01-01-2024", "One."),
            entry("02-01-2024", "Two."),
            entry("03-01-2024", "Three."),
        ])
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(index.len().unwrap(), 3);
}

#[test]
fn scenario_c_same_date_inserts_stay_distinct_passages() {
    let (index, _) = index_with(&[]);
    index.insert(&entry("05-05-2024", "First text.")).unwrap();
    index.insert(&entry("05-05-2024", "Second text.")).unwrap();

    // Append-only: two separate passages, no merge.
    assert_eq!(index.len().unwrap(), 2);
    let results = index.search("texts", 5).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.contains(&"Date: 05-05-2024. First text.".to_string()));
    assert!(results.contains(&"Date: 05-05-2024. Second text.".to_string()));
}

#[test]
fn insert_after_bulk_load_is_searchable() {
    let (index, _) = index_with(&[entry("01-01-2024", "Old entry.")]);
    index.insert(&entry("02-01-2024", "New entry.")).unwrap();

    let results = index.search("entries", 5).unwrap();
    assert_eq!(results.len(), 2);
}
