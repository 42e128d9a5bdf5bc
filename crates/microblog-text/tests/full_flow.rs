use std::collections::BTreeMap;

use microblog_core::traits::SearchIndex;
use microblog_core::types::{EntityKind, EntityRef, IndexFields, IndexOp, IndexDoc};
use microblog_text::{DisabledIndex, TantivySearchIndex};

fn body(text: &str) -> IndexFields {
    let mut fields = BTreeMap::new();
    fields.insert("body".to_string(), text.to_string());
    fields
}

#[test]
fn upsert_then_query_finds_word() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("Learning tantivy today")).expect("upsert");
    index.upsert(EntityKind::Post, 2, &body("Nothing to see here")).expect("upsert");

    let page = index.query(EntityKind::Post, "tantivy", 1, 25).expect("query");
    assert_eq!(page.ids, vec![1]);
    assert_eq!(page.total, 1);
}

#[test]
fn zero_matches_is_empty_not_error() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("hello world")).expect("upsert");
    let page = index.query(EntityKind::Post, "no-such-term", 1, 25).expect("query");
    assert!(page.ids.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn upsert_is_idempotent_and_replaces() {
    let index = TantivySearchIndex::in_memory().expect("index");
    let entity = EntityRef::new(EntityKind::Post, 7);
    index.upsert(EntityKind::Post, 7, &body("first draft")).expect("upsert");
    index.upsert(EntityKind::Post, 7, &body("first draft")).expect("upsert again");
    assert_eq!(index.num_docs(), 1);
    assert_eq!(index.entry(entity).expect("entry"), Some(body("first draft")));

    index.upsert(EntityKind::Post, 7, &body("second version")).expect("replace");
    assert_eq!(index.num_docs(), 1);
    assert_eq!(index.query(EntityKind::Post, "draft", 1, 10).expect("query").total, 0);
    assert_eq!(index.query(EntityKind::Post, "version", 1, 10).expect("query").ids, vec![7]);
}

#[test]
fn remove_absent_is_noop() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.remove(EntityKind::Post, 99).expect("remove absent");
    index.upsert(EntityKind::Post, 1, &body("keep me")).expect("upsert");
    index.remove(EntityKind::Post, 1).expect("remove");
    index.remove(EntityKind::Post, 1).expect("remove twice");
    assert_eq!(index.num_docs(), 0);
    assert_eq!(index.entry(EntityRef::new(EntityKind::Post, 1)).expect("entry"), None);
}

#[test]
fn paging_splits_ranked_results() {
    let index = TantivySearchIndex::in_memory().expect("index");
    let ops: Vec<IndexOp> = (1..=5)
        .map(|id| IndexOp::Upsert(IndexDoc { entity: EntityRef::new(EntityKind::Post, id), fields: body(&format!("rust post number {id}")) }))
        .collect();
    index.apply(&ops).expect("apply");

    let first = index.query(EntityKind::Post, "rust", 1, 2).expect("page 1");
    let second = index.query(EntityKind::Post, "rust", 2, 2).expect("page 2");
    let third = index.query(EntityKind::Post, "rust", 3, 2).expect("page 3");
    assert_eq!(first.total, 5);
    assert_eq!((first.ids.len(), second.ids.len(), third.ids.len()), (2, 2, 1));
    let mut seen: Vec<u64> = first.ids.into_iter().chain(second.ids).chain(third.ids).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[test]
fn ranking_prefers_denser_matches() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("garden notes about soil and compost and weather")).expect("upsert");
    index.upsert(EntityKind::Post, 2, &body("compost compost compost")).expect("upsert");
    let page = index.query(EntityKind::Post, "compost", 1, 10).expect("query");
    assert_eq!(page.ids, vec![2, 1]);
}

#[test]
fn kinds_do_not_leak_into_each_other() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("shared word")).expect("upsert");
    index.upsert(EntityKind::User, 1, &body("shared word")).expect("upsert");
    assert_eq!(index.num_docs(), 2);
    assert_eq!(index.query(EntityKind::Post, "shared", 1, 10).expect("query").total, 1);
    assert_eq!(index.ids(EntityKind::User).expect("ids"), vec![1]);
}

#[test]
fn malformed_expression_does_not_fail() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("balanced quotes")).expect("upsert");
    let page = index.query(EntityKind::Post, "quotes AND (", 1, 10).expect("lenient query");
    assert!(page.total <= 1);
}

#[test]
fn page_zero_is_rejected() {
    let index = TantivySearchIndex::in_memory().expect("index");
    let err = index.query(EntityKind::Post, "anything", 0, 10).expect_err("page 0");
    assert!(!err.is_search_unavailable());
}

#[test]
fn on_disk_index_survives_reopen() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join("index");
    {
        let index = TantivySearchIndex::open(&dir, 50_000_000).expect("open");
        index.upsert(EntityKind::Post, 4, &body("persisted words")).expect("upsert");
    }
    let index = TantivySearchIndex::open(&dir, 50_000_000).expect("reopen");
    assert_eq!(index.query(EntityKind::Post, "persisted", 1, 10).expect("query").ids, vec![4]);
}

#[test]
fn disabled_index_reports_unavailable() {
    let index = DisabledIndex;
    index.upsert(EntityKind::Post, 1, &body("dropped")).expect("upsert is accepted");
    let err = index.query(EntityKind::Post, "dropped", 1, 10).expect_err("query must fail");
    assert!(err.is_search_unavailable());
}

#[test]
fn pages_far_past_the_end_are_empty() {
    let index = TantivySearchIndex::in_memory().expect("index");
    index.upsert(EntityKind::Post, 1, &body("hello there")).expect("upsert");
    index.upsert(EntityKind::Post, 2, &body("hello again")).expect("upsert");

    for page in [3, 1_000_000_000, usize::MAX / 2, usize::MAX] {
        let result = index.query(EntityKind::Post, "hello", page, 25).expect("query");
        assert!(result.ids.is_empty(), "page {page}");
        assert_eq!(result.total, 2, "page {page}");
    }
    let huge = index.query(EntityKind::Post, "hello", 1, usize::MAX).expect("huge page size");
    assert_eq!(huge.ids.len(), 2);
}
