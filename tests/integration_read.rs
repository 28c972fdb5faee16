//! Black-box query-planner tests: id lookup, time windows, kind/author
//! intersections, tag scans, fulltext search, ordering, and limits.

use eventdex::config::StoreOptions;
use eventdex::Store;
use nostr::{EventBuilder, Filter, Keys, Kind, Tag, Timestamp};

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions {
        data_dir: dir.path().to_string_lossy().to_string(),
        block_cache_size: 10 * 1024 * 1024,
        compact_on_close: true,
    };
    (dir, Store::open(options).unwrap())
}

#[test]
fn by_id_filter_returns_the_matching_event() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let event = EventBuilder::new(Kind::TextNote, "findable", [])
        .to_event(&keys)
        .unwrap();
    store.store_event(&event).unwrap();

    let results = store.filter(&Filter::new().id(event.id)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, event.id);
}

#[test]
fn time_only_filter_returns_exactly_the_event_inside_the_window() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    for ts in [100u64, 200, 300] {
        let event = EventBuilder::new(Kind::TextNote, format!("at {ts}"), [])
            .custom_created_at(Timestamp::from(ts))
            .to_event(&keys)
            .unwrap();
        store.store_event(&event).unwrap();
    }

    let filter = Filter::new().since(Timestamp::from(150)).until(Timestamp::from(250));
    let results = store.filter(&filter).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].created_at.as_u64(), 200);
}

#[test]
fn kind_and_author_filter_narrows_to_the_intersection() {
    let (_dir, store) = open_store();
    let p1 = Keys::generate();
    let p2 = Keys::generate();

    let p1_profile = EventBuilder::new(Kind::Metadata, "{\"name\":\"p1\"}", [])
        .to_event(&p1)
        .unwrap();
    let p1_note = EventBuilder::new(Kind::TextNote, "p1 note", [])
        .to_event(&p1)
        .unwrap();
    let p2_profile = EventBuilder::new(Kind::Metadata, "{\"name\":\"p2\"}", [])
        .to_event(&p2)
        .unwrap();

    store.store_event(&p1_profile).unwrap();
    store.store_event(&p1_note).unwrap();
    store.store_event(&p2_profile).unwrap();

    let filter = Filter::new().kind(Kind::Metadata).author(p1.public_key());
    let results = store.filter(&filter).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, p1_profile.id);
}

#[test]
fn author_and_tag_filter_excludes_the_other_authors_matching_tag() {
    let (_dir, store) = open_store();
    let alice = Keys::generate();
    let bob = Keys::generate();
    let rust_tag = Tag::parse(["t".to_string(), "rust".to_string()]).unwrap();

    let alice_event = EventBuilder::new(Kind::TextNote, "alice on rust", [rust_tag.clone()])
        .to_event(&alice)
        .unwrap();
    let bob_event = EventBuilder::new(Kind::TextNote, "bob on rust", [rust_tag])
        .to_event(&bob)
        .unwrap();

    store.store_event(&alice_event).unwrap();
    store.store_event(&bob_event).unwrap();

    let filter = Filter::new().author(alice.public_key()).hashtag("rust");
    let results = store.filter(&filter).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, alice_event.id);
}

#[test]
fn search_term_matches_fulltext_indexed_words_and_skips_urls() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let event = EventBuilder::new(Kind::TextNote, "hello world https://x.jpg hello", [])
        .to_event(&keys)
        .unwrap();
    store.store_event(&event).unwrap();

    let filter = Filter::new().search("world");
    let results = store.filter_with_search(&filter).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, event.id);

    let miss = Filter::new().search("https");
    assert!(store.filter_with_search(&miss).unwrap().is_empty());
}

#[test]
fn results_are_ordered_newest_first() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let mut ids = Vec::new();
    for ts in [100u64, 200, 300] {
        let event = EventBuilder::new(Kind::TextNote, format!("n{ts}"), [])
            .custom_created_at(Timestamp::from(ts))
            .to_event(&keys)
            .unwrap();
        store.store_event(&event).unwrap();
        ids.push(event.id);
    }

    let results = store.filter(&Filter::new().kind(Kind::TextNote)).unwrap();
    let returned_order: Vec<_> = results.iter().map(|e| e.created_at.as_u64()).collect();
    assert_eq!(returned_order, vec![300, 200, 100]);
}

#[test]
fn limit_caps_the_result_count() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    for ts in [100u64, 200, 300] {
        let event = EventBuilder::new(Kind::TextNote, format!("n{ts}"), [])
            .custom_created_at(Timestamp::from(ts))
            .to_event(&keys)
            .unwrap();
        store.store_event(&event).unwrap();
    }

    let filter = Filter::new().kind(Kind::TextNote).limit(2);
    let results = store.filter(&filter).unwrap();
    assert_eq!(results.len(), 2);
}
