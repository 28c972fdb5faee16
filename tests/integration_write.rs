//! Black-box ingest tests: store/fetch round-trips, duplicate rejection,
//! replaceable and addressable kind handling, and deletion.

use eventdex::config::StoreOptions;
use eventdex::{Error, Store};
use nostr::{EventBuilder, Keys, Kind, Tag, Timestamp};

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
fn store_then_get_by_id_round_trips_the_event() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let event = EventBuilder::new(Kind::TextNote, "hello nostr", [])
        .to_event(&keys)
        .unwrap();

    store.store_event(&event).unwrap();

    let fetched = store.get_by_id(&event.id).unwrap().unwrap();
    assert_eq!(fetched.id, event.id);
    assert_eq!(fetched.pubkey, event.pubkey);
    assert_eq!(fetched.content, event.content);
    assert_eq!(fetched.created_at, event.created_at);
    assert_eq!(fetched.sig, event.sig);
}

#[test]
fn second_store_of_same_id_fails_with_duplicate() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let event = EventBuilder::new(Kind::TextNote, "hi", [])
        .to_event(&keys)
        .unwrap();

    store.store_event(&event).unwrap();
    let err = store.store_event(&event).unwrap_err();
    assert!(matches!(err, Error::Duplicate));
}

#[test]
fn unknown_id_is_absent_not_an_error() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let event = EventBuilder::new(Kind::TextNote, "ghost", [])
        .to_event(&keys)
        .unwrap();
    assert!(store.get_by_id(&event.id).unwrap().is_none());
}

#[test]
fn replaceable_kind_keeps_only_the_newest_version() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let v1 = EventBuilder::new(Kind::Metadata, "{\"name\":\"a\"}", [])
        .custom_created_at(Timestamp::from(100))
        .to_event(&keys)
        .unwrap();
    let v2 = EventBuilder::new(Kind::Metadata, "{\"name\":\"b\"}", [])
        .custom_created_at(Timestamp::from(200))
        .to_event(&keys)
        .unwrap();

    store.store_event(&v1).unwrap();
    store.store_event(&v2).unwrap();

    assert!(store.get_by_id(&v1.id).unwrap().is_none());
    assert_eq!(store.get_by_id(&v2.id).unwrap().unwrap().content, v2.content);
}

#[test]
fn addressable_kind_is_scoped_by_author_and_d_tag() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let d1 = Tag::parse(["d".to_string(), "post-1".to_string()]).unwrap();
    let d2 = Tag::parse(["d".to_string(), "post-2".to_string()]).unwrap();

    let old = EventBuilder::new(Kind::LongFormTextNote, "draft", [d1.clone()])
        .custom_created_at(Timestamp::from(100))
        .to_event(&keys)
        .unwrap();
    let new = EventBuilder::new(Kind::LongFormTextNote, "final", [d1])
        .custom_created_at(Timestamp::from(200))
        .to_event(&keys)
        .unwrap();
    let unrelated = EventBuilder::new(Kind::LongFormTextNote, "other post", [d2])
        .custom_created_at(Timestamp::from(150))
        .to_event(&keys)
        .unwrap();

    store.store_event(&old).unwrap();
    store.store_event(&new).unwrap();
    store.store_event(&unrelated).unwrap();

    assert!(store.get_by_id(&old.id).unwrap().is_none());
    assert!(store.get_by_id(&new.id).unwrap().is_some());
    assert!(store.get_by_id(&unrelated.id).unwrap().is_some());
}

#[test]
fn delete_tears_down_the_event_and_its_tag_indices() {
    let (_dir, store) = open_store();
    let keys = Keys::generate();
    let tag = Tag::parse(["t".to_string(), "rust".to_string()]).unwrap();
    let event = EventBuilder::new(Kind::TextNote, "about rust", [tag])
        .to_event(&keys)
        .unwrap();
    store.store_event(&event).unwrap();

    let filter = nostr::Filter::new().hashtag("rust");
    assert_eq!(store.filter(&filter).unwrap().len(), 1);

    assert!(store.delete_by_id(&event.id).unwrap());
    assert!(store.get_by_id(&event.id).unwrap().is_none());
    assert!(store.filter(&filter).unwrap().is_empty());
    assert!(!store.delete_by_id(&event.id).unwrap());
}
