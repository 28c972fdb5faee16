//! Point lookups and range scanners over the index families assembled in
//! `crate::keys`. Every range scanner seeks to the upper bound of its family
//! and walks backwards, stopping at `since`, a leading-field mismatch, or
//! `limit`.

use heed::types::{Bytes, Unit};
use heed::{Database, RoTxn};
use nostr::{Event, EventId};
use std::ops::{Bound, RangeBounds};
use tokio_util::sync::CancellationToken;

use crate::codec::{IdHash, IdentHash, PubHash};
use crate::error::{Error, Result};
use crate::keys::{self, MAX_SERIAL};
use crate::store::Store;

/// A range over borrowed byte slices, needed because heed's `Bytes` codec
/// has an unsized `EItem`.
struct ByteRange<'a> {
    start: &'a [u8],
    end: &'a [u8],
}

impl<'a> RangeBounds<[u8]> for ByteRange<'a> {
    fn start_bound(&self) -> Bound<&[u8]> {
        Bound::Included(self.start)
    }
    fn end_bound(&self) -> Bound<&[u8]> {
        Bound::Included(self.end)
    }
}

fn check_cancel(cancel: Option<&CancellationToken>) -> Result<()> {
    if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
        return Err(Error::Cancelled);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Point lookups
// ---------------------------------------------------------------------------

/// Resolve a full event id to its serial. Collisions on the 8-byte id hash
/// are resolved by reading each candidate's body and comparing the full id.
pub fn find_serial_by_id(store: &Store, rtxn: &RoTxn, id: &EventId) -> Result<Option<u64>> {
    let id_hash = IdHash::from_full(id.as_bytes())?;
    let prefix = keys::id_prefix(id_hash);
    let upper = keys::id_key(id_hash, MAX_SERIAL);
    let range = ByteRange {
        start: &prefix,
        end: &upper,
    };
    for entry in store.families.id.range(rtxn, &range)? {
        let (key, _) = entry?;
        let decoded = keys::id_decode(key)?;
        let event = event_by_serial(store, rtxn, decoded.serial)?;
        if event.id.as_bytes() == id.as_bytes() {
            return Ok(Some(decoded.serial));
        }
    }
    Ok(None)
}

/// Fetch and decode an event body by serial.
pub fn event_by_serial(store: &Store, rtxn: &RoTxn, serial: u64) -> Result<Event> {
    let key = keys::event_key(serial);
    let raw = store
        .families
        .event
        .get(rtxn, &key)?
        .ok_or(Error::NotFound)?;
    crate::event::decode(raw)
}

/// Fetch the `fi` record without decoding the event body.
pub fn full_index_by_serial(store: &Store, rtxn: &RoTxn, serial: u64) -> Result<keys::FullIndexKey> {
    let prefix = keys::full_index_prefix(serial);
    for entry in store.families.full_index.prefix_iter(rtxn, &prefix)? {
        let (key, _) = entry?;
        return keys::full_index_decode(key);
    }
    Err(Error::NotFound)
}

/// Update `LastAccessed` and bump `AccessCounter` for a serial that just
/// matched a query.
pub fn touch(store: &Store, serial: u64) -> Result<()> {
    let mut wtxn = store.env.write_txn()?;
    let now = crate::ingest::now_secs();
    store
        .families
        .last_accessed
        .put(&mut wtxn, &keys::last_accessed_key(serial), &keys::last_accessed_value(now))?;

    let count_key = keys::access_counter_key(serial);
    let current = match store.families.access_counter.get(&wtxn, &count_key)? {
        Some(raw) => keys::access_counter_decode_value(raw)?,
        None => 0,
    };
    store
        .families
        .access_counter
        .put(&mut wtxn, &count_key, &keys::access_counter_value(current + 1))?;
    wtxn.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Generic reverse range walk over a [lower, upper] byte range
// ---------------------------------------------------------------------------

fn walk_reverse<F>(
    db: &Database<Bytes, Unit>,
    rtxn: &RoTxn,
    lower: &[u8],
    upper: &[u8],
    limit: usize,
    cancel: Option<&CancellationToken>,
    mut accept: F,
) -> Result<Vec<u64>>
where
    F: FnMut(&[u8]) -> Result<Option<u64>>,
{
    let range = ByteRange {
        start: lower,
        end: upper,
    };
    let mut out = Vec::new();
    for entry in db.rev_range(rtxn, &range)? {
        check_cancel(cancel)?;
        let (key, _) = entry?;
        match accept(key) {
            Ok(Some(serial)) => {
                out.push(serial);
                if out.len() >= limit {
                    break;
                }
            }
            Ok(None) => break, // leading fields no longer match, or below `since`
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable index key during scan");
                continue;
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Time-bearing range scanners
// ---------------------------------------------------------------------------

pub fn scan_created_at(
    store: &Store,
    rtxn: &RoTxn,
    since: i64,
    until: i64,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::created_at_key(since, 0);
    let upper = keys::created_at_key(until, MAX_SERIAL);
    walk_reverse(&store.families.created_at, rtxn, &lower, &upper, limit, cancel, |key| {
        let (created_at, serial) = keys::created_at_decode(key)?;
        if created_at < since {
            return Ok(None);
        }
        Ok(Some(serial))
    })
}

pub fn scan_kind(
    store: &Store,
    rtxn: &RoTxn,
    kind: u16,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::kind_key(kind, 0);
    let upper = keys::kind_key(kind, MAX_SERIAL);
    walk_reverse(&store.families.kind, rtxn, &lower, &upper, limit, cancel, |key| {
        let (decoded_kind, serial) = keys::kind_decode(key)?;
        if decoded_kind != kind {
            return Ok(None);
        }
        Ok(Some(serial))
    })
}

pub fn scan_kind_created_at(
    store: &Store,
    rtxn: &RoTxn,
    kind: u16,
    since: i64,
    until: i64,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::kind_created_at_key(kind, since, 0);
    let upper = keys::kind_created_at_key(kind, until, MAX_SERIAL);
    walk_reverse(&store.families.kind_created_at, rtxn, &lower, &upper, limit, cancel, |key| {
        let (decoded_kind, created_at, serial) = keys::kind_created_at_decode(key)?;
        if decoded_kind != kind || created_at < since {
            return Ok(None);
        }
        Ok(Some(serial))
    })
}

pub fn scan_pubkey_created_at(
    store: &Store,
    rtxn: &RoTxn,
    pub_hash: PubHash,
    since: i64,
    until: i64,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::pubkey_created_at_key(pub_hash, since, 0);
    let upper = keys::pubkey_created_at_key(pub_hash, until, MAX_SERIAL);
    walk_reverse(&store.families.pubkey_created_at, rtxn, &lower, &upper, limit, cancel, |key| {
        let (decoded_hash, created_at, serial) = keys::pubkey_created_at_decode(key)?;
        if decoded_hash != pub_hash || created_at < since {
            return Ok(None);
        }
        Ok(Some(serial))
    })
}

pub fn scan_kind_pubkey_created_at(
    store: &Store,
    rtxn: &RoTxn,
    kind: u16,
    pub_hash: PubHash,
    since: i64,
    until: i64,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::kind_pubkey_created_at_key(kind, pub_hash, since, 0);
    let upper = keys::kind_pubkey_created_at_key(kind, pub_hash, until, MAX_SERIAL);
    walk_reverse(
        &store.families.kind_pubkey_created_at,
        rtxn,
        &lower,
        &upper,
        limit,
        cancel,
        |key| {
            let (decoded_kind, decoded_hash, created_at, serial) =
                keys::kind_pubkey_created_at_decode(key)?;
            if decoded_kind != kind || decoded_hash != pub_hash || created_at < since {
                return Ok(None);
            }
            Ok(Some(serial))
        },
    )
}

// ---------------------------------------------------------------------------
// Tag scanners — no time dimension in the key; capped purely by `limit`
// ---------------------------------------------------------------------------

pub fn scan_tag_a(
    store: &Store,
    rtxn: &RoTxn,
    kind: u16,
    pub_hash: PubHash,
    ident_hash: IdentHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_a_key(kind, pub_hash, ident_hash, 0);
    let upper = keys::tag_a_key(kind, pub_hash, ident_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_a, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, _, _, serial) = keys::tag_a_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_identifier(
    store: &Store,
    rtxn: &RoTxn,
    ident_hash: IdentHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_identifier_key(ident_hash, 0);
    let upper = keys::tag_identifier_key(ident_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_identifier, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, serial) = keys::tag_identifier_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_event(
    store: &Store,
    rtxn: &RoTxn,
    id_hash: IdHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_event_key(id_hash, 0);
    let upper = keys::tag_event_key(id_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_event, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, serial) = keys::tag_event_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_pubkey(
    store: &Store,
    rtxn: &RoTxn,
    pub_hash: PubHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_pubkey_key(pub_hash, 0);
    let upper = keys::tag_pubkey_key(pub_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_pubkey, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, serial) = keys::tag_pubkey_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_hashtag(
    store: &Store,
    rtxn: &RoTxn,
    ident_hash: IdentHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_hashtag_key(ident_hash, 0);
    let upper = keys::tag_hashtag_key(ident_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_hashtag, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, serial) = keys::tag_hashtag_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_letter(
    store: &Store,
    rtxn: &RoTxn,
    letter: u8,
    ident_hash: IdentHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_letter_key(letter, ident_hash, 0);
    let upper = keys::tag_letter_key(letter, ident_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_letter, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, _, serial) = keys::tag_letter_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_protected(
    store: &Store,
    rtxn: &RoTxn,
    pub_hash: PubHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_protected_key(pub_hash, 0);
    let upper = keys::tag_protected_key(pub_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_protected, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, serial) = keys::tag_protected_decode(key)?;
        Ok(Some(serial))
    })
}

pub fn scan_tag_nonstandard(
    store: &Store,
    rtxn: &RoTxn,
    key_hash: IdentHash,
    value_hash: IdentHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::tag_nonstandard_key(key_hash, value_hash, 0);
    let upper = keys::tag_nonstandard_key(key_hash, value_hash, MAX_SERIAL);
    walk_reverse(&store.families.tag_nonstandard, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, _, serial) = keys::tag_nonstandard_decode(key)?;
        Ok(Some(serial))
    })
}

/// `pk` is written on every ingest but no planner rule reads it directly —
/// "authors only" always goes through `pc` so the scan can apply a time
/// bound. Kept around for index-completeness checks.
pub fn scan_pubkey(
    store: &Store,
    rtxn: &RoTxn,
    pub_hash: PubHash,
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::pubkey_key(pub_hash, 0);
    let upper = keys::pubkey_key(pub_hash, MAX_SERIAL);
    walk_reverse(&store.families.pubkey, rtxn, &lower, &upper, limit, cancel, |key| {
        let (decoded_hash, serial) = keys::pubkey_decode(key)?;
        if decoded_hash != pub_hash {
            return Ok(None);
        }
        Ok(Some(serial))
    })
}

pub fn scan_fulltext_word(
    store: &Store,
    rtxn: &RoTxn,
    word: &[u8],
    limit: usize,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<u64>> {
    let lower = keys::fulltext_word_key(word, 0, 0);
    let upper = keys::fulltext_word_key(word, MAX_SERIAL, MAX_SERIAL);
    walk_reverse(&store.families.fulltext_word, rtxn, &lower, &upper, limit, cancel, |key| {
        let (_, _, serial) = keys::fulltext_word_decode(key)?;
        Ok(Some(serial))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOptions;
    use nostr::{EventBuilder, Keys, Kind};

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
    fn find_by_id_after_store_and_not_found_for_unknown() {
        let (_dir, store) = open_store();
        let keys_ = Keys::generate();
        let event = EventBuilder::new(Kind::TextNote, "hi", [])
            .to_event(&keys_)
            .unwrap();
        store.store_event(&event).unwrap();

        let fetched = store.get_by_id(&event.id).unwrap();
        assert_eq!(fetched.unwrap().id, event.id);

        let other = EventBuilder::new(Kind::TextNote, "bye", [])
            .to_event(&Keys::generate())
            .unwrap();
        assert!(store.get_by_id(&other.id).unwrap().is_none());
    }

    #[test]
    fn created_at_scan_respects_since_and_until() {
        let (_dir, store) = open_store();
        let keys_ = Keys::generate();
        for ts in [100i64, 200, 300] {
            let event = EventBuilder::new(Kind::TextNote, format!("n{ts}"), [])
                .custom_created_at(nostr::Timestamp::from(ts as u64))
                .to_event(&keys_)
                .unwrap();
            store.store_event(&event).unwrap();
        }
        let rtxn = store.env.read_txn().unwrap();
        let serials = scan_created_at(&store, &rtxn, 150, 250, 100, None).unwrap();
        assert_eq!(serials.len(), 1);
        let ev = event_by_serial(&store, &rtxn, serials[0]).unwrap();
        assert_eq!(ev.created_at.as_u64(), 200);
    }
}
