//! Ingestion, with replaceable/addressable dominance handling
//! (`handle_replaceable`/`is_replaceable`/`is_parameterized_replaceable`/
//! `get_d_tag`) since the store would otherwise accumulate superseded copies
//! of the same logical resource forever.
//!
//! Every index key an event can produce is enumerated once, in
//! `derive_index_keys`, and reused both to write an event (`store`) and to
//! tear one down (`delete`, and the internal dominance teardown) — paired
//! `insert_indices`/`remove_indices` logic, just
//! sharing the key-derivation step between them instead of duplicating it.

use heed::types::{Bytes, Unit};
use heed::{Database, RwTxn};
use nostr::Event;

use crate::codec::{FullId, IdHash, IdentHash, PubHash};
use crate::error::{Error, Result};
use crate::keys;
use crate::store::{Families, Store};

fn is_replaceable(kind: u16) -> bool {
    kind == 0 || kind == 3 || (10_000..20_000).contains(&kind)
}

fn is_addressable(kind: u16) -> bool {
    (30_000..40_000).contains(&kind)
}

fn get_d_tag(event: &Event) -> Option<String> {
    event.tags.iter().find_map(|tag| {
        let v = tag.as_vec();
        (v.len() >= 2 && v[0] == "d").then(|| v[1].clone())
    })
}

/// Current wall-clock time in seconds since the epoch, used for `FirstSeen`
/// and `LastAccessed` (see `touch`).
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// One entry per secondary-index family a stored key can belong to; lets
/// `derive_index_keys` hand back a flat list that both `store` and `delete`
/// walk identically.
#[derive(Clone, Copy)]
enum Family {
    Id,
    FullIndex,
    Pubkey,
    Kind,
    CreatedAt,
    PubkeyCreatedAt,
    KindCreatedAt,
    KindPubkeyCreatedAt,
    TagA,
    TagIdentifier,
    TagEvent,
    TagPubkey,
    TagHashtag,
    TagLetter,
    TagProtected,
    TagNonstandard,
    FulltextWord,
}

fn db_for(families: &Families, family: Family) -> &Database<Bytes, Unit> {
    match family {
        Family::Id => &families.id,
        Family::FullIndex => &families.full_index,
        Family::Pubkey => &families.pubkey,
        Family::Kind => &families.kind,
        Family::CreatedAt => &families.created_at,
        Family::PubkeyCreatedAt => &families.pubkey_created_at,
        Family::KindCreatedAt => &families.kind_created_at,
        Family::KindPubkeyCreatedAt => &families.kind_pubkey_created_at,
        Family::TagA => &families.tag_a,
        Family::TagIdentifier => &families.tag_identifier,
        Family::TagEvent => &families.tag_event,
        Family::TagPubkey => &families.tag_pubkey,
        Family::TagHashtag => &families.tag_hashtag,
        Family::TagLetter => &families.tag_letter,
        Family::TagProtected => &families.tag_protected,
        Family::TagNonstandard => &families.tag_nonstandard,
        Family::FulltextWord => &families.fulltext_word,
    }
}

/// Decode an `a`-tag value `kind:pubkey:ident` (`original_source/tags/tags.go`
/// `Decode_a_Tag`): leading integer kind, 64-hex-char pubkey, and everything
/// after the second colon as the identifier, which may itself contain
/// colons. Fails if the pubkey doesn't decode to 32 bytes.
fn decode_a_tag(value: &str) -> Option<(u16, PubHash, IdentHash)> {
    let mut parts = value.splitn(3, ':');
    let kind: u16 = parts.next()?.parse().ok()?;
    let pubkey_bytes = hex::decode(parts.next()?).ok()?;
    let pub_hash = PubHash::from_full(&pubkey_bytes).ok()?;
    let ident = parts.next().unwrap_or("");
    Some((kind, pub_hash, IdentHash::from_full(ident.as_bytes())))
}

/// Enumerate every secondary-index key an event owns. Tags whose value fails
/// its family's type parse are silently dropped — the event is still
/// indexed by every other family.
fn derive_index_keys(event: &Event, serial: u64) -> Result<Vec<(Family, Vec<u8>)>> {
    let id_hash = IdHash::from_full(event.id.as_bytes())?;
    let full_id = FullId::from_full(event.id.as_bytes())?;
    let pub_hash = PubHash::from_full(event.pubkey.to_bytes().as_ref())?;
    let kind = event.kind.as_u16();
    let created_at = event.created_at.as_u64() as i64;

    let mut out = vec![
        (Family::Id, keys::id_key(id_hash, serial)),
        (
            Family::FullIndex,
            keys::full_index_key(serial, full_id, pub_hash, kind, created_at),
        ),
        (Family::Pubkey, keys::pubkey_key(pub_hash, serial)),
        (Family::Kind, keys::kind_key(kind, serial)),
        (Family::CreatedAt, keys::created_at_key(created_at, serial)),
        (
            Family::PubkeyCreatedAt,
            keys::pubkey_created_at_key(pub_hash, created_at, serial),
        ),
        (
            Family::KindCreatedAt,
            keys::kind_created_at_key(kind, created_at, serial),
        ),
        (
            Family::KindPubkeyCreatedAt,
            keys::kind_pubkey_created_at_key(kind, pub_hash, created_at, serial),
        ),
    ];

    for tag in event.tags.iter() {
        let elements = tag.as_vec();
        let Some(tag_key) = elements.first() else {
            continue;
        };
        let value = elements.get(1).map(String::as_str).unwrap_or("");

        match tag_key.as_str() {
            "a" => {
                if let Some((a_kind, a_pub_hash, a_ident_hash)) = decode_a_tag(value) {
                    out.push((
                        Family::TagA,
                        keys::tag_a_key(a_kind, a_pub_hash, a_ident_hash, serial),
                    ));
                }
            }
            "d" => out.push((
                Family::TagIdentifier,
                keys::tag_identifier_key(IdentHash::from_full(value.as_bytes()), serial),
            )),
            "e" => {
                if let Some(id_hash) = hex::decode(value).ok().and_then(|b| IdHash::from_full(&b).ok()) {
                    out.push((Family::TagEvent, keys::tag_event_key(id_hash, serial)));
                }
            }
            "p" => {
                if let Some(tag_pub_hash) =
                    hex::decode(value).ok().and_then(|b| PubHash::from_full(&b).ok())
                {
                    out.push((Family::TagPubkey, keys::tag_pubkey_key(tag_pub_hash, serial)));
                }
            }
            "t" => out.push((
                Family::TagHashtag,
                keys::tag_hashtag_key(IdentHash::from_full(value.as_bytes()), serial),
            )),
            "-" => out.push((Family::TagProtected, keys::tag_protected_key(pub_hash, serial))),
            key if key.len() == 1 && key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) => {
                out.push((
                    Family::TagLetter,
                    keys::tag_letter_key(key.as_bytes()[0], IdentHash::from_full(value.as_bytes()), serial),
                ));
            }
            key => out.push((
                Family::TagNonstandard,
                keys::tag_nonstandard_key(
                    IdentHash::from_full(key.as_bytes()),
                    IdentHash::from_full(value.as_bytes()),
                    serial,
                ),
            )),
        }
    }

    if crate::fulltext::is_text_bearing(kind) {
        for (word, position) in crate::fulltext::tokenize(&event.content) {
            out.push((
                Family::FulltextWord,
                keys::fulltext_word_key(word.as_bytes(), position, serial),
            ));
        }
    }

    Ok(out)
}

/// Store a validated event. Fails with `Duplicate` if the id is already
/// present; silently does nothing if the event is a replaceable or
/// addressable kind dominated by an existing entry.
pub fn store(store: &Store, event: &Event) -> Result<()> {
    let mut wtxn = store.env.write_txn()?;

    if crate::finders::find_serial_by_id(store, &wtxn, &event.id)?.is_some() {
        return Err(Error::Duplicate);
    }

    if handle_replaceable(store, &mut wtxn, event)? {
        tracing::debug!(id = %event.id, "dominated by an existing replaceable/addressable event, not stored");
        return Ok(());
    }

    let serial = store.serials.next_in_txn(&mut wtxn)?;
    let index_keys = derive_index_keys(event, serial)?;
    for (family, key) in &index_keys {
        db_for(&store.families, *family).put(&mut wtxn, key, &())?;
    }

    let seen_at = now_secs();
    store
        .families
        .first_seen
        .put(&mut wtxn, &keys::first_seen_key(serial, seen_at), &())?;
    store.families.last_accessed.put(
        &mut wtxn,
        &keys::last_accessed_key(serial),
        &keys::last_accessed_value(seen_at),
    )?;
    store.families.access_counter.put(
        &mut wtxn,
        &keys::access_counter_key(serial),
        &keys::access_counter_value(0),
    )?;

    let body = crate::event::encode(event)?;
    store.families.event.put(&mut wtxn, &keys::event_key(serial), &body)?;

    wtxn.commit()?;
    tracing::trace!(serial, id = %event.id, "stored event");
    Ok(())
}

/// Delete an event and every secondary entry that references it, by serial.
/// Added per `SPEC_FULL.md`'s "Deletion (NIP-09-style)" supplement — the
/// replaceable-handling path above already needs this internally, so it's
/// exposed publicly too via `Store::delete`.
pub fn delete(store: &Store, serial: u64) -> Result<bool> {
    let mut wtxn = store.env.write_txn()?;
    let deleted = delete_serial(store, &mut wtxn, serial)?;
    wtxn.commit()?;
    Ok(deleted)
}

/// Delete by full event id, for callers that only have the id on hand, not
/// the internal serial.
pub fn delete_by_id(store: &Store, id: &nostr::EventId) -> Result<bool> {
    let mut wtxn = store.env.write_txn()?;
    let serial = match crate::finders::find_serial_by_id(store, &wtxn, id)? {
        Some(serial) => serial,
        None => return Ok(false),
    };
    let deleted = delete_serial(store, &mut wtxn, serial)?;
    wtxn.commit()?;
    Ok(deleted)
}

fn delete_serial(store: &Store, wtxn: &mut RwTxn, serial: u64) -> Result<bool> {
    let event = match crate::finders::event_by_serial(store, wtxn, serial) {
        Ok(event) => event,
        Err(Error::NotFound) => return Ok(false),
        Err(e) => return Err(e),
    };

    for (family, key) in derive_index_keys(&event, serial)? {
        db_for(&store.families, family).delete(wtxn, &key)?;
    }

    // FirstSeen's key embeds the original ingest timestamp, which isn't
    // recoverable from the event itself — seek by serial prefix instead.
    let fs_prefix = keys::first_seen_prefix(serial);
    let fs_keys: Vec<Vec<u8>> = store
        .families
        .first_seen
        .prefix_iter(wtxn, &fs_prefix)?
        .map(|entry| entry.map(|(key, _)| key.to_vec()))
        .collect::<std::result::Result<_, heed::Error>>()?;
    for key in fs_keys {
        store.families.first_seen.delete(wtxn, &key)?;
    }

    store
        .families
        .last_accessed
        .delete(wtxn, &keys::last_accessed_key(serial))?;
    store
        .families
        .access_counter
        .delete(wtxn, &keys::access_counter_key(serial))?;
    store.families.event.delete(wtxn, &keys::event_key(serial))?;

    Ok(true)
}

/// Returns `true` if `event` is dominated by an existing replaceable or
/// addressable event sharing its `(author, kind)` (and `d`-tag, for
/// addressable kinds) and should not be stored; otherwise deletes whichever
/// existing events `event` dominates and returns `false`.
fn handle_replaceable(store: &Store, wtxn: &mut RwTxn, event: &Event) -> Result<bool> {
    let kind = event.kind.as_u16();
    if !is_replaceable(kind) && !is_addressable(kind) {
        return Ok(false);
    }

    let pub_hash = PubHash::from_full(event.pubkey.to_bytes().as_ref())?;
    let prefix = keys::kind_pubkey_created_at_prefix(kind, pub_hash);
    let want_d_tag = is_addressable(kind).then(|| get_d_tag(event));

    let new_created_at = event.created_at.as_u64() as i64;
    let new_id = event.id.as_bytes();

    let candidates: Vec<u64> = store
        .families
        .kind_pubkey_created_at
        .prefix_iter(wtxn, &prefix)?
        .map(|entry| {
            let (key, _) = entry?;
            let (_, _, _, serial) = keys::kind_pubkey_created_at_decode(key)?;
            Ok(serial)
        })
        .collect::<Result<_>>()?;

    let mut dominated = false;
    let mut losers = Vec::new();

    for existing_serial in candidates {
        let existing = crate::finders::event_by_serial(store, wtxn, existing_serial)?;
        if existing.id.as_bytes() == new_id {
            continue;
        }
        if let Some(want_d) = &want_d_tag {
            if get_d_tag(&existing).as_deref() != want_d.as_deref() {
                continue;
            }
        }
        let existing_created_at = existing.created_at.as_u64() as i64;
        let existing_id = existing.id.as_bytes();
        if (existing_created_at, existing_id) > (new_created_at, new_id) {
            dominated = true;
        } else {
            losers.push(existing_serial);
        }
    }

    if dominated {
        return Ok(true);
    }
    for serial in losers {
        delete_serial(store, wtxn, serial)?;
    }
    Ok(false)
}
