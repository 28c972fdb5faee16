//! Index key assembler (spec §4.B).
//!
//! One family of constructors per index family in §3's table. Every family
//! gets three operations:
//!
//! - `encode` — full key: 2-byte prefix + fields, used for writes and as an
//!   exact seek point.
//! - `prefix` — 2-byte prefix + the leading fields only, used to bound an
//!   iterator to one logical scan.
//! - `decode` — reverses `encode`, called on a key an iterator handed back.
//!
//! Composite families order fields coarse-to-fine so a prefix scan yields
//! every entry sharing the leading fields, and — because the trailing field
//! before the serial is always `created_at` where present — reverse
//! iteration naturally yields newest-first.
//!
//! Each constructor is a plain function over the primitive codecs in
//! `crate::codec`; there's no trait object or dynamic dispatch here, so the
//! compiler can inline straight through to the byte pushes (design note:
//! monomorphise the hot path).

use crate::codec::{
    FieldCodec, FullId, FulltextWord, IdHash, IdentHash, KindField, Letter, PubHash, Serial,
    TimestampField,
};
use crate::error::{Error, Result};

pub mod prefix {
    pub const EVENT: &[u8; 2] = b"ev";
    pub const CONFIG: &[u8; 2] = b"cf";
    pub const ID: &[u8; 2] = b"id";
    pub const FULL_INDEX: &[u8; 2] = b"fi";
    pub const PUBKEY: &[u8; 2] = b"pk";
    pub const KIND: &[u8; 2] = b"ki";
    pub const CREATED_AT: &[u8; 2] = b"ca";
    pub const PUBKEY_CREATED_AT: &[u8; 2] = b"pc";
    pub const KIND_CREATED_AT: &[u8; 2] = b"kc";
    pub const KIND_PUBKEY_CREATED_AT: &[u8; 2] = b"kp";
    pub const TAG_A: &[u8; 2] = b"ta";
    pub const TAG_IDENTIFIER: &[u8; 2] = b"td";
    pub const TAG_EVENT: &[u8; 2] = b"te";
    pub const TAG_PUBKEY: &[u8; 2] = b"tp";
    pub const TAG_HASHTAG: &[u8; 2] = b"tt";
    pub const TAG_LETTER: &[u8; 2] = b"t*";
    pub const TAG_PROTECTED: &[u8; 2] = b"t-";
    pub const TAG_NONSTANDARD: &[u8; 2] = b"t?";
    pub const FULLTEXT_WORD: &[u8; 2] = b"fw";
    pub const FIRST_SEEN: &[u8; 2] = b"fs";
    pub const LAST_ACCESSED: &[u8; 2] = b"la";
    pub const ACCESS_COUNTER: &[u8; 2] = b"ac";
}

/// The maximum possible serial, used as a seek sentinel at the upper bound
/// of a reverse range scan (spec §4.F). Its varint encoding lexicographically
/// dominates the encoding of every smaller `u64` — see
/// `keys::tests::max_serial_dominates_every_serial_bytewise` — so appending
/// it after a family's fixed-width fields always seeks past every real entry
/// sharing those fields.
pub const MAX_SERIAL: u64 = u64::MAX;

fn strip_prefix<'a>(key: &'a [u8], want: &[u8; 2]) -> Result<&'a [u8]> {
    if key.len() < 2 {
        return Err(Error::Malformed("key shorter than prefix".to_string()));
    }
    debug_assert_eq!(&key[..2], want, "decoding key from the wrong family");
    Ok(&key[2..])
}

fn push_prefix(out: &mut Vec<u8>, p: &[u8; 2]) {
    out.extend_from_slice(p);
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

pub fn event_key(serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::EVENT);
    Serial(serial).write(&mut out);
    out
}

pub fn event_decode(key: &[u8]) -> Result<u64> {
    let mut body = strip_prefix(key, prefix::EVENT)?;
    Ok(Serial::read(&mut body)?.0)
}

// ---------------------------------------------------------------------------
// Config (singleton)
// ---------------------------------------------------------------------------

pub fn config_key() -> Vec<u8> {
    prefix::CONFIG.to_vec()
}

// ---------------------------------------------------------------------------
// Id
// ---------------------------------------------------------------------------

pub fn id_key(id_hash: IdHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::ID);
    id_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn id_prefix(id_hash: IdHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::ID);
    id_hash.write(&mut out);
    out
}

pub struct IdKey {
    pub id_hash: IdHash,
    pub serial: u64,
}

pub fn id_decode(key: &[u8]) -> Result<IdKey> {
    let mut body = strip_prefix(key, prefix::ID)?;
    let id_hash = IdHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok(IdKey { id_hash, serial })
}

// ---------------------------------------------------------------------------
// FullIndex
// ---------------------------------------------------------------------------

pub struct FullIndexKey {
    pub serial: u64,
    pub id: FullId,
    pub pub_hash: PubHash,
    pub kind: u16,
    pub created_at: i64,
}

pub fn full_index_key(
    serial: u64,
    id: FullId,
    pub_hash: PubHash,
    kind: u16,
    created_at: i64,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10 + 32 + 8 + 2 + 8);
    push_prefix(&mut out, prefix::FULL_INDEX);
    Serial(serial).write(&mut out);
    id.write(&mut out);
    pub_hash.write(&mut out);
    KindField(kind).write(&mut out);
    TimestampField(created_at).write(&mut out);
    out
}

pub fn full_index_prefix(serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10);
    push_prefix(&mut out, prefix::FULL_INDEX);
    Serial(serial).write(&mut out);
    out
}

pub fn full_index_decode(key: &[u8]) -> Result<FullIndexKey> {
    let mut body = strip_prefix(key, prefix::FULL_INDEX)?;
    let serial = Serial::read(&mut body)?.0;
    let id = FullId::read(&mut body)?;
    let pub_hash = PubHash::read(&mut body)?;
    let kind = KindField::read(&mut body)?.0;
    let created_at = TimestampField::read(&mut body)?.0;
    Ok(FullIndexKey {
        serial,
        id,
        pub_hash,
        kind,
        created_at,
    })
}

// ---------------------------------------------------------------------------
// Pubkey
// ---------------------------------------------------------------------------

pub fn pubkey_key(pub_hash: PubHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::PUBKEY);
    pub_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn pubkey_prefix(pub_hash: PubHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::PUBKEY);
    pub_hash.write(&mut out);
    out
}

pub fn pubkey_decode(key: &[u8]) -> Result<(PubHash, u64)> {
    let mut body = strip_prefix(key, prefix::PUBKEY)?;
    let pub_hash = PubHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((pub_hash, serial))
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

pub fn kind_key(kind: u16, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 10);
    push_prefix(&mut out, prefix::KIND);
    KindField(kind).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn kind_prefix(kind: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2);
    push_prefix(&mut out, prefix::KIND);
    KindField(kind).write(&mut out);
    out
}

pub fn kind_decode(key: &[u8]) -> Result<(u16, u64)> {
    let mut body = strip_prefix(key, prefix::KIND)?;
    let kind = KindField::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((kind, serial))
}

// ---------------------------------------------------------------------------
// CreatedAt
// ---------------------------------------------------------------------------

pub fn created_at_key(created_at: i64, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::CREATED_AT);
    TimestampField(created_at).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn created_at_prefix() -> Vec<u8> {
    prefix::CREATED_AT.to_vec()
}

pub fn created_at_decode(key: &[u8]) -> Result<(i64, u64)> {
    let mut body = strip_prefix(key, prefix::CREATED_AT)?;
    let created_at = TimestampField::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((created_at, serial))
}

// ---------------------------------------------------------------------------
// PubkeyCreatedAt
// ---------------------------------------------------------------------------

pub fn pubkey_created_at_key(pub_hash: PubHash, created_at: i64, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 8 + 10);
    push_prefix(&mut out, prefix::PUBKEY_CREATED_AT);
    pub_hash.write(&mut out);
    TimestampField(created_at).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn pubkey_created_at_prefix(pub_hash: PubHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::PUBKEY_CREATED_AT);
    pub_hash.write(&mut out);
    out
}

pub fn pubkey_created_at_decode(key: &[u8]) -> Result<(PubHash, i64, u64)> {
    let mut body = strip_prefix(key, prefix::PUBKEY_CREATED_AT)?;
    let pub_hash = PubHash::read(&mut body)?;
    let created_at = TimestampField::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((pub_hash, created_at, serial))
}

// ---------------------------------------------------------------------------
// KindCreatedAt
// ---------------------------------------------------------------------------

pub fn kind_created_at_key(kind: u16, created_at: i64, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 8 + 10);
    push_prefix(&mut out, prefix::KIND_CREATED_AT);
    KindField(kind).write(&mut out);
    TimestampField(created_at).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn kind_created_at_prefix(kind: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2);
    push_prefix(&mut out, prefix::KIND_CREATED_AT);
    KindField(kind).write(&mut out);
    out
}

pub fn kind_created_at_decode(key: &[u8]) -> Result<(u16, i64, u64)> {
    let mut body = strip_prefix(key, prefix::KIND_CREATED_AT)?;
    let kind = KindField::read(&mut body)?.0;
    let created_at = TimestampField::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((kind, created_at, serial))
}

// ---------------------------------------------------------------------------
// KindPubkeyCreatedAt
// ---------------------------------------------------------------------------

pub fn kind_pubkey_created_at_key(
    kind: u16,
    pub_hash: PubHash,
    created_at: i64,
    serial: u64,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 8 + 8 + 10);
    push_prefix(&mut out, prefix::KIND_PUBKEY_CREATED_AT);
    KindField(kind).write(&mut out);
    pub_hash.write(&mut out);
    TimestampField(created_at).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn kind_pubkey_created_at_prefix(kind: u16, pub_hash: PubHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 8);
    push_prefix(&mut out, prefix::KIND_PUBKEY_CREATED_AT);
    KindField(kind).write(&mut out);
    pub_hash.write(&mut out);
    out
}

pub fn kind_pubkey_created_at_decode(key: &[u8]) -> Result<(u16, PubHash, i64, u64)> {
    let mut body = strip_prefix(key, prefix::KIND_PUBKEY_CREATED_AT)?;
    let kind = KindField::read(&mut body)?.0;
    let pub_hash = PubHash::read(&mut body)?;
    let created_at = TimestampField::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((kind, pub_hash, created_at, serial))
}

// ---------------------------------------------------------------------------
// TagA — addressable reference (kind:pubkey:ident)
// ---------------------------------------------------------------------------

pub fn tag_a_key(kind: u16, pub_hash: PubHash, ident_hash: IdentHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 8 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_A);
    KindField(kind).write(&mut out);
    pub_hash.write(&mut out);
    ident_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_a_prefix(kind: u16, pub_hash: PubHash, ident_hash: IdentHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 2 + 8 + 8);
    push_prefix(&mut out, prefix::TAG_A);
    KindField(kind).write(&mut out);
    pub_hash.write(&mut out);
    ident_hash.write(&mut out);
    out
}

pub fn tag_a_decode(key: &[u8]) -> Result<(u16, PubHash, IdentHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_A)?;
    let kind = KindField::read(&mut body)?.0;
    let pub_hash = PubHash::read(&mut body)?;
    let ident_hash = IdentHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((kind, pub_hash, ident_hash, serial))
}

// ---------------------------------------------------------------------------
// TagIdentifier — `d` tag
// ---------------------------------------------------------------------------

pub fn tag_identifier_key(ident_hash: IdentHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_IDENTIFIER);
    ident_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_identifier_prefix(ident_hash: IdentHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_IDENTIFIER);
    ident_hash.write(&mut out);
    out
}

pub fn tag_identifier_decode(key: &[u8]) -> Result<(IdentHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_IDENTIFIER)?;
    let ident_hash = IdentHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((ident_hash, serial))
}

// ---------------------------------------------------------------------------
// TagEvent — `e` tag
// ---------------------------------------------------------------------------

pub fn tag_event_key(id_hash: IdHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_EVENT);
    id_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_event_prefix(id_hash: IdHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_EVENT);
    id_hash.write(&mut out);
    out
}

pub fn tag_event_decode(key: &[u8]) -> Result<(IdHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_EVENT)?;
    let id_hash = IdHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((id_hash, serial))
}

// ---------------------------------------------------------------------------
// TagPubkey — `p` tag
// ---------------------------------------------------------------------------

pub fn tag_pubkey_key(pub_hash: PubHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_PUBKEY);
    pub_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_pubkey_prefix(pub_hash: PubHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_PUBKEY);
    pub_hash.write(&mut out);
    out
}

pub fn tag_pubkey_decode(key: &[u8]) -> Result<(PubHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_PUBKEY)?;
    let pub_hash = PubHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((pub_hash, serial))
}

// ---------------------------------------------------------------------------
// TagHashtag — `t` tag
// ---------------------------------------------------------------------------

pub fn tag_hashtag_key(ident_hash: IdentHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_HASHTAG);
    ident_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_hashtag_prefix(ident_hash: IdentHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_HASHTAG);
    ident_hash.write(&mut out);
    out
}

pub fn tag_hashtag_decode(key: &[u8]) -> Result<(IdentHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_HASHTAG)?;
    let ident_hash = IdentHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((ident_hash, serial))
}

// ---------------------------------------------------------------------------
// TagLetter — any other single-letter tag
// ---------------------------------------------------------------------------

pub fn tag_letter_key(letter: u8, ident_hash: IdentHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 1 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_LETTER);
    Letter(letter).write(&mut out);
    ident_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_letter_prefix(letter: u8, ident_hash: IdentHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 1 + 8);
    push_prefix(&mut out, prefix::TAG_LETTER);
    Letter(letter).write(&mut out);
    ident_hash.write(&mut out);
    out
}

pub fn tag_letter_decode(key: &[u8]) -> Result<(u8, IdentHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_LETTER)?;
    let letter = Letter::read(&mut body)?.0;
    let ident_hash = IdentHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((letter, ident_hash, serial))
}

// ---------------------------------------------------------------------------
// TagProtected — `-` tag
// ---------------------------------------------------------------------------

pub fn tag_protected_key(pub_hash: PubHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_PROTECTED);
    pub_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_protected_prefix(pub_hash: PubHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_PROTECTED);
    pub_hash.write(&mut out);
    out
}

pub fn tag_protected_decode(key: &[u8]) -> Result<(PubHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_PROTECTED)?;
    let pub_hash = PubHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((pub_hash, serial))
}

// ---------------------------------------------------------------------------
// TagNonstandard — multi-character tag key
// ---------------------------------------------------------------------------

pub fn tag_nonstandard_key(key_hash: IdentHash, value_hash: IdentHash, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8 + 8 + 10);
    push_prefix(&mut out, prefix::TAG_NONSTANDARD);
    key_hash.write(&mut out);
    value_hash.write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn tag_nonstandard_prefix(key_hash: IdentHash) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 8);
    push_prefix(&mut out, prefix::TAG_NONSTANDARD);
    key_hash.write(&mut out);
    out
}

pub fn tag_nonstandard_decode(key: &[u8]) -> Result<(IdentHash, IdentHash, u64)> {
    let mut body = strip_prefix(key, prefix::TAG_NONSTANDARD)?;
    let key_hash = IdentHash::read(&mut body)?;
    let value_hash = IdentHash::read(&mut body)?;
    let serial = Serial::read(&mut body)?.0;
    Ok((key_hash, value_hash, serial))
}

// ---------------------------------------------------------------------------
// FulltextWord
// ---------------------------------------------------------------------------

pub fn fulltext_word_key(word: &[u8], position: u64, serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 1 + word.len() + 5 + 10);
    push_prefix(&mut out, prefix::FULLTEXT_WORD);
    FulltextWord(word.to_vec()).write(&mut out);
    Serial(position).write(&mut out);
    Serial(serial).write(&mut out);
    out
}

pub fn fulltext_word_prefix(word: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 1 + word.len());
    push_prefix(&mut out, prefix::FULLTEXT_WORD);
    FulltextWord(word.to_vec()).write(&mut out);
    out
}

pub fn fulltext_word_decode(key: &[u8]) -> Result<(Vec<u8>, u64, u64)> {
    let mut body = strip_prefix(key, prefix::FULLTEXT_WORD)?;
    let word = FulltextWord::read(&mut body)?.0;
    let position = Serial::read(&mut body)?.0;
    let serial = Serial::read(&mut body)?.0;
    Ok((word, position, serial))
}

// ---------------------------------------------------------------------------
// FirstSeen
// ---------------------------------------------------------------------------

pub fn first_seen_key(serial: u64, seen_at: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10 + 8);
    push_prefix(&mut out, prefix::FIRST_SEEN);
    Serial(serial).write(&mut out);
    TimestampField(seen_at).write(&mut out);
    out
}

pub fn first_seen_prefix(serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10);
    push_prefix(&mut out, prefix::FIRST_SEEN);
    Serial(serial).write(&mut out);
    out
}

pub fn first_seen_decode(key: &[u8]) -> Result<(u64, i64)> {
    let mut body = strip_prefix(key, prefix::FIRST_SEEN)?;
    let serial = Serial::read(&mut body)?.0;
    let seen_at = TimestampField::read(&mut body)?.0;
    Ok((serial, seen_at))
}

// ---------------------------------------------------------------------------
// LastAccessed — value carries the timestamp
// ---------------------------------------------------------------------------

pub fn last_accessed_key(serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10);
    push_prefix(&mut out, prefix::LAST_ACCESSED);
    Serial(serial).write(&mut out);
    out
}

pub fn last_accessed_decode_key(key: &[u8]) -> Result<u64> {
    let mut body = strip_prefix(key, prefix::LAST_ACCESSED)?;
    Ok(Serial::read(&mut body)?.0)
}

pub fn last_accessed_value(accessed_at: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    TimestampField(accessed_at).write(&mut out);
    out
}

pub fn last_accessed_decode_value(value: &[u8]) -> Result<i64> {
    let mut body = value;
    Ok(TimestampField::read(&mut body)?.0)
}

// ---------------------------------------------------------------------------
// AccessCounter — value carries the varint count
// ---------------------------------------------------------------------------

pub fn access_counter_key(serial: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 10);
    push_prefix(&mut out, prefix::ACCESS_COUNTER);
    Serial(serial).write(&mut out);
    out
}

pub fn access_counter_decode_key(key: &[u8]) -> Result<u64> {
    let mut body = strip_prefix(key, prefix::ACCESS_COUNTER)?;
    Ok(Serial::read(&mut body)?.0)
}

pub fn access_counter_value(count: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    Serial(count).write(&mut out);
    out
}

pub fn access_counter_decode_value(value: &[u8]) -> Result<u64> {
    let mut body = value;
    Ok(Serial::read(&mut body)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_varint;

    #[test]
    fn max_serial_dominates_every_serial_bytewise() {
        let mut max_bytes = Vec::new();
        encode_varint(MAX_SERIAL, &mut max_bytes);
        for s in [0u64, 1, 127, 128, 300, 1 << 20, 1 << 40, u64::MAX - 1] {
            let mut bytes = Vec::new();
            encode_varint(s, &mut bytes);
            assert!(
                bytes <= max_bytes,
                "serial {s} encoding {bytes:?} must not exceed MAX_SERIAL encoding {max_bytes:?}"
            );
        }
    }

    #[test]
    fn pubkey_created_at_round_trips() {
        let ph = PubHash([7u8; 8]);
        let key = pubkey_created_at_key(ph, 1_700_000_000, 42);
        let (dph, created_at, serial) = pubkey_created_at_decode(&key).unwrap();
        assert_eq!(dph, ph);
        assert_eq!(created_at, 1_700_000_000);
        assert_eq!(serial, 42);
    }

    #[test]
    fn kind_pubkey_created_at_round_trips() {
        let ph = PubHash([1u8; 8]);
        let key = kind_pubkey_created_at_key(30023, ph, 1000, 9);
        let (kind, dph, created_at, serial) = kind_pubkey_created_at_decode(&key).unwrap();
        assert_eq!(kind, 30023);
        assert_eq!(dph, ph);
        assert_eq!(created_at, 1000);
        assert_eq!(serial, 9);
    }

    #[test]
    fn tag_a_round_trips() {
        let ph = PubHash([3u8; 8]);
        let ih = IdentHash::from_full(b"some-ident");
        let key = tag_a_key(30023, ph, ih, 5);
        let (kind, dph, dih, serial) = tag_a_decode(&key).unwrap();
        assert_eq!(kind, 30023);
        assert_eq!(dph, ph);
        assert_eq!(dih, ih);
        assert_eq!(serial, 5);
    }

    #[test]
    fn fulltext_word_round_trips() {
        let key = fulltext_word_key(b"hello", 3, 77);
        let (word, pos, serial) = fulltext_word_decode(&key).unwrap();
        assert_eq!(word, b"hello");
        assert_eq!(pos, 3);
        assert_eq!(serial, 77);
    }

    #[test]
    fn full_index_round_trips() {
        let id = FullId([9u8; 32]);
        let ph = PubHash([2u8; 8]);
        let key = full_index_key(11, id, ph, 1, 1_690_000_000);
        let decoded = full_index_decode(&key).unwrap();
        assert_eq!(decoded.serial, 11);
        assert_eq!(decoded.id, id);
        assert_eq!(decoded.pub_hash, ph);
        assert_eq!(decoded.kind, 1);
        assert_eq!(decoded.created_at, 1_690_000_000);
    }

    #[test]
    fn prefix_scan_keys_share_leading_bytes() {
        let ph = PubHash([5u8; 8]);
        let full = pubkey_key(ph, 99);
        let pfx = pubkey_prefix(ph);
        assert!(full.starts_with(&pfx));
    }

    #[test]
    fn last_accessed_value_round_trips() {
        let v = last_accessed_value(123);
        assert_eq!(last_accessed_decode_value(&v).unwrap(), 123);
    }

    #[test]
    fn access_counter_value_round_trips() {
        let v = access_counter_value(5);
        assert_eq!(access_counter_decode_value(&v).unwrap(), 5);
    }
}
