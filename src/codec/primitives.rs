use super::{decode_varint, encode_varint, take_array, take_vec, truncated_hash, FieldCodec};
use crate::error::{Error, Result};

/// 8-byte truncated SHA-256 of a full 32-byte event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdHash(pub [u8; 8]);

impl IdHash {
    pub fn from_full(id: &[u8]) -> Result<Self> {
        if id.len() != 32 {
            return Err(Error::Malformed(format!(
                "id must be 32 bytes, got {}",
                id.len()
            )));
        }
        Ok(Self(truncated_hash(id)))
    }
}

impl FieldCodec for IdHash {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        Ok(Self(take_array::<8>(input)?))
    }
}

/// 8-byte truncated SHA-256 of a full 32-byte x-only pubkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PubHash(pub [u8; 8]);

impl PubHash {
    pub fn from_full(pubkey: &[u8]) -> Result<Self> {
        if pubkey.len() != 32 {
            return Err(Error::Malformed(format!(
                "pubkey must be 32 bytes, got {}",
                pubkey.len()
            )));
        }
        Ok(Self(truncated_hash(pubkey)))
    }
}

impl FieldCodec for PubHash {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        Ok(Self(take_array::<8>(input)?))
    }
}

/// 8-byte truncated SHA-256 of an arbitrary-length identifier (tag value,
/// `a`-tag ident, nonstandard tag key/value, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentHash(pub [u8; 8]);

impl IdentHash {
    pub fn from_full(ident: &[u8]) -> Self {
        Self(truncated_hash(ident))
    }
}

impl FieldCodec for IdentHash {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        Ok(Self(take_array::<8>(input)?))
    }
}

/// A full 32-byte value (event id), stored in the `fi` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FullId(pub [u8; 32]);

impl FullId {
    pub fn from_full(id: &[u8]) -> Result<Self> {
        if id.len() != 32 {
            return Err(Error::Malformed(format!(
                "id must be 32 bytes, got {}",
                id.len()
            )));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(id);
        Ok(Self(buf))
    }
}

impl FieldCodec for FullId {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        Ok(Self(take_array::<32>(input)?))
    }
}

/// 2-byte unsigned kind number, big-endian so key order mirrors numeric
/// order (spec §3 invariant on sort-key fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KindField(pub u16);

impl FieldCodec for KindField {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        let bytes = take_array::<2>(input)?;
        Ok(Self(u16::from_be_bytes(bytes)))
    }
}

/// A single ASCII byte identifying a non-reserved single-letter tag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Letter(pub u8);

impl FieldCodec for Letter {
    fn write(&self, out: &mut Vec<u8>) {
        out.push(self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        let bytes = take_array::<1>(input)?;
        Ok(Self(bytes[0]))
    }
}

/// Signed 63-bit seconds-since-epoch, stored as 8 bytes big-endian so
/// ordinal comparison mirrors numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampField(pub i64);

impl FieldCodec for TimestampField {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes());
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        let bytes = take_array::<8>(input)?;
        Ok(Self(i64::from_be_bytes(bytes)))
    }
}

/// A length-prefixed, already-lowercased UTF-8 word from the fulltext
/// tokeniser (spec §4.H). The length prefix is a varint, so the word itself
/// is opaque bytes of that length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FulltextWord(pub Vec<u8>);

impl FieldCodec for FulltextWord {
    fn write(&self, out: &mut Vec<u8>) {
        encode_varint(self.0.len() as u64, out);
        out.extend_from_slice(&self.0);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        let len = decode_varint(input)? as usize;
        Ok(Self(take_vec(input, len)?))
    }
}

/// A bare varint value — used directly for serials and for the fulltext
/// word position counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Serial(pub u64);

impl FieldCodec for Serial {
    fn write(&self, out: &mut Vec<u8>) {
        encode_varint(self.0, out);
    }
    fn read(input: &mut &[u8]) -> Result<Self> {
        Ok(Self(decode_varint(input)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: FieldCodec + PartialEq + std::fmt::Debug>(v: T) {
        let mut buf = Vec::new();
        v.write(&mut buf);
        let mut slice = buf.as_slice();
        let back = T::read(&mut slice).unwrap();
        assert_eq!(v, back);
        assert!(slice.is_empty());
    }

    #[test]
    fn kind_round_trips_big_endian() {
        let k = KindField(30023);
        let mut buf = Vec::new();
        k.write(&mut buf);
        assert_eq!(buf, 30023u16.to_be_bytes());
        round_trip(k);
    }

    #[test]
    fn timestamp_round_trips_big_endian_and_sorts() {
        let earlier = TimestampField(100);
        let later = TimestampField(200);
        let mut be = Vec::new();
        let mut le = Vec::new();
        earlier.write(&mut be);
        later.write(&mut le);
        assert!(be < le, "big-endian bytes must preserve numeric order");
        round_trip(earlier);
        round_trip(later);
    }

    #[test]
    fn serial_round_trips_as_varint() {
        round_trip(Serial(0));
        round_trip(Serial(1000));
        round_trip(Serial(u64::MAX));
    }

    #[test]
    fn id_hash_from_full_rejects_wrong_length() {
        assert!(IdHash::from_full(&[0u8; 31]).is_err());
        assert!(IdHash::from_full(&[0u8; 32]).is_ok());
    }

    #[test]
    fn pub_hash_from_full_rejects_wrong_length() {
        assert!(PubHash::from_full(&[0u8; 33]).is_err());
        assert!(PubHash::from_full(&[0u8; 32]).is_ok());
    }

    #[test]
    fn ident_hash_accepts_any_length() {
        let a = IdentHash::from_full(b"d");
        let b = IdentHash::from_full(b"a-much-longer-identifier-string");
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn fulltext_word_round_trips() {
        round_trip(FulltextWord(b"hello".to_vec()));
        round_trip(FulltextWord(Vec::new()));
    }

    #[test]
    fn full_id_round_trips() {
        let mut id = [0u8; 32];
        id[0] = 0xab;
        round_trip(FullId(id));
    }

    #[test]
    fn letter_round_trips() {
        round_trip(Letter(b'm'));
    }

    #[test]
    fn short_reads_are_malformed() {
        let mut empty: &[u8] = &[];
        assert!(IdHash::read(&mut empty).is_err());
        let mut short: &[u8] = &[1, 2, 3];
        assert!(FullId::read(&mut short).is_err());
    }
}
