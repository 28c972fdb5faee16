//! Primitive field codecs (spec §4.A).
//!
//! Every fixed-layout key field in `crate::keys` is one of these types. Each
//! implements the same small capability set — `write` appends its bytes to a
//! buffer, `read` consumes exactly its width off the front of a slice — so
//! the key assembler (`crate::keys`) can compose them positionally without
//! any dynamic dispatch on the hot path.

mod primitives;
mod varint;

pub use primitives::{
    FullId, FulltextWord, IdHash, IdentHash, KindField, Letter, PubHash, Serial, TimestampField,
};
pub use varint::{decode_varint, encode_varint};

use crate::error::{Error, Result};

/// A value type that can be written to and read from a byte buffer in a
/// fixed or self-delimiting form.
pub trait FieldCodec: Sized {
    /// Append this value's encoding to `out`.
    fn write(&self, out: &mut Vec<u8>);

    /// Consume this value's encoding from the front of `input`, advancing it
    /// past the bytes read. Fails with `Error::Malformed` on a short read.
    fn read(input: &mut &[u8]) -> Result<Self>;
}

/// Pulls an exact-size array of `N` bytes off the front of `input`.
pub(crate) fn take_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N]> {
    if input.len() < N {
        return Err(Error::Malformed(format!(
            "expected {N} bytes, got {}",
            input.len()
        )));
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&input[..N]);
    *input = &input[N..];
    Ok(buf)
}

/// Pulls `n` bytes off the front of `input` as an owned `Vec`.
pub(crate) fn take_vec(input: &mut &[u8], n: usize) -> Result<Vec<u8>> {
    if input.len() < n {
        return Err(Error::Malformed(format!(
            "expected {n} bytes, got {}",
            input.len()
        )));
    }
    let v = input[..n].to_vec();
    *input = &input[n..];
    Ok(v)
}

/// SHA-256 truncated to the leading 8 bytes, used for id/pubkey/identifier
/// hash fields (spec §3, "Truncated identity fields").
pub(crate) fn truncated_hash(data: &[u8]) -> [u8; 8] {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(data);
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_hash_is_deterministic() {
        let a = truncated_hash(b"hello world");
        let b = truncated_hash(b"hello world");
        assert_eq!(a, b);
        let c = truncated_hash(b"hello world!");
        assert_ne!(a, c);
    }
}
