//! Binary event codec (spec §4.C).
//!
//! Events are stored in a compact form rather than JSON. Layout:
//!
//! ```text
//! [ 32 bytes id ]
//! [ 32 bytes pubkey ]
//! [ varint created_at ]
//! [ varint kind ]
//! [ varint tag count ]
//!   [ varint element count ]
//!     [ marker byte ]            (only present for element 1 of an e/p tag)
//!     [ varint element length ]
//!     [ element bytes ]
//!   ...
//! [ varint content length ]
//! [ content bytes ]
//! [ 64 bytes sig ]
//! ```
//!
//! `e` and `p` tags carry a 32-byte hex event/pubkey id as their second
//! element almost always, so that element gets a marker byte: `2` means the
//! element decoded as 32 bytes of hex and is stored raw (reducing 64 ASCII
//! bytes to 32), `1` means it didn't decode as 32-byte hex and is stored
//! verbatim. Every other element — including element 0 of every tag, and
//! elements of non e/p tags — has no marker and is stored as plain bytes.

use crate::codec::{decode_varint, encode_varint};
use crate::error::{Error, Result};
use nostr::Event;
use serde_json::{json, Value};

const SIG_LEN: usize = 64;

fn string_field<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed(format!("event missing string field `{field}`")))
}

fn decode_hex(s: &str, field: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|_| Error::Malformed(format!("event field `{field}` is not hex")))
}

/// Encode a signed event into its on-disk binary form.
pub fn encode(event: &Event) -> Result<Vec<u8>> {
    let value = serde_json::to_value(event)?;

    let id = decode_hex(string_field(&value, "id")?, "id")?;
    let pubkey = decode_hex(string_field(&value, "pubkey")?, "pubkey")?;
    let sig = decode_hex(string_field(&value, "sig")?, "sig")?;
    if id.len() != 32 || pubkey.len() != 32 || sig.len() != SIG_LEN {
        return Err(Error::Malformed(
            "id/pubkey/sig must decode to their fixed widths".to_string(),
        ));
    }

    let created_at = value
        .get("created_at")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Malformed("event missing created_at".to_string()))?;
    let kind = value
        .get("kind")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Malformed("event missing kind".to_string()))?;
    let tags = value
        .get("tags")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Malformed("event missing tags".to_string()))?;
    let content = string_field(&value, "content")?;

    let mut out = Vec::with_capacity(32 + 32 + 4 + 2 + 16 + content.len() + SIG_LEN);
    out.extend_from_slice(&id);
    out.extend_from_slice(&pubkey);
    encode_varint(created_at, &mut out);
    encode_varint(kind, &mut out);
    encode_varint(tags.len() as u64, &mut out);

    for tag in tags {
        let elements = tag
            .as_array()
            .ok_or_else(|| Error::Malformed("tag is not an array".to_string()))?;
        encode_varint(elements.len() as u64, &mut out);
        let is_e_or_p = elements
            .first()
            .and_then(Value::as_str)
            .map(|k| k == "e" || k == "p")
            .unwrap_or(false);

        for (i, element) in elements.iter().enumerate() {
            let s = element
                .as_str()
                .ok_or_else(|| Error::Malformed("tag element is not a string".to_string()))?;
            if i == 1 && is_e_or_p {
                match hex::decode(s) {
                    Ok(bytes) if bytes.len() == 32 => {
                        out.push(2);
                        encode_varint(bytes.len() as u64, &mut out);
                        out.extend_from_slice(&bytes);
                    }
                    _ => {
                        out.push(1);
                        encode_varint(s.len() as u64, &mut out);
                        out.extend_from_slice(s.as_bytes());
                    }
                }
            } else {
                encode_varint(s.len() as u64, &mut out);
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    encode_varint(content.len() as u64, &mut out);
    out.extend_from_slice(content.as_bytes());
    out.extend_from_slice(&sig);
    Ok(out)
}

/// Decode an on-disk event back into its typed, still-signed form.
///
/// This does not re-verify the signature — callers that need that guarantee
/// call `Event::verify` themselves (it was already checked once on ingest).
pub fn decode(mut input: &[u8]) -> Result<Event> {
    let id = take_exact(&mut input, 32)?;
    let pubkey = take_exact(&mut input, 32)?;
    let created_at = decode_varint(&mut input)?;
    let kind = decode_varint(&mut input)?;
    let tag_count = decode_varint(&mut input)?;

    let mut tags = Vec::with_capacity(tag_count as usize);
    for _ in 0..tag_count {
        let element_count = decode_varint(&mut input)?;
        let mut elements = Vec::with_capacity(element_count as usize);
        let mut is_e_or_p = false;
        for i in 0..element_count {
            let marker = if i == 1 && is_e_or_p {
                Some(take_exact(&mut input, 1)?[0])
            } else {
                None
            };
            let len = decode_varint(&mut input)? as usize;
            let raw = take_exact(&mut input, len)?;
            let s = match marker {
                Some(2) => hex::encode(&raw),
                _ => String::from_utf8(raw)
                    .map_err(|_| Error::Malformed("tag element is not valid utf-8".to_string()))?,
            };
            if i == 0 && (s == "e" || s == "p") {
                is_e_or_p = true;
            }
            elements.push(s);
        }
        tags.push(elements);
    }

    let content_len = decode_varint(&mut input)? as usize;
    let content_bytes = take_exact(&mut input, content_len)?;
    let content = String::from_utf8(content_bytes)
        .map_err(|_| Error::Malformed("content is not valid utf-8".to_string()))?;
    let sig = take_exact(&mut input, SIG_LEN)?;

    let value = json!({
        "id": hex::encode(&id),
        "pubkey": hex::encode(&pubkey),
        "created_at": created_at,
        "kind": kind,
        "tags": tags,
        "content": content,
        "sig": hex::encode(&sig),
    });
    Ok(serde_json::from_value(value)?)
}

fn take_exact(input: &mut &[u8], n: usize) -> Result<Vec<u8>> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::{EventBuilder, Keys, Kind, Tag};

    fn sample_event(keys: &Keys) -> Event {
        let e_tag = Tag::parse(["e".to_string(), "00".repeat(32)]).unwrap();
        let p_tag = Tag::parse(["p".to_string(), keys.public_key().to_string()]).unwrap();
        let t_tag = Tag::parse(["t".to_string(), "rust".to_string()]).unwrap();
        EventBuilder::new(Kind::TextNote, "hello nostr", [e_tag, p_tag, t_tag])
            .to_event(keys)
            .unwrap()
    }

    #[test]
    fn round_trips_a_signed_event() {
        let keys = Keys::generate();
        let event = sample_event(&keys);
        let bytes = encode(&event).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.pubkey, event.pubkey);
        assert_eq!(back.created_at, event.created_at);
        assert_eq!(back.kind, event.kind);
        assert_eq!(back.content, event.content);
        assert_eq!(back.tags.len(), event.tags.len());
        assert!(back.verify().is_ok());
    }

    #[test]
    fn e_tag_value_round_trips_through_the_hex_optimization() {
        let keys = Keys::generate();
        let event = sample_event(&keys);
        let bytes = encode(&event).unwrap();
        let back = decode(&bytes).unwrap();
        let original_e = event
            .tags
            .iter()
            .find(|t| t.as_vec()[0] == "e")
            .unwrap()
            .as_vec();
        let back_e = back.tags.iter().find(|t| t.as_vec()[0] == "e").unwrap().as_vec();
        assert_eq!(original_e[1], back_e[1]);
    }

    #[test]
    fn non_hex_e_tag_value_is_preserved_verbatim() {
        let keys = Keys::generate();
        let e_tag = Tag::parse(["e".to_string(), "not-a-hex-id".to_string()]).unwrap();
        let event = EventBuilder::new(Kind::TextNote, "x", [e_tag])
            .to_event(&keys)
            .unwrap();
        let bytes = encode(&event).unwrap();
        let back = decode(&bytes).unwrap();
        let back_e = back.tags.iter().find(|t| t.as_vec()[0] == "e").unwrap().as_vec();
        assert_eq!(back_e[1], "not-a-hex-id");
    }

    #[test]
    fn short_input_is_malformed() {
        assert!(decode(&[0u8; 4]).is_err());
    }
}
