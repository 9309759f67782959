//! Opaque Base32 identifiers shared by every entity, token and ticket.
//!
//! IDs are 128 bits of randomness encoded as lowercase RFC 4648 Base32
//! (no padding), 26 characters, alphabet `[a-z2-7]`. Content ids (`cid`)
//! are the Base32 encoding of a SHA-256 digest instead of random bits.

use data_encoding::{BASE32_NOPAD, HEXLOWER};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh random 128-bit id, Base32-encoded and lowercased.
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes).to_lowercase()
}

/// Content identifier for a blob: Base32(SHA-256(bytes)), lowercased.
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    BASE32_NOPAD.encode(&digest).to_lowercase()
}

/// `(cid, sha256_hex)` for a blob, hashing the bytes once.
pub fn content_id_and_digest(bytes: &[u8]) -> (String, String) {
    let digest = Sha256::digest(bytes);
    (BASE32_NOPAD.encode(&digest).to_lowercase(), HEXLOWER.encode(&digest))
}

/// Whether a string matches the opaque id charset `[a-z2-7]+`.
///
/// Used to disambiguate a `room_id` from a free-form `room_name` on input:
/// a name containing uppercase letters, digits outside `2-7`, or punctuation
/// can never collide with a generated id.
pub fn looks_like_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'a'..=b'z' | b'2'..=b'7'))
}
