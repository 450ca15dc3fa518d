//! Chained session digest.
//!
//! Each chunk's digest is folded into the previous running digest by
//! hashing the concatenation of their *hex string* forms. Client and
//! server can both reconstruct the expected final digest from per-chunk
//! hashes alone, without re-hashing the full byte stream.

use chunkflow_protocol::HashFunction;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Computes the digest of `bytes` with the session's hash function,
/// hex-encoded.
pub fn digest_bytes(function: HashFunction, bytes: &[u8]) -> String {
    match function {
        HashFunction::Md5 => hex::encode(Md5::digest(bytes)),
        HashFunction::Sha1 => hex::encode(Sha1::digest(bytes)),
        HashFunction::Sha256 => hex::encode(Sha256::digest(bytes)),
        HashFunction::Sha512 => hex::encode(Sha512::digest(bytes)),
    }
}

/// Folds a verified chunk digest into the running session digest.
///
/// First chunk: the chunk digest itself. Later chunks:
/// `H(running_hex || chunk_hex)` over the concatenated textual digests.
pub fn chain(function: HashFunction, running: Option<&str>, chunk_digest: &str) -> String {
    match running {
        None => chunk_digest.to_owned(),
        Some(previous) => {
            let mut concat = Vec::with_capacity(previous.len() + chunk_digest.len());
            concat.extend_from_slice(previous.as_bytes());
            concat.extend_from_slice(chunk_digest.as_bytes());
            digest_bytes(function, &concat)
        }
    }
}

/// Reconstructs the expected final digest from a sequence of chunk
/// digests. This is what a client computes on its side to declare the
/// final hash.
pub fn chain_all<'a>(
    function: HashFunction,
    chunk_digests: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let mut running: Option<String> = None;
    for digest in chunk_digests {
        running = Some(chain(function, running.as_deref(), digest));
    }
    running
}
