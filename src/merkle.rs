//! Deterministic Merkle root over a bundle's (path, hash) pairs
//!
//! The root binds the full file set: both client and server compute it
//! over the same pairs, so agreement proves set equality. Leaves are
//! `SHA256("<path>:<hash>")`, sorted by path; levels pair adjacent nodes,
//! duplicating the last node when a level has odd length.

use crate::hash::EMPTY_SHA256;
use sha2::{Digest, Sha256};

/// Compute the Merkle root for a set of `(bundle_path, content_hash)`
/// pairs. The result depends only on the multiset of pairs, not on input
/// order.
///
/// Edge cases: an empty set yields the SHA-256 of the empty string; a
/// single leaf yields that leaf's hex digest unchanged.
pub fn compute_merkle_root<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = files.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut level: Vec<[u8; 32]> = pairs
        .iter()
        .map(|(path, hash)| {
            let leaf_input = format!("{}:{}", path, hash);
            Sha256::digest(leaf_input.as_bytes()).into()
        })
        .collect();

    if level.is_empty() {
        return EMPTY_SHA256.to_string();
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().expect("level is non-empty");
            level.push(last);
        }

        level = level
            .chunks(2)
            .map(|pair| {
                let mut hasher = Sha256::new();
                hasher.update(pair[0]);
                hasher.update(pair[1]);
                hasher.finalize().into()
            })
            .collect();
    }

    hex::encode(level[0])
}
