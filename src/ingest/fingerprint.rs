// src/ingest/fingerprint.rs
//! Exact-duplicate gate. Runs before any paid external call.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::ingest::types::FeedItem;
use crate::store::NewsStore;

/// SHA-256 hex over `title|link`. Order matters.
pub fn content_fingerprint(title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(link.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashVerdict {
    /// A record with this fingerprint is already stored.
    Duplicate { existing_id: String },
    /// Not seen before; carry the fingerprint on to persistence.
    Fresh { fingerprint: String },
}

/// Look the item's fingerprint up in the store.
pub async fn check_item(store: &dyn NewsStore, item: &FeedItem) -> Result<HashVerdict> {
    let fingerprint = content_fingerprint(&item.title, &item.link);
    match store.find_by_fingerprint(&fingerprint).await? {
        Some(existing_id) => Ok(HashVerdict::Duplicate { existing_id }),
        None => Ok(HashVerdict::Fresh { fingerprint }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex_sha256() {
        let fp = content_fingerprint("Hello", "https://example.com/a");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, content_fingerprint("Hello", "https://example.com/a"));
    }

    #[test]
    fn fingerprint_matches_known_digest() {
        // sha256("Hello|https://example.com/a")
        assert_eq!(
            content_fingerprint("Hello", "https://example.com/a"),
            "1a75d2a80f4d866779248b44f7fb0ddc8bd4cee1615f27d03d36e55234b21c52"
        );
        assert_eq!(
            content_fingerprint(" Hello ", "https://example.com/a\n"),
            content_fingerprint("Hello", "https://example.com/a")
        );
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        assert_ne!(content_fingerprint("a", "b"), content_fingerprint("b", "a"));
        assert_ne!(
            content_fingerprint("Title", "https://x.com/1"),
            content_fingerprint("Title", "https://x.com/2")
        );
    }
}
