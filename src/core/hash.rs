//! Hashing Primitives
//!
//! Two families live here:
//! - FNV-1a 32-bit, used to turn seed strings into generator state and to
//!   classify crash causes. Cheap and stable across implementations.
//! - SHA-256 snapshot digests, used to fingerprint settled rounds so a
//!   rewatch or a shared record can be checked against the settlement.

use sha2::{Digest, Sha256};

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Digest output type (256 bits / 32 bytes)
pub type SnapshotDigest = [u8; 32];

/// FNV-1a over raw bytes.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a over a seed string.
///
/// Seed strings are ASCII (hex digits, difficulty names, separators), so
/// hashing the UTF-8 bytes matches hashing UTF-16 code units.
#[inline]
pub fn hash_string32(value: &str) -> u32 {
    fnv1a_32(value.as_bytes())
}

/// Deterministic SHA-256 hasher with typed update helpers.
///
/// Order of updates is part of the digest; callers must keep it fixed.
pub struct DigestHasher {
    hasher: Sha256,
}

impl DigestHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for round snapshots.
    pub fn for_snapshot() -> Self {
        Self::new(b"CHICKEN_CROSSING_SNAPSHOT_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> SnapshotDigest {
        self.hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        // Published FNV-1a 32-bit test vectors.
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_hash_string_matches_bytes() {
        assert_eq!(hash_string32("foobar"), fnv1a_32(b"foobar"));
        assert_eq!(hash_string32("chicken-crossing:1:Easy"), 2_061_157_302);
    }

    #[test]
    fn test_digest_hasher_determinism() {
        let make_digest = || {
            let mut hasher = DigestHasher::for_snapshot();
            hasher.update_u32(7);
            hasher.update_u64(12_345);
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_digest(), make_digest());
    }

    #[test]
    fn test_digest_order_matters() {
        let digest1 = {
            let mut h = DigestHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let digest2 = {
            let mut h = DigestHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(digest1, digest2);
    }

    #[test]
    fn test_domain_separation() {
        let digest_a = {
            let mut h = DigestHasher::new(b"DOMAIN_A");
            h.update_bytes(&[1, 2, 3, 4]);
            h.finalize()
        };
        let digest_b = {
            let mut h = DigestHasher::new(b"DOMAIN_B");
            h.update_bytes(&[1, 2, 3, 4]);
            h.finalize()
        };

        assert_ne!(digest_a, digest_b);
    }
}
