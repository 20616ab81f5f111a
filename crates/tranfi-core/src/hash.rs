//! Stable hashing: blake3 fingerprints for plans, and the small
//! non-cryptographic hashes used per row (DJB2 for `hash`, FNV-1a for sketches).

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// First 16 hex chars; enough to tell plans apart in logs.
    pub fn short(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(16);
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// DJB2 in its xor form: `h = (h * 33) ^ byte`, seeded with 5381.
#[derive(Debug, Clone, Copy)]
pub struct Djb2(u32);

impl Default for Djb2 {
    fn default() -> Self {
        Djb2(5381)
    }
}

impl Djb2 {
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 5).wrapping_add(self.0) ^ u32::from(b);
        }
    }

    pub fn finish(&self) -> u32 {
        self.0
    }
}

/// 64-bit FNV-1a followed by the murmur3 finalizer so low bits are well mixed.
pub fn fnv1a_mix(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_known_values() {
        let mut h = Djb2::default();
        assert_eq!(h.finish(), 5381);
        h.update(b"a");
        assert_eq!(h.finish(), (5381u32 * 33) ^ 97);
    }

    #[test]
    fn fingerprints_are_stable() {
        assert_eq!(hash_str("plan"), hash_str("plan"));
        assert_ne!(hash_str("plan"), hash_str("plan2"));
        assert_eq!(hash_str("x").to_hex().len(), 64);
        assert_eq!(hash_str("x").short().len(), 16);
    }

    #[test]
    fn fnv_is_deterministic() {
        assert_eq!(fnv1a_mix(b"alice"), fnv1a_mix(b"alice"));
        assert_ne!(fnv1a_mix(b"alice"), fnv1a_mix(b"bob"));
    }
}
