//! Case-insensitive name hashing.
//!
//! Events, variables, timestamps and blackboard entries are identified by the 32-bit hash of
//! their lowercased name. Equality is by hash only: two names that collide are indistinguishable.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NameHash(pub u32);

impl NameHash {
    /// FNV-1a over the ASCII-lowercased bytes of `name`.
    pub const fn of(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i].to_ascii_lowercase() as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<&str> for NameHash {
    fn from(name: &str) -> Self {
        Self::of(name)
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::NameHash;

    #[test]
    fn hashing_ignores_ascii_case() {
        assert_eq!(NameHash::of("OnEnemySeen"), NameHash::of("onenemyseen"));
        assert_ne!(NameHash::of("OnEnemySeen"), NameHash::of("OnEnemyLost"));
    }

    #[test]
    fn hash_is_const_evaluable() {
        const SEEN: NameHash = NameHash::of("seen");
        assert_eq!(SEEN, NameHash::from("SEEN"));
    }
}
