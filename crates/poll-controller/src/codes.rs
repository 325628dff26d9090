//! Session code allocation.
//!
//! Generates short human-enterable join codes from a fixed alphabet and
//! guarantees uniqueness against the record store. Retries on collision are
//! bounded; saturation of the code space surfaces as an explicit
//! [`PcError::CodeSpaceExhausted`] instead of spinning forever.

use crate::errors::PcError;
use common::store::RecordStore;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed code alphabet: uppercase letters and digits, minus the
/// easily-confused I/O/0/1.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Allocates unique session codes against the record store.
pub struct CodeAllocator {
    store: Arc<dyn RecordStore>,
    length: usize,
    max_attempts: u32,
}

impl CodeAllocator {
    /// Create an allocator producing codes of `length` characters, giving up
    /// after `max_attempts` collisions.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, length: usize, max_attempts: u32) -> Self {
        Self {
            store,
            length,
            max_attempts,
        }
    }

    /// Generate one candidate code.
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET.get(idx).copied().unwrap_or(b'A'))
            })
            .collect()
    }

    /// Allocate a code not yet present in the record store.
    ///
    /// Each attempt generates a candidate and checks it against the store;
    /// after `max_attempts` collisions the allocator reports exhaustion.
    pub async fn allocate(&self) -> Result<String, PcError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generate();
            if self.store.find_session_by_code(&candidate).await?.is_none() {
                debug!(
                    target: "pc.codes",
                    attempt,
                    "Allocated session code"
                );
                return Ok(candidate);
            }
            debug!(
                target: "pc.codes",
                attempt,
                "Session code collision, retrying"
            );
        }

        warn!(
            target: "pc.codes",
            attempts = self.max_attempts,
            code_length = self.length,
            "Session code space exhausted"
        );
        Err(PcError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::entities::Session;
    use common::memory::MemoryStore;
    use common::types::UserId;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_codes_use_fixed_alphabet_and_length() {
        let store = Arc::new(MemoryStore::new());
        let allocator = CodeAllocator::new(store, 6, 32);

        let code = allocator.allocate().await.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn test_ten_thousand_allocations_are_unique() {
        // Against an empty store, sequential allocate + persist must never
        // hand out the same code twice.
        let store = Arc::new(MemoryStore::new());
        let allocator = CodeAllocator::new(Arc::clone(&store) as Arc<dyn RecordStore>, 6, 64);

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let code = allocator.allocate().await.unwrap();
            assert!(seen.insert(code.clone()), "duplicate code {code}");
            store
                .create_session(Session::new(UserId::new(), code, "t".to_string()))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_exhaustion_of_bounded_universe() {
        // Length-1 codes give a universe of exactly CODE_ALPHABET.len()
        // values. Fill it completely, then expect explicit exhaustion.
        let store = Arc::new(MemoryStore::new());
        let allocator = CodeAllocator::new(Arc::clone(&store) as Arc<dyn RecordStore>, 1, 256);

        for b in CODE_ALPHABET {
            store
                .create_session(Session::new(
                    UserId::new(),
                    char::from(*b).to_string(),
                    "t".to_string(),
                ))
                .await
                .unwrap();
        }

        let result = allocator.allocate().await;
        assert!(matches!(
            result,
            Err(PcError::CodeSpaceExhausted { attempts: 256 })
        ));
    }

    #[tokio::test]
    async fn test_retries_past_collisions() {
        // Saturate all but one slot of the length-1 universe; the allocator
        // must eventually find the free one.
        let store = Arc::new(MemoryStore::new());
        let allocator = CodeAllocator::new(Arc::clone(&store) as Arc<dyn RecordStore>, 1, 4096);

        let (free, taken) = CODE_ALPHABET.split_first().unwrap();
        for b in taken {
            store
                .create_session(Session::new(
                    UserId::new(),
                    char::from(*b).to_string(),
                    "t".to_string(),
                ))
                .await
                .unwrap();
        }

        let code = allocator.allocate().await.unwrap();
        assert_eq!(code, char::from(*free).to_string());
    }
}
