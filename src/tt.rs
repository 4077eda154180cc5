//! Transposition cache.
//!
//! A fixed-capacity, hash-indexed, always-replace store. Each slot holds
//! the best previously computed (bound, score, move) for one position key;
//! colliding keys overwrite the slot unconditionally, with no probing chain
//! and no depth preference. Mate scores are stored relative to the position
//! they were computed at and corrected by the ply offset on every read and
//! write, so a remembered mate always measures plies from the probing
//! position rather than from some earlier root.

use std::mem;

use chess::ChessMove;

use crate::error::CacheConfigError;
use crate::search::constants::is_mate_score;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundType {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Clone, Copy, Debug)]
pub struct CacheEntry {
    pub key: u64,
    pub score: i32,
    pub depth: u32,
    pub bound: BoundType,
    pub best_move: Option<ChessMove>,
}

impl CacheEntry {
    const fn empty() -> Self {
        CacheEntry {
            key: 0,
            score: 0,
            depth: 0,
            bound: BoundType::Exact,
            best_move: None,
        }
    }
}

pub struct TranspositionCache {
    entries: Vec<CacheEntry>,
    enabled: bool,
}

impl TranspositionCache {
    /// Build a cache sized to `size_mb` mebibytes of entries.
    ///
    /// Fails fast if the budget yields zero slots, so indexing can never
    /// divide by zero.
    pub fn new(size_mb: usize) -> Result<Self, CacheConfigError> {
        let entry_size = mem::size_of::<CacheEntry>();
        let count = size_mb * 1024 * 1024 / entry_size;
        if count == 0 {
            return Err(CacheConfigError::ZeroCapacity { size_mb });
        }
        Ok(TranspositionCache {
            entries: vec![CacheEntry::empty(); count],
            enabled: true,
        })
    }

    /// Reset every slot to the empty sentinel.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = CacheEntry::empty();
        }
    }

    /// Toggle the cache. A disabled cache misses every lookup and drops
    /// every store; search results must not depend on the difference.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn index(&self, key: u64) -> usize {
        (key % self.entries.len() as u64) as usize
    }

    /// Probe for a score usable at the given depth and window.
    ///
    /// A hit requires the slot key to match and the stored depth to be at
    /// least `depth`. The stored score is converted to root-relative form,
    /// then filtered by bound kind: an exact score always serves, a lower
    /// bound only at or above beta, an upper bound only at or below alpha.
    #[must_use]
    pub fn lookup(
        &self,
        key: u64,
        depth: u32,
        ply_from_root: u32,
        alpha: i32,
        beta: i32,
    ) -> Option<i32> {
        if !self.enabled {
            return None;
        }
        let entry = &self.entries[self.index(key)];
        if entry.key != key || entry.depth < depth {
            return None;
        }
        let corrected = Self::correct_for_retrieval(entry.score, ply_from_root);
        match entry.bound {
            BoundType::Exact => Some(corrected),
            BoundType::UpperBound if corrected <= alpha => Some(corrected),
            BoundType::LowerBound if corrected >= beta => Some(corrected),
            _ => None,
        }
    }

    /// The remembered best move for `key`, if the slot still belongs to it.
    #[must_use]
    pub fn stored_move(&self, key: u64) -> Option<ChessMove> {
        let entry = &self.entries[self.index(key)];
        if entry.key == key {
            entry.best_move
        } else {
            None
        }
    }

    /// Overwrite the slot for `key` unconditionally. A shallower later
    /// store evicts a deeper one; that is the intended replacement scheme.
    pub fn store(
        &mut self,
        key: u64,
        depth: u32,
        ply_from_root: u32,
        score: i32,
        bound: BoundType,
        best_move: Option<ChessMove>,
    ) {
        if !self.enabled {
            return;
        }
        let index = self.index(key);
        self.entries[index] = CacheEntry {
            key,
            score: Self::correct_for_storage(score, ply_from_root),
            depth,
            bound,
            best_move,
        };
    }

    /// Convert a root-relative mate score to storage form by pushing its
    /// magnitude out by the distance from the root.
    #[must_use]
    pub fn correct_for_storage(score: i32, ply_from_root: u32) -> i32 {
        if is_mate_score(score) {
            let sign = score.signum();
            (score.abs() + ply_from_root as i32) * sign
        } else {
            score
        }
    }

    /// Inverse of [`Self::correct_for_storage`].
    #[must_use]
    pub fn correct_for_retrieval(score: i32, ply_from_root: u32) -> i32 {
        if is_mate_score(score) {
            let sign = score.signum();
            (score.abs() - ply_from_root as i32) * sign
        } else {
            score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::constants::MATE_SCORE;
    use proptest::prelude::*;

    fn small_cache() -> TranspositionCache {
        TranspositionCache::new(1).expect("1 MiB cache")
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        assert!(matches!(
            TranspositionCache::new(0),
            Err(CacheConfigError::ZeroCapacity { size_mb: 0 })
        ));
    }

    #[test]
    fn test_store_and_lookup_exact() {
        let mut cache = small_cache();
        cache.store(42, 5, 0, 123, BoundType::Exact, None);
        assert_eq!(cache.lookup(42, 5, 0, -1000, 1000), Some(123));
        // Deeper requests miss a shallower entry.
        assert_eq!(cache.lookup(42, 6, 0, -1000, 1000), None);
        // A different key mapping to the same slot misses.
        let other = 42 + cache.entry_count() as u64;
        assert_eq!(cache.lookup(other, 5, 0, -1000, 1000), None);
    }

    #[test]
    fn test_bound_filtering() {
        let mut cache = small_cache();
        cache.store(7, 4, 0, 200, BoundType::LowerBound, None);
        // Lower bound only serves when it proves a beta cutoff.
        assert_eq!(cache.lookup(7, 4, 0, -50, 100), Some(200));
        assert_eq!(cache.lookup(7, 4, 0, -50, 300), None);

        cache.store(7, 4, 0, -200, BoundType::UpperBound, None);
        assert_eq!(cache.lookup(7, 4, 0, -100, 100), Some(-200));
        assert_eq!(cache.lookup(7, 4, 0, -300, 100), None);
    }

    #[test]
    fn test_always_replace_evicts_deeper_entry() {
        let mut cache = small_cache();
        cache.store(9, 10, 0, 500, BoundType::Exact, None);
        cache.store(9, 2, 0, -40, BoundType::Exact, None);
        assert_eq!(cache.lookup(9, 10, 0, -1000, 1000), None);
        assert_eq!(cache.lookup(9, 2, 0, -1000, 1000), Some(-40));
    }

    #[test]
    fn test_clear_resets_slots() {
        let mut cache = small_cache();
        let pos = crate::position::Position::startpos();
        let mv = pos.parse_move("e2e4").unwrap();
        cache.store(11, 3, 0, 77, BoundType::Exact, Some(mv));
        cache.clear();
        assert_eq!(cache.lookup(11, 1, 0, -1000, 1000), None);
        assert_eq!(cache.stored_move(11), None);
    }

    #[test]
    fn test_disabled_cache_misses_everything() {
        let mut cache = small_cache();
        cache.set_enabled(false);
        cache.store(5, 3, 0, 90, BoundType::Exact, None);
        assert_eq!(cache.lookup(5, 1, 0, -1000, 1000), None);
        cache.set_enabled(true);
        assert_eq!(cache.lookup(5, 1, 0, -1000, 1000), None);
    }

    #[test]
    fn test_mate_score_measured_from_probing_position() {
        let mut cache = small_cache();
        // Mate in 5 plies seen at ply 2: stored absolute, re-read at ply 4.
        let root_relative = MATE_SCORE - 5;
        cache.store(13, 6, 2, root_relative, BoundType::Exact, None);
        let reread = cache.lookup(13, 6, 4, -MATE_SCORE, MATE_SCORE);
        assert_eq!(reread, Some(MATE_SCORE - 7));
    }

    proptest! {
        /// Storage then retrieval at the same ply is the identity.
        #[test]
        fn mate_correction_round_trips(
            plies_to_mate in 0i32..900,
            ply_from_root in 0u32..256,
            negative in proptest::bool::ANY,
        ) {
            let magnitude = MATE_SCORE - plies_to_mate;
            let score = if negative { -magnitude } else { magnitude };
            let stored = TranspositionCache::correct_for_storage(score, ply_from_root);
            prop_assert_eq!(
                TranspositionCache::correct_for_retrieval(stored, ply_from_root),
                score
            );
        }

        /// Non-mate scores pass through both conversions untouched.
        #[test]
        fn plain_scores_are_not_corrected(score in -20_000i32..20_000, ply in 0u32..256) {
            prop_assert_eq!(TranspositionCache::correct_for_storage(score, ply), score);
            prop_assert_eq!(TranspositionCache::correct_for_retrieval(score, ply), score);
        }
    }
}
