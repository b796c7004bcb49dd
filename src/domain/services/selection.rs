//! Selection Algorithms
//!
//! Pure domain logic for choosing backends under each policy.
//! No locking and no storage here: callers pass the candidate set, the
//! limit, and (where needed) the randomness source and rotation cursor.

use crate::domain::entities::Backend;
use crate::domain::value_objects::PolicyType;
use rand::seq::SliceRandom;
use rand::Rng;

/// Selection algorithms for every supported policy.
///
/// All functions ignore `down` candidates and never return more than
/// `min(limit, active_count)` backends. Candidates are expected in a
/// stable order (see [`Selector::stable_order`]); round-robin and
/// all-active rely on it, weighted and random use it only to make a
/// seeded run reproducible.
pub struct Selector;

impl Selector {
    /// Sort candidates by id, the stable key shared by every policy.
    pub fn stable_order(backends: &mut [Backend]) {
        backends.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Dispatch to the algorithm for `policy`.
    ///
    /// Returns the picked backends and the cursor to store for the next
    /// round-robin call. Non-rotating policies hand back `cursor` as is.
    pub fn select<R>(
        policy: PolicyType,
        candidates: &[Backend],
        limit: usize,
        cursor: usize,
        rng: &mut R,
    ) -> (Vec<Backend>, usize)
    where
        R: Rng + ?Sized,
    {
        match policy {
            PolicyType::RoundRobin => Self::round_robin(candidates, cursor, limit),
            PolicyType::Weighted => (Self::weighted(candidates, limit, rng), cursor),
            PolicyType::Random => (Self::random(candidates, limit, rng), cursor),
            PolicyType::AllActive => (Self::all_active(candidates, limit), cursor),
        }
    }

    /// Consecutive backends starting at `cursor`, wrapping around.
    ///
    /// The cursor is clamped into the current active set before use, so
    /// a set that shrank since the last call never indexes out of range.
    /// The returned cursor is advanced by one position.
    pub fn round_robin(candidates: &[Backend], cursor: usize, limit: usize) -> (Vec<Backend>, usize) {
        let pool: Vec<&Backend> = candidates.iter().filter(|b| b.is_active()).collect();
        if pool.is_empty() {
            return (Vec::new(), 0);
        }

        let n = pool.len();
        let start = cursor % n;
        let picked = (0..limit.min(n))
            .map(|i| pool[(start + i) % n].clone())
            .collect();

        (picked, (start + 1) % n)
    }

    /// Draw distinct backends with probability proportional to weight.
    ///
    /// Each draw partitions the cumulative weight of the remaining
    /// candidates, removes the winner, and renormalizes.
    pub fn weighted<R>(candidates: &[Backend], limit: usize, rng: &mut R) -> Vec<Backend>
    where
        R: Rng + ?Sized,
    {
        let mut pool: Vec<&Backend> = candidates.iter().filter(|b| b.is_active()).collect();
        let count = limit.min(pool.len());
        let mut picked = Vec::with_capacity(count);

        while picked.len() < count {
            // Weight is validated >= 1 on write; max(1) keeps a zero from
            // an external store from breaking the partition.
            let total: u64 = pool.iter().map(|b| u64::from(b.weight.max(1))).sum();
            let mut roll = rng.gen_range(0..total);

            let idx = pool
                .iter()
                .position(|b| {
                    let w = u64::from(b.weight.max(1));
                    if roll < w {
                        true
                    } else {
                        roll -= w;
                        false
                    }
                })
                .unwrap_or(pool.len() - 1);

            picked.push(pool.remove(idx).clone());
        }

        picked
    }

    /// Draw distinct backends uniformly, ignoring weight.
    pub fn random<R>(candidates: &[Backend], limit: usize, rng: &mut R) -> Vec<Backend>
    where
        R: Rng + ?Sized,
    {
        let mut pool: Vec<&Backend> = candidates.iter().filter(|b| b.is_active()).collect();
        let count = limit.min(pool.len());
        let (chosen, _) = pool.partial_shuffle(rng, count);

        chosen.iter().map(|b| (*b).clone()).collect()
    }

    /// The first `limit` active backends in candidate order.
    pub fn all_active(candidates: &[Backend], limit: usize) -> Vec<Backend> {
        candidates
            .iter()
            .filter(|b| b.is_active())
            .take(limit)
            .cloned()
            .collect()
    }
}
