use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Exploratory slots reserved out of a digest of `max_size`.
pub fn novelty_slots(max_size: usize, fraction: f64) -> usize {
    ((max_size as f64) * fraction).floor().max(0.0) as usize
}

/// Largest novelty count `n <= wanted` such that `n` stays within
/// `fraction` of a digest holding `primary` other entries plus the `n` picks.
pub fn capped_novelty_count(wanted: usize, primary: usize, fraction: f64) -> usize {
    (0..=wanted)
        .rev()
        .find(|&n| n <= novelty_slots(primary + n, fraction))
        .unwrap_or(0)
}

/// Seeded draw of up to `count` entries from `pool`.
///
/// `pool` must already be in a deterministic order; the same pool and seed
/// always produce the same picks.
pub fn draw<T: Clone>(pool: &[T], count: usize, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(&mut rng);
    shuffled.truncate(count);
    shuffled
}
