//! In-place Fisher-Yates shuffle with an injectable random source.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Process-wide generator used when the caller does not supply one.
/// Seeded from the OS on first use.
static DEFAULT_RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_os_rng()));

/// Shuffle `items` in place using `rng`.
///
/// Walks `i` from `len - 1` down to `1`, draws `r` uniformly from `0..=i` and
/// swaps positions `i` and `r`. Slices of length 0 or 1 are left untouched
/// and consume no randomness.
pub fn shuffle_with<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let r = rng.random_range(0..i + 1);
        items.swap(i, r);
    }
}

/// Shuffle `items` in place using the process-wide default generator.
pub fn shuffle<T>(items: &mut [T]) {
    with_default_rng(|rng| shuffle_with(items, rng));
}

/// Run `f` with exclusive access to the default generator.
pub fn with_default_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    let mut rng = DEFAULT_RNG.lock();
    f(&mut rng)
}

/// Reseed the default generator, making later [`shuffle`] calls reproducible.
pub fn seed_default_rng(seed: u64) {
    *DEFAULT_RNG.lock() = StdRng::seed_from_u64(seed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::RngCore;

    /// Generator that always yields zero bits, so every draw picks index 0.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
    }

    /// Generator stuck at the midpoint of its range, so a draw from `0..=i`
    /// lands on `(i + 1) / 2`.
    struct MidpointRng;

    impl RngCore for MidpointRng {
        fn next_u32(&mut self) -> u32 {
            1 << 31
        }
        fn next_u64(&mut self) -> u64 {
            1 << 63
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0x80);
        }
    }

    /// Counts draws so tests can check how much randomness was consumed.
    struct CountingRng {
        inner: StdRng,
        draws: usize,
    }

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.draws += 1;
            self.inner.next_u32()
        }
        fn next_u64(&mut self) -> u64 {
            self.draws += 1;
            self.inner.next_u64()
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.draws += 1;
            self.inner.fill_bytes(dest)
        }
    }

    #[test]
    fn empty_and_single_are_unchanged() {
        let mut rng = CountingRng {
            inner: StdRng::seed_from_u64(1),
            draws: 0,
        };
        let mut empty: Vec<u8> = Vec::new();
        shuffle_with(&mut empty, &mut rng);
        assert!(empty.is_empty());

        let mut single = vec!['x'];
        shuffle_with(&mut single, &mut rng);
        assert_eq!(single, vec!['x']);
        assert_eq!(rng.draws, 0);
    }

    #[test]
    fn zero_generator_gives_known_permutation() {
        // i=3 swaps (3,0), i=2 swaps (2,0), i=1 swaps (1,0)
        let mut items = [0, 1, 2, 3];
        shuffle_with(&mut items, &mut ZeroRng);
        assert_eq!(items, [1, 2, 3, 0]);
    }

    #[test]
    fn scripted_draws_give_fixed_permutation() {
        // r = 4, 3, 3, 2, 2, 1, 1 for i = 7 down to 1
        let mut items: Vec<char> = "abcdefgh".chars().collect();
        shuffle_with(&mut items, &mut MidpointRng);
        assert_eq!(items.into_iter().collect::<String>(), "afbhcgde");
    }

    #[test]
    fn same_seed_same_order() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle_with(&mut a, &mut StdRng::seed_from_u64(42));
        shuffle_with(&mut b, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_ne!(a, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn matches_manual_replay_of_draws() {
        let mut items: Vec<char> = "abcdefgh".chars().collect();
        shuffle_with(&mut items, &mut StdRng::seed_from_u64(7));

        let mut expected: Vec<char> = "abcdefgh".chars().collect();
        let mut replay = StdRng::seed_from_u64(7);
        for i in (1..expected.len()).rev() {
            let r = replay.random_range(0..=i);
            expected.swap(i, r);
        }
        assert_eq!(items, expected);
    }

    #[test]
    fn reseeded_default_generator_is_reproducible() {
        let mut a: Vec<u16> = (0..20).collect();
        let mut b = a.clone();
        seed_default_rng(99);
        shuffle(&mut a);
        seed_default_rng(99);
        shuffle(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn all_orderings_of_three_occur() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..600 {
            let mut items = [1, 2, 3];
            shuffle_with(&mut items, &mut rng);
            seen.insert(items);
        }
        assert_eq!(seen.len(), 6);
    }

    proptest! {
        #[test]
        fn shuffle_preserves_multiset(
            original in prop::collection::vec(0u8..10, 0..64),
            seed in any::<u64>(),
        ) {
            let mut items = original.clone();
            let mut before = original;
            shuffle_with(&mut items, &mut StdRng::seed_from_u64(seed));
            let mut after = items.clone();
            before.sort_unstable();
            after.sort_unstable();
            prop_assert_eq!(before, after);
        }
    }
}
