//! Word-packed atomic bitset.
//!
//! Dense alternative to `Vec<AtomicBool>` for the partitioner's
//! incoming-edge sets: concurrent `set` during the inspection loop, plain
//! reads and unions afterwards.

use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = u64::BITS as usize;

#[inline]
fn word_mask(bit: usize) -> (usize, u64) {
    (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
}

/// A fixed-width bitset whose `set` is safe to call from parallel loops.
#[derive(Debug, Default)]
pub struct DynamicBitset {
    bits: usize,
    words: Vec<AtomicU64>,
}

impl DynamicBitset {
    /// Create a bitset with `bits` bits, all cleared.
    pub fn new(bits: usize) -> Self {
        let words = (0..bits.div_ceil(WORD_BITS)).map(|_| AtomicU64::new(0)).collect();
        Self { bits, words }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Set `bit`. Callable concurrently.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn set(&self, bit: usize) {
        assert!(bit < self.bits);
        let (w, m) = word_mask(bit);
        self.words[w].fetch_or(m, Ordering::Relaxed);
    }

    /// Whether `bit` is set.
    ///
    /// # Panics
    /// Panics if `bit >= len()`.
    #[inline]
    pub fn test(&self, bit: usize) -> bool {
        assert!(bit < self.bits);
        let (w, m) = word_mask(bit);
        self.words[w].load(Ordering::Relaxed) & m != 0
    }

    /// OR every bit of `other` into `self`. Both sets must be equally wide.
    pub fn union_with(&mut self, other: &DynamicBitset) {
        assert_eq!(self.bits, other.bits);
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w.get_mut() |= o.load(Ordering::Relaxed);
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Snapshot of the backing words, for the wire encoder.
    pub fn to_words(&self) -> Vec<u64> {
        self.words.iter().map(|w| w.load(Ordering::Relaxed)).collect()
    }

    /// Rebuild from a wire snapshot produced by [`Self::to_words`].
    pub fn from_words(bits: usize, words: Vec<u64>) -> Self {
        assert_eq!(words.len(), bits.div_ceil(WORD_BITS));
        Self {
            bits,
            words: words.into_iter().map(AtomicU64::new).collect(),
        }
    }

    /// Iterate the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bits).filter(move |&b| self.test(b))
    }
}
