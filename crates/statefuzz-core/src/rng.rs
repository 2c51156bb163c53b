//! Deterministic PRNG driving sequence generation and mutation.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, excellent
//! statistical properties, and trivially serializable. Every random choice
//! the fuzzer makes flows through this type, so a session is fully
//! reproducible from its seed.

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms — critical for replaying a fuzz session
/// from a reported seed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FuzzRng {
    state: u64,
}

impl FuzzRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in the inclusive range `[min, max]`.
    ///
    /// The span is computed in 128 bits so the full `i64` range is safe.
    pub fn range_i64(&mut self, min: i64, max: i64) -> i64 {
        debug_assert!(min <= max, "empty range [{min}, {max}]");
        let span = (max as i128 - min as i128 + 1) as u128;
        let r = (self.next_u64() as u128) % span;
        (min as i128 + r as i128) as i64
    }

    /// Uniform index in `[0, len)`. `len` must be nonzero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() on empty range");
        (self.next_u64() % len as u64) as usize
    }

    /// Derive an independent RNG for a worker thread.
    ///
    /// Mixes the worker number through one SplitMix64 round so derived
    /// streams do not overlap with the parent stream for nearby seeds.
    pub fn derive(&self, worker: u64) -> FuzzRng {
        let mut child = FuzzRng::new(self.state ^ worker.wrapping_mul(0xA076_1D64_78BD_642F));
        child.next_u64();
        child
    }

    /// Get the internal state (for diagnostics/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
