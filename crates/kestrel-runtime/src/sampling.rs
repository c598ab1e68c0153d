//! Token Sampling
//!
//! Nucleus (top-p) sampling over a probability distribution: the next token
//! is drawn from the smallest set of candidates whose probabilities sum to
//! at least `top_p`, so the low-probability tail never contributes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws tokens from a probability distribution with a private RNG stream.
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Create a sampler seeded from the operating system.
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// Create a sampler with a fixed seed for reproducible draws.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Nucleus sampling over `probs`, which must already be a softmaxed
    /// distribution. Returns the index of the chosen token.
    ///
    /// Candidates below `(1 - top_p) / (len - 1)` cannot appear in any
    /// nucleus of mass `top_p` and are dropped before sorting. At least
    /// one candidate must survive the cutoff; a near-uniform distribution
    /// with a small `top_p` violates that and aborts.
    pub fn sample_top_p(&mut self, probs: &[f32], top_p: f32) -> usize {
        assert!(
            probs.len() > 2,
            "top-p needs at least 3 candidates, got {}",
            probs.len()
        );
        assert!(
            top_p > 0.0 && top_p <= 1.0,
            "top_p must lie in (0, 1], got {top_p}"
        );
        assert!(
            probs.iter().all(|p| p.is_finite()),
            "non-finite probability passed to sampler"
        );

        let cutoff = (1.0 - top_p) / (probs.len() - 1) as f32;
        let mut sorted: Vec<(f32, usize)> = probs
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p >= cutoff)
            .map(|(i, &p)| (p, i))
            .collect();
        assert!(
            !sorted.is_empty(),
            "empty nucleus: every probability fell below the cutoff {cutoff}"
        );
        sorted.sort_by(|a, b| b.0.total_cmp(&a.0));

        // Truncate to the smallest prefix whose mass reaches top_p.
        let mut total = 0.0;
        let mut last = sorted.len() - 1;
        for (rank, &(p, _)) in sorted.iter().enumerate() {
            total += p;
            if total >= top_p {
                last = rank;
                break;
            }
        }

        let r = self.rng.random::<f32>() * total;
        let mut cdf = 0.0;
        for &(p, index) in &sorted[..=last] {
            cdf += p;
            if r < cdf {
                return index;
            }
        }
        // Rounding can leave r marginally past the accumulated mass.
        sorted[last].1
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
