//! Seeded random stream (PCG32, XSH-RR variant)
//!
//! A stream can only be built from a seed, so an unseeded draw cannot be
//! expressed. Derived draws (normal, beta, dirichlet, ...) are deterministic
//! transforms of [`RandomStream::next_uniform`]; their draw counts are part of
//! the contract because every implementation must consume the stream in the
//! same order.

use crate::constants::{ENV_RNG_STREAM, N_COMMODITIES};

const MULTIPLIER: u64 = 6364136223846793005;
const UNIFORM_SCALE: f32 = 1.0 / 16_777_216.0;
const MIN_UNIFORM: f32 = 1.0e-8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomStream {
    state: u64,
    inc: u64,
    draws: u64,
}

impl RandomStream {
    /// Stream used by environment instances
    pub fn new(seed: u64) -> Self {
        Self::with_stream(seed, ENV_RNG_STREAM)
    }

    pub fn with_stream(seed: u64, stream: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (stream << 1) | 1,
            draws: 0,
        };
        rng.advance();
        rng.state = rng.state.wrapping_add(seed);
        rng.advance();
        rng.draws = 0;
        rng
    }

    /// Number of 32-bit draws taken since seeding
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    fn advance(&mut self) -> u32 {
        let old = self.state;
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        self.state = old.wrapping_mul(MULTIPLIER).wrapping_add(self.inc);
        xorshifted.rotate_right(rot)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.advance()
    }

    /// Uniform in `[0, 1)` with 24 bits of precision
    pub fn next_uniform(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * UNIFORM_SCALE
    }

    /// Integer in `[0, bound)`; `0` when `bound` is zero (still consumes a draw)
    pub fn next_int(&mut self, bound: u32) -> u32 {
        let raw = self.next_u32();
        if bound == 0 { 0 } else { raw % bound }
    }

    /// Integer in `[low, high)`; returns `low` without drawing when empty
    pub fn range(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low + self.next_u32() % (high - low)
    }

    pub fn uniform(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_uniform()
    }

    /// Unit-rate exponential
    pub fn exp_unit(&mut self) -> f32 {
        -self.next_uniform().max(MIN_UNIFORM).ln()
    }

    /// Box-Muller, cosine branch; always two draws
    pub fn normal(&mut self, mean: f32, sigma: f32) -> f32 {
        let u1 = self.next_uniform().max(MIN_UNIFORM);
        let u2 = self.next_uniform();
        let mag = (-2.0 * u1.ln()).sqrt();
        let z0 = mag * (2.0 * std::f32::consts::PI * u2).cos();
        mean + sigma * z0
    }

    pub fn lognormal(&mut self, mean: f32, sigma: f32) -> f32 {
        self.normal(mean, sigma).exp()
    }

    /// Beta(3, 2) as a ratio of summed exponentials; five draws
    pub fn beta_3_2(&mut self) -> f32 {
        let a: f32 = (0..3).map(|_| self.exp_unit()).sum();
        let b: f32 = (0..2).map(|_| self.exp_unit()).sum();
        let total = a + b;
        if total <= 0.0 { 0.5 } else { a / total }
    }

    /// Flat Dirichlet over the commodities; six draws
    pub fn dirichlet_ones(&mut self) -> [f32; N_COMMODITIES] {
        let mut out = [0.0; N_COMMODITIES];
        for slot in out.iter_mut() {
            *slot = self.exp_unit();
        }
        let sum: f32 = out.iter().sum();
        if sum <= 0.0 {
            return [1.0 / N_COMMODITIES as f32; N_COMMODITIES];
        }
        for slot in out.iter_mut() {
            *slot /= sum;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomStream::new(42);
        let mut b = RandomStream::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        let mut c = RandomStream::new(43);
        let first: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let other: Vec<u32> = (0..8).map(|_| c.next_u32()).collect();
        assert_ne!(first, other);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut env = RandomStream::with_stream(7, 54);
        let mut policy = RandomStream::with_stream(7, 55);
        let a: Vec<u32> = (0..8).map(|_| env.next_u32()).collect();
        let b: Vec<u32> = (0..8).map(|_| policy.next_u32()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_uniform_in_unit_interval() {
        let mut rng = RandomStream::new(0);
        for _ in 0..10_000 {
            let u = rng.next_uniform();
            assert!((0.0..1.0).contains(&u));
        }
        assert_eq!(rng.draw_count(), 10_000);
    }

    #[test]
    fn test_max_raw_draw_stays_below_one() {
        assert!(((u32::MAX >> 8) as f32 * UNIFORM_SCALE) < 1.0);
    }

    #[test]
    fn test_ranges() {
        let mut rng = RandomStream::new(9);
        for _ in 0..1000 {
            let v = rng.range(8, 33);
            assert!((8..33).contains(&v));
            assert!(rng.next_int(5) < 5);
        }
        let before = rng.draw_count();
        assert_eq!(rng.range(4, 4), 4);
        assert_eq!(rng.draw_count(), before);
        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.draw_count(), before + 1);
    }

    #[test]
    fn test_derived_draw_counts() {
        let mut rng = RandomStream::new(5);
        rng.normal(0.0, 1.0);
        assert_eq!(rng.draw_count(), 2);
        rng.beta_3_2();
        assert_eq!(rng.draw_count(), 7);
        let dir = rng.dirichlet_ones();
        assert_eq!(rng.draw_count(), 13);
        let total: f32 = dir.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(dir.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_beta_in_unit_interval() {
        let mut rng = RandomStream::new(11);
        for _ in 0..1000 {
            let b = rng.beta_3_2();
            assert!((0.0..=1.0).contains(&b));
        }
    }
}
