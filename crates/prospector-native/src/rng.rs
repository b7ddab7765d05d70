//! PCG32 generator and the derived draws used by world generation and dynamics

use prospector_core::constants::N_COMMODITIES;

const PCG_MULT: u64 = 6364136223846793005;
const PI: f32 = std::f32::consts::PI;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn seed(&mut self, seed: u64, stream: u64) {
        self.state = 0;
        self.inc = (stream << 1) | 1;
        self.next_u32();
        self.state = self.state.wrapping_add(seed);
        self.next_u32();
    }

    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        self.state = old.wrapping_mul(PCG_MULT).wrapping_add(self.inc);
        (xorshifted >> rot) | (xorshifted << (rot.wrapping_neg() & 31))
    }

    /// 24-bit uniform in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    pub fn u32_range(&mut self, low: u32, high_exclusive: u32) -> u32 {
        if high_exclusive <= low {
            return low;
        }
        let span = high_exclusive - low;
        low + self.next_u32() % span
    }

    pub fn uniform(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    pub fn exp_unit(&mut self) -> f32 {
        let mut u = self.next_f32();
        if u < 1.0e-8 {
            u = 1.0e-8;
        }
        -u.ln()
    }

    pub fn normal(&mut self, mean: f32, sigma: f32) -> f32 {
        let mut u1 = self.next_f32();
        let u2 = self.next_f32();
        if u1 < 1.0e-8 {
            u1 = 1.0e-8;
        }
        let mag = (-2.0 * u1.ln()).sqrt();
        let z0 = mag * (2.0 * PI * u2).cos();
        mean + sigma * z0
    }

    pub fn lognormal(&mut self, mean: f32, sigma: f32) -> f32 {
        self.normal(mean, sigma).exp()
    }

    pub fn beta_3_2(&mut self) -> f32 {
        let mut a = 0.0f32;
        let mut b = 0.0f32;
        for _ in 0..3 {
            a += self.exp_unit();
        }
        for _ in 0..2 {
            b += self.exp_unit();
        }
        let total = a + b;
        if total <= 0.0 {
            return 0.5;
        }
        a / total
    }

    pub fn dirichlet_ones(&mut self, out: &mut [f32; N_COMMODITIES]) {
        let mut sum = 0.0f32;
        for i in 0..N_COMMODITIES {
            out[i] = self.exp_unit();
            sum += out[i];
        }
        if sum <= 0.0 {
            out.fill(1.0 / N_COMMODITIES as f32);
            return;
        }
        for value in out.iter_mut() {
            *value /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::RandomStream;

    fn seeded(seed: u64) -> Pcg32 {
        let mut rng = Pcg32::default();
        rng.seed(seed, 54);
        rng
    }

    #[test]
    fn test_matches_shared_random_stream() {
        for seed in [0u64, 1, 42, 7_000_000_123, u64::MAX] {
            let mut native = seeded(seed);
            let mut shared = RandomStream::new(seed);
            for _ in 0..256 {
                assert_eq!(native.next_u32(), shared.next_u32());
            }
            for _ in 0..64 {
                assert_eq!(native.next_f32().to_bits(), shared.next_uniform().to_bits());
                assert_eq!(
                    native.normal(0.5, 0.2).to_bits(),
                    shared.normal(0.5, 0.2).to_bits()
                );
                assert_eq!(native.beta_3_2().to_bits(), shared.beta_3_2().to_bits());
                let mut dir = [0.0; N_COMMODITIES];
                native.dirichlet_ones(&mut dir);
                let expected = shared.dirichlet_ones();
                for (a, b) in dir.iter().zip(expected.iter()) {
                    assert_eq!(a.to_bits(), b.to_bits());
                }
                assert_eq!(native.u32_range(5, 17), shared.range(5, 17));
            }
        }
    }

    #[test]
    fn test_rotation_with_zero_shift() {
        // rot == 0 must not shift by 32
        let mut rng = Pcg32 { state: 0, inc: 1 };
        assert_eq!(rng.next_u32(), 0);
    }
}
