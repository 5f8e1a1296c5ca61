//! Seeded generator for random terrain.
//!
//! A 64-bit linear congruential generator (Knuth's MMIX constants). It is not
//! statistically strong; it exists so the same `HEIGHT_RANDOM seed=<n>` produces
//! the same terrain on every machine and every replay.

use rand::RngCore;

const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const INCREMENT: u64 = 1_442_695_040_888_963_407;

#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the wall clock, for `HEIGHT_RANDOM` without a `seed`.
    // only the low bits vary between calls
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clock_seed() -> u64 {
        time::OffsetDateTime::now_utc().unix_timestamp_nanos() as u64
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        self.state
    }
}

impl RngCore for Lcg {
    // the high half has the longest period
    #[allow(clippy::cast_possible_truncation)]
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        let xs: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        assert_eq!(xs, ys);
        assert_ne!(Lcg::new(43).next_u32(), xs[0]);
    }

    #[test]
    fn ranges_stay_in_bounds() {
        let mut rng = Lcg::new(7);
        for _ in 0..200 {
            let v: f64 = rng.random_range(-1.0..=3.0);
            assert!((-1.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn fill_bytes_handles_partial_chunks() {
        let mut buf = [0u8; 7];
        Lcg::new(1).fill_bytes(&mut buf);
        assert!(buf.iter().any(|b| *b != 0));
    }
}
