// src/rng.rs
// 可复现的伪随机数源 (Park-Miller LCG)
//
// Topology generation must be bit-identical for a given seed across runs
// and platforms, so we use an explicit minimal-standard LCG instead of a
// platform RNG: s = s * 16807 mod (2^31 - 1).

const MODULUS: u64 = 2_147_483_647; // 2^31 - 1 (Mersenne prime)
const MULTIPLIER: u64 = 16_807; // 7^5
const MAX_BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0; // 0x3F7FFFFF

#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        // 种子必须落在 [1, M-1]，0 会使序列退化为全零
        let state = seed as u64 % MODULUS;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Seeds from the monotonic clock. Used only where determinism is
    /// deliberately not wanted (particle edge reassignment).
    pub fn from_clock() -> Self {
        Self::new(instant::now() as u32)
    }

    fn step(&mut self) -> u64 {
        self.state = (self.state * MULTIPLIER) % MODULUS;
        self.state
    }

    /// Next value in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // (s - 1) / (M - 1)，先用 f64 再收窄，避免平台间的单精度路径差异。
        // 收窄会把贴近模数的状态舍入成 1.0，截到最大的 <1 的 f32。
        let raw = (((self.step() - 1) as f64) / ((MODULUS - 1) as f64)) as f32;
        raw.min(MAX_BELOW_ONE)
    }

    /// Next value in [lo, lo + span).
    pub fn range(&mut self, lo: f32, span: f32) -> f32 {
        lo + self.next_f32() * span
    }

    /// Uniform index into a collection of `len` elements.
    ///
    /// `len` must be nonzero; callers guard the empty case themselves
    /// (an empty edge set never seeds particles in the first place).
    pub fn pick_index(&mut self, len: usize) -> usize {
        ((self.next_f32() as f64 * len as f64) as usize).min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let mut rng = Lcg::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn zero_seed_does_not_degenerate() {
        let mut rng = Lcg::new(0);
        let first = rng.next_f32();
        let second = rng.next_f32();
        assert_ne!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn state_adjacent_to_modulus_stays_below_one() {
        // 739806647 * 16807 ≡ MODULUS - 1 (mod MODULUS)，这一步的比值
        // (MODULUS-2)/(MODULUS-1) 在收窄到 f32 时恰好舍入成 1.0
        let raw = ((MODULUS - 2) as f64) / ((MODULUS - 1) as f64);
        assert_eq!(raw as f32, 1.0);

        let mut rng = Lcg::new(739_806_647);
        let v = rng.next_f32();
        assert!(v < 1.0, "narrowed value escaped the unit interval: {v}");
        assert_eq!(v, MAX_BELOW_ONE);
    }

    #[test]
    fn pick_index_is_always_in_bounds() {
        let mut rng = Lcg::new(123);
        for len in [1usize, 2, 3, 17, 70] {
            for _ in 0..500 {
                assert!(rng.pick_index(len) < len);
            }
        }
    }
}
