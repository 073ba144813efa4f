use crate::hash256::LANE_BITS;

/// Enumerates the 16-bit lane values at exactly `radius` bit flips from a base value.
///
/// Each of the `C(16, radius)` neighbours is produced once. Flip positions
/// are tracked as an increasing combination and advanced like an odometer,
/// so consecutive signatures differ by one or two bit toggles.
pub struct NeighborGen {
    sig: u16,
    base: u16,
    radius: usize,
    bit: isize,
    power: [usize; LANE_BITS + 1],
}

impl NeighborGen {
    pub const fn new() -> Self {
        Self {
            sig: 0,
            base: 0,
            radius: 0,
            bit: 0,
            power: [0; LANE_BITS + 1],
        }
    }

    /// Restarts the enumeration around `base`.
    pub fn init(&mut self, base: u16, radius: usize) {
        debug_assert!(radius < LANE_BITS);

        self.sig = 0;
        self.base = base;
        self.radius = radius;
        self.bit = radius as isize - 1;

        for i in 0..radius {
            self.power[i] = i;
        }
        self.power[radius] = LANE_BITS + 1;
    }

    pub const fn has_next(&self) -> bool {
        self.bit != self.radius as isize
    }

    fn advance(&mut self) -> u16 {
        debug_assert!(self.has_next());

        while self.bit != -1 {
            let idx = self.bit as usize;
            if self.power[idx] == idx {
                self.sig ^= 1 << self.power[idx];
            } else {
                debug_assert!(0 < self.power[idx]);
                self.sig ^= 3 << (self.power[idx] - 1);
            }
            self.power[idx] += 1;
            self.bit -= 1;
        }

        let current = self.sig;

        loop {
            self.bit += 1;

            let idx = self.bit as usize;
            if idx >= self.radius || self.power[idx] + 1 != self.power[idx + 1] {
                break;
            }

            debug_assert!(0 < self.power[idx]);
            self.sig ^= 1 << (self.power[idx] - 1);
            self.power[idx] = idx;
        }

        current ^ self.base
    }
}

impl Default for NeighborGen {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for NeighborGen {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.has_next() {
            Some(self.advance())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn binomial(n: usize, k: usize) -> usize {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn neighbors_work() {
        let mut neighbors = NeighborGen::new();
        for base in [0u16, 0xffff, 0xa5c3] {
            for r in 0..=4 {
                neighbors.init(base, r);
                let sigs: Vec<u16> = neighbors.by_ref().collect();
                let unique: HashSet<u16> = sigs.iter().copied().collect();
                assert_eq!(sigs.len(), binomial(LANE_BITS, r));
                assert_eq!(unique.len(), sigs.len());
                for sig in sigs {
                    assert_eq!((sig ^ base).count_ones(), r as u32);
                }
            }
        }
    }

    #[test]
    fn radius_zero_yields_base() {
        let mut neighbors = NeighborGen::new();
        neighbors.init(0x1234, 0);
        assert_eq!(neighbors.next(), Some(0x1234));
        assert_eq!(neighbors.next(), None);
    }
}
