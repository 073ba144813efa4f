//! Linear scans over hash pairs, for small inputs, for thresholds past the
//! multi-index ceiling, and as the reference the index is tested against.

use crate::hash256::{Hash256, HashAndMetadata};

/// Finds the pairs whose Hamming distances to `needle` are within `d`.
/// Returns their ids (positions) in ascending order.
pub fn range_search<M>(pairs: &[HashAndMetadata<M>], needle: &Hash256, d: usize) -> Vec<u32> {
    let mut answers = Vec::<u32>::with_capacity(1 << 8);
    range_search_with_buf(pairs, needle, d, &mut answers);
    answers
}

/// Same as [`range_search`], storing the ids in `answers`.
pub fn range_search_with_buf<M>(
    pairs: &[HashAndMetadata<M>],
    needle: &Hash256,
    d: usize,
    answers: &mut Vec<u32>,
) {
    answers.clear();
    for (i, pair) in pairs.iter().enumerate() {
        if pair.hash().hamming_distance_le(needle, d) {
            answers.push(i as u32);
        }
    }
}

/// Returns the lowest id within distance `d` of `needle`, if any.
pub fn find_any<M>(pairs: &[HashAndMetadata<M>], needle: &Hash256, d: usize) -> Option<u32> {
    pairs
        .iter()
        .position(|pair| pair.hash().hamming_distance_le(needle, d))
        .map(|i| i as u32)
}

/// Computes all the Hamming distances between the pairs and `needle`.
/// Returns tuples of id and distance.
pub fn exhaustive_search<M>(pairs: &[HashAndMetadata<M>], needle: &Hash256) -> Vec<(u32, u32)> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| (i as u32, pair.hash().hamming_distance(needle) as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_of(hashes: &[Hash256]) -> Vec<HashAndMetadata<usize>> {
        hashes
            .iter()
            .enumerate()
            .map(|(i, &h)| HashAndMetadata::new(h, i))
            .collect()
    }

    #[test]
    fn range_search_works() {
        let mut near = Hash256::zero();
        near.set_bit(3);
        near.set_bit(200);
        let pairs = pairs_of(&[Hash256::ones(), near, Hash256::zero()]);

        assert_eq!(range_search(&pairs, &Hash256::zero(), 0), vec![2]);
        assert_eq!(range_search(&pairs, &Hash256::zero(), 2), vec![1, 2]);
        assert_eq!(range_search(&pairs, &Hash256::zero(), 256), vec![0, 1, 2]);
        assert_eq!(find_any(&pairs, &Hash256::zero(), 2), Some(1));
        assert_eq!(find_any(&pairs[..1], &Hash256::zero(), 255), None);
    }

    #[test]
    fn exhaustive_search_agrees_with_range_search() {
        let mut rng = rand::thread_rng();
        let hashes: Vec<Hash256> = (0..500).map(|_| Hash256::random(&mut rng)).collect();
        let pairs = pairs_of(&hashes);
        let needle = hashes[0].fuzz(40, &mut rng);

        let all = exhaustive_search(&pairs, &needle);
        assert_eq!(all.len(), pairs.len());
        for (i, &(id, d)) in all.iter().enumerate() {
            assert_eq!(id as usize, i);
            assert_eq!(d as usize, hashes[i].hamming_distance(&needle));
        }

        for d in [40, 110, 128] {
            let within: Vec<u32> = all
                .iter()
                .filter(|&&(_, dist)| dist as usize <= d)
                .map(|&(id, _)| id)
                .collect();
            assert_eq!(within, range_search(&pairs, &needle, d));
        }
    }

    #[test]
    fn exhaustive_search_works() {
        let pairs = pairs_of(&[Hash256::ones(), Hash256::zero()]);
        assert_eq!(
            exhaustive_search(&pairs, &Hash256::zero()),
            vec![(0, 256), (1, 0)]
        );
    }
}
