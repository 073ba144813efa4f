use crate::error::Result;
use crate::index::{Index, QueryMode};

use rayon::prelude::*;
use tracing::info;

/// All stored pairs within the threshold of one stored pair, itself included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RadialBlock {
    /// 1-based, counting only non-empty blocks.
    pub index: usize,
    pub needle: u32,
    /// Matching ids in ascending order, with their distances to the needle.
    pub matches: Vec<(u32, usize)>,
}

/// Lists the neighbours of every stored pair. A pair may appear in many
/// blocks; blocks follow insertion order of their needles.
pub fn radial<M: Sync>(
    index: &Index<M>,
    d: usize,
    mode: QueryMode,
    trace_every: usize,
) -> Result<Vec<RadialBlock>> {
    let found: Vec<Vec<u32>> = (0..index.len())
        .into_par_iter()
        .map(|i| {
            if trace_every > 0 && i % trace_every == 0 {
                info!(item = i, "radial query");
            }
            index.query_all_ids_by(mode, index.pairs()[i].hash(), d)
        })
        .collect::<Result<_>>()?;

    let pairs = index.pairs();
    let blocks = found
        .into_iter()
        .enumerate()
        .filter(|(_, ids)| !ids.is_empty())
        .enumerate()
        .map(|(k, (needle, ids))| {
            let hash = pairs[needle].hash();
            RadialBlock {
                index: k + 1,
                needle: needle as u32,
                matches: ids
                    .into_iter()
                    .map(|id| (id, hash.hamming_distance(pairs[id as usize].hash())))
                    .collect(),
            }
        })
        .collect();
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash256::Hash256;

    #[test]
    fn radial_lists_overlapping_neighbourhoods() {
        let mut b = Hash256::zero();
        for k in 0..10 {
            b.set_bit(k);
        }
        let mut c = b;
        for k in 10..20 {
            c.set_bit(k);
        }

        let mut index = Index::new();
        index.insert(Hash256::zero(), "a").unwrap();
        index.insert(b, "b").unwrap();
        index.insert(c, "c").unwrap();

        let blocks = radial(&index, 15, QueryMode::Indexed, 0).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].matches, vec![(0, 0), (1, 10)]);
        assert_eq!(blocks[1].matches, vec![(0, 10), (1, 0), (2, 10)]);
        assert_eq!(blocks[2].index, 3);
        assert_eq!(blocks[2].needle, 2);
        assert_eq!(blocks[2].matches, vec![(1, 10), (2, 0)]);
    }
}
