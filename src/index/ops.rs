use crate::error::{Error, Result};
use crate::hash256::{Hash256, HashAndMetadata, NUM_LANES};
use crate::index::siggen::NeighborGen;
use crate::index::sparsehash::{self, LaneTable};
use crate::index::{Index, QueryMode, MAX_DISTANCE, MAX_LANE_RADIUS};
use crate::ls;

use std::io::{self, Write};
use tracing::debug;

impl<M> Index<M> {
    /// Constructs an empty index.
    pub fn new() -> Self {
        Self {
            pairs: Vec::new(),
            tables: (0..NUM_LANES).map(|_| LaneTable::new()).collect(),
        }
    }

    /// Constructs the index from pairs in one pass per lane.
    /// The pairs get ids in their given order.
    pub fn from_pairs(pairs: Vec<HashAndMetadata<M>>) -> Result<Self> {
        if (u32::MAX as usize) < pairs.len() {
            return Err(Error::InvalidInput(
                "pairs.len() must be no more than 2^32.".to_string(),
            ));
        }

        let mut tables = Vec::with_capacity(NUM_LANES);

        for lane in 0..NUM_LANES {
            let mut table = LaneTable::new();

            for pair in &pairs {
                table.count_insert(pair.hash().lane(lane));
            }

            for (id, pair) in pairs.iter().enumerate() {
                table.data_insert(pair.hash().lane(lane), id as u32);
            }

            tables.push(table);
        }

        debug!(size = pairs.len(), "built multi-index");

        Ok(Self { pairs, tables })
    }

    /// Appends a pair and returns its id, which is its insertion order.
    pub fn insert(&mut self, hash: Hash256, metadata: M) -> Result<u32> {
        let id = u32::try_from(self.pairs.len()).map_err(|_| {
            Error::InvalidInput("index already holds 2^32 hashes.".to_string())
        })?;

        for (lane, table) in self.tables.iter_mut().enumerate() {
            table.insert(hash.lane(lane), id);
        }
        self.pairs.push(HashAndMetadata::new(hash, metadata));

        Ok(id)
    }

    pub fn insert_all<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = HashAndMetadata<M>>,
    {
        for pair in pairs {
            let (hash, metadata) = pair.into_parts();
            self.insert(hash, metadata)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&HashAndMetadata<M>> {
        self.pairs.get(id as usize)
    }

    /// All pairs in insertion order; position is the id.
    pub fn pairs(&self) -> &[HashAndMetadata<M>] {
        &self.pairs
    }

    /// Finds the pairs whose Hamming distances to `needle` are within `d`.
    /// Returns their ids in ascending order.
    pub fn query_all_ids(&self, needle: &Hash256, d: usize) -> Result<Vec<u32>> {
        let mut answers = Vec::<u32>::with_capacity(1 << 8);
        self.query_all_ids_with_buf(needle, d, &mut answers)?;
        Ok(answers)
    }

    /// Same as [`Index::query_all_ids`], storing the ids in `answers`.
    pub fn query_all_ids_with_buf(
        &self,
        needle: &Hash256,
        d: usize,
        answers: &mut Vec<u32>,
    ) -> Result<()> {
        answers.clear();

        // If the distance is within d, some lane differs by at most d / 16 bits.
        let rad = lane_radius(d)?;
        let mut neighbors = NeighborGen::new();

        for (lane, table) in self.tables.iter().enumerate() {
            let value = needle.lane(lane);

            for r in 0..=rad {
                neighbors.init(value, r);
                for sig in neighbors.by_ref() {
                    if let Some(ids) = table.access(sig) {
                        answers.extend_from_slice(ids);
                    }
                }
            }
        }

        let mut n = 0;
        if !answers.is_empty() {
            answers.sort_unstable();
            for i in 0..answers.len() {
                if i == 0 || answers[i - 1] != answers[i] {
                    let hash = self.pairs[answers[i] as usize].hash();
                    if hash.hamming_distance_le(needle, d) {
                        answers[n] = answers[i];
                        n += 1;
                    }
                }
            }
        }
        answers.truncate(n);
        Ok(())
    }

    /// Finds the pairs whose Hamming distances to `needle` are within `d`,
    /// in insertion order.
    pub fn query_all(&self, needle: &Hash256, d: usize) -> Result<Vec<&HashAndMetadata<M>>> {
        let ids = self.query_all_ids(needle, d)?;
        Ok(self.resolve(&ids))
    }

    /// Finds some pair within distance `d` of `needle`, stopping at the first
    /// verified hit. Returns its id with the pair.
    pub fn query_any(
        &self,
        needle: &Hash256,
        d: usize,
    ) -> Result<Option<(u32, &HashAndMetadata<M>)>> {
        let rad = lane_radius(d)?;
        let mut neighbors = NeighborGen::new();
        let mut checked = vec![0u64; (self.pairs.len() + 63) / 64];

        for (lane, table) in self.tables.iter().enumerate() {
            let value = needle.lane(lane);

            for r in 0..=rad {
                neighbors.init(value, r);
                for sig in neighbors.by_ref() {
                    let ids = match table.access(sig) {
                        Some(ids) => ids,
                        None => continue,
                    };
                    for &id in ids {
                        let (word, bit) = (id as usize / 64, id as usize % 64);
                        if sparsehash::get(checked[word], bit) {
                            continue;
                        }
                        checked[word] = sparsehash::set(checked[word], bit);

                        let pair = &self.pairs[id as usize];
                        if pair.hash().hamming_distance_le(needle, d) {
                            return Ok(Some((id, pair)));
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Linear-scan counterpart of [`Index::query_all_ids`] with no threshold ceiling.
    pub fn brute_force_query_all_ids(&self, needle: &Hash256, d: usize) -> Vec<u32> {
        ls::range_search(&self.pairs, needle, d)
    }

    /// Linear-scan counterpart of [`Index::query_all`].
    pub fn brute_force_query_all(&self, needle: &Hash256, d: usize) -> Vec<&HashAndMetadata<M>> {
        let ids = self.brute_force_query_all_ids(needle, d);
        self.resolve(&ids)
    }

    /// Linear-scan counterpart of [`Index::query_any`]; returns the lowest matching id.
    pub fn brute_force_query_any(
        &self,
        needle: &Hash256,
        d: usize,
    ) -> Option<(u32, &HashAndMetadata<M>)> {
        ls::find_any(&self.pairs, needle, d).map(|id| (id, &self.pairs[id as usize]))
    }

    /// Dispatches to the indexed or linear `query_all_ids`.
    pub fn query_all_ids_by(&self, mode: QueryMode, needle: &Hash256, d: usize) -> Result<Vec<u32>> {
        match mode {
            QueryMode::Indexed => self.query_all_ids(needle, d),
            QueryMode::BruteForce => Ok(self.brute_force_query_all_ids(needle, d)),
        }
    }

    /// Dispatches to the indexed or linear `query_any`.
    pub fn query_any_by(
        &self,
        mode: QueryMode,
        needle: &Hash256,
        d: usize,
    ) -> Result<Option<(u32, &HashAndMetadata<M>)>> {
        match mode {
            QueryMode::Indexed => self.query_any(needle, d),
            QueryMode::BruteForce => Ok(self.brute_force_query_any(needle, d)),
        }
    }

    /// Writes every stored hash, then every non-empty bucket of every lane.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "ALL HASHES:")?;
        for pair in &self.pairs {
            writeln!(out, "{}", pair.hash())?;
        }
        writeln!(out, "MULTI-INDICES:")?;
        for (lane, table) in self.tables.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "--------------- slot_index={}", lane)?;
            for (value, ids) in table.buckets() {
                writeln!(out, "slot_value={:04x}", value)?;
                for id in ids {
                    writeln!(out, "  {}", id)?;
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, ids: &[u32]) -> Vec<&HashAndMetadata<M>> {
        ids.iter().map(|&id| &self.pairs[id as usize]).collect()
    }
}

impl<M> Default for Index<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-lane flip radius for threshold `d`.
fn lane_radius(d: usize) -> Result<usize> {
    let rad = d / NUM_LANES;
    if rad > MAX_LANE_RADIUS {
        return Err(Error::DimensionExceeded {
            d,
            max: MAX_DISTANCE,
        });
    }
    Ok(rad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};

    const THRESHOLDS: [usize; 10] = [0, 1, 5, 15, 16, 24, 31, 32, 47, 63];

    /// Random hashes in tight families, so small thresholds still find neighbours.
    fn gen_clustered_pairs(families: usize, per_family: usize) -> Vec<HashAndMetadata<usize>> {
        let mut rng = thread_rng();
        let mut pairs = Vec::with_capacity(families * per_family);
        for _ in 0..families {
            let seed = Hash256::random(&mut rng);
            for _ in 0..per_family {
                let fuzzed = seed.fuzz(rng.gen_range(0..48), &mut rng);
                let id = pairs.len();
                pairs.push(HashAndMetadata::new(fuzzed, id));
            }
        }
        pairs
    }

    fn do_query_all(index: &Index<usize>) {
        for d in THRESHOLDS {
            for qi in (0..index.len()).step_by(97) {
                let needle = *index.pairs()[qi].hash();
                let ans1 = index.brute_force_query_all_ids(&needle, d);
                let ans2 = index.query_all_ids(&needle, d).unwrap();
                assert_eq!(ans1, ans2);
                assert!(ans2.contains(&(qi as u32)));
            }
        }
    }

    fn do_query_any(index: &Index<usize>) {
        let mut rng = thread_rng();
        for d in THRESHOLDS {
            for qi in (0..index.len()).step_by(97) {
                let needle = index.pairs()[qi].hash().fuzz(rng.gen_range(0..40), &mut rng);
                let expected = index.brute_force_query_any(&needle, d);
                match index.query_any(&needle, d).unwrap() {
                    Some((id, pair)) => {
                        assert!(expected.is_some());
                        assert_eq!(index.get(id), Some(pair));
                        assert!(pair.hash().hamming_distance(&needle) <= d);
                    }
                    None => assert!(expected.is_none()),
                }
            }
        }
    }

    #[test]
    fn query_all_works() {
        let mut index = Index::new();
        index.insert_all(gen_clustered_pairs(100, 50)).unwrap();
        do_query_all(&index);
    }

    #[test]
    fn query_all_works_in_bulk() {
        let index = Index::from_pairs(gen_clustered_pairs(100, 50)).unwrap();
        do_query_all(&index);
    }

    #[test]
    fn query_any_works() {
        let index = Index::from_pairs(gen_clustered_pairs(100, 50)).unwrap();
        do_query_any(&index);
    }

    #[test]
    fn query_all_matches_on_random_hashes() {
        let mut rng = thread_rng();
        let pairs: Vec<HashAndMetadata<usize>> = (0..10000)
            .map(|i| HashAndMetadata::new(Hash256::random(&mut rng), i))
            .collect();
        let index = Index::from_pairs(pairs).unwrap();
        for _ in 0..50 {
            let needle = Hash256::random(&mut rng);
            for d in [31, 63] {
                let ans1 = index.brute_force_query_all_ids(&needle, d);
                let ans2 = index.query_all_ids(&needle, d).unwrap();
                assert_eq!(ans1, ans2);
            }
        }
    }

    #[test]
    fn self_query_finds_exactly_one() {
        let needle = Hash256::random(&mut thread_rng());
        let mut index = Index::new();
        let id = index.insert(needle, "only").unwrap();
        assert_eq!(id, 0);

        let matches = index.query_all(&needle, 0).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(*matches[0].metadata(), "only");
        assert_eq!(index.query_any(&needle, 0).unwrap().map(|(id, _)| id), Some(0));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index: Index<()> = Index::new();
        let needle = Hash256::ones();
        assert!(index.is_empty());
        assert!(index.query_all(&needle, 63).unwrap().is_empty());
        assert!(index.query_any(&needle, 63).unwrap().is_none());
        assert!(index.brute_force_query_any(&needle, 256).is_none());
    }

    #[test]
    fn dimension_exceeded_works() {
        let mut index = Index::new();
        index.insert(Hash256::zero(), ()).unwrap();
        let needle = Hash256::ones();

        for d in [64, 100, 256] {
            match index.query_all_ids(&needle, d) {
                Err(Error::DimensionExceeded { d: got, max }) => {
                    assert_eq!(got, d);
                    assert_eq!(max, MAX_DISTANCE);
                }
                other => panic!("expected dimension error, got {:?}", other),
            }
            assert!(index.query_any(&needle, d).is_err());
        }
        assert!(index.query_all_ids(&needle, 63).is_ok());

        // linear search has no ceiling
        assert_eq!(index.brute_force_query_all_ids(&needle, 256), vec![0]);
        assert_eq!(
            index.query_all_ids_by(QueryMode::BruteForce, &needle, 256).unwrap(),
            vec![0]
        );
        assert!(index.query_any_by(QueryMode::Indexed, &needle, 64).is_err());
    }

    #[test]
    fn every_id_in_one_bucket_per_lane() {
        let pairs = gen_clustered_pairs(20, 30);
        let n = pairs.len();
        let index = Index::from_pairs(pairs).unwrap();
        for (lane, table) in index.tables.iter().enumerate() {
            let mut seen = vec![0usize; n];
            for (value, ids) in table.buckets() {
                for &id in ids {
                    assert_eq!(index.pairs()[id as usize].hash().lane(lane), value);
                    seen[id as usize] += 1;
                }
            }
            assert!(seen.iter().all(|&c| c == 1));
            assert_eq!(table.num_ids(), n);
        }
    }

    #[test]
    fn dump_works() {
        let mut index = Index::new();
        index.insert(Hash256::zero(), ()).unwrap();
        index.insert(Hash256::ones(), ()).unwrap();

        let mut out = Vec::new();
        index.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ALL HASHES:\n"));
        assert_eq!(text.matches("slot_value=0000").count(), NUM_LANES);
        assert_eq!(text.matches("slot_value=ffff").count(), NUM_LANES);
    }
}
