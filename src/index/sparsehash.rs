use crate::hash256::LANE_BITS;

const GROUP_SIZE: usize = 64;
const NUM_GROUPS: usize = (1 << LANE_BITS) / GROUP_SIZE;
const COUNT_FLAG: u32 = u32::MAX;

/// Sparse table from one lane's 16-bit value to the ids of the hashes having
/// that value at that lane.
///
/// The 2^16 slots are split into groups of 64. A group keeps a bitmap of its
/// non-empty slots and one packed array laid out as
/// `[offsets of each non-empty slot, end offset, ids...]`, so empty slots
/// cost one bit.
pub struct LaneTable {
    groups: Vec<Group>,
    num_ids: usize,
}

impl LaneTable {
    pub fn new() -> Self {
        Self {
            groups: vec![Group::default(); NUM_GROUPS],
            num_ids: 0,
        }
    }

    /// Gets the ids stored under `value`, in insertion order.
    pub fn access(&self, value: u16) -> Option<&[u32]> {
        let (gpos, gmod) = locate(value);
        self.groups[gpos].access(gmod)
    }

    /// Appends `id` to the bucket of `value`.
    pub fn insert(&mut self, value: u16, id: u32) {
        let (gpos, gmod) = locate(value);
        self.groups[gpos].insert(gmod, id);
        self.num_ids += 1;
    }

    /// First pass of a bulk build: reserves room for one id under `value`.
    /// Every counted value must then be filled by [`LaneTable::data_insert`].
    pub fn count_insert(&mut self, value: u16) {
        let (gpos, gmod) = locate(value);
        self.groups[gpos].count_insert(gmod);
    }

    /// Second pass of a bulk build.
    pub fn data_insert(&mut self, value: u16, id: u32) {
        let (gpos, gmod) = locate(value);
        self.groups[gpos].data_insert(gmod, id);
        self.num_ids += 1;
    }

    /// Total number of stored ids.
    pub fn num_ids(&self) -> usize {
        self.num_ids
    }

    /// Iterates non-empty buckets in ascending value order.
    pub fn buckets(&self) -> impl Iterator<Item = (u16, &[u32])> + '_ {
        self.groups.iter().enumerate().flat_map(|(gpos, group)| {
            (0..GROUP_SIZE).filter_map(move |gmod| {
                group
                    .access(gmod)
                    .map(|ids| ((gpos * GROUP_SIZE + gmod) as u16, ids))
            })
        })
    }
}

impl Default for LaneTable {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn locate(value: u16) -> (usize, usize) {
    let value = value as usize;
    (value / GROUP_SIZE, value % GROUP_SIZE)
}

#[derive(Default, Clone)]
struct Group {
    bitmap: u64,
    array: Vec<u32>,
}

impl Group {
    fn access(&self, slot: usize) -> Option<&[u32]> {
        debug_assert!(slot < GROUP_SIZE);

        if !get(self.bitmap, slot) {
            return None;
        }

        let rank = rank(self.bitmap, slot);
        let occupied = popcnt(self.bitmap);

        let beg = occupied + 1 + self.array[rank] as usize;
        let end = beg + (self.array[rank + 1] - self.array[rank]) as usize;

        Some(&self.array[beg..end])
    }

    fn insert(&mut self, slot: usize, id: u32) {
        debug_assert!(slot < GROUP_SIZE);

        if self.bitmap == 0 {
            self.bitmap = set(self.bitmap, slot);
            self.array = vec![0, 1, id];
            return;
        }

        let rank = rank(self.bitmap, slot);

        if !get(self.bitmap, slot) {
            // new empty slot: duplicate the begin offset
            self.array.insert(rank, self.array[rank]);
            self.bitmap = set(self.bitmap, slot);
        }

        let occupied = popcnt(self.bitmap);
        let position = occupied + 1 + self.array[rank + 1] as usize;
        self.array.insert(position, id);

        for offset in &mut self.array[rank + 1..occupied + 1] {
            *offset += 1;
        }
    }

    fn count_insert(&mut self, slot: usize) {
        debug_assert!(slot < GROUP_SIZE);

        if self.bitmap == 0 {
            self.array.push(COUNT_FLAG);
        }

        let rank = rank(self.bitmap, slot);

        if !get(self.bitmap, slot) {
            self.array.insert(rank + 1, 1);
            self.bitmap = set(self.bitmap, slot);
        } else {
            self.array[rank + 1] += 1;
        }
    }

    fn data_insert(&mut self, slot: usize, id: u32) {
        debug_assert!(slot < GROUP_SIZE);
        debug_assert!(get(self.bitmap, slot));

        if self.array[0] == COUNT_FLAG {
            self.allocate_counted();
        }

        let occupied = popcnt(self.bitmap);
        let rank = rank(self.bitmap, slot);

        let offset = self.array[rank + 1] as usize;
        self.array[occupied + 1 + offset] = id;
        self.array[rank + 1] += 1;
    }

    /// Turns per-slot counts into begin offsets and reserves the id region.
    fn allocate_counted(&mut self) {
        debug_assert_ne!(self.bitmap, 0);
        debug_assert_eq!(self.array[0], COUNT_FLAG);

        let occupied = popcnt(self.bitmap);
        debug_assert_eq!(occupied + 1, self.array.len());

        self.array[0] = 0;
        for i in 0..occupied {
            self.array[i + 1] += self.array[i];
        }

        let new_size = self.array.len() + self.array[occupied] as usize;
        self.array.resize(new_size, 0);

        // shift right by one so array[i + 1] is the fill cursor of slot i
        for i in (0..occupied).rev() {
            self.array[i + 1] = self.array[i];
        }
    }
}

#[inline]
fn popcnt(x: u64) -> usize {
    x.count_ones() as usize
}

/// Number of set bits strictly below position `i`.
#[inline]
fn rank(x: u64, i: usize) -> usize {
    debug_assert!(i < 64);
    popcnt(x & ((1 << i) - 1))
}

#[inline]
pub(crate) fn get(x: u64, i: usize) -> bool {
    debug_assert!(i < 64);
    (x & (1 << i)) != 0
}

#[inline]
pub(crate) fn set(x: u64, i: usize) -> u64 {
    debug_assert!(i < 64);
    x | (1 << i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn check_against(expected: &[Vec<u32>], table: &LaneTable) {
        for (value, org) in expected.iter().enumerate() {
            match table.access(value as u16) {
                None => assert!(org.is_empty()),
                Some(ids) => assert_eq!(&org[..], ids),
            }
        }
    }

    #[test]
    fn table_works() {
        let mut expected = vec![Vec::<u32>::default(); 1 << LANE_BITS];
        let mut table = LaneTable::new();

        let mut rng = thread_rng();
        for id in 0..5000 {
            // narrow range so buckets collide
            let value = rng.gen_range(0..2048u16);
            expected[value as usize].push(id);
            table.insert(value, id);
        }

        check_against(&expected, &table);
        assert_eq!(table.num_ids(), 5000);
    }

    #[test]
    fn table_works_in_bulk() {
        let mut expected = vec![Vec::<u32>::default(); 1 << LANE_BITS];
        let mut table = LaneTable::new();

        let mut rng = thread_rng();
        let values: Vec<u16> = (0..5000).map(|_| rng.gen()).collect();

        for &value in &values {
            table.count_insert(value);
        }
        for (id, &value) in values.iter().enumerate() {
            expected[value as usize].push(id as u32);
            table.data_insert(value, id as u32);
        }

        check_against(&expected, &table);
    }

    #[test]
    fn insert_after_bulk_works() {
        let mut expected = vec![Vec::<u32>::default(); 1 << LANE_BITS];
        let mut table = LaneTable::new();

        let mut rng = thread_rng();
        let values: Vec<u16> = (0..1000).map(|_| rng.gen_range(0..512)).collect();
        for &value in &values {
            table.count_insert(value);
        }
        for (id, &value) in values.iter().enumerate() {
            expected[value as usize].push(id as u32);
            table.data_insert(value, id as u32);
        }
        for id in 1000..2000u32 {
            let value = rng.gen_range(0..512);
            expected[value as usize].push(id);
            table.insert(value, id);
        }

        check_against(&expected, &table);
    }

    #[test]
    fn buckets_are_ordered() {
        let mut table = LaneTable::new();
        table.insert(0xffff, 0);
        table.insert(3, 1);
        table.insert(3, 2);
        table.insert(64, 3);

        let buckets: Vec<(u16, Vec<u32>)> =
            table.buckets().map(|(v, ids)| (v, ids.to_vec())).collect();
        assert_eq!(
            buckets,
            vec![(3, vec![1, 2]), (64, vec![3]), (0xffff, vec![0])]
        );
    }

    #[test]
    fn group_works() {
        let mut rng = thread_rng();

        let mut expected = vec![Vec::<u32>::default(); GROUP_SIZE];
        let mut group = Group::default();

        for id in 0..100 {
            let slot = rng.gen_range(0..GROUP_SIZE);
            expected[slot].push(id);
            group.insert(slot, id);
        }

        for slot in 0..GROUP_SIZE {
            match group.access(slot) {
                None => assert!(expected[slot].is_empty()),
                Some(ids) => assert_eq!(&expected[slot][..], ids),
            }
        }
    }
}
