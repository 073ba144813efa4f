mod ops;
mod siggen;
mod sparsehash;

pub use siggen::NeighborGen;

use crate::hash256::HashAndMetadata;
use serde::{Deserialize, Serialize};

/// Largest distance threshold the multi-index query supports.
pub const MAX_DISTANCE: usize = 63;

/// Largest per-lane flip radius enumerated by a query (`MAX_DISTANCE / 16`).
pub const MAX_LANE_RADIUS: usize = 3;

/// Multi-index hash over 256-bit hashes with metadata.
///
/// Pairs are kept in insertion order and addressed by their `u32` id.
/// Each of the 16 lanes has its own table from lane value to ids, and every
/// id appears in exactly one bucket per lane. There is no deletion.
///
/// Queries borrow `&self` and insertion borrows `&mut self`; a populated
/// index can be shared across threads for querying.
pub struct Index<M> {
    pairs: Vec<HashAndMetadata<M>>,
    tables: Vec<sparsehash::LaneTable>,
}

/// How a caller wants neighbours found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    /// Multi-index lookup; thresholds above [`MAX_DISTANCE`] fail.
    #[default]
    Indexed,
    /// Linear scan over every stored pair.
    BruteForce,
}
