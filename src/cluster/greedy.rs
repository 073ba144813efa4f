use crate::error::{Error, Result};
use crate::hash256::{Hash256, HashAndMetadata};
use crate::index::{Index, QueryMode, MAX_DISTANCE};

use tracing::debug;

/// Where [`GreedyClusterer::assign`] put one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// 0-based cluster number, in the order centers were created.
    pub cluster: u32,
    /// Hash of the cluster's center.
    pub center: Hash256,
    /// Whether the input became a new center.
    pub is_center: bool,
    /// Distance from the input to the center.
    pub distance: usize,
}

/// Streaming center-based clusterer.
///
/// Only centers are stored, so memory grows with the number of clusters
/// rather than the number of inputs. An input joins whichever center within
/// the threshold the index finds first; results depend on input order.
pub struct GreedyClusterer<M> {
    centers: Index<M>,
    d: usize,
    mode: QueryMode,
}

impl<M> GreedyClusterer<M> {
    /// Fails up front when `mode` is indexed and `d` is beyond what the index serves.
    pub fn new(d: usize, mode: QueryMode) -> Result<Self> {
        if mode == QueryMode::Indexed && d > MAX_DISTANCE {
            return Err(Error::DimensionExceeded {
                d,
                max: MAX_DISTANCE,
            });
        }
        Ok(Self {
            centers: Index::new(),
            d,
            mode,
        })
    }

    pub fn assign(&mut self, pair: &HashAndMetadata<M>) -> Result<Assignment>
    where
        M: Clone,
    {
        let hash = pair.hash();

        if let Some((id, center)) = self.centers.query_any_by(self.mode, hash, self.d)? {
            return Ok(Assignment {
                cluster: id,
                center: *center.hash(),
                is_center: false,
                distance: center.hash().hamming_distance(hash),
            });
        }

        let id = self.centers.insert(*hash, pair.metadata().clone())?;
        debug!(cluster = id, center = %hash, "new center");
        Ok(Assignment {
            cluster: id,
            center: *hash,
            is_center: true,
            distance: 0,
        })
    }

    pub fn num_centers(&self) -> usize {
        self.centers.len()
    }

    /// The centers with the metadata of the input that created each.
    pub fn centers(&self) -> &Index<M> {
        &self.centers
    }
}
