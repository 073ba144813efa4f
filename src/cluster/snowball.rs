use crate::error::Result;
use crate::index::{Index, QueryMode};

use rayon::prelude::*;
use tracing::{debug, info};

/// A transitive cluster of stored pairs, identified by their ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    index: usize,
    members: Vec<u32>,
}

impl Cluster {
    /// 1-based position of the cluster in the output order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The lowest member id, which is the first member inserted.
    pub fn representative(&self) -> u32 {
        self.members[0]
    }

    /// Member ids in insertion order.
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Clusters every stored pair with all pairs reachable through chains of
/// neighbours within distance `d`.
///
/// Each stored pair lands in exactly one cluster. Clusters come out in the
/// order their first member was inserted. Pairs are told apart by id, so two
/// pairs with the same metadata stay distinct.
///
/// The neighbour queries run in parallel; `trace_every > 0` logs progress
/// every that many queries.
pub fn snowball<M: Sync>(
    index: &Index<M>,
    d: usize,
    mode: QueryMode,
    trace_every: usize,
) -> Result<Vec<Cluster>> {
    let n = index.len();

    let adjacency: Vec<Vec<u32>> = (0..n)
        .into_par_iter()
        .map(|i| {
            if trace_every > 0 && i % trace_every == 0 {
                info!(item = i, "snowball query");
            }
            index.query_all_ids_by(mode, index.pairs()[i].hash(), d)
        })
        .collect::<Result<_>>()?;

    let mut sets = DisjointSet::new(n);
    for (i, neighbors) in adjacency.iter().enumerate() {
        for &j in neighbors {
            sets.union(i as u32, j);
        }
    }

    let mut slot_of_root = vec![usize::MAX; n];
    let mut clusters: Vec<Cluster> = Vec::new();
    for id in 0..n as u32 {
        let root = sets.find(id) as usize;
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = clusters.len();
            clusters.push(Cluster {
                index: clusters.len() + 1,
                members: Vec::new(),
            });
        }
        clusters[slot_of_root[root]].members.push(id);
    }

    debug!(items = n, clusters = clusters.len(), d, "snowball clustering done");
    Ok(clusters)
}

/// Union-find whose root is always the lowest id of its set.
struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb as usize] = ra;
        } else if rb < ra {
            self.parent[ra as usize] = rb;
        }
    }
}
