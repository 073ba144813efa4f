//! Grouping near-duplicate hashes.
//!
//! - [`snowball`] clusters transitively: two hashes share a cluster when a
//!   chain of pairs within the threshold connects them.
//! - [`GreedyClusterer`] streams hashes, assigning each to the first known
//!   center within the threshold or making it a new center.
//! - [`radial`] lists, for every hash, all stored hashes within the threshold.

mod greedy;
mod radial;
mod snowball;

pub use greedy::{Assignment, GreedyClusterer};
pub use radial::{radial, RadialBlock};
pub use snowball::{snowball, Cluster};
