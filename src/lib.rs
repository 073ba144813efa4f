//! # pdq-mih
//!
//! PDQ perceptual hashing of images, with multi-index hashing (MIH) for
//! finding near-duplicate 256-bit hashes under Hamming distance, described in the paper
//!
//! > Norouzi, Punjani, and Fleet, **Fast exact search in Hamming space with multi-index hashing**, *IEEE TPAMI*, 36(6):1107– 1119, 2014.
//!
//! ## Features
//!
//! - **PDQ hashing:** [`PdqHasher`] turns an image into a 256-bit hash and a
//!   quality score in `0..=100`, and derives the hashes of the image's eight
//!   rotations and reflections without re-hashing pixels.
//!
//! - **Two types of neighbor searches:** [`Index`] provides
//!   - *All-matches search* finds every stored hash within a distance threshold.
//!   - *Any-match search* stops at the first stored hash within the threshold.
//!
//!   Thresholds up to 63 are served by splitting each hash into 16 lanes of
//!   16 bits; larger ones fall back to the linear scans in [`ls`].
//!
//! - **Clustering:** [`cluster::snowball`] groups hashes transitively, and
//!   [`cluster::GreedyClusterer`] assigns streamed hashes to fixed centers.
//!
//! ## Example
//!
//! ```rust
//! use pdq_mih::{Hash256, Index};
//!
//! fn main() {
//!     let a = Hash256::zero();
//!     let mut b = a;
//!     b.flip_bit(7);
//!     b.flip_bit(130);
//!     let c = Hash256::ones();
//!
//!     // Construct the index
//!     let mut index = Index::new();
//!     index.insert(a, "a").unwrap();
//!     index.insert(b, "b").unwrap();
//!     index.insert(c, "c").unwrap();
//!
//!     // Find the hashes whose Hamming distances are within 2
//!     let answers = index.query_all_ids(&a, 2).unwrap();
//!     println!("{:?}", answers); // [0, 1]
//!
//!     // Stop at the first hash within 2
//!     let (id, pair) = index.query_any(&b, 2).unwrap().unwrap();
//!     println!("{} {}", id, pair.metadata());
//! }
//! ```

/// Crate errors.
pub mod error;

/// The 256-bit hash type.
pub mod hash256;

/// The PDQ perceptual hasher.
pub mod hasher;

/// An implementation of multi-index hashing.
pub mod index;

/// Exhaustive search functions.
pub mod ls;

/// Snowball, greedy, and radial clustering.
pub mod cluster;

/// Hash-list input and clustering output records.
pub mod hashio;

/// Tool configuration.
pub mod config;

pub use config::Config;
pub use error::{Error, Result};
pub use hash256::{Hash256, HashAndMetadata, HashAndQuality, HashesAndQuality};
pub use hasher::{Dihedral, HashingStats, PdqHasher};
pub use index::{Index, QueryMode};

/// Gets the Hamming distance between two hashes.
pub fn hamdist(x: &Hash256, y: &Hash256) -> usize {
    x.hamming_distance(y)
}
