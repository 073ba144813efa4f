//! PDQ perceptual hashing.
//!
//! An image is reduced to luma, blurred with a tent filter sized to the
//! image, sampled down to 64x64, and transformed by a partial DCT to 16x16
//! low-frequency coefficients. Each hash bit records whether a coefficient is
//! above the coefficients' median. A quality score in `0..=100` counts the
//! significant gradients of the 64x64 sample.

mod dct;
mod dihedral;
mod jarosz;
mod median;

pub use dihedral::Dihedral;

use crate::error::{Error, Result};
use crate::hash256::{Hash256, HashAndQuality, HashesAndQuality, NUM_LANES};
use dct::DctMatrix;

use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Images with a side shorter than this hash to zero with quality 0.
pub const MIN_HASHABLE_DIM: usize = 5;

pub(crate) const BUFFER_DIM: usize = 64;
pub(crate) const DCT_DIM: usize = 16;

const LUMA_FROM_R_COEFF: f32 = 0.299;
const LUMA_FROM_G_COEFF: f32 = 0.587;
const LUMA_FROM_B_COEFF: f32 = 0.114;

type Block = [[f32; DCT_DIM]; DCT_DIM];

/// Timing and size of one file hashed by [`PdqHasher::hash_file`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HashingStats {
    pub read_seconds: f32,
    pub hash_seconds: f32,
    /// `rows * cols` of the decoded image.
    pub image_height_times_width: usize,
}

/// Computes PDQ hashes.
///
/// The only state is the DCT basis, built once in [`PdqHasher::new`]. A
/// hasher is immutable afterwards and can be shared across threads.
pub struct PdqHasher {
    dct: DctMatrix,
}

impl PdqHasher {
    pub fn new() -> Self {
        Self {
            dct: DctMatrix::new(),
        }
    }

    /// Hashes a luma buffer of `rows x cols` in row-major order.
    /// The buffer is blurred in place.
    pub fn hash_luma(&self, luma: &mut [f32], rows: usize, cols: usize) -> Result<HashAndQuality> {
        check_dims(luma, rows, cols)?;
        Ok(self.hash_checked(luma, rows, cols))
    }

    /// Same as [`PdqHasher::hash_luma`], returning the requested dihedral variants.
    pub fn dihedral_luma(
        &self,
        luma: &mut [f32],
        rows: usize,
        cols: usize,
        flags: Dihedral,
    ) -> Result<HashesAndQuality> {
        check_dims(luma, rows, cols)?;
        Ok(self.dihedral_checked(luma, rows, cols, flags))
    }

    pub fn hash_image(&self, image: &DynamicImage) -> HashAndQuality {
        let (mut luma, rows, cols) = to_luma(image);
        self.hash_checked(&mut luma, rows, cols)
    }

    pub fn dihedral_image(&self, image: &DynamicImage, flags: Dihedral) -> HashesAndQuality {
        let (mut luma, rows, cols) = to_luma(image);
        self.dihedral_checked(&mut luma, rows, cols, flags)
    }

    /// Reads and hashes an image file.
    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> Result<(HashAndQuality, HashingStats)> {
        let path = path.as_ref();
        let (image, mut stats) = read_image(path)?;

        let start = Instant::now();
        let rv = self.hash_image(&image);
        stats.hash_seconds = start.elapsed().as_secs_f32();

        debug!(path = %path.display(), quality = rv.quality, "hashed image");
        Ok((rv, stats))
    }

    /// Reads an image file and hashes the requested dihedral variants.
    pub fn dihedral_file<P: AsRef<Path>>(
        &self,
        path: P,
        flags: Dihedral,
    ) -> Result<(HashesAndQuality, HashingStats)> {
        let path = path.as_ref();
        let (image, mut stats) = read_image(path)?;

        let start = Instant::now();
        let rv = self.dihedral_image(&image, flags);
        stats.hash_seconds = start.elapsed().as_secs_f32();

        debug!(path = %path.display(), quality = rv.quality, "hashed image variants");
        Ok((rv, stats))
    }

    fn hash_checked(&self, luma: &mut [f32], rows: usize, cols: usize) -> HashAndQuality {
        match self.coefficients(luma, rows, cols) {
            Some((block, quality)) => HashAndQuality {
                hash: to_bits(&block),
                quality,
            },
            None => HashAndQuality {
                hash: Hash256::zero(),
                quality: 0,
            },
        }
    }

    fn dihedral_checked(
        &self,
        luma: &mut [f32],
        rows: usize,
        cols: usize,
        flags: Dihedral,
    ) -> HashesAndQuality {
        let (block, quality) = match self.coefficients(luma, rows, cols) {
            Some(found) => found,
            None => ([[0.0; DCT_DIM]; DCT_DIM], 0),
        };
        let variant = |flag: Dihedral, transform: fn(&Block) -> Block| {
            if flags.contains(flag) {
                Some(to_bits(&transform(&block)))
            } else {
                None
            }
        };

        HashesAndQuality {
            hash: variant(Dihedral::ORIGINAL, dihedral::original),
            rotate_90: variant(Dihedral::ROTATE_90, dihedral::rotate_90),
            rotate_180: variant(Dihedral::ROTATE_180, dihedral::rotate_180),
            rotate_270: variant(Dihedral::ROTATE_270, dihedral::rotate_270),
            flip_x: variant(Dihedral::FLIP_X, dihedral::flip_x),
            flip_y: variant(Dihedral::FLIP_Y, dihedral::flip_y),
            flip_plus_1: variant(Dihedral::FLIP_PLUS_1, dihedral::flip_plus_1),
            flip_minus_1: variant(Dihedral::FLIP_MINUS_1, dihedral::flip_minus_1),
            quality,
        }
    }

    /// Blur, decimate, and DCT. `None` when the image is too small to hash.
    fn coefficients(&self, luma: &mut [f32], rows: usize, cols: usize) -> Option<(Block, u32)> {
        if rows < MIN_HASHABLE_DIM || cols < MIN_HASHABLE_DIM {
            return None;
        }

        let mut tmp = vec![0.0f32; luma.len()];
        jarosz::filter(
            luma,
            &mut tmp,
            rows,
            cols,
            jarosz::window_size(cols),
            jarosz::window_size(rows),
            jarosz::NUM_XY_PASSES,
        );

        let buffer64x64 = jarosz::decimate(luma, rows, cols);
        let quality = quality_metric(&buffer64x64);
        Some((self.dct.dct64_to_16(&buffer64x64), quality))
    }
}

impl Default for PdqHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn check_dims(luma: &[f32], rows: usize, cols: usize) -> Result<()> {
    if rows.checked_mul(cols) != Some(luma.len()) {
        return Err(Error::InvalidInput(format!(
            "luma buffer holds {} values, expected {} x {}",
            luma.len(),
            rows,
            cols
        )));
    }
    Ok(())
}

fn read_image(path: &Path) -> Result<(DynamicImage, HashingStats)> {
    let start = Instant::now();
    let image = image::open(path).map_err(|source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    let stats = HashingStats {
        read_seconds: start.elapsed().as_secs_f32(),
        hash_seconds: 0.0,
        image_height_times_width: image.height() as usize * image.width() as usize,
    };
    Ok((image, stats))
}

/// Returns `(luma, rows, cols)`. Grey images are used as is; everything else
/// goes through 8-bit RGB.
fn to_luma(image: &DynamicImage) -> (Vec<f32>, usize, usize) {
    let rows = image.height() as usize;
    let cols = image.width() as usize;
    let luma = match image {
        DynamicImage::ImageLuma8(grey) => grey.as_raw().iter().map(|&v| v as f32).collect(),
        DynamicImage::ImageLumaA8(grey) => grey.pixels().map(|p| p.0[0] as f32).collect(),
        other => other
            .to_rgb8()
            .pixels()
            .map(|p| {
                LUMA_FROM_R_COEFF * p.0[0] as f32
                    + LUMA_FROM_G_COEFF * p.0[1] as f32
                    + LUMA_FROM_B_COEFF * p.0[2] as f32
            })
            .collect(),
    };
    (luma, rows, cols)
}

/// Counts quantized neighbour differences: vertical first, then horizontal.
fn quality_metric(buffer: &[[f32; BUFFER_DIM]; BUFFER_DIM]) -> u32 {
    let mut gradient_sum: u32 = 0;

    for i in 0..BUFFER_DIM - 1 {
        for j in 0..BUFFER_DIM {
            let d = ((buffer[i][j] - buffer[i + 1][j]) * 100.0 / 255.0) as i32;
            gradient_sum += d.unsigned_abs();
        }
    }
    for row in buffer.iter() {
        for j in 0..BUFFER_DIM - 1 {
            let d = ((row[j] - row[j + 1]) * 100.0 / 255.0) as i32;
            gradient_sum += d.unsigned_abs();
        }
    }

    (gradient_sum / 90).min(100)
}

/// Bit `i * 16 + j` is set when coefficient `(i, j)` is above the median.
fn to_bits(block: &Block) -> Hash256 {
    let flat: Vec<f32> = block.iter().flatten().copied().collect();
    let median = median::torben(&flat).unwrap_or_default();

    let mut lanes = [0u16; NUM_LANES];
    for (lane, row) in lanes.iter_mut().zip(block.iter()) {
        for (j, &v) in row.iter().enumerate() {
            if v > median {
                *lane |= 1 << j;
            }
        }
    }
    Hash256::from_lanes(lanes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_luma(rows: usize, cols: usize) -> Vec<f32> {
        (0..rows * cols)
            .map(|k| {
                let (i, j) = (k / cols, k % cols);
                ((i * 3 + j * 5) % 256) as f32
            })
            .collect()
    }

    /// Integer ramps with a small row-banded ripple, computed in integers
    /// and stored as floats.
    fn ramp_luma(rows: usize, cols: usize) -> Vec<f32> {
        let mut luma = vec![0.0f32; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                luma[i * cols + j] = ((i * 200) / rows + (j * 50) / cols + (i / 9) % 3) as f32;
            }
        }
        luma
    }

    #[test]
    fn reference_hashes_work() {
        let cases = [
            (64, 64, "02c53dd8e1049b776a1f060ebf3c3bcf949095d9a06d074603aca37fe91eb5ca", 43),
            (100, 70, "b8e82192ea49eed5563c24167f6c6ee948d1327232cd1a94a76ce77d864a31ce", 24),
            (1024, 768, "0cfab12ea2a26e17cb5acec79ec12ee17a5668d11971f184be8dad5226a94785", 27),
        ];

        let hasher = PdqHasher::new();
        for (rows, cols, hex, quality) in cases {
            let mut luma = ramp_luma(rows, cols);
            let rv = hasher.hash_luma(&mut luma, rows, cols).unwrap();
            assert_eq!(rv.hash.to_hex(), hex, "{}x{}", rows, cols);
            assert_eq!(rv.quality, quality, "{}x{}", rows, cols);
        }
    }

    #[test]
    fn tiny_images_hash_to_zero() {
        let hasher = PdqHasher::new();
        let mut luma = vec![200.0f32; 4 * 100];
        let rv = hasher.hash_luma(&mut luma, 4, 100).unwrap();
        assert_eq!(rv.hash, Hash256::zero());
        assert_eq!(rv.quality, 0);

        let mut luma = vec![200.0f32; 100 * 4];
        let rv = hasher.dihedral_luma(&mut luma, 100, 4, Dihedral::ALL).unwrap();
        assert_eq!(rv.hashes(), vec![Hash256::zero(); 8]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let hasher = PdqHasher::new();
        let mut luma = vec![0.0f32; 10];
        assert!(matches!(
            hasher.hash_luma(&mut luma, 3, 4),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn blank_image_has_zero_quality() {
        let hasher = PdqHasher::new();
        let mut luma = vec![128.0f32; 300 * 200];
        let rv = hasher.hash_luma(&mut luma, 300, 200).unwrap();
        assert_eq!(rv.quality, 0);
    }

    #[test]
    fn hash_is_half_ones() {
        let hasher = PdqHasher::new();
        let mut luma = gradient_luma(120, 90);
        let rv = hasher.hash_luma(&mut luma, 120, 90).unwrap();
        // strictly-above-median leaves at most 128 bits set
        assert!(rv.hash.hamming_norm() <= 128);
        assert!(rv.hash.hamming_norm() > 64);
        assert!(rv.quality <= 100);
    }

    #[test]
    fn hashing_is_deterministic() {
        let hasher = PdqHasher::new();
        let mut a = gradient_luma(77, 150);
        let mut b = a.clone();
        let ha = hasher.hash_luma(&mut a, 77, 150).unwrap();
        let hb = hasher.hash_luma(&mut b, 77, 150).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn dihedral_original_matches_plain_hash() {
        let hasher = PdqHasher::new();
        let mut a = gradient_luma(64, 64);
        let mut b = a.clone();
        let plain = hasher.hash_luma(&mut a, 64, 64).unwrap();
        let all = hasher
            .dihedral_luma(&mut b, 64, 64, Dihedral::ORIGINAL | Dihedral::FLIP_X)
            .unwrap();
        assert_eq!(all.hash, Some(plain.hash));
        assert_eq!(all.quality, plain.quality);
        assert!(all.flip_x.is_some());
        assert!(all.rotate_90.is_none());
        assert_eq!(all.hashes().len(), 2);
    }

    #[test]
    fn quality_counts_gradients() {
        let mut buffer = [[0.0f32; BUFFER_DIM]; BUFFER_DIM];
        for row in buffer.iter_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = if j % 2 == 0 { 0.0 } else { 255.0 };
            }
        }
        // 64 rows x 63 horizontal steps of 100, no vertical change
        assert_eq!(quality_metric(&buffer), 100);

        let mut buffer = [[0.0f32; BUFFER_DIM]; BUFFER_DIM];
        buffer[10][10] = 255.0;
        // four neighbours at 100 each
        assert_eq!(quality_metric(&buffer), 4);
    }
}
