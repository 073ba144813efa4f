use crate::hasher::{BUFFER_DIM, DCT_DIM};

/// The 16x64 partial DCT-II basis, rows 1..=16 of the full 64-point basis.
pub struct DctMatrix {
    rows: [[f32; BUFFER_DIM]; DCT_DIM],
}

impl DctMatrix {
    pub fn new() -> Self {
        let scale = (2.0f64 / 64.0).sqrt() as f32;
        let mut rows = [[0.0f32; BUFFER_DIM]; DCT_DIM];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let angle = (std::f64::consts::PI / 2.0 / 64.0) * (i + 1) as f64 * (2 * j + 1) as f64;
                *cell = (scale as f64 * angle.cos()) as f32;
            }
        }
        Self { rows }
    }

    /// Computes the 16x16 low-frequency corner of the 2-D DCT of `input`,
    /// as `D * A * D^T`.
    pub fn dct64_to_16(
        &self,
        input: &[[f32; BUFFER_DIM]; BUFFER_DIM],
    ) -> [[f32; DCT_DIM]; DCT_DIM] {
        let d = &self.rows;

        let mut t = [[0.0f32; BUFFER_DIM]; DCT_DIM];
        for i in 0..DCT_DIM {
            for j in 0..BUFFER_DIM {
                let mut sumk = 0.0f32;
                for k in 0..BUFFER_DIM {
                    sumk += d[i][k] * input[k][j];
                }
                t[i][j] = sumk;
            }
        }

        let mut out = [[0.0f32; DCT_DIM]; DCT_DIM];
        for i in 0..DCT_DIM {
            for j in 0..DCT_DIM {
                let mut sumk = 0.0f32;
                for k in 0..BUFFER_DIM {
                    sumk += t[i][k] * d[j][k];
                }
                out[i][j] = sumk;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_orthonormal() {
        let m = DctMatrix::new();
        for a in 0..DCT_DIM {
            for b in 0..DCT_DIM {
                let dot: f32 = (0..BUFFER_DIM).map(|k| m.rows[a][k] * m.rows[b][k]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "rows {} {}: {}", a, b, dot);
            }
        }
    }

    #[test]
    fn flat_input_has_no_energy() {
        // every basis row skips the DC term, so a constant image maps to zero
        let m = DctMatrix::new();
        let out = m.dct64_to_16(&[[128.0; BUFFER_DIM]; BUFFER_DIM]);
        for row in out.iter() {
            for v in row.iter() {
                assert!(v.abs() < 0.05);
            }
        }
    }
}
