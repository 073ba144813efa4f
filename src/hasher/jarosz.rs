//! Tent-filter blur by repeated 1-D box filters (Jarosz, "Fast Image
//! Convolutions", SIGGRAPH 2001), followed by decimation to 64x64.

use crate::hasher::BUFFER_DIM;

/// Number of [rows, cols] box-filter pass pairs.
pub const NUM_XY_PASSES: usize = 2;

const WINDOW_SIZE_DIVISOR: usize = 128;

/// Box window for an axis of `dim` samples: half of one 64th, rounded up.
pub fn window_size(dim: usize) -> usize {
    (dim + WINDOW_SIZE_DIVISOR - 1) / WINDOW_SIZE_DIVISOR
}

/// Blurs `buf` (rows x cols, row-major) in place. `tmp` must be the same length.
pub fn filter(
    buf: &mut [f32],
    tmp: &mut [f32],
    rows: usize,
    cols: usize,
    window_along_rows: usize,
    window_along_cols: usize,
    nreps: usize,
) {
    debug_assert_eq!(buf.len(), rows * cols);
    debug_assert_eq!(tmp.len(), buf.len());

    for _ in 0..nreps {
        box_along_rows(buf, tmp, rows, cols, window_along_rows);
        box_along_cols(tmp, buf, rows, cols, window_along_cols);
    }
}

fn box_along_rows(input: &[f32], output: &mut [f32], rows: usize, cols: usize, window: usize) {
    for i in 0..rows {
        box_one_d(input, output, i * cols, cols, 1, window);
    }
}

fn box_along_cols(input: &[f32], output: &mut [f32], rows: usize, cols: usize, window: usize) {
    for j in 0..cols {
        box_one_d(input, output, j, rows, cols, window);
    }
}

/// Sliding mean over one row or column of `len` samples starting at `start`.
///
/// The window is centred, so it shrinks near both ends: phase 1 only
/// accumulates, phase 2 writes while the window grows, phase 3 writes with the
/// full window, phase 4 writes while it shrinks.
#[inline(always)]
fn box_one_d(
    input: &[f32],
    output: &mut [f32],
    start: usize,
    len: usize,
    stride: usize,
    window: usize,
) {
    let half = (window + 2) / 2; // 7->4, 8->5

    let phase1_nreps = half - 1;
    let phase2_nreps = window - half + 1;
    let phase3_nreps = len - window;
    let phase4_nreps = half - 1;

    let mut li = start; // left edge of the window
    let mut ri = start; // right edge of the window
    let mut oi = start; // output index

    let mut sum = 0.0f32;
    let mut current = 0usize;

    for _ in 0..phase1_nreps {
        sum += input[ri];
        current += 1;
        ri += stride;
    }

    for _ in 0..phase2_nreps {
        sum += input[ri];
        current += 1;
        output[oi] = sum / current as f32;
        ri += stride;
        oi += stride;
    }

    for _ in 0..phase3_nreps {
        sum += input[ri];
        sum -= input[li];
        output[oi] = sum / current as f32;
        li += stride;
        ri += stride;
        oi += stride;
    }

    for _ in 0..phase4_nreps {
        sum -= input[li];
        current -= 1;
        output[oi] = sum / current as f32;
        li += stride;
        oi += stride;
    }
}

/// Samples the blurred image at the centres of a 64x64 grid.
pub fn decimate(input: &[f32], rows: usize, cols: usize) -> [[f32; BUFFER_DIM]; BUFFER_DIM] {
    let mut out = [[0.0f32; BUFFER_DIM]; BUFFER_DIM];
    for (i, out_row) in out.iter_mut().enumerate() {
        let ini = centre(i, rows);
        for (j, cell) in out_row.iter_mut().enumerate() {
            let inj = centre(j, cols);
            *cell = input[ini * cols + inj];
        }
    }
    out
}

#[inline]
fn centre(i: usize, n: usize) -> usize {
    (((i as f64 + 0.5) * n as f64) / BUFFER_DIM as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_works() {
        assert_eq!(window_size(1), 1);
        assert_eq!(window_size(64), 1);
        assert_eq!(window_size(128), 1);
        assert_eq!(window_size(129), 2);
        assert_eq!(window_size(1024), 8);
    }

    #[test]
    fn box_preserves_constants() {
        let (rows, cols) = (7, 300);
        let mut buf = vec![42.0f32; rows * cols];
        let mut tmp = vec![0.0f32; rows * cols];
        filter(&mut buf, &mut tmp, rows, cols, window_size(cols), window_size(rows), NUM_XY_PASSES);
        for v in buf {
            assert!((v - 42.0).abs() < 1e-3);
        }
    }

    #[test]
    fn box_one_d_averages_window() {
        let input = [0.0f32, 3.0, 6.0, 9.0, 12.0];
        let mut output = [0.0f32; 5];
        box_one_d(&input, &mut output, 0, 5, 1, 3);
        // half = 2: windows are [0,1], [0..3], [1..4], [2..5], [3,4]
        assert_eq!(output, [1.5, 3.0, 6.0, 9.0, 10.5]);
    }

    #[test]
    fn window_one_is_identity() {
        let input: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let mut output = vec![0.0f32; 10];
        box_one_d(&input, &mut output, 0, 10, 1, 1);
        assert_eq!(input, output);
    }

    #[test]
    fn decimate_picks_centres() {
        let (rows, cols) = (64, 128);
        let input: Vec<f32> = (0..rows * cols).map(|v| v as f32).collect();
        let out = decimate(&input, rows, cols);
        assert_eq!(out[0][0], 1.0);
        assert_eq!(out[1][0], (cols + 1) as f32);
        assert_eq!(out[63][63], (63 * cols + 127) as f32);
    }
}
