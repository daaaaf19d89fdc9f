//! Grid interpolation helpers: bicubic sampling, null filling and
//! resampling.
//!
//! Values at or above the null value never contribute to an interpolated
//! result; a sample that would need one comes back as [`NULL_SAMPLE`].

use crate::error::Result;

/// Returned when a sample would touch a null node.
pub const NULL_SAMPLE: f32 = 1.0e30;

/// Cubic convolution through four equally spaced samples, evaluated between
/// `p1` (t = 0) and `p2` (t = 1).
#[inline]
fn cubic(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    ((a * t + b) * t + c) * t + p1
}

/// A view of a row major grid used for interpolation.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    pub values: &'a [f32],
    pub ncol: usize,
    pub nrow: usize,
    pub null_value: f32,
}

impl<'a> GridView<'a> {
    pub fn new(values: &'a [f32], ncol: usize, nrow: usize, null_value: f32) -> Self {
        Self {
            values,
            ncol,
            nrow,
            null_value,
        }
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.ncol + col]
    }

    /// Node value with linear extrapolation one node past each edge.
    fn extended(&self, row: isize, col: isize) -> Option<f32> {
        let clamp_row = row.clamp(0, self.nrow as isize - 1);
        let clamp_col = col.clamp(0, self.ncol as isize - 1);

        let row_step = if row < 0 {
            1
        } else if row >= self.nrow as isize {
            -1
        } else {
            0
        };
        let col_step = if col < 0 {
            1
        } else if col >= self.ncol as isize {
            -1
        } else {
            0
        };

        let base = self.at(clamp_row as usize, clamp_col as usize);
        if base >= self.null_value {
            return None;
        }
        if row_step == 0 && col_step == 0 {
            return Some(base);
        }

        let inner_row = (clamp_row + row_step).clamp(0, self.nrow as isize - 1);
        let inner_col = (clamp_col + col_step).clamp(0, self.ncol as isize - 1);
        let inner = self.at(inner_row as usize, inner_col as usize);
        if inner >= self.null_value {
            return Some(base);
        }
        Some(2.0 * base - inner)
    }

    /// Bilinear sample inside cell (`row`, `col`) at local fractions
    /// `tx`, `ty`.
    pub fn bilinear_in_cell(&self, row: usize, col: usize, tx: f32, ty: f32) -> f32 {
        let row = row.min(self.nrow - 2);
        let col = col.min(self.ncol - 2);
        let z00 = self.at(row, col);
        let z10 = self.at(row, col + 1);
        let z01 = self.at(row + 1, col);
        let z11 = self.at(row + 1, col + 1);
        if [z00, z10, z01, z11].iter().any(|&z| z >= self.null_value) {
            return NULL_SAMPLE;
        }
        let bottom = z00 + (z10 - z00) * tx;
        let top = z01 + (z11 - z01) * tx;
        bottom + (top - bottom) * ty
    }

    /// Bicubic sample anchored on cell (`row`, `col`). The local fractions
    /// may reach slightly outside [0, 1] to sample a margin around the
    /// cell. Grids smaller than 4x4 fall back to bilinear.
    pub fn bicubic_in_cell(&self, row: usize, col: usize, tx: f32, ty: f32) -> f32 {
        if self.ncol < 4 || self.nrow < 4 {
            return self.bilinear_in_cell(row, col, tx, ty);
        }

        let row = row.min(self.nrow - 2) as isize;
        let col = col.min(self.ncol - 2) as isize;

        let mut columns = [0.0_f32; 4];
        for (n, dr) in (-1..=2).enumerate() {
            let mut p = [0.0_f32; 4];
            for (m, dc) in (-1..=2).enumerate() {
                match self.extended(row + dr, col + dc) {
                    Some(z) => p[m] = z,
                    None => return self.bilinear_in_cell(row as usize, col as usize, tx, ty),
                }
            }
            columns[n] = cubic(p[0], p[1], p[2], p[3], tx);
        }
        cubic(columns[0], columns[1], columns[2], columns[3], ty)
    }

    /// Bicubic sample at fractional node coordinates.
    pub fn bicubic(&self, fcol: f32, frow: f32) -> f32 {
        let col = (fcol.max(0.0) as usize).min(self.ncol - 2);
        let row = (frow.max(0.0) as usize).min(self.nrow - 2);
        self.bicubic_in_cell(row, col, fcol - col as f32, frow - row as f32)
    }
}

/// Copy of `values` with null nodes filled from their neighbours.
///
/// Each pass sets every null node that touches at least one filled node to
/// the mean of those neighbours. An all-null grid is returned unchanged.
pub fn fill_nulls(values: &[f32], ncol: usize, nrow: usize, null_value: f32) -> Result<Vec<f32>> {
    let mut filled = Vec::new();
    filled.try_reserve_exact(values.len())?;
    filled.extend_from_slice(values);

    let mut pending: Vec<usize> = (0..values.len())
        .filter(|&k| values[k] >= null_value)
        .collect();

    while !pending.is_empty() {
        let mut updates: Vec<(usize, f32)> = Vec::new();
        for &k in &pending {
            let row = k / ncol;
            let col = k % ncol;
            let mut sum = 0.0_f32;
            let mut count = 0;
            let mut visit = |r: usize, c: usize| {
                let z = filled[r * ncol + c];
                if z < null_value {
                    sum += z;
                    count += 1;
                }
            };
            if row > 0 {
                visit(row - 1, col);
            }
            if row + 1 < nrow {
                visit(row + 1, col);
            }
            if col > 0 {
                visit(row, col - 1);
            }
            if col + 1 < ncol {
                visit(row, col + 1);
            }
            if count > 0 {
                updates.push((k, sum / count as f32));
            }
        }

        if updates.is_empty() {
            break;
        }
        for &(k, z) in &updates {
            filled[k] = z;
        }
        pending.retain(|&k| filled[k] >= null_value);
    }

    Ok(filled)
}

/// Resample a grid onto `dst_ncol` x `dst_nrow` nodes over the same bounds.
///
/// Nodes whose source cell touches a null stay null.
///
/// # Arguments
/// - `view`: Source grid
/// - `dst_ncol`: Destination column count (at least 2)
/// - `dst_nrow`: Destination row count (at least 2)
///
/// # Returns
/// Resampled values in row major order
pub fn resample_grid(view: &GridView<'_>, dst_ncol: usize, dst_nrow: usize) -> Result<Vec<f32>> {
    let mut output = Vec::new();
    output.try_reserve_exact(dst_ncol * dst_nrow)?;

    if view.ncol == dst_ncol && view.nrow == dst_nrow {
        output.extend_from_slice(view.values);
        return Ok(output);
    }

    let x_ratio = (view.ncol - 1) as f32 / (dst_ncol - 1) as f32;
    let y_ratio = (view.nrow - 1) as f32 / (dst_nrow - 1) as f32;

    for i in 0..dst_nrow {
        for j in 0..dst_ncol {
            let z = view.bicubic(j as f32 * x_ratio, i as f32 * y_ratio);
            output.push(if z >= NULL_SAMPLE { view.null_value } else { z });
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(ncol: usize, nrow: usize) -> Vec<f32> {
        let mut v = Vec::new();
        for i in 0..nrow {
            for j in 0..ncol {
                v.push(2.0 * j as f32 + 3.0 * i as f32);
            }
        }
        v
    }

    #[test]
    fn test_bicubic_reproduces_plane() {
        let values = plane(6, 5);
        let view = GridView::new(&values, 6, 5, 1.0e28);
        for &(fx, fy) in &[(0.0, 0.0), (2.5, 1.5), (4.9, 3.2), (5.0, 4.0), (0.3, 3.7)] {
            let z = view.bicubic(fx, fy);
            assert!((z - (2.0 * fx + 3.0 * fy)).abs() < 1.0e-4, "z({fx},{fy}) = {z}");
        }
    }

    #[test]
    fn test_bicubic_hits_nodes() {
        let values: Vec<f32> = (0..25).map(|k| ((k * 7) % 11) as f32).collect();
        let view = GridView::new(&values, 5, 5, 1.0e28);
        assert!((view.bicubic(2.0, 3.0) - values[3 * 5 + 2]).abs() < 1.0e-5);
        assert!((view.bicubic(4.0, 4.0) - values[24]).abs() < 1.0e-5);
    }

    #[test]
    fn test_small_grid_falls_back_to_bilinear() {
        let values = vec![0.0, 1.0, 2.0, 3.0];
        let view = GridView::new(&values, 2, 2, 1.0e28);
        assert!((view.bicubic(0.5, 0.5) - 1.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_null_cell_gives_null_sample() {
        let mut values = plane(4, 4);
        values[5] = 1.0e28;
        let view = GridView::new(&values, 4, 4, 1.0e28);
        assert_eq!(view.bicubic(0.5, 0.5), NULL_SAMPLE);
    }

    #[test]
    fn test_fill_nulls() {
        let null = 1.0e28;
        let values = vec![1.0, null, 3.0, null, null, null, 7.0, null, 9.0];
        let filled = fill_nulls(&values, 3, 3, null).unwrap();
        assert_eq!(filled[1], 2.0);
        assert_eq!(filled[3], 4.0);
        assert!(filled.iter().all(|&z| z < null));

        let all_null = vec![null; 4];
        assert_eq!(fill_nulls(&all_null, 2, 2, null).unwrap(), all_null);
    }

    #[test]
    fn test_resample_grid_keeps_plane_and_corners() {
        let values = plane(4, 4);
        let view = GridView::new(&values, 4, 4, 1.0e28);
        let out = resample_grid(&view, 7, 7).unwrap();
        assert_eq!(out.len(), 49);
        assert!((out[0] - values[0]).abs() < 1.0e-5);
        assert!((out[48] - values[15]).abs() < 1.0e-4);
        assert!((out[7 * 3 + 3] - (2.0 * 1.5 + 3.0 * 1.5)).abs() < 1.0e-4);
    }
}
