//! Grid input and the working copy prepared for tracing.

use serde::{Deserialize, Serialize};

use crate::config::{MAX_NODES, SENTINEL_LIMIT};
use crate::error::{ContourError, Result};
use crate::interp::{resample_grid, GridView};

/// A point in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Marker separating runs inside a point buffer.
    pub const BREAK: Point = Point {
        x: 1.0e30,
        y: 1.0e30,
    };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_break(&self) -> bool {
        self.x > SENTINEL_LIMIT || self.y > SENTINEL_LIMIT
    }

    /// Both coordinates within `tolerance` of `other`.
    pub fn same_as(&self, other: &Point, tolerance: f32) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }

    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

fn default_null() -> Option<f32> {
    None
}

/// A rectangular grid of scalar samples, row 0 at `ymin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub ncol: usize,
    pub nrow: usize,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    /// Row major samples, `ncol * nrow` of them.
    pub values: Vec<f32>,
    /// Null sentinel for this grid. Falls back to the option value.
    #[serde(default = "default_null")]
    pub null_value: Option<f32>,
}

impl Grid {
    pub fn new(
        ncol: usize,
        nrow: usize,
        xmin: f32,
        ymin: f32,
        xmax: f32,
        ymax: f32,
        values: Vec<f32>,
    ) -> Self {
        Self {
            ncol,
            nrow,
            xmin,
            ymin,
            xmax,
            ymax,
            values,
            null_value: None,
        }
    }

    /// Build a grid by sampling `f(x, y)` at every node.
    pub fn from_fn<F>(
        ncol: usize,
        nrow: usize,
        xmin: f32,
        ymin: f32,
        xmax: f32,
        ymax: f32,
        f: F,
    ) -> Self
    where
        F: Fn(f32, f32) -> f32,
    {
        let geometry = GridGeometry::new(ncol.max(2), nrow.max(2), xmin, ymin, xmax, ymax);
        let mut values = Vec::with_capacity(ncol * nrow);
        for i in 0..nrow {
            for j in 0..ncol {
                let p = geometry.node_point(i * ncol + j);
                values.push(f(p.x, p.y));
            }
        }
        Self::new(ncol, nrow, xmin, ymin, xmax, ymax, values)
    }

    pub fn with_null_value(mut self, null_value: f32) -> Self {
        self.null_value = Some(null_value);
        self
    }

    /// Reject dimensions, bounds or buffers that cannot describe a grid.
    pub fn validate(&self) -> Result<()> {
        if self.ncol < 2 || self.nrow < 2 {
            return Err(ContourError::validation(format!(
                "grid must have at least 2 columns and rows, got {}x{}",
                self.ncol, self.nrow
            )));
        }
        let nodes = self
            .ncol
            .checked_mul(self.nrow)
            .filter(|&n| n <= MAX_NODES)
            .ok_or_else(|| {
                ContourError::validation(format!(
                    "grid of {}x{} exceeds {} nodes",
                    self.ncol, self.nrow, MAX_NODES
                ))
            })?;
        if self.values.len() != nodes {
            return Err(ContourError::validation(format!(
                "expected {} values, got {}",
                nodes,
                self.values.len()
            )));
        }

        let bounds = [self.xmin, self.ymin, self.xmax, self.ymax];
        if bounds
            .iter()
            .any(|b| !b.is_finite() || b.abs() > SENTINEL_LIMIT)
        {
            return Err(ContourError::validation("grid bounds must be finite"));
        }
        if self.xmin >= self.xmax || self.ymin >= self.ymax {
            return Err(ContourError::validation(format!(
                "empty bounds ({}, {}) - ({}, {})",
                self.xmin, self.ymin, self.xmax, self.ymax
            )));
        }
        if self.values.iter().any(|v| v.is_nan()) {
            return Err(ContourError::validation("grid values must not be NaN"));
        }

        Ok(())
    }

    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(
            self.ncol, self.nrow, self.xmin, self.ymin, self.xmax, self.ymax,
        )
    }
}

/// Dimensions, bounds and spacing of a grid.
///
/// Node `k = row * ncol + col`. Cell `k` has node `k` as its lower left
/// corner; its bottom edge is horizontal edge `k` and its left edge is
/// vertical edge `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub ncol: usize,
    pub nrow: usize,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub xspace: f32,
    pub yspace: f32,
}

impl GridGeometry {
    pub fn new(ncol: usize, nrow: usize, xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            ncol,
            nrow,
            xmin,
            ymin,
            xmax,
            ymax,
            xspace: (xmax - xmin) / (ncol - 1) as f32,
            yspace: (ymax - ymin) / (nrow - 1) as f32,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.ncol * self.nrow
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.ncol + col
    }

    pub fn node_point(&self, k: usize) -> Point {
        let row = k / self.ncol;
        let col = k % self.ncol;
        Point::new(
            self.xmin + col as f32 * self.xspace,
            self.ymin + row as f32 * self.yspace,
        )
    }

    /// True when (`row`, `col`) names a cell, not just a node.
    pub fn has_cell(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.nrow - 1 && (col as usize) < self.ncol - 1
    }

    /// Lower left and upper right corners of cell `k`.
    pub fn cell_bounds(&self, k: usize) -> (Point, Point) {
        let low = self.node_point(k);
        (
            low,
            Point::new(low.x + self.xspace, low.y + self.yspace),
        )
    }

    /// Corners of cell `k` counterclockwise from the lower left.
    pub fn cell_corners(&self, k: usize) -> [Point; 4] {
        let (low, high) = self.cell_bounds(k);
        [
            low,
            Point::new(high.x, low.y),
            high,
            Point::new(low.x, high.y),
        ]
    }

    /// Node indices of cell `k` counterclockwise from the lower left.
    #[inline]
    pub fn cell_nodes(&self, k: usize) -> [usize; 4] {
        [k, k + 1, k + 1 + self.ncol, k + self.ncol]
    }
}

/// Mutable copy of the input that preprocessing reshapes before tracing.
#[derive(Debug, Clone)]
pub struct WorkGrid {
    pub geometry: GridGeometry,
    pub values: Vec<f32>,
    /// Positive null sentinel; nodes at or above it are null.
    pub null: f32,
}

impl WorkGrid {
    /// Copy `grid`, with `null_value` as its sentinel. A negative sentinel
    /// marks nulls from below; those nodes are flipped so every null ends
    /// up above a positive sentinel.
    pub fn from_grid(grid: &Grid, null_value: f32) -> Result<Self> {
        let mut values = Vec::new();
        values.try_reserve_exact(grid.values.len())?;
        values.extend_from_slice(&grid.values);

        let mut work = Self {
            geometry: grid.geometry(),
            values,
            null: null_value,
        };
        if work.null < 0.0 {
            let null = work.null;
            for z in work.values.iter_mut().filter(|z| **z <= null) {
                *z = -*z;
            }
            work.null = -null;
        }
        Ok(work)
    }

    #[inline]
    pub fn is_null(&self, z: f32) -> bool {
        z >= self.null
    }

    /// Fraction of non-null nodes, raised to the fourth power.
    pub fn non_null_ratio(&self) -> f32 {
        let total = self.values.len() as f32;
        let good = self.values.iter().filter(|&&z| !self.is_null(z)).count() as f32;
        (good / total).powi(4)
    }

    /// Crop rows and columns along the border that hold only nulls.
    pub fn remove_null_border(&mut self) -> Result<()> {
        let g = self.geometry;
        let znull = self.null.abs() / 100.0;
        let good = |z: f32| z >= -znull && z <= znull;

        let Some(first) = self.values.iter().position(|&z| good(z)) else {
            return Ok(());
        };
        let Some(last) = self.values.iter().rposition(|&z| good(z)) else {
            return Ok(());
        };
        let bottom = first / g.ncol;
        let top = last / g.ncol;

        let column_has_data = |j: usize| (0..g.nrow).any(|i| good(self.values[i * g.ncol + j]));
        let Some(left) = (0..g.ncol).find(|&j| column_has_data(j)) else {
            return Ok(());
        };
        let Some(right) = (0..g.ncol).rev().find(|&j| column_has_data(j)) else {
            return Ok(());
        };

        if left == 0 && bottom == 0 && right == g.ncol - 1 && top == g.nrow - 1 {
            return Ok(());
        }

        let ncol = right - left + 1;
        let nrow = top - bottom + 1;
        if ncol < 2 || nrow < 2 {
            return Ok(());
        }

        let mut cropped = Vec::new();
        cropped.try_reserve_exact(ncol * nrow)?;
        for i in bottom..=top {
            let offset = i * g.ncol;
            cropped.extend_from_slice(&self.values[offset + left..=offset + right]);
        }

        let xmin = g.xmin + left as f32 * g.xspace;
        let ymin = g.ymin + bottom as f32 * g.yspace;
        self.geometry = GridGeometry::new(
            ncol,
            nrow,
            xmin,
            ymin,
            xmin + (ncol - 1) as f32 * g.xspace,
            ymin + (nrow - 1) as f32 * g.yspace,
        );
        self.values = cropped;

        tracing::debug!(ncol, nrow, "cropped null border");
        Ok(())
    }

    /// Non-null value range. Fails when the range is too small relative
    /// to the magnitude of the values for single precision tracing.
    pub fn value_range(&self) -> Result<(f32, f32)> {
        let limit = (self.null.abs() / 100.0).max(1.0e10);
        let mut v1 = 1.0e30_f32;
        let mut v2 = -1.0e30_f32;
        for &z in self.values.iter().filter(|z| z.abs() <= limit) {
            v1 = v1.min(z);
            v2 = v2.max(z);
        }

        let range = v2 as f64 - v1 as f64;
        let mid = ((v1 as f64 + v2 as f64) / 2.0).abs();
        if mid >= 50000.0 * range {
            return Err(ContourError::degenerate(format!(
                "value range {} is too small for values near {}",
                range.max(0.0),
                mid
            )));
        }
        Ok((v1, v2))
    }

    /// Shift the values down when their range is tiny relative to their
    /// magnitude. Returns the amount subtracted, zero when unshifted.
    pub fn shift_for_precision(&mut self, interval: f32) -> f64 {
        let mut d1 = 1.0e30_f64;
        let mut d2 = -1.0e30_f64;
        for &z in self.values.iter().filter(|&&z| z < self.null) {
            d1 = d1.min(z as f64);
            d2 = d2.max(z as f64);
        }
        if d2 < d1 {
            return 0.0;
        }

        let range = d2 - d1;
        let mid = (d1 + range / 2.0).abs();
        if range > mid / 100.0 || range <= 0.0 {
            return 0.0;
        }

        let decade = 10.0_f64.powi(range.log10() as i32 + 1);
        let mut shift = (d1 / decade).trunc() * decade;
        while shift >= d1 {
            shift -= decade;
        }

        if interval > 0.0 {
            let interval = interval as f64;
            shift = (shift / interval).trunc() * interval;
            while shift >= d1 {
                shift -= interval;
            }
        }

        let null = self.null;
        for z in self.values.iter_mut().filter(|z| **z < null) {
            *z = (*z as f64 - shift) as f32;
        }

        tracing::debug!(shift, "shifted grid values for precision");
        shift
    }

    /// Replace every non-null value by its logarithm in `base`.
    pub fn convert_to_log(&mut self, base: f32) -> Result<()> {
        let ln_base = (base as f64).ln();
        let null = self.null;
        for z in self.values.iter_mut().filter(|z| **z < null) {
            if *z <= 0.0 {
                return Err(ContourError::degenerate(format!(
                    "cannot take the logarithm of {}",
                    z
                )));
            }
            *z = ((*z as f64).ln() / ln_base) as f32;
        }
        Ok(())
    }

    /// Flatten values above `plateau` down to it and raise values below
    /// `valley` up to it. Either bound may be disabled with `None`.
    pub fn clip_values(&mut self, plateau: Option<f32>, valley: Option<f32>) {
        let null = self.null;
        for z in self.values.iter_mut().filter(|z| **z < null) {
            if let Some(top) = plateau {
                if *z > top {
                    *z = top;
                }
            }
            if let Some(base) = valley {
                if *z < base {
                    *z = base;
                }
            }
        }
    }

    /// Resample onto `ncol` x `nrow` nodes over the same bounds.
    pub fn resample(&mut self, ncol: usize, nrow: usize) -> Result<()> {
        let g = self.geometry;
        if ncol == g.ncol && nrow == g.nrow {
            return Ok(());
        }
        let view = GridView::new(&self.values, g.ncol, g.nrow, self.null);
        self.values = resample_grid(&view, ncol, nrow)?;
        self.geometry = GridGeometry::new(ncol, nrow, g.xmin, g.ymin, g.xmax, g.ymax);
        tracing::debug!(from_ncol = g.ncol, from_nrow = g.nrow, ncol, nrow, "resampled grid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NULL: f32 = 1.0e28;

    #[test]
    fn test_grid_validation() {
        let ok = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0; 4]);
        assert!(ok.validate().is_ok());

        let narrow = Grid::new(1, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0; 2]);
        assert!(matches!(narrow.validate(), Err(ContourError::Validation(_))));

        let short = Grid::new(3, 3, 0.0, 0.0, 1.0, 1.0, vec![0.0; 8]);
        assert!(short.validate().is_err());

        let flipped = Grid::new(2, 2, 1.0, 0.0, 0.0, 1.0, vec![0.0; 4]);
        assert!(flipped.validate().is_err());

        let nan = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0, f32::NAN, 0.0, 0.0]);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_geometry_helpers() {
        let g = GridGeometry::new(4, 3, 0.0, 10.0, 6.0, 14.0);
        assert_eq!(g.xspace, 2.0);
        assert_eq!(g.yspace, 2.0);
        assert_eq!(g.node_point(5), Point::new(2.0, 12.0));
        assert_eq!(g.cell_nodes(5), [5, 6, 10, 9]);
        assert!(g.has_cell(1, 2));
        assert!(!g.has_cell(2, 0));
        assert!(!g.has_cell(0, -1));
        let (low, high) = g.cell_bounds(0);
        assert_eq!(low, Point::new(0.0, 10.0));
        assert_eq!(high, Point::new(2.0, 12.0));
    }

    #[test]
    fn test_negative_null_is_flipped() {
        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![1.0, -1.0e28, 2.0, 3.0]);
        let work = WorkGrid::from_grid(&grid, -1.0e28).unwrap();
        assert_eq!(work.null, 1.0e28);
        assert!(work.is_null(work.values[1]));
        assert!(!work.is_null(work.values[0]));
    }

    #[test]
    fn test_remove_null_border() {
        #[rustfmt::skip]
        let values = vec![
            NULL, NULL, NULL, NULL,
            NULL, 1.0,  2.0,  NULL,
            NULL, 3.0,  4.0,  NULL,
            NULL, NULL, NULL, NULL,
        ];
        let grid = Grid::new(4, 4, 0.0, 0.0, 3.0, 3.0, values);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        work.remove_null_border().unwrap();
        assert_eq!(work.geometry.ncol, 2);
        assert_eq!(work.geometry.nrow, 2);
        assert_eq!(work.geometry.xmin, 1.0);
        assert_eq!(work.geometry.ymax, 2.0);
        assert_eq!(work.values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_value_range_rejects_flat_offsets() {
        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![1.0e6, 1.0e6, 1.0e6, 1.0e6 + 1.0]);
        let work = WorkGrid::from_grid(&grid, NULL).unwrap();
        assert!(matches!(work.value_range(), Err(ContourError::DegenerateInput(_))));

        let all_null = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![NULL; 4]);
        let work = WorkGrid::from_grid(&all_null, NULL).unwrap();
        assert!(work.value_range().is_err());

        let fine = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0, 1.0, 2.0, 3.0]);
        let work = WorkGrid::from_grid(&fine, NULL).unwrap();
        assert_eq!(work.value_range().unwrap(), (0.0, 3.0));
    }

    #[test]
    fn test_shift_for_precision() {
        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![5000.0, 5001.0, 5002.0, 5003.0]);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        let shift = work.shift_for_precision(-1.0);
        assert_eq!(shift, 4990.0);
        assert_eq!(work.values, vec![10.0, 11.0, 12.0, 13.0]);

        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0, 1.0, 2.0, 3.0]);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        assert_eq!(work.shift_for_precision(-1.0), 0.0);
    }

    #[test]
    fn test_convert_to_log() {
        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![1.0, 10.0, 100.0, NULL]);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        work.convert_to_log(10.0).unwrap();
        assert!((work.values[1] - 1.0).abs() < 1.0e-6);
        assert!((work.values[2] - 2.0).abs() < 1.0e-6);
        assert_eq!(work.values[3], NULL);

        let bad = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![1.0, 0.0, 1.0, 1.0]);
        let mut work = WorkGrid::from_grid(&bad, NULL).unwrap();
        assert!(matches!(work.convert_to_log(10.0), Err(ContourError::DegenerateInput(_))));
    }

    #[test]
    fn test_clip_values() {
        let grid = Grid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![-5.0, 1.0, 9.0, NULL]);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        work.clip_values(Some(8.0), Some(0.0));
        assert_eq!(work.values, vec![0.0, 1.0, 8.0, NULL]);
    }

    #[test]
    fn test_resample_keeps_bounds() {
        let grid = Grid::from_fn(3, 3, 0.0, 0.0, 2.0, 2.0, |x, y| x + y);
        let mut work = WorkGrid::from_grid(&grid, NULL).unwrap();
        work.resample(5, 5).unwrap();
        assert_eq!(work.geometry.ncol, 5);
        assert_eq!(work.geometry.xspace, 0.5);
        assert!((work.values[12] - 2.0).abs() < 1.0e-5);
    }
}
