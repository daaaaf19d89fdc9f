//! Fault lines: discontinuities that contours end against.
//!
//! The tracer never looks at fault geometry directly. It asks a
//! [`FaultOracle`] which cells and edges a fault touches, how to value a
//! cell's corners from one side of a fault, and where a path through a cell
//! meets one.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{GridGeometry, Point};

/// Corners of one cell, counterclockwise from the lower left, plus the
/// point the contour is approaching from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCorners {
    pub cell: usize,
    pub points: [Point; 4],
    pub values: [f32; 4],
    pub reference: Point,
}

/// Answers fault queries against a grid.
///
/// Nodes and cells are indexed as in [`GridGeometry`].
pub trait FaultOracle: Send + Sync {
    /// Does any fault pass through cell `cell`?
    fn has_fault_crossing(&self, geometry: &GridGeometry, cell: usize) -> bool;

    /// Corner values of a fault cell as seen from `corners.reference`.
    /// Corners across a fault take values from the reference side.
    fn interpolate_corners(&self, geometry: &GridGeometry, corners: &CellCorners) -> [f32; 4];

    /// Where the straight path `entry` to `exit` inside `cell` meets a
    /// fault, if it does.
    fn find_fault_intersection(
        &self,
        geometry: &GridGeometry,
        entry: Point,
        exit: Point,
        cell: usize,
    ) -> Option<Point>;

    /// End point of a fault line that lies inside `cell`.
    fn fault_end_point(&self, geometry: &GridGeometry, cell: usize) -> Option<Point>;

    /// Does a fault cross the horizontal edge from `node` to `node + 1`?
    fn blocks_horizontal_edge(&self, _geometry: &GridGeometry, _node: usize) -> bool {
        false
    }

    /// Does a fault cross the vertical edge from `node` to `node + ncol`?
    fn blocks_vertical_edge(&self, _geometry: &GridGeometry, _node: usize) -> bool {
        false
    }

    /// Does a fault pass through `node` itself?
    fn grazes_node(&self, _geometry: &GridGeometry, _node: usize) -> bool {
        false
    }

    /// Distance in cells from `cell` to the nearest fault cell, when one is
    /// within a few cells.
    fn closest_fault_cells(&self, _geometry: &GridGeometry, _cell: usize) -> Option<u32> {
        None
    }

    /// False when the oracle cannot answer queries; fault handling is then
    /// switched off for the run.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Oracle for an unfaulted surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultOracle for NoFaults {
    fn has_fault_crossing(&self, _geometry: &GridGeometry, _cell: usize) -> bool {
        false
    }

    fn interpolate_corners(&self, _geometry: &GridGeometry, corners: &CellCorners) -> [f32; 4] {
        corners.values
    }

    fn find_fault_intersection(
        &self,
        _geometry: &GridGeometry,
        _entry: Point,
        _exit: Point,
        _cell: usize,
    ) -> Option<Point> {
        None
    }

    fn fault_end_point(&self, _geometry: &GridGeometry, _cell: usize) -> Option<Point> {
        None
    }
}

/// A straight fault segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultSegment {
    pub start: Point,
    pub end: Point,
}

/// Faults given as polylines in grid coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineFaults {
    segments: Vec<FaultSegment>,
    /// Free ends of each polyline. Interior vertices are not ends.
    ends: Vec<Point>,
}

/// Cells searched around a cell by `closest_fault_cells`.
const FAULT_SEARCH_RADIUS: usize = 3;

impl LineFaults {
    pub fn new(lines: &[Vec<Point>]) -> Self {
        let mut faults = Self::default();
        for line in lines {
            faults.push_line(line);
        }
        faults
    }

    pub fn push_line(&mut self, line: &[Point]) {
        if line.len() < 2 {
            return;
        }
        for pair in line.windows(2) {
            self.segments.push(FaultSegment {
                start: pair[0],
                end: pair[1],
            });
        }
        let first = line[0];
        let last = line[line.len() - 1];
        // a closed polygon has no free ends
        if first != last {
            self.ends.push(first);
            self.ends.push(last);
        }
    }

    pub fn segments(&self) -> &[FaultSegment] {
        &self.segments
    }

    fn crosses_segment(&self, a: Point, b: Point) -> bool {
        self.segments
            .iter()
            .any(|s| segment_intersection(a, b, s.start, s.end).is_some())
    }

    fn touches_rect(&self, low: Point, high: Point) -> bool {
        let corners = [
            low,
            Point::new(high.x, low.y),
            high,
            Point::new(low.x, high.y),
        ];
        self.segments.iter().any(|s| {
            inside_rect(s.start, low, high)
                || inside_rect(s.end, low, high)
                || (0..4).any(|i| {
                    segment_intersection(s.start, s.end, corners[i], corners[(i + 1) % 4])
                        .is_some()
                })
        })
    }
}

impl FaultOracle for LineFaults {
    fn has_fault_crossing(&self, geometry: &GridGeometry, cell: usize) -> bool {
        let (low, high) = geometry.cell_bounds(cell);
        self.touches_rect(low, high)
    }

    fn interpolate_corners(&self, _geometry: &GridGeometry, corners: &CellCorners) -> [f32; 4] {
        let reference = corners.reference;
        let separated: Vec<bool> = corners
            .points
            .iter()
            .map(|&p| self.crosses_segment(reference, p))
            .collect();

        let mut values = corners.values;
        for i in 0..4 {
            if !separated[i] {
                continue;
            }
            let here = corners.points[i];
            let candidates = (0..4).filter(|&j| !separated[j]);
            // same row first, then same column, then whatever is nearest
            let best = candidates.min_by(|&a, &b| {
                let rank = |j: usize| {
                    let p = corners.points[j];
                    let tier = if p.y == here.y {
                        0
                    } else if p.x == here.x {
                        1
                    } else {
                        2
                    };
                    (tier, p.distance_squared(&here))
                };
                let (ta, da) = rank(a);
                let (tb, db) = rank(b);
                ta.cmp(&tb).then(da.total_cmp(&db))
            });
            if let Some(j) = best {
                values[i] = corners.values[j];
            }
        }
        values
    }

    fn find_fault_intersection(
        &self,
        _geometry: &GridGeometry,
        entry: Point,
        exit: Point,
        _cell: usize,
    ) -> Option<Point> {
        self.segments
            .iter()
            .filter_map(|s| segment_intersection(entry, exit, s.start, s.end))
            .min_by(|a, b| {
                a.distance_squared(&entry)
                    .total_cmp(&b.distance_squared(&entry))
            })
    }

    fn fault_end_point(&self, geometry: &GridGeometry, cell: usize) -> Option<Point> {
        let (low, high) = geometry.cell_bounds(cell);
        self.ends
            .iter()
            .copied()
            .find(|&p| p.x > low.x && p.x < high.x && p.y > low.y && p.y < high.y)
    }

    fn blocks_horizontal_edge(&self, geometry: &GridGeometry, node: usize) -> bool {
        if node % geometry.ncol + 1 >= geometry.ncol {
            return false;
        }
        self.crosses_segment(geometry.node_point(node), geometry.node_point(node + 1))
    }

    fn blocks_vertical_edge(&self, geometry: &GridGeometry, node: usize) -> bool {
        if node + geometry.ncol >= geometry.node_count() {
            return false;
        }
        self.crosses_segment(
            geometry.node_point(node),
            geometry.node_point(node + geometry.ncol),
        )
    }

    fn grazes_node(&self, geometry: &GridGeometry, node: usize) -> bool {
        let p = geometry.node_point(node);
        let tolerance = (geometry.xspace + geometry.yspace) / 2000.0;
        self.segments
            .iter()
            .any(|s| distance_to_segment(p, s.start, s.end) < tolerance)
    }

    fn closest_fault_cells(&self, geometry: &GridGeometry, cell: usize) -> Option<u32> {
        let ncell = geometry.ncol - 1;
        let nrow = geometry.nrow - 1;
        let row = cell / geometry.ncol;
        let col = cell % geometry.ncol;
        for radius in 0..=FAULT_SEARCH_RADIUS {
            let r0 = row.saturating_sub(radius);
            let r1 = (row + radius).min(nrow - 1);
            let c0 = col.saturating_sub(radius);
            let c1 = (col + radius).min(ncell - 1);
            for r in r0..=r1 {
                for c in c0..=c1 {
                    let on_ring = r.abs_diff(row) == radius || c.abs_diff(col) == radius;
                    if on_ring && self.has_fault_crossing(geometry, r * geometry.ncol + c) {
                        return Some(radius as u32);
                    }
                }
            }
        }
        None
    }

    fn is_ready(&self) -> bool {
        !self.segments.is_empty()
    }
}

fn inside_rect(p: Point, low: Point, high: Point) -> bool {
    p.x >= low.x && p.x <= high.x && p.y >= low.y && p.y <= high.y
}

/// Intersection of segments `a`-`b` and `c`-`d`, endpoints included.
/// Parallel segments never intersect.
pub fn segment_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (rx, ry) = (b.x as f64 - ax, b.y as f64 - ay);
    let (sx, sy) = (d.x as f64 - c.x as f64, d.y as f64 - c.y as f64);
    let denom = rx * sy - ry * sx;
    if denom.abs() < 1.0e-12 {
        return None;
    }
    let qx = c.x as f64 - ax;
    let qy = c.y as f64 - ay;
    let t = (qx * sy - qy * sx) / denom;
    let u = (qx * ry - qy * rx) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(Point::new((ax + t * rx) as f32, (ay + t * ry) as f32))
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let q = Point::new(a.x + t * dx, a.y + t * dy);
    p.distance_squared(&q).sqrt()
}

/// Per-grid answers from an oracle, computed once before tracing.
pub(crate) struct FaultCells<'a> {
    oracle: &'a dyn FaultOracle,
    geometry: GridGeometry,
    crossing: Vec<bool>,
    horizontal_blocked: Vec<bool>,
    vertical_blocked: Vec<bool>,
    grazed: Vec<bool>,
}

impl<'a> FaultCells<'a> {
    pub fn build(oracle: &'a dyn FaultOracle, geometry: GridGeometry) -> Result<Self> {
        let n = geometry.node_count();
        let mut crossing = Vec::new();
        crossing.try_reserve_exact(n)?;
        let mut horizontal_blocked = Vec::new();
        horizontal_blocked.try_reserve_exact(n)?;
        let mut vertical_blocked = Vec::new();
        vertical_blocked.try_reserve_exact(n)?;
        let mut grazed = Vec::new();
        grazed.try_reserve_exact(n)?;

        for k in 0..n {
            let row = k / geometry.ncol;
            let col = k % geometry.ncol;
            let is_cell = row + 1 < geometry.nrow && col + 1 < geometry.ncol;
            crossing.push(is_cell && oracle.has_fault_crossing(&geometry, k));
            horizontal_blocked.push(oracle.blocks_horizontal_edge(&geometry, k));
            vertical_blocked.push(oracle.blocks_vertical_edge(&geometry, k));
            grazed.push(oracle.grazes_node(&geometry, k));
        }

        let fault_cells = crossing.iter().filter(|&&c| c).count();
        tracing::debug!(fault_cells, "built fault cell index");

        Ok(Self {
            oracle,
            geometry,
            crossing,
            horizontal_blocked,
            vertical_blocked,
            grazed,
        })
    }

    #[inline]
    pub fn crosses(&self, cell: usize) -> bool {
        self.crossing[cell]
    }

    #[inline]
    pub fn horizontal_blocked(&self, node: usize) -> bool {
        self.horizontal_blocked[node]
    }

    #[inline]
    pub fn vertical_blocked(&self, node: usize) -> bool {
        self.vertical_blocked[node]
    }

    #[inline]
    pub fn grazed(&self, node: usize) -> bool {
        self.grazed[node]
    }

    /// Corner values of `cell` seen from `reference`.
    pub fn corner_values(&self, cell: usize, values: [f32; 4], reference: Point) -> [f32; 4] {
        let corners = CellCorners {
            cell,
            points: self.geometry.cell_corners(cell),
            values,
            reference,
        };
        self.oracle.interpolate_corners(&self.geometry, &corners)
    }

    pub fn intersection(&self, entry: Point, exit: Point, cell: usize) -> Option<Point> {
        self.oracle
            .find_fault_intersection(&self.geometry, entry, exit, cell)
    }

    pub fn end_point(&self, cell: usize) -> Option<Point> {
        self.oracle.fault_end_point(&self.geometry, cell)
    }

    pub fn closest(&self, cell: usize) -> Option<u32> {
        self.oracle.closest_fault_cells(&self.geometry, cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GridGeometry {
        GridGeometry::new(6, 4, 0.0, 0.0, 5.0, 3.0)
    }

    fn vertical_fault() -> LineFaults {
        LineFaults::new(&[vec![Point::new(2.5, -1.0), Point::new(2.5, 4.0)]])
    }

    #[test]
    fn test_segment_intersection() {
        let p = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
        )
        .unwrap();
        assert!((p.x - 1.0).abs() < 1.0e-6 && (p.y - 1.0).abs() < 1.0e-6);

        assert!(segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_cell_and_edge_queries() {
        let g = geometry();
        let f = vertical_fault();
        assert!(f.is_ready());
        for row in 0..3 {
            assert!(f.has_fault_crossing(&g, row * 6 + 2));
            assert!(!f.has_fault_crossing(&g, row * 6 + 1));
            assert!(!f.has_fault_crossing(&g, row * 6 + 3));
        }
        assert!(f.blocks_horizontal_edge(&g, 2));
        assert!(!f.blocks_horizontal_edge(&g, 3));
        assert!(!f.blocks_vertical_edge(&g, 2));
        assert!(!f.grazes_node(&g, 2));
        assert_eq!(f.closest_fault_cells(&g, 2), Some(0));
        assert_eq!(f.closest_fault_cells(&g, 0), Some(2));
        assert_eq!(f.fault_end_point(&g, 2), None);
    }

    #[test]
    fn test_corner_values_follow_reference_side() {
        let g = geometry();
        let f = vertical_fault();
        let cell = 6 + 2;
        let corners = CellCorners {
            cell,
            points: g.cell_corners(cell),
            values: [1.0, 10.0, 20.0, 2.0],
            reference: Point::new(3.0, 1.5),
        };
        assert_eq!(f.interpolate_corners(&g, &corners), [10.0, 10.0, 20.0, 20.0]);

        let from_left = CellCorners {
            reference: Point::new(2.0, 1.5),
            ..corners
        };
        assert_eq!(f.interpolate_corners(&g, &from_left), [1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_intersection_and_end_point() {
        let g = geometry();
        let f = LineFaults::new(&[vec![Point::new(2.5, 1.2), Point::new(2.5, 4.0)]]);
        let hit = f
            .find_fault_intersection(&g, Point::new(3.0, 1.5), Point::new(2.0, 1.5), 8)
            .unwrap();
        assert!((hit.x - 2.5).abs() < 1.0e-6 && (hit.y - 1.5).abs() < 1.0e-6);
        assert_eq!(f.fault_end_point(&g, 8), Some(Point::new(2.5, 1.2)));
        assert_eq!(f.fault_end_point(&g, 2), None);
    }

    #[test]
    fn test_no_faults() {
        let g = geometry();
        let corners = CellCorners {
            cell: 0,
            points: g.cell_corners(0),
            values: [1.0, 2.0, 3.0, 4.0],
            reference: Point::new(0.5, 0.0),
        };
        assert!(!NoFaults.has_fault_crossing(&g, 0));
        assert_eq!(NoFaults.interpolate_corners(&g, &corners), corners.values);
        assert!(NoFaults.is_ready());
        assert!(!LineFaults::default().is_ready());
    }

    #[test]
    fn test_fault_cells_cache() {
        let g = geometry();
        let f = vertical_fault();
        let cells = FaultCells::build(&f, g).unwrap();
        assert!(cells.crosses(8));
        assert!(!cells.crosses(5));
        assert!(cells.horizontal_blocked(8));
        assert!(!cells.vertical_blocked(8));
        assert_eq!(
            cells.corner_values(8, [1.0, 10.0, 20.0, 2.0], Point::new(2.0, 1.5)),
            [1.0, 1.0, 2.0, 2.0]
        );
    }
}
