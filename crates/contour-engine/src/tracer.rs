//! Cell to cell tracing of a single contour line.
//!
//! A walk starts on an edge the level crosses and moves from cell to cell
//! through the exit edge of each, until it leaves the grid, returns to its
//! first point, runs out of exits, or meets a fault.

use crate::config::{BIG_PERCENT, LINE_BUFFER_CHUNK, TINY_PERCENT};
use crate::crowd::CrowdThresholds;
use crate::error::Result;
use crate::fault::FaultCells;
use crate::grid::{GridGeometry, Point};
use crate::levels::ContourLevel;
use crate::output::Closure;

/// Side of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bottom,
    Right,
    Top,
    Left,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Self::Bottom => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Left => 3,
        }
    }

    /// Side for `i`, taken modulo 4.
    pub fn from_index(i: usize) -> Self {
        match i % 4 {
            0 => Self::Bottom,
            1 => Self::Right,
            2 => Self::Top,
            _ => Self::Left,
        }
    }

    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }
}

/// Where a traced point sits. Point 0 carries the cell and side it entered
/// through; later points carry the cell they lead into and the side they
/// left the previous cell by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    Edge { cell: usize, side: Side },
    /// The point lies on a fault inside `cell`.
    Fault { cell: usize },
}

impl CellTag {
    pub fn cell(&self) -> usize {
        match *self {
            Self::Edge { cell, .. } | Self::Fault { cell } => cell,
        }
    }

    pub fn side(&self) -> Option<Side> {
        match *self {
            Self::Edge { side, .. } => Some(side),
            Self::Fault { .. } => None,
        }
    }

    /// Same tag with its side replaced by the opposite one.
    pub fn flipped(self) -> Self {
        match self {
            Self::Edge { cell, side } => Self::Edge {
                cell,
                side: side.opposite(),
            },
            fault => fault,
        }
    }
}

/// A traced line before smoothing. The per-point vectors are kept in step
/// with `points`.
#[derive(Debug, Clone, Default)]
pub struct RawPolyline {
    pub points: Vec<Point>,
    pub tags: Vec<CellTag>,
    pub crowded: Vec<bool>,
    /// Exit scan direction used in the cell following each point.
    pub turns: Vec<i8>,
    pub closed: bool,
    pub closure: Closure,
    /// Node below the level next to the first crossing.
    pub downhill_node: usize,
    pub fault_terminated: bool,
}

impl RawPolyline {
    pub fn clear(&mut self) {
        self.points.clear();
        self.tags.clear();
        self.crowded.clear();
        self.turns.clear();
        self.closed = false;
        self.closure = Closure::Open;
        self.downhill_node = 0;
        self.fault_terminated = false;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn push(&mut self, point: Point, tag: CellTag, crowded: bool) -> Result<()> {
        if self.points.len() == self.points.capacity() {
            self.points.try_reserve(LINE_BUFFER_CHUNK)?;
            self.tags.try_reserve(LINE_BUFFER_CHUNK)?;
            self.crowded.try_reserve(LINE_BUFFER_CHUNK)?;
            self.turns.try_reserve(LINE_BUFFER_CHUNK)?;
        }
        self.points.push(point);
        self.tags.push(tag);
        self.crowded.push(crowded);
        self.turns.push(0);
        Ok(())
    }

    fn set_last_turn(&mut self, di: i32) {
        if let Some(t) = self.turns.last_mut() {
            *t = di as i8;
        }
    }

    /// Put the second leg of a reversed walk, backwards, in front of the
    /// first leg.
    fn splice_reversed(&mut self, reverse_at: usize, start_side: Side) {
        let n = self.points.len();
        if reverse_at >= n {
            return;
        }

        let mut order: Vec<usize> = (reverse_at..n).rev().collect();
        order.extend(0..reverse_at);

        let mut tags = Vec::with_capacity(n);
        for (pos, &i) in order.iter().enumerate() {
            let tag = if pos == 0 || i < reverse_at {
                self.tags[i]
            } else {
                let side = if i > reverse_at {
                    self.tags[i - 1].side().unwrap_or(start_side.opposite())
                } else {
                    start_side.opposite()
                };
                CellTag::Edge {
                    cell: self.tags[i].cell(),
                    side,
                }
            };
            tags.push(tag);
        }

        self.points = order.iter().map(|&i| self.points[i]).collect();
        self.crowded = order.iter().map(|&i| self.crowded[i]).collect();
        self.turns = order.iter().map(|&i| self.turns[i]).collect();
        self.tags = tags;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Horizontal,
    Vertical,
}

/// Crossing counts for every edge at the current level, plus the edges
/// crossed by the walk in progress.
#[derive(Debug, Default)]
pub struct CrossingMaps {
    horizontal: Vec<u8>,
    vertical: Vec<u8>,
    walk_horizontal: Vec<bool>,
    walk_vertical: Vec<bool>,
    touched: Vec<(EdgeKind, usize)>,
}

impl CrossingMaps {
    pub fn new(nodes: usize) -> Result<Self> {
        let mut maps = Self::default();
        maps.horizontal.try_reserve_exact(nodes)?;
        maps.vertical.try_reserve_exact(nodes)?;
        maps.walk_horizontal.try_reserve_exact(nodes)?;
        maps.walk_vertical.try_reserve_exact(nodes)?;
        maps.horizontal.resize(nodes, 0);
        maps.vertical.resize(nodes, 0);
        maps.walk_horizontal.resize(nodes, false);
        maps.walk_vertical.resize(nodes, false);
        Ok(maps)
    }

    pub fn reset_level(&mut self) {
        self.horizontal.fill(0);
        self.vertical.fill(0);
        self.begin_walk();
    }

    fn begin_walk(&mut self) {
        for (kind, edge) in self.touched.drain(..) {
            match kind {
                EdgeKind::Horizontal => self.walk_horizontal[edge] = false,
                EdgeKind::Vertical => self.walk_vertical[edge] = false,
            }
        }
    }

    pub fn horizontal_count(&self, edge: usize) -> u8 {
        self.horizontal[edge]
    }

    pub fn vertical_count(&self, edge: usize) -> u8 {
        self.vertical[edge]
    }

    fn count(&self, kind: EdgeKind, edge: usize) -> u8 {
        match kind {
            EdgeKind::Horizontal => self.horizontal[edge],
            EdgeKind::Vertical => self.vertical[edge],
        }
    }

    fn walked(&self, kind: EdgeKind, edge: usize) -> bool {
        match kind {
            EdgeKind::Horizontal => self.walk_horizontal[edge],
            EdgeKind::Vertical => self.walk_vertical[edge],
        }
    }

    fn mark(&mut self, kind: EdgeKind, edge: usize) {
        let (count, walked) = match kind {
            EdgeKind::Horizontal => (&mut self.horizontal[edge], &mut self.walk_horizontal[edge]),
            EdgeKind::Vertical => (&mut self.vertical[edge], &mut self.walk_vertical[edge]),
        };
        *count = count.saturating_add(1);
        if !*walked {
            *walked = true;
            self.touched.push((kind, edge));
        }
    }
}

/// Starting edge of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStart {
    pub cell: usize,
    pub side: Side,
    /// Interior start: a walk that meets a fault turns around and traces
    /// the other direction from here.
    pub middle: bool,
}

/// Corner positions of an edge in `[BL, BR, TR, TL]` order, in the
/// direction its crossing fraction is measured.
fn edge_corners(side: Side) -> (usize, usize) {
    match side {
        Side::Bottom => (0, 1),
        Side::Right => (1, 2),
        Side::Top => (3, 2),
        Side::Left => (0, 3),
    }
}

/// Edge of cell `k` on `side`, as an index into the crossing maps.
fn edge_of(k: usize, ncol: usize, side: Side) -> (EdgeKind, usize) {
    match side {
        Side::Bottom => (EdgeKind::Horizontal, k),
        Side::Right => (EdgeKind::Vertical, k + 1),
        Side::Top => (EdgeKind::Horizontal, k + ncol),
        Side::Left => (EdgeKind::Vertical, k),
    }
}

/// True when the corners alternate above and below each other around the
/// cell.
pub(crate) fn is_saddle(z: [f32; 4]) -> bool {
    let [z1, z2, z3, z4] = z;
    (z2 > z1 && z3 < z2 && z4 > z3 && z1 < z4) || (z2 < z1 && z3 > z2 && z4 < z3 && z1 > z4)
}

/// Reverse the scan direction when the level lies above the middle pair of
/// corner values.
fn saddle_tweak(z: [f32; 4], zlev: f32, di: i32) -> i32 {
    let mut sorted = z;
    sorted.sort_by(|a, b| a.total_cmp(b));
    if zlev > (sorted[1] + sorted[2]) / 2.0 {
        -di
    } else {
        di
    }
}

#[derive(Debug, Clone, Copy)]
struct Exit {
    side: Side,
    point: Point,
    next_row: isize,
    next_col: isize,
}

/// Read-only state shared by every walk at one level.
pub(crate) struct Tracer<'a> {
    pub geometry: GridGeometry,
    /// Working values, nudged off the level.
    pub values: &'a [f32],
    /// Values before nudging.
    pub original: &'a [f32],
    pub null: f32,
    /// Set for step grids: equal-value tolerance between steps.
    pub step_tolerance: Option<f32>,
    pub faults: Option<&'a FaultCells<'a>>,
    pub crowd: &'a CrowdThresholds,
}

impl<'a> Tracer<'a> {
    fn corner_values(&self, k: usize) -> [f32; 4] {
        self.geometry.cell_nodes(k).map(|n| self.values[n])
    }

    fn original_corners(&self, k: usize) -> [f32; 4] {
        self.geometry.cell_nodes(k).map(|n| self.original[n])
    }

    fn fault_cell(&self, k: usize) -> bool {
        self.faults.is_some_and(|f| f.crosses(k))
    }

    fn too_crowded(&self, k: usize, major: bool) -> bool {
        !self.fault_cell(k)
            && self
                .crowd
                .too_crowded(self.values, self.geometry.ncol, k, major)
    }

    fn crossing_fraction(&self, zlev: f32, z1: f32, z2: f32) -> f32 {
        if self.step_tolerance.is_some() {
            return 0.5;
        }
        let dz = z2 - z1;
        if dz == 0.0 {
            return 0.5;
        }
        ((zlev - z1) / dz).clamp(TINY_PERCENT, BIG_PERCENT)
    }

    fn step_differs(&self, z1: f32, z2: f32) -> bool {
        self.step_tolerance.is_some_and(|tiny| (z2 - z1).abs() >= tiny)
    }

    /// More than two distinct step values around cell `k`.
    fn more_than_two_steps(&self, k: usize) -> bool {
        let [c1, c2, c3, c4] = self.corner_values(k);
        if self.step_differs(c1, c2)
            && ((self.step_differs(c1, c3) && self.step_differs(c2, c3))
                || (self.step_differs(c1, c4) && self.step_differs(c2, c4)))
        {
            return true;
        }
        self.step_differs(c1, c3) && self.step_differs(c1, c4) && self.step_differs(c3, c4)
    }

    fn point_on_side(&self, k: usize, side: Side, pct: f32) -> Point {
        let origin = self.geometry.node_point(k);
        let xs = self.geometry.xspace;
        let ys = self.geometry.yspace;
        match side {
            Side::Bottom => Point::new(origin.x + pct * xs, origin.y),
            Side::Right => Point::new(origin.x + xs, origin.y + pct * ys),
            Side::Top => Point::new(origin.x + pct * xs, origin.y + ys),
            Side::Left => Point::new(origin.x, origin.y + pct * ys),
        }
    }

    fn fault_corners(&self, k: usize, reference: Point) -> [f32; 4] {
        let z = self.corner_values(k);
        match self.faults {
            Some(f) => f.corner_values(k, z, reference),
            None => z,
        }
    }

    /// Trace one line at `level` from `start` into `line`.
    pub fn trace(
        &self,
        maps: &mut CrossingMaps,
        start: TraceStart,
        level: &ContourLevel,
        line: &mut RawPolyline,
    ) -> Result<()> {
        let g = self.geometry;
        let ncol = g.ncol;
        let zlev = level.value;
        let tiny = (g.xspace + g.yspace) / 1000.0;

        line.clear();
        maps.begin_walk();

        let orig_cell = start.cell;
        let orig_side = start.side;
        let mut k = start.cell;
        let mut side = start.side;

        let mut faulted = self.fault_cell(k);
        let mut zc = self.corner_values(k);
        if faulted {
            let reference = g.cell_corners(k)[side.index()];
            zc = self.fault_corners(k, reference);
        }

        let (a, b) = edge_corners(side);
        let pct = self.crossing_fraction(zlev, zc[a], zc[b]);
        let nodes = g.cell_nodes(k);
        line.downhill_node = if zc[a] < zlev { nodes[a] } else { nodes[b] };

        let first = self.point_on_side(k, side, pct);
        let crowded = !faulted && self.too_crowded(k, level.major);
        line.push(first, CellTag::Edge { cell: k, side }, crowded)?;

        let mut entrance = first;
        let mut local_end = if faulted {
            self.faults.and_then(|f| f.end_point(k))
        } else {
            None
        };
        let mut reverse_at: Option<usize> = None;

        loop {
            let row = (k / ncol) as isize;
            let col = (k % ncol) as isize;

            let mut di: i32 = if faulted {
                1
            } else {
                let (p, q) = match side {
                    Side::Bottom => (0, 1),
                    Side::Right => (1, 2),
                    Side::Top => (2, 3),
                    Side::Left => (3, 0),
                };
                let di = if zc[p] < zc[q] { -1 } else { 1 };
                saddle_tweak(self.original_corners(k), zlev, di)
            };
            let predicted = Side::from_index((side.index() as i32 + di + 4) as usize);

            let ncrossmax = if faulted { 1 } else { 0 };
            let mut exits: [Option<Exit>; 3] = [None; 3];
            let mut nexit = 0;
            let mut i = side.index() as i32 + di;
            while i != side.index() as i32 + 4 * di {
                let now = Side::from_index((i + 4) as usize);
                i += di;

                let (kind, edge) = edge_of(k, ncol, now);
                if maps.count(kind, edge) > ncrossmax || maps.walked(kind, edge) {
                    continue;
                }
                let (a, b) = edge_corners(now);
                let (z1, z2) = (zc[a], zc[b]);
                if z1 >= self.null || z2 >= self.null {
                    continue;
                }
                let lead = match now {
                    Side::Bottom | Side::Right => z1,
                    Side::Top | Side::Left => z2,
                };
                if !(zlev - lead == 0.0 || (zlev - z1) * (zlev - z2) < 0.0) {
                    continue;
                }

                let pct = self.crossing_fraction(zlev, z1, z2);
                let (next_row, next_col) = match now {
                    Side::Bottom => (row - 1, col),
                    Side::Right => (row, col + 1),
                    Side::Top => (row + 1, col),
                    Side::Left => (row, col - 1),
                };
                exits[nexit] = Some(Exit {
                    side: now,
                    point: self.point_on_side(k, now, pct),
                    next_row,
                    next_col,
                });
                nexit += 1;
                if !faulted {
                    break;
                }
            }

            let chosen = if faulted && nexit > 1 {
                exits[..nexit]
                    .iter()
                    .flatten()
                    .filter(|e| e.side != side.opposite())
                    .min_by(|x, y| {
                        x.point
                            .distance_squared(&entrance)
                            .total_cmp(&y.point.distance_squared(&entrance))
                    })
                    .copied()
                    .or(exits[0])
            } else {
                exits[0]
            };

            let fault_hit = match (faulted, self.faults) {
                (true, Some(f)) => local_end.or_else(|| {
                    chosen.and_then(|e| {
                        f.intersection(entrance, e.point, k).or_else(|| {
                            (!g.has_cell(e.next_row, e.next_col)).then_some(e.point)
                        })
                    })
                }),
                _ => None,
            };

            let mut exit = match (chosen, fault_hit) {
                (Some(e), _) => e,
                (None, Some(p)) => Exit {
                    side,
                    point: p,
                    next_row: -1,
                    next_col: -1,
                },
                (None, None) => break,
            };

            let mut fault_end = false;
            if let Some(hit) = fault_hit {
                line.set_last_turn(di);
                line.push(hit, CellTag::Fault { cell: k }, false)?;
                line.fault_terminated = true;
                if reverse_at.is_some() || !start.middle {
                    break;
                }

                // turn around and trace from the start edge the other way
                reverse_at = Some(line.len());
                let orig_row = (orig_cell / ncol) as isize;
                let orig_col = (orig_cell % ncol) as isize;
                let (next_row, next_col) = match orig_side {
                    Side::Bottom => (orig_row - 1, orig_col),
                    Side::Right => (orig_row, orig_col + 1),
                    Side::Top => (orig_row + 1, orig_col),
                    Side::Left => (orig_row, orig_col - 1),
                };
                k = orig_cell;
                exit = Exit {
                    side: orig_side,
                    point: line.points[0],
                    next_row,
                    next_col,
                };
                fault_end = true;
            } else if !faulted && is_saddle(self.corner_values(k)) && exit.side != predicted {
                di = -di;
            }

            let next_side = exit.side.opposite();
            let (kind, edge) = match next_side {
                Side::Bottom => (EdgeKind::Horizontal, k + ncol),
                Side::Right => (EdgeKind::Vertical, k),
                Side::Top => (EdgeKind::Horizontal, k),
                Side::Left => (EdgeKind::Vertical, k + 1),
            };
            maps.mark(kind, edge);

            if self.step_tolerance.is_some() && self.more_than_two_steps(k) {
                let origin = g.node_point(k);
                let centre = Point::new(origin.x + g.xspace / 2.0, origin.y + g.yspace / 2.0);
                line.push(centre, CellTag::Edge { cell: k, side }, false)?;
            }

            let inside = g.has_cell(exit.next_row, exit.next_col);
            let next_cell = if inside {
                exit.next_row as usize * ncol + exit.next_col as usize
            } else {
                k
            };

            if !fault_end {
                line.set_last_turn(di);
                let crowded = self.too_crowded(k, level.major);
                line.push(
                    exit.point,
                    CellTag::Edge {
                        cell: next_cell,
                        side: exit.side,
                    },
                    crowded,
                )?;
            }

            if !inside {
                break;
            }

            if !fault_end && line.len() > 4 && line.points[0].same_as(&exit.point, tiny) {
                let last = line.len() - 1;
                line.points[last] = line.points[0];
                line.closed = true;
                break;
            }

            k = next_cell;
            side = next_side;
            entrance = exit.point;
            faulted = self.fault_cell(k);
            if faulted {
                zc = self.fault_corners(k, exit.point);
                local_end = self.faults.and_then(|f| f.end_point(k));
            } else {
                zc = self.corner_values(k);
                local_end = None;
            }
        }

        if let Some(at) = reverse_at {
            line.splice_reversed(at, orig_side);
        }

        if line.len() < 2 {
            line.clear();
            return Ok(());
        }

        line.closure = if line.closed {
            Closure::of_ring(&line.points)
        } else {
            Closure::Open
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::LineFaults;

    fn trace_once(
        geometry: GridGeometry,
        values: &[f32],
        start: TraceStart,
        zlev: f32,
    ) -> RawPolyline {
        let crowd = CrowdThresholds::disabled();
        let tracer = Tracer {
            geometry,
            values,
            original: values,
            null: 1.0e28,
            step_tolerance: None,
            faults: None,
            crowd: &crowd,
        };
        let mut maps = CrossingMaps::new(geometry.node_count()).unwrap();
        let mut line = RawPolyline::default();
        tracer
            .trace(&mut maps, start, &ContourLevel::new(zlev, false), &mut line)
            .unwrap();
        line
    }

    #[test]
    fn test_sides() {
        assert_eq!(Side::Bottom.opposite(), Side::Top);
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::from_index(7), Side::Left);
        assert_eq!(
            CellTag::Edge { cell: 3, side: Side::Right }.flipped(),
            CellTag::Edge { cell: 3, side: Side::Left }
        );
        assert_eq!(CellTag::Fault { cell: 3 }.side(), None);
    }

    #[test]
    fn test_saddle_detection() {
        assert!(is_saddle([1.0, 5.0, 1.0, 5.0]));
        assert!(is_saddle([5.0, 1.0, 5.0, 1.0]));
        assert!(!is_saddle([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_trace_closed_bump() {
        let g = GridGeometry::new(3, 3, 0.0, 0.0, 2.0, 2.0);
        let values = [0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0];
        let start = TraceStart {
            cell: 1,
            side: Side::Left,
            middle: true,
        };
        let line = trace_once(g, &values, start, 5.0);
        assert!(line.closed);
        assert_eq!(line.len(), 5);
        assert_eq!(line.points[0], Point::new(1.0, 0.5));
        assert_eq!(line.points[4], line.points[0]);
        assert_eq!(line.closure, Closure::Clockwise);
        assert_eq!(line.downhill_node, 1);
        assert!(line.crowded.iter().all(|&c| !c));
    }

    #[test]
    fn test_trace_open_ramp() {
        let g = GridGeometry::new(3, 3, 0.0, 0.0, 2.0, 2.0);
        let values = [0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let start = TraceStart {
            cell: 0,
            side: Side::Bottom,
            middle: false,
        };
        let line = trace_once(g, &values, start, 0.5);
        assert!(!line.closed);
        assert_eq!(
            line.points,
            vec![Point::new(0.5, 0.0), Point::new(0.5, 1.0), Point::new(0.5, 2.0)]
        );
        assert_eq!(line.tags[1], CellTag::Edge { cell: 3, side: Side::Top });
    }

    #[test]
    fn test_walk_stops_at_fault() {
        let g = GridGeometry::new(6, 4, 0.0, 0.0, 5.0, 3.0);
        let values: Vec<f32> = (0..24).map(|k| (k / 6) as f32).collect();
        let faults = LineFaults::new(&[vec![Point::new(2.5, -1.0), Point::new(2.5, 4.0)]]);
        let cells = FaultCells::build(&faults, g).unwrap();
        let crowd = CrowdThresholds::disabled();
        let tracer = Tracer {
            geometry: g,
            values: &values,
            original: &values,
            null: 1.0e28,
            step_tolerance: None,
            faults: Some(&cells),
            crowd: &crowd,
        };
        let mut maps = CrossingMaps::new(g.node_count()).unwrap();
        let mut line = RawPolyline::default();
        let start = TraceStart {
            cell: 6 + 4,
            side: Side::Right,
            middle: false,
        };
        tracer
            .trace(&mut maps, start, &ContourLevel::new(1.5, false), &mut line)
            .unwrap();
        assert!(line.fault_terminated);
        assert_eq!(line.len(), 4);
        assert_eq!(line.points[0], Point::new(5.0, 1.5));
        let end = line.points[3];
        assert!((end.x - 2.5).abs() < 1.0e-5 && (end.y - 1.5).abs() < 1.0e-5);
        assert_eq!(line.tags[3], CellTag::Fault { cell: 6 + 2 });
    }

    #[test]
    fn test_middle_start_reverses_at_fault() {
        let g = GridGeometry::new(6, 4, 0.0, 0.0, 5.0, 3.0);
        let values: Vec<f32> = (0..24).map(|k| (k / 6) as f32).collect();
        let faults = LineFaults::new(&[vec![Point::new(2.5, -1.0), Point::new(2.5, 4.0)]]);
        let cells = FaultCells::build(&faults, g).unwrap();
        let crowd = CrowdThresholds::disabled();
        let tracer = Tracer {
            geometry: g,
            values: &values,
            original: &values,
            null: 1.0e28,
            step_tolerance: None,
            faults: Some(&cells),
            crowd: &crowd,
        };
        let mut maps = CrossingMaps::new(g.node_count()).unwrap();
        let mut line = RawPolyline::default();
        // start on the vertical edge at x = 4, heading toward the fault
        let start = TraceStart {
            cell: 6 + 3,
            side: Side::Right,
            middle: true,
        };
        tracer
            .trace(&mut maps, start, &ContourLevel::new(1.5, false), &mut line)
            .unwrap();
        assert!(line.fault_terminated);
        let xs: Vec<f32> = line.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![5.0, 4.0, 3.0, xs[3]]);
        assert!((xs[xs.len() - 1] - 2.5).abs() < 1.0e-5);
        assert!(line.points.iter().all(|p| (p.y - 1.5).abs() < 1.0e-5));
    }
}
