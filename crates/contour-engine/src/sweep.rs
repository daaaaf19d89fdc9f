//! Sweep of one contour level over the grid.
//!
//! Walks start from the grid perimeter first, bottom, right, top, then
//! left, each from the first usable row or column in from that edge. The
//! remaining interior vertical and horizontal edges are tried afterwards,
//! which picks up closed loops and lines cut off by faults.

use crate::config::{Z_ABSOLUTE_TINY, Z_TINY_DIVISOR};
use crate::crowd::apply_crowding;
use crate::error::Result;
use crate::grid::GridGeometry;
use crate::levels::ContourLevel;
use crate::tracer::{CrossingMaps, RawPolyline, Side, TraceStart, Tracer};

/// Starting cells along each side of the grid, in visiting order.
#[derive(Debug, Default)]
pub(crate) struct EdgeStarts {
    bottom: Vec<usize>,
    right: Vec<usize>,
    top: Vec<usize>,
    left: Vec<usize>,
}

impl EdgeStarts {
    /// Find the first edge with two non-null nodes in from each side, for
    /// every grid column and row.
    pub fn new(geometry: GridGeometry, values: &[f32], null: f32) -> Result<Self> {
        let (ncol, nrow) = (geometry.ncol, geometry.nrow);
        let good = |a: usize, b: usize| values[a] < null && values[b] < null;

        let mut starts = Self::default();
        starts.bottom.try_reserve(ncol)?;
        starts.top.try_reserve(ncol)?;
        starts.left.try_reserve(nrow)?;
        starts.right.try_reserve(nrow)?;

        let mut bottom = Vec::new();
        let mut top = Vec::new();
        for j in 0..ncol - 1 {
            if let Some(i) = (0..nrow - 1).find(|&i| good(i * ncol + j, i * ncol + j + 1)) {
                bottom.push((i, j));
            }
            if let Some(i) = (1..nrow).rev().find(|&i| good(i * ncol + j, i * ncol + j + 1)) {
                top.push((i - 1, j));
            }
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for i in 0..nrow - 1 {
            if let Some(j) = (0..ncol - 1).find(|&j| good(i * ncol + j, (i + 1) * ncol + j)) {
                left.push((i, j));
            }
            if let Some(j) = (1..ncol)
                .rev()
                .find(|&j| good(i * ncol + j, (i + 1) * ncol + j))
            {
                right.push((i, j - 1));
            }
        }

        // nearest the edge first, then along the edge
        bottom.sort_by_key(|&(i, j)| (i, j));
        top.sort_by_key(|&(i, j)| (std::cmp::Reverse(i), j));
        left.sort_by_key(|&(i, j)| (j, i));
        right.sort_by_key(|&(i, j)| (std::cmp::Reverse(j), i));

        let cell = |(i, j): (usize, usize)| i * ncol + j;
        starts.bottom.extend(bottom.into_iter().map(cell));
        starts.top.extend(top.into_iter().map(cell));
        starts.left.extend(left.into_iter().map(cell));
        starts.right.extend(right.into_iter().map(cell));
        Ok(starts)
    }
}

/// Nudge distance for nodes that sit on a level.
pub(crate) fn nudge_tolerance(zmin: f32, zmax: f32) -> f32 {
    ((zmax - zmin) / Z_TINY_DIVISOR).max(Z_ABSOLUTE_TINY)
}

/// Move nodes off every multiple of `interval`, levels being offset by
/// `base_offset` below the multiples.
pub(crate) fn nudge_for_interval(
    values: &mut [f32],
    null: f32,
    interval: f32,
    base_offset: f32,
    tiny: f32,
) {
    let upper = interval - tiny;
    for z in values.iter_mut().filter(|z| **z < null) {
        let mut zt = *z + base_offset;
        let sign = if zt < 0.0 {
            zt = -zt;
            -1.0
        } else {
            1.0
        };
        let rem = zt - ((zt / interval) as i64) as f32 * interval;
        if rem < tiny {
            *z += tiny * sign;
        } else if rem > upper {
            *z -= tiny * sign;
        }
    }
}

/// Move nodes off a single level.
pub(crate) fn nudge_for_level(values: &mut [f32], null: f32, zlev: f32, tiny: f32) {
    for z in values.iter_mut().filter(|z| **z < null) {
        if (*z - zlev).abs() < tiny {
            *z = if *z > zlev { zlev + tiny } else { zlev - tiny };
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    /// From a node to its right-hand neighbour.
    Horizontal(usize),
    /// From a node to the node above.
    Vertical(usize),
}

/// One level's sweep over a prepared grid.
pub(crate) struct LevelSweep<'a, 'b> {
    pub tracer: &'b Tracer<'a>,
    pub starts: &'b EdgeStarts,
    /// Edges whose value change is at most this are never starting edges.
    pub ztiny: f32,
}

impl<'a, 'b> LevelSweep<'a, 'b> {
    /// Can a walk at `zlev` start on `edge`?
    fn startable(&self, maps: &CrossingMaps, edge: Edge, zlev: f32) -> bool {
        let t = self.tracer;
        let ncol = t.geometry.ncol;
        let (used, blocked, a, b) = match edge {
            Edge::Horizontal(node) => (
                maps.horizontal_count(node) > 0,
                t.faults.is_some_and(|f| f.horizontal_blocked(node)),
                node,
                node + 1,
            ),
            Edge::Vertical(node) => (
                maps.vertical_count(node) > 0,
                t.faults.is_some_and(|f| f.vertical_blocked(node)),
                node,
                node + ncol,
            ),
        };
        if used || blocked {
            return false;
        }
        if t.faults.is_some_and(|f| f.grazed(a) || f.grazed(b)) {
            return false;
        }

        let (z1, z2) = (t.values[a], t.values[b]);
        if z1 >= t.null || z2 >= t.null {
            return false;
        }
        if (zlev - z1) * (zlev - z2) >= 0.0 {
            return false;
        }
        match t.step_tolerance {
            Some(tiny) => (z1 - z2).abs() >= tiny,
            None => (z1 - z2).abs() > self.ztiny,
        }
    }

    /// Trace every line at `level`. Each finished line is crowd filtered
    /// and handed to `on_line`. Returns the number of lines traced.
    pub fn run<F>(
        &self,
        maps: &mut CrossingMaps,
        line: &mut RawPolyline,
        level: &ContourLevel,
        mut on_line: F,
    ) -> Result<usize>
    where
        F: FnMut(&mut RawPolyline) -> Result<()>,
    {
        let g = self.tracer.geometry;
        let ncol = g.ncol;
        let zlev = level.value;
        maps.reset_level();

        let mut traced = 0;
        let mut walk = |maps: &mut CrossingMaps,
                        line: &mut RawPolyline,
                        start: TraceStart|
         -> Result<()> {
            self.tracer.trace(maps, start, level, line)?;
            if line.is_empty() {
                return Ok(());
            }
            apply_crowding(line);
            traced += 1;
            on_line(line)
        };

        let perimeter = [
            (&self.starts.bottom, Side::Bottom),
            (&self.starts.right, Side::Right),
            (&self.starts.top, Side::Top),
            (&self.starts.left, Side::Left),
        ];
        for (cells, side) in perimeter {
            for &cell in cells.iter() {
                let edge = match side {
                    Side::Bottom => Edge::Horizontal(cell),
                    Side::Right => Edge::Vertical(cell + 1),
                    Side::Top => Edge::Horizontal(cell + ncol),
                    Side::Left => Edge::Vertical(cell),
                };
                if !self.startable(maps, edge, zlev) {
                    continue;
                }
                let start = TraceStart {
                    cell,
                    side,
                    middle: false,
                };
                walk(maps, line, start)?;
            }
        }

        for i in 0..g.nrow - 1 {
            for j in 1..ncol - 1 {
                let cell = i * ncol + j;
                if !self.startable(maps, Edge::Vertical(cell), zlev) {
                    continue;
                }
                let start = TraceStart {
                    cell,
                    side: Side::Left,
                    middle: true,
                };
                walk(maps, line, start)?;
            }
        }

        for i in 1..g.nrow - 1 {
            for j in 0..ncol - 1 {
                let cell = i * ncol + j;
                if !self.startable(maps, Edge::Horizontal(cell), zlev) {
                    continue;
                }
                let start = TraceStart {
                    cell,
                    side: Side::Bottom,
                    middle: true,
                };
                walk(maps, line, start)?;
            }
        }

        tracing::trace!(level = zlev, lines = traced, "swept level");
        Ok(traced)
    }
}
