//! Sub-cell smoothing of traced lines.
//!
//! Curved cells are resampled onto a small bicubic subgrid and the line is
//! re-traced through it. The subgrid corners are pinned to the coarse
//! values, so the smoothed line still meets the coarse crossings on each
//! cell edge and never crosses a neighbouring level.

use crate::config::{BICUB_CUTOFF, LINE_BUFFER_CHUNK, Z_ABSOLUTE_TINY, Z_TINY_DIVISOR};
use crate::error::Result;
use crate::fault::FaultCells;
use crate::grid::{GridGeometry, Point};
use crate::interp::{GridView, NULL_SAMPLE};
use crate::output::Closure;
use crate::tracer::{is_saddle, RawPolyline, Side};

/// Subgrid shape used inside each smoothed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothSettings {
    /// Smoothing factor, 1 to 9.
    pub smoothing: i32,
    /// Subgrid nodes across one cell, edges included.
    pub rows: usize,
    pub cols: usize,
    /// Extra subgrid nodes sampled outside the cell on every side.
    pub margin: usize,
}

/// The surface a smoother works on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Surface<'a> {
    pub geometry: GridGeometry,
    /// Working values, nudged off the levels.
    pub values: &'a [f32],
    /// Values with nulls filled, used for bicubic sampling.
    pub no_null: &'a [f32],
    pub null: f32,
    pub zmin: f32,
    pub zmax: f32,
}

/// Per-cell smoothing decisions and subgrids, reused across levels.
///
/// A flag of 1 smooths the cell, -1 never smooths it and 0 leaves it to
/// the first line that passes through.
#[derive(Debug, Default)]
pub struct SmoothCache {
    flags: Vec<i8>,
    subgrids: Vec<Option<Box<[f32]>>>,
}

impl SmoothCache {
    pub fn flag(&self, cell: usize) -> i8 {
        self.flags[cell]
    }

    pub fn cached_subgrids(&self) -> usize {
        self.subgrids.iter().filter(|s| s.is_some()).count()
    }
}

/// Clamp box for appended points: the cell being smoothed.
#[derive(Debug, Clone, Copy)]
struct CellBounds {
    low: Point,
    high: Point,
}

impl CellBounds {
    fn unbounded() -> Self {
        Self {
            low: Point::new(-1.0e30, -1.0e30),
            high: Point::new(1.0e30, 1.0e30),
        }
    }
}

fn append(out: &mut Vec<Point>, p: Point, bounds: &CellBounds) -> Result<()> {
    if out.len() == out.capacity() {
        out.try_reserve(LINE_BUFFER_CHUNK)?;
    }
    if p.is_break() {
        out.push(p);
    } else {
        out.push(Point::new(
            p.x.clamp(bounds.low.x, bounds.high.x),
            p.y.clamp(bounds.low.y, bounds.high.y),
        ));
    }
    Ok(())
}

/// Does the surface bend enough around node (`i`, `j`) to need bicubic
/// smoothing in its cell?
fn needs_bicubic(
    s: &Surface<'_>,
    smoothing: i32,
    faults: Option<&FaultCells<'_>>,
    i: usize,
    j: usize,
) -> bool {
    let g = s.geometry;
    let (ncol, nrow) = (g.ncol, g.nrow);
    if ncol < 4 || nrow < 4 {
        return false;
    }

    let k = i * ncol + j;
    if let Some(f) = faults {
        if f.crosses(k) {
            return false;
        }
        if i + 1 < nrow && j + 1 < ncol && f.closest(k).is_some_and(|d| d < 2) {
            return true;
        }
    }

    let range = s.zmax - s.zmin;
    if (range as f64) < (f32::MIN_POSITIVE as f64).sqrt() * 1000.0 * BICUB_CUTOFF as f64 {
        return false;
    }

    let factor = ((smoothing * smoothing) as f32 / 2.0).max(1.0);
    let zcrit_save = range / BICUB_CUTOFF / factor;
    let mut zcrit = zcrit_save * zcrit_save;

    let window = |i: usize, n: usize| {
        let lo = i.saturating_sub(1);
        if lo + 3 > n - 1 {
            (n - 4, n - 1)
        } else {
            (lo, lo + 3)
        }
    };
    let (i1, i2) = window(i, nrow);
    let (j1, j2) = window(j, ncol);

    let z = |r: usize, c: usize| s.no_null[r * ncol + c];
    let cnull = s.null / 10.0;

    let mut lo = 1.0e30_f32;
    let mut hi = -1.0e30_f32;
    for r in i1..=i2 {
        for c in j1..=j2 {
            let v = z(r, c);
            if v > cnull {
                return false;
            }
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    let mut local = (hi - lo) / factor;
    if local < zcrit_save {
        return false;
    }
    local /= (smoothing * smoothing) as f32;
    zcrit = zcrit.min(local * local);

    // centre of the cell from each of its diagonals
    let ci = i.min(nrow - 2);
    let cj = j.min(ncol - 2);
    let a1 = (z(ci, cj) + z(ci + 1, cj + 1)) / 2.0;
    let a2 = (z(ci, cj + 1) + z(ci + 1, cj)) / 2.0;
    if (a1 - a2).powi(2) > zcrit {
        return true;
    }

    // centre of the window from its long and short diagonals
    let a1 = (z(i1, j1) + z(i2, j2)) / 2.0;
    let a2 = (z(i1 + 1, j1 + 1) + z(i1 + 2, j2 - 1)) / 2.0;
    if (a1 - a2).powi(2) > zcrit {
        return true;
    }
    let a1 = (z(i2, j1) + z(i1, j2)) / 2.0;
    let a2 = (z(i2 - 1, j1 + 1) + z(i1 + 1, j2 - 1)) / 2.0;
    (a1 - a2).powi(2) > zcrit
}

/// Crossing on one side of the cell inside a subgrid, inclusive of the
/// end values. Returns the subgrid cell and the offset from the subgrid
/// origin.
fn find_on_side(
    sub: &[f32],
    nc2: usize,
    nr2: usize,
    side: Side,
    zlev: f32,
    settings: &SmoothSettings,
    dx: f32,
    dy: f32,
) -> Option<(usize, usize, f32, f32)> {
    let m = settings.margin;
    let (rows, cols) = (settings.rows, settings.cols);
    let between = |z1: f32, z2: f32| (zlev >= z1 && zlev <= z2) || (zlev >= z2 && zlev <= z1);

    match side {
        Side::Bottom | Side::Top => {
            let (irow, node_row, yt) = if side == Side::Bottom {
                (m, m, m as f32 * dy)
            } else {
                (rows - 2 + m, nr2 - 1 - m, (rows - 1) as f32 * dy + m as f32 * dy)
            };
            (m..cols - 1 + m).find_map(|j| {
                let z1 = sub[node_row * nc2 + j];
                let z2 = sub[node_row * nc2 + j + 1];
                between(z1, z2).then(|| {
                    let xt = (zlev - z1) / (z2 - z1) * dx + j as f32 * dx;
                    (irow, j, xt, yt)
                })
            })
        }
        Side::Right | Side::Left => {
            let (jcol, node_col, xt) = if side == Side::Left {
                (m, m, m as f32 * dx)
            } else {
                (cols - 2 + m, nc2 - 1 - m, (cols - 1) as f32 * dx + m as f32 * dx)
            };
            (m..rows - 1 + m).find_map(|i| {
                let z1 = sub[i * nc2 + node_col];
                let z2 = sub[(i + 1) * nc2 + node_col];
                between(z1, z2).then(|| {
                    let yt = (zlev - z1) / (z2 - z1) * dy + i as f32 * dy;
                    (i, jcol, xt, yt)
                })
            })
        }
    }
}

/// Walk a subgrid from (`irow`, `jcol`), entered through `side`, until the
/// walk reaches `end`. A walk that leaves the subgrid or wanders too long
/// is replaced by a straight hop to `end`.
#[allow(clippy::too_many_arguments)]
fn trace_subgrid(
    sub: &[f32],
    nc2: usize,
    nr2: usize,
    mut irow: usize,
    mut jcol: usize,
    mut side: Side,
    zlev: f32,
    end: Point,
    di: i32,
    dx: f32,
    dy: f32,
    origin: Point,
    out: &mut Vec<Point>,
    bounds: &CellBounds,
) -> Result<()> {
    let saved = out.len();
    let tiny = (dx + dy) / 100.0;
    let nmax = (nc2 + nr2) * 4;
    let di = if di == 0 { 1 } else { di };
    let mut count = 0;

    loop {
        let k = irow * nc2 + jcol;
        let cx = origin.x + jcol as f32 * dx;
        let cy = origin.y + irow as f32 * dy;

        let mut exit: Option<(Point, isize, isize, Side)> = None;
        let mut i = side.index() as i32 + di;
        while i != side.index() as i32 + 4 * di {
            let now = Side::from_index((i + 4) as usize);
            i += di;
            let (z1, z2, lead) = match now {
                Side::Bottom => (sub[k], sub[k + 1], sub[k]),
                Side::Right => (sub[k + 1], sub[k + 1 + nc2], sub[k + 1]),
                Side::Top => (sub[k + nc2], sub[k + 1 + nc2], sub[k + 1 + nc2]),
                Side::Left => (sub[k], sub[k + nc2], sub[k + nc2]),
            };
            if !(zlev - lead == 0.0 || (zlev - z1) * (zlev - z2) < 0.0) {
                continue;
            }
            let pct = (zlev - z1) / (z2 - z1);
            let (r, c) = (irow as isize, jcol as isize);
            exit = Some(match now {
                Side::Bottom => (Point::new(cx + pct * dx, cy), r - 1, c, Side::Top),
                Side::Right => (Point::new(cx + dx, cy + pct * dy), r, c + 1, Side::Left),
                Side::Top => (Point::new(cx + pct * dx, cy + dy), r + 1, c, Side::Bottom),
                Side::Left => (Point::new(cx, cy + pct * dy), r, c - 1, Side::Right),
            });
            break;
        }

        let Some((point, next_row, next_col, next_side)) = exit else {
            break;
        };
        append(out, point, bounds)?;

        count += 1;
        if count > nmax {
            out.truncate(saved);
            append(out, end, bounds)?;
            break;
        }
        if point.same_as(&end, tiny) {
            break;
        }
        let outside = next_row < 0
            || next_col < 0
            || next_row as usize >= nr2 - 1
            || next_col as usize >= nc2 - 1;
        if outside {
            out.truncate(saved);
            append(out, end, bounds)?;
            break;
        }

        irow = next_row as usize;
        jcol = next_col as usize;
        side = next_side;
    }
    Ok(())
}

/// Smooths traced lines through curved cells.
pub(crate) struct Smoother {
    settings: SmoothSettings,
    cache: SmoothCache,
    scratch: Vec<f32>,
}

impl Smoother {
    /// Decide up front which cells are curved enough to smooth. Saddle
    /// cells are never smoothed.
    pub fn new(
        settings: SmoothSettings,
        surface: &Surface<'_>,
        faults: Option<&FaultCells<'_>>,
    ) -> Result<Self> {
        let g = surface.geometry;
        let n = g.node_count();

        let mut flags = Vec::new();
        flags.try_reserve_exact(n)?;
        for i in 0..g.nrow {
            for j in 0..g.ncol {
                let k = i * g.ncol + j;
                let mut flag = needs_bicubic(surface, settings.smoothing, faults, i, j) as i8;
                if i + 1 < g.nrow && j + 1 < g.ncol {
                    let fault_cell = faults.is_some_and(|f| f.crosses(k));
                    let z = g.cell_nodes(k).map(|node| surface.values[node]);
                    if !fault_cell && is_saddle(z) {
                        flag = -1;
                    }
                }
                flags.push(flag);
            }
        }

        let mut subgrids = Vec::new();
        subgrids.try_reserve_exact(n)?;
        subgrids.resize_with(n, || None);

        let curved = flags.iter().filter(|&&f| f > 0).count();
        tracing::debug!(
            curved,
            rows = settings.rows,
            cols = settings.cols,
            margin = settings.margin,
            "prepared smoothing flags"
        );

        Ok(Self {
            settings,
            cache: SmoothCache { flags, subgrids },
            scratch: Vec::new(),
        })
    }

    pub fn cache(&self) -> &SmoothCache {
        &self.cache
    }

    /// Smooth `line` at level `zlev` into `out`, with break markers where
    /// the line is crowded. Returns the orientation of the smoothed line.
    pub fn smooth_line(
        &mut self,
        s: &Surface<'_>,
        line: &RawPolyline,
        zlev: f32,
        out: &mut Vec<Point>,
    ) -> Result<Closure> {
        out.clear();
        let n = line.len();
        if n < 2 {
            return Ok(line.closure);
        }

        let g = s.geometry;
        let tiny = (g.xspace + g.yspace) / 2000.0;
        let mut bounds = CellBounds::unbounded();

        let (lo, hi) = line.points.iter().fold(
            (Point::new(f32::MAX, f32::MAX), Point::new(f32::MIN, f32::MIN)),
            |(lo, hi), p| {
                (
                    Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                    Point::new(hi.x.max(p.x), hi.y.max(p.y)),
                )
            },
        );
        if hi.x - lo.x < g.xspace / 5.0 && hi.y - lo.y < g.yspace / 5.0 {
            out.try_reserve(n)?;
            out.extend_from_slice(&line.points);
            return Ok(line.closure);
        }

        // the first line through an undecided cell decides it for all
        let first = line.points[0];
        let last = line.points[n - 1];
        let closed = first.same_as(&last, tiny);
        let decision = if n < 20 && closed { 1 } else { -1 };
        for tag in &line.tags[..n - 1] {
            let flag = &mut self.cache.flags[tag.cell()];
            if *flag == 0 {
                *flag = decision;
            }
        }

        let mut last_smooth = false;
        for i in 0..n - 1 {
            if line.crowded[i] || line.crowded[i + 1] {
                append(out, Point::BREAK, &bounds)?;
                last_smooth = false;
                continue;
            }

            let k = line.tags[i].cell();
            let exit_side = line.tags[i + 1].side();
            let entry_side = line.tags[i]
                .side()
                .map(|side| if i > 0 { side.opposite() } else { side });
            let (low, high) = g.cell_bounds(k);
            bounds = CellBounds { low, high };

            let smoothed = match (entry_side, exit_side) {
                (Some(side1), Some(side2)) if self.cache.flags[k] > 0 => self.smooth_cell(
                    s,
                    k,
                    side1,
                    side2,
                    line.points[i + 1],
                    line.turns[i] as i32,
                    zlev,
                    out,
                    &bounds,
                )?,
                _ => false,
            };

            if !smoothed && !last_smooth {
                append(out, line.points[i], &bounds)?;
            }
            last_smooth = smoothed;
        }

        if !last_smooth {
            if line.crowded[n - 1] {
                append(out, Point::BREAK, &bounds)?;
                return Ok(line.closure);
            }
            append(out, line.points[n - 1], &bounds)?;
        }

        if first.distance_squared(&last).sqrt() < tiny && !out.is_empty() {
            let end = out[out.len() - 1];
            out[0] = end;
            if !out.iter().any(|p| p.is_break()) {
                return Ok(Closure::of_ring(out));
            }
        }
        Ok(line.closure)
    }

    /// Bicubic subgrid over cell `k` and a margin around it, corners
    /// pinned to the working values.
    fn build_subgrid(&self, s: &Surface<'_>, k: usize) -> Result<Option<Box<[f32]>>> {
        let g = s.geometry;
        let SmoothSettings {
            rows, cols, margin, ..
        } = self.settings;
        let nc2 = cols + 2 * margin;
        let nr2 = rows + 2 * margin;
        let row = k / g.ncol;
        let col = k % g.ncol;

        let view = GridView::new(s.no_null, g.ncol, g.nrow, s.null);
        let mut sub = Vec::new();
        sub.try_reserve_exact(nc2 * nr2)?;
        for i in 0..nr2 {
            let ty = (i as f32 - margin as f32) / (rows - 1) as f32;
            for j in 0..nc2 {
                let tx = (j as f32 - margin as f32) / (cols - 1) as f32;
                let z = view.bicubic_in_cell(row, col, tx, ty);
                if z >= NULL_SAMPLE {
                    return Ok(None);
                }
                sub.push(z);
            }
        }

        let [bl, br, tr, tl] = g.cell_nodes(k);
        let low_row = margin * nc2;
        let high_row = (margin + rows - 1) * nc2;
        sub[low_row + margin] = s.values[bl];
        sub[low_row + margin + cols - 1] = s.values[br];
        sub[high_row + margin] = s.values[tl];
        sub[high_row + margin + cols - 1] = s.values[tr];

        Ok(Some(sub.into_boxed_slice()))
    }

    /// Re-trace the line through cell `k` on its subgrid. False when the
    /// cell cannot be smoothed and the straight segment should be kept.
    #[allow(clippy::too_many_arguments)]
    fn smooth_cell(
        &mut self,
        s: &Surface<'_>,
        k: usize,
        side1: Side,
        side2: Side,
        end_in: Point,
        di: i32,
        zlev: f32,
        out: &mut Vec<Point>,
        bounds: &CellBounds,
    ) -> Result<bool> {
        let g = s.geometry;
        if g.ncol < 4 || g.nrow < 4 {
            return Ok(false);
        }

        let row = k / g.ncol;
        let col = k % g.ncol;
        let i1 = row.saturating_sub(1).min(g.nrow - 4);
        let j1 = col.saturating_sub(1).min(g.ncol - 4);
        for r in i1..i1 + 4 {
            let offset = r * g.ncol;
            if s.no_null[offset + j1..offset + j1 + 4]
                .iter()
                .any(|&z| z >= s.null)
            {
                return Ok(false);
            }
        }

        let settings = self.settings;
        let dx = g.xspace / (settings.cols - 1) as f32;
        let dy = g.yspace / (settings.rows - 1) as f32;
        let nc2 = settings.cols + 2 * settings.margin;
        let nr2 = settings.rows + 2 * settings.margin;
        let corner = g.node_point(k);
        let origin = Point::new(
            corner.x - settings.margin as f32 * dx,
            corner.y - settings.margin as f32 * dy,
        );

        if self.cache.subgrids[k].is_none() {
            match self.build_subgrid(s, k)? {
                Some(sub) => self.cache.subgrids[k] = Some(sub),
                None => return Ok(false),
            }
        }
        let Some(cached) = self.cache.subgrids[k].as_deref() else {
            return Ok(false);
        };
        self.scratch.clear();
        self.scratch.try_reserve(cached.len())?;
        self.scratch.extend_from_slice(cached);

        // keep every subgrid node off the level
        let tiny = ((s.zmax - s.zmin) / Z_TINY_DIVISOR).max(Z_ABSOLUTE_TINY);
        for z in self.scratch.iter_mut() {
            if (*z - zlev).abs() < tiny {
                *z = if *z > zlev { zlev + tiny } else { zlev - tiny };
            }
        }
        let sub = &self.scratch;

        let Some((irow, jcol, xt, yt)) =
            find_on_side(sub, nc2, nr2, side1, zlev, &settings, dx, dy)
        else {
            return Ok(false);
        };
        append(out, Point::new(origin.x + xt, origin.y + yt), bounds)?;

        let end = find_on_side(sub, nc2, nr2, side2, zlev, &settings, dx, dy)
            .map(|(_, _, xt, yt)| Point::new(origin.x + xt, origin.y + yt))
            .unwrap_or(end_in);

        trace_subgrid(
            sub, nc2, nr2, irow, jcol, side1, zlev, end, di, dx, dy, origin, out, bounds,
        )?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crowd::CrowdThresholds;
    use crate::fault::LineFaults;
    use crate::levels::ContourLevel;
    use crate::tracer::{CrossingMaps, TraceStart, Tracer};

    fn settings() -> SmoothSettings {
        SmoothSettings {
            smoothing: 3,
            rows: 4,
            cols: 4,
            margin: 2,
        }
    }

    fn cone(n: usize) -> (GridGeometry, Vec<f32>) {
        let g = GridGeometry::new(n, n, 0.0, 0.0, (n - 1) as f32, (n - 1) as f32);
        let c = (n - 1) as f32 / 2.0;
        let values = (0..n * n)
            .map(|k| {
                let p = g.node_point(k);
                let r2 = (p.x - c).powi(2) + (p.y - c).powi(2);
                100.0 * (-r2 / 8.0).exp()
            })
            .collect();
        (g, values)
    }

    fn surface<'a>(g: GridGeometry, values: &'a [f32]) -> Surface<'a> {
        let zmin = values.iter().copied().fold(f32::MAX, f32::min);
        let zmax = values.iter().copied().fold(f32::MIN, f32::max);
        Surface {
            geometry: g,
            values,
            no_null: values,
            null: 1.0e28,
            zmin,
            zmax,
        }
    }

    #[test]
    fn test_plane_needs_no_smoothing() {
        let g = GridGeometry::new(6, 6, 0.0, 0.0, 5.0, 5.0);
        let values: Vec<f32> = (0..36).map(|k| (k % 6 + k / 6) as f32).collect();
        let smoother = Smoother::new(settings(), &surface(g, &values), None).unwrap();
        assert!((0..36).all(|k| smoother.cache().flag(k) == 0));
    }

    #[test]
    fn test_curved_cells_are_flagged() {
        let (g, values) = cone(9);
        let smoother = Smoother::new(settings(), &surface(g, &values), None).unwrap();
        let curved = (0..81).filter(|&k| smoother.cache().flag(k) > 0).count();
        assert!(curved > 0);
    }

    #[test]
    fn test_saddles_are_never_smoothed() {
        let g = GridGeometry::new(4, 4, 0.0, 0.0, 3.0, 3.0);
        #[rustfmt::skip]
        let values = vec![
            0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 5.0, 0.0,
            0.0, 5.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ];
        let smoother = Smoother::new(settings(), &surface(g, &values), None).unwrap();
        assert_eq!(smoother.cache().flag(5), -1);
    }

    #[test]
    fn test_faults_steer_flags() {
        let g = GridGeometry::new(8, 8, 0.0, 0.0, 7.0, 7.0);
        let values: Vec<f32> = (0..64).map(|k| (k % 8 + k / 8) as f32).collect();
        let faults = LineFaults::new(&[vec![Point::new(3.5, -1.0), Point::new(3.5, 8.0)]]);
        let cells = FaultCells::build(&faults, g).unwrap();
        let s = surface(g, &values);
        // on the fault: never; next to it: always; far away: plane, never
        assert!(!needs_bicubic(&s, 3, Some(&cells), 2, 3));
        assert!(needs_bicubic(&s, 3, Some(&cells), 2, 2));
        assert!(!needs_bicubic(&s, 3, Some(&cells), 2, 0));
    }

    #[test]
    fn test_smoothed_ring_stays_closed_and_near_raw() {
        let (g, values) = cone(9);
        let crowd = CrowdThresholds::disabled();
        let tracer = Tracer {
            geometry: g,
            values: &values,
            original: &values,
            null: 1.0e28,
            step_tolerance: None,
            faults: None,
            crowd: &crowd,
        };
        let mut maps = CrossingMaps::new(g.node_count()).unwrap();
        let mut line = RawPolyline::default();
        let level = ContourLevel::new(50.0, false);
        // the 50 level crosses the vertical edge x = 4 between rows 1 and 2
        let start = TraceStart {
            cell: 9 + 3,
            side: Side::Right,
            middle: true,
        };
        tracer.trace(&mut maps, start, &level, &mut line).unwrap();
        assert!(line.closed);

        let s = surface(g, &values);
        let mut smoother = Smoother::new(settings(), &s, None).unwrap();
        let mut out = Vec::new();
        let closure = smoother.smooth_line(&s, &line, 50.0, &mut out).unwrap();

        assert!(out.len() >= line.len());
        assert_eq!(out[0], out[out.len() - 1]);
        assert_eq!(closure, line.closure);
        let lo = line.points.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let hi = line.points.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        assert!(out.iter().all(|p| p.x >= lo - 1.0 && p.x <= hi + 1.0));
    }

    #[test]
    fn test_tiny_lines_are_copied() {
        let g = GridGeometry::new(9, 9, 0.0, 0.0, 8.0, 8.0);
        let values = vec![0.0; 81];
        let s = surface(g, &values);
        let mut smoother = Smoother::new(settings(), &s, None).unwrap();
        let mut line = RawPolyline::default();
        line.points = vec![Point::new(1.0, 1.0), Point::new(1.1, 1.05)];
        line.tags = vec![
            crate::tracer::CellTag::Edge {
                cell: 10,
                side: Side::Bottom,
            };
            2
        ];
        line.crowded = vec![false; 2];
        line.turns = vec![1; 2];
        let mut out = Vec::new();
        smoother.smooth_line(&s, &line, 0.5, &mut out).unwrap();
        assert_eq!(out, line.points);
    }
}
