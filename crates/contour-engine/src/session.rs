//! One contour calculation, from a raw grid to output records.
//!
//! [`TraceSession::new`] validates and prepares the grid: null border
//! cropping, precision shift, log conversion, base/top clipping and
//! resampling. [`TraceSession::run`] then sweeps every level. All scratch
//! space belongs to the session and is released when it is dropped, on
//! success or failure.

use crate::config::{
    normalize_null, ContourOptions, ThicknessMode, SENTINEL_LIMIT, SMOOTH_MARGIN, SMOOTH_SIZE,
    SMOOTH_SIZE2, Z_ABSOLUTE_TINY,
};
use crate::crowd::CrowdThresholds;
use crate::error::{ContourError, Result};
use crate::fault::{CellCorners, FaultCells, FaultOracle, NoFaults};
use crate::grid::{Grid, GridGeometry, Point, WorkGrid};
use crate::interp::{fill_nulls, GridView, NULL_SAMPLE};
use crate::levels::{auto_grid_limits, build_levels, simple_grid_limits, GridLimits, LevelPlan};
use crate::output::{ContourRecord, RecordBuilder, TracedLine};
use crate::smooth::{SmoothSettings, Smoother, Surface};
use crate::sweep::{nudge_for_interval, nudge_for_level, nudge_tolerance, EdgeStarts, LevelSweep};
use crate::tracer::{CrossingMaps, RawPolyline, Tracer};

/// Trace contours on `grid` without faults.
pub fn calc_contours(grid: &Grid, options: &ContourOptions) -> Result<Vec<ContourRecord>> {
    TraceSession::new(grid, options, &NoFaults)?.run()
}

/// Node budget and largest multiplier when resampling before smoothing.
fn resample_budget(faulted: bool) -> (usize, usize) {
    if faulted {
        (100_000, 5)
    } else {
        (20_000, 3)
    }
}

fn grid_limits(work: &WorkGrid, options: &ContourOptions) -> GridLimits {
    if options.has_level_lists() {
        simple_grid_limits(&work.values, work.null)
    } else {
        auto_grid_limits(&work.values, work.null, options.thickness)
    }
}

/// Subgrid shape for smoothing, or `None` when cells are too small on the
/// plot to be worth it.
fn smoothing_settings(
    smoothing: i32,
    scale: f32,
    geometry: &GridGeometry,
    null_ratio: f32,
) -> Option<SmoothSettings> {
    let margin = ((smoothing / 2 + 1) as usize).min(SMOOTH_MARGIN);
    let threshold = SMOOTH_SIZE2 * null_ratio;

    if geometry.xspace / scale < threshold && geometry.yspace / scale < threshold {
        return (scale <= 0.0).then_some(SmoothSettings {
            smoothing,
            rows: 4,
            cols: 4,
            margin,
        });
    }

    let count = |space: f32| ((space / scale / SMOOTH_SIZE + 1.5) as i32).clamp(3, 9) as usize;
    Some(SmoothSettings {
        smoothing,
        rows: count(geometry.yspace),
        cols: count(geometry.xspace),
        margin,
    })
}

/// Resample a faulted grid. Cells a fault crosses are valued from the side
/// of the fault each new node lies on, cells next to a fault bilinearly,
/// and the rest bicubically.
fn resample_faulted(
    work: &mut WorkGrid,
    oracle: &dyn FaultOracle,
    ncol: usize,
    nrow: usize,
) -> Result<()> {
    let g = work.geometry;
    if ncol == g.ncol && nrow == g.nrow {
        return Ok(());
    }
    let target = GridGeometry::new(ncol, nrow, g.xmin, g.ymin, g.xmax, g.ymax);
    let view = GridView::new(&work.values, g.ncol, g.nrow, work.null);

    let mut values = Vec::new();
    values.try_reserve_exact(ncol * nrow)?;
    for k in 0..target.node_count() {
        let p = target.node_point(k);
        let fcol = ((p.x - g.xmin) / g.xspace).max(0.0);
        let frow = ((p.y - g.ymin) / g.yspace).max(0.0);
        let col = (fcol as usize).min(g.ncol - 2);
        let row = (frow as usize).min(g.nrow - 2);
        let (tx, ty) = (fcol - col as f32, frow - row as f32);
        let cell = row * g.ncol + col;

        let z = if oracle.has_fault_crossing(&g, cell) {
            let corners = CellCorners {
                cell,
                points: g.cell_corners(cell),
                values: g.cell_nodes(cell).map(|n| work.values[n]),
                reference: p,
            };
            let c = oracle.interpolate_corners(&g, &corners);
            if c.iter().any(|&z| z >= work.null) {
                NULL_SAMPLE
            } else {
                let bottom = c[0] + (c[1] - c[0]) * tx;
                let top = c[3] + (c[2] - c[3]) * tx;
                bottom + (top - bottom) * ty
            }
        } else if oracle
            .closest_fault_cells(&g, cell)
            .is_some_and(|d| d <= 1)
        {
            view.bilinear_in_cell(row, col, tx, ty)
        } else {
            view.bicubic_in_cell(row, col, tx, ty)
        };
        values.push(if z >= NULL_SAMPLE { work.null } else { z });
    }

    work.values = values;
    work.geometry = target;
    tracing::debug!(ncol, nrow, "resampled faulted grid");
    Ok(())
}

/// Working state for one contour calculation.
pub struct TraceSession<'a> {
    options: ContourOptions,
    work: WorkGrid,
    /// Values before any nudging off the levels.
    original: Vec<f32>,
    /// Values with nulls filled, for smoothing only.
    no_null: Vec<f32>,
    limits: GridLimits,
    plan: LevelPlan,
    shift: f64,
    log_output: bool,
    smoothing: Option<SmoothSettings>,
    crowd: CrowdThresholds,
    faults: Option<FaultCells<'a>>,
    step_tolerance: Option<f32>,
}

impl<'a> TraceSession<'a> {
    /// Validate and prepare `grid` for tracing with `options`. Fault
    /// queries go to `oracle` when fault mode is on.
    pub fn new(
        grid: &Grid,
        options: &ContourOptions,
        oracle: &'a dyn FaultOracle,
    ) -> Result<Self> {
        grid.validate()?;
        options.validate().map_err(ContourError::Validation)?;

        let mut opts = options.normalized();
        let null = normalize_null(grid.null_value.unwrap_or(opts.null_value));

        let mut work = WorkGrid::from_grid(grid, null)?;
        let null_ratio = work.non_null_ratio();
        work.remove_null_border()?;
        work.value_range()?;

        if opts.faulted && (work.geometry.ncol < 4 || work.geometry.nrow < 4) {
            let g = work.geometry;
            resample_faulted(&mut work, oracle, g.ncol.max(4), g.nrow.max(4))?;
        }

        let mut shift = 0.0_f64;
        if !opts.step_grid && opts.log_base <= 1.0 {
            shift = work.shift_for_precision(opts.contour_interval);
            if shift != 0.0 {
                let s = shift as f32;
                opts.first_contour -= s;
                opts.last_contour -= s;
                if opts.base_grid_value.abs() < SENTINEL_LIMIT {
                    opts.base_grid_value -= s;
                }
                if opts.top_grid_value.abs() < SENTINEL_LIMIT {
                    opts.top_grid_value -= s;
                }
            }
        }

        if opts.step_grid {
            opts.smoothing = 0;
            if opts.contour_interval > 0.0 {
                opts.base_value = opts.contour_interval / 2.0;
            }
            opts.log_base = 0.0;
            opts.minor_crowd = 0.0;
            opts.major_crowd = 0.0;
            opts.fast = false;
            opts.faulted = false;
        }
        if opts.fast {
            opts.fill_precision = opts.fill_precision.max(0.1);
            opts.minor_crowd = 0.0;
            opts.major_crowd = 0.0;
            opts.smoothing = 0;
        }

        let mut log_output = false;
        if opts.log_base > 1.0 && (opts.contour_interval > 0.0 || !opts.has_level_lists()) {
            log_output = true;
            if opts.log_convert {
                work.convert_to_log(opts.log_base)?;
                let (first, last) = (opts.first_contour, opts.last_contour);
                if first > 0.0 && last > 0.0 && first != last {
                    let ln_base = (opts.log_base as f64).ln();
                    opts.first_contour = ((first as f64).ln() / ln_base) as f32;
                    opts.last_contour = ((last as f64).ln() / ln_base) as f32;
                }
            }
        }

        let mut limits = grid_limits(&work, &opts);
        Self::clip_base_and_top(&mut work, &mut opts, &limits)?;

        if opts.resample && opts.smoothing > 0 {
            let (max_nodes, max_mult) = resample_budget(opts.faulted);
            let g = work.geometry;
            if g.node_count() < max_nodes {
                let mut mult = 2;
                let (ncol, nrow) = loop {
                    let ncol = (g.ncol - 1) * mult + 1;
                    let nrow = (g.nrow - 1) * mult + 1;
                    if ncol * nrow >= max_nodes || mult >= max_mult {
                        break (ncol, nrow);
                    }
                    mult += 1;
                };
                if opts.faulted {
                    resample_faulted(&mut work, oracle, ncol, nrow)?;
                } else {
                    work.resample(ncol, nrow)?;
                }
                limits = grid_limits(&work, &opts);
            }
        }

        let g = work.geometry;
        let mut original = Vec::new();
        original.try_reserve_exact(work.values.len())?;
        original.extend_from_slice(&work.values);
        let no_null = fill_nulls(&work.values, g.ncol, g.nrow, work.null)?;

        let smoothing = if opts.faulted || opts.smoothing <= 0 {
            None
        } else {
            smoothing_settings(opts.smoothing, opts.scale, &g, null_ratio)
        };

        let plan = build_levels(&opts, &limits, shift as f32)?;

        let faults = if !opts.faulted {
            None
        } else if oracle.is_ready() {
            Some(FaultCells::build(oracle, g)?)
        } else {
            tracing::warn!("fault oracle is not ready; tracing without faults");
            opts.faulted = false;
            None
        };

        // a faulted run never crowds
        let crowd = if faults.is_some() {
            CrowdThresholds::disabled()
        } else {
            CrowdThresholds::new(
                opts.minor_crowd,
                opts.major_crowd,
                opts.scale,
                plan.interval,
                plan.major_spacing,
                g.xspace,
                g.yspace,
            )
        };

        let step_tolerance = opts
            .step_grid
            .then(|| (limits.zmax - limits.zmin) / 1000.0);

        tracing::debug!(
            ncol = g.ncol,
            nrow = g.nrow,
            levels = plan.levels.len(),
            interval = plan.interval,
            shift,
            smoothing = ?smoothing,
            crowding = crowd.is_enabled(),
            faulted = faults.is_some(),
            "prepared contour session"
        );

        Ok(Self {
            options: opts,
            work,
            original,
            no_null,
            limits,
            plan,
            shift,
            log_output,
            smoothing,
            crowd,
            faults,
            step_tolerance,
        })
    }

    /// Settle the base and top grid values and clip the grid to them.
    /// Unset values default to one range beyond the data, so they clip
    /// nothing.
    fn clip_base_and_top(
        work: &mut WorkGrid,
        opts: &mut ContourOptions,
        limits: &GridLimits,
    ) -> Result<()> {
        let range = (limits.zmax - limits.zmin).max(Z_ABSOLUTE_TINY);
        let mut explicit_base = opts.base_grid_value > -SENTINEL_LIMIT;
        let mut explicit_top = opts.top_grid_value < SENTINEL_LIMIT;
        let mut base = if explicit_base {
            opts.base_grid_value
        } else {
            limits.zmin - range
        };
        let mut top = if explicit_top {
            opts.top_grid_value
        } else {
            limits.zmax + range
        };

        match opts.thickness {
            ThicknessMode::Positive => {
                if limits.zmax <= 0.0 {
                    return Err(ContourError::degenerate(
                        "positive thickness needs values above zero",
                    ));
                }
                if base < 0.0 {
                    base = 0.0;
                    explicit_base = true;
                }
            }
            ThicknessMode::Negative => {
                if limits.zmin >= 0.0 {
                    return Err(ContourError::degenerate(
                        "negative thickness needs values below zero",
                    ));
                }
                if top > 0.0 {
                    top = 0.0;
                    explicit_top = true;
                }
            }
            ThicknessMode::None => {}
        }

        let tiny = nudge_tolerance(limits.zmin, limits.zmax);
        let plateau = (top <= limits.zmax).then_some(top - 50.0 * tiny);
        let valley = (base >= limits.zmin).then_some(base);
        if plateau.is_some() || valley.is_some() {
            work.clip_values(plateau, valley);
        }

        if opts.first_contour >= opts.last_contour && (explicit_base || explicit_top) {
            opts.first_contour = if explicit_base { base } else { limits.histo_min };
            opts.last_contour = if explicit_top { top } else { limits.histo_max };
        }
        opts.base_grid_value = base;
        opts.top_grid_value = top;
        Ok(())
    }

    /// Levels this session will trace, in working grid units.
    pub fn plan(&self) -> &LevelPlan {
        &self.plan
    }

    /// Geometry of the working grid after cropping and resampling.
    pub fn geometry(&self) -> GridGeometry {
        self.work.geometry
    }

    /// Amount subtracted from the grid for precision; added back to every
    /// output value.
    pub fn grid_shift(&self) -> f64 {
        self.shift
    }

    pub fn smoothing(&self) -> Option<SmoothSettings> {
        self.smoothing
    }

    pub fn is_faulted(&self) -> bool {
        self.faults.is_some()
    }

    pub fn limits(&self) -> &GridLimits {
        &self.limits
    }

    /// Trace every level and return the records in level order.
    pub fn run(self) -> Result<Vec<ContourRecord>> {
        let Self {
            options,
            work,
            original,
            no_null,
            limits,
            plan,
            shift,
            log_output,
            smoothing,
            crowd,
            faults,
            step_tolerance,
        } = self;

        let g = work.geometry;
        let null = work.null;
        let mut values = work.values;
        let tiny = nudge_tolerance(limits.zmin, limits.zmax);
        let ztiny = ((limits.histo_max - limits.histo_min) / 1.0e6).max(0.0);
        let stepped = step_tolerance.is_some();

        if !stepped && plan.interval > 0.0 {
            nudge_for_interval(&mut values, null, plan.interval, plan.base_offset, tiny);
        }

        let starts = EdgeStarts::new(g, &values, null)?;
        let mut maps = CrossingMaps::new(g.node_count())?;
        let mut line = RawPolyline::default();
        let mut buffer: Vec<Point> = Vec::new();
        let mut records: Vec<ContourRecord> = Vec::new();
        let builder = RecordBuilder {
            shift,
            log_base: log_output.then_some(options.log_base),
        };

        let mut smoother = match smoothing {
            Some(settings) => {
                let surface = Surface {
                    geometry: g,
                    values: &values,
                    no_null: &no_null,
                    null,
                    zmin: limits.zmin,
                    zmax: limits.zmax,
                };
                Some(Smoother::new(settings, &surface, faults.as_ref())?)
            }
            None => None,
        };

        for level in plan.active() {
            if !stepped && plan.interval <= 0.0 {
                nudge_for_level(&mut values, null, level.value, tiny);
            }

            let tracer = Tracer {
                geometry: g,
                values: &values,
                original: &original,
                null,
                step_tolerance,
                faults: faults.as_ref(),
                crowd: &crowd,
            };
            let surface = Surface {
                geometry: g,
                values: &values,
                no_null: &no_null,
                null,
                zmin: limits.zmin,
                zmax: limits.zmax,
            };
            let sweep = LevelSweep {
                tracer: &tracer,
                starts: &starts,
                ztiny,
            };

            let before = records.len();
            let lines = sweep.run(&mut maps, &mut line, level, |line| {
                let traced = TracedLine {
                    closure: line.closure,
                    downhill: g.node_point(line.downhill_node),
                    fault_terminated: line.fault_terminated,
                };
                let traced = match smoother.as_mut() {
                    Some(smoother) => {
                        let closure =
                            smoother.smooth_line(&surface, line, level.value, &mut buffer)?;
                        TracedLine { closure, ..traced }
                    }
                    None => {
                        buffer.clear();
                        buffer.try_reserve(line.len())?;
                        buffer.extend(line.points.iter().zip(&line.crowded).map(
                            |(&p, &crowded)| if crowded { Point::BREAK } else { p },
                        ));
                        traced
                    }
                };
                builder.emit(&buffer, &traced, level, &mut records)?;
                Ok(())
            })?;

            tracing::debug!(
                level = level.value,
                lines,
                records = records.len() - before,
                "traced level"
            );
        }

        if let Some(smoother) = &smoother {
            tracing::debug!(
                subgrids = smoother.cache().cached_subgrids(),
                "smoothing finished"
            );
        }
        tracing::info!(
            records = records.len(),
            levels = plan.levels.len(),
            "contours calculated"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::LineFaults;

    fn ramp(ncol: usize, nrow: usize) -> Grid {
        Grid::from_fn(
            ncol,
            nrow,
            0.0,
            0.0,
            (ncol - 1) as f32,
            (nrow - 1) as f32,
            |x, y| x + y,
        )
    }

    #[test]
    fn test_smoothing_settings() {
        let g = GridGeometry::new(10, 10, 0.0, 0.0, 9.0, 9.0);
        // unknown scale: fixed 4x4 subgrid
        let s = smoothing_settings(3, -1.0, &g, 1.0).unwrap();
        assert_eq!((s.rows, s.cols, s.margin), (4, 4, 2));

        // cells 0.1 plot units wide: 0.1 / 0.04 + 1.5 = 4
        let s = smoothing_settings(9, 10.0, &g, 1.0).unwrap();
        assert_eq!((s.rows, s.cols, s.margin), (4, 4, SMOOTH_MARGIN));

        // cells far below the size threshold on the plot
        assert!(smoothing_settings(3, 1000.0, &g, 1.0).is_none());

        // huge cells clamp at 9
        let s = smoothing_settings(1, 0.01, &g, 1.0).unwrap();
        assert_eq!((s.rows, s.cols, s.margin), (9, 9, 1));
    }

    #[test]
    fn test_session_resamples_small_grids_for_smoothing() {
        let session = TraceSession::new(&ramp(4, 4), &ContourOptions::default(), &NoFaults).unwrap();
        // 3 cells times 3, plus one
        assert_eq!(session.geometry().ncol, 10);
        assert_eq!(session.geometry().nrow, 10);
        assert!(session.smoothing().is_some());

        let options = ContourOptions {
            smoothing: 0,
            ..Default::default()
        };
        let session = TraceSession::new(&ramp(4, 4), &options, &NoFaults).unwrap();
        assert_eq!(session.geometry().ncol, 4);
        assert!(session.smoothing().is_none());
    }

    #[test]
    fn test_session_rejects_bad_input() {
        let mut grid = ramp(4, 4);
        grid.values.pop();
        let err = TraceSession::new(&grid, &ContourOptions::default(), &NoFaults).err();
        assert!(matches!(err, Some(ContourError::Validation(_))));

        let options = ContourOptions {
            contour_interval: f32::NAN,
            ..Default::default()
        };
        let err = TraceSession::new(&ramp(4, 4), &options, &NoFaults).err();
        assert!(matches!(err, Some(ContourError::Validation(_))));

        let flat = Grid::from_fn(4, 4, 0.0, 0.0, 3.0, 3.0, |_, _| 7.0);
        let err = TraceSession::new(&flat, &ContourOptions::default(), &NoFaults).err();
        assert!(matches!(err, Some(ContourError::DegenerateInput(_))));
    }

    #[test]
    fn test_thickness_needs_matching_sign() {
        let grid = Grid::from_fn(4, 4, 0.0, 0.0, 3.0, 3.0, |x, y| -1.0 - x - y);
        let options = ContourOptions {
            thickness: ThicknessMode::Positive,
            ..Default::default()
        };
        let err = TraceSession::new(&grid, &options, &NoFaults).err();
        assert!(matches!(err, Some(ContourError::DegenerateInput(_))));
    }

    #[test]
    fn test_positive_thickness_starts_at_zero() {
        let grid = Grid::from_fn(5, 5, 0.0, 0.0, 4.0, 4.0, |x, _| x - 2.0);
        let options = ContourOptions {
            thickness: ThicknessMode::Positive,
            contour_interval: 0.5,
            smoothing: 0,
            ..Default::default()
        };
        let session = TraceSession::new(&grid, &options, &NoFaults).unwrap();
        assert!(session.plan().levels.iter().all(|l| l.value >= 0.0));
    }

    #[test]
    fn test_shift_is_added_back() {
        let grid = Grid::from_fn(4, 4, 0.0, 0.0, 3.0, 3.0, |x, _| 5000.0 + x);
        let options = ContourOptions {
            contour_interval: 1.0,
            smoothing: 0,
            ..Default::default()
        };
        let session = TraceSession::new(&grid, &options, &NoFaults).unwrap();
        assert_eq!(session.grid_shift(), 4990.0);

        let records = session.run().unwrap();
        assert!(!records.is_empty());
        for record in &records {
            assert!(record.value >= 5000.0 && record.value <= 5003.0);
            assert_eq!(record.label, format!("{}", record.value as i64));
        }
    }

    #[test]
    fn test_log_output_values() {
        let grid = Grid::from_fn(4, 4, 0.0, 0.0, 3.0, 3.0, |x, y| 10.0_f32.powf(x + y));
        let options = ContourOptions {
            log_base: 10.0,
            log_convert: true,
            contour_interval: 1.0,
            first_contour: 1.0,
            last_contour: 1000.0,
            smoothing: 0,
            ..Default::default()
        };
        let records = calc_contours(&grid, &options).unwrap();
        let mut values: Vec<f64> = records.iter().map(|r| r.value).collect();
        values.dedup();
        assert_eq!(values.len(), 3);
        for (value, expected) in values.iter().zip([10.0, 100.0, 1000.0]) {
            assert!((value - expected).abs() / expected < 1.0e-4);
        }
        assert_eq!(records.last().map(|r| r.label.as_str()), Some("1000"));
    }

    #[test]
    fn test_log_conversion_rejects_non_positive() {
        let grid = Grid::from_fn(4, 4, 0.0, 0.0, 3.0, 3.0, |x, y| x + y - 1.0);
        let options = ContourOptions {
            log_base: 10.0,
            log_convert: true,
            ..Default::default()
        };
        let err = calc_contours(&grid, &options).err();
        assert!(matches!(err, Some(ContourError::DegenerateInput(_))));
    }

    #[test]
    fn test_narrow_faulted_grid_is_resampled() {
        let grid = ramp(3, 6);
        let faults = LineFaults::new(&[vec![Point::new(-1.0, 2.5), Point::new(3.0, 2.5)]]);
        let options = ContourOptions {
            faulted: true,
            resample: false,
            ..Default::default()
        };
        let session = TraceSession::new(&grid, &options, &faults).unwrap();
        assert_eq!(session.geometry().ncol, 4);
        assert_eq!(session.geometry().nrow, 6);
        assert!(session.is_faulted());
        assert!(session.smoothing().is_none());
    }

    #[test]
    fn test_unready_oracle_disables_faults() {
        let faults = LineFaults::default();
        let options = ContourOptions {
            faulted: true,
            ..Default::default()
        };
        let session = TraceSession::new(&ramp(5, 5), &options, &faults).unwrap();
        assert!(!session.is_faulted());
    }

    #[test]
    fn test_faulted_run_never_crowds() {
        let grid = Grid::from_fn(8, 8, 0.0, 0.0, 7.0, 7.0, |x, y| 20.0 * (x + y));
        // fault wholly inside the corner cell
        let faults = LineFaults::new(&[vec![Point::new(0.2, 0.2), Point::new(0.8, 0.8)]]);
        let quiet = ContourOptions {
            contour_interval: 10.0,
            smoothing: 0,
            faulted: true,
            ..Default::default()
        };
        let crowded = ContourOptions {
            minor_crowd: 1.0,
            major_crowd: 1.0,
            scale: 1.0,
            ..quiet.clone()
        };

        let session = TraceSession::new(&grid, &crowded, &faults).unwrap();
        assert!(session.is_faulted());
        assert_eq!(session.crowd, CrowdThresholds::disabled());
        let with_crowd = session.run().unwrap();
        let without = TraceSession::new(&grid, &quiet, &faults)
            .unwrap()
            .run()
            .unwrap();
        assert!(!without.is_empty());
        assert_eq!(with_crowd.len(), without.len());

        // the same settings without faults do crowd
        let unfaulted = ContourOptions {
            faulted: false,
            ..crowded
        };
        let session = TraceSession::new(&grid, &unfaulted, &NoFaults).unwrap();
        assert!(session.crowd.is_enabled());
        assert!(session.run().unwrap().len() < without.len());
    }
}
