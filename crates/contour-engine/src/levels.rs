//! Contour level selection.
//!
//! Levels come either from an interval (explicit or chosen automatically
//! from a histogram-trimmed value range) or from explicit minor/major lists.

use serde::{Deserialize, Serialize};

use crate::config::{
    ContourOptions, ThicknessMode, MAX_CONTOUR_LEVELS, MAX_HISTO, SENTINEL_LIMIT,
    Z_ABSOLUTE_TINY,
};
use crate::error::{ContourError, Result};

/// Value stored in a level that duplicates an earlier one.
pub const SKIPPED_LEVEL: f32 = 1.0e30;

/// One contour level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContourLevel {
    pub value: f32,
    pub major: bool,
}

impl ContourLevel {
    pub fn new(value: f32, major: bool) -> Self {
        Self { value, major }
    }

    /// True for a duplicate that the sweep must not trace.
    pub fn is_skipped(&self) -> bool {
        self.value > SENTINEL_LIMIT
    }
}

/// Value limits of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLimits {
    /// Smallest non-null value.
    pub zmin: f32,
    /// Largest non-null value.
    pub zmax: f32,
    /// Robust lower limit with low outliers trimmed.
    pub histo_min: f32,
    /// Robust upper limit with high outliers trimmed.
    pub histo_max: f32,
}

impl GridLimits {
    /// True when no non-null value was seen.
    pub fn is_empty(&self) -> bool {
        self.zmin > self.zmax
    }
}

/// The level list together with the interval settings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPlan {
    pub levels: Vec<ContourLevel>,
    /// Effective interval; zero or negative for explicit lists.
    pub interval: f32,
    pub major_spacing: i32,
    pub first: f32,
    pub last: f32,
    /// Offset subtracted from interval multiples to honor the base value.
    pub base_offset: f32,
}

impl LevelPlan {
    /// Levels the sweep will actually trace.
    pub fn active(&self) -> impl Iterator<Item = &ContourLevel> {
        self.levels.iter().filter(|l| !l.is_skipped())
    }
}

fn is_null(z: f32, null: f32) -> bool {
    z >= null || z <= -null
}

/// Plain min/max over non-null values.
pub fn simple_grid_limits(values: &[f32], null_value: f32) -> GridLimits {
    let null = null_value.abs();
    let mut zmin = 1.0e30_f32;
    let mut zmax = -1.0e30_f32;
    for &z in values.iter().filter(|&&z| !is_null(z, null)) {
        zmin = zmin.min(z);
        zmax = zmax.max(z);
    }
    GridLimits {
        zmin,
        zmax,
        histo_min: 1.0e30,
        histo_max: -1.0e30,
    }
}

/// Find the absolute value limits and robust limits that ignore spikes.
///
/// The robust limits come from repeatedly histogramming the values and
/// trimming the bins below the 1st and above the 99th percentile. The
/// trimming stops once fewer than 93% of the nodes survive or the window
/// no longer shrinks.
///
/// # Arguments
/// * `values` - Grid values, row major
/// * `null_value` - Values at or beyond its magnitude are ignored
/// * `thickness` - Thickness clipping, which pins one end of the range at zero
///
/// # Returns
/// Limits; `zmin > zmax` when every value is null.
pub fn auto_grid_limits(values: &[f32], null_value: f32, thickness: ThicknessMode) -> GridLimits {
    let null = null_value.abs();

    let mut zmin_abs = 1.0e30_f32;
    let mut zmax_abs = -1.0e30_f32;
    let mut sum = 0.0_f64;
    let mut ntot = 0_usize;
    for &z in values.iter().filter(|&&z| !is_null(z, null)) {
        zmin_abs = zmin_abs.min(z);
        zmax_abs = zmax_abs.max(z);
        sum += z as f64;
        ntot += 1;
    }

    let mut limits = GridLimits {
        zmin: zmin_abs,
        zmax: zmax_abs,
        histo_min: zmin_abs,
        histo_max: zmax_abs,
    };
    if ntot < 10 {
        return limits;
    }

    let mean = (sum / ntot as f64) as f32;
    let spread = values
        .iter()
        .filter(|&&z| !is_null(z, null))
        .map(|&z| ((z - mean).abs()) as f64)
        .sum::<f64>()
        / ntot as f64;
    let spread = spread as f32;

    let half = (mean - zmin_abs).min(zmax_abs - mean);
    let mut tinydiv = if half > 0.0 {
        (zmax_abs - zmin_abs) / half
    } else {
        100.0
    };

    // A planar surface has a mean deviation near a quarter of its range;
    // spikes shrink it, so trim harder.
    if spread > 0.0 {
        let factor = ((zmax_abs - zmin_abs) / spread / 20.0).max(1.0);
        tinydiv = (tinydiv * factor).min(100.0);
    }

    match thickness {
        ThicknessMode::Positive => limits.zmin = 0.0,
        ThicknessMode::Negative => limits.zmax = 0.0,
        ThicknessMode::None => {}
    }

    let mut zmin = limits.zmin;
    let mut zmax = limits.zmax;
    let mut tiny = (zmax - zmin) / tinydiv;
    let mut zminlast = zmin + tiny;
    let mut zmaxlast = zmax - tiny;

    let nhisto = (ntot / 100).clamp(10, MAX_HISTO);
    let ncheck = ntot * 93 / 100;
    let mut histo = vec![0_usize; nhisto];

    for attempt in 0..10 {
        histo.iter_mut().for_each(|h| *h = 0);
        let zsize = (zmax - zmin) / (nhisto - 1) as f32;

        let mut inside = 0_usize;
        for &z in values.iter().filter(|&&z| !is_null(z, null)) {
            if z <= zmin || z >= zmax {
                continue;
            }
            let zt = z - zmin;
            let bin = if zt >= zsize { (zt / zsize) as usize } else { 0 };
            histo[bin.min(nhisto - 1)] += 1;
            inside += 1;
        }

        if inside < ncheck {
            break;
        }

        let mut running = 0;
        let mut low: Option<usize> = None;
        let mut high: Option<usize> = None;
        for (i, count) in histo.iter().enumerate() {
            running += count;
            if low.is_none() && running >= inside / 100 {
                low = Some(i);
            }
            if running >= inside * 99 / 100 {
                high = Some(i);
                break;
            }
        }
        let n1 = low.unwrap_or(0).saturating_sub(1);
        let n2 = (high.unwrap_or(nhisto - 1) + 1).min(nhisto);

        zmin += zsize * n1 as f32;
        zmax = zmin + zsize * n2 as f32;

        if zmin <= zminlast && zmax >= zmaxlast {
            if attempt == 0 {
                zmin = limits.zmin;
                zmax = limits.zmax;
            }
            break;
        }

        tinydiv *= 1.25;
        tiny = (zmax - zmin) / tinydiv;
        zminlast = zmin + tiny;
        zmaxlast = zmax - tiny;
    }

    limits.histo_min = zmin;
    limits.histo_max = zmax.min(limits.zmax);
    limits
}

/// Choose a "nice" interval of 1, 2, 4, 5 or 10 times a power of ten that
/// yields roughly `target` levels over `span`. Returns the interval and
/// major spacing.
fn nice_interval(span: f32, target: f32, log_base: f32) -> Option<(f32, i32)> {
    let zt = span / target;
    if zt <= 0.0 {
        return None;
    }

    let mut interval = 10.0_f64.powf((zt as f64).log10().floor()) as f32;
    let mut major = 5;
    if interval < zt / 8.0 {
        interval *= 10.0;
    } else if interval < zt / 4.5 {
        interval *= 5.0;
        major = 4;
    } else if interval < zt / 3.5 {
        interval *= 4.0;
    } else if interval < zt / 1.5 {
        interval *= 2.0;
    }

    if log_base > 9.9 && log_base < 10.1 {
        interval = 0.2;
        major = 5;
    } else if log_base > 1.9 && log_base < 2.1 {
        interval = 0.5;
        major = 2;
    }

    Some((interval, major))
}

/// Build the ascending level list for one calculation.
///
/// `limits` describe the (possibly shifted) working grid and `grid_shift`
/// is subtracted from explicit levels so they line up with it.
pub fn build_levels(
    options: &ContourOptions,
    limits: &GridLimits,
    grid_shift: f32,
) -> Result<LevelPlan> {
    let has_lists = options.has_level_lists();

    let histo_min = limits.histo_min.max(options.base_grid_value);
    let histo_max = limits.histo_max.min(options.top_grid_value);

    let mut first = options.first_contour;
    let mut last = options.last_contour;
    if first > last {
        first = histo_min;
        last = histo_max;
    }
    if first < limits.zmin {
        first = limits.zmin;
    }
    if last > limits.zmax {
        last = limits.zmax;
    }
    if last < first {
        last = limits.zmax;
    }

    let tiny = (last - first) / 5_000_000.0;

    // explicit lists win over any interval
    let mut interval = if has_lists {
        -1.0
    } else {
        options.contour_interval
    };
    let mut major_spacing = options.major_spacing;
    let mut base_offset = 0.0_f32;
    let mut auto_base_reset = false;

    if interval <= 0.0 && !has_lists {
        let target = if options.faulted { 30.0 } else { 20.0 };
        match nice_interval(last - first, target, options.log_base) {
            Some((ci, major)) => {
                interval = ci;
                major_spacing = major;
            }
            None => {
                interval = first;
                major_spacing = 1;
                auto_base_reset = true;
            }
        }
    }

    if interval > 0.0 {
        let requested = ((last - first) / interval + 3.0) as i64;
        let max = 2 * MAX_CONTOUR_LEVELS;
        if requested > max as i64 {
            return Err(ContourError::TooManyLevels {
                requested: requested.max(0) as usize,
                max,
            });
        }
    }

    let mut levels = Vec::new();

    if interval > 0.0 {
        let tiny2 = interval / 100.0;
        if !auto_base_reset && options.base_value != 0.0 && options.base_value < interval {
            base_offset = interval - options.base_value;
        }

        let mut zt = ((first / interval) as i64) as f32 * interval;
        if zt < first {
            zt += interval;
        }
        first = zt - base_offset;
        if first < limits.zmin {
            first += interval;
        }

        let mut z = first;
        loop {
            if z < tiny && z > -tiny {
                z = 0.0;
            }
            let index = (z.abs() / interval + 0.01) as i64;
            let major = major_spacing > 0 && index % major_spacing as i64 == 0;
            levels.try_reserve(1)?;
            levels.push(ContourLevel::new(z, major));
            z += interval;
            if z > last + tiny2 || levels.len() >= 2 * MAX_CONTOUR_LEVELS {
                break;
            }
        }
    } else {
        levels.try_reserve(options.minor_levels.len() + options.major_levels.len())?;
        levels.extend(
            options
                .minor_levels
                .iter()
                .map(|&v| ContourLevel::new(v - grid_shift, false)),
        );
        levels.extend(
            options
                .major_levels
                .iter()
                .map(|&v| ContourLevel::new(v - grid_shift, true)),
        );
        levels.sort_by(|a, b| a.value.total_cmp(&b.value));
        mark_duplicates(&mut levels);
    }

    for level in levels.iter_mut() {
        if level.value > -Z_ABSOLUTE_TINY && level.value < Z_ABSOLUTE_TINY {
            level.value = 0.0;
        }
    }

    tracing::debug!(
        count = levels.len(),
        interval,
        first,
        last,
        major_spacing,
        "built contour levels"
    );

    Ok(LevelPlan {
        levels,
        interval,
        major_spacing,
        first,
        last,
        base_offset,
    })
}

/// Sorted input: a level equal to its predecessor is marked skipped and
/// lends its major flag to the surviving copy.
fn mark_duplicates(levels: &mut [ContourLevel]) {
    let mut keep = 0;
    for i in 1..levels.len() {
        if levels[i].value == levels[keep].value {
            let major = levels[i].major;
            levels[keep].major |= major;
            levels[i].value = SKIPPED_LEVEL;
        } else {
            keep = i;
        }
    }
}

/// Interval settings for an arbitrary list of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultInterval {
    pub interval: f32,
    pub first: f32,
    pub last: f32,
    pub major_spacing: i32,
}

/// Pick the automatic interval, first level, last level and major spacing
/// that a calculation would use for `values`.
pub fn default_contour_interval(values: &[f32], null_value: f32) -> Result<DefaultInterval> {
    let limits = auto_grid_limits(values, null_value, ThicknessMode::None);
    let range = limits.zmax - limits.zmin;
    if limits.is_empty() || range <= 0.0 {
        return Err(ContourError::degenerate(
            "values have no range to pick an interval from",
        ));
    }

    let options = ContourOptions {
        contour_interval: -1.0,
        first_contour: 0.0,
        last_contour: -1.0,
        base_grid_value: limits.zmin - range,
        top_grid_value: limits.zmax + range,
        ..Default::default()
    };
    let plan = build_levels(&options, &limits, 0.0)?;

    Ok(DefaultInterval {
        interval: plan.interval,
        first: plan.first,
        last: plan.last,
        major_spacing: plan.major_spacing,
    })
}
