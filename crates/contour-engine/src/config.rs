//! Configuration for contour calculation.

use serde::{Deserialize, Serialize};

// ============================================================================
// Engine constants
// ============================================================================

/// Growth step for point and record buffers.
pub const LINE_BUFFER_CHUNK: usize = 2000;

/// Cap on explicit level lists; twice this caps interval-generated levels.
pub const MAX_CONTOUR_LEVELS: usize = 2000;

/// Largest node count accepted for one grid.
pub const MAX_NODES: usize = 500_000_000;

/// Subgrid spacing target, as a fraction of plot units.
pub const SMOOTH_SIZE: f32 = 0.04;

/// Below this cell size (plot units) smoothing is not worth doing.
pub const SMOOTH_SIZE2: f32 = 0.05;

/// Largest margin of extra subgrid nodes around a smoothed cell.
pub const SMOOTH_MARGIN: usize = 4;

pub const MIN_LOG_BASE: f32 = 1.01;
pub const MAX_HISTO: usize = 1000;
pub const Z_TINY_DIVISOR: f32 = 50000.0;
pub const Z_ABSOLUTE_TINY: f32 = 1.0e-30;

/// Edge crossings are kept this far from either node.
pub const TINY_PERCENT: f32 = 0.01;
pub const BIG_PERCENT: f32 = 0.99;

/// Range divisor for the curvature test that decides cell smoothing.
pub const BICUB_CUTOFF: f32 = 20.0;

/// Values beyond this magnitude are treated as sentinels, never data.
pub const SENTINEL_LIMIT: f32 = 1.0e20;

/// Default null value for grids.
pub const DEFAULT_NULL_VALUE: f32 = 1.0e28;

/// Null sentinels closer to zero than 1e10 are replaced by the default,
/// keeping their sign.
pub fn normalize_null(value: f32) -> f32 {
    if value < 0.0 && value > -1.0e10 {
        -DEFAULT_NULL_VALUE
    } else if value >= 0.0 && value < 1.0e10 {
        DEFAULT_NULL_VALUE
    } else {
        value
    }
}

// ============================================================================
// Thickness mode
// ============================================================================

/// Clipping applied to thickness grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThicknessMode {
    /// No clipping.
    #[default]
    None,
    /// Only positive values are contoured; the base is lifted to zero.
    Positive,
    /// Only negative values are contoured; the top is dropped to zero.
    Negative,
}

impl ThicknessMode {
    /// Parse from string (case-insensitive). Unknown values mean no clipping.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "positive" | "1" => Self::Positive,
            "negative" | "2" => Self::Negative,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl std::fmt::Display for ThicknessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Contour options
// ============================================================================

/// Knobs for one contour calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourOptions {
    /// Smoothing intensity, 0 (off) to 9.
    pub smoothing: i32,

    /// Resample small grids before smoothing.
    pub resample: bool,

    /// Thickness clipping mode.
    pub thickness: ThicknessMode,

    /// Offset of the contour levels from multiples of the interval.
    pub base_value: f32,

    /// Logarithmic contour base; 0 disables log contours.
    pub log_base: f32,

    /// Convert grid values to logarithms before tracing.
    pub log_convert: bool,

    /// Null sentinel. The sign selects null-high or null-low.
    pub null_value: f32,

    /// Minor contour crowding threshold, 0 disables.
    pub minor_crowd: f32,

    /// Major contour crowding threshold, 0 disables.
    pub major_crowd: f32,

    /// Skip smoothing and crowding for speed.
    pub fast: bool,

    /// Fill precision, carried for the color fill companion.
    pub fill_precision: f32,

    /// The grid holds discrete steps rather than a continuous surface.
    pub step_grid: bool,

    /// Trace with fault handling.
    pub faulted: bool,

    /// Contour interval; zero or negative selects one automatically.
    pub contour_interval: f32,

    /// Every n-th level (counted from zero) is major.
    pub major_spacing: i32,

    /// First contour level. When greater than `last_contour` the
    /// histogram limits are used.
    pub first_contour: f32,

    /// Last contour level.
    pub last_contour: f32,

    /// Values below this are not contoured.
    pub base_grid_value: f32,

    /// Values above this are not contoured.
    pub top_grid_value: f32,

    /// Explicit minor levels, used when no interval is given.
    pub minor_levels: Vec<f32>,

    /// Explicit major levels, used when no interval is given.
    pub major_levels: Vec<f32>,

    /// Plot scale in grid units per plot unit; zero or negative when unknown.
    pub scale: f32,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            smoothing: 3,
            resample: true,
            thickness: ThicknessMode::None,
            base_value: 0.0,
            log_base: 0.0,
            log_convert: false,
            null_value: DEFAULT_NULL_VALUE,
            minor_crowd: 0.0,
            major_crowd: 0.0,
            fast: false,
            fill_precision: 0.02,
            step_grid: false,
            faulted: false,
            contour_interval: -1.0,
            major_spacing: 0,
            first_contour: 1.0,
            last_contour: 0.0,
            base_grid_value: -1.0e30,
            top_grid_value: 1.0e30,
            minor_levels: vec![],
            major_levels: vec![],
            scale: -1.0,
        }
    }
}

impl ContourOptions {
    /// Load options from `CONTOUR_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary key lookup. Unparsable values are
    /// ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        let float = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f32>().ok());
        let int = |key: &str| lookup(key).and_then(|v| v.trim().parse::<i32>().ok());
        let flag = |key: &str| {
            lookup(key).map(|v| {
                let v = v.trim().to_lowercase();
                v == "true" || v == "1" || v == "yes"
            })
        };

        if let Some(val) = int("CONTOUR_SMOOTHING") {
            options.smoothing = val;
        }
        if let Some(val) = flag("CONTOUR_RESAMPLE") {
            options.resample = val;
        }
        if let Some(val) = lookup("CONTOUR_THICKNESS") {
            options.thickness = ThicknessMode::from_str(val.trim());
        }
        if let Some(val) = float("CONTOUR_BASE_VALUE") {
            options.base_value = val;
        }
        if let Some(val) = float("CONTOUR_LOG_BASE") {
            options.log_base = val;
        }
        if let Some(val) = flag("CONTOUR_LOG_CONVERT") {
            options.log_convert = val;
        }
        if let Some(val) = float("CONTOUR_NULL_VALUE") {
            options.null_value = val;
        }
        if let Some(val) = float("CONTOUR_MINOR_CROWD") {
            options.minor_crowd = val;
        }
        if let Some(val) = float("CONTOUR_MAJOR_CROWD") {
            options.major_crowd = val;
        }
        if let Some(val) = flag("CONTOUR_FAST") {
            options.fast = val;
        }
        if let Some(val) = float("CONTOUR_FILL_PRECISION") {
            options.fill_precision = val;
        }
        if let Some(val) = flag("CONTOUR_STEP_GRID") {
            options.step_grid = val;
        }
        if let Some(val) = flag("CONTOUR_FAULTED") {
            options.faulted = val;
        }
        if let Some(val) = float("CONTOUR_INTERVAL") {
            options.contour_interval = val;
        }
        if let Some(val) = int("CONTOUR_MAJOR_SPACING") {
            options.major_spacing = val;
        }
        if let Some(val) = float("CONTOUR_FIRST") {
            options.first_contour = val;
        }
        if let Some(val) = float("CONTOUR_LAST") {
            options.last_contour = val;
        }
        if let Some(val) = float("CONTOUR_SCALE") {
            options.scale = val;
        }

        options
    }

    /// Reject values that no clamp can repair.
    pub fn validate(&self) -> Result<(), String> {
        let scalars = [
            ("base_value", self.base_value),
            ("log_base", self.log_base),
            ("null_value", self.null_value),
            ("minor_crowd", self.minor_crowd),
            ("major_crowd", self.major_crowd),
            ("fill_precision", self.fill_precision),
            ("contour_interval", self.contour_interval),
            ("first_contour", self.first_contour),
            ("last_contour", self.last_contour),
            ("base_grid_value", self.base_grid_value),
            ("top_grid_value", self.top_grid_value),
            ("scale", self.scale),
        ];
        for (name, value) in scalars {
            if value.is_nan() {
                return Err(format!("{} must not be NaN", name));
            }
        }

        if self.minor_levels.len() > MAX_CONTOUR_LEVELS {
            return Err(format!(
                "at most {} minor levels may be listed",
                MAX_CONTOUR_LEVELS
            ));
        }
        if self.major_levels.len() > MAX_CONTOUR_LEVELS {
            return Err(format!(
                "at most {} major levels may be listed",
                MAX_CONTOUR_LEVELS
            ));
        }
        if self
            .minor_levels
            .iter()
            .chain(self.major_levels.iter())
            .any(|v| !v.is_finite())
        {
            return Err("explicit levels must be finite".to_string());
        }

        Ok(())
    }

    /// Copy with every knob clamped into its legal range.
    pub fn normalized(&self) -> Self {
        let mut opts = self.clone();

        if opts.contour_interval > SENTINEL_LIMIT {
            opts.contour_interval = -1.0;
        }
        if opts.first_contour < -SENTINEL_LIMIT || opts.first_contour > SENTINEL_LIMIT {
            opts.first_contour = SENTINEL_LIMIT;
        }
        if opts.last_contour < -SENTINEL_LIMIT || opts.last_contour > SENTINEL_LIMIT {
            opts.last_contour = -SENTINEL_LIMIT;
        }
        if opts.base_grid_value > SENTINEL_LIMIT {
            opts.base_grid_value = -1.0e30;
        }
        if opts.top_grid_value < -SENTINEL_LIMIT {
            opts.top_grid_value = 1.0e30;
        }
        if opts.base_grid_value >= opts.top_grid_value {
            opts.base_grid_value = -1.0e30;
            opts.top_grid_value = 1.0e30;
        }

        opts.smoothing = opts.smoothing.clamp(0, 9);
        if opts.base_value < 0.0 {
            opts.base_value = 0.0;
        }
        if opts.log_base <= 1.0 {
            opts.log_base = 0.0;
        }
        if opts.minor_crowd < 0.0 {
            opts.minor_crowd = 0.0;
        }
        if opts.major_crowd < 0.0 {
            opts.major_crowd = 0.0;
        }
        opts.fill_precision = opts.fill_precision.clamp(0.001, 0.5);
        if opts.step_grid {
            opts.faulted = false;
        }
        opts.null_value = normalize_null(opts.null_value);
        if opts.log_base > 0.0 {
            opts.thickness = ThicknessMode::None;
        }
        if opts.scale <= 0.0 {
            opts.scale = -1.0;
        }

        opts
    }

    /// True when explicit level lists drive the calculation.
    pub fn has_level_lists(&self) -> bool {
        !self.minor_levels.is_empty() || !self.major_levels.is_empty()
    }
}
