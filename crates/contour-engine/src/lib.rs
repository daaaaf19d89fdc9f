//! Contour line tracing over regular grids.
//!
//! Implements marching squares with:
//! - Automatic or explicit contour levels
//! - Saddle resolution from the mean of the two middle corner values
//! - Crowded segment suppression at a plot scale
//! - Bicubic subgrid smoothing
//! - Fault lines that contours end against
//!
//! ```no_run
//! use contour_engine::{calc_contours, ContourOptions, Grid};
//!
//! let grid = Grid::from_fn(20, 20, 0.0, 0.0, 19.0, 19.0, |x, y| x * y);
//! let records = calc_contours(&grid, &ContourOptions::default())?;
//! for record in &records {
//!     println!("{} {} points", record.label, record.points.len());
//! }
//! # Ok::<(), contour_engine::ContourError>(())
//! ```

pub mod config;
pub mod crowd;
pub mod error;
pub mod fault;
pub mod grid;
pub mod interp;
pub mod label;
pub mod levels;
pub mod output;
pub mod session;
pub mod smooth;
mod sweep;
pub mod tracer;

pub use config::{ContourOptions, ThicknessMode};
pub use error::{ContourError, Result, Status};
pub use fault::{CellCorners, FaultOracle, LineFaults, NoFaults};
pub use grid::{Grid, GridGeometry, Point};
pub use label::format_label;
pub use levels::{ContourLevel, GridLimits, LevelPlan};
pub use output::{Closure, ContourRecord, DownhillSide};
pub use session::{calc_contours, TraceSession};
pub use smooth::SmoothSettings;
