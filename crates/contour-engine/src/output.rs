//! Contour records handed back to the caller.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::Point;
use crate::label::format_shifted_label;
use crate::levels::ContourLevel;

/// Orientation of a closed contour. Clockwise means a positive shoelace
/// sum, which is clockwise when y grows downward on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    #[default]
    Open,
    Clockwise,
    CounterClockwise,
}

impl Closure {
    /// Orientation of a closed ring whose last point repeats the first.
    pub fn of_ring(points: &[Point]) -> Self {
        let sum: f64 = points
            .windows(2)
            .map(|w| {
                w[0].x as f64 * w[1].y as f64 - w[1].x as f64 * w[0].y as f64
            })
            .sum();
        if sum > 0.0 {
            Self::Clockwise
        } else if sum < 0.0 {
            Self::CounterClockwise
        } else {
            Self::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self, Self::Open)
    }

    /// +1, -1 or 0.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Open => 0,
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// Side of the line, looking along it, on which values fall below the
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownhillSide {
    Right,
    Left,
}

impl DownhillSide {
    /// Compare the heading of the first segment `start`-`next` with the
    /// heading from `start` to a node known to lie below the level.
    pub fn from_heading(start: Point, next: Point, downhill: Point) -> Self {
        use std::f64::consts::PI;

        let mut a1 = ((next.y - start.y) as f64).atan2((next.x - start.x) as f64);
        if a1 < 0.0 {
            a1 += 2.0 * PI;
        }
        let mut a2 = ((downhill.y - start.y) as f64).atan2((downhill.x - start.x) as f64);
        while a2 < a1 {
            a2 += 2.0 * PI;
        }
        if a2 - a1 <= PI {
            Self::Right
        } else {
            Self::Left
        }
    }

    pub fn sign(&self) -> i8 {
        match self {
            Self::Right => 1,
            Self::Left => -1,
        }
    }
}

/// One drawable piece of a contour line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourRecord {
    pub points: Vec<Point>,
    /// Level in the caller's units.
    pub value: f64,
    pub major: bool,
    pub closure: Closure,
    pub downhill: DownhillSide,
    pub label: String,
    /// The line ends against a fault.
    pub fault_terminated: bool,
}

/// What a traced line needs to become records.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TracedLine {
    pub closure: Closure,
    pub downhill: Point,
    pub fault_terminated: bool,
}

/// Converts point buffers into records for one run of the engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordBuilder {
    /// Amount subtracted from the grid during preprocessing.
    pub shift: f64,
    /// Set when the grid holds logarithms in this base.
    pub log_base: Option<f32>,
}

impl RecordBuilder {
    pub fn value_of(&self, level: f32) -> f64 {
        let z = match self.log_base {
            Some(base) => (base as f64).powf(level as f64),
            None => level as f64,
        };
        z + self.shift
    }

    pub fn label_of(&self, level: f32) -> String {
        format_shifted_label(
            level as f64 + self.shift,
            self.shift,
            self.log_base.unwrap_or(0.0),
        )
    }

    /// Split `points` at break markers and push one record per run of at
    /// least two points. A run is reported closed only when it is the
    /// whole of a closed line.
    pub fn emit(
        &self,
        points: &[Point],
        line: &TracedLine,
        level: &ContourLevel,
        out: &mut Vec<ContourRecord>,
    ) -> Result<usize> {
        let runs: Vec<&[Point]> = points
            .split(|p| p.is_break())
            .filter(|run| run.len() >= 2)
            .collect();
        if runs.is_empty() {
            return Ok(0);
        }

        let whole = runs.len() == 1 && runs[0].len() == points.len();
        let value = self.value_of(level.value);
        let label = self.label_of(level.value);

        out.try_reserve(runs.len())?;
        for run in &runs {
            let mut copy = Vec::new();
            copy.try_reserve_exact(run.len())?;
            copy.extend_from_slice(run);

            out.push(ContourRecord {
                points: copy,
                value,
                major: level.major,
                closure: if whole { line.closure } else { Closure::Open },
                downhill: DownhillSide::from_heading(run[0], run[1], line.downhill),
                label: label.clone(),
                fault_terminated: line.fault_terminated,
            });
        }
        Ok(runs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Vec<Point> {
        vec![
            Point::new(1.0, 0.5),
            Point::new(1.5, 1.0),
            Point::new(1.0, 1.5),
            Point::new(0.5, 1.0),
            Point::new(1.0, 0.5),
        ]
    }

    #[test]
    fn test_ring_orientation() {
        let ring = diamond();
        assert_eq!(Closure::of_ring(&ring), Closure::Clockwise);
        let reversed: Vec<Point> = ring.iter().rev().copied().collect();
        assert_eq!(Closure::of_ring(&reversed), Closure::CounterClockwise);
        assert_eq!(Closure::Clockwise.sign(), 1);
        assert!(!Closure::Open.is_closed());
    }

    #[test]
    fn test_downhill_side() {
        let start = Point::new(0.0, 0.0);
        let east = Point::new(1.0, 0.0);
        assert_eq!(
            DownhillSide::from_heading(start, east, Point::new(0.0, 1.0)),
            DownhillSide::Right
        );
        assert_eq!(
            DownhillSide::from_heading(start, east, Point::new(0.0, -1.0)),
            DownhillSide::Left
        );
    }

    #[test]
    fn test_emit_splits_runs() {
        let builder = RecordBuilder {
            shift: 0.0,
            log_base: None,
        };
        let line = TracedLine {
            closure: Closure::Clockwise,
            downhill: Point::new(0.0, 0.0),
            fault_terminated: false,
        };
        let points = vec![
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::BREAK,
            Point::new(2.0, 1.0),
            Point::BREAK,
            Point::new(3.0, 1.0),
            Point::new(4.0, 1.0),
            Point::new(5.0, 1.0),
        ];
        let mut out = Vec::new();
        let n = builder
            .emit(&points, &line, &ContourLevel::new(2.5, false), &mut out)
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(out[0].points.len(), 2);
        assert_eq!(out[1].points.len(), 3);
        assert!(out.iter().all(|r| r.closure == Closure::Open));
        assert_eq!(out[0].label, "2.5");
    }

    #[test]
    fn test_emit_whole_ring_keeps_closure() {
        let builder = RecordBuilder {
            shift: 100.0,
            log_base: None,
        };
        let line = TracedLine {
            closure: Closure::Clockwise,
            downhill: Point::new(0.0, 0.0),
            fault_terminated: false,
        };
        let mut out = Vec::new();
        builder
            .emit(&diamond(), &line, &ContourLevel::new(5.0, true), &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].closure, Closure::Clockwise);
        assert_eq!(out[0].value, 105.0);
        assert_eq!(out[0].label, "105");
        assert!(out[0].major);
    }

    #[test]
    fn test_log_values() {
        let builder = RecordBuilder {
            shift: 0.0,
            log_base: Some(10.0),
        };
        assert!((builder.value_of(2.0) - 100.0).abs() < 1.0e-9);
        assert_eq!(builder.label_of(2.0), "100");
    }
}
