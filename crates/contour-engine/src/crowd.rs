//! Suppression of contour segments where lines would crowd together.
//!
//! A cell is crowded when the value change along either diagonal exceeds
//! what a level can show at the plot scale. Isolated flags are smoothed out
//! so only runs of crowded points break a line.

use crate::tracer::RawPolyline;

/// Largest diagonal change a cell may have before its segments are
/// dropped, for minor and major levels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrowdThresholds {
    pub minor: Option<f32>,
    pub major: Option<f32>,
}

impl CrowdThresholds {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Gradients for crowd factors in plot units per level. Needs a known
    /// plot scale and a positive interval; major crowding also needs major
    /// levels.
    pub fn new(
        minor_crowd: f32,
        major_crowd: f32,
        scale: f32,
        interval: f32,
        major_spacing: i32,
        xspace: f32,
        yspace: f32,
    ) -> Self {
        if scale <= 0.0 || interval <= 0.0 {
            return Self::disabled();
        }

        let gradient = |crowd: f32| {
            let factor = crowd * scale;
            if factor <= 0.0 {
                return None;
            }
            let zt1 = yspace / factor * interval;
            let zt2 = xspace / factor * interval;
            Some(((zt1 as f64).powi(2) + (zt2 as f64).powi(2)).sqrt() as f32)
        };

        Self {
            minor: gradient(minor_crowd),
            major: if major_spacing < 1 {
                None
            } else {
                gradient(major_crowd)
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.minor.is_some() || self.major.is_some()
    }

    /// Is cell `k` too steep for a minor or major level?
    pub fn too_crowded(&self, values: &[f32], ncol: usize, k: usize, major: bool) -> bool {
        let limit = if major { self.major } else { self.minor };
        let Some(limit) = limit else {
            return false;
        };
        let zt1 = (values[k + ncol + 1] - values[k]).abs();
        let zt2 = (values[k + ncol] - values[k + 1]).abs();
        zt1 > limit || zt2 > limit
    }
}

/// Clear flags with no flagged neighbour, then set flags whose two
/// neighbours are both flagged.
pub fn filter_crowding(flags: &mut [bool]) {
    let n = flags.len();
    if n < 2 {
        return;
    }

    let mut work = flags.to_vec();
    for i in 1..n - 1 {
        if !flags[i - 1] && !flags[i + 1] {
            work[i] = false;
        }
    }

    if work[1] {
        flags[0] = true;
    } else {
        flags[0] = work[0];
    }
    if work[n - 2] {
        flags[n - 1] = true;
    } else {
        flags[n - 1] = work[n - 1];
    }
    for i in 1..n - 1 {
        flags[i] = (work[i - 1] && work[i + 1]) || work[i];
    }
}

/// Rotate a closed line so that it starts just after its last crowded
/// point. The visible pieces are then never split by the arbitrary start
/// of the ring.
pub fn rotate_closed(line: &mut RawPolyline) {
    let n = line.len();
    if !line.closed || n < 3 {
        return;
    }
    let Some(last) = line.crowded.iter().rposition(|&c| c) else {
        return;
    };
    let start = last + 1;
    if start == n {
        return;
    }

    // point 0 carries an entry side; make it an exit side like the rest
    line.tags[0] = line.tags[0].flipped();

    line.points[..n - 1].rotate_left(start);
    line.tags[..n - 1].rotate_left(start);
    line.crowded[..n - 1].rotate_left(start);
    line.turns[..n - 1].rotate_left(start);

    line.points[n - 1] = line.points[0];
    line.tags[n - 1] = line.tags[0];
    line.crowded[n - 1] = line.crowded[0];
    line.turns[n - 1] = line.turns[0];

    line.tags[0] = line.tags[0].flipped();
}

/// Filter the crowd flags of a traced line and rotate it when closed.
pub fn apply_crowding(line: &mut RawPolyline) {
    if !line.crowded.iter().any(|&c| c) {
        return;
    }
    filter_crowding(&mut line.crowded);
    rotate_closed(line);
}
