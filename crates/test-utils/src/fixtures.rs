//! Common grid layouts and option documents used across contour tests.

/// Grid layouts for testing.
pub mod grid {
    /// The 4x4 unit ramp used for straight line checks.
    pub const RAMP_4X4: GridSpec = GridSpec {
        width: 4,
        height: 4,
        xmin: 0.0,
        ymin: 0.0,
        xmax: 3.0,
        ymax: 3.0,
    };

    /// A 9x9 grid for closed loop checks.
    pub const SQUARE_9X9: GridSpec = GridSpec {
        width: 9,
        height: 9,
        xmin: 0.0,
        ymin: 0.0,
        xmax: 8.0,
        ymax: 8.0,
    };

    /// Moderately sized grid for randomized and timing runs.
    pub const FIELD_64X48: GridSpec = GridSpec {
        width: 64,
        height: 48,
        xmin: 0.0,
        ymin: 0.0,
        xmax: 63.0,
        ymax: 47.0,
    };

    /// Grid layout specification.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub xmin: f32,
        pub ymin: f32,
        pub xmax: f32,
        pub ymax: f32,
    }

    impl GridSpec {
        pub fn node_count(&self) -> usize {
            self.width * self.height
        }

        pub fn x_spacing(&self) -> f32 {
            (self.xmax - self.xmin) / (self.width - 1) as f32
        }

        pub fn y_spacing(&self) -> f32 {
            (self.ymax - self.ymin) / (self.height - 1) as f32
        }
    }
}

/// Option documents as a caller would send them.
pub mod options {
    /// Interval 1, no smoothing.
    pub const PLAIN_INTERVAL: &str = r#"{"contour_interval": 1.0, "smoothing": 0}"#;

    /// Explicit level lists with a duplicate.
    pub const LEVEL_LISTS: &str =
        r#"{"minor_levels": [1.0, 2.0, 2.0], "major_levels": [3.0], "smoothing": 0}"#;

    /// Crowding at a one unit per inch plot scale.
    pub const CROWDED: &str =
        r#"{"contour_interval": 1.0, "minor_crowd": 1.0, "scale": 1.0, "smoothing": 0}"#;
}

/// Null values seen in practice.
pub mod nulls {
    pub const DEFAULT: f32 = 1.0e28;
    pub const NEGATIVE: f32 = -1.0e28;
}
