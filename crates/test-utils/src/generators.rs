//! Synthetic surfaces with known contours.
//!
//! Every generator returns values in row-major order, row 0 first, sampled
//! on `width` x `height` nodes at unit spacing from the origin. The shapes
//! are chosen so the expected contours can be worked out by hand.

/// Sample `f(x, y)` on unit spaced nodes.
pub fn sample_grid<F>(width: usize, height: usize, f: F) -> Vec<f32>
where
    F: Fn(f32, f32) -> f32,
{
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(f(col as f32, row as f32));
        }
    }
    data
}

/// A plane rising along the diagonal: `x + y`.
///
/// # Example
///
/// ```
/// use test_utils::create_ramp_grid;
///
/// let grid = create_ramp_grid(4, 4);
/// assert_eq!(grid[0], 0.0);
/// assert_eq!(grid[15], 6.0);
/// ```
pub fn create_ramp_grid(width: usize, height: usize) -> Vec<f32> {
    sample_grid(width, height, |x, y| x + y)
}

/// A round hill centred on the grid with `peak` at the centre, falling
/// linearly to zero `radius` nodes away and staying at zero beyond.
pub fn create_bump_grid(width: usize, height: usize, peak: f32, radius: f32) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    sample_grid(width, height, |x, y| {
        let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
        (peak * (1.0 - d / radius)).max(0.0)
    })
}

/// A cone like [`create_bump_grid`] without the flat floor: values keep
/// falling below zero away from the centre.
pub fn create_cone_grid(width: usize, height: usize, peak: f32, radius: f32) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    sample_grid(width, height, |x, y| {
        let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
        peak * (1.0 - d / radius)
    })
}

/// The 2x2 saddle: high on one diagonal, low on the other.
///
/// ```text
/// 0 1     (top row)
/// 1 0     (bottom row)
/// ```
pub fn create_saddle_grid() -> Vec<f32> {
    vec![1.0, 0.0, 0.0, 1.0]
}

/// A surface that jumps by `throw` across the vertical line
/// `x = split`. Left of it the values rise with `y`, right of it they rise
/// with `y` from `throw`.
pub fn create_cliff_grid(width: usize, height: usize, split: f32, throw: f32) -> Vec<f32> {
    sample_grid(width, height, |x, y| if x < split { y } else { y + throw })
}

/// A gently rolling surface with deterministic noise added.
///
/// The noise comes from a small hash of the node position and `seed`, so
/// the same arguments always give the same grid.
pub fn create_noisy_grid(width: usize, height: usize, seed: u32, amplitude: f32) -> Vec<f32> {
    sample_grid(width, height, |x, y| {
        let base = (x * 0.3).sin() * 10.0 + (y * 0.2).cos() * 10.0;
        let h = simple_hash(x as u32, y as u32, seed);
        let noise = (h % 1000) as f32 / 1000.0 - 0.5;
        base + noise * amplitude
    })
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h
}

/// A grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Replace the nodes at `positions`, given as `(col, row)`, with `null`.
pub fn with_nulls(
    mut data: Vec<f32>,
    width: usize,
    positions: &[(usize, usize)],
    null: f32,
) -> Vec<f32> {
    for &(col, row) in positions {
        let idx = row * width + col;
        if idx < data.len() {
            data[idx] = null;
        }
    }
    data
}

/// Surround `data` with `border` rows and columns of `null`. Returns the
/// padded values and their new width and height.
pub fn pad_with_nulls(
    data: &[f32],
    width: usize,
    height: usize,
    border: usize,
    null: f32,
) -> (Vec<f32>, usize, usize) {
    let w = width + 2 * border;
    let h = height + 2 * border;
    let mut out = vec![null; w * h];
    for row in 0..height {
        let src = &data[row * width..(row + 1) * width];
        let start = (row + border) * w + border;
        out[start..start + width].copy_from_slice(src);
    }
    (out, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_grid() {
        let grid = create_ramp_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1.0, 2.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bump_grid_peak_and_floor() {
        let grid = create_bump_grid(9, 9, 10.0, 3.0);
        assert_eq!(grid[4 * 9 + 4], 10.0);
        assert_eq!(grid[0], 0.0);
        assert!(grid.iter().all(|&v| (0.0..=10.0).contains(&v)));
    }

    #[test]
    fn test_cone_grid_goes_negative() {
        let grid = create_cone_grid(9, 9, 10.0, 3.0);
        assert!(grid[0] < 0.0);
    }

    #[test]
    fn test_cliff_grid() {
        let grid = create_cliff_grid(4, 2, 1.5, 10.0);
        assert_eq!(grid[..4], [0.0, 0.0, 10.0, 10.0]);
        assert_eq!(grid[4..], [1.0, 1.0, 11.0, 11.0]);
    }

    #[test]
    fn test_noisy_grid_deterministic() {
        let a = create_noisy_grid(20, 20, 7, 2.0);
        let b = create_noisy_grid(20, 20, 7, 2.0);
        let c = create_noisy_grid(20, 20, 8, 2.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_with_nulls() {
        let grid = with_nulls(create_constant_grid(3, 3, 1.0), 3, &[(0, 0), (2, 1)], 1e28);
        assert_eq!(grid[0], 1e28);
        assert_eq!(grid[5], 1e28);
        assert_eq!(grid[4], 1.0);
    }

    #[test]
    fn test_pad_with_nulls() {
        let (grid, w, h) = pad_with_nulls(&[1.0, 2.0, 3.0, 4.0], 2, 2, 1, -9.0);
        assert_eq!((w, h), (4, 4));
        assert_eq!(grid[5], 1.0);
        assert_eq!(grid[10], 4.0);
        assert_eq!(grid[0], -9.0);
        assert_eq!(grid.iter().filter(|&&v| v == -9.0).count(), 12);
    }
}
