//! Continuous velocity fields
//!
//! A [`Field`] maps continuous grid coordinates to a 2D velocity. The tracer
//! only ever sees this trait, so grid-backed and analytic fields can be mixed
//! and summed freely.
//!
//! - [`GridField`] - nearest-cell lookup into a smoothed [`VelocityGrid`]
//! - [`UniformField`], [`VortexField`] - closed-form fields
//! - [`SumField`] - sum of any number of fields
//!
//! [`smooth`] is the Gaussian pre-filter applied before sampling.

pub mod analytic;
pub mod smooth;

pub use analytic::{SumField, UniformField, VortexField};
pub use smooth::{smooth, MIN_KERNEL_WEIGHT};

use crate::types::VelocityGrid;
use std::sync::Arc;

/// A velocity field over continuous `(x, y)` grid coordinates.
///
/// Implementations must be pure: the same point always yields the same
/// velocity, and evaluation never mutates shared state.
pub trait Field: Send + Sync {
    /// Velocity `(vx, vy)` at `(x, y)`.
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32);
}

impl<F: Field + ?Sized> Field for Arc<F> {
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32) {
        (**self).evaluate(x, y)
    }
}

impl<F: Field + ?Sized> Field for Box<F> {
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32) {
        (**self).evaluate(x, y)
    }
}

/// Grid-backed field with nearest-cell lookup.
///
/// No interpolation is done; points are rounded to the closest cell. Points
/// outside `[0, columns) x [0, rows)` read as `(0, 0)`.
#[derive(Debug, Clone)]
pub struct GridField {
    grid: Arc<VelocityGrid>,
}

impl GridField {
    pub fn new(grid: Arc<VelocityGrid>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &VelocityGrid {
        &self.grid
    }
}

impl Field for GridField {
    #[inline]
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32) {
        let cx = x.round();
        let cy = y.round();
        // NaN fails both comparisons and lands here too
        if !(cx >= 0.0 && cy >= 0.0) {
            return (0.0, 0.0);
        }
        let (cx, cy) = (cx as usize, cy as usize);
        if cx >= self.grid.columns() || cy >= self.grid.rows() {
            return (0.0, 0.0);
        }
        self.grid.cell(cx, cy)
    }
}

/// Wrap an (already smoothed) grid as a [`Field`].
pub fn sample(grid: Arc<VelocityGrid>) -> GridField {
    GridField::new(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_grid() -> VelocityGrid {
        // cell (x, y) holds (x, 10 + y)
        let mut data = Vec::new();
        for y in 0..3 {
            for x in 0..4 {
                data.push(x as f32);
                data.push(10.0 + y as f32);
            }
        }
        VelocityGrid::new(data, 4, 3, 1.0).unwrap()
    }

    #[test]
    fn test_nearest_cell_lookup() {
        let field = sample(Arc::new(ramp_grid()));
        assert_eq!(field.evaluate(0.0, 0.0), (0.0, 10.0));
        assert_eq!(field.evaluate(1.4, 0.6), (1.0, 11.0));
        assert_eq!(field.evaluate(2.6, 1.9), (3.0, 12.0));
        // Slightly negative coordinates still round into cell 0
        assert_eq!(field.evaluate(-0.4, -0.2), (0.0, 10.0));
    }

    #[test]
    fn test_out_of_bounds_is_zero() {
        let field = sample(Arc::new(ramp_grid()));
        assert_eq!(field.evaluate(4.0, 0.0), (0.0, 0.0));
        assert_eq!(field.evaluate(0.0, 2.6), (0.0, 0.0));
        assert_eq!(field.evaluate(-0.6, 1.0), (0.0, 0.0));
        assert_eq!(field.evaluate(f32::NAN, 1.0), (0.0, 0.0));
        assert_eq!(field.evaluate(1.0, f32::INFINITY), (0.0, 0.0));
    }

    #[test]
    fn test_field_is_shareable() {
        let field: Arc<dyn Field> = Arc::new(sample(Arc::new(ramp_grid())));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let f = field.clone();
                std::thread::spawn(move || f.evaluate(i as f32, 0.0))
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), (i as f32, 10.0));
        }
    }
}
