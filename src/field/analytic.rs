//! Closed-form fields and field composition.
//!
//! These are used to rasterize synthetic grids (e.g. several vortices summed
//! together) and as known inputs in tests.

use super::Field;

/// The same velocity everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    pub u: f32,
    pub v: f32,
}

impl UniformField {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

impl Field for UniformField {
    fn evaluate(&self, _x: f32, _y: f32) -> (f32, f32) {
        (self.u, self.v)
    }
}

/// Counter-clockwise vortex with a softened core.
///
/// Tangential speed is `strength * r / (r² + core_radius²)`, which stays
/// finite at the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VortexField {
    pub center: [f32; 2],
    pub strength: f32,
    pub core_radius: f32,
}

impl VortexField {
    pub fn new(cx: f32, cy: f32, strength: f32, core_radius: f32) -> Self {
        Self {
            center: [cx, cy],
            strength,
            core_radius,
        }
    }
}

impl Field for VortexField {
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32) {
        let dx = x - self.center[0];
        let dy = y - self.center[1];
        let denom = dx * dx + dy * dy + self.core_radius * self.core_radius;
        if denom <= 0.0 {
            return (0.0, 0.0);
        }
        let k = self.strength / denom;
        (-dy * k, dx * k)
    }
}

/// Pointwise sum of several fields.
#[derive(Default)]
pub struct SumField {
    fields: Vec<Box<dyn Field>>,
}

impl SumField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style add.
    pub fn with(mut self, field: impl Field + 'static) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    pub fn push(&mut self, field: Box<dyn Field>) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Field for SumField {
    fn evaluate(&self, x: f32, y: f32) -> (f32, f32) {
        self.fields.iter().fold((0.0, 0.0), |(su, sv), f| {
            let (u, v) = f.evaluate(x, y);
            (su + u, sv + v)
        })
    }
}
