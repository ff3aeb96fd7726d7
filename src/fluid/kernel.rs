//! Smoothing kernel used for density estimation and pressure gradients.
//!
//! W(r, h) = max(0, h² - r²)³ / (πh⁸)
//! W'(r, h) = -24 r (h² - r²)² / (πh⁸)   for r < h, i.e. 4 dW/dr

use std::f32::consts::PI;

/// Smoothing kernel with its denominator precomputed for one radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingKernel {
    radius: f32,
    radius_sq: f32,
    /// π·h⁸
    denominator: f32,
}

impl SmoothingKernel {
    pub fn new(radius: f32) -> Self {
        let radius_sq = radius * radius;
        let radius_4 = radius_sq * radius_sq;
        Self {
            radius,
            radius_sq,
            denominator: PI * radius_4 * radius_4,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Kernel value at distance `dist`. Zero at and beyond the radius.
    #[inline]
    pub fn value(&self, dist: f32) -> f32 {
        let diff = (self.radius_sq - dist * dist).max(0.0);
        diff * diff * diff / self.denominator
    }

    /// Radial slope used by the pressure gradient: `4 * dW/dr`, the slope of
    /// the kernel normalized by `πh⁸/4`. Zero at the origin and at and beyond
    /// the radius.
    #[inline]
    pub fn derivative(&self, dist: f32) -> f32 {
        if dist >= self.radius {
            return 0.0;
        }
        let diff = self.radius_sq - dist * dist;
        -24.0 * dist * diff * diff / self.denominator
    }
}
