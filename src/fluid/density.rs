//! Kernel-weighted density estimation.

use bevy::prelude::*;
use rayon::prelude::*;

use super::kernel::SmoothingKernel;
use super::spatial::{Neighbor, SpatialHash, PASS_CHUNK};

/// Density estimator over the particles registered in a [`SpatialHash`].
///
/// Candidates come from the index; distances are measured against
/// `positions`, the current particle positions.
pub struct DensityField<'a> {
    pub kernel: &'a SmoothingKernel,
    pub index: &'a SpatialHash,
    pub positions: &'a [Vec3],
    pub mass: f32,
    pub min_density: f32,
}

impl DensityField<'_> {
    /// Density at an arbitrary point, never below `min_density`.
    pub fn density_at(&self, point: Vec3, neighbors: &mut Vec<Neighbor>) -> f32 {
        if !point.is_finite() {
            return self.min_density;
        }
        self.index.query(point, self.kernel.radius(), neighbors);

        let sum: f32 = neighbors
            .iter()
            .filter_map(|n| self.positions.get(n.index))
            .map(|p| self.mass * self.kernel.value(p.distance(point)))
            .sum();

        sum.max(self.min_density)
    }

    /// Fill `densities[i]` with the density at particle `i`.
    ///
    /// Runs in parallel over [`PASS_CHUNK`]-sized chunks; `scratch` must hold
    /// one buffer per chunk.
    pub fn compute_all(&self, densities: &mut [f32], scratch: &mut [Vec<Neighbor>]) {
        densities
            .par_chunks_mut(PASS_CHUNK)
            .zip(scratch.par_iter_mut())
            .enumerate()
            .for_each(|(chunk, (out, neighbors))| {
                let start = chunk * PASS_CHUNK;
                for (offset, density) in out.iter_mut().enumerate() {
                    *density = self.density_at(self.positions[start + offset], neighbors);
                }
            });
    }
}
