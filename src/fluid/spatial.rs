//! Spatial hashing for neighbor search.
//!
//! An unbounded uniform grid: every cell coordinate `floor(p / cell_size)`
//! maps to a bucket of `(index, position)` entries. The grid is rebuilt on a
//! cadence rather than every tick, so between rebuilds queries answer against
//! the positions captured at the last rebuild.

use std::collections::HashMap;

use bevy::prelude::*;

/// Particles handled per parallel work unit. Each unit owns one neighbor
/// buffer for the duration of a pass.
pub const PASS_CHUNK: usize = 64;

/// Preallocated neighbor buffers, one per [`PASS_CHUNK`] of `particle_count`.
pub fn neighbor_buffers(particle_count: usize, capacity: usize) -> Vec<Vec<Neighbor>> {
    (0..particle_count.div_ceil(PASS_CHUNK).max(1))
        .map(|_| Vec::with_capacity(capacity))
        .collect()
}

/// One entry of the index: the particle index and the position it had when
/// it was inserted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub position: Vec3,
}

/// Uniform grid keyed by integer cell coordinate.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<Neighbor>>,
    len: usize,
}

impl SpatialHash {
    /// Create an empty index. `cell_size` must be positive; the engine
    /// validates this before constructing one.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell coordinate containing `position`.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// Remove every entry. Bucket allocations are kept for the next rebuild.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Bulk-insert points. Indices continue after the entries already stored.
    pub fn insert(&mut self, points: &[Vec3]) {
        for &position in points {
            let cell = self.cell_of(position);
            let index = self.len;
            self.cells
                .entry(cell)
                .or_default()
                .push(Neighbor { index, position });
            self.len += 1;
        }
    }

    /// Clear and re-insert, so entry `i` refers to `points[i]`.
    pub fn rebuild(&mut self, points: &[Vec3]) {
        self.clear();
        self.insert(points);
    }

    /// Collect every entry within `radius` of `point` into `out`.
    ///
    /// `out` is cleared first and its allocation reused. A non-finite point
    /// or radius matches nothing.
    pub fn query(&self, point: Vec3, radius: f32, out: &mut Vec<Neighbor>) {
        out.clear();
        if !point.is_finite() || !radius.is_finite() {
            return;
        }
        // Far points saturate to the edge of the cell range; neighbor cells
        // wrap instead of overflowing and hold nothing within `radius`.
        let center = self.cell_of(point);
        let cell_radius = (radius / self.cell_size).ceil().max(0.0) as i32;

        for x in -cell_radius..=cell_radius {
            for y in -cell_radius..=cell_radius {
                for z in -cell_radius..=cell_radius {
                    let cell = center.wrapping_add(IVec3::new(x, y, z));
                    let Some(bucket) = self.cells.get(&cell) else {
                        continue;
                    };
                    out.extend(
                        bucket
                            .iter()
                            .filter(|entry| entry.position.distance(point) <= radius),
                    );
                }
            }
        }
    }

    /// Number of cells that currently hold at least one entry.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|bucket| !bucket.is_empty()).count()
    }
}
