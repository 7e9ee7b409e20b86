//! # Water Flow
//!
//! Spreads liquid out of every existing liquid cell. Horizontal flow is
//! limited to [`WaterFlowSimulator::MAX_DISTANCE`] steps from the nearest
//! source; falling water resets the distance to zero and is processed
//! ahead of horizontal work, so it has no limit.
//!
//! Unlike ore and trees this pass keeps no per-chunk flag. It can be run
//! again after any edit.

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::collections::{HashMap, VecDeque};

use strata_core::{BlockKind, ChunkCoord, CHUNK_HEIGHT};

use super::{decorate, Region};
use crate::chunk::Chunk;

const UNVISITED: u8 = u8::MAX;

const HORIZONTAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Liquid propagation over merged regions.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaterFlowSimulator;

impl WaterFlowSimulator {
    /// Horizontal steps water may travel from a source.
    pub const MAX_DISTANCE: u8 = 7;

    /// Creates a simulator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs one pass over every active chunk. Returns the number of
    /// cells that became liquid.
    pub fn simulate(&self, active: &mut HashMap<ChunkCoord, Chunk>) -> usize {
        self.simulate_where(active, |_| true)
    }

    /// Runs one pass over the active chunks accepted by `filter`.
    pub fn simulate_where(
        &self,
        active: &mut HashMap<ChunkCoord, Chunk>,
        filter: impl Fn(&Chunk) -> bool,
    ) -> usize {
        let mut filled = 0;
        let touched = decorate(active, filter, |region| {
            filled += self.simulate_region(region);
        });
        if !touched.is_empty() {
            tracing::debug!("Water pass: {} chunks, {} cells filled", touched.len(), filled);
        }
        filled
    }

    /// Runs one pass over a merged region.
    pub fn simulate_region(&self, region: &mut Region) -> usize {
        let mut flow = FlowField::new(region);
        let mut queue = VecDeque::new();

        for y in 0..CHUNK_HEIGHT as i32 {
            for z in 0..region.depth() as i32 {
                for x in 0..region.width() as i32 {
                    if region.get(x, y, z).is_some_and(BlockKind::is_liquid) {
                        flow.record(x, y, z, 0);
                        queue.push_back((x, y, z));
                    }
                }
            }
        }

        let mut filled = 0;
        while let Some((x, y, z)) = queue.pop_front() {
            let distance = flow.distance(x, y, z);

            if distance < Self::MAX_DISTANCE {
                let next = distance + 1;
                for (dx, dz) in HORIZONTAL {
                    let (nx, nz) = (x + dx, z + dz);
                    if is_blocked(region, nx, y, nz) || flow.distance(nx, y, nz) <= next {
                        continue;
                    }
                    filled += usize::from(liquefy(region, nx, y, nz));
                    flow.record(nx, y, nz, next);
                    queue.push_back((nx, y, nz));
                }
            }

            let below = y - 1;
            if below >= 0 && !is_blocked(region, x, below, z) && flow.distance(x, below, z) != 0 {
                filled += usize::from(liquefy(region, x, below, z));
                flow.record(x, below, z, 0);
                queue.push_front((x, below, z));
            }
        }
        filled
    }
}

/// Solid blocks and columns outside the region's chunks stop water.
fn is_blocked(region: &Region, x: i32, y: i32, z: i32) -> bool {
    if !region.is_covered(x, z) {
        return true;
    }
    region.get(x, y, z).is_some_and(BlockKind::is_solid)
}

/// Turns an empty cell into water. Returns `true` if it was empty.
fn liquefy(region: &mut Region, x: i32, y: i32, z: i32) -> bool {
    if region.get(x, y, z).is_some() {
        return false;
    }
    region.set(x, y, z, Some(BlockKind::Water))
}

/// Recorded horizontal distance per region cell.
struct FlowField {
    width: usize,
    depth: usize,
    distance: Vec<u8>,
}

impl FlowField {
    fn new(region: &Region) -> Self {
        let (width, depth) = (region.width(), region.depth());
        Self {
            width,
            depth,
            distance: vec![UNVISITED; width * depth * CHUNK_HEIGHT],
        }
    }

    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.width || z >= self.depth || y >= CHUNK_HEIGHT {
            return None;
        }
        Some((y * self.depth + z) * self.width + x)
    }

    fn distance(&self, x: i32, y: i32, z: i32) -> u8 {
        self.index(x, y, z).map_or(0, |i| self.distance[i])
    }

    fn record(&mut self, x: i32, y: i32, z: i32, distance: u8) {
        if let Some(i) = self.index(x, y, z) {
            self.distance[i] = distance;
        }
    }
}
