// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::ops::Range;

/// The deepest generation a region can have, so that slot indices fit in a `u32`.
pub const MAX_GENERATION: u32 = 31;

/// A dyadic sub-interval of [0, 1].
///
/// The region covers `[raw_start / 2^generation, (raw_start + 1) / 2^generation]`.
/// Normalized coordinates map [0, 1] onto [-1, 1].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BandRegion {
    raw_start: u32,
    generation: u32,
}

impl BandRegion {
    /// Creates a region.
    ///
    /// # Panics
    ///
    /// Panics if `generation` exceeds [`MAX_GENERATION`] or `raw_start` is out of range
    /// for it.
    pub fn new(raw_start: u32, generation: u32) -> Self {
        assert!(
            generation <= MAX_GENERATION,
            "band region generation {generation} is too deep"
        );
        assert!(
            u64::from(raw_start) < 1_u64 << generation,
            "band region start {raw_start} is out of range for generation {generation}"
        );
        Self {
            raw_start,
            generation,
        }
    }

    /// The whole unit interval.
    pub const fn root() -> Self {
        Self {
            raw_start: 0,
            generation: 0,
        }
    }

    pub fn raw_start(self) -> u32 {
        self.raw_start
    }

    pub fn raw_end(self) -> u32 {
        self.raw_start + 1
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Splits the region at its midpoint into its lower and upper halves.
    pub fn split(self) -> (Self, Self) {
        let generation = self.generation + 1;
        (
            Self::new(2 * self.raw_start, generation),
            Self::new(2 * self.raw_start + 1, generation),
        )
    }

    fn scale(self) -> f64 {
        (-f64::from(self.generation)).exp2()
    }

    pub fn start(self) -> f64 {
        f64::from(self.raw_start) * self.scale()
    }

    pub fn end(self) -> f64 {
        f64::from(self.raw_end()) * self.scale()
    }

    pub fn mid(self) -> f64 {
        (f64::from(self.raw_start) + 0.5) * self.scale()
    }

    /// The midpoint mapped to [-1, 1], where the region is split.
    pub fn normalized_mid(self) -> f64 {
        2.0 * self.mid() - 1.0
    }

    /// The band slots this region covers in a table of `2^generation` slots.
    ///
    /// `generation` must be at least the region's own generation.
    pub fn index_range(self, generation: u32) -> Range<u32> {
        debug_assert!(
            generation >= self.generation,
            "cannot index a region at a coarser generation"
        );
        let shift = generation - self.generation;
        (self.raw_start << shift)..(self.raw_end() << shift)
    }
}
