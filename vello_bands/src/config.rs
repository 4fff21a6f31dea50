// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{Error, Result};

/// The largest accepted [`BandConfig::max_recursion`].
///
/// Each orientation gets `2^max_generation` header records, so this bounds the
/// header at 4097 records per orientation pair.
pub const MAX_RECURSION_LIMIT: u32 = 12;

/// Options controlling how curves are partitioned into bands.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BandConfig {
    /// The deepest generation of band regions.
    ///
    /// Regions at this depth are accepted as leaves whatever their cost.
    pub max_recursion: u32,
    /// A region is accepted as a leaf once both of its side costs are below this.
    pub cost_threshold: f64,
    /// Keep every horizontal band curve on both sides and skip the trailing curve
    /// filter, so the evaluator has the full geometry available for artificial
    /// emboldening (used for text).
    pub thicken_horizontal: bool,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            max_recursion: 6,
            cost_threshold: 4.0,
            thicken_horizontal: true,
        }
    }
}

impl BandConfig {
    /// Checks that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_recursion > MAX_RECURSION_LIMIT {
            return Err(Error::InvalidConfig("max_recursion exceeds MAX_RECURSION_LIMIT"));
        }
        if !(self.cost_threshold.is_finite() && self.cost_threshold > 0.0) {
            return Err(Error::InvalidConfig("cost_threshold must be finite and positive"));
        }
        Ok(())
    }
}
