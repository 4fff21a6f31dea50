// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recursive, cost driven partitioning of curves into bands.
//!
//! Everything in this module works in band-local coordinates: the direction axis,
//! along which the evaluator casts its rays, is `x`; the boundary axis, which is
//! subdivided into [`BandRegion`]s, is `y`. [`Orientation::local_transform`] maps
//! normalized path coordinates into that frame.

use bytemuck::{Pod, Zeroable};
use log::trace;
use peniko::kurbo::Affine;

use crate::config::MAX_RECURSION_LIMIT;
use crate::math::{Half4, Word4};
use crate::{Axis, BandConfig, BandRegion, BandedCurve, CurveId, InputCurve};

/// The direction in which a set of bands is stacked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Horizontal strips, stacked along `y`, with rays cast along `x`.
    Horizontal,
    /// Vertical strips, stacked along `x`, with rays cast along `y`.
    Vertical,
}

impl Orientation {
    /// The map from normalized coordinates into band-local coordinates.
    ///
    /// Vertical bands use a quarter turn, `(x, y) -> (-y, x)`, which swaps the axes
    /// while keeping the winding direction of contours.
    pub fn local_transform(self) -> Affine {
        match self {
            Self::Horizontal => Affine::IDENTITY,
            Self::Vertical => Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]),
        }
    }

    fn is_thickened(self, config: &BandConfig) -> bool {
        self == Self::Horizontal && config.thicken_horizontal
    }
}

/// Estimated ray casting work for the two sides of a band.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Cost {
    pub min: f64,
    pub max: f64,
}

impl Cost {
    /// Sums, for each side, how far its curves reach out from the 0-line.
    pub fn of(min_side: &[BandedCurve], max_side: &[BandedCurve]) -> Self {
        Self {
            min: min_side.iter().map(|c| (-c.bbox().x0).max(0.0)).sum(),
            max: max_side.iter().map(|c| c.bbox().x1.max(0.0)).sum(),
        }
    }

    fn is_below(self, threshold: f64) -> bool {
        self.min < threshold && self.max < threshold
    }

    fn component_min(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.min(other.max),
        }
    }

    fn no_worse_than(self, other: Self) -> bool {
        self.min <= other.min && self.max <= other.max
    }
}

/// The header record of one band slot.
///
/// Offsets count [`Half4`] records from the start of the payload, counts count
/// curves (two records each).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct BandHeader {
    pub min_offset: u32,
    pub min_count: u32,
    pub max_offset: u32,
    pub max_count: u32,
}

impl BandHeader {
    pub fn to_word4(self) -> Word4 {
        Word4::from_u32s([
            self.min_offset,
            self.min_count,
            self.max_offset,
            self.max_count,
        ])
    }
}

/// The curves a ray cast from inside one region has to consider.
///
/// The min side serves rays travelling towards negative `x`, the max side rays
/// towards positive `x`.
#[derive(Clone, Debug)]
pub struct Band {
    orientation: Orientation,
    region: BandRegion,
    min_side: Vec<BandedCurve>,
    max_side: Vec<BandedCurve>,
    cost: Cost,
}

/// The outcome of visiting one region.
#[derive(Copy, Clone, Debug)]
struct Visit {
    split: bool,
    cost: Cost,
}

impl Band {
    /// Builds the bands for `curves`, given in band-local coordinates.
    ///
    /// The position of a curve in `curves` is its [`CurveId`]. The returned leaves
    /// are ordered by region and together cover [0, 1].
    pub fn create(
        curves: &[InputCurve],
        orientation: Orientation,
        config: &BandConfig,
    ) -> Vec<Self> {
        let thickened = orientation.is_thickened(config);
        let mut min_side = Vec::new();
        let mut max_side = Vec::new();
        for (i, curve) in curves.iter().enumerate() {
            let curve = BandedCurve::new(CurveId(i as u32), curve);
            if curve.is_flat(Axis::Y) {
                continue;
            }
            if thickened {
                min_side.push(curve.clone());
                max_side.push(curve);
            } else {
                let split = curve.split(Axis::X, 0.0);
                min_side.extend(split.below);
                max_side.extend(split.above);
            }
        }
        Self::partition(BandRegion::root(), orientation, min_side, max_side, config)
    }

    /// Partitions `region` given the curves already assigned to its two sides.
    ///
    /// `config.max_recursion` is clamped to [`MAX_RECURSION_LIMIT`].
    pub fn partition(
        region: BandRegion,
        orientation: Orientation,
        min_side: Vec<BandedCurve>,
        max_side: Vec<BandedCurve>,
        config: &BandConfig,
    ) -> Vec<Self> {
        let config = &BandConfig {
            max_recursion: config.max_recursion.min(MAX_RECURSION_LIMIT),
            ..*config
        };
        let mut leaves = Vec::new();
        visit(region, orientation, min_side, max_side, config, &mut leaves);
        leaves
    }

    fn leaf(
        region: BandRegion,
        orientation: Orientation,
        mut min_side: Vec<BandedCurve>,
        mut max_side: Vec<BandedCurve>,
        cost: Cost,
        config: &BandConfig,
    ) -> Self {
        // Rays stop looking once a curve's extreme is past the query point, so both
        // lists start with the curve reaching furthest out.
        min_side.sort_by(|a, b| a.bbox().x0.total_cmp(&b.bbox().x0));
        max_side.sort_by(|a, b| b.bbox().x1.total_cmp(&a.bbox().x1));
        if !orientation.is_thickened(config) {
            while min_side.last().is_some_and(|c| c.bbox().x0 > 0.0) {
                min_side.pop();
            }
            while max_side.last().is_some_and(|c| c.bbox().x1 < 0.0) {
                max_side.pop();
            }
        }
        Self {
            orientation,
            region,
            min_side,
            max_side,
            cost,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn region(&self) -> BandRegion {
        self.region
    }

    /// Curves for rays towards negative `x`, ascending by bounding box minimum.
    pub fn min_side(&self) -> &[BandedCurve] {
        &self.min_side
    }

    /// Curves for rays towards positive `x`, descending by bounding box maximum.
    pub fn max_side(&self) -> &[BandedCurve] {
        &self.max_side
    }

    /// The cost which justified accepting this band.
    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// Appends the payload of this band and returns its header record.
    ///
    /// `sources` are the original curves in band-local coordinates; each band curve
    /// is written as the whole curve it was cut from.
    pub fn write(&self, sources: &[InputCurve], payload: &mut Vec<Half4>) -> BandHeader {
        let min_offset = payload.len() as u32;
        for curve in &self.min_side {
            write_curve(&sources[curve.source().index()], curve.bbox().x0, payload);
        }
        let max_offset = payload.len() as u32;
        for curve in &self.max_side {
            write_curve(&sources[curve.source().index()], curve.bbox().x1, payload);
        }
        BandHeader {
            min_offset,
            min_count: self.min_side.len() as u32,
            max_offset,
            max_count: self.max_side.len() as u32,
        }
    }
}

fn visit(
    region: BandRegion,
    orientation: Orientation,
    min_side: Vec<BandedCurve>,
    max_side: Vec<BandedCurve>,
    config: &BandConfig,
    leaves: &mut Vec<Band>,
) -> Visit {
    let cost = Cost::of(&min_side, &max_side);
    if region.generation() >= config.max_recursion || cost.is_below(config.cost_threshold) {
        leaves.push(Band::leaf(region, orientation, min_side, max_side, cost, config));
        return Visit { split: false, cost };
    }

    let mid = region.normalized_mid();
    let mut lower = (Vec::new(), Vec::new());
    let mut upper = (Vec::new(), Vec::new());
    for curve in &min_side {
        let split = curve.split(Axis::Y, mid);
        lower.0.extend(split.below);
        upper.0.extend(split.above);
    }
    for curve in &max_side {
        let split = curve.split(Axis::Y, mid);
        lower.1.extend(split.below);
        upper.1.extend(split.above);
    }

    let first_child = leaves.len();
    let (lower_region, upper_region) = region.split();
    let lo = visit(lower_region, orientation, lower.0, lower.1, config, leaves);
    let hi = visit(upper_region, orientation, upper.0, upper.1, config, leaves);

    if !lo.split && !hi.split && cost.no_worse_than(lo.cost.component_min(hi.cost)) {
        let (start, generation) = (region.raw_start(), region.generation());
        trace!("rolling back split of {orientation:?} region {start}/{generation}");
        leaves.truncate(first_child);
        leaves.push(Band::leaf(region, orientation, min_side, max_side, cost, config));
        return Visit { split: false, cost };
    }
    Visit { split: true, cost }
}

fn write_curve(curve: &InputCurve, extreme: f64, payload: &mut Vec<Half4>) {
    let [p0, ctrl, p1] = curve.points();
    payload.push(Half4::from_f32s([p0.x as f32, p0.y as f32, ctrl.x as f32, ctrl.y as f32]));
    payload.push(Half4::from_f32s([
        p1.x as f32,
        p1.y as f32,
        curve.weight() as f32,
        extreme as f32,
    ]));
}
