// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Curve fragments used while classifying geometry into bands.

use peniko::kurbo::common::solve_quadratic;
use peniko::kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::math::{conic_bbox, conic_subsegment, crossing_coefficients};
use crate::{CurveId, CurveKind, InputCurve};

/// The amount by which band curve bounding boxes are inflated.
///
/// Payload coordinates span [-1, 1] and are stored as binary16, whose spacing
/// just below 1.0 is 2^-11. Two ulps of slack at the top of the range keep a curve
/// touching a band boundary from being classified out of it after rounding.
pub const BAND_EPSILON: f64 = 1.0 / 512.0;

/// Slack for the endpoint of a piece which lands on the cut after solving.
const SPLIT_FUZZ: f64 = 1e-9;

/// A coordinate axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn coord(self, p: Point) -> f64 {
        match self {
            Self::X => p.x,
            Self::Y => p.y,
        }
    }

    pub fn min(self, r: Rect) -> f64 {
        match self {
            Self::X => r.x0,
            Self::Y => r.y0,
        }
    }

    pub fn max(self, r: Rect) -> f64 {
        match self {
            Self::X => r.x1,
            Self::Y => r.y1,
        }
    }
}

/// A piece of an input curve, in band-local coordinates.
///
/// Fragments only guide classification: the payload written for a band curve always
/// describes the whole source curve, found through [`BandedCurve::source`].
#[derive(Clone, Debug, PartialEq)]
pub struct BandedCurve {
    source: CurveId,
    kind: CurveKind,
    points: [Point; 3],
    weight: f64,
    /// Tight bounds of the fragment.
    tight: Rect,
    /// `tight` inflated by [`BAND_EPSILON`].
    bbox: Rect,
}

/// The result of splitting a curve at a coordinate value.
#[derive(Clone, Debug, Default)]
pub struct Split {
    pub below: SmallVec<[BandedCurve; 2]>,
    pub above: SmallVec<[BandedCurve; 2]>,
}

impl BandedCurve {
    /// Wraps a whole curve, already expressed in band-local coordinates.
    pub fn new(source: CurveId, curve: &InputCurve) -> Self {
        Self::from_parts(
            source,
            curve.kind(),
            curve.points(),
            curve.weight(),
            curve.bounding_box(),
        )
    }

    fn from_parts(
        source: CurveId,
        kind: CurveKind,
        points: [Point; 3],
        weight: f64,
        tight: Rect,
    ) -> Self {
        Self {
            source,
            kind,
            points,
            weight,
            tight,
            bbox: tight.inflate(BAND_EPSILON, BAND_EPSILON),
        }
    }

    /// The original curve this fragment was cut from.
    pub fn source(&self) -> CurveId {
        self.source
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    /// Start, control and end point of the fragment.
    pub fn points(&self) -> [Point; 3] {
        self.points
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// The inflated bounding box of the fragment.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    /// Whether the curve has a constant coordinate along `axis`.
    ///
    /// A ray travelling perpendicular to `axis` can never cross such a curve, so it is
    /// left out of bands in that orientation.
    pub fn is_flat(&self, axis: Axis) -> bool {
        let [p0, ctrl, p1] = self.points.map(|p| axis.coord(p));
        p0 == p1 && (self.kind == CurveKind::Line || ctrl == p0)
    }

    /// Cuts the curve where its `axis` coordinate equals `v` and sorts the pieces to
    /// either side of `v`.
    ///
    /// A piece which straddles `v` lands on both sides. When more than one piece
    /// would land on the same side, that side gets the whole unsplit curve instead.
    pub fn split(&self, axis: Axis, v: f64) -> Split {
        let a = self.points.map(|p| axis.coord(p));
        let [c0, c1, c2] = match self.kind {
            CurveKind::Line => [a[0] - v, a[2] - a[0], 0.0],
            CurveKind::Quad | CurveKind::Conic => crossing_coefficients(a, self.weight, v),
        };
        let mut cuts: SmallVec<[f64; 4]> = solve_quadratic(c0, c1, c2)
            .into_iter()
            .filter(|t| *t > 0.0 && *t < 1.0)
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let mut split = Split::default();
        let mut t0 = 0.0;
        for t1 in cuts.iter().copied().chain([1.0]) {
            let piece = if cuts.is_empty() {
                self.clone()
            } else {
                self.subsegment(t0, t1)
            };
            // Pieces end on the cut, so touching `v` does not count as crossing it.
            let (lo, hi) = (axis.min(piece.tight), axis.max(piece.tight));
            let below = lo < v - SPLIT_FUZZ || hi <= v + SPLIT_FUZZ;
            let above = hi > v + SPLIT_FUZZ || lo >= v - SPLIT_FUZZ;
            if below {
                split.below.push(piece.clone());
            }
            if above {
                split.above.push(piece);
            }
            t0 = t1;
        }
        for side in [&mut split.below, &mut split.above] {
            if side.len() > 1 {
                side.clear();
                side.push(self.clone());
            }
        }
        split
    }

    fn subsegment(&self, t0: f64, t1: f64) -> Self {
        match self.kind {
            CurveKind::Line => {
                let [p0, _, p1] = self.points;
                let (q0, q1) = (p0.lerp(p1, t0), p0.lerp(p1, t1));
                Self::from_parts(
                    self.source,
                    self.kind,
                    [q0, q0.midpoint(q1), q1],
                    1.0,
                    Rect::from_points(q0, q1),
                )
            }
            CurveKind::Quad | CurveKind::Conic => {
                let (points, weight) = conic_subsegment(self.points, self.weight, t0, t1);
                Self::from_parts(
                    self.source,
                    self.kind,
                    points,
                    weight,
                    conic_bbox(points, weight),
                )
            }
        }
    }
}
