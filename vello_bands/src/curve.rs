// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::kurbo::{Affine, Point, Rect};

use crate::math::conic_bbox;

/// The primitive kinds accepted by the band compiler.
///
/// Cubics are not accepted, callers must approximate them beforehand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CurveKind {
    Line,
    Quad,
    /// Rational quadratic, used for exact circular and elliptical arcs.
    Conic,
}

/// Index of an [`InputCurve`] in the arena owned by a
/// [`GeometryAccumulator`](crate::GeometryAccumulator).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurveId(pub u32);

impl CurveId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One curve primitive in working coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputCurve {
    kind: CurveKind,
    p0: Point,
    ctrl: Point,
    p1: Point,
    weight: f64,
    bbox: Rect,
}

impl InputCurve {
    /// A line segment from `p0` to `p1`.
    pub fn line(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let (p0, p1) = (p0.into(), p1.into());
        Self {
            kind: CurveKind::Line,
            p0,
            ctrl: p0.midpoint(p1),
            p1,
            weight: 1.0,
            bbox: Rect::from_points(p0, p1),
        }
    }

    /// A quadratic Bézier from `p0` to `p1` with control point `ctrl`.
    pub fn quad(p0: impl Into<Point>, ctrl: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let (p0, ctrl, p1) = (p0.into(), ctrl.into(), p1.into());
        Self {
            kind: CurveKind::Quad,
            p0,
            ctrl,
            p1,
            weight: 1.0,
            bbox: conic_bbox([p0, ctrl, p1], 1.0),
        }
    }

    /// A conic (rational quadratic Bézier) with the given control point weight.
    ///
    /// # Panics
    ///
    /// Panics if `weight` is not finite and strictly positive.
    pub fn conic(
        p0: impl Into<Point>,
        ctrl: impl Into<Point>,
        p1: impl Into<Point>,
        weight: f64,
    ) -> Self {
        assert!(
            weight.is_finite() && weight > 0.0,
            "conic weight must be finite and positive, got {weight}"
        );
        let (p0, ctrl, p1) = (p0.into(), ctrl.into(), p1.into());
        Self {
            kind: CurveKind::Conic,
            p0,
            ctrl,
            p1,
            weight,
            bbox: conic_bbox([p0, ctrl, p1], weight),
        }
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn start(&self) -> Point {
        self.p0
    }

    pub fn end(&self) -> Point {
        self.p1
    }

    /// The control point, or `None` for lines.
    pub fn control(&self) -> Option<Point> {
        match self.kind {
            CurveKind::Line => None,
            CurveKind::Quad | CurveKind::Conic => Some(self.ctrl),
        }
    }

    /// The weight of the control point, 1.0 for lines and quadratics.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Tight bounding box of the curve.
    pub fn bounding_box(&self) -> Rect {
        self.bbox
    }

    /// The three points used when the curve is treated as a rational quadratic.
    ///
    /// For lines the middle point is the chord midpoint, which makes the line an
    /// exact degenerate quadratic.
    pub(crate) fn points(&self) -> [Point; 3] {
        [self.p0, self.ctrl, self.p1]
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.points().iter().all(|p| p.is_finite())
    }

    /// Maps the curve through `transform`.
    ///
    /// Conics are preserved by affine maps, so the weight is kept as is.
    pub fn transform(&self, transform: Affine) -> Self {
        let [p0, ctrl, p1] = self.points().map(|p| transform * p);
        match self.kind {
            CurveKind::Line => Self::line(p0, p1),
            CurveKind::Quad => Self::quad(p0, ctrl, p1),
            CurveKind::Conic => Self::conic(p0, ctrl, p1, self.weight),
        }
    }
}
