// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collection of input curves ahead of compilation.

use log::warn;
use peniko::kurbo::{Affine, BezPath, PathEl, Point, Rect};

use crate::{Error, InputCurve, Result};

/// Tessellation error reported alongside a batch of curves.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Tolerance {
    /// Error in working coordinates.
    Absolute(f64),
    /// Error as a fraction of the larger side of the accumulated bounding box.
    Relative(f64),
}

/// Collects curves into working coordinates.
///
/// The accumulator also tracks the union bounding box of everything pushed and the
/// worst tessellation error reported by the caller.
#[derive(Clone, Debug)]
pub struct GeometryAccumulator {
    transform: Affine,
    curves: Vec<InputCurve>,
    bbox: Option<Rect>,
    absolute_error: f64,
    relative_error: f64,
}

impl Default for GeometryAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryAccumulator {
    pub fn new() -> Self {
        Self::with_transform(Affine::IDENTITY)
    }

    /// Creates an accumulator which maps every pushed curve through `transform`.
    pub fn with_transform(transform: Affine) -> Self {
        Self {
            transform,
            curves: Vec::new(),
            bbox: None,
            absolute_error: 0.0,
            relative_error: 0.0,
        }
    }

    /// Adds a single curve.
    ///
    /// Curves with non-finite coordinates are ill-defined and dropped.
    pub fn push(&mut self, curve: InputCurve) {
        let curve = if self.transform == Affine::IDENTITY {
            curve
        } else {
            curve.transform(self.transform)
        };
        if !curve.is_finite() {
            warn!("A curve contains NaN or infinite coordinates, ignoring it.");
            return;
        }
        let bbox = curve.bounding_box();
        self.bbox = Some(self.bbox.map_or(bbox, |b| b.union(bbox)));
        self.curves.push(curve);
    }

    /// Adds a batch of curves produced with the given tessellation error.
    pub fn extend(&mut self, curves: impl IntoIterator<Item = InputCurve>, error: Tolerance) {
        for curve in curves {
            self.push(curve);
        }
        self.note_error(error);
    }

    /// Records a tessellation error without adding geometry.
    pub fn note_error(&mut self, error: Tolerance) {
        match error {
            Tolerance::Absolute(e) => self.absolute_error = self.absolute_error.max(e),
            Tolerance::Relative(e) => self.relative_error = self.relative_error.max(e),
        }
    }

    /// Adds the line and quadratic segments of `path`.
    ///
    /// Open subpaths are closed with a line back to their start. Returns
    /// [`Error::CubicSegment`] if the path contains a cubic, in which case nothing is
    /// added.
    pub fn add_path(&mut self, path: &BezPath, error: Tolerance) -> Result<()> {
        let mut curves = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;
        fn close(curves: &mut Vec<InputCurve>, last: Point, start: Point) {
            if last != start {
                curves.push(InputCurve::line(last, start));
            }
        }
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    close(&mut curves, last, start);
                    start = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    curves.push(InputCurve::line(last, p));
                    last = p;
                }
                PathEl::QuadTo(c, p) => {
                    curves.push(InputCurve::quad(last, c, p));
                    last = p;
                }
                PathEl::CurveTo(..) => return Err(Error::CubicSegment),
                PathEl::ClosePath => {
                    close(&mut curves, last, start);
                    last = start;
                }
            }
        }
        close(&mut curves, last, start);
        self.extend(curves, error);
        Ok(())
    }

    /// The accumulated curves, in working coordinates.
    pub fn curves(&self) -> &[InputCurve] {
        &self.curves
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// The union of the bounding boxes of all curves, `None` if nothing was added.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.bbox
    }

    /// The worst reported tessellation error in working coordinates.
    ///
    /// Relative errors are resolved against the larger side of the bounding box.
    pub fn approximation_error(&self) -> f64 {
        let extent = self
            .bbox
            .map(|b| b.width().max(b.height()))
            .unwrap_or_default();
        self.absolute_error.max(self.relative_error * extent)
    }
}
