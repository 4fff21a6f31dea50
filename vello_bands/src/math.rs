// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed vector types and the rational quadratic helpers shared by curves and bands.

use bytemuck::{Pod, Zeroable};
use peniko::kurbo::{Point, Rect};

/// Four IEEE-754 binary16 values, stored as raw bits.
///
/// This is the element type of the band payload buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct Half4(pub [u16; 4]);

impl Half4 {
    /// Rounds four `f32` values to half precision.
    pub fn from_f32s(values: [f32; 4]) -> Self {
        Self(values.map(f32_to_f16))
    }

    /// Widens the stored values back to `f32`.
    pub fn to_f32s(self) -> [f32; 4] {
        self.0.map(f16_to_f32)
    }
}

/// Four untyped 32-bit words.
///
/// Headers store unsigned integers in these, layer records mix integer and
/// floating point words.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct Word4(pub [u32; 4]);

impl Word4 {
    pub const fn from_u32s(values: [u32; 4]) -> Self {
        Self(values)
    }

    /// Stores the bit patterns of four `f32` values.
    pub fn from_f32s(values: [f32; 4]) -> Self {
        Self(values.map(f32::to_bits))
    }

    pub fn as_f32s(self) -> [f32; 4] {
        self.0.map(f32::from_bits)
    }
}

/// Converts an `f32` to IEEE-754 binary16 format represented as the bits of a `u16`.
///
/// Based on Fabian Giesen's `float_to_half_fast3`
/// (<https://gist.github.com/rygorous/2156668#file-gistfile1-cpp-L285>), rounding to nearest.
pub fn f32_to_f16(val: f32) -> u16 {
    const INF_32: u32 = 255 << 23;
    const INF_16: u32 = 31 << 23;
    const MAGIC: u32 = 15 << 23;
    const SIGN_MASK: u32 = 0x8000_0000_u32;
    const ROUND_MASK: u32 = !0xFFF_u32;

    let bits = val.to_bits();
    let sign = bits & SIGN_MASK;
    let magnitude = bits ^ sign;

    let half = if magnitude >= INF_32 {
        // NaN becomes a quiet NaN, infinity stays infinity.
        if magnitude > INF_32 {
            0x7E00
        } else {
            0x7C00
        }
    } else {
        let mut m = magnitude & ROUND_MASK;
        m = (f32::from_bits(m) * f32::from_bits(MAGIC)).to_bits();
        m = m.wrapping_sub(ROUND_MASK);
        // Exponent overflow saturates to infinity.
        m = m.min(INF_16);
        (m >> 13) as u16
    };
    half | (sign >> 16) as u16
}

/// Converts a binary16 value, given as its bits, to an `f32`.
///
/// Based on Fabian Giesen's `half_to_float()`
/// (<https://gist.github.com/rygorous/2156668#file-gistfile1-cpp-L574>).
pub fn f16_to_f32(bits: u16) -> f32 {
    const MAGIC: u32 = 113 << 23;
    const SHIFTED_EXP: u32 = 0x7c00 << 13;

    let bits = u32::from(bits);
    let mut o = (bits & 0x7fff) << 13;
    let exp = SHIFTED_EXP & o;
    o += (127 - 15) << 23;

    if exp == SHIFTED_EXP {
        // Inf or NaN
        o += (128 - 16) << 23;
    } else if exp == 0 {
        // Zero or subnormal
        o += 1 << 23;
        o = (f32::from_bits(o) - f32::from_bits(MAGIC)).to_bits();
    }

    f32::from_bits(o | ((bits & 0x8000) << 16))
}

/// Power basis coefficients `(n, d)` of the numerator and denominator of one
/// component of a rational quadratic with control values `a` and weight `w`.
///
/// Polynomial (non-rational) quadratics are the `w == 1` case, where `d` is `[1, 0, 0]`.
fn rational_coefficients(a: [f64; 3], w: f64) -> ([f64; 3], [f64; 3]) {
    let n = [a[0], 2.0 * (w * a[1] - a[0]), a[0] - 2.0 * w * a[1] + a[2]];
    let d = [1.0, 2.0 * (w - 1.0), 2.0 * (1.0 - w)];
    (n, d)
}

/// Coefficients of `component(t) - v`, with the denominator cleared.
///
/// The cleared equation `N(t) - v * D(t) = 0` has the same roots on [0, 1] as the
/// rational one since `D` is positive there for positive weights.
pub(crate) fn crossing_coefficients(a: [f64; 3], w: f64, v: f64) -> [f64; 3] {
    let (n, d) = rational_coefficients(a, w);
    [n[0] - v * d[0], n[1] - v * d[1], n[2] - v * d[2]]
}

/// Coefficients of the numerator of the derivative of one component.
///
/// `N' D - N D'` has degree two for rational quadratics, the cubic terms cancel.
fn derivative_coefficients(a: [f64; 3], w: f64) -> [f64; 3] {
    let (n, d) = rational_coefficients(a, w);
    [
        n[1] * d[0] - n[0] * d[1],
        2.0 * (n[2] * d[0] - n[0] * d[2]),
        n[2] * d[1] - n[1] * d[2],
    ]
}

/// Evaluates a rational quadratic at `t`.
pub(crate) fn eval_conic(p: [Point; 3], w: f64, t: f64) -> Point {
    let mt = 1.0 - t;
    let b0 = mt * mt;
    let b1 = 2.0 * w * t * mt;
    let b2 = t * t;
    let denom = b0 + b1 + b2;
    Point::new(
        (b0 * p[0].x + b1 * p[1].x + b2 * p[2].x) / denom,
        (b0 * p[0].y + b1 * p[1].y + b2 * p[2].y) / denom,
    )
}

/// Restricts a rational quadratic to `t0..t1`, returning the new control points
/// and the weight of the standard form (unit end weights).
///
/// Uses the blossom of the homogeneous curve, so it is exact for conics as well as
/// for plain quadratics (which keep a weight of 1).
pub(crate) fn conic_subsegment(p: [Point; 3], w: f64, t0: f64, t1: f64) -> ([Point; 3], f64) {
    let h = [
        [p[0].x, p[0].y, 1.0],
        [w * p[1].x, w * p[1].y, w],
        [p[2].x, p[2].y, 1.0],
    ];
    let blossom = |u: f64, v: f64| {
        let c0 = (1.0 - u) * (1.0 - v);
        let c1 = (1.0 - u) * v + u * (1.0 - v);
        let c2 = u * v;
        [0, 1, 2].map(|i| c0 * h[0][i] + c1 * h[1][i] + c2 * h[2][i])
    };
    let start = blossom(t0, t0);
    let ctrl = blossom(t0, t1);
    let end = blossom(t1, t1);
    let project = |q: [f64; 3]| Point::new(q[0] / q[2], q[1] / q[2]);
    let weight = ctrl[2] / (start[2] * end[2]).sqrt();
    ([project(start), project(ctrl), project(end)], weight)
}

/// Tight bounding box of a rational quadratic.
pub(crate) fn conic_bbox(p: [Point; 3], w: f64) -> Rect {
    let mut bbox = Rect::from_points(p[0], p[2]);
    let xs = [p[0].x, p[1].x, p[2].x];
    let ys = [p[0].y, p[1].y, p[2].y];
    for a in [xs, ys] {
        let [c0, c1, c2] = derivative_coefficients(a, w);
        for t in peniko::kurbo::common::solve_quadratic(c0, c1, c2) {
            if t > 0.0 && t < 1.0 {
                bbox = bbox.union_pt(eval_conic(p, w, t));
            }
        }
    }
    bbox
}
