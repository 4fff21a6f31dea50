// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inside tests of compiled indices, using a reference evaluator which reads the
//! packed payload the same way a shader would.

// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

use vello_bands::peniko::kurbo::common::solve_quadratic;
use vello_bands::peniko::kurbo::{Affine, Point, Vec2};
use vello_bands::{
    BandConfig, CompiledIndex, Compiler, GeometryAccumulator, InputCurve, Orientation,
};

const CENTER: Point = Point::new(50.0, 50.0);
const RADIUS: f64 = 40.0;

/// Four quarter conics through the axis points at `radius` around [`CENTER`], with
/// the corners of the enclosing square as control points.
///
/// A weight of `FRAC_1_SQRT_2` gives a circle, larger weights pull the outline
/// towards the corners.
fn quarter_conics(geometry: &mut GeometryAccumulator, radius: f64, weight: f64) {
    let mut start = Vec2::new(radius, 0.0);
    for _ in 0..4 {
        let end = Vec2::new(-start.y, start.x);
        let conic = InputCurve::conic(CENTER + start, CENTER + start + end, CENTER + end, weight);
        geometry.push(conic);
        start = end;
    }
}

fn circle() -> GeometryAccumulator {
    let mut geometry = GeometryAccumulator::new();
    quarter_conics(&mut geometry, RADIUS, std::f64::consts::FRAC_1_SQRT_2);
    geometry
}

/// A ring: the circle plus a smaller, oppositely wound square hole made of lines.
fn ring() -> GeometryAccumulator {
    let mut geometry = circle();
    let (lo, hi) = (35.0, 65.0);
    geometry.push(InputCurve::line((lo, lo), (lo, hi)));
    geometry.push(InputCurve::line((lo, hi), (hi, hi)));
    geometry.push(InputCurve::line((hi, hi), (hi, lo)));
    geometry.push(InputCurve::line((hi, lo), (lo, lo)));
    geometry
}

/// Counts crossings of the ray from `q` along the band direction, in band-local
/// coordinates, using only the curves of the band containing `q`.
fn crossings(index: &CompiledIndex, orientation: Orientation, q: Point) -> u32 {
    let bands = match orientation {
        Orientation::Horizontal => index.properties().horizontal_bands,
        Orientation::Vertical => index.properties().vertical_bands,
    };
    let slot = ((q.y + 1.0) * 0.5 * f64::from(bands)).floor() as u32;
    let header = index.band_header(orientation, slot.min(bands - 1)).unwrap();
    let towards_max = q.x >= 0.0;
    let (offset, count) = if towards_max {
        (header.max_offset, header.max_count)
    } else {
        (header.min_offset, header.min_count)
    };

    let record = |k: usize| index.payload()[offset as usize + k].to_f32s().map(f64::from);
    let mut hits = 0;
    for i in 0..count as usize {
        let [x0, y0, cx, cy] = record(2 * i);
        let [x1, y1, w, extreme] = record(2 * i + 1);
        let past = if towards_max { extreme < q.x } else { extreme > q.x };
        if past {
            break;
        }
        let points = [Point::new(x0, y0), Point::new(cx, cy), Point::new(x1, y1)];
        for x in ray_hits(points, w, q.y) {
            if (x > q.x) == towards_max {
                hits += 1;
            }
        }
    }
    hits
}

/// The `x` coordinates where a conic crosses the line at height `y`, counting
/// parameters in [0, 1).
fn ray_hits(points: [Point; 3], w: f64, y: f64) -> impl Iterator<Item = f64> {
    let [p0, ctrl, p1] = points;
    let (a0, a1, a2) = (p0.y - y, ctrl.y - y, p1.y - y);
    let roots = solve_quadratic(a0, 2.0 * (w * a1 - a0), a0 - 2.0 * w * a1 + a2);
    roots
        .into_iter()
        .filter(|t| (0.0..1.0).contains(t))
        .map(move |t| eval(points, w, t).x)
}

fn eval(points: [Point; 3], w: f64, t: f64) -> Point {
    let [p0, ctrl, p1] = points;
    let mt = 1.0 - t;
    let (b0, b1, b2) = (mt * mt, 2.0 * w * mt * t, t * t);
    let sum = b0 * p0.to_vec2() + b1 * ctrl.to_vec2() + b2 * p1.to_vec2();
    (sum / (b0 + b1 + b2)).to_point()
}

fn source_points(curve: &InputCurve) -> [Point; 3] {
    let (p0, p1) = (curve.start(), curve.end());
    [p0, curve.control().unwrap_or(p0.midpoint(p1)), p1]
}

/// Even-odd inside test casting one ray through every curve of `geometry`.
fn ray_cast_inside(geometry: &GeometryAccumulator, p: Point) -> bool {
    let hits = geometry
        .curves()
        .iter()
        .flat_map(|c| ray_hits(source_points(c), c.weight(), p.y))
        .filter(|&x| x > p.x)
        .count();
    hits % 2 == 1
}

/// Whether `p` lies within `distance` of a dense sampling of the outline.
fn near_outline(geometry: &GeometryAccumulator, p: Point, distance: f64) -> bool {
    geometry.curves().iter().any(|c| {
        let points = source_points(c);
        (0..=64).any(|i| {
            let t = f64::from(i) / 64.0;
            (eval(points, c.weight(), t) - p).hypot() < distance
        })
    })
}

fn is_inside(index: &CompiledIndex, orientation: Orientation, p: Point) -> bool {
    let normalized = index.normalization().apply(p);
    let local = orientation.local_transform() * normalized;
    crossings(index, orientation, local) % 2 == 1
}

fn sample_points() -> Vec<Point> {
    let mut points = Vec::new();
    // Odd offsets keep the samples away from curve joints.
    for i in 0..23 {
        for j in 0..23 {
            let (x, y) = (3.3 + 4.1 * f64::from(i), 2.9 + 4.3 * f64::from(j));
            points.push(Point::new(x, y));
        }
    }
    points
}

fn check(geometry: &GeometryAccumulator, config: BandConfig, expected: impl Fn(Point) -> bool) {
    let index = Compiler::new(config).unwrap().compile(geometry);
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        for p in sample_points() {
            // Stay clear of the outline, where f16 rounding decides.
            let d = (p - CENTER).hypot();
            if (d - RADIUS).abs() < 0.5 {
                continue;
            }
            assert_eq!(
                is_inside(&index, orientation, p),
                expected(p),
                "{orientation:?} at {p:?} with {config:?}"
            );
        }
    }
}

fn configs() -> [BandConfig; 3] {
    [
        BandConfig::default(),
        BandConfig {
            thicken_horizontal: false,
            ..BandConfig::default()
        },
        BandConfig {
            max_recursion: 8,
            cost_threshold: 0.25,
            thicken_horizontal: false,
        },
    ]
}

#[test]
fn circle_inside() {
    for config in configs() {
        check(&circle(), config, |p| (p - CENTER).hypot() < RADIUS);
    }
}

#[test]
fn ring_inside() {
    for config in configs() {
        check(&ring(), config, |p| {
            let in_hole = (35.0..65.0).contains(&p.x) && (35.0..65.0).contains(&p.y);
            (p - CENTER).hypot() < RADIUS && !in_hole
        });
    }
}

/// Conics far from circular, pulled out towards the square's corners and, for the
/// hole, flattened towards their chords.
fn cushion() -> GeometryAccumulator {
    let mut geometry = GeometryAccumulator::new();
    quarter_conics(&mut geometry, RADIUS, 2.5);
    quarter_conics(&mut geometry, 0.5 * RADIUS, 0.2);
    geometry
}

#[test]
fn strongly_weighted_conics_match_full_ray_cast() {
    let geometry = cushion();
    // The outline bulges close to the corners of the square around it, while the
    // hole keeps the middle empty.
    let corner = CENTER + Vec2::new(0.8 * RADIUS, 0.8 * RADIUS);
    assert!(ray_cast_inside(&geometry, corner));
    assert!(!ray_cast_inside(&geometry, CENTER + Vec2::new(1.3, 0.7)));

    for config in configs() {
        let index = Compiler::new(config).unwrap().compile(&geometry);
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            for p in sample_points() {
                if near_outline(&geometry, p, 0.75) {
                    continue;
                }
                assert_eq!(
                    is_inside(&index, orientation, p),
                    ray_cast_inside(&geometry, p),
                    "{orientation:?} at {p:?} with {config:?}"
                );
            }
        }
    }
}

#[test]
fn circle_inside_after_working_transform() {
    // Non-uniform working transform: the index still normalizes to the unit square.
    let mut geometry = GeometryAccumulator::with_transform(Affine::scale_non_uniform(3.0, 0.5));
    for curve in circle().curves() {
        geometry.push(*curve);
    }
    let index = Compiler::default().compile(&geometry);
    let bbox = index.properties().bounding_box.unwrap();
    assert!((bbox.width() - 240.0).abs() < 1e-9);
    assert!((bbox.height() - 40.0).abs() < 1e-9);
    let center = Point::new(150.0, 25.0);
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        assert!(is_inside(&index, orientation, center));
        assert!(!is_inside(&index, orientation, Point::new(35.0, 8.0)));
    }
}
