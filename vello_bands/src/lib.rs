// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compiles path outlines into banded curve indices.
//!
//! A [`CompiledIndex`] lets a per-pixel evaluator find the winding number of a point
//! by casting a ray through one band of curves instead of through the whole outline.
//! Bands are built in two orientations, each by recursively subdividing the
//! normalized bounding box while splitting lowers the estimated ray casting cost.
//!
//! The payload is stored in half precision, so curve bounds are inflated by
//! [`BAND_EPSILON`] to keep classification conservative after rounding.
//!
//! ```
//! use vello_bands::{
//!     Compiler, CpuAllocator, GeometryAccumulator, InputCurve, Layer, MultiLayerPacker,
//! };
//! use vello_bands::peniko::{kurbo::Affine, Color, Fill};
//!
//! let mut geometry = GeometryAccumulator::new();
//! geometry.push(InputCurve::line((0.0, 0.0), (10.0, 0.0)));
//! geometry.push(InputCurve::quad((10.0, 0.0), (10.0, 10.0), (0.0, 10.0)));
//! geometry.push(InputCurve::line((0.0, 10.0), (0.0, 0.0)));
//!
//! let index = Compiler::default().compile(&geometry);
//! let mut allocator = CpuAllocator::new();
//! let layer = Layer {
//!     index: &index,
//!     transform: Affine::scale(2.0),
//!     color: Color::from_rgba8(0, 0, 0, 255),
//!     fill: Fill::NonZero,
//! };
//! let packed = MultiLayerPacker::pack(&[layer], &mut allocator)?;
//! assert_eq!(packed.data.len(), 4);
//! # Ok::<(), vello_bands::Error>(())
//! ```

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![expect(clippy::cast_possible_truncation, reason = "Deferred")]
#![allow(
    clippy::missing_assert_message,
    clippy::missing_panics_doc,
    clippy::exhaustive_enums,
    reason = "Deferred, only apply in some build targets so not expect"
)]

mod accumulator;
mod alloc;
mod band;
mod banded;
mod compile;
mod config;
mod curve;
mod index;
mod layer;
mod math;
mod region;

pub use peniko;

pub use accumulator::{GeometryAccumulator, Tolerance};
pub use alloc::{CpuAllocator, CpuHandle, GpuAllocator, GpuHandle};
pub use band::{Band, BandHeader, Cost, Orientation};
pub use banded::{Axis, BandedCurve, Split, BAND_EPSILON};
pub use compile::{Compiler, Normalization};
pub use config::{BandConfig, MAX_RECURSION_LIMIT};
pub use curve::{CurveId, CurveKind, InputCurve};
pub use index::{CompiledIndex, IndexProperties, ResidentIndex};
pub use layer::{Layer, MultiLayerPacker, PackedLayers, LAYER_SENTINEL};
pub use math::{f16_to_f32, f32_to_f16, Half4, Word4};
pub use region::{BandRegion, MAX_GENERATION};

use thiserror::Error;

/// Errors that can occur while building or uploading band indices.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A path given to [`GeometryAccumulator::add_path`] contains a cubic segment.
    ///
    /// Cubics have to be approximated by quadratics or conics before banding.
    #[error("Path contains a cubic segment")]
    CubicSegment,
    /// A [`BandConfig`] failed validation.
    #[error("Invalid band configuration: {0}")]
    InvalidConfig(&'static str),
    /// A [`GpuAllocator`] could not place an upload.
    #[error("Couldn't allocate {len} elements in the {buffer} buffer")]
    AllocationFailed { buffer: &'static str, len: usize },
}

/// Specialization of `Result` for our catch-all error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
