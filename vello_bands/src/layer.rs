// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packing of transformed, colored instances of compiled indices.

use log::warn;
use peniko::kurbo::{Affine, Rect};
use peniko::{Color, Fill};

use crate::alloc::GpuAllocator;
use crate::math::Word4;
use crate::{CompiledIndex, Result};

/// Terminates the packed layer records.
pub const LAYER_SENTINEL: Word4 = Word4::from_u32s([u32::MAX; 4]);

/// One drawn instance of a compiled index.
#[derive(Copy, Clone, Debug)]
pub struct Layer<'a> {
    pub index: &'a CompiledIndex,
    /// Maps the index's working coordinates to caller coordinates.
    ///
    /// Only scale and translation are supported.
    pub transform: Affine,
    pub color: Color,
    pub fill: Fill,
}

/// The packed records of a batch of layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedLayers {
    /// Three records per layer followed by [`LAYER_SENTINEL`].
    pub data: Vec<Word4>,
    /// The union of the layers' bounding boxes in caller coordinates.
    pub bounds: Option<Rect>,
}

/// Writes layer records for the evaluator.
///
/// Each layer takes three records:
/// - the premultiplied color, as `f32` bits;
/// - `[sx, sy, tx, ty]` as `f32` bits, mapping caller coordinates to the normalized
///   coordinates of the index;
/// - `[header_location, fill_rule, 0, 0]`, where non-zero is 0 and even-odd is 1.
#[derive(Clone, Debug, Default)]
pub struct MultiLayerPacker {
    data: Vec<Word4>,
    bounds: Option<Rect>,
}

impl MultiLayerPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packs `layers` in order, uploading their indices as needed.
    pub fn pack(layers: &[Layer<'_>], allocator: &mut dyn GpuAllocator) -> Result<PackedLayers> {
        let mut packer = Self::new();
        for layer in layers {
            packer.push(layer, allocator)?;
        }
        Ok(packer.finish())
    }

    /// Adds one layer, always as three records so layer `i` starts at record `3 * i`.
    ///
    /// A layer of an empty index still points at its single-record header. A layer
    /// whose transform is singular is written transparent with a zero map.
    pub fn push(&mut self, layer: &Layer<'_>, allocator: &mut dyn GpuAllocator) -> Result<()> {
        let [a, b, c, d, e, f] = layer.transform.as_coeffs();
        debug_assert!(
            b == 0.0 && c == 0.0,
            "layer transforms can only scale and translate"
        );
        if b != 0.0 || c != 0.0 {
            warn!("A layer transform rotates or skews, using only its scale and translation.");
        }

        let resident = layer.index.ensure_resident(allocator)?;
        let (color, map) = if a == 0.0 || d == 0.0 {
            warn!("A layer transform is singular, the layer covers nothing.");
            ([0.0; 4], [0.0; 4])
        } else {
            // normalized = n.scale * (caller - translation) / scale + n.offset
            let n = layer.index.normalization();
            let (sx, sy) = (n.scale.x / a, n.scale.y / d);
            let (tx, ty) = (n.offset.x - sx * e, n.offset.y - sy * f);
            let bbox = layer.index.properties().bounding_box;
            if let Some(bbox) = bbox.filter(|_| !layer.index.is_empty()) {
                let bounds = layer.transform.transform_rect_bbox(bbox);
                self.bounds = Some(self.bounds.map_or(bounds, |b| b.union(bounds)));
            }
            let map = [sx as f32, sy as f32, tx as f32, ty as f32];
            (layer.color.premultiply().components, map)
        };

        let fill_rule = match layer.fill {
            Fill::NonZero => 0,
            Fill::EvenOdd => 1,
        };
        self.data.push(Word4::from_f32s(color));
        self.data.push(Word4::from_f32s(map));
        self.data
            .push(Word4::from_u32s([resident.header_location, fill_rule, 0, 0]));
        Ok(())
    }

    /// Appends the sentinel and returns the packed records.
    pub fn finish(mut self) -> PackedLayers {
        self.data.push(LAYER_SENTINEL);
        PackedLayers {
            data: self.data,
            bounds: self.bounds,
        }
    }
}
