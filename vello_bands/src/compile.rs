// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compilation of accumulated geometry into a [`CompiledIndex`].

use log::debug;
use peniko::kurbo::{Affine, Point, Rect, Vec2};

use crate::index::IndexProperties;
use crate::math::Word4;
use crate::{Band, BandConfig, CompiledIndex, GeometryAccumulator, InputCurve, Orientation, Result};

/// A per-axis scale and offset mapping working coordinates to [-1, 1]².
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalization {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl Normalization {
    pub const IDENTITY: Self = Self {
        scale: Vec2::new(1.0, 1.0),
        offset: Vec2::ZERO,
    };

    /// The normalization stretching `bbox` onto [-1, 1]², `None` if it has no area.
    ///
    /// Both axes are scaled independently, so the aspect ratio is not kept.
    pub fn from_bbox(bbox: Rect) -> Option<Self> {
        let (width, height) = (bbox.width(), bbox.height());
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        let scale = Vec2::new(2.0 / width, 2.0 / height);
        let offset = Vec2::new(-1.0 - bbox.x0 * scale.x, -1.0 - bbox.y0 * scale.y);
        Some(Self { scale, offset })
    }

    pub fn to_affine(self) -> Affine {
        let Vec2 { x: sx, y: sy } = self.scale;
        let Vec2 { x: tx, y: ty } = self.offset;
        Affine::new([sx, 0.0, 0.0, sy, tx, ty])
    }

    pub fn apply(self, p: Point) -> Point {
        Point::new(
            p.x * self.scale.x + self.offset.x,
            p.y * self.scale.y + self.offset.y,
        )
    }
}

/// Builds band indices from accumulated geometry.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    config: BandConfig,
}

impl Compiler {
    /// Creates a compiler, failing if `config` does not validate.
    pub fn new(config: BandConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compiles the curves of `geometry`.
    ///
    /// Geometry without area yields an empty index rather than an error.
    pub fn compile(&self, geometry: &GeometryAccumulator) -> CompiledIndex {
        let bbox = geometry.bounding_box();
        let approximation_error = geometry.approximation_error();
        let Some(normalization) = bbox.and_then(Normalization::from_bbox) else {
            debug!("compiled empty band index from {} curves", geometry.len());
            return CompiledIndex::empty(approximation_error, bbox);
        };

        let mut payload = Vec::new();
        // The count record is filled in once both orientations are written.
        let mut header = vec![Word4::default()];
        let mut generations = [0; 2];
        let mut total_cost = 0.0;
        let orientations = [Orientation::Horizontal, Orientation::Vertical];
        for (orientation, generation) in orientations.into_iter().zip(&mut generations) {
            let transform = orientation.local_transform() * normalization.to_affine();
            let local: Vec<InputCurve> = geometry
                .curves()
                .iter()
                .map(|c| c.transform(transform))
                .collect();
            let bands = Band::create(&local, orientation, &self.config);
            *generation = bands
                .iter()
                .map(|b| b.region().generation())
                .max()
                .unwrap_or_default();

            let first = header.len();
            header.resize(first + (1 << *generation), Word4::default());
            for band in &bands {
                let record = band.write(&local, &mut payload).to_word4();
                let cost = band.cost();
                for slot in band.region().index_range(*generation) {
                    header[first + slot as usize] = record;
                    total_cost += 0.5 * (cost.min + cost.max);
                }
            }
        }

        let [horizontal_generation, vertical_generation] = generations;
        let horizontal_bands = 1 << horizontal_generation;
        let vertical_bands = 1 << vertical_generation;
        header[0] = Word4::from_u32s([horizontal_bands, vertical_bands, 0, 0]);
        let properties = IndexProperties {
            approximation_error,
            bounding_box: bbox,
            horizontal_bands,
            vertical_bands,
            horizontal_generation,
            vertical_generation,
            average_cost: total_cost / f64::from(horizontal_bands + vertical_bands),
        };
        let average_cost = properties.average_cost;
        let (curves, records) = (geometry.len(), payload.len());
        debug!(
            "compiled {curves} curves into {horizontal_bands} horizontal and {vertical_bands} \
             vertical bands, {records} payload records, average cost {average_cost:.3}"
        );
        CompiledIndex::new(normalization, payload, header, properties)
    }
}
