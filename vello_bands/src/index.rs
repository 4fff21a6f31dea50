// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::{Mutex, PoisonError};

use log::debug;
use peniko::kurbo::Rect;

use crate::alloc::{GpuAllocator, GpuHandle};
use crate::band::BandHeader;
use crate::math::{Half4, Word4};
use crate::{Error, Normalization, Orientation, Result};

/// Summary information about a compiled index.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IndexProperties {
    /// The worst tessellation error of the input, in working coordinates.
    pub approximation_error: f64,
    /// The union bounding box of the input, in working coordinates.
    pub bounding_box: Option<Rect>,
    /// Number of horizontal header slots, `2^horizontal_generation` unless empty.
    pub horizontal_bands: u32,
    /// Number of vertical header slots, `2^vertical_generation` unless empty.
    pub vertical_bands: u32,
    pub horizontal_generation: u32,
    pub vertical_generation: u32,
    /// Mean over all header slots of the average of their two side costs.
    pub average_cost: f64,
}

/// Where the buffers of a resident index were placed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResidentIndex {
    pub payload_location: u32,
    pub header_location: u32,
}

#[derive(Debug)]
enum Residency {
    Uninitialized,
    /// The header upload failed after the payload was placed.
    PayloadOnly { payload: Box<dyn GpuHandle> },
    Resident {
        payload: Box<dyn GpuHandle>,
        header: Box<dyn GpuHandle>,
    },
}

/// The immutable output of the [`Compiler`](crate::Compiler).
///
/// The header starts with one `(horizontal_bands, vertical_bands, 0, 0)` record,
/// followed by the horizontal and then the vertical band slots. Each slot holds a
/// [`BandHeader`] whose offsets index the payload.
#[derive(Debug)]
pub struct CompiledIndex {
    normalization: Normalization,
    payload: Vec<Half4>,
    header: Vec<Word4>,
    properties: IndexProperties,
    residency: Mutex<Residency>,
}

impl CompiledIndex {
    pub(crate) fn new(
        normalization: Normalization,
        payload: Vec<Half4>,
        header: Vec<Word4>,
        properties: IndexProperties,
    ) -> Self {
        Self {
            normalization,
            payload,
            header,
            properties,
            residency: Mutex::new(Residency::Uninitialized),
        }
    }

    /// An index with no bands, for geometry which covers no area.
    pub(crate) fn empty(approximation_error: f64, bounding_box: Option<Rect>) -> Self {
        Self::new(
            Normalization::IDENTITY,
            Vec::new(),
            vec![Word4::default()],
            IndexProperties {
                approximation_error,
                bounding_box,
                ..IndexProperties::default()
            },
        )
    }

    /// The map from working coordinates to the normalized [-1, 1] square.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn payload(&self) -> &[Half4] {
        &self.payload
    }

    pub fn header(&self) -> &[Word4] {
        &self.header
    }

    pub fn properties(&self) -> &IndexProperties {
        &self.properties
    }

    /// Whether the index has no bands in either orientation.
    pub fn is_empty(&self) -> bool {
        self.properties.horizontal_bands == 0 && self.properties.vertical_bands == 0
    }

    /// The header slot `slot` of the given orientation, if it exists.
    pub fn band_header(&self, orientation: Orientation, slot: u32) -> Option<BandHeader> {
        let (first, count) = match orientation {
            Orientation::Horizontal => (1, self.properties.horizontal_bands),
            Orientation::Vertical => (
                1 + self.properties.horizontal_bands as usize,
                self.properties.vertical_bands,
            ),
        };
        if slot >= count {
            return None;
        }
        let [min_offset, min_count, max_offset, max_count] =
            self.header.get(first + slot as usize)?.0;
        Some(BandHeader {
            min_offset,
            min_count,
            max_offset,
            max_count,
        })
    }

    /// Whether [`ensure_resident`](Self::ensure_resident) has succeeded before.
    pub fn is_resident(&self) -> bool {
        let residency = self.residency.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*residency, Residency::Resident { .. })
    }

    /// Uploads the index through `allocator` unless that already happened.
    ///
    /// The payload is uploaded first, followed by a copy of the header whose band
    /// offsets include the payload location. Only the first successful call
    /// uploads; later calls return the same locations and ignore `allocator`.
    ///
    /// If only the header upload fails, the payload stays placed and a retry
    /// uploads just the header, so retries must go through the same allocator.
    pub fn ensure_resident(&self, allocator: &mut dyn GpuAllocator) -> Result<ResidentIndex> {
        // No upload happens while the lock holds a half-written state, so a
        // poisoned lock is safe to reuse.
        let mut residency = self.residency.lock().unwrap_or_else(PoisonError::into_inner);
        let payload = match std::mem::replace(&mut *residency, Residency::Uninitialized) {
            Residency::Resident { payload, header } => {
                let resident = ResidentIndex {
                    payload_location: payload.location(),
                    header_location: header.location(),
                };
                *residency = Residency::Resident { payload, header };
                return Ok(resident);
            }
            Residency::PayloadOnly { payload } => payload,
            Residency::Uninitialized => allocator.upload_half4(&self.payload)?,
        };

        let base = payload.location();
        let header = match self.upload_header(base, allocator) {
            Ok(header) => header,
            Err(err) => {
                *residency = Residency::PayloadOnly { payload };
                return Err(err);
            }
        };
        let resident = ResidentIndex {
            payload_location: base,
            header_location: header.location(),
        };
        debug!(
            "band index resident: payload at {}, header at {}",
            resident.payload_location, resident.header_location
        );
        *residency = Residency::Resident { payload, header };
        Ok(resident)
    }

    fn upload_header(
        &self,
        base: u32,
        allocator: &mut dyn GpuAllocator,
    ) -> Result<Box<dyn GpuHandle>> {
        let header = self.absolute_header(base).ok_or(Error::AllocationFailed {
            buffer: "word4",
            len: self.header.len(),
        })?;
        allocator.upload_word4(&header)
    }

    /// The header with `base` added to every band offset, `None` on overflow.
    fn absolute_header(&self, base: u32) -> Option<Vec<Word4>> {
        let mut header = Vec::with_capacity(self.header.len());
        let (counts, bands) = self.header.split_first()?;
        header.push(*counts);
        for record in bands {
            let [min_offset, min_count, max_offset, max_count] = record.0;
            header.push(Word4::from_u32s([
                min_offset.checked_add(base)?,
                min_count,
                max_offset.checked_add(base)?,
                max_count,
            ]));
        }
        Some(header)
    }
}

#[cfg(test)]
mod tests {
    use super::CompiledIndex;
    use crate::alloc::{CpuAllocator, GpuAllocator, GpuHandle};
    use crate::math::{Half4, Word4};
    use crate::{Error, Normalization, Orientation, Result};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn index_is_shareable() {
        assert_send_sync::<CompiledIndex>();
    }

    #[test]
    fn empty_index_has_only_count_record() {
        let index = CompiledIndex::empty(0.0, None);
        assert!(index.is_empty());
        assert_eq!(index.header(), [Word4::default()]);
        assert!(index.payload().is_empty());
        assert_eq!(index.band_header(Orientation::Horizontal, 0), None);
    }

    fn tiny_index() -> CompiledIndex {
        let mut index = CompiledIndex::empty(0.0, None);
        index.normalization = Normalization::IDENTITY;
        index.payload = vec![Half4::default(); 4];
        index.header = vec![
            Word4::from_u32s([1, 1, 0, 0]),
            Word4::from_u32s([0, 1, 2, 1]),
            Word4::from_u32s([4, 0, 4, 0]),
        ];
        index.properties.horizontal_bands = 1;
        index.properties.vertical_bands = 1;
        index
    }

    #[test]
    fn resident_header_offsets_are_absolute() {
        let index = tiny_index();
        let mut alloc = CpuAllocator::new();
        // Something else already lives in both buffers.
        alloc.upload_half4(&[Half4::default(); 10]).unwrap();
        alloc.upload_word4(&[Word4::default(); 3]).unwrap();

        let resident = index.ensure_resident(&mut alloc).unwrap();
        assert_eq!(resident.payload_location, 10);
        assert_eq!(resident.header_location, 3);
        let header = &alloc.word4_buffer()[3..];
        assert_eq!(header[0], Word4::from_u32s([1, 1, 0, 0]));
        assert_eq!(header[1], Word4::from_u32s([10, 1, 12, 1]));
        assert_eq!(header[2], Word4::from_u32s([14, 0, 14, 0]));
        // The index itself keeps relative offsets.
        assert_eq!(index.header()[1], Word4::from_u32s([0, 1, 2, 1]));
    }

    #[test]
    fn ensure_resident_uploads_once() {
        let index = tiny_index();
        let mut alloc = CpuAllocator::new();
        assert!(!index.is_resident());
        let first = index.ensure_resident(&mut alloc).unwrap();
        let second = index.ensure_resident(&mut alloc).unwrap();
        assert_eq!(first, second);
        assert!(index.is_resident());
        assert_eq!(alloc.half4_buffer().len(), 4);
        assert_eq!(alloc.word4_buffer().len(), 3);
    }

    #[test]
    fn failed_upload_can_be_retried() {
        let index = tiny_index();
        let mut full = CpuAllocator::with_limit(2);
        assert!(index.ensure_resident(&mut full).is_err());
        assert!(!index.is_resident());
        let mut alloc = CpuAllocator::new();
        assert!(index.ensure_resident(&mut alloc).is_ok());
    }

    /// Refuses the first header upload.
    #[derive(Default)]
    struct RefuseFirstHeader {
        inner: CpuAllocator,
        refused: bool,
        payload_uploads: u32,
    }

    impl GpuAllocator for RefuseFirstHeader {
        fn upload_half4(&mut self, data: &[Half4]) -> Result<Box<dyn GpuHandle>> {
            self.payload_uploads += 1;
            self.inner.upload_half4(data)
        }

        fn upload_word4(&mut self, data: &[Word4]) -> Result<Box<dyn GpuHandle>> {
            if !self.refused {
                self.refused = true;
                return Err(Error::AllocationFailed {
                    buffer: "word4",
                    len: data.len(),
                });
            }
            self.inner.upload_word4(data)
        }
    }

    #[test]
    fn header_retry_keeps_placed_payload() {
        let index = tiny_index();
        let mut alloc = RefuseFirstHeader::default();
        let err = index.ensure_resident(&mut alloc).unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationFailed {
                buffer: "word4",
                ..
            }
        ));
        assert!(!index.is_resident());

        let resident = index.ensure_resident(&mut alloc).unwrap();
        assert_eq!(alloc.payload_uploads, 1);
        assert_eq!(alloc.inner.half4_buffer().len(), 4);
        assert_eq!(resident.payload_location, 0);
        let header = alloc.inner.word4_buffer();
        assert_eq!(header[1], Word4::from_u32s([0, 1, 2, 1]));
    }

    #[test]
    fn header_offset_overflow_names_header_buffer() {
        let index = tiny_index();
        let mut far = BaseAt(u32::MAX - 1, CpuAllocator::new());
        let err = index.ensure_resident(&mut far).unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationFailed {
                buffer: "word4",
                len: 3
            }
        ));
    }

    /// Places every payload at a fixed location.
    struct BaseAt(u32, CpuAllocator);

    #[derive(Debug)]
    struct Fixed(u32);

    impl GpuHandle for Fixed {
        fn location(&self) -> u32 {
            self.0
        }
    }

    impl GpuAllocator for BaseAt {
        fn upload_half4(&mut self, _data: &[Half4]) -> Result<Box<dyn GpuHandle>> {
            Ok(Box::new(Fixed(self.0)))
        }

        fn upload_word4(&mut self, data: &[Word4]) -> Result<Box<dyn GpuHandle>> {
            self.1.upload_word4(data)
        }
    }
}
