// Copyright 2026 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement of packed band data in GPU resident buffers.

use std::fmt::Debug;

use log::debug;

use crate::math::{Half4, Word4};
use crate::{Error, Result};

/// An uploaded array, kept alive for as long as the data must stay resident.
pub trait GpuHandle: Debug + Send + Sync {
    /// The index of the first uploaded element within its buffer.
    fn location(&self) -> u32;
}

/// Places arrays of packed vectors in the buffers read by the evaluator.
pub trait GpuAllocator {
    /// Uploads band payload data.
    fn upload_half4(&mut self, data: &[Half4]) -> Result<Box<dyn GpuHandle>>;

    /// Uploads header or layer data.
    fn upload_word4(&mut self, data: &[Word4]) -> Result<Box<dyn GpuHandle>>;
}

/// The handle returned by [`CpuAllocator`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CpuHandle {
    location: u32,
}

impl GpuHandle for CpuHandle {
    fn location(&self) -> u32 {
        self.location
    }
}

/// A bump allocator appending uploads to two host side buffers.
///
/// Useful for testing, and as the staging area of a backend which copies whole
/// buffers to the GPU at once.
#[derive(Clone, Debug, Default)]
pub struct CpuAllocator {
    half4: Vec<Half4>,
    word4: Vec<Word4>,
    limit: Option<usize>,
}

impl CpuAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose buffers each hold at most `limit` elements.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn half4_buffer(&self) -> &[Half4] {
        &self.half4
    }

    pub fn word4_buffer(&self) -> &[Word4] {
        &self.word4
    }
}

fn bump<T: Copy>(
    buffer: &mut Vec<T>,
    data: &[T],
    limit: Option<usize>,
    name: &'static str,
) -> Result<Box<dyn GpuHandle>> {
    let limit = limit.unwrap_or(usize::MAX);
    let end = buffer.len().checked_add(data.len());
    if !end.is_some_and(|end| end <= limit && u32::try_from(end).is_ok()) {
        return Err(Error::AllocationFailed {
            buffer: name,
            len: data.len(),
        });
    }
    let location = buffer.len() as u32;
    debug!("{name}: {} elements at {location}", data.len());
    buffer.extend_from_slice(data);
    Ok(Box::new(CpuHandle { location }))
}

impl GpuAllocator for CpuAllocator {
    fn upload_half4(&mut self, data: &[Half4]) -> Result<Box<dyn GpuHandle>> {
        bump(&mut self.half4, data, self.limit, "half4")
    }

    fn upload_word4(&mut self, data: &[Word4]) -> Result<Box<dyn GpuHandle>> {
        bump(&mut self.word4, data, self.limit, "word4")
    }
}

#[cfg(test)]
mod tests {
    use super::{CpuAllocator, GpuAllocator};
    use crate::math::{Half4, Word4};
    use crate::Error;

    #[test]
    fn uploads_are_placed_one_after_another() {
        let mut alloc = CpuAllocator::new();
        let first = Word4::from_u32s([1, 2, 3, 4]);
        let a = alloc.upload_word4(&[first]).unwrap();
        let b = alloc.upload_word4(&[Word4::default(); 3]).unwrap();
        let c = alloc.upload_half4(&[Half4::default(); 2]).unwrap();
        assert_eq!(a.location(), 0);
        assert_eq!(b.location(), 1);
        assert_eq!(c.location(), 0);
        assert_eq!(alloc.word4_buffer().len(), 4);
        assert_eq!(alloc.word4_buffer()[0], first);
    }

    #[test]
    fn limit_is_enforced() {
        let mut alloc = CpuAllocator::with_limit(2);
        assert!(alloc.upload_half4(&[Half4::default(); 2]).is_ok());
        let err = alloc.upload_half4(&[Half4::default()]).unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationFailed {
                buffer: "half4",
                len: 1
            }
        ));
        assert_eq!(alloc.half4_buffer().len(), 2);
    }
}
