//! Bitmap frame allocator
//!
//! One bit per physical frame, 64 frames per word. Allocation always hands
//! out the lowest clear bit, so freed frames are reused before the pool
//! grows towards its top.

use alloc::vec;
use alloc::vec::Vec;

use vmsim_api::error::invalid_argument;
use vmsim_api::{Error, FrameAllocator, FrameNum, Result};

const BITS_PER_WORD: usize = u64::BITS as usize;

/// Frame allocator backed by an occupancy bitmap
pub struct BitmapFrameAllocator {
    bitmap: Vec<u64>,
    total_frames: usize,
    allocated: usize,
    /// No word below this index has a clear bit
    search_hint: usize,
}

impl BitmapFrameAllocator {
    /// Create an allocator managing frames `0..total_frames`
    pub fn new(total_frames: usize) -> Self {
        Self {
            bitmap: vec![0; total_frames.div_ceil(BITS_PER_WORD)],
            total_frames,
            allocated: 0,
            search_hint: 0,
        }
    }

    /// Number of frames currently handed out
    pub fn allocated_frames(&self) -> usize {
        self.allocated
    }

    fn split(frame: FrameNum) -> (usize, u64) {
        (frame / BITS_PER_WORD, 1u64 << (frame % BITS_PER_WORD))
    }
}

impl FrameAllocator for BitmapFrameAllocator {
    fn alloc_frame(&mut self) -> Result<FrameNum> {
        for index in self.search_hint..self.bitmap.len() {
            let word = self.bitmap[index];
            if word == u64::MAX {
                continue;
            }
            let frame = index * BITS_PER_WORD + word.trailing_ones() as usize;
            if frame >= self.total_frames {
                break;
            }
            self.bitmap[index] |= 1u64 << (frame % BITS_PER_WORD);
            self.allocated += 1;
            self.search_hint = index;
            return Ok(frame);
        }
        self.search_hint = self.bitmap.len();
        Err(Error::OutOfFrames)
    }

    fn free_frame(&mut self, frame: FrameNum) -> Result<()> {
        if frame >= self.total_frames {
            return Err(invalid_argument("frame number outside the pool"));
        }
        let (index, mask) = Self::split(frame);
        if self.bitmap[index] & mask == 0 {
            return Err(invalid_argument("frame is not allocated"));
        }
        self.bitmap[index] &= !mask;
        self.allocated -= 1;
        self.search_hint = self.search_hint.min(index);
        Ok(())
    }

    fn is_allocated(&self, frame: FrameNum) -> bool {
        if frame >= self.total_frames {
            return false;
        }
        let (index, mask) = Self::split(frame);
        self.bitmap[index] & mask != 0
    }

    fn free_frames(&self) -> usize {
        self.total_frames - self.allocated
    }

    fn total_frames(&self) -> usize {
        self.total_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_frame_first() {
        let mut frames = BitmapFrameAllocator::new(8);
        for expected in 0..4 {
            assert_eq!(frames.alloc_frame(), Ok(expected));
        }
        frames.free_frame(1).unwrap();
        frames.free_frame(2).unwrap();
        assert_eq!(frames.alloc_frame(), Ok(1));
        assert_eq!(frames.alloc_frame(), Ok(2));
        assert_eq!(frames.alloc_frame(), Ok(4));
    }

    #[test]
    fn test_exhaustion() {
        let mut frames = BitmapFrameAllocator::new(3);
        for _ in 0..3 {
            frames.alloc_frame().unwrap();
        }
        assert_eq!(frames.alloc_frame(), Err(Error::OutOfFrames));
        assert_eq!(frames.free_frames(), 0);
        frames.free_frame(0).unwrap();
        assert_eq!(frames.alloc_frame(), Ok(0));
    }

    #[test]
    fn test_crosses_word_boundary() {
        let mut frames = BitmapFrameAllocator::new(130);
        for expected in 0..130 {
            assert_eq!(frames.alloc_frame(), Ok(expected));
        }
        assert!(frames.alloc_frame().is_err());
        frames.free_frame(127).unwrap();
        frames.free_frame(65).unwrap();
        assert_eq!(frames.alloc_frame(), Ok(65));
        assert_eq!(frames.alloc_frame(), Ok(127));
        assert!(frames.is_allocated(129));
        assert!(!frames.is_allocated(130));
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut frames = BitmapFrameAllocator::new(4);
        let frame = frames.alloc_frame().unwrap();
        frames.free_frame(frame).unwrap();
        assert!(frames.free_frame(frame).is_err());
        assert!(frames.free_frame(99).is_err());
        assert_eq!(frames.allocated_frames(), 0);
    }
}
