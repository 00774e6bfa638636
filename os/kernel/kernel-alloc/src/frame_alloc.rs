//! # Bitmap Physical Frame Allocator
//!
//! One bit per 4 KiB frame of physical memory: `1` = allocated, `0` = free.
//!
//! ```text
//! frame:  0 ........................ 0x4ff | 0x500 .. | ......................
//!         low memory + kernel image window | bitmap   | handed out, lowest first
//!         └────────────── reserved at construction ───┘
//! ```
//!
//! Reserved frames are marked allocated before the first allocation and are
//! never released by [`free`](BitmapFrameAlloc::free). Frame 0 is always
//! reserved, which makes physical address `0` usable as the failure sentinel
//! of [`allocate`](BitmapFrameAlloc::allocate).
//!
//! Only RAM below [`KERNEL_HEAP_BASE`] is tracked. Frames above it are
//! outside the identity window, so nothing could reach a table placed there.
//!
//! Allocation is a linear scan from the lowest frame. At the sizes this
//! kernel runs with that is a few hundred word loads in the worst case.

use core::ops::Range;
use kernel_info::memory::{FRAME_SIZE, KERNEL_HEAP_BASE, KERNEL_RESERVED_END};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};
use kernel_vmem::FrameAlloc;

/// Bits per bitmap word.
pub const BITS_PER_WORD: usize = u32::BITS as usize;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("frame bitmap needs {required} words but only {available} were provided")]
    BitmapTooSmall { required: usize, available: usize },
    #[error("frame bitmap at {0} is not frame aligned")]
    UnalignedBitmap(PhysicalAddress),
}

/// Number of bitmap words needed to track `total_memory` bytes.
#[must_use]
pub const fn bitmap_words(total_memory: u32) -> usize {
    frame_count(total_memory).div_ceil(BITS_PER_WORD)
}

/// Number of frames the bitmap itself occupies.
#[must_use]
pub const fn bitmap_frames(total_memory: u32) -> usize {
    let bytes = bitmap_words(total_memory) * size_of::<u32>();
    bytes.div_ceil(FRAME_SIZE as usize)
}

const fn frame_count(total_memory: u32) -> usize {
    let tracked = if total_memory < KERNEL_HEAP_BASE {
        total_memory
    } else {
        KERNEL_HEAP_BASE
    };
    (tracked / FRAME_SIZE) as usize
}

pub struct BitmapFrameAlloc<'a> {
    bitmap: &'a mut [u32],
    total_frames: usize,
    used_frames: usize,
    kernel: Range<usize>,
    bitmap_range: Range<usize>,
}

impl<'a> BitmapFrameAlloc<'a> {
    /// Build the allocator over `storage` for `total_memory` bytes of RAM.
    ///
    /// Clears the bitmap, then marks the kernel range
    /// (`0..KERNEL_RESERVED_END`) and the frames of the bitmap itself
    /// (starting at `bitmap_base`) as allocated. Frames beyond
    /// `total_memory` or at and above [`KERNEL_HEAP_BASE`] are not tracked.
    ///
    /// # Errors
    /// - [`FrameAllocError::BitmapTooSmall`] if `storage` is shorter than
    ///   [`bitmap_words`]`(total_memory)`.
    /// - [`FrameAllocError::UnalignedBitmap`] if `bitmap_base` is not frame aligned.
    pub fn new(
        storage: &'a mut [u32],
        bitmap_base: PhysicalAddress,
        total_memory: u32,
    ) -> Result<Self, FrameAllocError> {
        let required = bitmap_words(total_memory);
        if storage.len() < required {
            return Err(FrameAllocError::BitmapTooSmall {
                required,
                available: storage.len(),
            });
        }
        if !bitmap_base.is_page_aligned() {
            return Err(FrameAllocError::UnalignedBitmap(bitmap_base));
        }

        let total_frames = frame_count(total_memory);
        let bitmap = &mut storage[..required];
        bitmap.fill(0);

        let kernel = 0..frame_count(KERNEL_RESERVED_END);
        let first = bitmap_base.page().index();
        let bitmap_range = first..first + bitmap_frames(total_memory);

        let mut this = Self {
            bitmap,
            total_frames,
            used_frames: 0,
            kernel,
            bitmap_range,
        };
        this.reserve(this.kernel.clone());
        this.reserve(this.bitmap_range.clone());

        log::debug!(
            "frame bitmap: {} frames, {} reserved, bitmap at {bitmap_base}",
            this.total_frames,
            this.used_frames
        );
        Ok(this)
    }

    /// Build the allocator over a bitmap placed at `bitmap_base` in physical memory.
    ///
    /// # Safety
    /// `bitmap_base .. bitmap_base + bitmap_words(total_memory) * 4` must be
    /// writable RAM at the same virtual address (identity mapped or paging
    /// off), used by nothing else for `'static`.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub unsafe fn at_physical(
        bitmap_base: PhysicalAddress,
        total_memory: u32,
    ) -> Result<BitmapFrameAlloc<'static>, FrameAllocError> {
        let words = bitmap_words(total_memory);
        let storage =
            unsafe { core::slice::from_raw_parts_mut(bitmap_base.as_usize() as *mut u32, words) };
        BitmapFrameAlloc::new(storage, bitmap_base, total_memory)
    }

    fn reserve(&mut self, frames: Range<usize>) {
        for index in frames.start..frames.end.min(self.total_frames) {
            if !self.test(index) {
                self.set(index);
                self.used_frames += 1;
            }
        }
    }

    #[inline]
    const fn split(index: usize) -> (usize, u32) {
        (index / BITS_PER_WORD, 1 << (index % BITS_PER_WORD))
    }

    #[inline]
    fn test(&self, index: usize) -> bool {
        let (word, mask) = Self::split(index);
        self.bitmap[word] & mask != 0
    }

    #[inline]
    fn set(&mut self, index: usize) {
        let (word, mask) = Self::split(index);
        self.bitmap[word] |= mask;
    }

    #[inline]
    fn clear(&mut self, index: usize) {
        let (word, mask) = Self::split(index);
        self.bitmap[word] &= !mask;
    }

    fn is_reserved(&self, index: usize) -> bool {
        self.kernel.contains(&index) || self.bitmap_range.contains(&index)
    }

    /// Allocate the lowest free frame.
    pub fn allocate_page(&mut self) -> Option<PhysicalPage> {
        let (word_index, word) = self
            .bitmap
            .iter()
            .enumerate()
            .find(|(_, w)| **w != u32::MAX)?;
        let index = word_index * BITS_PER_WORD + word.trailing_ones() as usize;
        if index >= self.total_frames {
            return None;
        }

        self.set(index);
        self.used_frames += 1;
        Some(PhysicalPage::from_index(index))
    }

    /// Allocate the lowest free frame and return its physical base address,
    /// or `0` if every frame is in use.
    pub fn allocate(&mut self) -> u32 {
        self.allocate_page()
            .map_or(0, |page| page.base().as_u32())
    }

    /// Release the frame containing `address`.
    ///
    /// Freeing a free frame, a reserved frame or an untracked address is
    /// ignored (and logged).
    pub fn free(&mut self, address: u32) {
        self.free_page(PhysicalAddress::new(address).page());
    }

    /// Release `page`. See [`free`](Self::free).
    pub fn free_page(&mut self, page: PhysicalPage) {
        let index = page.index();
        if index >= self.total_frames {
            log::warn!("ignoring free of untracked frame {page}");
        } else if self.is_reserved(index) {
            log::warn!("ignoring free of reserved frame {page}");
        } else if !self.test(index) {
            log::warn!("ignoring double free of frame {page}");
        } else {
            self.clear(index);
            self.used_frames -= 1;
        }
    }

    /// Whether `page` is currently marked allocated.
    #[must_use]
    pub fn is_allocated(&self, page: PhysicalPage) -> bool {
        page.index() < self.total_frames && self.test(page.index())
    }

    #[must_use]
    pub const fn total_frames(&self) -> usize {
        self.total_frames
    }

    #[must_use]
    pub const fn used_frames(&self) -> usize {
        self.used_frames
    }

    /// Frames the allocator will never hand out.
    #[must_use]
    pub fn reserved_frames(&self) -> usize {
        let clamp = |r: &Range<usize>| r.start.min(self.total_frames)..r.end.min(self.total_frames);
        let kernel = clamp(&self.kernel);
        let bitmap = clamp(&self.bitmap_range);
        let overlap = kernel.end.min(bitmap.end).saturating_sub(kernel.start.max(bitmap.start));
        kernel.len() + bitmap.len() - overlap
    }

    /// `total_frames * FRAME_SIZE`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn total_memory(&self) -> u32 {
        // total_frames was derived from a u32 byte count.
        (self.total_frames as u32) * FRAME_SIZE
    }

    /// `(total_frames - used_frames) * FRAME_SIZE`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn free_memory(&self) -> u32 {
        ((self.total_frames - self.used_frames) as u32) * FRAME_SIZE
    }
}

impl FrameAlloc for BitmapFrameAlloc<'_> {
    fn alloc_4k(&mut self) -> Option<PhysicalPage> {
        self.allocate_page()
    }

    fn free_4k(&mut self, page: PhysicalPage) {
        self.free_page(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_info::memory::FRAME_BITMAP_BASE;

    const MIB: u32 = 1024 * 1024;

    fn with_alloc<R>(total: u32, f: impl FnOnce(&mut BitmapFrameAlloc<'_>) -> R) -> R {
        // Garbage in the storage must not survive construction.
        let mut storage = vec![0xFFFF_FFFF_u32; bitmap_words(total)];
        let mut alloc =
            BitmapFrameAlloc::new(&mut storage, PhysicalAddress::new(FRAME_BITMAP_BASE), total)
                .unwrap();
        f(&mut alloc)
    }

    #[test]
    fn bitmap_sizing() {
        assert_eq!(bitmap_words(16 * MIB), 128);
        assert_eq!(bitmap_frames(16 * MIB), 1);
        assert_eq!(bitmap_words(6 * MIB + 4096), 49);
        assert_eq!(bitmap_frames(512 * MIB), 4);
    }

    #[test]
    fn exhaustion_after_n_minus_k() {
        with_alloc(6 * MIB, |alloc| {
            let n = alloc.total_frames();
            let k = alloc.used_frames();
            assert_eq!(n, 1536);
            assert_eq!(k, 1280 + 1);

            for _ in 0..n - k {
                assert_ne!(alloc.allocate(), 0);
            }
            assert_eq!(alloc.allocate(), 0);
            assert_eq!(alloc.allocate(), 0);
            assert_eq!(alloc.free_memory(), 0);
        });
    }

    #[test]
    fn allocate_free_allocate_returns_same_frame() {
        with_alloc(16 * MIB, |alloc| {
            let first = alloc.allocate();
            alloc.free(first);
            assert_eq!(alloc.allocate(), first);
        });
    }

    #[test]
    fn kernel_and_bitmap_are_reserved_after_init() {
        with_alloc(16 * MIB, |alloc| {
            let first = alloc.allocate();
            assert!(first >= KERNEL_RESERVED_END);
            assert!(!(FRAME_BITMAP_BASE..FRAME_BITMAP_BASE + FRAME_SIZE).contains(&first));
            assert_eq!(first, 0x0050_1000);
            assert_eq!(alloc.reserved_frames(), 0x501);
        });
    }

    #[test]
    fn large_bitmap_reserves_all_its_frames() {
        with_alloc(512 * MIB, |alloc| {
            assert_eq!(alloc.allocate(), 0x0050_4000);
        });
    }

    #[test]
    fn double_free_is_ignored() {
        with_alloc(16 * MIB, |alloc| {
            let a = alloc.allocate();
            let _b = alloc.allocate();
            let used = alloc.used_frames();

            alloc.free(a);
            alloc.free(a);
            assert_eq!(alloc.used_frames(), used - 1);
        });
    }

    #[test]
    fn reserved_and_untracked_frames_cannot_be_freed() {
        with_alloc(16 * MIB, |alloc| {
            let used = alloc.used_frames();
            alloc.free(0);
            alloc.free(0x0010_0000);
            alloc.free(FRAME_BITMAP_BASE);
            alloc.free(0xF000_0000);
            assert_eq!(alloc.used_frames(), used);
            assert!(alloc.is_allocated(PhysicalPage::from_index(0)));
        });
    }

    #[test]
    fn memory_accounting() {
        with_alloc(16 * MIB, |alloc| {
            assert_eq!(alloc.total_memory(), 16 * MIB);
            let free = alloc.free_memory();
            let page = alloc.alloc_4k().unwrap();
            assert_eq!(alloc.free_memory(), free - FRAME_SIZE);
            alloc.free_4k(page);
            assert_eq!(alloc.free_memory(), free);
        });
    }

    #[test]
    fn ram_above_the_heap_base_is_not_tracked() {
        assert_eq!(bitmap_words(u32::MAX), bitmap_words(KERNEL_HEAP_BASE));
        with_alloc(u32::MAX, |alloc| {
            assert_eq!(alloc.total_memory(), KERNEL_HEAP_BASE);
            let above = PhysicalAddress::new(KERNEL_HEAP_BASE).page();
            alloc.free_page(above);
            assert!(!alloc.is_allocated(above));
        });
    }

    #[test]
    fn rejects_short_storage() {
        let mut storage = [0u32; 4];
        let err = BitmapFrameAlloc::new(
            &mut storage,
            PhysicalAddress::new(FRAME_BITMAP_BASE),
            16 * MIB,
        )
        .err();
        assert_eq!(
            err,
            Some(FrameAllocError::BitmapTooSmall {
                required: 128,
                available: 4
            })
        );
    }
}
