//! # Kernel Heap
//!
//! A first-fit allocator over a contiguous, demand-grown virtual region.
//! Every block starts with an embedded [`BlockHeader`]:
//!
//! ```text
//! start                                                            end
//! ├────────┬──────────────┬────────┬─────────┬────────┬─────────────┤
//! │ header │ payload (A)  │ header │ (B)     │ header │ free        │
//! └────────┴──────────────┴────────┴─────────┴────────┴─────────────┘
//!    │  next ───────────────►│  next ───────────►│  next = null
//! ```
//!
//! Blocks tile the region without gaps, in address order, so a block's
//! successor in the list is also its physical neighbour.
//!
//! - **Allocation**: round up to [`GRANULARITY`], take the first free block
//!   that fits and split it when the remainder exceeds
//!   `size + HEADER_SIZE + MIN_SPLIT_REMAINDER`. If nothing fits, grow the
//!   region once through a [`HeapBacking`] and retry once.
//! - **Free**: mark the block free and merge it with its right neighbour if
//!   that one is free too. A free block to the left is picked up when the
//!   left block itself is freed.
//! - **Validation**: each visited header must carry [`HEAP_MAGIC`]; on a
//!   mismatch allocation fails and free does nothing.

use core::ptr::{self, NonNull};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
use kernel_vmem::MapError;

/// Tag stored in every block header.
pub const HEAP_MAGIC: u32 = 0x1238_90AB;

/// Header preceding every block payload.
#[repr(C)]
pub struct BlockHeader {
    magic: u32,
    free: bool,
    size: usize,
    next: *mut BlockHeader,
}

/// Bytes occupied by a [`BlockHeader`].
pub const HEADER_SIZE: usize = size_of::<BlockHeader>();

/// Requests are rounded up to a multiple of this; payloads are aligned to it.
pub const GRANULARITY: usize = if align_of::<BlockHeader>() > 4 {
    align_of::<BlockHeader>()
} else {
    4
};

/// A block is only split if the new free block would be larger than this.
pub const MIN_SPLIT_REMAINDER: usize = 16;

const PAGE: usize = PAGE_SIZE as usize;

const _: () = {
    assert!(HEADER_SIZE.is_multiple_of(GRANULARITY));
    assert!(GRANULARITY.is_power_of_two());
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum HeapError {
    #[error("heap growth to {requested:#x} bytes exceeds the {max:#x} byte limit")]
    LimitReached { requested: usize, max: usize },
    #[error("no physical frame to back heap page {0:#x}")]
    OutOfFrames(usize),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("heap page {0:#x} is outside the 32-bit address space")]
    AddressOutOfRange(usize),
    #[error("heap region {start:#x}+{size:#x} is not page aligned")]
    Unaligned { start: usize, size: usize },
    #[error("corrupted heap block header at {0:#x}")]
    Corrupted(usize),
}

/// Supplies memory for the heap region.
pub trait HeapBacking {
    /// Make the page starting at `page` present and writable.
    ///
    /// # Errors
    /// Any failure leaves `page` unusable; the heap stops growing there.
    fn back_page(&mut self, page: usize) -> Result<(), HeapError>;

    /// Physical address behind `addr`, if known.
    fn translate(&self, addr: usize) -> Option<PhysicalAddress>;
}

/// One block as seen by [`Heap::blocks`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlockInfo {
    /// Payload address.
    pub addr: usize,
    /// Payload size in bytes.
    pub size: usize,
    pub free: bool,
}

enum Fit {
    Found(NonNull<u8>),
    NoFit,
    Corrupted(usize),
}

pub struct Heap {
    start: usize,
    end: usize,
    max_end: usize,
}

impl Heap {
    /// Back `[start, start + initial_size)` page by page and carve one free
    /// block spanning it.
    ///
    /// # Safety
    /// The virtual range `[start, start + max_size)` must be reserved for
    /// this heap alone, and `backing` must make pages in it writable memory.
    ///
    /// # Errors
    /// - [`HeapError::Unaligned`] if `start` or `initial_size` is not page aligned.
    /// - [`HeapError::LimitReached`] if `initial_size` exceeds `max_size`.
    /// - Any error of [`HeapBacking::back_page`].
    pub unsafe fn init<B: HeapBacking>(
        start: usize,
        initial_size: usize,
        max_size: usize,
        backing: &mut B,
    ) -> Result<Self, HeapError> {
        if !start.is_multiple_of(PAGE) || !initial_size.is_multiple_of(PAGE) || initial_size == 0
        {
            return Err(HeapError::Unaligned {
                start,
                size: initial_size,
            });
        }
        if initial_size > max_size {
            return Err(HeapError::LimitReached {
                requested: initial_size,
                max: max_size,
            });
        }
        let max_end = start
            .checked_add(max_size)
            .ok_or(HeapError::AddressOutOfRange(start))?;

        for page in (start..start + initial_size).step_by(PAGE) {
            backing.back_page(page)?;
        }

        unsafe {
            ptr::write(
                start as *mut BlockHeader,
                BlockHeader {
                    magic: HEAP_MAGIC,
                    free: true,
                    size: initial_size - HEADER_SIZE,
                    next: ptr::null_mut(),
                },
            );
        }

        log::debug!("heap at {start:#x}, {initial_size:#x} bytes");
        Ok(Self {
            start,
            end: start + initial_size,
            max_end,
        })
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// End (exclusive) of the currently backed region.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.end - self.start
    }

    /// Allocate `size` bytes aligned to [`GRANULARITY`].
    ///
    /// Returns `None` for a zero size, on heap corruption, or when growing
    /// the heap failed.
    pub fn allocate<B: HeapBacking>(
        &mut self,
        size: usize,
        backing: &mut B,
    ) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let size = size.checked_next_multiple_of(GRANULARITY)?;

        match self.try_fit(size) {
            Fit::Found(ptr) => return Some(ptr),
            Fit::Corrupted(at) => {
                log::warn!("heap block at {at:#x} failed validation; refusing allocation");
                return None;
            }
            Fit::NoFit => {}
        }

        if let Err(e) = self.grow(size.checked_add(HEADER_SIZE)?, backing) {
            log::warn!("heap growth for {size} bytes failed: {e}");
        }

        match self.try_fit(size) {
            Fit::Found(ptr) => Some(ptr),
            Fit::NoFit | Fit::Corrupted(_) => None,
        }
    }

    /// Like [`allocate`](Self::allocate), with the payload zeroed.
    pub fn allocate_zeroed<B: HeapBacking>(
        &mut self,
        size: usize,
        backing: &mut B,
    ) -> Option<NonNull<u8>> {
        let ptr = self.allocate(size, backing)?;
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Some(ptr)
    }

    /// Like [`allocate`](Self::allocate), also returning the physical
    /// address of the first payload byte.
    pub fn allocate_physical<B: HeapBacking>(
        &mut self,
        size: usize,
        backing: &mut B,
    ) -> Option<(NonNull<u8>, PhysicalAddress)> {
        let ptr = self.allocate(size, backing)?;
        match backing.translate(ptr.as_ptr() as usize) {
            Some(pa) => Some((ptr, pa)),
            None => {
                unsafe { self.free(ptr.as_ptr()) };
                None
            }
        }
    }

    /// Release a block returned by [`allocate`](Self::allocate).
    ///
    /// Null pointers, pointers outside the heap, blocks with a bad tag and
    /// blocks that are already free are ignored.
    ///
    /// # Safety
    /// `ptr` must not be in use by anyone after this call.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        let Some(block) = self.header_of(ptr) else {
            if !ptr.is_null() {
                log::warn!("ignoring free of non-heap pointer {ptr:p}");
            }
            return;
        };

        let header = unsafe { &mut *block };
        if header.magic != HEAP_MAGIC {
            log::warn!("ignoring free of {ptr:p}: block header tag mismatch");
            return;
        }
        if header.free {
            log::warn!("ignoring double free of {ptr:p}");
            return;
        }

        header.free = true;

        let next = header.next;
        if next.is_null() {
            return;
        }
        let right = unsafe { &*next };
        if right.magic == HEAP_MAGIC && right.free {
            debug_assert_eq!(block as usize + HEADER_SIZE + header.size, next as usize);
            header.size += HEADER_SIZE + right.size;
            header.next = right.next;
        }
    }

    /// Walk the block list, stopping at the first header with a bad tag.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        let mut current = self.start as *const BlockHeader;
        core::iter::from_fn(move || {
            if current.is_null() {
                return None;
            }
            let header = unsafe { &*current };
            if header.magic != HEAP_MAGIC {
                return None;
            }
            let info = BlockInfo {
                addr: current as usize + HEADER_SIZE,
                size: header.size,
                free: header.free,
            };
            current = header.next;
            Some(info)
        })
    }

    /// Check every header tag and that blocks tile the region exactly.
    ///
    /// # Errors
    /// [`HeapError::Corrupted`] with the address of the first bad header.
    pub fn check(&self) -> Result<(), HeapError> {
        let mut current = self.start as *const BlockHeader;
        let mut expected = self.start;
        while !current.is_null() {
            if current as usize != expected || expected >= self.end {
                return Err(HeapError::Corrupted(current as usize));
            }
            let header = unsafe { &*current };
            if header.magic != HEAP_MAGIC {
                return Err(HeapError::Corrupted(current as usize));
            }
            expected = current as usize + HEADER_SIZE + header.size;
            current = header.next;
        }
        if expected == self.end {
            Ok(())
        } else {
            Err(HeapError::Corrupted(expected))
        }
    }

    /// Payload bytes in blocks that are in use.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.blocks().filter(|b| !b.free).map(|b| b.size).sum()
    }

    /// Payload bytes in free blocks.
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.blocks().filter(|b| b.free).map(|b| b.size).sum()
    }

    fn header_of(&self, ptr: *mut u8) -> Option<*mut BlockHeader> {
        let addr = ptr as usize;
        let in_range = addr >= self.start + HEADER_SIZE && addr < self.end;
        if in_range && addr.is_multiple_of(GRANULARITY) {
            Some((addr - HEADER_SIZE) as *mut BlockHeader)
        } else {
            None
        }
    }

    /// One first-fit pass over the block list.
    fn try_fit(&mut self, size: usize) -> Fit {
        let mut current = self.start as *mut BlockHeader;
        while !current.is_null() {
            let header = unsafe { &mut *current };
            if header.magic != HEAP_MAGIC {
                return Fit::Corrupted(current as usize);
            }

            if header.free && header.size >= size {
                if header.size > size + HEADER_SIZE + MIN_SPLIT_REMAINDER {
                    let split = (current as usize + HEADER_SIZE + size) as *mut BlockHeader;
                    unsafe {
                        ptr::write(
                            split,
                            BlockHeader {
                                magic: HEAP_MAGIC,
                                free: true,
                                size: header.size - size - HEADER_SIZE,
                                next: header.next,
                            },
                        );
                    }
                    header.size = size;
                    header.next = split;
                }

                header.free = false;
                let payload = (current as usize + HEADER_SIZE) as *mut u8;
                return match NonNull::new(payload) {
                    Some(ptr) => Fit::Found(ptr),
                    None => Fit::Corrupted(current as usize),
                };
            }

            current = header.next;
        }
        Fit::NoFit
    }

    /// The last block in the list, or the first bad header.
    fn last_block(&self) -> Result<*mut BlockHeader, HeapError> {
        let mut current = self.start as *mut BlockHeader;
        loop {
            let header = unsafe { &*current };
            if header.magic != HEAP_MAGIC {
                return Err(HeapError::Corrupted(current as usize));
            }
            if header.next.is_null() {
                return Ok(current);
            }
            current = header.next;
        }
    }

    /// Extend the region to the page boundary covering `needed` more bytes
    /// and link the new space into the list.
    ///
    /// Pages backed before a failure are still linked in.
    fn grow<B: HeapBacking>(&mut self, needed: usize, backing: &mut B) -> Result<(), HeapError> {
        let last = self.last_block()?;

        let requested = self
            .end
            .checked_add(needed)
            .and_then(|end| end.checked_next_multiple_of(PAGE))
            .ok_or(HeapError::AddressOutOfRange(self.end))?;
        if requested > self.max_end {
            return Err(HeapError::LimitReached {
                requested: requested - self.start,
                max: self.max_end - self.start,
            });
        }

        let old_end = self.end;
        let mut result = Ok(());
        for page in (old_end..requested).step_by(PAGE) {
            if let Err(e) = backing.back_page(page) {
                result = Err(e);
                break;
            }
            self.end = page + PAGE;
        }

        let added = self.end - old_end;
        if added > 0 {
            log::debug!("heap grown by {added:#x} bytes to {:#x}", self.end);
            unsafe { self.link_tail(last, old_end, added) };
        }
        result
    }

    /// # Safety
    /// `last` is the last block and `[old_end, old_end + added)` is freshly
    /// backed memory directly after it.
    unsafe fn link_tail(&mut self, last: *mut BlockHeader, old_end: usize, added: usize) {
        let tail = unsafe { &mut *last };
        if tail.free {
            tail.size += added;
            return;
        }

        let block = old_end as *mut BlockHeader;
        unsafe {
            ptr::write(
                block,
                BlockHeader {
                    magic: HEAP_MAGIC,
                    free: true,
                    size: added - HEADER_SIZE,
                    next: ptr::null_mut(),
                },
            );
        }
        tail.next = block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    #[repr(C, align(4096))]
    struct Page([u8; 4096]);

    /// Host memory standing in for the heap's virtual range. Pages must be
    /// "backed" before the heap may touch them.
    struct FakeBacking {
        pages: Vec<Page>,
        backed: Vec<bool>,
        /// Refuse to back more than this many pages in total.
        budget: usize,
    }

    impl FakeBacking {
        fn new(pages: usize) -> Self {
            Self {
                pages: vec![Page([0xCC; 4096]); pages],
                backed: vec![false; pages],
                budget: pages,
            }
        }

        fn with_budget(mut self, budget: usize) -> Self {
            self.budget = budget;
            self
        }

        fn base(&self) -> usize {
            self.pages.as_ptr() as usize
        }

        fn backed_pages(&self) -> usize {
            self.backed.iter().filter(|b| **b).count()
        }
    }

    impl HeapBacking for FakeBacking {
        fn back_page(&mut self, page: usize) -> Result<(), HeapError> {
            assert!(page.is_multiple_of(PAGE));
            let index = (page - self.base()) / PAGE;
            assert!(index < self.pages.len(), "heap escaped its range");
            if self.backed_pages() >= self.budget {
                return Err(HeapError::OutOfFrames(page));
            }
            assert!(!self.backed[index], "page backed twice");
            self.backed[index] = true;
            Ok(())
        }

        fn translate(&self, addr: usize) -> Option<PhysicalAddress> {
            let offset = u32::try_from(addr - self.base()).ok()?;
            Some(PhysicalAddress::new(0x0100_0000 + offset))
        }
    }

    fn heap(backing: &mut FakeBacking, initial_pages: usize) -> Heap {
        let max = backing.pages.len() * PAGE;
        unsafe { Heap::init(backing.base(), initial_pages * PAGE, max, backing) }.unwrap()
    }

    #[test]
    fn init_backs_every_page_and_creates_one_free_block() {
        let mut backing = FakeBacking::new(8);
        let heap = heap(&mut backing, 4);

        assert_eq!(backing.backed_pages(), 4);
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(
            blocks,
            [BlockInfo {
                addr: heap.start() + HEADER_SIZE,
                size: 4 * PAGE - HEADER_SIZE,
                free: true
            }]
        );
        heap.check().unwrap();
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);
        assert!(heap.allocate(0, &mut backing).is_none());
        assert_eq!(heap.blocks().count(), 1);
    }

    #[test]
    fn sizes_round_up_to_granularity() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);
        let p = heap.allocate(1, &mut backing).unwrap();
        assert!((p.as_ptr() as usize).is_multiple_of(GRANULARITY));
        assert_eq!(heap.blocks().next().unwrap().size, GRANULARITY);
    }

    #[test]
    fn allocate_free_allocate_reuses_address() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(10, &mut backing).unwrap();
        unsafe { heap.free(a.as_ptr()) };
        let b = heap.allocate(10, &mut backing).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn split_only_above_threshold() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);
        let total = PAGE - HEADER_SIZE;

        // Small request: used block plus a free remainder.
        let small = heap.allocate(32, &mut backing).unwrap();
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].size, blocks[0].free), (32, false));
        assert_eq!((blocks[1].size, blocks[1].free), (total - 32 - HEADER_SIZE, true));
        unsafe { heap.free(small.as_ptr()) };
        assert_eq!(heap.blocks().count(), 1);

        // Remainder exactly at the threshold: the whole block is used.
        let request = total - HEADER_SIZE - MIN_SPLIT_REMAINDER;
        heap.allocate(request, &mut backing).unwrap();
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].size, blocks[0].free), (total, false));
    }

    #[test]
    fn free_merges_with_right_neighbour_only() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(64, &mut backing).unwrap();
        let b = heap.allocate(64, &mut backing).unwrap();
        let c = heap.allocate(64, &mut backing).unwrap();
        let _d = heap.allocate(64, &mut backing).unwrap();

        // C has a used right neighbour: nothing to merge.
        unsafe { heap.free(c.as_ptr()) };
        assert_eq!(heap.blocks().count(), 5);

        // B absorbs the free C to its right.
        unsafe { heap.free(b.as_ptr()) };
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[1].addr, b.as_ptr() as usize);
        assert_eq!(blocks[1].size, 64 + HEADER_SIZE + 64);
        assert!(blocks[1].free);

        // A merges with B+C once A itself is freed.
        unsafe { heap.free(a.as_ptr()) };
        let blocks: Vec<_> = heap.blocks().collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].size, 3 * 64 + 2 * HEADER_SIZE);
        heap.check().unwrap();
    }

    #[test]
    fn left_free_neighbour_is_not_merged() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(64, &mut backing).unwrap();
        let b = heap.allocate(64, &mut backing).unwrap();
        let _c = heap.allocate(64, &mut backing).unwrap();

        unsafe { heap.free(a.as_ptr()) };
        unsafe { heap.free(b.as_ptr()) };
        let free: Vec<_> = heap.blocks().filter(|b| b.free).collect();
        assert_eq!(free.len(), 3);
    }

    #[test]
    fn corrupted_tag_is_not_freed() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(16, &mut backing).unwrap();
        let before: Vec<_> = heap.blocks().collect();

        let header = (a.as_ptr() as usize - HEADER_SIZE) as *mut BlockHeader;
        unsafe { (*header).magic = 0xDEAD_BEEF };
        unsafe { heap.free(a.as_ptr()) };

        unsafe { (*header).magic = HEAP_MAGIC };
        let after: Vec<_> = heap.blocks().collect();
        assert_eq!(before, after);
        assert!(!after[0].free);
    }

    #[test]
    fn corrupted_list_fails_allocation() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(16, &mut backing).unwrap();
        let header = (a.as_ptr() as usize - HEADER_SIZE) as *mut BlockHeader;
        unsafe { (*header).magic = 0 };

        assert!(heap.allocate(16, &mut backing).is_none());
        assert_eq!(heap.check(), Err(HeapError::Corrupted(heap.start())));
    }

    #[test]
    fn double_and_foreign_frees_are_ignored() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let a = heap.allocate(16, &mut backing).unwrap();
        let _b = heap.allocate(16, &mut backing).unwrap();
        unsafe {
            heap.free(a.as_ptr());
            heap.free(a.as_ptr());
            heap.free(ptr::null_mut());
            heap.free(0x10 as *mut u8);
        }
        assert_eq!(heap.blocks().filter(|b| b.free).count(), 2);
        heap.check().unwrap();
    }

    #[test]
    fn grows_when_nothing_fits() {
        let mut backing = FakeBacking::new(8);
        let mut heap = heap(&mut backing, 1);

        let _small = heap.allocate(64, &mut backing).unwrap();
        let big = heap.allocate(2 * PAGE, &mut backing).unwrap();

        assert!(backing.backed_pages() > 1);
        assert!(heap.end() > heap.start() + PAGE);
        assert!((big.as_ptr() as usize) + 2 * PAGE <= heap.end());
        heap.check().unwrap();
    }

    #[test]
    fn growth_appends_after_used_tail() {
        let mut backing = FakeBacking::new(4);
        let mut heap = heap(&mut backing, 1);

        // Consume the whole first page.
        let _all = heap.allocate(PAGE - HEADER_SIZE, &mut backing).unwrap();
        let next = heap.allocate(100, &mut backing).unwrap();

        assert_eq!(next.as_ptr() as usize, heap.start() + PAGE + HEADER_SIZE);
        assert_eq!(heap.size(), 2 * PAGE);
        heap.check().unwrap();
    }

    #[test]
    fn growth_failure_returns_none() {
        let mut backing = FakeBacking::new(4).with_budget(1);
        let mut heap = heap(&mut backing, 1);

        assert!(heap.allocate(2 * PAGE, &mut backing).is_none());
        assert_eq!(heap.size(), PAGE);
        heap.check().unwrap();
    }

    #[test]
    fn growth_is_bounded_by_max_size() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        assert!(heap.allocate(4 * PAGE, &mut backing).is_none());
        assert_eq!(backing.backed_pages(), 1);
    }

    #[test]
    fn zeroed_allocation() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let p = heap.allocate_zeroed(64, &mut backing).unwrap();
        let bytes = unsafe { core::slice::from_raw_parts(p.as_ptr(), 64) };
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn physical_address_of_allocation() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        let (p, pa) = heap.allocate_physical(8, &mut backing).unwrap();
        let offset = p.as_ptr() as usize - heap.start();
        assert_eq!(pa.as_usize(), 0x0100_0000 + offset);
    }

    #[test]
    fn byte_accounting() {
        let mut backing = FakeBacking::new(2);
        let mut heap = heap(&mut backing, 1);

        heap.allocate(40, &mut backing).unwrap();
        assert_eq!(heap.used_bytes(), 40);
        assert_eq!(heap.free_bytes(), PAGE - 2 * HEADER_SIZE - 40);
    }
}
