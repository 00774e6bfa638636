//! # Global Allocator
//!
//! Routes `alloc` (`Box`, `Vec`, …) to the kernel heap in [`crate::memory`].
//!
//! ## Constraints
//! - The heap hands out payloads aligned to [`GRANULARITY`] only; layouts
//!   asking for more get a null pointer, which `alloc` turns into an
//!   allocation error.
//! - Every call takes the memory lock with interrupts masked, so handlers
//!   may allocate without deadlocking against the main line.
//! - Before [`memory::init`](crate::memory::init) has run every allocation
//!   fails.
//! - `dealloc` ignores the layout; the block header records the size.

use crate::memory;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{NonNull, null_mut};
use kernel_alloc::heap::GRANULARITY;

/// The kernel's global allocator.
pub struct KernelAllocator;

/// The installed global allocator instance.
#[cfg_attr(target_os = "none", global_allocator)]
static GLOBAL_ALLOCATOR: KernelAllocator = KernelAllocator;

/// Whether the heap can satisfy `layout`'s alignment.
#[must_use]
pub const fn layout_supported(layout: Layout) -> bool {
    layout.align() <= GRANULARITY
}

impl KernelAllocator {
    fn allocate(layout: Layout, zeroed: bool) -> *mut u8 {
        if !layout_supported(layout) {
            log::warn!(
                "refusing allocation of {} bytes aligned to {}",
                layout.size(),
                layout.align()
            );
            return null_mut();
        }

        memory::with_memory(|mem| mem.allocate(layout.size(), zeroed))
            .flatten()
            .map_or(null_mut(), NonNull::as_ptr)
    }
}

unsafe impl GlobalAlloc for KernelAllocator {
    /// # Safety
    /// The `GlobalAlloc` contract applies. Caller must handle a null return (OOM).
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        Self::allocate(layout, false)
    }

    /// # Safety
    /// The `GlobalAlloc` contract applies. `ptr` must come from this allocator.
    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if ptr.is_null() {
            return;
        }
        memory::with_memory(|mem| unsafe { mem.free(ptr) });
    }

    /// Zeroing happens inside the heap, under the same lock as the allocation.
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        Self::allocate(layout, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_up_to_granularity_is_supported() {
        assert!(layout_supported(Layout::new::<u8>()));
        assert!(layout_supported(Layout::new::<u32>()));
        assert!(layout_supported(
            Layout::from_size_align(64, GRANULARITY).unwrap()
        ));
        assert!(!layout_supported(
            Layout::from_size_align(64, GRANULARITY * 2).unwrap()
        ));
    }

    #[test]
    fn allocation_fails_before_memory_init() {
        let layout = Layout::from_size_align(16, 4).unwrap();
        assert!(unsafe { GLOBAL_ALLOCATOR.alloc(layout) }.is_null());
        assert!(unsafe { GLOBAL_ALLOCATOR.alloc_zeroed(layout) }.is_null());
        unsafe { GLOBAL_ALLOCATOR.dealloc(null_mut(), layout) };
    }
}
