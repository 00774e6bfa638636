//! Owner of the frame allocator, the kernel page directory and the heap.
//!
//! All three live in one [`SpinLock`] and are only touched through
//! [`with_memory`], which masks interrupts for the duration.

use core::ptr::NonNull;
use kernel_alloc::{
    BitmapFrameAlloc, FrameAllocError, Heap, HeapError, Vmm, VmmError, VmmHeapBacking,
};
use kernel_info::memory::{
    FRAME_BITMAP_BASE, KERNEL_HEAP_BASE, KERNEL_HEAP_INITIAL_SIZE, KERNEL_HEAP_MAX_SIZE,
};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::SpinLock;
use kernel_vmem::IdentityMapper;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MemoryInitError {
    #[error("memory is already initialized")]
    AlreadyInitialized,
    #[error("frame allocator: {0}")]
    Frames(#[from] FrameAllocError),
    #[error("virtual memory: {0}")]
    Vmm(#[from] VmmError),
    #[error("heap: {0}")]
    Heap(#[from] HeapError),
}

pub struct KernelMemory {
    frames: BitmapFrameAlloc<'static>,
    vmm: Vmm<'static, IdentityMapper>,
    heap: Heap,
}

static MEMORY: SpinLock<Option<KernelMemory>> = SpinLock::new(None);

/// Bring up frames, paging and the heap, in that order.
///
/// # Safety
/// Must run once, at CPL0, with the kernel image inside the reserved
/// window and the vector table loaded.
///
/// # Errors
/// Any failure leaves the memory subsystem unusable; the caller halts.
pub unsafe fn init(total_memory: u32) -> Result<(), MemoryInitError> {
    let mut memory = MEMORY.lock_irq();
    if memory.is_some() {
        return Err(MemoryInitError::AlreadyInitialized);
    }

    let mut frames = unsafe {
        BitmapFrameAlloc::at_physical(PhysicalAddress::new(FRAME_BITMAP_BASE), total_memory)?
    };
    log::info!(
        "frame allocator: {} frames, {} reserved",
        frames.total_frames(),
        frames.reserved_frames()
    );

    let mut vmm = unsafe { Vmm::initialize(&IdentityMapper, &mut frames, total_memory)? };

    let mut backing = VmmHeapBacking {
        vmm: &mut vmm,
        frames: &mut frames,
    };
    let heap = unsafe {
        Heap::init(
            KERNEL_HEAP_BASE as usize,
            KERNEL_HEAP_INITIAL_SIZE as usize,
            KERNEL_HEAP_MAX_SIZE as usize,
            &mut backing,
        )?
    };
    log::info!(
        "heap ready at {:#x}, {} KiB free memory",
        heap.start(),
        frames.free_memory() / 1024
    );

    *memory = Some(KernelMemory { frames, vmm, heap });
    Ok(())
}

/// Run `f` on the memory subsystem with interrupts masked.
///
/// Returns `None` before [`init`] succeeded.
pub fn with_memory<R>(f: impl FnOnce(&mut KernelMemory) -> R) -> Option<R> {
    MEMORY.with_lock_irq(|memory| memory.as_mut().map(f))
}

impl KernelMemory {
    /// Heap allocation, growing the heap through the page tables if needed.
    pub fn allocate(&mut self, size: usize, zeroed: bool) -> Option<NonNull<u8>> {
        let mut backing = VmmHeapBacking {
            vmm: &mut self.vmm,
            frames: &mut self.frames,
        };
        if zeroed {
            self.heap.allocate_zeroed(size, &mut backing)
        } else {
            self.heap.allocate(size, &mut backing)
        }
    }

    /// # Safety
    /// `ptr` must have come from [`allocate`](Self::allocate) and must not be
    /// used afterwards.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        unsafe { self.heap.free(ptr) };
    }

    pub const fn heap(&self) -> &Heap {
        &self.heap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_run_on_before_init() {
        assert_eq!(with_memory(|mem| mem.heap().size()), None);
    }
}
