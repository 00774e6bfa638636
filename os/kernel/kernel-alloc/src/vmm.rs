//! Minimal Virtual Memory Manager (VMM) for the kernel.
//!
//! Owns the kernel page directory and tracks the active one. Mapping
//! operations act on the active directory through
//! [`AddressSpace`](kernel_vmem::AddressSpace).
//!
//! # Example
//! ```ignore
//! use kernel_alloc::{frame_alloc::BitmapFrameAlloc, vmm::Vmm};
//! use kernel_vmem::IdentityMapper;
//!
//! let mut frames = unsafe { BitmapFrameAlloc::at_physical(bitmap, total)? };
//! let mut vmm = unsafe { Vmm::initialize(&IdentityMapper, &mut frames, total)? };
//! vmm.map(&mut frames, va, pa, PageEntryBits::kernel_rw())?;
//! ```

use crate::heap::{HeapBacking, HeapError};
use crate::page_fault::install_page_fault_handler;
use kernel_info::memory::{IDENTITY_MAP_MIN, KERNEL_HEAP_BASE};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage, VirtualAddress, align_down};
use kernel_vmem::{AddressSpace, FrameAlloc, MapError, PageEntryBits, PhysMapper, PtEntry};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmmError {
    #[error("building the kernel page directory failed: {0}")]
    Map(#[from] MapError),
    #[error("identity window end {0:#x} is not page aligned")]
    UnalignedWindow(u32),
}

/// End of the identity-mapped window for `total_memory` bytes of RAM: all
/// RAM below the heap, but at least [`IDENTITY_MAP_MIN`].
#[must_use]
pub const fn identity_window_end(total_memory: u32) -> u32 {
    let ram = if total_memory < KERNEL_HEAP_BASE {
        align_down(total_memory)
    } else {
        KERNEL_HEAP_BASE
    };
    if ram > IDENTITY_MAP_MIN {
        ram
    } else {
        IDENTITY_MAP_MIN
    }
}

/// Minimal kernel virtual memory manager.
pub struct Vmm<'m, M: PhysMapper> {
    mapper: &'m M,
    kernel_directory: PhysicalPage,
    current_directory: PhysicalPage,
}

impl<'m, M: PhysMapper> Vmm<'m, M> {
    /// Build the kernel directory with `[0, identity_end)` identity mapped
    /// as supervisor read/write. Paging is not touched.
    ///
    /// # Errors
    /// - [`VmmError::UnalignedWindow`] if `identity_end` is not page aligned.
    /// - [`VmmError::Map`] if `alloc` runs out of frames for tables.
    pub fn new<A: FrameAlloc>(
        mapper: &'m M,
        alloc: &mut A,
        identity_end: u32,
    ) -> Result<Self, VmmError> {
        if !identity_end.is_multiple_of(PAGE_SIZE) {
            return Err(VmmError::UnalignedWindow(identity_end));
        }

        let mut space = AddressSpace::create(mapper, alloc)?;
        for addr in (0..identity_end).step_by(PAGE_SIZE as usize) {
            space.map(
                alloc,
                VirtualAddress::new(addr),
                PhysicalAddress::new(addr),
                PageEntryBits::kernel_rw(),
            )?;
        }

        let root = space.root_page();
        log::debug!(
            "kernel directory at {root}, identity mapped up to {identity_end:#x} with {} tables",
            space.table_count()
        );
        Ok(Self {
            mapper,
            kernel_directory: root,
            current_directory: root,
        })
    }

    /// Build the kernel directory, route page faults to the fault report,
    /// then enable paging with write protection.
    ///
    /// # Safety
    /// `mapper` must reach every frame `alloc` hands out, before and after
    /// paging is enabled, and the running kernel must live inside the
    /// identity window.
    ///
    /// # Errors
    /// See [`new`](Self::new). Paging stays off on error.
    pub unsafe fn initialize<A: FrameAlloc>(
        mapper: &'m M,
        alloc: &mut A,
        total_memory: u32,
    ) -> Result<Self, VmmError> {
        let vmm = Self::new(mapper, alloc, identity_window_end(total_memory))?;
        install_page_fault_handler();

        #[cfg(all(target_arch = "x86", not(test)))]
        unsafe {
            vmm.enable_paging();
        }

        log::info!("paging enabled");
        Ok(vmm)
    }

    /// Load CR3 with the active directory, then set `CR0.PG` and `CR0.WP`.
    ///
    /// # Safety
    /// See [`initialize`](Self::initialize).
    #[cfg(target_arch = "x86")]
    pub unsafe fn enable_paging(&self) {
        use kernel_registers::cr0::Cr0;
        use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

        unsafe {
            self.space().activate();
            let cr0 = Cr0::load_unsafe().with_paging_enabled();
            cr0.store_unsafe();
        }
    }

    #[inline]
    fn space(&self) -> AddressSpace<'m, M> {
        AddressSpace::from_root(self.mapper, self.current_directory)
    }

    /// Map `va → pa` in the active directory.
    ///
    /// # Errors
    /// [`MapError::OutOfFrames`] if a page table was needed and `alloc` is
    /// exhausted. The mapping did not take effect.
    pub fn map<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<(), MapError> {
        self.space().map(alloc, va, pa, flags)
    }

    /// Clear the mapping for `va` in the active directory, if its table exists.
    pub fn unmap(&mut self, va: VirtualAddress) {
        self.space().unmap(va);
    }

    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.space().translate(va)
    }

    #[must_use]
    pub fn is_mapped(&self, va: VirtualAddress) -> bool {
        self.space().is_mapped(va)
    }

    /// The leaf entry for `va`, if its page table exists.
    #[must_use]
    pub fn leaf_entry(&self, va: VirtualAddress) -> Option<PtEntry> {
        self.space().leaf_entry(va)
    }

    /// Make `directory` the active address space and reload CR3.
    ///
    /// # Safety
    /// `directory` must be a valid page directory that maps the running
    /// kernel like the current one does.
    pub unsafe fn switch_directory(&mut self, directory: PhysicalPage) {
        self.current_directory = directory;

        #[cfg(target_arch = "x86")]
        unsafe {
            self.space().activate();
        }
    }

    /// The active directory.
    #[must_use]
    pub const fn get_directory(&self) -> PhysicalPage {
        self.current_directory
    }

    /// The directory built at initialization.
    #[must_use]
    pub const fn kernel_directory(&self) -> PhysicalPage {
        self.kernel_directory
    }
}

/// Backs heap pages with fresh frames mapped supervisor read/write.
pub struct VmmHeapBacking<'a, 'm, M: PhysMapper, A: FrameAlloc> {
    pub vmm: &'a mut Vmm<'m, M>,
    pub frames: &'a mut A,
}

impl<M: PhysMapper, A: FrameAlloc> HeapBacking for VmmHeapBacking<'_, '_, M, A> {
    fn back_page(&mut self, page: usize) -> Result<(), HeapError> {
        let va = u32::try_from(page).map_err(|_| HeapError::AddressOutOfRange(page))?;
        let frame = self
            .frames
            .alloc_4k()
            .ok_or(HeapError::OutOfFrames(page))?;

        let mapped = self.vmm.map(
            self.frames,
            VirtualAddress::new(va),
            frame.base(),
            PageEntryBits::kernel_rw(),
        );
        if let Err(e) = mapped {
            self.frames.free_4k(frame);
            return Err(e.into());
        }
        Ok(())
    }

    fn translate(&self, addr: usize) -> Option<PhysicalAddress> {
        let va = u32::try_from(addr).ok()?;
        self.vmm.translate(VirtualAddress::new(va))
    }
}
