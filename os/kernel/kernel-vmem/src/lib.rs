//! # Virtual Memory Support
//!
//! Minimal IA-32 (non-PAE) paging helpers for the kernel.
//!
//! ## What you get
//! - An [`AddressSpace`] describing one page-directory-rooted translation tree.
//! - [`PageEntryBits`], the shared 32-bit PDE/PTE layout.
//! - 4 KiB-aligned [`PageDirectory`] and [`PageTable`] wrappers with typed indices.
//! - A tiny allocator/mapper interface ([`FrameAlloc`], [`PhysMapper`]).
//!
//! ## IA-32 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |  PD   |  PT   | Offset |
//! ```
//!
//! ```text
//!  CR3 → PD  →  PT  →  Physical Page
//!         │       │
//!         │       └───► PTE (Page Table Entry)     → maps 4 KiB page
//!         └───────────► PDE (Page Directory Entry) → points at a PT (4 MiB of VA)
//! ```
//!
//! | Level | Table name | Entry name | Description |
//! |:------|:-----------|:-----------|:------------|
//! | 2 | **PD** (Page Directory) | **PDE** | One per address space, referenced by CR3. Each entry covers 4 MiB. |
//! | 1 | **PT** (Page Table) | **PTE** | Each entry maps one 4 KiB frame (always a leaf). |
//!
//! Page tables are created lazily the first time an address inside their
//! 4 MiB window is mapped, and are never freed individually.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

#[cfg(any(test, feature = "test-support"))]
extern crate alloc;

pub mod address_space;
mod page_entry_bits;
mod page_table;

pub use crate::address_space::AddressSpace;
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::pd::{L2Index, PageDirectory, PdEntry};
pub use crate::page_table::pt::{L1Index, PageTable, PtEntry};
pub use crate::page_table::split_indices;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};

/// Failure to install a mapping. The mapping did not take effect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MapError {
    /// No physical frame was available for a new page table.
    #[error("out of physical frames while creating a page table")]
    OutOfFrames,
}

/// Minimal frame allocator used to obtain **physical** 4 KiB frames
/// for page tables.
///
/// Returned frames **must** be 4 KiB aligned; `None` means out of memory.
pub trait FrameAlloc {
    /// Allocate one 4 KiB physical frame.
    fn alloc_4k(&mut self) -> Option<PhysicalPage>;

    /// Return a frame obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, page: PhysicalPage);
}

/// Converts physical addresses to usable pointers in the current address
/// space.
///
/// The kernel identity-maps low memory, so its mapper is [`IdentityMapper`].
/// Tests back physical memory with an arena of frames.
pub trait PhysMapper {
    /// Convert a *physical* address to a mutable reference in the current address space.
    ///
    /// # Safety
    /// - `pa` must be mapped writable in the current address space for `'a`.
    /// - The bytes at `pa` must be a valid `T`, and no other reference to
    ///   them may be live.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// Physical address equals virtual address.
///
/// Valid before paging is enabled, and afterwards for every frame inside the
/// identity-mapped window.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *(pa.as_usize() as *mut T) }
    }
}

/// Drop the TLB entry for the page containing `va` (`invlpg`).
#[inline]
pub fn invalidate_tlb_page(va: VirtualAddress) {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u32(), options(nostack, preserves_flags));
    }

    #[cfg(not(target_arch = "x86"))]
    let _ = va;
}

/// Host-side doubles: frames in a heap arena and a bump allocator over them.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use alloc::vec::Vec;
    use core::cell::UnsafeCell;

    /// A 4 KiB-aligned raw frame. We use this as our "physical RAM" backing store in tests.
    #[repr(C, align(4096))]
    pub struct Aligned4K(UnsafeCell<[u8; 4096]>);

    /// Simulated physical memory: frame `i` lives at physical address `i * 4096`.
    pub struct TestPhys {
        frames: Vec<Aligned4K>,
    }

    impl TestPhys {
        #[must_use]
        pub fn with_frames(n: usize) -> Self {
            let frames = (0..n)
                .map(|_| Aligned4K(UnsafeCell::new([0; 4096])))
                .collect();
            Self { frames }
        }

        /// Fill a frame with garbage so that missing zeroing shows up.
        pub fn scribble(&self, page: PhysicalPage) {
            unsafe { (*self.frames[page.index()].0.get()).fill(0xA5) };
        }
    }

    impl PhysMapper for TestPhys {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            // Page tables always start at a frame boundary.
            debug_assert_eq!(pa.offset(), 0);
            let frame = &self.frames[pa.page().index()];
            unsafe { &mut *frame.0.get().cast::<T>() }
        }
    }

    /// A trivial **bump** allocator over frames `[next, end)` that counts
    /// outstanding frames.
    pub struct BumpAlloc {
        next: usize,
        end: usize,
        pub used: usize,
    }

    impl BumpAlloc {
        #[must_use]
        pub const fn new(start: usize, end: usize) -> Self {
            Self {
                next: start,
                end,
                used: 0,
            }
        }
    }

    impl FrameAlloc for BumpAlloc {
        fn alloc_4k(&mut self) -> Option<PhysicalPage> {
            if self.next >= self.end {
                return None;
            }
            let page = PhysicalPage::from_index(self.next);
            self.next += 1;
            self.used += 1;
            Some(page)
        }

        fn free_4k(&mut self, _page: PhysicalPage) {
            self.used -= 1;
        }
    }
}
