//! # Kernel Memory Management
//!
//! Physical frame allocation, the kernel page directory and the kernel heap.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Heap (first-fit, 0xC000_0000, grows)        │
//! └──────────────┬───────────────────────────────┘
//!                │ HeapBacking
//! ┌──────────────▼───────────────────────────────┐
//! │  VMM (kernel directory, identity window)     │
//! └──────────────┬───────────────────────────────┘
//!                │ FrameAlloc
//! ┌──────────────▼───────────────────────────────┐
//! │  Bitmap frame allocator (4 KiB frames)       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Bring-up
//!
//! 1. [`BitmapFrameAlloc::at_physical`] claims the bitmap right after the
//!    kernel image and reserves everything below it.
//! 2. [`Vmm::initialize`] identity-maps low memory, routes vector 14 to
//!    [`page_fault::handle_page_fault`] and turns paging on.
//! 3. [`Heap::init`] backs the first heap pages through
//!    [`VmmHeapBacking`].
//!
//! Nothing in here locks. The kernel wraps the whole set in one
//! `SpinLock` and takes it with interrupts disabled.
//!
//! Every component is usable on the host: page tables are reached through
//! [`PhysMapper`](kernel_vmem::PhysMapper) and heap pages through
//! [`HeapBacking`], so tests substitute plain memory for both.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod frame_alloc;
pub mod heap;
pub mod page_fault;
pub mod vmm;

pub use frame_alloc::{BitmapFrameAlloc, FrameAllocError};
pub use heap::{BlockInfo, Heap, HeapBacking, HeapError};
pub use page_fault::{PageFaultError, install_page_fault_handler};
pub use vmm::{Vmm, VmmError, VmmHeapBacking, identity_window_end};
