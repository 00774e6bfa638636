//! # Kernel Configuration and Boot Interface
//!
//! Memory layout constants, interrupt plumbing constants, and the
//! bootloader-to-kernel handoff record. Everything here is `const` and shared
//! by the kernel binary, its build script, and the memory-management crates.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1 MiB)        │  frame 0 lives here and is
//!             │  (BIOS, VGA, real-mode IVT)     │  never handed out
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS, stack)      │
//! FRAME_BITMAP├─────────────────────────────────┤ 0x0050_0000 (5 MiB)
//!             │   Frame bitmap (1 bit/frame)    │
//!             ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             └─────────────────────────────────┘
//! ```
//!
//! ## Virtual Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Identity map (VA == PA)        │  at least IDENTITY_MAP_MIN
//!             ├─────────────────────────────────┤
//!             │          unmapped               │
//! HEAP_BASE   ├─────────────────────────────────┤ 0xC000_0000
//!             │  Kernel heap (grows upward)     │
//!             └─────────────────────────────────┘
//! ```
//!
//! ## Boot Protocol
//!
//! The kernel is loaded by a Multiboot (v1) compliant loader. The loader
//! hands over the magic value in `EAX` and a pointer to [`MultibootInfo`](boot::MultibootInfo)
//! in `EBX`; see [`boot`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod interrupts;
pub mod memory;
