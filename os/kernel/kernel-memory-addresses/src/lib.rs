//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for 32-bit addresses and 4 KiB page bases used by
//! the frame allocator and the two-level paging code.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] / [`PhysicalPage`] | Physical memory (RAM, MMIO). |
//! | [`VirtualAddress`] / [`VirtualPage`] | Page-table translated memory. |
//!
//! [`PhysicalPage::from_index`] and [`PhysicalPage::index`] are the only
//! place where a frame number is turned into an address and back. Everything
//! that keeps per-frame state (the frame bitmap, test arenas) goes through
//! them.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xC012_3456);
//! assert_eq!(va.directory_index(), 0x300);
//! assert_eq!(va.table_index(), 0x123);
//! assert_eq!(va.offset(), 0x456);
//!
//! let frame = PhysicalPage::from_index(0x500);
//! assert_eq!(frame.base().as_u32(), 0x50_0000);
//! assert_eq!(frame.index(), 0x500);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Size of a page (virtual) and a frame (physical) in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the in-page offset bits.
pub const PAGE_OFFSET_MASK: u32 = PAGE_SIZE - 1;

/// Number of entries in a page directory or page table.
pub const ENTRIES_PER_TABLE: usize = 1024;

/// Bytes covered by one page table (one directory slot).
pub const TABLE_COVERAGE: u32 = PAGE_SIZE * ENTRIES_PER_TABLE as u32;

const _: () = {
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(TABLE_COVERAGE == 0x40_0000);
};

/// Round `value` up to the next page boundary, or `None` if that overflows.
#[inline]
#[must_use]
pub const fn align_up(value: u32) -> Option<u32> {
    match value.checked_add(PAGE_OFFSET_MASK) {
        Some(v) => Some(v & !PAGE_OFFSET_MASK),
        None => None,
    }
}

/// Round `value` down to its page boundary.
#[inline]
#[must_use]
pub const fn align_down(value: u32) -> u32 {
    value & !PAGE_OFFSET_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x12345), 0x12000);
        assert_eq!(align_up(0x12345), Some(0x13000));
        assert_eq!(align_up(0x13000), Some(0x13000));
        assert_eq!(align_up(0xFFFF_F001), None);
    }

    #[test]
    fn virtual_address_split() {
        let va = VirtualAddress::new(0xC040_1ABC);
        assert_eq!(va.directory_index(), 0x301);
        assert_eq!(va.table_index(), 1);
        assert_eq!(va.offset(), 0xABC);
        assert_eq!(va.page().base().as_u32(), 0xC040_1000);
    }

    #[test]
    fn frame_index_boundary() {
        for index in [0usize, 1, 0x500, 0xF_FFFF] {
            let page = PhysicalPage::from_index(index);
            assert_eq!(page.index(), index);
            assert_eq!(PhysicalPage::containing(page.base() + 0xFFF), page);
        }
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(format!("{}", PhysicalAddress::new(0x1000)), "0x00001000");
        assert_eq!(format!("{:?}", VirtualAddress::new(0xC000_0000)), "VA(0xC0000000)");
    }
}
