use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// A single 32-bit IA-32 paging entry (non-PAE) in its raw bitfield form.
///
/// Page-directory entries (PDE) and page-table entries (PTE) share this
/// layout; the low 12 bits are flags, the high 20 bits select a 4 KiB frame.
///
/// ### Bit layout
///
/// | Bits   | Name / Mnemonic | Meaning |
/// |--------|-----------------|---------|
/// | 0      | `P`             | Valid entry if set |
/// | 1      | `RW`            | Writable if set |
/// | 2      | `US`            | User-mode accessible if set |
/// | 3      | `PWT`           | Write-through caching |
/// | 4      | `PCD`           | Disable caching |
/// | 5      | `A`             | Accessed |
/// | 6      | `D`             | Dirty (PTE only) |
/// | 7      | `PS` / `PAT`    | 4 MiB page in a PDE, PAT in a PTE; always 0 here |
/// | 8      | `G`             | Global (PTE only) |
/// | 9–11   | AVL             | Reserved for OS use |
/// | 12–31  | `addr`          | Physical frame bits `[31:12]` |
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::kernel_rw().with_physical_address(PhysicalAddress::new(0x0030_0000));
/// assert_eq!(e.into_bits(), 0x0030_0003);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    ///
    /// With `CR0.WP` set, supervisor writes to read-only pages fault as well.
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on first write through a PTE.
    pub dirty: bool,

    /// Page Size (PS, bit 7). 4 MiB pages are not used; kept clear.
    pub large_page: bool,

    /// Global (G, bit 8). Ignored unless `CR4.PGE` is set.
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame number, bits `[31:12]` of the address.
    #[bits(20)]
    frame_number: u32,
}

impl PageEntryBits {
    /// Mask of the bits that are flags rather than address.
    pub const FLAGS_MASK: u32 = 0xFFF;

    /// `present | writable`, supervisor only.
    #[inline]
    #[must_use]
    pub const fn kernel_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// `present`, supervisor only, read-only.
    #[inline]
    #[must_use]
    pub const fn kernel_ro() -> Self {
        Self::new().with_present(true)
    }

    /// `present | writable | user`.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }

    /// Keep only the flag bits, dropping any address.
    #[inline]
    #[must_use]
    pub const fn flags_only(self) -> Self {
        Self::from_bits(self.into_bits() & Self::FLAGS_MASK)
    }

    /// Store the frame containing `phys`. The low 12 bits of `phys` are ignored.
    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        self.set_frame_number(phys.as_u32() >> 12);
    }

    /// Builder form of [`set_physical_address`](Self::set_physical_address).
    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, phys: PhysicalAddress) -> Self {
        self.set_physical_address(phys);
        self
    }

    /// Frame-aligned physical base stored in this entry.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_number() << 12)
    }

    /// The stored frame as a typed page.
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage {
        PhysicalPage::containing(self.physical_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_and_flags_do_not_overlap() {
        let e = PageEntryBits::user_rw().with_physical_address(PhysicalAddress::new(0xDEAD_BEEF));
        assert_eq!(e.physical_address().as_u32(), 0xDEAD_B000);
        assert_eq!(e.flags_only().into_bits(), 0b111);
        assert!(e.present() && e.writable() && e.user_access());
    }

    #[test]
    fn presets() {
        assert_eq!(PageEntryBits::kernel_rw().into_bits(), 0b011);
        assert_eq!(PageEntryBits::kernel_ro().into_bits(), 0b001);
        assert_eq!(PageEntryBits::user_rw().into_bits(), 0b111);
    }
}
