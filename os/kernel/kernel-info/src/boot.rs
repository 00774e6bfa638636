//! # Kernel Boot Information
//!
//! Multiboot (v1) handoff. Only the fields the kernel consumes are
//! interpreted; the rest of the record is kept for layout fidelity.

/// Value a Multiboot-compliant loader leaves in `EAX` on entry.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// Magic value of the Multiboot header embedded in the kernel image.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Header flags: align modules on page boundaries, provide memory info.
pub const MULTIBOOT_HEADER_FLAGS: u32 = 0b11;

/// Header checksum; magic + flags + checksum must wrap to zero.
pub const MULTIBOOT_HEADER_CHECKSUM: u32 =
    0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC.wrapping_add(MULTIBOOT_HEADER_FLAGS));

/// `flags` bit signalling that `mem_lower`/`mem_upper` are valid.
pub const MULTIBOOT_INFO_MEMORY: u32 = 1 << 0;

/// Kernel entry signature as called from the assembly trampoline.
pub type KernelEntryFn = extern "C" fn(magic: u32, info: *const MultibootInfo) -> !;

/// Boot information record handed over by the loader.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct MultibootInfo {
    pub flags: u32,
    /// KiB of conventional memory starting at 0.
    pub mem_lower: u32,
    /// KiB of memory starting at 1 MiB.
    pub mem_upper: u32,
    pub boot_device: u32,
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    pub mmap_length: u32,
    pub mmap_addr: u32,
}

impl MultibootInfo {
    /// Whether the loader filled in the basic memory fields.
    #[must_use]
    pub const fn has_memory_info(&self) -> bool {
        self.flags & MULTIBOOT_INFO_MEMORY != 0
    }

    /// Total memory size in bytes as reported by the loader, saturated at
    /// the 4 GiB boundary.
    #[must_use]
    pub const fn total_memory_bytes(&self) -> u32 {
        let kib = self.mem_lower.saturating_add(self.mem_upper);
        kib.saturating_mul(1024)
    }
}

/// Whether `magic` identifies a Multiboot-compliant loader.
#[must_use]
pub const fn is_multiboot(magic: u32) -> bool {
    magic == MULTIBOOT_BOOTLOADER_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(lower: u32, upper: u32) -> MultibootInfo {
        MultibootInfo {
            flags: MULTIBOOT_INFO_MEMORY,
            mem_lower: lower,
            mem_upper: upper,
            boot_device: 0,
            cmdline: 0,
            mods_count: 0,
            mods_addr: 0,
            syms: [0; 4],
            mmap_length: 0,
            mmap_addr: 0,
        }
    }

    #[test]
    fn header_checksum_wraps_to_zero() {
        let sum = MULTIBOOT_HEADER_MAGIC
            .wrapping_add(MULTIBOOT_HEADER_FLAGS)
            .wrapping_add(MULTIBOOT_HEADER_CHECKSUM);
        assert_eq!(sum, 0);
    }

    #[test]
    fn total_memory_adds_lower_and_upper() {
        // QEMU with -m 128: 639 KiB low, 130_048 KiB above 1 MiB
        let info = info(639, 130_048);
        assert!(info.has_memory_info());
        assert_eq!(info.total_memory_bytes(), (639 + 130_048) * 1024);
    }

    #[test]
    fn total_memory_saturates() {
        assert_eq!(info(u32::MAX, 1).total_memory_bytes(), u32::MAX);
    }

    #[test]
    fn magic_check() {
        assert!(is_multiboot(0x2BAD_B002));
        assert!(!is_multiboot(0x1BAD_B002));
    }
}
