//! Multiboot header and the assembly entry point.
//!
//! The loader enters [`_start`] in 32-bit protected mode with paging off,
//! interrupts masked, `EAX` holding the loader magic and `EBX` the physical
//! address of the [`MultibootInfo`] record. There is no usable stack yet.

#[cfg(doc)]
use kernel_info::boot::MultibootInfo;
use kernel_info::boot::{
    KernelEntryFn, MULTIBOOT_HEADER_CHECKSUM, MULTIBOOT_HEADER_FLAGS, MULTIBOOT_HEADER_MAGIC,
};
use kernel_info::memory::KERNEL_STACK_SIZE;

#[repr(C, align(4))]
struct MultibootHeader {
    magic: u32,
    flags: u32,
    checksum: u32,
}

#[used]
#[unsafe(link_section = ".multiboot")]
static MULTIBOOT_HEADER: MultibootHeader = MultibootHeader {
    magic: MULTIBOOT_HEADER_MAGIC,
    flags: MULTIBOOT_HEADER_FLAGS,
    checksum: MULTIBOOT_HEADER_CHECKSUM,
};

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<KERNEL_STACK_SIZE> = Aligned([0; KERNEL_STACK_SIZE]);

// `_start` hands over exactly what the loader provided.
const _: KernelEntryFn = crate::kernel_main;

/// The kernel entry point.
///
/// # Naked function & Stack
/// Naked so that no prologue touches the (nonexistent) stack. It points
/// `ESP` at [`BOOT_STACK`], passes `EAX`/`EBX` on as cdecl arguments and
/// calls [`kernel_main`](crate::kernel_main), which never returns.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "cli",
        "lea esp, [{stack} + {stack_size}]",
        "and esp, -16",
        "xor ebp, ebp",
        // Keep ESP 16-byte aligned at the call after two pushes.
        "sub esp, 8",
        "push ebx",
        "push eax",
        "call {entry}",
        "2:",
        "cli",
        "hlt",
        "jmp 2b",
        stack = sym BOOT_STACK,
        stack_size = const KERNEL_STACK_SIZE,
        entry = sym crate::kernel_main,
    );
}
