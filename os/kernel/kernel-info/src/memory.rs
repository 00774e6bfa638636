//! # Memory Layout

use kernel_memory_addresses::{PAGE_SIZE, TABLE_COVERAGE};

/// Size of a physical frame in bytes.
pub const FRAME_SIZE: u32 = PAGE_SIZE;

/// Where the loader places the kernel image in *physical* memory.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const PHYS_LOAD: u32 = 0x0010_0000; // 1 MiB

/// Size of the window reserved for the kernel image above [`PHYS_LOAD`].
pub const KERNEL_IMAGE_WINDOW: u32 = 0x0040_0000; // 4 MiB

/// End (exclusive) of the physical range that is reserved before the frame
/// allocator hands out anything: low memory plus the kernel image window.
pub const KERNEL_RESERVED_END: u32 = PHYS_LOAD + KERNEL_IMAGE_WINDOW;

/// Physical address of the frame bitmap. It lives right after the reserved
/// kernel range and reserves its own frames at initialization.
pub const FRAME_BITMAP_BASE: u32 = KERNEL_RESERVED_END;

/// Lower bound for the identity-mapped region set up before paging is
/// enabled. All usable RAM below the heap is identity-mapped if it is larger.
pub const IDENTITY_MAP_MIN: u32 = 0x0080_0000; // 8 MiB

/// Fixed virtual base of the kernel heap.
pub const KERNEL_HEAP_BASE: u32 = 0xC000_0000;

/// Bytes mapped for the heap at initialization.
pub const KERNEL_HEAP_INITIAL_SIZE: u32 = 0x0010_0000; // 1 MiB

/// Upper bound for heap growth.
pub const KERNEL_HEAP_MAX_SIZE: u32 = 0x1000_0000; // 256 MiB

/// The size of the boot stack reserved in the kernel image.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

const _: () = {
    assert!(KERNEL_STACK_SIZE.is_multiple_of(FRAME_SIZE as usize));
    assert!(KERNEL_RESERVED_END.is_multiple_of(FRAME_SIZE));
    assert!(FRAME_BITMAP_BASE.is_multiple_of(FRAME_SIZE));
    assert!(IDENTITY_MAP_MIN.is_multiple_of(TABLE_COVERAGE));
    assert!(IDENTITY_MAP_MIN > FRAME_BITMAP_BASE);
    assert!(KERNEL_HEAP_BASE.is_multiple_of(TABLE_COVERAGE));
    assert!(KERNEL_HEAP_INITIAL_SIZE.is_multiple_of(FRAME_SIZE));
    assert!(KERNEL_HEAP_INITIAL_SIZE <= KERNEL_HEAP_MAX_SIZE);
    assert!(KERNEL_HEAP_BASE.checked_add(KERNEL_HEAP_MAX_SIZE).is_some());
};
