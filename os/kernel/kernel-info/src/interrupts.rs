//! # Interrupt Plumbing Constants

/// Kernel code segment selector installed by the loader's flat GDT.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Kernel data segment selector reloaded on every trap entry.
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;

/// Number of vectors in the interrupt vector table.
pub const VECTOR_COUNT: usize = 256;

/// Vectors `0..EXCEPTION_COUNT` are CPU exceptions.
pub const EXCEPTION_COUNT: u8 = 32;

/// First vector hardware interrupt lines are remapped to.
pub const IRQ_BASE: u8 = 32;

/// Number of legacy hardware interrupt lines (two cascaded 8259s).
pub const IRQ_COUNT: u8 = 16;

/// First vector served by the secondary interrupt controller.
pub const IRQ_SECONDARY_BASE: u8 = IRQ_BASE + 8;

/// Primary interrupt controller command port.
pub const PIC1_COMMAND: u16 = 0x20;
/// Primary interrupt controller data port.
pub const PIC1_DATA: u16 = 0x21;
/// Secondary interrupt controller command port.
pub const PIC2_COMMAND: u16 = 0xA0;
/// Secondary interrupt controller data port.
pub const PIC2_DATA: u16 = 0xA1;

const _: () = {
    assert!(IRQ_BASE >= EXCEPTION_COUNT);
    assert!((IRQ_BASE as usize + IRQ_COUNT as usize) <= VECTOR_COUNT);
};
