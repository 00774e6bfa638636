//! # Interrupt Descriptor Table (IA-32)
//!
//! The IDT tells the CPU where to transfer control for each of the 256
//! vectors. In protected mode every gate is 8 bytes; the `lidt` operand is a
//! 16-bit limit followed by a 32-bit linear base.
//!
//! A single global table backs the whole kernel. [`initialize`] zeroes it and
//! loads it into `IDTR`; [`install_gate`] edits entries in place afterwards.
//! The CPU fetches gates from memory on every trap, so no reload is needed
//! after an edit as long as base and limit stay the same.

use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};
use kernel_info::interrupts::VECTOR_COUNT;
use kernel_sync::SpinLock;

use crate::Vector;

const _: () = assert!(size_of::<IdtEntry>() == 8);
const _: () = assert!(size_of::<Idt>() == 8 * VECTOR_COUNT);
const _: () = assert!(size_of::<Idtr>() == 6);

/// The type/attribute byte of a gate: `| P | DPL(2) | S | Type(4) |`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct GateFlags {
    /// **Type** – 0xE = 32-bit interrupt gate, 0xF = 32-bit trap gate.
    #[bits(4)]
    pub typ: u8,

    /// **S** – System bit (`0` for interrupt/trap gates).
    pub s: bool,

    /// **DPL** – Privilege required to raise the vector with `int n`.
    #[bits(2)]
    pub dpl: u8,

    /// **P** – Present bit.
    pub present: bool,
}

/// Gate kinds.
///
/// - [`GateType::InterruptGate`] clears `IF` on entry.
/// - [`GateType::TrapGate`] leaves `IF` unchanged.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GateType {
    InterruptGate,
    TrapGate,
}

impl GateFlags {
    /// Present, ring 0, 32-bit interrupt gate (`0x8E`).
    pub const KERNEL_INTERRUPT: Self = Self::gate(GateType::InterruptGate, 0);

    /// Present gate of the given type and privilege.
    #[must_use]
    pub const fn gate(typ: GateType, dpl: u8) -> Self {
        let typ = match typ {
            GateType::InterruptGate => 0xE,
            GateType::TrapGate => 0xF,
        };
        Self::new()
            .with_typ(typ)
            .with_s(false)
            .with_dpl(dpl)
            .with_present(true)
    }
}

/// One 8-byte gate descriptor.
///
/// ```text
/// 63            48 47      40 39    32 31          16 15            0
/// ┌───────────────┬──────────┬────────┬──────────────┬───────────────┐
/// │ offset[31:16] │  flags   │  zero  │   selector   │ offset[15:0]  │
/// └───────────────┴──────────┴────────┴──────────────┴───────────────┘
/// ```
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    zero: u8,
    flags: GateFlags,
    offset_hi: u16,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        zero: 0,
        flags: GateFlags::new(),
        offset_hi: 0,
    };

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(target: u32, selector: u16, flags: GateFlags) -> Self {
        Self {
            offset_lo: target as u16,
            selector,
            zero: 0,
            flags,
            offset_hi: (target >> 16) as u16,
        }
    }

    /// Address of the trap stub this gate transfers to.
    #[must_use]
    pub const fn target(&self) -> u32 {
        ((self.offset_hi as u32) << 16) | self.offset_lo as u32
    }

    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[must_use]
    pub const fn flags(&self) -> GateFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.flags.present()
    }

    /// The descriptor as the CPU sees it.
    #[must_use]
    pub const fn to_bits(&self) -> u64 {
        ((self.offset_hi as u64) << 48)
            | ((self.flags.into_bits() as u64) << 40)
            | ((self.selector as u64) << 16)
            | self.offset_lo as u64
    }
}

impl core::fmt::Debug for IdtEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdtEntry")
            .field("target", &format_args!("{:#010x}", self.target()))
            .field("selector", &format_args!("{:#06x}", self.selector))
            .field("flags", &format_args!("{:#04x}", self.flags.into_bits()))
            .finish()
    }
}

/// The 256-entry table.
#[repr(C, align(8))]
pub struct Idt {
    entries: [IdtEntry; VECTOR_COUNT],
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

impl Idt {
    /// A table with every gate not present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; VECTOR_COUNT],
        }
    }

    /// Marks every gate not present.
    pub fn clear(&mut self) {
        self.entries.fill(IdtEntry::MISSING);
    }

    /// Overwrites the gate for `vector` unconditionally.
    pub fn set_gate(&mut self, vector: Vector, target: u32, selector: u16, flags: GateFlags) {
        self[vector] = IdtEntry::new(target, selector, flags);
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdtEntry> {
        self.entries.iter()
    }

    /// The `lidt` operand describing this table at its current address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn descriptor(&self) -> Idtr {
        Idtr::new(core::ptr::from_ref(self) as usize as u32)
    }

    /// Loads this table into `IDTR`.
    ///
    /// # Safety
    /// - Must be called at CPL0.
    /// - The table must stay at this address for as long as it is loaded.
    /// - Present entries must reference valid trap stubs.
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&self) {
        let idtr = self.descriptor();
        unsafe {
            core::arch::asm!("lidt [{}]", in(reg) &raw const idtr, options(nostack, preserves_flags, readonly));
        }
    }
}

impl Index<Vector> for Idt {
    type Output = IdtEntry;
    fn index(&self, v: Vector) -> &Self::Output {
        &self.entries[v.index()]
    }
}

impl IndexMut<Vector> for Idt {
    fn index_mut(&mut self, v: Vector) -> &mut Self::Output {
        &mut self.entries[v.index()]
    }
}

/// Operand format used by `lidt` (limit + base).
#[repr(C, packed)]
#[derive(Copy, Clone)]
pub struct Idtr {
    limit: u16,
    base: u32,
}

impl Idtr {
    /// Descriptor for a full 256-entry table at `base`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(base: u32) -> Self {
        Self {
            limit: (size_of::<Idt>() - 1) as u16,
            base,
        }
    }

    /// Table size in bytes minus one.
    #[must_use]
    pub const fn limit(&self) -> u16 {
        self.limit
    }

    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }
}

/// The kernel's vector table.
static VECTOR_TABLE: SpinLock<Idt> = SpinLock::new(Idt::new());

/// Zeroes all 256 gates and loads the table into the CPU.
///
/// Must run before interrupts are enabled. Hosted builds only reset the table.
pub fn initialize() {
    let mut idt = VECTOR_TABLE.lock_irq();
    idt.clear();

    #[cfg(target_arch = "x86")]
    unsafe {
        idt.load();
    }

    log::info!("vector table loaded, limit {:#x}", idt.descriptor().limit());
}

/// Overwrites the gate for `vector` in the kernel's vector table.
pub fn install_gate(vector: Vector, target: u32, selector: u16, flags: GateFlags) {
    VECTOR_TABLE.with_lock_irq(|idt| idt.set_gate(vector, target, selector, flags));
}

/// Snapshot of the gate for `vector` in the kernel's vector table.
#[must_use]
pub fn gate(vector: Vector) -> IdtEntry {
    VECTOR_TABLE.with_lock_irq(|idt| idt[vector])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_interrupt_flags_are_0x8e() {
        assert_eq!(GateFlags::KERNEL_INTERRUPT.into_bits(), 0x8E);
        assert_eq!(GateFlags::gate(GateType::TrapGate, 3).into_bits(), 0xEF);
    }

    #[test]
    fn entry_layout_splits_the_offset() {
        let e = IdtEntry::new(0x0010_2345, 0x08, GateFlags::KERNEL_INTERRUPT);
        assert_eq!(e.to_bits(), 0x0010_8E00_0008_2345);
        assert_eq!(e.target(), 0x0010_2345);
        assert_eq!(e.selector(), 0x08);
        assert!(e.is_present());
    }

    #[test]
    fn descriptor_limit_is_table_size_minus_one() {
        let idtr = Idtr::new(0x0010_8000);
        assert_eq!(idtr.limit(), 2047);
        assert_eq!(idtr.base(), 0x0010_8000);
    }

    #[test]
    fn set_gate_overwrites_and_clear_resets() {
        let mut idt = Idt::new();
        assert!(idt.iter().all(|e| *e == IdtEntry::MISSING));

        idt.set_gate(Vector::new(0x80), 0x1000, 0x08, GateFlags::KERNEL_INTERRUPT);
        idt.set_gate(Vector::new(0x80), 0x2000, 0x08, GateFlags::KERNEL_INTERRUPT);
        assert_eq!(idt[Vector::new(0x80)].target(), 0x2000);
        assert_eq!(idt.iter().filter(|e| e.is_present()).count(), 1);

        idt.clear();
        assert!(!idt[Vector::new(0x80)].is_present());
    }

    #[test]
    fn global_table_install_after_initialize() {
        initialize();
        assert!(!gate(Vector::new(200)).is_present());
        install_gate(Vector::new(200), 0xDEAD_BEEF, 0x08, GateFlags::KERNEL_INTERRUPT);
        assert_eq!(gate(Vector::new(200)).target(), 0xDEAD_BEEF);
    }
}
