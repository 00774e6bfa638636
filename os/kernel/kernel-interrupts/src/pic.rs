//! Legacy 8259 programmable interrupt controller pair.
//!
//! At power-on the primary controller delivers IRQ 0–7 on vectors 8–15,
//! which collide with CPU exceptions. [`Pic::remap`] moves IRQ 0–15 to
//! vectors 32–47. Every serviced interrupt must be acknowledged with
//! [`Pic::end_of_interrupt`], or the controller stops delivering lines of
//! equal or lower priority.

use crate::{PortIo, Vector};
use kernel_info::interrupts::{
    IRQ_BASE, IRQ_SECONDARY_BASE, PIC1_COMMAND, PIC1_DATA, PIC2_COMMAND, PIC2_DATA,
};

/// ICW1: initialization, ICW4 follows.
const ICW1_INIT_ICW4: u8 = 0x11;
/// ICW3 (primary): secondary attached to line 2.
const ICW3_PRIMARY_CASCADE: u8 = 1 << 2;
/// ICW3 (secondary): cascade identity 2.
const ICW3_SECONDARY_ID: u8 = 2;
/// ICW4: 8086/88 mode.
const ICW4_8086: u8 = 0x01;
/// OCW2: non-specific end of interrupt.
const EOI: u8 = 0x20;

/// Driver for the cascaded controller pair.
pub struct Pic<P> {
    ports: P,
}

impl<P: PortIo> Pic<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Reinitializes both controllers so IRQ 0–15 arrive on vectors 32–47,
    /// with every line unmasked.
    pub fn remap(&mut self) {
        let p = &mut self.ports;

        p.write_u8(PIC1_COMMAND, ICW1_INIT_ICW4);
        p.write_u8(PIC2_COMMAND, ICW1_INIT_ICW4);

        p.write_u8(PIC1_DATA, IRQ_BASE);
        p.write_u8(PIC2_DATA, IRQ_SECONDARY_BASE);

        p.write_u8(PIC1_DATA, ICW3_PRIMARY_CASCADE);
        p.write_u8(PIC2_DATA, ICW3_SECONDARY_ID);

        p.write_u8(PIC1_DATA, ICW4_8086);
        p.write_u8(PIC2_DATA, ICW4_8086);

        p.write_u8(PIC1_DATA, 0x00);
        p.write_u8(PIC2_DATA, 0x00);
    }

    /// Acknowledges the interrupt delivered on `vector`: the secondary
    /// controller first for vectors ≥ 40, then always the primary.
    pub fn end_of_interrupt(&mut self, vector: Vector) {
        if vector.is_secondary_irq() {
            self.ports.write_u8(PIC2_COMMAND, EOI);
        }
        self.ports.write_u8(PIC1_COMMAND, EOI);
    }

    pub fn into_inner(self) -> P {
        self.ports
    }
}
