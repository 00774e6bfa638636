//! Trap entry stubs and gate installation (32-bit x86 only).
//!
//! Each vector gets a tiny naked stub that pushes a dummy error code (unless
//! the CPU already pushed one) and the vector number, then jumps to one of two
//! common paths. The common path completes the [`TrapFrame`], switches to the
//! kernel data segments and calls the Rust dispatcher with a pointer to the
//! frame. On return it restores everything and `iretd`s.

use core::arch::naked_asm;

use kernel_info::interrupts::{KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR};
use kernel_qemu::QemuSink;

use crate::cpu::halt_forever;
use crate::dispatch::{TrapOutcome, dispatch_exception, dispatch_irq};
use crate::idt::install_gate;
use crate::ports::X86Ports;
use crate::registry::handler_for;
use crate::{GateFlags, Pic, TrapFrame, Vector};

type Stub = unsafe extern "C" fn();

macro_rules! trap_stub {
    ($name:ident, $vector:literal, $common:ident) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "push 0",
                "push {vector}",
                "jmp {common}",
                vector = const $vector,
                common = sym $common,
            )
        }
    };
    ($name:ident, $vector:literal, $common:ident, error_code) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "push {vector}",
                "jmp {common}",
                vector = const $vector,
                common = sym $common,
            )
        }
    };
}

macro_rules! common_entry {
    ($name:ident, $dispatch:ident) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "pushad",
                "push ds",
                "push es",
                "push fs",
                "push gs",
                "mov ax, {data_sel}",
                "mov ds, ax",
                "mov es, ax",
                "mov fs, ax",
                "mov gs, ax",
                "cld",
                "push esp",
                "call {dispatch}",
                "add esp, 4",
                "pop gs",
                "pop fs",
                "pop es",
                "pop ds",
                "popad",
                // vector and error code
                "add esp, 8",
                "iretd",
                data_sel = const KERNEL_DATA_SELECTOR,
                dispatch = sym $dispatch,
            )
        }
    };
}

common_entry!(exception_common, exception_entry);
common_entry!(irq_common, irq_entry);

extern "C" fn exception_entry(frame: *mut TrapFrame) {
    // SAFETY: the common stub passes the frame it just built on this stack.
    let frame = unsafe { &mut *frame };
    let handler = handler_for(frame.vector());
    if dispatch_exception(handler, frame, &mut QemuSink) == TrapOutcome::Halt {
        halt_forever();
    }
}

extern "C" fn irq_entry(frame: *mut TrapFrame) {
    // SAFETY: the common stub passes the frame it just built on this stack.
    let frame = unsafe { &mut *frame };
    let handler = handler_for(frame.vector());
    // SAFETY: trap context runs at CPL0 with interrupts masked.
    let mut pic = Pic::new(unsafe { X86Ports::new() });
    dispatch_irq(handler, frame, &mut pic);
}

trap_stub!(isr0, 0, exception_common);
trap_stub!(isr1, 1, exception_common);
trap_stub!(isr2, 2, exception_common);
trap_stub!(isr3, 3, exception_common);
trap_stub!(isr4, 4, exception_common);
trap_stub!(isr5, 5, exception_common);
trap_stub!(isr6, 6, exception_common);
trap_stub!(isr7, 7, exception_common);
trap_stub!(isr8, 8, exception_common, error_code);
trap_stub!(isr9, 9, exception_common);
trap_stub!(isr10, 10, exception_common, error_code);
trap_stub!(isr11, 11, exception_common, error_code);
trap_stub!(isr12, 12, exception_common, error_code);
trap_stub!(isr13, 13, exception_common, error_code);
trap_stub!(isr14, 14, exception_common, error_code);
trap_stub!(isr15, 15, exception_common);
trap_stub!(isr16, 16, exception_common);
trap_stub!(isr17, 17, exception_common, error_code);
trap_stub!(isr18, 18, exception_common);
trap_stub!(isr19, 19, exception_common);
trap_stub!(isr20, 20, exception_common);
trap_stub!(isr21, 21, exception_common, error_code);
trap_stub!(isr22, 22, exception_common);
trap_stub!(isr23, 23, exception_common);
trap_stub!(isr24, 24, exception_common);
trap_stub!(isr25, 25, exception_common);
trap_stub!(isr26, 26, exception_common);
trap_stub!(isr27, 27, exception_common);
trap_stub!(isr28, 28, exception_common);
trap_stub!(isr29, 29, exception_common, error_code);
trap_stub!(isr30, 30, exception_common, error_code);
trap_stub!(isr31, 31, exception_common);

trap_stub!(irq0, 32, irq_common);
trap_stub!(irq1, 33, irq_common);
trap_stub!(irq2, 34, irq_common);
trap_stub!(irq3, 35, irq_common);
trap_stub!(irq4, 36, irq_common);
trap_stub!(irq5, 37, irq_common);
trap_stub!(irq6, 38, irq_common);
trap_stub!(irq7, 39, irq_common);
trap_stub!(irq8, 40, irq_common);
trap_stub!(irq9, 41, irq_common);
trap_stub!(irq10, 42, irq_common);
trap_stub!(irq11, 43, irq_common);
trap_stub!(irq12, 44, irq_common);
trap_stub!(irq13, 45, irq_common);
trap_stub!(irq14, 46, irq_common);
trap_stub!(irq15, 47, irq_common);

const EXCEPTION_STUBS: [Stub; 32] = [
    isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13, isr14,
    isr15, isr16, isr17, isr18, isr19, isr20, isr21, isr22, isr23, isr24, isr25, isr26, isr27,
    isr28, isr29, isr30, isr31,
];

const IRQ_STUBS: [Stub; 16] = [
    irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8, irq9, irq10, irq11, irq12, irq13, irq14,
    irq15,
];

#[allow(clippy::cast_possible_truncation)]
fn install_stubs(first: u8, stubs: &[Stub]) {
    for (vector, stub) in (first..).zip(stubs) {
        install_gate(
            Vector::new(vector),
            *stub as usize as u32,
            KERNEL_CODE_SELECTOR,
            GateFlags::KERNEL_INTERRUPT,
        );
    }
}

/// Points vectors 0–31 at the exception stubs.
pub fn install_exception_gates() {
    install_stubs(0, &EXCEPTION_STUBS);
    log::info!("exception gates installed");
}

/// Remaps the interrupt controllers to vectors 32–47 and points those
/// vectors at the IRQ stubs.
pub fn install_irq_gates() {
    // SAFETY: bring-up runs at CPL0 with interrupts masked.
    let mut pic = Pic::new(unsafe { X86Ports::new() });
    pic.remap();
    install_stubs(Vector::TIMER.as_u8(), &IRQ_STUBS);
    log::info!("interrupt controllers remapped, IRQ gates installed");
}
