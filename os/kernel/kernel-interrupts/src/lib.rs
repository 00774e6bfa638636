//! # Traps and Interrupts (IA-32)
//!
//! Everything between the CPU raising a vector and a Rust handler running:
//!
//! - [`idt`]: the 256-entry interrupt vector table, its `lidt` descriptor and
//!   gate installation.
//! - [`stubs`]: per-vector entry stubs that build a [`TrapFrame`] on the
//!   interrupted stack (x86 only).
//! - [`dispatch`]: the exception and IRQ dispatchers, and the
//!   [`DiagnosticSink`] used for fatal reports.
//! - [`registry`]: per-vector handler callbacks.
//! - [`pic`]: the cascaded 8259 pair: remapping and end-of-interrupt.
//!
//! ## Bring-up order
//!
//! ```text
//! idt::initialize()                 zero the table, lidt
//! stubs::install_exception_gates()  vectors 0..=31
//! stubs::install_irq_gates()        PIC remap, vectors 32..=47
//! ... memory managers, registry::register(...) ...
//! kernel_sync::irq::enable_interrupts()
//! ```
//!
//! Interrupts must stay masked until all of the above is in place.
//!
//! ## Handlers
//!
//! A driver hooks a vector with [`register`]. Registration overwrites, last
//! writer wins. Unregistered CPU exceptions are fatal: the vector, its name
//! and the interrupted `EIP`/`CS`/`EFLAGS` are printed and the CPU halts.
//! Unregistered hardware interrupts are acknowledged and dropped.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod context;
pub mod cpu;
pub mod dispatch;
pub mod idt;
pub mod pic;
pub mod ports;
pub mod registry;
#[cfg(target_arch = "x86")]
pub mod stubs;
pub mod vector;

pub use context::TrapFrame;
pub use dispatch::{DiagnosticSink, TrapOutcome, dispatch_exception, dispatch_irq};
pub use idt::{GateFlags, GateType, Idt, IdtEntry, Idtr, install_gate};
pub use pic::Pic;
pub use ports::PortIo;
pub use registry::{HandlerRegistry, TrapHandler, register};
pub use vector::{Irq, Vector};
