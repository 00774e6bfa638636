//! # Kernel Entry Point
//!
//! Bring-up, in this order:
//!
//! 1. logger on the QEMU debug console,
//! 2. Multiboot magic and memory size,
//! 3. vector table, exception gates, PIC remap and IRQ gates,
//! 4. frame allocator, paging, heap ([`memory::init`]),
//! 5. timer tick counter,
//! 6. interrupts on, then idle in `hlt`.
//!
//! Interrupts stay masked until step 6. Any failure before that halts.
//!
//! Hosted builds compile an empty `main` so the pure parts can be unit tested.

#![cfg_attr(target_os = "none", no_std, no_main)]
#![cfg_attr(not(target_os = "none"), allow(dead_code))]
#![allow(unsafe_code)]

extern crate alloc;

mod allocator;
#[cfg(all(target_arch = "x86", target_os = "none"))]
mod boot;
mod memory;
mod timer;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Write;
use kernel_info::boot::{MultibootInfo, is_multiboot};
use kernel_interrupts::cpu::{halt_forever, wait_for_interrupt};
use kernel_interrupts::idt;
use kernel_qemu::{QemuLogger, QemuSink};
use log::LevelFilter;

#[cfg(feature = "qemu")]
use kernel_qemu::qemu_trace;

static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    kernel_sync::irq::disable_interrupts();
    let _ = writeln!(QemuSink, "kernel panic: {info}");
    halt_forever()
}

#[cfg(not(target_os = "none"))]
fn main() {}

/// Kernel entry running on the boot stack.
///
/// # Notes
/// * `no_mangle` so that `_start` can call it by name.
/// * C ABI: `_start` pushes `EAX`/`EBX` as the two cdecl arguments.
#[unsafe(no_mangle)]
extern "C" fn kernel_main(magic: u32, info: *const MultibootInfo) -> ! {
    #[cfg(feature = "qemu")]
    qemu_trace!("Kernel reporting to QEMU!\n");

    let _ = LOGGER.install();

    let total_memory = match boot_memory(magic, info) {
        Ok(bytes) => bytes,
        Err(reason) => {
            let _ = writeln!(QemuSink, "cannot boot: {reason}");
            halt_forever()
        }
    };
    log::info!("{} KiB of memory", total_memory / 1024);

    idt::initialize();
    #[cfg(target_arch = "x86")]
    {
        kernel_interrupts::stubs::install_exception_gates();
        kernel_interrupts::stubs::install_irq_gates();
    }

    if let Err(e) = unsafe { memory::init(total_memory) } {
        let _ = writeln!(QemuSink, "memory bring-up failed: {e}");
        halt_forever();
    }
    heap_self_test();

    timer::install();
    kernel_sync::irq::enable_interrupts();
    log::info!("interrupts enabled, idling");

    let mut reported = 0;
    loop {
        wait_for_interrupt();
        let ticks = timer::ticks();
        if ticks / 1000 > reported {
            reported = ticks / 1000;
            log::debug!("{ticks} timer ticks");
        }
    }
}

/// Validate the loader handoff and return the memory size in bytes.
fn boot_memory(magic: u32, info: *const MultibootInfo) -> Result<u32, &'static str> {
    if !is_multiboot(magic) {
        return Err("not loaded by a Multiboot loader");
    }
    // SAFETY: a Multiboot loader passes a valid record in identity-mapped memory.
    let Some(info) = (unsafe { info.as_ref() }) else {
        return Err("no Multiboot information record");
    };
    if !info.has_memory_info() {
        return Err("loader did not report the memory size");
    }
    Ok(info.total_memory_bytes())
}

/// Exercise the global allocator once, so a broken heap shows up at boot.
fn heap_self_test() {
    let squares: Vec<u32> = (0..256).map(|i| i * i).collect();
    let sum = Box::new(squares.iter().sum::<u32>());
    drop(squares);

    let usage = memory::with_memory(|mem| (mem.heap().used_bytes(), mem.heap().free_bytes()));
    if let Some((used, free)) = usage {
        log::debug!("heap self-test sum {sum}, {used} bytes used, {free} bytes free");
    }
}
