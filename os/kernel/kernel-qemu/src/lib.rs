//! # QEMU Debug Console
//!
//! Host-visible debug output for a kernel running under QEMU. Bytes written
//! to I/O port `0x402` show up wherever `-debugcon` points:
//!
//! ```bash
//! qemu-system-i386 -kernel kernel.elf -debugcon stdio
//! ```
//!
//! Three layers are provided:
//!
//! * [`QemuSink`]: a [`core::fmt::Write`] over the debug port. The kernel
//!   also uses it as the console for fatal-fault reports.
//! * [`qemu_trace!`]: `format_args!`-style raw output without going
//!   through `log`, usable before the logger is installed.
//! * [`QemuLogger`]: a [`log::Log`] implementation writing
//!   `"[LEVEL] target: message"` lines through the sink.
//!
//! With the `enabled` feature off (or on a non-x86 host) the port write is
//! compiled out and every layer degrades to a no-op.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

use core::fmt::{self, Write};

pub use logger::QemuLogger;

/// The port number for QEMU's debug console.
pub const QEMU_DEBUG_PORT: u16 = 0x402;

/// Write a single byte to QEMU's debug port.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn dbg_putc(c: u8) {
    #[cfg(all(feature = "enabled", target_arch = "x86"))]
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") QEMU_DEBUG_PORT,
            in("al") c,
            options(nomem, nostack, preserves_flags)
        );
    }
    #[cfg(not(all(feature = "enabled", target_arch = "x86")))]
    let _ = c;
}

/// Unbuffered [`Write`] sink over the debug port.
#[derive(Debug, Default, Copy, Clone)]
pub struct QemuSink;

impl Write for QemuSink {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(dbg_putc);
        Ok(())
    }
}

#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // best-effort debug output
        let _ = fmt::write(&mut super::QemuSink, args);
    }
}

#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
