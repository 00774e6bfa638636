//! # x86 I/O Port Access
//!
//! The 8259 pair is driven through [`PortIo`] so that its command sequences
//! can be replayed against a recording implementation in tests. [`X86Ports`]
//! is the real thing and only exists on 32-bit x86.

/// Byte-wide writes to the I/O port address space.
pub trait PortIo {
    fn write_u8(&mut self, port: u16, value: u8);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value);
    }
}

/// The CPU's port space, via `out dx, al`.
///
/// Constructing it is `unsafe`: the holder may reprogram any device.
#[cfg(target_arch = "x86")]
#[derive(Debug)]
pub struct X86Ports(());

#[cfg(target_arch = "x86")]
impl X86Ports {
    /// # Safety
    /// Must run at CPL0 (or with sufficient IOPL) and the caller must
    /// coordinate device access with interrupt handlers.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

#[cfg(target_arch = "x86")]
impl PortIo for X86Ports {
    #[inline]
    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe { outb(port, value) }
    }
}

/// Write one byte to an I/O port.
///
/// # Safety
/// - **Privilege:** CPL0 or an IOPL that allows access, otherwise `#GP`.
/// - **Correct port:** writing the wrong register can wedge the device or
///   the system (e.g. masking every interrupt line).
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn outb(port: u16, val: u8) {
    unsafe {
        core::arch::asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags));
    }
}
