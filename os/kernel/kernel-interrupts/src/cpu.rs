//! Processor idle and halt.

/// Masks interrupts and halts the processor permanently.
///
/// This is the end of every fatal path: unhandled exceptions, page faults
/// and kernel panics.
pub fn halt_forever() -> ! {
    loop {
        #[cfg(target_arch = "x86")]
        unsafe {
            core::arch::asm!("cli", "hlt", options(nomem, nostack));
        }
        #[cfg(not(target_arch = "x86"))]
        core::hint::spin_loop();
    }
}

/// Sleeps until the next interrupt arrives.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }
    #[cfg(not(target_arch = "x86"))]
    core::hint::spin_loop();
}
