//! Interrupt flag control.
//!
//! On 32-bit x86 these issue `cli`/`sti` and read `EFLAGS.IF`. Hosted builds
//! compile them to no-ops that report interrupts as disabled, so code built
//! on top (registries, allocators) can be unit-tested on the build machine.

use kernel_registers::eflags::Eflags;

/// Disables maskable hardware interrupts (`cli`).
///
/// # Safety & Privilege
///
/// Must only be called in contexts where `cli` is permitted (ring 0).
#[inline]
pub fn disable_interrupts() {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack, preserves_flags));
    }
}

/// Enables maskable hardware interrupts (`sti`).
///
/// Call this only once the vector table, the handler registry and the
/// interrupt controller are fully set up.
#[inline]
pub fn enable_interrupts() {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack, preserves_flags));
    }
}

/// Returns the current `EFLAGS` value.
#[inline]
#[must_use]
pub fn eflags() -> Eflags {
    #[cfg(target_arch = "x86")]
    {
        use kernel_registers::LoadRegister;
        Eflags::load()
    }
    #[cfg(not(target_arch = "x86"))]
    {
        Eflags::new()
    }
}

/// Whether maskable interrupts are currently enabled.
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    eflags().if_interrupt_enable()
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` snapshots `EFLAGS.IF`. If interrupts were enabled, it
/// executes `cli`. On drop, it executes `sti` **only** if they were enabled
/// before, so guards nest.
///
/// ```no_run
/// use kernel_sync::IrqGuard;
///
/// {
///     let _g = IrqGuard::new();
///     // no interrupt handler can run here
/// }
/// ```
pub struct IrqGuard {
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = interrupts_enabled();
        if enabled {
            disable_interrupts();
        }
        Self {
            were_enabled: enabled,
        }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            enable_interrupts();
        }
    }
}

/// Runs `f` with interrupts masked, restoring the previous state afterwards.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _guard = IrqGuard::new();
    f()
}
