//! # Kernel synchronization primitives
//!
//! The kernel runs on a single hardware thread. The only concurrency comes
//! from interrupt handlers preempting the main line of execution, so the
//! primitives here are a plain [`SpinLock`] and an [`IrqGuard`] that masks
//! interrupts for a scope. [`SpinLock::lock_irq`] combines the two and is the
//! critical-section discipline for state shared with interrupt handlers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::{IrqGuard, without_interrupts};
pub use spin_lock::{IrqSpinLockGuard, SpinLock, SpinLockGuard};
