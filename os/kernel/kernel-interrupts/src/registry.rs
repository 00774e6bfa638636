//! Per-vector handler callbacks.

use crate::{TrapFrame, Vector};
use kernel_info::interrupts::VECTOR_COUNT;
use kernel_sync::SpinLock;

/// A handler invoked with the saved context of the trap.
pub type TrapHandler = fn(&mut TrapFrame);

/// Fixed mapping from vector to an optional handler.
pub struct HandlerRegistry {
    slots: [Option<TrapHandler>; VECTOR_COUNT],
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [None; VECTOR_COUNT],
        }
    }

    /// Installs `handler` for `vector`, returning the handler it replaced.
    pub fn register(&mut self, vector: Vector, handler: TrapHandler) -> Option<TrapHandler> {
        self.slots[vector.index()].replace(handler)
    }

    #[must_use]
    pub const fn get(&self, vector: Vector) -> Option<TrapHandler> {
        self.slots[vector.index()]
    }

    #[must_use]
    pub const fn is_registered(&self, vector: Vector) -> bool {
        self.slots[vector.index()].is_some()
    }
}

static HANDLERS: SpinLock<HandlerRegistry> = SpinLock::new(HandlerRegistry::new());

/// Hooks `handler` to `vector` in the kernel's registry. Overwrites any
/// previous registration.
pub fn register(vector: Vector, handler: TrapHandler) {
    let replaced = HANDLERS.with_lock_irq(|r| r.register(vector, handler));
    if replaced.is_some() {
        log::debug!("handler for vector {vector} replaced");
    }
}

/// The handler currently registered for `vector`.
///
/// The lock is released before the caller runs the handler, so handlers may
/// register further handlers.
#[must_use]
pub fn handler_for(vector: Vector) -> Option<TrapHandler> {
    HANDLERS.with_lock_irq(|r| r.get(vector))
}
