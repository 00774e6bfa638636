//! Vector numbers.

use core::fmt;
use kernel_info::interrupts::{EXCEPTION_COUNT, IRQ_BASE, IRQ_COUNT, IRQ_SECONDARY_BASE};

/// CPU exception mnemonics, indexed by vector.
const EXCEPTION_NAMES: [&str; EXCEPTION_COUNT as usize] = [
    "Division By Zero",
    "Debug",
    "Non Maskable Interrupt",
    "Breakpoint",
    "Into Detected Overflow",
    "Out of Bounds",
    "Invalid Opcode",
    "No Coprocessor",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Bad TSS",
    "Segment Not Present",
    "Stack Fault",
    "General Protection Fault",
    "Page Fault",
    "Unknown Interrupt",
    "Coprocessor Fault",
    "Alignment Check",
    "Machine Check",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
];

/// Vectors below this have a name that is printed in fatal reports.
const NAMED_EXCEPTIONS: u8 = 23;

/// An interrupt vector, `0..=255`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Vector(u8);

impl Vector {
    pub const DIVIDE_ERROR: Self = Self(0);
    pub const INVALID_OPCODE: Self = Self(6);
    pub const DOUBLE_FAULT: Self = Self(8);
    pub const GENERAL_PROTECTION: Self = Self(13);
    pub const PAGE_FAULT: Self = Self(14);
    /// Timer line (IRQ 0) after remapping.
    pub const TIMER: Self = Self(IRQ_BASE);
    /// Keyboard line (IRQ 1) after remapping.
    pub const KEYBOARD: Self = Self(IRQ_BASE + 1);

    #[inline]
    #[must_use]
    pub const fn new(vector: u8) -> Self {
        Self(vector)
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this vector is reserved for CPU exceptions (`0..=31`).
    #[inline]
    #[must_use]
    pub const fn is_exception(self) -> bool {
        self.0 < EXCEPTION_COUNT
    }

    /// Whether the CPU pushes an error code for this exception.
    #[must_use]
    pub const fn has_error_code(self) -> bool {
        matches!(self.0, 8 | 10..=14 | 17 | 21 | 29 | 30)
    }

    /// Mnemonic for CPU exceptions that have one.
    #[must_use]
    pub const fn exception_name(self) -> Option<&'static str> {
        if self.0 < NAMED_EXCEPTIONS {
            Some(EXCEPTION_NAMES[self.0 as usize])
        } else {
            None
        }
    }

    /// The hardware interrupt line delivered on this vector, if any.
    #[must_use]
    pub const fn irq(self) -> Option<Irq> {
        if self.0 >= IRQ_BASE && self.0 < IRQ_BASE + IRQ_COUNT {
            Some(Irq(self.0 - IRQ_BASE))
        } else {
            None
        }
    }

    /// Whether this vector is served by the secondary interrupt controller.
    #[inline]
    #[must_use]
    pub const fn is_secondary_irq(self) -> bool {
        self.0 >= IRQ_SECONDARY_BASE
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector({})", self.0)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for Vector {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Irq> for Vector {
    fn from(irq: Irq) -> Self {
        irq.vector()
    }
}

/// A legacy hardware interrupt line, `0..=15`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Irq(u8);

impl Irq {
    pub const TIMER: Self = Self(0);
    pub const KEYBOARD: Self = Self(1);

    /// `None` for lines beyond the two cascaded controllers.
    #[must_use]
    pub const fn new(line: u8) -> Option<Self> {
        if line < IRQ_COUNT { Some(Self(line)) } else { None }
    }

    #[must_use]
    pub const fn line(self) -> u8 {
        self.0
    }

    /// The vector this line is delivered on after remapping.
    #[must_use]
    pub const fn vector(self) -> Vector {
        Vector(IRQ_BASE + self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_exceptions_stop_before_23() {
        assert_eq!(Vector::DIVIDE_ERROR.exception_name(), Some("Division By Zero"));
        assert_eq!(Vector::PAGE_FAULT.exception_name(), Some("Page Fault"));
        assert_eq!(Vector::new(22).exception_name(), Some("Reserved"));
        assert_eq!(Vector::new(23).exception_name(), None);
        assert_eq!(Vector::TIMER.exception_name(), None);
    }

    #[test]
    fn error_code_vectors() {
        let with_code: Vec<u8> = (0..32).filter(|v| Vector::new(*v).has_error_code()).collect();
        assert_eq!(with_code, [8, 10, 11, 12, 13, 14, 17, 21, 29, 30]);
    }

    #[test]
    fn irq_lines_map_to_32_through_47() {
        assert_eq!(Irq::TIMER.vector(), Vector::TIMER);
        assert_eq!(Irq::KEYBOARD.vector().as_u8(), 33);
        assert_eq!(Vector::new(47).irq(), Irq::new(15));
        assert_eq!(Vector::new(48).irq(), None);
        assert_eq!(Vector::new(31).irq(), None);
        assert!(Vector::new(40).is_secondary_irq());
        assert!(!Vector::new(39).is_secondary_irq());
        assert_eq!(Irq::new(16), None);
    }
}
