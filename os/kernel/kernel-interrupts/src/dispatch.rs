//! Exception and IRQ dispatch.
//!
//! The x86 entry points look up the handler and call into here. The
//! functions below hold the whole policy, so they run in host tests too.

use core::fmt::Write;

use crate::{Pic, PortIo, TrapFrame, TrapHandler};

/// Output primitives used for fatal-fault reports.
///
/// Reports are written piecewise through these three calls only; no buffer
/// or allocation is involved, so they work with a corrupted heap.
pub trait DiagnosticSink {
    fn print_str(&mut self, s: &str);
    fn print_dec(&mut self, value: u32);
    fn print_hex(&mut self, value: u32);
}

impl<W: Write> DiagnosticSink for W {
    fn print_str(&mut self, s: &str) {
        let _ = self.write_str(s);
    }

    fn print_dec(&mut self, value: u32) {
        let _ = write!(self, "{value}");
    }

    fn print_hex(&mut self, value: u32) {
        let _ = write!(self, "{value:#010x}");
    }
}

/// What the architecture entry point does after dispatch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrapOutcome {
    /// Restore the frame and return from the trap.
    Handled,
    /// Stop the processor; there is no recovery.
    Halt,
}

/// Runs the registered handler for a CPU exception or, without one, prints
/// the default report and asks for a halt.
pub fn dispatch_exception(
    handler: Option<TrapHandler>,
    frame: &mut TrapFrame,
    sink: &mut impl DiagnosticSink,
) -> TrapOutcome {
    if let Some(handler) = handler {
        handler(frame);
        return TrapOutcome::Handled;
    }

    report_unhandled_exception(frame, sink);
    TrapOutcome::Halt
}

/// Acknowledges a hardware interrupt, then runs its handler if one is
/// registered. Unhandled interrupts are dropped.
pub fn dispatch_irq<P: PortIo>(
    handler: Option<TrapHandler>,
    frame: &mut TrapFrame,
    pic: &mut Pic<P>,
) {
    pic.end_of_interrupt(frame.vector());
    if let Some(handler) = handler {
        handler(frame);
    }
}

/// Default report for an exception without a handler.
///
/// ```text
/// Unhandled exception #13
/// General Protection Fault
/// EIP: 0x00101a2c CS: 0x00000008 EFLAGS: 0x00010202
/// ```
pub fn report_unhandled_exception(frame: &TrapFrame, sink: &mut impl DiagnosticSink) {
    let vector = frame.vector();

    sink.print_str("Unhandled exception #");
    sink.print_dec(u32::from(vector.as_u8()));
    sink.print_str("\n");

    if let Some(name) = vector.exception_name() {
        sink.print_str(name);
        sink.print_str("\n");
    }

    if vector.has_error_code() {
        sink.print_str("Error code: ");
        sink.print_hex(frame.error_code);
        sink.print_str("\n");
    }

    sink.print_str("EIP: ");
    sink.print_hex(frame.eip);
    sink.print_str(" CS: ");
    sink.print_hex(frame.cs);
    sink.print_str(" EFLAGS: ");
    sink.print_hex(frame.eflags);
    sink.print_str("\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector;
    use crate::pic::tests::RecordingPorts;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame(vector: u8) -> TrapFrame {
        TrapFrame {
            eip: 0x0010_1A2C,
            cs: 0x08,
            eflags: 0x0001_0202,
            ..TrapFrame::for_vector(Vector::new(vector))
        }
    }

    #[test]
    fn unregistered_exception_reports_and_halts() {
        let mut out = String::new();
        let outcome = dispatch_exception(None, &mut frame(13), &mut out);

        assert_eq!(outcome, TrapOutcome::Halt);
        assert!(out.starts_with("Unhandled exception #13\nGeneral Protection Fault\n"));
        assert!(out.contains("EIP: 0x00101a2c CS: 0x00000008 EFLAGS: 0x00010202"));
    }

    #[test]
    fn unnamed_exception_reports_number_only() {
        let mut out = String::new();
        let outcome = dispatch_exception(None, &mut frame(25), &mut out);

        assert_eq!(outcome, TrapOutcome::Halt);
        assert!(out.starts_with("Unhandled exception #25\nEIP: "));
        assert!(!out.contains("Reserved"));
    }

    #[test]
    fn registered_exception_runs_handler_silently() {
        fn skip_breakpoint(frame: &mut TrapFrame) {
            frame.eip += 1;
        }

        let mut out = String::new();
        let mut f = frame(3);
        let outcome = dispatch_exception(Some(skip_breakpoint), &mut f, &mut out);

        assert_eq!(outcome, TrapOutcome::Handled);
        assert_eq!(f.eip, 0x0010_1A2D);
        assert!(out.is_empty());
    }

    #[test]
    fn irq_is_acknowledged_before_handler_runs() {
        static WRITES_SEEN_BY_HANDLER: AtomicUsize = AtomicUsize::new(usize::MAX);
        static PORTS: std::sync::Mutex<Vec<(u16, u8)>> = std::sync::Mutex::new(Vec::new());

        fn handler(_: &mut TrapFrame) {
            WRITES_SEEN_BY_HANDLER.store(PORTS.lock().unwrap().len(), Ordering::SeqCst);
        }

        struct SharedPorts;
        impl PortIo for SharedPorts {
            fn write_u8(&mut self, port: u16, value: u8) {
                PORTS.lock().unwrap().push((port, value));
            }
        }

        let mut pic = Pic::new(SharedPorts);
        dispatch_irq(Some(handler), &mut frame(44), &mut pic);

        assert_eq!(*PORTS.lock().unwrap(), [(0xA0, 0x20), (0x20, 0x20)]);
        assert_eq!(WRITES_SEEN_BY_HANDLER.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unhandled_irq_is_still_acknowledged() {
        let mut pic = Pic::new(RecordingPorts::default());
        dispatch_irq(None, &mut frame(32), &mut pic);
        assert_eq!(pic.into_inner().writes, [(0x20, 0x20)]);
    }
}
