//! Page-fault (vector 14) reporting.
//!
//! There is no demand paging: every page fault is reported on the fault
//! console and stops the machine.

use bitfield_struct::bitfield;
use kernel_interrupts::cpu::halt_forever;
use kernel_interrupts::{DiagnosticSink, TrapFrame, Vector, register};
use kernel_memory_addresses::VirtualAddress;
use kernel_qemu::QemuSink;

/// Error code pushed by the CPU for a page fault.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// Protection violation on a present page (clear: page not present).
    pub present: bool,
    /// The access was a write.
    pub write: bool,
    /// The access came from CPL 3.
    pub user: bool,
    /// A reserved bit was set in a paging entry.
    pub reserved: bool,
    /// The access was an instruction fetch.
    pub instruction_fetch: bool,
    #[bits(27)]
    __: u32,
}

/// Print `Page fault! (<causes>) at <address>`.
///
/// ```text
/// Page fault! (present write ) at 0xc0001000
/// ```
pub fn report_page_fault(
    error: PageFaultError,
    address: VirtualAddress,
    sink: &mut impl DiagnosticSink,
) {
    sink.print_str("Page fault! (");
    for (set, name) in [
        (error.present(), "present "),
        (error.write(), "write "),
        (error.user(), "user "),
        (error.reserved(), "reserved "),
    ] {
        if set {
            sink.print_str(name);
        }
    }
    sink.print_str(") at ");
    sink.print_hex(address.as_u32());
    sink.print_str("\n");
}

/// Handler registered on vector 14.
pub fn handle_page_fault(frame: &mut TrapFrame) {
    let error = PageFaultError::from_bits(frame.error_code);
    report_page_fault(error, fault_address(), &mut QemuSink);
    halt_forever();
}

/// Route vector 14 to [`handle_page_fault`].
pub fn install_page_fault_handler() {
    register(Vector::PAGE_FAULT, handle_page_fault);
}

#[cfg(target_arch = "x86")]
fn fault_address() -> VirtualAddress {
    use kernel_registers::LoadRegisterUnsafe;
    use kernel_registers::cr2::Cr2;

    // CR2 is only meaningful inside the page-fault handler, which is where this runs.
    unsafe { Cr2::load_unsafe() }.fault_address()
}

#[cfg(not(target_arch = "x86"))]
const fn fault_address() -> VirtualAddress {
    VirtualAddress::zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_causes_and_address() {
        let mut out = String::new();
        let error = PageFaultError::new().with_present(true).with_write(true);
        report_page_fault(error, VirtualAddress::new(0xC000_1000), &mut out);
        assert_eq!(out, "Page fault! (present write ) at 0xc0001000\n");
    }

    #[test]
    fn not_present_read_from_kernel() {
        let mut out = String::new();
        report_page_fault(PageFaultError::from_bits(0), VirtualAddress::new(0xDEAD_B000), &mut out);
        assert_eq!(out, "Page fault! () at 0xdeadb000\n");
    }

    #[test]
    fn all_reported_bits() {
        let mut out = String::new();
        report_page_fault(PageFaultError::from_bits(0b1_1111), VirtualAddress::zero(), &mut out);
        assert_eq!(out, "Page fault! (present write user reserved ) at 0x00000000\n");
    }

    #[test]
    fn installs_on_vector_14() {
        install_page_fault_handler();
        let handler = kernel_interrupts::registry::handler_for(Vector::PAGE_FAULT);
        assert!(handler.is_some_and(|h| core::ptr::fn_addr_eq(h, handle_page_fault as fn(&mut TrapFrame))));
    }
}
