use kernel_interrupts::registry::handler_for;
use kernel_interrupts::{
    Pic, PortIo, TrapFrame, TrapOutcome, Vector, dispatch_exception, dispatch_irq, register,
};
use std::sync::atomic::{AtomicU32, Ordering};

static TICKS: AtomicU32 = AtomicU32::new(0);

fn on_tick(_: &mut TrapFrame) {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

fn on_invalid_opcode(frame: &mut TrapFrame) {
    frame.eip += 2;
}

#[derive(Default)]
struct Ports(Vec<(u16, u8)>);

impl PortIo for Ports {
    fn write_u8(&mut self, port: u16, value: u8) {
        self.0.push((port, value));
    }
}

#[test]
fn registered_timer_handler_sees_every_tick() {
    register(Vector::TIMER, on_tick);

    let mut pic = Pic::new(Ports::default());
    for _ in 0..3 {
        let mut frame = TrapFrame::for_vector(Vector::TIMER);
        dispatch_irq(handler_for(Vector::TIMER), &mut frame, &mut pic);
    }

    assert_eq!(TICKS.load(Ordering::Relaxed), 3);
    assert_eq!(pic.into_inner().0, [(0x20, 0x20); 3]);
}

#[test]
fn exception_path_switches_from_default_to_registered() {
    let vector = Vector::INVALID_OPCODE;
    let mut out = String::new();

    let mut frame = TrapFrame::for_vector(vector);
    let outcome = dispatch_exception(handler_for(vector), &mut frame, &mut out);
    assert_eq!(outcome, TrapOutcome::Halt);
    assert!(out.contains("#6\nInvalid Opcode"));

    register(vector, on_invalid_opcode);
    out.clear();
    let outcome = dispatch_exception(handler_for(vector), &mut frame, &mut out);
    assert_eq!(outcome, TrapOutcome::Handled);
    assert_eq!(frame.eip, 2);
    assert!(out.is_empty());
}
