//! Tick counter on the timer line.
//!
//! The PIT is left at its power-on rate (about 18.2 Hz); this only counts.

use core::sync::atomic::{AtomicU32, Ordering};
use kernel_interrupts::{Irq, TrapFrame, register};

static TICKS: AtomicU32 = AtomicU32::new(0);

fn on_tick(_frame: &mut TrapFrame) {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Hook the timer vector.
pub fn install() {
    register(Irq::TIMER.vector(), on_tick);
    log::info!("timer tick counter on vector {}", Irq::TIMER.vector().as_u8());
}

/// Timer interrupts seen since [`install`].
pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_interrupts::registry::handler_for;
    use kernel_interrupts::{Pic, PortIo, Vector, dispatch_irq};

    struct NullPorts;

    impl PortIo for NullPorts {
        fn write_u8(&mut self, _: u16, _: u8) {}
    }

    #[test]
    fn counts_dispatched_timer_interrupts() {
        install();
        let before = ticks();

        let mut pic = Pic::new(NullPorts);
        for _ in 0..2 {
            let mut frame = TrapFrame::for_vector(Vector::TIMER);
            dispatch_irq(handler_for(Vector::TIMER), &mut frame, &mut pic);
        }

        assert_eq!(ticks() - before, 2);
    }
}
