//! Saved machine context.

use crate::Vector;

/// Register snapshot pushed by the trap stubs, lowest address first.
///
/// ```text
/// esp ─► gs fs es ds                      pushed by the common stub
///        edi esi ebp esp ebx edx ecx eax  pushad
///        vector error_code                pushed by the per-vector stub
///        eip cs eflags                    pushed by the CPU
/// ```
///
/// For exceptions without a CPU error code and for hardware interrupts the
/// stub pushes a zero in its place, so the layout is the same for every
/// vector. The frame lives on the interrupted stack for the duration of the
/// trap and must not escape the handler.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct TrapFrame {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Value of `esp` at `pushad` time; ignored by `popad`.
    pub esp_at_pushad: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

const _: () = assert!(size_of::<TrapFrame>() == 17 * 4);

impl TrapFrame {
    /// A zeroed frame for `vector`, as a stub would build it.
    #[must_use]
    pub const fn for_vector(vector: Vector) -> Self {
        Self {
            gs: 0,
            fs: 0,
            es: 0,
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp_at_pushad: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            vector: vector.as_u8() as u32,
            error_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
        }
    }

    /// The vector this trap was raised on.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn vector(&self) -> Vector {
        Vector::new(self.vector as u8)
    }
}
