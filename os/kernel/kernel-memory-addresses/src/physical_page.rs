use crate::{PAGE_OFFSET_MASK, PAGE_SHIFT, PhysicalAddress};
use core::fmt;

/// Base address of a 4 KiB physical frame.
///
/// ### Invariants
/// - The low 12 bits of the base are always zero.
/// - Frame 0 is a real frame; allocators that use address 0 as a failure
///   sentinel must keep it reserved.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(u32);

impl PhysicalPage {
    /// Frame that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(addr.as_u32() & !PAGE_OFFSET_MASK)
    }

    /// Frame with frame number `index`.
    ///
    /// # Panics
    /// In debug builds, if the frame lies beyond the 4 GiB physical range.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        debug_assert!(index < (1 << (32 - PAGE_SHIFT)), "frame index out of range");
        #[allow(clippy::cast_possible_truncation)]
        let base = (index as u32) << PAGE_SHIFT;
        Self(base)
    }

    /// Frame number of this frame (`base / 4096`).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 >> PAGE_SHIFT) as usize
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0)
    }

    /// Address `offset` bytes into this frame.
    #[inline]
    #[must_use]
    pub const fn join(self, offset: u32) -> PhysicalAddress {
        PhysicalAddress::new(self.0 | (offset & PAGE_OFFSET_MASK))
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}/4K", self.0)
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage(0x{:08X})", self.0)
    }
}

impl From<PhysicalPage> for PhysicalAddress {
    #[inline]
    fn from(value: PhysicalPage) -> Self {
        value.base()
    }
}

impl TryFrom<PhysicalAddress> for PhysicalPage {
    type Error = ();

    #[inline]
    fn try_from(pa: PhysicalAddress) -> Result<Self, ()> {
        if pa.is_page_aligned() {
            Ok(pa.page())
        } else {
            Err(())
        }
    }
}
