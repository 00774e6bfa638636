//! # Address Space (IA-32, page-directory rooted)
//!
//! Strongly-typed helpers to build and manipulate a **single** virtual address
//! space: a [`PageDirectory`] plus the [`PageTable`]s it links.
//!
//! ## Highlights
//!
//! - [`AddressSpace::map`] installs one 4 KiB mapping, creating the covering
//!   page table on first use.
//! - [`AddressSpace::unmap`] clears a single PTE.
//! - [`AddressSpace::translate`] resolves a VA to a PA.
//! - [`AddressSpace::activate`] loads CR3 with this space's directory.
//!
//! ## Design
//!
//! - New page tables are linked as present + writable. Leaf flags come from
//!   the mapping call and are masked to the low 12 bits; present is forced.
//! - A failed table allocation leaves the tree untouched.
//! - Every leaf change is followed by `invlpg` for that page.
//!
//! ## Safety
//!
//! - The provided [`PhysMapper`] must yield **writable** references to table frames.
//! - Only one `AddressSpace` handle may mutate a given tree at a time.

use crate::page_table::pd::{L2Index, PageDirectory, PdEntry};
use crate::page_table::pt::{PageTable, PtEntry};
use crate::page_table::split_indices;
use crate::{FrameAlloc, MapError, PageEntryBits, PhysMapper, invalidate_tlb_page};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: PhysicalPage,
    mapper: &'m M,
}

/// The page-directory frame of an [`AddressSpace`].
pub type RootPage = PhysicalPage;

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// View an existing directory.
    #[inline]
    #[must_use]
    pub const fn from_root(mapper: &'m M, root: RootPage) -> Self {
        Self { root, mapper }
    }

    /// Allocate and zero a fresh page directory.
    ///
    /// # Errors
    /// [`MapError::OutOfFrames`] if `alloc` is exhausted.
    pub fn create<A: FrameAlloc>(mapper: &'m M, alloc: &mut A) -> Result<Self, MapError> {
        let root = alloc.alloc_4k().ok_or(MapError::OutOfFrames)?;
        let space = Self::from_root(mapper, root);
        unsafe { space.directory_mut() }.zero();
        Ok(space)
    }

    /// Load CR3 with this address space's directory.
    ///
    /// # Safety
    /// The code, stack and data in use must be mapped identically in the
    /// target space.
    #[cfg(target_arch = "x86")]
    #[inline]
    pub unsafe fn activate(&self) {
        use kernel_registers::StoreRegisterUnsafe;
        use kernel_registers::cr3::Cr3;

        let cr3 = Cr3::from_directory_phys(self.root.base(), false, false);
        unsafe { cr3.store_unsafe() };
    }

    /// Physical page of the page directory.
    #[inline]
    #[must_use]
    pub const fn root_page(&self) -> RootPage {
        self.root
    }

    /// # Safety
    /// No other reference into the directory frame may be live.
    #[inline]
    unsafe fn directory_mut<'a>(&self) -> &'a mut PageDirectory {
        unsafe { self.mapper.phys_to_mut::<PageDirectory>(self.root.base()) }
    }

    /// # Safety
    /// `page` must hold a page table of this space and no other reference
    /// into it may be live.
    #[inline]
    unsafe fn table_mut<'a>(&self, page: PhysicalPage) -> &'a mut PageTable {
        unsafe { self.mapper.phys_to_mut::<PageTable>(page.base()) }
    }

    /// The page table linked at `i2`, if any.
    #[inline]
    #[must_use]
    pub fn table_page(&self, i2: L2Index) -> Option<PhysicalPage> {
        unsafe { self.directory_mut() }.get(i2).next_table()
    }

    /// Return the page table at `i2`, creating and linking a zeroed one if absent.
    ///
    /// # Errors
    /// [`MapError::OutOfFrames`] if a new table was needed and `alloc` is
    /// exhausted; the directory is unchanged.
    pub fn ensure_table<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        i2: L2Index,
    ) -> Result<PhysicalPage, MapError> {
        let pd = unsafe { self.directory_mut() };
        if let Some(page) = pd.get(i2).next_table() {
            return Ok(page);
        }

        let page = alloc.alloc_4k().ok_or(MapError::OutOfFrames)?;
        unsafe { self.table_mut(page) }.zero();
        pd.set(i2, PdEntry::make_next(page, PageEntryBits::kernel_rw()));
        log::trace!("page table {page} linked at directory slot {}", i2.as_usize());
        Ok(page)
    }

    /// Map **one** 4 KiB page at `va → pa`.
    ///
    /// The leaf becomes `(pa & !0xFFF) | (flags & 0xFFF) | PRESENT`, and the
    /// stale translation for `va` is invalidated.
    ///
    /// # Errors
    /// [`MapError::OutOfFrames`] if the covering page table had to be created
    /// and no frame was available. Nothing was changed in that case.
    pub fn map<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<(), MapError> {
        let (i2, i1) = split_indices(va);
        let table = self.ensure_table(alloc, i2)?;

        let pt = unsafe { self.table_mut(table) };
        pt.set(i1, PtEntry::make_4k(PhysicalPage::containing(pa), flags));
        invalidate_tlb_page(va);
        Ok(())
    }

    /// Clear the leaf entry for `va`.
    ///
    /// Returns the previous entry, or `None` when no page table covers `va`
    /// (nothing to do).
    pub fn unmap(&mut self, va: VirtualAddress) -> Option<PtEntry> {
        let (i2, i1) = split_indices(va);
        let table = self.table_page(i2)?;

        let pt = unsafe { self.table_mut(table) };
        let previous = pt.get(i1);
        pt.set(i1, PtEntry::zero());
        invalidate_tlb_page(va);
        Some(previous)
    }

    /// The leaf entry for `va`, present or not, if its page table exists.
    #[must_use]
    pub fn leaf_entry(&self, va: VirtualAddress) -> Option<PtEntry> {
        let (i2, i1) = split_indices(va);
        let table = self.table_page(i2)?;
        Some(unsafe { self.table_mut(table) }.get(i1))
    }

    /// Translate `va` to a physical address if mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (page, _) = self.leaf_entry(va)?.page_4k()?;
        Some(page.join(va.offset()))
    }

    #[inline]
    #[must_use]
    pub fn is_mapped(&self, va: VirtualAddress) -> bool {
        self.translate(va).is_some()
    }

    /// Number of page tables linked from the directory.
    #[must_use]
    pub fn table_count(&self) -> usize {
        unsafe { self.directory_mut() }.present_entries().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BumpAlloc, TestPhys};

    fn setup(frames: usize) -> (TestPhys, BumpAlloc) {
        // Frame 0 stays unused so that no table ever lives at address 0.
        (TestPhys::with_frames(frames), BumpAlloc::new(1, frames))
    }

    #[test]
    fn map_round_trip_then_unmap() {
        let (phys, mut alloc) = setup(8);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();

        let va = VirtualAddress::new(0xC000_0000);
        let pa = PhysicalAddress::new(0x0030_0000);
        space
            .map(&mut alloc, va, pa, PageEntryBits::new().with_writable(true))
            .unwrap();

        let leaf = space.leaf_entry(va).unwrap();
        let (page, flags) = leaf.page_4k().unwrap();
        assert_eq!(page.base(), pa);
        assert!(flags.present());
        assert!(flags.writable());
        assert_eq!(
            space.translate(va + 0x123),
            Some(PhysicalAddress::new(0x0030_0123))
        );

        let previous = space.unmap(va).unwrap();
        assert!(previous.is_present());
        assert!(!space.leaf_entry(va).unwrap().is_present());
        assert!(!space.is_mapped(va));
    }

    #[test]
    fn directory_link_is_present_and_writable() {
        let (phys, mut alloc) = setup(8);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();

        let va = VirtualAddress::new(0x0040_1000);
        space
            .map(&mut alloc, va, PhysicalAddress::new(0x1000), PageEntryBits::kernel_ro())
            .unwrap();

        let (i2, _) = split_indices(va);
        let pde = unsafe { space.directory_mut() }.get(i2);
        assert!(pde.flags().present());
        assert!(pde.flags().writable());
        assert!(!space.leaf_entry(va).unwrap().flags().writable());
    }

    #[test]
    fn one_table_per_4mib_window() {
        let (phys, mut alloc) = setup(8);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();
        let before = alloc.used;

        for va in [0xC000_0000, 0xC000_1000, 0xC03F_F000] {
            space
                .map(
                    &mut alloc,
                    VirtualAddress::new(va),
                    PhysicalAddress::new(0x0010_0000),
                    PageEntryBits::kernel_rw(),
                )
                .unwrap();
        }
        assert_eq!(alloc.used - before, 1);
        assert_eq!(space.table_count(), 1);

        space
            .map(
                &mut alloc,
                VirtualAddress::new(0xC040_0000),
                PhysicalAddress::new(0x0010_0000),
                PageEntryBits::kernel_rw(),
            )
            .unwrap();
        assert_eq!(alloc.used - before, 2);
    }

    #[test]
    fn new_tables_are_zeroed() {
        let (phys, mut alloc) = setup(8);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();
        // The next frame handed out will hold the page table.
        phys.scribble(PhysicalPage::from_index(2));

        let va = VirtualAddress::new(0x0080_0000);
        space
            .map(&mut alloc, va, PhysicalAddress::new(0x2000), PageEntryBits::kernel_rw())
            .unwrap();

        assert!(space.is_mapped(va));
        assert!(!space.is_mapped(va + 0x1000));
        assert_eq!(space.leaf_entry(va + 0x1000), Some(PtEntry::zero()));
    }

    #[test]
    fn unmap_without_table_is_a_no_op() {
        let (phys, mut alloc) = setup(4);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();
        assert_eq!(space.unmap(VirtualAddress::new(0xDEAD_B000)), None);
        assert_eq!(space.table_count(), 0);
    }

    #[test]
    fn map_without_frames_has_no_effect() {
        // Exactly one frame for the directory, none for tables.
        let (phys, mut alloc) = setup(2);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();

        let va = VirtualAddress::new(0xC000_0000);
        let result = space.map(
            &mut alloc,
            va,
            PhysicalAddress::new(0x0030_0000),
            PageEntryBits::kernel_rw(),
        );
        assert_eq!(result, Err(MapError::OutOfFrames));
        assert_eq!(space.table_count(), 0);
        assert_eq!(space.leaf_entry(va), None);
    }

    #[test]
    fn address_bits_are_masked() {
        let (phys, mut alloc) = setup(4);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();

        let va = VirtualAddress::new(0x0000_5000);
        space
            .map(
                &mut alloc,
                va,
                PhysicalAddress::new(0x0012_3456),
                PageEntryBits::from_bits(0xABCD_E004),
            )
            .unwrap();

        assert_eq!(space.leaf_entry(va).unwrap().raw(), 0x0012_3005);
    }

    #[test]
    fn remapping_replaces_the_leaf() {
        let (phys, mut alloc) = setup(4);
        let mut space = AddressSpace::create(&phys, &mut alloc).unwrap();
        let va = VirtualAddress::new(0x0000_5000);

        space
            .map(&mut alloc, va, PhysicalAddress::new(0x1000), PageEntryBits::kernel_rw())
            .unwrap();
        space
            .map(&mut alloc, va, PhysicalAddress::new(0x2000), PageEntryBits::kernel_rw())
            .unwrap();
        assert_eq!(space.translate(va), Some(PhysicalAddress::new(0x2000)));
    }
}
