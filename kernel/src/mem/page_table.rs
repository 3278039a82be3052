use crate::mem::frame_table::FrameNumber;
use crate::system::System;
use crate::sync::mutex::Mutex;
use crate::threading::Tid;
use alloc::vec;
use alloc::vec::Vec;
use disksim_shared::paging::{PageTableEntry, MAX_PAGE_LOCKS};

pub type PageNumber = u32;

/// Every virtual page of the simulation, indexed by page number.
pub struct PageTable {
    entries: Mutex<Vec<PageTableEntry>>,
}

impl PageTable {
    pub fn new(page_count: usize) -> Self {
        PageTable {
            entries: Mutex::new(vec![PageTableEntry::default(); page_count]),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map(&self, page: PageNumber, frame: FrameNumber) {
        self.update(page, |e| *e = e.mapped(frame));
    }

    pub fn is_present(&self, page: PageNumber) -> bool {
        self.update(page, |_| {}).present()
    }

    /// The frame backing `page`, or `None` while the page is not resident.
    pub fn frame(&self, page: PageNumber) -> Option<FrameNumber> {
        let entry = self.update(page, |_| {});
        entry.present().then(|| entry.frame_number().value())
    }

    pub fn lock_count(&self, page: PageNumber) -> u16 {
        self.update(page, |_| {}).lock_count().value()
    }

    /// Pins `page` on behalf of thread `tid` for the duration of a transfer.
    ///
    /// A page that is not resident is faulted in first through the system's
    /// pager. The pager may suspend `tid` and may itself issue I/O through
    /// the same system, so no table lock is held while it runs. The lock is
    /// taken even if the fault could not be resolved; callers re-check the
    /// thread afterwards and release it through [`PageTable::unlock`].
    ///
    /// Returns `false`, leaving the page untouched, if it already holds
    /// `MAX_PAGE_LOCKS` locks.
    pub fn lock(&self, system: &System, page: PageNumber, tid: Tid) -> bool {
        if !self.is_present(page) {
            system.pager().handle_page_fault(system, tid, page);
        }
        let mut saturated = false;
        self.update(page, |e| {
            saturated = e.lock_count().value() == MAX_PAGE_LOCKS;
            if !saturated {
                *e = e.locked();
            }
        });
        !saturated
    }

    /// Releases one lock on `page`. Panics if the page is not locked.
    pub fn unlock(&self, page: PageNumber) {
        self.update(page, |e| *e = e.unlocked());
    }

    fn update(&self, page: PageNumber, op: impl FnOnce(&mut PageTableEntry)) -> PageTableEntry {
        let mut entries = self.entries.lock();
        let len = entries.len();
        let Some(entry) = entries.get_mut(page as usize) else {
            panic!("page {} out of range ({} pages)", page, len);
        };
        op(entry);
        *entry
    }
}
