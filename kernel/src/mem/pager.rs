use crate::mem::page_table::PageNumber;
use crate::system::System;
use crate::threading::Tid;
use log::debug;

/// Resolves a page fault raised while locking a page for I/O.
///
/// Implementations may block `tid`, kill it, or issue further I/O through
/// `system` before returning.
pub trait PageFaultHandler: Send + Sync {
    fn handle_page_fault(&self, system: &System, tid: Tid, page: PageNumber);
}

/// Leaves faulting pages unmapped.
pub struct NoPager;

impl PageFaultHandler for NoPager {
    fn handle_page_fault(&self, _system: &System, tid: Tid, page: PageNumber) {
        debug!("page fault on page {} by thread {} left unresolved", page, tid);
    }
}

/// Maps a faulting page onto the lowest free frame, without touching the disk.
pub struct FreeFramePager;

impl PageFaultHandler for FreeFramePager {
    fn handle_page_fault(&self, system: &System, tid: Tid, page: PageNumber) {
        match system.frames.claim_free() {
            Some(frame) => {
                system.pages.map(page, frame);
                debug!("page {} mapped to frame {} for thread {}", page, frame, tid);
            }
            None => debug!("no free frame for page {} (thread {})", page, tid),
        }
    }
}
