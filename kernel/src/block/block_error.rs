use crate::block::bio_request::Iorb;
use crate::block::block_core::DeviceId;
use crate::mem::page_table::PageNumber;
use crate::system::System;
use core::error::Error;
use core::fmt::{Debug, Display, Formatter};

/// Reasons a device refuses an IORB.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// The owning thread was killed before the request could be queued.
    ThreadKilled,
    /// No device with this id is registered.
    UnknownDevice(DeviceId),
    /// The page already holds as many locks as its entry can count.
    PageLockLimit(PageNumber),
}

impl Debug for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            BlockError::ThreadKilled => write!(f, "ThreadKilled"),
            BlockError::UnknownDevice(id) => write!(f, "UnknownDevice({})", id),
            BlockError::PageLockLimit(page) => write!(f, "PageLockLimit({})", page),
        }
    }
}

impl Display for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            BlockError::ThreadKilled => write!(f, "owning thread was killed during admission"),
            BlockError::UnknownDevice(id) => write!(f, "no device with id {}", id),
            BlockError::PageLockLimit(page) => {
                write!(f, "page {} cannot take another lock", page)
            }
        }
    }
}

impl Error for BlockError {}

/// An IORB that never entered the device queue.
///
/// Admission may already have pinned the page and counted the IORB against
/// its file; the caller owns undoing that, usually through [`Rejected::unwind`].
#[derive(Debug)]
pub struct Rejected {
    pub reason: BlockError,
    pub iorb: Iorb,
    pub page_locked: bool,
    pub file_counted: bool,
}

impl Rejected {
    /// Releases whatever admission acquired and hands the IORB back.
    pub fn unwind(self, system: &System) -> Iorb {
        if self.page_locked {
            system.pages.unlock(self.iorb.page());
        }
        if self.file_counted {
            system.files.release_iorb(self.iorb.file());
        }
        self.iorb
    }
}

impl Display for Rejected {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "IORB {} rejected: {}", self.iorb.id(), self.reason)
    }
}

impl Error for Rejected {}
