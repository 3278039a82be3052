use crate::block::block_core::{BlockNumber, Cylinder, DeviceId};
use crate::fs::open_file::FileId;
use crate::mem::page_table::PageNumber;
use crate::threading::Tid;
use alloc::vec::Vec;
use core::fmt;
use once_cell::unsync::OnceCell;

pub type IorbId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoType {
    /// Disk to memory.
    Read,
    /// Memory to disk.
    Write,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IoType::Read => write!(f, "read"),
            IoType::Write => write!(f, "write"),
        }
    }
}

/// An I/O request block: one pending transfer between a page and a disk block.
#[derive(Debug)]
pub struct Iorb {
    id: IorbId,
    device: DeviceId,
    block: BlockNumber,
    io_type: IoType,
    tid: Tid,
    file: FileId,
    page: PageNumber,
    /// Resolved once, when the request is admitted to its device.
    cylinder: OnceCell<Cylinder>,
    waiters: Vec<Tid>,
}

impl Iorb {
    pub fn new(
        id: IorbId,
        device: DeviceId,
        block: BlockNumber,
        io_type: IoType,
        tid: Tid,
        file: FileId,
        page: PageNumber,
    ) -> Self {
        Self {
            id,
            device,
            block,
            io_type,
            tid,
            file,
            page,
            cylinder: OnceCell::new(),
            waiters: Vec::new(),
        }
    }

    pub fn id(&self) -> IorbId {
        self.id
    }
    pub fn device(&self) -> DeviceId {
        self.device
    }
    pub fn block(&self) -> BlockNumber {
        self.block
    }
    pub fn io_type(&self) -> IoType {
        self.io_type
    }
    pub fn tid(&self) -> Tid {
        self.tid
    }
    pub fn file(&self) -> FileId {
        self.file
    }
    pub fn page(&self) -> PageNumber {
        self.page
    }

    /// The cylinder resolved at admission, `None` before that.
    pub fn cylinder(&self) -> Option<Cylinder> {
        self.cylinder.get().copied()
    }

    /// Records the resolved cylinder. Panics if one was already recorded.
    pub(crate) fn set_cylinder(&self, cylinder: Cylinder) {
        if self.cylinder.set(cylinder).is_err() {
            panic!("IORB {}: cylinder assigned twice", self.id);
        }
    }

    /// Suspends `tid` on this request: it is resumed when the transfer completes.
    pub fn add_waiter(&mut self, tid: Tid) {
        if !self.waiters.contains(&tid) {
            self.waiters.push(tid);
        }
    }

    pub fn waiters(&self) -> &[Tid] {
        &self.waiters
    }

    pub(crate) fn take_waiters(&mut self) -> Vec<Tid> {
        core::mem::take(&mut self.waiters)
    }
}

impl fmt::Display for Iorb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IORB {} ({} block {} -> page {}, thread {}, file {}",
            self.id, self.io_type, self.block, self.page, self.tid, self.file
        )?;
        match self.cylinder() {
            Some(cylinder) => write!(f, ", cylinder {})", cylinder),
            None => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_is_unset_until_admission() {
        let iorb = Iorb::new(1, 0, 17, IoType::Read, 3, 0, 4);
        assert_eq!(iorb.cylinder(), None);
        iorb.set_cylinder(2);
        assert_eq!(iorb.cylinder(), Some(2));
    }

    #[test]
    #[should_panic(expected = "assigned twice")]
    fn cylinder_is_set_exactly_once() {
        let iorb = Iorb::new(1, 0, 17, IoType::Write, 3, 0, 4);
        iorb.set_cylinder(2);
        iorb.set_cylinder(3);
    }

    #[test]
    fn waiters_are_recorded_once() {
        let mut iorb = Iorb::new(1, 0, 0, IoType::Read, 3, 0, 0);
        iorb.add_waiter(3);
        iorb.add_waiter(5);
        iorb.add_waiter(3);
        assert_eq!(iorb.waiters(), &[3, 5]);
        assert_eq!(iorb.take_waiters(), [3, 5]);
        assert!(iorb.waiters().is_empty());
    }
}
