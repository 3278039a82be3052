use crate::block::bio_request::Iorb;
use crate::block::block_core::Cylinder;
use crate::block::schedulers::{NoopScheduler, SstfScheduler};
use crate::threading::Tid;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// Ordering policy for the IORBs waiting on one device.
///
/// The device serializes every call, so implementations never see concurrent
/// access.
pub trait BioScheduler: Send {
    /// Add an admitted request (its cylinder already resolved) to the queue.
    fn enqueue(&mut self, iorb: Iorb);

    /// Remove and return the request to service next, given the cylinder the
    /// head currently sits on.
    fn select(&mut self, current: Cylinder) -> Option<Iorb>;

    /// Remove every queued request owned by `tid`, in queue order.
    fn remove_owned_by(&mut self, tid: Tid) -> Vec<Iorb>;

    /// The queued requests, oldest first.
    fn queued(&self) -> &[Iorb];

    fn len(&self) -> usize {
        self.queued().len()
    }

    fn is_empty(&self) -> bool {
        self.queued().is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Shortest seek time first.
    #[default]
    Sstf,
    /// Oldest request first.
    Fifo,
}

impl SchedulerKind {
    pub fn build(self) -> Box<dyn BioScheduler> {
        match self {
            SchedulerKind::Sstf => Box::new(SstfScheduler::new()),
            SchedulerKind::Fifo => Box::new(NoopScheduler::new()),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchedulerKind::Sstf => write!(f, "sstf"),
            SchedulerKind::Fifo => write!(f, "fifo"),
        }
    }
}

/// Distance from `current` to the request's cylinder.
///
/// Panics if the request was never admitted, since its position is unknown.
pub(crate) fn seek_distance(current: Cylinder, iorb: &Iorb) -> Cylinder {
    match iorb.cylinder() {
        Some(cylinder) => current.abs_diff(cylinder),
        None => panic!("IORB {} queued without a resolved cylinder", iorb.id()),
    }
}

/// Splits the requests owned by `tid` out of `queue`, keeping both halves in order.
pub(crate) fn split_owned_by(queue: &mut Vec<Iorb>, tid: Tid) -> Vec<Iorb> {
    let (owned, kept) = core::mem::take(queue)
        .into_iter()
        .partition(|iorb| iorb.tid() == tid);
    *queue = kept;
    owned
}
