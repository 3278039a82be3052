use crate::block::bio_core::{split_owned_by, BioScheduler};
use crate::block::bio_request::Iorb;
use crate::block::block_core::Cylinder;
use crate::threading::Tid;
use alloc::vec::Vec;

/// A NOOP scheduler that contains no scheduling logic: requests are serviced
/// in arrival order wherever the head happens to be.
#[derive(Default)]
pub struct NoopScheduler {
    queue: Vec<Iorb>,
}

impl NoopScheduler {
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }
}

impl BioScheduler for NoopScheduler {
    fn enqueue(&mut self, iorb: Iorb) {
        self.queue.push(iorb);
    }

    fn select(&mut self, _current: Cylinder) -> Option<Iorb> {
        if self.queue.is_empty() {
            return None;
        }
        Some(self.queue.remove(0))
    }

    fn remove_owned_by(&mut self, tid: Tid) -> Vec<Iorb> {
        split_owned_by(&mut self.queue, tid)
    }

    fn queued(&self) -> &[Iorb] {
        &self.queue
    }
}
