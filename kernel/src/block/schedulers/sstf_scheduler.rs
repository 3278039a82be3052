use crate::block::bio_core::{seek_distance, split_owned_by, BioScheduler};
use crate::block::bio_request::Iorb;
use crate::block::block_core::Cylinder;
use crate::threading::Tid;
use alloc::vec::Vec;

/// Shortest-seek-time-first: services the queued request closest to the head.
///
/// Ties go to the request that was queued first, so a given admission order
/// always produces the same service order.
#[derive(Default)]
pub struct SstfScheduler {
    queue: Vec<Iorb>,
}

impl SstfScheduler {
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }
}

impl BioScheduler for SstfScheduler {
    fn enqueue(&mut self, iorb: Iorb) {
        self.queue.push(iorb);
    }

    fn select(&mut self, current: Cylinder) -> Option<Iorb> {
        let mut best = 0;
        let mut best_distance = seek_distance(current, self.queue.first()?);

        for (i, iorb) in self.queue.iter().enumerate().skip(1) {
            let distance = seek_distance(current, iorb);
            // Strictly closer only: the earliest request keeps ties.
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }

        Some(self.queue.remove(best))
    }

    fn remove_owned_by(&mut self, tid: Tid) -> Vec<Iorb> {
        split_owned_by(&mut self.queue, tid)
    }

    fn queued(&self) -> &[Iorb] {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::bio_request::IoType;

    fn admitted(id: u64, tid: Tid, cylinder: Cylinder) -> Iorb {
        let iorb = Iorb::new(id, 0, 0, IoType::Read, tid, 0, 0);
        iorb.set_cylinder(cylinder);
        iorb
    }

    #[test]
    fn picks_closest_cylinder() {
        let mut scheduler = SstfScheduler::new();
        scheduler.enqueue(admitted(1, 1, 10));
        scheduler.enqueue(admitted(2, 1, 40));

        assert_eq!(scheduler.select(50).map(|r| r.id()), Some(2));
        assert_eq!(scheduler.select(40).map(|r| r.id()), Some(1));
        assert_eq!(scheduler.select(10).map(|r| r.id()), None);
    }

    #[test]
    fn equal_distance_goes_to_earliest() {
        let mut scheduler = SstfScheduler::new();
        scheduler.enqueue(admitted(1, 1, 20));
        scheduler.enqueue(admitted(2, 1, 20));
        assert_eq!(scheduler.select(0).map(|r| r.id()), Some(1));

        // Same distance on opposite sides of the head.
        scheduler.enqueue(admitted(3, 1, 40));
        assert_eq!(scheduler.select(30).map(|r| r.id()), Some(2));
        scheduler.enqueue(admitted(4, 1, 20));
        assert_eq!(scheduler.select(30).map(|r| r.id()), Some(3));
    }

    #[test]
    fn single_request_is_always_selected() {
        let mut scheduler = SstfScheduler::new();
        scheduler.enqueue(admitted(9, 1, 1000));
        assert_eq!(scheduler.select(0).map(|r| r.id()), Some(9));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn removes_only_the_owners_requests() {
        let mut scheduler = SstfScheduler::new();
        for (id, tid) in [(1, 7), (2, 8), (3, 7), (4, 7), (5, 8)] {
            scheduler.enqueue(admitted(id, tid, 0));
        }

        let removed: Vec<_> = scheduler.remove_owned_by(7).iter().map(|r| r.id()).collect();
        assert_eq!(removed, [1, 3, 4]);
        let left: Vec<_> = scheduler.queued().iter().map(|r| r.id()).collect();
        assert_eq!(left, [2, 5]);
        assert!(scheduler.remove_owned_by(7).is_empty());
    }

    #[test]
    #[should_panic(expected = "without a resolved cylinder")]
    fn unresolved_request_is_fatal() {
        let mut scheduler = SstfScheduler::new();
        scheduler.enqueue(admitted(1, 1, 5));
        scheduler.enqueue(Iorb::new(2, 0, 0, IoType::Read, 1, 0, 0));
        scheduler.select(0);
    }
}
