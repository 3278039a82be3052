use super::scheduler::Scheduler;
use crate::threading::process::Tid;
use alloc::collections::VecDeque;

#[derive(Default)]
pub struct FIFOScheduler {
    ready_queue: VecDeque<Tid>,
}

impl FIFOScheduler {
    pub const fn new() -> FIFOScheduler {
        FIFOScheduler {
            ready_queue: VecDeque::new(),
        }
    }
}

impl Scheduler for FIFOScheduler {
    fn push(&mut self, tid: Tid) {
        self.ready_queue.push_back(tid);
    }

    fn pop(&mut self) -> Option<Tid> {
        self.ready_queue.pop_front()
    }

    fn remove(&mut self, tid: Tid) -> bool {
        match self.ready_queue.iter().position(|&t| t == tid) {
            Some(pos) => self.ready_queue.remove(pos).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_arrival_order() {
        let mut scheduler = FIFOScheduler::new();
        scheduler.push(3);
        scheduler.push(1);
        scheduler.push(2);

        assert!(scheduler.remove(1));
        assert!(!scheduler.remove(1));
        assert_eq!(scheduler.pop(), Some(3));
        assert_eq!(scheduler.pop(), Some(2));
        assert_eq!(scheduler.pop(), None);
    }
}
